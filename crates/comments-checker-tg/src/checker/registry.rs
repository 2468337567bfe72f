use super::{CheckedChannel, Tallies};
use crate::prelude::*;
use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::sync::Arc;
use teloxide::types::ChatId;
use tokio_util::sync::CancellationToken;

/// State of the channel check runs per chat. It is cheap to clone, all clones
/// share the same state.
#[derive(Clone, Default)]
pub(crate) struct RunRegistry {
    chats: Arc<SyncMutex<HashMap<ChatId, ChatRuns>>>,
}

#[derive(Default)]
struct ChatRuns {
    /// Cancellation token of the run that is currently in progress
    active: Option<CancellationToken>,

    /// Channels checked by the current or the most recent run
    checked: Vec<CheckedChannel>,

    /// Results of the most recent finished run
    last_run: Option<Arc<Tallies>>,
}

/// Exclusive right to run a channel check in the chat. The chat becomes
/// available for a new run once the handle is dropped.
pub(crate) struct RunHandle {
    chat_id: ChatId,
    cancel: CancellationToken,
    registry: RunRegistry,
}

impl RunRegistry {
    /// Starts a new run in the chat. Returns `None` if there is a run
    /// in progress in this chat already.
    pub(crate) fn begin(&self, chat_id: ChatId) -> Option<RunHandle> {
        let mut chats = self.chats.lock();
        let runs = chats.entry(chat_id).or_default();

        if runs.active.is_some() {
            return None;
        }

        let cancel = CancellationToken::new();
        runs.active = Some(cancel.clone());
        runs.checked.clear();

        Some(RunHandle {
            chat_id,
            cancel,
            registry: self.clone(),
        })
    }

    /// Asks the active run in the chat to stop. Returns `false` if there
    /// is no active run.
    pub(crate) fn cancel(&self, chat_id: ChatId) -> bool {
        let chats = self.chats.lock();
        let Some(cancel) = chats.get(&chat_id).and_then(|runs| runs.active.as_ref()) else {
            return false;
        };
        cancel.cancel();
        true
    }

    #[cfg(test)]
    pub(crate) fn is_active(&self, chat_id: ChatId) -> bool {
        self.chats
            .lock()
            .get(&chat_id)
            .is_some_and(|runs| runs.active.is_some())
    }

    pub(crate) fn checked(&self, chat_id: ChatId) -> Vec<CheckedChannel> {
        self.chats
            .lock()
            .get(&chat_id)
            .map(|runs| runs.checked.clone())
            .unwrap_or_default()
    }

    pub(crate) fn last_run(&self, chat_id: ChatId) -> Option<Arc<Tallies>> {
        self.chats
            .lock()
            .get(&chat_id)
            .and_then(|runs| runs.last_run.clone())
    }
}

impl RunHandle {
    pub(crate) fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn record_checked(&self, checked: CheckedChannel) {
        self.registry
            .chats
            .lock()
            .entry(self.chat_id)
            .or_default()
            .checked
            .push(checked);
    }

    /// Saves the results of the run, replacing the results of the previous one
    pub(crate) fn finish(self, tallies: Arc<Tallies>) {
        self.registry
            .chats
            .lock()
            .entry(self.chat_id)
            .or_default()
            .last_run = Some(tallies);
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        let mut chats = self.registry.chats.lock();
        let Some(runs) = chats.get_mut(&self.chat_id) else {
            warn!(chat_id = %self.chat_id, "BUG: run state disappeared before the run ended");
            return;
        };
        runs.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::Verdict;

    const CHAT: ChatId = ChatId(7);

    #[test]
    fn one_active_run_per_chat() {
        let registry = RunRegistry::default();

        let run = registry.begin(CHAT).unwrap();
        assert!(registry.begin(CHAT).is_none());
        assert!(registry.is_active(CHAT));

        // Other chats are independent
        let other = registry.begin(ChatId(8)).unwrap();

        drop(run);
        assert!(!registry.is_active(CHAT));
        assert!(registry.is_active(ChatId(8)));
        assert!(registry.begin(CHAT).is_some());

        drop(other);
    }

    #[test]
    fn cancel() {
        let registry = RunRegistry::default();

        assert!(!registry.cancel(CHAT));

        let run = registry.begin(CHAT).unwrap();
        assert!(!run.is_cancelled());
        assert!(registry.cancel(CHAT));
        assert!(run.is_cancelled());

        drop(run);

        // The new run starts with a fresh cancellation flag
        let run = registry.begin(CHAT).unwrap();
        assert!(!run.is_cancelled());
    }

    #[test]
    fn new_run_overwrites_previous_results() {
        let registry = RunRegistry::default();

        let run = registry.begin(CHAT).unwrap();
        run.record_checked(CheckedChannel {
            username: "@foo".to_owned(),
            verdict: Verdict::Open,
        });
        let mut tallies = Tallies::default();
        tallies.record("@foo".to_owned(), Verdict::Open);
        run.finish(Arc::new(tallies));

        assert_eq!(registry.checked(CHAT).len(), 1);
        assert_eq!(registry.last_run(CHAT).unwrap().opened, ["@foo"]);

        let run = registry.begin(CHAT).unwrap();
        assert!(registry.checked(CHAT).is_empty());
        run.finish(Arc::new(Tallies::default()));

        assert_eq!(registry.last_run(CHAT).unwrap().processed(), 0);
        assert!(registry.last_run(ChatId(100)).is_none());
    }
}
