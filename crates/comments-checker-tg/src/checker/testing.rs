//! Fakes of the pipeline collaborators for tests

use super::*;
use crate::Result;
use async_trait::async_trait;
use parking_lot::Mutex as SyncMutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use teloxide::types::ChatId;

/// Scripted response of [`FakeDirectory`] for a single check of a channel
#[derive(Debug, Clone, Copy)]
pub(crate) enum Scripted {
    Open,
    Closed,
    NotOccupied,
    InvalidUsername,
    Resolution(&'static str),
    FloodWait(u64),
    Other(&'static str),

    /// The lookup never completes
    Hang,
}

/// Directory that replies with the scripted responses in order. Channels
/// without a script left are reported as closed.
#[derive(Default)]
pub(crate) struct FakeDirectory {
    scripts: SyncMutex<HashMap<String, VecDeque<Scripted>>>,
    linked_chats: SyncMutex<Vec<Option<i64>>>,
    calls: SyncMutex<Vec<String>>,
}

impl FakeDirectory {
    pub(crate) fn with(
        mut self,
        username: &str,
        scripts: impl IntoIterator<Item = Scripted>,
    ) -> Self {
        self.scripts
            .get_mut()
            .entry(username.to_owned())
            .or_default()
            .extend(scripts);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of channels that were looked up
    pub(crate) fn resolves(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.starts_with("resolve"))
            .count()
    }
}

#[async_trait]
impl ChannelDirectory for FakeDirectory {
    async fn resolve(&self, username: &Username) -> Result<ChannelHandle, DirectoryError> {
        self.calls.lock().push(format!("resolve {username}"));

        let scripted = self
            .scripts
            .lock()
            .get_mut(username.as_str())
            .and_then(VecDeque::pop_front)
            .unwrap_or(Scripted::Closed);

        let linked_chat_id = match scripted {
            Scripted::Open => Some(-1001),
            Scripted::Closed => None,
            Scripted::NotOccupied => return Err(DirectoryError::NotOccupied),
            Scripted::InvalidUsername => return Err(DirectoryError::InvalidUsername),
            Scripted::Resolution(message) => {
                return Err(DirectoryError::Resolution {
                    message: message.to_owned(),
                })
            }
            Scripted::FloodWait(secs) => {
                return Err(DirectoryError::FloodWait {
                    retry_after: Duration::from_secs(secs),
                })
            }
            Scripted::Other(message) => {
                return Err(DirectoryError::Other {
                    message: message.to_owned(),
                })
            }
            Scripted::Hang => std::future::pending().await,
        };

        let mut linked_chats = self.linked_chats.lock();
        linked_chats.push(linked_chat_id);

        let id = ChatId(linked_chats.len() as i64);

        Ok(ChannelHandle { id })
    }

    async fn full_channel(&self, channel: ChannelHandle) -> Result<FullChannel, DirectoryError> {
        self.calls.lock().push(format!("full_channel {}", channel.id));

        let linked_chat_id = self.linked_chats.lock()[channel.id.0 as usize - 1];

        Ok(FullChannel { linked_chat_id })
    }
}

/// Remembers all progress ticks, and optionally cancels the run after
/// the given number of ticks.
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub(crate) ticks: Vec<Progress>,
    pub(crate) cancel_after: Option<(usize, RunRegistry, ChatId)>,
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn tick(&mut self, progress: Progress) -> Result {
        self.ticks.push(progress);

        if let Some((ticks, registry, chat_id)) = &self.cancel_after {
            if self.ticks.len() == *ticks {
                registry.cancel(*chat_id);
            }
        }

        Ok(())
    }
}
