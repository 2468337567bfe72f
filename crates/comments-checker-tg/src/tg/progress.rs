use crate::checker::{Progress, ProgressSink};
use crate::tg::{callback, Bot};
use crate::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use teloxide::utils::markdown;
use teloxide::{ApiError, RequestError};

/// Shows the progress of the run by editing the same message over and over
pub(crate) struct TgProgress {
    pub(crate) bot: Bot,
    pub(crate) chat_id: ChatId,
    pub(crate) message_id: MessageId,
}

#[async_trait]
impl ProgressSink for TgProgress {
    async fn tick(&mut self, progress: Progress) -> Result {
        let result = self
            .bot
            .edit_message_text(
                self.chat_id,
                self.message_id,
                markdown::escape(&progress.to_string()),
            )
            .reply_markup(callback::keyboard())
            .await;

        match result {
            Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
