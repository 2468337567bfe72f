use crate::checker::{ChannelDirectory, ChannelHandle, DirectoryError, FullChannel, Username};
use crate::tg::Bot;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::Recipient;
use teloxide::{ApiError, RequestError};

/// Looks up the channels via the Bot API `getChat` method
pub(crate) struct TgChannelDirectory {
    bot: Bot,
}

impl TgChannelDirectory {
    pub(crate) fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChannelDirectory for TgChannelDirectory {
    async fn resolve(&self, username: &Username) -> Result<ChannelHandle, DirectoryError> {
        let recipient = Recipient::ChannelUsername(username.as_str().to_owned());
        let chat = self.bot.get_chat(recipient).await.map_err(from_request_error)?;

        if !chat.is_channel() {
            return Err(DirectoryError::Resolution {
                message: "the resolved chat is not a channel".to_owned(),
            });
        }

        Ok(ChannelHandle { id: chat.id })
    }

    async fn full_channel(&self, channel: ChannelHandle) -> Result<FullChannel, DirectoryError> {
        let chat = self
            .bot
            .get_chat(channel.id)
            .await
            .map_err(from_request_error)?;

        Ok(FullChannel {
            linked_chat_id: chat.linked_chat_id(),
        })
    }
}

fn from_request_error(err: RequestError) -> DirectoryError {
    match err {
        RequestError::Api(ApiError::ChatNotFound) => DirectoryError::NotOccupied,
        RequestError::Api(err) if is_invalid_username(&err) => DirectoryError::InvalidUsername,
        RequestError::Api(err) => DirectoryError::Resolution {
            message: err.to_string(),
        },
        RequestError::RetryAfter(seconds) => DirectoryError::FloodWait {
            retry_after: seconds.duration(),
        },
        err => DirectoryError::Other {
            message: err.to_string(),
        },
    }
}

fn is_invalid_username(err: &ApiError) -> bool {
    let message = err.to_string();
    message.contains("USERNAME_INVALID") || message.contains("username is invalid")
}
