use super::{CheckError, Username, Verdict};
use crate::prelude::*;
use async_trait::async_trait;
use std::time::Duration;
use teloxide::types::ChatId;

/// Resolved channel, that can be used to fetch the full info about it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChannelHandle {
    pub(crate) id: ChatId,
}

/// The part of the extended channel metadata that we care about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FullChannel {
    /// Id of the discussion chat linked to the channel
    pub(crate) linked_chat_id: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum DirectoryError {
    #[error("No channel has this username")]
    NotOccupied,

    #[error("The username is invalid")]
    InvalidUsername,

    #[error("{message}")]
    Resolution { message: String },

    #[error("Flood control exceeded, retry after {retry_after:?}")]
    FloodWait { retry_after: Duration },

    #[error("{message}")]
    Other { message: String },
}

/// Service that knows about the channels by their usernames
#[async_trait]
pub(crate) trait ChannelDirectory: Send + Sync {
    async fn resolve(&self, username: &Username) -> Result<ChannelHandle, DirectoryError>;

    async fn full_channel(&self, channel: ChannelHandle) -> Result<FullChannel, DirectoryError>;
}

/// The directory asked us to slow down. The caller must not send any requests
/// to the directory until `retry_after` elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Flood control exceeded, retry after {retry_after:?}")]
pub(crate) struct FloodWait {
    pub(crate) retry_after: Duration,
}

/// Checks if the channel has a linked discussion chat. All directory errors
/// except for the flood control are converted into [`Verdict::Error`].
#[instrument(skip(directory))]
pub(crate) async fn classify<D>(directory: &D, username: &Username) -> Result<Verdict, FloodWait>
where
    D: ChannelDirectory + ?Sized,
{
    let lookup = async {
        let channel = directory.resolve(username).await?;
        directory.full_channel(channel).await
    };

    let err = match lookup.await {
        Ok(channel) if channel.linked_chat_id.is_some() => return Ok(Verdict::Open),
        Ok(_) => return Ok(Verdict::Closed),
        Err(err) => err,
    };

    let err = match err {
        DirectoryError::FloodWait { retry_after } => return Err(FloodWait { retry_after }),
        DirectoryError::NotOccupied => CheckError::NotOccupied,
        DirectoryError::InvalidUsername => CheckError::InvalidUsername,
        DirectoryError::Resolution { message } => CheckError::ResolutionFailure { message },
        DirectoryError::Other { message } => CheckError::Unknown { message },
    };

    warn!(err = tracing_err(&err), "Failed to check the channel");

    Ok(Verdict::Error(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::testing::{FakeDirectory, Scripted};
    use assert_matches::assert_matches;
    use expect_test::{expect, Expect};

    async fn assert_classify(scripted: Scripted, expected: Expect) {
        let directory = FakeDirectory::default().with("@channel", [scripted]);
        let username = Username::parse("@channel").unwrap();

        let actual = classify(&directory, &username).await;

        expected.assert_debug_eq(&actual);
    }

    #[test_log::test(tokio::test)]
    async fn verdicts() {
        assert_classify(
            Scripted::Open,
            expect![[r#"
                Ok(
                    Open,
                )
            "#]],
        )
        .await;
        assert_classify(
            Scripted::Closed,
            expect![[r#"
                Ok(
                    Closed,
                )
            "#]],
        )
        .await;
    }

    #[test_log::test(tokio::test)]
    async fn errors_become_verdicts() {
        assert_classify(
            Scripted::NotOccupied,
            expect![[r#"
                Ok(
                    Error(
                        NotOccupied,
                    ),
                )
            "#]],
        )
        .await;
        assert_classify(
            Scripted::InvalidUsername,
            expect![[r#"
                Ok(
                    Error(
                        InvalidUsername,
                    ),
                )
            "#]],
        )
        .await;
        assert_classify(
            Scripted::Resolution("Bad Request: the chat is not a channel"),
            expect![[r#"
                Ok(
                    Error(
                        ResolutionFailure {
                            message: "Bad Request: the chat is not a channel",
                        },
                    ),
                )
            "#]],
        )
        .await;
    }

    #[test_log::test(tokio::test)]
    async fn flood_wait_is_propagated() {
        let directory = FakeDirectory::default().with("@channel", [Scripted::FloodWait(42)]);
        let username = Username::parse("@channel").unwrap();

        let actual = classify(&directory, &username).await;

        assert_matches!(actual, Err(FloodWait { retry_after }) if retry_after.as_secs() == 42);
        assert_eq!(directory.calls(), ["resolve @channel"]);
    }

    #[test_log::test(tokio::test)]
    async fn resolve_and_full_channel_per_check() {
        let directory = FakeDirectory::default().with("@channel", [Scripted::Open]);
        let username = Username::parse("@channel").unwrap();

        classify(&directory, &username).await.unwrap();

        expect![[r#"
            [
                "resolve @channel",
                "full_channel 1",
            ]
        "#]]
        .assert_debug_eq(&directory.calls());
    }
}
