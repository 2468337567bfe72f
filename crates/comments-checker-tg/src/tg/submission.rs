//! Handlers of the messages that start a new channel check run

use crate::checker::{extract_usernames, BatchRunner, RemainingWorkFile, RunHandle};
use crate::prelude::*;
use crate::tg::{callback, publish, TgProgress};
use crate::util::DynResult;
use crate::{err, tg, Result};
use std::sync::Arc;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::Document;
use teloxide::utils::markdown;

/// Max size of the uploaded file with the list of channels
const MAX_UPLOAD_SIZE: u32 = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub(crate) enum SubmissionError {
    #[error("No channel usernames were found. Send them like this: @channel1 @channel2")]
    NoUsernames,

    #[error(
        "A check is already in progress in this chat. \
        Wait for it to finish or cancel it before starting a new one"
    )]
    RunInProgress,

    #[error("The file is too big ({size} bytes). Max size is {MAX_UPLOAD_SIZE} bytes")]
    FileTooBig { size: u32 },

    #[error("The file must contain plain text in UTF-8 encoding")]
    NotUtf8 { source: std::string::FromUtf8Error },
}

pub(crate) fn filter_text_with_usernames(msg: Message) -> bool {
    msg.text().is_some_and(is_submission)
}

/// Commands that weren't recognized, e.g. the ones addressed to other bots,
/// mention a username too, but they must not start a run
fn is_submission(text: &str) -> bool {
    !text.starts_with('/') && text.contains('@')
}

pub(crate) fn filter_document(msg: Message) -> Option<Document> {
    msg.document().cloned()
}

#[instrument(skip_all, fields(
    sender = msg.from.as_ref().map(|user| user.debug_id()).as_deref(),
    chat = %msg.chat.debug_id(),
))]
pub(crate) async fn handle_text(ctx: Arc<tg::Ctx>, msg: Message) -> DynResult {
    let usernames = extract_usernames(msg.text().unwrap_or_default());
    submit(ctx, msg, usernames).await
}

#[instrument(skip_all, fields(
    sender = msg.from.as_ref().map(|user| user.debug_id()).as_deref(),
    chat = %msg.chat.debug_id(),
    file_name = document.file_name.as_deref(),
    file_size = document.file.size,
))]
pub(crate) async fn handle_document(
    ctx: Arc<tg::Ctx>,
    msg: Message,
    document: Document,
) -> DynResult {
    let text = match download_text(&ctx, &document).await {
        Ok(text) => text,
        Err(err) => {
            tg::reply_with_error(&ctx, &msg, &err).await;
            return Err(err.into());
        }
    };

    submit(ctx, msg, extract_usernames(&text)).await
}

async fn download_text(ctx: &tg::Ctx, document: &Document) -> Result<String> {
    let size = document.file.size;
    if size > MAX_UPLOAD_SIZE {
        return Err(err!(SubmissionError::FileTooBig { size }));
    }

    let file = ctx.bot.get_file(document.file.id.clone()).await?;

    let mut buf = Vec::with_capacity(size as usize);
    ctx.downloader
        .download_file(&file.path, &mut buf)
        .with_duration_log("Downloaded the file with channels")
        .await?;

    String::from_utf8(buf).map_err(|source| err!(SubmissionError::NotUtf8 { source }))
}

/// Registers the run and spawns it in background. The run must not block the
/// dispatcher, otherwise the buttons of the progress message would not work
/// until the run finishes.
async fn submit(ctx: Arc<tg::Ctx>, msg: Message, usernames: Vec<String>) -> DynResult {
    let result = begin(&ctx, &usernames, msg.chat.id);

    let run = match result {
        Ok(run) => run,
        Err(err) => {
            tg::reply_with_error(&ctx, &msg, &err).await;
            return Err(err.into());
        }
    };

    info!(usernames = usernames.len(), "Starting a new run");

    tokio::spawn(
        async move {
            if let Err(err) = check_channels(&ctx, &msg, run, usernames).await {
                tg::reply_with_error(&ctx, &msg, &err).await;
            }
        }
        .in_current_span(),
    );

    Ok(())
}

fn begin(ctx: &tg::Ctx, usernames: &[String], chat_id: ChatId) -> Result<RunHandle> {
    if usernames.is_empty() {
        return Err(err!(SubmissionError::NoUsernames));
    }

    ctx.runs
        .begin(chat_id)
        .ok_or_else(|| err!(SubmissionError::RunInProgress))
}

async fn check_channels(
    ctx: &tg::Ctx,
    msg: &Message,
    run: RunHandle,
    usernames: Vec<String>,
) -> Result {
    let chat_id = msg.chat.id;

    // Only one run at a time talks to the channel directory
    let (directory, status) = match ctx.directory.try_lock() {
        Ok(directory) => (Some(directory), "Starting to check the channels..."),
        Err(_) => (None, "Another check is in progress, this one is queued..."),
    };

    let progress_msg = ctx
        .bot
        .reply_text(msg, markdown::escape(status))
        .reply_markup(callback::keyboard())
        .await?;

    let directory = match directory {
        Some(directory) => directory,
        None => {
            info!("Waiting for the other run to finish");
            ctx.directory.lock().await
        }
    };

    let mut progress = TgProgress {
        bot: ctx.bot.clone(),
        chat_id,
        message_id: progress_msg.id,
    };

    let runner = BatchRunner {
        directory: &*directory,
        progress: &mut progress,
        remaining: RemainingWorkFile::for_chat(&ctx.checker.data_dir, chat_id),
        run,
        max_batch_size: ctx.checker.max_batch_size,
        lookup_timeout: ctx.checker.lookup_timeout(),
    };

    let outcome = runner.run(usernames).await;

    drop(directory);

    publish::send_outcome(ctx, msg, &outcome).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use assert_matches::assert_matches;

    #[test]
    fn user_errors() {
        let err = err!(SubmissionError::FileTooBig { size: 2_000_000_u32 });
        assert!(err.is_user_error());
        assert_matches!(
            err.kind(),
            ErrorKind::Submission {
                source: SubmissionError::FileTooBig { size: 2_000_000 }
            }
        );

        let err = err!(SubmissionError::NotUtf8 {
            source: String::from_utf8(vec![0xff, 0xfe]).unwrap_err()
        });
        assert!(err.is_user_error());
        assert_eq!(
            err.kind().to_string(),
            "The file must contain plain text in UTF-8 encoding"
        );
    }

    #[test]
    fn commands_are_not_submissions() {
        assert!(is_submission("@foo @bar"));
        assert!(is_submission("check these: https://t.me/channel/@foo/stat"));
        assert!(!is_submission("no channels here"));
        assert!(!is_submission("/list_users@comments_checker_bot"));
        assert!(!is_submission("/opened@some_other_bot"));
    }
}
