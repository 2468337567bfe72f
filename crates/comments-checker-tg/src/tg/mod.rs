//! Telegram bot surface: update routing, commands and the run lifecycle

mod callback;
mod cmd;
mod config;
mod directory;
mod progress;
mod publish;
mod submission;

use crate::checker::RunRegistry;
use crate::prelude::*;
use crate::{checker, db, Error, Result};
use directory::TgChannelDirectory;
use dptree::di::DependencyMap;
use progress::TgProgress;
use std::sync::Arc;
use teloxide::adaptors::{CacheMe, DefaultParseMode, Throttle, Trace};
use teloxide::dispatching::UpdateFilterExt;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;
use teloxide::utils::markdown;

pub(crate) use config::*;
pub(crate) use submission::SubmissionError;

pub(crate) type Bot = Trace<CacheMe<DefaultParseMode<Throttle<teloxide::Bot>>>>;

pub(crate) struct Ctx {
    bot: Bot,

    /// The adaptors don't forward file downloads, so they go through the
    /// plain bot
    downloader: teloxide::Bot,

    cfg: Arc<Config>,
    checker: checker::Config,
    db: db::Repo,
    runs: RunRegistry,

    /// The session used to look up the channels. It is held by the run for
    /// its whole duration, so the runs from different chats are serialized.
    directory: tokio::sync::Mutex<TgChannelDirectory>,
}

pub(crate) struct RunBotOptions {
    pub(crate) tg_cfg: Config,
    pub(crate) checker_cfg: checker::Config,
    pub(crate) db: db::Repo,
}

pub(crate) async fn run_bot(opts: RunBotOptions) -> Result {
    fs_err::tokio::create_dir_all(&opts.checker_cfg.data_dir).await?;

    let downloader = teloxide::Bot::new(opts.tg_cfg.token.clone());

    let bot: Bot = downloader
        .clone()
        .throttle(Default::default())
        .parse_mode(ParseMode::MarkdownV2)
        .cache_me()
        .trace(teloxide::adaptors::trace::Settings::all());

    let mut di = DependencyMap::new();

    di.insert(Arc::new(Ctx {
        bot: bot.clone(),
        downloader,
        cfg: Arc::new(opts.tg_cfg),
        checker: opts.checker_cfg,
        db: opts.db,
        runs: RunRegistry::default(),
        directory: tokio::sync::Mutex::new(TgChannelDirectory::new(bot.clone())),
    }));

    info!("Starting bot...");

    bot.set_my_commands(cmd::regular::Cmd::bot_commands())
        .await?;

    let handler = dptree::entry()
        .inspect(|update: Update| {
            metrics::increment_counter!(
                "tg_updates_total",
                "kind" => update.kind.discriminator(),
            );
            trace!(
                target: "tg_update",
                "{}",
                serde_json::to_string_pretty(&update)
                    .unwrap_or_else(|err| format!("{{unserializable update: {err}}}")),
            );
        })
        .branch(
            Update::filter_message()
                .inspect_async(track_sender)
                .branch(
                    dptree::entry()
                        .filter_command::<cmd::regular::Cmd>()
                        .endpoint(cmd::handle::<cmd::regular::Cmd>()),
                )
                .branch(
                    dptree::entry()
                        .filter_command::<cmd::StartCommand>()
                        .endpoint(cmd::handle::<cmd::StartCommand>()),
                )
                .branch(
                    dptree::entry()
                        .filter_command::<cmd::maintainer::Cmd>()
                        .chain(dptree::filter(cmd::maintainer::filter))
                        .endpoint(cmd::handle::<cmd::maintainer::Cmd>()),
                )
                .branch(
                    dptree::entry()
                        .filter_command::<cmd::maintainer::Cmd>()
                        .endpoint(cmd::maintainer::handle_unauthorized),
                )
                .branch(
                    dptree::filter_map(submission::filter_document)
                        .endpoint(submission::handle_document),
                )
                .branch(
                    dptree::filter(submission::filter_text_with_usernames)
                        .endpoint(submission::handle_text),
                ),
        )
        .branch(Update::filter_callback_query().endpoint(callback::handle_callback_query))
        .inspect(|update: Update| {
            metrics::increment_counter!(
                "tg_updates_skipped_total",
                "kind" => update.kind.discriminator(),
            );
        });

    Dispatcher::builder(bot, handler)
        .dependencies(di)
        // We don't handle all possible messages that users send,
        // so to suppress the warning that we don't do this we have
        // a noop default handler here
        .default_handler(|_| std::future::ready(()))
        .error_handler(LoggingErrorHandler::with_custom_text(
            "Update handler returned an error",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Bot stopped");

    Ok(())
}

/// Remembers everyone who writes to the bot
async fn track_sender(ctx: Arc<Ctx>, msg: Message) {
    let Some(sender) = &msg.from else {
        return;
    };

    let result: Result = async {
        let user = db::TgUser::from_tg_api(sender)?;
        ctx.db.tg_users.observe(&user).await
    }
    .await;

    if let Err(err) = result {
        warn!(
            err = tracing_err(&err),
            sender = %sender.debug_id(),
            "Failed to remember the sender"
        );
    }
}

/// Best effort attempt to tell the user that their request failed
pub(crate) async fn reply_with_error(ctx: &Ctx, msg: &Message, err: &Error) {
    let span = warn_span!("err", err = tracing_err(err), id = err.id());
    async {
        if !err.is_user_error() {
            warn!("Request handler returned an error");
        }

        let reply_msg = markdown::code_block(&err.display_chain().to_string());

        let msg_result = ctx.bot.reply_text(msg, reply_msg).await;

        if let Err(err) = msg_result {
            warn!(
                err = tracing_err(&err),
                "Failed to reply with the error message to the user"
            );
        }
    }
    .instrument(span)
    .await;
}
