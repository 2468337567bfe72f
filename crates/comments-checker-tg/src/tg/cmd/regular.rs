use crate::checker::{RemainingWorkFile, Tallies};
use crate::prelude::*;
use crate::tg::publish::{self, Listing, ListingKind};
use crate::{tg, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use teloxide::utils::markdown;

const BANNER: &str = "\
Welcome to the Channel Comment Checker Bot!

This bot checks if Telegram channels have open comments. \
Send a list of channels or a text file with them, and the bot will check \
whether each channel has a linked discussion chat.

To use the bot:
1. Send a message with a list of channels (e.g. @channel1 @channel2 @channel3)
2. Or, upload a text file containing a list of channels

-------------------------------------------

Добро пожаловать в бот проверки комментариев канала!

Этот бот проверяет, открыты ли комментарии в телеграм-каналах. \
Отправьте список каналов или текстовый файл с ними, и бот проверит, \
есть ли у каждого канала привязанный чат для обсуждений.

Как пользоваться ботом:
1. Отправьте сообщение со списком каналов (например, @channel1 @channel2 @channel3)
2. Или загрузите текстовый файл со списком каналов";

#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "snake_case", description = "Commands:")]
pub(crate) enum Cmd {
    #[command(description = "show the guide")]
    Help,

    #[command(description = "list the channels with open comments from the latest check")]
    Opened,

    #[command(description = "list the channels with closed comments from the latest check")]
    Closed,

    #[command(description = "list the channels that could not be checked")]
    Errors,

    #[command(description = "list the channels that were not checked yet")]
    Unchecked,

    #[command(description = "list the channels checked during the latest check")]
    Checked,
}

#[async_trait]
impl tg::cmd::Command for Cmd {
    async fn handle(self, ctx: &tg::Ctx, msg: &Message) -> Result {
        let chat_id = msg.chat.id;

        let listing = match self {
            Cmd::Help => {
                let help = format!("{BANNER}\n\n{}", Cmd::descriptions());
                ctx.bot.reply_text(msg, markdown::escape(&help)).await?;
                return Ok(());
            }
            Cmd::Opened => last_run_listing(ctx, msg, Listing::opened).await?,
            Cmd::Closed => last_run_listing(ctx, msg, Listing::closed).await?,
            Cmd::Errors => last_run_listing(ctx, msg, Listing::errors).await?,
            Cmd::Unchecked => {
                let lines = RemainingWorkFile::for_chat(&ctx.checker.data_dir, chat_id)
                    .read()
                    .await?;

                Some(Listing {
                    kind: ListingKind::Unchecked,
                    lines,
                })
            }
            Cmd::Checked => Some(Listing::checked(&ctx.runs.checked(chat_id))),
        };

        if let Some(listing) = listing {
            publish::send_listing(ctx, chat_id, Some(msg), &listing).await?;
        }

        Ok(())
    }
}

/// Returns `None` if there were no runs in the chat yet. The user is
/// notified about that right away.
async fn last_run_listing(
    ctx: &tg::Ctx,
    msg: &Message,
    listing: fn(&Tallies) -> Listing,
) -> Result<Option<Listing>> {
    let Some(tallies) = ctx.runs.last_run(msg.chat.id) else {
        let text = "There are no results yet. Send me a list of channels to check first.";
        ctx.bot.reply_text(msg, markdown::escape(text)).await?;
        return Ok(None);
    };

    Ok(Some(listing(&tallies)))
}
