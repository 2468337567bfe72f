use crate::db::TgUser;
use crate::prelude::*;
use crate::tg::publish::{self, Listing, ListingKind};
use crate::util::DynResult;
use crate::{tg, Result};
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use teloxide::utils::markdown;

#[derive(BotCommands, Clone, Debug)]
#[command(
    rename_rule = "snake_case",
    description = "Commands for bot maintainer only:"
)]
pub(crate) enum Cmd {
    #[command(description = "list all users that have ever written to the bot")]
    ListUsers,
}

#[async_trait]
impl tg::cmd::Command for Cmd {
    async fn handle(self, ctx: &tg::Ctx, msg: &Message) -> Result {
        match self {
            Cmd::ListUsers => {
                let users = ctx.db.tg_users.get_all().await?;

                info!(users = users.len(), "Listing users");

                let listing = Listing {
                    kind: ListingKind::Users,
                    lines: users.iter().map(describe_user).collect(),
                };

                publish::send_listing(ctx, msg.chat.id, Some(msg), &listing).await?;
            }
        }
        Ok(())
    }
}

fn describe_user(user: &TgUser) -> String {
    let mut name = user.first_name.clone();

    if let Some(last_name) = &user.last_name {
        name.push(' ');
        name.push_str(last_name);
    }

    match &user.username {
        Some(username) => format!("{} | @{username} | {name}", user.id),
        None => format!("{} | {name}", user.id),
    }
}

pub(crate) fn filter(ctx: Arc<tg::Ctx>, msg: Message) -> bool {
    matches!(&msg.from, Some(sender) if sender.id == ctx.cfg.maintainer)
}

pub(crate) async fn handle_unauthorized(ctx: Arc<tg::Ctx>, msg: Message) -> DynResult {
    info!(
        sender = msg.from.as_ref().map(|user| user.debug_id()).as_deref(),
        "Rejected a maintainer command"
    );

    ctx.bot
        .reply_text(&msg, markdown::escape(UNAUTHORIZED))
        .await?;

    Ok(())
}

const UNAUTHORIZED: &str = "You are not authorized to use this command.";
