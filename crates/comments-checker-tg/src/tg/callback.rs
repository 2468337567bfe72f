use crate::prelude::*;
use crate::tg::publish::{self, Listing};
use crate::util::DynResult;
use crate::{tg, Error};
use std::str::FromStr;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Actions behind the buttons attached to the progress message.
/// The serialized name of the action is the callback data of the button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum CallbackAction {
    ViewChecked,
    Cancel,
}

impl CallbackAction {
    fn button(self, text: &str) -> InlineKeyboardButton {
        let data: &'static str = self.into();
        InlineKeyboardButton::callback(text, data)
    }
}

pub(crate) fn keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        [CallbackAction::ViewChecked.button("View checked")],
        [CallbackAction::Cancel.button("Cancel")],
    ])
}

#[instrument(skip_all, fields(
    from = %callback_query.from.debug_id(),
    chat = callback_query.message.as_ref()
        .map(|msg| msg.chat().debug_id())
        .as_deref()
        .unwrap_or("{{unknown_chat}}"),
    data = callback_query.data.as_deref(),
))]
pub(crate) async fn handle_callback_query(
    ctx: Arc<tg::Ctx>,
    callback_query: CallbackQuery,
) -> DynResult {
    async {
        debug!("Processing callback query");

        let Some(data) = &callback_query.data else {
            warn!("Received empty callback data");
            return Ok(());
        };

        let Some(msg) = &callback_query.message else {
            warn!("Received empty callback message");
            return Ok(());
        };

        let Ok(action) = CallbackAction::from_str(data) else {
            warn!("Received unknown callback data");
            return Ok(());
        };

        let chat_id = msg.chat().id;

        let notification = match action {
            CallbackAction::Cancel => {
                if ctx.runs.cancel(chat_id) {
                    info!("User cancelled the run");
                    Some("Cancelling the check...")
                } else {
                    Some("There is no check in progress")
                }
            }
            CallbackAction::ViewChecked => {
                let listing = Listing::checked(&ctx.runs.checked(chat_id));
                publish::send_listing(&ctx, chat_id, None, &listing).await?;
                None
            }
        };

        // Removes the loading indicator from the button
        let mut answer = ctx.bot.answer_callback_query(callback_query.id.clone());
        if let Some(notification) = notification {
            answer = answer.text(notification);
        }
        answer.await?;

        Ok::<_, Error>(())
    }
    .await
    .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_data() {
        let data: &'static str = CallbackAction::ViewChecked.into();
        assert_eq!(data, "view_checked");

        let data: &'static str = CallbackAction::Cancel.into();
        assert_eq!(data, "cancel");

        assert_eq!(
            CallbackAction::from_str("cancel").unwrap(),
            CallbackAction::Cancel
        );
        assert!(CallbackAction::from_str("bogus").is_err());
    }
}
