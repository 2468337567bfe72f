//! Rendering of the check results for the chat

use crate::checker::{CheckedChannel, RunOutcome, RunStatus, Tallies};
use crate::prelude::*;
use crate::{tg, Result};
use itertools::Itertools;
use teloxide::prelude::*;
use teloxide::types::InputFile;
use teloxide::utils::markdown;

/// Telegram rejects messages longer than this number of characters
const MAX_MESSAGE_LEN: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum ListingKind {
    Opened,
    Closed,
    Errors,
    Unchecked,
    Checked,
    Users,
}

impl ListingKind {
    fn title(self) -> &'static str {
        match self {
            Self::Opened => "Channels with open comments from the latest check",
            Self::Closed => "Channels with closed comments from the latest check",
            Self::Errors => "Channels that could not be checked in the latest check",
            Self::Unchecked => "Channels that were not checked yet",
            Self::Checked => "Channels checked during the latest check",
            Self::Users => "Users of the bot",
        }
    }

    fn empty_text(self) -> &'static str {
        match self {
            Self::Opened => "No channels with open comments in the latest check.",
            Self::Closed => "No channels with closed comments in the latest check.",
            Self::Errors => "No errors in the latest check.",
            Self::Unchecked => "All channels were checked.",
            Self::Checked => "No channels were checked yet.",
            Self::Users => "No users yet.",
        }
    }
}

/// List of entries of the same kind to show to the user
#[derive(Debug)]
pub(crate) struct Listing {
    pub(crate) kind: ListingKind,
    pub(crate) lines: Vec<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Rendered {
    Text(String),
    Document {
        file_name: String,
        caption: String,
        body: String,
    },
}

impl Listing {
    pub(crate) fn opened(tallies: &Tallies) -> Self {
        Self {
            kind: ListingKind::Opened,
            lines: tallies.opened.clone(),
        }
    }

    pub(crate) fn closed(tallies: &Tallies) -> Self {
        Self {
            kind: ListingKind::Closed,
            lines: tallies.closed.clone(),
        }
    }

    pub(crate) fn errors(tallies: &Tallies) -> Self {
        let lines = tallies
            .errors
            .iter()
            .map(|(username, err)| format!("{username}: {err}"))
            .collect();

        Self {
            kind: ListingKind::Errors,
            lines,
        }
    }

    pub(crate) fn checked(checked: &[CheckedChannel]) -> Self {
        Self {
            kind: ListingKind::Checked,
            lines: checked.iter().map(ToString::to_string).collect(),
        }
    }

    /// Listings longer than `export_threshold` are too noisy for a chat
    /// message, so they are rendered as a text file. The same goes for the
    /// listings that don't fit into a single message.
    pub(crate) fn render(&self, export_threshold: usize) -> Rendered {
        let title = self.kind.title();

        if self.lines.is_empty() {
            return Rendered::Text(self.kind.empty_text().to_owned());
        }

        let body = self.lines.iter().join("\n");

        if self.lines.len() <= export_threshold {
            let text = format!("{title}:\n{body}");
            if markdown::escape(&text).chars().count() <= MAX_MESSAGE_LEN {
                return Rendered::Text(text);
            }
        }

        let kind: &str = self.kind.into();

        Rendered::Document {
            file_name: format!("{kind}.txt"),
            caption: format!("{title} ({})", self.lines.len()),
            body: body + "\n",
        }
    }
}

pub(crate) async fn send_listing(
    ctx: &tg::Ctx,
    chat_id: ChatId,
    reply_to: Option<&Message>,
    listing: &Listing,
) -> Result {
    match listing.render(ctx.checker.export_threshold) {
        Rendered::Text(text) => {
            let text = markdown::escape(&text);
            match reply_to {
                Some(msg) => ctx.bot.reply_text(msg, text).await?,
                None => ctx.bot.send_message(chat_id, text).await?,
            };
        }
        Rendered::Document {
            file_name,
            caption,
            body,
        } => {
            debug!(%file_name, lines = listing.lines.len(), "Sending the listing as a file");

            let document = InputFile::memory(body.into_bytes()).file_name(file_name);
            let caption = markdown::escape(&caption);

            match reply_to {
                Some(msg) => ctx.bot.reply_document(msg, document).caption(caption).await?,
                None => {
                    ctx.bot
                        .send_document(chat_id, document)
                        .caption(caption)
                        .await?
                }
            };
        }
    }

    Ok(())
}

/// Reports the results of the run to the user who requested it
pub(crate) async fn send_outcome(ctx: &tg::Ctx, msg: &Message, outcome: &RunOutcome) -> Result {
    ctx.bot
        .reply_text(msg, markdown::escape(&summary(outcome)))
        .await?;

    if outcome.tallies.opened.len() > ctx.checker.export_threshold {
        send_listing(ctx, msg.chat.id, Some(msg), &Listing::opened(&outcome.tallies)).await?;
    }

    Ok(())
}

fn summary(outcome: &RunOutcome) -> String {
    let tallies = &outcome.tallies;

    let mut lines = vec![];

    if outcome.status == RunStatus::Cancelled {
        lines.push("The check was cancelled.".to_owned());
    }

    lines.extend([
        format!("/opened {}", tallies.opened.len()),
        format!("/closed {}", tallies.closed.len()),
        format!("/errors {}", tallies.errors.len()),
    ]);

    if outcome.unchecked > 0 {
        lines.push(format!("/unchecked {}", outcome.unchecked));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{CheckError, Verdict};
    use assert_matches::assert_matches;
    use expect_test::{expect, Expect};
    use std::sync::Arc;

    fn tallies(opened: usize, closed: usize) -> Tallies {
        let mut tallies = Tallies::default();
        for i in 0..opened {
            tallies.record(format!("@open_{i}"), Verdict::Open);
        }
        for i in 0..closed {
            tallies.record(format!("@closed_{i}"), Verdict::Closed);
        }
        tallies
    }

    #[track_caller]
    fn assert_summary(status: RunStatus, tallies: Tallies, unchecked: usize, expected: Expect) {
        let outcome = RunOutcome {
            status,
            tallies: Arc::new(tallies),
            unchecked,
        };
        expected.assert_eq(&summary(&outcome));
    }

    #[test]
    fn completed_summary() {
        let mut tallies = tallies(1, 1);
        tallies.record("@gone".to_owned(), Verdict::Error(CheckError::NotOccupied));

        assert_summary(
            RunStatus::Completed,
            tallies,
            0,
            expect![[r#"
                /opened 1
                /closed 1
                /errors 1"#]],
        );
    }

    #[test]
    fn cancelled_summary() {
        assert_summary(
            RunStatus::Cancelled,
            tallies(2, 0),
            7,
            expect![[r#"
                The check was cancelled.
                /opened 2
                /closed 0
                /errors 0
                /unchecked 7"#]],
        );
    }

    #[test]
    fn deferred_channels_are_mentioned() {
        assert_summary(
            RunStatus::Completed,
            tallies(0, 0),
            50,
            expect![[r#"
                /opened 0
                /closed 0
                /errors 0
                /unchecked 50"#]],
        );
    }

    #[test]
    fn short_listing_is_inline() {
        let mut tallies = tallies(0, 0);
        tallies.record(
            "@weird".to_owned(),
            Verdict::Error(CheckError::ResolutionFailure {
                message: "the resolved chat is not a channel".to_owned(),
            }),
        );

        let rendered = Listing::errors(&tallies).render(50);

        expect![[r#"
            Text(
                "Channels that could not be checked in the latest check:\n@weird: failed to resolve the channel: the resolved chat is not a channel",
            )
        "#]]
        .assert_debug_eq(&rendered);
    }

    #[test]
    fn empty_listing() {
        let rendered = Listing::opened(&Tallies::default()).render(50);
        assert_eq!(
            rendered,
            Rendered::Text("No channels with open comments in the latest check.".to_owned())
        );
    }

    #[test]
    fn long_listing_is_exported() {
        let tallies = tallies(51, 0);

        assert!(matches!(
            Listing::opened(&tallies).render(51),
            Rendered::Text(_)
        ));

        let Rendered::Document {
            file_name,
            caption,
            body,
        } = Listing::opened(&tallies).render(50)
        else {
            panic!("Expected a document");
        };

        assert_eq!(file_name, "opened.txt");
        assert_eq!(
            caption,
            "Channels with open comments from the latest check (51)"
        );
        assert_eq!(body.lines().count(), 51);
        assert!(body.starts_with("@open_0\n@open_1\n"));
    }

    #[test]
    fn listing_over_message_limit_is_exported() {
        let checked: Vec<_> = (0..50)
            .map(|i| CheckedChannel {
                username: format!("@channel_{i}"),
                verdict: Verdict::Error(CheckError::ResolutionFailure {
                    message: "Bad Request: the chat was resolved, but it is not a channel. \
                        Telegram returned a private group instead (id: -1001234567890)"
                        .to_owned(),
                }),
            })
            .collect();

        let rendered = Listing::checked(&checked).render(50);

        assert_matches!(
            rendered,
            Rendered::Document { file_name, body, .. } => {
                assert_eq!(file_name, "checked.txt");
                assert_eq!(body.lines().count(), 50);
            }
        );

        // A handful of the same entries still fit into a message
        assert_matches!(Listing::checked(&checked[..5]).render(50), Rendered::Text(_));
    }
}
