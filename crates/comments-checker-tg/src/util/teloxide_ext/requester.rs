//! Rust analyzer is very slow on processing requester extension here, so extracted
//! it to a separate module to limit the scope of analysis.

use easy_ext::ext;
use teloxide::payloads::{SendDocumentSetters as _, SendMessageSetters as _};
use teloxide::requests::Requester;
use teloxide::types::{InputFile, Message, ReplyParameters};

/// There is [`RequesterExt`] in [`teloxide::prelude`]. We name this symbol
/// different to avoid collisions.
///
/// [`RequesterExt`]: teloxide::prelude::RequesterExt
#[ext(UtilRequesterExt)]
pub(crate) impl<T: Requester> T {
    /// Reply to the message with a text. The reply is still sent even if the
    /// original message was deleted by the time of the reply.
    fn reply_text(&self, msg: &Message, text: impl Into<String>) -> Self::SendMessage {
        self.send_message(msg.chat.id, text)
            .reply_parameters(reply_parameters(msg))
    }

    /// Same as [`UtilRequesterExt::reply_text`], but replies with a document.
    fn reply_document(&self, msg: &Message, document: InputFile) -> Self::SendDocument {
        self.send_document(msg.chat.id, document)
            .reply_parameters(reply_parameters(msg))
    }
}

fn reply_parameters(msg: &Message) -> ReplyParameters {
    ReplyParameters {
        allow_sending_without_reply: Some(true),
        ..ReplyParameters::new(msg.id)
    }
}
