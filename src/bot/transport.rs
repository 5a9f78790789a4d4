//! Chat transport abstraction.
//!
//! A transport delivers inbound messages (commands, text, images, replies)
//! and sends or edits outbound text. The bot logic in [`super::handler`]
//! only talks to this trait, so the console REPL, the Telegram Bot API and
//! in-memory test doubles are interchangeable.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Conversation identifier
pub type ChatId = i64;

/// Outbound message identifier, used for edits and reply correlation
pub type MessageId = i64;

/// Where to get the bytes of an inbound image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageHandle {
    /// Bytes already in memory
    Bytes(Vec<u8>),
    /// Transport-specific file id, fetched with [`ChatTransport::download_image`]
    Remote(String),
}

/// What an inbound message carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Command name, lowercased, without the leading slash or `@bot` suffix
    Command(String),
    /// Plain text
    Text(String),
    /// A screenshot (photo or image document)
    Image(ImageHandle),
    /// Anything else (stickers, non-image documents, empty messages)
    Unsupported,
}

/// The message an inbound message replies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyAnchor {
    /// Whether the replied-to message was sent by the bot
    pub from_bot: bool,
    /// Text of the replied-to message
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    pub payload: Payload,
    pub reply_to: Option<ReplyAnchor>,
}

impl InboundMessage {
    /// Classify raw message text: `/cmd ...` becomes a command, anything else text.
    pub fn from_text(chat_id: ChatId, text: &str) -> Self {
        let payload = match parse_command(text) {
            Some(command) => Payload::Command(command),
            None => Payload::Text(text.to_string()),
        };
        Self {
            chat_id,
            payload,
            reply_to: None,
        }
    }

    pub fn image(chat_id: ChatId, handle: ImageHandle) -> Self {
        Self {
            chat_id,
            payload: Payload::Image(handle),
            reply_to: None,
        }
    }

    pub fn replying_to(mut self, anchor: ReplyAnchor) -> Self {
        self.reply_to = Some(anchor);
        self
    }
}

/// Errors raised by chat transports
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Request failure; the request URL is stripped since Bot API URLs embed the token
    #[error("http error: {0}")]
    Http(reqwest::Error),

    #[error("api error: {0}")]
    Api(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown message id {0}")]
    UnknownMessage(MessageId),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Http(err.without_url())
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Trait for chat transports
///
/// Implementations use interior mutability: the bot shares one transport
/// between concurrently running request tasks.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Wait for the next inbound message; `Ok(None)` means the stream ended.
    async fn next_message(
        &self,
        cancel: &CancellationToken,
    ) -> TransportResult<Option<InboundMessage>>;

    /// Send a text message and return its id
    async fn send_text(&self, chat_id: ChatId, text: &str) -> TransportResult<MessageId>;

    /// Replace the text of a previously sent message
    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
    ) -> TransportResult<()>;

    /// Fetch the bytes of a [`ImageHandle::Remote`] image
    async fn download_image(&self, file_id: &str) -> TransportResult<Vec<u8>>;
}

/// Parse `/command args` into a lowercased command name.
///
/// `/help@my_bot` yields `help`. A lone `/` or text not starting with `/`
/// is not a command.
pub fn parse_command(text: &str) -> Option<String> {
    let rest = text.trim_start().strip_prefix('/')?;
    let token = rest.split_whitespace().next()?;
    let name = token.split('@').next().unwrap_or(token);
    if name.is_empty() {
        return None;
    }
    Some(name.to_lowercase())
}

/// Split text into chunks of at most `max_units` UTF-16 code units.
///
/// Telegram measures message length in UTF-16 units, so characters outside
/// the BMP (most emoji) count twice. A chunk that would be cut mid-text
/// ends at its last newline instead (newline included) when that newline
/// lies in the second half of the chunk; otherwise it is cut hard at the
/// limit. Chunks never split a character and always hold at least one.
/// Empty text yields no chunks.
pub fn split_message(text: &str, max_units: usize) -> Vec<String> {
    let max_units = max_units.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let mut units = 0;
        let mut hard_end = rest.len();
        let mut last_newline = None;
        for (idx, c) in rest.char_indices() {
            if idx > 0 && units + c.len_utf16() > max_units {
                hard_end = idx;
                break;
            }
            if c == '\n' {
                last_newline = Some((idx, units));
            }
            units += c.len_utf16();
        }

        let end = match last_newline {
            Some((idx, offset)) if hard_end < rest.len() && offset > max_units / 2 => idx + 1,
            _ => hard_end,
        };

        chunks.push(rest[..end].to_string());
        rest = &rest[end..];
    }

    chunks
}
