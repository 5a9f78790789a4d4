//! Chat bot delivering bug analyses over a chat transport.

pub mod console;
pub mod handler;
pub mod telegram;
pub mod transport;

pub use console::{CONSOLE_CHAT_ID, ConsoleTransport};
pub use handler::{BugReportBot, EDIT_PROMPT_TEXT, is_edit_prompt};
pub use telegram::{BotUser, TelegramTransport};
pub use transport::{
    ChatId, ChatTransport, ImageHandle, InboundMessage, MessageId, Payload, ReplyAnchor,
    TransportError, TransportResult, parse_command, split_message,
};
