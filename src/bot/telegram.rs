//! Telegram Bot API transport.
//!
//! Talks to the Bot API directly over reqwest:
//! - `getUpdates` long polling with a moving offset
//! - `sendMessage` / `editMessageText` for replies and progress updates
//! - `getFile` plus a file download for photos and image documents
//!
//! Photos use the largest available size. Documents are only treated as
//! screenshots when their MIME type is PNG or JPEG.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::transport::{
    ChatId, ChatTransport, ImageHandle, InboundMessage, MessageId, Payload, ReplyAnchor,
    TransportError, TransportResult, parse_command,
};
use crate::config;

/// Seconds the server holds a `getUpdates` request open
pub const LONG_POLL_TIMEOUT: u64 = 30;

/// Timeout for every other API call (seconds)
const REQUEST_TIMEOUT: u64 = 30;

/// MIME types accepted from documents
const IMAGE_MIME_TYPES: [&str; 2] = ["image/png", "image/jpeg"];

// ============================================================================
// Bot API wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

/// Identity returned by `getMe`
#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: ChatId,
}

#[derive(Debug, Deserialize)]
struct PhotoSize {
    file_id: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

#[derive(Debug, Deserialize)]
struct Document {
    file_id: String,
    #[serde(default)]
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Message {
    message_id: MessageId,
    chat: Chat,
    #[serde(default)]
    from: Option<BotUser>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    photo: Vec<PhotoSize>,
    #[serde(default)]
    document: Option<Document>,
    #[serde(default)]
    reply_to_message: Option<Box<Message>>,
}

#[derive(Debug, Deserialize)]
struct File {
    #[serde(default)]
    file_path: Option<String>,
}

#[derive(Serialize)]
struct GetUpdates<'a> {
    offset: i64,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

fn is_image_document(document: &Document) -> bool {
    document
        .mime_type
        .as_deref()
        .is_some_and(|mime| IMAGE_MIME_TYPES.contains(&mime))
}

/// Convert a Bot API message into a transport message
fn to_inbound(message: Message) -> InboundMessage {
    let reply_to = message.reply_to_message.map(|replied| ReplyAnchor {
        from_bot: replied.from.as_ref().is_some_and(|user| user.is_bot),
        text: replied.text.unwrap_or_default(),
    });

    let largest_photo = message
        .photo
        .into_iter()
        .max_by_key(|size| u64::from(size.width) * u64::from(size.height));

    let payload = if let Some(photo) = largest_photo {
        Payload::Image(ImageHandle::Remote(photo.file_id))
    } else if let Some(document) = message.document.filter(is_image_document) {
        Payload::Image(ImageHandle::Remote(document.file_id))
    } else {
        match message.text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => match parse_command(text) {
                Some(command) => Payload::Command(command),
                None => Payload::Text(text.to_string()),
            },
            _ => Payload::Unsupported,
        }
    };

    InboundMessage {
        chat_id: message.chat.id,
        payload,
        reply_to,
    }
}

// ============================================================================
// Transport
// ============================================================================

#[derive(Default)]
struct PollState {
    offset: i64,
    pending: VecDeque<InboundMessage>,
}

/// Chat transport backed by the Telegram Bot API
pub struct TelegramTransport {
    api_url: String,
    token: String,
    client: reqwest::Client,
    poll: Mutex<PollState>,
}

impl TelegramTransport {
    /// Transport for `token` against the configured Bot API URL
    pub fn new(token: impl Into<String>) -> TransportResult<Self> {
        Self::with_api_url(token, config::get().bot.telegram_api_url.clone())
    }

    pub fn with_api_url(
        token: impl Into<String>,
        api_url: impl Into<String>,
    ) -> TransportResult<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(TransportError::Api("bot token is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT))
            .build()?;
        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
            client,
            poll: Mutex::new(PollState::default()),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_url, self.token, file_path)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &impl Serialize,
        timeout: Duration,
    ) -> TransportResult<T> {
        let response = self
            .client
            .post(self.method_url(method))
            .timeout(timeout)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let envelope: ApiResponse<T> = response.json().await?;

        if !envelope.ok {
            return Err(TransportError::Api(format!(
                "{} failed ({}): {}",
                method,
                status.as_u16(),
                envelope.description.unwrap_or_default()
            )));
        }
        envelope
            .result
            .ok_or_else(|| TransportError::Api(format!("{} returned no result", method)))
    }

    /// Verify the token and return the bot's identity
    pub async fn get_me(&self) -> TransportResult<BotUser> {
        let me: BotUser = self
            .call("getMe", &json!({}), Duration::from_secs(REQUEST_TIMEOUT))
            .await?;
        info!(username = ?me.username, "authorized with telegram");
        Ok(me)
    }

    /// One long-poll round; queues received messages and advances the offset.
    async fn poll_updates(&self, state: &mut PollState) -> TransportResult<()> {
        let request = GetUpdates {
            offset: state.offset,
            timeout: LONG_POLL_TIMEOUT,
            allowed_updates: &["message"],
        };
        let updates: Vec<Update> = self
            .call(
                "getUpdates",
                &request,
                Duration::from_secs(LONG_POLL_TIMEOUT + REQUEST_TIMEOUT),
            )
            .await?;

        for update in updates {
            state.offset = state.offset.max(update.update_id + 1);
            if let Some(message) = update.message {
                debug!(
                    update_id = update.update_id,
                    message_id = message.message_id,
                    chat_id = message.chat.id,
                    "received message"
                );
                state.pending.push_back(to_inbound(message));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn next_message(
        &self,
        cancel: &CancellationToken,
    ) -> TransportResult<Option<InboundMessage>> {
        let mut state = self.poll.lock().await;
        loop {
            if let Some(message) = state.pending.pop_front() {
                return Ok(Some(message));
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(None),
                polled = self.poll_updates(&mut state) => polled?,
            }
        }
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> TransportResult<MessageId> {
        #[derive(Deserialize)]
        struct Sent {
            message_id: MessageId,
        }

        let sent: Sent = self
            .call(
                "sendMessage",
                &json!({ "chat_id": chat_id, "text": text }),
                Duration::from_secs(REQUEST_TIMEOUT),
            )
            .await?;
        Ok(sent.message_id)
    }

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
    ) -> TransportResult<()> {
        // result is the edited message, or `true` for inline messages
        let _: serde_json::Value = self
            .call(
                "editMessageText",
                &json!({ "chat_id": chat_id, "message_id": message_id, "text": text }),
                Duration::from_secs(REQUEST_TIMEOUT),
            )
            .await?;
        Ok(())
    }

    async fn download_image(&self, file_id: &str) -> TransportResult<Vec<u8>> {
        let file: File = self
            .call(
                "getFile",
                &json!({ "file_id": file_id }),
                Duration::from_secs(REQUEST_TIMEOUT),
            )
            .await?;
        let file_path = file
            .file_path
            .ok_or_else(|| TransportError::Api(format!("file {} has no path", file_id)))?;

        let response = self.client.get(self.file_url(&file_path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Api(format!(
                "file download failed with status {}",
                status.as_u16()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }
}
