//! Interactive console transport.
//!
//! Line grammar:
//! - `/command` runs a bot command
//! - `@<path>` sends the image file at `path`
//! - `>N text` replies to outbound message `N` (ids are printed with each
//!   message; only the most recent ones can be replied to)
//! - anything else is a text bug report
//!
//! Outbound messages are written as `[#id] text`; edits as `[#id edited] text`.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::transport::{
    ChatId, ChatTransport, ImageHandle, InboundMessage, MessageId, ReplyAnchor, TransportError,
    TransportResult,
};

/// Chat id used for the single console conversation
pub const CONSOLE_CHAT_ID: ChatId = 1;

/// Most recent outbound messages kept for `>N` replies and edits
const MAX_TRACKED_MESSAGES: MessageId = 64;

struct Outbox<W> {
    writer: W,
    next_id: MessageId,
    sent: HashMap<MessageId, String>,
}

/// Chat transport over a line-oriented reader and a writer
pub struct ConsoleTransport<R, W> {
    reader: Mutex<R>,
    outbox: Mutex<Outbox<W>>,
}

impl ConsoleTransport<BufReader<Stdin>, Stdout> {
    /// Console transport on the process's stdin/stdout
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> ConsoleTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(reader),
            outbox: Mutex::new(Outbox {
                writer,
                next_id: 1,
                sent: HashMap::new(),
            }),
        }
    }

    /// Consume the transport, returning its reader and writer
    pub fn into_parts(self) -> (R, W) {
        (self.reader.into_inner(), self.outbox.into_inner().writer)
    }

    async fn notice(&self, text: &str) -> TransportResult<()> {
        let mut outbox = self.outbox.lock().await;
        outbox.writer.write_all(format!("! {}\n", text).as_bytes()).await?;
        outbox.writer.flush().await?;
        Ok(())
    }

    /// Turn one input line into a message; `Ok(None)` skips the line.
    async fn parse_line(&self, line: &str) -> TransportResult<Option<InboundMessage>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        if let Some(path) = line.strip_prefix('@') {
            let path = path.trim();
            if path.is_empty() {
                self.notice("usage: @<path to image>").await?;
                return Ok(None);
            }
            return Ok(Some(InboundMessage::image(
                CONSOLE_CHAT_ID,
                ImageHandle::Remote(path.to_string()),
            )));
        }

        if let Some(rest) = line.strip_prefix('>') {
            let (id, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let Ok(id) = id.parse::<MessageId>() else {
                self.notice("usage: >N reply text").await?;
                return Ok(None);
            };
            let anchor = self.outbox.lock().await.sent.get(&id).cloned();
            let Some(anchor_text) = anchor else {
                self.notice(&format!("no message #{}", id)).await?;
                return Ok(None);
            };
            let message = InboundMessage::from_text(CONSOLE_CHAT_ID, text.trim()).replying_to(
                ReplyAnchor {
                    from_bot: true,
                    text: anchor_text,
                },
            );
            return Ok(Some(message));
        }

        Ok(Some(InboundMessage::from_text(CONSOLE_CHAT_ID, line)))
    }
}

#[async_trait]
impl<R, W> ChatTransport for ConsoleTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn next_message(
        &self,
        cancel: &CancellationToken,
    ) -> TransportResult<Option<InboundMessage>> {
        loop {
            let mut line = String::new();
            let read = {
                let mut reader = self.reader.lock().await;
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(None),
                    read = reader.read_line(&mut line) => read?,
                }
            };
            if read == 0 {
                return Ok(None);
            }
            if let Some(message) = self.parse_line(&line).await? {
                return Ok(Some(message));
            }
        }
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> TransportResult<MessageId> {
        if chat_id != CONSOLE_CHAT_ID {
            return Err(TransportError::Api(format!("unknown chat {}", chat_id)));
        }
        let mut outbox = self.outbox.lock().await;
        let id = outbox.next_id;
        outbox.next_id += 1;
        outbox.sent.insert(id, text.to_string());
        outbox.sent.remove(&(id - MAX_TRACKED_MESSAGES));
        outbox
            .writer
            .write_all(format!("[#{}] {}\n", id, text).as_bytes())
            .await?;
        outbox.writer.flush().await?;
        Ok(id)
    }

    async fn edit_text(
        &self,
        _chat_id: ChatId,
        message_id: MessageId,
        text: &str,
    ) -> TransportResult<()> {
        let mut outbox = self.outbox.lock().await;
        match outbox.sent.get_mut(&message_id) {
            Some(stored) => *stored = text.to_string(),
            None => return Err(TransportError::UnknownMessage(message_id)),
        }
        outbox
            .writer
            .write_all(format!("[#{} edited] {}\n", message_id, text).as_bytes())
            .await?;
        outbox.writer.flush().await?;
        Ok(())
    }

    async fn download_image(&self, file_id: &str) -> TransportResult<Vec<u8>> {
        let path = PathBuf::from(file_id);
        Ok(tokio::fs::read(&path).await?)
    }
}
