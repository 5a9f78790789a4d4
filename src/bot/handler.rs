//! Bug report bot: routes inbound chat messages to an analyzer.
//!
//! Flow for every analysis (screenshot, description or edit):
//! 1. send a progress message
//! 2. run the analyzer with a per-request cancellation token
//! 3. edit the progress message to "Analysis complete."
//! 4. send the formatted result, or a labeled fallback if the backend failed
//! 5. send the edit prompt; replying to it re-runs a text analysis
//!
//! Each inbound message runs on its own task; a semaphore bounds how many
//! analyses hit the backend at once.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::transport::{
    ChatId, ChatTransport, ImageHandle, InboundMessage, MessageId, Payload, ReplyAnchor,
    TransportResult, split_message,
};
use crate::analysis::normalize::truncate_chars;
use crate::analysis::{
    AnalysisError, AnalysisResult, AnalysisSource, Analyzer, BugAnalysis,
    fallback_from_description, fallback_template, format_bug_analysis,
};
use crate::config::{self, MAX_MESSAGE_UNITS};

// ============================================================================
// Bot texts
// ============================================================================

/// Sent after every result; a reply to it is treated as a correction.
pub const EDIT_PROMPT_TEXT: &str = "✏️ Edit: reply to this message with your corrections or extra details, and I'll regenerate test cases.";

pub const START_TEXT: &str = "Hi! 👋\n\n\
I analyze both screenshots and text descriptions of bugs, and generate functional test cases in English.\n\n\
• Photo — send a screenshot of the bug; I analyze the image and generate test cases.\n\n\
• Text — describe the bug in your own words (any language). I turn your description into test cases with priority and severity.\n\n\
Just send a photo or write a message with the bug description.";

pub const DESCRIBE_TEXT: &str = "Describe the bug in text (you can use any language).\n\n\
For example: what screen, what you did, what you expected, what actually happened. I will analyze it and generate test cases.";

pub const HELP_TEXT: &str = "Commands\n\n\
• /start — welcome and how to use the bot\n\
• /describe — hint for describing a bug in text\n\
• /help — this message\n\n\
Usage\n\n\
• Send a photo (screenshot) — I analyze the image and generate test cases.\n\
• Send text — describe the bug in your own words (any language); I generate test cases with priority and severity.\n\n\
Edit\n\n\
After you get test cases, I send an \"Edit\" message. Reply to it with your corrections or extra details, and I'll regenerate test cases from your text.";

pub const UNKNOWN_COMMAND_TEXT: &str = "Unknown command. Use /start, /describe or /help. You can also send a photo or a text bug description.";

pub const UNSUPPORTED_TEXT: &str =
    "Please send one screenshot of the bug or describe the bug in text.";

pub const EMPTY_EDIT_TEXT: &str =
    "Please reply with your corrections or extra details (non-empty text).";

pub const DOWNLOAD_FAILED_TEXT: &str = "Could not download the image. Please try again.";

pub const INTERNAL_ERROR_TEXT: &str =
    "Internal error. Please try again. (Details are in the bot's log.)";

pub const PROGRESS_IMAGE_TEXT: &str = "Analyzing your screenshot... (this may take 1–2 min)";
pub const PROGRESS_TEXT_TEXT: &str = "Analyzing your description...";
pub const PROGRESS_EDIT_TEXT: &str = "Regenerating test cases from your edit...";
pub const ANALYSIS_COMPLETE_TEXT: &str = "Analysis complete.";

/// Characters of an error message quoted back to the user
const ERROR_HINT_CHARS: usize = 203;

/// Pause after a failed poll before trying again
const POLL_RETRY_DELAY: Duration = Duration::from_secs(1);

/// One analysis request and what to show if it fails
enum Request<'a> {
    Image(&'a [u8]),
    Text(&'a str),
    Edit(&'a str),
}

impl Request<'_> {
    fn source(&self) -> AnalysisSource {
        match self {
            Request::Image(_) => AnalysisSource::Image,
            Request::Text(_) => AnalysisSource::Text,
            Request::Edit(_) => AnalysisSource::Edit,
        }
    }

    fn progress_text(&self) -> &'static str {
        match self {
            Request::Image(_) => PROGRESS_IMAGE_TEXT,
            Request::Text(_) => PROGRESS_TEXT_TEXT,
            Request::Edit(_) => PROGRESS_EDIT_TEXT,
        }
    }

    /// Labeled fallback shown instead of a backend error
    fn fallback_message(&self, err: &AnalysisError) -> String {
        match self {
            Request::Image(_) => format!(
                "Screenshot analysis failed: {}\n\n\
                 Screenshots need a vision model (not a plain text model). Check that:\n\
                 • OLLAMA_MODEL is a vision model, e.g. OLLAMA_MODEL=llava\n\
                 • the model is pulled once: ollama pull llava\n\
                 • Ollama is running (the app or ollama serve)\n\n\
                 Template you can edit:\n\n{}",
                truncate_chars(&err.to_string(), ERROR_HINT_CHARS),
                format_bug_analysis(&fallback_template())
            ),
            Request::Text(description) => format!(
                "Test cases based on your description (AI was unavailable; start Ollama for full analysis):\n\n{}",
                format_bug_analysis(&fallback_from_description(description))
            ),
            Request::Edit(correction) => format!(
                "Test cases based on your edit (AI was unavailable):\n\n{}",
                format_bug_analysis(&fallback_from_description(correction))
            ),
        }
    }
}

/// Whether a reply anchor is the bot's edit prompt
pub fn is_edit_prompt(anchor: &ReplyAnchor) -> bool {
    anchor.from_bot && anchor.text.trim() == EDIT_PROMPT_TEXT
}

/// Chat bot turning screenshots and descriptions into test cases
#[derive(Clone)]
pub struct BugReportBot {
    analyzer: Arc<dyn Analyzer>,
    transport: Arc<dyn ChatTransport>,
    max_concurrency: usize,
}

impl BugReportBot {
    pub fn new(analyzer: Arc<dyn Analyzer>, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            analyzer,
            transport,
            max_concurrency: config::get().bot.max_concurrency,
        }
    }

    /// Limit how many analyses run at once (minimum 1)
    pub fn max_concurrency(mut self, permits: usize) -> Self {
        self.max_concurrency = permits.max(1);
        self
    }

    /// Receive and handle messages until `shutdown` fires or the transport ends.
    ///
    /// In-flight requests get a child token of `shutdown` and are awaited
    /// before returning.
    pub async fn run(&self, shutdown: CancellationToken) {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();
        info!(
            analyzer = self.analyzer.name(),
            max_concurrency = self.max_concurrency,
            "bot started"
        );

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                next = self.transport.next_message(&shutdown) => next,
            };

            let message = match next {
                Ok(Some(message)) => message,
                Ok(None) => {
                    info!("transport closed, stopping bot");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "failed to receive messages");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(POLL_RETRY_DELAY) => continue,
                    }
                }
            };

            let permit = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => permit,
            };
            let Ok(permit) = permit else { break };

            let bot = self.clone();
            let cancel = shutdown.child_token();
            tasks.spawn(async move {
                let _permit = permit;
                let chat_id = message.chat_id;
                if let Err(e) = bot.handle_message(message, &cancel).await {
                    warn!(chat_id, error = %e, "failed to handle message");
                    let _ = bot.transport.send_text(chat_id, INTERNAL_ERROR_TEXT).await;
                }
            });

            while let Some(done) = tasks.try_join_next() {
                if let Err(e) = done {
                    warn!(error = %e, "message task panicked");
                }
            }
        }

        while tasks.join_next().await.is_some() {}
        info!("bot stopped");
    }

    /// Handle one inbound message to completion.
    pub async fn handle_message(
        &self,
        message: InboundMessage,
        cancel: &CancellationToken,
    ) -> TransportResult<()> {
        let chat_id = message.chat_id;

        if let Payload::Command(command) = &message.payload {
            return self.handle_command(chat_id, command).await;
        }

        if message.reply_to.as_ref().is_some_and(is_edit_prompt) {
            let correction = match &message.payload {
                Payload::Text(text) => text.trim(),
                _ => "",
            };
            if correction.is_empty() {
                self.transport.send_text(chat_id, EMPTY_EDIT_TEXT).await?;
                return Ok(());
            }
            return self
                .analyze_and_reply(chat_id, Request::Edit(correction), cancel)
                .await;
        }

        match message.payload {
            Payload::Image(handle) => self.handle_image(chat_id, handle, cancel).await,
            Payload::Text(text) if !text.trim().is_empty() => {
                self.analyze_and_reply(chat_id, Request::Text(text.trim()), cancel)
                    .await
            }
            _ => {
                self.transport.send_text(chat_id, UNSUPPORTED_TEXT).await?;
                Ok(())
            }
        }
    }

    async fn handle_command(&self, chat_id: ChatId, command: &str) -> TransportResult<()> {
        debug!(chat_id, command, "command");
        let text = match command {
            "start" => START_TEXT,
            "describe" | "text" => DESCRIBE_TEXT,
            "help" => HELP_TEXT,
            _ => UNKNOWN_COMMAND_TEXT,
        };
        self.transport.send_text(chat_id, text).await?;
        Ok(())
    }

    async fn handle_image(
        &self,
        chat_id: ChatId,
        handle: ImageHandle,
        cancel: &CancellationToken,
    ) -> TransportResult<()> {
        let bytes = match handle {
            ImageHandle::Bytes(bytes) => bytes,
            ImageHandle::Remote(file_id) => match self.transport.download_image(&file_id).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(chat_id, file_id = %file_id, error = %e, "image download failed");
                    self.transport.send_text(chat_id, DOWNLOAD_FAILED_TEXT).await?;
                    return Ok(());
                }
            },
        };
        self.analyze_and_reply(chat_id, Request::Image(&bytes), cancel)
            .await
    }

    async fn analyze_and_reply(
        &self,
        chat_id: ChatId,
        request: Request<'_>,
        cancel: &CancellationToken,
    ) -> TransportResult<()> {
        let source = request.source();
        let progress = self.send_progress(chat_id, request.progress_text()).await;

        let result: AnalysisResult<BugAnalysis> = match &request {
            Request::Image(bytes) => self.analyzer.analyze_image(bytes, cancel).await,
            Request::Text(text) | Request::Edit(text) => {
                self.analyzer.analyze_text(text, cancel).await
            }
        };

        if let Some(message_id) = progress {
            if let Err(e) = self
                .transport
                .edit_text(chat_id, message_id, ANALYSIS_COMPLETE_TEXT)
                .await
            {
                debug!(chat_id, error = %e, "failed to update progress message");
            }
        }

        let body = match result {
            Ok(analysis) => {
                info!(
                    chat_id,
                    %source,
                    test_cases = analysis.test_cases.len(),
                    "analysis complete"
                );
                format_bug_analysis(&analysis)
            }
            Err(AnalysisError::Cancelled) => {
                info!(chat_id, %source, "analysis cancelled");
                return Ok(());
            }
            Err(e) => {
                warn!(chat_id, %source, error = %e, "analysis failed, sending fallback");
                request.fallback_message(&e)
            }
        };

        self.send_long_text(chat_id, &body).await?;
        self.transport.send_text(chat_id, EDIT_PROMPT_TEXT).await?;
        Ok(())
    }

    async fn send_progress(&self, chat_id: ChatId, text: &str) -> Option<MessageId> {
        match self.transport.send_text(chat_id, text).await {
            Ok(id) => Some(id),
            Err(e) => {
                debug!(chat_id, error = %e, "failed to send progress message");
                None
            }
        }
    }

    async fn send_long_text(&self, chat_id: ChatId, text: &str) -> TransportResult<()> {
        for chunk in split_message(text, MAX_MESSAGE_UNITS) {
            self.transport.send_text(chat_id, &chunk).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_edit_prompt() {
        let anchor = ReplyAnchor {
            from_bot: true,
            text: format!("  {}\n", EDIT_PROMPT_TEXT),
        };
        assert!(is_edit_prompt(&anchor));

        let from_user = ReplyAnchor {
            from_bot: false,
            text: EDIT_PROMPT_TEXT.to_string(),
        };
        assert!(!is_edit_prompt(&from_user));

        let other = ReplyAnchor {
            from_bot: true,
            text: ANALYSIS_COMPLETE_TEXT.to_string(),
        };
        assert!(!is_edit_prompt(&other));
    }

    #[test]
    fn test_image_fallback_is_labeled_template() {
        let err = AnalysisError::BackendHttp {
            status: 500,
            body: "x".repeat(400),
        };
        let message = Request::Image(&[]).fallback_message(&err);
        assert!(message.starts_with("Screenshot analysis failed: backend http 500: "));
        assert!(message.contains("TC-001"));
        assert!(message.contains("Template you can edit:"));
        // error hint is truncated
        assert!(!message.contains(&"x".repeat(300)));
    }

    #[test]
    fn test_text_and_edit_fallbacks_use_description() {
        let err = AnalysisError::Cancelled;
        let text = Request::Text("Cart total is wrong after removing an item")
            .fallback_message(&err);
        assert!(text.starts_with("Test cases based on your description"));
        assert!(text.contains("Cart total is wrong after removing an item"));

        let edit = Request::Edit("Also happens on iOS").fallback_message(&err);
        assert!(edit.starts_with("Test cases based on your edit"));
        assert!(edit.contains("Also happens on iOS"));
    }
}
