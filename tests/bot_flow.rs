//! Integration tests for bot routing against an in-memory transport

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use bug_vision::analysis::{
    AnalysisError, AnalysisResult, Analyzer, BugAnalysis, MockAnalyzer, TestCase,
};
use bug_vision::bot::handler::{
    ANALYSIS_COMPLETE_TEXT, DESCRIBE_TEXT, DOWNLOAD_FAILED_TEXT, EMPTY_EDIT_TEXT, HELP_TEXT,
    PROGRESS_EDIT_TEXT, PROGRESS_IMAGE_TEXT, PROGRESS_TEXT_TEXT, START_TEXT,
    UNKNOWN_COMMAND_TEXT, UNSUPPORTED_TEXT,
};
use bug_vision::bot::{
    BugReportBot, ChatId, ChatTransport, EDIT_PROMPT_TEXT, ImageHandle, InboundMessage,
    MessageId, Payload, ReplyAnchor, TransportError, TransportResult,
};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Sent { chat: ChatId, id: MessageId, text: String },
    Edited { chat: ChatId, id: MessageId, text: String },
}

#[derive(Default)]
struct MemoryTransport {
    inbox: Mutex<VecDeque<InboundMessage>>,
    events: Mutex<Vec<Event>>,
    files: HashMap<String, Vec<u8>>,
}

impl MemoryTransport {
    fn with_messages(messages: Vec<InboundMessage>) -> Self {
        Self {
            inbox: Mutex::new(messages.into()),
            ..Default::default()
        }
    }

    async fn events(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }

    async fn sent_texts(&self) -> Vec<String> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|event| match event {
                Event::Sent { text, .. } => Some(text.clone()),
                Event::Edited { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChatTransport for MemoryTransport {
    async fn next_message(
        &self,
        _cancel: &CancellationToken,
    ) -> TransportResult<Option<InboundMessage>> {
        Ok(self.inbox.lock().await.pop_front())
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> TransportResult<MessageId> {
        let mut events = self.events.lock().await;
        let id = events.len() as MessageId + 1;
        events.push(Event::Sent {
            chat: chat_id,
            id,
            text: text.to_string(),
        });
        Ok(id)
    }

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
    ) -> TransportResult<()> {
        self.events.lock().await.push(Event::Edited {
            chat: chat_id,
            id: message_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn download_image(&self, file_id: &str) -> TransportResult<Vec<u8>> {
        self.files
            .get(file_id)
            .cloned()
            .ok_or_else(|| TransportError::Api(format!("no file {}", file_id)))
    }
}

/// Analyzer whose backend is always down
struct FailingAnalyzer;

#[async_trait]
impl Analyzer for FailingAnalyzer {
    async fn analyze_image(
        &self,
        _image: &[u8],
        _cancel: &CancellationToken,
    ) -> AnalysisResult<BugAnalysis> {
        Err(AnalysisError::BackendHttp {
            status: 503,
            body: "loading model".to_string(),
        })
    }

    async fn analyze_text(
        &self,
        _description: &str,
        _cancel: &CancellationToken,
    ) -> AnalysisResult<BugAnalysis> {
        Err(AnalysisError::BackendReported("model not found".to_string()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Analyzer that only finishes when cancelled
struct StalledAnalyzer;

#[async_trait]
impl Analyzer for StalledAnalyzer {
    async fn analyze_image(
        &self,
        _image: &[u8],
        cancel: &CancellationToken,
    ) -> AnalysisResult<BugAnalysis> {
        cancel.cancelled().await;
        Err(AnalysisError::Cancelled)
    }

    async fn analyze_text(
        &self,
        _description: &str,
        cancel: &CancellationToken,
    ) -> AnalysisResult<BugAnalysis> {
        cancel.cancelled().await;
        Err(AnalysisError::Cancelled)
    }

    fn name(&self) -> &str {
        "stalled"
    }
}

/// Analyzer producing a result too long for one chat message
struct VerboseAnalyzer;

#[async_trait]
impl Analyzer for VerboseAnalyzer {
    async fn analyze_image(
        &self,
        _image: &[u8],
        _cancel: &CancellationToken,
    ) -> AnalysisResult<BugAnalysis> {
        unreachable!("text only")
    }

    async fn analyze_text(
        &self,
        _description: &str,
        _cancel: &CancellationToken,
    ) -> AnalysisResult<BugAnalysis> {
        let test_cases = (1..=40)
            .map(|n| TestCase {
                id: format!("TC-{:03}", n),
                title: format!("Verify scenario {} {}", n, "with a long title ".repeat(5)),
                steps: vec!["Open the page".to_string(), "Click the button".to_string()],
                expected: format!("Expected outcome {}", n),
                actual: format!("Actual outcome {}", n),
                priority: "Low".to_string(),
                severity: "Minor".to_string(),
                ..Default::default()
            })
            .collect();
        Ok(BugAnalysis {
            bug_title: "Many scenarios".to_string(),
            test_cases,
        })
    }

    fn name(&self) -> &str {
        "verbose"
    }
}

fn bot(analyzer: impl Analyzer + 'static, transport: &Arc<MemoryTransport>) -> BugReportBot {
    let transport: Arc<dyn ChatTransport> = transport.clone();
    BugReportBot::new(Arc::new(analyzer), transport).max_concurrency(2)
}

fn edit_anchor() -> ReplyAnchor {
    ReplyAnchor {
        from_bot: true,
        text: EDIT_PROMPT_TEXT.to_string(),
    }
}

#[tokio::test]
async fn test_commands_are_routed() {
    let transport = Arc::new(MemoryTransport::default());
    let bot = bot(MockAnalyzer::new(), &transport);
    let cancel = CancellationToken::new();

    for input in ["/start", "/describe", "/text", "/help@bug_bot", "/settings"] {
        bot.handle_message(InboundMessage::from_text(5, input), &cancel)
            .await
            .unwrap();
    }

    assert_eq!(
        transport.sent_texts().await,
        vec![START_TEXT, DESCRIBE_TEXT, DESCRIBE_TEXT, HELP_TEXT, UNKNOWN_COMMAND_TEXT]
    );
}

#[tokio::test]
async fn test_text_report_flow() {
    let transport = Arc::new(MemoryTransport::default());
    let bot = bot(MockAnalyzer::new(), &transport);

    bot.handle_message(
        InboundMessage::from_text(5, "Submit button is cut off on login"),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let events = transport.events().await;
    assert_eq!(events.len(), 4);
    assert_eq!(
        events[0],
        Event::Sent {
            chat: 5,
            id: 1,
            text: PROGRESS_TEXT_TEXT.to_string()
        }
    );
    assert_eq!(
        events[1],
        Event::Edited {
            chat: 5,
            id: 1,
            text: ANALYSIS_COMPLETE_TEXT.to_string()
        }
    );
    match &events[2] {
        Event::Sent { text, .. } => {
            assert!(text.contains("Test case TC-001 #1"));
            assert!(text.contains("Submit button"));
        }
        other => panic!("expected result message, got {:?}", other),
    }
    assert!(matches!(&events[3], Event::Sent { text, .. } if text == EDIT_PROMPT_TEXT));
}

#[tokio::test]
async fn test_reply_to_edit_prompt_regenerates() {
    let transport = Arc::new(MemoryTransport::default());
    let bot = bot(MockAnalyzer::new(), &transport);

    let correction = InboundMessage::from_text(5, "It only happens in dark mode")
        .replying_to(edit_anchor());
    bot.handle_message(correction, &CancellationToken::new())
        .await
        .unwrap();

    let sent = transport.sent_texts().await;
    assert_eq!(sent[0], PROGRESS_EDIT_TEXT);
    assert_eq!(sent.last().map(String::as_str), Some(EDIT_PROMPT_TEXT));
}

#[tokio::test]
async fn test_reply_to_other_message_is_plain_text() {
    let transport = Arc::new(MemoryTransport::default());
    let bot = bot(MockAnalyzer::new(), &transport);

    let reply = InboundMessage::from_text(5, "Crash on save").replying_to(ReplyAnchor {
        from_bot: true,
        text: ANALYSIS_COMPLETE_TEXT.to_string(),
    });
    bot.handle_message(reply, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(transport.sent_texts().await[0], PROGRESS_TEXT_TEXT);
}

#[tokio::test]
async fn test_empty_edit_reply_asks_for_text() {
    let transport = Arc::new(MemoryTransport::default());
    let bot = bot(MockAnalyzer::new(), &transport);

    let reply = InboundMessage::image(5, ImageHandle::Bytes(vec![1, 2, 3]))
        .replying_to(edit_anchor());
    bot.handle_message(reply, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(transport.sent_texts().await, vec![EMPTY_EDIT_TEXT]);
}

#[tokio::test]
async fn test_image_failure_sends_labeled_template() {
    let transport = Arc::new(MemoryTransport::default());
    let bot = bot(FailingAnalyzer, &transport);

    bot.handle_message(
        InboundMessage::image(5, ImageHandle::Bytes(vec![0x89, b'P', b'N', b'G'])),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let sent = transport.sent_texts().await;
    assert_eq!(sent[0], PROGRESS_IMAGE_TEXT);
    assert!(sent[1].starts_with("Screenshot analysis failed: backend http 503: loading model"));
    assert!(sent[1].contains("TC-001"));
    assert_eq!(sent[2], EDIT_PROMPT_TEXT);
}

#[tokio::test]
async fn test_text_failure_sends_description_fallback() {
    let transport = Arc::new(MemoryTransport::default());
    let bot = bot(FailingAnalyzer, &transport);

    let desc = "Login button does nothing when clicked on Android";
    bot.handle_message(InboundMessage::from_text(5, desc), &CancellationToken::new())
        .await
        .unwrap();

    let sent = transport.sent_texts().await;
    assert!(sent[1].starts_with("Test cases based on your description (AI was unavailable"));
    assert!(sent[1].contains(desc));
    assert_eq!(sent[2], EDIT_PROMPT_TEXT);
}

#[tokio::test]
async fn test_remote_image_download() {
    let mut transport = MemoryTransport::default();
    transport
        .files
        .insert("photo-1".to_string(), b"image-bytes".to_vec());
    let transport = Arc::new(transport);
    let bot = bot(MockAnalyzer::new(), &transport);
    let cancel = CancellationToken::new();

    bot.handle_message(
        InboundMessage::image(5, ImageHandle::Remote("photo-1".to_string())),
        &cancel,
    )
    .await
    .unwrap();
    assert_eq!(transport.sent_texts().await[0], PROGRESS_IMAGE_TEXT);

    let missing = Arc::new(MemoryTransport::default());
    let bot = self::bot(MockAnalyzer::new(), &missing);
    bot.handle_message(
        InboundMessage::image(5, ImageHandle::Remote("gone".to_string())),
        &cancel,
    )
    .await
    .unwrap();
    assert_eq!(missing.sent_texts().await, vec![DOWNLOAD_FAILED_TEXT]);
}

#[tokio::test]
async fn test_unsupported_payload() {
    let transport = Arc::new(MemoryTransport::default());
    let bot = bot(MockAnalyzer::new(), &transport);

    for payload in [Payload::Unsupported, Payload::Text("   ".to_string())] {
        let message = InboundMessage {
            chat_id: 5,
            payload,
            reply_to: None,
        };
        bot.handle_message(message, &CancellationToken::new())
            .await
            .unwrap();
    }

    assert_eq!(
        transport.sent_texts().await,
        vec![UNSUPPORTED_TEXT, UNSUPPORTED_TEXT]
    );
}

#[tokio::test]
async fn test_cancelled_analysis_sends_no_result() {
    let transport = Arc::new(MemoryTransport::default());
    let bot = bot(StalledAnalyzer, &transport);
    let cancel = CancellationToken::new();
    cancel.cancel();

    bot.handle_message(InboundMessage::from_text(5, "Page freezes"), &cancel)
        .await
        .unwrap();

    let events = transport.events().await;
    assert_eq!(events.len(), 2, "only progress and its update: {:?}", events);
}

#[tokio::test]
async fn test_long_result_is_chunked() {
    let transport = Arc::new(MemoryTransport::default());
    let bot = bot(VerboseAnalyzer, &transport);

    bot.handle_message(
        InboundMessage::from_text(5, "Everything is broken"),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let sent = transport.sent_texts().await;
    // progress, at least two chunks, edit prompt
    assert!(sent.len() >= 4, "got {} messages", sent.len());
    let chunks = &sent[1..sent.len() - 1];
    assert!(chunks.iter().all(|c| c.encode_utf16().count() <= 4096));
    assert!(chunks.concat().contains("Test case TC-040 #40"));
}

#[tokio::test]
async fn test_run_handles_every_message_then_stops() {
    let messages = vec![
        InboundMessage::from_text(1, "/start"),
        InboundMessage::from_text(1, "Header overlaps the menu"),
        InboundMessage::from_text(2, "Cannot upload avatar"),
        InboundMessage::image(3, ImageHandle::Bytes(vec![1, 2, 3])),
    ];
    let transport = Arc::new(MemoryTransport::with_messages(messages));
    let bot = bot(MockAnalyzer::new(), &transport);

    bot.run(CancellationToken::new()).await;

    let sent = transport.sent_texts().await;
    let prompts = sent.iter().filter(|t| *t == EDIT_PROMPT_TEXT).count();
    assert_eq!(prompts, 3);
    assert_eq!(sent.iter().filter(|t| *t == START_TEXT).count(), 1);
}
