//! Bug Vision - QA test cases from bug screenshots and descriptions.
//!
//! This crate provides:
//! - An `Analyzer` trait with mock and Ollama-backed implementations
//! - Tolerant parsing of model output (fenced JSON, string-or-list fields)
//! - Normalization, deduplication and fallback test case templates
//! - Plain-text formatting of analyses for chat delivery
//! - A chat bot with console and Telegram transports
//! - Synthetic screenshot fixtures for demos and tests
//!
//! # Example
//!
//! ```rust,no_run
//! use bug_vision::analysis::{Analyzer, OllamaAnalyzer, OllamaConfig, format_bug_analysis};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let analyzer = OllamaAnalyzer::new(OllamaConfig::default().model("llava"))?;
//! let screenshot = std::fs::read("bug.png")?;
//! let analysis = analyzer
//!     .analyze_image(&screenshot, &CancellationToken::new())
//!     .await?;
//! println!("{}", format_bug_analysis(&analysis));
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod bot;
pub mod config;
pub mod fixture;
pub mod report;

// Re-export analysis types and backends
pub use analysis::{
    AnalysisError, AnalysisResult, AnalysisSource, Analyzer, BugAnalysis, MockAnalyzer,
    OllamaAnalyzer, OllamaConfig, TestCase, format_bug_analysis,
};

// Re-export bot types
pub use bot::{BugReportBot, ChatTransport, ConsoleTransport, TelegramTransport, TransportError};

// Re-export configuration
pub use config::{AnalysisMode, Config};

// Re-export fixtures and reports
pub use fixture::{FixtureError, ScreenshotCanvas, sample_bug_screenshot};
pub use report::AnalysisReport;
