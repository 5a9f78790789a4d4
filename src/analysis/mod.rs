pub mod backend;
pub mod decode;
pub mod extract;
pub mod format;
pub mod image;
pub mod normalize;
pub mod ollama;
pub mod prompt;
pub mod types;

pub use backend::{Analyzer, MockAnalyzer};
pub use decode::{StringList, decode_bug_analysis};
pub use extract::{extract_first_json_object, extract_json_payload, strip_markdown_code_block};
pub use format::format_bug_analysis;
pub use image::{ImagePrepError, prepare_image};
pub use normalize::{
    deduplicate_test_cases, fallback_from_description, fallback_from_raw, fallback_template,
};
pub use ollama::{OllamaAnalyzer, OllamaConfig, parse_model_response};
pub use types::{AnalysisError, AnalysisResult, AnalysisSource, BugAnalysis, TestCase};
