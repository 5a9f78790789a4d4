//! Core types for bug analysis results.

use serde::{Deserialize, Serialize};

/// One structured verification scenario
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// Identifier such as "TC-001" (not guaranteed unique within a batch)
    pub id: String,

    /// What the test case verifies
    pub title: String,

    /// Conditions that must hold before the steps run
    pub preconditions: Vec<String>,

    /// Ordered reproduction steps
    pub steps: Vec<String>,

    /// Expected behaviour
    #[serde(rename = "expectedResult")]
    pub expected: String,

    /// Observed (buggy) behaviour
    #[serde(rename = "actualResult")]
    pub actual: String,

    /// Business priority, conventionally High / Medium / Low
    pub priority: String,

    /// Impact, conventionally Critical / Major / Minor / Trivial
    pub severity: String,
}

impl TestCase {
    /// Identity used for deduplication: trimmed (title, expected, actual).
    pub(crate) fn dedup_key(&self) -> (&str, &str, &str) {
        (self.title.trim(), self.expected.trim(), self.actual.trim())
    }
}

/// Aggregated analysis of a single bug report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BugAnalysis {
    /// Short summary of the defect
    pub bug_title: String,

    /// Test cases in display order
    pub test_cases: Vec<TestCase>,
}

/// Which analysis entry point produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    /// Screenshot analysis
    Image,
    /// Free-text description
    Text,
    /// Correction replied to an earlier result
    Edit,
}

impl std::fmt::Display for AnalysisSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisSource::Image => write!(f, "image"),
            AnalysisSource::Text => write!(f, "text"),
            AnalysisSource::Edit => write!(f, "edit"),
        }
    }
}

/// Result type for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Errors surfaced by an analyzer.
///
/// Unparseable model output is not in this list: it is absorbed into an
/// unstructured fallback result by the backend itself.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Caller passed no image bytes or a blank description
    #[error("empty input: no {0} to analyze")]
    EmptyInput(&'static str),

    /// Backend could not be reached (connection refused, DNS, timeout)
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Backend answered with a non-2xx status
    #[error("backend http {status}: {body}")]
    BackendHttp { status: u16, body: String },

    /// Backend answered 2xx but reported an error in the payload
    #[error("backend error: {0}")]
    BackendReported(String),

    /// Backend answered 2xx with a body that is not a generate envelope
    #[error("malformed backend response: {0}")]
    MalformedEnvelope(String),

    /// The caller's cancellation token fired before the backend answered
    #[error("analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    /// Whether the request timed out at the transport level.
    pub fn is_timeout(&self) -> bool {
        matches!(self, AnalysisError::Transport(e) if e.is_timeout())
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(err: reqwest::Error) -> Self {
        AnalysisError::Transport(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_case_serializes_wire_names() {
        let tc = TestCase {
            id: "TC-001".to_string(),
            expected: "E".to_string(),
            actual: "A".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&tc).unwrap();
        assert_eq!(json["expectedResult"], "E");
        assert_eq!(json["actualResult"], "A");
        assert!(json.get("expected").is_none());
    }

    #[test]
    fn test_bug_analysis_serializes_camel_case() {
        let analysis = BugAnalysis {
            bug_title: "T".to_string(),
            test_cases: vec![],
        };
        let json = serde_json::to_string(&analysis).unwrap();
        assert_eq!(json, r#"{"bugTitle":"T","testCases":[]}"#);
    }

    #[test]
    fn test_dedup_key_trims() {
        let tc = TestCase {
            title: "  Check  ".to_string(),
            expected: "E\n".to_string(),
            actual: " A".to_string(),
            ..Default::default()
        };
        assert_eq!(tc.dedup_key(), ("Check", "E", "A"));
    }

    #[test]
    fn test_error_display() {
        let err = AnalysisError::EmptyInput("image");
        assert_eq!(err.to_string(), "empty input: no image to analyze");

        let err = AnalysisError::BackendHttp {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "backend http 500: boom");
        assert!(!err.is_timeout());
    }
}
