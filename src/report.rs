//! Serializable result of one analysis run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{
    AnalysisResult, AnalysisSource, BugAnalysis, fallback_from_description, fallback_template,
};

/// Outcome of analyzing one screenshot or description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Which entry point produced the analysis
    pub source: AnalysisSource,

    /// Image path or description that was analyzed
    pub input: String,

    /// Backend name ("mock", "ollama")
    pub backend: String,

    /// When the analysis finished
    pub generated_at: DateTime<Utc>,

    /// Whether the backend produced the analysis
    pub success: bool,

    /// Backend error if it failed; `analysis` is then a fallback
    pub error: Option<String>,

    pub analysis: BugAnalysis,
}

impl AnalysisReport {
    /// Build a report, replacing a failed analysis with the matching fallback.
    ///
    /// Screenshots fall back to the generic template; descriptions and
    /// edits to test cases built from the text itself.
    pub fn from_outcome(
        source: AnalysisSource,
        backend: &str,
        input: impl Into<String>,
        outcome: AnalysisResult<BugAnalysis>,
    ) -> Self {
        let input = input.into();
        let (success, error, analysis) = match outcome {
            Ok(analysis) => (true, None, analysis),
            Err(e) => {
                let fallback = match source {
                    AnalysisSource::Image => fallback_template(),
                    AnalysisSource::Text | AnalysisSource::Edit => {
                        fallback_from_description(&input)
                    }
                };
                (false, Some(e.to_string()), fallback)
            }
        };

        Self {
            source,
            input,
            backend: backend.to_string(),
            generated_at: Utc::now(),
            success,
            error,
            analysis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisError;

    #[test]
    fn test_failed_image_report_uses_template() {
        let report = AnalysisReport::from_outcome(
            AnalysisSource::Image,
            "ollama",
            "shot.png",
            Err(AnalysisError::EmptyInput("image")),
        );
        assert!(!report.success);
        assert_eq!(
            report.error.as_deref(),
            Some("empty input: no image to analyze")
        );
        assert_eq!(report.analysis.test_cases[0].id, "TC-001");
    }

    #[test]
    fn test_failed_text_report_keeps_description() {
        let report = AnalysisReport::from_outcome(
            AnalysisSource::Text,
            "ollama",
            "Search returns no results for exact product names",
            Err(AnalysisError::BackendReported("model not found".to_string())),
        );
        assert!(!report.success);
        assert_eq!(
            report.analysis.test_cases[0].actual,
            "Search returns no results for exact product names"
        );
    }

    #[test]
    fn test_report_serializes() {
        let report = AnalysisReport::from_outcome(
            AnalysisSource::Text,
            "mock",
            "x",
            Ok(BugAnalysis {
                bug_title: "T".to_string(),
                test_cases: vec![],
            }),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["source"], "text");
        assert_eq!(json["success"], true);
        assert_eq!(json["analysis"]["bugTitle"], "T");
        assert!(json["generated_at"].is_string());
    }
}
