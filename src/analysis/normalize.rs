//! Normalization, deduplication and deterministic fallback results.

use std::collections::HashSet;

use super::types::{AnalysisSource, BugAnalysis, TestCase};

/// Placeholder step for test cases the model returned without steps
pub const PLACEHOLDER_STEP: &str = "See actual result";

/// Longest bug title derived from a user description (in characters)
pub const MAX_DERIVED_TITLE_CHARS: usize = 120;

/// A clause break must sit at or after this character offset to end the title
const MIN_CLAUSE_OFFSET: usize = 10;

/// Remove test cases whose trimmed (title, expected, actual) repeats an
/// earlier one. Entries with all three fields empty are always kept.
pub fn deduplicate_test_cases(cases: Vec<TestCase>) -> Vec<TestCase> {
    if cases.len() <= 1 {
        return cases;
    }

    let mut seen: HashSet<(String, String, String)> = HashSet::with_capacity(cases.len());
    cases
        .into_iter()
        .filter(|tc| {
            let (title, expected, actual) = tc.dedup_key();
            if title.is_empty() && expected.is_empty() && actual.is_empty() {
                return true;
            }
            seen.insert((title.to_string(), expected.to_string(), actual.to_string()))
        })
        .collect()
}

/// Apply the success postconditions to a freshly decoded analysis:
/// every test case has steps, the title is non-empty and there is at least
/// one test case.
pub fn normalize_decoded(
    mut analysis: BugAnalysis,
    source: AnalysisSource,
    description: Option<&str>,
) -> BugAnalysis {
    for tc in &mut analysis.test_cases {
        if tc.steps.is_empty() {
            tc.steps = vec![PLACEHOLDER_STEP.to_string()];
        }
    }

    if analysis.bug_title.trim().is_empty() {
        analysis.bug_title = match source {
            AnalysisSource::Image => "Bug found based on screenshot analysis",
            AnalysisSource::Text | AnalysisSource::Edit => "Bug found based on textual description",
        }
        .to_string();
    }

    analysis.test_cases = deduplicate_test_cases(analysis.test_cases);
    if analysis.test_cases.is_empty() {
        analysis.test_cases = vec![default_test_case(source, description)];
    }

    analysis
}

fn default_test_case(source: AnalysisSource, description: Option<&str>) -> TestCase {
    match source {
        AnalysisSource::Image => TestCase {
            id: "TC-001".to_string(),
            title: "Verify visual appearance of the UI element on the screenshot".to_string(),
            steps: vec![
                "Open the screen shown on the screenshot".to_string(),
                "Check that key UI elements are fully visible and readable".to_string(),
            ],
            expected: "UI elements are fully visible, readable and not overlapping or truncated"
                .to_string(),
            actual: "There is a visual problem on the screen according to the screenshot"
                .to_string(),
            priority: "Medium".to_string(),
            severity: "Major".to_string(),
            ..Default::default()
        },
        AnalysisSource::Text | AnalysisSource::Edit => TestCase {
            id: "TC-001".to_string(),
            title: "Verify behaviour described in the bug report".to_string(),
            steps: vec![
                "Follow the steps from the tester description".to_string(),
                "Observe the behaviour that should be fixed".to_string(),
            ],
            expected: "The application behaves according to the functional requirements"
                .to_string(),
            actual: description.unwrap_or_default().trim().to_string(),
            priority: "Medium".to_string(),
            severity: "Major".to_string(),
            ..Default::default()
        },
    }
}

/// Generic template shown when the analyzer is unavailable.
pub fn fallback_template() -> BugAnalysis {
    BugAnalysis {
        bug_title: "Sample bug / test case template".to_string(),
        test_cases: vec![TestCase {
            id: "TC-001".to_string(),
            title: "Verify the reported issue on the screenshot / description".to_string(),
            preconditions: vec![
                "Application is open".to_string(),
                "User has reproduced the bug".to_string(),
            ],
            steps: vec![
                "Open the affected screen".to_string(),
                "Perform the steps that trigger the bug".to_string(),
                "Observe the result".to_string(),
            ],
            expected: "Expected correct behaviour according to requirements".to_string(),
            actual: "Actual behaviour (describe what you see)".to_string(),
            priority: "Medium".to_string(),
            severity: "Major".to_string(),
        }],
    }
}

/// Build test cases from the user's own words when the analyzer is
/// unavailable. The description is kept verbatim as the actual result.
pub fn fallback_from_description(description: &str) -> BugAnalysis {
    let desc = description.trim();
    if desc.is_empty() {
        return fallback_template();
    }

    BugAnalysis {
        bug_title: derive_title(desc),
        test_cases: vec![TestCase {
            id: "TC-001".to_string(),
            title: "Verify the reported issue".to_string(),
            preconditions: vec![
                "Application is open".to_string(),
                "User can reproduce the scenario".to_string(),
            ],
            steps: vec![
                "Reproduce the steps from the description".to_string(),
                "Observe the actual behaviour".to_string(),
                "Compare with expected behaviour".to_string(),
            ],
            expected: "Behaviour matches requirements and user expectations".to_string(),
            actual: desc.to_string(),
            priority: "Medium".to_string(),
            severity: "Major".to_string(),
        }],
    }
}

/// Wrap model output that carried no usable JSON so a human can review it.
pub fn fallback_from_raw(raw: &str) -> BugAnalysis {
    let raw = raw.trim();
    let actual = if raw.is_empty() {
        "Model returned an empty response."
    } else {
        raw
    };

    BugAnalysis {
        bug_title: "Bug description from model (unstructured)".to_string(),
        test_cases: vec![TestCase {
            id: "TC-RAW-001".to_string(),
            title: "Review bug description generated by the model".to_string(),
            steps: vec![
                "Review the following description produced by the AI model".to_string(),
                "Convert it into formal test cases if needed".to_string(),
            ],
            expected: "The description below accurately reflects the visible issues on the screenshot"
                .to_string(),
            actual: actual.to_string(),
            priority: "Medium".to_string(),
            severity: "Major".to_string(),
            ..Default::default()
        }],
    }
}

/// Leading clause of a description: up to the first `.` or newline at or
/// after character offset 10, otherwise the whole text. Capped at 120
/// characters with an ellipsis.
fn derive_title(desc: &str) -> String {
    let clause_end = desc
        .char_indices()
        .enumerate()
        .find(|&(pos, (_, c))| pos >= MIN_CLAUSE_OFFSET && (c == '.' || c == '\n'))
        .map(|(_, (byte_idx, _))| byte_idx);

    let title = match clause_end {
        Some(end) => desc[..end].trim(),
        None => desc,
    };
    truncate_chars(title, MAX_DERIVED_TITLE_CHARS)
}

/// Truncate to at most `max` characters, marking the cut with "...".
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
