//! Rendering a [`BugAnalysis`] as a chat-ready text block.

use std::fmt::Write;

use super::normalize::deduplicate_test_cases;
use super::types::{BugAnalysis, TestCase};

/// Header line of every formatted report
pub const REPORT_HEADER: &str = "Automatically generated test cases for the detected bug";

const SEPARATOR: &str = "────────────────────";

/// Format an analysis for display. Duplicated test cases are dropped first.
pub fn format_bug_analysis(analysis: &BugAnalysis) -> String {
    let cases = deduplicate_test_cases(analysis.test_cases.clone());

    let mut out = String::new();
    out.push_str(REPORT_HEADER);
    out.push_str("\n\n");
    let _ = writeln!(out, "Bug: {}", analysis.bug_title);
    out.push('\n');

    for (idx, tc) in cases.iter().enumerate() {
        write_test_case(&mut out, idx + 1, tc);
    }

    out
}

fn write_test_case(out: &mut String, number: usize, tc: &TestCase) {
    out.push_str(SEPARATOR);
    out.push('\n');
    if tc.id.is_empty() {
        let _ = writeln!(out, "Test case #{}", number);
    } else {
        let _ = writeln!(out, "Test case {} #{}", tc.id, number);
    }
    if !tc.title.is_empty() {
        let _ = writeln!(out, "{}", tc.title);
    }

    if !tc.preconditions.is_empty() {
        out.push_str("\nPreconditions:\n");
        for p in &tc.preconditions {
            let _ = writeln!(out, "- {}", p);
        }
    }

    if !tc.steps.is_empty() {
        out.push_str("\nSteps:\n");
        for (i, step) in tc.steps.iter().enumerate() {
            let _ = writeln!(out, "{}) {}", i + 1, step);
        }
    }

    if !tc.expected.is_empty() {
        let _ = writeln!(out, "\nExpected result:\n{}", tc.expected);
    }

    if !tc.actual.is_empty() {
        let _ = writeln!(out, "\nActual result:\n{}", tc.actual);
    }

    if !tc.priority.is_empty() || !tc.severity.is_empty() {
        out.push_str("\nPriority / Severity:\n");
        if !tc.priority.is_empty() {
            let _ = writeln!(out, "- Priority: {}", tc.priority);
        }
        if !tc.severity.is_empty() {
            let _ = writeln!(out, "- Severity: {}", tc.severity);
        }
    }

    out.push('\n');
}
