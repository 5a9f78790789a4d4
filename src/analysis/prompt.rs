//! Prompts sent to the generative backend.

/// JSON shape every prompt asks for
const SCHEMA: &str = r#"{
  "bugTitle": "string (short, specific: e.g. 'Save button truncated on Settings screen')",
  "testCases": [
    {
      "id": "TC-001",
      "title": "string (specific: what to verify)",
      "preconditions": ["string (e.g. User is on Settings screen)"],
      "steps": ["string (concrete action 1)", "string (concrete action 2)"],
      "expectedResult": "string (what should happen, specific)",
      "actualResult": "string (what is wrong, specific)",
      "priority": "High | Medium | Low",
      "severity": "Critical | Major | Minor | Trivial"
    }
  ]
}"#;

const SPECIFICITY_EXAMPLES: &str = "BE SPECIFIC - bad vs good:
- BAD steps: \"Open the affected screen\", \"Perform the steps\", \"Observe the result\".
- GOOD steps: \"Open the Login screen\", \"Click the 'Submit' button\", \"Check that the 'Save' button in the footer is visible\".
- BAD expected: \"Expected correct behaviour\".
- GOOD expected: \"The Save button is visible and clicking it saves the form\".
- BAD actual: \"Actual behaviour (describe what you see)\".
- GOOD actual: \"The Save button is cut off on the right and cannot be clicked\".";

const PRIORITY_RULES: &str = "- priority: High = must fix now, Medium = important but not blocking, Low = nice to have.
- severity: Critical, Major, Minor or Trivial, by impact on functionality and users.";

/// Prompt for analyzing a UI screenshot.
pub fn build_image_prompt() -> String {
    format!(
        "You are a senior QA engineer. Analyze this UI screenshot and write CONCRETE, SPECIFIC test cases.

WHAT TO DO:
1) Look at the screenshot and name what you see: app/screen name, buttons, labels, fields, messages, layout.
2) For each clear bug (broken button, wrong text, overlap, missing element, error message, wrong layout): write one test case with SPECIFIC steps and SPECIFIC expected vs actual.

{examples}

Return STRICT JSON ONLY in ENGLISH (no markdown, no explanations, no other text):
{schema}

Rules:
- 2-6 test cases when several distinct issues are visible. Each step and expected/actual must describe what is VISIBLE on the screenshot (names of buttons, labels, error text).
- All text in English only.
{rules}
- Ignore pure accessibility (contrast, ARIA) unless it breaks normal use.
",
        examples = SPECIFICITY_EXAMPLES,
        schema = SCHEMA,
        rules = PRIORITY_RULES,
    )
}

/// Prompt for analyzing a free-text bug description.
///
/// The description is appended verbatim; it may be in any language.
pub fn build_text_prompt(description: &str) -> String {
    format!(
        "You are a senior QA engineer specializing in functional testing and UI/UX (NOT accessibility).
You will receive a free-text bug description from a tester (it may be in English or another language).
First, understand and mentally translate the description into English.
Then identify ALL clear functional, visual, layout and content issues described.
Ignore accessibility-only concerns (contrast, focus order, screen reader labels, ARIA roles) unless they clearly break functional behaviour for all users.

{examples}

Return STRICT JSON ONLY in ENGLISH (no markdown, no explanations, no extra text) with this schema:
{schema}

Rules:
- Provide multiple test cases (2-6) covering ALL clearly described functional / UI / layout / content issues.
- All text MUST be in English only.
{rules}

Bug description from tester:
{description}
",
        examples = SPECIFICITY_EXAMPLES,
        schema = SCHEMA,
        rules = PRIORITY_RULES,
        description = description,
    )
}
