//! Tolerant decoding of the model's JSON into [`BugAnalysis`].
//!
//! Models drift from the requested schema in predictable ways: a list field
//! comes back as a single string, a field is `null`, or a field is missing.
//! Those are accepted here. Anything structurally worse is a decode failure,
//! which callers turn into an unstructured fallback.

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::Deserialize;
use std::fmt;

use super::types::{BugAnalysis, TestCase};

/// A list of strings that also accepts a bare string or `null`.
///
/// - `["a", "b"]` decodes as-is
/// - `"a"` decodes to `["a"]`
/// - `""`, `null` and a missing field decode to `[]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringList(pub Vec<String>);

impl StringList {
    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl<'de> Deserialize<'de> for StringList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StringListVisitor;

        impl<'de> Visitor<'de> for StringListVisitor {
            type Value = StringList;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or an array of strings")
            }

            fn visit_str<E>(self, value: &str) -> Result<StringList, E>
            where
                E: de::Error,
            {
                if value.is_empty() {
                    Ok(StringList::default())
                } else {
                    Ok(StringList(vec![value.to_string()]))
                }
            }

            fn visit_string<E>(self, value: String) -> Result<StringList, E>
            where
                E: de::Error,
            {
                if value.is_empty() {
                    Ok(StringList::default())
                } else {
                    Ok(StringList(vec![value]))
                }
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<StringList, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(item) = seq.next_element::<String>()? {
                    items.push(item);
                }
                Ok(StringList(items))
            }

            fn visit_unit<E>(self) -> Result<StringList, E>
            where
                E: de::Error,
            {
                Ok(StringList::default())
            }

            fn visit_none<E>(self) -> Result<StringList, E>
            where
                E: de::Error,
            {
                Ok(StringList::default())
            }
        }

        deserializer.deserialize_any(StringListVisitor)
    }
}

/// Treat `null` as an empty string.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Treat `null` as an empty list of test cases.
fn lenient_cases<'de, D>(deserializer: D) -> Result<Vec<TestCaseDto>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<TestCaseDto>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Wire shape of the model's answer
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BugAnalysisDto {
    #[serde(default, deserialize_with = "lenient_string")]
    bug_title: String,
    #[serde(default, deserialize_with = "lenient_cases")]
    test_cases: Vec<TestCaseDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestCaseDto {
    #[serde(default, deserialize_with = "lenient_string")]
    id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    title: String,
    #[serde(default)]
    preconditions: StringList,
    #[serde(default)]
    steps: StringList,
    #[serde(default, deserialize_with = "lenient_string")]
    expected_result: String,
    #[serde(default, deserialize_with = "lenient_string")]
    actual_result: String,
    #[serde(default, deserialize_with = "lenient_string")]
    priority: String,
    #[serde(default, deserialize_with = "lenient_string")]
    severity: String,
}

impl From<TestCaseDto> for TestCase {
    fn from(dto: TestCaseDto) -> Self {
        TestCase {
            id: dto.id,
            title: dto.title,
            preconditions: dto.preconditions.into_inner(),
            steps: dto.steps.into_inner(),
            expected: dto.expected_result,
            actual: dto.actual_result,
            priority: dto.priority,
            severity: dto.severity,
        }
    }
}

impl From<BugAnalysisDto> for BugAnalysis {
    fn from(dto: BugAnalysisDto) -> Self {
        BugAnalysis {
            bug_title: dto.bug_title,
            test_cases: dto.test_cases.into_iter().map(TestCase::from).collect(),
        }
    }
}

/// Decode an extracted JSON object into a raw (not yet normalized) analysis.
pub fn decode_bug_analysis(json: &str) -> Result<BugAnalysis, serde_json::Error> {
    let dto: BugAnalysisDto = serde_json::from_str(json)?;
    Ok(dto.into())
}
