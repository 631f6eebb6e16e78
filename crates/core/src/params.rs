//! Request parameter construction from catalog templates.
//!
//! A definition's `params` is the body of a JSON object with placeholder
//! tokens, e.g. `"startDate":"<start_date>","levelSection":"<class>"`.
//! Tokens are substituted textually, the result is wrapped in braces and
//! parsed, then flattened into the key/value pairs sent to the portal.

use serde_json::{Map, Value};

use crate::catalog::ReportDefinition;
use crate::error::CoreError;
use crate::reports::STUDENT_QUIZ_PERFORMANCE;

/// Discriminator the student-performance endpoint requires.
pub const ASSESSMENT_TYPE_KEY: &str = "assessmentType";

/// Value injected when the template omits [`ASSESSMENT_TYPE_KEY`].
pub const DEFAULT_ASSESSMENT_TYPE: &str = "1";

pub const START_DATE_KEY: &str = "startDate";
pub const END_DATE_KEY: &str = "endDate";

/// Values substituted into a params template.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParamValues<'a> {
    pub class_code: &'a str,
    pub subject_code: &'a str,
    pub start_date: &'a str,
    pub end_date: &'a str,
}

/// Substitute placeholders and parse the template into a parameter object.
pub fn build_params(
    report: &ReportDefinition,
    values: ParamValues<'_>,
) -> Result<Map<String, Value>, CoreError> {
    let template = report.params.trim();
    let mut params = if template.is_empty() {
        Map::new()
    } else {
        let filled = template
            .replace("<start_date>", values.start_date)
            .replace("<end_date>", values.end_date)
            .replace("<class>", values.class_code)
            .replace("<subject>", values.subject_code);
        serde_json::from_str::<Map<String, Value>>(&format!("{{{filled}}}")).map_err(|source| {
            CoreError::Params {
                report: report.name.clone(),
                source,
            }
        })?
    };

    if report.name == STUDENT_QUIZ_PERFORMANCE && !params.contains_key(ASSESSMENT_TYPE_KEY) {
        params.insert(
            ASSESSMENT_TYPE_KEY.to_string(),
            Value::String(DEFAULT_ASSESSMENT_TYPE.to_string()),
        );
    }
    Ok(params)
}

/// Flatten a parameter object into form/query pairs.
///
/// Strings are sent verbatim, nulls are dropped, and arrays repeat the key
/// once per element.
pub fn to_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(params.len());
    for (key, value) in params {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(text) = scalar_text(item) {
                        pairs.push((key.clone(), text));
                    }
                }
            }
            other => {
                if let Some(text) = scalar_text(other) {
                    pairs.push((key.clone(), text));
                }
            }
        }
    }
    pairs
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn def(name: &str, params: &str) -> ReportDefinition {
        ReportDefinition {
            name: name.to_string(),
            method: "GET".to_string(),
            url: "https://portal.test".to_string(),
            params: params.to_string(),
            output_file: None,
            expected_headers: Vec::new(),
            extract: None,
        }
    }

    const VALUES: ParamValues<'static> = ParamValues {
        class_code: "04A0",
        subject_code: "subj-4",
        start_date: "01/04/2024",
        end_date: "30/04/2024",
    };

    #[test]
    fn placeholders_are_substituted() {
        let report = def(
            "Class Login Report",
            r#""startDate":"<start_date>","endDate":"<end_date>","levelSection":"<class>","subject":"<subject>","page":1"#,
        );
        let params = build_params(&report, VALUES).unwrap();
        assert_eq!(params["startDate"], "01/04/2024");
        assert_eq!(params["endDate"], "30/04/2024");
        assert_eq!(params["levelSection"], "04A0");
        assert_eq!(params["subject"], "subj-4");
        assert_eq!(params["page"], 1);
        assert!(!params.contains_key(ASSESSMENT_TYPE_KEY));
    }

    #[test]
    fn student_quiz_gets_default_assessment_type() {
        let report = def(STUDENT_QUIZ_PERFORMANCE, r#""levelSection":"<class>""#);
        let params = build_params(&report, VALUES).unwrap();
        assert_eq!(params[ASSESSMENT_TYPE_KEY], "1");
    }

    #[test]
    fn explicit_assessment_type_is_kept() {
        let report = def(STUDENT_QUIZ_PERFORMANCE, r#""assessmentType":"2""#);
        let params = build_params(&report, VALUES).unwrap();
        assert_eq!(params[ASSESSMENT_TYPE_KEY], "2");
    }

    #[test]
    fn empty_template_yields_empty_params() {
        let params = build_params(&def("School Logins Report", "  "), VALUES).unwrap();
        assert!(params.is_empty());
    }

    #[test]
    fn malformed_template_is_an_error() {
        let err = build_params(&def("School Logins Report", r#""a": "#), VALUES);
        assert_matches!(err, Err(CoreError::Params { report, .. }) if report == "School Logins Report");
    }

    #[test]
    fn pairs_flatten_scalars_and_arrays() {
        let params: Map<String, Value> = serde_json::from_str(
            r#"{"a": "x", "b": 2, "c": true, "d": null, "e": ["p", "q"]}"#,
        )
        .unwrap();
        assert_eq!(
            to_pairs(&params),
            vec![
                ("a".to_string(), "x".to_string()),
                ("b".to_string(), "2".to_string()),
                ("c".to_string(), "true".to_string()),
                ("e".to_string(), "p".to_string()),
                ("e".to_string(), "q".to_string()),
            ]
        );
    }
}
