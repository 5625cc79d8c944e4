//! Response parsing: reply text → validated [`LearningPackage`].
//!
//! The response schema already constrains the provider, but the reply is
//! still checked here twice: once for shape (serde) and once for the value
//! invariants ([`LearningPackage::validate`]). Invalid data is reported, never
//! repaired.

use crate::error::SenseiError;
use crate::package::LearningPackage;
use tracing::debug;

/// Parse and validate the reply text of one generation.
///
/// * `None` or whitespace-only text → [`SenseiError::EmptyResponse`]
/// * not JSON, or JSON of the wrong shape → [`SenseiError::MalformedJson`]
/// * right shape, broken invariant → [`SenseiError::InvalidPackage`]
pub fn parse_package(
    provider: &str,
    text: Option<&str>,
    empty_reason: Option<&str>,
) -> Result<LearningPackage, SenseiError> {
    let text = match text {
        Some(t) if !t.trim().is_empty() => t,
        _ => {
            return Err(SenseiError::EmptyResponse {
                provider: provider.to_string(),
                reason: empty_reason.unwrap_or("no content").to_string(),
            })
        }
    };

    let package: LearningPackage =
        serde_json::from_str(text).map_err(|e| SenseiError::MalformedJson {
            detail: e.to_string(),
        })?;
    package.validate()?;

    debug!(
        contributions = package.key_contributions.len(),
        scenes = package.video_script.len(),
        flashcards = package.flashcards.len(),
        questions = package.quiz.len(),
        "Parsed learning package"
    );
    Ok(package)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::package::fixtures::sample_package;
    use serde_json::json;

    fn sample_json() -> serde_json::Value {
        serde_json::to_value(sample_package()).unwrap()
    }

    #[test]
    fn parses_well_formed_reply_verbatim() {
        let text = sample_json().to_string();
        let pkg = parse_package("gemini", Some(&text), None).unwrap();
        assert_eq!(pkg, sample_package());
    }

    #[test]
    fn missing_text_is_service_error() {
        let err = parse_package("gemini", None, Some("prompt blocked (SAFETY)")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Service);
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn blank_text_is_service_error() {
        let err = parse_package("gemini", Some(" \n "), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Service);
    }

    #[test]
    fn prose_is_format_error() {
        let err = parse_package("gemini", Some("Here is your summary!"), None).unwrap_err();
        assert!(matches!(err, SenseiError::MalformedJson { .. }));
    }

    #[test]
    fn fenced_json_is_not_unwrapped() {
        let text = format!("```json\n{}\n```", sample_json());
        let err = parse_package("gemini", Some(&text), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn missing_field_is_format_error() {
        let mut v = sample_json();
        v.as_object_mut().unwrap().remove("pythonCode");
        let err = parse_package("gemini", Some(&v.to_string()), None).unwrap_err();
        assert!(err.to_string().contains("pythonCode"), "got: {err}");
    }

    #[test]
    fn mistyped_field_is_format_error() {
        let mut v = sample_json();
        v["keyContributions"] = json!("one, two");
        let err = parse_package("gemini", Some(&v.to_string()), None).unwrap_err();
        assert!(matches!(err, SenseiError::MalformedJson { .. }));
    }

    #[test]
    fn out_of_range_answer_is_rejected_not_clamped() {
        let mut v = sample_json();
        v["quiz"][0]["correctAnswerIndex"] = json!(7);
        let err = parse_package("gemini", Some(&v.to_string()), None).unwrap_err();
        assert!(matches!(err, SenseiError::InvalidPackage { .. }));
    }

    #[test]
    fn negative_answer_is_rejected() {
        let mut v = sample_json();
        v["quiz"][0]["correctAnswerIndex"] = json!(-1);
        let err = parse_package("gemini", Some(&v.to_string()), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let mut v = sample_json();
        v["confidence"] = json!(0.9);
        assert!(parse_package("gemini", Some(&v.to_string()), None).is_ok());
    }

    #[test]
    fn unquoted_flowchart_is_still_accepted() {
        let mut v = sample_json();
        v["methodologyFlowchart"] = json!("graph TD\nA[Input Data] --> B[Process]");
        let pkg = parse_package("gemini", Some(&v.to_string()), None).unwrap();
        assert_eq!(pkg.methodology_flowchart, "graph TD\nA[Input Data] --> B[Process]");
    }
}
