//! The learning package: everything one analysis produces.
//!
//! A [`LearningPackage`] is built wholesale from one provider reply and never
//! mutated afterwards. Field names on the wire are camelCase because that is
//! what the response schema declares; see [`crate::schema`].
//!
//! Deserialisation only checks shape. The value invariants (non-empty
//! summaries, at least two quiz options, answer index in range) are checked by
//! [`LearningPackage::validate`], which [`crate::pipeline::parse`] always runs.
//! Nothing is clamped or defaulted: a bad value is an error.

use crate::error::SenseiError;
use serde::{Deserialize, Serialize};

/// One scene of the explainer-video storyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoScene {
    pub scene: String,
    /// Visual direction for the scene.
    pub visual: String,
    /// Spoken text.
    pub narration: String,
}

/// A two-sided study card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Zero-based index into `options`.
    pub correct_answer_index: usize,
}

impl QuizQuestion {
    /// Whether `choice` is the correct option.
    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.correct_answer_index
    }

    /// Text of the correct option.
    ///
    /// Only `None` for a question that failed [`LearningPackage::validate`].
    pub fn correct_option(&self) -> Option<&str> {
        self.options
            .get(self.correct_answer_index)
            .map(String::as_str)
    }
}

/// The structured result of analysing one document or text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPackage {
    /// High-level summary for experts.
    pub expert_summary: String,
    /// Beginner-friendly explanation using analogies.
    pub simple_explanation: String,
    /// Presentation order only.
    pub key_contributions: Vec<String>,
    /// Mermaid flowchart text. Not validated here; see [`crate::diagram`].
    pub methodology_flowchart: String,
    pub visual_diagram_description: String,
    /// Storyboard order.
    pub video_script: Vec<VideoScene>,
    /// Illustrative code. Never executed.
    pub python_code: String,
    pub flashcards: Vec<Flashcard>,
    pub quiz: Vec<QuizQuestion>,
    pub additional_insights: String,
}

impl LearningPackage {
    /// Check the invariants that the JSON shape alone cannot express.
    ///
    /// Returns the first violation found as [`SenseiError::InvalidPackage`],
    /// naming the offending field with its wire name.
    pub fn validate(&self) -> Result<(), SenseiError> {
        if self.expert_summary.trim().is_empty() {
            return Err(SenseiError::invalid("expertSummary", "is empty"));
        }
        if self.simple_explanation.trim().is_empty() {
            return Err(SenseiError::invalid("simpleExplanation", "is empty"));
        }

        for (i, q) in self.quiz.iter().enumerate() {
            if q.options.len() < 2 {
                return Err(SenseiError::invalid(
                    format!("quiz[{i}].options"),
                    format!("has {} option(s), at least 2 required", q.options.len()),
                ));
            }
            if q.correct_answer_index >= q.options.len() {
                return Err(SenseiError::invalid(
                    format!("quiz[{i}].correctAnswerIndex"),
                    format!(
                        "is {} but only {} options exist",
                        q.correct_answer_index,
                        q.options.len()
                    ),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A package that satisfies every invariant.
    pub(crate) fn sample_package() -> LearningPackage {
        LearningPackage {
            expert_summary: "Self-attention replaces recurrence.".into(),
            simple_explanation: "Like a class where every student can hear every other.".into(),
            key_contributions: vec!["Transformer".into(), "Multi-head attention".into()],
            methodology_flowchart: "graph TD\n  A[\"Input\"] --> B[\"Encoder\"]".into(),
            visual_diagram_description: "Encoder and decoder stacks side by side.".into(),
            video_script: vec![VideoScene {
                scene: "Intro".into(),
                visual: "Title card".into(),
                narration: "Today: attention.".into(),
            }],
            python_code: "print('attention')".into(),
            flashcards: vec![Flashcard {
                front: "What is a head?".into(),
                back: "One attention projection.".into(),
            }],
            quiz: vec![QuizQuestion {
                question: "What replaces recurrence?".into(),
                options: vec!["Convolution".into(), "Self-attention".into()],
                correct_answer_index: 1,
            }],
            additional_insights: "Quadratic cost in sequence length.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::sample_package;
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn sample_is_valid() {
        assert!(sample_package().validate().is_ok());
    }

    #[test]
    fn blank_summary_rejected() {
        let mut p = sample_package();
        p.expert_summary = "   ".into();
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("expertSummary"));
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn blank_explanation_rejected() {
        let mut p = sample_package();
        p.simple_explanation = String::new();
        assert!(p.validate().unwrap_err().to_string().contains("simpleExplanation"));
    }

    #[test]
    fn answer_index_equal_to_len_rejected() {
        let mut p = sample_package();
        p.quiz[0].correct_answer_index = 2;
        let msg = p.validate().unwrap_err().to_string();
        assert!(msg.contains("quiz[0].correctAnswerIndex"), "got: {msg}");
    }

    #[test]
    fn single_option_rejected() {
        let mut p = sample_package();
        p.quiz[0].options.truncate(1);
        p.quiz[0].correct_answer_index = 0;
        assert!(p.validate().unwrap_err().to_string().contains("quiz[0].options"));
    }

    #[test]
    fn empty_collections_are_allowed() {
        let mut p = sample_package();
        p.key_contributions.clear();
        p.flashcards.clear();
        p.quiz.clear();
        p.video_script.clear();
        assert!(p.validate().is_ok());
    }

    #[test]
    fn wire_names_are_camel_case() {
        let json = serde_json::to_value(sample_package()).unwrap();
        assert!(json.get("expertSummary").is_some());
        assert!(json.get("methodologyFlowchart").is_some());
        assert_eq!(json["quiz"][0]["correctAnswerIndex"], 1);
    }

    #[test]
    fn correct_option_lookup() {
        let p = sample_package();
        assert_eq!(p.quiz[0].correct_option(), Some("Self-attention"));
        assert!(p.quiz[0].is_correct(1));
        assert!(!p.quiz[0].is_correct(0));
    }
}
