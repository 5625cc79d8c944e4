//! Prompt text sent with every analysis.
//!
//! The ten field names and the flowchart grammar rule appear here and nowhere
//! else; the tests below fail if either goes missing from a prompt.
//!
//! [`crate::config::AnalysisConfig::system_instruction`] replaces
//! [`DEFAULT_SYSTEM_INSTRUCTION`]. The task prompt is always built by
//! [`task_prompt`].

/// Default system instruction.
///
/// Repeats the flowchart quoting rule: the diagram renderer is strict, and a
/// model reply is the riskiest input it ever sees.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are an expert academic researcher and educator. \
When generating Mermaid diagrams, you MUST use strictly alphanumeric node IDs and wrap all node \
labels in double quotes, for example NodeA[\"Description\"], to prevent syntax errors.";

/// Task preamble and the ten output sections.
const TASK_BODY: &str = r#"Analyze the provided content (paper, image or text).
Perform the following tasks and return the result strictly as JSON matching the response schema:

1. expertSummary: High-level academic summary.
2. simpleExplanation: Explain it like I'm 15. Use analogies.
3. keyContributions: The key contributions as a list.
4. methodologyFlowchart: VALID Mermaid.js 'graph TD' syntax showing the methodology.
   - Use strictly alphanumeric node IDs (e.g. NodeA, NodeB) with NO spaces or special characters.
   - Wrap ALL node labels in double quotes inside the brackets so special characters are safe.
   - Example: NodeA["Input Data (Raw)"] --> NodeB["Processing Step"]
   - Do not wrap the diagram in code fences.
5. visualDiagramDescription: Describe any other diagrams needed to understand the architecture.
6. videoScript: A YouTube-style script, one entry per scene, with visual cues and narration.
7. pythonCode: Pseudo-code or runnable Python demonstrating the core concept or algorithm.
8. flashcards: 10 key concepts as front/back pairs.
9. quiz: 5 multiple choice questions, each with at least 2 options and a zero-based correctAnswerIndex.
10. additionalInsights: Future scope and limitations.

Ensure the Mermaid syntax is clean and renderable."#;

const PERSONA: &str = "You are ResearchSensei, an assistant that transforms research papers \
into comprehensive learning experiences.";

/// Build the task prompt sent as the text part of the request.
///
/// For document input `pasted_text` is `None` and the document travels as an
/// inline part. For text input the pasted text is embedded verbatim, fenced
/// by markers so the model can tell instructions from content.
pub fn task_prompt(pasted_text: Option<&str>) -> String {
    match pasted_text {
        Some(text) => format!(
            "{PERSONA}\n\nContent to analyze:\n<<<CONTENT\n{text}\nCONTENT>>>\n\n{TASK_BODY}"
        ),
        None => format!("{PERSONA}\n\n{TASK_BODY}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::REQUIRED_FIELDS;

    #[test]
    fn task_prompt_names_every_field() {
        let prompt = task_prompt(None);
        for field in REQUIRED_FIELDS {
            assert!(prompt.contains(field), "prompt does not mention {field}");
        }
    }

    #[test]
    fn task_prompt_states_diagram_grammar() {
        let prompt = task_prompt(None);
        assert!(prompt.contains("alphanumeric node IDs"));
        assert!(prompt.contains("double quotes"));
        assert!(prompt.contains(r#"NodeA["Input Data (Raw)"]"#));
    }

    #[test]
    fn pasted_text_is_embedded_verbatim() {
        let text = "  Attention is all you need.\n\tTabs kept.  ";
        let prompt = task_prompt(Some(text));
        assert!(prompt.contains(text));
    }

    #[test]
    fn system_instruction_repeats_quoting_rule() {
        assert!(DEFAULT_SYSTEM_INSTRUCTION.contains("double quotes"));
    }
}
