//! Request construction: ingested input → Gemini `generateContent` body.
//!
//! ## Body Layout
//!
//! ```text
//! systemInstruction  quoting rule for Mermaid labels (or caller override)
//! contents[0]        role "user"
//!   parts[0]         inlineData {mimeType, data}     (document input only)
//!   parts[n-1]       text: task prompt (+ pasted text for text input)
//! generationConfig   responseMimeType "application/json"
//!                    responseSchema   learning-package schema
//!                    temperature / maxOutputTokens (only when configured)
//! ```
//!
//! The types serialise to exactly the JSON the REST endpoint expects, so a
//! test can assert on `serde_json::to_value(&request)` directly.

use super::input::IngestedInput;
use crate::config::AnalysisConfig;
use crate::prompts::{task_prompt, DEFAULT_SYSTEM_INSTRUCTION};
use crate::schema::learning_package_schema;
use serde::Serialize;
use serde_json::Value;

/// One `generateContent` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Model id; part of the URL, not the body.
    #[serde(skip)]
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

/// A turn of the conversation.
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

/// One part of a turn: inline binary data or text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    InlineData(InlineData),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64 payload.
    pub data: String,
}

/// Output constraints for the generation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

/// Build the request for one analysis.
pub fn build_request(input: &IngestedInput, config: &AnalysisConfig) -> GenerateRequest {
    let mut parts = Vec::with_capacity(2);
    let prompt = match input {
        IngestedInput::File(file) => {
            parts.push(Part::InlineData(InlineData {
                mime_type: file.mime_type.clone(),
                data: file.encoded_payload.clone(),
            }));
            task_prompt(None)
        }
        IngestedInput::Text(text) => task_prompt(Some(text)),
    };
    parts.push(Part::Text(prompt));

    let instruction = config
        .system_instruction
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_INSTRUCTION);

    GenerateRequest {
        model: config.model.clone(),
        system_instruction: Some(Content {
            role: None,
            parts: vec![Part::Text(instruction.to_string())],
        }),
        contents: vec![Content {
            role: Some("user".into()),
            parts,
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json".into(),
            response_schema: learning_package_schema(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::input::ingest_bytes;

    fn pdf_input() -> IngestedInput {
        IngestedInput::File(ingest_bytes("paper.pdf", b"%PDF-1.7 body".to_vec(), None))
    }

    #[test]
    fn document_request_layout() {
        let req = build_request(&pdf_input(), &AnalysisConfig::default());
        let body = serde_json::to_value(&req).unwrap();

        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["inlineData"]["mimeType"], "application/pdf");
        assert!(parts[0]["inlineData"]["data"].as_str().unwrap().starts_with("JVBERi"));
        assert!(parts[1]["text"].as_str().unwrap().contains("methodologyFlowchart"));
        assert_eq!(body["contents"][0]["role"], "user");
        assert!(body.get("model").is_none());
    }

    #[test]
    fn text_request_has_no_inline_part() {
        let input = IngestedInput::Text("Transformers use attention.".into());
        let req = build_request(&input, &AnalysisConfig::default());
        let body = serde_json::to_value(&req).unwrap();
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 1);
        assert!(parts[0]["text"]
            .as_str()
            .unwrap()
            .contains("Transformers use attention."));
    }

    #[test]
    fn generation_config_declares_schema() {
        let req = build_request(&pdf_input(), &AnalysisConfig::default());
        let body = serde_json::to_value(&req).unwrap();
        let gc = &body["generationConfig"];
        assert_eq!(gc["responseMimeType"], "application/json");
        assert_eq!(gc["responseSchema"]["type"], "OBJECT");
        assert_eq!(gc["responseSchema"]["required"].as_array().unwrap().len(), 10);
        assert!(gc.get("temperature").is_none());
        assert!(gc.get("maxOutputTokens").is_none());
    }

    #[test]
    fn optional_generation_knobs_are_sent_when_set() {
        let config = AnalysisConfig::builder()
            .temperature(0.3)
            .max_output_tokens(8192)
            .build()
            .unwrap();
        let body = serde_json::to_value(build_request(&pdf_input(), &config)).unwrap();
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 8192);
        assert!(body["generationConfig"]["temperature"].is_number());
    }

    #[test]
    fn system_instruction_default_and_override() {
        let body = serde_json::to_value(build_request(&pdf_input(), &AnalysisConfig::default())).unwrap();
        let text = body["systemInstruction"]["parts"][0]["text"].as_str().unwrap();
        assert!(text.contains("double quotes"));
        assert!(body["systemInstruction"].get("role").is_none());

        let config = AnalysisConfig::builder()
            .system_instruction("Be brief.")
            .build()
            .unwrap();
        let body = serde_json::to_value(build_request(&pdf_input(), &config)).unwrap();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief.");
    }
}
