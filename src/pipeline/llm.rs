//! Generative backend: send one request, get reply text back.
//!
//! [`GenerativeBackend`] is the seam between the analysis client and the
//! provider. [`GeminiBackend`] talks to the Gemini REST API; tests plug in a
//! scripted backend. All prompt and schema work happens before this module
//! (see [`super::request`]) and all validation after it (see [`super::parse`]).
//!
//! There is no retry here. One `generate` call is one HTTP request; whether to
//! try again is the caller's decision.

use super::request::GenerateRequest;
use crate::error::SenseiError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// What a backend hands back for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateResponse {
    /// Reply text. `None` when the provider produced no candidate text.
    pub text: Option<String>,
    /// Why there is no text, when the provider said (block reason, finish reason).
    pub empty_reason: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A provider capable of schema-constrained generation.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Provider identifier used in logs and errors, e.g. `"gemini"`.
    fn name(&self) -> &str;

    /// Issue exactly one generation request.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, SenseiError>;
}

/// Gemini `generateContent` over HTTPS.
#[derive(Clone)]
pub struct GeminiBackend {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    timeout_secs: Option<u64>,
}

impl GeminiBackend {
    /// Create a backend with the given API key against the public endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: crate::config::DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
        }
    }

    /// Set a custom base URL (proxies, regional endpoints).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Impose a client-side timeout on each request.
    pub fn with_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Endpoint for a model.
    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, SenseiError> {
        let start = Instant::now();

        let mut builder = self
            .http_client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(request);
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let response = builder.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, "Gemini API error");
            return Err(SenseiError::ServiceStatus {
                provider: self.name().to_string(),
                status: status.as_u16(),
                detail: api_error_message(&error_text),
            });
        }

        let raw: GenerateContentResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.transport_error(e)
            } else {
                SenseiError::ServiceRequest {
                    provider: self.name().to_string(),
                    detail: format!("unreadable response envelope: {e}"),
                }
            }
        })?;

        let out = extract_response(raw);
        debug!(
            model = %request.model,
            input_tokens = out.input_tokens,
            output_tokens = out.output_tokens,
            duration_ms = start.elapsed().as_millis() as u64,
            "Gemini generateContent"
        );
        Ok(out)
    }
}

impl GeminiBackend {
    fn transport_error(&self, e: reqwest::Error) -> SenseiError {
        match (e.is_timeout(), self.timeout_secs) {
            (true, Some(secs)) => SenseiError::ServiceTimeout {
                provider: self.name().to_string(),
                secs,
            },
            _ => {
                warn!(error = %e, "Gemini request failed");
                SenseiError::ServiceRequest {
                    provider: self.name().to_string(),
                    detail: e.to_string(),
                }
            }
        }
    }
}

// ── Response envelope ────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

/// Flatten the envelope: first candidate's text parts, concatenated.
pub(crate) fn extract_response(raw: GenerateContentResponse) -> GenerateResponse {
    let (input_tokens, output_tokens) = raw
        .usage_metadata
        .map(|u| (u.prompt_token_count, u.candidates_token_count))
        .unwrap_or((0, 0));

    let block_reason = raw.prompt_feedback.and_then(|f| f.block_reason);

    let Some(candidate) = raw.candidates.into_iter().next() else {
        return GenerateResponse {
            text: None,
            empty_reason: Some(match block_reason {
                Some(reason) => format!("prompt blocked ({reason})"),
                None => "no candidates returned".to_string(),
            }),
            input_tokens,
            output_tokens,
        };
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    let empty_reason = if text.is_empty() {
        Some(match candidate.finish_reason {
            Some(reason) => format!("candidate has no text (finish reason {reason})"),
            None => "candidate has no text".to_string(),
        })
    } else {
        None
    };

    GenerateResponse {
        text: (!text.is_empty()).then_some(text),
        empty_reason,
        input_tokens,
        output_tokens,
    }
}

/// Pull `error.message` out of a Gemini error body, falling back to the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).expect("valid envelope")
    }

    #[test]
    fn concatenates_text_parts_of_first_candidate() {
        let out = extract_response(envelope(
            r#"{
                "candidates": [
                    {"content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]}, "finishReason": "STOP"},
                    {"content": {"parts": [{"text": "ignored"}]}}
                ],
                "usageMetadata": {"promptTokenCount": 1200, "candidatesTokenCount": 800}
            }"#,
        ));
        assert_eq!(out.text.as_deref(), Some("{\"a\":1}"));
        assert_eq!(out.input_tokens, 1200);
        assert_eq!(out.output_tokens, 800);
        assert!(out.empty_reason.is_none());
    }

    #[test]
    fn blocked_prompt_has_reason() {
        let out = extract_response(envelope(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#));
        assert!(out.text.is_none());
        assert_eq!(out.empty_reason.as_deref(), Some("prompt blocked (SAFETY)"));
    }

    #[test]
    fn no_candidates_has_reason() {
        let out = extract_response(envelope("{}"));
        assert!(out.text.is_none());
        assert_eq!(out.empty_reason.as_deref(), Some("no candidates returned"));
    }

    #[test]
    fn candidate_without_text() {
        let out = extract_response(envelope(
            r#"{"candidates": [{"finishReason": "MAX_TOKENS"}]}"#,
        ));
        assert!(out.text.is_none());
        assert!(out.empty_reason.unwrap().contains("MAX_TOKENS"));
    }

    #[test]
    fn error_message_extraction() {
        assert_eq!(
            api_error_message(r#"{"error": {"code": 400, "message": "API key not valid."}}"#),
            "API key not valid."
        );
        assert_eq!(api_error_message("  gateway down \n"), "gateway down");
    }

    #[test]
    fn endpoint_shape() {
        let b = GeminiBackend::new("k").with_base_url("http://localhost:8080/");
        assert_eq!(
            b.endpoint("gemini-2.5-flash"),
            "http://localhost:8080/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_service_error() {
        use crate::config::AnalysisConfig;
        use crate::error::ErrorKind;
        use crate::pipeline::{input::IngestedInput, request::build_request};

        // Port 9 (discard) on loopback is reliably closed in test sandboxes.
        let backend = GeminiBackend::new("k").with_base_url("http://127.0.0.1:9");
        let request = build_request(&IngestedInput::Text("x".into()), &AnalysisConfig::default());
        let err = backend.generate(&request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Service);
    }
}
