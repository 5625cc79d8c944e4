//! Error types for the research-sensei library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SenseiError`] — **Fatal to one attempt**: the analysis cannot produce a
//!   learning package (unreadable file, missing API key, provider failure,
//!   malformed reply). Returned as `Err(SenseiError)` from the top-level
//!   `analyze*` functions. The process and the session survive; the caller
//!   decides whether to try again.
//!
//! * [`RenderError`] — **Recovered**: the flowchart text could not be drawn.
//!   Stored inside [`crate::diagram::RenderedDiagram::Placeholder`] so the
//!   rest of the report is still produced.
//!
//! Every [`SenseiError`] variant maps onto one [`ErrorKind`], the coarse
//! taxonomy callers branch on when deciding what to show the user.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`SenseiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ErrorKind {
    /// The input file could not be read or encoded.
    UnreadableInput,
    /// No usable input was supplied.
    InvalidInput,
    /// The service credential or a config value is missing or invalid.
    Configuration,
    /// The network call failed or the provider returned no content.
    Service,
    /// The provider replied, but not with a valid learning package.
    Format,
    /// An analysis is already running in this session.
    Session,
    /// The result could not be written out.
    Output,
    /// Bug or environment failure outside the taxonomy.
    Internal,
}

/// All fatal errors returned by the research-sensei library.
///
/// Diagram failures use [`RenderError`] and never surface here.
#[derive(Debug, Error)]
pub enum SenseiError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file was reachable but its bytes or encoded form could not be obtained.
    #[error("Could not read '{name}': {reason}")]
    UnreadableInput { name: String, reason: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// Neither a file nor non-empty text was supplied.
    #[error("Nothing to analyse: provide a document or paste some text")]
    MissingInput,

    /// Both a file and text were supplied where exactly one is expected.
    #[error("Provide either a document or pasted text, not both")]
    ConflictingInput,

    // ── Config errors ─────────────────────────────────────────────────────
    /// No API key in the config and none in the environment.
    #[error("Gemini API key is missing.\nSet {env_var} or pass --api-key.")]
    MissingCredential { env_var: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Service errors ────────────────────────────────────────────────────
    /// The request never produced an HTTP response.
    #[error("Request to '{provider}' failed: {detail}")]
    ServiceRequest { provider: String, detail: String },

    /// The provider answered with a non-success status.
    #[error("'{provider}' returned HTTP {status}: {detail}")]
    ServiceStatus {
        provider: String,
        status: u16,
        detail: String,
    },

    /// The caller-imposed request timeout elapsed.
    #[error("Request to '{provider}' timed out after {secs}s")]
    ServiceTimeout { provider: String, secs: u64 },

    /// The provider answered but produced no text.
    #[error("Empty response from '{provider}': {reason}")]
    EmptyResponse { provider: String, reason: String },

    // ── Format errors ─────────────────────────────────────────────────────
    /// The reply text is not JSON of the expected shape.
    #[error("Response is not a valid learning package: {detail}")]
    MalformedJson { detail: String },

    /// The reply decoded but breaks a learning-package invariant.
    #[error("Invalid learning package: {field} {reason}")]
    InvalidPackage { field: String, reason: String },

    // ── Session errors ────────────────────────────────────────────────────
    /// `begin` was called while a request is outstanding.
    #[error("An analysis is already in progress")]
    AnalysisInProgress,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SenseiError {
    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SenseiError::FileNotFound { .. }
            | SenseiError::PermissionDenied { .. }
            | SenseiError::UnreadableInput { .. }
            | SenseiError::DownloadFailed { .. }
            | SenseiError::DownloadTimeout { .. } => ErrorKind::UnreadableInput,
            SenseiError::MissingInput | SenseiError::ConflictingInput => ErrorKind::InvalidInput,
            SenseiError::MissingCredential { .. } | SenseiError::InvalidConfig(_) => {
                ErrorKind::Configuration
            }
            SenseiError::ServiceRequest { .. }
            | SenseiError::ServiceStatus { .. }
            | SenseiError::ServiceTimeout { .. }
            | SenseiError::EmptyResponse { .. } => ErrorKind::Service,
            SenseiError::MalformedJson { .. } | SenseiError::InvalidPackage { .. } => {
                ErrorKind::Format
            }
            SenseiError::AnalysisInProgress => ErrorKind::Session,
            SenseiError::OutputWriteFailed { .. } => ErrorKind::Output,
            SenseiError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for building an [`SenseiError::InvalidPackage`].
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SenseiError::InvalidPackage {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// A recovered failure to draw the flowchart.
///
/// Held inside [`crate::diagram::RenderedDiagram::Placeholder`] next to the
/// raw diagram text; the surrounding report is still produced.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum RenderError {
    /// The renderer rejected the diagram text.
    #[error("diagram syntax error{}: {detail}", line.map(|l| format!(" on line {l}")).unwrap_or_default())]
    Syntax { line: Option<usize>, detail: String },

    /// The renderer ran but failed for a reason unrelated to syntax.
    #[error("diagram renderer failed: {detail}")]
    RendererFailed { detail: String },

    /// The renderer is not installed or could not be started.
    #[error("diagram renderer '{renderer}' is not available")]
    Unavailable { renderer: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_names_env_var() {
        let e = SenseiError::MissingCredential {
            env_var: "GEMINI_API_KEY".into(),
        };
        assert!(e.to_string().contains("GEMINI_API_KEY"));
        assert_eq!(e.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn invalid_package_display() {
        let e = SenseiError::invalid("quiz[2].correctAnswerIndex", "is 4 but only 4 options exist");
        let msg = e.to_string();
        assert!(msg.contains("quiz[2].correctAnswerIndex"), "got: {msg}");
        assert_eq!(e.kind(), ErrorKind::Format);
    }

    #[test]
    fn service_status_display() {
        let e = SenseiError::ServiceStatus {
            provider: "gemini".into(),
            status: 429,
            detail: "quota exhausted".into(),
        };
        assert!(e.to_string().contains("HTTP 429"));
        assert!(e.to_string().contains("gemini"));
        assert_eq!(e.kind(), ErrorKind::Service);
    }

    #[test]
    fn empty_response_is_a_service_error() {
        let e = SenseiError::EmptyResponse {
            provider: "gemini".into(),
            reason: "no candidates".into(),
        };
        assert_eq!(e.kind(), ErrorKind::Service);
    }

    #[test]
    fn input_errors_classify_as_unreadable() {
        let e = SenseiError::FileNotFound {
            path: PathBuf::from("/nope.pdf"),
        };
        assert_eq!(e.kind(), ErrorKind::UnreadableInput);
        assert_eq!(SenseiError::MissingInput.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn render_error_display_with_line() {
        let e = RenderError::Syntax {
            line: Some(3),
            detail: "label must be quoted".into(),
        };
        assert_eq!(
            e.to_string(),
            "diagram syntax error on line 3: label must be quoted"
        );
    }

    #[test]
    fn render_error_display_without_line() {
        let e = RenderError::Syntax {
            line: None,
            detail: "empty diagram".into(),
        };
        assert_eq!(e.to_string(), "diagram syntax error: empty diagram");
    }
}
