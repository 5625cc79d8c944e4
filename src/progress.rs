//! Progress-callback trait for analysis stage events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalysisConfigBuilder::progress_callback`] to learn which
//! stage a running analysis has reached. A single Gemini call on a long paper
//! can take tens of seconds; the CLI uses these events to drive its spinner.
//!
//! # Example
//!
//! ```rust
//! use research_sensei::{AnalysisConfig, AnalysisProgressCallback};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl AnalysisProgressCallback for Printer {
//!     fn on_request_sent(&self, provider: &str, model: &str) {
//!         eprintln!("waiting for {provider}/{model}…");
//!     }
//! }
//!
//! let config = AnalysisConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn AnalysisProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by [`crate::analyze::analyze`] as it moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync` because the
/// config that holds them is shared across tasks.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called once the input has been validated.
    ///
    /// # Arguments
    /// * `description` — display name of the file, or "pasted text"
    /// * `bytes`       — raw size of the file, or byte length of the text
    fn on_input_ready(&self, description: &str, bytes: usize) {
        let _ = (description, bytes);
    }

    /// Called just before the single generation request is issued.
    fn on_request_sent(&self, provider: &str, model: &str) {
        let _ = (provider, model);
    }

    /// Called when the provider has replied, before parsing.
    fn on_response_received(&self, response_len: usize) {
        let _ = response_len;
    }

    /// Called once with the outcome of the attempt.
    ///
    /// `error` is `None` on success.
    fn on_analysis_complete(&self, error: Option<&str>) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalysisConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;
