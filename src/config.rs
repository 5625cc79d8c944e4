//! Configuration types for analysis.
//!
//! All analysis behaviour is controlled through [`AnalysisConfig`], built via
//! its [`AnalysisConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share a config across calls and to log it when a run misbehaves.
//! The hand-written `Debug` impl never prints the API key.

use crate::error::SenseiError;
use crate::pipeline::llm::GenerativeBackend;
use crate::progress::ProgressCallback;
use std::fmt;
use std::sync::Arc;

/// Default Gemini model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Environment variable the API key is read from by default.
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default Gemini REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Configuration for one or more analyses.
///
/// Built via [`AnalysisConfig::builder()`] or using
/// [`AnalysisConfig::default()`].
///
/// # Example
/// ```rust
/// use research_sensei::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .model("gemini-2.5-pro")
///     .temperature(0.2)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Gemini model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Explicit API key. Takes precedence over `api_key_env`.
    pub api_key: Option<String>,

    /// Environment variable consulted when `api_key` is `None`.
    /// Default: [`DEFAULT_API_KEY_ENV`].
    pub api_key_env: String,

    /// REST endpoint root. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Pre-constructed backend. Takes precedence over the credential fields.
    pub backend: Option<Arc<dyn GenerativeBackend>>,

    /// Sampling temperature. `None` leaves the provider default in place.
    pub temperature: Option<f32>,

    /// Cap on generated tokens. `None` leaves the provider default in place.
    ///
    /// A full package (script, ten flashcards, five questions, code) is long;
    /// a low cap truncates the JSON and the reply then fails to parse.
    pub max_output_tokens: Option<u32>,

    /// Custom system instruction. If None, uses
    /// [`crate::prompts::DEFAULT_SYSTEM_INSTRUCTION`].
    pub system_instruction: Option<String>,

    /// Client-side timeout for the generation call. Default: none.
    pub request_timeout_secs: Option<u64>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives stage events during [`crate::analyze::analyze`].
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            backend: None,
            temperature: None,
            max_output_tokens: None,
            system_instruction: None,
            request_timeout_secs: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_key_env", &self.api_key_env)
            .field("base_url", &self.base_url)
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("system_instruction", &self.system_instruction.is_some())
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolve the API key: explicit value first, then the environment.
    ///
    /// Blank values count as absent.
    pub fn credential(&self) -> Result<String, SenseiError> {
        let from_config = self.api_key.clone().filter(|k| !k.trim().is_empty());
        let key = match from_config {
            Some(k) => Some(k),
            None => std::env::var(&self.api_key_env)
                .ok()
                .filter(|k| !k.trim().is_empty()),
        };
        key.ok_or_else(|| SenseiError::MissingCredential {
            env_var: self.api_key_env.clone(),
        })
    }
}

/// Builder for [`AnalysisConfig`].
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl fmt::Debug for AnalysisConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl AnalysisConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_key_env(mut self, var: impl Into<String>) -> Self {
        self.config.api_key_env = var.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn backend(mut self, backend: Arc<dyn GenerativeBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = Some(n);
        self
    }

    pub fn system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.system_instruction = Some(instruction.into());
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// The credential is not checked here; a missing key is reported by
    /// `analyze` as [`SenseiError::MissingCredential`].
    pub fn build(self) -> Result<AnalysisConfig, SenseiError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(SenseiError::InvalidConfig("model must not be empty".into()));
        }
        if c.model.contains('/') || c.model.contains(':') {
            return Err(SenseiError::InvalidConfig(format!(
                "model '{}' must be a bare model id such as {}",
                c.model, DEFAULT_MODEL
            )));
        }
        if reqwest::Url::parse(&c.base_url).is_err() {
            return Err(SenseiError::InvalidConfig(format!(
                "base URL '{}' is not a valid URL",
                c.base_url
            )));
        }
        if c.api_key_env.trim().is_empty() {
            return Err(SenseiError::InvalidConfig(
                "API key environment variable name must not be empty".into(),
            ));
        }
        if c.max_output_tokens == Some(0) {
            return Err(SenseiError::InvalidConfig(
                "max output tokens must be ≥ 1".into(),
            ));
        }
        if c.request_timeout_secs == Some(0) {
            return Err(SenseiError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
