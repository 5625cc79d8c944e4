//! Analysis entry points.
//!
//! One analysis is exactly one provider call:
//!
//! ```text
//! validate input ─▶ resolve backend ─▶ build request ─▶ generate (once) ─▶ parse
//! ```
//!
//! Every failure before `generate` happens without touching the network, so a
//! missing key or an empty text box costs nothing. Nothing here retries; a
//! failed attempt is reported and the caller decides whether to submit again.

use crate::config::AnalysisConfig;
use crate::diagram::{render_diagram, FlowchartLint};
use crate::error::SenseiError;
use crate::package::LearningPackage;
use crate::pipeline::input::IngestedInput;
use crate::pipeline::llm::{GeminiBackend, GenerativeBackend};
use crate::pipeline::{parse, request};
use crate::report::{render_markdown, ReportOptions};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of [`analyze_detailed`]: the package plus call statistics.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutput {
    pub package: LearningPackage,
    pub stats: AnalysisStats,
}

/// Statistics for one analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisStats {
    /// Backend name, e.g. `"gemini"`.
    pub provider: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Wall-clock time of the whole attempt.
    pub duration_ms: u64,
}

/// File format for [`analyze_to_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// The package as pretty-printed camelCase JSON.
    Json,
    /// The full sectioned report.
    #[default]
    Markdown,
}

/// Analyse one document or text and return its learning package.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Every failure is fatal to this attempt only:
/// - invalid input (no content, or both file and text)
/// - missing credential
/// - network/provider failure or an empty reply
/// - a reply that is not a valid learning package
pub async fn analyze(
    input: &IngestedInput,
    config: &AnalysisConfig,
) -> Result<LearningPackage, SenseiError> {
    analyze_detailed(input, config).await.map(|out| out.package)
}

/// Like [`analyze`], but also returns token counts and timing.
pub async fn analyze_detailed(
    input: &IngestedInput,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, SenseiError> {
    let result = run(input, config).await;

    if let Some(ref cb) = config.progress_callback {
        match &result {
            Ok(_) => cb.on_analysis_complete(None),
            Err(e) => cb.on_analysis_complete(Some(&e.to_string())),
        }
    }
    if let Err(ref e) = result {
        warn!("Analysis failed: {}", e);
    }
    result
}

async fn run(input: &IngestedInput, config: &AnalysisConfig) -> Result<AnalysisOutput, SenseiError> {
    let start = Instant::now();

    // ── Step 1: Validate input ───────────────────────────────────────────
    input.validate()?;
    info!("Starting analysis: {}", input.description());
    if let Some(ref cb) = config.progress_callback {
        cb.on_input_ready(input.description(), input.byte_len());
    }

    // ── Step 2: Resolve backend ──────────────────────────────────────────
    let backend = resolve_backend(config)?;

    // ── Step 3: Build request ────────────────────────────────────────────
    let req = request::build_request(input, config);
    debug!(
        "Request built: {} part(s), model {}",
        req.contents.iter().map(|c| c.parts.len()).sum::<usize>(),
        req.model
    );

    // ── Step 4: One generation call ──────────────────────────────────────
    if let Some(ref cb) = config.progress_callback {
        cb.on_request_sent(backend.name(), &config.model);
    }
    let response = backend.generate(&req).await?;
    let reply_len = response.text.as_deref().map_or(0, str::len);
    if let Some(ref cb) = config.progress_callback {
        cb.on_response_received(reply_len);
    }

    // ── Step 5: Parse and validate ───────────────────────────────────────
    let package = parse::parse_package(
        backend.name(),
        response.text.as_deref(),
        response.empty_reason.as_deref(),
    )?;

    let stats = AnalysisStats {
        provider: backend.name().to_string(),
        model: config.model.clone(),
        input_tokens: response.input_tokens,
        output_tokens: response.output_tokens,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Analysis complete: {} questions, {} flashcards, {}ms",
        package.quiz.len(),
        package.flashcards.len(),
        stats.duration_ms
    );

    Ok(AnalysisOutput { package, stats })
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    input: &IngestedInput,
    config: &AnalysisConfig,
) -> Result<LearningPackage, SenseiError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SenseiError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze(input, config))
}

/// Analyse and write the result directly to a file.
///
/// Markdown output renders the flowchart with [`FlowchartLint`] and includes
/// every section. Uses atomic write (temp file + rename) to prevent partial
/// files.
pub async fn analyze_to_file(
    input: &IngestedInput,
    output_path: impl AsRef<Path>,
    format: OutputFormat,
    config: &AnalysisConfig,
) -> Result<AnalysisStats, SenseiError> {
    let output = analyze_detailed(input, config).await?;
    let path = output_path.as_ref();

    let contents = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&output.package)
            .map_err(|e| SenseiError::Internal(format!("serialise package: {e}")))?,
        OutputFormat::Markdown => {
            let diagram =
                render_diagram(&FlowchartLint, &output.package.methodology_flowchart).await;
            render_markdown(&output.package, Some(&diagram), &ReportOptions::default())
        }
    };

    write_atomic(path, &contents).await?;
    Ok(output.stats)
}

/// Write `contents` to `path` via a sibling temp file and a rename.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), SenseiError> {
    let write_err = |e| SenseiError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve the backend, most specific first.
///
/// 1. **Pre-built backend** (`config.backend`), used as-is. Tests and callers
///    with custom middleware go through here; no credential is needed.
/// 2. **Gemini** with the key from [`AnalysisConfig::credential`] (explicit
///    key, then the configured environment variable).
fn resolve_backend(config: &AnalysisConfig) -> Result<Arc<dyn GenerativeBackend>, SenseiError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    let key = config.credential()?;
    let backend = GeminiBackend::new(key)
        .with_base_url(config.base_url.clone())
        .with_timeout_secs(config.request_timeout_secs);
    Ok(Arc::new(backend))
}
