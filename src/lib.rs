//! # research-sensei
//!
//! Turn a research paper (or pasted text) into a learning package using a
//! generative model with structured output.
//!
//! ## Why this crate?
//!
//! Reading a paper well means summarising it twice (for experts and for
//! beginners), drawing its method, writing toy code, making flashcards and
//! testing yourself. This crate asks Gemini for all of that in one call,
//! constrained by a response schema, and validates what comes back so the
//! result is either a complete, consistent package or a clear error.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document / text
//!  │
//!  ├─ 1. Ingest   read file, URL or data URL; base64 the bytes
//!  ├─ 2. Request  inline part + task prompt + response schema
//!  ├─ 3. Generate exactly one Gemini generateContent call
//!  ├─ 4. Parse    strict JSON decode + invariant checks
//!  └─ 5. Present  diagram handoff, Markdown report, interactive quiz
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use research_sensei::{analyze, AnalysisConfig, IngestedInput};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Key read from GEMINI_API_KEY
//!     let config = AnalysisConfig::default();
//!     let file = research_sensei::pipeline::input::ingest_file("paper.pdf").await?;
//!     let package = analyze(&IngestedInput::File(file), &config).await?;
//!     println!("{}", package.expert_summary);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `sensei` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! research-sensei = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod diagram;
pub mod error;
pub mod package;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod quiz;
pub mod report;
pub mod schema;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{
    analyze, analyze_detailed, analyze_sync, analyze_to_file, write_atomic, AnalysisOutput,
    AnalysisStats, OutputFormat,
};
pub use config::{AnalysisConfig, AnalysisConfigBuilder};
pub use diagram::{
    clean_diagram_source, render_diagram, DiagramFormat, DiagramRenderer, FlowchartLint,
    MermaidCli, RenderId, RenderedDiagram,
};
pub use error::{ErrorKind, RenderError, SenseiError};
pub use package::{Flashcard, LearningPackage, QuizQuestion, VideoScene};
pub use pipeline::input::{IngestedFile, IngestedInput};
pub use pipeline::llm::{GeminiBackend, GenerateResponse, GenerativeBackend};
pub use pipeline::request::GenerateRequest;
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
pub use quiz::{QuizAttempt, QuizScore};
pub use report::{render_markdown, ReportOptions, Section};
pub use session::{Session, SessionState};
