//! Pipeline stages for analysing one input.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested without the others and without a network.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ request ──▶ llm ──▶ parse
//! (path/URL) (base64)  (body)     (Gemini) (validate)
//! ```
//!
//! 1. [`input`]   — read a path, URL or data URL; pasted text passes through
//! 2. [`encode`]  — the single base64 normalisation both read paths share
//! 3. [`request`] — inline part + task prompt + response schema
//! 4. [`llm`]     — one call to the generative backend; the only stage with
//!    network I/O
//! 5. [`parse`]   — JSON decode plus invariant checks; never repairs data

pub mod encode;
pub mod input;
pub mod llm;
pub mod parse;
pub mod request;
