//! Flowchart handoff: model-written Mermaid text → rendered diagram or placeholder.
//!
//! The flowchart is the riskiest field of a learning package: free text from
//! a model, handed to a renderer that is strict about syntax. This module
//! makes sure a bad diagram costs exactly one placeholder and nothing else.
//!
//! ## Handoff Steps
//!
//! 1. [`clean_diagram_source`] strips the code fences models add despite being
//!    told not to.
//! 2. [`RenderId::fresh`] names the attempt. Rendering the same text twice
//!    yields two ids, so renderer state (temp files, DOM ids) never collides.
//! 3. The [`DiagramRenderer`] runs. Any [`RenderError`] becomes a
//!    [`RenderedDiagram::Placeholder`] carrying the raw text.
//!
//! Two renderers ship with the crate: [`FlowchartLint`], a built-in checker
//! for the quoted-label flowchart subset the prompt asks for, and
//! [`MermaidCli`], which shells out to `mmdc` for real SVG output.

use crate::error::RenderError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

// ── Source cleanup ───────────────────────────────────────────────────────

static RE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(?:mermaid)?").unwrap());

/// Remove code-fence markers and normalise line endings.
pub fn clean_diagram_source(input: &str) -> String {
    let s = input.replace("\r\n", "\n").replace('\r', "\n");
    RE_FENCE.replace_all(&s, "").trim().to_string()
}

// ── Render ids ───────────────────────────────────────────────────────────

static NEXT_RENDER: AtomicU64 = AtomicU64::new(0);

/// Identifier of one render attempt. Unique within the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RenderId(String);

impl RenderId {
    /// Allocate a new id.
    pub fn fresh() -> Self {
        let n = NEXT_RENDER.fetch_add(1, Ordering::Relaxed);
        RenderId(format!("sensei-diagram-{}-{}", std::process::id(), n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RenderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Renderer seam ────────────────────────────────────────────────────────

/// What a renderer produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramFormat {
    /// A Markdown ```` ```mermaid ```` block, drawn by the Markdown viewer.
    Markdown,
    /// A standalone SVG document.
    Svg,
}

/// An external diagram renderer.
#[async_trait]
pub trait DiagramRenderer: Send + Sync {
    fn name(&self) -> &str;

    fn format(&self) -> DiagramFormat;

    /// Render already-cleaned source under the given attempt id.
    async fn render(&self, id: &RenderId, source: &str) -> Result<String, RenderError>;
}

/// Outcome of one handoff. Never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RenderedDiagram {
    Rendered {
        id: RenderId,
        format: DiagramFormat,
        body: String,
    },
    Placeholder {
        id: RenderId,
        error: RenderError,
        /// The text exactly as the model produced it.
        raw: String,
    },
}

impl RenderedDiagram {
    pub fn id(&self) -> &RenderId {
        match self {
            RenderedDiagram::Rendered { id, .. } | RenderedDiagram::Placeholder { id, .. } => id,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, RenderedDiagram::Placeholder { .. })
    }
}

/// Hand diagram text to a renderer, degrading to a placeholder on failure.
pub async fn render_diagram(renderer: &dyn DiagramRenderer, raw: &str) -> RenderedDiagram {
    let id = RenderId::fresh();
    let source = clean_diagram_source(raw);

    let result = if source.is_empty() {
        Err(RenderError::Syntax {
            line: None,
            detail: "empty diagram".into(),
        })
    } else {
        renderer.render(&id, &source).await
    };

    match result {
        Ok(body) => {
            debug!("Rendered {} with {} ({} bytes)", id, renderer.name(), body.len());
            RenderedDiagram::Rendered {
                id,
                format: renderer.format(),
                body,
            }
        }
        Err(error) => {
            warn!("Diagram {} could not be rendered by {}: {}", id, renderer.name(), error);
            RenderedDiagram::Placeholder {
                id,
                error,
                raw: raw.to_string(),
            }
        }
    }
}

// ── Built-in lint renderer ───────────────────────────────────────────────

/// Strict checker for the flowchart subset requested in the prompt.
///
/// Accepts `graph`/`flowchart` diagrams whose node ids are ASCII alphanumeric
/// and whose bracketed labels are all double-quoted. On success the source is
/// emitted as a Markdown `mermaid` block.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowchartLint;

#[async_trait]
impl DiagramRenderer for FlowchartLint {
    fn name(&self) -> &str {
        "flowchart-lint"
    }

    fn format(&self) -> DiagramFormat {
        DiagramFormat::Markdown
    }

    async fn render(&self, _id: &RenderId, source: &str) -> Result<String, RenderError> {
        lint_flowchart(source)?;
        Ok(format!("```mermaid\n{source}\n```"))
    }
}

const DIRECTIONS: [&str; 5] = ["TD", "TB", "BT", "RL", "LR"];

const DIRECTIVES: [&str; 8] = [
    "subgraph", "end", "classDef", "class", "style", "linkStyle", "click", "direction",
];

/// Check cleaned flowchart source against the quoted-label grammar.
pub fn lint_flowchart(source: &str) -> Result<(), RenderError> {
    let mut lines = source
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with("%%"));

    let (first_no, first) = lines.next().ok_or(RenderError::Syntax {
        line: None,
        detail: "empty diagram".into(),
    })?;

    let (header, rest) = match first.split_once(';') {
        Some((h, r)) => (h.trim(), r.trim()),
        None => (first, ""),
    };
    check_header(header).map_err(|detail| RenderError::Syntax {
        line: Some(first_no),
        detail,
    })?;
    if !rest.is_empty() {
        check_line(rest).map_err(|detail| RenderError::Syntax {
            line: Some(first_no),
            detail,
        })?;
    }

    for (no, line) in lines {
        check_line(line).map_err(|detail| RenderError::Syntax {
            line: Some(no),
            detail,
        })?;
    }
    Ok(())
}

fn check_header(header: &str) -> Result<(), String> {
    let mut words = header.split_whitespace();
    match words.next() {
        Some("graph") | Some("flowchart") => {}
        other => {
            return Err(format!(
                "expected a flowchart header ('graph TD' or 'flowchart LR'), found '{}'",
                other.unwrap_or_default()
            ))
        }
    }
    if let Some(dir) = words.next() {
        if !DIRECTIONS.contains(&dir) {
            return Err(format!("unknown direction '{dir}'"));
        }
    }
    if let Some(extra) = words.next() {
        return Err(format!("unexpected '{extra}' after header"));
    }
    Ok(())
}

fn check_line(line: &str) -> Result<(), String> {
    let keyword = line.split_whitespace().next().unwrap_or_default();
    if DIRECTIVES.contains(&keyword) {
        return Ok(());
    }
    Cursor::new(line).statements()
}

/// Character cursor over one statement line.
struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn new(line: &str) -> Self {
        Self {
            chars: line.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn rest(&self) -> String {
        self.chars[self.pos..].iter().collect()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// `statement (';' statement)*` where a statement is
    /// `group (link group)*` and a group is `node ('&' node)*`.
    fn statements(mut self) -> Result<(), String> {
        loop {
            self.skip_ws();
            if self.eof() {
                return Ok(());
            }
            self.node_group()?;
            loop {
                self.skip_ws();
                match self.peek() {
                    None => return Ok(()),
                    Some(';') => {
                        self.pos += 1;
                        break;
                    }
                    Some(_) => {
                        self.link()?;
                        self.skip_ws();
                        self.node_group()?;
                    }
                }
            }
        }
    }

    fn node_group(&mut self) -> Result<(), String> {
        self.node()?;
        loop {
            self.skip_ws();
            if self.peek() != Some('&') {
                return Ok(());
            }
            self.pos += 1;
            self.skip_ws();
            self.node()?;
        }
    }

    fn node(&mut self) -> Result<(), String> {
        let id = self.take_while(|c| c.is_ascii_alphanumeric());
        if id.is_empty() {
            return Err(match self.peek() {
                Some(c) => format!("expected an alphanumeric node id, found '{c}'"),
                None => "expected a node id at end of line".to_string(),
            });
        }
        self.class_suffix();

        if matches!(self.peek(), Some('[' | '(' | '{' | '>')) {
            let opener = self.take_while(|c| "[({>/\\".contains(c));
            if self.peek() != Some('"') {
                return Err(format!(
                    "label of node '{id}' must be wrapped in double quotes"
                ));
            }
            self.pos += 1;
            self.take_while(|c| c != '"');
            if self.eof() {
                return Err(format!("unterminated label on node '{id}'"));
            }
            self.pos += 1;
            let closer = self.take_while(|c| "])}/\\".contains(c));
            if closer.is_empty() {
                return Err(format!("label of node '{id}' is not closed"));
            }
            if closer.chars().count() != opener.chars().count() {
                return Err(format!("mismatched brackets on node '{id}'"));
            }
            self.class_suffix();
        }

        match self.peek() {
            None | Some(' ' | '\t' | ';' | '&' | '-' | '=' | '.' | '<') => Ok(()),
            Some(c) => Err(format!(
                "unexpected '{c}' after node '{id}' (ids must be alphanumeric only)"
            )),
        }
    }

    fn class_suffix(&mut self) {
        if self.rest().starts_with(":::") {
            self.pos += 3;
            self.take_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        }
    }

    fn link(&mut self) -> Result<(), String> {
        if self.peek() == Some('<') {
            self.pos += 1;
        }
        let run = self.take_while(|c| c == '-' || c == '=' || c == '.');
        if run.chars().count() < 2 {
            return Err(format!("expected a link such as '-->', found '{}'", self.rest()));
        }

        let headed = match self.peek() {
            Some('>') => {
                self.pos += 1;
                true
            }
            Some('o' | 'x')
                if self
                    .chars
                    .get(self.pos + 1)
                    .map_or(true, |c| c.is_whitespace()) =>
            {
                self.pos += 1;
                true
            }
            _ => false,
        };

        // `A -- text --> B` form
        if !headed && matches!(run.as_str(), "--" | "==" | "-.") {
            let rest = self.rest();
            let end = ["-->", "==>", ".->", "---", "==="]
                .iter()
                .filter_map(|t| rest.find(t).map(|i| (i, t.len())))
                .min_by_key(|(i, _)| *i);
            let Some((idx, len)) = end else {
                return Err("unterminated link text".to_string());
            };
            self.pos += rest[..idx + len].chars().count();
            self.take_while(|c| c == '-' || c == '=' || c == '>');
        }

        self.skip_ws();
        if self.peek() == Some('|') {
            self.pos += 1;
            self.take_while(|c| c != '|');
            if self.eof() {
                return Err("unterminated link label".to_string());
            }
            self.pos += 1;
        }
        Ok(())
    }
}

// ── mermaid-cli renderer ─────────────────────────────────────────────────

static RE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)on line (\d+)").unwrap());

/// Renders through the `mmdc` binary from `@mermaid-js/mermaid-cli`.
///
/// Each attempt gets its own temp directory with files named after the
/// [`RenderId`], removed when the attempt finishes.
#[derive(Debug, Clone)]
pub struct MermaidCli {
    program: PathBuf,
    theme: String,
}

impl Default for MermaidCli {
    fn default() -> Self {
        Self {
            program: PathBuf::from("mmdc"),
            theme: "dark".to_string(),
        }
    }
}

impl MermaidCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = theme.into();
        self
    }
}

#[async_trait]
impl DiagramRenderer for MermaidCli {
    fn name(&self) -> &str {
        "mmdc"
    }

    fn format(&self) -> DiagramFormat {
        DiagramFormat::Svg
    }

    async fn render(&self, id: &RenderId, source: &str) -> Result<String, RenderError> {
        let failed = |e: std::io::Error| RenderError::RendererFailed {
            detail: e.to_string(),
        };

        let work = tempfile::TempDir::new().map_err(failed)?;
        let input = work.path().join(format!("{id}.mmd"));
        let output = work.path().join(format!("{id}.svg"));
        tokio::fs::write(&input, source).await.map_err(failed)?;

        let result = tokio::process::Command::new(&self.program)
            .arg("-i")
            .arg(&input)
            .arg("-o")
            .arg(&output)
            .arg("-t")
            .arg(&self.theme)
            .output()
            .await;

        let out = match result {
            Ok(out) => out,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RenderError::Unavailable {
                    renderer: self.program.display().to_string(),
                })
            }
            Err(e) => return Err(failed(e)),
        };

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            let line = RE_LINE
                .captures(&stderr)
                .and_then(|c| c[1].parse::<usize>().ok());
            let detail = stderr
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .unwrap_or("mmdc exited with an error")
                .to_string();
            return Err(RenderError::Syntax { line, detail });
        }

        tokio::fs::read_to_string(&output).await.map_err(failed)
    }
}
