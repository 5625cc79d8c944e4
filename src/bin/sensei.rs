//! CLI binary for research-sensei.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AnalysisConfig`, runs one analysis through a `Session` and prints the
//! report.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use research_sensei::config::DEFAULT_MODEL;
use research_sensei::pipeline::input::{resolve_input, IngestedInput};
use research_sensei::report::option_letter;
use research_sensei::{
    render_diagram, render_markdown, write_atomic, AnalysisConfig, AnalysisProgressCallback,
    DiagramRenderer, FlowchartLint, LearningPackage, MermaidCli, ProgressCallback, QuizAttempt,
    QuizScore, ReportOptions, Section, Session, SessionState,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner for the single long generation call.
struct CliProgressCallback {
    bar: ProgressBar,
    request_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            request_started: Mutex::new(None),
        })
    }

    fn request_elapsed(&self) -> Option<f64> {
        self.request_started
            .lock()
            .ok()
            .and_then(|g| g.map(|t| t.elapsed().as_secs_f64()))
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_input_ready(&self, description: &str, bytes: usize) {
        self.bar.println(format!(
            "{} {}  {}",
            cyan("◆"),
            bold(&format!("Analysing {description}")),
            dim(&format!("{bytes} bytes"))
        ));
    }

    fn on_request_sent(&self, provider: &str, model: &str) {
        if let Ok(mut started) = self.request_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_prefix("Generating");
        self.bar.set_message(format!("{provider}/{model}"));
    }

    fn on_response_received(&self, response_len: usize) {
        self.bar.set_prefix("Parsing");
        self.bar.set_message(format!("{response_len} chars"));
    }

    fn on_analysis_complete(&self, error: Option<&str>) {
        let secs = self.request_elapsed().unwrap_or(0.0);
        self.bar.finish_and_clear();
        match error {
            None => eprintln!(
                "{} Learning package ready  {}",
                green("✔"),
                dim(&format!("{secs:.1}s"))
            ),
            Some(e) => {
                // Truncate very long error messages to keep output tidy.
                let first = e.lines().next().unwrap_or(e);
                let msg = if first.chars().count() > 100 {
                    format!("{}\u{2026}", first.chars().take(99).collect::<String>())
                } else {
                    first.to_string()
                };
                eprintln!("{} {}", red("✘"), red(&msg));
            }
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyse a local paper, report to stdout
  sensei paper.pdf

  # Analyse a paper from a URL and save the report
  sensei https://arxiv.org/pdf/1706.03762 -o attention.md

  # Paste an abstract instead of a file
  sensei --text "We propose a new simple network architecture, the Transformer…"

  # Only the summary and quiz, with answers marked
  sensei paper.pdf --section summary --section quiz --reveal-answers

  # Take the quiz interactively after the report
  sensei paper.pdf --quiz

  # Raw learning package as JSON
  sensei paper.pdf --json > package.json

  # Render the flowchart to SVG with mermaid-cli
  sensei paper.pdf --renderer mmdc -o report.md

SECTIONS:
  summary, diagrams, code, video, flashcards, quiz, insights

DIAGRAM RENDERERS:
  lint   built-in check of the quoted-label flowchart syntax (default)
  mmdc   @mermaid-js/mermaid-cli, must be on PATH; embeds SVG
  none   emit the flowchart unchecked as a mermaid block

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (required)
  SENSEI_MODEL            Override model ID
  SENSEI_TEMPERATURE      Sampling temperature
  SENSEI_TIMEOUT          Request timeout in seconds
  RUST_LOG                Log filter, e.g. research_sensei=debug

Nothing is retried automatically. If an analysis fails, run the command again.
"#;

/// Turn research papers into learning packages using Gemini.
#[derive(Parser, Debug)]
#[command(
    name = "sensei",
    version,
    about = "Turn research papers into learning packages using Gemini",
    long_about = "Analyse a research paper (local file, URL) or pasted text with a Gemini model \
and produce a learning package: expert and beginner summaries, a methodology flowchart, \
illustrative code, a video script, flashcards and a quiz.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local document path or HTTP/HTTPS URL.
    #[arg(conflicts_with_all = ["text", "text_file"])]
    input: Option<String>,

    /// Analyse this text instead of a document.
    #[arg(long, conflicts_with = "text_file")]
    text: Option<String>,

    /// Analyse the contents of this text file instead of a document.
    #[arg(long, value_name = "PATH")]
    text_file: Option<PathBuf>,

    /// Write the report to this file instead of stdout.
    #[arg(short, long, env = "SENSEI_OUTPUT")]
    output: Option<PathBuf>,

    /// Output the learning package as JSON instead of a Markdown report.
    #[arg(long, env = "SENSEI_JSON")]
    json: bool,

    /// Report section to include (repeatable). Default: all.
    #[arg(long = "section", value_name = "SECTION", value_parser = parse_section)]
    sections: Vec<Section>,

    /// Mark the correct option of each quiz question in the report.
    #[arg(long)]
    reveal_answers: bool,

    /// Take the quiz interactively after the report is written.
    #[arg(long)]
    quiz: bool,

    /// Gemini model ID.
    #[arg(long, env = "SENSEI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Sampling temperature (0.0–2.0). Default: provider default.
    #[arg(long, env = "SENSEI_TEMPERATURE")]
    temperature: Option<f32>,

    /// Cap on generated tokens. Default: provider default.
    #[arg(long, env = "SENSEI_MAX_OUTPUT_TOKENS")]
    max_output_tokens: Option<u32>,

    /// Request timeout in seconds. Default: none.
    #[arg(long, env = "SENSEI_TIMEOUT")]
    timeout: Option<u64>,

    /// Flowchart renderer.
    #[arg(long, env = "SENSEI_RENDERER", value_enum, default_value = "lint")]
    renderer: RendererArg,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "SENSEI_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable the progress spinner.
    #[arg(long, env = "SENSEI_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SENSEI_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SENSEI_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum RendererArg {
    Lint,
    Mmdc,
    None,
}

fn parse_section(s: &str) -> Result<Section, String> {
    s.parse()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner provides the feedback that matters; keep INFO logs out of
    // its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Collect input ────────────────────────────────────────────────────
    let input = read_input(&cli).await?;

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn AnalysisProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run analysis ─────────────────────────────────────────────────────
    let mut session = Session::new(config);
    let package = match session.submit(&input).await? {
        SessionState::Succeeded(package) => package.clone(),
        SessionState::Failed(e) => {
            anyhow::bail!("Analysis failed: {e}\nNothing was retried; run the command again to try again.")
        }
        other => anyhow::bail!("Analysis ended in unexpected state {other:?}"),
    };

    // ── Produce output ───────────────────────────────────────────────────
    let rendered = if cli.json {
        serde_json::to_string_pretty(&package).context("Failed to serialise package")?
    } else {
        build_report(&cli, &package).await
    };

    if let Some(ref path) = cli.output {
        write_atomic(path, &rendered)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if !cli.quiet {
            eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(rendered.as_bytes())
            .context("Failed to write to stdout")?;
        // Ensure a trailing newline on stdout.
        if !rendered.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    // ── Interactive quiz ─────────────────────────────────────────────────
    if cli.quiz {
        if package.quiz.is_empty() {
            eprintln!("{} The package has no quiz questions.", cyan("⚠"));
        } else {
            let score = tokio::task::block_in_place(|| run_quiz(&package))?;
            eprintln!("\n{} Score: {}", bold("◆"), bold(&score.to_string()));
        }
    }

    Ok(())
}

/// Turn the positional input or the text flags into one `IngestedInput`.
async fn read_input(cli: &Cli) -> Result<IngestedInput> {
    let file = match cli.input {
        Some(ref src) => Some(
            resolve_input(src, cli.download_timeout)
                .await
                .with_context(|| format!("Failed to read {src}"))?,
        ),
        None => None,
    };

    let text = match (&cli.text, &cli.text_file) {
        (Some(t), _) => Some(t.clone()),
        (None, Some(path)) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read text from {:?}", path))?,
        ),
        (None, None) => None,
    };

    Ok(IngestedInput::from_parts(file, text)?)
}

/// Map CLI args to `AnalysisConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .model(cli.model.clone())
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(n) = cli.max_output_tokens {
        builder = builder.max_output_tokens(n);
    }
    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn build_report(cli: &Cli, package: &LearningPackage) -> String {
    let renderer: Option<Box<dyn DiagramRenderer>> = match cli.renderer {
        RendererArg::Lint => Some(Box::new(FlowchartLint)),
        RendererArg::Mmdc => Some(Box::new(MermaidCli::default())),
        RendererArg::None => None,
    };

    let wants_diagram = cli.sections.is_empty() || cli.sections.contains(&Section::Diagrams);
    let diagram = match renderer {
        Some(ref r) if wants_diagram => {
            Some(render_diagram(r.as_ref(), &package.methodology_flowchart).await)
        }
        _ => None,
    };
    if let Some(ref d) = diagram {
        if d.is_placeholder() && !cli.quiet {
            eprintln!(
                "{} The generated flowchart could not be rendered; the raw text is in the report.",
                cyan("⚠")
            );
        }
    }

    let options = ReportOptions {
        sections: if cli.sections.is_empty() {
            Section::ALL.to_vec()
        } else {
            cli.sections.clone()
        },
        reveal_answers: cli.reveal_answers,
    };
    render_markdown(package, diagram.as_ref(), &options)
}

/// Ask each question on stderr, read answers from stdin, then score.
fn run_quiz(package: &LearningPackage) -> Result<QuizScore> {
    let mut attempt = QuizAttempt::new(package);
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    eprintln!("\n{}", bold("Knowledge Check"));
    for (i, q) in package.quiz.iter().enumerate() {
        eprintln!("\n{}. {}", i + 1, q.question);
        for (o, option) in q.options.iter().enumerate() {
            eprintln!("   {}. {}", option_letter(o), option);
        }

        loop {
            eprint!("{} ", cyan("answer>"));
            io::stderr().flush().ok();
            let Some(line) = lines.next() else {
                anyhow::bail!("Quiz aborted: input closed");
            };
            let line = line.context("Failed to read answer")?;
            match parse_choice(&line, q.options.len()) {
                Some(choice) if attempt.select(i, choice) => break,
                _ => eprintln!(
                    "{}",
                    dim(&format!(
                        "Enter a letter A–{} or a number 1–{}",
                        option_letter(q.options.len() - 1),
                        q.options.len()
                    ))
                ),
            }
        }
    }

    attempt.submit();

    for (i, q) in package.quiz.iter().enumerate() {
        let chosen = attempt.answer(i);
        let mark = if chosen.is_some_and(|c| q.is_correct(c)) {
            green("✓")
        } else {
            red("✗")
        };
        eprintln!(
            "{} {}. correct answer: {}. {}",
            mark,
            i + 1,
            option_letter(q.correct_answer_index),
            q.correct_option().unwrap_or_default()
        );
    }

    Ok(attempt.score(package))
}

/// Accept `B`, `b` or `2` for the second option.
fn parse_choice(input: &str, option_count: usize) -> Option<usize> {
    let s = input.trim();
    let index = if let Ok(n) = s.parse::<usize>() {
        n.checked_sub(1)?
    } else {
        let mut chars = s.chars();
        let c = chars.next()?.to_ascii_uppercase();
        if chars.next().is_some() || !c.is_ascii_uppercase() {
            return None;
        }
        (c as u8 - b'A') as usize
    };
    (index < option_count).then_some(index)
}
