//! Markdown report: a learning package laid out section by section.
//!
//! Sections follow the order of the study view (summary, diagrams, code,
//! video, flashcards, quiz, insights); [`ReportOptions`] picks which appear.
//! The flowchart arrives already handed to a renderer (see
//! [`crate::diagram`]), so a diagram failure shows up here as a visible
//! notice with the raw text and the rest of the report is unaffected.

use crate::diagram::{DiagramFormat, RenderedDiagram};
use crate::error::RenderError;
use crate::package::LearningPackage;
use std::fmt::Write as _;
use std::str::FromStr;

/// One section of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Summary,
    Diagrams,
    Code,
    Video,
    Flashcards,
    Quiz,
    Insights,
}

impl Section {
    /// Every section, in report order.
    pub const ALL: [Section; 7] = [
        Section::Summary,
        Section::Diagrams,
        Section::Code,
        Section::Video,
        Section::Flashcards,
        Section::Quiz,
        Section::Insights,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Summary => "summary",
            Section::Diagrams => "diagrams",
            Section::Code => "code",
            Section::Video => "video",
            Section::Flashcards => "flashcards",
            Section::Quiz => "quiz",
            Section::Insights => "insights",
        }
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Section::ALL
            .into_iter()
            .find(|sec| sec.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown section '{s}' (expected one of: {})",
                    Section::ALL.map(Section::as_str).join(", ")
                )
            })
    }
}

/// What to include in a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Sections to render. Always emitted in report order regardless of the
    /// order here; duplicates are ignored.
    pub sections: Vec<Section>,
    /// Mark the correct quiz option. Off means the report can be used as a
    /// worksheet.
    pub reveal_answers: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            sections: Section::ALL.to_vec(),
            reveal_answers: false,
        }
    }
}

impl ReportOptions {
    fn includes(&self, section: Section) -> bool {
        self.sections.contains(&section)
    }
}

/// Render the package as Markdown.
///
/// `diagram` is the outcome of [`crate::diagram::render_diagram`] for the
/// package's flowchart; `None` means no renderer was run and the flowchart is
/// emitted unchecked as a `mermaid` block.
pub fn render_markdown(
    package: &LearningPackage,
    diagram: Option<&RenderedDiagram>,
    options: &ReportOptions,
) -> String {
    let mut out = String::from("# Research Sensei Report\n");

    for section in Section::ALL.into_iter().filter(|s| options.includes(*s)) {
        out.push('\n');
        match section {
            Section::Summary => summary(&mut out, package),
            Section::Diagrams => diagrams(&mut out, package, diagram),
            Section::Code => code(&mut out, package),
            Section::Video => video(&mut out, package),
            Section::Flashcards => flashcards(&mut out, package),
            Section::Quiz => quiz(&mut out, package, options.reveal_answers),
            Section::Insights => insights(&mut out, package),
        }
    }

    out
}

// `write!` into a String cannot fail; results are discarded below.

fn summary(out: &mut String, p: &LearningPackage) {
    let _ = writeln!(out, "## Expert Summary\n\n{}\n", p.expert_summary.trim());
    let _ = writeln!(out, "## Beginner Explanation\n\n{}\n", p.simple_explanation.trim());
    if !p.key_contributions.is_empty() {
        out.push_str("## Key Contributions\n\n");
        for c in &p.key_contributions {
            let _ = writeln!(out, "- {}", c.trim());
        }
        out.push('\n');
    }
}

fn diagrams(out: &mut String, p: &LearningPackage, diagram: Option<&RenderedDiagram>) {
    out.push_str("## Methodology Flowchart\n\n");
    match diagram {
        Some(RenderedDiagram::Rendered {
            format: DiagramFormat::Markdown,
            body,
            ..
        }) => {
            let _ = writeln!(out, "{}\n", body.trim_end());
        }
        Some(RenderedDiagram::Rendered {
            format: DiagramFormat::Svg,
            body,
            id,
        }) => {
            let _ = writeln!(out, "<div id=\"{id}\">\n\n{}\n\n</div>\n", body.trim());
        }
        Some(RenderedDiagram::Placeholder { error, raw, .. }) => {
            let reason = match error {
                RenderError::Syntax { .. } => "has invalid syntax",
                RenderError::RendererFailed { .. } | RenderError::Unavailable { .. } => {
                    "could not be rendered"
                }
            };
            let _ = writeln!(
                out,
                "> **Diagram Render Error**\n>\n> The generated diagram {reason}: {error}\n"
            );
            let fence = fence_for(raw);
            let _ = writeln!(out, "{fence}text\n{}\n{fence}\n", raw.trim_end());
        }
        None => {
            let source = crate::diagram::clean_diagram_source(&p.methodology_flowchart);
            let _ = writeln!(out, "```mermaid\n{source}\n```\n");
        }
    }

    let _ = writeln!(
        out,
        "## Additional Architecture Notes\n\n{}\n",
        p.visual_diagram_description.trim()
    );
}

fn code(out: &mut String, p: &LearningPackage) {
    let fence = fence_for(&p.python_code);
    let _ = writeln!(
        out,
        "## Implementation\n\n{fence}python\n{}\n{fence}\n",
        p.python_code.trim_end()
    );
}

fn video(out: &mut String, p: &LearningPackage) {
    out.push_str("## Video Storyboard & Script\n\n");
    for (i, scene) in p.video_script.iter().enumerate() {
        let _ = writeln!(out, "### Scene {}: {}\n", i + 1, scene.scene.trim());
        let _ = writeln!(out, "**Visual:** {}\n", scene.visual.trim());
        let _ = writeln!(out, "**Narration:** {}\n", scene.narration.trim());
    }
}

fn flashcards(out: &mut String, p: &LearningPackage) {
    out.push_str("## Flashcards\n\n");
    for (i, card) in p.flashcards.iter().enumerate() {
        let _ = writeln!(out, "{}. **Q:** {}", i + 1, card.front.trim());
        let _ = writeln!(out, "   **A:** {}", card.back.trim());
    }
    if !p.flashcards.is_empty() {
        out.push('\n');
    }
}

fn quiz(out: &mut String, p: &LearningPackage, reveal: bool) {
    out.push_str("## Knowledge Check\n\n");
    for (i, q) in p.quiz.iter().enumerate() {
        let _ = writeln!(out, "{}. {}\n", i + 1, q.question.trim());
        for (o, option) in q.options.iter().enumerate() {
            let marker = if reveal && q.is_correct(o) { " ✓" } else { "" };
            let _ = writeln!(out, "   {}. {}{}", option_letter(o), option.trim(), marker);
        }
        out.push('\n');
    }
}

fn insights(out: &mut String, p: &LearningPackage) {
    let _ = writeln!(
        out,
        "## Future Scope & Limitations\n\n{}\n",
        p.additional_insights.trim()
    );
}

/// A backtick fence longer than any backtick run inside `body` (minimum 4),
/// so fences the model wrote cannot close the block early.
fn fence_for(body: &str) -> String {
    let longest = body
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat((longest + 1).max(4))
}

/// `0 → A`, `25 → Z`, then `AA`, `AB`, …
pub fn option_letter(index: usize) -> String {
    let mut n = index;
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    letters.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::RenderId;
    use crate::error::RenderError;
    use crate::package::fixtures::sample_package;

    fn only(sections: &[Section]) -> ReportOptions {
        ReportOptions {
            sections: sections.to_vec(),
            reveal_answers: false,
        }
    }

    #[test]
    fn full_report_has_sections_in_order() {
        let md = render_markdown(&sample_package(), None, &ReportOptions::default());
        let heads = [
            "## Expert Summary",
            "## Methodology Flowchart",
            "## Implementation",
            "## Video Storyboard",
            "## Flashcards",
            "## Knowledge Check",
            "## Future Scope",
        ];
        let positions: Vec<usize> = heads.iter().map(|h| md.find(h).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
    }

    #[test]
    fn section_order_is_fixed() {
        let md = render_markdown(
            &sample_package(),
            None,
            &only(&[Section::Insights, Section::Summary]),
        );
        assert!(md.find("## Expert Summary").unwrap() < md.find("## Future Scope").unwrap());
        assert!(!md.contains("## Implementation"));
    }

    #[test]
    fn placeholder_shows_notice_and_raw_text() {
        let raw = "graph TD\nA[Input Data] --> B[Process]";
        let diagram = RenderedDiagram::Placeholder {
            id: RenderId::fresh(),
            error: RenderError::Syntax {
                line: Some(2),
                detail: "label of node 'A' must be wrapped in double quotes".into(),
            },
            raw: raw.into(),
        };
        let md = render_markdown(&sample_package(), Some(&diagram), &only(&[Section::Diagrams]));
        assert!(md.contains("Diagram Render Error"));
        assert!(md.contains("```text\ngraph TD\nA[Input Data] --> B[Process]\n```"));
        assert!(md.contains("on line 2"));
        assert!(md.contains("## Additional Architecture Notes"));
    }

    #[test]
    fn fenced_raw_text_stays_inside_the_notice_block() {
        let raw = "```mermaid\ngraph TD\nA[Input Data] --> B[Process]\n```";
        let diagram = RenderedDiagram::Placeholder {
            id: RenderId::fresh(),
            error: RenderError::Syntax {
                line: Some(2),
                detail: "label of node 'A' must be wrapped in double quotes".into(),
            },
            raw: raw.into(),
        };
        let md = render_markdown(&sample_package(), Some(&diagram), &only(&[Section::Diagrams]));
        assert!(md.contains(&format!("````text\n{raw}\n````\n")));

        let longer = "`````\ngraph TD\n`````";
        assert_eq!(fence_for(longer), "``````");
        assert_eq!(fence_for("graph TD"), "````");
    }

    #[test]
    fn unavailable_renderer_is_not_called_a_syntax_error() {
        let diagram = RenderedDiagram::Placeholder {
            id: RenderId::fresh(),
            error: RenderError::Unavailable {
                renderer: "mmdc".into(),
            },
            raw: "graph TD\n  A[\"x\"]".into(),
        };
        let md = render_markdown(&sample_package(), Some(&diagram), &only(&[Section::Diagrams]));
        assert!(md.contains("could not be rendered"));
        assert!(!md.contains("invalid syntax"));
    }

    #[test]
    fn unrendered_flowchart_is_emitted_as_mermaid() {
        let md = render_markdown(&sample_package(), None, &only(&[Section::Diagrams]));
        assert!(md.contains("```mermaid\ngraph TD\n  A[\"Input\"] --> B[\"Encoder\"]\n```"));
    }

    #[test]
    fn quiz_hides_answers_unless_revealed() {
        let p = sample_package();
        let hidden = render_markdown(&p, None, &only(&[Section::Quiz]));
        assert!(hidden.contains("   A. Convolution\n"));
        assert!(hidden.contains("   B. Self-attention\n"));
        assert!(!hidden.contains('✓'));

        let shown = render_markdown(
            &p,
            None,
            &ReportOptions {
                sections: vec![Section::Quiz],
                reveal_answers: true,
            },
        );
        assert!(shown.contains("   B. Self-attention ✓"));
        assert!(!shown.contains("Convolution ✓"));
    }

    #[test]
    fn code_and_video_layout() {
        let md = render_markdown(&sample_package(), None, &only(&[Section::Code, Section::Video]));
        assert!(md.contains("```python\nprint('attention')\n```"));
        assert!(md.contains("### Scene 1: Intro"));
        assert!(md.contains("**Narration:** Today: attention."));
    }

    #[test]
    fn section_parsing() {
        assert_eq!("Quiz".parse::<Section>(), Ok(Section::Quiz));
        assert_eq!(" video ".parse::<Section>(), Ok(Section::Video));
        assert!("slides".parse::<Section>().unwrap_err().contains("flashcards"));
    }

    #[test]
    fn option_letters() {
        assert_eq!(option_letter(0), "A");
        assert_eq!(option_letter(3), "D");
        assert_eq!(option_letter(25), "Z");
        assert_eq!(option_letter(26), "AA");
    }
}
