//! Rendering of search results for the terminal or for other programs.
//!
//! Three styles are supported: pretty-printed JSON for machines, one line
//! per paper for scanning, and a detailed block per paper. Colour is purely
//! cosmetic and never applied to JSON.

use owo_colors::{OwoColorize, Style};
use regex::Regex;
use std::io::{self, Write};
use std::sync::OnceLock;

use crate::models::Paper;

/// Indentation of the detail lines under each title
const DETAIL_INDENT: &str = "    ";

/// How results are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputStyle {
    /// Pretty-printed JSON array
    Json,
    /// `[<index>, <date>] <title>` per paper
    Compact,
    /// Title, authors, date, link and abstract per paper
    #[default]
    Detailed,
}

/// Terminal styles for the individual fields
#[derive(Debug, Clone, Copy)]
struct Palette {
    enabled: bool,
}

impl Palette {
    fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.enabled {
            text.style(style).to_string()
        } else {
            text.to_string()
        }
    }

    fn index(&self, text: &str) -> String {
        self.paint(text, Style::new().cyan())
    }

    fn title(&self, text: &str) -> String {
        self.paint(text, Style::new().bold())
    }

    fn author(&self, text: &str) -> String {
        self.paint(text, Style::new().green())
    }

    fn date(&self, text: &str) -> String {
        self.paint(text, Style::new().yellow())
    }

    fn link(&self, text: &str) -> String {
        self.paint(text, Style::new().blue())
    }

    fn abstract_text(&self, text: &str) -> String {
        self.paint(text, Style::new().dimmed())
    }

    /// Colour each name separately; the ` et al.` marker stays plain while
    /// its `(<total>)` count is coloured like the names
    fn authors(&self, authors: &str) -> String {
        if !self.enabled || authors.is_empty() {
            return authors.to_string();
        }

        static ET_AL: OnceLock<Option<Regex>> = OnceLock::new();
        let captures = ET_AL
            .get_or_init(|| Regex::new(r"^(.*) et al\. (\(\d+\))$").ok())
            .as_ref()
            .and_then(|et_al| et_al.captures(authors));

        let (names, count) = match captures {
            Some(caps) => (
                caps.get(1).map_or("", |m| m.as_str()),
                caps.get(2).map(|m| m.as_str()),
            ),
            None => (authors, None),
        };

        let names = names
            .split(", ")
            .map(|name| self.author(name))
            .collect::<Vec<_>>()
            .join(", ");

        match count {
            Some(count) => format!("{} et al. {}", names, self.author(count)),
            None => names,
        }
    }
}

/// Render papers in the given style. The result ends with a newline unless
/// there is nothing to render in a line-based style.
pub fn render_papers(papers: &[Paper], style: OutputStyle, color: bool) -> serde_json::Result<String> {
    let rendered = match style {
        OutputStyle::Json => format!("{}\n", serde_json::to_string_pretty(papers)?),
        OutputStyle::Compact => render_compact(papers, Palette::new(color)),
        OutputStyle::Detailed => render_detailed(papers, Palette::new(color)),
    };
    Ok(rendered)
}

/// Render papers and write them to `out`
pub fn write_papers<W: Write>(
    out: &mut W,
    papers: &[Paper],
    style: OutputStyle,
    color: bool,
) -> io::Result<()> {
    let rendered = render_papers(papers, style, color)?;
    out.write_all(rendered.as_bytes())?;
    out.flush()
}

fn render_compact(papers: &[Paper], palette: Palette) -> String {
    let width = papers.len().to_string().len();

    papers
        .iter()
        .enumerate()
        .map(|(i, paper)| {
            let index = format!("{:0width$}", i + 1, width = width);
            format!(
                "[{}, {}] {}\n",
                palette.index(&index),
                palette.date(&paper.published),
                palette.title(&paper.title)
            )
        })
        .collect()
}

fn render_detailed(papers: &[Paper], palette: Palette) -> String {
    papers
        .iter()
        .enumerate()
        .map(|(i, paper)| {
            format!(
                "\n[{}] {}\n{indent}{}\n{indent}{} | {}\n{indent}{}\n",
                palette.index(&(i + 1).to_string()),
                palette.title(&paper.title),
                palette.authors(&paper.authors),
                palette.date(&paper.published),
                palette.link(&paper.link),
                palette.abstract_text(&paper.r#abstract),
                indent = DETAIL_INDENT,
            )
        })
        .collect()
}
