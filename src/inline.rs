//! Inline formatting: links, bold, italic and inline code.
//!
//! Where two constructs overlap the later one in that list owns the region:
//! markers inside backticks are code text, and emphasis inside a link's
//! display text still applies. The one exception is bold over italic: single
//! `*` inside a `**...**` run stay literal.
//!
//! Each character is a cell carrying its style. A pass scans a view of the
//! cells in which cells owned by a winning construct are replaced by an
//! opaque placeholder, so their markers cannot be matched.

use std::sync::LazyLock;

use regex::Regex;

use crate::block::{InlineText, Span, Style};

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());
// Delimiters must hug their content so `2 * 3 * 4` stays literal. The
// one-character alternative comes first so `**1** and **2**` stays two runs.
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(\S|\S.*?\S)\*\*").unwrap());
static ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\s]|[^*\s][^*]*?[^*\s])\*").unwrap());
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());

/// Stands in for cells a pass must not look into. Not whitespace, not a marker.
const OPAQUE: char = '\u{E000}';

#[derive(Clone, Copy, Debug)]
enum Rule {
    Link,
    Bold,
    Italic,
    Code,
}

/// Resolution order: code first so it shadows every other marker.
const PASSES: [Rule; 4] = [Rule::Code, Rule::Link, Rule::Bold, Rule::Italic];

impl Rule {
    fn pattern(self) -> &'static Regex {
        match self {
            Rule::Link => &LINK_RE,
            Rule::Bold => &BOLD_RE,
            Rule::Italic => &ITALIC_RE,
            Rule::Code => &CODE_RE,
        }
    }

    fn is_opaque(self, style: &Style) -> bool {
        match self {
            Rule::Code => false,
            Rule::Link | Rule::Bold => style.code,
            Rule::Italic => style.code || style.bold,
        }
    }

    fn mark(self, style: &mut Style, url: Option<&str>) {
        match self {
            Rule::Link => style.link = url.map(str::to_string),
            Rule::Bold => style.bold = true,
            Rule::Italic => style.italic = true,
            Rule::Code => style.code = true,
        }
    }
}

#[derive(Clone, Debug)]
struct Cell {
    ch: char,
    style: Style,
}

/// Resolve inline markup in one line of prose.
pub fn format_inline(raw: &str) -> InlineText {
    let mut cells: Vec<Cell> = raw
        .chars()
        .map(|ch| Cell {
            ch,
            style: Style::default(),
        })
        .collect();
    for rule in PASSES {
        cells = apply(rule, cells);
    }

    let mut spans: Vec<Span> = Vec::new();
    for cell in cells {
        match spans.last_mut() {
            Some(span) if span.style == cell.style => span.text.push(cell.ch),
            _ => spans.push(Span::new(cell.ch.to_string(), cell.style)),
        }
    }
    InlineText::from_spans(spans)
}

/// Run one rule: drop the markers of every match and mark its inner cells.
fn apply(rule: Rule, cells: Vec<Cell>) -> Vec<Cell> {
    let mut view = String::with_capacity(cells.len());
    let mut offsets = Vec::with_capacity(cells.len() + 1);
    for cell in &cells {
        offsets.push(view.len());
        view.push(if rule.is_opaque(&cell.style) {
            OPAQUE
        } else {
            cell.ch
        });
    }
    offsets.push(view.len());
    // Matches always land on char boundaries, which are exactly the offsets.
    let cell_at = |byte: usize| offsets.partition_point(|&offset| offset < byte);

    let mut out = Vec::with_capacity(cells.len());
    let mut last = 0;
    for caps in rule.pattern().captures_iter(&view) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let url: Option<String> = caps.get(2).map(|target| {
            cells[cell_at(target.start())..cell_at(target.end())]
                .iter()
                .map(|cell| cell.ch)
                .collect()
        });

        out.extend_from_slice(&cells[last..cell_at(whole.start())]);
        for cell in &cells[cell_at(inner.start())..cell_at(inner.end())] {
            let mut cell = cell.clone();
            rule.mark(&mut cell.style, url.as_deref());
            out.push(cell);
        }
        last = cell_at(whole.end());
    }
    out.extend_from_slice(&cells[last..]);
    out
}
