use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::block::{Block, Document, InlineText};
use crate::inline::format_inline;

const FENCE: &str = "```";

static NUMBERED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\s").unwrap());
static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[|\-\s:]+$").unwrap());

/// Options that change how lines are classified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// A level-1 heading containing this phrase becomes the document title.
    pub title_marker: Option<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            title_marker: Some("HIREINBOX".to_string()),
        }
    }
}

impl ParseOptions {
    fn is_title(&self, text: &InlineText) -> bool {
        match self.title_marker.as_deref() {
            Some(marker) if !marker.is_empty() => text.display_text().contains(marker),
            _ => false,
        }
    }
}

/// Convert lines with the default options.
pub fn convert<I, S>(lines: I) -> Document
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    convert_with(lines, &ParseOptions::default())
}

/// Single forward pass over `lines`. Never fails: anything unrecognized
/// degrades to a paragraph.
pub fn convert_with<I, S>(lines: I, options: &ParseOptions) -> Document
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut state = ScanState::default();
    let mut blocks = Vec::new();
    let mut line_count = 0usize;

    for line in lines {
        line_count += 1;
        let (next, emitted) = state.on_line(line.as_ref(), options);
        for block in &emitted {
            tracing::trace!(line = line_count, ?block, "emitted block");
        }
        blocks.extend(emitted);
        state = next;
    }
    if let Some(block) = state.finish() {
        blocks.push(block);
    }

    tracing::debug!(lines = line_count, blocks = blocks.len(), "converted markdown");
    Document::new(blocks)
}

/// Scanner state carried between lines. Code and table modes are exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ScanState {
    #[default]
    Neutral,
    InCode {
        language: Option<String>,
        lines: Vec<String>,
    },
    /// Never holds an empty row list.
    InTable {
        rows: Vec<Vec<String>>,
    },
}

impl ScanState {
    /// Feed one line, returning the next state and any blocks completed by it.
    pub fn on_line(self, raw: &str, options: &ParseOptions) -> (ScanState, Vec<Block>) {
        let mut emitted = Vec::new();

        let shape = match self {
            // Inside a fence nothing but the closing marker is recognized.
            ScanState::InCode {
                language,
                mut lines,
            } => {
                if is_fence(raw) {
                    emitted.push(code_block(language, lines));
                    return (ScanState::Neutral, emitted);
                }
                lines.push(raw.to_string());
                return (ScanState::InCode { language, lines }, emitted);
            }
            ScanState::InTable { mut rows } => match LineShape::classify(raw) {
                LineShape::TableRow(cells) => {
                    rows.push(cells);
                    return (ScanState::InTable { rows }, emitted);
                }
                LineShape::TableSeparator => return (ScanState::InTable { rows }, emitted),
                other => {
                    emitted.push(table_block(rows));
                    other
                }
            },
            ScanState::Neutral => LineShape::classify(raw),
        };

        let next = match shape {
            LineShape::Blank | LineShape::TableSeparator => ScanState::Neutral,
            LineShape::Rule => {
                emitted.push(Block::Rule);
                ScanState::Neutral
            }
            LineShape::Fence { info } => ScanState::InCode {
                language: (!info.is_empty()).then(|| info.to_string()),
                lines: Vec::new(),
            },
            LineShape::TableRow(cells) => ScanState::InTable { rows: vec![cells] },
            LineShape::Heading { level, text } => {
                let text = format_inline(text);
                if level == 1 && options.is_title(&text) {
                    emitted.push(Block::Title { text });
                } else {
                    emitted.push(Block::Heading { level, text });
                }
                ScanState::Neutral
            }
            LineShape::Bullet(text) => {
                emitted.push(Block::BulletItem {
                    text: format_inline(text),
                });
                ScanState::Neutral
            }
            LineShape::Numbered(text) => {
                emitted.push(Block::NumberedItem {
                    text: format_inline(text),
                });
                ScanState::Neutral
            }
            LineShape::Text(text) => {
                emitted.push(Block::Paragraph {
                    text: format_inline(text),
                });
                ScanState::Neutral
            }
        };

        (next, emitted)
    }

    /// Flush whatever is pending at end of input.
    pub fn finish(self) -> Option<Block> {
        match self {
            ScanState::Neutral => None,
            ScanState::InTable { rows } => Some(table_block(rows)),
            ScanState::InCode { lines, .. } if lines.is_empty() => None,
            ScanState::InCode { language, lines } => {
                tracing::debug!(lines = lines.len(), "recovered unterminated code fence");
                Some(code_block(language, lines))
            }
        }
    }
}

/// What a single line looks like, outside of any code fence.
/// Variants are listed in classification order.
#[derive(Debug, PartialEq, Eq)]
enum LineShape<'a> {
    Blank,
    Rule,
    Fence { info: &'a str },
    TableSeparator,
    TableRow(Vec<String>),
    Heading { level: u8, text: &'a str },
    Bullet(&'a str),
    Numbered(&'a str),
    Text(&'a str),
}

impl<'a> LineShape<'a> {
    fn classify(raw: &'a str) -> Self {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return LineShape::Blank;
        }
        if trimmed == "---" {
            return LineShape::Rule;
        }
        if let Some(info) = trimmed.strip_prefix(FENCE) {
            return LineShape::Fence { info: info.trim() };
        }
        if trimmed.starts_with('|') {
            if SEPARATOR_RE.is_match(trimmed) {
                return LineShape::TableSeparator;
            }
            return LineShape::TableRow(split_row(trimmed));
        }
        for (marker, level) in [("#### ", 4), ("### ", 3), ("## ", 2), ("# ", 1)] {
            if let Some(text) = raw.strip_prefix(marker) {
                return LineShape::Heading {
                    level,
                    text: text.trim(),
                };
            }
        }
        if let Some(text) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            return LineShape::Bullet(text.trim_start());
        }
        if let Some(prefix) = NUMBERED_RE.find(trimmed) {
            return LineShape::Numbered(trimmed[prefix.end()..].trim_start());
        }
        LineShape::Text(trimmed)
    }
}

fn is_fence(raw: &str) -> bool {
    raw.trim().starts_with(FENCE)
}

/// Split `| a | b |` into trimmed cells. The boundary pipes produce empty
/// outer fields; the leading one is always dropped, the trailing one only
/// when it is empty.
fn split_row(trimmed: &str) -> Vec<String> {
    let mut fields: Vec<&str> = trimmed.split('|').skip(1).collect();
    if fields.last().is_some_and(|last| last.trim().is_empty()) {
        fields.pop();
    }
    fields.into_iter().map(|f| f.trim().to_string()).collect()
}

fn table_block(rows: Vec<Vec<String>>) -> Block {
    let rows = rows
        .iter()
        .map(|row| row.iter().map(|cell| format_inline(cell)).collect())
        .collect();
    Block::Table { rows }
}

fn code_block(language: Option<String>, lines: Vec<String>) -> Block {
    Block::CodeBlock {
        language,
        raw_text: lines.join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Span;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn blocks(markdown: &str) -> Vec<Block> {
        convert(markdown.lines()).blocks().to_vec()
    }

    fn plain(text: &str) -> InlineText {
        InlineText::plain(text)
    }

    fn row(cells: &[&str]) -> Vec<InlineText> {
        cells.iter().map(|c| plain(c)).collect()
    }

    #[test]
    fn empty_input_is_empty_document() {
        assert!(convert(Vec::<String>::new()).is_empty());
        assert!(convert(["", "   ", "\t"]).is_empty());
    }

    #[test]
    fn simple_table_drops_separator_row() {
        assert_eq!(
            blocks("| A | B |\n|---|---|\n| 1 | 2 |"),
            vec![Block::Table {
                rows: vec![row(&["A", "B"]), row(&["1", "2"])],
            }]
        );
    }

    #[test]
    fn aligned_separator_row_is_dropped() {
        assert_eq!(
            blocks("| L | R |\n|:---|---:|\n| x | y |"),
            vec![Block::Table {
                rows: vec![row(&["L", "R"]), row(&["x", "y"])],
            }]
        );
    }

    #[test]
    fn ragged_rows_keep_their_cell_counts() {
        assert_eq!(
            blocks("| a | b | c |\n| 1 |\n| 1 | 2"),
            vec![Block::Table {
                rows: vec![row(&["a", "b", "c"]), row(&["1"]), row(&["1", "2"])],
            }]
        );
    }

    #[test]
    fn table_cells_are_formatted() {
        assert_eq!(
            blocks("| **Name** | [site](https://x.io) |"),
            vec![Block::Table {
                rows: vec![vec![
                    InlineText::from_spans([Span::bold("Name")]),
                    InlineText::from_spans([Span::link("site", "https://x.io")]),
                ]],
            }]
        );
    }

    #[test]
    fn fence_toggles_code_block() {
        assert_eq!(
            blocks("```\nline1\nline2\n```"),
            vec![Block::CodeBlock {
                language: None,
                raw_text: "line1\nline2".into(),
            }]
        );
    }

    #[test]
    fn fence_info_string_becomes_language() {
        assert_eq!(
            blocks("```rust\nfn main() {}\n```"),
            vec![Block::CodeBlock {
                language: Some("rust".into()),
                raw_text: "fn main() {}".into(),
            }]
        );
    }

    #[test]
    fn code_block_is_verbatim() {
        assert_eq!(
            blocks("```\n| a | b |\n\n---\n# not a heading\n  **kept**\n```"),
            vec![Block::CodeBlock {
                language: None,
                raw_text: "| a | b |\n\n---\n# not a heading\n  **kept**".into(),
            }]
        );
    }

    #[test]
    fn unterminated_fence_is_flushed() {
        assert_eq!(
            blocks("```\norphan"),
            vec![Block::CodeBlock {
                language: None,
                raw_text: "orphan".into(),
            }]
        );
    }

    #[test]
    fn fence_directly_after_table_flushes_table() {
        assert_eq!(
            blocks("| a |\n```\ncode\n```"),
            vec![
                Block::Table {
                    rows: vec![row(&["a"])],
                },
                Block::CodeBlock {
                    language: None,
                    raw_text: "code".into(),
                },
            ]
        );
    }

    #[rstest]
    #[case("# One", 1, "One")]
    #[case("## Two", 2, "Two")]
    #[case("### Three", 3, "Three")]
    #[case("#### Deep", 4, "Deep")]
    #[case("##   Padded  ", 2, "Padded")]
    fn heading_levels(#[case] line: &str, #[case] level: u8, #[case] text: &str) {
        assert_eq!(
            blocks(line),
            vec![Block::Heading {
                level,
                text: plain(text),
            }]
        );
    }

    #[test]
    fn five_hashes_fall_back_to_paragraph() {
        assert_eq!(
            blocks("##### Too deep"),
            vec![Block::Paragraph {
                text: plain("##### Too deep"),
            }]
        );
    }

    #[test]
    fn title_marker_promotes_level_one_heading() {
        assert_eq!(
            blocks("# HIREINBOX Title"),
            vec![Block::Title {
                text: plain("HIREINBOX Title"),
            }]
        );
    }

    #[test]
    fn title_marker_ignored_below_level_one() {
        assert_eq!(
            blocks("## HIREINBOX Section"),
            vec![Block::Heading {
                level: 2,
                text: plain("HIREINBOX Section"),
            }]
        );
    }

    #[test]
    fn custom_and_disabled_title_marker() {
        let custom = ParseOptions {
            title_marker: Some("Handbook".into()),
        };
        assert_eq!(
            convert_with(["# Staff Handbook"], &custom).blocks(),
            &[Block::Title {
                text: plain("Staff Handbook"),
            }]
        );

        let disabled = ParseOptions { title_marker: None };
        assert_eq!(
            convert_with(["# HIREINBOX Title"], &disabled).blocks(),
            &[Block::Heading {
                level: 1,
                text: plain("HIREINBOX Title"),
            }]
        );
    }

    #[test]
    fn mixed_list_items_stay_separate() {
        assert_eq!(
            blocks("- one\n1. two\n* three"),
            vec![
                Block::BulletItem { text: plain("one") },
                Block::NumberedItem { text: plain("two") },
                Block::BulletItem {
                    text: plain("three"),
                },
            ]
        );
    }

    #[test]
    fn numbered_prefix_needs_dot_and_space() {
        assert_eq!(
            blocks("12. twelve\n3.14 is pi"),
            vec![
                Block::NumberedItem {
                    text: plain("twelve"),
                },
                Block::Paragraph {
                    text: plain("3.14 is pi"),
                },
            ]
        );
    }

    #[test]
    fn rule_flushes_table() {
        assert_eq!(
            blocks("| a |\n---\ntext"),
            vec![
                Block::Table {
                    rows: vec![row(&["a"])],
                },
                Block::Rule,
                Block::Paragraph { text: plain("text") },
            ]
        );
    }

    #[test]
    fn non_table_line_flushes_then_reclassifies() {
        assert_eq!(
            blocks("| a | b |\n## After"),
            vec![
                Block::Table {
                    rows: vec![row(&["a", "b"])],
                },
                Block::Heading {
                    level: 2,
                    text: plain("After"),
                },
            ]
        );
    }

    #[test]
    fn blank_line_splits_tables() {
        assert_eq!(
            blocks("| a |\n\n| b |"),
            vec![
                Block::Table {
                    rows: vec![row(&["a"])],
                },
                Block::Table {
                    rows: vec![row(&["b"])],
                },
            ]
        );
    }

    #[test]
    fn paragraph_is_trimmed_and_formatted() {
        assert_eq!(
            blocks("   some *emphasis* here  "),
            vec![Block::Paragraph {
                text: InlineText::from_spans([
                    Span::plain("some "),
                    Span::italic("emphasis"),
                    Span::plain(" here"),
                ]),
            }]
        );
    }

    #[test]
    fn on_line_steps_through_a_table() {
        let options = ParseOptions::default();
        let (state, out) = ScanState::Neutral.on_line("| h |", &options);
        assert!(out.is_empty());
        assert_eq!(
            state,
            ScanState::InTable {
                rows: vec![vec!["h".into()]],
            }
        );

        let (state, out) = state.on_line("|---|", &options);
        assert!(out.is_empty());

        let (state, out) = state.on_line("body", &options);
        assert_eq!(state, ScanState::Neutral);
        assert_eq!(
            out,
            vec![
                Block::Table {
                    rows: vec![row(&["h"])],
                },
                Block::Paragraph { text: plain("body") },
            ]
        );
    }

    #[test]
    fn finish_on_empty_fence_emits_nothing() {
        let (state, _) = ScanState::Neutral.on_line("```", &ParseOptions::default());
        assert_eq!(state.finish(), None);
    }

    #[rstest]
    #[case("")]
    #[case("# T\n\n- a\n- b\n\n| x |\n|---|\n| y |\n---\n```\nc\n```")]
    #[case("| a |\nb\n| c |\nd\n| e |\nf")]
    #[case("```\n```\n```\n```")]
    #[case("---\n---\n\n\n1. x\n2. y")]
    fn block_count_never_exceeds_line_count(#[case] markdown: &str) {
        let lines: Vec<&str> = markdown.lines().collect();
        assert!(convert(&lines).len() <= lines.len());
    }
}
