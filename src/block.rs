use serde::Serialize;

/// Formatting attributes carried by a span. Attributes combine when
/// markup nests, e.g. bold text inside a link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Style {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub italic: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub code: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Style {
    pub fn is_plain(&self) -> bool {
        *self == Style::default()
    }
}

/// A run of text sharing one style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    pub text: String,
    #[serde(flatten)]
    pub style: Style,
}

impl Span {
    pub fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Style::default())
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self::new(
            text,
            Style {
                bold: true,
                ..Style::default()
            },
        )
    }

    pub fn italic(text: impl Into<String>) -> Self {
        Self::new(
            text,
            Style {
                italic: true,
                ..Style::default()
            },
        )
    }

    pub fn code(text: impl Into<String>) -> Self {
        Self::new(
            text,
            Style {
                code: true,
                ..Style::default()
            },
        )
    }

    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(
            text,
            Style {
                link: Some(url.into()),
                ..Style::default()
            },
        )
    }

    /// The text shown to a reader, markup removed.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A line of prose with its inline markup resolved into spans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InlineText(Vec<Span>);

impl InlineText {
    /// Build from raw spans, merging adjacent spans of equal style and dropping empty ones.
    pub fn from_spans(spans: impl IntoIterator<Item = Span>) -> Self {
        let mut merged: Vec<Span> = Vec::new();
        for span in spans {
            if span.text().is_empty() {
                continue;
            }
            if let Some(prev) = merged.last_mut()
                && prev.style == span.style
            {
                prev.text.push_str(&span.text);
                continue;
            }
            merged.push(span);
        }
        Self(merged)
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::from_spans([Span::plain(text)])
    }

    pub fn spans(&self) -> &[Span] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flat-string reduction: every span's text concatenated. Link targets are lost.
    pub fn display_text(&self) -> String {
        self.0.iter().map(Span::text).collect()
    }
}

/// Block-level elements produced by the line scanner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    /// Top-level heading carrying the document title marker.
    Title {
        text: InlineText,
    },
    Heading {
        level: u8,
        text: InlineText,
    },
    Paragraph {
        text: InlineText,
    },
    BulletItem {
        text: InlineText,
    },
    NumberedItem {
        text: InlineText,
    },
    CodeBlock {
        language: Option<String>,
        raw_text: String,
    },
    /// Rows in input order; the first is conventionally the header.
    /// Rows keep whatever cell count they were written with.
    Table {
        rows: Vec<Vec<InlineText>>,
    },
    Rule,
}

/// The converted document: blocks in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Document {
    pub(crate) fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}
