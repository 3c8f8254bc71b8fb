use crate::block::{Block, Document, InlineText};
use crate::config::{Config, TextStyle};

/// List runs up to this many items are kept on one page.
const UNBREAKABLE_LIST_ITEMS: usize = 5;

/// Convert a document to Typst markup, styled by `config`.
pub fn document_to_typst(doc: &Document, config: &Config) -> String {
    let mut out = preamble(config);
    let blocks = doc.blocks();

    let mut i = 0;
    while i < blocks.len() {
        match &blocks[i] {
            Block::Title { .. } | Block::Heading { .. } => {
                // Keep heading with following content using a block that prevents breaks
                out.push_str("#block(breakable: false)[\n");
                emit_block(&blocks[i], config, &mut out);
                let end = if i + 1 < blocks.len() {
                    run_end(blocks, i + 1)
                } else {
                    i + 1
                };
                let following = &blocks[i + 1..end];
                if is_list_run(following) {
                    emit_list_items(following, &mut out);
                    out.push('\n');
                } else if let Some(block) = following.first() {
                    emit_block(block, config, &mut out);
                }
                out.push_str("]\n\n");
                i = end;
            }
            _ => {
                let end = run_end(blocks, i);
                let run = &blocks[i..end];
                if is_list_run(run) {
                    // Wrap list to keep together when small, allow breaks when large
                    if run.len() <= UNBREAKABLE_LIST_ITEMS {
                        out.push_str("#block(breakable: false)[\n");
                        emit_list_items(run, &mut out);
                        out.push_str("]\n\n");
                    } else {
                        emit_list_items(run, &mut out);
                        out.push('\n');
                    }
                } else {
                    emit_block(&blocks[i], config, &mut out);
                }
                i = end;
            }
        }
    }

    out
}

/// Show rules derived from the config, emitted once ahead of the content.
pub fn preamble(config: &Config) -> String {
    let mut out = String::new();
    // Set up paragraph settings to prevent widows/orphans
    out.push_str("#set par(linebreaks: \"optimized\")\n");
    if config.page.numbers {
        out.push_str("#set page(numbering: \"1\")\n");
    }
    for level in 1..=4u8 {
        out.push_str(&format!(
            "#show heading.where(level: {level}): set text({})\n",
            text_args(config.headings.for_level(level))
        ));
    }
    out.push_str(&format!(
        "#show raw.where(block: true): set text(size: {}pt)\n",
        config.code.size
    ));
    out.push_str(&format!(
        "#show link: set text(fill: rgb({}))\n",
        typst_string(&config.links.color)
    ));
    if config.links.underline {
        out.push_str("#show link: underline\n");
    }
    out.push('\n');
    out
}

fn text_args(style: &TextStyle) -> String {
    format!(
        "size: {}pt, fill: rgb({}), weight: \"{}\"",
        style.size,
        typst_string(&style.color),
        if style.bold { "bold" } else { "regular" }
    )
}

/// End (exclusive) of the run starting at `start`: consecutive list items of
/// the same kind form one run, anything else is a run of one.
fn run_end(blocks: &[Block], start: usize) -> usize {
    let mut end = start + 1;
    if is_list_item(&blocks[start]) {
        while end < blocks.len() && same_kind(&blocks[start], &blocks[end]) {
            end += 1;
        }
    }
    end
}

fn is_list_item(block: &Block) -> bool {
    matches!(block, Block::BulletItem { .. } | Block::NumberedItem { .. })
}

fn is_list_run(run: &[Block]) -> bool {
    run.first().is_some_and(is_list_item)
}

fn same_kind(a: &Block, b: &Block) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

fn emit_list_items(items: &[Block], out: &mut String) {
    for item in items {
        let (prefix, text) = match item {
            Block::BulletItem { text } => ("- ", text),
            Block::NumberedItem { text } => ("+ ", text),
            _ => continue,
        };
        out.push_str(prefix);
        inline_to_typst(text, out);
        out.push('\n');
    }
}

fn emit_block(block: &Block, config: &Config, out: &mut String) {
    match block {
        Block::Title { text } => {
            out.push_str(&format!("#text({})[", text_args(&config.title)));
            inline_to_typst(text, out);
            out.push_str("]\n\n");
        }
        Block::Heading { level, text } => {
            for _ in 0..*level {
                out.push('=');
            }
            out.push(' ');
            inline_to_typst(text, out);
            out.push_str("\n\n");
        }
        Block::Paragraph { text } => {
            inline_to_typst(text, out);
            out.push_str("\n\n");
        }
        Block::BulletItem { .. } | Block::NumberedItem { .. } => {
            emit_list_items(std::slice::from_ref(block), out);
            out.push('\n');
        }
        Block::CodeBlock { language, raw_text } => {
            // Keep code blocks together when possible
            let fence = "`".repeat(longest_backtick_run(raw_text).max(2) + 1);
            out.push_str("#block(breakable: false)[\n");
            out.push_str(&fence);
            if let Some(lang) = language.as_deref().filter(|l| is_lang_tag(l)) {
                out.push_str(lang);
            }
            out.push('\n');
            out.push_str(raw_text);
            if !raw_text.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&fence);
            out.push_str("\n]\n\n");
        }
        Block::Table { rows } => {
            // Keep tables together when possible
            out.push_str("#block(breakable: false)[\n");
            table_to_typst(rows, config, out);
            out.push_str("]\n\n");
        }
        Block::Rule => {
            out.push_str("#line(length: 100%)\n\n");
        }
    }
}

fn longest_backtick_run(text: &str) -> usize {
    text.split(|c| c != '`').map(str::len).max().unwrap_or(0)
}

fn is_lang_tag(lang: &str) -> bool {
    lang.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '#'))
}

/// Ragged rows are padded with empty cells up to the widest row.
fn table_to_typst(rows: &[Vec<InlineText>], config: &Config, out: &mut String) {
    let col_count = rows.iter().map(Vec::len).max().unwrap_or(0);
    if col_count == 0 {
        return;
    }

    out.push_str("#table(\n");
    out.push_str(&format!("  columns: {},\n", col_count));
    out.push_str(&format!(
        "  fill: (_, y) => if y == 0 {{ rgb({}) }},\n",
        typst_string(&config.table.header_fill)
    ));

    for (index, row) in rows.iter().enumerate() {
        let header = index == 0 && config.table.header_bold;
        for col in 0..col_count {
            out.push_str("  [");
            if let Some(cell) = row.get(col) {
                if header {
                    out.push_str("#strong[");
                    inline_to_typst(cell, out);
                    out.push(']');
                } else {
                    inline_to_typst(cell, out);
                }
            }
            out.push_str("],\n");
        }
    }

    out.push_str(")\n");
}

fn inline_to_typst(text: &InlineText, out: &mut String) {
    let mut after_call = false;
    for span in text.spans() {
        let style = &span.style;
        if style.is_plain() {
            escape_text(span.text(), after_call, out);
            after_call = false;
            continue;
        }

        // Innermost first: code or escaped text, then emph, strong, link.
        let mut content = String::new();
        if style.code {
            content.push_str("#raw(");
            content.push_str(&typst_string(span.text()));
            content.push(')');
        } else {
            escape_text(span.text(), false, &mut content);
        }
        if style.italic {
            content = format!("#emph[{content}]");
        }
        if style.bold {
            content = format!("#strong[{content}]");
        }
        if let Some(url) = &style.link {
            content = format!("#link({})[{content}]", typst_string(url));
        }
        out.push_str(&content);
        after_call = true;
    }
}

/// Escape markup characters. Right after an embedded call, a leading `.` or
/// `(` would continue the call expression, so it is escaped too.
fn escape_text(text: &str, after_call: bool, out: &mut String) {
    for (i, ch) in text.chars().enumerate() {
        match ch {
            '#' | '*' | '_' | '@' | '$' | '\\' | '`' | '<' | '>' | '[' | ']' | '=' | '+'
            | '-' | '/' | '~' => {
                out.push('\\');
                out.push(ch);
            }
            '.' | '(' if i == 0 && after_call => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
}

/// Quote a value as a Typst string literal.
fn typst_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            _ => quoted.push(ch),
        }
    }
    quoted.push('"');
    quoted
}
