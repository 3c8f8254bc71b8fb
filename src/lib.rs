//! Convert a constrained Markdown dialect into a flat, style-free document
//! model, and render that model to Typst markup or PDF.

mod block;
mod config;
mod inline;
mod parser;
mod typst;

pub use block::{Block, Document, InlineText, Span, Style};
pub use config::{
    CodeConfig, Config, ConfigError, HeadingsConfig, LinksConfig, PageConfig, TableConfig,
    TextStyle,
};
pub use inline::format_inline;
pub use parser::{ParseOptions, ScanState, convert, convert_with};
pub use typst::{document_to_typst, preamble};

use thiserror::Error;
use typst_as_lib::TypstEngine;
use typst_as_lib::typst_kit_options::TypstKitFontOptions;
use typst_pdf::PdfOptions;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Typst compilation failed: {0}")]
    Compile(String),

    #[error("PDF generation failed: {0}")]
    Pdf(String),
}

/// Split `markdown` into lines and convert with the default options.
pub fn convert_str(markdown: &str) -> Document {
    convert(markdown.lines())
}

/// Convert markdown to Typst markup using default config.
pub fn markdown_to_typst(markdown: &str) -> String {
    markdown_to_typst_with_config(markdown, &Config::compiled_default())
}

/// Convert markdown to Typst markup with custom config.
pub fn markdown_to_typst_with_config(markdown: &str, config: &Config) -> String {
    let doc = convert_with(markdown.lines(), &config.parse);
    document_to_typst(&doc, config)
}

/// Convert markdown to PDF bytes using default config.
pub fn markdown_to_pdf(markdown: &str) -> Result<Vec<u8>, Error> {
    markdown_to_pdf_with_config(markdown, &Config::compiled_default())
}

/// Convert markdown to PDF bytes with custom config.
pub fn markdown_to_pdf_with_config(markdown: &str, config: &Config) -> Result<Vec<u8>, Error> {
    let doc = convert_with(markdown.lines(), &config.parse);
    document_to_pdf(&doc, config)
}

/// Render an already converted document to PDF bytes.
pub fn document_to_pdf(doc: &Document, config: &Config) -> Result<Vec<u8>, Error> {
    use typst_library::layout::PagedDocument;

    let typst_content = document_to_typst(doc, config);

    let font_options = TypstKitFontOptions::new()
        .include_embedded_fonts(true)
        .include_system_fonts(false);

    let engine = TypstEngine::builder()
        .main_file(typst_content)
        .search_fonts_with(font_options)
        .build();

    let compiled: PagedDocument = engine
        .compile()
        .output
        .map_err(|e| Error::Compile(format!("{:?}", e)))?;
    tracing::debug!(pages = compiled.pages.len(), "compiled typst document");

    typst_pdf::pdf(&compiled, &PdfOptions::default()).map_err(|e| Error::Pdf(format!("{:?}", e)))
}
