use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mdoc::Config;

#[derive(Parser)]
#[command(name = "mdoc")]
#[command(about = "Convert Markdown files to styled documents")]
struct Cli {
    /// Input Markdown file
    input: PathBuf,

    /// Output file (defaults to input name with the format's extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Style config (TOML); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Pdf)]
    format: Format,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Pdf,
    Typst,
    /// The converted document model
    Json,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Format::Pdf => "pdf",
            Format::Typst => "typ",
            Format::Json => "json",
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: Cli) -> Result<PathBuf> {
    let config = match &cli.config {
        Some(path) => Config::try_load(path)?,
        None => Config::compiled_default(),
    };

    let markdown = fs::read_to_string(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;

    let doc = mdoc::convert_with(markdown.lines(), &config.parse);
    info!(input = %cli.input.display(), blocks = doc.len(), "converted");

    let bytes = match cli.format {
        Format::Pdf => mdoc::document_to_pdf(&doc, &config)?,
        Format::Typst => mdoc::document_to_typst(&doc, &config).into_bytes(),
        Format::Json => serde_json::to_vec_pretty(&doc)?,
    };

    // Determine output path
    let output = cli
        .output
        .unwrap_or_else(|| cli.input.with_extension(cli.format.extension()));
    anyhow::ensure!(
        output != cli.input,
        "refusing to overwrite input {}",
        cli.input.display()
    );

    fs::write(&output, bytes).with_context(|| format!("writing {}", output.display()))?;
    Ok(output)
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(output) => println!("Created {}", output.display()),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
