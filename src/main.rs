use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use clap::Parser;
use ppflow::{Document, Settings, convert_to_html, rewrap_document};

#[derive(Parser)]
#[command(version, about = "Rewrap book transcriptions and convert them to HTML")]
struct Cli {
    /// Rewrite files in place
    #[arg(long = "in-place", requires = "files")]
    in_place: bool,
    /// Rewrap all text to the configured margins (the default action)
    #[arg(long = "rewrap", conflicts_with = "html")]
    rewrap: bool,
    /// Convert markup to a complete HTML document
    #[arg(long = "html")]
    html: bool,
    /// TOML settings file; built-in defaults apply when omitted
    #[arg(long = "config", value_name = "FILE")]
    config: Option<PathBuf>,
    /// Extra CSS, or a complete HTML header starting with <!DOCTYPE
    #[arg(long = "header", value_name = "FILE", requires = "html")]
    header: Option<PathBuf>,
    /// Text files to process
    files: Vec<PathBuf>,
}

fn process_text(
    text: &str,
    settings: &Settings,
    to_html: bool,
    user_header: Option<&str>,
) -> anyhow::Result<String> {
    let mut doc = Document::from_text(text);
    let result = if to_html {
        convert_to_html(&mut doc, settings, user_header)
    } else {
        rewrap_document(&mut doc, settings)
    };
    if let Err(err) = result {
        tracing::error!("{err}");
        return Err(err.into());
    }
    Ok(doc.to_text())
}

fn rewrite_path(
    path: &Path,
    settings: &Settings,
    to_html: bool,
    user_header: Option<&str>,
) -> anyhow::Result<()> {
    let content = fs::read_to_string(path)?;
    let fixed = process_text(&content, settings, to_html, user_header)?;
    fs::write(path, fixed)?;
    Ok(())
}

/// Entry point for the command-line tool.
///
/// Reads from the named files or standard input, rewraps or HTML-converts
/// the text, and writes the result to standard output or back to the files.
///
/// # Examples
///
/// ```sh
/// # Rewrap a file and print to stdout
/// ppflow book.txt
///
/// # Rewrap in place with custom margins
/// ppflow --rewrap --config margins.toml --in-place book.txt
///
/// # Convert to HTML from standard input
/// cat book.txt | ppflow --html
/// ```
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let to_html = cli.html && !cli.rewrap;

    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let user_header = match &cli.header {
        Some(path) => Some(fs::read_to_string(path)?),
        None => None,
    };

    if cli.files.is_empty() {
        let mut input = String::new();
        io::stdin().read_to_string(&mut input)?;
        let fixed = process_text(&input, &settings, to_html, user_header.as_deref())?;
        print!("{fixed}");
        return Ok(());
    }

    for path in &cli.files {
        if cli.in_place {
            rewrite_path(path, &settings, to_html, user_header.as_deref())?;
        } else {
            let content = fs::read_to_string(path)?;
            let fixed = process_text(&content, &settings, to_html, user_header.as_deref())?;
            print!("{fixed}");
        }
    }

    Ok(())
}
