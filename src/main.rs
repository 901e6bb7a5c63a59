//! vellum - local document and ebook converter

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use vellum::convert::{ExportOptions, TargetFormat, export_model, parse_any_to_model};
use vellum::export::PdfConfig;
use vellum::raster::{self, RasterFormat};
use vellum::{Book, Error};

#[derive(Parser)]
#[command(name = "vellum")]
#[command(version, about = "Local document and ebook converter", long_about = None)]
#[command(after_help = "EXAMPLES:
    vellum book.epub --to pdf          Write book.pdf next to the input
    vellum story.fb2 -o story.epub     Target taken from the output extension
    vellum a.txt b.html --to md        Convert several files one at a time
    vellum icon.ico                    Decode a raster image to icon.png
    vellum -i --json book.epub         Print book metadata as JSON")]
struct Cli {
    /// Input files (EPUB, PDF, CBZ, FB2, HTML, HTMLZ, TXT, TXTZ, PSD, ICO, PPM)
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Output file (single input only)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Target format: pdf, txt, epub, html, md, rtf, docx
    #[arg(short, long, value_name = "FORMAT", value_parser = parse_target)]
    to: Option<TargetFormat>,

    /// Override the book title
    #[arg(long)]
    title: Option<String>,

    /// Override the book author
    #[arg(long)]
    author: Option<String>,

    /// PDF page size
    #[arg(long, value_enum, default_value_t = PageSize::Letter)]
    page_size: PageSize,

    /// PDF page margin in points
    #[arg(long, value_name = "PT", allow_negative_numbers = true)]
    margin: Option<f32>,

    /// PDF font size in points
    #[arg(long, value_name = "PT", allow_negative_numbers = true)]
    font_size: Option<f32>,

    /// Show book metadata without converting
    #[arg(short, long)]
    info: bool,

    /// Print metadata as JSON (with --info)
    #[arg(long, requires = "info")]
    json: bool,

    /// Log parser and exporter details
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress output messages
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PageSize {
    Letter,
    A4,
}

#[derive(Serialize)]
struct BookInfo<'a> {
    file: String,
    title: Option<&'a str>,
    author: Option<&'a str>,
    language: Option<&'a str>,
    chapters: Vec<Option<&'a str>>,
    images: usize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    if cli.output.is_some() && cli.inputs.len() > 1 {
        eprintln!("error: --output needs exactly one input");
        return ExitCode::FAILURE;
    }

    let mut failed = false;
    for input in &cli.inputs {
        let result = if cli.info {
            show_info(&cli, input)
        } else {
            convert_file(&cli, input)
        };
        if let Err(e) = result {
            eprintln!("error: {}: {e}", input.display());
            failed = true;
        }
    }

    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

fn parse_target(token: &str) -> Result<TargetFormat, String> {
    TargetFormat::from_token(token).map_err(|e| e.to_string())
}

fn init_logging(cli: &Cli) {
    let default = if cli.quiet {
        "off"
    } else if cli.verbose {
        "vellum=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn export_options(cli: &Cli) -> Result<ExportOptions, Error> {
    let mut pdf = match cli.page_size {
        PageSize::Letter => PdfConfig::default(),
        PageSize::A4 => PdfConfig::a4(),
    };
    if let Some(margin) = cli.margin {
        pdf.margin = margin;
    }
    if let Some(size) = cli.font_size {
        pdf.font_size = size;
    }
    pdf.validate()?;
    Ok(ExportOptions {
        pdf,
        ..ExportOptions::default()
    })
}

fn load(cli: &Cli, input: &Path) -> Result<Book, Error> {
    let data = fs::read(input)?;
    let name = input.to_string_lossy();
    let mut progress = |value: f32| tracing::debug!(value, "progress");
    let mut book = parse_any_to_model(&data, &name, Some(&mut progress))?;
    if let Some(title) = &cli.title {
        book.title = Some(title.clone());
    }
    if let Some(author) = &cli.author {
        book.author = Some(author.clone());
    }
    Ok(book)
}

fn show_info(cli: &Cli, input: &Path) -> Result<(), Error> {
    let book = load(cli, input)?;

    if cli.json {
        let info = BookInfo {
            file: input.display().to_string(),
            title: book.title.as_deref(),
            author: book.author.as_deref(),
            language: book.language.as_deref(),
            chapters: book.chapters.iter().map(|c| c.title.as_deref()).collect(),
            images: book.images.len(),
        };
        let json = serde_json::to_string_pretty(&info)
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;
        println!("{json}");
        return Ok(());
    }

    println!("File: {}", input.display());
    println!("Title: {}", book.display_title());
    if let Some(author) = &book.author {
        println!("Author: {author}");
    }
    if let Some(language) = &book.language {
        println!("Language: {language}");
    }
    println!("Chapters: {}", book.chapters.len());
    println!("Images: {}", book.images.len());
    Ok(())
}

fn convert_file(cli: &Cli, input: &Path) -> Result<(), Error> {
    let name = input.to_string_lossy();

    if RasterFormat::from_filename(&name).is_some() {
        let data = fs::read(input)?;
        let (png, _) = raster::convert_to_png(&data, &name)?;
        let output = cli.output.clone().unwrap_or_else(|| input.with_extension("png"));
        fs::write(&output, png)?;
        report(cli, input, &output);
        return Ok(());
    }

    let target = match (cli.to, &cli.output) {
        (Some(target), _) => target,
        (None, Some(output)) => output
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| Error::UnsupportedTarget(output.display().to_string()))
            .and_then(TargetFormat::from_token)?,
        (None, None) => return Err(Error::UnsupportedTarget("missing --to".into())),
    };

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| input.with_extension(target.extension()));
    if output == input {
        return Err(Error::UnsupportedTarget(format!(
            "{} would overwrite its input",
            output.display()
        )));
    }

    let options = export_options(cli)?;
    let book = load(cli, input)?;
    let out = export_model(&book, target, &options)?;
    fs::write(&output, out.bytes)?;
    report(cli, input, &output);
    Ok(())
}

fn report(cli: &Cli, input: &Path, output: &Path) {
    if !cli.quiet {
        println!("{} -> {}", input.display(), output.display());
    }
}
