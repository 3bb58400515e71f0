//! CLI tool for reading roll-call dates off flight board photographs.

mod config;
mod pipeline;
mod terminals;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use config::{load_config, Config};
use pipeline::{Pipeline, Record};
use rollcall_core::Error;
use rollcall_tesseract::TesseractOcr;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use terminals::{local_reference, parse_zone, TerminalDirectory};

/// Resolve the roll-call date printed on terminal flight boards.
#[derive(Parser, Debug)]
#[command(name = "rollcall")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Photograph(s) of the terminal's flight board
    #[arg(required = true)]
    photos: Vec<PathBuf>,

    /// Title of the terminal the photos were taken at
    #[arg(short, long)]
    terminal: String,

    /// JSON terminal list(s); when given, the terminal must be listed
    #[arg(long)]
    terminals: Vec<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for preprocessed and cropped images (overrides config)
    #[arg(short, long)]
    work_dir: Option<PathBuf>,

    /// Reference time as RFC 3339 (default: now)
    #[arg(short, long, value_parser = parse_reference)]
    reference: Option<DateTime<Utc>>,

    /// Write the JSON records to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    if let Some(work_dir) = &args.work_dir {
        config.output.work_dir = work_dir.clone();
    }

    let directory = TerminalDirectory::load(&args.terminals)?;
    let listed = if directory.is_empty() {
        None
    } else {
        log::debug!("{} terminals known", directory.len());
        let terminal = directory
            .get(&args.terminal)
            .with_context(|| format!("Unknown terminal '{}'", args.terminal))?;
        Some(terminal)
    };

    let mut reference = args.reference.unwrap_or_else(Utc::now);
    if let Some(name) = listed.and_then(|t| t.timezone.as_deref()) {
        reference = local_reference(reference, parse_zone(name)?);
        log::debug!("[{}] Local reference time {}", args.terminal, reference);
    }
    let pipeline = Pipeline::new(TesseractOcr::new(config.ocr.tesseract.clone()), &config);

    let mut records = Vec::with_capacity(args.photos.len());
    for photo in &args.photos {
        if args.verbose {
            eprintln!("Processing: {}", photo.display());
        }

        match pipeline.process_photo(&args.terminal, photo, reference) {
            Ok(resolution) => {
                records.push(Record::new(&args.terminal, listed, photo, &resolution));
            }
            Err(e) if is_fatal(&e) => return Err(e),
            Err(e) => {
                eprintln!("Error processing {}: {:#}", photo.display(), e);
            }
        }
    }

    let output = serde_json::to_string_pretty(&records)?;
    match &args.output {
        Some(path) => {
            write_output(path, &output)?;
            if args.verbose {
                eprintln!("Written to: {}", path.display());
            }
        }
        None => println!("{}", output),
    }

    Ok(())
}

/// Errors that invalidate every remaining photo, not just the current one.
fn is_fatal(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<Error>(),
        Some(Error::MissingFuzzyModel(_))
    )
}

fn parse_reference(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 time such as 2024-01-13T09:00:00Z: {}", e))
}

/// Write output to a file.
fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }

    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_parse_reference() {
        assert_eq!(
            parse_reference("2024-01-13T09:00:00-05:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 13, 14, 0, 0).unwrap()
        );
        assert!(parse_reference("13 Jan 2024").is_err());
    }

    #[test]
    fn test_missing_model_is_fatal() {
        let missing = anyhow::Error::new(Error::MissingFuzzyModel("jan".to_string()))
            .context("Failed to resolve date in board.png");
        assert!(is_fatal(&missing));

        let ocr = anyhow::Error::new(Error::Ocr("crashed".to_string()));
        assert!(!is_fatal(&ocr));
        assert!(!is_fatal(&anyhow::anyhow!("No variant could be recognized")));
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "rollcall",
            "--terminal",
            "Norfolk",
            "--reference",
            "2024-01-13T09:00:00Z",
            "a.jpg",
            "b.jpg",
        ])
        .unwrap();
        assert_eq!(args.terminal, "Norfolk");
        assert_eq!(args.photos.len(), 2);
        assert!(args.reference.is_some());
        assert!(Args::try_parse_from(["rollcall", "a.jpg"]).is_err());
    }

    #[test]
    fn test_write_output_creates_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("records.json");
        write_output(&path, "[]").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]\n");
    }
}
