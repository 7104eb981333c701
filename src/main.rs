use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use school_reports_lib::config::{self, UploadLimits};
use school_reports_lib::pipeline::{process_batch, ReportProcessor, ReportSession, Upload};

#[derive(Parser, Debug)]
#[command(name = "school-reports")]
#[command(version, about = "Extract reporting periods and indicator tallies from school report PDFs", long_about = None)]
struct Cli {
    /// Report PDF files, processed in the order given
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Maximum size per file in MB (default: $SCHOOL_REPORTS_MAX_FILE_MB or 5)
    #[arg(long)]
    max_file_mb: Option<u64>,

    /// Maximum number of files per run (default: $SCHOOL_REPORTS_MAX_FILES or 30)
    #[arg(long)]
    max_files: Option<usize>,

    /// Pretty-print each JSON record
    #[arg(short, long)]
    pretty: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    school_reports_lib::init_tracing();
    tracing::info!("{} v{}", config::APP_NAME, config::APP_VERSION);

    let limits = UploadLimits::from_env().with_overrides(cli.max_file_mb, cli.max_files);
    let uploads = read_uploads(&cli.inputs)?;

    let processor = ReportProcessor::with_pdfium().context("PDFium is required to read reports")?;
    let mut session = ReportSession::new();
    let outcome = process_batch(&processor, uploads, &limits, &mut session);

    for rejection in &outcome.rejections {
        eprintln!("{}: {}", rejection.filename, rejection.message);
    }
    for filename in &outcome.already_accepted {
        eprintln!("{filename}: skipped, a file with this name was already accepted");
    }
    if outcome.truncated > 0 {
        eprintln!(
            "{} file(s) skipped: only the first {} are processed",
            outcome.truncated, limits.max_files
        );
    }

    for record in session.records_by_period() {
        let line = if cli.pretty {
            serde_json::to_string_pretty(record)?
        } else {
            serde_json::to_string(record)?
        };
        println!("{line}");
    }

    Ok(())
}

fn read_uploads(paths: &[PathBuf]) -> Result<Vec<Upload>> {
    paths.iter().map(|path| read_upload(path)).collect()
}

fn read_upload(path: &Path) -> Result<Upload> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();
    Ok(Upload::new(filename, bytes))
}
