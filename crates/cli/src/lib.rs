//! Directory scan driver behind the `ppt-scanner` binary.
//!
//! Wires the format-detecting loader, a completion provider and the report
//! writer together, and prints the user-facing status lines.

pub mod loader;
pub mod settings;

pub use loader::FormatDetectingLoader;
pub use settings::{Settings, REPORT_FILENAME};

use anyhow::{Context, Result};
use slidescan_core::{scan, CompletionProvider, Pipeline, PipelineError, RunSummary};
use slidescan_xlsx::ReportWriter;
use std::path::PathBuf;

/// How a scan ended.
#[derive(Debug)]
pub enum ScanOutcome {
    /// The target directory does not exist.
    MissingDirectory(PathBuf),

    /// No presentation files in the directory.
    NoPresentations,

    /// Files were found but none produced a slide record. Nothing was written.
    NoRecords(RunSummary),

    /// The provider reported a quota or billing problem. The run was abandoned.
    FatalQuota { filename: String, message: String },

    /// The report was written.
    Report { path: PathBuf, summary: RunSummary },
}

impl ScanOutcome {
    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FatalQuota { .. } => 1,
            _ => 0,
        }
    }
}

/// Scan `settings.directory`, annotate every slide and write the report.
pub fn execute<P: CompletionProvider>(settings: &Settings, provider: P) -> Result<ScanOutcome> {
    let directory = &settings.directory;
    if !directory.is_dir() {
        println!("Directory does not exist: {}", directory.display());
        return Ok(ScanOutcome::MissingDirectory(directory.clone()));
    }

    println!("Scanning directory: {}", directory.display());
    let files = scan(directory).with_context(|| format!("Failed to scan {}", directory.display()))?;
    if files.is_empty() {
        println!("No PowerPoint files found in the specified directory!");
        return Ok(ScanOutcome::NoPresentations);
    }
    println!("Found {} PowerPoint file(s)", files.len());

    let pipeline = Pipeline::new(FormatDetectingLoader::new(), provider)
        .with_pacing(settings.pacing)
        .with_progress(settings.show_progress);

    let summary = match pipeline.process(directory, &files) {
        Ok(summary) => summary,
        Err(PipelineError::FatalQuota { filename, message }) => {
            eprintln!("Error processing {}: {}", filename, message);
            eprintln!();
            eprintln!("ERROR: OpenAI API credit balance is too low or there's a billing issue.");
            eprintln!("Please check your API key and billing status.");
            return Ok(ScanOutcome::FatalQuota { filename, message });
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to process {}", directory.display()));
        }
    };

    if summary.files_failed > 0 {
        println!("{} file(s) could not be processed", summary.files_failed);
    }

    if summary.records.is_empty() {
        println!("No slides were processed, report not written.");
        return Ok(ScanOutcome::NoRecords(summary));
    }

    println!();
    println!("Generating Excel file...");
    ReportWriter::new()
        .write(&summary.records, &settings.output_path)
        .with_context(|| format!("Failed to write {}", settings.output_path.display()))?;

    println!();
    println!(
        "Analysis complete! Results saved to: {}",
        settings.output_path.display()
    );

    Ok(ScanOutcome::Report {
        path: settings.output_path.clone(),
        summary,
    })
}
