//! Run settings resolved from arguments and the environment.

use anyhow::{Context, Result};
use slidescan_core::DEFAULT_PACING;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the report written into the scanned directory.
pub const REPORT_FILENAME: &str = "ppt_slides.xlsx";

/// Where to scan, where to write and how fast to go.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory whose presentations are scanned.
    pub directory: PathBuf,

    /// Report path, `<directory>/ppt_slides.xlsx`.
    pub output_path: PathBuf,

    /// Delay after each slide.
    pub pacing: Duration,

    /// Draw progress bars.
    pub show_progress: bool,
}

impl Settings {
    /// Settings for `directory` with the default pacing and progress shown.
    pub fn for_directory(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        let output_path = directory.join(REPORT_FILENAME);
        Self {
            directory,
            output_path,
            pacing: DEFAULT_PACING,
            show_progress: true,
        }
    }

    /// Use the given directory, or the one holding the running executable.
    pub fn resolve(directory: Option<PathBuf>) -> Result<Self> {
        let directory = match directory {
            Some(dir) => dir,
            None => default_directory()?,
        };
        Ok(Self::for_directory(directory))
    }

    /// Set the per-slide delay.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Enable or disable progress bars.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }
}

/// Directory containing the running executable.
fn default_directory() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate the running executable")?;
    Ok(exe
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".")))
}
