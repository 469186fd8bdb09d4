//! The scan pipeline: directory → presentations → slides → key phrases.
//!
//! Processing is strictly sequential. A failure inside one file abandons the
//! rest of that file and moves on; a quota or billing failure from the
//! provider ends the whole run.

use crate::error::is_quota_failure;
use crate::{
    scan, CompletionProvider, KeyPhraseExtractor, PipelineError, Presentation, ProviderError,
    Result, SlideRecord, SlideTextExtractor,
};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Delay between slides, to stay under the provider's rate limit.
pub const DEFAULT_PACING: Duration = Duration::from_millis(500);

/// Opens a presentation file and returns its slide tree.
pub trait PresentationLoader {
    fn load(&self, path: &Path) -> Result<Presentation>;
}

impl<L: PresentationLoader + ?Sized> PresentationLoader for &L {
    fn load(&self, path: &Path) -> Result<Presentation> {
        (**self).load(path)
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records in (file order, slide order).
    pub records: Vec<SlideRecord>,

    /// Number of presentation files found by the scan.
    pub files_found: usize,

    /// Number of files abandoned because of a parse or provider error.
    pub files_failed: usize,
}

/// Why a single file stopped early.
enum FileFailure {
    Fatal(String),
    Recoverable(String),
}

impl From<ProviderError> for FileFailure {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::FatalQuota(message) => Self::Fatal(message),
            ProviderError::Transient(message) => Self::Recoverable(message),
        }
    }
}

impl From<crate::Error> for FileFailure {
    fn from(err: crate::Error) -> Self {
        let message = err.to_string();
        if is_quota_failure(&message) {
            Self::Fatal(message)
        } else {
            Self::Recoverable(message)
        }
    }
}

/// Drives extraction and annotation over every presentation in a directory.
pub struct Pipeline<L, P> {
    loader: L,
    key_phrases: KeyPhraseExtractor<P>,
    slide_text: SlideTextExtractor,
    pacing: Duration,
    show_progress: bool,
}

impl<L: PresentationLoader, P: CompletionProvider> Pipeline<L, P> {
    /// Create a pipeline with the default pacing and progress bars hidden.
    pub fn new(loader: L, provider: P) -> Self {
        Self {
            loader,
            key_phrases: KeyPhraseExtractor::new(provider),
            slide_text: SlideTextExtractor::new(),
            pacing: DEFAULT_PACING,
            show_progress: false,
        }
    }

    /// Set the delay applied after every slide.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Show per-file and per-slide progress bars on stderr.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Get a reference to the provider.
    pub fn provider(&self) -> &P {
        self.key_phrases.provider()
    }

    /// Process every presentation in `directory`.
    pub fn run(&self, directory: &Path) -> std::result::Result<RunSummary, PipelineError> {
        if !directory.is_dir() {
            return Err(PipelineError::MissingDirectory(directory.to_path_buf()));
        }

        let files = scan(directory)?;
        if files.is_empty() {
            log::warn!("No presentation files found in {}", directory.display());
        }
        self.process(directory, &files)
    }

    /// Process the named files of `directory`, in the order given.
    pub fn process(
        &self,
        directory: &Path,
        files: &[String],
    ) -> std::result::Result<RunSummary, PipelineError> {
        let mut summary = RunSummary {
            files_found: files.len(),
            ..Default::default()
        };

        if files.is_empty() {
            return Ok(summary);
        }
        log::info!("Processing {} presentation file(s)", files.len());

        let progress = if self.show_progress {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };
        let file_bar = progress.add(new_bar(files.len(), "Processing files", "file"));

        for filename in files {
            let path = directory.join(filename);
            log::debug!("Processing {}", path.display());

            match self.process_file(&path, filename, &progress, &mut summary.records) {
                Ok(slides) => log::info!("{}: {} slide(s) annotated", filename, slides),
                Err(FileFailure::Fatal(message)) => {
                    file_bar.abandon();
                    return Err(PipelineError::FatalQuota {
                        filename: filename.clone(),
                        message,
                    });
                }
                Err(FileFailure::Recoverable(message)) => {
                    log::error!("Error processing {}: {}", filename, message);
                    summary.files_failed += 1;
                }
            }
            file_bar.inc(1);
        }

        file_bar.finish_and_clear();
        Ok(summary)
    }

    /// Annotate every slide of one file, appending records as they are produced.
    fn process_file(
        &self,
        path: &Path,
        filename: &str,
        progress: &MultiProgress,
        records: &mut Vec<SlideRecord>,
    ) -> std::result::Result<usize, FileFailure> {
        let presentation = self.loader.load(path)?;
        let slide_bar = progress.add(new_bar(
            presentation.slides.len(),
            &format!("Processing {}", filename),
            "slide",
        ));

        for (idx, slide) in presentation.slides.iter().enumerate() {
            let content = self.slide_text.extract(slide);
            let key_phrase = match self.key_phrases.extract_key_phrase(content.as_str()) {
                Ok(phrase) => phrase,
                Err(e) => {
                    slide_bar.finish_and_clear();
                    progress.remove(&slide_bar);
                    return Err(e.into());
                }
            };

            records.push(SlideRecord::new(filename, idx + 1, key_phrase));
            slide_bar.inc(1);

            if !self.pacing.is_zero() {
                std::thread::sleep(self.pacing);
            }
        }

        slide_bar.finish_and_clear();
        progress.remove(&slide_bar);
        Ok(presentation.slides.len())
    }
}

fn new_bar(len: usize, message: &str, unit: &str) -> ProgressBar {
    let style = ProgressStyle::with_template(&format!(
        "{{msg}}: {{percent:>3}}%|{{wide_bar}}| {{pos}}/{{len}} [{{elapsed_precise}}] {}",
        unit
    ))
    .unwrap_or_else(|_| ProgressStyle::default_bar());

    ProgressBar::new(len as u64)
        .with_style(style)
        .with_message(message.to_string())
}
