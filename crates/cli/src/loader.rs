//! Format detection and dispatch to the PPTX and PPT readers.

use slidescan_core::{Error, Presentation, PresentationFormat, PresentationLoader, Result};
use slidescan_ppt::PptParser;
use slidescan_pptx::PptxParser;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Loads a presentation with the reader matching its content.
///
/// Magic bytes decide the format; the file extension is the fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatDetectingLoader;

impl FormatDetectingLoader {
    /// Create a new loader.
    pub fn new() -> Self {
        Self
    }

    /// Detect the format of the file at `path`.
    pub fn detect_format(&self, path: &Path) -> Result<PresentationFormat> {
        let mut magic = Vec::with_capacity(8);
        File::open(path)?.take(8).read_to_end(&mut magic)?;

        PresentationFormat::from_magic(&magic)
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .and_then(PresentationFormat::from_extension)
            })
            .ok_or_else(|| {
                Error::UnsupportedFormat(format!("Could not detect format of {}", path.display()))
            })
    }
}

impl PresentationLoader for FormatDetectingLoader {
    fn load(&self, path: &Path) -> Result<Presentation> {
        let format = self.detect_format(path)?;

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown");

        let reader = BufReader::new(File::open(path)?);

        match format {
            PresentationFormat::Pptx => {
                log::debug!("Parsing {} as PPTX", filename);
                PptxParser::new().parse(reader, filename)
            }
            PresentationFormat::Ppt => {
                log::debug!("Parsing {} as legacy PPT", filename);
                PptParser::new().parse(reader, filename)
            }
        }
    }
}
