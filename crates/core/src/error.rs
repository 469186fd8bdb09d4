//! Error types for slide scanning and key-phrase annotation.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Substrings that mark a provider failure as a quota or billing problem.
const QUOTA_SIGNATURES: &[&str] = &["insufficient_quota", "billing"];

/// Returns true if a failure message indicates exhausted quota or a billing problem.
///
/// Matching is a case-insensitive substring test on the message text. Providers
/// do not expose a stable code for this, so wording changes on their side can
/// slip past it.
pub fn is_quota_failure(message: &str) -> bool {
    let lowered = message.to_lowercase();
    QUOTA_SIGNATURES.iter().any(|sig| lowered.contains(sig))
}

/// Errors that can occur while reading presentations or writing the report.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open, read or write a file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The file format is not supported or could not be detected.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// Failed to parse the PPTX file structure.
    #[error("PPTX parsing error: {0}")]
    PptxParseError(String),

    /// Failed to parse the legacy PPT file structure.
    #[error("PPT parsing error: {0}")]
    PptParseError(String),

    /// Invalid or corrupted file.
    #[error("Invalid or corrupted file: {0}")]
    CorruptedFile(String),

    /// ZIP archive error (PPTX input, XLSX output).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing or writing error.
    #[error("XML error: {0}")]
    XmlError(String),

    /// OLE/CFB container error (for PPT).
    #[error("OLE/CFB error: {0}")]
    CfbError(String),

    /// Missing or invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A failed call to the language-model provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The account has no remaining quota or a billing problem. Unrecoverable for the run.
    #[error("insufficient quota or billing problem: {0}")]
    FatalQuota(String),

    /// Any other provider failure.
    #[error("{0}")]
    Transient(String),
}

impl ProviderError {
    /// Classify a raw provider failure message.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_quota_failure(&message) {
            Self::FatalQuota(message)
        } else {
            Self::Transient(message)
        }
    }

    /// Whether this failure must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalQuota(_))
    }

    /// The underlying provider message.
    pub fn message(&self) -> &str {
        match self {
            Self::FatalQuota(m) | Self::Transient(m) => m,
        }
    }
}

/// Errors that end a pipeline run early.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The target directory does not exist.
    #[error("Directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// The provider reported exhausted quota or a billing problem.
    #[error("Fatal provider error while processing {filename}: {message}")]
    FatalQuota { filename: String, message: String },

    /// The directory could not be enumerated.
    #[error(transparent)]
    Scan(#[from] Error),
}
