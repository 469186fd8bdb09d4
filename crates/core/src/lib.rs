//! Core domain types, slide text extraction, key-phrase annotation and the
//! directory scan pipeline.

pub mod error;
pub mod extract;
pub mod keyphrase;
pub mod pipeline;
pub mod scan;
pub mod types;

pub use error::{is_quota_failure, Error, PipelineError, ProviderError, Result};
pub use extract::SlideTextExtractor;
pub use keyphrase::{
    ChatMessage, CompletionProvider, CompletionRequest, KeyPhraseExtractor, Role,
};
pub use pipeline::{Pipeline, PresentationLoader, RunSummary, DEFAULT_PACING};
pub use scan::scan;
pub use types::{
    Credential, Presentation, PresentationFormat, Shape, ShapeType, Slide, SlideContent,
    SlideRecord, IMAGE_SLIDE_SENTINEL,
};
