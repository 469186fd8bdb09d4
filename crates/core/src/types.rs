//! Domain types for presentations, slide content and report records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Text recorded for a slide that carries no text but at least one image-like shape.
pub const IMAGE_SLIDE_SENTINEL: &str = "[Image Slide]";

/// Represents an entire presentation as a tree of slides and shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Presentation {
    /// Original filename (without path).
    pub filename: String,

    /// Detected format of the source file.
    pub format: PresentationFormat,

    /// Slides in document order.
    pub slides: Vec<Slide>,
}

impl Presentation {
    /// Create a new presentation with the given filename and format.
    pub fn new(filename: impl Into<String>, format: PresentationFormat) -> Self {
        Self {
            filename: filename.into(),
            format,
            slides: Vec::new(),
        }
    }

    /// Add a slide to the presentation.
    pub fn add_slide(&mut self, slide: Slide) {
        self.slides.push(slide);
    }
}

/// The format of the source presentation file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentationFormat {
    /// Modern PPTX (Office Open XML).
    Pptx,
    /// Legacy PPT (OLE/CFB binary).
    Ppt,
}

impl PresentationFormat {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pptx" => Some(Self::Pptx),
            "ppt" => Some(Self::Ppt),
            _ => None,
        }
    }

    /// Detect format from file magic bytes.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        // PPTX is a ZIP file (PK\x03\x04)
        if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            return Some(Self::Pptx);
        }

        // PPT is an OLE/CFB file (D0 CF 11 E0 A1 B1 1A E1)
        if bytes.len() >= 8
            && bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1])
        {
            return Some(Self::Ppt);
        }

        None
    }
}

/// A single slide and its top-level shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slide {
    /// 1-based slide number in document order.
    pub number: usize,

    /// Top-level shapes in z-order.
    pub shapes: Vec<Shape>,
}

impl Slide {
    /// Create a new empty slide with the given number.
    pub fn new(number: usize) -> Self {
        Self {
            number,
            shapes: Vec::new(),
        }
    }

    /// Add a shape to this slide.
    pub fn add_shape(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }
}

/// One shape on a slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// Text of the shape, `None` for shapes that cannot hold text (pictures, tables, groups...).
    pub text: Option<String>,

    /// Shape classifier.
    pub shape_type: ShapeType,
}

impl Shape {
    /// A shape that exposes text.
    pub fn with_text(shape_type: ShapeType, text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            shape_type,
        }
    }

    /// A shape with no text attribute.
    pub fn without_text(shape_type: ShapeType) -> Self {
        Self {
            text: None,
            shape_type,
        }
    }
}

/// Shape classifier. Codes follow the Office `MsoShapeType` enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeType {
    AutoShape,
    Chart,
    Freeform,
    Group,
    EmbeddedOleObject,
    Line,
    LinkedOleObject,
    LinkedPicture,
    Picture,
    Placeholder,
    Media,
    TextBox,
    Table,
    /// Any other classifier code.
    Other(u32),
}

impl ShapeType {
    /// Numeric classifier code.
    pub fn code(&self) -> u32 {
        match self {
            Self::AutoShape => 1,
            Self::Chart => 3,
            Self::Freeform => 5,
            Self::Group => 6,
            Self::EmbeddedOleObject => 7,
            Self::Line => 9,
            Self::LinkedOleObject => 10,
            Self::LinkedPicture => 11,
            Self::Picture => 13,
            Self::Placeholder => 14,
            Self::Media => 16,
            Self::TextBox => 17,
            Self::Table => 19,
            Self::Other(code) => *code,
        }
    }

    /// Map a numeric classifier code back to a shape type.
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => Self::AutoShape,
            3 => Self::Chart,
            5 => Self::Freeform,
            6 => Self::Group,
            7 => Self::EmbeddedOleObject,
            9 => Self::Line,
            10 => Self::LinkedOleObject,
            11 => Self::LinkedPicture,
            13 => Self::Picture,
            14 => Self::Placeholder,
            16 => Self::Media,
            17 => Self::TextBox,
            19 => Self::Table,
            other => Self::Other(other),
        }
    }
}

/// The representative content of one slide, handed from text extraction to annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlideContent {
    /// No text and no image-like shape.
    Empty,
    /// Joined text of the slide's text-bearing shapes.
    Text(String),
    /// No text but at least one image-like shape.
    ImageOnly,
}

impl SlideContent {
    /// The text form used for annotation and the report.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Empty => "",
            Self::Text(text) => text,
            Self::ImageOnly => IMAGE_SLIDE_SENTINEL,
        }
    }
}

impl fmt::Display for SlideContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One report row: a slide and its key phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideRecord {
    /// Presentation filename (without path).
    pub source_filename: String,

    /// 1-based slide index within its file.
    pub slide_index: usize,

    /// Key phrase, or the slide content itself when it was empty or image-only.
    pub key_phrase: String,
}

impl SlideRecord {
    pub fn new(
        source_filename: impl Into<String>,
        slide_index: usize,
        key_phrase: impl Into<String>,
    ) -> Self {
        Self {
            source_filename: source_filename.into(),
            slide_index,
            key_phrase: key_phrase.into(),
        }
    }
}

/// Provider credential. Its `Debug` output never shows the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a credential value. Empty or whitespace-only values are treated as absent.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Read a credential from an environment variable.
    pub fn from_env(var: &str) -> crate::Result<Self> {
        std::env::var(var)
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| crate::Error::Config(format!("{} environment variable not set", var)))
    }

    /// The secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}
