//! Slide text extraction.
//!
//! Reduces a slide's shapes to a single line of text, or to the image
//! sentinel when the slide carries only pictures and other image-like shapes.

use crate::{ShapeType, Slide, SlideContent};

/// Shape classifiers treated as image-like: picture, placeholder, text box, table.
const IMAGE_LIKE_SHAPES: &[ShapeType] = &[
    ShapeType::Picture,
    ShapeType::Placeholder,
    ShapeType::TextBox,
    ShapeType::Table,
];

/// Extracts the representative text of a slide.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlideTextExtractor;

impl SlideTextExtractor {
    /// Create a new extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract the slide's content.
    ///
    /// Text of every text-bearing shape is trimmed and joined with a single
    /// space; blank fragments are dropped. A slide without text but with an
    /// image-like shape yields [`SlideContent::ImageOnly`].
    pub fn extract(&self, slide: &Slide) -> SlideContent {
        let mut fragments: Vec<&str> = Vec::new();
        let mut has_image = false;

        for shape in &slide.shapes {
            if let Some(text) = shape.text.as_deref() {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    fragments.push(trimmed);
                }
            }
            if IMAGE_LIKE_SHAPES.contains(&shape.shape_type) {
                has_image = true;
            }
        }

        let text = fragments.join(" ");
        if !text.is_empty() {
            SlideContent::Text(text)
        } else if has_image {
            SlideContent::ImageOnly
        } else {
            SlideContent::Empty
        }
    }
}
