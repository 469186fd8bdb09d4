//! PPTX (Office Open XML) reader.
//!
//! A .pptx file is a ZIP archive of XML parts. The reader follows the slide
//! list in `ppt/presentation.xml` and turns each slide's top-level shapes into
//! [`slidescan_core::Shape`] values.

pub mod parser;

pub use parser::PptxParser;
