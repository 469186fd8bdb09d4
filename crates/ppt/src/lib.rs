//! Legacy PPT (PowerPoint 97-2003) reader.
//!
//! Reads the `PowerPoint Document` stream of an OLE/CFB container and builds
//! the slide shape tree from its binary records.

pub mod parser;

pub use parser::PptParser;
