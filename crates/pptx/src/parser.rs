//! PPTX file parser implementation.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use slidescan_core::{Error, Presentation, PresentationFormat, Result, Shape, ShapeType, Slide};
use std::collections::HashMap;
use std::io::{Read, Seek};
use zip::ZipArchive;

const PRESENTATION_PATH: &str = "ppt/presentation.xml";
const PRESENTATION_RELS_PATH: &str = "ppt/_rels/presentation.xml.rels";
const SLIDE_REL_TYPE_SUFFIX: &str = "/relationships/slide";

/// Parser for PPTX (Office Open XML) files.
pub struct PptxParser;

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse a PPTX file from a reader.
    pub fn parse<R: Read + Seek>(&self, reader: R, filename: &str) -> Result<Presentation> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut presentation = Presentation::new(filename, PresentationFormat::Pptx);

        let slide_order = self.get_slide_order(&mut archive)?;
        log::debug!("{}: {} slide part(s)", filename, slide_order.len());

        for (idx, slide_path) in slide_order.iter().enumerate() {
            let slide = self.parse_slide(&mut archive, slide_path, idx + 1)?;
            presentation.add_slide(slide);
        }

        Ok(presentation)
    }

    /// Get the slide part paths in document order.
    ///
    /// The order comes from `p:sldIdLst` in presentation.xml. Without it, slide
    /// relationships are sorted by the number in their target name.
    fn get_slide_order<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
        let rels_content = self.read_file_from_archive(archive, PRESENTATION_RELS_PATH)?;
        let slide_rels: HashMap<String, String> = parse_relationships(&rels_content)?
            .into_iter()
            .filter(|rel| rel.rel_type.ends_with(SLIDE_REL_TYPE_SUFFIX))
            .map(|rel| (rel.id, resolve_target("ppt", &rel.target)))
            .collect();

        let listed_ids = match self.read_file_from_archive(archive, PRESENTATION_PATH) {
            Ok(content) => parse_slide_id_list(&content)?,
            Err(e) => {
                log::warn!("Could not read {} ({}), falling back to relationship order", PRESENTATION_PATH, e);
                Vec::new()
            }
        };

        if !listed_ids.is_empty() {
            let mut order = Vec::with_capacity(listed_ids.len());
            for id in &listed_ids {
                match slide_rels.get(id) {
                    Some(path) => order.push(path.clone()),
                    None => log::warn!("Slide id list references unknown relationship {}", id),
                }
            }
            return Ok(order);
        }

        let mut slides: Vec<(String, Option<usize>)> = slide_rels
            .into_values()
            .map(|path| {
                let num = extract_slide_number(&path);
                (path, num)
            })
            .collect();

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }

    /// Parse a single slide from the archive.
    fn parse_slide<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        slide_path: &str,
        slide_number: usize,
    ) -> Result<Slide> {
        let content = self.read_file_from_archive(archive, slide_path)?;
        let mut slide = Slide::new(slide_number);

        for shape in extract_shapes_from_xml(&content)
            .map_err(|e| Error::PptxParseError(format!("{}: {}", slide_path, e)))?
        {
            slide.add_shape(shape);
        }

        Ok(slide)
    }

    /// Read a file from the ZIP archive.
    fn read_file_from_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<String> {
        let mut file = archive
            .by_name(path)
            .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

        Ok(content)
    }
}

impl Default for PptxParser {
    fn default() -> Self {
        Self::new()
    }
}

/// One entry of a `.rels` part.
#[derive(Debug)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
}

fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut rels = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut rel = Relationship {
                    id: String::new(),
                    rel_type: String::new(),
                    target: String::new(),
                };
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"Id" => rel.id = value,
                        b"Type" => rel.rel_type = value,
                        b"Target" => rel.target = value,
                        _ => {}
                    }
                }
                rels.push(rel);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(rels)
}

/// Relationship ids of `p:sldId` entries, in list order.
fn parse_slide_id_list(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut ids = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                // `id` is the numeric slide id; the namespaced `r:id` is the relationship.
                let rel_id = e.attributes().flatten().find_map(|attr| {
                    let key = attr.key.as_ref();
                    (key.contains(&b':') && local_name(key) == b"id")
                        .then(|| String::from_utf8_lossy(&attr.value).to_string())
                });
                if let Some(id) = rel_id {
                    ids.push(id);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing {}: {}",
                    PRESENTATION_PATH, e
                )));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// Element kinds that form a shape when they are direct children of `p:spTree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeElement {
    Sp,
    Pic,
    GraphicFrame,
    GroupSp,
    CxnSp,
    ContentPart,
}

impl ShapeElement {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"sp" => Some(Self::Sp),
            b"pic" => Some(Self::Pic),
            b"graphicFrame" => Some(Self::GraphicFrame),
            b"grpSp" => Some(Self::GroupSp),
            b"cxnSp" => Some(Self::CxnSp),
            b"contentPart" => Some(Self::ContentPart),
            _ => None,
        }
    }
}

/// State collected while inside one top-level shape element.
#[derive(Debug)]
struct ShapeBuilder {
    element: ShapeElement,
    /// Element stack depth at which the shape was opened.
    depth: usize,
    is_placeholder: bool,
    is_text_box: bool,
    has_custom_geometry: bool,
    has_media_file: bool,
    graphic_uri: Option<String>,
    in_text_body: bool,
    in_run_text: bool,
    paragraphs: Vec<String>,
    current_paragraph: Option<String>,
}

impl ShapeBuilder {
    fn new(element: ShapeElement, depth: usize) -> Self {
        Self {
            element,
            depth,
            is_placeholder: false,
            is_text_box: false,
            has_custom_geometry: false,
            has_media_file: false,
            graphic_uri: None,
            in_text_body: false,
            in_run_text: false,
            paragraphs: Vec::new(),
            current_paragraph: None,
        }
    }

    /// Record what an opening (or empty) element inside the shape tells us.
    fn observe(&mut self, name: &[u8], e: &BytesStart<'_>, is_empty: bool) {
        match name {
            b"ph" => self.is_placeholder = true,
            b"cNvSpPr" => {
                self.is_text_box |= e.attributes().flatten().any(|attr| {
                    attr.key.as_ref() == b"txBox"
                        && matches!(attr.value.as_ref(), b"1" | b"true")
                });
            }
            b"custGeom" => self.has_custom_geometry = true,
            b"videoFile" | b"audioFile" | b"quickTimeFile" => self.has_media_file = true,
            b"graphicData" => {
                self.graphic_uri = e
                    .attributes()
                    .flatten()
                    .find(|attr| attr.key.as_ref() == b"uri")
                    .map(|attr| String::from_utf8_lossy(&attr.value).to_string());
            }
            b"txBody" if self.element == ShapeElement::Sp && !is_empty => {
                self.in_text_body = true;
            }
            b"p" if self.in_text_body => {
                if is_empty {
                    self.paragraphs.push(String::new());
                } else {
                    self.current_paragraph = Some(String::new());
                }
            }
            b"t" if self.current_paragraph.is_some() && !is_empty => self.in_run_text = true,
            b"br" => {
                if let Some(paragraph) = self.current_paragraph.as_mut() {
                    paragraph.push('\n');
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"t" => self.in_run_text = false,
            b"p" if self.in_text_body => {
                if let Some(paragraph) = self.current_paragraph.take() {
                    self.paragraphs.push(paragraph);
                }
            }
            b"txBody" => self.in_text_body = false,
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        if self.in_run_text {
            if let Some(paragraph) = self.current_paragraph.as_mut() {
                paragraph.push_str(text);
            }
        }
    }

    fn finish(self) -> Shape {
        match self.element {
            ShapeElement::Sp => {
                let shape_type = if self.is_placeholder {
                    ShapeType::Placeholder
                } else if self.is_text_box {
                    ShapeType::TextBox
                } else if self.has_custom_geometry {
                    ShapeType::Freeform
                } else {
                    ShapeType::AutoShape
                };
                Shape::with_text(shape_type, self.paragraphs.join("\n"))
            }
            ShapeElement::Pic if self.is_placeholder => Shape::without_text(ShapeType::Placeholder),
            ShapeElement::Pic if self.has_media_file => Shape::without_text(ShapeType::Media),
            ShapeElement::Pic => Shape::without_text(ShapeType::Picture),
            ShapeElement::GraphicFrame if self.is_placeholder => {
                Shape::without_text(ShapeType::Placeholder)
            }
            ShapeElement::GraphicFrame => {
                Shape::without_text(graphic_frame_type(self.graphic_uri.as_deref()))
            }
            ShapeElement::GroupSp => Shape::without_text(ShapeType::Group),
            ShapeElement::CxnSp => Shape::without_text(ShapeType::Line),
            ShapeElement::ContentPart => Shape::without_text(ShapeType::Other(0)),
        }
    }
}

/// Classify a graphic frame by its `a:graphicData` uri.
fn graphic_frame_type(uri: Option<&str>) -> ShapeType {
    let Some(uri) = uri else {
        return ShapeType::Other(0);
    };
    if uri.ends_with("/table") {
        ShapeType::Table
    } else if uri.ends_with("/chart") {
        ShapeType::Chart
    } else if uri.ends_with("/ole") {
        ShapeType::EmbeddedOleObject
    } else if uri.ends_with("/diagram") {
        ShapeType::Other(21)
    } else {
        ShapeType::Other(0)
    }
}

/// Extract the top-level shapes of a slide from its XML.
fn extract_shapes_from_xml(xml_content: &str) -> Result<Vec<Shape>> {
    let mut shapes = Vec::new();
    let mut reader = Reader::from_str(xml_content);

    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut current: Option<ShapeBuilder> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = local_name(e.name().as_ref()).to_vec();
                match current.as_mut() {
                    Some(builder) => builder.observe(&name, e, false),
                    None => {
                        if stack.last().map(|n| n.as_slice()) == Some(b"spTree".as_slice()) {
                            if let Some(element) = ShapeElement::from_local_name(&name) {
                                current = Some(ShapeBuilder::new(element, stack.len()));
                            }
                        }
                    }
                }
                stack.push(name);
            }
            Ok(Event::Empty(ref e)) => {
                let qname = e.name();
                let name = local_name(qname.as_ref());
                match current.as_mut() {
                    Some(builder) => builder.observe(name, e, true),
                    None => {
                        if stack.last().map(|n| n.as_slice()) == Some(b"spTree".as_slice()) {
                            if let Some(element) = ShapeElement::from_local_name(name) {
                                shapes.push(ShapeBuilder::new(element, stack.len()).finish());
                            }
                        }
                    }
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some(builder) = current.as_mut() {
                    let text = e
                        .unescape()
                        .map_err(|e| Error::XmlError(format!("Bad text content: {}", e)))?;
                    builder.push_text(&text);
                }
            }
            Ok(Event::End(ref e)) => {
                let qname = e.name();
                let name = local_name(qname.as_ref());
                stack.pop();
                if let Some(builder) = current.as_mut() {
                    if stack.len() == builder.depth {
                        if let Some(done) = current.take() {
                            shapes.push(done.finish());
                        }
                    } else {
                        builder.close(name);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(shapes)
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut parts: Vec<&str> = base_dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Extract a slide number from a string like "rId2" or "slides/slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}
