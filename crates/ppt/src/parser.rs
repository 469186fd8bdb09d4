//! PPT file parser implementation.
//!
//! Parses legacy PowerPoint files stored in the OLE/CFB container format.
//! Slides are located through the persist directory and the document's slide
//! list; shapes come from each slide's OfficeArt drawing.
//!
//! ## Compatibility
//!
//! PowerPoint 97-2003 (.ppt) files. Files are validated before extraction and
//! incompatible streams are reported as errors.

use cfb::CompoundFile;
use slidescan_core::{Error, Presentation, PresentationFormat, Result, Shape, ShapeType, Slide};
use std::collections::HashMap;
use std::io::{Read, Seek};

/// Minimum stream size for a valid PPT file (bytes).
/// A valid PPT needs at least a document container with some content.
const MIN_STREAM_SIZE: usize = 512;

/// Malformed record count above which the stream is treated as corrupted.
const MAX_MALFORMED_RECORDS: usize = 10;

/// Deepest container nesting walked during validation. Deeper containers count as malformed.
const MAX_RECORD_DEPTH: usize = 64;

const POWERPOINT_DOCUMENT_STREAM: &str = "/PowerPoint Document";

/// Record type constants for the PowerPoint binary format.
mod record_types {
    pub const RT_DOCUMENT: u16 = 0x03E8;
    pub const RT_SLIDE: u16 = 0x03EE;
    pub const RT_SLIDE_PERSIST_ATOM: u16 = 0x03F3;
    pub const RT_PP_DRAWING: u16 = 0x040C;
    pub const RT_OE_PLACEHOLDER_ATOM: u16 = 0x0BC3;
    pub const RT_OUTLINE_TEXT_REF_ATOM: u16 = 0x0F9E;
    pub const RT_TEXT_HEADER_ATOM: u16 = 0x0F9F;
    pub const RT_TEXT_CHARS_ATOM: u16 = 0x0FA0;
    pub const RT_TEXT_BYTES_ATOM: u16 = 0x0FA8;
    pub const RT_SLIDE_LIST_WITH_TEXT: u16 = 0x0FF0;
    pub const RT_PERSIST_DIRECTORY_ATOM: u16 = 0x1772;
}

/// OfficeArt drawing record types.
mod art_types {
    pub const DG_CONTAINER: u16 = 0xF002;
    pub const SPGR_CONTAINER: u16 = 0xF003;
    pub const SP_CONTAINER: u16 = 0xF004;
    pub const FSP: u16 = 0xF00A;
    pub const CLIENT_TEXTBOX: u16 = 0xF00D;
    pub const CLIENT_DATA: u16 = 0xF011;
}

/// `OfficeArtFSP` flag bits.
mod shape_flags {
    pub const GROUP: u32 = 0x0001;
    pub const PATRIARCH: u32 = 0x0004;
    pub const DELETED: u32 = 0x0008;
    pub const OLE_SHAPE: u32 = 0x0010;
    pub const CONNECTOR: u32 = 0x0100;
    pub const BACKGROUND: u32 = 0x0400;
}

/// `MSOSPT` shape type values.
mod msospt {
    pub const LINE: u16 = 20;
    pub const STRAIGHT_CONNECTOR: u16 = 32;
    pub const CURVED_CONNECTOR_LAST: u16 = 40;
    pub const PICTURE_FRAME: u16 = 75;
    pub const TEXT_BOX: u16 = 202;
}

/// One record: 8-byte header plus body.
#[derive(Debug, Clone, Copy)]
struct Record<'a> {
    ver: u16,
    instance: u16,
    rec_type: u16,
    /// Offset of the header within the stream.
    offset: usize,
    body: &'a [u8],
}

impl<'a> Record<'a> {
    fn is_container(&self) -> bool {
        self.ver == 0x0F
    }

    fn children(&self) -> Records<'a> {
        Records::new(self.body, self.offset + 8)
    }

    fn child(&self, rec_type: u16) -> Option<Record<'a>> {
        self.children().find(|r| r.rec_type == rec_type)
    }
}

/// Iterator over sibling records. Stops at the first record that overruns its parent.
struct Records<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
    malformed: bool,
}

impl<'a> Records<'a> {
    fn new(data: &'a [u8], base: usize) -> Self {
        Self {
            data,
            pos: 0,
            base,
            malformed: false,
        }
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Record<'a>> {
        if self.pos + 8 > self.data.len() {
            return None;
        }

        // PPT records have an 8-byte header:
        // - 2 bytes: recVer (4 bits) + recInstance (12 bits)
        // - 2 bytes: recType
        // - 4 bytes: recLen
        let ver_instance = read_u16_le(self.data, self.pos);
        let rec_type = read_u16_le(self.data, self.pos + 2);
        let rec_len = read_u32_le(self.data, self.pos + 4) as usize;

        let content_start = self.pos + 8;
        let content_end = match content_start.checked_add(rec_len) {
            Some(end) if end <= self.data.len() => end,
            _ => {
                self.malformed = true;
                self.pos = self.data.len();
                return None;
            }
        };

        let record = Record {
            ver: ver_instance & 0x0F,
            instance: ver_instance >> 4,
            rec_type,
            offset: self.base + self.pos,
            body: &self.data[content_start..content_end],
        };
        self.pos = content_end;
        Some(record)
    }
}

/// Read the record whose header starts at `offset`.
fn record_at(data: &[u8], offset: usize) -> Option<Record<'_>> {
    let tail = data.get(offset..)?;
    Records::new(tail, offset).next()
}

/// Information collected during file validation.
#[derive(Debug, Default)]
struct FileValidation {
    /// Size of the PowerPoint Document stream
    stream_size: usize,
    /// Whether RT_Document record was found
    has_document: bool,
    /// Count of slide containers found
    slide_count: usize,
    /// Count of text records found
    text_record_count: usize,
    /// Count of malformed records (bad lengths, etc.)
    malformed_records: usize,
}

/// Outline text of one slide-list entry.
#[derive(Debug, Default)]
struct SlideListEntry {
    persist_id: u32,
    texts: Vec<String>,
}

/// Parser for legacy PPT (OLE/CFB) files.
pub struct PptParser;

impl PptParser {
    /// Create a new PPT parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse a PPT file from a reader.
    ///
    /// The stream is validated first; an incompatible file is an error.
    pub fn parse<R: Read + Seek>(&self, reader: R, filename: &str) -> Result<Presentation> {
        let mut cfb = CompoundFile::open(reader)
            .map_err(|e| Error::CfbError(format!("Failed to open CFB container: {}", e)))?;

        self.validate_cfb_structure(&cfb)?;

        let stream_data = self.read_powerpoint_stream(&mut cfb)?;
        let validation = self.validate_stream(&stream_data)?;

        log::debug!(
            "PPT validation: stream_size={}, has_document={}, slides={}, text_records={}, malformed={}",
            validation.stream_size,
            validation.has_document,
            validation.slide_count,
            validation.text_record_count,
            validation.malformed_records
        );

        let mut presentation = Presentation::new(filename, PresentationFormat::Ppt);
        for slide in self.extract_slides(&stream_data)? {
            presentation.add_slide(slide);
        }

        Ok(presentation)
    }

    /// Validate the CFB container has required PowerPoint streams.
    fn validate_cfb_structure<R: Read + Seek>(&self, cfb: &CompoundFile<R>) -> Result<()> {
        let has_ppt_doc = cfb
            .walk()
            .any(|entry| entry.path().to_string_lossy() == POWERPOINT_DOCUMENT_STREAM);

        if !has_ppt_doc {
            return Err(Error::UnsupportedFormat(
                "Missing 'PowerPoint Document' stream. This may not be a valid PPT file \
                 or may be a different Office format."
                    .to_string(),
            ));
        }

        let has_current_user = cfb
            .walk()
            .any(|entry| entry.path().to_string_lossy() == "/Current User");

        if !has_current_user {
            log::warn!("Missing 'Current User' stream. File may be an older PPT format variant.");
        }

        Ok(())
    }

    /// Validate the PowerPoint Document stream content.
    fn validate_stream(&self, data: &[u8]) -> Result<FileValidation> {
        let mut validation = FileValidation {
            stream_size: data.len(),
            ..Default::default()
        };

        if data.len() < MIN_STREAM_SIZE {
            return Err(Error::CorruptedFile(format!(
                "PowerPoint Document stream too small ({} bytes). \
                 Minimum expected: {} bytes. File may be corrupted or truncated.",
                data.len(),
                MIN_STREAM_SIZE
            )));
        }

        scan_records_for_validation(Records::new(data, 0), &mut validation, 0);

        if !validation.has_document {
            return Err(Error::UnsupportedFormat(
                "No RT_Document record found. This file may use an unsupported \
                 PowerPoint format version (pre-97) or be corrupted."
                    .to_string(),
            ));
        }

        if validation.malformed_records > MAX_MALFORMED_RECORDS {
            return Err(Error::CorruptedFile(format!(
                "Too many malformed records ({}) detected. File may be corrupted.",
                validation.malformed_records
            )));
        }

        Ok(validation)
    }

    /// Read the PowerPoint Document stream from the CFB container.
    fn read_powerpoint_stream<R: Read + Seek>(&self, cfb: &mut CompoundFile<R>) -> Result<Vec<u8>> {
        let mut stream = cfb.open_stream(POWERPOINT_DOCUMENT_STREAM).map_err(|e| {
            Error::CfbError(format!("Failed to open PowerPoint Document stream: {}", e))
        })?;

        let mut data = Vec::new();
        stream
            .read_to_end(&mut data)
            .map_err(|e| Error::CfbError(format!("Failed to read stream: {}", e)))?;

        Ok(data)
    }

    /// Build the slide list from a validated stream.
    ///
    /// Slides follow the document's slide list, resolved through the persist
    /// directory. Without a usable list, slide containers are taken in stream order.
    fn extract_slides(&self, data: &[u8]) -> Result<Vec<Slide>> {
        let top_level: Vec<Record<'_>> = Records::new(data, 0).collect();

        let persist_directory = build_persist_directory(&top_level);
        let document = top_level
            .iter()
            .rev()
            .find(|r| r.rec_type == record_types::RT_DOCUMENT)
            .ok_or_else(|| Error::PptParseError("No top-level Document record".to_string()))?;
        let entries = read_slide_list(document);

        let mut slides = Vec::new();
        for entry in &entries {
            let container = persist_directory
                .get(&entry.persist_id)
                .and_then(|&offset| record_at(data, offset))
                .filter(|r| r.rec_type == record_types::RT_SLIDE);

            match container {
                Some(container) => {
                    let number = slides.len() + 1;
                    slides.push(parse_slide_container(&container, &entry.texts, number));
                }
                None => log::warn!(
                    "Slide persist id {} does not resolve to a slide record",
                    entry.persist_id
                ),
            }
        }

        if slides.is_empty() && !entries.is_empty() {
            log::warn!("Slide list could not be resolved, falling back to stream order");
        }
        if slides.is_empty() {
            for container in top_level
                .iter()
                .filter(|r| r.rec_type == record_types::RT_SLIDE)
            {
                let number = slides.len() + 1;
                slides.push(parse_slide_container(container, &[], number));
            }
        }

        Ok(slides)
    }
}

impl Default for PptParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursively collect validation information.
fn scan_records_for_validation(
    mut records: Records<'_>,
    validation: &mut FileValidation,
    depth: usize,
) {
    for record in records.by_ref() {
        match record.rec_type {
            record_types::RT_DOCUMENT => validation.has_document = true,
            record_types::RT_SLIDE => validation.slide_count += 1,
            record_types::RT_TEXT_CHARS_ATOM | record_types::RT_TEXT_BYTES_ATOM => {
                validation.text_record_count += 1;
            }
            _ => {}
        }

        if record.is_container() {
            if depth >= MAX_RECORD_DEPTH {
                log::debug!("Container at offset {} nested too deeply", record.offset);
                validation.malformed_records += 1;
            } else {
                scan_records_for_validation(record.children(), validation, depth + 1);
            }
        }
    }

    if records.malformed {
        validation.malformed_records += 1;
    }
}

/// Map persist ids to stream offsets. Later directory atoms override earlier ones.
fn build_persist_directory(top_level: &[Record<'_>]) -> HashMap<u32, usize> {
    let mut directory = HashMap::new();

    for atom in top_level
        .iter()
        .filter(|r| r.rec_type == record_types::RT_PERSIST_DIRECTORY_ATOM)
    {
        let body = atom.body;
        let mut pos = 0;
        while pos + 4 <= body.len() {
            let header = read_u32_le(body, pos);
            let first_id = header & 0x000F_FFFF;
            let count = (header >> 20) as usize;
            pos += 4;

            for i in 0..count {
                if pos + 4 > body.len() {
                    break;
                }
                directory.insert(first_id + i as u32, read_u32_le(body, pos) as usize);
                pos += 4;
            }
        }
    }

    directory
}

/// Read the slide entries (instance 0) of the document's SlideListWithText.
fn read_slide_list(document: &Record<'_>) -> Vec<SlideListEntry> {
    let Some(list) = document.children().find(|r| {
        r.rec_type == record_types::RT_SLIDE_LIST_WITH_TEXT && r.instance == 0
    }) else {
        return Vec::new();
    };

    let mut entries: Vec<SlideListEntry> = Vec::new();
    for record in list.children() {
        match record.rec_type {
            record_types::RT_SLIDE_PERSIST_ATOM if record.body.len() >= 4 => {
                entries.push(SlideListEntry {
                    persist_id: read_u32_le(record.body, 0),
                    texts: Vec::new(),
                });
            }
            record_types::RT_TEXT_HEADER_ATOM => {
                if let Some(entry) = entries.last_mut() {
                    entry.texts.push(String::new());
                }
            }
            record_types::RT_TEXT_CHARS_ATOM | record_types::RT_TEXT_BYTES_ATOM => {
                if let Some(entry) = entries.last_mut() {
                    let text = decode_text_record(&record);
                    match entry.texts.last_mut() {
                        Some(last) if last.is_empty() => *last = text,
                        _ => entry.texts.push(text),
                    }
                }
            }
            _ => {}
        }
    }

    entries
}

/// Build a slide from its container and the slide's outline text.
fn parse_slide_container(container: &Record<'_>, outline: &[String], number: usize) -> Slide {
    let mut slide = Slide::new(number);

    let group = container
        .child(record_types::RT_PP_DRAWING)
        .and_then(|drawing| drawing.child(art_types::DG_CONTAINER))
        .and_then(|dg| dg.child(art_types::SPGR_CONTAINER));

    let Some(group) = group else {
        log::debug!("Slide {} has no drawing", number);
        return slide;
    };

    for child in group.children() {
        match child.rec_type {
            art_types::SP_CONTAINER => {
                if let Some(shape) = shape_from_container(&child, outline) {
                    slide.add_shape(shape);
                }
            }
            art_types::SPGR_CONTAINER => slide.add_shape(Shape::without_text(ShapeType::Group)),
            _ => {}
        }
    }

    slide
}

/// Classify one shape container. Group, background and deleted shapes yield `None`.
fn shape_from_container(container: &Record<'_>, outline: &[String]) -> Option<Shape> {
    let mut spt = 0u16;
    let mut flags = 0u32;
    let mut is_placeholder = false;
    let mut text = None;

    for record in container.children() {
        match record.rec_type {
            art_types::FSP if record.body.len() >= 8 => {
                spt = record.instance;
                flags = read_u32_le(record.body, 4);
            }
            art_types::CLIENT_DATA => {
                is_placeholder = record
                    .children()
                    .any(|r| r.rec_type == record_types::RT_OE_PLACEHOLDER_ATOM);
            }
            art_types::CLIENT_TEXTBOX => text = textbox_text(&record, outline),
            _ => {}
        }
    }

    let hidden = shape_flags::GROUP | shape_flags::PATRIARCH | shape_flags::BACKGROUND | shape_flags::DELETED;
    if flags & hidden != 0 {
        return None;
    }

    let shape_type = if is_placeholder {
        ShapeType::Placeholder
    } else if flags & shape_flags::OLE_SHAPE != 0 {
        ShapeType::EmbeddedOleObject
    } else if spt == msospt::PICTURE_FRAME {
        ShapeType::Picture
    } else if spt == msospt::TEXT_BOX {
        ShapeType::TextBox
    } else if flags & shape_flags::CONNECTOR != 0
        || spt == msospt::LINE
        || (msospt::STRAIGHT_CONNECTOR..=msospt::CURVED_CONNECTOR_LAST).contains(&spt)
    {
        ShapeType::Line
    } else {
        ShapeType::AutoShape
    };

    Some(Shape { text, shape_type })
}

/// Text held by a client textbox, either inline or by outline reference.
fn textbox_text(textbox: &Record<'_>, outline: &[String]) -> Option<String> {
    let mut text: Option<String> = None;

    for record in textbox.children() {
        match record.rec_type {
            record_types::RT_TEXT_CHARS_ATOM | record_types::RT_TEXT_BYTES_ATOM => {
                text = Some(decode_text_record(&record));
            }
            record_types::RT_OUTLINE_TEXT_REF_ATOM if record.body.len() >= 4 => {
                let index = read_u32_le(record.body, 0) as usize;
                match outline.get(index) {
                    Some(outline_text) => text = Some(outline_text.clone()),
                    None => log::debug!("Outline text reference {} out of range", index),
                }
            }
            _ => {}
        }
    }

    text
}

fn decode_text_record(record: &Record<'_>) -> String {
    let raw = if record.rec_type == record_types::RT_TEXT_CHARS_ATOM {
        decode_utf16_text(record.body)
    } else {
        decode_ansi_text(record.body)
    };
    normalize_breaks(&raw)
}

/// Paragraph (`\r`) and vertical-tab line breaks become `\n`.
fn normalize_breaks(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\r' | '\u{000B}' => '\n',
            other => other,
        })
        .collect()
}

/// Decode UTF-16LE text, stopping at a null terminator.
fn decode_utf16_text(bytes: &[u8]) -> String {
    let units = bytes
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]));

    char::decode_utf16(units)
        .take_while(|r| r.as_ref().map(|&c| c != '\0').unwrap_or(true))
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Decode 8-bit text as Windows-1252, stopping at a null terminator.
fn decode_ansi_text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());

    bytes[..end]
        .iter()
        .map(|&b| match b {
            0x80 => '€',
            0x82 => '‚',
            0x83 => 'ƒ',
            0x84 => '„',
            0x85 => '…',
            0x86 => '†',
            0x87 => '‡',
            0x88 => 'ˆ',
            0x89 => '‰',
            0x8A => 'Š',
            0x8B => '‹',
            0x8C => 'Œ',
            0x8E => 'Ž',
            0x91 => '\u{2018}',
            0x92 => '\u{2019}',
            0x93 => '\u{201C}',
            0x94 => '\u{201D}',
            0x95 => '•',
            0x96 => '–',
            0x97 => '—',
            0x98 => '˜',
            0x99 => '™',
            0x9A => 'š',
            0x9B => '›',
            0x9C => 'œ',
            0x9E => 'ž',
            0x9F => 'Ÿ',
            0x81 | 0x8D | 0x8F | 0x90 | 0x9D => char::REPLACEMENT_CHARACTER,
            other => other as char,
        })
        .collect()
}

/// Read a little-endian u16 from a byte slice.
fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

/// Read a little-endian u32 from a byte slice.
fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn record(ver: u16, instance: u16, rec_type: u16, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(body.len() + 8);
        out.extend_from_slice(&(ver | (instance << 4)).to_le_bytes());
        out.extend_from_slice(&rec_type.to_le_bytes());
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(body);
        out
    }

    fn atom(rec_type: u16, instance: u16, body: &[u8]) -> Vec<u8> {
        record(0, instance, rec_type, body)
    }

    fn container(rec_type: u16, instance: u16, children: &[Vec<u8>]) -> Vec<u8> {
        record(0x0F, instance, rec_type, &children.concat())
    }

    fn utf16(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    fn fsp(spt: u16, flags: u32) -> Vec<u8> {
        let mut body = 1024u32.to_le_bytes().to_vec();
        body.extend_from_slice(&flags.to_le_bytes());
        record(2, spt, art_types::FSP, &body)
    }

    fn shape(spt: u16, flags: u32, placeholder: bool, textbox: Option<Vec<u8>>) -> Vec<u8> {
        let mut children = vec![fsp(spt, flags)];
        if placeholder {
            children.push(container(
                art_types::CLIENT_DATA,
                0,
                &[atom(record_types::RT_OE_PLACEHOLDER_ATOM, 0, &[0u8; 8])],
            ));
        }
        if let Some(text_record) = textbox {
            children.push(container(art_types::CLIENT_TEXTBOX, 0, &[text_record]));
        }
        container(art_types::SP_CONTAINER, 0, &children)
    }

    fn slide_record(shapes: Vec<Vec<u8>>) -> Vec<u8> {
        let mut group = vec![shape(0, shape_flags::GROUP | shape_flags::PATRIARCH, false, None)];
        group.extend(shapes);
        let background = shape(1, shape_flags::BACKGROUND, false, None);

        let dg = container(
            art_types::DG_CONTAINER,
            0,
            &[container(art_types::SPGR_CONTAINER, 0, &group), background],
        );
        container(
            record_types::RT_SLIDE,
            0,
            &[container(record_types::RT_PP_DRAWING, 0, &[dg])],
        )
    }

    fn outline_ref(index: u32) -> Vec<u8> {
        atom(record_types::RT_OUTLINE_TEXT_REF_ATOM, 0, &index.to_le_bytes())
    }

    fn slide_persist(persist_id: u32) -> Vec<u8> {
        let mut body = persist_id.to_le_bytes().to_vec();
        body.extend_from_slice(&[0u8; 16]);
        atom(record_types::RT_SLIDE_PERSIST_ATOM, 0, &body)
    }

    fn pad(mut stream: Vec<u8>) -> Vec<u8> {
        if stream.len() < MIN_STREAM_SIZE {
            stream.resize(MIN_STREAM_SIZE, 0);
        }
        stream
    }

    /// A two-slide stream whose slide list names the second container first.
    fn two_slide_stream() -> Vec<u8> {
        let slide_list = container(
            record_types::RT_SLIDE_LIST_WITH_TEXT,
            0,
            &[
                slide_persist(2),
                atom(record_types::RT_TEXT_HEADER_ATOM, 0, &0u32.to_le_bytes()),
                atom(record_types::RT_TEXT_CHARS_ATOM, 0, &utf16("Agenda")),
                atom(record_types::RT_TEXT_HEADER_ATOM, 0, &1u32.to_le_bytes()),
                atom(record_types::RT_TEXT_BYTES_ATOM, 0, b"Budget\rHiring\x0bplan"),
                slide_persist(1),
            ],
        );
        let document = container(record_types::RT_DOCUMENT, 0, &[slide_list]);

        let picture_slide = slide_record(vec![shape(msospt::PICTURE_FRAME, 0, false, None)]);
        let text_slide = slide_record(vec![
            shape(1, 0, true, Some(outline_ref(0))),
            shape(1, 0, true, Some(outline_ref(1))),
            shape(20, 0, false, None),
        ]);

        let picture_offset = document.len() as u32;
        let text_offset = picture_offset + picture_slide.len() as u32;

        // persistId 1 -> picture slide, 2 -> text slide
        let mut dir_body = ((2u32 << 20) | 1).to_le_bytes().to_vec();
        dir_body.extend_from_slice(&picture_offset.to_le_bytes());
        dir_body.extend_from_slice(&text_offset.to_le_bytes());
        let persist_dir = atom(record_types::RT_PERSIST_DIRECTORY_ATOM, 0, &dir_body);

        pad([document, picture_slide, text_slide, persist_dir].concat())
    }

    fn cfb_file(stream: &[u8]) -> Vec<u8> {
        let mut cfb = CompoundFile::create(Cursor::new(Vec::new())).unwrap();
        {
            let mut s = cfb.create_stream(POWERPOINT_DOCUMENT_STREAM).unwrap();
            s.write_all(stream).unwrap();
            s.flush().unwrap();
        }
        {
            let mut s = cfb.create_stream("/Current User").unwrap();
            s.write_all(&[0u8; 32]).unwrap();
            s.flush().unwrap();
        }
        cfb.flush().unwrap();
        cfb.into_inner().into_inner()
    }

    #[test]
    fn test_read_u16_le() {
        let data = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(read_u16_le(&data, 0), 0x0201);
        assert_eq!(read_u16_le(&data, 2), 0x0403);
    }

    #[test]
    fn test_read_u32_le() {
        let data = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(read_u32_le(&data, 0), 0x04030201);
    }

    #[test]
    fn test_decode_text() {
        assert_eq!(decode_ansi_text(b"Hello World\0garbage"), "Hello World");
        assert_eq!(decode_ansi_text(&[0x93, b'q', 0x94, 0xE9]), "\u{201C}q\u{201D}é");
        assert_eq!(decode_utf16_text(&[0x48, 0x00, 0x69, 0x00]), "Hi");
        assert_eq!(normalize_breaks("a\rb\u{000B}c"), "a\nb\nc");
    }

    #[test]
    fn test_records_stop_on_overrun() {
        let mut data = atom(0x0001, 0, &[1, 2, 3]);
        // Claims 100 bytes but has 2.
        data.extend_from_slice(&[0x00, 0x00, 0x02, 0x00, 0x64, 0x00, 0x00, 0x00, 0xAA, 0xBB]);

        let mut records = Records::new(&data, 0);
        let first = records.next().unwrap();
        assert_eq!(first.rec_type, 0x0001);
        assert_eq!(first.body, &[1, 2, 3]);
        assert!(records.next().is_none());
        assert!(records.malformed);
    }

    #[test]
    fn test_validate_stream_too_small() {
        let parser = PptParser::new();
        let err = parser.validate_stream(&[0u8; 100]).unwrap_err();
        assert!(matches!(err, Error::CorruptedFile(_)));
    }

    #[test]
    fn test_validate_stream_no_document() {
        let parser = PptParser::new();
        let data = pad(atom(0x0001, 0, &[0u8; 8]));

        let err = parser.validate_stream(&data).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_validate_stream_counts_records() {
        let parser = PptParser::new();
        let validation = parser.validate_stream(&two_slide_stream()).unwrap();

        assert!(validation.has_document);
        assert_eq!(validation.slide_count, 2);
        assert_eq!(validation.text_record_count, 2);
        assert_eq!(validation.malformed_records, 0);
    }

    #[test]
    fn test_validate_stream_caps_nesting_depth() {
        // A Document container wrapping a long chain of nested empty containers.
        let levels = 100_000usize;
        let mut data = Vec::with_capacity(levels * 8);
        for i in 0..levels {
            let rec_type = if i == 0 { record_types::RT_DOCUMENT } else { 0x0001 };
            let rec_len = ((levels - 1 - i) * 8) as u32;
            data.extend_from_slice(&0x000Fu16.to_le_bytes());
            data.extend_from_slice(&rec_type.to_le_bytes());
            data.extend_from_slice(&rec_len.to_le_bytes());
        }

        let parser = PptParser::new();
        let validation = parser.validate_stream(&data).unwrap();
        assert!(validation.has_document);
        assert_eq!(validation.malformed_records, 1);
    }

    #[test]
    fn test_persist_directory_later_entries_win() {
        let first = atom(
            record_types::RT_PERSIST_DIRECTORY_ATOM,
            0,
            &[((1u32 << 20) | 3).to_le_bytes(), 100u32.to_le_bytes()].concat(),
        );
        let second = atom(
            record_types::RT_PERSIST_DIRECTORY_ATOM,
            0,
            &[((1u32 << 20) | 3).to_le_bytes(), 200u32.to_le_bytes()].concat(),
        );
        let data = [first, second].concat();
        let top_level: Vec<_> = Records::new(&data, 0).collect();

        assert_eq!(build_persist_directory(&top_level).get(&3), Some(&200));
    }

    #[test]
    fn test_extract_slides_follows_slide_list() {
        let slides = PptParser::new().extract_slides(&two_slide_stream()).unwrap();

        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].number, 1);
        assert_eq!(
            slides[0].shapes,
            vec![
                Shape::with_text(ShapeType::Placeholder, "Agenda"),
                Shape::with_text(ShapeType::Placeholder, "Budget\nHiring\nplan"),
                Shape::without_text(ShapeType::Line),
            ]
        );
        assert_eq!(slides[1].number, 2);
        assert_eq!(slides[1].shapes, vec![Shape::without_text(ShapeType::Picture)]);
    }

    #[test]
    fn test_extract_slides_stream_order_fallback() {
        let document = container(record_types::RT_DOCUMENT, 0, &[]);
        let textbox = atom(record_types::RT_TEXT_CHARS_ATOM, 0, &utf16("Inline text"));
        let slide = slide_record(vec![
            shape(msospt::TEXT_BOX, 0, false, Some(textbox)),
            shape(1, shape_flags::OLE_SHAPE, false, None),
            container(art_types::SPGR_CONTAINER, 0, &[]),
        ]);
        let data = pad([document, slide].concat());

        let slides = PptParser::new().extract_slides(&data).unwrap();
        assert_eq!(slides.len(), 1);
        assert_eq!(
            slides[0].shapes,
            vec![
                Shape::with_text(ShapeType::TextBox, "Inline text"),
                Shape::without_text(ShapeType::EmbeddedOleObject),
                Shape::without_text(ShapeType::Group),
            ]
        );
    }

    #[test]
    fn test_parse_compound_file() {
        let bytes = cfb_file(&two_slide_stream());
        let presentation = PptParser::new()
            .parse(Cursor::new(bytes), "legacy.ppt")
            .unwrap();

        assert_eq!(presentation.filename, "legacy.ppt");
        assert_eq!(presentation.format, PresentationFormat::Ppt);
        assert_eq!(presentation.slides.len(), 2);
    }

    #[test]
    fn test_parse_missing_document_stream() {
        let mut cfb = CompoundFile::create(Cursor::new(Vec::new())).unwrap();
        {
            let mut s = cfb.create_stream("/WordDocument").unwrap();
            s.write_all(&[0u8; 16]).unwrap();
            s.flush().unwrap();
        }
        cfb.flush().unwrap();
        let bytes = cfb.into_inner().into_inner();

        let err = PptParser::new().parse(Cursor::new(bytes), "doc.ppt").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_parse_not_a_compound_file() {
        let err = PptParser::new()
            .parse(Cursor::new(b"plain text".to_vec()), "fake.ppt")
            .unwrap_err();
        assert!(matches!(err, Error::CfbError(_)));
    }
}
