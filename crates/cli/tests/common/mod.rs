#![allow(dead_code)]

use slidescan_core::keyphrase::USER_PROMPT_PREFIX;
use slidescan_core::{CompletionProvider, CompletionRequest, ProviderError};
use std::cell::Cell;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::ZipArchive;

const SLIDE_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";

/// Slide with a title placeholder holding `text`.
pub fn text_slide(text: &str) -> String {
    slide_xml(&format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:rPr lang="en-US"/><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>"#,
        text
    ))
}

/// Slide whose only shape is an empty picture placeholder.
pub fn picture_placeholder_slide() -> String {
    slide_xml(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="Picture Placeholder 2"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="pic" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#,
    )
}

fn slide_xml(shapes: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld></p:sld>"#,
        shapes
    )
}

/// Write a minimal PPTX at `path` with the given slide parts, in order.
pub fn write_pptx(path: &Path, slides: &[String]) {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buffer);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let mut overrides = String::new();
        let mut rels = String::new();
        let mut ids = String::new();
        for i in 1..=slides.len() {
            overrides.push_str(&format!(
                r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
                i
            ));
            rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="{}" Target="slides/slide{}.xml"/>"#,
                i, SLIDE_REL, i
            ));
            ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + i, i));
        }

        zip.start_file("[Content_Types].xml", options).unwrap();
        write!(
            zip,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>{}</Types>"#,
            overrides
        )
        .unwrap();

        zip.start_file("_rels/.rels", options).unwrap();
        zip.write_all(br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#).unwrap();

        zip.start_file("ppt/presentation.xml", options).unwrap();
        write!(
            zip,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:sldIdLst>{}</p:sldIdLst></p:presentation>"#,
            ids
        )
        .unwrap();

        zip.start_file("ppt/_rels/presentation.xml.rels", options).unwrap();
        write!(
            zip,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
            rels
        )
        .unwrap();

        for (i, slide) in slides.iter().enumerate() {
            zip.start_file(format!("ppt/slides/slide{}.xml", i + 1), options)
                .unwrap();
            zip.write_all(slide.as_bytes()).unwrap();
        }

        zip.finish().unwrap();
    }
    fs::write(path, buffer.into_inner()).unwrap();
}

/// Read one part of a ZIP package from disk.
pub fn read_zip_part(path: &Path, name: &str) -> String {
    let bytes = fs::read(path).unwrap();
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    content
}

/// Echoes the first 12 words of the slide text; can fail with a fixed message.
pub struct EchoProvider {
    pub calls: Cell<usize>,
    failure: Option<String>,
}

impl EchoProvider {
    pub fn new() -> Self {
        Self {
            calls: Cell::new(0),
            failure: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            calls: Cell::new(0),
            failure: Some(message.to_string()),
        }
    }
}

impl CompletionProvider for EchoProvider {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.calls.set(self.calls.get() + 1);
        if let Some(message) = &self.failure {
            return Err(ProviderError::from_message(message.clone()));
        }

        let text = request
            .user_content()
            .unwrap_or_default()
            .trim_start_matches(USER_PROMPT_PREFIX);
        Ok(text.split_whitespace().take(12).collect::<Vec<_>>().join(" "))
    }
}
