//! Single-sheet XLSX writer.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use slidescan_core::{Error, Result, SlideRecord};
use std::fs::File;
use std::io::{Cursor, Seek, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Name of the only worksheet.
pub const SHEET_NAME: &str = "Sheet1";

/// Header row, in column order.
pub const COLUMN_HEADERS: [&str; 3] = ["Filename", "Slide Number", "Key Phrase"];

/// Display width of each column, in character units.
pub const COLUMN_WIDTHS: [u32; 3] = [30, 15, 30];

/// Style index of the bold header cells in `xl/styles.xml`.
const HEADER_STYLE: &str = "1";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/><family val="2"/></font><font><b/><sz val="11"/><name val="Calibri"/><family val="2"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

const SHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Writes slide records as a one-sheet workbook.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportWriter;

impl ReportWriter {
    /// Create a new writer.
    pub fn new() -> Self {
        Self
    }

    /// Create or overwrite the workbook at `path`.
    pub fn write(&self, records: &[SlideRecord], path: &Path) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(records, file)?;
        log::info!("Wrote {} row(s) to {}", records.len(), path.display());
        Ok(())
    }

    /// Write the workbook into any seekable sink and hand the sink back.
    pub fn write_to<W: Write + Seek>(&self, records: &[SlideRecord], sink: W) -> Result<W> {
        let mut zip = ZipWriter::new(sink);
        // Fixed timestamp keeps identical input byte-identical.
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        let parts: [(&str, Vec<u8>); 6] = [
            ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes().to_vec()),
            ("_rels/.rels", ROOT_RELS_XML.as_bytes().to_vec()),
            ("xl/workbook.xml", workbook_xml()?),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML.as_bytes().to_vec()),
            ("xl/styles.xml", STYLES_XML.as_bytes().to_vec()),
            ("xl/worksheets/sheet1.xml", worksheet_xml(records)?),
        ];

        for (name, content) in parts {
            zip.start_file(name, options)
                .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", name, e)))?;
            zip.write_all(&content)?;
        }

        zip.finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish workbook: {}", e)))
    }
}

fn xml_error(e: quick_xml::Error) -> Error {
    Error::XmlError(e.to_string())
}

fn declaration<W: Write>(writer: &mut Writer<W>) -> Result<()> {
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(xml_error)
}

fn workbook_xml() -> Result<Vec<u8>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    declaration(&mut writer)?;

    let mut root = BytesStart::new("workbook");
    root.push_attribute(("xmlns", SHEET_NS));
    root.push_attribute(("xmlns:r", REL_NS));
    writer.write_event(Event::Start(root)).map_err(xml_error)?;
    writer.write_event(Event::Start(BytesStart::new("sheets"))).map_err(xml_error)?;

    let mut sheet = BytesStart::new("sheet");
    sheet.push_attribute(("name", SHEET_NAME));
    sheet.push_attribute(("sheetId", "1"));
    sheet.push_attribute(("r:id", "rId1"));
    writer.write_event(Event::Empty(sheet)).map_err(xml_error)?;

    writer.write_event(Event::End(BytesEnd::new("sheets"))).map_err(xml_error)?;
    writer.write_event(Event::End(BytesEnd::new("workbook"))).map_err(xml_error)?;

    Ok(writer.into_inner().into_inner())
}

/// One cell value.
enum Cell<'a> {
    Text(&'a str),
    Number(usize),
}

/// Build `xl/worksheets/sheet1.xml`: header row, then one row per record.
fn worksheet_xml(records: &[SlideRecord]) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    declaration(&mut writer)?;

    let mut root = BytesStart::new("worksheet");
    root.push_attribute(("xmlns", SHEET_NS));
    writer.write_event(Event::Start(root)).map_err(xml_error)?;

    writer.write_event(Event::Start(BytesStart::new("cols"))).map_err(xml_error)?;
    for (idx, width) in COLUMN_WIDTHS.iter().enumerate() {
        let col = (idx + 1).to_string();
        let width = width.to_string();
        let mut element = BytesStart::new("col");
        element.push_attribute(("min", col.as_str()));
        element.push_attribute(("max", col.as_str()));
        element.push_attribute(("width", width.as_str()));
        element.push_attribute(("customWidth", "1"));
        writer.write_event(Event::Empty(element)).map_err(xml_error)?;
    }
    writer.write_event(Event::End(BytesEnd::new("cols"))).map_err(xml_error)?;

    writer.write_event(Event::Start(BytesStart::new("sheetData"))).map_err(xml_error)?;

    let header: Vec<Cell<'_>> = COLUMN_HEADERS.iter().map(|h| Cell::Text(h)).collect();
    write_row(&mut writer, 1, &header, Some(HEADER_STYLE))?;

    for (idx, record) in records.iter().enumerate() {
        let cells = [
            Cell::Text(&record.source_filename),
            Cell::Number(record.slide_index),
            Cell::Text(&record.key_phrase),
        ];
        write_row(&mut writer, idx + 2, &cells, None)?;
    }

    writer.write_event(Event::End(BytesEnd::new("sheetData"))).map_err(xml_error)?;
    writer.write_event(Event::End(BytesEnd::new("worksheet"))).map_err(xml_error)?;

    Ok(writer.into_inner().into_inner())
}

fn write_row<W: Write>(
    writer: &mut Writer<W>,
    row: usize,
    cells: &[Cell<'_>],
    style: Option<&str>,
) -> Result<()> {
    let row_ref = row.to_string();
    let mut element = BytesStart::new("row");
    element.push_attribute(("r", row_ref.as_str()));
    writer.write_event(Event::Start(element)).map_err(xml_error)?;

    for (col, cell) in cells.iter().enumerate() {
        let cell_ref = format!("{}{}", column_letter(col), row);
        let mut c = BytesStart::new("c");
        c.push_attribute(("r", cell_ref.as_str()));
        if let Some(style) = style {
            c.push_attribute(("s", style));
        }

        match cell {
            Cell::Text(text) => {
                c.push_attribute(("t", "inlineStr"));
                writer.write_event(Event::Start(c)).map_err(xml_error)?;
                writer.write_event(Event::Start(BytesStart::new("is"))).map_err(xml_error)?;

                let mut t = BytesStart::new("t");
                t.push_attribute(("xml:space", "preserve"));
                writer.write_event(Event::Start(t)).map_err(xml_error)?;
                let clean = strip_invalid_xml_chars(text);
                writer
                    .write_event(Event::Text(BytesText::new(&clean)))
                    .map_err(xml_error)?;
                writer.write_event(Event::End(BytesEnd::new("t"))).map_err(xml_error)?;

                writer.write_event(Event::End(BytesEnd::new("is"))).map_err(xml_error)?;
            }
            Cell::Number(value) => {
                writer.write_event(Event::Start(c)).map_err(xml_error)?;
                let value = value.to_string();
                writer.write_event(Event::Start(BytesStart::new("v"))).map_err(xml_error)?;
                writer
                    .write_event(Event::Text(BytesText::new(&value)))
                    .map_err(xml_error)?;
                writer.write_event(Event::End(BytesEnd::new("v"))).map_err(xml_error)?;
            }
        }

        writer.write_event(Event::End(BytesEnd::new("c"))).map_err(xml_error)?;
    }

    writer.write_event(Event::End(BytesEnd::new("row"))).map_err(xml_error)?;
    Ok(())
}

/// Column letter for a zero-based column index (A-Z is all three columns need).
fn column_letter(col: usize) -> char {
    (b'A' + (col % 26) as u8) as char
}

/// Drop characters XML 1.0 cannot carry.
fn strip_invalid_xml_chars(text: &str) -> String {
    text.chars()
        .filter(|&c| {
            matches!(c, '\t' | '\n' | '\r')
                || (c >= '\u{20}' && c != '\u{FFFE}' && c != '\u{FFFF}')
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn records() -> Vec<SlideRecord> {
        vec![
            SlideRecord::new("deck.pptx", 1, "Quarterly revenue grew"),
            SlideRecord::new("deck.pptx", 2, "[Image Slide]"),
            SlideRecord::new("old.ppt", 1, "R&D <budget>\u{0007}"),
        ]
    }

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    fn write_bytes(records: &[SlideRecord]) -> Vec<u8> {
        ReportWriter::new()
            .write_to(records, Cursor::new(Vec::new()))
            .unwrap()
            .into_inner()
    }

    #[test]
    fn test_package_parts() {
        let bytes = write_bytes(&records());
        let archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort();

        assert_eq!(
            names,
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "xl/_rels/workbook.xml.rels",
                "xl/styles.xml",
                "xl/workbook.xml",
                "xl/worksheets/sheet1.xml",
            ]
        );

        let workbook = read_part(&bytes, "xl/workbook.xml");
        assert!(workbook.contains(r#"<sheet name="Sheet1" sheetId="1" r:id="rId1"/>"#));
    }

    #[test]
    fn test_column_widths_and_bold_header() {
        let sheet = read_part(&write_bytes(&[]), "xl/worksheets/sheet1.xml");

        assert!(sheet.contains(r#"<col min="1" max="1" width="30" customWidth="1"/>"#));
        assert!(sheet.contains(r#"<col min="2" max="2" width="15" customWidth="1"/>"#));
        assert!(sheet.contains(r#"<col min="3" max="3" width="30" customWidth="1"/>"#));
        assert!(sheet.contains(
            r#"<c r="A1" s="1" t="inlineStr"><is><t xml:space="preserve">Filename</t></is></c>"#
        ));
        assert!(sheet.contains(r#"<t xml:space="preserve">Slide Number</t>"#));
        assert!(sheet.contains(r#"<t xml:space="preserve">Key Phrase</t>"#));
        assert!(!sheet.contains(r#"<row r="2">"#));

        let styles = read_part(&write_bytes(&[]), "xl/styles.xml");
        assert!(styles.contains(r#"<font><b/>"#));
    }

    #[test]
    fn test_rows_in_input_order() {
        let sheet = read_part(&write_bytes(&records()), "xl/worksheets/sheet1.xml");

        assert!(sheet.contains(
            r#"<row r="2"><c r="A2" t="inlineStr"><is><t xml:space="preserve">deck.pptx</t></is></c><c r="B2"><v>1</v></c><c r="C2" t="inlineStr"><is><t xml:space="preserve">Quarterly revenue grew</t></is></c></row>"#
        ));
        assert!(sheet.contains(r#"<c r="B3"><v>2</v></c>"#));
        assert!(sheet.contains("[Image Slide]"));

        let second = sheet.find(r#"<row r="3">"#).unwrap();
        let third = sheet.find(r#"<row r="4">"#).unwrap();
        assert!(second < third);
    }

    #[test]
    fn test_text_is_escaped_and_cleaned() {
        let sheet = read_part(&write_bytes(&records()), "xl/worksheets/sheet1.xml");
        assert!(sheet.contains("R&amp;D &lt;budget&gt;</t>"));
        assert!(!sheet.contains('\u{0007}'));
    }

    #[test]
    fn test_output_is_deterministic() {
        assert_eq!(write_bytes(&records()), write_bytes(&records()));
    }

    #[test]
    fn test_write_to_path_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ppt_slides.xlsx");
        std::fs::write(&path, b"stale").unwrap();

        ReportWriter::new().write(&records(), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"PK\x03\x04"));
        assert!(read_part(&bytes, "xl/worksheets/sheet1.xml").contains("old.ppt"));
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("ppt_slides.xlsx");

        let err = ReportWriter::new().write(&records(), &path).unwrap_err();
        assert!(matches!(err, Error::IoError(_)));
    }

    #[test]
    fn test_strip_invalid_xml_chars() {
        assert_eq!(strip_invalid_xml_chars("a\u{0000}b\u{001F}c\td\n"), "abc\td\n");
        assert_eq!(strip_invalid_xml_chars("ok \u{FFFF}"), "ok ");
    }
}
