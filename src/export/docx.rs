//! Minimal DOCX (WordprocessingML) exporter: one run of plain text per paragraph.

use std::io::{Seek, Write};

use super::{Exporter, paragraphs};
use crate::archive::ArchiveWriter;
use crate::book::Book;
use crate::error::Result;
use crate::util::escape_xml;

#[derive(Debug, Clone, Copy, Default)]
pub struct DocxExporter;

impl DocxExporter {
    pub fn new() -> Self {
        Self
    }
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
  <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
</Types>"#;

const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
</Relationships>"#;

impl Exporter for DocxExporter {
    fn export<W: Write + Seek>(&self, book: &Book, writer: &mut W) -> Result<()> {
        let mut zip = ArchiveWriter::new(writer, Some(6));
        zip.add("[Content_Types].xml", CONTENT_TYPES.as_bytes())?;
        zip.add("_rels/.rels", RELS.as_bytes())?;
        zip.add("docProps/core.xml", core_properties(book).as_bytes())?;
        zip.add("word/document.xml", document_xml(book).as_bytes())?;
        zip.finish()?;
        Ok(())
    }
}

fn document_xml(book: &Book) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:body>
"#,
    );

    for paragraph in paragraphs(book) {
        xml.push_str("<w:p><w:r>");
        for (i, line) in paragraph.split('\n').enumerate() {
            if i > 0 {
                xml.push_str("<w:br/>");
            }
            xml.push_str("<w:t xml:space=\"preserve\">");
            xml.push_str(&escape_xml(line));
            xml.push_str("</w:t>");
        }
        xml.push_str("</w:r></w:p>\n");
    }

    xml.push_str("<w:sectPr/>\n</w:body>\n</w:document>\n");
    xml
}

fn core_properties(book: &Book) -> String {
    let creator = book
        .author
        .as_deref()
        .map(|a| format!("<dc:creator>{}</dc:creator>", escape_xml(a)))
        .unwrap_or_default();
    let language = escape_xml(book.language.as_deref().unwrap_or("en"));

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/">
<dc:title>{}</dc:title>{creator}<dc:language>{language}</dc:language>
</cp:coreProperties>"#,
        escape_xml(book.display_title())
    )
}
