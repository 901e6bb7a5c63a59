//! Read and write named entries of ZIP containers (EPUB, CBZ, HTMLZ, TXTZ, DOCX).

use std::io::{Cursor, Read, Seek, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::Result;
use crate::href;

/// An in-memory ZIP archive opened for reading.
pub struct Archive<'a> {
    zip: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> Archive<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        Ok(Self {
            zip: ZipArchive::new(Cursor::new(data))?,
        })
    }

    /// Names of all file entries (directories excluded), in archive order.
    pub fn names(&self) -> Vec<String> {
        self.zip
            .file_names()
            .filter(|n| !n.ends_with('/'))
            .map(str::to_string)
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.zip.index_for_name(name).is_some()
    }

    /// Read an entry's bytes.
    ///
    /// When `name` is missing as written, the percent-decoded form is tried,
    /// since manifests often escape spaces in hrefs.
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        let decoded = href::decode(name);
        let name = if !self.contains(name) && self.contains(&decoded) {
            decoded.as_ref()
        } else {
            name
        };

        let mut file = self.zip.by_name(name)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Read an entry as text, detecting its encoding.
    pub fn read_string(&mut self, name: &str) -> Result<String> {
        let data = self.read(name)?;
        let hint = crate::util::extract_xml_encoding(&data);
        Ok(crate::util::decode_text(&data, hint).into_owned())
    }

    /// Find the first entry whose name satisfies `predicate`.
    pub fn find<P>(&self, predicate: P) -> Option<String>
    where
        P: Fn(&str) -> bool,
    {
        self.zip
            .file_names()
            .find(|n| !n.ends_with('/') && predicate(n))
            .map(str::to_string)
    }
}

/// Writes entries into a ZIP container.
pub struct ArchiveWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    stored: SimpleFileOptions,
    deflated: SimpleFileOptions,
}

impl<W: Write + Seek> ArchiveWriter<W> {
    pub fn new(writer: W, compression_level: Option<i64>) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            stored: SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
            deflated: SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(compression_level),
        }
    }

    /// Add an uncompressed entry (EPUB `mimetype`).
    pub fn add_stored(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.zip.start_file(name, self.stored)?;
        self.zip.write_all(data)?;
        Ok(())
    }

    pub fn add(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.zip.start_file(name, self.deflated)?;
        self.zip.write_all(data)?;
        Ok(())
    }

    pub fn finish(self) -> Result<W> {
        Ok(self.zip.finish()?)
    }
}
