//! In-memory OOXML package with part replacement and save-as.

use crate::relationships::{parse_relationships, Relationship};
use pptrans_core::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// An OOXML package (a ZIP archive of XML parts) held in memory.
///
/// Parts are read from the original archive on demand. Replaced parts are
/// kept aside and only written out by [`Package::save_as`]; the source file
/// is read once on open and never written.
pub struct Package {
    archive: ZipArchive<Cursor<Vec<u8>>>,
    replaced: BTreeMap<String, Vec<u8>>,
}

impl Package {
    /// Open a package from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(bytes)
    }

    /// Open a package from raw archive bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        Ok(Self {
            archive,
            replaced: BTreeMap::new(),
        })
    }

    /// Read a part as UTF-8, seeing replacements made so far.
    pub fn read_part(&mut self, name: &str) -> Result<String> {
        if let Some(bytes) = self.replaced.get(name) {
            return String::from_utf8(bytes.clone())
                .map_err(|e| Error::CorruptedFile(format!("'{}' is not UTF-8: {}", name, e)));
        }

        let mut file = self
            .archive
            .by_name(name)
            .map_err(|_| Error::MissingPart(name.to_string()))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", name, e)))?;

        Ok(content)
    }

    /// Read a part if present.
    pub fn read_optional_part(&mut self, name: &str) -> Result<Option<String>> {
        match self.read_part(name) {
            Ok(content) => Ok(Some(content)),
            Err(Error::MissingPart(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Relationships of a part, e.g. `ppt/presentation.xml`. Missing
    /// relationship parts yield an empty list.
    pub fn relationships(&mut self, part: &str) -> Result<Vec<Relationship>> {
        let rels_name = rels_part_name(part);
        match self.read_optional_part(&rels_name)? {
            Some(xml) => parse_relationships(&xml, part),
            None => Ok(Vec::new()),
        }
    }

    /// Replace (or add) a part. Takes effect on save.
    pub fn replace_part(&mut self, name: &str, content: impl Into<Vec<u8>>) {
        self.replaced.insert(name.to_string(), content.into());
    }

    /// Write the package to `path` atomically.
    ///
    /// The archive is written to a temporary file beside `path` and renamed
    /// into place, so a failure leaves no partial output.
    pub fn save_as(&mut self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        self.write_to(temp.as_file_mut())?;
        temp.persist(path).map_err(|e| Error::IoError(e.error))?;

        log::debug!("wrote {} ({} parts replaced)", path.display(), self.replaced.len());
        Ok(())
    }

    /// Write the package archive to any seekable writer.
    pub fn write_to<W: Write + Seek>(&mut self, out: W) -> Result<()> {
        let mut writer = ZipWriter::new(out);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for index in 0..self.archive.len() {
            let file = self
                .archive
                .by_index_raw(index)
                .map_err(|e| Error::ZipError(e.to_string()))?;

            if self.replaced.contains_key(file.name()) {
                continue;
            }

            writer
                .raw_copy_file(file)
                .map_err(|e| Error::ZipError(e.to_string()))?;
        }

        for (name, bytes) in &self.replaced {
            writer
                .start_file(name.as_str(), options)
                .map_err(|e| Error::ZipError(e.to_string()))?;
            writer.write_all(bytes)?;
        }

        writer.finish().map_err(|e| Error::ZipError(e.to_string()))?;
        Ok(())
    }
}

/// Name of the relationships part for `part`, e.g.
/// `ppt/slides/slide1.xml` → `ppt/slides/_rels/slide1.xml.rels`.
pub fn rels_part_name(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}
