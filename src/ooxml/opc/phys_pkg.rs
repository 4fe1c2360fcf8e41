//! Provides a general interface to a physical OPC package.
//!
//! A package is normally a ZIP archive, but an archive that has been extracted
//! to a directory can be read as well. Writing always produces a ZIP archive,
//! built entirely in memory.

use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::{CONTENT_TYPES_URI, PackURI};
use std::cell::RefCell;
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Where the members of a package come from.
enum Source {
    /// A ZIP archive held in memory
    Zip(RefCell<ZipArchive<Cursor<Vec<u8>>>>),
    /// An extracted package rooted at a directory
    Dir(PathBuf),
}

/// Physical package reader that provides access to the members of a package.
pub struct PhysPkgReader {
    source: Source,
}

impl PhysPkgReader {
    /// Open a package from a ZIP file or an extracted package directory.
    ///
    /// # Errors
    /// Returns [`OpcError::PackageNotFound`] if the path does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(OpcError::PackageNotFound(path.display().to_string()));
        }
        if path.is_dir() {
            return Ok(Self {
                source: Source::Dir(path.to_path_buf()),
            });
        }

        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Create a reader over a ZIP archive held in memory.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(data))?;
        Ok(Self {
            source: Source::Zip(RefCell::new(archive)),
        })
    }

    /// Create a reader by reading a whole ZIP archive from `reader`.
    pub fn from_reader<R: Read + Seek>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(data)
    }

    /// Get the binary content for a part by its PackURI.
    pub fn blob_for(&self, pack_uri: &PackURI) -> Result<Vec<u8>> {
        let membername = pack_uri.membername();

        match &self.source {
            Source::Zip(archive) => {
                let mut archive = archive.borrow_mut();
                let mut file = archive
                    .by_name(membername)
                    .map_err(|_| OpcError::PartNotFound(pack_uri.to_string()))?;
                let mut data = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut data)?;
                Ok(data)
            },
            Source::Dir(root) => match std::fs::read(root.join(membername)) {
                Ok(data) => Ok(data),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(OpcError::PartNotFound(pack_uri.to_string()))
                },
                Err(e) => Err(e.into()),
            },
        }
    }

    /// Get the [Content_Types].xml content.
    ///
    /// This is a required part of every OPC package that maps parts to content types.
    pub fn content_types_xml(&self) -> Result<Vec<u8>> {
        let content_types_uri = PackURI::new(CONTENT_TYPES_URI)?;
        self.blob_for(&content_types_uri).map_err(|e| match e {
            OpcError::PartNotFound(_) => OpcError::ContentTypeNotFound(
                "package has no [Content_Types].xml".to_string(),
            ),
            other => other,
        })
    }

    /// Get the relationships XML for a specific source URI.
    ///
    /// Returns None if the source has no relationships file.
    pub fn rels_xml_for(&self, source_uri: &PackURI) -> Result<Option<Vec<u8>>> {
        let rels_uri = source_uri.rels_uri()?;

        match self.blob_for(&rels_uri) {
            Ok(blob) => Ok(Some(blob)),
            Err(OpcError::PartNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Whether the package was read from a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self.source, Source::Dir(_))
    }
}

/// Writes package members into an in-memory ZIP archive.
pub struct PhysPkgWriter {
    zip_writer: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
}

impl PhysPkgWriter {
    /// Create a writer using `compression` for every member.
    pub fn new(compression: CompressionMethod) -> Self {
        Self {
            zip_writer: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(compression),
        }
    }

    /// Write `blob` as the member for `pack_uri`.
    pub fn write(&mut self, pack_uri: &PackURI, blob: &[u8]) -> Result<()> {
        self.zip_writer
            .start_file(pack_uri.membername(), self.options)?;
        self.zip_writer.write_all(blob)?;
        Ok(())
    }

    /// Finish the archive and return its bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        Ok(self.zip_writer.finish()?.into_inner())
    }
}
