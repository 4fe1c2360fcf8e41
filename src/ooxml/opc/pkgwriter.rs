//! Package writer for OPC packages.
//!
//! This module serializes an in-memory package: it regenerates
//! [Content_Types].xml and every .rels member from the live part graph, builds
//! the whole archive in memory, and only then replaces the target file.

use crate::common::xml::escape_xml;
use crate::ooxml::opc::constants::content_type as ct;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::graph::PartGraph;
use crate::ooxml::opc::package::{OpcPackage, SaveOptions};
use crate::ooxml::opc::packuri::{CONTENT_TYPES_URI, PACKAGE_URI, PackURI};
use crate::ooxml::opc::phys_pkg::PhysPkgWriter;
use crate::ooxml::opc::rel::Relationships;
use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Package writer that serializes an OPC package to a ZIP archive.
///
/// Writes, in order:
/// - [Content_Types].xml
/// - _rels/.rels (package relationships)
/// - every part, each followed by its relationships
pub struct PackageWriter;

impl PackageWriter {
    /// Write an OPC package to a file.
    ///
    /// The archive is built in memory and written to a temporary file in the
    /// target directory, which then replaces `path` in one rename. A failure
    /// leaves any existing file at `path` untouched.
    pub fn write<P: AsRef<Path>>(path: P, package: &OpcPackage, options: &SaveOptions) -> Result<()> {
        let path = path.as_ref();
        let bytes = Self::to_bytes(package, options)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;

        debug!(path = %path.display(), bytes = bytes.len(), "package saved");
        Ok(())
    }

    /// Write an OPC package to a stream.
    pub fn write_to_stream<W: Write>(mut writer: W, package: &OpcPackage, options: &SaveOptions) -> Result<()> {
        let bytes = Self::to_bytes(package, options)?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// Serialize an OPC package to bytes.
    pub fn to_bytes(package: &OpcPackage, options: &SaveOptions) -> Result<Vec<u8>> {
        Self::check_partnames(package.graph())?;
        let mut phys_writer = PhysPkgWriter::new(options.compression.method());

        Self::write_content_types(&mut phys_writer, package.graph())?;
        Self::write_pkg_rels(&mut phys_writer, package.rels(), package.graph())?;
        Self::write_parts(&mut phys_writer, package.graph())?;

        phys_writer.finish()
    }

    /// Every part must have its own partname.
    fn check_partnames(graph: &PartGraph) -> Result<()> {
        let mut seen = HashSet::with_capacity(graph.len());
        for (_, part) in graph.iter() {
            if !seen.insert(part.partname().as_str()) {
                return Err(OpcError::DuplicatePartname(part.partname().to_string()));
            }
        }
        Ok(())
    }

    /// Write the [Content_Types].xml member.
    fn write_content_types(phys_writer: &mut PhysPkgWriter, graph: &PartGraph) -> Result<()> {
        let cti = ContentTypesItem::from_graph(graph);
        let content_types_uri = PackURI::new(CONTENT_TYPES_URI)?;
        phys_writer.write(&content_types_uri, cti.to_xml().as_bytes())
    }

    /// Write package-level relationships.
    fn write_pkg_rels(phys_writer: &mut PhysPkgWriter, rels: &Relationships, graph: &PartGraph) -> Result<()> {
        let package_uri = PackURI::new(PACKAGE_URI)?;
        let rels_xml = rels.to_xml(package_uri.base_uri(), |id| graph.partname_of(id))?;
        phys_writer.write(&package_uri.rels_uri()?, rels_xml.as_bytes())
    }

    /// Write all parts and their relationships.
    fn write_parts(phys_writer: &mut PhysPkgWriter, graph: &PartGraph) -> Result<()> {
        for (_, part) in graph.iter() {
            phys_writer.write(part.partname(), &part.blob()?)?;

            if !part.rels().is_empty() {
                let rels_xml = part
                    .rels()
                    .to_xml(part.partname().base_uri(), |id| graph.partname_of(id))?;
                phys_writer.write(&part.partname().rels_uri()?, rels_xml.as_bytes())?;
            }
        }

        Ok(())
    }
}

/// Helper for building [Content_Types].xml content.
///
/// Manages Default and Override elements for content type mapping. Both maps
/// are ordered so the output is deterministic.
#[derive(Debug)]
pub struct ContentTypesItem {
    /// Default content types by extension
    defaults: BTreeMap<String, String>,

    /// Override content types by partname
    overrides: BTreeMap<String, String>,
}

impl ContentTypesItem {
    /// Create an item holding only the `rels` and `xml` defaults.
    pub fn new() -> Self {
        let mut defaults = BTreeMap::new();
        defaults.insert("rels".to_string(), ct::OPC_RELATIONSHIPS.to_string());
        defaults.insert("xml".to_string(), ct::XML.to_string());

        Self {
            defaults,
            overrides: BTreeMap::new(),
        }
    }

    /// Build the item from every part in the graph.
    pub fn from_graph(graph: &PartGraph) -> Self {
        let mut cti = Self::new();
        for (_, part) in graph.iter() {
            cti.add_content_type(part.partname(), part.content_type());
        }
        cti
    }

    /// Add a content type for a part.
    ///
    /// Uses a default mapping if the extension matches a well-known type,
    /// otherwise uses an override for the specific partname.
    pub fn add_content_type(&mut self, partname: &PackURI, content_type: &str) {
        let ext = partname.ext().to_ascii_lowercase();

        if Self::is_default_content_type(&ext, content_type) {
            self.defaults.insert(ext, content_type.to_string());
        } else {
            self.overrides
                .insert(partname.to_string(), content_type.to_string());
        }
    }

    /// Check if an extension/content-type pair is a standard default.
    fn is_default_content_type(ext: &str, content_type: &str) -> bool {
        matches!(
            (ext, content_type),
            ("rels", ct::OPC_RELATIONSHIPS)
                | ("xml", ct::XML)
                | ("png", ct::PNG)
                | ("jpg", ct::JPEG)
                | ("jpeg", ct::JPEG)
                | ("gif", ct::GIF)
                | ("bmp", ct::BMP)
                | ("tif", ct::TIFF)
                | ("tiff", ct::TIFF)
                | ("emf", ct::X_EMF)
                | ("wmf", ct::X_WMF)
        )
    }

    /// Generate the XML for [Content_Types].xml.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(4096);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        );
        xml.push('\n');

        for (ext, content_type) in &self.defaults {
            xml.push_str(&format!(
                r#"  <Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(ext),
                escape_xml(content_type)
            ));
            xml.push('\n');
        }

        for (partname, content_type) in &self.overrides {
            xml.push_str(&format!(
                r#"  <Override PartName="{}" ContentType="{}"/>"#,
                escape_xml(partname),
                escape_xml(content_type)
            ));
            xml.push('\n');
        }

        xml.push_str("</Types>");

        xml
    }
}

impl Default for ContentTypesItem {
    fn default() -> Self {
        Self::new()
    }
}
