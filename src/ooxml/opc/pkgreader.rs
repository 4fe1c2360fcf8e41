//! Low-level, read-only API to a serialized Open Packaging Convention (OPC) package.
//!
//! This module provides the PackageReader for parsing OPC packages: content
//! type mapping, relationship parsing, and a walk of the relationship graph
//! that yields every reachable part exactly once.

use crate::ooxml::opc::constants::target_mode;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::{PACKAGE_URI, PackURI};
use crate::ooxml::opc::phys_pkg::PhysPkgReader;
use quick_xml::Reader;
use quick_xml::events::Event;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Serialized part with its content and relationships.
///
/// Represents a part as loaded from the physical package, before
/// being converted into a Part object.
#[derive(Debug)]
pub struct SerializedPart {
    /// The partname (URI) of this part
    pub partname: PackURI,

    /// The content type of this part
    pub content_type: String,

    /// The relationship type that first reached this part
    pub reltype: String,

    /// The binary content of this part
    pub blob: Vec<u8>,

    /// Serialized relationships from this part
    pub srels: SmallVec<[SerializedRelationship; 8]>,
}

/// Serialized relationship as read from a .rels file.
///
/// Contains all relationship information in string form, before
/// being converted into Relationship objects with resolved part references.
#[derive(Debug, Clone)]
pub struct SerializedRelationship {
    /// Base URI for resolving relative references
    pub base_uri: String,

    /// Relationship ID (e.g., "rId1")
    pub r_id: String,

    /// Relationship type URI
    pub reltype: String,

    /// Target reference (relative URI or external URL)
    pub target_ref: String,

    /// Target mode (Internal or External)
    pub target_mode: String,
}

impl SerializedRelationship {
    /// Check if this is an external relationship.
    #[inline]
    pub fn is_external(&self) -> bool {
        self.target_mode == target_mode::EXTERNAL
    }

    /// Get the target partname for internal relationships.
    ///
    /// Resolves the relative target reference against the base URI
    /// to produce an absolute PackURI.
    pub fn target_partname(&self) -> Result<PackURI> {
        if self.is_external() {
            return Err(OpcError::InvalidRelationship(
                "Cannot get target_partname for external relationship".to_string(),
            ));
        }
        PackURI::from_rel_ref(&self.base_uri, &self.target_ref)
    }
}

/// Content type map for looking up content types by part name or extension.
///
/// Implements the OPC content type discovery algorithm using Default and Override
/// elements from [Content_Types].xml. Both lookups ignore ASCII case.
#[derive(Debug, Default)]
pub struct ContentTypeMap {
    /// Maps lowercase file extensions to default content types
    defaults: HashMap<String, String>,

    /// Maps lowercase partnames to override content types
    overrides: HashMap<String, String>,
}

impl ContentTypeMap {
    /// Parse content types from [Content_Types].xml.
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut map = Self::default();
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let kind = match e.local_name().as_ref() {
                        b"Default" => Some((b"Extension".as_slice(), true)),
                        b"Override" => Some((b"PartName".as_slice(), false)),
                        _ => None,
                    };

                    if let Some((key_attr, is_default)) = kind {
                        let mut key = None;
                        let mut content_type = None;
                        for attr in e.attributes() {
                            let attr = attr?;
                            let name = attr.key.as_ref();
                            if name == key_attr {
                                key = Some(attr.unescape_value()?.to_string());
                            } else if name == b"ContentType" {
                                content_type = Some(attr.unescape_value()?.to_string());
                            }
                        }

                        if let (Some(key), Some(ct)) = (key, content_type) {
                            if is_default {
                                map.add_default(&key, ct);
                            } else {
                                map.add_override(&key, ct);
                            }
                        }
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(OpcError::XmlError(format!(
                        "Content types parse error: {}",
                        e
                    )));
                },
                _ => {},
            }
            buf.clear();
        }

        Ok(map)
    }

    /// Add a default content type mapping for a file extension.
    pub fn add_default(&mut self, extension: &str, content_type: String) {
        self.defaults
            .insert(extension.to_ascii_lowercase(), content_type);
    }

    /// Add an override content type mapping for a specific partname.
    pub fn add_override(&mut self, partname: &str, content_type: String) {
        self.overrides
            .insert(partname.to_ascii_lowercase(), content_type);
    }

    /// Get the content type for a partname.
    ///
    /// First checks for an override, then falls back to the default
    /// based on file extension.
    pub fn get(&self, pack_uri: &PackURI) -> Result<&str> {
        if let Some(ct) = self.overrides.get(&pack_uri.as_str().to_ascii_lowercase()) {
            return Ok(ct);
        }

        if let Some(ct) = self.defaults.get(&pack_uri.ext().to_ascii_lowercase()) {
            return Ok(ct);
        }

        Err(OpcError::ContentTypeNotFound(pack_uri.to_string()))
    }
}

/// Package reader that provides access to serialized parts and relationships.
///
/// Walks the relationship graph from the package relationships and collects
/// every internal target. Members that no relationship reaches are not loaded.
pub struct PackageReader {
    /// Package-level relationships
    pkg_srels: SmallVec<[SerializedRelationship; 8]>,

    /// All serialized parts in the package
    sparts: Vec<SerializedPart>,
}

impl PackageReader {
    /// Read content types, package relationships and every reachable part.
    ///
    /// # Errors
    /// [`OpcError::DanglingRelationship`] if a relationship targets a member
    /// that is not in the package.
    pub fn from_phys_reader(phys_reader: &PhysPkgReader) -> Result<Self> {
        let content_types = ContentTypeMap::from_xml(&phys_reader.content_types_xml()?)?;

        let package_uri = PackURI::new(PACKAGE_URI)?;
        let pkg_srels = Self::load_rels(phys_reader, &package_uri)?;

        let sparts = Self::load_parts(phys_reader, &package_uri, &pkg_srels, &content_types)?;
        debug!(parts = sparts.len(), package_rels = pkg_srels.len(), "package read");

        Ok(Self { pkg_srels, sparts })
    }

    /// Load the relationships of `source_uri`, if it has a .rels member.
    fn load_rels(
        phys_reader: &PhysPkgReader,
        source_uri: &PackURI,
    ) -> Result<SmallVec<[SerializedRelationship; 8]>> {
        match phys_reader.rels_xml_for(source_uri)? {
            Some(xml) => Self::parse_rels_xml(&xml, source_uri.base_uri()),
            None => Ok(SmallVec::new()),
        }
    }

    /// Parse relationships XML into SerializedRelationship structs.
    pub fn parse_rels_xml(
        rels_xml: &[u8],
        base_uri: &str,
    ) -> Result<SmallVec<[SerializedRelationship; 8]>> {
        let mut srels = SmallVec::new();
        let mut reader = Reader::from_reader(rels_xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    if e.local_name().as_ref() == b"Relationship" {
                        let mut r_id = None;
                        let mut reltype = None;
                        let mut target_ref = None;
                        let mut target_mode = target_mode::INTERNAL.to_string();

                        for attr in e.attributes() {
                            let attr = attr?;
                            match attr.key.as_ref() {
                                b"Id" => r_id = Some(attr.unescape_value()?.to_string()),
                                b"Type" => reltype = Some(attr.unescape_value()?.to_string()),
                                b"Target" => target_ref = Some(attr.unescape_value()?.to_string()),
                                b"TargetMode" => target_mode = attr.unescape_value()?.to_string(),
                                _ => {},
                            }
                        }

                        match (r_id, reltype, target_ref) {
                            (Some(id), Some(rt), Some(tr)) => srels.push(SerializedRelationship {
                                base_uri: base_uri.to_string(),
                                r_id: id,
                                reltype: rt,
                                target_ref: tr,
                                target_mode,
                            }),
                            _ => {
                                return Err(OpcError::InvalidRelationship(format!(
                                    "Relationship under {} lacks Id, Type or Target",
                                    base_uri
                                )));
                            },
                        }
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(OpcError::XmlError(format!("Rels parse error: {}", e))),
                _ => {},
            }
            buf.clear();
        }

        Ok(srels)
    }

    /// Walk the relationship graph and load every internal target once.
    fn load_parts(
        phys_reader: &PhysPkgReader,
        package_uri: &PackURI,
        pkg_srels: &[SerializedRelationship],
        content_types: &ContentTypeMap,
    ) -> Result<Vec<SerializedPart>> {
        let mut sparts = Vec::with_capacity(32);
        let mut visited: HashSet<PackURI> = HashSet::with_capacity(32);
        // (target, reltype, source, rId) in discovery order
        let mut work_queue: Vec<(PackURI, String, PackURI, String)> = Vec::new();

        Self::enqueue(package_uri, pkg_srels, &mut visited, &mut work_queue)?;

        let mut next = 0;
        while next < work_queue.len() {
            let (partname, reltype, source, r_id) = work_queue[next].clone();
            next += 1;

            let blob = match phys_reader.blob_for(&partname) {
                Ok(blob) => blob,
                Err(OpcError::PartNotFound(_)) => {
                    return Err(OpcError::DanglingRelationship {
                        source_uri: source.to_string(),
                        r_id,
                        target: partname.to_string(),
                    });
                },
                Err(e) => return Err(e),
            };
            let content_type = content_types.get(&partname)?.to_string();
            let srels = Self::load_rels(phys_reader, &partname)?;
            trace!(%partname, content_type = %content_type, rels = srels.len(), "read part");

            Self::enqueue(&partname, &srels, &mut visited, &mut work_queue)?;

            sparts.push(SerializedPart {
                partname,
                content_type,
                reltype,
                blob,
                srels,
            });
        }

        Ok(sparts)
    }

    fn enqueue(
        source: &PackURI,
        srels: &[SerializedRelationship],
        visited: &mut HashSet<PackURI>,
        work_queue: &mut Vec<(PackURI, String, PackURI, String)>,
    ) -> Result<()> {
        for srel in srels.iter().filter(|srel| !srel.is_external()) {
            let target = srel.target_partname()?;
            if visited.insert(target.clone()) {
                work_queue.push((target, srel.reltype.clone(), source.clone(), srel.r_id.clone()));
            }
        }
        Ok(())
    }

    /// Get an iterator over all serialized parts.
    pub fn iter_sparts(&self) -> impl Iterator<Item = &SerializedPart> {
        self.sparts.iter()
    }

    /// Get package-level relationships.
    pub fn pkg_srels(&self) -> &[SerializedRelationship] {
        &self.pkg_srels
    }

    /// Take ownership of package-level relationships.
    pub fn take_pkg_srels(&mut self) -> SmallVec<[SerializedRelationship; 8]> {
        std::mem::take(&mut self.pkg_srels)
    }

    /// Take ownership of all serialized parts.
    pub fn take_sparts(&mut self) -> Vec<SerializedPart> {
        std::mem::take(&mut self.sparts)
    }
}
