/// Objects that implement reading and writing OPC packages.
///
/// This module provides the main OpcPackage type, which represents an Open Packaging
/// Convention package in memory: the package-level relationships plus the graph of
/// parts. Loading is two-pass: every part is constructed first, then every
/// relationship is resolved to the part it targets.
use crate::ooxml::opc::constants::relationship_type;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::factory::PartFactory;
use crate::ooxml::opc::graph::PartGraph;
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::part::{Part, PartId};
use crate::ooxml::opc::phys_pkg::PhysPkgReader;
use crate::ooxml::opc::pkgreader::{PackageReader, SerializedRelationship};
use crate::ooxml::opc::pkgwriter::PackageWriter;
use crate::ooxml::opc::rel::{RelTarget, Relationships};
use std::collections::HashMap;
use std::io::{Read, Seek, Write};
use std::path::Path;
use tracing::{debug, trace};

/// Options controlling how a package is loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Load parts with unregistered content types as generic parts instead of failing
    pub allow_unknown_content_types: bool,
    /// Rename slides to `slide1.xml, slide2.xml, ...` in presentation order after loading
    pub rename_slides_on_load: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            allow_unknown_content_types: true,
            rename_slides_on_load: true,
        }
    }
}

impl LoadOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_unknown_content_types(mut self, allow: bool) -> Self {
        self.allow_unknown_content_types = allow;
        self
    }

    #[inline]
    pub fn with_rename_slides_on_load(mut self, rename: bool) -> Self {
        self.rename_slides_on_load = rename;
        self
    }
}

/// Compression applied to archive members on save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compression {
    #[default]
    Deflated,
    Stored,
}

impl Compression {
    /// The ZIP compression method for this setting.
    pub fn method(self) -> zip::CompressionMethod {
        match self {
            Compression::Deflated => zip::CompressionMethod::Deflated,
            Compression::Stored => zip::CompressionMethod::Stored,
        }
    }
}

/// Options controlling how a package is saved.
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    pub compression: Compression,
}

impl SaveOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }
}

/// Main API class for working with OPC packages.
///
/// OpcPackage represents an Open Packaging Convention package in memory,
/// providing access to parts, relationships, and package-level operations.
#[derive(Debug, Default)]
pub struct OpcPackage {
    /// Package-level relationships
    rels: Relationships,

    /// All parts in the package
    graph: PartGraph,
}

impl OpcPackage {
    /// Create a new empty OPC package.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an OPC package from a ZIP file or an extracted package directory.
    pub fn open<P: AsRef<Path>>(path: P, factory: &PartFactory) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening package");
        let phys_reader = PhysPkgReader::open(path)?;
        Self::from_phys_reader(&phys_reader, factory)
    }

    /// Load an OPC package from a reader.
    pub fn from_reader<R: Read + Seek>(reader: R, factory: &PartFactory) -> Result<Self> {
        let phys_reader = PhysPkgReader::from_reader(reader)?;
        Self::from_phys_reader(&phys_reader, factory)
    }

    /// Load an OPC package from the bytes of a ZIP archive.
    pub fn from_bytes(data: Vec<u8>, factory: &PartFactory) -> Result<Self> {
        let phys_reader = PhysPkgReader::from_bytes(data)?;
        Self::from_phys_reader(&phys_reader, factory)
    }

    /// Load an OPC package from a physical package reader.
    fn from_phys_reader(phys_reader: &PhysPkgReader, factory: &PartFactory) -> Result<Self> {
        let pkg_reader = PackageReader::from_phys_reader(phys_reader)?;
        Self::unmarshal(pkg_reader, factory)
    }

    /// Unmarshal a package from a package reader.
    ///
    /// Pass one builds every part through the factory, with empty relationships.
    /// Pass two resolves each serialized relationship to the part it names.
    fn unmarshal(mut pkg_reader: PackageReader, factory: &PartFactory) -> Result<Self> {
        let mut package = Self::new();
        let pkg_srels = pkg_reader.take_pkg_srels();
        let sparts = pkg_reader.take_sparts();

        let mut ids: HashMap<PackURI, PartId> = HashMap::with_capacity(sparts.len());
        let mut part_srels = Vec::with_capacity(sparts.len());
        for spart in sparts {
            let part = factory.load(spart.partname.clone(), &spart.content_type, spart.blob)?;
            let id = package.graph.add(part);
            ids.insert(spart.partname, id);
            part_srels.push((id, spart.srels));
        }

        let package_uri = PackURI::new(crate::ooxml::opc::packuri::PACKAGE_URI)?;
        for srel in &pkg_srels {
            let target = Self::resolve_target(&ids, &package_uri, srel)?;
            package
                .rels
                .add_relationship(srel.reltype.clone(), target, srel.r_id.clone());
        }

        for (id, srels) in part_srels {
            let source_uri = package.graph.partname_of(id)?;
            for srel in &srels {
                let target = Self::resolve_target(&ids, &source_uri, srel)?;
                trace!(source = %source_uri, r_id = %srel.r_id, "wiring relationship");
                package.graph.get_mut(id)?.rels_mut().add_relationship(
                    srel.reltype.clone(),
                    target,
                    srel.r_id.clone(),
                );
            }
        }

        debug!(parts = package.graph.len(), "package unmarshalled");
        Ok(package)
    }

    fn resolve_target(
        ids: &HashMap<PackURI, PartId>,
        source_uri: &PackURI,
        srel: &SerializedRelationship,
    ) -> Result<RelTarget> {
        if srel.is_external() {
            return Ok(RelTarget::External(srel.target_ref.clone()));
        }
        let partname = srel.target_partname()?;
        ids.get(&partname)
            .map(|id| RelTarget::Part(*id))
            .ok_or_else(|| OpcError::DanglingRelationship {
                source_uri: source_uri.to_string(),
                r_id: srel.r_id.clone(),
                target: partname.to_string(),
            })
    }

    /// The part the package's officeDocument relationship points at.
    ///
    /// For PowerPoint, the presentation.xml part.
    pub fn main_document_part(&self) -> Result<PartId> {
        self.part_by_reltype(relationship_type::OFFICE_DOCUMENT)
    }

    /// Get a part by relationship type from the package level.
    pub fn part_by_reltype(&self, reltype: &str) -> Result<PartId> {
        self.rels.part_with_reltype(reltype)?.target_part()
    }

    /// The part graph.
    #[inline]
    pub fn graph(&self) -> &PartGraph {
        &self.graph
    }

    /// Mutable access to the part graph.
    #[inline]
    pub fn graph_mut(&mut self) -> &mut PartGraph {
        &mut self.graph
    }

    /// Add a new part to the package.
    pub fn add_part(&mut self, part: Box<dyn Part>) -> PartId {
        self.graph.add(part)
    }

    /// Get the number of parts in the package.
    pub fn part_count(&self) -> usize {
        self.graph.len()
    }

    /// Get a reference to the package-level relationships.
    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    /// Get a mutable reference to the package-level relationships.
    pub fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    /// Relate the package to a part, reusing an existing relationship.
    pub fn relate_to(&mut self, target: PartId, reltype: &str) -> String {
        self.rels.get_or_add(reltype, target).r_id().to_string()
    }

    /// Find the next available partname for a `%d` template.
    pub fn next_partname(&self, template: &str) -> Result<PackURI> {
        self.graph.next_partname(template)
    }

    /// Save the package to `path`, replacing it atomically.
    pub fn save<P: AsRef<Path>>(&self, path: P, options: &SaveOptions) -> Result<()> {
        PackageWriter::write(path, self, options)
    }

    /// Serialize the package to the bytes of a ZIP archive.
    pub fn to_bytes(&self, options: &SaveOptions) -> Result<Vec<u8>> {
        PackageWriter::to_bytes(self, options)
    }

    /// Serialize the package into `writer`.
    pub fn write_to<W: Write>(&self, writer: W, options: &SaveOptions) -> Result<()> {
        PackageWriter::write_to_stream(writer, self, options)
    }
}
