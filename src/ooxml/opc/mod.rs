/// Open Packaging Conventions (OPC) implementation.
///
/// This module provides the package layer that PresentationML documents are
/// built on:
///
/// - Package structure (parts, relationships, the part graph)
/// - Content type management and content-type driven part construction
/// - ZIP-based physical packaging, plus extracted package directories
/// - Lazy XML parts that parse on first access
///
/// # Performance Features
///
/// - Uses `atoi_simd` for fast integer parsing of rIds and partname indexes
/// - Uses `quick-xml` for streaming XML parsing
/// - Uses `smallvec` for the typically small per-part relationship lists

pub mod constants;
pub mod error;
pub mod factory;
pub mod graph;
pub mod package;
pub mod packuri;
pub mod part;
pub mod phys_pkg;
pub mod pkgreader;
pub mod pkgwriter;
pub mod rel;

// Re-export commonly used types
pub use error::{OpcError, Result};
pub use factory::PartFactory;
pub use graph::{PartGraph, RelatedParts};
pub use package::{Compression, LoadOptions, OpcPackage, SaveOptions};
pub use packuri::PackURI;
pub use part::{BlobPart, Part, PartId, XmlPart};
pub use rel::{RelTarget, Relationship, Relationships};
