/// Error types for OPC package operations
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpcError {
    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("Invalid pack URI: {0}")]
    InvalidPackUri(String),

    #[error("Unsupported content type '{content_type}' for part {partname}")]
    UnsupportedContentType {
        partname: String,
        content_type: String,
    },

    #[error("Part not found: {0}")]
    PartNotFound(String),

    /// Two parts of one package carry the same partname.
    #[error("Duplicate partname: {0}")]
    DuplicatePartname(String),

    #[error("Relationship not found: {0}")]
    RelationshipNotFound(String),

    #[error("Content type not found for partname: {0}")]
    ContentTypeNotFound(String),

    #[error("Invalid relationship: {0}")]
    InvalidRelationship(String),

    /// A relationship names a target part that is not in the package.
    #[error("Relationship {r_id} of {source_uri} targets missing part {target}")]
    DanglingRelationship {
        source_uri: String,
        r_id: String,
        target: String,
    },

    #[error("Part {partname} is not a {expected}")]
    UnexpectedPartType {
        partname: String,
        expected: &'static str,
    },

    #[error("XML parsing error: {0}")]
    XmlError(String),

    #[error("ZIP error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Quick-XML error: {0}")]
    QuickXmlError(#[from] quick_xml::Error),

    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),

    #[error("Attribute error: {0}")]
    AttrError(String),
}

impl From<quick_xml::events::attributes::AttrError> for OpcError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        OpcError::AttrError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OpcError>;
