/// Error types for presentation-level operations.
use thiserror::Error;

/// Result type for presentation-level operations.
pub type Result<T> = std::result::Result<T, OoxmlError>;

/// Error types for presentation-level operations.
#[derive(Error, Debug)]
pub enum OoxmlError {
    /// OPC package error
    #[error("OPC error: {0}")]
    Opc(#[from] crate::ooxml::opc::error::OpcError),

    /// Positional access past the end of a collection
    #[error("Index {index} out of range for collection of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// A cached link was read before the load pass resolved it
    #[error("Not resolved yet: {0}")]
    Unresolved(String),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// Part not found
    #[error("Part not found: {0}")]
    PartNotFound(String),

    /// Invalid content type
    #[error("Invalid content type: expected {expected}, got {got}")]
    InvalidContentType { expected: String, got: String },

    /// Image data that cannot be embedded
    #[error("Image error: {0}")]
    Image(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for OoxmlError {
    fn from(err: quick_xml::Error) -> Self {
        OoxmlError::Xml(err.to_string())
    }
}
