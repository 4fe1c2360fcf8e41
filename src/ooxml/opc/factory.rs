/// Content-type driven construction of parts.
///
/// A [`PartFactory`] maps content types to constructors. The loader hands every
/// serialized part to the factory, which picks the constructor for its content
/// type or, when fallback is enabled, a generic [`XmlPart`] or [`BlobPart`].
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::part::{BlobPart, Part, XmlPart};
use std::collections::HashMap;
use tracing::warn;

/// Builds a part from its partname, content type and raw bytes.
pub type PartConstructor = fn(PackURI, &str, Vec<u8>) -> Result<Box<dyn Part>>;

/// Registry of part constructors keyed by content type.
#[derive(Debug, Clone, Default)]
pub struct PartFactory {
    constructors: HashMap<String, PartConstructor>,
    fallback: bool,
}

impl PartFactory {
    /// Create an empty registry with fallback disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `constructor` for `content_type`, replacing any previous entry.
    pub fn register(&mut self, content_type: &str, constructor: PartConstructor) -> &mut Self {
        self.constructors
            .insert(content_type.to_string(), constructor);
        self
    }

    /// Enable or disable generic parts for unregistered content types.
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    /// Whether unregistered content types load as generic parts.
    #[inline]
    pub fn fallback(&self) -> bool {
        self.fallback
    }

    /// Whether a constructor is registered for `content_type`.
    pub fn is_registered(&self, content_type: &str) -> bool {
        self.constructors.contains_key(content_type)
    }

    /// Construct the part for `content_type`.
    ///
    /// Unregistered content types fail with [`OpcError::UnsupportedContentType`]
    /// unless fallback is enabled.
    pub fn load(&self, partname: PackURI, content_type: &str, blob: Vec<u8>) -> Result<Box<dyn Part>> {
        if let Some(constructor) = self.constructors.get(content_type) {
            return constructor(partname, content_type, blob);
        }
        if !self.fallback {
            return Err(OpcError::UnsupportedContentType {
                partname: partname.to_string(),
                content_type: content_type.to_string(),
            });
        }

        warn!(%partname, content_type, "no part type registered, loading as generic part");
        Self::load_generic(partname, content_type, blob)
    }

    /// Load a part as a plain XmlPart or BlobPart based on content type.
    pub fn load_generic(partname: PackURI, content_type: &str, blob: Vec<u8>) -> Result<Box<dyn Part>> {
        if Self::is_xml_content_type(content_type) {
            Ok(Box::new(XmlPart::load(partname, content_type, blob)?))
        } else {
            Ok(Box::new(BlobPart::load(partname, content_type, blob)?))
        }
    }

    /// Check if a content type represents XML content.
    #[inline]
    pub fn is_xml_content_type(content_type: &str) -> bool {
        content_type.ends_with("+xml") || content_type.ends_with("/xml")
    }
}
