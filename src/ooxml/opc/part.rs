use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::rel::{RelTarget, Relationships};
use crate::ooxml::oxml::Element;
use once_cell::unsync::OnceCell;
/// Open Packaging Convention (OPC) objects related to package parts.
///
/// This module provides the Part trait with its two generic implementations:
/// [`XmlPart`], whose element tree is parsed on first access, and [`BlobPart`]
/// for opaque binary content.
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use tracing::trace;

/// Handle of a part inside a [`PartGraph`](crate::ooxml::opc::graph::PartGraph).
///
/// A part keeps its id for as long as it lives in the graph, even when it is
/// renamed, so relationships store ids rather than partnames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartId(usize);

impl PartId {
    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Slot index of this part in its graph.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "part#{}", self.0)
    }
}

/// Trait representing a part in an OPC package.
///
/// Parts are the fundamental units of content in an OPC package. Each part
/// has a unique partname (PackURI), a content type, and may have relationships
/// to other parts.
pub trait Part: Any + fmt::Debug {
    /// Get the partname of this part.
    fn partname(&self) -> &PackURI;

    /// Change the partname of this part. Relationships pointing here are unaffected.
    fn set_partname(&mut self, partname: PackURI);

    /// Get the content type of this part.
    fn content_type(&self) -> &str;

    /// Get the serialized content of this part.
    ///
    /// XML parts whose tree has been materialized are serialized from the tree.
    fn blob(&self) -> Result<Cow<'_, [u8]>>;

    /// Get the relationships for this part.
    fn rels(&self) -> &Relationships;

    /// Get mutable access to the relationships for this part.
    fn rels_mut(&mut self) -> &mut Relationships;

    /// Typed access for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutable typed access for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Add or get a relationship to another part.
    ///
    /// If a relationship of the given type to the target already exists,
    /// returns its rId. Otherwise, creates a new relationship and returns
    /// the new rId.
    fn relate_to(&mut self, target: PartId, reltype: &str) -> String {
        let r_id = self.rels_mut().get_or_add(reltype, target).r_id().to_string();
        trace!(source = %self.partname(), r_id = %r_id, %target, reltype, "relate_to");
        r_id
    }

    /// Add or get an external relationship.
    fn relate_to_ext(&mut self, target_url: &str, reltype: &str) -> String {
        self.rels_mut().get_or_add_ext_rel(reltype, target_url)
    }

    /// Get the target part of an internal relationship.
    fn related_part_id(&self, r_id: &str) -> Result<PartId> {
        self.rels()
            .get(r_id)
            .ok_or_else(|| OpcError::RelationshipNotFound(format!("{} in {}", r_id, self.partname())))?
            .target_part()
    }

    /// Get the target URL of an external relationship.
    fn target_ref(&self, r_id: &str) -> Result<&str> {
        let rel = self
            .rels()
            .get(r_id)
            .ok_or_else(|| OpcError::RelationshipNotFound(format!("{} in {}", r_id, self.partname())))?;
        match rel.target() {
            RelTarget::External(url) => Ok(url),
            RelTarget::Part(_) => Err(OpcError::InvalidRelationship(format!(
                "{} in {} targets a part, not a URL",
                r_id,
                self.partname()
            ))),
        }
    }
}

/// Implement [`Part`] for a type wrapping an [`XmlPart`] in the named field.
macro_rules! impl_part_via {
    ($ty:ty, $field:ident) => {
        impl $crate::ooxml::opc::part::Part for $ty {
            fn partname(&self) -> &$crate::ooxml::opc::packuri::PackURI {
                $crate::ooxml::opc::part::Part::partname(&self.$field)
            }

            fn set_partname(&mut self, partname: $crate::ooxml::opc::packuri::PackURI) {
                $crate::ooxml::opc::part::Part::set_partname(&mut self.$field, partname)
            }

            fn content_type(&self) -> &str {
                $crate::ooxml::opc::part::Part::content_type(&self.$field)
            }

            fn blob(&self) -> $crate::ooxml::opc::error::Result<std::borrow::Cow<'_, [u8]>> {
                $crate::ooxml::opc::part::Part::blob(&self.$field)
            }

            fn rels(&self) -> &$crate::ooxml::opc::rel::Relationships {
                $crate::ooxml::opc::part::Part::rels(&self.$field)
            }

            fn rels_mut(&mut self) -> &mut $crate::ooxml::opc::rel::Relationships {
                $crate::ooxml::opc::part::Part::rels_mut(&mut self.$field)
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
                self
            }
        }
    };
}
pub(crate) use impl_part_via;

/// A basic implementation of a Part that stores binary content.
///
/// This is the default part type for non-XML content.
#[derive(Debug)]
pub struct BlobPart {
    /// The partname (URI) of this part
    partname: PackURI,

    /// The content type of this part
    content_type: String,

    /// The binary content of this part
    blob: Vec<u8>,

    /// Relationships from this part to other parts
    rels: Relationships,
}

impl BlobPart {
    /// Create a new BlobPart.
    pub fn new(partname: PackURI, content_type: &str, blob: Vec<u8>) -> Self {
        Self {
            partname,
            content_type: content_type.to_string(),
            blob,
            rels: Relationships::new(),
        }
    }

    /// Load a part from raw data.
    pub fn load(partname: PackURI, content_type: &str, blob: Vec<u8>) -> Result<Self> {
        Ok(Self::new(partname, content_type, blob))
    }

    /// The raw content.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.blob
    }
}

impl Part for BlobPart {
    fn partname(&self) -> &PackURI {
        &self.partname
    }

    fn set_partname(&mut self, partname: PackURI) {
        self.partname = partname;
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn blob(&self) -> Result<Cow<'_, [u8]>> {
        Ok(Cow::Borrowed(&self.blob))
    }

    fn rels(&self) -> &Relationships {
        &self.rels
    }

    fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// An XML part whose element tree is parsed on first access.
///
/// Until the tree is requested the part holds only the raw bytes, and saving an
/// untouched part writes those bytes back unchanged.
#[derive(Debug)]
pub struct XmlPart {
    /// The partname (URI) of this part
    partname: PackURI,

    /// The content type of this part
    content_type: String,

    /// The XML as loaded; emptied once the tree is borrowed mutably
    raw: Vec<u8>,

    /// Parsed tree, filled on first access
    element: OnceCell<Element>,

    /// Relationships from this part to other parts
    rels: Relationships,
}

impl XmlPart {
    /// Create an XmlPart from an already-built element tree.
    pub fn new(partname: PackURI, content_type: &str, element: Element) -> Self {
        Self {
            partname,
            content_type: content_type.to_string(),
            raw: Vec::new(),
            element: OnceCell::with_value(element),
            rels: Relationships::new(),
        }
    }

    /// Load an XML part from raw data without parsing it.
    ///
    /// Relationships start empty; the package fills them in its second pass.
    pub fn load(partname: PackURI, content_type: &str, blob: Vec<u8>) -> Result<Self> {
        std::str::from_utf8(&blob)
            .map_err(|e| OpcError::XmlError(format!("Invalid UTF-8 in {}: {}", partname, e)))?;

        Ok(Self {
            partname,
            content_type: content_type.to_string(),
            raw: blob,
            element: OnceCell::new(),
            rels: Relationships::new(),
        })
    }

    /// The root element, parsing the XML on first call.
    pub fn element(&self) -> Result<&Element> {
        self.element.get_or_try_init(|| {
            trace!(partname = %self.partname, bytes = self.raw.len(), "materializing XML tree");
            Element::parse(&self.raw)
        })
    }

    /// Mutable root element, parsing the XML on first call.
    pub fn element_mut(&mut self) -> Result<&mut Element> {
        self.element()?;
        self.raw = Vec::new();
        self.element
            .get_mut()
            .ok_or_else(|| OpcError::XmlError(format!("no element tree for {}", self.partname)))
    }

    /// Whether the element tree has been parsed.
    #[inline]
    pub fn is_materialized(&self) -> bool {
        self.element.get().is_some()
    }
}

impl Part for XmlPart {
    fn partname(&self) -> &PackURI {
        &self.partname
    }

    fn set_partname(&mut self, partname: PackURI) {
        self.partname = partname;
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn blob(&self) -> Result<Cow<'_, [u8]>> {
        match self.element.get() {
            Some(element) => Ok(Cow::Owned(element.to_xml().into_bytes())),
            None => Ok(Cow::Borrowed(&self.raw)),
        }
    }

    fn rels(&self) -> &Relationships {
        &self.rels
    }

    fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};

    const LAYOUT: &[u8] = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld name="Title Slide"><p:spTree/></p:cSld></p:sldLayout>"#;

    fn layout_part() -> XmlPart {
        let partname = PackURI::new("/ppt/slideLayouts/slideLayout1.xml").unwrap();
        XmlPart::load(partname, ct::PML_SLIDE_LAYOUT, LAYOUT.to_vec()).unwrap()
    }

    #[test]
    fn test_xml_part_is_lazy() {
        let part = layout_part();
        assert!(!part.is_materialized());
        // Untouched parts hand back their original bytes.
        assert!(matches!(part.blob().unwrap(), Cow::Borrowed(b) if b == LAYOUT));

        assert!(part.element().unwrap().is("p:sldLayout"));
        assert!(part.is_materialized());
    }

    #[test]
    fn test_xml_part_mutation_is_serialized() {
        let mut part = layout_part();
        part.element_mut()
            .unwrap()
            .find_mut("p:cSld")
            .unwrap()
            .set_attr("name", "Renamed");

        let blob = part.blob().unwrap();
        let reparsed = Element::parse(&blob).unwrap();
        assert_eq!(reparsed.find("p:cSld").unwrap().attr("name"), Some("Renamed"));
    }

    #[test]
    fn test_xml_part_rejects_invalid_utf8() {
        let partname = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        let err = XmlPart::load(partname, ct::PML_SLIDE, vec![0x3c, 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, OpcError::XmlError(_)));
    }

    #[test]
    fn test_malformed_xml_fails_on_access() {
        let partname = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        let part = XmlPart::load(partname, ct::PML_SLIDE, b"<p:sld>".to_vec()).unwrap();
        assert!(part.element().is_err());
    }

    #[test]
    fn test_relate_to_is_idempotent() {
        let mut part = layout_part();
        let master = PartId::new(7);
        let first = part.relate_to(master, rt::SLIDE_MASTER);
        let second = part.relate_to(master, rt::SLIDE_MASTER);
        assert_eq!(first, "rId1");
        assert_eq!(first, second);
        assert_eq!(part.rels().len(), 1);
        assert_eq!(part.related_part_id("rId1").unwrap(), master);
        assert!(part.target_ref("rId1").is_err());
    }

    #[test]
    fn test_external_relationship() {
        let mut part = layout_part();
        let r_id = part.relate_to_ext("https://example.com/", rt::HYPERLINK);
        assert_eq!(part.target_ref(&r_id).unwrap(), "https://example.com/");
        assert!(part.related_part_id(&r_id).is_err());
        assert!(matches!(
            part.related_part_id("rId99"),
            Err(OpcError::RelationshipNotFound(_))
        ));
    }

    #[test]
    fn test_blob_part() {
        let partname = PackURI::new("/ppt/media/image1.png").unwrap();
        let mut part = BlobPart::new(partname, ct::PNG, vec![1, 2, 3]);
        assert_eq!(part.blob().unwrap().as_ref(), &[1u8, 2, 3][..]);

        part.set_partname(PackURI::new("/ppt/media/image2.png").unwrap());
        assert_eq!(part.partname().as_str(), "/ppt/media/image2.png");
        assert!(part.as_any().downcast_ref::<BlobPart>().is_some());
    }
}
