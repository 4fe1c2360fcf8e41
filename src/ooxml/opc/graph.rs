/// The arena that owns every part of a package.
///
/// Parts refer to one another through [`PartId`] handles stored in their
/// relationships; the graph is the only place a handle is turned back into a
/// part. A slot can be checked out with [`PartGraph::take`] while the part is
/// mutated alongside the rest of the graph, then put back with
/// [`PartGraph::restore`].
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::part::{Part, PartId};
use crate::ooxml::opc::rel::{RelTarget, Relationships};
use std::collections::HashMap;

/// Owner of all parts in a package.
#[derive(Debug, Default)]
pub struct PartGraph {
    slots: Vec<Option<Box<dyn Part>>>,
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

impl PartGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a part and return its handle.
    pub fn add(&mut self, part: Box<dyn Part>) -> PartId {
        let id = PartId::new(self.slots.len());
        self.slots.push(Some(part));
        id
    }

    /// Get a part by handle.
    pub fn get(&self, id: PartId) -> Result<&dyn Part> {
        match self.slots.get(id.index()) {
            Some(Some(part)) => Ok(part.as_ref()),
            Some(None) => Err(OpcError::PartNotFound(format!("{} is checked out", id))),
            None => Err(OpcError::PartNotFound(id.to_string())),
        }
    }

    /// Get mutable access to a part by handle.
    pub fn get_mut(&mut self, id: PartId) -> Result<&mut dyn Part> {
        match self.slots.get_mut(id.index()) {
            Some(Some(part)) => Ok(part.as_mut()),
            Some(None) => Err(OpcError::PartNotFound(format!("{} is checked out", id))),
            None => Err(OpcError::PartNotFound(id.to_string())),
        }
    }

    /// Get a part downcast to its concrete type.
    pub fn get_as<T: Part>(&self, id: PartId) -> Result<&T> {
        let part = self.get(id)?;
        part.as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| OpcError::UnexpectedPartType {
                partname: part.partname().to_string(),
                expected: short_type_name::<T>(),
            })
    }

    /// Mutable form of [`PartGraph::get_as`].
    pub fn get_as_mut<T: Part>(&mut self, id: PartId) -> Result<&mut T> {
        let part = self.get(id)?;
        if !part.as_any().is::<T>() {
            return Err(OpcError::UnexpectedPartType {
                partname: part.partname().to_string(),
                expected: short_type_name::<T>(),
            });
        }
        self.get_mut(id)?
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| OpcError::PartNotFound(id.to_string()))
    }

    /// Whether the part behind `id` has concrete type `T`.
    pub fn is<T: Part>(&self, id: PartId) -> bool {
        self.get(id).is_ok_and(|part| part.as_any().is::<T>())
    }

    /// Check a part out of its slot. The handle stays reserved until restored.
    pub fn take(&mut self, id: PartId) -> Result<Box<dyn Part>> {
        self.slots
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or_else(|| OpcError::PartNotFound(id.to_string()))
    }

    /// Return a checked-out part to its slot.
    pub fn restore(&mut self, id: PartId, part: Box<dyn Part>) -> Result<()> {
        let slot = self
            .slots
            .get_mut(id.index())
            .ok_or_else(|| OpcError::PartNotFound(id.to_string()))?;
        if slot.is_some() {
            return Err(OpcError::InvalidRelationship(format!("{} is already occupied", id)));
        }
        *slot = Some(part);
        Ok(())
    }

    /// Number of parts, including checked-out ones.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All parts currently in the graph, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (PartId, &dyn Part)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_deref().map(|part| (PartId::new(i), part)))
    }

    /// Handles of all parts of concrete type `T`.
    pub fn ids_of<T: Part>(&self) -> Vec<PartId> {
        self.iter()
            .filter(|(_, part)| part.as_any().is::<T>())
            .map(|(id, _)| id)
            .collect()
    }

    /// Find a part by partname.
    pub fn find(&self, partname: &PackURI) -> Option<PartId> {
        self.iter()
            .find(|(_, part)| part.partname() == partname)
            .map(|(id, _)| id)
    }

    /// Whether a part with this partname exists.
    pub fn contains(&self, partname: &PackURI) -> bool {
        self.find(partname).is_some()
    }

    /// Current partname of a part.
    pub fn partname_of(&self, id: PartId) -> Result<PackURI> {
        Ok(self.get(id)?.partname().clone())
    }

    /// Next free partname for a `%d` template such as `/ppt/slides/slide%d.xml`.
    ///
    /// The lowest unused number is chosen, so gaps left by removed parts are reused.
    pub fn next_partname(&self, template: &str) -> Result<PackURI> {
        let existing: Vec<PackURI> = self
            .iter()
            .map(|(_, part)| part.partname().clone())
            .collect();
        PackURI::next_available(template, &existing)
    }

    /// Resolve the internal relationships of `source` to parts.
    pub fn related_parts(&self, source: PartId) -> Result<RelatedParts<'_>> {
        Ok(self.resolve(self.get(source)?.rels()))
    }

    /// Resolve a relationship collection against this graph.
    pub fn resolve<'g>(&'g self, rels: &Relationships) -> RelatedParts<'g> {
        let ids = rels
            .iter()
            .filter_map(|rel| match rel.target() {
                RelTarget::Part(id) => Some((rel.r_id().to_string(), *id)),
                RelTarget::External(_) => None,
            })
            .collect();
        RelatedParts { graph: self, ids }
    }

    /// The part `source` reaches through relationship `r_id`.
    pub fn related_part(&self, source: PartId, r_id: &str) -> Result<PartId> {
        self.get(source)?.related_part_id(r_id)
    }
}

/// The parts one source reaches through its internal relationships, keyed by rId.
#[derive(Debug)]
pub struct RelatedParts<'g> {
    graph: &'g PartGraph,
    ids: HashMap<String, PartId>,
}

impl<'g> RelatedParts<'g> {
    /// The part behind `r_id`.
    pub fn get(&self, r_id: &str) -> Result<&'g dyn Part> {
        let id = self
            .id_of(r_id)
            .ok_or_else(|| OpcError::RelationshipNotFound(r_id.to_string()))?;
        self.graph.get(id)
    }

    /// The handle behind `r_id`.
    #[inline]
    pub fn id_of(&self, r_id: &str) -> Option<PartId> {
        self.ids.get(r_id).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// rId and handle pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, PartId)> {
        self.ids.iter().map(|(r_id, id)| (r_id.as_str(), *id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
    use crate::ooxml::opc::part::{BlobPart, XmlPart};

    fn blob(partname: &str) -> Box<dyn Part> {
        Box::new(BlobPart::new(PackURI::new(partname).unwrap(), ct::PNG, vec![0]))
    }

    fn xml(partname: &str) -> Box<dyn Part> {
        Box::new(XmlPart::load(PackURI::new(partname).unwrap(), ct::PML_SLIDE, b"<p:sld/>".to_vec()).unwrap())
    }

    #[test]
    fn test_next_partname_fills_gaps() {
        let mut graph = PartGraph::new();
        graph.add(xml("/ppt/slides/slide1.xml"));
        graph.add(xml("/ppt/slides/slide2.xml"));
        assert_eq!(graph.next_partname("/ppt/slides/slide%d.xml").unwrap(), "/ppt/slides/slide3.xml");

        let mut gapped = PartGraph::new();
        gapped.add(xml("/ppt/slides/slide1.xml"));
        gapped.add(xml("/ppt/slides/slide3.xml"));
        assert_eq!(gapped.next_partname("/ppt/slides/slide%d.xml").unwrap(), "/ppt/slides/slide2.xml");
    }

    #[test]
    fn test_typed_access() {
        let mut graph = PartGraph::new();
        let img = graph.add(blob("/ppt/media/image1.png"));
        let sld = graph.add(xml("/ppt/slides/slide1.xml"));

        assert!(graph.get_as::<BlobPart>(img).is_ok());
        assert!(graph.is::<XmlPart>(sld));
        let err = graph.get_as::<XmlPart>(img).unwrap_err();
        assert!(matches!(err, OpcError::UnexpectedPartType { expected: "XmlPart", .. }));
        assert!(graph.get_as_mut::<XmlPart>(sld).is_ok());
        assert_eq!(graph.ids_of::<XmlPart>(), vec![sld]);
    }

    #[test]
    fn test_take_and_restore() {
        let mut graph = PartGraph::new();
        let id = graph.add(blob("/ppt/media/image1.png"));

        let part = graph.take(id).unwrap();
        assert!(matches!(graph.get(id), Err(OpcError::PartNotFound(_))));
        assert!(graph.find(part.partname()).is_none());
        assert_eq!(graph.len(), 1);

        graph.restore(id, part).unwrap();
        assert!(graph.get(id).is_ok());
        assert!(graph.restore(id, blob("/x.png")).is_err());
    }

    #[test]
    fn test_related_parts() {
        let mut graph = PartGraph::new();
        let layout = graph.add(xml("/ppt/slideLayouts/slideLayout1.xml"));
        let slide = graph.add(xml("/ppt/slides/slide1.xml"));

        let r_id = graph.get_mut(slide).unwrap().relate_to(layout, rt::SLIDE_LAYOUT);
        graph.get_mut(slide).unwrap().relate_to_ext("https://example.com", rt::HYPERLINK);

        let related = graph.related_parts(slide).unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related.id_of(&r_id), Some(layout));
        assert_eq!(
            related.get(&r_id).unwrap().partname().as_str(),
            "/ppt/slideLayouts/slideLayout1.xml"
        );
        assert!(related.get("rId42").is_err());
        assert_eq!(graph.related_part(slide, &r_id).unwrap(), layout);
    }

    #[test]
    fn test_find_follows_renames() {
        let mut graph = PartGraph::new();
        let id = graph.add(xml("/ppt/slides/slide5.xml"));
        graph
            .get_mut(id)
            .unwrap()
            .set_partname(PackURI::new("/ppt/slides/slide1.xml").unwrap());
        assert_eq!(graph.find(&PackURI::new("/ppt/slides/slide1.xml").unwrap()), Some(id));
        assert!(!graph.contains(&PackURI::new("/ppt/slides/slide5.xml").unwrap()));
    }
}
