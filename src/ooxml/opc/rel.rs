use crate::common::xml::escape_xml;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::part::PartId;
/// Relationship-related objects for OPC packages.
///
/// This module provides types for managing relationships between parts in an OPC package,
/// including internal and external relationships.
use std::collections::HashMap;

/// The far end of a relationship.
///
/// Internal targets are held by part identity rather than by partname, so a
/// target part can be renamed without touching the relationships that point at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelTarget {
    /// Another part in the same package
    Part(PartId),
    /// An external resource, usually a URL
    External(String),
}

/// A single relationship from a source part to a target.
///
/// Represents a connection between parts in an OPC package, identified by an rId
/// (relationship ID). Can be either internal (pointing to another part) or external
/// (pointing to an external URL).
#[derive(Debug, Clone)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1", "rId2")
    r_id: String,

    /// Relationship type URI
    reltype: String,

    /// Target part or external reference
    target: RelTarget,
}

impl Relationship {
    /// Create a new relationship.
    ///
    /// # Arguments
    /// * `r_id` - Relationship ID (e.g., "rId1")
    /// * `reltype` - Relationship type URI
    /// * `target` - Target part or external reference
    pub fn new(r_id: String, reltype: String, target: RelTarget) -> Self {
        Self {
            r_id,
            reltype,
            target,
        }
    }

    /// Get the relationship ID.
    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    /// Get the relationship type.
    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    /// Get the relationship target.
    #[inline]
    pub fn target(&self) -> &RelTarget {
        &self.target
    }

    /// Check if this is an external relationship.
    #[inline]
    pub fn is_external(&self) -> bool {
        matches!(self.target, RelTarget::External(_))
    }

    /// Get the target part for internal relationships.
    ///
    /// Returns an error if this is an external relationship.
    pub fn target_part(&self) -> Result<PartId> {
        match &self.target {
            RelTarget::Part(id) => Ok(*id),
            RelTarget::External(url) => Err(OpcError::InvalidRelationship(format!(
                "{} is external ({}), it has no target part",
                self.r_id, url
            ))),
        }
    }

    /// Numeric suffix of an `rIdN` identifier.
    fn r_id_number(r_id: &str) -> Option<u32> {
        let digits = r_id.strip_prefix("rId")?;
        atoi_simd::parse::<u32, false, false>(digits.as_bytes()).ok()
    }
}

/// Collection of relationships from a single source.
///
/// Uses a HashMap for O(1) lookup by relationship ID. Iteration and
/// serialization are ordered by the numeric suffix of the rId.
#[derive(Debug, Default)]
pub struct Relationships {
    /// Map of relationship ID to Relationship
    rels: HashMap<String, Relationship>,
}

impl Relationships {
    /// Create a new empty relationships collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a relationship with a known rId, replacing any previous one with that rId.
    ///
    /// # Returns
    /// Reference to the newly added relationship
    pub fn add_relationship(
        &mut self,
        reltype: String,
        target: RelTarget,
        r_id: String,
    ) -> &Relationship {
        let rel = Relationship::new(r_id.clone(), reltype, target);
        self.rels.entry(r_id).insert_entry(rel).into_mut()
    }

    /// Get a relationship by its ID.
    #[inline]
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.get(r_id)
    }

    /// Check whether a relationship with the given ID exists.
    #[inline]
    pub fn contains(&self, r_id: &str) -> bool {
        self.rels.contains_key(r_id)
    }

    /// Get or add a relationship to a target part.
    ///
    /// If a relationship of the given type to the target already exists,
    /// returns that relationship. Otherwise, creates a new one with the
    /// lowest unused rId. Calling this twice with the same arguments yields
    /// the same relationship.
    pub fn get_or_add(&mut self, reltype: &str, target: PartId) -> &Relationship {
        let wanted = RelTarget::Part(target);
        let r_id = match self.find(reltype, &wanted) {
            Some(existing) => existing,
            None => {
                let r_id = self.next_r_id();
                self.add_relationship(reltype.to_string(), wanted, r_id.clone());
                r_id
            },
        };
        &self.rels[&r_id]
    }

    /// Get or add an external relationship, returning its rId.
    pub fn get_or_add_ext_rel(&mut self, reltype: &str, target_ref: &str) -> String {
        let wanted = RelTarget::External(target_ref.to_string());
        if let Some(existing) = self.find(reltype, &wanted) {
            return existing;
        }
        let r_id = self.next_r_id();
        self.add_relationship(reltype.to_string(), wanted, r_id.clone());
        r_id
    }

    fn find(&self, reltype: &str, target: &RelTarget) -> Option<String> {
        self.iter()
            .find(|rel| rel.reltype() == reltype && rel.target() == target)
            .map(|rel| rel.r_id().to_string())
    }

    /// Get the next available relationship ID.
    ///
    /// Generates IDs in the format "rId1", "rId2", etc., filling in gaps
    /// if any exist.
    fn next_r_id(&self) -> String {
        let mut used_numbers: Vec<u32> = self
            .rels
            .keys()
            .filter_map(|r_id| Relationship::r_id_number(r_id))
            .collect();
        used_numbers.sort_unstable();

        let mut next_num = 1u32;
        for &num in &used_numbers {
            match num.cmp(&next_num) {
                std::cmp::Ordering::Equal => next_num += 1,
                std::cmp::Ordering::Greater => break,
                std::cmp::Ordering::Less => {},
            }
        }

        format!("rId{}", next_num)
    }

    /// Get the relationship of a specific type.
    ///
    /// Returns an error if no relationship of the type is found,
    /// or if multiple relationships of the type exist.
    pub fn part_with_reltype(&self, reltype: &str) -> Result<&Relationship> {
        let mut matching = self.iter().filter(|rel| rel.reltype() == reltype);
        match (matching.next(), matching.next()) {
            (None, _) => Err(OpcError::RelationshipNotFound(format!(
                "No relationship of type '{}'",
                reltype
            ))),
            (Some(rel), None) => Ok(rel),
            (Some(_), Some(_)) => Err(OpcError::InvalidRelationship(format!(
                "Multiple relationships of type '{}'",
                reltype
            ))),
        }
    }

    /// Get an iterator over all relationships, ordered by rId number.
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        let mut rels: Vec<&Relationship> = self.rels.values().collect();
        rels.sort_by(|a, b| {
            let key_a = (Relationship::r_id_number(a.r_id()), a.r_id());
            let key_b = (Relationship::r_id_number(b.r_id()), b.r_id());
            key_a.cmp(&key_b)
        });
        rels.into_iter()
    }

    /// Get the number of relationships in the collection.
    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    /// Check if the collection is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    /// Remove a relationship by its ID.
    pub fn remove(&mut self, r_id: &str) -> Option<Relationship> {
        self.rels.remove(r_id)
    }

    /// Serialize relationships to the XML of a .rels part.
    ///
    /// Internal targets are written relative to `base_uri`, the base URI of the
    /// source part, using `partname_of` to look up each target's current partname.
    pub fn to_xml<F>(&self, base_uri: &str, partname_of: F) -> Result<String>
    where
        F: Fn(PartId) -> Result<PackURI>,
    {
        let mut xml = String::with_capacity(256 + self.rels.len() * 160);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        xml.push('\n');

        for rel in self.iter() {
            let (target_ref, target_mode) = match rel.target() {
                RelTarget::Part(id) => (partname_of(*id)?.relative_ref(base_uri), ""),
                RelTarget::External(url) => (url.clone(), r#" TargetMode="External""#),
            };

            xml.push_str(&format!(
                r#"  <Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
                escape_xml(rel.r_id()),
                escape_xml(rel.reltype()),
                escape_xml(&target_ref),
                target_mode
            ));
            xml.push('\n');
        }

        xml.push_str("</Relationships>");

        Ok(xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::constants::relationship_type as rt;
    use proptest::prelude::*;

    #[test]
    fn test_relationship_creation() {
        let rel = Relationship::new(
            "rId1".to_string(),
            rt::SLIDE_LAYOUT.to_string(),
            RelTarget::Part(PartId::new(3)),
        );

        assert_eq!(rel.r_id(), "rId1");
        assert_eq!(rel.reltype(), rt::SLIDE_LAYOUT);
        assert!(!rel.is_external());
        assert_eq!(rel.target_part().unwrap(), PartId::new(3));
    }

    #[test]
    fn test_external_relationship_has_no_target_part() {
        let rel = Relationship::new(
            "rId4".to_string(),
            rt::HYPERLINK.to_string(),
            RelTarget::External("https://example.com".to_string()),
        );
        assert!(rel.is_external());
        assert!(matches!(rel.target_part(), Err(OpcError::InvalidRelationship(_))));
    }

    #[test]
    fn test_next_r_id_fills_gaps() {
        let mut rels = Relationships::new();
        assert_eq!(rels.next_r_id(), "rId1");

        rels.add_relationship(rt::IMAGE.to_string(), RelTarget::Part(PartId::new(0)), "rId1".into());
        rels.add_relationship(rt::IMAGE.to_string(), RelTarget::Part(PartId::new(1)), "rId3".into());
        assert_eq!(rels.next_r_id(), "rId2");
    }

    #[test]
    fn test_get_or_add_is_idempotent() {
        let mut rels = Relationships::new();
        let layout = PartId::new(7);

        let first = rels.get_or_add(rt::SLIDE_LAYOUT, layout).r_id().to_string();
        let second = rels.get_or_add(rt::SLIDE_LAYOUT, layout).r_id().to_string();
        assert_eq!(first, "rId1");
        assert_eq!(first, second);
        assert_eq!(rels.len(), 1);

        // Same target under another type is a distinct relationship
        let image = rels.get_or_add(rt::IMAGE, layout).r_id().to_string();
        assert_eq!(image, "rId2");
    }

    #[test]
    fn test_get_or_add_ext_rel() {
        let mut rels = Relationships::new();
        let first = rels.get_or_add_ext_rel(rt::HYPERLINK, "https://example.com");
        let second = rels.get_or_add_ext_rel(rt::HYPERLINK, "https://example.com");
        assert_eq!(first, second);
        assert!(rels.get(&first).unwrap().is_external());
    }

    #[test]
    fn test_part_with_reltype() {
        let mut rels = Relationships::new();
        assert!(matches!(
            rels.part_with_reltype(rt::SLIDE_MASTER),
            Err(OpcError::RelationshipNotFound(_))
        ));

        rels.get_or_add(rt::SLIDE_MASTER, PartId::new(1));
        assert_eq!(rels.part_with_reltype(rt::SLIDE_MASTER).unwrap().r_id(), "rId1");

        rels.get_or_add(rt::SLIDE_MASTER, PartId::new(2));
        assert!(matches!(
            rels.part_with_reltype(rt::SLIDE_MASTER),
            Err(OpcError::InvalidRelationship(_))
        ));
    }

    #[test]
    fn test_iter_orders_numerically() {
        let mut rels = Relationships::new();
        for n in [10, 2, 1] {
            rels.add_relationship(
                rt::SLIDE.to_string(),
                RelTarget::Part(PartId::new(n)),
                format!("rId{}", n),
            );
        }
        let ids: Vec<&str> = rels.iter().map(|r| r.r_id()).collect();
        assert_eq!(ids, ["rId1", "rId2", "rId10"]);
    }

    #[test]
    fn test_to_xml_writes_relative_targets() {
        let mut rels = Relationships::new();
        rels.get_or_add(rt::SLIDE_LAYOUT, PartId::new(0));
        rels.get_or_add_ext_rel(rt::HYPERLINK, "https://example.com/?a=1&b=2");

        let xml = rels
            .to_xml("/ppt/slides", |_| PackURI::new("/ppt/slideLayouts/slideLayout1.xml"))
            .unwrap();

        assert!(xml.contains(r#"Id="rId1""#));
        assert!(xml.contains(r#"Target="../slideLayouts/slideLayout1.xml"/>"#));
        assert!(xml.contains(r#"Target="https://example.com/?a=1&amp;b=2" TargetMode="External"/>"#));
    }

    proptest! {
        #[test]
        fn prop_get_or_add_never_duplicates(targets in prop::collection::vec(0usize..6, 1..30)) {
            let mut rels = Relationships::new();
            for &t in &targets {
                let first = rels.get_or_add(rt::IMAGE, PartId::new(t)).r_id().to_string();
                let again = rels.get_or_add(rt::IMAGE, PartId::new(t)).r_id().to_string();
                prop_assert_eq!(first, again);
            }
            let mut distinct = targets.clone();
            distinct.sort_unstable();
            distinct.dedup();
            prop_assert_eq!(rels.len(), distinct.len());
            // Ids are dense: rId1..rIdN
            for n in 1..=distinct.len() {
                let r_id = format!("rId{}", n);
                prop_assert!(rels.contains(&r_id));
            }
        }
    }
}
