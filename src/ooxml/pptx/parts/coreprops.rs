/// Core document properties part.
///
/// Core properties live in `/docProps/core.xml` and hold Dublin Core metadata
/// plus a few OPC extensions (revision, last-modified-by).
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::{content_type as ct, namespace as ns};
use crate::ooxml::opc::error::Result as OpcResult;
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::part::{XmlPart, impl_part_via};
use crate::ooxml::oxml::Element;
use chrono::{DateTime, Utc};

/// Where a created core properties part is placed.
pub const CORE_PROPERTIES_PARTNAME: &str = "/docProps/core.xml";

const W3CDTF_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// The core properties part.
#[derive(Debug)]
pub struct CorePropertiesPart {
    xml: XmlPart,
}

impl_part_via!(CorePropertiesPart, xml);

impl CorePropertiesPart {
    pub fn load(partname: PackURI, content_type: &str, blob: Vec<u8>) -> OpcResult<Self> {
        Ok(Self {
            xml: XmlPart::load(partname, content_type, blob)?,
        })
    }

    /// A new part with the default property values.
    ///
    /// Title "PowerPoint Presentation", last modified by "longan", revision 1,
    /// modified now.
    pub fn default_part() -> Result<Self> {
        let root = Element::new("cp:coreProperties").with_namespace_declarations(&[
            "cp", "dc", "dcterms", "xsi",
        ]);
        let mut part = Self {
            xml: XmlPart::new(PackURI::new(CORE_PROPERTIES_PARTNAME)?, ct::OPC_CORE_PROPERTIES, root),
        };
        part.set_title("PowerPoint Presentation")?;
        part.set_last_modified_by("longan")?;
        part.set_revision(1)?;
        part.set_modified(Utc::now())?;
        Ok(part)
    }

    fn element(&self) -> Result<&Element> {
        Ok(self.xml.element()?)
    }

    fn text_of(&self, qname: &str) -> Result<Option<String>> {
        Ok(self.element()?.find(qname).map(Element::text))
    }

    fn set_text_of(&mut self, qname: &str, value: &str) -> Result<()> {
        let root = self.xml.element_mut()?;
        match root.find_mut(qname) {
            Some(child) => child.set_text(value),
            None => root.append(Element::new(qname)).set_text(value),
        }
        Ok(())
    }

    fn date_of(&self, qname: &str) -> Result<Option<DateTime<Utc>>> {
        self.text_of(qname)?
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_datetime(s.trim()))
            .transpose()
    }

    /// Write a W3CDTF date. The `xsi:type` value names its prefix, so it uses
    /// the root's own prefix for the dcterms namespace or declares `dcterms`
    /// on the property element.
    fn set_date_of(&mut self, qname: &str, value: DateTime<Utc>) -> Result<()> {
        self.set_text_of(qname, &value.format(W3CDTF_FORMAT).to_string())?;
        let root = self.xml.element_mut()?;
        let prefix = root.declared_prefix(ns::DCTERMS).map(str::to_string);
        if let Some(child) = root.find_mut(qname) {
            let prefix = match prefix {
                Some(prefix) => prefix,
                None => {
                    child.declare_namespace("dcterms");
                    "dcterms".to_string()
                },
            };
            child.set_attr("xsi:type", &format!("{}:W3CDTF", prefix));
        }
        Ok(())
    }

    /// `dc:title`
    pub fn title(&self) -> Result<Option<String>> {
        self.text_of("dc:title")
    }

    pub fn set_title(&mut self, title: &str) -> Result<()> {
        self.set_text_of("dc:title", title)
    }

    /// `dc:subject`
    pub fn subject(&self) -> Result<Option<String>> {
        self.text_of("dc:subject")
    }

    pub fn set_subject(&mut self, subject: &str) -> Result<()> {
        self.set_text_of("dc:subject", subject)
    }

    /// `dc:creator`
    pub fn author(&self) -> Result<Option<String>> {
        self.text_of("dc:creator")
    }

    pub fn set_author(&mut self, author: &str) -> Result<()> {
        self.set_text_of("dc:creator", author)
    }

    /// `cp:keywords`
    pub fn keywords(&self) -> Result<Option<String>> {
        self.text_of("cp:keywords")
    }

    pub fn set_keywords(&mut self, keywords: &str) -> Result<()> {
        self.set_text_of("cp:keywords", keywords)
    }

    /// `cp:lastModifiedBy`
    pub fn last_modified_by(&self) -> Result<Option<String>> {
        self.text_of("cp:lastModifiedBy")
    }

    pub fn set_last_modified_by(&mut self, name: &str) -> Result<()> {
        self.set_text_of("cp:lastModifiedBy", name)
    }

    /// `cp:revision`; absent or non-numeric values read as `None`.
    pub fn revision(&self) -> Result<Option<u32>> {
        Ok(self
            .text_of("cp:revision")?
            .and_then(|s| atoi_simd::parse::<u32, false, false>(s.trim().as_bytes()).ok()))
    }

    pub fn set_revision(&mut self, revision: u32) -> Result<()> {
        self.set_text_of("cp:revision", &revision.to_string())
    }

    /// `dcterms:created`
    pub fn created(&self) -> Result<Option<DateTime<Utc>>> {
        self.date_of("dcterms:created")
    }

    pub fn set_created(&mut self, created: DateTime<Utc>) -> Result<()> {
        self.set_date_of("dcterms:created", created)
    }

    /// `dcterms:modified`
    pub fn modified(&self) -> Result<Option<DateTime<Utc>>> {
        self.date_of("dcterms:modified")
    }

    pub fn set_modified(&mut self, modified: DateTime<Utc>) -> Result<()> {
        self.set_date_of("dcterms:modified", modified)
    }
}

/// Parse a W3CDTF datetime string.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Naive forms are taken as UTC
    for format in ["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, format) {
            return Ok(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }

    if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        && let Some(dt) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(DateTime::from_naive_utc_and_offset(dt, Utc));
    }

    Err(OoxmlError::Xml(format!("Invalid datetime format: {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::part::Part;
    use chrono::{Datelike, TimeZone};

    const CORE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>Quarterly Review</dc:title><dc:creator>Jo</dc:creator><cp:revision>7</cp:revision><dcterms:modified xsi:type="dcterms:W3CDTF">2013-02-07T19:04:16Z</dcterms:modified></cp:coreProperties>"#;

    fn loaded() -> CorePropertiesPart {
        CorePropertiesPart::load(
            PackURI::new(CORE_PROPERTIES_PARTNAME).unwrap(),
            ct::OPC_CORE_PROPERTIES,
            CORE.as_bytes().to_vec(),
        )
        .unwrap()
    }

    #[test]
    fn test_read_properties() {
        let props = loaded();
        assert_eq!(props.title().unwrap().as_deref(), Some("Quarterly Review"));
        assert_eq!(props.author().unwrap().as_deref(), Some("Jo"));
        assert_eq!(props.subject().unwrap(), None);
        assert_eq!(props.revision().unwrap(), Some(7));
        assert_eq!(
            props.modified().unwrap(),
            Some(Utc.with_ymd_and_hms(2013, 2, 7, 19, 4, 16).unwrap())
        );
    }

    #[test]
    fn test_write_properties() {
        let mut props = loaded();
        props.set_title("Annual Review").unwrap();
        props.set_subject("Finance").unwrap();
        props.set_revision(8).unwrap();

        let reparsed = CorePropertiesPart {
            xml: XmlPart::load(
                props.partname().clone(),
                ct::OPC_CORE_PROPERTIES,
                props.blob().unwrap().into_owned(),
            )
            .unwrap(),
        };
        assert_eq!(reparsed.title().unwrap().as_deref(), Some("Annual Review"));
        assert_eq!(reparsed.subject().unwrap().as_deref(), Some("Finance"));
        assert_eq!(reparsed.revision().unwrap(), Some(8));
    }

    fn reload(props: &CorePropertiesPart) -> CorePropertiesPart {
        CorePropertiesPart::load(
            props.partname().clone(),
            ct::OPC_CORE_PROPERTIES,
            props.blob().unwrap().into_owned(),
        )
        .unwrap()
    }

    #[test]
    fn test_write_with_undeclared_prefixes() {
        let xml = r#"<core:coreProperties xmlns:core="http://schemas.openxmlformats.org/package/2006/metadata/core-properties"/>"#;
        let mut props = CorePropertiesPart::load(
            PackURI::new(CORE_PROPERTIES_PARTNAME).unwrap(),
            ct::OPC_CORE_PROPERTIES,
            xml.as_bytes().to_vec(),
        )
        .unwrap();
        let created = Utc.with_ymd_and_hms(2021, 5, 6, 7, 8, 9).unwrap();
        props.set_title("Renamed Prefixes").unwrap();
        props.set_revision(2).unwrap();
        props.set_created(created).unwrap();

        let xml = String::from_utf8(props.blob().unwrap().into_owned()).unwrap();
        assert!(xml.contains("<core:revision>2</core:revision>"));
        assert!(xml.contains(r#"xsi:type="dcterms:W3CDTF""#));

        let reparsed = reload(&props);
        assert_eq!(reparsed.title().unwrap().as_deref(), Some("Renamed Prefixes"));
        assert_eq!(reparsed.revision().unwrap(), Some(2));
        assert_eq!(reparsed.created().unwrap(), Some(created));
        let root = reparsed.element().unwrap();
        let created_el = root.find("dcterms:created").unwrap();
        assert_eq!(created_el.attr("xsi:type"), Some("dcterms:W3CDTF"));
    }

    #[test]
    fn test_date_type_uses_document_prefix() {
        let xml = r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dct="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"/>"#;
        let mut props = CorePropertiesPart::load(
            PackURI::new(CORE_PROPERTIES_PARTNAME).unwrap(),
            ct::OPC_CORE_PROPERTIES,
            xml.as_bytes().to_vec(),
        )
        .unwrap();
        props.set_modified(Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap()).unwrap();

        let xml = String::from_utf8(props.blob().unwrap().into_owned()).unwrap();
        assert!(xml.contains(r#"<dct:modified xsi:type="dct:W3CDTF">2022-01-01T00:00:00Z</dct:modified>"#));
        assert!(reload(&props).modified().unwrap().is_some());
    }

    #[test]
    fn test_default_part() {
        let props = CorePropertiesPart::default_part().unwrap();
        assert_eq!(props.partname().as_str(), CORE_PROPERTIES_PARTNAME);
        assert_eq!(props.content_type(), ct::OPC_CORE_PROPERTIES);
        assert_eq!(props.title().unwrap().as_deref(), Some("PowerPoint Presentation"));
        assert_eq!(props.last_modified_by().unwrap().as_deref(), Some("longan"));
        assert_eq!(props.revision().unwrap(), Some(1));

        let modified = props.modified().unwrap().unwrap();
        assert!(Utc::now().signed_duration_since(modified).num_seconds() < 60);
    }

    #[test]
    fn test_parse_datetime_forms() {
        assert_eq!(parse_datetime("2020-01-02").unwrap().day(), 2);
        assert_eq!(parse_datetime("2020-01-02T03:04:05").unwrap().year(), 2020);
        assert!(parse_datetime("2020-01-02T03:04:05+02:00").is_ok());
        assert!(parse_datetime("yesterday").is_err());
    }
}
