/// Presentation part - the main part in a .pptx package.
///
/// Corresponds to `/ppt/presentation.xml` in the package.
use crate::ooxml::error::Result;
use crate::ooxml::opc::error::Result as OpcResult;
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::part::{Part, XmlPart, impl_part_via};
use crate::ooxml::oxml::Element;
use crate::ooxml::oxml::presentation::{self as oxml_prs, SlideId};
use tracing::debug;

/// The main presentation part.
///
/// This part contains the presentation-level properties and references to slides,
/// slide masters, and other presentation resources. Slide order is the order of
/// `p:sldIdLst`.
#[derive(Debug)]
pub struct PresentationPart {
    xml: XmlPart,
}

impl_part_via!(PresentationPart, xml);

impl PresentationPart {
    pub fn load(partname: PackURI, content_type: &str, blob: Vec<u8>) -> OpcResult<Self> {
        Ok(Self {
            xml: XmlPart::load(partname, content_type, blob)?,
        })
    }

    /// The `p:presentation` root element.
    #[inline]
    pub fn element(&self) -> Result<&Element> {
        Ok(self.xml.element()?)
    }

    #[inline]
    pub fn element_mut(&mut self) -> Result<&mut Element> {
        Ok(self.xml.element_mut()?)
    }

    /// The `p:sldId` entries in presentation order.
    pub fn slide_ids(&self) -> Result<Vec<SlideId>> {
        Ok(oxml_prs::slide_ids(self.element()?))
    }

    /// Get the number of slides in the presentation.
    pub fn slide_count(&self) -> Result<usize> {
        Ok(self.slide_ids()?.len())
    }

    /// rIds of the slide masters in `p:sldMasterIdLst` order.
    pub fn slide_master_r_ids(&self) -> Result<Vec<String>> {
        Ok(oxml_prs::slide_master_r_ids(self.element()?))
    }

    /// Append a `p:sldId` for the slide related under `r_id`; returns the new id.
    pub fn add_slide_id(&mut self, r_id: &str) -> Result<u32> {
        let id = oxml_prs::add_slide_id(self.element_mut()?, r_id)?;
        debug!(presentation = %self.partname(), id, r_id, "slide id added");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::constants::content_type as ct;
    use crate::ooxml::pptx::testing;

    fn part(xml: String) -> PresentationPart {
        PresentationPart::load(
            PackURI::new("/ppt/presentation.xml").unwrap(),
            ct::PML_PRESENTATION_MAIN,
            xml.into_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn test_slide_ids() {
        let prs = part(testing::presentation_xml(2));
        let ids = prs.slide_ids().unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].id, 256);
        assert_eq!(prs.slide_count().unwrap(), 2);
        assert_eq!(prs.slide_master_r_ids().unwrap(), vec!["rId1".to_string()]);
    }

    #[test]
    fn test_add_slide_id() {
        let mut prs = part(testing::presentation_xml(0));
        assert_eq!(prs.slide_count().unwrap(), 0);
        assert_eq!(prs.add_slide_id("rId5").unwrap(), 256);
        assert_eq!(prs.add_slide_id("rId6").unwrap(), 257);

        let reparsed = Element::parse(&prs.blob().unwrap()).unwrap();
        assert_eq!(oxml_prs::slide_ids(&reparsed).len(), 2);
    }
}
