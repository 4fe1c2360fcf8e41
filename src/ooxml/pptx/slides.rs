/// The slides of a presentation, in presentation order.
///
/// [`SlideCollection`] keeps no state of its own: the presentation's
/// `p:sldIdLst` decides length and order, and every access resolves the
/// `r:id` of an entry through the presentation's relationships.
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::relationship_type as rt;
use crate::ooxml::opc::graph::PartGraph;
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::part::{Part, PartId};
use crate::ooxml::pptx::parts::{PresentationPart, Slide, SlideLayout};
use std::collections::HashSet;
use std::ops::Deref;
use tracing::debug;

/// Partname template for slides.
pub const SLIDE_PARTNAME_TEMPLATE: &str = "/ppt/slides/slide%d.xml";

/// View over the slides of the presentation part `presentation` in `graph`.
///
/// Read with `G = &PartGraph`, where slides borrow the graph rather than the
/// view; add or rename slides with `G = &mut PartGraph`.
#[derive(Debug)]
pub struct SlideCollection<G> {
    graph: G,
    presentation: PartId,
}

impl<G: Deref<Target = PartGraph>> SlideCollection<G> {
    pub fn new(graph: G, presentation: PartId) -> Self {
        Self { graph, presentation }
    }

    fn presentation(&self) -> Result<&PresentationPart> {
        Ok(self.graph.get_as::<PresentationPart>(self.presentation)?)
    }

    fn slide_id_for(&self, r_id: &str) -> Result<PartId> {
        let id = self.presentation()?.related_part_id(r_id)?;
        self.graph.get_as::<Slide>(id)?;
        Ok(id)
    }

    /// Number of slides.
    pub fn len(&self) -> Result<usize> {
        self.presentation()?.slide_count()
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Handle of the slide at `index`.
    pub fn id_at(&self, index: usize) -> Result<PartId> {
        let slide_ids = self.presentation()?.slide_ids()?;
        let entry = slide_ids.get(index).ok_or(OoxmlError::IndexOutOfRange {
            index,
            len: slide_ids.len(),
        })?;
        self.slide_id_for(&entry.r_id)
    }

    /// Handles of every slide, in presentation order.
    pub fn ids(&self) -> Result<Vec<PartId>> {
        self.presentation()?
            .slide_ids()?
            .iter()
            .map(|entry| self.slide_id_for(&entry.r_id))
            .collect()
    }

    /// Slide handles in id-list order, resolved one entry at a time.
    fn into_slide_ids(self) -> impl Iterator<Item = Result<PartId>> {
        let (entries, failure) = match self.presentation().and_then(PresentationPart::slide_ids) {
            Ok(entries) => (entries, None),
            Err(e) => (Vec::new(), Some(e)),
        };
        failure
            .into_iter()
            .map(Err)
            .chain(entries.into_iter().map(move |entry| self.slide_id_for(&entry.r_id)))
    }
}

impl<'g> SlideCollection<&'g PartGraph> {
    /// The slide at `index`.
    pub fn get(&self, index: usize) -> Result<&'g Slide> {
        let graph: &'g PartGraph = self.graph;
        let id = self.id_at(index)?;
        Ok(graph.get_as::<Slide>(id)?)
    }

    /// Slides in presentation order.
    ///
    /// Each call starts again from the current slide id list.
    pub fn iter(&self) -> impl Iterator<Item = Result<&'g Slide>> + use<'g> {
        let graph: &'g PartGraph = self.graph;
        SlideCollection::new(graph, self.presentation)
            .into_slide_ids()
            .map(move |id| -> Result<&'g Slide> { Ok(graph.get_as::<Slide>(id?)?) })
    }
}

impl<'g> SlideCollection<&'g mut PartGraph> {
    fn view(&self) -> SlideCollection<&PartGraph> {
        SlideCollection::new(&*self.graph, self.presentation)
    }

    /// The slide at `index`.
    pub fn get(&self, index: usize) -> Result<&Slide> {
        self.view().get(index)
    }

    /// Slides in presentation order.
    pub fn iter(&self) -> impl Iterator<Item = Result<&Slide>> + '_ {
        self.view().iter()
    }

    /// Add a new empty slide based on `layout` at the end of the presentation.
    ///
    /// The slide gets the next free `/ppt/slides/slideN.xml` partname. Returns
    /// its handle.
    pub fn add_slide(&mut self, layout: PartId) -> Result<PartId> {
        self.graph.get_as::<SlideLayout>(layout)?;

        let partname = self.graph.next_partname(SLIDE_PARTNAME_TEMPLATE)?;
        debug!(%partname, %layout, "adding slide");
        let slide = self.graph.add(Box::new(Slide::new(layout, partname)));

        let presentation = self.graph.get_as_mut::<PresentationPart>(self.presentation)?;
        let r_id = presentation.relate_to(slide, rt::SLIDE);
        presentation.add_slide_id(&r_id)?;
        Ok(slide)
    }

    /// Rename slides to `slide1.xml`, `slide2.xml`, ... in presentation order.
    ///
    /// Slide parts missing from the id list keep their relative order and are
    /// numbered after the listed ones, so no two slides share a partname.
    pub fn rename_slides(&mut self) -> Result<()> {
        let mut seen = HashSet::new();
        let mut ordered: Vec<PartId> = self.ids()?.into_iter().filter(|id| seen.insert(*id)).collect();
        let listed = ordered.len();

        let mut unlisted: Vec<PartId> = self
            .graph
            .ids_of::<Slide>()
            .into_iter()
            .filter(|id| !seen.contains(id))
            .collect();
        unlisted.sort_by_key(|id| self.graph.partname_of(*id).ok().and_then(|p| p.idx()));
        ordered.extend(unlisted);

        for (i, id) in ordered.iter().enumerate() {
            let partname = PackURI::new(SLIDE_PARTNAME_TEMPLATE.replace("%d", &(i + 1).to_string()))?;
            self.graph.get_mut(*id)?.set_partname(partname);
        }
        debug!(slides = listed, unlisted = ordered.len() - listed, "slides renamed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::OpcPackage;
    use crate::ooxml::opc::constants::content_type as ct;
    use crate::ooxml::pptx::parts::SlideLike;
    use crate::ooxml::pptx::testing;

    fn package(bytes: Vec<u8>) -> (OpcPackage, PartId) {
        let pkg = OpcPackage::from_bytes(bytes, crate::ooxml::opc::PartFactory::presentation()).unwrap();
        let presentation = pkg.main_document_part().unwrap();
        (pkg, presentation)
    }

    fn layout_id(pkg: &OpcPackage, n: u32) -> PartId {
        let partname = PackURI::new(format!("/ppt/slideLayouts/slideLayout{}.xml", n)).unwrap();
        pkg.graph().find(&partname).unwrap()
    }

    #[test]
    fn test_len_and_get() {
        let (pkg, presentation) = package(testing::pptx_bytes());
        let slides = SlideCollection::new(pkg.graph(), presentation);

        assert_eq!(slides.len().unwrap(), 2);
        assert!(!slides.is_empty().unwrap());
        assert_eq!(slides.get(0).unwrap().partname().as_str(), "/ppt/slides/slide1.xml");
        assert_eq!(slides.get(1).unwrap().partname().as_str(), "/ppt/slides/slide2.xml");
        assert!(matches!(
            slides.get(2),
            Err(OoxmlError::IndexOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn test_iter_follows_id_list() {
        let (pkg, presentation) = package(testing::pptx_bytes_reversed());
        let slides = SlideCollection::new(pkg.graph(), presentation);

        let names: Vec<String> = slides
            .iter()
            .map(|slide| slide.unwrap().partname().to_string())
            .collect();
        assert_eq!(names, ["/ppt/slides/slide2.xml", "/ppt/slides/slide1.xml"]);
        // Restartable
        assert_eq!(slides.iter().count(), 2);
    }

    #[test]
    fn test_add_slide() {
        let (mut pkg, presentation) = package(testing::pptx_bytes());
        let layout = layout_id(&pkg, 2);

        let mut slides = SlideCollection::new(pkg.graph_mut(), presentation);
        let id = slides.add_slide(layout).unwrap();
        assert_eq!(slides.len().unwrap(), 3);
        assert_eq!(slides.id_at(2).unwrap(), id);

        let slide = slides.get(2).unwrap();
        assert_eq!(slide.partname().as_str(), "/ppt/slides/slide3.xml");
        assert_eq!(slide.content_type(), ct::PML_SLIDE);
        assert_eq!(slide.slide_layout().unwrap(), layout);
        assert_eq!(slide.shapes().unwrap().len(), 0);

        let prs = pkg.graph().get_as::<PresentationPart>(presentation).unwrap();
        let last = prs.slide_ids().unwrap().pop().unwrap();
        assert_eq!(last.id, 258);
        assert_eq!(prs.related_part_id(&last.r_id).unwrap(), id);
    }

    #[test]
    fn test_add_slide_requires_layout() {
        let (mut pkg, presentation) = package(testing::pptx_bytes());
        let mut slides = SlideCollection::new(pkg.graph_mut(), presentation);
        let not_layout = slides.id_at(0).unwrap();
        assert!(slides.add_slide(not_layout).is_err());
        assert_eq!(slides.len().unwrap(), 2);
    }

    #[test]
    fn test_rename_slides() {
        let (mut pkg, presentation) = package(testing::pptx_bytes_reversed());
        let mut slides = SlideCollection::new(pkg.graph_mut(), presentation);
        slides.rename_slides().unwrap();

        let names: Vec<String> = slides
            .iter()
            .map(|slide| slide.unwrap().partname().to_string())
            .collect();
        assert_eq!(names, ["/ppt/slides/slide1.xml", "/ppt/slides/slide2.xml"]);
        // The slide now named slide1.xml is the one-shape slide.
        assert_eq!(slides.get(0).unwrap().shapes().unwrap().len(), 1);
    }

    #[test]
    fn test_rename_skips_names_of_unlisted_slides() {
        let mut entries = testing::entries(false);
        for (name, data) in entries.iter_mut() {
            if name == "ppt/presentation.xml" {
                *data = String::from_utf8(data.clone())
                    .unwrap()
                    .replace(r#"<p:sldId id="256" r:id="rId2"/>"#, "")
                    .into_bytes();
            }
        }
        let (mut pkg, presentation) = package(testing::zip(&entries));
        let mut slides = SlideCollection::new(pkg.graph_mut(), presentation);
        assert_eq!(slides.len().unwrap(), 1);
        slides.rename_slides().unwrap();

        // The listed one-shape slide takes slide1.xml; the unlisted one moves up.
        let listed = slides.get(0).unwrap();
        assert_eq!(listed.partname().as_str(), "/ppt/slides/slide1.xml");
        assert_eq!(listed.shapes().unwrap().len(), 1);

        let mut names: Vec<String> = pkg
            .graph()
            .ids_of::<Slide>()
            .into_iter()
            .map(|id| pkg.graph().partname_of(id).unwrap().to_string())
            .collect();
        names.sort();
        assert_eq!(names, ["/ppt/slides/slide1.xml", "/ppt/slides/slide2.xml"]);
    }

    #[test]
    fn test_shared_view_slides_outlive_view() {
        let (pkg, presentation) = package(testing::pptx_bytes());
        let first = SlideCollection::new(pkg.graph(), presentation).get(0).unwrap();
        let all: Vec<&Slide> = SlideCollection::new(pkg.graph(), presentation)
            .iter()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(all.len(), 2);
        assert!(std::ptr::eq(first, all[0]));
    }
}
