/// Slide parts and related types.
///
/// This module contains parts for slides, slide layouts, and slide masters.
/// The three share [`BaseSlide`], which owns the XML and the behaviour common
/// to anything with a `p:cSld` shape tree.
///
/// The chain between them is held in relationships: a slide relates to its
/// layout (`SLIDE_LAYOUT`), a layout to its master (`SLIDE_MASTER`).
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
use crate::ooxml::opc::error::Result as OpcResult;
use crate::ooxml::opc::graph::PartGraph;
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::part::{Part, PartId, XmlPart, impl_part_via};
use crate::ooxml::oxml::Element;
use crate::ooxml::oxml::slide::{c_sld_name, new_slide, sp_tree};
use crate::ooxml::pptx::parts::image::{Image, ImageProvider};
use crate::ooxml::pptx::shapes::Shapes;
use once_cell::unsync::OnceCell;
use tracing::{debug, trace};

/// Behaviour shared by slides, slide layouts and slide masters.
#[derive(Debug)]
pub struct BaseSlide {
    xml: XmlPart,
}

impl_part_via!(BaseSlide, xml);

impl BaseSlide {
    /// Load from raw XML; the tree is parsed on first access.
    pub fn load(partname: PackURI, content_type: &str, blob: Vec<u8>) -> OpcResult<Self> {
        Ok(Self {
            xml: XmlPart::load(partname, content_type, blob)?,
        })
    }

    /// Wrap an already-built element tree.
    pub fn new(partname: PackURI, content_type: &str, element: Element) -> Self {
        Self {
            xml: XmlPart::new(partname, content_type, element),
        }
    }

    /// The root element (`p:sld`, `p:sldLayout` or `p:sldMaster`).
    #[inline]
    pub fn element(&self) -> Result<&Element> {
        Ok(self.xml.element()?)
    }

    #[inline]
    pub fn element_mut(&mut self) -> Result<&mut Element> {
        Ok(self.xml.element_mut()?)
    }

    /// Get the slide name.
    ///
    /// Returns the name attribute of `p:cSld`, or an empty string when it is
    /// absent.
    pub fn name(&self) -> Result<String> {
        Ok(c_sld_name(self.element()?).to_string())
    }

    /// The shapes in this slide's shape tree, in document order.
    pub fn shapes(&self) -> Result<Shapes<'_>> {
        Ok(Shapes::new(sp_tree(self.element()?)))
    }

    /// Embed an image in this slide.
    ///
    /// `provider` returns the image part for these bytes, creating it only when
    /// no identical image exists. Returns the image part and the rId under which
    /// this slide refers to it.
    pub fn add_image(&mut self, provider: &mut dyn ImageProvider, image: &Image) -> Result<(PartId, String)> {
        let image_id = provider.get_or_add_image(image)?;
        let r_id = self.relate_to(image_id, rt::IMAGE);
        debug!(slide = %self.partname(), %image_id, r_id = %r_id, "image related");
        Ok((image_id, r_id))
    }
}

/// Read access common to every slide-like part.
pub trait SlideLike: Part {
    fn base(&self) -> &BaseSlide;

    fn base_mut(&mut self) -> &mut BaseSlide;

    /// Name from `p:cSld@name`.
    fn name(&self) -> Result<String> {
        self.base().name()
    }

    /// The shape tree view.
    fn shapes(&self) -> Result<Shapes<'_>> {
        self.base().shapes()
    }

    /// The part backing this slide, which is the slide itself.
    fn part(&self) -> &dyn Part
    where
        Self: Sized,
    {
        self
    }
}

/// Borrow the [`BaseSlide`] of any slide-like part.
pub fn as_base_slide(part: &dyn Part) -> Option<&BaseSlide> {
    let any = part.as_any();
    if let Some(slide) = any.downcast_ref::<Slide>() {
        return Some(slide.base());
    }
    if let Some(layout) = any.downcast_ref::<SlideLayout>() {
        return Some(layout.base());
    }
    any.downcast_ref::<SlideMaster>().map(SlideLike::base)
}

/// Mutable form of [`as_base_slide`].
pub fn as_base_slide_mut(part: &mut dyn Part) -> Option<&mut BaseSlide> {
    let any = part.as_any_mut();
    if any.is::<Slide>() {
        return any.downcast_mut::<Slide>().map(SlideLike::base_mut);
    }
    if any.is::<SlideLayout>() {
        return any.downcast_mut::<SlideLayout>().map(SlideLike::base_mut);
    }
    any.downcast_mut::<SlideMaster>().map(SlideLike::base_mut)
}

/// A slide part.
///
/// Corresponds to `/ppt/slides/slideN.xml` in the package.
#[derive(Debug)]
pub struct Slide {
    base: BaseSlide,
}

impl_part_via!(Slide, base);

impl SlideLike for Slide {
    fn base(&self) -> &BaseSlide {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseSlide {
        &mut self.base
    }
}

impl Slide {
    pub fn load(partname: PackURI, content_type: &str, blob: Vec<u8>) -> OpcResult<Self> {
        Ok(Self {
            base: BaseSlide::load(partname, content_type, blob)?,
        })
    }

    /// A new, empty slide based on `layout`.
    ///
    /// The slide carries a bare shape tree and a single relationship, to its
    /// layout.
    pub fn new(layout: PartId, partname: PackURI) -> Self {
        let mut slide = Self {
            base: BaseSlide::new(partname, ct::PML_SLIDE, new_slide()),
        };
        slide.relate_to(layout, rt::SLIDE_LAYOUT);
        slide
    }

    /// The layout this slide inherits from.
    pub fn slide_layout(&self) -> Result<PartId> {
        Ok(self.rels().part_with_reltype(rt::SLIDE_LAYOUT)?.target_part()?)
    }
}

/// A slide layout part.
///
/// Corresponds to `/ppt/slideLayouts/slideLayoutN.xml`.
#[derive(Debug)]
pub struct SlideLayout {
    base: BaseSlide,
    master: OnceCell<PartId>,
}

impl_part_via!(SlideLayout, base);

impl SlideLike for SlideLayout {
    fn base(&self) -> &BaseSlide {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseSlide {
        &mut self.base
    }
}

impl SlideLayout {
    pub fn load(partname: PackURI, content_type: &str, blob: Vec<u8>) -> OpcResult<Self> {
        Ok(Self {
            base: BaseSlide::load(partname, content_type, blob)?,
            master: OnceCell::new(),
        })
    }

    /// Find this layout's master and cache it.
    ///
    /// Runs once relationships are wired; the master relationship must target
    /// a [`SlideMaster`].
    pub fn resolve_slide_master(&self, graph: &PartGraph) -> Result<PartId> {
        let master = self
            .rels()
            .part_with_reltype(rt::SLIDE_MASTER)?
            .target_part()?;
        graph.get_as::<SlideMaster>(master)?;
        let master = *self.master.get_or_init(|| master);
        trace!(layout = %self.partname(), %master, "slide master resolved");
        Ok(master)
    }

    /// The master resolved by [`SlideLayout::resolve_slide_master`].
    pub fn slide_master(&self) -> Result<PartId> {
        self.master.get().copied().ok_or_else(|| {
            OoxmlError::Unresolved(format!("slide master of {}", self.partname()))
        })
    }
}

/// A slide master part.
///
/// Corresponds to `/ppt/slideMasters/slideMasterN.xml`.
#[derive(Debug)]
pub struct SlideMaster {
    base: BaseSlide,
    layouts: OnceCell<Vec<PartId>>,
}

impl_part_via!(SlideMaster, base);

impl SlideLike for SlideMaster {
    fn base(&self) -> &BaseSlide {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseSlide {
        &mut self.base
    }
}

impl SlideMaster {
    pub fn load(partname: PackURI, content_type: &str, blob: Vec<u8>) -> OpcResult<Self> {
        Ok(Self {
            base: BaseSlide::load(partname, content_type, blob)?,
            layouts: OnceCell::new(),
        })
    }

    /// The layouts whose master relationship targets this master.
    ///
    /// Found by scanning every layout in `graph` on first call and cached
    /// afterwards. Ordered by partname index.
    pub fn slide_layouts(&self, graph: &PartGraph) -> &[PartId] {
        self.layouts.get_or_init(|| {
            let mut layouts: Vec<(Option<u32>, PartId)> = graph
                .ids_of::<SlideLayout>()
                .into_iter()
                .filter_map(|id| {
                    let layout = graph.get_as::<SlideLayout>(id).ok()?;
                    let target = layout
                        .rels()
                        .part_with_reltype(rt::SLIDE_MASTER)
                        .ok()?
                        .target_part()
                        .ok()?;
                    let is_ours = graph
                        .get(target)
                        .is_ok_and(|master| master.partname() == self.partname());
                    is_ours.then(|| (layout.partname().idx(), id))
                })
                .collect();
            layouts.sort_unstable();
            layouts.into_iter().map(|(_, id)| id).collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::pptx::parts::image::{ImageCollection, ImagePart, ImageStore};
    use crate::ooxml::pptx::testing;

    fn layout(n: u32) -> SlideLayout {
        let partname = PackURI::new(format!("/ppt/slideLayouts/slideLayout{}.xml", n)).unwrap();
        SlideLayout::load(partname, ct::PML_SLIDE_LAYOUT, testing::layout_xml("Title Slide").into_bytes()).unwrap()
    }

    fn master() -> SlideMaster {
        let partname = PackURI::new("/ppt/slideMasters/slideMaster1.xml").unwrap();
        SlideMaster::load(partname, ct::PML_SLIDE_MASTER, testing::master_xml().into_bytes()).unwrap()
    }

    #[test]
    fn test_base_slide_name() {
        assert_eq!(layout(1).name().unwrap(), "Title Slide");

        let unnamed = Slide::new(PartId::new(0), PackURI::new("/ppt/slides/slide1.xml").unwrap());
        assert_eq!(unnamed.name().unwrap(), "");
    }

    #[test]
    fn test_shapes_count() {
        let partname = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        let slide = Slide::load(partname, ct::PML_SLIDE, testing::slide_xml(9).into_bytes()).unwrap();
        assert_eq!(slide.shapes().unwrap().len(), 9);
    }

    #[test]
    fn test_part_is_self() {
        let slide = Slide::new(PartId::new(0), PackURI::new("/ppt/slides/slide1.xml").unwrap());
        assert!(std::ptr::addr_eq(slide.part() as *const dyn Part, &slide as *const Slide));
    }

    #[test]
    fn test_new_slide_relates_to_layout() {
        let layout_id = PartId::new(3);
        let slide = Slide::new(layout_id, PackURI::new("/ppt/slides/slide1.xml").unwrap());

        assert_eq!(slide.content_type(), ct::PML_SLIDE);
        assert_eq!(slide.rels().len(), 1);
        assert_eq!(slide.slide_layout().unwrap(), layout_id);
        assert_eq!(
            slide.base().element().unwrap(),
            &crate::ooxml::oxml::slide::new_slide()
        );
    }

    #[test]
    fn test_layout_master_resolution() {
        let mut graph = PartGraph::new();
        let master_id = graph.add(Box::new(master()));
        let mut layout = layout(1);

        assert!(matches!(layout.slide_master(), Err(OoxmlError::Unresolved(_))));

        layout.relate_to(master_id, rt::SLIDE_MASTER);
        assert_eq!(layout.resolve_slide_master(&graph).unwrap(), master_id);
        assert_eq!(layout.slide_master().unwrap(), master_id);
    }

    #[test]
    fn test_layout_master_must_be_a_master() {
        let mut graph = PartGraph::new();
        let not_master = graph.add(Box::new(layout(2)));
        let mut layout = layout(1);
        layout.relate_to(not_master, rt::SLIDE_MASTER);

        assert!(layout.resolve_slide_master(&graph).is_err());
        assert!(layout.slide_master().is_err());
    }

    #[test]
    fn test_master_has_no_layouts_on_construction() {
        let graph = PartGraph::new();
        assert!(master().slide_layouts(&graph).is_empty());
    }

    #[test]
    fn test_master_layouts_are_ordered() {
        let mut graph = PartGraph::new();
        let master_id = graph.add(Box::new(master()));
        for n in [3, 1, 2] {
            let mut layout = layout(n);
            layout.relate_to(master_id, rt::SLIDE_MASTER);
            graph.add(Box::new(layout));
        }

        let master = graph.get_as::<SlideMaster>(master_id).unwrap();
        let names: Vec<String> = master
            .slide_layouts(&graph)
            .iter()
            .map(|id| graph.partname_of(*id).unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            [
                "/ppt/slideLayouts/slideLayout1.xml",
                "/ppt/slideLayouts/slideLayout2.xml",
                "/ppt/slideLayouts/slideLayout3.xml",
            ]
        );
    }

    #[test]
    fn test_add_image() {
        let mut graph = PartGraph::new();
        let mut images = ImageCollection::new();
        let mut slide = Slide::new(PartId::new(0), PackURI::new("/ppt/slides/slide1.xml").unwrap());
        let image = Image::from_bytes(testing::PNG.to_vec()).unwrap();

        let (image_id, r_id) = {
            let mut store = ImageStore::new(&mut images, &mut graph);
            slide.base_mut().add_image(&mut store, &image).unwrap()
        };

        assert_eq!(r_id, "rId2");
        assert_eq!(slide.related_part_id(&r_id).unwrap(), image_id);
        assert!(graph.get_as::<ImagePart>(image_id).is_ok());

        // Same bytes, same part and relationship.
        let mut store = ImageStore::new(&mut images, &mut graph);
        let again = slide.base_mut().add_image(&mut store, &image).unwrap();
        assert_eq!(again, (image_id, r_id));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_as_base_slide() {
        let slide: Box<dyn Part> = Box::new(layout(1));
        assert!(as_base_slide(slide.as_ref()).is_some());

        let mut blob: Box<dyn Part> = Box::new(crate::ooxml::opc::part::BlobPart::new(
            PackURI::new("/ppt/media/image1.png").unwrap(),
            ct::PNG,
            vec![],
        ));
        assert!(as_base_slide_mut(blob.as_mut()).is_none());
    }
}
