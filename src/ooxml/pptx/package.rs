/// Package implementation for PowerPoint presentations.
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
use crate::ooxml::opc::factory::PartFactory;
use crate::ooxml::opc::graph::PartGraph;
use crate::ooxml::opc::package::{LoadOptions, OpcPackage, SaveOptions};
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::part::{Part, PartId};
use crate::ooxml::pptx::parts::slide::as_base_slide_mut;
use crate::ooxml::pptx::parts::{
    CorePropertiesPart, Image, ImageCollection, ImageStore, PRESENTATION_CONTENT_TYPES, PresentationPart,
    SlideLayout, SlideMaster,
};
use crate::ooxml::pptx::slides::SlideCollection;
use crate::ooxml::pptx::template;
use std::borrow::Cow;
use std::io::{Read, Seek, Write};
use std::path::Path;
use tracing::debug;

/// A PowerPoint (.pptx) package.
///
/// This is the main entry point for working with PowerPoint presentations.
/// It wraps an OPC package and provides PowerPoint-specific functionality.
///
/// # Examples
///
/// ```rust,no_run
/// use longan::ooxml::pptx::Package;
///
/// let mut pkg = Package::open("presentation.pptx")?;
/// println!("Presentation has {} slides", pkg.slides().len()?);
///
/// let layout = pkg.slide_layouts(pkg.slide_masters()?[0])?[0];
/// pkg.slides_mut().add_slide(layout)?;
/// pkg.save("presentation.pptx")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Package {
    /// The underlying OPC package
    opc: OpcPackage,

    /// The main presentation part
    presentation: PartId,

    /// Image parts keyed by content hash
    images: ImageCollection,
}

impl Package {
    /// Create a presentation with one slide master, one layout and no slides.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use longan::ooxml::pptx::Package;
    ///
    /// let mut pkg = Package::new()?;
    /// let layout = pkg.slide_layouts(pkg.slide_masters()?[0])?[0];
    /// pkg.slides_mut().add_slide(layout)?;
    /// pkg.save("new.pptx")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new() -> Result<Self> {
        let factory = PartFactory::presentation();
        let mut opc = OpcPackage::new();

        let mut add = |partname: &str, content_type: &str, xml: &str| -> Result<PartId> {
            let part = factory.load(PackURI::new(partname)?, content_type, xml.as_bytes().to_vec())?;
            Ok(opc.add_part(part))
        };
        let presentation = add(
            "/ppt/presentation.xml",
            ct::PML_PRESENTATION_MAIN,
            template::default_presentation_xml(),
        )?;
        let master = add(
            "/ppt/slideMasters/slideMaster1.xml",
            ct::PML_SLIDE_MASTER,
            template::default_slide_master_xml(),
        )?;
        let layout = add(
            "/ppt/slideLayouts/slideLayout1.xml",
            ct::PML_SLIDE_LAYOUT,
            template::default_slide_layout_xml(),
        )?;
        let theme = add("/ppt/theme/theme1.xml", ct::OFC_THEME, template::default_theme_xml())?;

        // Relationship order matches the rIds in the template XML.
        let graph = opc.graph_mut();
        let part = graph.get_mut(presentation)?;
        part.relate_to(master, rt::SLIDE_MASTER);
        part.relate_to(theme, rt::THEME);
        let part = graph.get_mut(master)?;
        part.relate_to(layout, rt::SLIDE_LAYOUT);
        part.relate_to(theme, rt::THEME);
        graph.get_mut(layout)?.relate_to(master, rt::SLIDE_MASTER);

        opc.relate_to(presentation, rt::OFFICE_DOCUMENT);
        let core = opc.add_part(Box::new(CorePropertiesPart::default_part()?));
        opc.relate_to(core, rt::CORE_PROPERTIES);

        debug!(parts = opc.part_count(), "creating presentation");
        Self::from_opc(opc, &LoadOptions::default())
    }

    /// Open a .pptx package from a file path or an extracted package directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, &LoadOptions::default())
    }

    /// Open a .pptx package with explicit load options.
    pub fn open_with<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Self> {
        let opc = OpcPackage::open(path, &Self::factory(options))?;
        Self::from_opc(opc, options)
    }

    /// Create a .pptx package from a reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::from_reader_with(reader, &LoadOptions::default())
    }

    pub fn from_reader_with<R: Read + Seek>(reader: R, options: &LoadOptions) -> Result<Self> {
        let opc = OpcPackage::from_reader(reader, &Self::factory(options))?;
        Self::from_opc(opc, options)
    }

    /// Create a .pptx package from the bytes of a .pptx file.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_bytes_with(data, &LoadOptions::default())
    }

    pub fn from_bytes_with(data: Vec<u8>, options: &LoadOptions) -> Result<Self> {
        let opc = OpcPackage::from_bytes(data, &Self::factory(options))?;
        Self::from_opc(opc, options)
    }

    fn factory(options: &LoadOptions) -> Cow<'static, PartFactory> {
        let factory = PartFactory::presentation();
        if options.allow_unknown_content_types {
            Cow::Borrowed(factory)
        } else {
            Cow::Owned(factory.clone().with_fallback(false))
        }
    }

    /// Wrap a loaded OPC package, checking that its main part is a presentation.
    fn from_opc(opc: OpcPackage, options: &LoadOptions) -> Result<Self> {
        let presentation = opc
            .main_document_part()
            .map_err(|e| OoxmlError::PartNotFound(format!("main presentation part: {}", e)))?;

        if !opc.graph().is::<PresentationPart>(presentation) {
            return Err(OoxmlError::InvalidContentType {
                expected: PRESENTATION_CONTENT_TYPES.join(" or "),
                got: opc.graph().get(presentation)?.content_type().to_string(),
            });
        }

        let mut package = Self {
            opc,
            presentation,
            images: ImageCollection::new(),
        };
        package.after_unmarshal(options)?;
        Ok(package)
    }

    /// Post-load pass, run once every part and relationship is in place.
    ///
    /// Layouts resolve their master, image parts are indexed, and slides are
    /// optionally renamed to match presentation order.
    fn after_unmarshal(&mut self, options: &LoadOptions) -> Result<()> {
        let graph = self.opc.graph();
        let layouts = graph.ids_of::<SlideLayout>();
        for id in &layouts {
            graph.get_as::<SlideLayout>(*id)?.resolve_slide_master(graph)?;
        }
        self.images.rebuild(graph);

        if options.rename_slides_on_load {
            self.slides_mut().rename_slides()?;
        }

        debug!(
            parts = self.opc.part_count(),
            layouts = layouts.len(),
            images = self.images.len(),
            "presentation loaded"
        );
        Ok(())
    }

    /// Save the package to `path`, replacing any existing file atomically.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save_with(path, &SaveOptions::default())
    }

    pub fn save_with<P: AsRef<Path>>(&self, path: P, options: &SaveOptions) -> Result<()> {
        Ok(self.opc.save(path, options)?)
    }

    /// Serialize the package to the bytes of a .pptx file.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.opc.to_bytes(&SaveOptions::default())?)
    }

    /// Serialize the package into `writer`.
    pub fn write_to<W: Write>(&self, writer: W, options: &SaveOptions) -> Result<()> {
        Ok(self.opc.write_to(writer, options)?)
    }

    /// The underlying OPC package.
    #[inline]
    pub fn opc(&self) -> &OpcPackage {
        &self.opc
    }

    /// All parts of the package.
    #[inline]
    pub fn graph(&self) -> &PartGraph {
        self.opc.graph()
    }

    #[inline]
    pub fn graph_mut(&mut self) -> &mut PartGraph {
        self.opc.graph_mut()
    }

    /// Handle of the main presentation part.
    #[inline]
    pub fn presentation_id(&self) -> PartId {
        self.presentation
    }

    /// The main presentation part.
    pub fn presentation(&self) -> Result<&PresentationPart> {
        Ok(self.opc.graph().get_as::<PresentationPart>(self.presentation)?)
    }

    pub fn presentation_mut(&mut self) -> Result<&mut PresentationPart> {
        Ok(self
            .opc
            .graph_mut()
            .get_as_mut::<PresentationPart>(self.presentation)?)
    }

    /// The slides, in presentation order.
    pub fn slides(&self) -> SlideCollection<&PartGraph> {
        SlideCollection::new(self.opc.graph(), self.presentation)
    }

    /// The slides, for adding or renaming.
    pub fn slides_mut(&mut self) -> SlideCollection<&mut PartGraph> {
        SlideCollection::new(self.opc.graph_mut(), self.presentation)
    }

    /// The slide masters in `p:sldMasterIdLst` order.
    pub fn slide_masters(&self) -> Result<Vec<PartId>> {
        let presentation = self.presentation()?;
        presentation
            .slide_master_r_ids()?
            .iter()
            .map(|r_id| -> Result<PartId> {
                let id = presentation.related_part_id(r_id)?;
                self.graph().get_as::<SlideMaster>(id)?;
                Ok(id)
            })
            .collect()
    }

    /// The layouts belonging to `master`, ordered by partname.
    pub fn slide_layouts(&self, master: PartId) -> Result<&[PartId]> {
        let graph = self.graph();
        Ok(graph.get_as::<SlideMaster>(master)?.slide_layouts(graph))
    }

    /// The image parts of the package.
    #[inline]
    pub fn images(&self) -> &ImageCollection {
        &self.images
    }

    /// Embed `image` in a slide, layout or master.
    ///
    /// Identical image bytes share one image part. Returns the image part and
    /// the rId the slide uses for it.
    pub fn add_image(&mut self, slide: PartId, image: &Image) -> Result<(PartId, String)> {
        let mut part = self.opc.graph_mut().take(slide)?;
        let content_type = part.content_type().to_string();

        let result = match as_base_slide_mut(part.as_mut()) {
            Some(base) => {
                let mut store = ImageStore::new(&mut self.images, self.opc.graph_mut());
                base.add_image(&mut store, image)
            },
            None => Err(OoxmlError::InvalidContentType {
                expected: "slide, slide layout or slide master".to_string(),
                got: content_type,
            }),
        };

        self.opc.graph_mut().restore(slide, part)?;
        result
    }

    /// The core document properties, if the package has them.
    pub fn core_properties(&self) -> Result<Option<&CorePropertiesPart>> {
        match self.opc.part_by_reltype(rt::CORE_PROPERTIES) {
            Ok(id) => Ok(Some(self.opc.graph().get_as::<CorePropertiesPart>(id)?)),
            Err(_) => Ok(None),
        }
    }

    /// The core document properties, created with defaults if the package has none.
    pub fn core_properties_mut(&mut self) -> Result<&mut CorePropertiesPart> {
        let id = match self.opc.part_by_reltype(rt::CORE_PROPERTIES) {
            Ok(id) => id,
            Err(_) => {
                let part = CorePropertiesPart::default_part()?;
                debug!(partname = %part.partname(), "creating core properties");
                let id = self.opc.add_part(Box::new(part));
                self.opc.relate_to(id, rt::CORE_PROPERTIES);
                id
            },
        };
        Ok(self.opc.graph_mut().get_as_mut::<CorePropertiesPart>(id)?)
    }
}
