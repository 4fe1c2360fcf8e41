/// Parts for PowerPoint presentation documents.
///
/// This module contains the typed parts of a .pptx package and the
/// process-wide [`PartFactory`] that builds them from content types.
pub mod coreprops;
pub mod image;
pub mod presentation;
pub mod slide;

pub use coreprops::CorePropertiesPart;
pub use image::{Image, ImageCollection, ImageFormat, ImagePart, ImageProvider, ImageStore};
pub use presentation::PresentationPart;
pub use slide::{BaseSlide, Slide, SlideLayout, SlideLike, SlideMaster};

use crate::ooxml::opc::constants::content_type as ct;
use crate::ooxml::opc::error::Result;
use crate::ooxml::opc::factory::PartFactory;
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::part::Part;
use once_cell::sync::Lazy;

/// Main-part content types accepted as a presentation.
pub const PRESENTATION_CONTENT_TYPES: &[&str] = &[
    ct::PML_PRESENTATION_MAIN,
    ct::PML_PRES_MACRO_MAIN,
    ct::PML_TEMPLATE_MAIN,
    ct::PML_SLIDESHOW_MAIN,
];

const IMAGE_CONTENT_TYPES: &[&str] = &[
    ct::BMP,
    ct::GIF,
    ct::JPEG,
    ct::PNG,
    ct::TIFF,
    ct::X_EMF,
    ct::X_WMF,
];

fn load_presentation(partname: PackURI, content_type: &str, blob: Vec<u8>) -> Result<Box<dyn Part>> {
    Ok(Box::new(PresentationPart::load(partname, content_type, blob)?))
}

fn load_slide(partname: PackURI, content_type: &str, blob: Vec<u8>) -> Result<Box<dyn Part>> {
    Ok(Box::new(Slide::load(partname, content_type, blob)?))
}

fn load_slide_layout(partname: PackURI, content_type: &str, blob: Vec<u8>) -> Result<Box<dyn Part>> {
    Ok(Box::new(SlideLayout::load(partname, content_type, blob)?))
}

fn load_slide_master(partname: PackURI, content_type: &str, blob: Vec<u8>) -> Result<Box<dyn Part>> {
    Ok(Box::new(SlideMaster::load(partname, content_type, blob)?))
}

fn load_image(partname: PackURI, content_type: &str, blob: Vec<u8>) -> Result<Box<dyn Part>> {
    Ok(Box::new(ImagePart::load(partname, content_type, blob)?))
}

fn load_core_properties(partname: PackURI, content_type: &str, blob: Vec<u8>) -> Result<Box<dyn Part>> {
    Ok(Box::new(CorePropertiesPart::load(partname, content_type, blob)?))
}

static PRESENTATION_FACTORY: Lazy<PartFactory> = Lazy::new(|| {
    let mut factory = PartFactory::new().with_fallback(true);
    for content_type in PRESENTATION_CONTENT_TYPES {
        factory.register(content_type, load_presentation);
    }
    factory
        .register(ct::PML_SLIDE, load_slide)
        .register(ct::PML_SLIDE_LAYOUT, load_slide_layout)
        .register(ct::PML_SLIDE_MASTER, load_slide_master)
        .register(ct::OPC_CORE_PROPERTIES, load_core_properties);
    for content_type in IMAGE_CONTENT_TYPES {
        factory.register(content_type, load_image);
    }
    factory
});

impl PartFactory {
    /// The registry for PresentationML packages.
    ///
    /// Built once on first use and shared for the life of the process. Unknown
    /// content types load as generic parts.
    pub fn presentation() -> &'static PartFactory {
        &PRESENTATION_FACTORY
    }
}
