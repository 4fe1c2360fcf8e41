//! PowerPoint (.pptx) presentation support.
//!
//! A loaded [`Package`] owns every part of the file. Slides, layouts and
//! masters are typed parts in the package's part graph and are addressed by
//! [`PartId`](crate::ooxml::opc::PartId) handles; shapes stay opaque XML.
//!
//! # Example
//!
//! ```rust,no_run
//! use longan::ooxml::opc::Part;
//! use longan::ooxml::pptx::{Package, SlideLike};
//!
//! let pkg = Package::open("presentation.pptx")?;
//! for slide in pkg.slides().iter() {
//!     let slide = slide?;
//!     println!("{}: {} shapes", slide.partname(), slide.shapes()?.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
pub mod package;
pub mod parts;
pub mod shapes;
pub mod slides;
pub mod template;

#[cfg(test)]
pub(crate) mod testing;

pub use package::Package;
pub use parts::{
    BaseSlide, CorePropertiesPart, Image, ImageCollection, ImageFormat, ImagePart, PresentationPart, Slide,
    SlideLayout, SlideLike, SlideMaster,
};
pub use shapes::{Shape, ShapeType, Shapes};
pub use slides::SlideCollection;
