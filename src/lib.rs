//! Longan - an in-memory object model for PowerPoint (.pptx) packages
//!
//! This library loads a PresentationML package into a graph of typed parts
//! connected by relationships, lets callers inspect and modify it, and writes
//! it back out as a valid package.
//!
//! # Features
//!
//! - **OPC layer**: ZIP and extracted-directory packages, content types, relationships
//! - **Lazy XML parts**: part XML is parsed on first access, untouched parts are saved verbatim
//! - **Slides**: slide collection in presentation order, layouts and masters linked on load
//! - **Images**: content-addressed image parts shared between slides
//! - **Core properties**: read, edit or create `docProps/core.xml`
//!
//! # Example
//!
//! ```no_run
//! use longan::ooxml::pptx::Package;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut pkg = Package::open("presentation.pptx")?;
//!
//! let master = pkg.slide_masters()?[0];
//! let layout = pkg.slide_layouts(master)?[0];
//! let slide = pkg.slides_mut().add_slide(layout)?;
//! println!("added {}", pkg.graph().partname_of(slide)?);
//!
//! pkg.save("presentation.pptx")?;
//! # Ok(())
//! # }
//! ```

/// Helpers shared across the crate
pub mod common;

/// OOXML (Office Open XML) presentation packages
///
/// This module provides the package, XML and presentation layers.
pub mod ooxml;

// Re-export commonly used types for convenience
pub use ooxml::pptx::{Package, Slide, SlideLayout, SlideMaster};
pub use ooxml::{OoxmlError, Result};
