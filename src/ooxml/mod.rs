//! Office Open XML (OOXML) presentation packages.
//!
//! The module is organized into layers:
//!
//! 1. **OPC layer** (`opc`): package handling (ZIP, parts, relationships, the part graph)
//! 2. **XML layer** (`oxml`): the owned element tree and PresentationML helpers
//! 3. **Presentation layer** (`pptx`): typed parts, slides and the package facade
//!
//! # Example
//!
//! ```rust,no_run
//! use longan::ooxml::pptx::Package;
//!
//! let mut pkg = Package::open("deck.pptx")?;
//! println!("{} slides", pkg.slides().len()?);
//! pkg.core_properties_mut()?.set_title("Quarterly Review")?;
//! pkg.save("deck.pptx")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
pub mod error;
pub mod opc;
pub mod oxml;
pub mod pptx;

// Re-export commonly used types from OPC layer
pub use opc::{OpcPackage, PackURI};

// Re-export error types
pub use error::{OoxmlError, Result};
