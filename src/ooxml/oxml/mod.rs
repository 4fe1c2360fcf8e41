//! XML element layer: a namespace-aware tree plus PresentationML helpers.
pub mod element;
pub mod ns;
pub mod presentation;
pub mod slide;

pub use element::{Attribute, Element, Node};
