//! Helpers shared across the crate.

pub mod xml;
