//! XML text helpers shared by the part serializers.

mod escape;

pub use escape::{escape_xml, resolve_reference};
