//! Namespace prefix map for the qualified names used throughout the crate.
//!
//! Lookups written as `"p:cSld"` are resolved through this table, so they match
//! whatever prefix the source document actually used for the namespace.

use crate::ooxml::opc::constants::namespace as ns;

/// Prefixes this crate knows, with their namespace URIs.
pub const NAMESPACES: &[(&str, &str)] = &[
    ("a", ns::DML_MAIN),
    ("p", ns::PML_MAIN),
    ("r", ns::OFC_RELATIONSHIPS),
    ("cp", ns::OPC_CORE_PROPERTIES),
    ("dc", ns::DC),
    ("dcterms", ns::DCTERMS),
    ("xsi", ns::XSI),
];

/// Namespace URI bound to a well-known prefix.
pub fn namespace_for(prefix: &str) -> Option<&'static str> {
    NAMESPACES
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, uri)| *uri)
}

/// Split a qualified name into its prefix and local part.
#[inline]
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

/// Resolve a `prefix:local` name against the well-known prefixes.
///
/// Unprefixed names resolve to no namespace; an unknown prefix resolves to `None`.
pub fn qn(qname: &str) -> Option<(Option<&'static str>, &str)> {
    match split_qname(qname) {
        (Some(prefix), local) => namespace_for(prefix).map(|uri| (Some(uri), local)),
        (None, local) => Some((None, local)),
    }
}
