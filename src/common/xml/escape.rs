use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;

// Built once, shared by every serializer in the crate.
static XML_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(["&", "<", ">", "\""])
        .expect("static escape patterns are valid")
});

/// Escape a string for use as XML character data or a double-quoted attribute value.
///
/// Apostrophes are left alone since every attribute this crate writes is
/// double-quoted.
///
/// # Examples
///
/// ```
/// use longan::common::xml::escape_xml;
/// assert_eq!(escape_xml("a & b"), "a &amp; b");
/// assert_eq!(escape_xml(r#"<p r:id="x">"#), "&lt;p r:id=&quot;x&quot;&gt;");
/// ```
#[inline]
pub fn escape_xml(s: &str) -> String {
    XML_ESCAPER.replace_all(s, &["&amp;", "&lt;", "&gt;", "&quot;"])
}

/// Resolve the body of an entity or character reference (the text between
/// `&` and `;`) to the text it stands for.
///
/// Only the five predefined entities and numeric character references are
/// known; anything else returns `None`.
pub fn resolve_reference(name: &str) -> Option<String> {
    let resolved = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse::<u32>().ok()?,
            };
            char::from_u32(code)?
        },
    };
    Some(resolved.to_string())
}
