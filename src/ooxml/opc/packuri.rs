/// Provides the PackURI value type and utilities for working with package URIs.
///
/// A PackURI represents a part name within an OPC package, following the URI format
/// defined by the Open Packaging Conventions specification.
use crate::ooxml::opc::error::{OpcError, Result};
use std::fmt;

/// Represents a package URI, which is a partname within an OPC package.
///
/// PackURIs always begin with a forward slash and use forward slashes as path separators,
/// following the OPC specification. Apart from the package pseudo-partname `/`, they
/// never end with a slash. They provide access to various components like
/// the base URI (directory), filename, extension, and index.
///
/// Ordering is plain string ordering; equality is string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackURI {
    /// The full pack URI string (e.g., "/ppt/presentation.xml")
    uri: String,
}

impl PackURI {
    /// Create a new PackURI from a string.
    ///
    /// # Arguments
    /// * `uri` - The URI string, which must begin with a forward slash
    ///
    /// # Returns
    /// * `Ok(PackURI)` if the URI is an absolute part path
    /// * `Err(OpcError::InvalidPackUri)` otherwise
    pub fn new<S: Into<String>>(uri: S) -> Result<Self> {
        let uri = uri.into();
        if !uri.starts_with('/') {
            return Err(OpcError::InvalidPackUri(format!(
                "PackURI must begin with slash, got '{}'",
                uri
            )));
        }
        if uri.len() > 1 && uri.ends_with('/') {
            return Err(OpcError::InvalidPackUri(format!(
                "PackURI must not end with slash, got '{}'",
                uri
            )));
        }
        Ok(PackURI { uri })
    }

    /// Create a PackURI from a relative reference and a base URI.
    ///
    /// This translates a relative reference (like "../slideLayouts/slideLayout1.xml") onto
    /// a base URI (like "/ppt/slides") to produce an absolute PackURI
    /// (like "/ppt/slideLayouts/slideLayout1.xml").
    pub fn from_rel_ref(base_uri: &str, relative_ref: &str) -> Result<Self> {
        // An absolute target ignores the base entirely
        if relative_ref.starts_with('/') {
            return Self::new(Self::normalize_path(relative_ref));
        }
        let joined = Self::join_paths(base_uri, relative_ref);
        Self::new(Self::normalize_path(&joined))
    }

    /// Expand a `%d` partname template with the lowest index `n >= 1` that is not
    /// already taken.
    ///
    /// Gaps are filled: with `slide1.xml` and `slide3.xml` taken, the result for
    /// `/ppt/slides/slide%d.xml` is `/ppt/slides/slide2.xml`.
    pub fn next_available<'a, I>(template: &str, existing: I) -> Result<PackURI>
    where
        I: IntoIterator<Item = &'a PackURI>,
    {
        if !template.contains("%d") {
            return Err(OpcError::InvalidPackUri(format!(
                "partname template has no %d placeholder: '{}'",
                template
            )));
        }

        let (prefix, suffix) = template.split_once("%d").unwrap_or((template, ""));
        let mut used: Vec<u32> = existing
            .into_iter()
            .filter_map(|uri| {
                let middle = uri.as_str().strip_prefix(prefix)?.strip_suffix(suffix)?;
                if middle.is_empty() || !middle.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                atoi_simd::parse::<u32, false, false>(middle.as_bytes()).ok()
            })
            .collect();
        used.sort_unstable();

        let mut next = 1u32;
        for n in used {
            match n.cmp(&next) {
                std::cmp::Ordering::Equal => next += 1,
                std::cmp::Ordering::Greater => break,
                std::cmp::Ordering::Less => {},
            }
        }

        Self::new(format!("{}{}{}", prefix, next, suffix))
    }

    /// Get the base URI (directory portion) of this PackURI.
    ///
    /// For example, "/ppt/slides" for "/ppt/slides/slide1.xml".
    /// For the package pseudo-partname "/", returns "/".
    pub fn base_uri(&self) -> &str {
        match self.uri.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &self.uri[..pos],
        }
    }

    /// Get the filename portion of this PackURI.
    ///
    /// For example, "slide1.xml" for "/ppt/slides/slide1.xml".
    /// For the package pseudo-partname "/", returns an empty string.
    pub fn filename(&self) -> &str {
        match self.uri.rfind('/') {
            Some(pos) => &self.uri[pos + 1..],
            None => "",
        }
    }

    /// Get the extension portion of this PackURI, without the leading period.
    pub fn ext(&self) -> &str {
        let filename = self.filename();
        match filename.rfind('.') {
            Some(pos) => &filename[pos + 1..],
            None => "",
        }
    }

    /// Get the partname index for tuple partnames, or None for singleton partnames.
    ///
    /// For example, returns 21 for "/ppt/slides/slide21.xml" and None for
    /// "/ppt/presentation.xml".
    pub fn idx(&self) -> Option<u32> {
        let filename = self.filename();
        let stem = match filename.rfind('.') {
            Some(pos) => &filename[..pos],
            None => filename,
        };

        let digits = stem.bytes().rev().take_while(u8::is_ascii_digit).count();
        // A name made only of digits has no stem to be a tuple of
        if digits == 0 || digits == stem.len() {
            return None;
        }
        atoi_simd::parse::<u32, false, false>(&stem.as_bytes()[stem.len() - digits..]).ok()
    }

    /// Get the membername (URI with leading slash stripped).
    ///
    /// This is the form used as the Zip file membername for the package item.
    /// Returns an empty string for the package pseudo-partname "/".
    pub fn membername(&self) -> &str {
        &self.uri[1..]
    }

    /// Get the relative reference from a base URI to this PackURI.
    ///
    /// For example, PackURI("/ppt/slideLayouts/slideLayout1.xml") returns
    /// "../slideLayouts/slideLayout1.xml" for base_uri "/ppt/slides".
    pub fn relative_ref(&self, base_uri: &str) -> String {
        if base_uri == "/" {
            return self.membername().to_string();
        }

        let from_parts: Vec<&str> = base_uri.split('/').filter(|s| !s.is_empty()).collect();
        let to_parts: Vec<&str> = self.uri.split('/').filter(|s| !s.is_empty()).collect();

        let common = from_parts
            .iter()
            .zip(to_parts.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut segments: Vec<&str> = vec![".."; from_parts.len() - common];
        segments.extend_from_slice(&to_parts[common..]);
        segments.join("/")
    }

    /// Get the PackURI of the .rels part corresponding to this PackURI.
    ///
    /// For example, "/ppt/slides/_rels/slide1.xml.rels" for "/ppt/slides/slide1.xml"
    /// and "/_rels/.rels" for the package pseudo-partname.
    pub fn rels_uri(&self) -> Result<PackURI> {
        let rels_filename = format!("{}.rels", self.filename());
        let base_uri = self.base_uri();
        if base_uri == "/" {
            Self::new(format!("/_rels/{}", rels_filename))
        } else {
            Self::new(format!("{}/_rels/{}", base_uri, rels_filename))
        }
    }

    /// Get the full URI string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.uri
    }

    fn join_paths(base: &str, rel: &str) -> String {
        if base.ends_with('/') {
            format!("{}{}", base, rel)
        } else {
            format!("{}/{}", base, rel)
        }
    }

    /// Resolve "." and ".." segments and collapse repeated slashes.
    fn normalize_path(path: &str) -> String {
        let mut parts: Vec<&str> = Vec::new();
        for part in path.split('/') {
            match part {
                "" | "." => {},
                ".." => {
                    parts.pop();
                },
                _ => parts.push(part),
            }
        }
        format!("/{}", parts.join("/"))
    }
}

impl fmt::Display for PackURI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

impl AsRef<str> for PackURI {
    fn as_ref(&self) -> &str {
        &self.uri
    }
}

impl std::str::FromStr for PackURI {
    type Err = OpcError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl PartialEq<str> for PackURI {
    fn eq(&self, other: &str) -> bool {
        self.uri == other
    }
}

impl PartialEq<&str> for PackURI {
    fn eq(&self, other: &&str) -> bool {
        self.uri == *other
    }
}

/// The package pseudo-partname, representing the package itself
pub const PACKAGE_URI: &str = "/";

/// The URI for the [Content_Types].xml part
pub const CONTENT_TYPES_URI: &str = "/[Content_Types].xml";
