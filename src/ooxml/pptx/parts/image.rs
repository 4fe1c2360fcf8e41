//! Image parts and the package-wide image collection.
//!
//! Images are content-addressed: the collection keys every image part by the
//! SHA-1 of its bytes, so embedding the same picture twice yields one part.

use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::content_type as ct;
use crate::ooxml::opc::error::Result as OpcResult;
use crate::ooxml::opc::graph::PartGraph;
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::part::{BlobPart, Part, PartId, impl_part_via};
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Partname template for new image parts; the extension is appended.
const IMAGE_PARTNAME_TEMPLATE: &str = "/ppt/media/image%d";

/// Image format types supported by PPTX.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    Emf,
    Wmf,
}

impl ImageFormat {
    /// Get the MIME type for this image format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => ct::PNG,
            Self::Jpeg => ct::JPEG,
            Self::Gif => ct::GIF,
            Self::Bmp => ct::BMP,
            Self::Tiff => ct::TIFF,
            Self::Emf => ct::X_EMF,
            Self::Wmf => ct::X_WMF,
        }
    }

    /// Get the file extension for this image format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Emf => "emf",
            Self::Wmf => "wmf",
        }
    }

    /// Detect image format from bytes (magic number detection).
    pub fn detect_from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        // PNG: 89 50 4E 47
        if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // GIF: 47 49 46 38 (GIF8)
        if bytes.starts_with(&[0x47, 0x49, 0x46, 0x38]) {
            return Some(Self::Gif);
        }

        // BMP: 42 4D (BM)
        if bytes.starts_with(&[0x42, 0x4D]) {
            return Some(Self::Bmp);
        }

        // TIFF: 49 49 2A 00 (little-endian) or 4D 4D 00 2A (big-endian)
        if bytes.starts_with(&[0x49, 0x49, 0x2A, 0x00])
            || bytes.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
        {
            return Some(Self::Tiff);
        }

        // WMF placeable header: D7 CD C6 9A
        if bytes.starts_with(&[0xD7, 0xCD, 0xC6, 0x9A]) {
            return Some(Self::Wmf);
        }

        // EMF: EMR_HEADER record type 1, " EMF" signature at offset 40
        if bytes.starts_with(&[0x01, 0x00, 0x00, 0x00]) && bytes.get(40..44) == Some(&b" EMF"[..]) {
            return Some(Self::Emf);
        }

        None
    }

    /// Format for a file extension, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" | "jpe" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "bmp" | "dib" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            "emf" => Some(Self::Emf),
            "wmf" => Some(Self::Wmf),
            _ => None,
        }
    }
}

/// Hex SHA-1 of `bytes`.
pub fn sha1_hex(bytes: &[u8]) -> String {
    Sha1::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Image bytes ready to be embedded.
#[derive(Debug, Clone)]
pub struct Image {
    blob: Vec<u8>,
    format: ImageFormat,
    sha1: String,
}

impl Image {
    /// Image from raw bytes; the format must be recognizable from its header.
    pub fn from_bytes(blob: Vec<u8>) -> Result<Self> {
        let format = ImageFormat::detect_from_bytes(&blob)
            .ok_or_else(|| OoxmlError::Image("unrecognized image format".to_string()))?;
        Ok(Self::with_format(blob, format))
    }

    /// Image from raw bytes, falling back to `ext` when the header is not recognized.
    pub fn from_bytes_with_ext(blob: Vec<u8>, ext: &str) -> Result<Self> {
        let format = ImageFormat::detect_from_bytes(&blob)
            .or_else(|| ImageFormat::from_extension(ext))
            .ok_or_else(|| OoxmlError::Image(format!("unrecognized image format (extension '{}')", ext)))?;
        Ok(Self::with_format(blob, format))
    }

    /// Read an image file; its extension is the fallback for format detection.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let blob = std::fs::read(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_bytes_with_ext(blob, ext)
    }

    fn with_format(blob: Vec<u8>, format: ImageFormat) -> Self {
        let sha1 = sha1_hex(&blob);
        Self { blob, format, sha1 }
    }

    #[inline]
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    #[inline]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    #[inline]
    pub fn content_type(&self) -> &'static str {
        self.format.mime_type()
    }

    #[inline]
    pub fn ext(&self) -> &'static str {
        self.format.extension()
    }

    /// Hex SHA-1 of the image bytes.
    #[inline]
    pub fn sha1(&self) -> &str {
        &self.sha1
    }
}

/// An image part, e.g. `/ppt/media/image1.png`.
#[derive(Debug)]
pub struct ImagePart {
    blob: BlobPart,
    sha1: String,
}

impl_part_via!(ImagePart, blob);

impl ImagePart {
    pub fn load(partname: PackURI, content_type: &str, blob: Vec<u8>) -> OpcResult<Self> {
        let sha1 = sha1_hex(&blob);
        Ok(Self {
            blob: BlobPart::load(partname, content_type, blob)?,
            sha1,
        })
    }

    /// A new image part holding `image`.
    pub fn new(partname: PackURI, image: &Image) -> Self {
        Self {
            blob: BlobPart::new(partname, image.content_type(), image.blob().to_vec()),
            sha1: image.sha1().to_string(),
        }
    }

    /// Hex SHA-1 of the image bytes.
    #[inline]
    pub fn sha1(&self) -> &str {
        &self.sha1
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        self.blob.bytes()
    }

    /// Extension of the partname, e.g. `png`.
    pub fn ext(&self) -> &str {
        self.partname().ext()
    }
}

/// Supplies image parts to slides.
pub trait ImageProvider {
    /// The image part holding these bytes, created if no identical image exists.
    fn get_or_add_image(&mut self, image: &Image) -> Result<PartId>;
}

/// Every image part in a package, keyed by SHA-1.
#[derive(Debug, Default)]
pub struct ImageCollection {
    by_sha1: HashMap<String, PartId>,
}

impl ImageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every [`ImagePart`] in `graph`, replacing the current contents.
    ///
    /// When two parts hold identical bytes the first one wins.
    pub fn rebuild(&mut self, graph: &PartGraph) {
        self.by_sha1.clear();
        for id in graph.ids_of::<ImagePart>() {
            if let Ok(part) = graph.get_as::<ImagePart>(id) {
                self.by_sha1.entry(part.sha1().to_string()).or_insert(id);
            }
        }
        debug!(images = self.by_sha1.len(), "image collection indexed");
    }

    /// The image part with this SHA-1, if any.
    pub fn get(&self, sha1: &str) -> Option<PartId> {
        self.by_sha1.get(sha1).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.by_sha1.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_sha1.is_empty()
    }

    /// Image part ids in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = PartId> + '_ {
        self.by_sha1.values().copied()
    }

    /// Return the part holding `image`, adding a new one to `graph` if needed.
    ///
    /// New parts are named `/ppt/media/imageN.<ext>` with the lowest free N.
    pub fn get_or_add(&mut self, graph: &mut PartGraph, image: &Image) -> Result<PartId> {
        if let Some(id) = self.get(image.sha1()) {
            return Ok(id);
        }

        let template = format!("{}.{}", IMAGE_PARTNAME_TEMPLATE, image.ext());
        let partname = graph.next_partname(&template)?;
        debug!(%partname, content_type = image.content_type(), "adding image part");

        let id = graph.add(Box::new(ImagePart::new(partname, image)));
        self.by_sha1.insert(image.sha1().to_string(), id);
        Ok(id)
    }
}

/// [`ImageProvider`] backed by a collection and the graph it indexes.
pub struct ImageStore<'a> {
    images: &'a mut ImageCollection,
    graph: &'a mut PartGraph,
}

impl<'a> ImageStore<'a> {
    pub fn new(images: &'a mut ImageCollection, graph: &'a mut PartGraph) -> Self {
        Self { images, graph }
    }
}

impl ImageProvider for ImageStore<'_> {
    fn get_or_add_image(&mut self, image: &Image) -> Result<PartId> {
        self.images.get_or_add(self.graph, image)
    }
}
