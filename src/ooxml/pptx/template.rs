//! Minimal templates for creating new presentations.
//!
//! The default deck has one 4:3 slide master with a "Title Slide" layout and
//! the Office theme, and no slides.

/// `p:presentation` relating its master as `rId1`.
pub fn default_presentation_xml() -> &'static str {
    include_str!("resources/presentation.xml")
}

/// `p:sldMaster` relating its layout as `rId1`.
pub fn default_slide_master_xml() -> &'static str {
    include_str!("resources/slideMaster1.xml")
}

pub fn default_slide_layout_xml() -> &'static str {
    include_str!("resources/slideLayout1.xml")
}

/// Generate a minimal valid theme1.xml content.
pub fn default_theme_xml() -> &'static str {
    include_str!("resources/theme1.xml")
}
