//! Slide-family element helpers: the new-slide skeleton and shape tree access.

use crate::ooxml::oxml::element::Element;

/// Child elements of `p:spTree` that are shapes.
pub const SHAPE_ELEMENTS: &[&str] = &[
    "p:sp",
    "p:grpSp",
    "p:graphicFrame",
    "p:cxnSp",
    "p:pic",
    "p:contentPart",
];

/// A bare `p:sld` with an empty shape tree.
///
/// ```xml
/// <p:sld xmlns:a=".." xmlns:r=".." xmlns:p="..">
///   <p:cSld><p:spTree>
///     <p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
///     <p:grpSpPr/>
///   </p:spTree></p:cSld>
/// </p:sld>
/// ```
pub fn new_slide() -> Element {
    let nv_grp_sp_pr = Element::new("p:nvGrpSpPr")
        .with_child(
            Element::new("p:cNvPr")
                .with_attr("id", "1")
                .with_attr("name", ""),
        )
        .with_child(Element::new("p:cNvGrpSpPr"))
        .with_child(Element::new("p:nvPr"));
    let sp_tree = Element::new("p:spTree")
        .with_child(nv_grp_sp_pr)
        .with_child(Element::new("p:grpSpPr"));

    Element::new("p:sld")
        .with_namespace_declarations(&["a", "r", "p"])
        .with_child(Element::new("p:cSld").with_child(sp_tree))
}

/// `p:cSld@name`, or the empty string when absent.
pub fn c_sld_name(root: &Element) -> &str {
    root.find("p:cSld")
        .and_then(|c_sld| c_sld.attr("name"))
        .unwrap_or("")
}

/// The `p:spTree` of a slide, layout or master root.
pub fn sp_tree(root: &Element) -> Option<&Element> {
    root.descend(&["p:cSld", "p:spTree"])
}

/// Whether `element` is one of the shape kinds in [`SHAPE_ELEMENTS`].
pub fn is_shape(element: &Element) -> bool {
    SHAPE_ELEMENTS.iter().any(|name| element.is(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_slide_skeleton() {
        let expected = Element::parse(
            br#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree></p:cSld></p:sld>"#,
        )
        .unwrap();
        assert_eq!(new_slide(), expected);
        assert_eq!(c_sld_name(&new_slide()), "");
    }

    #[test]
    fn test_shapes_in_tree() {
        let slide = new_slide();
        let tree = sp_tree(&slide).unwrap();
        assert_eq!(tree.children().filter(|e| is_shape(e)).count(), 0);
        assert!(is_shape(&Element::new("p:pic")));
        assert!(!is_shape(&Element::new("p:grpSpPr")));
    }
}
