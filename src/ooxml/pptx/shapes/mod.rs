/// Shape tree access for slides, layouts and masters.
///
/// Shapes are exposed as a thin read-only view over the `p:spTree` children;
/// their content stays an opaque element subtree.
use crate::ooxml::oxml::Element;
use crate::ooxml::oxml::slide::is_shape;

/// Shape type enumeration.
///
/// Indicates what kind of shape this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeType {
    /// A text shape (p:sp)
    Shape,
    /// A picture shape (p:pic)
    Picture,
    /// A graphic frame containing a table or chart (p:graphicFrame)
    GraphicFrame,
    /// A group shape (p:grpSp)
    GroupShape,
    /// A connector shape (p:cxnSp)
    Connector,
    /// Ink or other external content (p:contentPart)
    ContentPart,
}

impl ShapeType {
    fn of(element: &Element) -> Option<Self> {
        let shape_type = match element.local_name() {
            "sp" => Self::Shape,
            "pic" => Self::Picture,
            "graphicFrame" => Self::GraphicFrame,
            "grpSp" => Self::GroupShape,
            "cxnSp" => Self::Connector,
            "contentPart" => Self::ContentPart,
            _ => return None,
        };
        is_shape(element).then_some(shape_type)
    }
}

/// One shape in a shape tree.
#[derive(Debug, Clone, Copy)]
pub struct Shape<'a> {
    element: &'a Element,
    shape_type: ShapeType,
}

impl<'a> Shape<'a> {
    /// Get the shape type.
    #[inline]
    pub fn shape_type(&self) -> ShapeType {
        self.shape_type
    }

    /// The shape element itself.
    #[inline]
    pub fn element(&self) -> &'a Element {
        self.element
    }

    /// The `p:cNvPr` under the shape's non-visual properties (`p:nvSpPr`,
    /// `p:nvPicPr`, ...).
    fn c_nv_pr(&self) -> Option<&'a Element> {
        self.element
            .children()
            .find(|child| child.local_name().starts_with("nv"))
            .and_then(|nv| nv.find("p:cNvPr"))
    }

    /// Shape id from `p:cNvPr@id`.
    pub fn id(&self) -> Option<u32> {
        self.c_nv_pr()
            .and_then(|c| c.attr("id"))
            .and_then(|id| atoi_simd::parse::<u32, false, false>(id.as_bytes()).ok())
    }

    /// Shape name from `p:cNvPr@name`, or an empty string.
    pub fn name(&self) -> &'a str {
        self.c_nv_pr().and_then(|c| c.attr("name")).unwrap_or("")
    }
}

/// The shapes directly under a `p:spTree`, in document order.
#[derive(Debug, Clone, Copy)]
pub struct Shapes<'a> {
    tree: Option<&'a Element>,
}

impl<'a> Shapes<'a> {
    /// View over `tree`; a missing tree has no shapes.
    pub fn new(tree: Option<&'a Element>) -> Self {
        Self { tree }
    }

    pub fn iter(&self) -> impl Iterator<Item = Shape<'a>> + use<'a> {
        self.tree
            .into_iter()
            .flat_map(|tree| tree.children())
            .filter_map(|element| {
                ShapeType::of(element).map(|shape_type| Shape { element, shape_type })
            })
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn get(&self, index: usize) -> Option<Shape<'a>> {
        self.iter().nth(index)
    }
}

impl<'a> IntoIterator for Shapes<'a> {
    type Item = Shape<'a>;
    type IntoIter = Box<dyn Iterator<Item = Shape<'a>> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
