//! Generic, namespace-aware XML element tree.
//!
//! Parts parse their XML into an [`Element`] tree on first structural access and
//! serialize it back on save. The tree keeps prefixes, namespace declarations,
//! attribute order, text and comments, so an unmodified part round-trips to the
//! same structure. Lookups use well-known qualified names (`"p:cSld"`) that are
//! matched by namespace URI, not by the prefix the document happened to use.

use crate::common::xml::{escape_xml, resolve_reference};
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::oxml::ns::{namespace_for, qn, split_qname};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::borrow::Cow;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// A child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Character data, unescaped
    Text(String),
    Comment(String),
}

impl Node {
    /// The element inside this node, if it is one.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Mutable access to the element inside this node, if it is one.
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }
}

/// An attribute as written in the document, with its resolved namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Qualified name as written (e.g. "r:id", "name", "xmlns:p")
    name: String,
    /// Namespace URI of a prefixed attribute; `None` for plain attributes and declarations
    namespace: Option<String>,
    /// Unescaped value
    value: String,
}

impl Attribute {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }

    fn is_declaration(&self) -> bool {
        self.name == "xmlns" || self.name.starts_with("xmlns:")
    }

    fn matches(&self, qname: &str) -> bool {
        if self.is_declaration() {
            return false;
        }
        match qn(qname) {
            Some((None, local)) => self.name == local,
            Some((namespace, local)) => {
                self.namespace.as_deref() == namespace && split_qname(&self.name).1 == local
            },
            None => false,
        }
    }
}

/// An XML element with its attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Qualified name as written (e.g. "p:sld")
    name: String,
    /// Resolved namespace URI of the element
    namespace: Option<String>,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
}

/// In-scope namespace declarations while parsing.
#[derive(Default)]
struct NamespaceScopes {
    frames: Vec<Vec<(Option<String>, String)>>,
}

impl NamespaceScopes {
    fn push(&mut self, declarations: Vec<(Option<String>, String)>) {
        self.frames.push(declarations);
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    /// Resolve a prefix (`None` = default namespace) against the innermost declaration.
    fn resolve(&self, prefix: Option<&str>) -> Option<String> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE.to_string());
        }
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter())
            .find(|(declared, _)| declared.as_deref() == prefix)
            .map(|(_, uri)| uri.clone())
            .filter(|uri| !uri.is_empty())
    }
}

/// Namespace bindings in scope while serializing, innermost last.
#[derive(Default)]
struct Bindings {
    stack: Vec<(Option<String>, String)>,
}

impl Bindings {
    fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE);
        }
        self.stack
            .iter()
            .rev()
            .find(|(declared, _)| declared.as_deref() == prefix)
            .map(|(_, uri)| uri.as_str())
            .filter(|uri| !uri.is_empty())
    }

    /// A prefix currently bound to `uri` and not shadowed. The inner `None`
    /// is the default namespace, offered only when `allow_default` is set.
    fn prefix_for(&self, uri: &str, allow_default: bool) -> Option<Option<&str>> {
        self.stack
            .iter()
            .rev()
            .filter(|(prefix, _)| allow_default || prefix.is_some())
            .find(|(prefix, bound)| bound == uri && self.resolve(prefix.as_deref()) == Some(uri))
            .map(|(prefix, _)| prefix.as_deref())
    }

    /// The name to write for `qname` so that it lands in `namespace`.
    ///
    /// Reuses a prefix already bound to the namespace; otherwise declares one
    /// on the element being written (bindings from `mark` on belong to it) and
    /// records the declaration in `declared`.
    fn scoped_name<'n>(
        &mut self,
        qname: &'n str,
        namespace: Option<&str>,
        is_element: bool,
        mark: usize,
        declared: &mut Vec<(String, String)>,
    ) -> Cow<'n, str> {
        let Some(uri) = namespace else {
            return Cow::Borrowed(qname);
        };
        let (prefix, local) = split_qname(qname);
        if (prefix.is_some() || is_element) && self.resolve(prefix) == Some(uri) {
            return Cow::Borrowed(qname);
        }
        if let Some(bound) = self.prefix_for(uri, is_element) {
            return Cow::Owned(match bound {
                Some(bound) => format!("{}:{}", bound, local),
                None => local.to_string(),
            });
        }

        let taken = |candidate: &str| {
            self.stack[mark..]
                .iter()
                .any(|(declared, _)| declared.as_deref() == Some(candidate))
        };
        let chosen = match prefix.filter(|p| *p != "xml" && *p != "xmlns" && !taken(*p)) {
            Some(p) => p.to_string(),
            None => (0..)
                .map(|n| format!("ns{}", n))
                .find(|p| !taken(p.as_str()) && self.resolve(Some(p.as_str())).is_none())
                .unwrap_or_default(),
        };
        self.stack.push((Some(chosen.clone()), uri.to_string()));
        declared.push((chosen.clone(), uri.to_string()));
        Cow::Owned(format!("{}:{}", chosen, local))
    }
}

impl Element {
    /// Create an empty element from a qualified name with a well-known prefix.
    ///
    /// The element carries no namespace declarations; see
    /// [`Element::with_namespace_declarations`] for root elements.
    pub fn new(qname: &str) -> Self {
        let namespace = match split_qname(qname) {
            (Some(prefix), _) => namespace_for(prefix).map(str::to_string),
            (None, _) => None,
        };
        Self {
            name: qname.to_string(),
            namespace,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Declare the given well-known prefixes on this element.
    pub fn with_namespace_declarations(mut self, prefixes: &[&str]) -> Self {
        for prefix in prefixes {
            self.declare_namespace(prefix);
        }
        self
    }

    /// Declare a well-known prefix on this element unless it already declares it.
    pub fn declare_namespace(&mut self, prefix: &str) {
        let name = format!("xmlns:{}", prefix);
        if self.attributes.iter().any(|a| a.name == name) {
            return;
        }
        if let Some(uri) = namespace_for(prefix) {
            self.attributes.push(Attribute {
                name,
                namespace: None,
                value: uri.to_string(),
            });
        }
    }

    /// The prefix this element itself declares for `uri`, if any.
    pub fn declared_prefix(&self, uri: &str) -> Option<&str> {
        self.attributes
            .iter()
            .filter(|a| a.value == uri)
            .find_map(|a| a.name.strip_prefix("xmlns:"))
    }

    /// Builder form of [`Element::set_attr`].
    pub fn with_attr(mut self, qname: &str, value: &str) -> Self {
        self.set_attr(qname, value);
        self
    }

    /// Builder form of [`Element::append`].
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Parse an XML document and return its root element.
    pub fn parse(xml: &[u8]) -> Result<Element> {
        let mut reader = Reader::from_reader(xml);
        let mut buf = Vec::new();
        let mut scopes = NamespaceScopes::default();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    let element = Self::open(e, &mut scopes)?;
                    stack.push(element);
                },
                Ok(Event::Empty(ref e)) => {
                    let element = Self::open(e, &mut scopes)?;
                    scopes.pop();
                    Self::close(&mut stack, &mut root, element)?;
                },
                Ok(Event::End(_)) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| OpcError::XmlError("unbalanced end tag".to_string()))?;
                    scopes.pop();
                    Self::close(&mut stack, &mut root, element)?;
                },
                Ok(Event::Text(e)) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.push_text(std::str::from_utf8(e.as_ref())?);
                    }
                },
                Ok(Event::CData(e)) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.push_text(std::str::from_utf8(e.as_ref())?);
                    }
                },
                Ok(Event::GeneralRef(e)) => {
                    let name = std::str::from_utf8(e.as_ref())?;
                    let text = resolve_reference(name).ok_or_else(|| {
                        OpcError::XmlError(format!("unknown entity reference &{};", name))
                    })?;
                    if let Some(parent) = stack.last_mut() {
                        parent.push_text(&text);
                    }
                },
                Ok(Event::Comment(e)) => {
                    if let Some(parent) = stack.last_mut() {
                        let comment = std::str::from_utf8(e.as_ref())?.to_string();
                        parent.children.push(Node::Comment(comment));
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(OpcError::XmlError(format!(
                        "XML parse error at byte {}: {}",
                        reader.buffer_position(),
                        e
                    )));
                },
                _ => {},
            }
            buf.clear();
        }

        if let Some(unclosed) = stack.last() {
            return Err(OpcError::XmlError(format!(
                "unexpected end of document inside <{}>",
                unclosed.name
            )));
        }
        root.ok_or_else(|| OpcError::XmlError("document has no root element".to_string()))
    }

    /// Build an element from a start tag, pushing its namespace declarations.
    fn open(start: &BytesStart<'_>, scopes: &mut NamespaceScopes) -> Result<Element> {
        let name = std::str::from_utf8(start.name().as_ref())?.to_string();

        let mut declarations = Vec::new();
        let mut raw = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
            let value = attr.unescape_value()?.into_owned();
            if key == "xmlns" {
                declarations.push((None, value.clone()));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                declarations.push((Some(prefix.to_string()), value.clone()));
            }
            raw.push((key, value));
        }
        scopes.push(declarations);

        let namespace = scopes.resolve(split_qname(&name).0);
        let attributes = raw
            .into_iter()
            .map(|(key, value)| {
                let namespace = match split_qname(&key) {
                    (Some("xmlns"), _) => None,
                    (Some(prefix), _) => scopes.resolve(Some(prefix)),
                    (None, _) => None,
                };
                Attribute {
                    name: key,
                    namespace,
                    value,
                }
            })
            .collect();

        Ok(Element {
            name,
            namespace,
            attributes,
            children: Vec::new(),
        })
    }

    fn close(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
        match stack.last_mut() {
            Some(parent) => parent.children.push(Node::Element(element)),
            None if root.is_none() => *root = Some(element),
            None => {
                return Err(OpcError::XmlError(format!(
                    "second root element <{}>",
                    element.name
                )));
            },
        }
        Ok(())
    }

    fn push_text(&mut self, text: &str) {
        if let Some(Node::Text(existing)) = self.children.last_mut() {
            existing.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_string()));
        }
    }

    /// Qualified name as written in the document.
    #[inline]
    pub fn qname(&self) -> &str {
        &self.name
    }

    /// Local part of the element name.
    #[inline]
    pub fn local_name(&self) -> &str {
        split_qname(&self.name).1
    }

    /// Namespace URI of the element.
    #[inline]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Check whether this element has the given well-known qualified name.
    pub fn is(&self, qname: &str) -> bool {
        match qn(qname) {
            Some((namespace, local)) => {
                self.namespace.as_deref() == namespace && self.local_name() == local
            },
            None => false,
        }
    }

    /// All attributes, including namespace declarations, in document order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Get an attribute value. Prefixed names are matched by namespace.
    pub fn attr(&self, qname: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.matches(qname))
            .map(|a| a.value.as_str())
    }

    /// Set an attribute value, replacing an existing one with the same name.
    pub fn set_attr(&mut self, qname: &str, value: &str) {
        if let Some(existing) = self.attributes.iter_mut().find(|a| a.matches(qname)) {
            existing.value = value.to_string();
            return;
        }
        let namespace = match split_qname(qname) {
            (Some(prefix), _) => namespace_for(prefix).map(str::to_string),
            (None, _) => None,
        };
        self.attributes.push(Attribute {
            name: qname.to_string(),
            namespace,
            value: value.to_string(),
        });
    }

    /// Remove an attribute, returning its value.
    pub fn remove_attr(&mut self, qname: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|a| a.matches(qname))?;
        Some(self.attributes.remove(pos).value)
    }

    /// All child nodes in document order.
    pub fn nodes(&self) -> &[Node] {
        &self.children
    }

    /// Child elements in document order.
    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Mutable child elements in document order.
    pub fn children_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(Node::as_element_mut)
    }

    /// First child element with the given qualified name.
    pub fn find(&self, qname: &str) -> Option<&Element> {
        self.children().find(|e| e.is(qname))
    }

    /// Mutable first child element with the given qualified name.
    pub fn find_mut(&mut self, qname: &str) -> Option<&mut Element> {
        self.children_mut().find(|e| e.is(qname))
    }

    /// All child elements with the given qualified name.
    pub fn find_all<'a>(&'a self, qname: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children().filter(move |e| e.is(qname))
    }

    /// Follow a path of child names, e.g. `["p:cSld", "p:spTree"]`.
    pub fn descend(&self, path: &[&str]) -> Option<&Element> {
        path.iter().try_fold(self, |element, name| element.find(name))
    }

    /// Append a child element and return it.
    pub fn append(&mut self, child: Element) -> &mut Element {
        let index = self.children.len();
        self.insert_node(index, child)
    }

    /// Insert a child directly after the last child matching any of `preceding`,
    /// or as the first child if none match. Returns the inserted element.
    ///
    /// Used to honour schema sequence order when adding optional children.
    pub fn insert_after_any(&mut self, preceding: &[&str], child: Element) -> &mut Element {
        let index = self
            .children
            .iter()
            .rposition(|node| {
                node.as_element()
                    .is_some_and(|e| preceding.iter().any(|name| e.is(name)))
            })
            .map_or(0, |pos| pos + 1);
        self.insert_node(index, child)
    }

    /// Get the first child named `qname`, or insert an empty one with
    /// [`Element::insert_after_any`] semantics.
    pub fn get_or_insert_after_any(&mut self, qname: &str, preceding: &[&str]) -> &mut Element {
        let existing = self
            .children
            .iter()
            .position(|node| node.as_element().is_some_and(|e| e.is(qname)));
        match existing {
            Some(index) => self.element_at(index),
            None => self.insert_after_any(preceding, Element::new(qname)),
        }
    }

    fn insert_node(&mut self, index: usize, child: Element) -> &mut Element {
        self.children.insert(index, Node::Element(child));
        self.element_at(index)
    }

    /// The child node at `index`, which the caller knows to be an element.
    fn element_at(&mut self, index: usize) -> &mut Element {
        match &mut self.children[index] {
            Node::Element(element) => element,
            _ => unreachable!("child {index} is not an element"),
        }
    }

    /// Remove every child element with the given name, returning how many were removed.
    pub fn remove_all(&mut self, qname: &str) -> usize {
        let before = self.children.len();
        self.children
            .retain(|node| !node.as_element().is_some_and(|e| e.is(qname)));
        before - self.children.len()
    }

    /// Concatenated direct text content.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replace all text content with `text`, keeping child elements.
    pub fn set_text(&mut self, text: &str) {
        self.children.retain(|node| !matches!(node, Node::Text(_)));
        if !text.is_empty() {
            self.children.insert(0, Node::Text(text.to_string()));
        }
    }

    /// Serialize as a standalone XML document with declaration.
    ///
    /// Every namespaced name is written with a prefix bound to its namespace
    /// at that point of the output. Names whose prefix is unbound, or bound to
    /// another namespace, reuse a prefix in scope or get a declaration of their
    /// own.
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(1024);
        out.push_str(XML_DECLARATION);
        out.push('\n');
        self.write_into(&mut out, &mut Bindings::default());
        out
    }

    /// Serialize this element (no declaration).
    pub fn to_fragment(&self) -> String {
        let mut out = String::with_capacity(256);
        self.write_into(&mut out, &mut Bindings::default());
        out
    }

    fn write_into(&self, out: &mut String, bindings: &mut Bindings) {
        let mark = bindings.stack.len();
        for attr in self.attributes.iter().filter(|a| a.is_declaration()) {
            let prefix = attr.name.strip_prefix("xmlns:").map(str::to_string);
            bindings.stack.push((prefix, attr.value.clone()));
        }

        let mut declared = Vec::new();
        let name = bindings.scoped_name(&self.name, self.namespace.as_deref(), true, mark, &mut declared);
        out.push('<');
        out.push_str(&name);
        for attr in &self.attributes {
            let attr_name = if attr.is_declaration() {
                Cow::Borrowed(attr.name.as_str())
            } else {
                bindings.scoped_name(&attr.name, attr.namespace.as_deref(), false, mark, &mut declared)
            };
            out.push(' ');
            out.push_str(&attr_name);
            out.push_str("=\"");
            out.push_str(&escape_xml(&attr.value));
            out.push('"');
        }
        for (prefix, uri) in &declared {
            out.push_str(" xmlns:");
            out.push_str(prefix);
            out.push_str("=\"");
            out.push_str(&escape_xml(uri));
            out.push('"');
        }

        if self.children.is_empty() {
            out.push_str("/>");
        } else {
            out.push('>');
            for child in &self.children {
                match child {
                    Node::Element(e) => e.write_into(out, bindings),
                    Node::Text(t) => out.push_str(&escape_xml(t)),
                    Node::Comment(c) => {
                        out.push_str("<!--");
                        out.push_str(c);
                        out.push_str("-->");
                    },
                }
            }
            out.push_str("</");
            out.push_str(&name);
            out.push('>');
        }
        bindings.stack.truncate(mark);
    }
}
