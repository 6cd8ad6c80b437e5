#![forbid(unsafe_code)]

//! An owned document tree.
//!
//! Trees are either built programmatically or parsed with `roxmltree`, and
//! are fed to a pipeline by emitting them as [`XmlEvent`]s.

use crate::event::{Attribute, ContentHandler, XmlEvent};
use transformable_core::Error;

/// The XML namespace, bound to the `xml` prefix without a declaration.
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// A node in a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
}

/// An element with its attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Qualified name as written, e.g. `svg:rect`.
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn push(&mut self, node: Node) {
        self.children.push(node);
    }

    /// Set an attribute, replacing any existing value.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    fn emit(&self, handler: &mut dyn ContentHandler) -> Result<(), Error> {
        handler.handle(XmlEvent::StartElement {
            name: self.name.clone(),
            attributes: self.attributes.clone(),
        })?;
        emit_nodes(&self.children, handler)?;
        handler.handle(XmlEvent::EndElement {
            name: self.name.clone(),
        })
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(&e.children, out),
            _ => {}
        }
    }
}

fn emit_nodes(nodes: &[Node], handler: &mut dyn ContentHandler) -> Result<(), Error> {
    for node in nodes {
        match node {
            Node::Element(e) => e.emit(handler)?,
            Node::Text(t) => handler.handle(XmlEvent::Characters(t.clone()))?,
            Node::Comment(c) => handler.handle(XmlEvent::Comment(c.clone()))?,
            Node::ProcessingInstruction { target, data } => {
                handler.handle(XmlEvent::ProcessingInstruction {
                    target: target.clone(),
                    data: data.clone(),
                })?
            }
        }
    }
    Ok(())
}

/// An owned document: top-level comments, processing instructions and at
/// most one root element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    children: Vec<Node>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse XML text into a tree.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let doc = roxmltree::Document::parse_with_options(text, crate::parsing_options())
            .map_err(|e| Error::XmlParse(e.to_string()))?;
        let mut out = Document::new();
        for child in doc.root().children() {
            if let Some(node) = convert(child) {
                out.children.push(node);
            }
        }
        Ok(out)
    }

    /// Parse XML from bytes, which must be UTF-8.
    pub fn parse_bytes(data: &[u8]) -> Result<Self, Error> {
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::XmlParse(format!("invalid UTF-8: {e}")))?;
        Self::parse(text)
    }

    /// Append a top-level node.
    ///
    /// Only one element may sit at the top level.
    pub fn append_child(&mut self, node: Node) -> Result<(), Error> {
        if matches!(node, Node::Text(_)) {
            return Err(Error::Other("text is not allowed at document level".into()));
        }
        if matches!(node, Node::Element(_)) && self.root_element().is_some() {
            return Err(Error::Other("document already has a root element".into()));
        }
        self.children.push(node);
        Ok(())
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn root_element(&self) -> Option<&Element> {
        self.children.iter().find_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn root_element_mut(&mut self) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Emit the whole document, start and end included.
    pub fn emit(&self, handler: &mut dyn ContentHandler) -> Result<(), Error> {
        handler.handle(XmlEvent::StartDocument)?;
        emit_nodes(&self.children, handler)?;
        handler.handle(XmlEvent::EndDocument)
    }

    pub(crate) fn push_unchecked(&mut self, node: Node) {
        self.children.push(node);
    }

    pub(crate) fn clear(&mut self) {
        self.children.clear();
    }
}

fn convert(node: roxmltree::Node<'_, '_>) -> Option<Node> {
    if node.is_element() {
        return Some(Node::Element(convert_element(node)));
    }
    if node.is_text() {
        return node.text().map(|t| Node::Text(t.to_owned()));
    }
    if node.is_comment() {
        return node.text().map(|t| Node::Comment(t.to_owned()));
    }
    if let Some(pi) = node.pi() {
        return Some(Node::ProcessingInstruction {
            target: pi.target.to_owned(),
            data: pi.value.unwrap_or_default().to_owned(),
        });
    }
    None
}

fn convert_element(node: roxmltree::Node<'_, '_>) -> Element {
    let tag = node.tag_name();
    let name = qualify(element_prefix(node, tag.namespace()), tag.name());
    let mut element = Element::new(name);

    // Declarations new on this element, i.e. not already in scope on the parent.
    let parent = node.parent_element();
    for ns in node.namespaces() {
        if ns.name() == Some("xml") {
            continue;
        }
        let inherited = parent
            .map(|p| p.namespaces().any(|pns| pns.name() == ns.name() && pns.uri() == ns.uri()))
            .unwrap_or(false);
        if inherited {
            continue;
        }
        let attr_name = match ns.name() {
            Some(prefix) => format!("xmlns:{prefix}"),
            None => "xmlns".to_owned(),
        };
        element.attributes.push(Attribute::new(attr_name, ns.uri()));
    }

    for attr in node.attributes() {
        let prefix = match attr.namespace() {
            None => None,
            Some(XML_NS) => Some("xml"),
            Some(uri) => node
                .namespaces()
                .find(|ns| ns.uri() == uri && ns.name().is_some())
                .and_then(|ns| ns.name()),
        };
        element
            .attributes
            .push(Attribute::new(qualify(prefix, attr.name()), attr.value()));
    }

    for child in node.children() {
        if let Some(converted) = convert(child) {
            element.children.push(converted);
        }
    }
    element
}

fn element_prefix<'a>(node: roxmltree::Node<'a, '_>, namespace: Option<&str>) -> Option<&'a str> {
    let uri = namespace?;
    // An in-scope default namespace wins over a prefix bound to the same URI.
    if node.namespaces().any(|ns| ns.name().is_none() && ns.uri() == uri) {
        return None;
    }
    node.namespaces()
        .find(|ns| ns.uri() == uri)
        .and_then(|ns| ns.name())
}

fn qualify(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(p) => format!("{p}:{local}"),
        None => local.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_emit() {
        let mut doc = Document::new();
        doc.append_child(Node::Element(Element::new("test").with_text("Hello World")))
            .unwrap();
        let mut events: Vec<XmlEvent> = Vec::new();
        doc.emit(&mut events).unwrap();
        assert_eq!(
            events,
            vec![
                XmlEvent::StartDocument,
                XmlEvent::StartElement {
                    name: "test".into(),
                    attributes: vec![],
                },
                XmlEvent::Characters("Hello World".into()),
                XmlEvent::EndElement {
                    name: "test".into()
                },
                XmlEvent::EndDocument,
            ]
        );
    }

    #[test]
    fn test_single_root() {
        let mut doc = Document::new();
        doc.append_child(Node::Element(Element::new("a"))).unwrap();
        assert!(doc.append_child(Node::Element(Element::new("b"))).is_err());
        assert!(doc.append_child(Node::Text("x".into())).is_err());
        doc.append_child(Node::Comment("ok".into())).unwrap();
    }

    #[test]
    fn test_parse_keeps_structure() {
        let doc = Document::parse(
            "<?pi data?><root id=\"1\"><!--c--><child>text</child><empty/></root>",
        )
        .unwrap();
        assert!(matches!(
            &doc.children()[0],
            Node::ProcessingInstruction { target, data } if target == "pi" && data == "data"
        ));
        let root = doc.root_element().unwrap();
        assert_eq!(root.name, "root");
        assert_eq!(root.attribute("id"), Some("1"));
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.text(), "text");
    }

    #[test]
    fn test_parse_namespaces() {
        let doc = Document::parse(
            r#"<h:html xmlns:h="http://www.w3.org/1999/xhtml" xml:lang="en"><h:body class="x"/></h:html>"#,
        )
        .unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(root.name, "h:html");
        assert_eq!(root.attribute("xmlns:h"), Some("http://www.w3.org/1999/xhtml"));
        assert_eq!(root.attribute("xml:lang"), Some("en"));
        let Node::Element(body) = &root.children[0] else {
            panic!("expected element");
        };
        assert_eq!(body.name, "h:body");
        // Inherited declarations are not repeated.
        assert_eq!(body.attribute("xmlns:h"), None);
    }

    #[test]
    fn test_parse_default_namespace() {
        let doc = Document::parse(r#"<svg xmlns="http://www.w3.org/2000/svg"><rect/></svg>"#)
            .unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(root.name, "svg");
        assert_eq!(root.attribute("xmlns"), Some("http://www.w3.org/2000/svg"));
    }

    #[test]
    fn test_parse_error() {
        let err = Document::parse("<open>").unwrap_err();
        assert!(matches!(err, Error::XmlParse(_)));
    }
}
