#![forbid(unsafe_code)]

//! A sink that rebuilds a [`Document`] from events.

use crate::document::{Document, Element, Node};
use crate::event::{ContentHandler, XmlEvent};
use transformable_core::Error;

/// Builds the received events into a caller-owned [`Document`].
///
/// The target is cleared on `StartDocument`; adjacent character events are
/// merged into one text node.
pub struct TreeBuilder<'a> {
    target: &'a mut Document,
    open: Vec<Element>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(target: &'a mut Document) -> Self {
        Self {
            target,
            open: Vec::new(),
        }
    }

    fn append(&mut self, node: Node) -> Result<(), Error> {
        match self.open.last_mut() {
            Some(parent) => {
                if let (Node::Text(text), Some(Node::Text(prev))) = (&node, parent.children.last_mut()) {
                    prev.push_str(text);
                    return Ok(());
                }
                parent.children.push(node);
            }
            None => match node {
                Node::Text(text) if text.trim().is_empty() => {}
                Node::Text(text) => {
                    return Err(Error::Sax {
                        message: format!("character data outside the root element: {text:?}"),
                        source: None,
                    })
                }
                other => self.target.push_unchecked(other),
            },
        }
        Ok(())
    }
}

impl ContentHandler for TreeBuilder<'_> {
    fn handle(&mut self, event: XmlEvent) -> Result<(), Error> {
        match event {
            XmlEvent::StartDocument => {
                self.target.clear();
                self.open.clear();
            }
            XmlEvent::EndDocument => {
                if let Some(open) = self.open.last() {
                    return Err(Error::Sax {
                        message: format!("document ended inside <{}>", open.name),
                        source: None,
                    });
                }
            }
            XmlEvent::StartElement { name, attributes } => {
                if self.open.is_empty() && self.target.root_element().is_some() {
                    return Err(Error::Sax {
                        message: format!("second root element <{name}>"),
                        source: None,
                    });
                }
                let mut element = Element::new(name);
                element.attributes = attributes;
                self.open.push(element);
            }
            XmlEvent::EndElement { name } => {
                let element = self.open.pop().ok_or_else(|| Error::Sax {
                    message: format!("unbalanced </{name}>"),
                    source: None,
                })?;
                if element.name != name {
                    return Err(Error::Sax {
                        message: format!("</{name}> does not close <{}>", element.name),
                        source: None,
                    });
                }
                self.append(Node::Element(element))?;
            }
            XmlEvent::Characters(text) => self.append(Node::Text(text))?,
            XmlEvent::Comment(text) => self.append(Node::Comment(text))?,
            XmlEvent::ProcessingInstruction { target, data } => {
                self.append(Node::ProcessingInstruction { target, data })?
            }
        }
        Ok(())
    }
}
