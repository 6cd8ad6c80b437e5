#![forbid(unsafe_code)]

//! Document events and the handlers that consume them.

use std::fmt;
use std::io::Write;
use transformable_core::Error;

/// An attribute on a start-element event, namespace declarations included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Qualified name, e.g. `id`, `xml:lang` or `xmlns:svg`.
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One ordered document event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    StartDocument,
    EndDocument,
    StartElement {
        name: String,
        attributes: Vec<Attribute>,
    },
    EndElement {
        name: String,
    },
    Characters(String),
    Comment(String),
    ProcessingInstruction {
        target: String,
        data: String,
    },
}

/// A consumer of ordered document events.
///
/// Only [`handle`](ContentHandler::handle) is required; the other methods
/// are conveniences for code that produces events by hand.
pub trait ContentHandler {
    fn handle(&mut self, event: XmlEvent) -> Result<(), Error>;

    fn start_document(&mut self) -> Result<(), Error> {
        self.handle(XmlEvent::StartDocument)
    }

    fn end_document(&mut self) -> Result<(), Error> {
        self.handle(XmlEvent::EndDocument)
    }

    fn start_element(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), Error> {
        self.handle(XmlEvent::StartElement {
            name: name.to_owned(),
            attributes: attributes
                .iter()
                .map(|(n, v)| Attribute::new(*n, *v))
                .collect(),
        })
    }

    fn end_element(&mut self, name: &str) -> Result<(), Error> {
        self.handle(XmlEvent::EndElement {
            name: name.to_owned(),
        })
    }

    fn characters(&mut self, text: &str) -> Result<(), Error> {
        self.handle(XmlEvent::Characters(text.to_owned()))
    }

    fn comment(&mut self, text: &str) -> Result<(), Error> {
        self.handle(XmlEvent::Comment(text.to_owned()))
    }

    fn processing_instruction(&mut self, target: &str, data: &str) -> Result<(), Error> {
        self.handle(XmlEvent::ProcessingInstruction {
            target: target.to_owned(),
            data: data.to_owned(),
        })
    }
}

impl<H: ContentHandler + ?Sized> ContentHandler for &mut H {
    fn handle(&mut self, event: XmlEvent) -> Result<(), Error> {
        (**self).handle(event)
    }
}

impl<H: ContentHandler + ?Sized> ContentHandler for Box<H> {
    fn handle(&mut self, event: XmlEvent) -> Result<(), Error> {
        (**self).handle(event)
    }
}

/// Collects events into a vector.
impl ContentHandler for Vec<XmlEvent> {
    fn handle(&mut self, event: XmlEvent) -> Result<(), Error> {
        self.push(event);
        Ok(())
    }
}

/// Where a stage sends its output.
pub enum Output<'a> {
    /// Serialize to bytes using the producing stage's output properties.
    Stream(&'a mut dyn Write),
    /// Forward events to another handler, typically the next stage.
    Handler {
        handler: Box<dyn ContentHandler + 'a>,
        /// System identifier of the handler, when it has one.
        system_id: Option<String>,
    },
}

impl<'a> Output<'a> {
    pub fn stream(writer: &'a mut dyn Write) -> Self {
        Self::Stream(writer)
    }

    pub fn handler(handler: impl ContentHandler + 'a) -> Self {
        Self::Handler {
            handler: Box::new(handler),
            system_id: None,
        }
    }

    pub fn system_id(&self) -> Option<&str> {
        match self {
            Self::Stream(_) => None,
            Self::Handler { system_id, .. } => system_id.as_deref(),
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }
}

impl fmt::Debug for Output<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream(_) => f.write_str("Output::Stream"),
            Self::Handler { system_id, .. } => f
                .debug_struct("Output::Handler")
                .field("system_id", system_id)
                .finish_non_exhaustive(),
        }
    }
}
