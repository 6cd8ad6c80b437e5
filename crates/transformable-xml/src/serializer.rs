#![forbid(unsafe_code)]

//! Serialize events to bytes according to a stage's output properties.

use crate::escape::{escape_attr, escape_comment, escape_text};
use crate::event::{Attribute, ContentHandler, XmlEvent};
use std::io::Write;
use transformable_core::{Charset, Error, OutputMethod, OutputProperties};

/// HTML elements that never have content or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "br", "col", "embed", "frame", "hr", "img", "input", "isindex",
    "link", "meta", "param", "source", "track", "wbr",
];

/// HTML elements whose content is written without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

const INDENT: &str = "  ";

struct Frame {
    name: String,
    has_text: bool,
    has_children: bool,
    raw: bool,
}

/// Writes events as XML, HTML, XHTML or plain text.
///
/// The XML declaration and document type declaration are written lazily in
/// front of the first markup, so that an unset method can still default to
/// `html` when the root element is `<html>`.
pub struct Serializer<'a> {
    out: &'a mut dyn Write,
    charset: Charset,
    declared_method: Option<OutputMethod>,
    method: OutputMethod,
    indent: bool,
    omit_declaration: bool,
    /// Quoted system literal.
    doctype_system: Option<String>,
    /// Quoted public id literal.
    doctype_public: Option<String>,
    prolog_written: bool,
    start_tag_open: bool,
    stack: Vec<Frame>,
}

impl<'a> Serializer<'a> {
    /// Create a serializer for `props` writing to `out`.
    pub fn new(out: &'a mut dyn Write, props: &OutputProperties) -> Result<Self, Error> {
        let charset = match props.encoding.as_deref() {
            Some(name) => Charset::for_name(name)?.output(),
            None => Charset::UTF_8,
        };
        if let Some(OutputMethod::Other(name)) = &props.method {
            return Err(Error::EngineConstruction(format!(
                "unsupported output method: {name}"
            )));
        }
        Ok(Self {
            out,
            charset,
            declared_method: props.method.clone(),
            method: props.method.clone().unwrap_or(OutputMethod::Xml),
            indent: props.indent.unwrap_or(false),
            omit_declaration: props.omit_xml_declaration.unwrap_or(false),
            doctype_system: props.doctype_system.as_deref().map(system_literal).transpose()?,
            doctype_public: props.doctype_public.as_deref().map(public_literal).transpose()?,
            prolog_written: false,
            start_tag_open: false,
            stack: Vec::new(),
        })
    }

    /// The method in effect; final once the first element has been seen.
    pub fn method(&self) -> &OutputMethod {
        &self.method
    }

    fn write(&mut self, s: &str) -> Result<(), Error> {
        let bytes = self.charset.encode(s);
        self.out
            .write_all(&bytes)
            .map_err(|e| Error::sax_caused_by("failed writing serialized output", Error::Io(e)))
    }

    fn is_markup(&self) -> bool {
        !matches!(self.method, OutputMethod::Text)
    }

    fn is_html(&self) -> bool {
        matches!(self.method, OutputMethod::Html)
    }

    fn write_prolog(&mut self, root: Option<&str>) -> Result<(), Error> {
        if self.prolog_written {
            return Ok(());
        }
        self.prolog_written = true;

        if self.declared_method.is_none() {
            if let Some(name) = root {
                if !name.contains(':') && name.eq_ignore_ascii_case("html") {
                    self.method = OutputMethod::Html;
                }
            }
        }
        tracing::trace!(method = %self.method, encoding = self.charset.name(), "writing prolog");

        match self.method {
            OutputMethod::Xml | OutputMethod::Xhtml => {
                if !self.omit_declaration {
                    let decl = format!(
                        "<?xml version=\"1.0\" encoding=\"{}\"?>",
                        self.charset.name()
                    );
                    self.write(&decl)?;
                    if self.indent || self.doctype_system.is_some() {
                        self.write("\n")?;
                    }
                }
                if let (Some(system), Some(root)) = (self.doctype_system.clone(), root) {
                    let doctype = match &self.doctype_public {
                        Some(public) => format!("<!DOCTYPE {root} PUBLIC {public} {system}>\n"),
                        None => format!("<!DOCTYPE {root} SYSTEM {system}>\n"),
                    };
                    self.write(&doctype)?;
                }
            }
            OutputMethod::Html => {
                let doctype = match (&self.doctype_public, &self.doctype_system) {
                    (Some(public), Some(system)) => {
                        Some(format!("<!DOCTYPE html PUBLIC {public} {system}>\n"))
                    }
                    (Some(public), None) => Some(format!("<!DOCTYPE html PUBLIC {public}>\n")),
                    (None, Some(system)) => Some(format!("<!DOCTYPE html SYSTEM {system}>\n")),
                    (None, None) => None,
                };
                if let Some(doctype) = doctype {
                    self.write(&doctype)?;
                }
            }
            OutputMethod::Text | OutputMethod::Other(_) => {}
        }
        Ok(())
    }

    fn close_start_tag(&mut self) -> Result<(), Error> {
        if self.start_tag_open {
            self.start_tag_open = false;
            self.write(">")?;
        }
        Ok(())
    }

    fn newline_indent(&mut self, depth: usize) -> Result<(), Error> {
        let mut s = String::with_capacity(1 + depth * INDENT.len());
        s.push('\n');
        for _ in 0..depth {
            s.push_str(INDENT);
        }
        self.write(&s)
    }

    /// Indent before a child node unless the parent holds mixed content.
    fn indent_child(&mut self) -> Result<(), Error> {
        if !self.indent {
            return Ok(());
        }
        let depth = self.stack.len();
        match self.stack.last_mut() {
            Some(parent) if !parent.has_text => {
                parent.has_children = true;
                self.newline_indent(depth)
            }
            Some(parent) => {
                parent.has_children = true;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn mark_child(&mut self) {
        if let Some(parent) = self.stack.last_mut() {
            parent.has_children = true;
        }
    }

    fn open_element(&mut self, name: String, attributes: Vec<Attribute>) -> Result<(), Error> {
        if self.stack.is_empty() {
            self.write_prolog(Some(&name))?;
        }
        if !self.is_markup() {
            self.stack.push(Frame {
                name,
                has_text: false,
                has_children: false,
                raw: false,
            });
            return Ok(());
        }
        self.close_start_tag()?;
        self.indent_child()?;
        self.mark_child();

        let mut tag = format!("<{name}");
        for attr in &attributes {
            tag.push_str(&format!(" {}=\"{}\"", attr.name, escape_attr(&attr.value)));
        }
        self.write(&tag)?;
        self.start_tag_open = true;

        let raw = self.is_html() && RAW_TEXT_ELEMENTS.contains(&local_lower(&name).as_str());
        self.stack.push(Frame {
            name,
            has_text: false,
            has_children: false,
            raw,
        });
        Ok(())
    }

    fn close_element(&mut self, name: &str) -> Result<(), Error> {
        let frame = self.stack.pop().ok_or_else(|| Error::Sax {
            message: format!("unbalanced </{name}>"),
            source: None,
        })?;
        if !self.is_markup() {
            return Ok(());
        }
        let void = VOID_ELEMENTS.contains(&local_lower(&frame.name).as_str());

        if self.start_tag_open {
            self.start_tag_open = false;
            let closing = match self.method {
                OutputMethod::Html if void => ">".to_owned(),
                OutputMethod::Html => format!("></{}>", frame.name),
                OutputMethod::Xhtml if void => " />".to_owned(),
                OutputMethod::Xhtml => format!("></{}>", frame.name),
                _ => "/>".to_owned(),
            };
            return self.write(&closing);
        }
        if self.indent && frame.has_children && !frame.has_text {
            self.newline_indent(self.stack.len())?;
        }
        self.write(&format!("</{}>", frame.name))
    }

    fn write_characters(&mut self, text: &str) -> Result<(), Error> {
        if !self.is_markup() {
            return self.write(text);
        }
        if text.is_empty() {
            return Ok(());
        }
        if self.stack.is_empty() {
            // Whitespace between top-level nodes carries no content.
            if text.trim().is_empty() {
                return Ok(());
            }
            self.write_prolog(None)?;
        }
        self.close_start_tag()?;
        let raw = match self.stack.last_mut() {
            Some(frame) => {
                frame.has_text = true;
                frame.raw
            }
            None => false,
        };
        if raw {
            self.write(text)
        } else {
            self.write(&escape_text(text))
        }
    }

    fn write_comment(&mut self, text: &str) -> Result<(), Error> {
        if !self.is_markup() {
            return Ok(());
        }
        if self.stack.is_empty() {
            self.write_prolog(None)?;
        }
        self.close_start_tag()?;
        self.indent_child()?;
        self.mark_child();
        self.write(&format!("<!--{}-->", escape_comment(text)))
    }

    fn write_pi(&mut self, target: &str, data: &str) -> Result<(), Error> {
        if !self.is_markup() {
            return Ok(());
        }
        if self.stack.is_empty() {
            self.write_prolog(None)?;
        }
        self.close_start_tag()?;
        self.indent_child()?;
        self.mark_child();
        let close = if self.is_html() { ">" } else { "?>" };
        if data.is_empty() {
            self.write(&format!("<?{target}{close}"))
        } else {
            self.write(&format!("<?{target} {data}{close}"))
        }
    }

    fn finish(&mut self) -> Result<(), Error> {
        if let Some(frame) = self.stack.last() {
            return Err(Error::Sax {
                message: format!("document ended inside <{}>", frame.name),
                source: None,
            });
        }
        if self.indent && self.is_markup() && self.prolog_written {
            self.write("\n")?;
        }
        self.out
            .flush()
            .map_err(|e| Error::sax_caused_by("failed flushing serialized output", Error::Io(e)))
    }
}

fn local_lower(name: &str) -> String {
    let local = name.rsplit_once(':').map(|(_, l)| l).unwrap_or(name);
    local.to_ascii_lowercase()
}

impl ContentHandler for Serializer<'_> {
    fn handle(&mut self, event: XmlEvent) -> Result<(), Error> {
        match event {
            XmlEvent::StartDocument => Ok(()),
            XmlEvent::EndDocument => self.finish(),
            XmlEvent::StartElement { name, attributes } => self.open_element(name, attributes),
            XmlEvent::EndElement { name } => self.close_element(&name),
            XmlEvent::Characters(text) => self.write_characters(&text),
            XmlEvent::Comment(text) => self.write_comment(&text),
            XmlEvent::ProcessingInstruction { target, data } => {
                self.write_pi(&target, &data)
            }
        }
    }
}

/// Quote a doctype system id, with `'` when it contains `"`.
fn system_literal(id: &str) -> Result<String, Error> {
    match (id.contains('"'), id.contains('\'')) {
        (false, _) => Ok(format!("\"{id}\"")),
        (true, false) => Ok(format!("'{id}'")),
        (true, true) => Err(Error::EngineConstruction(format!(
            "doctype system id contains both quote characters: {id}"
        ))),
    }
}

/// Quote a doctype public id; `"` is not a public id character.
fn public_literal(id: &str) -> Result<String, Error> {
    if id.contains('"') {
        return Err(Error::EngineConstruction(format!(
            "doctype public id contains '\"': {id}"
        )));
    }
    Ok(format!("\"{id}\""))
}
