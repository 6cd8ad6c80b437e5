#![forbid(unsafe_code)]

//! Serialization options: the entity-level configuration and the
//! per-stage output properties derived from it.

use crate::{Charset, Error, MediaType};
use std::fmt;
use std::str::FromStr;

/// Output property names, as used in rule sheets and diagnostics.
pub mod keys {
    pub const METHOD: &str = "method";
    pub const MEDIA_TYPE: &str = "media-type";
    pub const ENCODING: &str = "encoding";
    pub const DOCTYPE_SYSTEM: &str = "doctype-system";
    pub const DOCTYPE_PUBLIC: &str = "doctype-public";
    pub const INDENT: &str = "indent";
    pub const OMIT_XML_DECLARATION: &str = "omit-xml-declaration";
}

/// How a serializer renders events.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OutputMethod {
    Xml,
    Html,
    Xhtml,
    Text,
    /// A method name this crate does not know; engines decide whether to accept it.
    Other(String),
}

impl OutputMethod {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Xml => "xml",
            Self::Html => "html",
            Self::Xhtml => "xhtml",
            Self::Text => "text",
            Self::Other(name) => name,
        }
    }
}

impl FromStr for OutputMethod {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "xml" => Self::Xml,
            "html" => Self::Html,
            "xhtml" => Self::Xhtml,
            "text" => Self::Text,
            other => Self::Other(other.to_owned()),
        })
    }
}

impl fmt::Display for OutputMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output properties handed to a single stage.
///
/// Every field is optional; an unset field means "engine default". Media type
/// and encoding are kept as declared text so that a bad value is reported
/// where it is interpreted, not where it is declared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputProperties {
    pub method: Option<OutputMethod>,
    pub media_type: Option<String>,
    pub encoding: Option<String>,
    pub doctype_system: Option<String>,
    pub doctype_public: Option<String>,
    pub indent: Option<bool>,
    pub omit_xml_declaration: Option<bool>,
}

impl OutputProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property by its name (see [`keys`]). Boolean properties take `yes`/`no`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        match key {
            keys::METHOD => self.method = value.parse().ok(),
            keys::MEDIA_TYPE => self.media_type = Some(value.to_owned()),
            keys::ENCODING => self.encoding = Some(value.to_owned()),
            keys::DOCTYPE_SYSTEM => self.doctype_system = Some(value.to_owned()),
            keys::DOCTYPE_PUBLIC => self.doctype_public = Some(value.to_owned()),
            keys::INDENT => self.indent = Some(parse_yes_no(key, value)?),
            keys::OMIT_XML_DECLARATION => {
                self.omit_xml_declaration = Some(parse_yes_no(key, value)?)
            }
            _ => {
                return Err(Error::EngineConstruction(format!(
                    "unknown output property: {key}"
                )))
            }
        }
        Ok(())
    }

    /// Get a property by name, rendering booleans as `yes`/`no`.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            keys::METHOD => self.method.as_ref().map(|m| m.as_str().to_owned()),
            keys::MEDIA_TYPE => self.media_type.clone(),
            keys::ENCODING => self.encoding.clone(),
            keys::DOCTYPE_SYSTEM => self.doctype_system.clone(),
            keys::DOCTYPE_PUBLIC => self.doctype_public.clone(),
            keys::INDENT => self.indent.map(yes_no),
            keys::OMIT_XML_DECLARATION => self.omit_xml_declaration.map(yes_no),
            _ => None,
        }
    }

    /// Fill every unset field from `defaults`.
    pub fn or(mut self, defaults: &OutputProperties) -> Self {
        self.method = self.method.or_else(|| defaults.method.clone());
        self.media_type = self.media_type.or_else(|| defaults.media_type.clone());
        self.encoding = self.encoding.or_else(|| defaults.encoding.clone());
        self.doctype_system = self.doctype_system.or_else(|| defaults.doctype_system.clone());
        self.doctype_public = self.doctype_public.or_else(|| defaults.doctype_public.clone());
        self.indent = self.indent.or(defaults.indent);
        self.omit_xml_declaration = self.omit_xml_declaration.or(defaults.omit_xml_declaration);
        self
    }
}

fn parse_yes_no(key: &str, value: &str) -> Result<bool, Error> {
    match value.trim() {
        "yes" => Ok(true),
        "no" => Ok(false),
        other => Err(Error::EngineConstruction(format!(
            "{key} must be \"yes\" or \"no\", got {other:?}"
        ))),
    }
}

fn yes_no(flag: bool) -> String {
    let word = if flag { "yes" } else { "no" };
    word.to_owned()
}

/// Serialization knobs configured on an entity.
///
/// A plain value; the entity owning it provides the locking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputConfiguration {
    media_type: Option<MediaType>,
    encoding: Option<Charset>,
    system_id: Option<String>,
    public_id: Option<String>,
    indent: bool,
    omit_declaration: bool,
    incremental: bool,
}

impl OutputConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn media_type(&self) -> Option<&MediaType> {
        self.media_type.as_ref()
    }

    pub fn set_media_type(&mut self, media_type: Option<MediaType>) {
        self.media_type = media_type;
    }

    pub fn encoding(&self) -> Option<Charset> {
        self.encoding
    }

    pub fn set_encoding(&mut self, encoding: Option<Charset>) {
        self.encoding = encoding;
    }

    /// System identifier for the document type declaration.
    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    pub fn set_system_id(&mut self, system_id: Option<String>) {
        self.system_id = system_id;
    }

    /// Public identifier for the document type declaration.
    pub fn public_id(&self) -> Option<&str> {
        self.public_id.as_deref()
    }

    pub fn set_public_id(&mut self, public_id: Option<String>) {
        self.public_id = public_id;
    }

    pub fn indent(&self) -> bool {
        self.indent
    }

    pub fn set_indent(&mut self, indent: bool) {
        self.indent = indent;
    }

    pub fn omit_declaration(&self) -> bool {
        self.omit_declaration
    }

    pub fn set_omit_declaration(&mut self, omit_declaration: bool) {
        self.omit_declaration = omit_declaration;
    }

    /// Prefer the incremental engine when one is available.
    pub fn incremental(&self) -> bool {
        self.incremental
    }

    pub fn set_incremental(&mut self, incremental: bool) {
        self.incremental = incremental;
    }
}
