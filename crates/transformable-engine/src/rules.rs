#![forbid(unsafe_code)]

//! Rule sheets: the program format of the reference engine.
//!
//! ```xml
//! <rules>
//!   <output method="xml" omit-xml-declaration="yes"/>
//!   <param name="suffix" default="!"/>
//!   <append-text match="test" param="suffix"/>
//!   <rename match="old" to="new"/>
//!   <set-attribute match="*" name="checked" value="yes"/>
//!   <strip match="debug"/>
//! </rules>
//! ```

use crate::engine::Program;
use std::any::Any;
use std::sync::Arc;
use transformable_core::{Error, OutputProperties};

/// Which elements a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    Any,
    Name(String),
}

impl Matcher {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "*" => Self::Any,
            name => Self::Name(name.to_owned()),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Name(n) => n == name,
        }
    }
}

/// A literal or a reference to a stage parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextValue {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Append text as the last content of matching elements.
    AppendText { matcher: Matcher, value: TextValue },
    /// Rename matching elements.
    Rename { matcher: Matcher, to: String },
    /// Set or replace an attribute on matching elements.
    SetAttribute {
        matcher: Matcher,
        name: String,
        value: TextValue,
    },
    /// Drop matching elements with their whole subtree.
    Strip { matcher: Matcher },
}

impl Rule {
    pub fn matcher(&self) -> &Matcher {
        match self {
            Self::AppendText { matcher, .. }
            | Self::Rename { matcher, .. }
            | Self::SetAttribute { matcher, .. }
            | Self::Strip { matcher } => matcher,
        }
    }
}

/// A declared parameter and its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    pub name: String,
    pub default: Option<String>,
}

/// A compiled rule sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSheet {
    system_id: Option<String>,
    output: OutputProperties,
    params: Vec<ParamDecl>,
    rules: Vec<Rule>,
}

impl RuleSheet {
    /// A sheet with no rules: events pass through unchanged.
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_output(mut self, output: OutputProperties) -> Self {
        self.output = output;
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, default: Option<String>) -> Self {
        self.params.push(ParamDecl {
            name: name.into(),
            default,
        });
        self
    }

    pub fn with_system_id(mut self, system_id: impl Into<String>) -> Self {
        self.system_id = Some(system_id.into());
        self
    }

    pub fn output(&self) -> &OutputProperties {
        &self.output
    }

    pub fn source_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn param_default(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.default.as_deref())
    }

    /// Compile a rule sheet from XML source.
    pub fn compile(source: &str, system_id: Option<&str>) -> Result<Self, Error> {
        let doc = roxmltree::Document::parse_with_options(source, transformable_xml::parsing_options())
            .map_err(|e| Error::EngineConstruction(format!("rule sheet is not well-formed: {e}")))?;
        let root = doc.root_element();
        if root.tag_name().name() != "rules" {
            return Err(Error::EngineConstruction(format!(
                "rule sheet root must be <rules>, found <{}>",
                root.tag_name().name()
            )));
        }

        let mut sheet = RuleSheet {
            system_id: system_id.map(str::to_owned),
            ..RuleSheet::default()
        };
        for node in root.children().filter(|n| n.is_element()) {
            match node.tag_name().name() {
                "output" => {
                    for attr in node.attributes() {
                        sheet.output.set(attr.name(), attr.value())?;
                    }
                }
                "param" => sheet.params.push(ParamDecl {
                    name: required(node, "name")?.to_owned(),
                    default: node.attribute("default").map(str::to_owned),
                }),
                "append-text" => sheet.rules.push(Rule::AppendText {
                    matcher: Matcher::parse(required(node, "match")?),
                    value: text_value(node)?,
                }),
                "rename" => sheet.rules.push(Rule::Rename {
                    matcher: Matcher::parse(required(node, "match")?),
                    to: required(node, "to")?.to_owned(),
                }),
                "set-attribute" => sheet.rules.push(Rule::SetAttribute {
                    matcher: Matcher::parse(required(node, "match")?),
                    name: required(node, "name")?.to_owned(),
                    value: text_value(node)?,
                }),
                "strip" => sheet.rules.push(Rule::Strip {
                    matcher: Matcher::parse(required(node, "match")?),
                }),
                other => {
                    return Err(Error::EngineConstruction(format!(
                        "unknown rule element <{other}>"
                    )))
                }
            }
        }
        Ok(sheet)
    }
}

fn required<'a>(node: roxmltree::Node<'a, '_>, attr: &str) -> Result<&'a str, Error> {
    node.attribute(attr).ok_or_else(|| {
        Error::EngineConstruction(format!(
            "<{}> requires a {attr} attribute",
            node.tag_name().name()
        ))
    })
}

fn text_value(node: roxmltree::Node<'_, '_>) -> Result<TextValue, Error> {
    match (node.attribute("value"), node.attribute("param")) {
        (Some(value), None) => Ok(TextValue::Literal(value.to_owned())),
        (None, Some(param)) => Ok(TextValue::Param(param.to_owned())),
        _ => Err(Error::EngineConstruction(format!(
            "<{}> needs exactly one of value or param",
            node.tag_name().name()
        ))),
    }
}

impl Program for RuleSheet {
    fn output_properties(&self) -> &OutputProperties {
        &self.output
    }

    fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
