#![forbid(unsafe_code)]

//! The reference engine's streaming stage.

use crate::engine::{ErrorListener, Stage};
use crate::rules::{Rule, RuleSheet, TextValue};
use std::collections::BTreeMap;
use std::sync::Arc;
use transformable_core::{Error, OutputMethod, OutputProperties};
use transformable_xml::{Attribute, ContentHandler, Output, Serializer, XmlEvent};

enum Downstream<'a> {
    Serializer(Serializer<'a>),
    Handler(Box<dyn ContentHandler + 'a>),
}

impl ContentHandler for Downstream<'_> {
    fn handle(&mut self, event: XmlEvent) -> Result<(), Error> {
        match self {
            Self::Serializer(s) => s.handle(event),
            Self::Handler(h) => h.handle(event),
        }
    }
}

struct OpenElement {
    original: String,
    emitted: String,
}

/// Applies a [`RuleSheet`] to a stream of events.
///
/// In buffered mode (the default) the whole input document is collected
/// and replayed through the rules on `EndDocument`. In incremental mode
/// every event is processed and forwarded as it arrives.
pub struct RuleStage<'a> {
    sheet: Arc<RuleSheet>,
    params: BTreeMap<String, String>,
    output: OutputProperties,
    methods: Arc<[OutputMethod]>,
    listener: Arc<dyn ErrorListener>,
    incremental: bool,
    destination: Option<Output<'a>>,
    downstream: Option<Downstream<'a>>,
    buffer: Vec<XmlEvent>,
    open: Vec<OpenElement>,
    strip_depth: usize,
}

impl<'a> RuleStage<'a> {
    pub fn new(
        sheet: Arc<RuleSheet>,
        incremental: bool,
        methods: Arc<[OutputMethod]>,
        listener: Arc<dyn ErrorListener>,
    ) -> Self {
        let output = sheet.output().clone();
        Self {
            sheet,
            params: BTreeMap::new(),
            output,
            methods,
            listener,
            incremental,
            destination: None,
            downstream: None,
            buffer: Vec::new(),
            open: Vec::new(),
            strip_depth: 0,
        }
    }

    fn downstream(&mut self) -> Result<&mut Downstream<'a>, Error> {
        if self.downstream.is_none() {
            let destination = self
                .destination
                .take()
                .ok_or_else(|| Error::transform("stage has no destination"))?;
            let downstream = match destination {
                Output::Stream(writer) => {
                    if let Some(method) = &self.output.method {
                        if !self.methods.contains(method) {
                            return Err(Error::EngineConstruction(format!(
                                "output method {method} is not supported"
                            )));
                        }
                    }
                    Downstream::Serializer(Serializer::new(writer, &self.output)?)
                }
                Output::Handler { handler, .. } => Downstream::Handler(handler),
            };
            self.downstream = Some(downstream);
        }
        self.downstream
            .as_mut()
            .ok_or_else(|| Error::transform("stage has no destination"))
    }

    fn emit(&mut self, event: XmlEvent) -> Result<(), Error> {
        self.downstream()?.handle(event).map_err(wrap_downstream)
    }

    fn resolve(&self, value: &TextValue) -> Result<String, Error> {
        match value {
            TextValue::Literal(text) => Ok(text.clone()),
            TextValue::Param(name) => {
                if let Some(bound) = self.params.get(name) {
                    return Ok(bound.clone());
                }
                if let Some(default) = self.sheet.param_default(name) {
                    return Ok(default.to_owned());
                }
                self.listener
                    .error(&Error::transform(format!("parameter {name} is not bound")))?;
                Ok(String::new())
            }
        }
    }

    fn process(&mut self, event: XmlEvent) -> Result<(), Error> {
        let sheet = Arc::clone(&self.sheet);
        match event {
            XmlEvent::StartElement {
                name,
                mut attributes,
            } => {
                if self.strip_depth > 0 {
                    self.strip_depth += 1;
                    return Ok(());
                }
                let applicable: Vec<&Rule> = sheet
                    .rules()
                    .iter()
                    .filter(|r| r.matcher().matches(&name))
                    .collect();
                if applicable.iter().any(|r| matches!(r, Rule::Strip { .. })) {
                    self.strip_depth = 1;
                    return Ok(());
                }
                let mut emitted = name.clone();
                for rule in &applicable {
                    match rule {
                        Rule::Rename { to, .. } => emitted = to.clone(),
                        Rule::SetAttribute { name: attr, value, .. } => {
                            let value = self.resolve(value)?;
                            match attributes.iter_mut().find(|a| &a.name == attr) {
                                Some(existing) => existing.value = value,
                                None => attributes.push(Attribute::new(attr.clone(), value)),
                            }
                        }
                        _ => {}
                    }
                }
                self.open.push(OpenElement {
                    original: name,
                    emitted: emitted.clone(),
                });
                self.emit(XmlEvent::StartElement {
                    name: emitted,
                    attributes,
                })
            }
            XmlEvent::EndElement { name } => {
                if self.strip_depth > 0 {
                    self.strip_depth -= 1;
                    return Ok(());
                }
                let open = self.open.pop().ok_or_else(|| Error::Sax {
                    message: format!("unbalanced </{name}>"),
                    source: None,
                })?;
                for rule in sheet.rules() {
                    if let Rule::AppendText { matcher, value } = rule {
                        if matcher.matches(&open.original) {
                            let text = self.resolve(value)?;
                            if !text.is_empty() {
                                self.emit(XmlEvent::Characters(text))?;
                            }
                        }
                    }
                }
                self.emit(XmlEvent::EndElement { name: open.emitted })
            }
            XmlEvent::Characters(_)
            | XmlEvent::Comment(_)
            | XmlEvent::ProcessingInstruction { .. }
                if self.strip_depth > 0 =>
            {
                Ok(())
            }
            XmlEvent::StartDocument => {
                self.open.clear();
                self.strip_depth = 0;
                self.emit(XmlEvent::StartDocument)
            }
            other => self.emit(other),
        }
    }
}

/// Wrap failures of the next handler, leaving transform failures and
/// configuration errors as they are so wrapping never nests.
fn wrap_downstream(error: Error) -> Error {
    match error {
        Error::Sax { .. } | Error::Io(_) => {
            Error::transform_caused_by("failed forwarding transformed events", error)
        }
        other => other,
    }
}

impl ContentHandler for RuleStage<'_> {
    fn handle(&mut self, event: XmlEvent) -> Result<(), Error> {
        if self.incremental {
            return self.process(event);
        }
        let done = matches!(event, XmlEvent::EndDocument);
        self.buffer.push(event);
        if done {
            let events = std::mem::take(&mut self.buffer);
            for event in events {
                self.process(event)?;
            }
        }
        Ok(())
    }
}

impl<'a> Stage<'a> for RuleStage<'a> {
    fn set_parameter(&mut self, name: &str, value: &str) {
        self.params.insert(name.to_owned(), value.to_owned());
    }

    fn set_output_properties(&mut self, props: OutputProperties) {
        self.output = props.or(self.sheet.output());
    }

    fn output_properties(&self) -> &OutputProperties {
        &self.output
    }

    fn inherit_output_properties(&mut self, defaults: &OutputProperties) {
        self.output = std::mem::take(&mut self.output).or(defaults);
    }

    fn set_destination(&mut self, destination: Output<'a>) {
        self.downstream = None;
        self.destination = Some(destination);
    }

    fn system_id(&self) -> Option<&str> {
        self.sheet.source_id()
    }
}
