#![forbid(unsafe_code)]

//! Build a chain of stages from a list of program slots.

use crate::{Parameters, ProgramSlot};
use std::sync::Arc;
use transformable_core::{Error, OutputProperties};
use transformable_engine::{Engines, ErrorListener, Stage};
use transformable_xml::{ContentHandler, Output, XmlEvent};

/// Thin adapter exposing a stage as the destination of the stage before it.
pub struct StageInput<'a> {
    stage: Box<dyn Stage<'a> + 'a>,
}

impl<'a> StageInput<'a> {
    /// Wrap `stage` as an [`Output`], carrying its system identifier along.
    pub fn into_output(stage: Box<dyn Stage<'a> + 'a>) -> Output<'a> {
        let system_id = stage.system_id().map(str::to_owned);
        Output::Handler {
            handler: Box::new(StageInput { stage }),
            system_id,
        }
    }
}

impl ContentHandler for StageInput<'_> {
    fn handle(&mut self, event: XmlEvent) -> Result<(), Error> {
        self.stage.handle(event)
    }
}

/// A connected chain, valid for a single transform pass.
#[derive(Debug)]
pub struct Pipeline<'a> {
    entry: Output<'a>,
    system_ids: Vec<Option<String>>,
}

impl<'a> Pipeline<'a> {
    /// Where the base stage should send its events.
    pub fn entry(&self) -> &Output<'a> {
        &self.entry
    }

    pub fn into_entry(self) -> Output<'a> {
        self.entry
    }

    /// Number of stages built.
    pub fn len(&self) -> usize {
        self.system_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.system_ids.is_empty()
    }

    /// System identifiers of the built stages, in chain order.
    pub fn system_ids(&self) -> &[Option<String>] {
        &self.system_ids
    }
}

/// Connect one stage per present slot, in slot order, in front of `sink`.
///
/// Absent lists and lists holding only skipped slots return `sink` itself
/// as the entry. Otherwise every stage gets all of `parameters`, each stage
/// sends to the next, the last sends to `sink`, and the entry is the first
/// stage. The last stage takes whatever its program leaves undeclared from
/// `output_defaults`, so the bytes match what inference reports.
pub fn compose<'a>(
    engines: &Engines,
    transformations: Option<&[ProgramSlot]>,
    parameters: Option<&Parameters>,
    incremental: bool,
    listener: &Arc<dyn ErrorListener>,
    output_defaults: Option<&OutputProperties>,
    sink: Output<'a>,
) -> Result<Pipeline<'a>, Error> {
    let slots = match transformations {
        Some(slots) if slots.iter().any(Option::is_some) => slots,
        _ => {
            return Ok(Pipeline {
                entry: sink,
                system_ids: Vec::new(),
            })
        }
    };

    let mut stages = slots
        .iter()
        .flatten()
        .map(|program| -> Result<_, Error> {
            let mut stage = engines.new_stage(Some(program), incremental, Arc::clone(listener))?;
            for (name, value) in parameters.into_iter().flatten() {
                stage.set_parameter(name, value);
            }
            Ok(stage)
        })
        .collect::<Result<Vec<_>, Error>>()?;

    if let (Some(defaults), Some(last)) = (output_defaults, stages.last_mut()) {
        last.inherit_output_properties(defaults);
    }

    let system_ids: Vec<Option<String>> = stages
        .iter()
        .map(|stage| stage.system_id().map(str::to_owned))
        .collect();

    let entry = stages
        .into_iter()
        .rev()
        .fold(sink, |destination, mut stage| {
            stage.set_destination(destination);
            StageInput::into_output(stage)
        });

    tracing::trace!(stages = ?system_ids, incremental, "composed transform chain");
    Ok(Pipeline { entry, system_ids })
}

#[cfg(test)]
mod tests {
    use super::*;
    use transformable_engine::{DefaultErrorListener, Program, RuleEngine};
    use transformable_xml::Document;

    fn engines() -> Engines {
        Engines::detect(|| Box::new(RuleEngine::new()))
    }

    fn listener() -> Arc<dyn ErrorListener> {
        Arc::new(DefaultErrorListener)
    }

    fn bang(engines: &Engines, id: &str) -> Arc<dyn Program> {
        engines
            .compile(
                r#"<rules>
                     <output omit-xml-declaration="yes"/>
                     <param name="mark" default="!"/>
                     <append-text match="test" param="mark"/>
                   </rules>"#,
                Some(id),
            )
            .unwrap()
    }

    fn run(engines: &Engines, slots: &[ProgramSlot], params: Option<&Parameters>) -> String {
        let mut buf = Vec::new();
        {
            let pipeline = compose(engines, Some(slots), params, false, &listener(), None, Output::Stream(&mut buf))
                .unwrap();
            let Output::Handler { mut handler, .. } = pipeline.into_entry() else {
                panic!("expected a chain");
            };
            Document::parse("<test>Hello World</test>")
                .unwrap()
                .emit(&mut handler)
                .unwrap();
        }
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_absent_and_all_skipped_return_sink() {
        let engines = engines();
        let mut buf: Vec<u8> = Vec::new();
        let sink_addr = &buf as *const Vec<u8> as *const u8;

        let pipeline = compose(&engines, None, None, false, &listener(), None, Output::Stream(&mut buf)).unwrap();
        assert!(pipeline.is_empty());
        let Output::Stream(w) = pipeline.into_entry() else {
            panic!("expected the original sink");
        };
        assert_eq!(w as *mut dyn std::io::Write as *const u8, sink_addr);

        let slots: Vec<ProgramSlot> = vec![None, None, None];
        let pipeline =
            compose(&engines, Some(&slots[..]), None, false, &listener(), None, Output::Stream(&mut buf)).unwrap();
        assert_eq!(pipeline.len(), 0);
        assert!(pipeline.entry().is_stream());
        drop(pipeline);

        let pipeline = compose(&engines, Some(&[][..]), None, false, &listener(), None, Output::Stream(&mut buf)).unwrap();
        assert!(pipeline.entry().is_stream());
    }

    #[test]
    fn test_chain_order_and_system_ids() {
        let engines = engines();
        let slots = vec![
            None,
            Some(bang(&engines, "urn:first")),
            None,
            Some(bang(&engines, "urn:second")),
            None,
        ];
        let mut buf = Vec::new();
        let pipeline =
            compose(&engines, Some(&slots[..]), None, false, &listener(), None, Output::Stream(&mut buf)).unwrap();
        assert_eq!(pipeline.len(), 2);
        assert_eq!(
            pipeline.system_ids(),
            &[Some("urn:first".to_owned()), Some("urn:second".to_owned())]
        );
        assert_eq!(pipeline.entry().system_id(), Some("urn:first"));
    }

    #[test]
    fn test_skips_do_not_break_adjacency() {
        let engines = engines();
        let t = bang(&engines, "urn:t");
        let dense = run(&engines, &[Some(t.clone()), Some(t.clone())], None);
        let sparse = run(&engines, &[None, Some(t.clone()), None, None, Some(t), None], None);
        assert_eq!(dense, "<test>Hello World!!</test>");
        assert_eq!(sparse, dense);
    }

    #[test]
    fn test_parameters_reach_every_stage() {
        let engines = engines();
        let t = bang(&engines, "urn:t");
        let mut params = Parameters::new();
        params.insert("mark".into(), "?".into());
        let out = run(&engines, &[Some(t.clone()), None, Some(t.clone()), Some(t)], Some(&params));
        assert_eq!(out, "<test>Hello World???</test>");
    }

    #[test]
    fn test_last_stage_inherits_undeclared_output() {
        use crate::{base_output_properties, content_type};
        use transformable_core::{Charset, MediaType, OutputConfiguration};

        let engines = engines();
        let plain = engines
            .compile(r#"<rules><append-text match="test" value="!"/></rules>"#, None)
            .unwrap();
        let slots: Vec<ProgramSlot> = vec![Some(plain.clone()), None, Some(plain)];
        let mut config = OutputConfiguration::new();
        config.set_media_type(Some(MediaType::parse("text/plain").unwrap()));
        config.set_encoding(Some(Charset::for_name("ISO-8859-1").unwrap()));
        let defaults = base_output_properties(&config, true);

        let mut buf = Vec::new();
        {
            let pipeline = compose(
                &engines,
                Some(&slots[..]),
                None,
                false,
                &listener(),
                Some(&defaults),
                Output::Stream(&mut buf),
            )
            .unwrap();
            let Output::Handler { mut handler, .. } = pipeline.into_entry() else {
                panic!("expected a chain");
            };
            Document::parse("<test>caf\u{e9}</test>")
                .unwrap()
                .emit(&mut handler)
                .unwrap();
        }
        assert_eq!(buf, b"caf\xe9!!");

        let header = content_type(Some(&slots[..]), &config).unwrap().unwrap();
        assert_eq!(header.essence(), "text/plain");
        assert!(header
            .param("charset")
            .unwrap()
            .eq_ignore_ascii_case("windows-1252"));
    }

    #[test]
    fn test_stage_construction_failure() {
        #[derive(Debug)]
        struct Foreign(transformable_core::OutputProperties);

        impl Program for Foreign {
            fn output_properties(&self) -> &transformable_core::OutputProperties {
                &self.0
            }

            fn system_id(&self) -> Option<&str> {
                None
            }

            fn into_any(self: Arc<Self>) -> Arc<dyn std::any::Any + Send + Sync> {
                self
            }
        }

        let engines = engines();
        let slots: Vec<ProgramSlot> = vec![Some(Arc::new(Foreign(Default::default())) as Arc<dyn Program>)];
        let mut buf = Vec::new();
        let err = compose(&engines, Some(&slots[..]), None, false, &listener(), None, Output::Stream(&mut buf))
            .unwrap_err();
        assert!(matches!(err, Error::EngineConstruction(_)));
    }
}
