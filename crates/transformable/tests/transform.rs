//! End-to-end transforms through document and event entities.

use std::io::{self, Write};
use std::sync::{Arc, Weak};
use transformable::core::OutputMethod;
use transformable::engine::{Engines, Program, RuleEngine};
use transformable::xml::{Document, TreeBuilder};
use transformable::{
    content_type, Charset, ContentHandler, Error, ErrorKind, EventEntity, MediaType, Output, Phase,
    ProgramSlot, Transformable, TransformableDocument,
};

const APPEND_BANG: &str = r#"<rules>
  <output omit-xml-declaration="yes"/>
  <append-text match="test" value="!"/>
</rules>"#;

fn engines() -> Arc<Engines> {
    Arc::new(Engines::detect(|| Box::new(RuleEngine::new())))
}

fn hello(engines: &Arc<Engines>) -> TransformableDocument {
    let doc = TransformableDocument::with_engines(
        Document::parse("<test>Hello World</test>").unwrap(),
        Arc::clone(engines),
    );
    doc.settings().set_indent(false);
    doc.settings().set_omit_declaration(true);
    doc
}

fn bang(engines: &Engines) -> ProgramSlot {
    Some(engines.compile(APPEND_BANG, Some("urn:test:bang")).unwrap())
}

fn render(entity: &dyn Transformable) -> String {
    let mut out = Vec::new();
    entity.transform(Output::stream(&mut out)).unwrap();
    String::from_utf8(out).unwrap()
}

fn render_with(slots: Vec<ProgramSlot>) -> String {
    let engines = engines();
    let doc = hello(&engines);
    doc.settings().set_transformations(Some(slots));
    render(&doc)
}

#[test]
fn test_no_transformations() {
    let engines = engines();
    assert_eq!(render(&hello(&engines)), "<test>Hello World</test>");
}

#[test]
fn test_single_transformation() {
    let e = engines();
    assert_eq!(render_with(vec![bang(&e)]), "<test>Hello World!</test>");
}

#[test]
fn test_chained_transformations() {
    let e = engines();
    assert_eq!(render_with(vec![bang(&e), bang(&e)]), "<test>Hello World!!</test>");
}

#[test]
fn test_trailing_skip() {
    let e = engines();
    assert_eq!(
        render_with(vec![bang(&e), bang(&e), None]),
        "<test>Hello World!!</test>"
    );
}

#[test]
fn test_middle_skip() {
    let e = engines();
    assert_eq!(
        render_with(vec![bang(&e), bang(&e), None, bang(&e)]),
        "<test>Hello World!!!</test>"
    );
}

#[test]
fn test_leading_skip() {
    let e = engines();
    assert_eq!(
        render_with(vec![None, bang(&e), None, bang(&e)]),
        "<test>Hello World!!</test>"
    );
}

#[test]
fn test_all_skipped_renders_untransformed() {
    assert_eq!(render_with(vec![None, None]), "<test>Hello World</test>");
    assert_eq!(render_with(Vec::new()), "<test>Hello World</test>");
}

#[test]
fn test_transform_is_repeatable() {
    let e = engines();
    let doc = hello(&e);
    doc.settings().set_transformations(Some(vec![bang(&e), None, bang(&e)]));
    let first = render(&doc);
    let second = render(&doc);
    assert_eq!(first, "<test>Hello World!!</test>");
    assert_eq!(first, second);
    assert_eq!(doc.settings().phase(), Phase::Complete);
}

#[test]
fn test_incremental_matches_buffered() {
    let e = engines();
    assert!(e.supports_incremental());
    let doc = hello(&e);
    doc.settings().set_transformations(Some(vec![bang(&e), bang(&e)]));
    let buffered = render(&doc);
    doc.settings().set_incremental(true);
    assert_eq!(render(&doc), buffered);
}

#[test]
fn test_parameters_bound_on_every_stage() {
    let e = engines();
    let marked = e
        .compile(
            r#"<rules>
                 <output omit-xml-declaration="yes"/>
                 <param name="mark" default="!"/>
                 <append-text match="test" param="mark"/>
               </rules>"#,
            None,
        )
        .unwrap();
    let doc = hello(&e);
    doc.settings()
        .set_transformations(Some(vec![Some(marked.clone()), None, Some(marked)]));
    assert_eq!(render(&doc), "<test>Hello World!!</test>");

    doc.settings().set_parameter("mark", "?");
    assert_eq!(render(&doc), "<test>Hello World??</test>");
}

#[test]
fn test_rename_and_attributes_across_stages() {
    let e = engines();
    let rename = e
        .compile(r#"<rules><rename match="test" to="greeting"/></rules>"#, None)
        .unwrap();
    let annotate = e
        .compile(
            r#"<rules>
                 <output omit-xml-declaration="yes"/>
                 <set-attribute match="greeting" name="lang" value="en"/>
               </rules>"#,
            None,
        )
        .unwrap();
    let doc = hello(&e);
    doc.settings()
        .set_transformations(Some(vec![Some(rename), Some(annotate)]));
    assert_eq!(render(&doc), "<greeting lang=\"en\">Hello World</greeting>");
}

#[test]
fn test_inference_without_transformations() {
    let e = engines();
    let doc = hello(&e);
    doc.settings().set_media_type(Some(MediaType::parse("text/xml").unwrap()));
    doc.settings().set_encoding(Some(Charset::for_name("ISO-8859-1").unwrap()));
    assert_eq!(
        doc.settings().output_media_type().unwrap().unwrap().essence(),
        "text/xml"
    );
    assert_eq!(
        doc.settings().output_encoding().unwrap(),
        Some(Charset::for_name("ISO-8859-1").unwrap())
    );
}

#[test]
fn test_inference_uses_last_transformation() {
    let e = engines();
    let declares = e
        .compile(r#"<rules><output media-type="text/html" encoding="UTF-8"/></rules>"#, None)
        .unwrap();
    for n in 0..4 {
        let doc = hello(&e);
        doc.settings().set_media_type(Some(MediaType::parse("text/plain").unwrap()));
        let mut slots: Vec<ProgramSlot> = (0..n).map(|_| bang(&e)).collect();
        slots.push(Some(Arc::clone(&declares)));
        doc.settings().set_transformations(Some(slots));

        let media = doc.settings().output_media_type().unwrap().unwrap();
        assert_eq!(media.essence(), "text/html");
        let header = content_type(&doc).unwrap().unwrap();
        assert_eq!(header.essence(), "text/html");
        assert!(header.param("charset").unwrap().eq_ignore_ascii_case("utf-8"));
    }
}

#[test]
fn test_bad_declared_encoding_writes_nothing() {
    let e = engines();
    let bad = e
        .compile(r#"<rules><output encoding="no-such-charset"/></rules>"#, None)
        .unwrap();
    let doc = hello(&e);
    doc.settings().set_transformations(Some(vec![bang(&e), Some(bad)]));

    let mut out = Vec::new();
    let err = doc.transform(Output::stream(&mut out)).unwrap_err();
    assert!(matches!(err, Error::UnsupportedEncoding(_)));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(out.is_empty());
    assert_eq!(doc.settings().phase(), Phase::Failed);
}

#[test]
fn test_bad_declared_media_type_writes_nothing() {
    let e = engines();
    let bad = e
        .compile(r#"<rules><output media-type="html"/></rules>"#, None)
        .unwrap();
    let doc = hello(&e);
    doc.settings().set_transformations(Some(vec![Some(bad)]));

    let mut out = Vec::new();
    let err = doc.transform(Output::stream(&mut out)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(out.is_empty());
}

struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_io_failure_surfaces_as_io() {
    let e = engines();
    for slots in [None, Some(vec![bang(&e)]), Some(vec![None, bang(&e), bang(&e)])] {
        let doc = hello(&e);
        doc.settings().set_transformations(slots);
        let err = doc.transform(Output::stream(&mut BrokenPipe)).unwrap_err();
        match err {
            Error::Io(io) => assert_eq!(io.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("expected an I/O error, got {other:?}"),
        }
    }
}

#[test]
fn test_io_failure_from_event_entity() {
    let entity = EventEntity::with_engines(
        |h: &mut dyn ContentHandler| {
            h.start_document()?;
            h.start_element("test", &[])?;
            h.characters("Hello World")?;
            h.end_element("test")?;
            h.end_document()
        },
        engines(),
    );
    let err = entity.transform(Output::stream(&mut BrokenPipe)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn test_xhtml_method_when_supported() {
    let e = engines();
    assert!(e.supports_xhtml_output());
    let doc = TransformableDocument::with_engines(
        Document::parse("<html><body><br/><p/></body></html>").unwrap(),
        e,
    );
    doc.settings()
        .set_media_type(Some(MediaType::parse("application/xhtml+xml").unwrap()));
    doc.settings().set_omit_declaration(true);
    assert_eq!(render(&doc), "<html><body><br /><p></p></body></html>");
}

#[test]
fn test_xml_method_when_xhtml_unsupported() {
    let e = Arc::new(Engines::detect(|| {
        Box::new(RuleEngine::new().with_output_methods([
            OutputMethod::Xml,
            OutputMethod::Html,
            OutputMethod::Text,
        ]))
    }));
    assert!(!e.supports_xhtml_output());
    let doc = TransformableDocument::with_engines(
        Document::parse("<html><body><br/><p/></body></html>").unwrap(),
        e,
    );
    doc.settings()
        .set_media_type(Some(MediaType::parse("application/xhtml+xml").unwrap()));
    doc.settings().set_omit_declaration(true);
    assert_eq!(render(&doc), "<html><body><br/><p/></body></html>");
}

#[test]
fn test_text_media_type() {
    let e = engines();
    let doc = hello(&e);
    doc.settings().set_media_type(Some(MediaType::parse("text/plain").unwrap()));
    doc.settings().set_transformations(Some(vec![None]));
    assert_eq!(render(&doc), "Hello World");
}

#[test]
fn test_encoding_is_applied() {
    let e = engines();
    let doc = TransformableDocument::with_engines(
        Document::parse("<test>caf\u{e9} \u{263a}</test>").unwrap(),
        e,
    );
    doc.settings().set_encoding(Some(Charset::for_name("ISO-8859-1").unwrap()));
    let mut out = Vec::new();
    doc.transform(Output::stream(&mut out)).unwrap();
    assert!(out.starts_with(b"<?xml version=\"1.0\" encoding=\"windows-1252\"?>"));
    assert!(out.ends_with(b"<test>caf\xe9 &#9786;</test>"));
}

#[test]
fn test_content_type_matches_chain_output() {
    let e = engines();
    let plain = e
        .compile(r#"<rules><append-text match="test" value="!"/></rules>"#, None)
        .unwrap();
    let cases: [(&str, &[u8]); 2] = [
        ("text/plain", b"caf\xe9!"),
        (
            "text/xml",
            b"<?xml version=\"1.0\" encoding=\"windows-1252\"?><test>caf\xe9!</test>",
        ),
    ];
    for (media_type, expected) in cases {
        let doc = TransformableDocument::with_engines(
            Document::parse("<test>caf\u{e9}</test>").unwrap(),
            Arc::clone(&e),
        );
        doc.settings().set_media_type(Some(MediaType::parse(media_type).unwrap()));
        doc.settings().set_encoding(Some(Charset::for_name("ISO-8859-1").unwrap()));
        doc.settings().set_transformations(Some(vec![Some(Arc::clone(&plain))]));

        let header = content_type(&doc).unwrap().unwrap();
        assert_eq!(header.essence(), media_type);
        let charset = header.param("charset").unwrap();
        assert!(charset.eq_ignore_ascii_case("windows-1252"));

        let mut out = Vec::new();
        doc.transform(Output::stream(&mut out)).unwrap();
        assert_eq!(out, expected);
        assert!(std::str::from_utf8(&out).is_err());
    }
}

#[test]
fn test_chain_into_tree_builder() {
    let e = engines();
    let doc = hello(&e);
    doc.settings().set_transformations(Some(vec![bang(&e)]));
    let mut tree = Document::new();
    doc.transform(Output::handler(TreeBuilder::new(&mut tree))).unwrap();
    assert_eq!(tree.root_element().unwrap().text(), "Hello World!");
}

#[test]
fn test_event_entity_through_chain() {
    let e = engines();
    let entity = EventEntity::with_engines(
        |h: &mut dyn ContentHandler| {
            h.start_document()?;
            h.start_element("test", &[])?;
            h.characters("Hello ")?;
            h.characters("World")?;
            h.end_element("test")?;
            h.end_document()
        },
        Arc::clone(&e),
    );
    entity
        .settings()
        .set_transformations(Some(vec![None, bang(&e), bang(&e)]));
    assert_eq!(render(&entity), "<test>Hello World!!</test>");
}

type BoxedWriter = Box<dyn Fn(&mut dyn ContentHandler) -> Result<(), Error> + Send + Sync>;

#[test]
fn test_settings_usable_from_event_writer() {
    let e = engines();
    let entity = Arc::new_cyclic(|weak: &Weak<EventEntity<BoxedWriter>>| {
        let weak = weak.clone();
        let writer: BoxedWriter = Box::new(move |h: &mut dyn ContentHandler| {
            let omit = weak
                .upgrade()
                .map(|entity| entity.settings().omit_declaration())
                .unwrap_or_default();
            h.start_document()?;
            h.start_element("test", &[("omit", if omit { "yes" } else { "no" })])?;
            h.end_element("test")?;
            h.end_document()
        });
        EventEntity::with_engines(writer, Arc::clone(&e))
    });
    entity.settings().set_omit_declaration(true);
    assert_eq!(render(&*entity), "<test omit=\"yes\"/>");
}

#[test]
fn test_program_system_ids_are_kept() {
    let e = engines();
    let program: Arc<dyn Program> = e.compile(APPEND_BANG, Some("urn:test:bang")).unwrap();
    assert_eq!(program.system_id(), Some("urn:test:bang"));
}
