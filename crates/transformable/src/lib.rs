#![forbid(unsafe_code)]

//! Documents and event streams serialized through chains of compiled
//! transforms.
//!
//! An entity pairs some content (a [`TransformableDocument`] tree, or an
//! [`EventEntity`] that writes events on demand) with output settings and an
//! ordered, possibly sparse list of compiled programs. Calling
//! [`Transformable::transform`] builds a fresh chain and pushes the content
//! through it into a sink.
//!
//! ```no_run
//! use transformable::{Output, Transformable, TransformableDocument};
//!
//! let doc = TransformableDocument::parse("<test>Hello World</test>")?;
//! let program = doc.settings().engines().compile(
//!     r#"<rules><append-text match="test" value="!"/></rules>"#,
//!     None,
//! )?;
//! doc.settings().set_transformations(Some(vec![Some(program)]));
//! doc.settings().set_omit_declaration(true);
//!
//! let mut out = Vec::new();
//! doc.transform(Output::stream(&mut out))?;
//! assert_eq!(out, b"<test>Hello World!</test>");
//! # Ok::<(), transformable::Error>(())
//! ```

pub mod document;
pub mod entity;
pub mod events;
pub mod settings;

pub use transformable_core as core;
pub use transformable_engine as engine;
pub use transformable_pipeline as pipeline;
pub use transformable_xml as xml;

pub use document::TransformableDocument;
pub use entity::{content_type, Phase, Transformable};
pub use events::{EventEntity, EventWriter};
pub use settings::{Snapshot, TransformSettings};

pub use transformable_core::{Charset, Error, ErrorKind, MediaType, OutputConfiguration};
pub use transformable_pipeline::{Parameters, ProgramSlot};
pub use transformable_xml::{ContentHandler, Document, Output};
