#![forbid(unsafe_code)]

//! Document trees, event streams and serialization for transformable.
//!
//! Events are the currency between stages: a [`Document`] is emitted as
//! events, stages consume and produce events, and the end of a chain is
//! either a [`Serializer`] writing bytes or a [`TreeBuilder`] rebuilding a
//! tree.

pub mod document;
pub mod escape;
pub mod event;
pub mod serializer;
pub mod tree_builder;

pub use document::{Document, Element, Node};
pub use event::{Attribute, ContentHandler, Output, XmlEvent};
pub use serializer::Serializer;
pub use tree_builder::TreeBuilder;

/// roxmltree parsing options used for every parse in the workspace.
///
/// DTDs are allowed: roxmltree only expands internal entities, never
/// external ones.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    }
}
