#![forbid(unsafe_code)]

//! Tree-driven entities.

use crate::entity::sealed::{Produce, Producer};
use crate::entity::Transformable;
use crate::settings::TransformSettings;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use transformable_core::Error;
use transformable_engine::Engines;
use transformable_xml::{ContentHandler, Document};

/// A [`Document`] tree with transform settings.
///
/// The tree is locked for the whole of a transform, so it cannot change
/// while it is being serialized.
pub struct TransformableDocument {
    document: Mutex<Document>,
    settings: TransformSettings,
}

impl TransformableDocument {
    pub fn new(document: Document) -> Self {
        Self {
            document: Mutex::new(document),
            settings: TransformSettings::new(),
        }
    }

    pub fn with_engines(document: Document, engines: Arc<Engines>) -> Self {
        Self {
            document: Mutex::new(document),
            settings: TransformSettings::with_engines(engines),
        }
    }

    pub fn parse(text: &str) -> Result<Self, Error> {
        Document::parse(text).map(Self::new)
    }

    /// Parse a UTF-8 encoded file's contents.
    pub fn parse_bytes(data: &[u8]) -> Result<Self, Error> {
        Document::parse_bytes(data).map(Self::new)
    }

    /// Exclusive access to the tree.
    pub fn document(&self) -> MutexGuard<'_, Document> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn into_document(self) -> Document {
        self.document.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Produce for TransformableDocument {
    fn producer(&self) -> Producer {
        Producer::Tree
    }

    fn produce(&self, handler: &mut dyn ContentHandler) -> Result<(), Error> {
        self.document().emit(handler)
    }
}

impl Transformable for TransformableDocument {
    fn settings(&self) -> &TransformSettings {
        &self.settings
    }
}
