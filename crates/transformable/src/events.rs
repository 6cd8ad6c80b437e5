#![forbid(unsafe_code)]

//! Event-driven entities.

use crate::entity::sealed::{Produce, Producer};
use crate::entity::Transformable;
use crate::settings::TransformSettings;
use std::sync::Arc;
use transformable_core::Error;
use transformable_engine::Engines;
use transformable_xml::ContentHandler;

/// Writes a complete document as events on demand.
///
/// Implementations must emit `start_document` first and `end_document`
/// last; a buffering chain produces nothing until it sees the end. Calling
/// `transform` on the owning entity from inside `write_events` deadlocks.
pub trait EventWriter: Send + Sync {
    fn write_events(&self, handler: &mut dyn ContentHandler) -> Result<(), Error>;
}

impl<F> EventWriter for F
where
    F: Fn(&mut dyn ContentHandler) -> Result<(), Error> + Send + Sync,
{
    fn write_events(&self, handler: &mut dyn ContentHandler) -> Result<(), Error> {
        self(handler)
    }
}

/// An [`EventWriter`] with transform settings.
pub struct EventEntity<W> {
    writer: W,
    settings: TransformSettings,
}

impl<W: EventWriter> EventEntity<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            settings: TransformSettings::new(),
        }
    }

    pub fn with_engines(writer: W, engines: Arc<Engines>) -> Self {
        Self {
            writer,
            settings: TransformSettings::with_engines(engines),
        }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }
}

impl<W: EventWriter> Produce for EventEntity<W> {
    fn producer(&self) -> Producer {
        Producer::Events
    }

    fn produce(&self, handler: &mut dyn ContentHandler) -> Result<(), Error> {
        self.writer.write_events(handler)
    }
}

impl<W: EventWriter> Transformable for EventEntity<W> {
    fn settings(&self) -> &TransformSettings {
        &self.settings
    }
}
