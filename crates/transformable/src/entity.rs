#![forbid(unsafe_code)]

//! The shared transform contract.

use crate::settings::{Snapshot, TransformSettings};
use std::fmt;
use std::sync::{Arc, PoisonError};
use transformable_core::{Error, MediaType};
use transformable_pipeline::{compose, configure_base_stage, inference};
use transformable_xml::Output;

pub(crate) mod sealed {
    use transformable_core::Error;
    use transformable_xml::ContentHandler;

    /// How an entity produces its events.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Producer {
        Tree,
        Events,
    }

    pub trait Produce {
        fn producer(&self) -> Producer;

        /// Push the entity's complete document into `handler`.
        fn produce(&self, handler: &mut dyn ContentHandler) -> Result<(), Error>;
    }
}

use sealed::Producer;

/// Where a transform pass is, or where it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    /// Output properties and the chain are being built. Nothing has been
    /// written yet.
    Configuring,
    /// Events are flowing; the sink may have received bytes.
    Producing,
    Complete,
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Configuring => "configuring",
            Self::Producing => "producing",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entity that can be serialized through its configured transform chain.
///
/// Implemented by [`TransformableDocument`](crate::TransformableDocument)
/// and [`EventEntity`](crate::EventEntity) only.
pub trait Transformable: sealed::Produce {
    fn settings(&self) -> &TransformSettings;

    /// Build a fresh chain from the current settings and push the entity's
    /// content through it into `sink`.
    ///
    /// Transforms on one entity run one at a time. Configuration failures
    /// are returned before anything reaches `sink`; I/O failures from the
    /// sink come back as [`Error::Io`] however deeply the engine wrapped
    /// them.
    fn transform(&self, sink: Output<'_>) -> Result<(), Error> {
        run(self, sink)
    }
}

/// Header-style content type of what `entity` will produce.
pub fn content_type<T: Transformable + ?Sized>(entity: &T) -> Result<Option<MediaType>, Error> {
    entity.settings().content_type()
}

fn run<T: Transformable + ?Sized>(entity: &T, sink: Output<'_>) -> Result<(), Error> {
    let settings = entity.settings();
    let _serial = settings
        .transform_lock
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let producer = entity.producer();
    let span = tracing::debug_span!("transform", ?producer);
    let _entered = span.enter();

    let mut phase = Phase::Configuring;
    settings.set_phase(phase);
    match execute(entity, settings, sink, &mut phase) {
        Ok(()) => {
            settings.set_phase(Phase::Complete);
            tracing::trace!("transform complete");
            Ok(())
        }
        Err(error) => {
            let error = translate(producer, error);
            settings.set_phase(Phase::Failed);
            tracing::debug!(%phase, kind = ?error.kind(), %error, "transform failed");
            Err(error)
        }
    }
}

fn execute<T: Transformable + ?Sized>(
    entity: &T,
    settings: &TransformSettings,
    sink: Output<'_>,
    phase: &mut Phase,
) -> Result<(), Error> {
    let Snapshot {
        output,
        transformations,
        parameters,
    } = settings.snapshot();
    let slots = transformations.as_deref();
    inference::output_media_type(slots, &output)?;
    inference::output_encoding(slots, &output)?;

    let engines = settings.engines();
    let listener = settings.error_listener();
    let incremental = output.incremental();

    let mut base = engines.new_stage(None, incremental, Arc::clone(&listener))?;
    let base_props = configure_base_stage(base.as_mut(), &output, engines);
    let pipeline = compose(
        engines,
        slots,
        parameters.as_ref(),
        incremental,
        &listener,
        Some(&base_props),
        sink,
    )?;
    tracing::trace!(stages = pipeline.len(), incremental, "chain built");
    base.set_destination(pipeline.into_entry());

    *phase = Phase::Producing;
    settings.set_phase(*phase);
    entity.produce(&mut base)
}

/// Unwrap buried I/O failures; event writers' handler failures become
/// transform failures.
fn translate(producer: Producer, error: Error) -> Error {
    match error.into_io_cause() {
        sax @ Error::Sax { .. } if producer == Producer::Events => {
            Error::transform_caused_by("event writer failed", sax)
        }
        other => other,
    }
}
