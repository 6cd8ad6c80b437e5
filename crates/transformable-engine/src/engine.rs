#![forbid(unsafe_code)]

//! Engine, program and stage traits.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use transformable_core::{Error, OutputMethod, OutputProperties};
use transformable_xml::{ContentHandler, Output};

/// Feature switch for incremental processing: stages forward output while
/// input is still arriving instead of buffering the whole document.
pub const FEATURE_INCREMENTAL: &str = "urn:transformable:feature:incremental";

/// A compiled, reusable transform program.
///
/// One program can back any number of independent stages.
pub trait Program: Send + Sync + fmt::Debug {
    /// Output properties the program declares for its own output.
    fn output_properties(&self) -> &OutputProperties;

    /// Where the program was compiled from, if known.
    fn system_id(&self) -> Option<&str>;

    /// Recover the concrete program type; engines use this to accept only
    /// their own programs.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// One streaming unit of a chain: consumes events, produces events.
pub trait Stage<'a>: ContentHandler {
    /// Bind a program parameter for this stage.
    fn set_parameter(&mut self, name: &str, value: &str);

    /// Override the program's declared output properties.
    ///
    /// Only consulted when the destination is a byte stream.
    fn set_output_properties(&mut self, props: OutputProperties);

    /// Fill the properties the program leaves undeclared from `defaults`.
    ///
    /// Declared values win, unlike [`Stage::set_output_properties`].
    fn inherit_output_properties(&mut self, defaults: &OutputProperties);

    fn output_properties(&self) -> &OutputProperties;

    fn set_destination(&mut self, destination: Output<'a>);

    fn system_id(&self) -> Option<&str>;
}

/// Receives diagnostics raised while a stage runs.
///
/// Returning `Err` aborts the transform with that error.
pub trait ErrorListener: Send + Sync {
    fn warning(&self, error: &Error) -> Result<(), Error>;

    fn error(&self, error: &Error) -> Result<(), Error>;

    fn fatal(&self, error: Error) -> Result<(), Error> {
        Err(error)
    }
}

/// Ignores warnings and recoverable errors, fails on fatal errors.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultErrorListener;

impl ErrorListener for DefaultErrorListener {
    fn warning(&self, error: &Error) -> Result<(), Error> {
        tracing::trace!(%error, "transform warning");
        Ok(())
    }

    fn error(&self, error: &Error) -> Result<(), Error> {
        tracing::trace!(%error, "recoverable transform error");
        Ok(())
    }
}

/// A transform engine instance.
///
/// Instances are not safe to configure concurrently; callers hold a lock
/// around every call (see [`Engines`](crate::Engines)). Stages they produce
/// are independent of the engine once built.
pub trait Engine: Send {
    fn name(&self) -> &str;

    /// Compile a program from its source text.
    fn compile(&self, source: &str, system_id: Option<&str>) -> Result<Arc<dyn Program>, Error>;

    /// Build a stage for `program`, or an identity stage for `None`.
    fn new_stage<'a>(
        &mut self,
        program: Option<&Arc<dyn Program>>,
        listener: Arc<dyn ErrorListener>,
    ) -> Result<Box<dyn Stage<'a> + 'a>, Error>;

    /// Switch an engine feature on or off; unknown features are an error.
    fn set_feature(&mut self, name: &str, value: bool) -> Result<(), Error>;

    fn supports_output_method(&self, method: &OutputMethod) -> bool;
}
