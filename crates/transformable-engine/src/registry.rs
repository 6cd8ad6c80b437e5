#![forbid(unsafe_code)]

//! The process-wide engine capability object.
//!
//! [`Engines`] holds a standard engine instance, an optional incremental
//! instance and the detected capabilities. Detection happens once,
//! when the value is built; afterwards the value is never mutated. The
//! shared instance is created lazily on first use unless [`Engines::install`]
//! provided one before that.

use crate::engine::{DefaultErrorListener, Engine, ErrorListener, Program, Stage, FEATURE_INCREMENTAL};
use crate::rule_engine::RuleEngine;
use once_cell::sync::OnceCell;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use transformable_core::{Error, OutputMethod, OutputProperties};
use transformable_xml::{Document, Output};

static SHARED: OnceCell<Arc<Engines>> = OnceCell::new();

/// A harmless document pushed through the XHTML trial transform.
const XHTML_TRIAL: &str = "<html><head><title>Test</title></head><body></body></html>";

/// Engine instances plus their detected capabilities.
pub struct Engines {
    standard: Mutex<Box<dyn Engine>>,
    incremental: Option<Mutex<Box<dyn Engine>>>,
    xhtml_output: bool,
}

impl Engines {
    /// Build engine instances with `make` and detect their capabilities.
    ///
    /// `make` is called twice: once for the standard instance and once for
    /// the candidate incremental instance. A candidate that refuses the
    /// incremental feature is dropped.
    pub fn detect<F>(make: F) -> Self
    where
        F: Fn() -> Box<dyn Engine>,
    {
        let mut standard = make();
        let xhtml_output = standard.supports_output_method(&OutputMethod::Xhtml)
            && trial_xhtml_output(standard.as_mut());

        let mut candidate = make();
        let incremental = match candidate.set_feature(FEATURE_INCREMENTAL, true) {
            Ok(()) => Some(Mutex::new(candidate)),
            Err(error) => {
                tracing::debug!(engine = candidate.name(), %error, "incremental processing unavailable");
                None
            }
        };

        tracing::debug!(
            engine = standard.name(),
            xhtml_output,
            incremental = incremental.is_some(),
            "detected engine capabilities"
        );
        Self {
            standard: Mutex::new(standard),
            incremental,
            xhtml_output,
        }
    }

    /// The shared instance, backed by [`RuleEngine`] unless one was installed.
    pub fn shared() -> Arc<Engines> {
        Arc::clone(SHARED.get_or_init(|| Arc::new(Engines::detect(|| Box::new(RuleEngine::new())))))
    }

    /// Install the shared instance. Fails once the shared instance exists.
    pub fn install(engines: Engines) -> Result<Arc<Engines>, Error> {
        let engines = Arc::new(engines);
        SHARED
            .set(Arc::clone(&engines))
            .map_err(|_| Error::Other("shared engines are already initialized".into()))?;
        Ok(engines)
    }

    /// Name of the standard engine.
    pub fn engine_name(&self) -> Result<String, Error> {
        Ok(lock(&self.standard)?.name().to_owned())
    }

    /// Can the standard engine serialize with the `xhtml` method?
    pub fn supports_xhtml_output(&self) -> bool {
        self.xhtml_output
    }

    /// Is there an instance with incremental processing switched on?
    pub fn supports_incremental(&self) -> bool {
        self.incremental.is_some()
    }

    /// Compile a program with the standard engine.
    pub fn compile(&self, source: &str, system_id: Option<&str>) -> Result<Arc<dyn Program>, Error> {
        lock(&self.standard)?.compile(source, system_id)
    }

    /// Build a stage on the selected instance, holding only that instance's lock.
    ///
    /// `incremental` falls back to the standard instance when no incremental
    /// instance exists.
    pub fn new_stage<'a>(
        &self,
        program: Option<&Arc<dyn Program>>,
        incremental: bool,
        listener: Arc<dyn ErrorListener>,
    ) -> Result<Box<dyn Stage<'a> + 'a>, Error> {
        let slot = match (&self.incremental, incremental) {
            (Some(slot), true) => slot,
            _ => &self.standard,
        };
        lock(slot)?.new_stage(program, listener)
    }
}

fn lock(slot: &Mutex<Box<dyn Engine>>) -> Result<MutexGuard<'_, Box<dyn Engine>>, Error> {
    slot.lock()
        .map_err(|_| Error::Other("engine lock poisoned".into()))
}

/// Run a trial transform with the `xhtml` method and report whether it worked.
fn trial_xhtml_output(engine: &mut dyn Engine) -> bool {
    match trial_xhtml_transform(engine) {
        Ok(()) => true,
        Err(error) => {
            tracing::debug!(engine = engine.name(), %error, "xhtml output method unavailable");
            false
        }
    }
}

fn trial_xhtml_transform(engine: &mut dyn Engine) -> Result<(), Error> {
    let mut sink = io::sink();
    let listener: Arc<dyn ErrorListener> = Arc::new(DefaultErrorListener);
    let mut stage = engine.new_stage(None, listener)?;
    let mut props = OutputProperties::new();
    props.method = Some(OutputMethod::Xhtml);
    stage.set_output_properties(props);
    stage.set_destination(Output::Stream(&mut sink));
    Document::parse(XHTML_TRIAL)?.emit(&mut stage)
}
