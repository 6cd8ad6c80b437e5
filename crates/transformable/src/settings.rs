#![forbid(unsafe_code)]

//! Per-entity output settings, transformation list and parameters.

use crate::entity::Phase;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use transformable_core::{Charset, Error, MediaType, OutputConfiguration};
use transformable_engine::{DefaultErrorListener, Engines, ErrorListener};
use transformable_pipeline::{inference, Parameters, ProgramSlot};

#[derive(Default)]
struct State {
    output: OutputConfiguration,
    transformations: Option<Vec<ProgramSlot>>,
    parameters: Option<Parameters>,
    phase: Phase,
}

/// A consistent copy of an entity's settings, taken under one lock.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub output: OutputConfiguration,
    pub transformations: Option<Vec<ProgramSlot>>,
    pub parameters: Option<Parameters>,
}

/// Settings shared by every kind of transformable entity.
///
/// Every accessor takes the same lock, so a reader never sees a
/// half-applied update. The lock is never held while content is produced,
/// which keeps accessors usable from inside an
/// [`EventWriter`](crate::EventWriter).
pub struct TransformSettings {
    state: Mutex<State>,
    engines: Arc<Engines>,
    listener: Mutex<Arc<dyn ErrorListener>>,
    pub(crate) transform_lock: Mutex<()>,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformSettings {
    /// Settings using the process-wide [`Engines`].
    pub fn new() -> Self {
        Self::with_engines(Engines::shared())
    }

    pub fn with_engines(engines: Arc<Engines>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            engines,
            listener: Mutex::new(Arc::new(DefaultErrorListener)),
            transform_lock: Mutex::new(()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn engines(&self) -> &Arc<Engines> {
        &self.engines
    }

    pub fn error_listener(&self) -> Arc<dyn ErrorListener> {
        Arc::clone(&self.listener.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn set_error_listener(&self, listener: Arc<dyn ErrorListener>) {
        *self.listener.lock().unwrap_or_else(PoisonError::into_inner) = listener;
    }

    pub fn output_configuration(&self) -> OutputConfiguration {
        self.state().output.clone()
    }

    pub fn set_output_configuration(&self, output: OutputConfiguration) {
        self.state().output = output;
    }

    /// Edit the output configuration in place under the settings lock.
    ///
    /// Readers see either all of the edits or none of them.
    pub fn update_output_configuration<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut OutputConfiguration) -> R,
    {
        f(&mut self.state().output)
    }

    pub fn media_type(&self) -> Option<MediaType> {
        self.state().output.media_type().cloned()
    }

    pub fn set_media_type(&self, media_type: Option<MediaType>) {
        self.state().output.set_media_type(media_type);
    }

    pub fn encoding(&self) -> Option<Charset> {
        self.state().output.encoding()
    }

    pub fn set_encoding(&self, encoding: Option<Charset>) {
        self.state().output.set_encoding(encoding);
    }

    pub fn system_id(&self) -> Option<String> {
        self.state().output.system_id().map(str::to_owned)
    }

    pub fn set_system_id(&self, system_id: Option<String>) {
        self.state().output.set_system_id(system_id);
    }

    pub fn public_id(&self) -> Option<String> {
        self.state().output.public_id().map(str::to_owned)
    }

    pub fn set_public_id(&self, public_id: Option<String>) {
        self.state().output.set_public_id(public_id);
    }

    pub fn indent(&self) -> bool {
        self.state().output.indent()
    }

    pub fn set_indent(&self, indent: bool) {
        self.state().output.set_indent(indent);
    }

    pub fn omit_declaration(&self) -> bool {
        self.state().output.omit_declaration()
    }

    pub fn set_omit_declaration(&self, omit_declaration: bool) {
        self.state().output.set_omit_declaration(omit_declaration);
    }

    pub fn incremental(&self) -> bool {
        self.state().output.incremental()
    }

    /// Prefer the incremental engine instance when one is available.
    pub fn set_incremental(&self, incremental: bool) {
        self.state().output.set_incremental(incremental);
    }

    pub fn transformations(&self) -> Option<Vec<ProgramSlot>> {
        self.state().transformations.clone()
    }

    /// Replace the transformation list. `None` slots are skipped when the
    /// chain is built.
    pub fn set_transformations(&self, transformations: Option<Vec<ProgramSlot>>) {
        self.state().transformations = transformations;
    }

    /// Edit the transformation list in place under the settings lock.
    pub fn update_transformations<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Option<Vec<ProgramSlot>>) -> R,
    {
        f(&mut self.state().transformations)
    }

    pub fn parameters(&self) -> Option<Parameters> {
        self.state().parameters.clone()
    }

    /// Replace the parameters bound on every stage.
    pub fn set_parameters(&self, parameters: Option<Parameters>) {
        self.state().parameters = parameters;
    }

    pub fn set_parameter(&self, name: impl Into<String>, value: impl Into<String>) {
        self.state()
            .parameters
            .get_or_insert_with(Parameters::new)
            .insert(name.into(), value.into());
    }

    /// Phase of the current or most recent transform.
    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    pub(crate) fn set_phase(&self, phase: Phase) {
        self.state().phase = phase;
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.state();
        Snapshot {
            output: state.output.clone(),
            transformations: state.transformations.clone(),
            parameters: state.parameters.clone(),
        }
    }

    /// Media type the configured chain will produce.
    pub fn output_media_type(&self) -> Result<Option<MediaType>, Error> {
        let state = self.state();
        inference::output_media_type(state.transformations.as_deref(), &state.output)
    }

    /// Encoding the configured chain will produce.
    pub fn output_encoding(&self) -> Result<Option<Charset>, Error> {
        let state = self.state();
        inference::output_encoding(state.transformations.as_deref(), &state.output)
    }

    /// Header-style content type of what the configured chain will produce.
    pub fn content_type(&self) -> Result<Option<MediaType>, Error> {
        let state = self.state();
        inference::content_type(state.transformations.as_deref(), &state.output)
    }
}
