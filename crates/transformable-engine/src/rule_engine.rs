#![forbid(unsafe_code)]

//! The reference engine: compiles rule sheets and builds [`RuleStage`]s.

use crate::engine::{Engine, ErrorListener, Program, Stage, FEATURE_INCREMENTAL};
use crate::rules::RuleSheet;
use crate::stage::RuleStage;
use std::sync::Arc;
use transformable_core::{Error, OutputMethod};

/// Engine for [`RuleSheet`] programs.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    incremental: bool,
    incremental_available: bool,
    methods: Arc<[OutputMethod]>,
}

impl RuleEngine {
    /// An engine supporting every output method and incremental processing.
    pub fn new() -> Self {
        Self {
            incremental: false,
            incremental_available: true,
            methods: Arc::from(vec![
                OutputMethod::Xml,
                OutputMethod::Html,
                OutputMethod::Xhtml,
                OutputMethod::Text,
            ]),
        }
    }

    /// Refuse the incremental feature, as a buffering-only engine would.
    pub fn without_incremental(mut self) -> Self {
        self.incremental_available = false;
        self.incremental = false;
        self
    }

    /// Restrict the output methods stages will serialize.
    pub fn with_output_methods(mut self, methods: impl IntoIterator<Item = OutputMethod>) -> Self {
        self.methods = methods.into_iter().collect::<Vec<_>>().into();
        self
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for RuleEngine {
    fn name(&self) -> &str {
        if self.incremental {
            "rules (incremental)"
        } else {
            "rules"
        }
    }

    fn compile(&self, source: &str, system_id: Option<&str>) -> Result<Arc<dyn Program>, Error> {
        let sheet = RuleSheet::compile(source, system_id)?;
        tracing::debug!(
            system_id = system_id.unwrap_or("-"),
            rules = sheet.rules().len(),
            "compiled rule sheet"
        );
        Ok(Arc::new(sheet))
    }

    fn new_stage<'a>(
        &mut self,
        program: Option<&Arc<dyn Program>>,
        listener: Arc<dyn ErrorListener>,
    ) -> Result<Box<dyn Stage<'a> + 'a>, Error> {
        let sheet = match program {
            None => Arc::new(RuleSheet::identity()),
            Some(program) => Arc::clone(program)
                .into_any()
                .downcast::<RuleSheet>()
                .map_err(|_| {
                    Error::EngineConstruction("program was not compiled by the rule engine".into())
                })?,
        };
        Ok(Box::new(RuleStage::new(
            sheet,
            self.incremental,
            Arc::clone(&self.methods),
            listener,
        )))
    }

    fn set_feature(&mut self, name: &str, value: bool) -> Result<(), Error> {
        match name {
            FEATURE_INCREMENTAL if value && !self.incremental_available => Err(
                Error::EngineConstruction("incremental processing is not available".into()),
            ),
            FEATURE_INCREMENTAL => {
                self.incremental = value;
                Ok(())
            }
            other => Err(Error::EngineConstruction(format!("unknown feature: {other}"))),
        }
    }

    fn supports_output_method(&self, method: &OutputMethod) -> bool {
        self.methods.contains(method)
    }
}
