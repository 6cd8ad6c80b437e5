#![forbid(unsafe_code)]

//! Chain composition for transformable.
//!
//! Turns an ordered, possibly sparse list of compiled programs into a
//! connected chain of stages in front of a sink, configures the base stage
//! from an entity's output configuration, and infers the media type and
//! encoding the chain will produce.

pub mod base;
pub mod compose;
pub mod inference;

use std::collections::BTreeMap;
use std::sync::Arc;
use transformable_engine::Program;

pub use base::{base_output_properties, configure_base_stage, default_method};
pub use compose::{compose, Pipeline, StageInput};
pub use inference::{content_type, last_present, output_encoding, output_media_type};

/// One slot of a transformation list; `None` skips the slot.
pub type ProgramSlot = Option<Arc<dyn Program>>;

/// Parameters bound on every stage of a chain.
pub type Parameters = BTreeMap<String, String>;
