#![forbid(unsafe_code)]

//! Transform engine abstraction for transformable.
//!
//! The pipeline only talks to an engine through the [`Engine`], [`Program`]
//! and [`Stage`] traits. [`RuleEngine`] is a small reference engine whose
//! programs are XML rule sheets; it is enough to drive real chains but is
//! not an XSLT processor.

pub mod engine;
pub mod registry;
pub mod rule_engine;
pub mod rules;
pub mod stage;

pub use engine::{DefaultErrorListener, Engine, ErrorListener, Program, Stage, FEATURE_INCREMENTAL};
pub use registry::Engines;
pub use rule_engine::RuleEngine;
pub use rules::{Matcher, Rule, RuleSheet, TextValue};
pub use stage::RuleStage;
