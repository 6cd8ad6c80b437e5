#![forbid(unsafe_code)]

//! Core types shared across the transformable workspace.

pub mod charset;
pub mod error;
pub mod media;
pub mod output;

pub use charset::Charset;
pub use error::{Error, ErrorKind, Result};
pub use media::MediaType;
pub use output::{OutputConfiguration, OutputMethod, OutputProperties};
