#![forbid(unsafe_code)]

//! Infer what a chain will produce without running it.
//!
//! The last present program decides. When it declares nothing for a
//! property, or no program is present, the entity's own configuration
//! answers instead.

use crate::ProgramSlot;
use std::sync::Arc;
use transformable_core::{Charset, Error, MediaType, OutputConfiguration};
use transformable_engine::Program;

/// The last non-skipped program of a transformation list.
pub fn last_present(transformations: Option<&[ProgramSlot]>) -> Option<&Arc<dyn Program>> {
    transformations?.iter().rev().flatten().next()
}

/// Media type the chain will produce.
pub fn output_media_type(
    transformations: Option<&[ProgramSlot]>,
    config: &OutputConfiguration,
) -> Result<Option<MediaType>, Error> {
    let declared = last_present(transformations)
        .and_then(|program| program.output_properties().media_type.as_deref());
    match declared {
        Some(text) => MediaType::parse(text).map(Some),
        None => Ok(config.media_type().cloned()),
    }
}

/// Character encoding the chain will produce.
pub fn output_encoding(
    transformations: Option<&[ProgramSlot]>,
    config: &OutputConfiguration,
) -> Result<Option<Charset>, Error> {
    let declared = last_present(transformations)
        .and_then(|program| program.output_properties().encoding.as_deref());
    match declared {
        Some(name) => Charset::for_name(name).map(Some),
        None => Ok(config.encoding()),
    }
}

/// Header-style content type: the inferred media type with the inferred
/// encoding as its `charset` parameter.
pub fn content_type(
    transformations: Option<&[ProgramSlot]>,
    config: &OutputConfiguration,
) -> Result<Option<MediaType>, Error> {
    let Some(media_type) = output_media_type(transformations, config)? else {
        return Ok(None);
    };
    match output_encoding(transformations, config)? {
        Some(charset) => media_type.with_charset(charset.name()).map(Some),
        None => Ok(Some(media_type)),
    }
}
