#![forbid(unsafe_code)]

//! Serialization properties for the first stage of a chain.

use transformable_core::{MediaType, OutputConfiguration, OutputMethod, OutputProperties};
use transformable_engine::{Engines, Stage};

/// Output method implied by a media type.
///
/// XML-family types map to `xml`, or to `xhtml` for HTML-flavoured XML when
/// the engine can write it. Plain `text/html` maps to `html` and any other
/// `text/*` to `text`. Everything else leaves the engine default in place.
pub fn default_method(media_type: &MediaType, xhtml_output: bool) -> Option<OutputMethod> {
    if media_type.is_xml() {
        if xhtml_output && media_type.is_html() {
            return Some(OutputMethod::Xhtml);
        }
        return Some(OutputMethod::Xml);
    }
    if media_type.matches("text", "html") {
        return Some(OutputMethod::Html);
    }
    if media_type.is_text() {
        return Some(OutputMethod::Text);
    }
    None
}

/// Translate an entity's configuration into base-stage output properties.
///
/// `indent` and `omit-xml-declaration` are always set explicitly.
pub fn base_output_properties(config: &OutputConfiguration, xhtml_output: bool) -> OutputProperties {
    let mut props = OutputProperties::new();
    if let Some(media_type) = config.media_type() {
        props.media_type = Some(media_type.to_string());
        props.method = default_method(media_type, xhtml_output);
    }
    props.encoding = config.encoding().map(|charset| charset.name().to_owned());
    props.doctype_system = config.system_id().map(str::to_owned);
    props.doctype_public = config.public_id().map(str::to_owned);
    props.indent = Some(config.indent());
    props.omit_xml_declaration = Some(config.omit_declaration());
    props
}

/// Apply [`base_output_properties`] to `stage` using the capabilities of
/// `engines`, returning the properties applied.
pub fn configure_base_stage<'a, S>(
    stage: &mut S,
    config: &OutputConfiguration,
    engines: &Engines,
) -> OutputProperties
where
    S: Stage<'a> + ?Sized,
{
    let props = base_output_properties(config, engines.supports_xhtml_output());
    tracing::trace!(?props, "configuring base stage");
    stage.set_output_properties(props.clone());
    props
}
