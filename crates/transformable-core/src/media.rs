#![forbid(unsafe_code)]

//! Media types as configured on an entity or declared by a program.

use crate::Error;
use std::fmt;
use std::str::FromStr;

/// A parsed MIME media type such as `application/xhtml+xml; charset=UTF-8`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    inner: mime::Mime,
}

impl MediaType {
    /// Parse a media type, rejecting anything `type/subtype` cannot describe.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let inner = s
            .trim()
            .parse::<mime::Mime>()
            .map_err(|e| Error::MalformedMediaType(format!("{s:?}: {e}")))?;
        Ok(Self { inner })
    }

    /// Build a media type from its primary and sub type.
    pub fn new(primary: &str, sub: &str) -> Result<Self, Error> {
        Self::parse(&format!("{primary}/{sub}"))
    }

    /// The primary type, e.g. `text`.
    pub fn primary_type(&self) -> &str {
        self.inner.type_().as_str()
    }

    /// The sub type including any `+suffix`, e.g. `xhtml+xml`.
    pub fn sub_type(&self) -> &str {
        let essence = self.inner.essence_str();
        essence
            .split_once('/')
            .map(|(_, sub)| sub)
            .unwrap_or_default()
    }

    /// `type/subtype` without parameters.
    pub fn essence(&self) -> &str {
        self.inner.essence_str()
    }

    /// Look up a parameter such as `charset`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.inner
            .params()
            .find(|(k, _)| k.as_str().eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parameters in declaration order.
    pub fn params(&self) -> Vec<(String, String)> {
        self.inner
            .params()
            .map(|(k, v)| (k.as_str().to_owned(), v.as_str().to_owned()))
            .collect()
    }

    /// Same essence and parameters, with `charset` set to `charset`.
    pub fn with_charset(&self, charset: &str) -> Result<Self, Error> {
        let mut text = self.essence().to_owned();
        for (k, v) in self.params() {
            if k.eq_ignore_ascii_case("charset") {
                continue;
            }
            text.push_str(&format!("; {k}={v}"));
        }
        text.push_str(&format!("; charset={charset}"));
        Self::parse(&text)
    }

    /// Does the essence (ignoring parameters) equal `primary/sub`?
    pub fn matches(&self, primary: &str, sub: &str) -> bool {
        self.primary_type().eq_ignore_ascii_case(primary) && self.sub_type().eq_ignore_ascii_case(sub)
    }

    /// Is this an XML document type (`*/*+xml`, `text/xml`, `application/xml`)?
    pub fn is_xml(&self) -> bool {
        if self.sub_type().ends_with("+xml") {
            return true;
        }
        self.matches("application", "xml") || self.matches("text", "xml")
    }

    /// Is this an HTML document type (`text/html`, `application/html`,
    /// `application/xhtml+xml`)?
    pub fn is_html(&self) -> bool {
        self.matches("text", "html")
            || self.matches("application", "html")
            || self.matches("application", "xhtml+xml")
    }

    /// Is the primary type `text`?
    pub fn is_text(&self) -> bool {
        self.primary_type().eq_ignore_ascii_case("text")
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl FromStr for MediaType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_parts() {
        let mt = MediaType::parse("application/xhtml+xml; charset=UTF-8").unwrap();
        assert_eq!(mt.primary_type(), "application");
        assert_eq!(mt.sub_type(), "xhtml+xml");
        assert_eq!(mt.essence(), "application/xhtml+xml");
        assert!(mt.param("charset").unwrap().eq_ignore_ascii_case("utf-8"));
    }

    #[test]
    fn test_malformed() {
        for bad in ["", "text", "/html", "te xt/html"] {
            let err = MediaType::parse(bad).unwrap_err();
            assert!(matches!(err, Error::MalformedMediaType(_)), "{bad:?}");
        }
    }

    #[test]
    fn test_xml_family() {
        assert!(MediaType::parse("text/xml").unwrap().is_xml());
        assert!(MediaType::parse("application/xml").unwrap().is_xml());
        assert!(MediaType::parse("image/svg+xml").unwrap().is_xml());
        assert!(MediaType::parse("application/xhtml+xml").unwrap().is_xml());
        assert!(!MediaType::parse("text/html").unwrap().is_xml());
        assert!(!MediaType::parse("text/plain").unwrap().is_xml());
    }

    #[test]
    fn test_html_family() {
        assert!(MediaType::parse("text/html").unwrap().is_html());
        assert!(MediaType::parse("application/xhtml+xml").unwrap().is_html());
        assert!(MediaType::parse("application/html").unwrap().is_html());
        assert!(!MediaType::parse("text/xml").unwrap().is_html());
        assert!(!MediaType::parse("image/svg+xml").unwrap().is_html());
    }

    #[test]
    fn test_with_charset_replaces_existing() {
        let mt = MediaType::parse("text/html; level=1; charset=ascii").unwrap();
        let mt = mt.with_charset("UTF-8").unwrap();
        assert!(mt.param("charset").unwrap().eq_ignore_ascii_case("utf-8"));
        assert_eq!(mt.param("level"), Some("1"));
    }
}
