#![forbid(unsafe_code)]

//! Character encodings, resolved by their IANA/WHATWG labels.

use crate::Error;
use encoding_rs::Encoding;
use std::fmt;

/// A character encoding the serializer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charset {
    encoding: &'static Encoding,
}

impl Charset {
    pub const UTF_8: Charset = Charset {
        encoding: encoding_rs::UTF_8,
    };

    /// Resolve an encoding by name or alias (`utf8`, `latin1`, `Shift_JIS`, ...).
    pub fn for_name(name: &str) -> Result<Self, Error> {
        Encoding::for_label(name.trim().as_bytes())
            .map(|encoding| Self { encoding })
            .ok_or_else(|| Error::UnsupportedEncoding(name.to_owned()))
    }

    /// Canonical name, e.g. `UTF-8` or `windows-1252`.
    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// The encoding bytes are actually written in.
    ///
    /// UTF-16 variants and `replacement` cannot be produced and write UTF-8.
    pub fn output(&self) -> Charset {
        Charset {
            encoding: self.encoding.output_encoding(),
        }
    }

    /// Encode `text`, turning unmappable characters into numeric character references.
    pub fn encode<'a>(&self, text: &'a str) -> std::borrow::Cow<'a, [u8]> {
        let (bytes, _, _) = self.encoding.encode(text);
        bytes
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self::UTF_8
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
