#![forbid(unsafe_code)]

/// Errors produced while configuring or running a transform pass.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed media type: {0}")]
    MalformedMediaType(String),

    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("engine construction error: {0}")]
    EngineConstruction(String),

    #[error("transform error: {message}")]
    Transform {
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    #[error("event handler error: {message}")]
    Sax {
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// The coarse category a caller reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Static configuration was invalid; nothing has been written.
    Configuration,
    /// A program or stage could not be built.
    EngineConstruction,
    /// Event production failed; output may be partial.
    TransformExecution,
    /// Writing to the sink failed; output may be partial.
    Io,
    /// Anything else.
    Runtime,
}

impl Error {
    /// A transform failure with no underlying cause.
    pub fn transform(message: impl Into<String>) -> Self {
        Self::Transform {
            message: message.into(),
            source: None,
        }
    }

    /// A transform failure caused by `source`.
    pub fn transform_caused_by(message: impl Into<String>, source: Error) -> Self {
        Self::Transform {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// An event handler failure caused by `source`.
    pub fn sax_caused_by(message: impl Into<String>, source: Error) -> Self {
        Self::Sax {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedMediaType(_) | Self::UnsupportedEncoding(_) => ErrorKind::Configuration,
            Self::EngineConstruction(_) => ErrorKind::EngineConstruction,
            Self::Transform { .. } | Self::Sax { .. } | Self::XmlParse(_) => {
                ErrorKind::TransformExecution
            }
            Self::Io(_) => ErrorKind::Io,
            Self::Other(_) => ErrorKind::Runtime,
        }
    }

    /// Surface an I/O failure buried inside engine wrappers.
    ///
    /// Unwraps at most two levels: a transform failure around an event
    /// handler failure around the I/O error. Anything else is returned as is.
    pub fn into_io_cause(self) -> Self {
        match self {
            Self::Transform {
                message,
                source: Some(source),
            } => match *source {
                Self::Io(io) => Self::Io(io),
                Self::Sax {
                    source: Some(inner),
                    ..
                } if matches!(*inner, Self::Io(_)) => *inner,
                other => Self::Transform {
                    message,
                    source: Some(Box::new(other)),
                },
            },
            Self::Sax {
                message,
                source: Some(source),
            } => match *source {
                Self::Io(io) => Self::Io(io),
                other => Self::Sax {
                    message,
                    source: Some(Box::new(other)),
                },
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
