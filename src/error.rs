//! Error taxonomy for the codec layer.

use quick_xml::events::attributes::AttrError;
use std::str::Utf8Error;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CodecError>;

#[derive(Debug, Error)]
pub enum CodecError {
    /// Syntax errors, unbalanced tags, undecodable text.
    #[error("malformed XML stream: {0}")]
    Malformed(String),

    /// The stream ended while `element` was still open.
    #[error("premature end of file: <{element}> was never closed")]
    UnexpectedEof { element: String },

    #[error("unknown type `{0}`")]
    UnknownType(String),

    /// Render-time mismatch between a post's type and the payload the source returned.
    #[error("post {id}: expected {expected} payload, source returned {found}")]
    PayloadMismatch { id: String, expected: String, found: String },

    /// A required attribute never appeared on `element`.
    #[error("<{element}> is missing required attribute `{attribute}`")]
    MissingAttribute { element: String, attribute: String },

    #[error("`{field}` is not a valid integer: `{value}`")]
    MalformedNumber { field: String, value: String },

    /// Failure raised by a caller-supplied sink or source, passed through untouched.
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    pub(crate) fn number(field: &str, value: &str) -> Self {
        CodecError::MalformedNumber { field: field.to_string(), value: value.to_string() }
    }

    pub(crate) fn missing(element: &str, attribute: &str) -> Self {
        CodecError::MissingAttribute { element: element.to_string(), attribute: attribute.to_string() }
    }

    /// True for the malformed-stream category (syntax errors and premature EOF).
    pub fn is_malformed(&self) -> bool {
        matches!(self, CodecError::Malformed(_) | CodecError::UnexpectedEof { .. })
    }
}

impl From<quick_xml::Error> for CodecError {
    fn from(e: quick_xml::Error) -> Self {
        match e {
            quick_xml::Error::Io(io) => CodecError::Io(std::io::Error::new(io.kind(), io.to_string())),
            other => CodecError::Malformed(other.to_string()),
        }
    }
}

impl From<AttrError> for CodecError {
    fn from(e: AttrError) -> Self {
        CodecError::Malformed(e.to_string())
    }
}

impl From<Utf8Error> for CodecError {
    fn from(e: Utf8Error) -> Self {
        CodecError::Malformed(e.to_string())
    }
}
