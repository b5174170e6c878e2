use crate::{
    parser::{ContentLineError, LineError},
    types::ValueError,
};

/// Structural parse errors.
///
/// When returned from a document-level entry point the document could not be
/// read at all. Component-scoped variants only ever drop the component they
/// occur in and are reported as warnings.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ParserError {
    #[error("empty input")]
    EmptyInput,
    #[error("too many components in input, expected one")]
    TooManyComponents,
    #[error("missing header: expected BEGIN:{0}")]
    MissingHeader(&'static str),
    #[error("incomplete object: missing END:{0}")]
    NotComplete(String),
    #[error(transparent)]
    Line(#[from] LineError),
    #[error("content line error: {0}")]
    ContentLine(ContentLineError),
    #[error("missing END:{0}")]
    MissingEnd(String),
    #[error("unexpected END:{0}")]
    UnexpectedEnd(String),
    #[error("invalid component: {0}")]
    InvalidComponent(String),
    #[error("missing property: {0}")]
    MissingProperty(&'static str),
    #[error(transparent)]
    Value(#[from] ValueError),
}

impl ParserError {
    /// Whether the error means the input is not a readable document.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::EmptyInput | Self::MissingHeader(_) | Self::NotComplete(_) => true,
            Self::Line(err) => err.is_fatal(),
            _ => false,
        }
    }
}

impl From<ContentLineError> for ParserError {
    fn from(err: ContentLineError) -> Self {
        match err {
            ContentLineError::LineError(err) => Self::Line(err),
            err => Self::ContentLine(err),
        }
    }
}
