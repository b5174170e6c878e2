//! Primitive value codec.
//!
//! Converts dates, date-times, durations and text between their object-model
//! representation and the tokens used on the wire. Parameters such as `TZID`
//! or `VALUE` are handled by the property layer and passed in here as plain
//! arguments.

mod datetime;
pub use datetime::*;
mod duration;
pub use duration::*;
mod text;
pub use text::*;
mod timezone;
pub use timezone::*;

/// Error arising when a single value token cannot be decoded.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("malformed {kind} value: {value:?}")]
    Malformed { kind: &'static str, value: String },
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),
}

impl ValueError {
    pub(crate) fn malformed(kind: &'static str, value: impl Into<String>) -> Self {
        Self::Malformed {
            kind,
            value: value.into(),
        }
    }
}
