//! Recoverable problems found while decoding.
//!
//! Field- and component-level problems never abort a parse. They are
//! collected as [`Warning`]s and handed back next to the result, so a caller
//! can tell a user that a calendar was loaded with a number of warnings.

use std::fmt;

use crate::{parser::ParserError, types::ValueError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WarningKind {
    #[error("{property}: {error}, property ignored")]
    MalformedValue {
        property: String,
        error: ValueError,
    },
    #[error("{property}: unknown timezone {tzid:?}, value read as floating time")]
    UnknownTimezone { property: String, tzid: String },
    #[error("RRULE has both COUNT and UNTIL, COUNT ignored")]
    RecurrenceCountAndUntil,
    #[error("alarm dropped: {0}")]
    AlarmDropped(String),
    #[error("both DTEND and DURATION present, the later one is kept")]
    EndAndDuration,
    #[error("COMPLETED conflicts with PERCENT-COMPLETE, the later one is kept")]
    CompletionConflict,
    #[error("duplicate UID, the earlier component was replaced")]
    DuplicateUid,
    #[error("RELATED-TO {0:?} would create a cycle and was not linked")]
    RelationCycle(String),
    #[error("{component} dropped: {error}")]
    ComponentDropped {
        component: String,
        error: ParserError,
    },
    #[error("producer reported: {0}")]
    ProducerError(String),
    #[error("{0} given more than once, the last one is kept")]
    DuplicateProperty(String),
    #[error("{0}, line skipped")]
    LineSkipped(ParserError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Line the problem was found on, if it can be attributed to one.
    pub line: Option<usize>,
    /// UID of the affected incidence, if known.
    pub uid: Option<String>,
    pub kind: WarningKind,
}

impl Warning {
    pub fn new(line: Option<usize>, kind: WarningKind) -> Self {
        Self {
            line,
            uid: None,
            kind,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(line) = self.line {
            write!(f, "line {line}: ")?;
        }
        if let Some(uid) = &self.uid {
            write!(f, "{uid}: ")?;
        }
        write!(f, "{}", self.kind)
    }
}

/// Collector passed down through a parse; every recorded warning is logged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Warnings(Vec<Warning>);

impl Warnings {
    pub fn push(&mut self, warning: Warning) {
        tracing::warn!(line = ?warning.line, uid = ?warning.uid, "{}", warning.kind);
        self.0.push(warning);
    }

    /// Records warnings gathered for one component under its UID.
    pub fn extend_for(&mut self, uid: Option<&str>, warnings: impl IntoIterator<Item = Warning>) {
        for mut warning in warnings {
            if warning.uid.is_none() {
                warning.uid = uid.map(str::to_owned);
            }
            self.push(warning);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Warning> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.0
    }
}

impl From<Warnings> for Vec<Warning> {
    fn from(warnings: Warnings) -> Self {
        warnings.0
    }
}
