//! An iCalendar codec for events, to-dos and journal entries.
//!
//! Documents are parsed into [`Incidence`]s and written back without losing
//! floating times, zone identifiers or properties the codec does not know.
//! Recoverable problems are returned as [`Warning`]s next to the result.
//!
//! ```
//! let doc = calcodec::parse_document(
//!     "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:evt-1\r\nDTSTART;VALUE=DATE:20240301\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n",
//! )
//! .unwrap();
//! assert_eq!(doc.incidences[0].uid, "evt-1");
//! assert!(doc.incidences[0].dtstart.as_ref().unwrap().is_date());
//! ```

const PARAM_VALUE_DELIMITER: char = ',';
const VALUE_DELIMITER: char = ':';
const PARAM_DELIMITER: char = ';';
const PARAM_NAME_DELIMITER: char = '=';
const PARAM_QUOTE: char = '"';

pub mod parser;
pub use parser::{ComponentParser, ContentLineParser, LineReader, ParserError};

pub mod types;

pub mod property;

pub mod component;
pub use component::{Alarm, Incidence, IncidenceKind, parse_component, serialize_component};

pub mod generator;

pub mod calendar;
pub use calendar::{Calendar, CodecOptions, ParsedDocument, StorageError, Transcoder};

pub mod scheduling;
pub use scheduling::{Method, MessageValidity, ScheduleMessage};

pub mod dnd;

pub mod warning;
pub use warning::{Warning, WarningKind};

use chrono::{NaiveDate, NaiveTime};

/// Parses a document with the default transcoder.
pub fn parse_document(input: &str) -> Result<ParsedDocument, ParserError> {
    <Transcoder>::default().parse_document(input)
}

/// Serializes incidences into a document with the default transcoder.
pub fn serialize_document(incidences: &[Incidence]) -> String {
    <Transcoder>::default().serialize_document(incidences)
}

pub fn create_schedule_message(incidence: &Incidence, method: Method) -> String {
    <Transcoder>::default().create_schedule_message(incidence, method)
}

pub fn parse_schedule_message(text: &str) -> ScheduleMessage {
    <Transcoder>::default().parse_schedule_message(text)
}

pub fn encode_drag(incidence: &Incidence) -> String {
    <Transcoder>::default().encode_drag(incidence)
}

pub fn decode_drop(text: &str) -> Result<(Incidence, Vec<Warning>), ParserError> {
    <Transcoder>::default().decode_drop(text)
}

pub fn copy_incidence(incidence: &Incidence) -> String {
    <Transcoder>::default().copy_incidence(incidence)
}

pub fn paste_event(
    text: &str,
    date: NaiveDate,
    time: Option<NaiveTime>,
) -> Result<(Incidence, Vec<Warning>), ParserError> {
    <Transcoder>::default().paste_event(text, date, time)
}
