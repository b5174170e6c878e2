//! iTIP scheduling messages: one incidence wrapped with a `METHOD`.
//!
//! Only the envelope is checked here. What a `REPLY` or `COUNTER` means for
//! a stored incidence is for the caller to decide.

use std::{fmt, str::FromStr};

use crate::{
    calendar::{CALENDAR, CalendarWrapper, Transcoder},
    component::Incidence,
    parser::{ContentLine, ParserError},
    types::{TzResolver, ValueError},
    warning::Warning,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Publish,
    Request,
    Reply,
    Add,
    Cancel,
    Refresh,
    Counter,
    DeclineCounter,
}

static METHODS: phf::Map<&'static str, Method> = phf::phf_map! {
    "PUBLISH" => Method::Publish,
    "REQUEST" => Method::Request,
    "REPLY" => Method::Reply,
    "ADD" => Method::Add,
    "CANCEL" => Method::Cancel,
    "REFRESH" => Method::Refresh,
    "COUNTER" => Method::Counter,
    "DECLINECOUNTER" => Method::DeclineCounter,
};

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Publish => "PUBLISH",
            Self::Request => "REQUEST",
            Self::Reply => "REPLY",
            Self::Add => "ADD",
            Self::Cancel => "CANCEL",
            Self::Refresh => "REFRESH",
            Self::Counter => "COUNTER",
            Self::DeclineCounter => "DECLINECOUNTER",
        }
    }
}

impl FromStr for Method {
    type Err = ValueError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        METHODS
            .get(value.trim().to_ascii_uppercase().as_str())
            .copied()
            .ok_or_else(|| ValueError::malformed("METHOD", value))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedReason {
    #[error("no incidence in message")]
    NoIncidence,
    #[error("{0} incidences in message, expected one")]
    MultipleIncidences(usize),
    #[error("no METHOD in message")]
    MissingMethod,
    #[error(transparent)]
    Unparsable(ParserError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageValidity {
    WellFormed,
    /// The message carries a method verb outside the known set.
    UnsupportedMethod(String),
    Malformed(MalformedReason),
}

/// A received scheduling message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleMessage {
    pub method: Option<Method>,
    /// The payload. With several incidences this is the first one.
    pub incidence: Option<Incidence>,
    pub validity: MessageValidity,
    pub warnings: Vec<Warning>,
}

impl ScheduleMessage {
    pub fn is_well_formed(&self) -> bool {
        self.validity == MessageValidity::WellFormed
    }

    fn unparsable(error: ParserError) -> Self {
        Self {
            method: None,
            incidence: None,
            validity: MessageValidity::Malformed(MalformedReason::Unparsable(error)),
            warnings: vec![],
        }
    }
}

impl<R: TzResolver> Transcoder<R> {
    /// Wraps one incidence, with its alarms and attendees, in a document
    /// declaring `method`.
    pub fn create_schedule_message(&self, incidence: &Incidence, method: Method) -> String {
        let wrapper = CalendarWrapper {
            properties: vec![ContentLine::new("METHOD", method.as_str())],
            ..Default::default()
        };
        self.serialize_wrapped(&wrapper, std::slice::from_ref(incidence))
    }

    /// Parses a scheduling message. Problems with the envelope are reported
    /// in [`ScheduleMessage::validity`], never as an error.
    #[tracing::instrument(skip_all, fields(len = text.len()))]
    pub fn parse_schedule_message(&self, text: &str) -> ScheduleMessage {
        let assembled = match self.assemble(text.as_bytes()) {
            Ok(assembled) => assembled,
            Err(error) => {
                tracing::debug!(%error, "unparsable scheduling message");
                return ScheduleMessage::unparsable(error);
            }
        };

        // Dropped components still count towards the envelope.
        let count = assembled.incidence_blocks;
        let usable = !assembled.incidences.is_empty();
        let method_token = assembled
            .wrapper
            .get_property("METHOD")
            .map(|prop| prop.value.trim().to_owned());
        let method = method_token
            .as_deref()
            .and_then(|token| token.parse::<Method>().ok());

        let validity = match (count, &method_token, method) {
            (0, _, _) => MessageValidity::Malformed(MalformedReason::NoIncidence),
            (1, _, _) if !usable => MessageValidity::Malformed(MalformedReason::NoIncidence),
            (1, None, _) => MessageValidity::Malformed(MalformedReason::MissingMethod),
            (1, Some(token), None) => MessageValidity::UnsupportedMethod(token.clone()),
            (1, Some(_), Some(_)) => MessageValidity::WellFormed,
            (count, _, _) => MessageValidity::Malformed(MalformedReason::MultipleIncidences(count)),
        };
        tracing::debug!(?method, ?validity, "parsed scheduling message");

        ScheduleMessage {
            method,
            incidence: assembled
                .incidences
                .into_iter()
                .next()
                .map(|(_, incidence)| incidence),
            validity,
            warnings: assembled.warnings.into_vec(),
        }
    }
}

/// Checks that `text` at least looks like a scheduling message.
pub fn is_schedule_message(text: &str) -> bool {
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
    lines
        .next()
        .is_some_and(|first| first.eq_ignore_ascii_case(&format!("BEGIN:{CALENDAR}")))
        && lines.any(|line| {
            line.get(..7)
                .is_some_and(|name| name.eq_ignore_ascii_case("METHOD:"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        property::{Attendee, PartStat},
        types::{CalDateOrDateTime, CalDateTime},
    };
    use chrono::NaiveDate;
    use rstest::rstest;
    use similar_asserts::assert_eq;

    fn meeting() -> Incidence {
        let mut event = Incidence::new_event("meeting-1");
        event.dtstart = Some(CalDateOrDateTime::DateTime(CalDateTime::zoned(
            NaiveDate::from_ymd_opt(2024, 6, 3)
                .unwrap()
                .and_hms_opt(14, 0, 0)
                .unwrap(),
            "Europe/Berlin",
            chrono_tz::Europe::Berlin,
        )));
        event.summary = Some("Planning".to_owned());
        event.organizer = Some(Attendee::new("Ada", "ada@example.com"));
        let mut bob = Attendee::new("Bob", "bob@example.com");
        bob.rsvp = true;
        event.attendees.push(bob);
        event
    }

    #[rstest]
    #[case(Method::Publish)]
    #[case(Method::Request)]
    #[case(Method::Reply)]
    #[case(Method::DeclineCounter)]
    fn roundtrip(#[case] method: Method) {
        let transcoder = <Transcoder>::default();
        let event = meeting();
        let text = transcoder.create_schedule_message(&event, method);
        let message = transcoder.parse_schedule_message(&text);
        assert_eq!(message.validity, MessageValidity::WellFormed);
        assert_eq!(message.method, Some(method));
        assert_eq!(message.incidence, Some(event));
        assert!(message.warnings.is_empty());
    }

    #[test]
    fn reply_carries_status() {
        let transcoder = <Transcoder>::default();
        let mut event = meeting();
        event.attendees[0].status = PartStat::Accepted;
        let text = transcoder.create_schedule_message(&event, Method::Reply);
        assert!(text.contains("METHOD:REPLY\r\n"));
        assert!(text.contains("PARTSTAT=ACCEPTED"));
        assert!(is_schedule_message(&text));
    }

    #[rstest]
    #[case(
        "BEGIN:VCALENDAR\nMETHOD:REQUEST\nEND:VCALENDAR\n",
        MessageValidity::Malformed(MalformedReason::NoIncidence)
    )]
    #[case(
        "BEGIN:VCALENDAR\nMETHOD:REQUEST\nBEGIN:VEVENT\nUID:a\nEND:VEVENT\nBEGIN:VTODO\nUID:b\nEND:VTODO\nEND:VCALENDAR\n",
        MessageValidity::Malformed(MalformedReason::MultipleIncidences(2))
    )]
    #[case(
        "BEGIN:VCALENDAR\nMETHOD:REQUEST\nBEGIN:VEVENT\nUID:a\nEND:VEVENT\nBEGIN:VEVENT\nSUMMARY:no uid\nEND:VEVENT\nEND:VCALENDAR\n",
        MessageValidity::Malformed(MalformedReason::MultipleIncidences(2))
    )]
    #[case(
        "BEGIN:VCALENDAR\nMETHOD:REQUEST\nBEGIN:VEVENT\nSUMMARY:no uid\nEND:VEVENT\nEND:VCALENDAR\n",
        MessageValidity::Malformed(MalformedReason::NoIncidence)
    )]
    #[case(
        "BEGIN:VCALENDAR\nBEGIN:VEVENT\nUID:a\nEND:VEVENT\nEND:VCALENDAR\n",
        MessageValidity::Malformed(MalformedReason::MissingMethod)
    )]
    #[case(
        "BEGIN:VCALENDAR\nMETHOD:X-DELEGATE\nBEGIN:VEVENT\nUID:a\nEND:VEVENT\nEND:VCALENDAR\n",
        MessageValidity::UnsupportedMethod("X-DELEGATE".to_owned())
    )]
    #[case(
        "BEGIN:VEVENT\nUID:a\nEND:VEVENT\n",
        MessageValidity::Malformed(MalformedReason::Unparsable(ParserError::MissingHeader("VCALENDAR")))
    )]
    fn invalid_messages(#[case] input: &str, #[case] validity: MessageValidity) {
        let message = <Transcoder>::default().parse_schedule_message(input);
        assert_eq!(message.validity, validity);
        assert!(!message.is_well_formed());
    }

    #[test]
    fn unsupported_method_keeps_payload() {
        let message = <Transcoder>::default().parse_schedule_message(
            "BEGIN:VCALENDAR\nMETHOD:X-DELEGATE\nBEGIN:VEVENT\nUID:a\nEND:VEVENT\nEND:VCALENDAR\n",
        );
        assert_eq!(message.method, None);
        assert_eq!(message.incidence.unwrap().uid, "a");
    }

    #[test]
    fn method_names() {
        assert_eq!("declinecounter".parse::<Method>().unwrap(), Method::DeclineCounter);
        assert_eq!(Method::Cancel.to_string(), "CANCEL");
        assert!("DELEGATE".parse::<Method>().is_err());
    }
}
