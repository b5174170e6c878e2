//! Property mapper.
//!
//! [`map_in`] turns one content line into a typed [`FieldValue`], or hands
//! the line back as [`Mapped::Unrecognized`] so it can be kept verbatim.
//! [`map_out`] is the inverse. Neither knows which component the property
//! belongs to; deciding whether a field applies is up to the assembler.

use chrono::Duration;
use itertools::Itertools;
use std::collections::BTreeMap;

use crate::{
    parser::{ContentLine, ContentLineParams},
    types::{
        CalDateOrDateTime, CalDateTime, TzResolver, ValueError, decode_duration, decode_text,
        decode_text_list, encode_duration, encode_text, encode_text_list,
    },
    warning::WarningKind,
};

mod attachment;
pub use attachment::*;
mod attendee;
pub use attendee::*;
mod recurrence;
pub use recurrence::*;
mod status;
pub use status::*;
mod trigger;
pub use trigger::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Uid(String),
    Sequence(u32),
    DtStamp(CalDateTime),
    Created(CalDateTime),
    LastModified(CalDateTime),
    DtStart(CalDateOrDateTime),
    DtEnd(CalDateOrDateTime),
    Due(CalDateOrDateTime),
    Duration(Duration),
    Completed(CalDateTime),
    PercentComplete(u8),
    Priority(u8),
    Summary(String),
    Description(String),
    Location(String),
    Categories(Vec<String>),
    Status(Status),
    Class(Secrecy),
    Transp(Transparency),
    Organizer(Attendee),
    Attendee(Attendee),
    Attach(Attachment),
    /// Parent reference.
    RelatedTo(String),
    RRule(Recurrence),
    ExDate(Vec<CalDateOrDateTime>),
    RDate(Vec<CalDateOrDateTime>),
    /// Alarm action keyword, uppercased.
    Action(String),
    Trigger(Trigger),
    Repeat(u32),
}

impl FieldValue {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uid(_) => "UID",
            Self::Sequence(_) => "SEQUENCE",
            Self::DtStamp(_) => "DTSTAMP",
            Self::Created(_) => "CREATED",
            Self::LastModified(_) => "LAST-MODIFIED",
            Self::DtStart(_) => "DTSTART",
            Self::DtEnd(_) => "DTEND",
            Self::Due(_) => "DUE",
            Self::Duration(_) => "DURATION",
            Self::Completed(_) => "COMPLETED",
            Self::PercentComplete(_) => "PERCENT-COMPLETE",
            Self::Priority(_) => "PRIORITY",
            Self::Summary(_) => "SUMMARY",
            Self::Description(_) => "DESCRIPTION",
            Self::Location(_) => "LOCATION",
            Self::Categories(_) => "CATEGORIES",
            Self::Status(_) => "STATUS",
            Self::Class(_) => "CLASS",
            Self::Transp(_) => "TRANSP",
            Self::Organizer(_) => "ORGANIZER",
            Self::Attendee(_) => "ATTENDEE",
            Self::Attach(_) => "ATTACH",
            Self::RelatedTo(_) => "RELATED-TO",
            Self::RRule(_) => "RRULE",
            Self::ExDate(_) => "EXDATE",
            Self::RDate(_) => "RDATE",
            Self::Action(_) => "ACTION",
            Self::Trigger(_) => "TRIGGER",
            Self::Repeat(_) => "REPEAT",
        }
    }
}

/// Parameters on interpreted properties that no field takes up, by property
/// name. They are written back on the property they came with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraParams(BTreeMap<String, ContentLineParams>);

impl ExtraParams {
    /// Keeps what [`extra_params`] leaves of `prop`. A later line of the same
    /// property replaces what an earlier one left.
    pub fn keep(&mut self, prop: &ContentLine) {
        let extra = extra_params(prop);
        if !extra.is_empty() {
            self.0.insert(prop.name.clone(), extra);
        }
    }

    pub fn get(&self, name: &str) -> Option<&ContentLineParams> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Adds the kept parameters to a line built by [`map_out`].
    pub fn apply(&self, line: &mut ContentLine) {
        if let Some(extra) = self.0.get(&line.name) {
            line.params.merge(extra);
        }
    }
}

/// Parameters of `prop` that [`map_in`] does not turn into field data.
pub fn extra_params(prop: &ContentLine) -> ContentLineParams {
    let mapped: &[&str] = match prop.name.as_str() {
        "DTSTAMP" | "CREATED" | "LAST-MODIFIED" | "COMPLETED" | "DTSTART" | "DTEND" | "DUE"
        | "EXDATE" | "RDATE" => &["VALUE", "TZID"],
        "TRIGGER" => &["VALUE", "RELATED", "TZID"],
        // These carry their own parameters
        "ORGANIZER" | "ATTENDEE" | "ATTACH" => return ContentLineParams::default(),
        _ => &[],
    };
    prop.params.without(mapped)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mapped {
    Field(FieldValue),
    Unrecognized(ContentLine),
}

/// Maps one content line onto a field.
///
/// Recoverable oddities (an unresolvable `TZID`, a rule with both `COUNT`
/// and `UNTIL`) are appended to `notes` and the value is still returned.
/// An undecodable value is an error; the caller drops the property.
pub fn map_in(
    prop: &ContentLine,
    resolver: &dyn TzResolver,
    notes: &mut Vec<WarningKind>,
) -> Result<Mapped, ValueError> {
    let field = match prop.name.as_str() {
        "UID" => FieldValue::Uid(decode_text(&prop.value)),
        "SEQUENCE" => FieldValue::Sequence(decode_integer(prop, "INTEGER", 0, u32::MAX.into())?),
        "DTSTAMP" => FieldValue::DtStamp(decode_instant_time(prop, resolver, notes)?),
        "CREATED" => FieldValue::Created(decode_instant_time(prop, resolver, notes)?),
        "LAST-MODIFIED" => FieldValue::LastModified(decode_instant_time(prop, resolver, notes)?),
        "COMPLETED" => FieldValue::Completed(decode_instant_time(prop, resolver, notes)?),
        "DTSTART" => FieldValue::DtStart(decode_instant(prop, &prop.value, resolver, notes)?),
        "DTEND" => FieldValue::DtEnd(decode_instant(prop, &prop.value, resolver, notes)?),
        "DUE" => FieldValue::Due(decode_instant(prop, &prop.value, resolver, notes)?),
        "DURATION" => FieldValue::Duration(decode_duration(prop.value.trim())?),
        "PERCENT-COMPLETE" => {
            FieldValue::PercentComplete(decode_integer(prop, "PERCENT-COMPLETE", 0, 100)?)
        }
        "PRIORITY" => FieldValue::Priority(decode_integer(prop, "PRIORITY", 0, 9)?),
        "SUMMARY" => FieldValue::Summary(decode_text(&prop.value)),
        "DESCRIPTION" => FieldValue::Description(decode_text(&prop.value)),
        "LOCATION" => FieldValue::Location(decode_text(&prop.value)),
        "CATEGORIES" => FieldValue::Categories(decode_text_list(&prop.value)),
        "STATUS" => FieldValue::Status(prop.value.trim().parse()?),
        "CLASS" => FieldValue::Class(prop.value.trim().parse()?),
        "TRANSP" => FieldValue::Transp(prop.value.trim().parse()?),
        "ORGANIZER" => FieldValue::Organizer(Attendee::from_content_line(prop)?),
        "ATTENDEE" => FieldValue::Attendee(Attendee::from_content_line(prop)?),
        "ATTACH" => FieldValue::Attach(Attachment::from_content_line(prop)?),
        "RELATED-TO" => {
            // Only parent links are modelled
            let is_parent = prop
                .params
                .get_param("RELTYPE")
                .is_none_or(|reltype| reltype.eq_ignore_ascii_case("PARENT"));
            if !is_parent {
                return Ok(Mapped::Unrecognized(prop.clone()));
            }
            let uid = decode_text(prop.value.trim());
            if uid.is_empty() {
                return Err(ValueError::malformed("RELATED-TO", &prop.value));
            }
            FieldValue::RelatedTo(uid)
        }
        "RRULE" => {
            let (rule, conflict) = Recurrence::decode(&prop.value, resolver)?;
            if conflict {
                notes.push(WarningKind::RecurrenceCountAndUntil);
            }
            FieldValue::RRule(rule)
        }
        "EXDATE" => FieldValue::ExDate(decode_instant_list(prop, resolver, notes)?),
        "RDATE" => {
            let is_period = prop
                .params
                .get_value_type()
                .is_some_and(|value_type| value_type.eq_ignore_ascii_case("PERIOD"));
            if is_period {
                return Ok(Mapped::Unrecognized(prop.clone()));
            }
            FieldValue::RDate(decode_instant_list(prop, resolver, notes)?)
        }
        "ACTION" => FieldValue::Action(prop.value.trim().to_ascii_uppercase()),
        "TRIGGER" => FieldValue::Trigger(decode_or_float(
            prop,
            notes,
            |tzid| {
                let mut prop = prop.clone();
                if tzid.is_none() {
                    prop.params.remove("TZID");
                }
                Trigger::from_content_line(&prop, resolver)
            },
            |trigger, tzid| match trigger {
                Trigger::Absolute(dt) if dt.tz.is_local() => {
                    Trigger::Absolute(CalDateTime::unresolved(dt.local, tzid))
                }
                trigger => trigger,
            },
        )?),
        "REPEAT" => FieldValue::Repeat(decode_integer(prop, "INTEGER", 0, u32::MAX.into())?),
        _ => return Ok(Mapped::Unrecognized(prop.clone())),
    };
    Ok(Mapped::Field(field))
}

/// Builds the content line for a field.
///
/// `EXDATE` and `RDATE` values that differ in type or zone cannot share a
/// line and only the first line is returned here; use [`map_out_all`] to
/// get every line.
pub fn map_out(field: &FieldValue) -> ContentLine {
    map_out_all(field)
        .into_iter()
        .next()
        .unwrap_or_else(|| ContentLine::new(field.name(), ""))
}

/// Builds the content lines for a field. Only date lists produce more than
/// one line.
pub fn map_out_all(field: &FieldValue) -> Vec<ContentLine> {
    let name = field.name();
    let line = match field {
        FieldValue::Uid(text)
        | FieldValue::Summary(text)
        | FieldValue::Description(text)
        | FieldValue::Location(text)
        | FieldValue::RelatedTo(text) => ContentLine::new(name, encode_text(text)),
        FieldValue::Sequence(number) | FieldValue::Repeat(number) => {
            ContentLine::new(name, number.to_string())
        }
        FieldValue::PercentComplete(number) | FieldValue::Priority(number) => {
            ContentLine::new(name, number.to_string())
        }
        FieldValue::DtStamp(dt)
        | FieldValue::Created(dt)
        | FieldValue::LastModified(dt)
        | FieldValue::Completed(dt) => encode_instant(name, &CalDateOrDateTime::DateTime(dt.clone())),
        FieldValue::DtStart(value) | FieldValue::DtEnd(value) | FieldValue::Due(value) => {
            encode_instant(name, value)
        }
        FieldValue::Duration(duration) => ContentLine::new(name, encode_duration(duration)),
        FieldValue::Categories(categories) => ContentLine::new(name, encode_text_list(categories)),
        FieldValue::Status(status) => ContentLine::new(name, status.as_str()),
        FieldValue::Class(secrecy) => ContentLine::new(name, secrecy.as_str()),
        FieldValue::Transp(transparency) => ContentLine::new(name, transparency.as_str()),
        FieldValue::Organizer(attendee) | FieldValue::Attendee(attendee) => {
            attendee.to_content_line(name)
        }
        FieldValue::Attach(attachment) => attachment.to_content_line(name),
        FieldValue::RRule(rule) => rule.to_content_line(),
        FieldValue::ExDate(values) | FieldValue::RDate(values) => {
            return encode_instant_list(name, values);
        }
        FieldValue::Action(action) => ContentLine::new(name, action.as_str()),
        FieldValue::Trigger(trigger) => trigger.to_content_line(),
    };
    vec![line]
}

fn decode_integer<T: TryFrom<i64>>(
    prop: &ContentLine,
    kind: &'static str,
    min: i64,
    max: i64,
) -> Result<T, ValueError> {
    prop.value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|number| (min..=max).contains(number))
        .and_then(|number| T::try_from(number).ok())
        .ok_or_else(|| ValueError::malformed(kind, &prop.value))
}

/// Runs `decode` with the property's `TZID`, and again without it if the zone
/// is unknown. The floating result is handed to `keep_tzid` so the identifier
/// can be written back. The fallback is recorded in `notes`.
fn decode_or_float<T>(
    prop: &ContentLine,
    notes: &mut Vec<WarningKind>,
    decode: impl Fn(Option<&str>) -> Result<T, ValueError>,
    keep_tzid: impl FnOnce(T, &str) -> T,
) -> Result<T, ValueError> {
    let tzid = prop.params.get_tzid();
    match decode(tzid) {
        Err(ValueError::UnknownTimezone(tzid)) => {
            let value = keep_tzid(decode(None)?, &tzid);
            notes.push(WarningKind::UnknownTimezone {
                property: prop.name.clone(),
                tzid,
            });
            Ok(value)
        }
        result => result,
    }
}

fn decode_instant(
    prop: &ContentLine,
    value: &str,
    resolver: &dyn TzResolver,
    notes: &mut Vec<WarningKind>,
) -> Result<CalDateOrDateTime, ValueError> {
    let value_type = prop.params.get_value_type();
    decode_or_float(
        prop,
        notes,
        |tzid| CalDateOrDateTime::parse(value.trim(), value_type, tzid, resolver),
        CalDateOrDateTime::with_unresolved_tzid,
    )
}

fn decode_instant_time(
    prop: &ContentLine,
    resolver: &dyn TzResolver,
    notes: &mut Vec<WarningKind>,
) -> Result<CalDateTime, ValueError> {
    match decode_instant(prop, &prop.value, resolver, notes)? {
        CalDateOrDateTime::DateTime(dt) => Ok(dt),
        CalDateOrDateTime::Date(_) => Err(ValueError::malformed("DATE-TIME", &prop.value)),
    }
}

fn decode_instant_list(
    prop: &ContentLine,
    resolver: &dyn TzResolver,
    notes: &mut Vec<WarningKind>,
) -> Result<Vec<CalDateOrDateTime>, ValueError> {
    let mut values = vec![];
    let mut fallback = None;
    for token in prop.value.split(',').filter(|token| !token.trim().is_empty()) {
        let mut item_notes = vec![];
        values.push(decode_instant(prop, token, resolver, &mut item_notes)?);
        // One unknown zone warning per line is enough
        fallback = fallback.or(item_notes.pop());
    }
    notes.extend(fallback);
    Ok(values)
}

fn encode_instant(name: &str, value: &CalDateOrDateTime) -> ContentLine {
    let mut params = ContentLineParams::default();
    if value.is_date() {
        params = params.with("VALUE", "DATE");
    }
    if let Some(tzid) = value.tzid() {
        params = params.with("TZID", tzid);
    }
    ContentLine::new(name, value.format()).with_params(params)
}

fn encode_instant_list(name: &str, values: &[CalDateOrDateTime]) -> Vec<ContentLine> {
    values
        .iter()
        .chunk_by(|value| (value.is_date(), value.tzid()))
        .into_iter()
        .filter_map(|(_, group)| {
            let group: Vec<_> = group.collect();
            let mut line = encode_instant(name, group.first()?);
            line.value = group.iter().map(|value| value.format()).join(",");
            Some(line)
        })
        .collect()
}
