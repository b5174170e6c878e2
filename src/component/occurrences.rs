//! Occurrence expansion through the `rrule` crate.
//!
//! The recurrence set is written out as `DTSTART`/`RRULE`/`EXDATE`/`RDATE`
//! text and handed to [`rrule::RRuleSet`]. Floating and date-only series are
//! expanded on a UTC time line and mapped back to wall-clock values, so the
//! viewer's local zone never leaks into the result.

use chrono::{NaiveDateTime, NaiveTime, TimeZone};
use std::str::FromStr;

use crate::{
    component::Incidence,
    property::RecurrenceEnd,
    types::{CalDateOrDateTime, CalDateTime, Tz, encode_date_time},
};

/// The time line a series is expanded on, taken from its start.
enum Frame<'a> {
    Date,
    /// Wall-clock time, with the identifier of a zone that could not be
    /// resolved if there was one.
    Floating(Option<&'a str>),
    Utc,
    Zoned { tzid: &'a str, tz: chrono_tz::Tz },
}

impl<'a> Frame<'a> {
    fn of(start: &'a CalDateOrDateTime) -> Self {
        match start {
            CalDateOrDateTime::Date(_) => Self::Date,
            CalDateOrDateTime::DateTime(dt) => match &dt.tz {
                Tz::Local => Self::Floating(None),
                Tz::Unresolved { tzid } => Self::Floating(Some(tzid)),
                Tz::Utc => Self::Utc,
                Tz::Olson { tzid, tz } => Self::Zoned { tzid, tz: *tz },
            },
        }
    }

    /// Instant of `value` in this frame, as a naive UTC value.
    fn to_utc(&self, value: &CalDateOrDateTime, end_of_day: bool) -> NaiveDateTime {
        let local = match value {
            CalDateOrDateTime::Date(date) if end_of_day => {
                date.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN))
            }
            value => value.naive(),
        };
        match self {
            Self::Date | Self::Floating(_) => local,
            Self::Utc | Self::Zoned { .. } => {
                if let CalDateOrDateTime::DateTime(dt) = value
                    && let Some(utc) = dt.to_utc()
                {
                    return utc.naive_utc();
                }
                match self {
                    Self::Zoned { tz, .. } => tz
                        .from_local_datetime(&local)
                        .earliest()
                        .map(|dt| dt.naive_utc())
                        .unwrap_or(local),
                    _ => local,
                }
            }
        }
    }

    fn utc_token(&self, value: &CalDateOrDateTime, end_of_day: bool) -> String {
        encode_date_time(&CalDateTime::utc(self.to_utc(value, end_of_day)))
    }

    fn dtstart_line(&self, start: &CalDateOrDateTime) -> String {
        match self {
            Self::Zoned { tz, .. } => format!(
                "DTSTART;TZID={}:{}",
                tz.name(),
                start.naive().format("%Y%m%dT%H%M%S")
            ),
            _ => format!("DTSTART:{}", self.utc_token(start, false)),
        }
    }

    fn from_utc(&self, utc: NaiveDateTime) -> CalDateOrDateTime {
        match self {
            Self::Date => CalDateOrDateTime::Date(utc.date()),
            Self::Floating(None) => CalDateTime::floating(utc).into(),
            Self::Floating(Some(tzid)) => CalDateTime::unresolved(utc, *tzid).into(),
            Self::Utc => CalDateTime::utc(utc).into(),
            Self::Zoned { tzid, tz } => {
                CalDateTime::zoned(tz.from_utc_datetime(&utc).naive_local(), *tzid, *tz).into()
            }
        }
    }
}

impl Incidence {
    /// Expands the recurrence set into at most `limit` start instants, in
    /// the same form as `DTSTART`.
    ///
    /// A non-recurring incidence yields its start; one without a start
    /// yields nothing.
    pub fn occurrences(&self, limit: u16) -> Result<Vec<CalDateOrDateTime>, rrule::RRuleError> {
        let Some(start) = &self.dtstart else {
            return Ok(vec![]);
        };
        if !self.has_recurrence() {
            return Ok(vec![start.clone()]);
        }
        let frame = Frame::of(start);

        let Some(rule) = &self.recurrence else {
            // Explicit dates only; the start always counts
            let excluded: Vec<_> = self
                .exdates
                .iter()
                .map(|date| frame.to_utc(date, false))
                .collect();
            let mut instants: Vec<_> = std::iter::once(start)
                .chain(&self.rdates)
                .map(|date| frame.to_utc(date, false))
                .filter(|instant| !excluded.contains(instant))
                .collect();
            instants.sort();
            instants.dedup();
            instants.truncate(limit.into());
            return Ok(instants
                .into_iter()
                .map(|instant| frame.from_utc(instant))
                .collect());
        };

        let mut rule = rule.clone();
        if let RecurrenceEnd::Until(until) = &rule.end {
            let until = CalDateTime::utc(frame.to_utc(until, true));
            rule.end = RecurrenceEnd::Until(until.into());
        }
        let mut lines = vec![
            frame.dtstart_line(start),
            format!("RRULE:{}", rule.encode()),
        ];
        if !self.exdates.is_empty() {
            lines.push(format!(
                "EXDATE:{}",
                itertools::join(self.exdates.iter().map(|date| frame.utc_token(date, false)), ",")
            ));
        }
        if !self.rdates.is_empty() {
            lines.push(format!(
                "RDATE:{}",
                itertools::join(self.rdates.iter().map(|date| frame.utc_token(date, false)), ",")
            ));
        }

        tracing::debug!(uid = %self.uid, rules = ?lines, "expanding recurrence");
        let set = rrule::RRuleSet::from_str(&lines.join("\n"))?;
        Ok(set
            .all(limit)
            .dates
            .iter()
            .map(|dt| frame.from_utc(dt.naive_utc()))
            .collect())
    }
}
