//! `RRULE` values.
//!
//! Only the parts the object model knows about are decoded; every other rule
//! part (`WKST`, `BYSETPOS`, `BYYEARDAY`, ...) is carried along verbatim.

use chrono::Weekday;
use std::str::FromStr;

use crate::{
    parser::ContentLine,
    types::{CalDateOrDateTime, CalDateTime, TzResolver, ValueError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }
}

impl FromStr for Frequency {
    type Err = ValueError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "DAILY" => Ok(Self::Daily),
            "WEEKLY" => Ok(Self::Weekly),
            "MONTHLY" => Ok(Self::Monthly),
            "YEARLY" => Ok(Self::Yearly),
            _ => Err(ValueError::malformed("FREQ", value)),
        }
    }
}

/// How a rule ends. A count and an end instant are exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RecurrenceEnd {
    #[default]
    Forever,
    Count(u32),
    Until(CalDateOrDateTime),
}

/// A `BYDAY` entry such as `MO`, `2TU` or `-1FR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekdayNum {
    pub ordinal: Option<i8>,
    pub weekday: Weekday,
}

impl WeekdayNum {
    fn decode(value: &str) -> Result<Self, ValueError> {
        let malformed = || ValueError::malformed("BYDAY", value);
        let split = value.len().checked_sub(2).ok_or_else(malformed)?;
        if !value.is_char_boundary(split) {
            return Err(malformed());
        }
        let (ordinal, day) = value.split_at(split);
        let weekday = match day.to_ascii_uppercase().as_str() {
            "MO" => Weekday::Mon,
            "TU" => Weekday::Tue,
            "WE" => Weekday::Wed,
            "TH" => Weekday::Thu,
            "FR" => Weekday::Fri,
            "SA" => Weekday::Sat,
            "SU" => Weekday::Sun,
            _ => return Err(malformed()),
        };
        let ordinal = match ordinal {
            "" => None,
            ordinal => {
                let ordinal: i8 = ordinal.parse().map_err(|_| malformed())?;
                if ordinal == 0 || !(-53..=53).contains(&ordinal) {
                    return Err(malformed());
                }
                Some(ordinal)
            }
        };
        Ok(Self { ordinal, weekday })
    }

    fn encode(&self) -> String {
        let day = match self.weekday {
            Weekday::Mon => "MO",
            Weekday::Tue => "TU",
            Weekday::Wed => "WE",
            Weekday::Thu => "TH",
            Weekday::Fri => "FR",
            Weekday::Sat => "SA",
            Weekday::Sun => "SU",
        };
        match self.ordinal {
            Some(ordinal) => format!("{ordinal}{day}"),
            None => day.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recurrence {
    pub frequency: Frequency,
    pub interval: u32,
    pub end: RecurrenceEnd,
    pub by_day: Vec<WeekdayNum>,
    pub by_month_day: Vec<i8>,
    pub by_month: Vec<u8>,
    /// Rule parts without a dedicated field, in input order.
    pub other_parts: Vec<(String, String)>,
}

impl Recurrence {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            end: RecurrenceEnd::Forever,
            by_day: vec![],
            by_month_day: vec![],
            by_month: vec![],
            other_parts: vec![],
        }
    }

    /// Decodes a rule.
    ///
    /// The second element is true when the rule carried both `COUNT` and
    /// `UNTIL`; the count is then dropped in favour of the end instant.
    pub fn decode(value: &str, resolver: &dyn TzResolver) -> Result<(Self, bool), ValueError> {
        let malformed = |part: &str| ValueError::malformed("RECUR", part);

        let mut frequency = None;
        let mut rule = Self::new(Frequency::Daily);
        let mut count = None;
        let mut until = None;

        for part in value.trim().split(';').filter(|part| !part.is_empty()) {
            let (name, part_value) = part.split_once('=').ok_or_else(|| malformed(part))?;
            let name = name.to_ascii_uppercase();
            match name.as_str() {
                "FREQ" => frequency = Some(part_value.parse::<Frequency>()?),
                "INTERVAL" => {
                    rule.interval = part_value
                        .parse()
                        .ok()
                        .filter(|interval| *interval > 0)
                        .ok_or_else(|| malformed(part))?;
                }
                "COUNT" => count = Some(part_value.parse::<u32>().map_err(|_| malformed(part))?),
                "UNTIL" => {
                    until = Some(CalDateOrDateTime::parse(part_value, None, None, resolver)?);
                }
                "BYDAY" => {
                    rule.by_day = part_value
                        .split(',')
                        .map(WeekdayNum::decode)
                        .collect::<Result<_, _>>()?;
                }
                "BYMONTHDAY" => {
                    rule.by_month_day = part_value
                        .split(',')
                        .map(|day| {
                            day.parse::<i8>()
                                .ok()
                                .filter(|day| *day != 0 && (-31..=31).contains(day))
                                .ok_or_else(|| malformed(part))
                        })
                        .collect::<Result<_, _>>()?;
                }
                "BYMONTH" => {
                    rule.by_month = part_value
                        .split(',')
                        .map(|month| {
                            month
                                .parse::<u8>()
                                .ok()
                                .filter(|month| (1..=12).contains(month))
                                .ok_or_else(|| malformed(part))
                        })
                        .collect::<Result<_, _>>()?;
                }
                _ => rule.other_parts.push((name, part_value.to_owned())),
            }
        }

        rule.frequency = frequency.ok_or_else(|| malformed(value))?;
        let conflict = count.is_some() && until.is_some();
        rule.end = match (count, until) {
            (_, Some(until)) => RecurrenceEnd::Until(until),
            (Some(count), None) => RecurrenceEnd::Count(count),
            (None, None) => RecurrenceEnd::Forever,
        };
        Ok((rule, conflict))
    }

    pub fn encode(&self) -> String {
        let mut parts = vec![format!("FREQ={}", self.frequency.as_str())];
        match &self.end {
            RecurrenceEnd::Forever => {}
            RecurrenceEnd::Count(count) => parts.push(format!("COUNT={count}")),
            RecurrenceEnd::Until(until) => parts.push(format!("UNTIL={}", encode_until(until))),
        }
        if self.interval != 1 {
            parts.push(format!("INTERVAL={}", self.interval));
        }
        if !self.by_day.is_empty() {
            parts.push(format!(
                "BYDAY={}",
                itertools::join(self.by_day.iter().map(WeekdayNum::encode), ",")
            ));
        }
        if !self.by_month_day.is_empty() {
            parts.push(format!(
                "BYMONTHDAY={}",
                itertools::join(&self.by_month_day, ",")
            ));
        }
        if !self.by_month.is_empty() {
            parts.push(format!("BYMONTH={}", itertools::join(&self.by_month, ",")));
        }
        parts.extend(
            self.other_parts
                .iter()
                .map(|(name, value)| format!("{name}={value}")),
        );
        parts.join(";")
    }

    pub fn to_content_line(&self) -> ContentLine {
        ContentLine::new("RRULE", self.encode())
    }
}

/// `UNTIL` cannot carry a `TZID`; zoned values are written in UTC.
fn encode_until(until: &CalDateOrDateTime) -> String {
    match until {
        CalDateOrDateTime::DateTime(dt) if dt.tz.tzid().is_some() => match dt.to_utc() {
            Some(utc) => CalDateOrDateTime::from(CalDateTime::utc(utc.naive_utc())).format(),
            None => until.format(),
        },
        _ => until.format(),
    }
}
