use super::{Tz, TzResolver, ValueError};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use derive_more::From;

const DATE_FORMAT: &str = "%Y%m%d";
const DATETIME_FORMAT: &str = "%Y%m%dT%H%M%S";

/// A wall-clock date-time together with the zone it is expressed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalDateTime {
    pub local: NaiveDateTime,
    pub tz: Tz,
}

impl CalDateTime {
    pub fn floating(local: NaiveDateTime) -> Self {
        Self {
            local,
            tz: Tz::Local,
        }
    }

    pub fn utc(local: NaiveDateTime) -> Self {
        Self { local, tz: Tz::Utc }
    }

    pub fn zoned(local: NaiveDateTime, tzid: impl Into<String>, tz: chrono_tz::Tz) -> Self {
        Self {
            local,
            tz: Tz::Olson {
                tzid: tzid.into(),
                tz,
            },
        }
    }

    /// Wall-clock time tagged with a `TZID` that could not be resolved.
    pub fn unresolved(local: NaiveDateTime, tzid: impl Into<String>) -> Self {
        Self {
            local,
            tz: Tz::Unresolved { tzid: tzid.into() },
        }
    }

    /// Current time in UTC, truncated to whole seconds.
    pub fn now_utc() -> Self {
        let now = Utc::now().naive_utc();
        Self::utc(now.with_nanosecond(0).unwrap_or(now))
    }

    pub fn is_floating(&self) -> bool {
        self.tz.is_floating()
    }

    /// The absolute instant, unless the value is floating.
    pub fn to_utc(&self) -> Option<chrono::DateTime<Utc>> {
        match &self.tz {
            Tz::Local | Tz::Unresolved { .. } => None,
            Tz::Utc => Some(Utc.from_utc_datetime(&self.local)),
            Tz::Olson { tz, .. } => tz
                .from_local_datetime(&self.local)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

/// A temporal anchor: either a floating calendar date or a date-time.
#[derive(Debug, Clone, PartialEq, Eq, From)]
pub enum CalDateOrDateTime {
    Date(NaiveDate),
    DateTime(CalDateTime),
}

impl CalDateOrDateTime {
    pub fn is_date(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Date(date) => *date,
            Self::DateTime(dt) => dt.local.date(),
        }
    }

    /// Wall-clock value; dates are taken at midnight.
    pub fn naive(&self) -> NaiveDateTime {
        match self {
            Self::Date(date) => date.and_time(NaiveTime::MIN),
            Self::DateTime(dt) => dt.local,
        }
    }

    pub fn timezone(&self) -> Option<&Tz> {
        match self {
            Self::Date(_) => None,
            Self::DateTime(dt) => Some(&dt.tz),
        }
    }

    /// Value of the `VALUE` parameter that describes this value.
    pub fn value_type(&self) -> &'static str {
        match self {
            Self::Date(_) => "DATE",
            Self::DateTime(_) => "DATE-TIME",
        }
    }

    pub fn tzid(&self) -> Option<&str> {
        self.timezone().and_then(Tz::tzid)
    }

    /// Tags a floating date-time with `tzid`. Dates and values that already
    /// carry a zone are returned unchanged.
    pub fn with_unresolved_tzid(self, tzid: &str) -> Self {
        match self {
            Self::DateTime(dt) if dt.tz.is_local() => {
                Self::DateTime(CalDateTime::unresolved(dt.local, tzid))
            }
            value => value,
        }
    }

    /// Wire token without the `TZID` parameter.
    pub fn format(&self) -> String {
        match self {
            Self::Date(date) => encode_date(*date),
            Self::DateTime(dt) => encode_date_time(dt),
        }
    }

    /// Decodes a date or date-time token.
    ///
    /// `value_type` is the `VALUE` parameter, if present. Without it an
    /// eight character token is read as a date.
    pub fn parse(
        value: &str,
        value_type: Option<&str>,
        tzid: Option<&str>,
        resolver: &dyn TzResolver,
    ) -> Result<Self, ValueError> {
        let is_date = match value_type {
            Some(value_type) => value_type.eq_ignore_ascii_case("DATE"),
            None => !value.contains('T'),
        };
        if is_date {
            Ok(Self::Date(decode_date(value)?))
        } else {
            Ok(Self::DateTime(decode_date_time(value, tzid, resolver)?))
        }
    }
}

pub fn encode_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn decode_date(value: &str) -> Result<NaiveDate, ValueError> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValueError::malformed("DATE", value));
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| ValueError::malformed("DATE", value))
}

/// Encodes the date-time token. Only UTC values carry a zone suffix; the
/// `TZID` of zoned values travels as a parameter.
pub fn encode_date_time(dt: &CalDateTime) -> String {
    let token = dt.local.format(DATETIME_FORMAT).to_string();
    if dt.tz.is_utc() { token + "Z" } else { token }
}

/// Decodes a date-time token.
///
/// A trailing `Z` yields UTC. Otherwise a `TZID` is resolved through
/// `resolver`, and its absence yields a floating value.
pub fn decode_date_time(
    value: &str,
    tzid: Option<&str>,
    resolver: &dyn TzResolver,
) -> Result<CalDateTime, ValueError> {
    let (token, is_utc) = match value.strip_suffix('Z') {
        Some(token) => (token, true),
        None => (value, false),
    };
    if token.len() != 15 || token.as_bytes()[8] != b'T' {
        return Err(ValueError::malformed("DATE-TIME", value));
    }
    let local = NaiveDateTime::parse_from_str(token, DATETIME_FORMAT)
        .map_err(|_| ValueError::malformed("DATE-TIME", value))?;

    if is_utc {
        return Ok(CalDateTime::utc(local));
    }
    match tzid {
        None => Ok(CalDateTime::floating(local)),
        Some(tzid) => resolver
            .resolve(tzid)
            .map(|tz| CalDateTime::zoned(local, tzid, tz))
            .ok_or_else(|| ValueError::UnknownTimezone(tzid.to_owned())),
    }
}
