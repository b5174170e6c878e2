use chrono_tz::Tz as ChronoTz;
use std::collections::HashMap;
use std::str::FromStr;

/// Timezone attached to a date-time value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tz {
    /// Floating wall-clock time, interpreted in the viewer's zone.
    Local,
    Utc,
    /// A zone referenced through `TZID`. The identifier is kept verbatim so
    /// that it survives a round trip even when it is not an IANA name.
    Olson { tzid: String, tz: ChronoTz },
    /// A `TZID` nobody could resolve. Computed with as floating time, but
    /// written back with its identifier.
    Unresolved { tzid: String },
}

impl Tz {
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }

    /// Whether values in this zone are read as wall-clock time.
    pub fn is_floating(&self) -> bool {
        matches!(self, Self::Local | Self::Unresolved { .. })
    }

    pub fn is_utc(&self) -> bool {
        matches!(self, Self::Utc)
    }

    /// The `TZID` parameter value for this zone, if any.
    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        match self {
            Self::Olson { tzid, .. } | Self::Unresolved { tzid } => Some(tzid),
            Self::Local | Self::Utc => None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Local => "Local",
            Self::Utc => "UTC",
            Self::Olson { tzid, .. } | Self::Unresolved { tzid } => tzid,
        }
    }
}

/// Resolves a `TZID` to a concrete zone.
///
/// This is the only capability the codec borrows from its caller. A `None`
/// answer turns into [`super::ValueError::UnknownTimezone`].
pub trait TzResolver {
    fn resolve(&self, tzid: &str) -> Option<ChronoTz>;
}

impl<R: TzResolver + ?Sized> TzResolver for &R {
    fn resolve(&self, tzid: &str) -> Option<ChronoTz> {
        (**self).resolve(tzid)
    }
}

impl TzResolver for HashMap<String, ChronoTz> {
    fn resolve(&self, tzid: &str) -> Option<ChronoTz> {
        self.get(tzid).copied()
    }
}

/// Resolver backed by the IANA database bundled with `chrono-tz`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChronoTzResolver;

impl TzResolver for ChronoTzResolver {
    fn resolve(&self, tzid: &str) -> Option<ChronoTz> {
        // Some producers prefix the zone with a vendor path, e.g.
        // /freeassociation.sourceforge.net/Europe/Berlin
        let stripped = tzid
            .strip_prefix("/freeassociation.sourceforge.net/")
            .or_else(|| tzid.strip_prefix("/softwarestudio.org/"))
            .unwrap_or(tzid);
        ChronoTz::from_str(stripped)
            .ok()
            .or_else(|| get_proprietary_tzid(tzid))
    }
}

static PROPRIETARY_TZIDS: phf::Map<&'static str, ChronoTz> = phf::phf_map! {
    "W. Europe Standard Time" => chrono_tz::Europe::Berlin,
    "Romance Standard Time" => chrono_tz::Europe::Paris,
    "Central Europe Standard Time" => chrono_tz::Europe::Budapest,
    "Central European Standard Time" => chrono_tz::Europe::Warsaw,
    "GMT Standard Time" => chrono_tz::Europe::London,
    "E. Europe Standard Time" => chrono_tz::Europe::Chisinau,
    "FLE Standard Time" => chrono_tz::Europe::Helsinki,
    "Russian Standard Time" => chrono_tz::Europe::Moscow,
    "Eastern Standard Time" => chrono_tz::America::New_York,
    "Central Standard Time" => chrono_tz::America::Chicago,
    "Mountain Standard Time" => chrono_tz::America::Denver,
    "Pacific Standard Time" => chrono_tz::America::Los_Angeles,
    "Tokyo Standard Time" => chrono_tz::Asia::Tokyo,
    "China Standard Time" => chrono_tz::Asia::Shanghai,
    "India Standard Time" => chrono_tz::Asia::Kolkata,
    "AUS Eastern Standard Time" => chrono_tz::Australia::Sydney,
    "UTC" => chrono_tz::UTC,
};

/// Maps Windows zone names (mostly emitted by Microsoft products) to IANA zones.
pub fn get_proprietary_tzid(tzid: &str) -> Option<ChronoTz> {
    PROPRIETARY_TZIDS.get(tzid).copied()
}
