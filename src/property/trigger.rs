use chrono::Duration;

use crate::{
    parser::{ContentLine, ContentLineParams},
    types::{
        CalDateTime, TzResolver, ValueError, decode_date_time, decode_duration, encode_date_time,
        encode_duration,
    },
};

/// Which end of the incidence a relative trigger is measured from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TriggerRelation {
    #[default]
    Start,
    /// The end of an event, or the due time of a to-do.
    End,
}

/// When an alarm fires. Relative and absolute triggers are exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Relative {
        offset: Duration,
        related: TriggerRelation,
    },
    Absolute(CalDateTime),
}

impl Trigger {
    pub fn before_start(offset: Duration) -> Self {
        Self::Relative {
            offset: -offset,
            related: TriggerRelation::Start,
        }
    }

    pub fn from_content_line(
        prop: &ContentLine,
        resolver: &dyn TzResolver,
    ) -> Result<Self, ValueError> {
        let value = prop.value.trim();
        let is_absolute = match prop.params.get_value_type() {
            Some(value_type) => value_type.eq_ignore_ascii_case("DATE-TIME"),
            None => !value.starts_with(['P', '+', '-']),
        };
        if is_absolute {
            return decode_date_time(value, prop.params.get_tzid(), resolver).map(Self::Absolute);
        }
        let related = match prop.params.get_param("RELATED") {
            None => TriggerRelation::Start,
            Some(related) if related.eq_ignore_ascii_case("START") => TriggerRelation::Start,
            Some(related) if related.eq_ignore_ascii_case("END") => TriggerRelation::End,
            Some(related) => return Err(ValueError::malformed("RELATED", related)),
        };
        Ok(Self::Relative {
            offset: decode_duration(value)?,
            related,
        })
    }

    pub fn to_content_line(&self) -> ContentLine {
        match self {
            Self::Relative { offset, related } => {
                let params = match related {
                    TriggerRelation::Start => ContentLineParams::default(),
                    TriggerRelation::End => ContentLineParams::default().with("RELATED", "END"),
                };
                ContentLine::new("TRIGGER", encode_duration(offset)).with_params(params)
            }
            Self::Absolute(dt) => {
                let mut params = ContentLineParams::default().with("VALUE", "DATE-TIME");
                if let Some(tzid) = dt.tz.tzid() {
                    params = params.with("TZID", tzid);
                }
                ContentLine::new("TRIGGER", encode_date_time(dt)).with_params(params)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ContentLineParser, generator::Emitter, types::ChronoTzResolver};
    use rstest::rstest;

    #[rstest]
    #[case("TRIGGER:-PT15M\r\n")]
    #[case("TRIGGER;RELATED=END:PT5M\r\n")]
    #[case("TRIGGER;VALUE=DATE-TIME:19980101T050000Z\r\n")]
    fn roundtrip(#[case] input: &str) {
        let prop = ContentLineParser::from_slice(input.as_bytes())
            .next()
            .unwrap()
            .unwrap();
        let trigger = Trigger::from_content_line(&prop, &ChronoTzResolver).unwrap();
        similar_asserts::assert_eq!(trigger.to_content_line().generate(), input);
    }

    #[test]
    fn relative() {
        let prop = ContentLine::new("TRIGGER", "-P1D");
        assert_eq!(
            Trigger::from_content_line(&prop, &ChronoTzResolver).unwrap(),
            Trigger::before_start(Duration::days(1))
        );
    }
}
