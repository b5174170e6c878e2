use super::ValueError;
use chrono::Duration;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RE_DURATION: Regex = Regex::new(
        r"^(?P<sign>[+-])?P(?:(?P<W>\d+)W)?(?:(?P<D>\d+)D)?(?:T(?:(?P<H>\d+)H)?(?:(?P<M>\d+)M)?(?:(?P<S>\d+)S)?)?$"
    )
    .expect("duration regex is valid");
}

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;
const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY;

/// Decodes a DURATION token such as `P1W`, `-PT15M` or `P1DT2H`.
pub fn decode_duration(value: &str) -> Result<Duration, ValueError> {
    let malformed = || ValueError::malformed("DURATION", value);
    let captures = RE_DURATION.captures(value).ok_or_else(malformed)?;

    // "P" and "PT" alone match the pattern but carry no value
    let has_time_part = value.contains('T');
    let time_units = ["H", "M", "S"]
        .iter()
        .any(|unit| captures.name(unit).is_some());
    let any_unit = time_units || captures.name("W").is_some() || captures.name("D").is_some();
    if !any_unit || (has_time_part && !time_units) {
        return Err(malformed());
    }

    let mut seconds: i64 = 0;
    for (unit, factor) in [
        ("W", SECONDS_PER_WEEK),
        ("D", SECONDS_PER_DAY),
        ("H", SECONDS_PER_HOUR),
        ("M", SECONDS_PER_MINUTE),
        ("S", 1),
    ] {
        if let Some(amount) = captures.name(unit) {
            let amount: i64 = amount.as_str().parse().map_err(|_| malformed())?;
            seconds = amount
                .checked_mul(factor)
                .and_then(|part| seconds.checked_add(part))
                .ok_or_else(malformed)?;
        }
    }
    if captures.name("sign").is_some_and(|sign| sign.as_str() == "-") {
        seconds = -seconds;
    }
    Duration::try_seconds(seconds).ok_or_else(malformed)
}

/// Encodes a duration in its shortest canonical form. Sub-second parts are
/// dropped.
pub fn encode_duration(duration: &Duration) -> String {
    let total = duration.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let mut seconds = total.abs();

    if seconds == 0 {
        return "PT0S".to_owned();
    }
    if seconds % SECONDS_PER_WEEK == 0 {
        return format!("{sign}P{}W", seconds / SECONDS_PER_WEEK);
    }

    let mut out = format!("{sign}P");
    let days = seconds / SECONDS_PER_DAY;
    seconds %= SECONDS_PER_DAY;
    if days > 0 {
        out += &format!("{days}D");
    }
    if seconds > 0 {
        out.push('T');
        let hours = seconds / SECONDS_PER_HOUR;
        let minutes = (seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
        let secs = seconds % SECONDS_PER_MINUTE;
        if hours > 0 {
            out += &format!("{hours}H");
        }
        if minutes > 0 {
            out += &format!("{minutes}M");
        }
        if secs > 0 {
            out += &format!("{secs}S");
        }
    }
    out
}
