//! # Temporal Types — Registry Timestamps
//!
//! Two timestamp shapes live here:
//!
//! - [`IsoDateTime`], the converter behind every date field of an entity.
//!   It parses ISO-8601 input, normalizes instants to the registry's default
//!   offset and renders output in that same offset.
//! - [`Timestamp`], a UTC instant truncated to seconds, used where a value
//!   is signed (the issue time of a document link) and must therefore be
//!   reproduced exactly from its epoch-seconds rendering.
//!
//! ## Range Handling
//!
//! Conversions never clamp. An instant whose local rendering in the default
//! offset would fall outside chrono's representable range fails with a
//! conversion error at parse or format time.

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, SecondsFormat, TimeZone,
    Timelike, Utc,
};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Naive layouts accepted in addition to RFC 3339. Offset-less input is read
/// in the default offset.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Converter between instants and ISO-8601 strings for one default offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsoDateTime {
    offset: FixedOffset,
}

impl IsoDateTime {
    /// A converter rendering in the given offset.
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// A converter rendering in UTC.
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    /// Parse an offset written as `+02:00`, `-05:30` or `Z`.
    pub fn parse_offset(raw: &str) -> Result<FixedOffset, TypeError> {
        if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
            return Ok(Utc.fix());
        }
        let invalid = || TypeError::Conversion(format!("Invalid UTC offset {raw:?}."));
        let (sign, rest) = match raw.as_bytes().first() {
            Some(b'+') => (1, &raw[1..]),
            Some(b'-') => (-1, &raw[1..]),
            _ => return Err(invalid()),
        };
        let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
        let hours: i32 = hours.parse().map_err(|_| invalid())?;
        let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
        if !(0..60).contains(&minutes) {
            return Err(invalid());
        }
        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
    }

    /// The default offset.
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Parse an ISO-8601 string into an instant in the default offset.
    pub fn parse(&self, raw: &str) -> Result<DateTime<FixedOffset>, TypeError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return self.normalize(&dt).map_err(|_| parse_error(raw));
        }
        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return self.localize(naive).map_err(|_| parse_error(raw));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return self.localize(naive).map_err(|_| parse_error(raw));
            }
        }
        Err(parse_error(raw))
    }

    /// Convert an untyped JSON value. Only strings are accepted.
    pub fn from_json(&self, raw: &serde_json::Value) -> Result<DateTime<FixedOffset>, TypeError> {
        match raw {
            serde_json::Value::String(s) => self.parse(s),
            other => Err(parse_error(&other.to_string())),
        }
    }

    /// Re-express an instant in the default offset, preserving the instant.
    pub fn normalize<Tz: TimeZone>(&self, dt: &DateTime<Tz>) -> Result<DateTime<FixedOffset>, TypeError> {
        let utc = dt.naive_utc();
        utc.checked_add_signed(Duration::seconds(i64::from(self.offset.local_minus_utc())))
            .ok_or_else(|| out_of_range(&utc.to_string()))?;
        Ok(DateTime::from_naive_utc_and_offset(utc, self.offset))
    }

    /// Interpret an offset-less local time in the default offset.
    pub fn localize(&self, naive: NaiveDateTime) -> Result<DateTime<FixedOffset>, TypeError> {
        let utc = naive
            .checked_sub_signed(Duration::seconds(i64::from(self.offset.local_minus_utc())))
            .ok_or_else(|| out_of_range(&naive.to_string()))?;
        Ok(DateTime::from_naive_utc_and_offset(utc, self.offset))
    }

    /// Render an instant as ISO-8601 in the default offset.
    pub fn format(&self, dt: &DateTime<FixedOffset>) -> Result<String, TypeError> {
        let local = self.normalize(dt)?;
        Ok(local.to_rfc3339_opts(SecondsFormat::AutoSi, false))
    }
}

impl Default for IsoDateTime {
    fn default() -> Self {
        Self::utc()
    }
}

fn parse_error(raw: &str) -> TypeError {
    TypeError::Conversion(format!("Could not parse {raw}. Should be ISO8601."))
}

fn out_of_range(raw: &str) -> TypeError {
    TypeError::Conversion(format!("{raw} is outside the representable date range."))
}

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

/// A UTC-only timestamp, truncated to seconds precision.
///
/// Signed payloads carry this as epoch seconds, so a verifier can rebuild the
/// exact signed value from the URL query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from the current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt.with_nanosecond(0).unwrap_or(dt))
    }

    /// Create a timestamp from a Unix epoch timestamp (seconds).
    pub fn from_epoch_secs(secs: i64) -> Result<Self, TypeError> {
        DateTime::from_timestamp(secs, 0)
            .map(Self)
            .ok_or_else(|| TypeError::Conversion(format!("Invalid Unix timestamp: {secs}")))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the Unix epoch timestamp in seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Render as ISO8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kyiv() -> IsoDateTime {
        IsoDateTime::new(FixedOffset::east_opt(2 * 3600).unwrap())
    }

    #[test]
    fn parse_and_format_round_trip() {
        let conv = kyiv();
        let dt = conv.parse("2017-06-23T06:40:34.123+02:00").unwrap();
        let text = conv.format(&dt).unwrap();
        assert_eq!(text, "2017-06-23T06:40:34.123+02:00");
        assert_eq!(conv.parse(&text).unwrap(), dt);
    }

    #[test]
    fn other_offsets_normalized_preserving_instant() {
        let conv = kyiv();
        let dt = conv.parse("2017-06-23T04:40:34Z").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 7200);
        assert_eq!(conv.format(&dt).unwrap(), "2017-06-23T06:40:34+02:00");
    }

    #[test]
    fn typed_instant_normalized() {
        let conv = kyiv();
        let utc = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let dt = conv.normalize(&utc).unwrap();
        assert_eq!(dt, utc);
        assert_eq!(dt.offset(), &conv.offset());
    }

    #[test]
    fn naive_input_read_in_default_offset() {
        let conv = kyiv();
        let dt = conv.parse("2017-01-01T10:00:00").unwrap();
        assert_eq!(conv.format(&dt).unwrap(), "2017-01-01T10:00:00+02:00");
        let date_only = conv.parse("2017-01-01").unwrap();
        assert_eq!(conv.format(&date_only).unwrap(), "2017-01-01T00:00:00+02:00");
    }

    #[test]
    fn unparsable_values_name_the_input() {
        let conv = IsoDateTime::utc();
        for raw in ["", "2007-06-23X06:40:34.00Z", "not-a-date"] {
            let err = conv.parse(raw).unwrap_err();
            assert!(err.is_conversion());
            assert_eq!(err.message(), format!("Could not parse {raw}. Should be ISO8601."));
        }
        let err = conv.from_json(&serde_json::json!(2017)).unwrap_err();
        assert_eq!(err.message(), "Could not parse 2017. Should be ISO8601.");
        let err = conv.from_json(&serde_json::Value::Null).unwrap_err();
        assert_eq!(err.message(), "Could not parse null. Should be ISO8601.");
    }

    #[test]
    fn extremes_fail_instead_of_clamping() {
        let west = IsoDateTime::new(FixedOffset::west_opt(5 * 3600).unwrap());
        assert!(west.localize(NaiveDateTime::MAX).is_err());

        let east = IsoDateTime::new(FixedOffset::east_opt(5 * 3600).unwrap());
        assert!(east.localize(NaiveDateTime::MIN).is_err());
        let utc_max = DateTime::<Utc>::MAX_UTC;
        assert!(east.normalize(&utc_max).is_err());
        assert!(east.format(&utc_max.fixed_offset()).is_err());
    }

    #[test]
    fn parse_offset_forms() {
        assert_eq!(IsoDateTime::parse_offset("Z").unwrap().local_minus_utc(), 0);
        assert_eq!(IsoDateTime::parse_offset("+02:00").unwrap().local_minus_utc(), 7200);
        assert_eq!(IsoDateTime::parse_offset("-05:30").unwrap().local_minus_utc(), -19800);
        assert!(IsoDateTime::parse_offset("Europe/Kyiv").is_err());
    }

    #[test]
    fn timestamp_truncates_and_round_trips_epoch() {
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 12, 30, 45).unwrap();
        let ts = Timestamp::from_utc(dt.with_nanosecond(123_456_789).unwrap());
        assert_eq!(ts.to_iso8601(), "2026-01-15T12:30:45Z");
        assert_eq!(Timestamp::from_epoch_secs(ts.epoch_secs()).unwrap(), ts);
        assert!(Timestamp::from_epoch_secs(i64::MAX).is_err());
    }

    #[test]
    fn fixed_clock_is_frozen() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let clock = FixedClock(at);
        assert_eq!(clock.now(), at);
        assert_eq!(clock.now(), clock.now());
    }
}
