//! Timestamp normalization
//!
//! Both feeds report naive wall-clock times quantized to the four daily
//! report slots. This module turns a (calendar day, slot) pair into a
//! canonical timezone-aware instant, and repairs a known malformation in
//! the short-range feed's timestamp strings where the hour is rendered
//! with a single digit (`2024-01-10T9:00:00`).

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone};
use regex::Regex;
use std::borrow::Cow;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::series::Slot;

/// Matches the feed's broken single-digit-hour timestamps, and nothing
/// else: repair is attempted only on an exact full-string match.
static SINGLE_DIGIT_HOUR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d:\d{2}:\d{2}$").expect("valid literal regex")
});

const FEED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Timezone the feeds' wall-clock values are expressed in.
///
/// Parsed once from the command line: either an IANA zone identifier
/// (`Europe/Moscow`) or the sentinel `local`, meaning whatever zone the
/// process itself runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// The host's own timezone.
    Local,
    /// A named IANA zone.
    Named(chrono_tz::Tz),
}

impl FromStr for Zone {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }
        s.parse::<chrono_tz::Tz>()
            .map(Self::Named)
            .map_err(|_| Error::config(format!("unrecognized timezone {s:?} (use an IANA name or \"local\")")))
    }
}

impl Zone {
    /// Localize a naive wall-clock value in this zone.
    ///
    /// On a DST fold the earlier of the two valid instants wins; a
    /// wall-clock that falls into a DST gap has no valid interpretation
    /// and is a fatal timestamp error.
    pub fn localize(&self, naive: NaiveDateTime) -> Result<DateTime<FixedOffset>> {
        let resolved = match self {
            Self::Local => Local.from_local_datetime(&naive).earliest().map(|dt| dt.fixed_offset()),
            Self::Named(tz) => tz.from_local_datetime(&naive).earliest().map(|dt| dt.fixed_offset()),
        };
        resolved.ok_or_else(|| {
            Error::consistency(format!("wall-clock {naive} does not exist in zone {self:?}"))
        })
    }

    /// Canonical instant of a report slot on a given calendar day.
    pub fn slot_instant(&self, day: NaiveDate, slot: Slot) -> Result<DateTime<FixedOffset>> {
        let naive = day.and_hms_opt(slot.hour(), 0, 0).ok_or_else(|| {
            Error::consistency(format!("no {slot} wall-clock on {day}"))
        })?;
        self.localize(naive)
    }
}

/// Parse a feed timestamp string into its naive wall-clock value,
/// repairing the single-digit-hour malformation first.
///
/// `feed` and `field` name the origin for the error message; a string
/// that still fails to parse after repair aborts the extraction.
pub fn parse_feed_datetime(text: &str, feed: &'static str, field: &'static str) -> Result<NaiveDateTime> {
    let repaired = repair_single_digit_hour(text);
    NaiveDateTime::parse_from_str(&repaired, FEED_FORMAT)
        .map_err(|_| Error::timestamp(feed, field, text))
}

/// Same as [`parse_feed_datetime`], localized in `zone`.
pub fn parse_feed_timestamp(
    text: &str,
    zone: Zone,
    feed: &'static str,
    field: &'static str,
) -> Result<DateTime<FixedOffset>> {
    zone.localize(parse_feed_datetime(text, feed, field)?)
}

/// Left-pad the hour field of a `2024-01-10T9:00:00`-shaped string.
fn repair_single_digit_hour(text: &str) -> Cow<'_, str> {
    if SINGLE_DIGIT_HOUR.is_match(text) {
        let mut fixed = String::with_capacity(text.len() + 1);
        fixed.push_str(&text[..11]);
        fixed.push('0');
        fixed.push_str(&text[11..]);
        Cow::Owned(fixed)
    } else {
        Cow::Borrowed(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Slot;

    #[test]
    fn repair_pads_single_digit_hour() {
        assert_eq!(
            repair_single_digit_hour("2024-01-10T9:00:00"),
            "2024-01-10T09:00:00"
        );
        // Well-formed strings pass through untouched.
        assert_eq!(
            repair_single_digit_hour("2024-01-10T19:00:00"),
            "2024-01-10T19:00:00"
        );
        // Repair only fires on an exact full-string match.
        assert_eq!(repair_single_digit_hour("x 2024-01-10T9:00:00"), "x 2024-01-10T9:00:00");
    }

    #[test]
    fn repaired_and_wellformed_strings_agree() {
        let zone: Zone = "Asia/Yekaterinburg".parse().unwrap();
        let broken = parse_feed_timestamp("2024-01-10T9:00:00", zone, "test", "valid").unwrap();
        let clean = parse_feed_timestamp("2024-01-10T09:00:00", zone, "test", "valid").unwrap();
        assert_eq!(broken, clean);
        assert_eq!(broken.to_rfc3339(), "2024-01-10T09:00:00+05:00");
    }

    #[test]
    fn unparseable_timestamp_is_fatal() {
        let err = parse_feed_datetime("2024-01-10 09:00", "test", "valid").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("valid"), "error should name the field: {msg}");
        assert!(msg.contains("test"), "error should name the feed: {msg}");
    }

    #[test]
    fn zone_parses_iana_and_local() {
        assert!(matches!("local".parse::<Zone>().unwrap(), Zone::Local));
        assert!(matches!("LOCAL".parse::<Zone>().unwrap(), Zone::Local));
        assert!(matches!(
            "Europe/Moscow".parse::<Zone>().unwrap(),
            Zone::Named(_)
        ));
        assert!("Not/AZone".parse::<Zone>().is_err());
    }

    #[test]
    fn slot_instant_lands_on_the_anchor_hour() {
        let zone: Zone = "Europe/Moscow".parse().unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let ts = zone.slot_instant(day, Slot::new(3).unwrap()).unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-10T21:00:00+03:00");
    }
}
