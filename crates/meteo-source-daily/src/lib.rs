// # Long-Range Feed Extractor
//
// This crate extracts the multi-day series from the HTML daily page:
// a forecast table of day blocks, each one header row naming the day
// plus exactly four slot rows in fixed order.
//
// The extractor does not stand alone: it takes the already-extracted
// short-range series as a consistency oracle. The oracle's fact entry
// establishes the reference day the table is matched against (the page
// can lag the reference by one day around local midnight, which is
// tolerated exactly once per block), and every offset both feeds cover
// is cross-checked and then dropped in favor of the short-range value.

use async_trait::async_trait;
use chrono::{Datelike, Days, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

use meteo_core::error::{Error, Result};
use meteo_core::reconcile;
use meteo_core::series::{Label, Observation, Series, Slot, SLOT_HOURS, STEP_SECS};
use meteo_core::time::Zone;
use meteo_core::traits::{DocumentFetcher, LongRangeSource};

pub mod rows;
pub mod temp;

pub use rows::{extract_rows, TableRow};
pub use temp::{parse_temperature, TempParse};

/// Feed name used in error messages.
pub(crate) const FEED: &str = "daily";

/// Rows per day block: one header plus one row per report slot.
const BLOCK_ROWS: usize = 1 + Slot::COUNT;

/// Month names the header lexicon recognizes, in calendar order.
const MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

/// Weekday names the header lexicon recognizes, Monday first.
const WEEKDAYS: [&str; 7] = [
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
];

/// Time-of-day labels of the four report slots, in slot order.
const SLOT_NAMES: [&str; 4] = ["night", "morning", "day", "evening"];

static DAY_OF_MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}").expect("valid literal regex"));

/// Long-range feed component: fetches the daily page and extracts the
/// forward series from it.
pub struct DailySource {
    fetcher: Box<dyn DocumentFetcher>,
    url: String,
    zone: Zone,
}

impl DailySource {
    /// Create a new long-range source.
    ///
    /// # Parameters
    ///
    /// - `fetcher`: Document retrieval implementation
    /// - `url`: The daily forecast page
    /// - `zone`: Timezone the page's schedule is expressed in
    pub fn new(fetcher: Box<dyn DocumentFetcher>, url: impl Into<String>, zone: Zone) -> Self {
        Self {
            fetcher,
            url: url.into(),
            zone,
        }
    }
}

#[async_trait]
impl LongRangeSource for DailySource {
    async fn series(&self, check: &Series) -> Result<Series> {
        let html = self.fetcher.fetch(&self.url).await?;
        extract(&extract_rows(&html)?, check, self.zone)
    }
}

/// What a day header's free text claims about its date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeaderDate {
    day_of_month: u32,
    month0: u32,
    weekday0: u32,
}

impl HeaderDate {
    fn matches(&self, date: NaiveDate) -> bool {
        date.day() == self.day_of_month
            && date.month0() == self.month0
            && date.weekday().num_days_from_monday() == self.weekday0
    }
}

/// Parse a day header's free text against the fixed lexicons.
///
/// A header naming no known month or weekday is a fatal parse error:
/// it means the page layout changed, not that a day is missing.
fn parse_header(text: &str) -> Result<HeaderDate> {
    let lower = text.to_lowercase();
    let month0 = MONTHS
        .iter()
        .position(|m| lower.contains(m))
        .ok_or_else(|| Error::schema(FEED, format!("day header {text:?} names no known month")))?;
    let weekday0 = WEEKDAYS
        .iter()
        .position(|w| lower.contains(w))
        .ok_or_else(|| Error::schema(FEED, format!("day header {text:?} names no known weekday")))?;
    let day_of_month = DAY_OF_MONTH
        .find(&lower)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| Error::schema(FEED, format!("day header {text:?} names no day of month")))?;
    Ok(HeaderDate {
        day_of_month,
        month0: month0 as u32,
        weekday0: weekday0 as u32,
    })
}

/// Extract the long-range series from the table rows.
///
/// Walks the rows in blocks of five (header plus four slots), matches
/// each block against the expected calendar day, and emits one entry
/// per slot row that lies at least 6 hours ahead of the oracle's fact
/// instant. The returned series is already cross-validated against the
/// oracle and contains no label it also covers.
pub fn extract(table: &[TableRow], check: &Series, zone: Zone) -> Result<Series> {
    let fact = check
        .fact()
        .ok_or_else(|| Error::consistency("short-range series has no fact entry".to_string()))?;
    let reference_day = fact.instant.date_naive();

    if table.is_empty() || table.len() % BLOCK_ROWS != 0 {
        return Err(Error::schema(
            FEED,
            format!(
                "table has {} rows, expected a positive multiple of {BLOCK_ROWS}",
                table.len()
            ),
        ));
    }

    let mut series = Series::new();
    for (block_index, block) in table.chunks_exact(BLOCK_ROWS).enumerate() {
        let TableRow::DayHeader { text } = &block[0] else {
            return Err(Error::schema(
                FEED,
                format!("block {block_index} does not start with a day header"),
            ));
        };
        let day = match_block_day(text, reference_day, block_index)?;

        for (slot_index, row) in block[1..].iter().enumerate() {
            let TableRow::Slot {
                hour,
                label,
                temperature,
            } = row
            else {
                return Err(Error::schema(
                    FEED,
                    format!("day header in the middle of block {block_index}"),
                ));
            };
            let slot = Slot::new(slot_index)?;
            if *hour != SLOT_HOURS[slot_index] {
                return Err(Error::schema(
                    FEED,
                    format!(
                        "slot row {slot_index} of {day} declares {hour:02}:00, expected {slot}"
                    ),
                ));
            }
            if !label.to_lowercase().contains(SLOT_NAMES[slot_index]) {
                return Err(Error::schema(
                    FEED,
                    format!(
                        "slot row {slot_index} of {day} is labeled {label:?}, expected {:?}",
                        SLOT_NAMES[slot_index]
                    ),
                ));
            }

            let (value, path) = parse_temperature(temperature)?;
            if path == TempParse::Recovered {
                warn!("recovered glyph-corrupted temperature {temperature:?} as {value}");
            }

            let instant = zone.slot_instant(day, slot)?;
            let delta_secs = (instant - fact.instant).num_seconds();
            if delta_secs < STEP_SECS {
                // Past or present; the short-range feed owns this ground.
                continue;
            }
            if delta_secs % STEP_SECS != 0 {
                return Err(Error::consistency(format!(
                    "slot instant {instant} is {delta_secs}s after the fact instant, not a multiple of {STEP_SECS}s"
                )));
            }
            series.push(Observation::new(
                Label::forecast((delta_secs / 3600) as u32)?,
                value,
                instant,
            ));
        }
    }

    reconcile::cross_validate(check, series)
}

/// Match a block's header against the day it should describe.
///
/// The expected day is the reference day advanced by the block index.
/// When the header disagrees, the page may simply not have rolled over
/// yet, so the comparison is retried once with the expected day
/// advanced by one more; a second disagreement is fatal.
fn match_block_day(header: &str, reference_day: NaiveDate, block_index: usize) -> Result<NaiveDate> {
    let parsed = parse_header(header)?;
    let expected = reference_day
        .checked_add_days(Days::new(block_index as u64))
        .ok_or_else(|| Error::consistency(format!("no calendar day {block_index} days after {reference_day}")))?;
    if parsed.matches(expected) {
        return Ok(expected);
    }
    let shifted = expected
        .succ_opt()
        .ok_or_else(|| Error::consistency(format!("no calendar day after {expected}")))?;
    if parsed.matches(shifted) {
        debug!("page dates lag the reference day; reading block {block_index} as {shifted}");
        return Ok(shifted);
    }
    Err(Error::schema(
        FEED,
        format!("day header {header:?} matches neither {expected} nor {shifted}"),
    ))
}
