//! Table row model and HTML adapter
//!
//! The daily page is consumed as a flat sequence of typed rows; the
//! extractor core never touches markup. The adapter's contract with the
//! page is small: the first `<table>` holds the forecast, a `<tr>`
//! containing a `<th>` is a day header (its text names the weekday and
//! the calendar date), and every other `<tr>` is a slot row whose first
//! three cells are the report time (`HH:MM`), the time-of-day label and
//! the temperature.

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use meteo_core::error::{Error, Result};

use crate::FEED;

static TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("valid literal selector"));
static TR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("valid literal selector"));
static TH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th").expect("valid literal selector"));
static TD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("valid literal selector"));

/// One row of the daily forecast table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableRow {
    /// A day boundary; `text` is the header's free text (weekday plus
    /// calendar date in some rendering).
    DayHeader { text: String },
    /// One report slot of a day: the declared wall-clock hour, the
    /// declared time-of-day label, and the raw temperature text.
    Slot {
        hour: u32,
        label: String,
        temperature: String,
    },
}

/// Flatten the page's forecast table into typed rows.
pub fn extract_rows(html: &str) -> Result<Vec<TableRow>> {
    let doc = Html::parse_document(html);
    let table = doc
        .select(&TABLE)
        .next()
        .ok_or_else(|| Error::schema(FEED, "page has no <table>".to_string()))?;

    let mut rows = Vec::new();
    for tr in table.select(&TR) {
        if tr.select(&TH).next().is_some() {
            rows.push(TableRow::DayHeader { text: text_of(tr) });
            continue;
        }
        let cells: Vec<ElementRef> = tr.select(&TD).collect();
        let [time, label, temperature, ..] = cells.as_slice() else {
            return Err(Error::schema(
                FEED,
                format!(
                    "slot row needs time, label and temperature cells, found {}",
                    cells.len()
                ),
            ));
        };
        rows.push(TableRow::Slot {
            hour: parse_hour(&text_of(*time))?,
            label: text_of(*label),
            temperature: text_of(*temperature),
        });
    }

    if rows.is_empty() {
        return Err(Error::schema(FEED, "forecast table has no rows".to_string()));
    }
    Ok(rows)
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Parse the `HH:MM` time cell down to its hour.
fn parse_hour(text: &str) -> Result<u32> {
    text.split(':')
        .next()
        .and_then(|h| h.trim().parse().ok())
        .ok_or_else(|| Error::schema(FEED, format!("bad slot time cell {text:?}")))
}
