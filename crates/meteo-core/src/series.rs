//! Observation series model
//!
//! Both upstream feeds quantize their data to four fixed time-of-day
//! anchors (03:00, 09:00, 15:00, 21:00 local). Everything downstream of
//! the extractors works on [`Series`] values: ordered collections of
//! labeled observations anchored on a single current-conditions entry
//! (the "fact") plus forward offsets in whole multiples of 6 hours.

use chrono::{DateTime, FixedOffset};
use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::{Error, Result};

/// Local wall-clock hours of the four daily report slots, by slot index.
pub const SLOT_HOURS: [u32; 4] = [3, 9, 15, 21];

/// Spacing of the report slots, in hours.
pub const STEP_HOURS: i64 = 6;

/// Spacing of the report slots, in seconds.
pub const STEP_SECS: i64 = STEP_HOURS * 3600;

/// One of the four fixed daily report slots, indexed 0-3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot(u8);

impl Slot {
    /// Number of report slots per day.
    pub const COUNT: usize = 4;

    /// Strict constructor: rejects indices outside 0-3.
    pub fn new(index: usize) -> Result<Self> {
        if index < Self::COUNT {
            Ok(Self(index as u8))
        } else {
            Err(Error::consistency(format!(
                "slot index {index} out of range (expected 0-3)"
            )))
        }
    }

    /// Lenient constructor for the short-range fact node, which is known
    /// to occasionally carry a negative or otherwise out-of-range slot
    /// index. Such values are clamped to slot 0, matching upstream.
    pub fn from_fact_index(raw: i64) -> Self {
        if (0..Self::COUNT as i64).contains(&raw) {
            Self(raw as u8)
        } else {
            tracing::debug!("clamping out-of-range fact slot index {raw} to 0");
            Self(0)
        }
    }

    /// Slot for a given local report hour (3, 9, 15 or 21).
    pub fn from_hour(hour: u32) -> Option<Self> {
        SLOT_HOURS.iter().position(|h| *h == hour).map(|i| Self(i as u8))
    }

    /// Index of this slot, 0-3.
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Local wall-clock hour of this slot.
    pub fn hour(&self) -> u32 {
        SLOT_HOURS[self.0 as usize]
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00", self.hour())
    }
}

/// Metric label of one observation: the literal `fact` for the current
/// reading, or `h_<offset>` for a forecast `offset` whole hours ahead of
/// the fact instant, zero-padded to three digits (`h_006`, `h_012`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    /// The current-conditions observation, temporal anchor of the series.
    Fact,
    /// A forecast, this many whole hours ahead of the fact instant.
    Hours(u32),
}

impl Label {
    /// Forecast label for an offset in whole hours. Offsets must be
    /// positive multiples of 6; anything else means the slot arithmetic
    /// upstream has gone wrong.
    pub fn forecast(offset_hours: u32) -> Result<Self> {
        if offset_hours == 0 || offset_hours as i64 % STEP_HOURS != 0 {
            return Err(Error::consistency(format!(
                "forecast offset {offset_hours}h is not a positive multiple of {STEP_HOURS}h"
            )));
        }
        Ok(Self::Hours(offset_hours))
    }

    /// Offset in whole hours from the fact instant (0 for the fact).
    pub fn offset_hours(&self) -> u32 {
        match self {
            Self::Fact => 0,
            Self::Hours(h) => *h,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fact => f.write_str("fact"),
            Self::Hours(h) => write!(f, "h_{h:03}"),
        }
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One reconciled data point: a label, a temperature and the canonical
/// timezone-aware instant it refers to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub label: Label,
    pub value: f64,
    pub instant: DateTime<FixedOffset>,
}

impl Observation {
    pub fn new(label: Label, value: f64, instant: DateTime<FixedOffset>) -> Self {
        Self {
            label,
            value,
            instant,
        }
    }
}

/// Ordered, single-owner collection of observations.
///
/// A series is produced by one extractor and consumed exactly once by the
/// reconciler or the delivery channel; nothing holds back-references into
/// it. Ordering is meaningful (the fact comes first, forecasts follow in
/// document order) and is preserved all the way to the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Series(Vec<Observation>);

impl Series {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, obs: Observation) {
        self.0.push(obs);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.0.iter()
    }

    /// Look an observation up by label.
    pub fn get(&self, label: Label) -> Option<&Observation> {
        self.0.iter().find(|o| o.label == label)
    }

    /// The current-conditions entry, if present.
    pub fn fact(&self) -> Option<&Observation> {
        self.get(Label::Fact)
    }

    /// First label that occurs more than once, if any.
    pub fn duplicate_label(&self) -> Option<Label> {
        for (i, obs) in self.0.iter().enumerate() {
            if self.0[..i].iter().any(|o| o.label == obs.label) {
                return Some(obs.label);
            }
        }
        None
    }
}

impl IntoIterator for Series {
    type Item = Observation;
    type IntoIter = std::vec::IntoIter<Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Extend<Observation> for Series {
    fn extend<T: IntoIterator<Item = Observation>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl FromIterator<Observation> for Series {
    fn from_iter<T: IntoIterator<Item = Observation>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
