//! Series reconciliation
//!
//! The short-range feed is authoritative: where both feeds cover the
//! same forward offset, the long-range value is checked against the
//! short-range one and then dropped. [`cross_validate`] performs that
//! check (it runs inside the long-range extractor, before merging);
//! [`merge`] concatenates the two series and enforces the merged-series
//! invariants.

use tracing::debug;

use crate::error::{Error, Result};
use crate::series::{Label, Series, STEP_SECS};

/// Largest tolerated absolute disagreement, in degrees, between the two
/// feeds at the same forward offset. Anything bigger means the sources
/// have diverged and the run must abort.
pub const CROSS_TOLERANCE_DEGREES: f64 = 10.0;

/// Check the long-range series against the already-extracted short-range
/// one and drop every overlapping entry.
///
/// For each label present in both series the temperatures must agree
/// within [`CROSS_TOLERANCE_DEGREES`] and the instants must be exactly
/// equal; a violation of either bound is a fatal consistency error, not
/// a silent drop. Entries that pass the check are removed from the
/// returned series, since the short-range feed wins for offsets it
/// covers.
pub fn cross_validate(short: &Series, long: Series) -> Result<Series> {
    let mut kept = Series::new();
    for obs in long {
        let Some(prior) = short.get(obs.label) else {
            kept.push(obs);
            continue;
        };
        let disagreement = (obs.value - prior.value).abs();
        if disagreement > CROSS_TOLERANCE_DEGREES {
            return Err(Error::consistency(format!(
                "sources disagree at {}: short-range {} vs long-range {} ({disagreement:.1} apart)",
                obs.label, prior.value, obs.value
            )));
        }
        if obs.instant != prior.instant {
            return Err(Error::consistency(format!(
                "sources disagree on the instant of {}: short-range {} vs long-range {}",
                obs.label, prior.instant, obs.instant
            )));
        }
        debug!("dropping long-range {} ({}), covered by short-range", obs.label, obs.value);
    }
    Ok(kept)
}

/// Merge the short-range series with the (already cross-validated and
/// deduplicated) long-range series.
///
/// The short-range entries come first, in their original order, followed
/// by the long-range entries in theirs. The merged series is validated
/// before being returned: labels unique, exactly one fact, and every
/// forecast instant exactly `offset` hours after the fact instant.
pub fn merge(short: Series, long: Series) -> Result<Series> {
    let mut merged = short;
    merged.extend(long);
    validate(&merged)?;
    Ok(merged)
}

/// Enforce the merged-series invariants.
pub fn validate(series: &Series) -> Result<()> {
    let fact_count = series.iter().filter(|o| o.label == Label::Fact).count();
    if fact_count != 1 {
        return Err(Error::consistency(format!(
            "merged series has {fact_count} fact entries (expected exactly 1)"
        )));
    }
    if let Some(label) = series.duplicate_label() {
        return Err(Error::consistency(format!(
            "merged series has duplicate label {label}"
        )));
    }

    // fact_count == 1 was checked above
    let fact = series
        .fact()
        .ok_or_else(|| Error::consistency("merged series has no fact entry".to_string()))?;
    for obs in series {
        if obs.label == Label::Fact {
            continue;
        }
        let delta_secs = (obs.instant - fact.instant).num_seconds();
        if delta_secs < 0 || delta_secs % STEP_SECS != 0 {
            return Err(Error::consistency(format!(
                "{} is {delta_secs}s from the fact instant, not a non-negative multiple of {STEP_SECS}s",
                obs.label
            )));
        }
        let offset_hours = (delta_secs / 3600) as u32;
        if offset_hours != obs.label.offset_hours() {
            return Err(Error::consistency(format!(
                "{} is actually {offset_hours}h ahead of the fact instant",
                obs.label
            )));
        }
    }
    Ok(())
}
