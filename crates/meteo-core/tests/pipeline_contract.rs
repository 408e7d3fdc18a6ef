//! Architectural Contract Test: Single-Pass Pipeline
//!
//! This test verifies the run-abort policy of the relay pipeline:
//! - The long-range source always receives the short-range series as
//!   its consistency oracle
//! - The sink receives the merged series exactly once, in order
//! - No delivery happens when extraction fails (no partial series ever
//!   reaches the wire)
//! - Merging with an empty long-range series changes nothing
//!
//! If these fail, someone has reordered the pipeline or weakened the
//! all-or-nothing delivery guarantee.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use meteo_core::error::{Error, Result};
use meteo_core::series::{Label, Observation, Series};
use meteo_core::traits::{LongRangeSource, MetricSink, ShortRangeSource};
use meteo_core::RelayEngine;

fn at(offset_hours: i64) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(3 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 1, 10, 9, 0, 0)
        .unwrap()
        + chrono::Duration::hours(offset_hours)
}

fn short_series() -> Series {
    let mut s = Series::new();
    s.push(Observation::new(Label::Fact, -7.0, at(0)));
    s.push(Observation::new(Label::Hours(6), -6.0, at(6)));
    s.push(Observation::new(Label::Hours(12), -8.0, at(12)));
    s.push(Observation::new(Label::Hours(18), -11.0, at(18)));
    s.push(Observation::new(Label::Hours(24), -9.0, at(24)));
    s
}

fn long_series() -> Series {
    let mut s = Series::new();
    s.push(Observation::new(Label::Hours(30), -5.0, at(30)));
    s.push(Observation::new(Label::Hours(36), -4.0, at(36)));
    s
}

/// Short-range source returning a fixed series.
struct FixedShort(Series);

#[async_trait]
impl ShortRangeSource for FixedShort {
    async fn series(&self) -> Result<Series> {
        Ok(self.0.clone())
    }
}

/// Long-range source returning a fixed result and recording the oracle
/// it was handed.
struct ControlledLong {
    result: Mutex<Option<Result<Series>>>,
    seen_oracle: Mutex<Option<Series>>,
}

impl ControlledLong {
    fn new(result: Result<Series>) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Some(result)),
            seen_oracle: Mutex::new(None),
        })
    }
}

#[async_trait]
impl LongRangeSource for ControlledLong {
    async fn series(&self, check: &Series) -> Result<Series> {
        *self.seen_oracle.lock().unwrap() = Some(check.clone());
        self.result
            .lock()
            .unwrap()
            .take()
            .expect("long-range source called more than once")
    }
}

/// Test helper: lets a shared `Arc<T>` be handed to the engine as a
/// boxed trait object while the test keeps its own handle. Implementing
/// the trait directly on `Arc<T>` is an orphan-rule violation here (both
/// `Arc` and the trait are foreign to this integration-test crate), so
/// we wrap the `Arc` in a local newtype and delegate.
struct Shared<T>(Arc<T>);

#[async_trait]
impl LongRangeSource for Shared<ControlledLong> {
    async fn series(&self, check: &Series) -> Result<Series> {
        self.0.series(check).await
    }
}

/// Sink recording everything it was asked to deliver.
#[derive(Default)]
struct RecordingSink {
    delivered: Mutex<Vec<Series>>,
    calls: AtomicUsize,
}

#[async_trait]
impl MetricSink for RecordingSink {
    async fn deliver(&self, series: &Series) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.delivered.lock().unwrap().push(series.clone());
        Ok(())
    }
}

#[async_trait]
impl MetricSink for Shared<RecordingSink> {
    async fn deliver(&self, series: &Series) -> Result<()> {
        self.0.deliver(series).await
    }
}

#[tokio::test]
async fn long_range_source_receives_the_short_series_as_oracle() {
    let long = ControlledLong::new(Ok(long_series()));
    let sink = Arc::new(RecordingSink::default());

    let engine = RelayEngine::new(
        Box::new(FixedShort(short_series())),
        Box::new(Shared(Arc::clone(&long))),
        Box::new(Shared(Arc::clone(&sink))),
    );
    engine.run().await.expect("pipeline succeeds");

    let oracle = long.seen_oracle.lock().unwrap().clone();
    assert_eq!(
        oracle,
        Some(short_series()),
        "the long-range source must see the short-range output, unmodified"
    );
}

#[tokio::test]
async fn merged_series_is_delivered_exactly_once_in_order() {
    let long = ControlledLong::new(Ok(long_series()));
    let sink = Arc::new(RecordingSink::default());

    let engine = RelayEngine::new(
        Box::new(FixedShort(short_series())),
        Box::new(Shared(Arc::clone(&long))),
        Box::new(Shared(Arc::clone(&sink))),
    );
    let merged = engine.run().await.expect("pipeline succeeds");

    assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    let delivered = sink.delivered.lock().unwrap();
    assert_eq!(delivered.as_slice(), &[merged.clone()]);

    let labels: Vec<String> = merged.iter().map(|o| o.label.to_string()).collect();
    assert_eq!(
        labels,
        vec!["fact", "h_006", "h_012", "h_018", "h_024", "h_030", "h_036"]
    );
}

#[tokio::test]
async fn empty_long_range_series_changes_nothing() {
    let long = ControlledLong::new(Ok(Series::new()));
    let sink = Arc::new(RecordingSink::default());

    let engine = RelayEngine::new(
        Box::new(FixedShort(short_series())),
        Box::new(Shared(Arc::clone(&long))),
        Box::new(Shared(Arc::clone(&sink))),
    );
    let merged = engine.run().await.expect("pipeline succeeds");

    assert_eq!(merged, short_series(), "order and values must be untouched");
}

#[tokio::test]
async fn no_delivery_when_extraction_fails() {
    let long = ControlledLong::new(Err(Error::consistency("sources diverged")));
    let sink = Arc::new(RecordingSink::default());

    let engine = RelayEngine::new(
        Box::new(FixedShort(short_series())),
        Box::new(Shared(Arc::clone(&long))),
        Box::new(Shared(Arc::clone(&sink))),
    );
    let err = engine.run().await.expect_err("pipeline must abort");

    assert!(matches!(err, Error::Consistency(_)));
    assert_eq!(
        sink.calls.load(Ordering::SeqCst),
        0,
        "a failed run must never deliver a partial series"
    );
}

#[tokio::test]
async fn duplicate_labels_across_sources_abort_before_delivery() {
    // A long-range series that overlaps the short one must have been
    // deduplicated upstream; if it was not, the merge catches it.
    let mut overlapping = Series::new();
    overlapping.push(Observation::new(Label::Hours(24), -9.0, at(24)));

    let long = ControlledLong::new(Ok(overlapping));
    let sink = Arc::new(RecordingSink::default());

    let engine = RelayEngine::new(
        Box::new(FixedShort(short_series())),
        Box::new(Shared(Arc::clone(&long))),
        Box::new(Shared(Arc::clone(&sink))),
    );
    let err = engine.run().await.expect_err("pipeline must abort");

    assert!(matches!(err, Error::Consistency(_)));
    assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
}
