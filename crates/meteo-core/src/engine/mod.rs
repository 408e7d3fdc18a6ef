//! Core relay engine
//!
//! The RelayEngine is responsible for:
//! - Pulling the short-range series from its source
//! - Pulling the long-range series, with the short-range series as
//!   consistency oracle
//! - Merging both into one label-unique series
//! - Handing the merged series to the metric sink
//!
//! ## Data Flow
//!
//! ```text
//! ShortRangeSource ──► short series ─┬─────────────► merge ──► MetricSink
//!                                    │                 ▲
//! LongRangeSource ◄── oracle ────────┘                 │
//!         └─────────► long series (deduplicated) ──────┘
//! ```
//!
//! One run is strictly sequential: fetch short, fetch long, merge,
//! deliver. There is no concurrency to coordinate and no state carried
//! between runs; every run either delivers a complete series or aborts
//! with a fatal error before anything is sent.

use tracing::{debug, info};

use crate::error::Result;
use crate::reconcile;
use crate::series::Series;
use crate::traits::{LongRangeSource, MetricSink, ShortRangeSource};

/// Core relay engine
///
/// The engine orchestrates the extract → reconcile → deliver flow for a
/// single run. It owns its components as trait objects, so tests can
/// substitute controlled sources and sinks.
pub struct RelayEngine {
    /// Near-term feed (fact + next 24h)
    short: Box<dyn ShortRangeSource>,

    /// Multi-day feed (offsets beyond the short-range horizon)
    long: Box<dyn LongRangeSource>,

    /// Destination for the merged series
    sink: Box<dyn MetricSink>,
}

impl RelayEngine {
    pub fn new(
        short: Box<dyn ShortRangeSource>,
        long: Box<dyn LongRangeSource>,
        sink: Box<dyn MetricSink>,
    ) -> Self {
        Self { short, long, sink }
    }

    /// Run the pipeline once.
    ///
    /// # Returns
    ///
    /// - `Ok(Series)`: the merged series, exactly as delivered
    /// - `Err(Error)`: the first fatal failure; nothing was delivered
    ///   unless the error came from the sink itself
    pub async fn run(&self) -> Result<Series> {
        let short = self.short.series().await?;
        info!("short-range series extracted: {} entries", short.len());
        debug!(?short);

        let long = self.long.series(&short).await?;
        info!("long-range series extracted: {} entries", long.len());
        debug!(?long);

        let merged = reconcile::merge(short, long)?;
        info!("merged series spans {} entries", merged.len());

        self.sink.deliver(&merged).await?;
        debug!("delivery finished");
        Ok(merged)
    }
}
