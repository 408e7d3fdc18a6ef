// # Forecast Source Traits
//
// Defines the interfaces for the two upstream forecast feeds.
//
// The short-range source anchors the run: it produces the fact entry
// plus the near-term forecasts. The long-range source extends the
// series further out and takes the short-range output as a consistency
// oracle -- it needs the fact instant to compute forward offsets, and it
// must drop (after checking) every offset the short-range feed already
// covers. That asymmetry is deliberate and is encoded in the trait
// shapes: the pipeline cannot call the long-range source without a
// short-range series in hand.

use async_trait::async_trait;

use crate::error::Result;
use crate::series::Series;

/// Trait for the near-term feed: one fact reading plus the forward
/// slots of the next 24 hours.
#[async_trait]
pub trait ShortRangeSource: Send + Sync {
    /// Fetch and extract the short-range series.
    ///
    /// # Returns
    ///
    /// - `Ok(Series)`: exactly one `fact` entry followed by the
    ///   forecast entries in document order
    /// - `Err(Error)`: fetch, schema or consistency failure (fatal)
    async fn series(&self) -> Result<Series>;
}

/// Trait for the multi-day feed covering offsets beyond the short-range
/// horizon.
#[async_trait]
pub trait LongRangeSource: Send + Sync {
    /// Fetch and extract the long-range series, cross-validated against
    /// the short-range series `check`.
    ///
    /// # Returns
    ///
    /// - `Ok(Series)`: forecast entries only (no fact), every offset at
    ///   least 6 hours ahead and disjoint from the labels in `check`
    /// - `Err(Error)`: fetch, schema or consistency failure (fatal)
    async fn series(&self, check: &Series) -> Result<Series>;
}
