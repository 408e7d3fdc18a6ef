// # Metric Sink Trait
//
// Defines the interface for delivering a reconciled series.
//
// The production implementation streams line-protocol records over TCP
// with resilient connection establishment; the `--dry-run` path and the
// pipeline tests substitute their own sinks.

use async_trait::async_trait;

use crate::error::Result;
use crate::series::Series;

/// Trait for delivering a merged observation series.
#[async_trait]
pub trait MetricSink: Send + Sync {
    /// Deliver every observation of `series`, in series order.
    ///
    /// Delivery is all-or-nothing from the caller's point of view: an
    /// implementation may retry internally while establishing its
    /// channel, but once it returns an error the run is over -- nothing
    /// re-invokes it with a half-sent series.
    async fn deliver(&self, series: &Series) -> Result<()>;
}
