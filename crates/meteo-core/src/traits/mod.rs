//! Trait definitions for the relay
//!
//! These traits define the seams between the core pipeline and its
//! pluggable components: document retrieval, the two forecast sources,
//! and the metric sink.

pub mod fetch;
pub mod sink;
pub mod source;

pub use fetch::DocumentFetcher;
pub use sink::MetricSink;
pub use source::{LongRangeSource, ShortRangeSource};
