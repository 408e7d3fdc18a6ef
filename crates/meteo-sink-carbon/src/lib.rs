// # Carbon Delivery Channel
//
// This crate delivers a reconciled series to a carbon daemon's TCP
// line receiver.
//
// ## Connection Lifecycle
//
// ```text
// RESOLVING ──► CONNECTING ──► CONNECTED ──► SENDING ──► CLOSED
//     ▲              │
//     └── backoff ◄──┘  (bounded retries, resolution redone from scratch)
// ```
//
// Resolution and connection failures are retryable as one unit: every
// retry resolves the name again, since the address set may have
// changed while we slept. Once a connection is established the channel
// commits -- a failure while sending is fatal and is never retried,
// because the receiving daemon offers no acknowledgment and a blind
// resend could double-count metrics.
//
// ## Wire Format
//
// One ASCII line per observation, `<name> <value> <unix_ts>\n`, where
// `name` is the optional prefix (expected to end with its own
// separator) followed by the observation label. Nothing is read back.

use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::{lookup_host, TcpStream};
use tracing::{debug, info};

use meteo_core::error::{Error, Result};
use meteo_core::retry::RetryPolicy;
use meteo_core::series::{Observation, Series};
use meteo_core::traits::MetricSink;

/// Carbon line-protocol sink with resilient connection establishment.
pub struct CarbonSink {
    host: String,
    port: u16,
    policy: RetryPolicy,
    prefix: String,
}

impl CarbonSink {
    /// Create a new sink.
    ///
    /// # Parameters
    ///
    /// - `host`, `port`: The carbon daemon's TCP line receiver
    /// - `policy`: Resolve+connect retry budget and backoff shape
    /// - `prefix`: Literal prepended to every metric name; pass it with
    ///   its trailing separator (`weather.moscow.`), or empty for none
    pub fn new(host: impl Into<String>, port: u16, policy: RetryPolicy, prefix: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            policy,
            prefix: prefix.into(),
        }
    }

    /// Resolve the destination and connect to the first candidate
    /// address that accepts, in resolution order.
    async fn resolve_and_connect(&self) -> Result<TcpStream> {
        let candidates: Vec<SocketAddr> = lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| Error::resolve(&self.host, e.to_string()))?
            .collect();
        if candidates.is_empty() {
            return Err(Error::resolve(&self.host, "no addresses returned"));
        }

        let mut last_err = None;
        for addr in candidates {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    info!("connected to carbon at {addr}");
                    return Ok(stream);
                }
                Err(e) => {
                    debug!("carbon candidate {addr} failed: {e}");
                    last_err = Some(e);
                }
            }
        }
        // candidates was non-empty, so a connect error was recorded
        Err(last_err
            .map(Error::Network)
            .unwrap_or_else(|| Error::resolve(&self.host, "no addresses returned")))
    }

    /// Run the resolve+connect cycle under the retry policy.
    async fn connect_with_retry(&self) -> Result<TcpStream> {
        let mut remaining = self.policy.max_attempts;
        let mut delay = self.policy.first_delay();
        loop {
            match self.resolve_and_connect().await {
                Ok(stream) => return Ok(stream),
                Err(e) if e.is_retryable() => {
                    if remaining == 0 {
                        return Err(Error::RetriesExhausted {
                            attempts: self.policy.max_attempts + 1,
                            last: e.to_string(),
                        });
                    }
                    remaining -= 1;
                    info!(
                        "carbon connection failed ({e}); retrying in {delay:?}, {remaining} retries left"
                    );
                    tokio::time::sleep(delay).await;
                    delay = self.policy.next_delay(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn line_for(&self, obs: &Observation) -> String {
        format!(
            "{}{} {} {}\n",
            self.prefix,
            obs.label,
            obs.value,
            obs.instant.timestamp()
        )
    }
}

#[async_trait]
impl MetricSink for CarbonSink {
    async fn deliver(&self, series: &Series) -> Result<()> {
        let mut stream = self.connect_with_retry().await?;

        for obs in series {
            let line = self.line_for(obs);
            debug!("sending line: {line:?}");
            stream
                .write_all(line.as_bytes())
                .await
                .map_err(|e| Error::send(e.to_string()))?;
        }
        stream
            .flush()
            .await
            .map_err(|e| Error::send(e.to_string()))?;
        stream
            .shutdown()
            .await
            .map_err(|e| Error::send(e.to_string()))?;
        debug!("carbon connection closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use meteo_core::series::Label;
    use std::time::Instant;
    use tokio::io::AsyncReadExt;

    fn sample_series() -> Series {
        let base = FixedOffset::east_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 10, 9, 0, 0)
            .unwrap();
        let mut series = Series::new();
        series.push(Observation::new(Label::Fact, -7.2, base));
        series.push(Observation::new(
            Label::Hours(6),
            -6.0,
            base + chrono::Duration::hours(6),
        ));
        series
    }

    fn no_retry_policy() -> RetryPolicy {
        RetryPolicy::new(0, 0.0, 0.0, 0.0).unwrap()
    }

    #[tokio::test]
    async fn delivers_line_protocol_in_series_order() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let reader = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = String::new();
            socket.read_to_string(&mut received).await.unwrap();
            received
        });

        let sink = CarbonSink::new(
            addr.ip().to_string(),
            addr.port(),
            no_retry_policy(),
            "weather.city.",
        );
        sink.deliver(&sample_series()).await.unwrap();

        let received = reader.await.unwrap();
        // 2024-01-10T09:00:00+05:00 is 1704859200 unix
        assert_eq!(
            received,
            "weather.city.fact -7.2 1704859200\nweather.city.h_006 -6 1704880800\n"
        );
    }

    #[tokio::test]
    async fn empty_prefix_leaves_bare_labels() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let reader = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = String::new();
            socket.read_to_string(&mut received).await.unwrap();
            received
        });

        let sink = CarbonSink::new(addr.ip().to_string(), addr.port(), no_retry_policy(), "");
        sink.deliver(&sample_series()).await.unwrap();

        assert!(reader.await.unwrap().starts_with("fact -7.2 "));
    }

    #[tokio::test]
    async fn exhausted_budget_is_fatal() {
        // Bind-then-drop guarantees a port nothing is listening on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let policy = RetryPolicy::new(2, 0.0, 0.0, 0.0).unwrap();
        let sink = CarbonSink::new(addr.ip().to_string(), addr.port(), policy, "");
        let err = sink.deliver(&sample_series()).await.unwrap_err();
        match err {
            Error::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected RetriesExhausted, got {other}"),
        }
    }

    #[tokio::test]
    async fn resolution_failure_is_retried_then_fatal() {
        let policy = RetryPolicy::new(1, 0.0, 0.0, 0.0).unwrap();
        let sink = CarbonSink::new("carbon.invalid", 2003, policy, "");
        let err = sink.deliver(&sample_series()).await.unwrap_err();
        assert!(matches!(err, Error::RetriesExhausted { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_sleeps_between_attempts() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        // 3 retries at 1s, 2s, 4s: 7 virtual seconds in total.
        let policy = RetryPolicy::new(3, 1.0, 60.0, 2.0).unwrap();
        let sink = CarbonSink::new(addr.ip().to_string(), addr.port(), policy, "");

        let start = Instant::now();
        let err = sink.deliver(&sample_series()).await.unwrap_err();
        assert!(matches!(err, Error::RetriesExhausted { .. }));
        // Paused time auto-advances, so wall time stays near zero while
        // the virtual clock covered every backoff sleep.
        assert!(start.elapsed().as_secs() < 5);
    }
}
