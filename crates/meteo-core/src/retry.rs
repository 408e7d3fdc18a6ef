//! Connection retry policy
//!
//! The delivery channel retries the whole resolve+connect cycle with
//! bounded exponential backoff. The policy is encoded on the command
//! line as `attempts:min_delay:max_delay:multiplier` (seconds for the
//! delays); a multiplier of 0 degenerates to a constant `min_delay`
//! between attempts.

use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Bounded exponential backoff parameters for the resolve+connect loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// How many retries are allowed after the initial attempt.
    pub max_attempts: u32,
    /// Delay before the first retry, and lower clamp for all delays.
    pub min_delay: Duration,
    /// Upper clamp for all delays.
    pub max_delay: Duration,
    /// Factor applied to the delay after every failed attempt.
    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, min_delay: f64, max_delay: f64, multiplier: f64) -> Result<Self> {
        if !min_delay.is_finite() || !max_delay.is_finite() || min_delay < 0.0 || max_delay < 0.0 {
            return Err(Error::config(format!(
                "retry delays must be finite and non-negative, got {min_delay}:{max_delay}"
            )));
        }
        if min_delay > max_delay {
            return Err(Error::config(format!(
                "retry min delay {min_delay}s exceeds max delay {max_delay}s"
            )));
        }
        if !(multiplier == 0.0 || multiplier >= 1.0) {
            return Err(Error::config(format!(
                "retry multiplier must be 0 or at least 1, got {multiplier}"
            )));
        }
        Ok(Self {
            max_attempts,
            min_delay: Duration::from_secs_f64(min_delay),
            max_delay: Duration::from_secs_f64(max_delay),
            multiplier,
        })
    }

    /// Delay to sleep before the first retry.
    pub fn first_delay(&self) -> Duration {
        self.min_delay
    }

    /// Delay to sleep before the retry after one that slept `current`.
    ///
    /// Multiplies by the backoff factor and clamps into
    /// `[min_delay, max_delay]`; for a multiplier above 1 the result
    /// never decreases and never exceeds `max_delay`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let scaled = current.as_secs_f64() * self.multiplier;
        let clamped = scaled.clamp(self.min_delay.as_secs_f64(), self.max_delay.as_secs_f64());
        Duration::from_secs_f64(clamped)
    }
}

impl FromStr for RetryPolicy {
    type Err = Error;

    /// Parse the `attempts:min_delay:max_delay:multiplier` encoding,
    /// e.g. `100:1:60:2`.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        let &[attempts, min, max, k] = parts.as_slice() else {
            return Err(Error::config(format!(
                "retry policy {s:?} must have four colon-separated fields"
            )));
        };
        let attempts: u32 = attempts
            .parse()
            .map_err(|_| Error::config(format!("bad retry attempt count {attempts:?}")))?;
        let parse_f64 = |field: &str| -> Result<f64> {
            field
                .parse()
                .map_err(|_| Error::config(format!("bad retry policy number {field:?}")))
        };
        Self::new(attempts, parse_f64(min)?, parse_f64(max)?, parse_f64(k)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_cli_encoding() {
        let policy: RetryPolicy = "100:1:60:2".parse().unwrap();
        assert_eq!(policy.max_attempts, 100);
        assert_eq!(policy.min_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(60));
        assert_eq!(policy.multiplier, 2.0);
    }

    #[test]
    fn rejects_malformed_encodings() {
        assert!("1:2:3".parse::<RetryPolicy>().is_err());
        assert!("a:1:60:2".parse::<RetryPolicy>().is_err());
        assert!("1:60:1:2".parse::<RetryPolicy>().is_err()); // min > max
        assert!("1:1:60:0.5".parse::<RetryPolicy>().is_err()); // 0 < k < 1
    }

    #[test]
    fn backoff_is_monotone_and_clamped() {
        let policy = RetryPolicy::new(10, 1.0, 60.0, 2.0).unwrap();
        let mut delay = policy.first_delay();
        let mut previous = delay;
        for _ in 0..10 {
            delay = policy.next_delay(delay);
            assert!(delay >= previous, "backoff must never decrease");
            assert!(delay <= policy.max_delay, "backoff must never exceed the clamp");
            previous = delay;
        }
        assert_eq!(delay, Duration::from_secs(60));
    }

    #[test]
    fn zero_multiplier_degenerates_to_constant_delay() {
        let policy = RetryPolicy::new(3, 5.0, 60.0, 0.0).unwrap();
        let delay = policy.next_delay(policy.first_delay());
        assert_eq!(delay, Duration::from_secs(5));
    }
}
