// ── Reconnect backoff ──
//
// Capped exponential backoff with random jitter, so clients dropped by the
// same server restart do not all come back in the same instant. The RNG is
// supplied by the caller; seed it for reproducible delays.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::retry::duration_ms;

/// Exponential backoff configuration for push stream reconnection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    #[serde(with = "duration_ms")]
    pub initial_delay: Duration,

    /// Upper bound on the un-jittered backoff delay. Default: 30s.
    #[serde(with = "duration_ms")]
    pub max_delay: Duration,

    /// Jitter amplitude as a fraction of the delay (0.25 = +-25%).
    /// `0.0` disables jitter.
    pub jitter: f64,

    /// Maximum consecutive failed attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,

    /// Treat the connection as lost when nothing (not even a heartbeat)
    /// arrives for this long. The service heartbeats every 30s.
    #[serde(default, with = "optional_duration_ms")]
    pub idle_timeout: Option<Duration>,

    /// Fixed jitter seed. `None` seeds from OS entropy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: 0.25,
            max_retries: None,
            idle_timeout: Some(Duration::from_secs(90)),
            seed: None,
        }
    }
}

/// Delay before reconnect attempt `attempt` (1-based).
///
/// `delay = min(initial * 2^(attempt-1), max) * (1 + U(-jitter, +jitter))`
///
/// The RNG is only drawn from when jitter is enabled.
#[allow(
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::as_conversions
)]
pub fn calculate_backoff<R>(attempt: u32, config: &ReconnectConfig, rng: &mut R) -> Duration
where
    R: Rng + ?Sized,
{
    let exponent = attempt.saturating_sub(1).min(32) as i32;
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    let amplitude = config.jitter.clamp(0.0, 1.0);
    let jitter_factor = if amplitude > 0.0 {
        1.0 + rng.gen_range(-amplitude..=amplitude)
    } else {
        1.0
    };
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::try_from_secs_f64(with_jitter).unwrap_or(config.max_delay)
}

mod optional_duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option, clippy::cast_possible_truncation, clippy::as_conversions)]
    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
