//! Session and driver configuration, validation, and error types.
//!
//! [`SessionConfig`] is passed explicitly into session construction; there
//! is no process-wide configuration. [`validate()`](SessionConfig::validate)
//! checks structural invariants before anything is allocated.
//!
//! Both config structs derive `serde` traits with per-field defaults so an
//! outer layer can load them from JSON or TOML and omit any field.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected by [`SessionConfig::validate()`] and
/// [`DriverConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// A session needs at least one seat.
    #[error("capacity must be at least 1")]
    ZeroCapacity,
    /// Mailboxes are bounded buffers; a zero bound would make every
    /// enqueue a rendezvous.
    #[error("mailbox_capacity must be at least 1")]
    ZeroMailboxCapacity,
    /// Fan-out stride of zero is meaningless.
    #[error("relay_stride must be at least 1")]
    ZeroRelayStride,
    /// Round time cap must be positive.
    #[error("max_round_secs must be at least 1")]
    ZeroRoundCap,
    /// tick_rate_hz is NaN, infinite, zero, or negative.
    #[error("tick_rate_hz must be finite and positive, got {value}")]
    InvalidTickRate {
        /// The invalid value.
        value: f64,
    },
    /// The driver event channel needs at least one slot.
    #[error("event_buffer must be at least 1")]
    ZeroEventBuffer,
}

// ── SessionConfig ──────────────────────────────────────────────────

/// Complete configuration for constructing a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Physical seat count. Variants may allow fewer occupants. Default: 2.
    pub capacity: usize,
    /// Bound of each seat's mailbox. Overflow is dropped. Default: 1.
    pub mailbox_capacity: usize,
    /// Autonomous participants receive a fresh state every `relay_stride`
    /// ticks. Variants may override. Default: 7.
    pub relay_stride: u64,
    /// How long the caller should hold the session inert after a reset,
    /// in milliseconds. Variants may override. Default: 3000.
    pub reset_pause_ms: u64,
    /// Upper bound on any variant's per-round time budget, in seconds.
    /// Default: 600.
    pub max_round_secs: u64,
    /// Record a trajectory entry for every committed tick. Default: false.
    pub record_trajectory: bool,
    /// Directory handed to policy loaders. Default: none.
    pub agent_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: 2,
            mailbox_capacity: 1,
            relay_stride: 7,
            reset_pause_ms: 3000,
            max_round_secs: 600,
            record_trajectory: false,
            agent_dir: None,
        }
    }
}

impl SessionConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.mailbox_capacity == 0 {
            return Err(ConfigError::ZeroMailboxCapacity);
        }
        if self.relay_stride == 0 {
            return Err(ConfigError::ZeroRelayStride);
        }
        if self.max_round_secs == 0 {
            return Err(ConfigError::ZeroRoundCap);
        }
        Ok(())
    }

    /// Default reset pause as a [`Duration`].
    pub fn reset_pause(&self) -> Duration {
        Duration::from_millis(self.reset_pause_ms)
    }

    /// Round time cap as a [`Duration`].
    pub fn max_round_time(&self) -> Duration {
        Duration::from_secs(self.max_round_secs)
    }
}

// ── DriverConfig ───────────────────────────────────────────────────

/// Configuration for [`SessionDriver`](crate::driver::SessionDriver).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Target tick rate. Default: 30.0.
    pub tick_rate_hz: f64,
    /// Capacity of the driver event channel. Events are dropped when the
    /// consumer falls behind. Default: 64.
    pub event_buffer: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 30.0,
            event_buffer: 64,
        }
    }
}

impl DriverConfig {
    /// Validate the tick rate and event buffer.
    ///
    /// The reciprocal of the tick rate must also be finite; subnormal rates
    /// would otherwise overflow `Duration::from_secs_f64`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let hz = self.tick_rate_hz;
        if !hz.is_finite() || hz <= 0.0 || !(1.0 / hz).is_finite() {
            return Err(ConfigError::InvalidTickRate { value: hz });
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::ZeroEventBuffer);
        }
        Ok(())
    }

    /// Wall-clock budget of one tick.
    pub fn tick_budget(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SessionConfig::default().validate().is_ok());
        assert!(DriverConfig::default().validate().is_ok());
    }

    #[test]
    fn default_stride_and_pause() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.relay_stride, 7);
        assert_eq!(cfg.reset_pause(), Duration::from_millis(3000));
    }

    #[test]
    fn zero_fields_rejected() {
        let cfg = SessionConfig {
            capacity: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroCapacity));

        let cfg = SessionConfig {
            mailbox_capacity: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroMailboxCapacity));

        let cfg = SessionConfig {
            relay_stride: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroRelayStride));

        let cfg = SessionConfig {
            max_round_secs: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroRoundCap));
    }

    #[test]
    fn bad_tick_rates_rejected() {
        for hz in [0.0, -1.0, f64::NAN, f64::INFINITY, f64::MIN_POSITIVE / 4.0] {
            let cfg = DriverConfig {
                tick_rate_hz: hz,
                ..Default::default()
            };
            assert!(
                matches!(cfg.validate(), Err(ConfigError::InvalidTickRate { .. })),
                "tick rate {hz} should be rejected"
            );
        }
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: SessionConfig =
            serde_json::from_str(r#"{ "capacity": 4, "record_trajectory": true }"#).unwrap();
        assert_eq!(cfg.capacity, 4);
        assert!(cfg.record_trajectory);
        assert_eq!(cfg.mailbox_capacity, 1);
        assert_eq!(cfg.reset_pause_ms, 3000);
    }
}
