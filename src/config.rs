//! Validated, immutable configuration for [`AdmissionGate`](crate::AdmissionGate).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Permits per window used by [`GateConfig::default`].
pub const DEFAULT_LIMIT: u32 = 10;
/// Window length used by [`GateConfig::default`].
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);
/// Longest a caller waits for a permit, used by [`GateConfig::default`].
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors produced when validating gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateConfigError {
    /// Limit must be > 0.
    #[error("limit must be > 0 (got {provided})")]
    InvalidLimit {
        /// Value provided by caller.
        provided: u32,
    },
    /// Period must be at least one millisecond and finite.
    #[error("period must be >= 1ms and finite (got {0:?})")]
    InvalidPeriod(Duration),
}

/// Gate configuration: `limit` permits per `period`, callers waiting at most `acquire_timeout`.
///
/// Serialized with millisecond durations:
///
/// ```
/// use windowgate::GateConfig;
/// use std::time::Duration;
///
/// let cfg: GateConfig =
///     serde_json::from_str(r#"{"limit": 3, "period_ms": 250, "acquire_timeout_ms": 0}"#).unwrap();
/// assert_eq!(cfg.limit(), 3);
/// assert_eq!(cfg.period(), Duration::from_millis(250));
/// assert_eq!(cfg.acquire_timeout(), Duration::ZERO);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGateConfig", into = "RawGateConfig")]
pub struct GateConfig {
    limit: u32,
    period: Duration,
    acquire_timeout: Duration,
}

impl GateConfig {
    /// Create a config with validation.
    ///
    /// `limit` must be > 0 and `period` at least one millisecond; any `acquire_timeout`
    /// is accepted, `Duration::ZERO` meaning callers never wait.
    ///
    /// The gate measures windows in whole milliseconds of its clock. Sub-millisecond parts
    /// of `period` are dropped, and because [`MonotonicClock`](crate::MonotonicClock)
    /// truncates its readings, a window can close up to 1 ms of real time before `period`
    /// has fully elapsed.
    pub fn new(
        limit: u32,
        period: Duration,
        acquire_timeout: Duration,
    ) -> Result<Self, GateConfigError> {
        if limit == 0 {
            return Err(GateConfigError::InvalidLimit { provided: limit });
        }
        if period < Duration::from_millis(1) || period == Duration::MAX {
            return Err(GateConfigError::InvalidPeriod(period));
        }
        Ok(Self { limit, period, acquire_timeout })
    }

    /// Custom limit and period with the default acquire timeout.
    pub fn with_period(limit: u32, period: Duration) -> Result<Self, GateConfigError> {
        Self::new(limit, period, DEFAULT_ACQUIRE_TIMEOUT)
    }

    /// Maximum permits granted per window.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Window length.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Longest a caller may wait for a permit.
    pub fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }

    pub(crate) fn period_millis(&self) -> u64 {
        duration_millis(self.period)
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self { limit: DEFAULT_LIMIT, period: DEFAULT_PERIOD, acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT }
    }
}

pub(crate) fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawGateConfig {
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default = "default_period_ms")]
    period_ms: u64,
    #[serde(default = "default_acquire_timeout_ms")]
    acquire_timeout_ms: u64,
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

fn default_period_ms() -> u64 {
    duration_millis(DEFAULT_PERIOD)
}

fn default_acquire_timeout_ms() -> u64 {
    duration_millis(DEFAULT_ACQUIRE_TIMEOUT)
}

impl TryFrom<RawGateConfig> for GateConfig {
    type Error = GateConfigError;

    fn try_from(raw: RawGateConfig) -> Result<Self, Self::Error> {
        GateConfig::new(
            raw.limit,
            Duration::from_millis(raw.period_ms),
            Duration::from_millis(raw.acquire_timeout_ms),
        )
    }
}

impl From<GateConfig> for RawGateConfig {
    fn from(cfg: GateConfig) -> Self {
        Self {
            limit: cfg.limit,
            period_ms: duration_millis(cfg.period),
            acquire_timeout_ms: duration_millis(cfg.acquire_timeout),
        }
    }
}
