//! Auto-retry configuration and state.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::error::RequestError;
use crate::error::RequestErrorKind;

/// Configuration for the rate-limit auto-retry countdown.
///
/// Only throttling failures (rate limit, concurrency limit) are retried
/// automatically. The countdown starts at `delay_ticks` and decrements once
/// per `tick`; when it reaches zero the request is re-issued once.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use custom_table_lib::data_source::AutoRetryConfig;
///
/// let config = AutoRetryConfig::default()
///     .delay_ticks(5)
///     .tick(Duration::from_millis(500));
///
/// let manual_only = AutoRetryConfig::disabled();
/// assert!(!manual_only.enabled);
/// # let _ = config;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutoRetryConfig {
    /// Whether throttling failures retry automatically.
    pub enabled: bool,
    /// Countdown start value.
    pub delay_ticks: u32,
    /// Length of one countdown tick.
    pub tick: Duration,
    /// Maximum consecutive automatic retries for one request.
    pub max_auto_retries: u32,
}

impl Default for AutoRetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ticks: 3,
            tick: Duration::from_secs(1),
            max_auto_retries: 3,
        }
    }
}

impl AutoRetryConfig {
    /// A config that never retries automatically.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            max_auto_retries: 0,
            ..Default::default()
        }
    }

    pub fn delay_ticks(mut self, ticks: u32) -> Self {
        self.delay_ticks = ticks;
        self
    }

    pub fn tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn max_auto_retries(mut self, n: u32) -> Self {
        self.max_auto_retries = n;
        self
    }
}

/// Retry affordance exposed to renderers.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RetryState {
    /// Nothing to retry.
    #[default]
    Idle,
    /// Automatic retry pending.
    Countdown {
        remaining: u32,
        kind: RequestErrorKind,
        attempt: u32,
        error: RequestError,
    },
    /// The last request failed; the user may retry manually.
    Manual { error: RequestError },
}

impl RetryState {
    pub fn is_counting_down(&self) -> bool {
        matches!(self, Self::Countdown { .. })
    }

    /// Remaining ticks while counting down.
    pub fn remaining(&self) -> Option<u32> {
        match self {
            Self::Countdown { remaining, .. } => Some(*remaining),
            _ => None,
        }
    }

    /// The failure behind this state, if any.
    pub fn error(&self) -> Option<&RequestError> {
        match self {
            Self::Idle => None,
            Self::Countdown { error, .. } | Self::Manual { error } => Some(error),
        }
    }
}

/// Progress reported by [`run_with_backoff`](super::DataSourceController::run_with_backoff).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackoffEvent<'a> {
    /// An attempt failed and is still the latest request.
    Failed(&'a RequestError),
    /// The countdown elapsed and the request is about to be re-issued.
    Retrying { attempt: u32 },
}

/// How an auto-retry countdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownResult {
    /// Reached zero; the request should be re-issued.
    Elapsed,
    /// Cancelled by the user (or an explicit abort).
    Cancelled,
    /// A newer request was issued while counting down.
    Superseded,
}
