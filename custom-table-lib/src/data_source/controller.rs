//! Request orchestration: ordering, cancellation and auto-retry.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::RequestError;
use crate::state::TableState;
use crate::trace::LogLevel;
use crate::trace::Phase;
use crate::trace::TraceLogCollector;

use super::AutoRetryConfig;
use super::BackoffEvent;
use super::CountdownResult;
use super::FetchResponse;
use super::RequestFn;
use super::RequestParams;
use super::RetryState;

const COMPONENT: &str = "data-source";

/// How the table pages through its source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FetchMode {
    /// One page at a time, replaced on navigation.
    #[default]
    Paginated,
    /// Increments appended to the loaded data.
    Streaming,
}

/// Result of one request run.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The request resolved and is the latest issued.
    Completed(FetchResponse),
    /// The request failed and is the latest issued.
    Failed(RequestError),
    /// A newer request was issued; this result must not be applied.
    Superseded,
    /// The request was aborted before resolving.
    Aborted,
}

impl FetchOutcome {
    /// Returns `true` if the outcome should change table state.
    pub fn is_applicable(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }
}

/// Request counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchStats {
    pub issued: u64,
    pub completed: u64,
    pub failed: u64,
    pub superseded: u64,
    pub aborted: u64,
    pub auto_retries: u64,
    /// Duration of the last settled request, in milliseconds.
    pub last_duration_ms: u64,
    /// Sum of settled request durations, in milliseconds.
    pub total_duration_ms: u64,
}

impl FetchStats {
    /// Mean duration of settled requests, in milliseconds.
    pub fn average_duration_ms(&self) -> f64 {
        let settled = self.completed + self.failed;
        if settled == 0 {
            0.0
        } else {
            self.total_duration_ms as f64 / settled as f64
        }
    }
}

struct InFlight {
    generation: u64,
    token: CancellationToken,
}

/// Issues requests through the host's [`RequestFn`].
///
/// At most one request is in flight: issuing a new one cancels the previous
/// one, and results are applied in issuance order. A result belonging to an
/// older generation is reported as [`FetchOutcome::Superseded`] no matter
/// when it resolves.
///
/// Throttling failures start a countdown (see [`AutoRetryConfig`]) after
/// which the same parameters are re-issued; the countdown can be cancelled,
/// leaving a manual retry affordance.
pub struct DataSourceController {
    request: Arc<dyn RequestFn>,
    mode: FetchMode,
    retry_config: AutoRetryConfig,
    generation: AtomicU64,
    in_flight: Mutex<Option<InFlight>>,
    countdown: Mutex<Option<CancellationToken>>,
    retry_state: RwLock<RetryState>,
    last_params: Mutex<Option<RequestParams>>,
    stats: Mutex<FetchStats>,
    collector: TraceLogCollector,
}

impl DataSourceController {
    pub fn new(
        request: Arc<dyn RequestFn>,
        mode: FetchMode,
        retry_config: AutoRetryConfig,
        collector: TraceLogCollector,
    ) -> Self {
        Self {
            request,
            mode,
            retry_config,
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
            countdown: Mutex::new(None),
            retry_state: RwLock::new(RetryState::Idle),
            last_params: Mutex::new(None),
            stats: Mutex::new(FetchStats::default()),
            collector,
        }
    }

    pub fn mode(&self) -> FetchMode {
        self.mode
    }

    pub fn retry_config(&self) -> &AutoRetryConfig {
        &self.retry_config
    }

    /// Generation of the most recently issued request.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Whether a request is currently in flight.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    pub fn retry_state(&self) -> RetryState {
        self.retry_state
            .read()
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    /// Parameters of the most recent request, used by manual retry.
    pub fn last_params(&self) -> Option<RequestParams> {
        self.last_params.lock().ok().and_then(|p| p.clone())
    }

    pub fn stats(&self) -> FetchStats {
        self.stats
            .lock()
            .map(|stats| stats.clone())
            .unwrap_or_default()
    }

    /// Parameters for the next streaming increment, or `None` when the
    /// source reported no more data.
    pub fn next_increment_params(&self, state: &TableState) -> Option<RequestParams> {
        if !state.has_more_data() {
            return None;
        }
        Some(RequestParams::for_page(state, state.current() + 1))
    }

    /// Issues one request, superseding any request in flight.
    pub async fn run(&self, params: RequestParams) -> FetchOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();

        if let Ok(mut slot) = self.in_flight.lock() {
            let previous = slot.replace(InFlight {
                generation,
                token: token.clone(),
            });
            if let Some(previous) = previous {
                previous.token.cancel();
                self.collector.debug(
                    Phase::Fetch,
                    COMPONENT,
                    format!("request #{} superseded by #{generation}", previous.generation),
                );
            }
        }
        if self.cancel_countdown_token() {
            self.set_retry_state(RetryState::Idle);
        }
        if let Ok(mut last) = self.last_params.lock() {
            *last = Some(params.clone());
        }
        self.bump(|stats| stats.issued += 1);

        self.collector.record_data(
            LogLevel::Debug,
            Phase::Fetch,
            COMPONENT,
            format!("request #{generation} issued"),
            serde_json::to_value(&params).unwrap_or_default(),
        );

        let started = Instant::now();
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = self.request.request(params) => Some(result),
        };
        let elapsed = started.elapsed();

        if let Ok(mut slot) = self.in_flight.lock() {
            if slot.as_ref().is_some_and(|f| f.generation == generation) {
                *slot = None;
            }
        }

        let latest = self.generation() == generation;
        match result {
            None if latest => {
                self.bump(|stats| stats.aborted += 1);
                self.collector
                    .info(Phase::Fetch, COMPONENT, format!("request #{generation} aborted"));
                FetchOutcome::Aborted
            }
            None => {
                self.bump(|stats| stats.superseded += 1);
                FetchOutcome::Superseded
            }
            Some(_) if !latest => {
                self.bump(|stats| stats.superseded += 1);
                self.collector.debug(
                    Phase::Fetch,
                    COMPONENT,
                    format!("discarding late result of request #{generation}"),
                );
                FetchOutcome::Superseded
            }
            Some(Ok(response)) => {
                let millis = elapsed.as_millis() as u64;
                self.bump(|stats| {
                    stats.completed += 1;
                    stats.last_duration_ms = millis;
                    stats.total_duration_ms += millis;
                });
                self.set_retry_state(RetryState::Idle);
                self.collector.record_data(
                    LogLevel::Info,
                    Phase::Fetch,
                    COMPONENT,
                    format!("request #{generation} completed"),
                    serde_json::json!({
                        "rows": response.data.len(),
                        "total": response.total,
                        "hasMoreData": response.has_more_data,
                        "durationMs": millis,
                    }),
                );
                FetchOutcome::Completed(response)
            }
            Some(Err(error)) => {
                let millis = elapsed.as_millis() as u64;
                self.bump(|stats| {
                    stats.failed += 1;
                    stats.last_duration_ms = millis;
                    stats.total_duration_ms += millis;
                });
                self.collector.record_data(
                    LogLevel::Error,
                    Phase::Fetch,
                    COMPONENT,
                    format!("request #{generation} failed"),
                    serde_json::json!({
                        "kind": error.kind.as_str(),
                        "status": error.status,
                        "message": error.message,
                    }),
                );
                FetchOutcome::Failed(error)
            }
        }
    }

    /// Issues a request and retries throttling failures after a countdown.
    ///
    /// `on_event` sees every failed attempt that is still the latest request,
    /// before any countdown starts, and every automatic re-issue right before
    /// it goes out.
    pub async fn run_with_backoff<F>(&self, params: RequestParams, on_event: F) -> FetchOutcome
    where
        F: Fn(BackoffEvent<'_>) + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            let outcome = self.run(params.clone()).await;
            let FetchOutcome::Failed(error) = &outcome else {
                return outcome;
            };
            on_event(BackoffEvent::Failed(error));

            let can_retry = self.retry_config.enabled
                && error.is_throttled()
                && attempt < self.retry_config.max_auto_retries;
            if !can_retry {
                if error.is_throttled() && self.retry_config.enabled {
                    self.collector.warn(
                        Phase::Retry,
                        COMPONENT,
                        format!("giving up after {attempt} automatic retries"),
                    );
                }
                self.set_retry_state(RetryState::Manual {
                    error: error.clone(),
                });
                return outcome;
            }

            attempt += 1;
            match self.countdown(error, attempt).await {
                CountdownResult::Elapsed => {
                    self.bump(|stats| stats.auto_retries += 1);
                    self.collector.info(
                        Phase::Retry,
                        COMPONENT,
                        format!("auto-retry attempt {attempt}"),
                    );
                    on_event(BackoffEvent::Retrying { attempt });
                }
                CountdownResult::Cancelled => return outcome,
                CountdownResult::Superseded => return FetchOutcome::Superseded,
            }
        }
    }

    /// Counts down from `delay_ticks` to zero, one tick per interval.
    ///
    /// Every value (including zero) is published as
    /// [`RetryState::Countdown`] and logged.
    pub async fn countdown(&self, error: &RequestError, attempt: u32) -> CountdownResult {
        let token = CancellationToken::new();
        if let Ok(mut slot) = self.countdown.lock() {
            if let Some(previous) = slot.replace(token.clone()) {
                previous.cancel();
            }
        }
        let generation = self.generation();
        let mut remaining = self.retry_config.delay_ticks;

        loop {
            self.set_retry_state(RetryState::Countdown {
                remaining,
                kind: error.kind,
                attempt,
                error: error.clone(),
            });
            self.collector.record_data(
                LogLevel::Debug,
                Phase::Retry,
                COMPONENT,
                "auto-retry countdown",
                serde_json::json!({ "remaining": remaining, "attempt": attempt }),
            );
            if remaining == 0 {
                break;
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    return if self.generation() != generation {
                        CountdownResult::Superseded
                    } else {
                        CountdownResult::Cancelled
                    };
                }
                _ = tokio::time::sleep(self.retry_config.tick) => {}
            }
            remaining -= 1;
        }

        if let Ok(mut slot) = self.countdown.lock() {
            *slot = None;
        }
        CountdownResult::Elapsed
    }

    /// Stops a running countdown and leaves a manual retry affordance.
    ///
    /// Returns `false` if no countdown was running.
    pub fn cancel_auto_retry(&self) -> bool {
        let state = self.retry_state();
        let RetryState::Countdown { error, .. } = state else {
            return false;
        };
        self.cancel_countdown_token();
        self.set_retry_state(RetryState::Manual { error });
        self.collector
            .info(Phase::Retry, COMPONENT, "auto-retry cancelled");
        true
    }

    /// Cancels the in-flight request and any countdown.
    ///
    /// Returns `true` if something was cancelled. Idempotent.
    pub fn abort(&self) -> bool {
        let request = self
            .in_flight
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .map(|flight| flight.token.cancel())
            .is_some();
        let counting_down = self.retry_state().is_counting_down();
        let countdown = self.cancel_countdown_token() || counting_down;
        if countdown {
            self.set_retry_state(RetryState::Idle);
        }
        if request || countdown {
            self.collector.info(Phase::Fetch, COMPONENT, "aborted");
        }
        request || countdown
    }

    fn cancel_countdown_token(&self) -> bool {
        self.countdown
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .map(|token| token.cancel())
            .is_some()
    }

    fn set_retry_state(&self, state: RetryState) {
        if let Ok(mut guard) = self.retry_state.write() {
            *guard = state;
        }
    }

    fn bump(&self, f: impl FnOnce(&mut FetchStats)) {
        if let Ok(mut stats) = self.stats.lock() {
            f(&mut stats);
        }
    }
}

impl std::fmt::Debug for DataSourceController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSourceController")
            .field("mode", &self.mode)
            .field("generation", &self.generation())
            .field("retry_state", &self.retry_state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;
    use crate::error::RequestErrorKind;
    use crate::model::Record;
    use crate::trace::NullSink;

    fn controller(request: impl RequestFn + 'static) -> DataSourceController {
        DataSourceController::new(
            Arc::new(request),
            FetchMode::Paginated,
            AutoRetryConfig::default(),
            TraceLogCollector::with_sink(NullSink),
        )
    }

    #[tokio::test]
    async fn test_run_completes() {
        let source = controller(|_params: RequestParams| async move {
            Ok::<_, RequestError>(FetchResponse::page(vec![Record::new().set("id", 1)], 1))
        });
        let outcome = source.run(RequestParams::new()).await;
        assert!(matches!(outcome, FetchOutcome::Completed(ref r) if r.data.len() == 1));
        assert_eq!(source.stats().completed, 1);
        assert!(!source.is_in_flight());
    }

    #[tokio::test]
    async fn test_plain_failure_is_manual() {
        let source = controller(|_params: RequestParams| async move {
            Err::<FetchResponse, RequestError>(RequestError::new("boom"))
        });
        let outcome = source.run_with_backoff(RequestParams::new(), |_| {}).await;
        assert!(matches!(outcome, FetchOutcome::Failed(_)));
        assert!(matches!(source.retry_state(), RetryState::Manual { .. }));
        assert_eq!(source.stats().auto_retries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_failure_retries_then_succeeds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let source = controller(move |_params: RequestParams| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(RequestError::http(429, "Too Many Requests"))
                } else {
                    Ok::<_, RequestError>(FetchResponse::page(Vec::new(), 0))
                }
            }
        });

        let failures = AtomicUsize::new(0);
        let retries = AtomicUsize::new(0);
        let outcome = source
            .run_with_backoff(RequestParams::new(), |event| match event {
                BackoffEvent::Failed(error) => {
                    assert_eq!(error.kind, RequestErrorKind::RateLimit);
                    failures.fetch_add(1, Ordering::SeqCst);
                }
                BackoffEvent::Retrying { attempt } => {
                    assert_eq!(attempt, 1);
                    retries.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await;

        assert!(matches!(outcome, FetchOutcome::Completed(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
        assert_eq!(retries.load(Ordering::SeqCst), 1);
        assert_eq!(source.retry_state(), RetryState::Idle);
        assert_eq!(source.stats().auto_retries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_exhausted() {
        let source = DataSourceController::new(
            Arc::new(|_params: RequestParams| async move {
                Err::<FetchResponse, RequestError>(RequestError::new("concurrency limit exceeded"))
            }),
            FetchMode::Paginated,
            AutoRetryConfig::default()
                .max_auto_retries(2)
                .tick(Duration::from_millis(10)),
            TraceLogCollector::with_sink(NullSink),
        );
        let outcome = source.run_with_backoff(RequestParams::new(), |_| {}).await;
        assert!(matches!(outcome, FetchOutcome::Failed(_)));
        assert_eq!(source.stats().issued, 3);
        assert!(matches!(source.retry_state(), RetryState::Manual { .. }));
    }

    #[tokio::test]
    async fn test_abort_is_idempotent() {
        let source = controller(|_params: RequestParams| async move {
            Ok::<_, RequestError>(FetchResponse::page(Vec::new(), 0))
        });
        assert!(!source.abort());
        assert!(!source.abort());
    }

    #[test]
    fn test_next_increment_params() {
        use crate::state::{Command, reduce};

        let source = controller(|_params: RequestParams| async move {
            Ok::<_, RequestError>(FetchResponse::page(Vec::new(), 0))
        });
        let state = TableState::new(5);
        assert!(source.next_increment_params(&state).is_none());

        let state = reduce(
            state,
            Command::StreamLoaded {
                data: Vec::new(),
                total: None,
                has_more: true,
                append: false,
                page: 1,
            },
        );
        let params = source.next_increment_params(&state).unwrap();
        assert_eq!(params.current(), Some(2));
    }
}
