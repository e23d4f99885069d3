//! Fetch ordering, auto-retry and streaming through the table controller.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use custom_table_lib::TableConfig;
use custom_table_lib::TableController;
use custom_table_lib::data_source::AutoRetryConfig;
use custom_table_lib::data_source::FetchMode;
use custom_table_lib::data_source::FetchOutcome;
use custom_table_lib::data_source::FetchResponse;
use custom_table_lib::data_source::RequestParams;
use custom_table_lib::data_source::RetryState;
use custom_table_lib::error::RequestError;
use custom_table_lib::error::RequestErrorKind;
use custom_table_lib::model::Record;
use custom_table_lib::model::Value;
use custom_table_lib::plugin::Action;
use custom_table_lib::plugin::RenderArgs;
use custom_table_lib::plugin::RenderNode;
use custom_table_lib::plugin::Slot;
use custom_table_lib::trace::NullSink;
use custom_table_lib::trace::Phase;
use tokio::sync::oneshot;

fn row(id: &str) -> Record {
    Record::new().set("id", id).set("name", id.to_uppercase())
}

fn ids(table: &TableController) -> Vec<String> {
    table
        .state()
        .data()
        .iter()
        .filter_map(|r| r.get("id").map(Value::to_string))
        .collect()
}

type Gates = Arc<Mutex<HashMap<usize, oneshot::Receiver<FetchResponse>>>>;

/// A table whose requests wait until the test releases them, per page.
fn gated_table() -> (TableController, HashMap<usize, oneshot::Sender<FetchResponse>>) {
    let gates = Gates::default();
    let mut senders = HashMap::new();
    for page in [1, 2] {
        let (tx, rx) = oneshot::channel();
        gates.lock().unwrap().insert(page, rx);
        senders.insert(page, tx);
    }

    let table = TableController::builder(move |params: RequestParams| {
        let page = params.current().unwrap_or(1);
        let gate = gates.lock().unwrap().remove(&page);
        async move {
            match gate {
                Some(gate) => gate.await.map_err(|_| RequestError::new("gate dropped")),
                None => Err(RequestError::new(format!("page {page} requested twice"))),
            }
        }
    })
    .config(TableConfig::default().with_manual_request(true))
    .sink(NullSink)
    .build()
    .unwrap();
    (table, senders)
}

#[tokio::test]
async fn test_last_issued_request_wins_when_it_resolves_first() {
    let (table, mut senders) = gated_table();
    table.mount().await;
    let first = senders.remove(&1).unwrap();
    let second = senders.remove(&2).unwrap();

    let (page_one, page_two, ()) = tokio::join!(table.refresh(), table.set_page(2), async {
        let _ = second.send(FetchResponse::page(vec![row("y")], 1));
        tokio::task::yield_now().await;
        let _ = first.send(FetchResponse::page(vec![row("x")], 1));
    });

    assert_eq!(page_one, FetchOutcome::Superseded);
    assert!(matches!(page_two, Some(FetchOutcome::Completed(_))));
    assert_eq!(ids(&table), vec!["y"]);
    assert!(!table.state().loading());
    assert_eq!(table.data_source().stats().superseded, 1);
}

#[tokio::test]
async fn test_last_issued_request_wins_when_it_resolves_last() {
    let (table, mut senders) = gated_table();
    table.mount().await;
    let first = senders.remove(&1).unwrap();
    let second = senders.remove(&2).unwrap();

    let (page_one, page_two, ()) = tokio::join!(table.refresh(), table.set_page(2), async {
        let _ = first.send(FetchResponse::page(vec![row("x")], 1));
        tokio::task::yield_now().await;
        let _ = second.send(FetchResponse::page(vec![row("y")], 1));
    });

    assert_eq!(page_one, FetchOutcome::Superseded);
    assert!(matches!(page_two, Some(FetchOutcome::Completed(_))));
    assert_eq!(ids(&table), vec!["y"]);
}

#[tokio::test]
async fn test_abort_settles_loading() {
    let (table, _senders) = gated_table();
    table.mount().await;

    let (outcome, aborted) = tokio::join!(table.refresh(), async {
        tokio::task::yield_now().await;
        assert!(table.state().loading());
        table.abort()
    });

    assert!(aborted);
    assert_eq!(outcome, FetchOutcome::Aborted);
    assert!(!table.state().loading());
    assert!(!table.abort());
}

/// Fails with 429 on the first call, then serves one row.
fn throttled_once(calls: Arc<AtomicUsize>) -> TableController {
    TableController::builder(move |_params: RequestParams| {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        async move {
            if n == 0 {
                Err(RequestError::http(429, "Too Many Requests"))
            } else {
                Ok::<_, RequestError>(FetchResponse::page(vec![row("a")], 1))
            }
        }
    })
    .config(TableConfig::default().with_auto_retry(AutoRetryConfig::default().delay_ticks(3)))
    .sink(NullSink)
    .with_default_plugins()
    .build()
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_counts_down_then_retries_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let table = throttled_once(calls.clone());

    let (report, during) = tokio::join!(table.mount(), async {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        (
            table.retry_state(),
            table.render(Slot::ErrorState, &RenderArgs::none()),
        )
    });

    let (retry, error_nodes) = during;
    assert!(matches!(
        retry,
        RetryState::Countdown {
            remaining: 2,
            kind: RequestErrorKind::RateLimit,
            attempt: 1,
            ..
        }
    ));
    assert_eq!(error_nodes.len(), 1);
    assert!(error_nodes[0].1.plain_text().contains("Retrying in 2s"));
    assert!(error_nodes[0].1.find_button("Cancel").is_some());

    assert!(matches!(report.fetch, Some(FetchOutcome::Completed(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(table.retry_state(), RetryState::Idle);
    assert!(table.state().error().is_none());
    assert_eq!(ids(&table), vec!["a"]);

    let ticks: Vec<u64> = table
        .collector()
        .entries_for(Phase::Retry)
        .iter()
        .filter(|e| e.message == "auto-retry countdown")
        .filter_map(|e| e.data.as_ref()?.get("remaining")?.as_u64())
        .collect();
    assert_eq!(ticks, vec![3, 2, 1, 0]);
    assert_eq!(table.get_performance_metrics().fetch.auto_retries, 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_countdown_leaves_manual_retry() {
    let calls = Arc::new(AtomicUsize::new(0));
    let table = throttled_once(calls.clone());

    let (report, cancelled) = tokio::join!(table.mount(), async {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        table
            .dispatch(Action::CancelAutoRetry)
            .await
            .map(|_| table.retry_state())
    });

    assert!(matches!(cancelled, Ok(RetryState::Manual { .. })));
    assert!(matches!(report.fetch, Some(FetchOutcome::Failed(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let error_nodes = table.render(Slot::ErrorState, &RenderArgs::none());
    let retry = error_nodes[0].1.find_button("Retry").and_then(RenderNode::action);
    assert_eq!(retry, Some(&Action::Retry));

    let outcome = table.dispatch(Action::Retry).await.unwrap();
    assert!(matches!(outcome, Some(FetchOutcome::Completed(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(table.retry_state(), RetryState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_newer_request_clears_countdown_and_abort_settles_it() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let table = TableController::builder(move |_params: RequestParams| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if n == 0 {
                Err(RequestError::http(429, "Too Many Requests"))
            } else {
                std::future::pending::<Result<FetchResponse, RequestError>>().await
            }
        }
    })
    .sink(NullSink)
    .with_default_plugins()
    .build()
    .unwrap();

    let (report, (refreshed, aborted)) = tokio::join!(table.mount(), async {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(table.retry_state().is_counting_down());
        tokio::join!(table.refresh(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            table.abort()
        })
    });

    assert_eq!(report.fetch, Some(FetchOutcome::Superseded));
    assert_eq!(refreshed, FetchOutcome::Aborted);
    assert!(aborted);
    assert_eq!(table.retry_state(), RetryState::Idle);
    assert!(!table.state().loading());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(table.retry_state(), RetryState::Idle);
    assert!(!table.cancel_auto_retry());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let error_nodes = table.render(Slot::ErrorState, &RenderArgs::none());
    assert!(
        error_nodes
            .iter()
            .all(|(_, node)| !node.plain_text().contains("Retrying"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_loading_while_auto_retry_request_in_flight() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let table = TableController::builder(move |_params: RequestParams| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if n == 0 {
                return Err(RequestError::http(429, "Too Many Requests"));
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok::<_, RequestError>(FetchResponse::page(vec![row("a")], 1))
        }
    })
    .sink(NullSink)
    .with_default_plugins()
    .build()
    .unwrap();

    let (report, (counting_down, retrying)) = tokio::join!(table.mount(), async {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let counting_down = table.state().loading();
        // Countdown ends at 3s; the re-issued request resolves at 3.5s.
        tokio::time::sleep(Duration::from_millis(1700)).await;
        (counting_down, (table.state().loading(), calls.load(Ordering::SeqCst)))
    });

    assert!(!counting_down);
    assert_eq!(retrying, (true, 2));
    assert!(matches!(report.fetch, Some(FetchOutcome::Completed(_))));
    assert!(!table.state().loading());
    assert!(table.state().error().is_none());
    assert_eq!(ids(&table), vec!["a"]);
}

#[tokio::test(start_paused = true)]
async fn test_query_change_cancels_pending_auto_retry() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let table = TableController::builder(move |params: RequestParams| {
        let mut requests = log.lock().unwrap();
        requests.push(params.get("name").cloned());
        let first = requests.len() == 1;
        async move {
            if first {
                Err(RequestError::http(429, "Too Many Requests"))
            } else {
                Ok::<_, RequestError>(FetchResponse::page(vec![row("b")], 1))
            }
        }
    })
    .config(TableConfig::default().with_debounce(Duration::from_secs(5)))
    .sink(NullSink)
    .with_default_plugins()
    .build()
    .unwrap();

    let query = BTreeMap::from([("name".to_string(), Value::from("b"))]);
    let (report, changed) = tokio::join!(table.mount(), async {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        table.merge_query(query).await
    });

    assert!(matches!(report.fetch, Some(FetchOutcome::Failed(_))));
    assert!(matches!(changed, Some(FetchOutcome::Completed(_))));
    assert_eq!(*seen.lock().unwrap(), vec![None, Some(Value::from("b"))]);
    assert_eq!(table.retry_state(), RetryState::Idle);
    assert_eq!(ids(&table), vec!["b"]);
    assert_eq!(table.get_performance_metrics().fetch.auto_retries, 0);
}

#[tokio::test]
async fn test_plain_failure_is_not_retried() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let table = TableController::builder(move |_params: RequestParams| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move { Err::<FetchResponse, RequestError>(RequestError::http(500, "boom")) }
    })
    .sink(NullSink)
    .with_default_plugins()
    .build()
    .unwrap();

    let report = table.mount().await;
    assert!(matches!(report.fetch, Some(FetchOutcome::Failed(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(table.state().error().is_some());
    assert!(!table.state().loading());
    assert!(matches!(table.retry_state(), RetryState::Manual { .. }));
}

fn streaming_table(pages: HashMap<usize, FetchResponse>, config: TableConfig) -> TableController {
    TableController::builder(move |params: RequestParams| {
        let page = params.current().unwrap_or(1);
        let response = pages.get(&page).cloned().unwrap_or_default();
        async move { Ok::<_, RequestError>(response) }
    })
    .config(config.with_mode(FetchMode::Streaming))
    .sink(NullSink)
    .with_default_plugins()
    .build()
    .unwrap()
}

#[tokio::test]
async fn test_load_more_appends_until_exhausted() {
    let table = streaming_table(
        HashMap::from([
            (1, FetchResponse::increment(vec![row("r1"), row("r2")], true)),
            (2, FetchResponse::increment(vec![row("r3")], false)),
        ]),
        TableConfig::default(),
    );
    table.mount().await;
    assert_eq!(ids(&table), vec!["r1", "r2"]);

    let button = table.render(Slot::LoadMoreButton, &RenderArgs::none());
    assert_eq!(button.len(), 1);
    assert!(matches!(
        &button[0].1,
        RenderNode::Button {
            action: Action::LoadMore,
            enabled: true,
            ..
        }
    ));

    let outcome = table.load_more().await;
    assert!(matches!(outcome, Some(FetchOutcome::Completed(_))));
    assert_eq!(ids(&table), vec!["r1", "r2", "r3"]);
    assert!(!table.state().has_more_data());

    assert!(table.render(Slot::LoadMoreButton, &RenderArgs::none()).is_empty());
    let footer = table.render(Slot::Footer, &RenderArgs::none());
    assert!(footer.iter().any(|(_, node)| node.plain_text() == "No more data"));
    assert!(table.load_more().await.is_none());
}

#[tokio::test]
async fn test_need_continue_fetches_following_increments() {
    let table = streaming_table(
        HashMap::from([
            (
                1,
                FetchResponse::increment(vec![row("r1")], true).with_need_continue(true),
            ),
            (
                2,
                FetchResponse::increment(vec![row("r2")], true).with_need_continue(true),
            ),
            (3, FetchResponse::increment(vec![row("r3")], true)),
        ]),
        TableConfig::default(),
    );
    table.mount().await;

    assert_eq!(ids(&table), vec!["r1", "r2", "r3"]);
    assert!(table.state().has_more_data());
    assert_eq!(table.data_source().stats().completed, 3);
}

#[tokio::test]
async fn test_auto_continue_is_bounded() {
    let pages = (1..=10)
        .map(|page| {
            let response = FetchResponse::increment(vec![row(&format!("r{page}"))], true)
                .with_need_continue(true);
            (page, response)
        })
        .collect();
    let table = streaming_table(pages, TableConfig::default().with_max_auto_continue(2));
    table.mount().await;

    assert_eq!(ids(&table), vec!["r1", "r2", "r3"]);
    assert_eq!(table.data_source().stats().completed, 3);
}

#[tokio::test]
async fn test_refresh_restarts_stream() {
    let table = streaming_table(
        HashMap::from([
            (1, FetchResponse::increment(vec![row("r1")], true)),
            (2, FetchResponse::increment(vec![row("r2")], false)),
        ]),
        TableConfig::default(),
    );
    table.mount().await;
    table.load_more().await;
    assert_eq!(ids(&table), vec!["r1", "r2"]);

    table.refresh().await;
    assert_eq!(ids(&table), vec!["r1"]);
    assert_eq!(table.state().current(), 1);
}
