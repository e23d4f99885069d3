//! Row selection behavior: caps, derived counters and batch actions.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use custom_table_lib::error::BatchActionError;
use custom_table_lib::model::Record;
use custom_table_lib::model::RowKey;
use custom_table_lib::selection::BatchAction;
use custom_table_lib::selection::BatchInvocation;
use custom_table_lib::selection::RowSelectionEngine;
use custom_table_lib::selection::SelectionConfig;
use custom_table_lib::selection::SelectionMode;
use custom_table_lib::selection::SelectionStat;
use custom_table_lib::trace::LogLevel;
use custom_table_lib::trace::NullSink;
use custom_table_lib::trace::Phase;
use custom_table_lib::trace::TraceLogCollector;

fn rows(keys: &[&str]) -> Vec<Record> {
    keys.iter()
        .map(|key| Record::new().set("id", *key).set("name", key.to_uppercase()))
        .collect()
}

fn engine(config: SelectionConfig) -> (RowSelectionEngine, TraceLogCollector) {
    let collector = TraceLogCollector::with_sink(NullSink);
    (RowSelectionEngine::new(config, collector.clone()), collector)
}

fn key(k: &str) -> RowKey {
    RowKey::from(k)
}

#[test]
fn test_select_past_cap_is_refused_with_warning() {
    let (engine, collector) = engine(SelectionConfig::default().with_max_selection(2));
    engine.sync_page(&rows(&["a", "b", "c"]), 3);

    assert!(engine.select_row(&key("a"), true));
    assert!(engine.select_row(&key("b"), true));
    assert!(!engine.select_row(&key("c"), true));

    assert_eq!(engine.selected_keys(), vec![key("a"), key("b")]);
    let warnings: Vec<_> = collector
        .entries_for(Phase::Selection)
        .into_iter()
        .filter(|e| e.level == LogLevel::Warn)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].message, "max selection reached");
}

#[test]
fn test_cap_holds_for_mixed_operations() {
    let keys: Vec<String> = (0..12).map(|i| format!("k{i}")).collect();
    let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();

    let modes = [SelectionMode::Multi, SelectionMode::Single];
    for (mode, max) in modes.into_iter().flat_map(|m| (0..5).map(move |max| (m, max))) {
        let (engine, _) = engine(
            SelectionConfig::default()
                .with_mode(mode)
                .with_max_selection(max),
        );
        engine.sync_page(&rows(&key_refs), keys.len());

        // Deterministic pseudo-random walk over select/deselect/select-all.
        let mut seed: u32 = 7 + max as u32;
        for _ in 0..200 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let pick = (seed >> 16) as usize;
            match pick % 5 {
                0 => {
                    engine.select_all(true);
                }
                1 => {
                    engine.select_all(false);
                }
                2 | 3 => {
                    engine.select_row(&key(&keys[pick % keys.len()]), true);
                }
                _ => {
                    engine.select_row(&key(&keys[pick % keys.len()]), false);
                }
            }
            assert!(engine.selected_keys().len() <= max, "{mode:?} with cap {max}");
        }
    }
}

#[test]
fn test_single_mode_respects_zero_cap() {
    let (engine, collector) = engine(
        SelectionConfig::default()
            .with_mode(SelectionMode::Single)
            .with_max_selection(0),
    );
    engine.sync_page(&rows(&["a", "b"]), 2);

    assert!(!engine.select_row(&key("a"), true));
    assert!(engine.selected_keys().is_empty());
    assert!(
        collector
            .entries()
            .iter()
            .any(|e| e.level == LogLevel::Warn && e.message == "max selection reached")
    );
}

#[test]
fn test_single_mode_replaces_under_cap_of_one() {
    let (engine, _) = engine(
        SelectionConfig::default()
            .with_mode(SelectionMode::Single)
            .with_max_selection(1),
    );
    engine.sync_page(&rows(&["a", "b"]), 2);

    assert!(engine.select_row(&key("a"), true));
    assert!(engine.select_row(&key("b"), true));
    assert_eq!(engine.selected_keys(), vec![key("b")]);
}

#[test]
fn test_select_all_truncates_in_page_order() {
    let (engine, collector) = engine(SelectionConfig::default().with_max_selection(2));
    engine.sync_page(&rows(&["a", "b", "c", "d"]), 4);

    assert_eq!(engine.select_all(true), 2);
    assert_eq!(engine.selected_keys(), vec![key("a"), key("b")]);
    assert!(!engine.is_page_selected());
    assert!(
        collector
            .entries()
            .iter()
            .any(|e| e.message == "select all truncated by max selection")
    );
}

#[test]
fn test_stat_percent_matches_rounding() {
    for (selected, total) in [(0, 0), (1, 3), (2, 3), (1, 8), (5, 5), (3, 0)] {
        let stat = SelectionStat::new(selected, total, 0);
        let expected = if total > 0 {
            (selected as f64 / total as f64 * 100.0).round() as u32
        } else {
            0
        };
        assert_eq!(stat.selected_percent, expected, "{selected}/{total}");
    }

    let (engine, _) = engine(SelectionConfig::default());
    engine.sync_page(&rows(&["a", "b", "c"]), 3);
    engine.select_row(&key("b"), true);
    let stat = engine.stat();
    assert_eq!(stat.selected_count, 1);
    assert_eq!(stat.current_page_count, 3);
    assert_eq!(stat.selected_percent, 33);
}

#[test]
fn test_cross_page_keeps_rows_from_earlier_pages() {
    let (engine, _) = engine(SelectionConfig::default().with_cross_page(true));
    engine.sync_page(&rows(&["a", "b"]), 4);
    engine.select_row(&key("a"), true);

    engine.sync_page(&rows(&["c", "d"]), 4);
    engine.select_row(&key("d"), true);

    assert_eq!(engine.all_selected_keys(), Some(vec![key("a"), key("d")]));
    let names: Vec<String> = engine
        .selected_rows()
        .iter()
        .filter_map(|r| r.get("name").map(|v| v.to_string()))
        .collect();
    assert_eq!(names, vec!["A", "D"]);
}

#[tokio::test]
async fn test_batch_action_runs_and_clears_selection() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let config = SelectionConfig::default().with_batch_action(BatchAction::new(
        "archive",
        "Archive",
        move |invocation: BatchInvocation| {
            counter.fetch_add(invocation.keys.len(), Ordering::SeqCst);
            async move { Ok::<_, String>(()) }
        },
    ));
    let (engine, _) = engine(config);
    engine.sync_page(&rows(&["a", "b", "c"]), 3);
    engine.select_all(true);

    engine.execute_batch_action("archive").await.unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 3);
    assert!(engine.selected_keys().is_empty());
}

#[tokio::test]
async fn test_batch_action_failure_reaches_caller() {
    let config = SelectionConfig::default().with_batch_action(BatchAction::new(
        "delete",
        "Delete",
        |_invocation: BatchInvocation| async move { Err::<(), String>("backend refused".to_string()) },
    ));
    let (engine, collector) = engine(config);
    engine.sync_page(&rows(&["a"]), 1);
    engine.select_row(&key("a"), true);

    let error = engine.execute_batch_action("delete").await.unwrap_err();
    assert!(error.is_handler_failure());
    assert_eq!(error.action(), "delete");
    // The selection survives a failed action.
    assert_eq!(engine.selected_keys(), vec![key("a")]);
    assert!(
        collector
            .entries_for(Phase::BatchAction)
            .iter()
            .any(|e| e.level == LogLevel::Error)
    );
}

#[tokio::test]
async fn test_batch_action_gates() {
    let ran = Arc::new(AtomicUsize::new(0));
    let counter = ran.clone();
    let config = SelectionConfig::default()
        .with_batch_action(
            BatchAction::new("export", "Export", move |_invocation: BatchInvocation| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, String>(()) }
            })
            .with_permission("rows:export")
            .with_min_selection(2),
        )
        .with_permission_checker(|permission: &str| permission == "rows:export");
    let (engine, _) = engine(config);
    engine.sync_page(&rows(&["a", "b"]), 2);
    engine.select_row(&key("a"), true);

    let error = engine.execute_batch_action("export").await.unwrap_err();
    assert_eq!(
        error,
        BatchActionError::BelowMinimum {
            action: "export".to_string(),
            required: 2,
            selected: 1,
        }
    );

    let error = engine.execute_batch_action("missing").await.unwrap_err();
    assert!(matches!(error, BatchActionError::NotFound { .. }));

    engine.select_row(&key("b"), true);
    engine.execute_batch_action("export").await.unwrap();
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_batch_action_permission_denied() {
    let config = SelectionConfig::default()
        .with_batch_action(
            BatchAction::new("purge", "Purge", |_invocation: BatchInvocation| async move {
                Ok::<_, String>(())
            })
            .with_permission("rows:purge"),
        )
        .with_permission_checker(|_permission: &str| false);
    let (engine, _) = engine(config);
    engine.sync_page(&rows(&["a"]), 1);
    engine.select_row(&key("a"), true);

    let error = engine.execute_batch_action("purge").await.unwrap_err();
    assert!(matches!(error, BatchActionError::PermissionDenied { .. }));
}
