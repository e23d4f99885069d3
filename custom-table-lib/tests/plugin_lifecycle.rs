//! Plugin lifecycle ordering and fault isolation.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use custom_table_lib::TableConfig;
use custom_table_lib::TableController;
use custom_table_lib::data_source::FetchResponse;
use custom_table_lib::data_source::RequestParams;
use custom_table_lib::error::PluginError;
use custom_table_lib::error::RequestError;
use custom_table_lib::model::Record;
use custom_table_lib::plugin::Action;
use custom_table_lib::plugin::LifecycleHook;
use custom_table_lib::plugin::LifecycleStage;
use custom_table_lib::plugin::Plugin;
use custom_table_lib::plugin::PluginContext;
use custom_table_lib::plugin::PluginId;
use custom_table_lib::plugin::RenderArgs;
use custom_table_lib::plugin::RenderNode;
use custom_table_lib::plugin::Slot;
use custom_table_lib::trace::NullSink;

type Journal = Arc<Mutex<Vec<String>>>;

/// Records every hook and render call it receives.
struct Recorder {
    name: &'static str,
    priority: i32,
    journal: Journal,
    fail_install: bool,
    panic_render: bool,
}

impl Recorder {
    fn new(name: &'static str, journal: &Journal) -> Self {
        Self {
            name,
            priority: 0,
            journal: journal.clone(),
            fail_install: false,
            panic_render: false,
        }
    }

    fn log(&self, event: &str) {
        self.journal
            .lock()
            .unwrap()
            .push(format!("{}:{event}", self.name));
    }
}

#[async_trait]
impl Plugin for Recorder {
    fn id(&self) -> PluginId {
        PluginId::custom(self.name)
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn install(&self, _cx: &PluginContext) -> Result<(), String> {
        self.log("install");
        if self.fail_install {
            return Err("missing dependency".to_string());
        }
        Ok(())
    }

    async fn activate(&self, _cx: &PluginContext) -> Result<(), String> {
        tokio::task::yield_now().await;
        self.log("activate");
        Ok(())
    }

    async fn deactivate(&self, _cx: &PluginContext) -> Result<(), String> {
        self.log("deactivate");
        Ok(())
    }

    async fn uninstall(&self, _cx: &PluginContext) -> Result<(), String> {
        self.log("uninstall");
        Ok(())
    }

    fn header(&self, _cx: &PluginContext) -> Option<RenderNode> {
        if self.panic_render {
            panic!("render exploded");
        }
        self.log("render");
        Some(RenderNode::text(self.name))
    }
}

fn table(plugins: Vec<Recorder>) -> TableController {
    let mut builder = TableController::builder(|_params: RequestParams| async move {
        Ok::<_, RequestError>(FetchResponse::page(Vec::new(), 0))
    })
    .config(TableConfig::default().with_manual_request(true))
    .sink(NullSink);
    for plugin in plugins {
        builder = builder.plugin(plugin);
    }
    builder.build().unwrap()
}

fn events(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

#[tokio::test]
async fn test_render_only_between_activate_and_deactivate() {
    let journal = Journal::default();
    let table = table(vec![Recorder::new("recorder", &journal)]);
    let id = PluginId::custom("recorder");

    // Registered but not active: nothing renders.
    assert!(table.render(Slot::Header, &RenderArgs::none()).is_empty());

    table.mount().await;
    assert_eq!(table.plugins().stage(&id), Some(LifecycleStage::Active));
    assert_eq!(table.render(Slot::Header, &RenderArgs::none()).len(), 1);

    table
        .plugins()
        .deactivate(&id, &table.context())
        .await
        .unwrap();
    assert!(table.render(Slot::Header, &RenderArgs::none()).is_empty());
    assert_eq!(
        table.render_plugin(&id, Slot::Header, &RenderArgs::none()).unwrap(),
        None
    );

    assert_eq!(
        events(&journal),
        vec![
            "recorder:install",
            "recorder:activate",
            "recorder:render",
            "recorder:deactivate"
        ]
    );
}

#[tokio::test]
async fn test_failing_plugin_does_not_block_others() {
    let journal = Journal::default();
    let mut broken = Recorder::new("broken", &journal);
    broken.fail_install = true;
    let table = table(vec![broken, Recorder::new("healthy", &journal)]);

    let report = table.mount().await;
    assert!(!report.is_ok());
    assert_eq!(report.install.succeeded, vec![PluginId::custom("healthy")]);
    assert!(matches!(
        &report.install.failures[..],
        [PluginError::Lifecycle {
            hook: LifecycleHook::Install,
            message,
            ..
        }] if message == "missing dependency"
    ));
    // The broken plugin never got past registration, so it cannot activate.
    assert_eq!(report.activate.failures.len(), 1);
    assert_eq!(
        table.plugins().stage(&PluginId::custom("broken")),
        Some(LifecycleStage::Registered)
    );

    let rendered = table.render(Slot::Header, &RenderArgs::none());
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0].0, PluginId::custom("healthy"));
}

#[tokio::test]
async fn test_uninstall_deactivates_active_plugin_first() {
    let journal = Journal::default();
    let table = table(vec![Recorder::new("recorder", &journal)]);
    let id = PluginId::custom("recorder");
    table.mount().await;

    assert!(table.plugins().uninstall(&id, &table.context()).await.unwrap());
    assert_eq!(table.plugins().stage(&id), Some(LifecycleStage::Uninstalled));
    assert_eq!(
        events(&journal)[2..].to_vec(),
        vec!["recorder:deactivate", "recorder:uninstall"]
    );

    // Already uninstalled: a no-op.
    assert!(!table.plugins().uninstall(&id, &table.context()).await.unwrap());
}

#[tokio::test]
async fn test_teardown_runs_in_reverse_order() {
    let journal = Journal::default();
    let table = table(vec![Recorder::new("a", &journal), Recorder::new("b", &journal)]);
    table.mount().await;
    journal.lock().unwrap().clear();

    let report = table.unmount().await;
    assert!(report.deactivate.is_ok());
    assert_eq!(
        events(&journal),
        vec!["b:deactivate", "a:deactivate", "b:uninstall", "a:uninstall"]
    );
}

#[tokio::test]
async fn test_slot_order_follows_priority_then_registration() {
    let journal = Journal::default();
    let mut late = Recorder::new("late", &journal);
    late.priority = 50;
    let mut early = Recorder::new("early", &journal);
    early.priority = -1;
    let table = table(vec![
        late,
        Recorder::new("first", &journal),
        early,
        Recorder::new("second", &journal),
    ]);
    table.mount().await;

    let order: Vec<PluginId> = table
        .render(Slot::Header, &RenderArgs::none())
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    assert_eq!(
        order,
        vec![
            PluginId::custom("early"),
            PluginId::custom("first"),
            PluginId::custom("second"),
            PluginId::custom("late"),
        ]
    );
}

#[tokio::test]
async fn test_render_panic_is_contained() {
    let journal = Journal::default();
    let mut faulty = Recorder::new("faulty", &journal);
    faulty.panic_render = true;
    let table = table(vec![faulty, Recorder::new("healthy", &journal)]);
    table.mount().await;

    let rendered = table.render(Slot::Header, &RenderArgs::none());
    assert_eq!(rendered.len(), 1);
    assert_eq!(table.get_performance_metrics().plugins.lifecycle_failures, 1);
    assert!(
        table
            .collector()
            .entries()
            .iter()
            .any(|e| e.message.contains("render exploded"))
    );
}

#[tokio::test]
async fn test_lifecycle_calls_are_serialized_per_plugin() {
    let journal = Journal::default();
    let table = table(vec![Recorder::new("recorder", &journal)]);
    let id = PluginId::custom("recorder");
    let cx = table.context();
    table.plugins().install(&id, &cx).await.unwrap();

    let (a, b) = tokio::join!(
        table.plugins().activate(&id, &cx),
        table.plugins().activate(&id, &cx)
    );
    // Exactly one of the concurrent calls ran the hook.
    assert_eq!([a.unwrap(), b.unwrap()].iter().filter(|ran| **ran).count(), 1);
    assert_eq!(
        events(&journal)
            .iter()
            .filter(|e| e.as_str() == "recorder:activate")
            .count(),
        1
    );
}

/// Selects the first loaded row whenever the table is refreshed.
struct FirstRowPicker;

#[async_trait]
impl Plugin for FirstRowPicker {
    fn id(&self) -> PluginId {
        PluginId::custom("first-row-picker")
    }

    fn on_action(&self, action: &Action, cx: &PluginContext) {
        if *action != Action::Refresh {
            return;
        }
        if let Some(key) = cx.state().data().first().and_then(|row| row.key("id")) {
            cx.helpers().select_row(&key, true);
        }
    }
}

#[tokio::test]
async fn test_selection_through_helpers_updates_extension() {
    let table = TableController::builder(|_params: RequestParams| async move {
        let rows = vec![Record::new().set("id", "a"), Record::new().set("id", "b")];
        Ok::<_, RequestError>(FetchResponse::page(rows, 2))
    })
    .sink(NullSink)
    .with_default_plugins()
    .plugin(FirstRowPicker)
    .build()
    .unwrap();

    table.mount().await;
    assert_eq!(
        table.state().extension("row-selection"),
        Some(&serde_json::json!({ "selectedCount": 0 }))
    );

    table.dispatch(Action::Refresh).await.unwrap();
    assert_eq!(table.selection().stat().selected_count, 1);
    assert_eq!(
        table.state().extension("row-selection"),
        Some(&serde_json::json!({ "selectedCount": 1 }))
    );

    table.context().helpers().clear_selection();
    assert_eq!(
        table.state().extension("row-selection"),
        Some(&serde_json::json!({ "selectedCount": 0 }))
    );
}
