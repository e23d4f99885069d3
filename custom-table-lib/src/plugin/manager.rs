//! Plugin registry and lifecycle driver.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::RwLock;

use futures::FutureExt;
use serde::Serialize;
use tokio::time::Instant;

use crate::error::PluginError;
use crate::error::ValidationReport;
use crate::panic::extract_panic_message;
use crate::trace::LogLevel;
use crate::trace::Phase;
use crate::trace::TraceLogCollector;

use super::LifecycleHook;
use super::MetricsSnapshot;
use super::Plugin;
use super::PluginContext;
use super::PluginId;
use super::RenderArgs;
use super::RenderNode;
use super::Slot;
use super::metrics::PluginMetrics;

const COMPONENT: &str = "plugin-manager";

/// Where a plugin is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleStage {
    Registered,
    Installing,
    Installed,
    Activating,
    /// The only stage in which slots are rendered.
    Active,
    Deactivating,
    Uninstalling,
    Uninstalled,
}

/// Outcome of a lifecycle pass over several plugins.
#[derive(Debug, Default)]
pub struct LifecycleReport {
    /// Plugins whose hook ran and succeeded.
    pub succeeded: Vec<PluginId>,
    /// Plugins already past this hook (idempotent no-op).
    pub skipped: Vec<PluginId>,
    pub failures: Vec<PluginError>,
}

impl LifecycleReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    fn push(&mut self, id: PluginId, result: Result<bool, PluginError>) {
        match result {
            Ok(true) => self.succeeded.push(id),
            Ok(false) => self.skipped.push(id),
            Err(error) => self.failures.push(error),
        }
    }
}

struct PluginEntry {
    id: PluginId,
    plugin: Arc<dyn Plugin>,
    seq: usize,
    priority: i32,
    /// Serializes lifecycle calls for this plugin.
    lifecycle: tokio::sync::Mutex<()>,
    stage: RwLock<LifecycleStage>,
}

impl PluginEntry {
    fn stage(&self) -> LifecycleStage {
        self.stage
            .read()
            .map(|s| *s)
            .unwrap_or(LifecycleStage::Registered)
    }

    fn set_stage(&self, stage: LifecycleStage) {
        if let Ok(mut guard) = self.stage.write() {
            *guard = stage;
        }
    }
}

/// Registers plugins, drives their lifecycle and dispatches slot rendering.
///
/// Lifecycle calls are idempotent and isolated: a failing or panicking
/// plugin is logged and reported, and the remaining plugins still run.
pub struct PluginManager {
    entries: RwLock<Vec<Arc<PluginEntry>>>,
    metrics: PluginMetrics,
    collector: TraceLogCollector,
}

impl PluginManager {
    pub fn new(collector: TraceLogCollector) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            metrics: PluginMetrics::default(),
            collector,
        }
    }

    /// Adds a plugin. Fails if one with the same id is registered.
    pub fn register(&self, plugin: impl Plugin + 'static) -> Result<(), PluginError> {
        self.register_arc(Arc::new(plugin))
    }

    pub fn register_arc(&self, plugin: Arc<dyn Plugin>) -> Result<(), PluginError> {
        let id = plugin.id();
        let mut entries = self
            .entries
            .write()
            .map_err(|_| PluginError::lifecycle(id.clone(), LifecycleHook::Install, "registry lock poisoned"))?;

        if entries.iter().any(|e| e.id == id) {
            drop(entries);
            self.collector.warn(
                Phase::Init,
                COMPONENT,
                format!("duplicate plugin '{id}'"),
            );
            return Err(PluginError::Duplicate(id));
        }

        let seq = entries.len();
        let priority = plugin.priority();
        entries.push(Arc::new(PluginEntry {
            id: id.clone(),
            plugin,
            seq,
            priority,
            lifecycle: tokio::sync::Mutex::new(()),
            stage: RwLock::new(LifecycleStage::Registered),
        }));
        drop(entries);

        self.collector.debug(
            Phase::Init,
            COMPONENT,
            format!("registered '{id}' (priority {priority})"),
        );
        Ok(())
    }

    pub fn contains(&self, id: &PluginId) -> bool {
        self.entry(id).is_some()
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> Vec<PluginId> {
        self.snapshot().into_iter().map(|e| e.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stage(&self, id: &PluginId) -> Option<LifecycleStage> {
        self.entry(id).map(|e| e.stage())
    }

    pub fn get(&self, id: &PluginId) -> Option<Arc<dyn Plugin>> {
        self.entry(id).map(|e| e.plugin.clone())
    }

    pub async fn install(&self, id: &PluginId, cx: &PluginContext) -> Result<bool, PluginError> {
        let entry = self.require(id)?;
        self.run_hook(&entry, LifecycleHook::Install, cx).await
    }

    pub async fn activate(&self, id: &PluginId, cx: &PluginContext) -> Result<bool, PluginError> {
        let entry = self.require(id)?;
        self.run_hook(&entry, LifecycleHook::Activate, cx).await
    }

    pub async fn deactivate(&self, id: &PluginId, cx: &PluginContext) -> Result<bool, PluginError> {
        let entry = self.require(id)?;
        self.run_hook(&entry, LifecycleHook::Deactivate, cx).await
    }

    /// Uninstalls a plugin, deactivating it first if it is active.
    pub async fn uninstall(&self, id: &PluginId, cx: &PluginContext) -> Result<bool, PluginError> {
        let entry = self.require(id)?;
        self.run_hook(&entry, LifecycleHook::Uninstall, cx).await
    }

    /// Installs every plugin in registration order.
    ///
    /// Each plugin's `validate` runs first; an invalid report is logged and
    /// does not prevent the install.
    pub async fn install_all(&self, cx: &PluginContext) -> LifecycleReport {
        self.validate_all();
        self.run_all(LifecycleHook::Install, cx, false).await
    }

    pub async fn activate_all(&self, cx: &PluginContext) -> LifecycleReport {
        self.run_all(LifecycleHook::Activate, cx, false).await
    }

    /// Deactivates every plugin in reverse registration order.
    pub async fn deactivate_all(&self, cx: &PluginContext) -> LifecycleReport {
        self.run_all(LifecycleHook::Deactivate, cx, true).await
    }

    /// Uninstalls every plugin in reverse registration order.
    pub async fn uninstall_all(&self, cx: &PluginContext) -> LifecycleReport {
        self.run_all(LifecycleHook::Uninstall, cx, true).await
    }

    /// Runs every plugin's `validate`, logging invalid reports.
    pub fn validate_all(&self) -> Vec<(PluginId, ValidationReport)> {
        self.snapshot()
            .into_iter()
            .map(|entry| {
                let report = entry.plugin.validate();
                if !report.is_valid() {
                    self.collector.record_data(
                        LogLevel::Warn,
                        Phase::Validation,
                        COMPONENT,
                        format!("plugin '{}' reported invalid configuration", entry.id),
                        serde_json::to_value(&report).unwrap_or_default(),
                    );
                }
                (entry.id.clone(), report)
            })
            .collect()
    }

    /// Initial extension state per plugin.
    pub fn default_states(&self) -> Vec<(PluginId, serde_json::Value)> {
        self.snapshot()
            .into_iter()
            .filter_map(|e| e.plugin.default_state().map(|s| (e.id.clone(), s)))
            .collect()
    }

    /// Renders one plugin's slot.
    ///
    /// Returns `Ok(None)` when the plugin is not active or has nothing for
    /// this slot. A panicking slot method is logged and yields `Ok(None)`.
    pub fn render(
        &self,
        id: &PluginId,
        slot: Slot,
        cx: &PluginContext,
        args: &RenderArgs,
    ) -> Result<Option<RenderNode>, PluginError> {
        let entry = self.require(id)?;
        Ok(self.render_entry(&entry, slot, cx, args))
    }

    /// Renders a slot across all active plugins, by ascending priority then
    /// registration order.
    pub fn render_slot(
        &self,
        slot: Slot,
        cx: &PluginContext,
        args: &RenderArgs,
    ) -> Vec<(PluginId, RenderNode)> {
        let mut entries = self.snapshot();
        entries.sort_by_key(|e| (e.priority, e.seq));
        entries
            .iter()
            .filter_map(|entry| {
                self.render_entry(entry, slot, cx, args)
                    .map(|node| (entry.id.clone(), node))
            })
            .collect()
    }

    /// Notifies active plugins that an action was applied.
    pub fn notify_action(&self, action: &super::Action, cx: &PluginContext) {
        for entry in self.snapshot() {
            if entry.stage() != LifecycleStage::Active {
                continue;
            }
            let plugin = &entry.plugin;
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| plugin.on_action(action, cx)));
            if let Err(panic) = result {
                self.collector.error(
                    Phase::Render,
                    COMPONENT,
                    format!(
                        "plugin '{}' panicked handling an action: {}",
                        entry.id,
                        extract_panic_message(&panic)
                    ),
                );
            }
        }
    }

    /// Side-effect-free copy of the counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn render_entry(
        &self,
        entry: &PluginEntry,
        slot: Slot,
        cx: &PluginContext,
        args: &RenderArgs,
    ) -> Option<RenderNode> {
        if entry.stage() != LifecycleStage::Active {
            return None;
        }
        self.metrics.record_render(&entry.id);

        let plugin = &entry.plugin;
        match std::panic::catch_unwind(AssertUnwindSafe(|| plugin.render(slot, cx, args))) {
            Ok(node) => node,
            Err(panic) => {
                self.metrics.record_failure();
                self.collector.error(
                    Phase::Render,
                    COMPONENT,
                    format!(
                        "plugin '{}' panicked rendering {slot}: {}",
                        entry.id,
                        extract_panic_message(&panic)
                    ),
                );
                None
            }
        }
    }

    async fn run_all(&self, hook: LifecycleHook, cx: &PluginContext, reverse: bool) -> LifecycleReport {
        let mut entries = self.snapshot();
        if reverse {
            entries.reverse();
        }

        let mut report = LifecycleReport::default();
        for entry in entries {
            let result = self.run_hook(&entry, hook, cx).await;
            report.push(entry.id.clone(), result);
        }

        let level = if report.is_ok() {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };
        self.collector.record_data(
            level,
            phase_for(hook),
            COMPONENT,
            format!("{hook} pass finished"),
            serde_json::json!({
                "succeeded": report.succeeded.len(),
                "skipped": report.skipped.len(),
                "failed": report.failures.len(),
            }),
        );
        report
    }

    /// Runs one hook under the plugin's lifecycle lock.
    ///
    /// Returns `Ok(false)` when the plugin is already past this hook.
    async fn run_hook(
        &self,
        entry: &PluginEntry,
        hook: LifecycleHook,
        cx: &PluginContext,
    ) -> Result<bool, PluginError> {
        let _serial = entry.lifecycle.lock().await;

        if hook == LifecycleHook::Uninstall && entry.stage() == LifecycleStage::Active {
            self.invoke(entry, LifecycleHook::Deactivate, cx).await?;
        }
        self.invoke(entry, hook, cx).await
    }

    async fn invoke(
        &self,
        entry: &PluginEntry,
        hook: LifecycleHook,
        cx: &PluginContext,
    ) -> Result<bool, PluginError> {
        use LifecycleStage::*;

        let current = entry.stage();
        let (transitional, target, on_failure) = match (hook, current) {
            (LifecycleHook::Install, Registered | Uninstalled) => (Installing, Installed, current),
            (LifecycleHook::Install, _) => return Ok(false),
            (LifecycleHook::Activate, Installed) => (Activating, Active, Installed),
            (LifecycleHook::Activate, Active) => return Ok(false),
            (LifecycleHook::Activate, _) => {
                return Err(self.fail(entry, hook, format!("cannot activate from {current:?}")));
            }
            // A failed deactivate still stops rendering.
            (LifecycleHook::Deactivate, Active) => (Deactivating, Installed, Installed),
            (LifecycleHook::Deactivate, _) => return Ok(false),
            (LifecycleHook::Uninstall, Installed) => (Uninstalling, Uninstalled, Installed),
            (LifecycleHook::Uninstall, _) => return Ok(false),
        };

        entry.set_stage(transitional);
        let started = Instant::now();
        let plugin = entry.plugin.clone();
        let future = async move {
            match hook {
                LifecycleHook::Install => plugin.install(cx).await,
                LifecycleHook::Activate => plugin.activate(cx).await,
                LifecycleHook::Deactivate => plugin.deactivate(cx).await,
                LifecycleHook::Uninstall => plugin.uninstall(cx).await,
            }
        };
        let result = AssertUnwindSafe(future).catch_unwind().await;
        let elapsed = started.elapsed();
        self.metrics.record_hook(&entry.id, hook, elapsed);

        let message = match result {
            Ok(Ok(())) => {
                entry.set_stage(target);
                self.collector.record_data(
                    LogLevel::Debug,
                    phase_for(hook),
                    COMPONENT,
                    format!("{hook} '{}'", entry.id),
                    serde_json::json!({ "durationMs": elapsed.as_secs_f64() * 1000.0 }),
                );
                return Ok(true);
            }
            Ok(Err(message)) => message,
            Err(panic) => format!("panicked: {}", extract_panic_message(&panic)),
        };

        entry.set_stage(on_failure);
        Err(self.fail(entry, hook, message))
    }

    fn fail(&self, entry: &PluginEntry, hook: LifecycleHook, message: String) -> PluginError {
        self.metrics.record_failure();
        self.collector.error(
            phase_for(hook),
            COMPONENT,
            format!("plugin '{}' {hook} failed: {message}", entry.id),
        );
        PluginError::lifecycle(entry.id.clone(), hook, message)
    }

    fn entry(&self, id: &PluginId) -> Option<Arc<PluginEntry>> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.iter().find(|e| &e.id == id).cloned())
    }

    fn require(&self, id: &PluginId) -> Result<Arc<PluginEntry>, PluginError> {
        self.entry(id)
            .ok_or_else(|| PluginError::NotFound(id.clone()))
    }

    fn snapshot(&self) -> Vec<Arc<PluginEntry>> {
        self.entries
            .read()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

fn phase_for(hook: LifecycleHook) -> Phase {
    match hook {
        LifecycleHook::Install => Phase::Install,
        LifecycleHook::Activate => Phase::Activate,
        LifecycleHook::Deactivate => Phase::Deactivate,
        LifecycleHook::Uninstall => Phase::Uninstall,
    }
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("plugins", &self.ids())
            .finish_non_exhaustive()
    }
}
