//! Plugin counters.

use std::collections::BTreeMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;

use super::LifecycleHook;
use super::PluginId;

/// Concurrently updated plugin counters.
#[derive(Debug, Default)]
pub(crate) struct PluginMetrics {
    install: DashMap<PluginId, Duration>,
    activate: DashMap<PluginId, Duration>,
    renders: DashMap<PluginId, u64>,
    failures: AtomicU64,
}

impl PluginMetrics {
    pub fn record_hook(&self, id: &PluginId, hook: LifecycleHook, elapsed: Duration) {
        match hook {
            LifecycleHook::Install => {
                self.install.insert(id.clone(), elapsed);
            }
            LifecycleHook::Activate => {
                self.activate.insert(id.clone(), elapsed);
            }
            LifecycleHook::Deactivate | LifecycleHook::Uninstall => {}
        }
    }

    pub fn record_render(&self, id: &PluginId) {
        *self.renders.entry(id.clone()).or_insert(0) += 1;
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let millis = |map: &DashMap<PluginId, Duration>| {
            map.iter()
                .map(|e| (e.key().to_string(), e.value().as_secs_f64() * 1000.0))
                .collect()
        };
        MetricsSnapshot {
            install_ms: millis(&self.install),
            activate_ms: millis(&self.activate),
            render_counts: self
                .renders
                .iter()
                .map(|e| (e.key().to_string(), *e.value()))
                .collect(),
            lifecycle_failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the plugin counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Install duration per plugin, in milliseconds.
    pub install_ms: BTreeMap<String, f64>,
    /// Activate duration per plugin, in milliseconds.
    pub activate_ms: BTreeMap<String, f64>,
    /// Slot render invocations per plugin.
    pub render_counts: BTreeMap<String, u64>,
    pub lifecycle_failures: u64,
}

impl MetricsSnapshot {
    pub fn render_count(&self, id: &PluginId) -> u64 {
        self.render_counts.get(id.as_str()).copied().unwrap_or(0)
    }
}
