//! The table controller: the host-facing command surface.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::TableConfig;
use crate::data_source::BackoffEvent;
use crate::data_source::DataSourceController;
use crate::data_source::FetchMode;
use crate::data_source::FetchOutcome;
use crate::data_source::FetchResponse;
use crate::data_source::FetchStats;
use crate::data_source::RequestFn;
use crate::data_source::RequestParams;
use crate::data_source::RetryState;
use crate::error::Error;
use crate::error::ValidationIssue;
use crate::error::ValidationReport;
use crate::export::ExportFormat;
use crate::export::ExportedFile;
use crate::export::export;
use crate::model::RowKey;
use crate::model::Value;
use crate::plugin::Action;
use crate::plugin::Helpers;
use crate::plugin::LifecycleReport;
use crate::plugin::MetricsSnapshot;
use crate::plugin::Plugin;
use crate::plugin::PluginContext;
use crate::plugin::PluginId;
use crate::plugin::PluginManager;
use crate::plugin::RenderArgs;
use crate::plugin::RenderNode;
use crate::plugin::Slot;
use crate::plugin::builtin::FetchStatusPlugin;
use crate::plugin::builtin::LoadMorePlugin;
use crate::plugin::builtin::PaginationPlugin;
use crate::plugin::builtin::RowSelectionPlugin;
use crate::plugin::builtin::SmartCellPlugin;
use crate::selection::RowSelectionEngine;
use crate::selection::SelectionConfig;
use crate::smart_cell::SmartCellConfig;
use crate::smart_cell::SmartCellResolver;
use crate::state::Command;
use crate::state::PaginationStateManager;
use crate::state::ResetOptions;
use crate::state::Sorter;
use crate::state::Store;
use crate::state::TableState;
use crate::trace::LogCrateSink;
use crate::trace::LogLevel;
use crate::trace::LogSink;
use crate::trace::Phase;
use crate::trace::TraceLogCollector;
use crate::url_state::UrlStateCodec;

const COMPONENT: &str = "table";

/// Lifecycle results of [`TableController::mount`].
#[derive(Debug, Default)]
pub struct MountReport {
    pub install: LifecycleReport,
    pub activate: LifecycleReport,
    /// Outcome of the initial fetch, unless `manual_request` is set.
    pub fetch: Option<FetchOutcome>,
}

impl MountReport {
    pub fn is_ok(&self) -> bool {
        self.install.is_ok() && self.activate.is_ok()
    }
}

/// Lifecycle results of [`TableController::unmount`].
#[derive(Debug, Default)]
pub struct UnmountReport {
    pub deactivate: LifecycleReport,
    pub uninstall: LifecycleReport,
}

/// Snapshot returned by [`TableController::get_performance_metrics`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub fetch: FetchStats,
    pub average_fetch_ms: f64,
    pub plugins: MetricsSnapshot,
    pub state_version: u64,
    pub row_count: usize,
    pub selected_count: usize,
    pub log_entries: usize,
}

/// Builds a [`TableController`].
pub struct TableControllerBuilder {
    request: Arc<dyn RequestFn>,
    config: TableConfig,
    selection: SelectionConfig,
    cells: SmartCellConfig,
    plugins: Vec<Arc<dyn Plugin>>,
    default_plugins: bool,
    collector: Option<TraceLogCollector>,
    sink: Option<Arc<dyn LogSink>>,
    url_codec: UrlStateCodec,
}

impl TableControllerBuilder {
    pub fn config(mut self, config: TableConfig) -> Self {
        self.config = config;
        self
    }

    /// Selection options. The row key always follows `TableConfig::row_key`.
    pub fn selection(mut self, selection: SelectionConfig) -> Self {
        self.selection = selection;
        self
    }

    pub fn smart_cell(mut self, cells: SmartCellConfig) -> Self {
        self.cells = cells;
        self
    }

    pub fn plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    /// Registers the built-in selection, smart cell and fetch status
    /// plugins, plus pagination or load-more depending on the fetch mode.
    pub fn with_default_plugins(mut self) -> Self {
        self.default_plugins = true;
        self
    }

    /// Uses an existing collector instead of creating one.
    pub fn collector(mut self, collector: TraceLogCollector) -> Self {
        self.collector = Some(collector);
        self
    }

    /// Sink for a newly created collector. Ignored with [`collector`](Self::collector).
    pub fn sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    pub fn url_codec(mut self, codec: UrlStateCodec) -> Self {
        self.url_codec = codec;
        self
    }

    pub fn build(self) -> Result<TableController, Error> {
        let config = self.config;
        if config.row_key.trim().is_empty() {
            return Err(Error::Config("row key must not be empty".to_string()));
        }

        let collector = match (self.collector, self.sink) {
            (Some(collector), _) => collector,
            (None, Some(sink)) => {
                TraceLogCollector::with_shared_sink_and_capacity(sink, config.log_capacity)
            }
            (None, None) => TraceLogCollector::with_sink_and_capacity(LogCrateSink, config.log_capacity),
        };

        let mut selection = self.selection;
        selection.row_key = config.row_key.clone();

        let state = TableState::with_query(
            config.pagination.default_page_size,
            config.initial_query.clone(),
        );
        let store = Store::new(state, collector.clone());
        let selection = Arc::new(RowSelectionEngine::new(selection, collector.clone()));
        let cells = Arc::new(SmartCellResolver::new(self.cells, collector.clone()));
        let data_source = DataSourceController::new(
            self.request,
            config.mode,
            config.auto_retry.clone(),
            collector.clone(),
        );

        let plugins = PluginManager::new(collector.clone());
        if self.default_plugins {
            plugins.register(RowSelectionPlugin::new())?;
            match config.mode {
                FetchMode::Paginated => {
                    plugins.register(PaginationPlugin::new(config.pagination.clone()))?
                }
                FetchMode::Streaming => plugins.register(LoadMorePlugin::new())?,
            }
            plugins.register(SmartCellPlugin::new())?;
            plugins.register(FetchStatusPlugin::new())?;
        }
        for plugin in self.plugins {
            plugins.register_arc(plugin)?;
        }
        seed_plugin_states(&plugins, &store);

        collector.record_data(
            LogLevel::Info,
            Phase::Init,
            COMPONENT,
            "table created",
            serde_json::json!({
                "mode": config.mode,
                "rowKey": config.row_key,
                "plugins": plugins.ids(),
            }),
        );

        Ok(TableController {
            inner: Arc::new(ControllerInner {
                pagination: PaginationStateManager::new(config.pagination.clone()),
                helpers: Helpers::new(store.clone(), selection.clone(), cells.clone()),
                config,
                store,
                data_source,
                selection,
                cells,
                plugins,
                collector,
                url_codec: self.url_codec,
                debounce: Mutex::new(None),
                mounted: AtomicBool::new(false),
            }),
        })
    }
}

fn seed_plugin_states(plugins: &PluginManager, store: &Store) {
    for (id, state) in plugins.default_states() {
        store.dispatch(Command::SetExtension {
            key: id.to_string(),
            value: state,
        });
    }
}

struct ControllerInner {
    config: TableConfig,
    store: Store,
    data_source: DataSourceController,
    selection: Arc<RowSelectionEngine>,
    cells: Arc<SmartCellResolver>,
    helpers: Helpers,
    plugins: PluginManager,
    pagination: PaginationStateManager,
    collector: TraceLogCollector,
    url_codec: UrlStateCodec,
    debounce: Mutex<Option<CancellationToken>>,
    mounted: AtomicBool,
}

/// Owns the table state and coordinates fetching, selection and plugins.
///
/// Cloning yields another handle to the same table. State changes are
/// applied synchronously when a command is called; commands that change the
/// request parameters then fetch. Query and filter changes wait for the
/// configured debounce and are superseded by a newer change in that window.
#[derive(Clone)]
pub struct TableController {
    inner: Arc<ControllerInner>,
}

impl TableController {
    pub fn builder(request: impl RequestFn + 'static) -> TableControllerBuilder {
        TableControllerBuilder {
            request: Arc::new(request),
            config: TableConfig::default(),
            selection: SelectionConfig::default(),
            cells: SmartCellConfig::default(),
            plugins: Vec::new(),
            default_plugins: false,
            collector: None,
            sink: None,
            url_codec: UrlStateCodec::default(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &TableConfig {
        &self.inner.config
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> TableState {
        self.inner.store.snapshot()
    }

    pub fn retry_state(&self) -> RetryState {
        self.inner.data_source.retry_state()
    }

    pub fn collector(&self) -> &TraceLogCollector {
        &self.inner.collector
    }

    pub fn selection(&self) -> &RowSelectionEngine {
        &self.inner.selection
    }

    pub fn cells(&self) -> &SmartCellResolver {
        &self.inner.cells
    }

    pub fn plugins(&self) -> &PluginManager {
        &self.inner.plugins
    }

    pub fn data_source(&self) -> &DataSourceController {
        &self.inner.data_source
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.load(Ordering::SeqCst)
    }

    /// Context for plugin hooks and slot rendering, built from the latest state.
    pub fn context(&self) -> PluginContext {
        let inner = &self.inner;
        let state = inner.store.snapshot();
        let pagination = inner.pagination.descriptor(&state);
        PluginContext::new(
            state,
            pagination,
            inner.data_source.retry_state(),
            inner.config.mode,
            inner.helpers.clone(),
            inner.collector.clone(),
        )
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Seeds plugin state, installs and activates plugins, then loads the
    /// first page unless `manual_request` is set.
    ///
    /// Plugin failures are reported, not fatal.
    pub async fn mount(&self) -> MountReport {
        let inner = &self.inner;
        if inner.mounted.load(Ordering::SeqCst) {
            return MountReport::default();
        }

        self.seed_plugin_states();

        let install = inner.plugins.install_all(&self.context()).await;
        let activate = inner.plugins.activate_all(&self.context()).await;
        inner.mounted.store(true, Ordering::SeqCst);
        inner.collector.info(Phase::Init, COMPONENT, "mounted");

        let fetch = if inner.config.manual_request {
            None
        } else {
            Some(self.refresh().await)
        };

        MountReport {
            install,
            activate,
            fetch,
        }
    }

    /// Aborts pending work and tears plugins down in reverse order.
    pub async fn unmount(&self) -> UnmountReport {
        let inner = &self.inner;
        self.abort();
        inner.mounted.store(false, Ordering::SeqCst);
        let deactivate = inner.plugins.deactivate_all(&self.context()).await;
        let uninstall = inner.plugins.uninstall_all(&self.context()).await;
        inner.collector.info(Phase::Uninstall, COMPONENT, "unmounted");
        UnmountReport {
            deactivate,
            uninstall,
        }
    }

    // =========================================================================
    // Fetching
    // =========================================================================

    /// Reloads the current page (paginated) or restarts from the first
    /// increment (streaming).
    pub async fn refresh(&self) -> FetchOutcome {
        self.cancel_debounce();
        let params = match self.inner.config.mode {
            FetchMode::Paginated => self.inner.store.request_params(),
            FetchMode::Streaming => self
                .inner
                .store
                .read(|state| RequestParams::for_page(state, 1))
                .unwrap_or_default(),
        };
        self.fetch(params, false).await
    }

    /// Fetches the next streaming increment and appends it.
    ///
    /// Returns `None` outside streaming mode, while loading, or when the
    /// source reported no more data.
    pub async fn load_more(&self) -> Option<FetchOutcome> {
        let inner = &self.inner;
        if inner.config.mode != FetchMode::Streaming {
            inner
                .collector
                .warn(Phase::Fetch, COMPONENT, "load more is only available in streaming mode");
            return None;
        }
        let params = inner
            .store
            .read(|state| {
                if state.loading() {
                    None
                } else {
                    inner.data_source.next_increment_params(state)
                }
            })
            .flatten()?;
        Some(self.fetch(params, true).await)
    }

    /// Cancels the in-flight request, a pending debounce and any auto-retry
    /// countdown. Idempotent.
    pub fn abort(&self) -> bool {
        let debounced = self.cancel_debounce();
        let aborted = self.inner.data_source.abort();
        if aborted || debounced {
            self.inner.store.dispatch(Command::FetchSettled);
        }
        aborted || debounced
    }

    /// Re-issues the most recent request.
    pub async fn retry(&self) -> FetchOutcome {
        let inner = &self.inner;
        let params = inner
            .data_source
            .last_params()
            .unwrap_or_else(|| inner.store.request_params());
        let append =
            inner.config.mode == FetchMode::Streaming && params.current().is_some_and(|p| p > 1);
        inner
            .collector
            .info(Phase::Retry, COMPONENT, "manual retry");
        self.fetch(params, append).await
    }

    /// Stops the auto-retry countdown, leaving a manual retry.
    pub fn cancel_auto_retry(&self) -> bool {
        self.inner.data_source.cancel_auto_retry()
    }

    async fn fetch(&self, mut params: RequestParams, mut append: bool) -> FetchOutcome {
        let inner = &self.inner;
        let mut continued = 0;

        loop {
            inner.store.dispatch(Command::FetchStarted);
            let store = &inner.store;
            let outcome = inner
                .data_source
                .run_with_backoff(params.clone(), |event| match event {
                    BackoffEvent::Failed(error) => {
                        store.dispatch(Command::FetchFailed(error.clone()));
                    }
                    BackoffEvent::Retrying { .. } => {
                        store.dispatch(Command::FetchStarted);
                    }
                })
                .await;

            let response = match &outcome {
                FetchOutcome::Completed(response) => response,
                FetchOutcome::Aborted => {
                    store.dispatch(Command::FetchSettled);
                    return outcome;
                }
                // Failures are applied as they happen; a superseded run leaves
                // the state to the newer one.
                FetchOutcome::Failed(_) | FetchOutcome::Superseded => return outcome,
            };
            self.apply_response(response, &params, append);

            let wants_more = inner.config.mode == FetchMode::Streaming
                && response.needs_continue()
                && response.has_more();
            if !wants_more {
                return outcome;
            }
            if continued >= inner.config.max_auto_continue {
                inner.collector.warn(
                    Phase::Fetch,
                    COMPONENT,
                    format!("stopped auto-continue after {continued} increments"),
                );
                return outcome;
            }
            let Some(next) = store
                .read(|state| inner.data_source.next_increment_params(state))
                .flatten()
            else {
                return outcome;
            };
            continued += 1;
            inner.collector.debug(
                Phase::Fetch,
                COMPONENT,
                format!("source asked to continue ({continued})"),
            );
            params = next;
            append = true;
        }
    }

    fn apply_response(&self, response: &FetchResponse, params: &RequestParams, append: bool) {
        let inner = &self.inner;
        let command = match inner.config.mode {
            FetchMode::Paginated => Command::PageLoaded {
                data: response.data.clone(),
                total: response.total,
            },
            FetchMode::Streaming => Command::StreamLoaded {
                data: response.data.clone(),
                total: response.total,
                has_more: response.has_more(),
                append,
                page: params.current().unwrap_or(1),
            },
        };
        inner.store.dispatch(command);
        self.sync_derived();
    }

    /// Refreshes selection page keys, cell statistics and the selection
    /// extension from the current data.
    fn sync_derived(&self) {
        let inner = &self.inner;
        inner.store.read(|state| {
            inner.selection.sync_page(state.data(), state.total());
            inner.cells.refresh(state.data());
        });
        self.sync_selection_extension();
    }

    fn sync_selection_extension(&self) {
        self.inner.helpers.sync_selection_extension();
    }

    fn seed_plugin_states(&self) {
        seed_plugin_states(&self.inner.plugins, &self.inner.store);
        self.sync_selection_extension();
    }

    async fn debounced_fetch(&self) -> FetchOutcome {
        let inner = &self.inner;
        let token = CancellationToken::new();
        if let Ok(mut slot) = inner.debounce.lock() {
            if let Some(previous) = slot.replace(token.clone()) {
                previous.cancel();
            }
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => return FetchOutcome::Superseded,
            _ = tokio::time::sleep(inner.config.debounce) => {}
        }

        if let Ok(mut slot) = inner.debounce.lock() {
            if slot.as_ref().is_some_and(|t| !t.is_cancelled()) {
                *slot = None;
            }
        }
        let params = inner.store.request_params();
        self.fetch(params, false).await
    }

    fn cancel_debounce(&self) -> bool {
        self.inner
            .debounce
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .map(|token| token.cancel())
            .is_some()
    }

    // =========================================================================
    // Query, filters, sorting and paging
    // =========================================================================

    /// Applies a state command and fetches if the request parameters
    /// changed while mounted.
    ///
    /// Query and filter changes are debounced; sorting and paging fetch
    /// right away. Returns `None` when nothing was fetched.
    pub async fn apply(&self, command: Command) -> Option<FetchOutcome> {
        let inner = &self.inner;
        let debounced = command.changes_query_context();
        let paging = matches!(command, Command::SetPage(_) | Command::SetPageSize(_));

        let transition = inner.store.dispatch(command);
        if transition.query_context_changed {
            self.on_query_context_changed();
        }
        if !transition.params_changed || !self.is_mounted() {
            return None;
        }
        if paging {
            inner.store.dispatch(Command::SetChangingPage(true));
        }

        Some(if debounced {
            self.debounced_fetch().await
        } else {
            let params = inner.store.request_params();
            self.fetch(params, false).await
        })
    }

    fn on_query_context_changed(&self) {
        let inner = &self.inner;
        if inner.data_source.cancel_auto_retry() {
            inner.collector.debug(
                Phase::Retry,
                COMPONENT,
                "query changed, pending auto-retry cancelled",
            );
        }
        if inner.config.clear_selection_on_query_change && !inner.selection.config().cross_page {
            let cleared = inner.selection.clear_selection();
            if cleared > 0 {
                inner.collector.debug(
                    Phase::Selection,
                    COMPONENT,
                    "query changed, selection cleared",
                );
                self.sync_selection_extension();
            }
        }
    }

    /// Merges filter selections; an empty list removes a field's filter.
    pub async fn set_filters(&self, filters: BTreeMap<String, Vec<Value>>) -> Option<FetchOutcome> {
        self.apply(Command::SetFilters(filters)).await
    }

    pub async fn clear_filters(&self) -> Option<FetchOutcome> {
        self.apply(Command::ClearFilters).await
    }

    pub async fn set_sorter(&self, sorter: Option<Sorter>) -> Option<FetchOutcome> {
        self.apply(Command::SetSorter(sorter)).await
    }

    /// Replaces the query.
    pub async fn set_query(&self, query: BTreeMap<String, Value>) -> Option<FetchOutcome> {
        self.apply(Command::SetQuery(query)).await
    }

    /// Merges into the query; `Value::Null` removes a key.
    pub async fn merge_query(&self, partial: BTreeMap<String, Value>) -> Option<FetchOutcome> {
        self.apply(Command::MergeQuery(partial)).await
    }

    /// Restores the initial query.
    pub async fn reset_query(&self) -> Option<FetchOutcome> {
        self.apply(Command::ResetQuery).await
    }

    pub async fn set_page(&self, page: usize) -> Option<FetchOutcome> {
        self.apply(Command::SetPage(page)).await
    }

    pub async fn set_page_size(&self, page_size: usize) -> Option<FetchOutcome> {
        self.apply(Command::SetPageSize(page_size)).await
    }

    /// Handles a pager change event.
    pub async fn change_page(&self, page: usize, page_size: usize) -> Option<FetchOutcome> {
        let commands = self
            .inner
            .store
            .read(|state| self.inner.pagination.change(state, page, page_size))
            .unwrap_or_default();
        let mut outcome = None;
        for command in commands {
            outcome = self.apply(command).await.or(outcome);
        }
        outcome
    }

    /// Current query encoded as a query string.
    pub fn query_string(&self) -> String {
        self.inner
            .store
            .read(|state| self.inner.url_codec.encode(state.query()))
            .unwrap_or_default()
    }

    /// Replaces the query with one decoded from a query string.
    pub async fn apply_query_string(&self, input: &str) -> Option<FetchOutcome> {
        let query = self.inner.url_codec.decode(input);
        self.set_query(query).await
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn select_row(&self, key: &RowKey, selected: bool) -> bool {
        let changed = self.inner.selection.select_row(key, selected);
        if changed {
            self.sync_selection_extension();
        }
        changed
    }

    pub fn select_all(&self, selected: bool) -> usize {
        let changed = self.inner.selection.select_all(selected);
        if changed > 0 {
            self.sync_selection_extension();
        }
        changed
    }

    pub fn clear_selection(&self) -> usize {
        let cleared = self.inner.selection.clear_selection();
        self.sync_selection_extension();
        cleared
    }

    /// Runs a configured batch action over the selected rows.
    ///
    /// Refusals and handler failures are returned to the caller.
    pub async fn execute_batch_action(&self, key: &str) -> Result<(), Error> {
        let result = self.inner.selection.execute_batch_action(key).await;
        self.sync_selection_extension();
        Ok(result?)
    }

    // =========================================================================
    // Rendering and actions
    // =========================================================================

    /// Renders a slot across all active plugins.
    pub fn render(&self, slot: Slot, args: &RenderArgs) -> Vec<(PluginId, RenderNode)> {
        self.inner.plugins.render_slot(slot, &self.context(), args)
    }

    /// Renders a single plugin's slot.
    pub fn render_plugin(
        &self,
        id: &PluginId,
        slot: Slot,
        args: &RenderArgs,
    ) -> Result<Option<RenderNode>, Error> {
        Ok(self.inner.plugins.render(id, slot, &self.context(), args)?)
    }

    /// Applies an action taken from a render node.
    pub async fn dispatch(&self, action: Action) -> Result<Option<FetchOutcome>, Error> {
        let outcome = match &action {
            Action::Command(command) => self.apply(command.clone()).await,
            Action::Refresh => Some(self.refresh().await),
            Action::LoadMore => self.load_more().await,
            Action::Retry => Some(self.retry().await),
            Action::CancelAutoRetry => {
                self.cancel_auto_retry();
                None
            }
            Action::SelectRow { key, selected } => {
                self.select_row(key, *selected);
                None
            }
            Action::SelectAll(selected) => {
                self.select_all(*selected);
                None
            }
            Action::ClearSelection => {
                self.clear_selection();
                None
            }
            Action::BatchAction(key) => {
                self.execute_batch_action(key).await?;
                None
            }
            Action::EmptyCellClick { field, row_index } => {
                let record = self
                    .inner
                    .store
                    .read(|state| state.data().get(*row_index).cloned())
                    .flatten();
                match record {
                    Some(record) => {
                        self.inner
                            .cells
                            .handle_empty_value_click(&record, field, *row_index);
                    }
                    None => self.inner.collector.warn(
                        Phase::Render,
                        COMPONENT,
                        format!("click on missing row {row_index}"),
                    ),
                }
                None
            }
        };

        self.inner.plugins.notify_action(&action, &self.context());
        Ok(outcome)
    }

    // =========================================================================
    // Misc commands
    // =========================================================================

    /// Exports the loaded rows.
    pub fn export_data(&self, format: ExportFormat) -> Result<ExportedFile, Error> {
        let inner = &self.inner;
        let data = inner.store.read(|state| state.data().to_vec()).unwrap_or_default();
        match export(&data, format, None, "table-export") {
            Ok(file) => {
                inner.collector.record_data(
                    LogLevel::Info,
                    Phase::Export,
                    COMPONENT,
                    format!("exported {} rows", file.rows),
                    serde_json::json!({ "format": format, "bytes": file.bytes.len() }),
                );
                Ok(file)
            }
            Err(error) => {
                inner
                    .collector
                    .error(Phase::Export, COMPONENT, format!("export failed: {error}"));
                Err(error.into())
            }
        }
    }

    /// Records a scroll request; indices past the loaded rows are refused.
    pub fn scroll_to_row(&self, index: usize) -> bool {
        let inner = &self.inner;
        let len = inner.store.read(|state| state.data().len()).unwrap_or(0);
        if index >= len {
            inner.collector.warn(
                Phase::StateChange,
                COMPONENT,
                format!("cannot scroll to row {index} of {len}"),
            );
            return false;
        }
        inner.store.dispatch(Command::ScrollTo(Some(index)));
        true
    }

    /// Validates the configuration and every plugin. Advisory only.
    pub fn validate(&self) -> ValidationReport {
        let inner = &self.inner;
        let mut issues = Vec::new();

        if inner.selection.config().max_selection == Some(0) {
            issues.push(ValidationIssue::new(
                "row-selection",
                "maxSelection of 0 makes every row unselectable",
            ));
        }
        let retry = &inner.config.auto_retry;
        if retry.enabled && retry.max_auto_retries == 0 {
            issues.push(ValidationIssue::new(
                "data-source",
                "auto-retry is enabled but allows no retries",
            ));
        }
        if inner.config.mode == FetchMode::Streaming && inner.plugins.contains(&PluginId::Pagination) {
            issues.push(ValidationIssue::new(
                "pagination",
                "pagination plugin has no effect in streaming mode",
            ));
        }

        let mut report = ValidationReport::from_issues(issues);
        for (_, plugin_report) in inner.plugins.validate_all() {
            report.merge(plugin_report);
        }

        if !report.is_valid() {
            inner.collector.record_data(
                LogLevel::Warn,
                Phase::Validation,
                COMPONENT,
                "validation found problems",
                serde_json::to_value(&report).unwrap_or_default(),
            );
        }
        report
    }

    /// Resets state, optionally keeping parts of it, and reloads.
    pub async fn reset(&self, options: ResetOptions) -> Option<FetchOutcome> {
        let inner = &self.inner;
        self.abort();
        inner.store.dispatch(Command::Reset(options));
        if !options.keep_selection {
            inner.selection.clear_selection();
        }
        self.sync_derived();
        inner.collector.info(Phase::StateChange, COMPONENT, "reset");

        if self.is_mounted() {
            Some(self.refresh().await)
        } else {
            None
        }
    }

    pub fn get_performance_metrics(&self) -> PerformanceMetrics {
        let inner = &self.inner;
        let fetch = inner.data_source.stats();
        PerformanceMetrics {
            average_fetch_ms: fetch.average_duration_ms(),
            fetch,
            plugins: inner.plugins.metrics(),
            state_version: inner.store.version(),
            row_count: inner.store.read(|s| s.data().len()).unwrap_or(0),
            selected_count: inner.selection.stat().selected_count,
            log_entries: inner.collector.len(),
        }
    }
}

impl std::fmt::Debug for TableController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableController")
            .field("mode", &self.inner.config.mode)
            .field("mounted", &self.is_mounted())
            .field("plugins", &self.inner.plugins)
            .finish_non_exhaustive()
    }
}
