//! The command interface.

use std::sync::Arc;

use rotation_columns::{
    ColumnRegistry, EffectiveColumnSet, ExtensionColumn, ExtensionFile, ExtensionSource,
    GROUP_BY_COLUMNS, base_layer_columns,
};
use rotation_fanout::{
    ChannelEvent, FanoutChannel, PartsStore, StripParts, SubscriberHandle, UpstreamSource,
};
use rotation_filter::{FilterEntity, FilterNode, FilterStore};
use rotation_query::{
    ColumnValues, InMemoryCatalog, LayerCatalog, QueryRequest, QueryResult, Selection,
    distinct_values, query_with,
};
use rotation_types::{CatalogRow, ColumnValue, QueueStateUpdate};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::error::ServiceError;

/// Rows sharing one group key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerGroup {
    /// The grouping-column values.
    pub key: Vec<ColumnValue>,
    /// Member rows.
    pub rows: Vec<CatalogRow>,
}

/// Flat rows or groups.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "lowercase")]
pub enum SelectionResult {
    /// Matching rows.
    Rows(Vec<CatalogRow>),
    /// Groups in first-occurrence order.
    Groups(Vec<LayerGroup>),
}

/// Result of [`RotationService::start_selection`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionOutput {
    /// Size of the top-level list before paging.
    pub total_count: usize,
    /// The requested page.
    pub result: SelectionResult,
}

impl From<Selection<'_, CatalogRow>> for SelectionOutput {
    fn from(selection: Selection<'_, CatalogRow>) -> Self {
        let result = match selection.result {
            QueryResult::Rows(rows) => SelectionResult::Rows(rows.into_iter().cloned().collect()),
            QueryResult::Groups(groups) => SelectionResult::Groups(
                groups
                    .into_iter()
                    .map(|g| LayerGroup {
                        key: g.key,
                        rows: g.rows.into_iter().cloned().collect(),
                    })
                    .collect(),
            ),
        };
        Self {
            total_count: selection.total_count,
            result,
        }
    }
}

/// The layer rotation service.
pub struct RotationService {
    columns: ColumnRegistry,
    extensions: Box<dyn ExtensionSource>,
    catalog: Arc<dyn LayerCatalog>,
    filters: FilterStore,
    parts: Arc<PartsStore>,
    queue: FanoutChannel<QueueStateUpdate>,
}

impl RotationService {
    /// Assemble the service.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Columns`] if the initial extension columns
    /// cannot be loaded or conflict with the base schema.
    pub fn new(
        extensions: Box<dyn ExtensionSource>,
        catalog: Arc<dyn LayerCatalog>,
        upstream: Arc<dyn UpstreamSource<QueueStateUpdate>>,
    ) -> Result<Self, ServiceError> {
        let columns = ColumnRegistry::from_source(base_layer_columns(), extensions.as_ref())?;
        let parts = Arc::new(PartsStore::new());
        let queue = FanoutChannel::new(
            "queue-state",
            upstream,
            StripParts::new(Arc::clone(&parts)),
        );
        Ok(Self {
            columns,
            extensions,
            catalog,
            filters: FilterStore::new(),
            parts,
            queue,
        })
    }

    /// Assemble the service from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Columns`] if a configured extension file is
    /// missing or invalid, or [`ServiceError::Catalog`] if a configured
    /// catalog file cannot be loaded.
    pub fn from_config(
        config: &ServiceConfig,
        upstream: Arc<dyn UpstreamSource<QueueStateUpdate>>,
    ) -> Result<Self, ServiceError> {
        let extensions: Box<dyn ExtensionSource> = match &config.columns.extension_file {
            Some(path) => {
                info!(path = %path.display(), "Using extension column file");
                Box::new(ExtensionFile::new(path))
            }
            None => {
                info!("No extension column file configured, using base columns only");
                Box::new(Vec::<ExtensionColumn>::new())
            }
        };
        let catalog: Arc<dyn LayerCatalog> = match &config.catalog.rows_file {
            Some(path) => Arc::new(InMemoryCatalog::from_json_file(path)?),
            None => {
                warn!("No catalog rows file configured, catalog is empty");
                Arc::new(InMemoryCatalog::default())
            }
        };
        Self::new(extensions, catalog, upstream)
    }

    /// Run a selection over the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Query`] for an invalid filter or unknown
    /// column, or [`ServiceError::Catalog`] if the catalog cannot be
    /// scanned.
    pub fn start_selection(&self, request: &QueryRequest) -> Result<SelectionOutput, ServiceError> {
        let columns = self.columns.current();
        let rows = self.catalog.scan()?;
        let selection = query_with(request, &columns, &self.filters, &*rows)?;
        debug!(
            total = selection.total_count,
            returned = selection.result.row_count(),
            "Selection finished"
        );
        Ok(SelectionOutput::from(selection))
    }

    /// Distinct values of `targets` (default: the group-by columns) among
    /// rows passing `filter`.
    ///
    /// # Errors
    ///
    /// As [`start_selection`](Self::start_selection).
    pub fn components(
        &self,
        filter: Option<&FilterNode>,
        targets: Option<&[String]>,
    ) -> Result<Vec<ColumnValues>, ServiceError> {
        let columns = self.columns.current();
        let defaults: Vec<String>;
        let targets = match targets {
            Some(targets) => targets,
            None => {
                defaults = GROUP_BY_COLUMNS.iter().map(|c| (*c).to_owned()).collect();
                &defaults
            }
        };
        let rows = self.catalog.scan()?;
        Ok(distinct_values(filter, &columns, &self.filters, &*rows, targets)?)
    }

    /// Subscribe to queue state. The callback immediately receives the
    /// cached snapshot or [`ChannelEvent::Pending`].
    pub fn subscribe_to_queue_state<F>(&self, callback: F) -> SubscriberHandle<QueueStateUpdate>
    where
        F: FnMut(ChannelEvent<QueueStateUpdate>) + Send + 'static,
    {
        self.queue.subscribe(callback)
    }

    /// Subscribe to queue state through a buffered queue.
    pub fn subscribe_to_queue_state_channel(
        &self,
    ) -> (
        SubscriberHandle<QueueStateUpdate>,
        mpsc::UnboundedReceiver<ChannelEvent<QueueStateUpdate>>,
    ) {
        self.queue.subscribe_channel()
    }

    /// Stop queue state delivery to `handle`.
    pub fn unsubscribe(&self, handle: SubscriberHandle<QueueStateUpdate>) {
        self.queue.unsubscribe(handle);
    }

    /// Reload extension columns from their source and swap the effective
    /// set in. Returns the new generation and set.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Columns`]; the previous set stays in place.
    pub fn reload_columns(&self) -> Result<(u64, Arc<EffectiveColumnSet>), ServiceError> {
        self.columns.reload_from(self.extensions.as_ref())?;
        Ok(self.columns.current_versioned())
    }

    /// Store a named filter, validated against the current columns.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Filter`] if the entity is invalid.
    pub fn upsert_filter(&self, entity: FilterEntity) -> Result<Arc<FilterEntity>, ServiceError> {
        let columns = self.columns.current();
        Ok(self.filters.upsert(entity, &columns)?)
    }

    /// Remove a named filter.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Filter`] if it does not exist or is still
    /// referenced.
    pub fn delete_filter(&self, id: &str) -> Result<Arc<FilterEntity>, ServiceError> {
        Ok(self.filters.delete(id)?)
    }

    /// The column registry.
    pub const fn columns(&self) -> &ColumnRegistry {
        &self.columns
    }

    /// The named filter store.
    pub const fn filters(&self) -> &FilterStore {
        &self.filters
    }

    /// The queue state channel.
    pub const fn queue(&self) -> &FanoutChannel<QueueStateUpdate> {
        &self.queue
    }

    /// Parts stripped from queue snapshots.
    pub fn parts(&self) -> &PartsStore {
        &self.parts
    }

    /// Dispose the queue channel, completing every subscriber.
    pub fn shutdown(&self) {
        self.queue.dispose();
    }
}

impl core::fmt::Debug for RotationService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RotationService")
            .field("column_generation", &self.columns.generation())
            .field("filters", &self.filters.len())
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}
