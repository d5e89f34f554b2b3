//! Named table registry

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::info;

use crate::columnar::{ChunkExecutor, ColumnarTable};
use crate::config::EngineConfig;
use crate::error::{ColumnarError, Result};

/// In-memory collection of columnar tables sharing one chunk executor
#[derive(Debug)]
pub struct ColumnarStore {
    /// Tables by name
    tables: DashMap<String, Arc<ColumnarTable>>,
    /// Defaults for new tables
    config: EngineConfig,
    /// Shared rayon pool
    executor: Arc<ChunkExecutor>,
}

impl ColumnarStore {
    /// Create a new store
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let executor = Arc::new(ChunkExecutor::new(&config)?);
        info!(
            chunk_capacity = config.chunk_capacity,
            parallel = executor.is_parallel(),
            threads = executor.num_threads(),
            "Initializing columnar store"
        );
        Ok(Self {
            tables: DashMap::new(),
            config,
            executor,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create a table using the store's chunk capacity
    pub fn create_table(&self, name: &str) -> Result<Arc<ColumnarTable>> {
        self.create_table_with_capacity(name, self.config.chunk_capacity)
    }

    /// Create a table with its own chunk capacity
    pub fn create_table_with_capacity(
        &self,
        name: &str,
        chunk_capacity: usize,
    ) -> Result<Arc<ColumnarTable>> {
        let config = self.config.clone().with_chunk_capacity(chunk_capacity);
        match self.tables.entry(name.to_string()) {
            Entry::Occupied(_) => Err(ColumnarError::TableExists(name.to_string())),
            Entry::Vacant(slot) => {
                let table = Arc::new(ColumnarTable::with_executor(
                    name,
                    &config,
                    self.executor.clone(),
                )?);
                slot.insert(table.clone());
                Ok(table)
            }
        }
    }

    /// Look up a table
    pub fn get_table(&self, name: &str) -> Result<Arc<ColumnarTable>> {
        self.tables
            .get(name)
            .map(|t| t.value().clone())
            .ok_or_else(|| ColumnarError::TableNotFound(name.to_string()))
    }

    /// Remove a table. Outstanding handles and snapshots stay readable.
    pub fn drop_table(&self, name: &str) -> Result<()> {
        if self.tables.remove(name).is_none() {
            return Err(ColumnarError::TableNotFound(name.to_string()));
        }
        info!(table = %name, "dropped columnar table");
        Ok(())
    }

    /// Table names, sorted
    pub fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|t| t.key().clone()).collect();
        names.sort();
        names
    }
}
