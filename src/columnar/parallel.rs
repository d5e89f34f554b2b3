//! Data-parallel chunk work
//!
//! Sealing and scanning operate on independent chunks, so both fan out one
//! task per chunk on a dedicated rayon pool. Output order always matches
//! input order.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::EngineConfig;
use crate::error::{ColumnarError, Result};

/// Runs per-chunk closures, in parallel when enabled
#[derive(Debug)]
pub struct ChunkExecutor {
    pool: Option<ThreadPool>,
    num_threads: usize,
}

impl ChunkExecutor {
    /// Build from engine configuration
    pub fn new(config: &EngineConfig) -> Result<Self> {
        if !config.parallel {
            return Ok(Self::sequential());
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.scan_threads)
            .thread_name(|i| format!("luma-chunk-{}", i))
            .build()
            .map_err(|e| ColumnarError::InvalidConfig(format!("chunk thread pool: {}", e)))?;
        Ok(Self {
            pool: Some(pool),
            num_threads: config.scan_threads,
        })
    }

    /// Executor that runs everything on the calling thread
    pub fn sequential() -> Self {
        Self {
            pool: None,
            num_threads: 1,
        }
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    /// Apply `f` to every item, stopping at the first error.
    ///
    /// Results come back in input order.
    pub fn try_map<I, T, F>(&self, items: &[I], f: F) -> Result<Vec<T>>
    where
        I: Sync,
        T: Send,
        F: Fn(&I) -> Result<T> + Sync + Send,
    {
        match &self.pool {
            Some(pool) if items.len() > 1 => pool.install(|| items.par_iter().map(&f).collect()),
            _ => items.iter().map(f).collect(),
        }
    }
}

impl Default for ChunkExecutor {
    fn default() -> Self {
        Self::sequential()
    }
}
