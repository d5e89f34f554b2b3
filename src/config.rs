//! Configuration for the columnar engine

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ColumnarError, Result};

/// Largest chunk the engine seals or accepts from a chunk frame
pub const MAX_CHUNK_ROWS: usize = 1 << 24;

/// Main engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum rows per column chunk
    pub chunk_capacity: usize,

    /// Seal and scan chunks data-parallel
    pub parallel: bool,

    /// Worker threads for parallel chunk work
    pub scan_threads: usize,

    /// Codec selection thresholds
    pub codec: CodecConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_capacity: 65_536,
            parallel: true,
            scan_threads: num_cpus::get(),
            codec: CodecConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Set the chunk capacity
    pub fn with_chunk_capacity(mut self, chunk_capacity: usize) -> Self {
        self.chunk_capacity = chunk_capacity;
        self
    }

    /// Enable or disable parallel chunk work
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Parse from a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ColumnarError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.chunk_capacity == 0 {
            return Err(ColumnarError::InvalidConfig(
                "chunk_capacity must be greater than zero".into(),
            ));
        }
        if self.chunk_capacity > MAX_CHUNK_ROWS {
            return Err(ColumnarError::InvalidConfig(format!(
                "chunk_capacity must be at most {}, got {}",
                MAX_CHUNK_ROWS, self.chunk_capacity
            )));
        }
        if self.scan_threads == 0 {
            return Err(ColumnarError::InvalidConfig(
                "scan_threads must be greater than zero".into(),
            ));
        }
        self.codec.validate()
    }
}

/// General-purpose byte compressor behind the generic codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenericBackend {
    Lz4,
    Zstd,
}

impl Default for GenericBackend {
    fn default() -> Self {
        GenericBackend::Lz4
    }
}

/// Codec suitability thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Minimum input length before a specialized codec is considered
    pub min_values: usize,

    /// Run-length is suitable when runs / len is below this
    pub max_run_ratio: f64,

    /// Dictionary is suitable when unique / len is below this
    pub max_unique_ratio: f64,

    /// Delta is suitable when the mean absolute delta is below this
    pub max_mean_delta: f64,

    /// Backend for the generic fallback codec
    pub generic: GenericBackend,

    /// Compression level (1-22 for zstd)
    pub zstd_level: i32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            min_values: 100,
            max_run_ratio: 0.25,
            max_unique_ratio: 0.1,
            max_mean_delta: 1000.0,
            generic: GenericBackend::Lz4,
            zstd_level: 3,
        }
    }
}

impl CodecConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, ratio) in [
            ("max_run_ratio", self.max_run_ratio),
            ("max_unique_ratio", self.max_unique_ratio),
        ] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(ColumnarError::InvalidConfig(format!(
                    "{} must be in (0, 1], got {}",
                    name, ratio
                )));
            }
        }
        if !(self.max_mean_delta > 0.0) {
            return Err(ColumnarError::InvalidConfig(format!(
                "max_mean_delta must be positive, got {}",
                self.max_mean_delta
            )));
        }
        if !(1..=22).contains(&self.zstd_level) {
            return Err(ColumnarError::InvalidConfig(format!(
                "zstd_level must be in 1..=22, got {}",
                self.zstd_level
            )));
        }
        Ok(())
    }
}
