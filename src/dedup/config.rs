use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    pub chunk_size_mb: usize,
    pub io_buffer_size_kb: usize,
    pub merge_buffer_size_kb: usize,
    pub memory_usage_percent: f64,
    /// Root under which each run creates its own private scratch directory.
    /// Defaults to the platform temp dir, which honors TMPDIR.
    pub scratch_directory: PathBuf,
    pub verbose: bool,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            chunk_size_mb: DEFAULT_CHUNK_SIZE_MB,
            io_buffer_size_kb: DEFAULT_IO_BUFFER_SIZE_KB,
            merge_buffer_size_kb: DEFAULT_MERGE_BUFFER_SIZE_KB,
            memory_usage_percent: DEFAULT_MEMORY_USAGE_PERCENT,
            scratch_directory: std::env::temp_dir(),
            verbose: false,
        }
    }
}

impl DedupConfig {
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &std::path::Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size_mb < MIN_CHUNK_SIZE_MB || self.chunk_size_mb > MAX_CHUNK_SIZE_MB {
            return Err(anyhow::anyhow!(
                "Chunk size must be between {} and {} MB",
                MIN_CHUNK_SIZE_MB,
                MAX_CHUNK_SIZE_MB
            ));
        }

        if self.memory_usage_percent < MIN_MEMORY_USAGE_PERCENT
            || self.memory_usage_percent > MAX_MEMORY_USAGE_PERCENT
        {
            return Err(anyhow::anyhow!(
                "Memory usage percent must be between {} and {}",
                MIN_MEMORY_USAGE_PERCENT,
                MAX_MEMORY_USAGE_PERCENT
            ));
        }

        if self.io_buffer_size_kb == 0 || self.merge_buffer_size_kb == 0 {
            return Err(anyhow::anyhow!("I/O buffer sizes must be non-zero"));
        }

        Ok(())
    }

    pub fn memory_limit_bytes(&self) -> usize {
        use sysinfo::System;
        let mut system = System::new_all();
        system.refresh_memory();

        let total_memory = system.total_memory() as f64;
        (total_memory * self.memory_usage_percent / 100.0) as usize
    }

    /// Chunk size actually used by the sorter: the configured size, capped
    /// so a chunk buffer cannot exceed the memory budget.
    pub fn effective_chunk_size_bytes(&self) -> usize {
        self.chunk_size_bytes().min(self.memory_limit_bytes().max(BYTES_PER_MB))
    }

    pub fn chunk_size_bytes(&self) -> usize {
        self.chunk_size_mb * BYTES_PER_MB
    }

    pub fn io_buffer_size_bytes(&self) -> usize {
        self.io_buffer_size_kb * BYTES_PER_KB
    }

    pub fn merge_buffer_size_bytes(&self) -> usize {
        self.merge_buffer_size_kb * BYTES_PER_KB
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_is_valid() {
        assert!(DedupConfig::default().validate().is_ok());
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let mut config = DedupConfig::default();
        config.chunk_size_mb = 1;
        assert!(config.validate().is_err());

        config.chunk_size_mb = 10_000;
        assert!(config.validate().is_err());

        config.chunk_size_mb = DEFAULT_CHUNK_SIZE_MB;
        config.memory_usage_percent = 5.0;
        assert!(config.validate().is_err());

        config.memory_usage_percent = 95.0;
        assert!(config.validate().is_err());

        config.memory_usage_percent = 50.0;
        config.io_buffer_size_kb = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = DedupConfig::default();
        config.chunk_size_mb = 128;
        config.verbose = true;
        config.to_file(&path).unwrap();

        let loaded = DedupConfig::from_file(&path).unwrap();
        assert_eq!(loaded.chunk_size_mb, 128);
        assert!(loaded.verbose);
    }
}
