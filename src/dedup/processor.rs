use anyhow::{Context, Result};
use log::info;
use std::path::Path;
use std::time::Instant;
use tempfile::TempDir;

use crate::constants::*;
use crate::dedup::chunk::ChunkProcessor;
use crate::dedup::collapse::GroupCollapser;
use crate::dedup::extract::KeyExtractor;
use crate::dedup::merger::ChunkMerger;
use crate::dedup::{DedupConfig, DedupStats};

/// Runs the three pipeline stages in strict sequence: extract, external
/// sort (chunk + merge), collapse. Each stage fully completes and closes
/// its output before the next one starts.
pub struct DedupProcessor {
    config: DedupConfig,
}

impl DedupProcessor {
    pub fn new(config: DedupConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn run(
        &self,
        input_path: &Path,
        output_path: &Path,
        duplicates_path: Option<&Path>,
    ) -> Result<DedupStats> {
        let start = Instant::now();

        std::fs::create_dir_all(&self.config.scratch_directory).with_context(|| {
            format!(
                "cannot create scratch root {}",
                self.config.scratch_directory.display()
            )
        })?;

        // Process-unique scratch directory; dropped (and deleted) on every
        // exit path, including early error returns.
        let scratch = TempDir::with_prefix_in(SCRATCH_DIR_PREFIX, &self.config.scratch_directory)
            .context("cannot create run scratch directory")?;
        let raw_spill = scratch.path().join(RAW_SPILL_FILE_NAME);
        let sorted_spill = scratch.path().join(SORTED_SPILL_FILE_NAME);

        if self.config.verbose {
            info!("scratch directory: {}", scratch.path().display());
            info!(
                "chunk size: {} MB, memory limit: {:.1} MB",
                self.config.chunk_size_mb,
                self.config.memory_limit_bytes() as f64 / BYTES_PER_MB as f64
            );
        }

        let extractor = KeyExtractor::new(self.config.io_buffer_size_bytes());
        let extract = extractor
            .extract(input_path, &raw_spill)
            .context("key extraction failed")?;
        if self.config.verbose {
            info!(
                "extracted {} records ({} malformed lines skipped)",
                extract.records_spilled, extract.malformed_skipped
            );
        }

        let chunk_processor = ChunkProcessor::new(
            self.config.effective_chunk_size_bytes(),
            self.config.io_buffer_size_bytes(),
            scratch.path().to_path_buf(),
        );
        let chunks = chunk_processor
            .split_into_chunks(&raw_spill)
            .context("external sort failed while chunking")?;

        let merger = ChunkMerger::new(self.config.merge_buffer_size_bytes());
        let merged = merger
            .merge_chunks(&chunks, &sorted_spill)
            .context("external sort failed while merging")?;
        if self.config.verbose {
            info!("sorted {} records across {} chunks", merged, chunks.len());
        }

        let collapser = GroupCollapser::new(self.config.io_buffer_size_bytes());
        let collapse = collapser
            .collapse(&sorted_spill, output_path, &extract.header, duplicates_path)
            .context("group collapse failed")?;

        Ok(DedupStats {
            total_records: extract.records_spilled,
            unique_records: collapse.unique_records,
            duplicates_removed: collapse.duplicates_removed,
            malformed_skipped: extract.malformed_skipped,
            chunks_created: chunks.len(),
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}
