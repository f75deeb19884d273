pub mod chunk;
pub mod collapse;
pub mod config;
pub mod exclusion;
pub mod extract;
pub mod merger;
pub mod processor;
pub mod record;

#[cfg(test)]
mod tests;

pub use config::DedupConfig;
pub use exclusion::{ExclusionFilter, ExclusionStats};
pub use processor::DedupProcessor;

use anyhow::Result;
use std::path::Path;

#[derive(Debug, Default)]
pub struct DedupStats {
    pub total_records: usize,
    pub unique_records: usize,
    pub duplicates_removed: usize,
    pub malformed_skipped: usize,
    pub chunks_created: usize,
    pub processing_time_ms: u64,
}

/// Deduplicates `input` into `output` with the given configuration.
pub fn deduplicate_corpus(
    input: &Path,
    output: &Path,
    config: DedupConfig,
) -> Result<DedupStats> {
    DedupProcessor::new(config)?.run(input, output, None)
}
