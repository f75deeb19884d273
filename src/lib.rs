// Deduplication engine - the main implementation
pub mod dedup;

// Constants used by dedup
pub mod constants;

// Re-export main types for convenience
pub use dedup::{DedupConfig, DedupProcessor, DedupStats, ExclusionFilter};
