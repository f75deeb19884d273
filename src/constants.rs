pub const DEFAULT_CHUNK_SIZE_MB: usize = 256;
pub const DEFAULT_IO_BUFFER_SIZE_KB: usize = 64;
pub const DEFAULT_MERGE_BUFFER_SIZE_KB: usize = 256;
pub const DEFAULT_MEMORY_USAGE_PERCENT: f64 = 60.0;

pub const MIN_CHUNK_SIZE_MB: usize = 16;
pub const MAX_CHUNK_SIZE_MB: usize = 4096;
pub const MIN_MEMORY_USAGE_PERCENT: f64 = 10.0;
pub const MAX_MEMORY_USAGE_PERCENT: f64 = 90.0;

pub const BYTES_PER_KB: usize = 1024;
pub const BYTES_PER_MB: usize = 1024 * 1024;

pub const SCRATCH_DIR_PREFIX: &str = "bitext_sift_";
pub const RAW_SPILL_FILE_NAME: &str = "spill.tsv";
pub const SORTED_SPILL_FILE_NAME: &str = "spill.sorted.tsv";
pub const CHUNK_FILE_PREFIX: &str = "chunk_";
pub const CHUNK_FILE_EXTENSION: &str = ".tsv";

pub const FIELD_SEPARATOR: char = '\t';
pub const ESTIMATED_RECORD_OVERHEAD_BYTES: usize = 64;

// Decimal digits for the serialized rank. Six digits round-trip exactly for
// means of code points up to 0x10FFFF.
pub const RANK_PRECISION: usize = 6;

pub const MERGE_HEAP_INITIAL_CAPACITY: usize = 64;
pub const OUTPUT_BUFFER_SIZE_KB: usize = 512;
