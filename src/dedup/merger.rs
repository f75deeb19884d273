use anyhow::{Context, Result};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::constants::*;
use crate::dedup::chunk::ChunkMetadata;
use crate::dedup::record::SpillRecord;

/// K-way merge of sorted chunk files into the sorted spill file. Heap ties
/// on equal (key, rank) are broken by chunk id, which preserves original
/// input order because chunks are created in input order.
pub struct ChunkMerger {
    io_buffer_size: usize,
}

#[derive(Debug)]
struct MergeEntry {
    record: SpillRecord,
    chunk_id: usize,
}

impl PartialEq for MergeEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for MergeEntry {}

impl PartialOrd for MergeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.record
            .compare(&other.record)
            .then_with(|| self.chunk_id.cmp(&other.chunk_id))
    }
}

impl ChunkMerger {
    pub fn new(io_buffer_size: usize) -> Self {
        Self { io_buffer_size }
    }

    /// Writes every chunk record to `output_path` in total sorted order.
    /// Returns the number of records written. No deduplication happens
    /// here; the collapse stage owns that decision.
    pub fn merge_chunks(&self, chunks: &[ChunkMetadata], output_path: &Path) -> Result<usize> {
        let output = File::create(output_path)
            .with_context(|| format!("cannot create sorted spill {}", output_path.display()))?;
        let mut writer =
            BufWriter::with_capacity(OUTPUT_BUFFER_SIZE_KB * BYTES_PER_KB, output);

        let mut chunk_readers = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let file = File::open(&chunk.file_path).with_context(|| {
                format!("chunk file disappeared: {}", chunk.file_path.display())
            })?;
            chunk_readers.push(BufReader::with_capacity(self.io_buffer_size, file));
        }

        let mut merge_heap = BinaryHeap::with_capacity(MERGE_HEAP_INITIAL_CAPACITY);
        for (chunk_id, reader) in chunk_readers.iter_mut().enumerate() {
            if let Some(record) = read_next_record(reader)? {
                merge_heap.push(Reverse(MergeEntry { record, chunk_id }));
            }
        }

        let mut records_written = 0;
        while let Some(Reverse(entry)) = merge_heap.pop() {
            writeln!(writer, "{}", entry.record.to_spill_line())?;
            records_written += 1;

            if let Some(next) = read_next_record(&mut chunk_readers[entry.chunk_id])? {
                merge_heap.push(Reverse(MergeEntry {
                    record: next,
                    chunk_id: entry.chunk_id,
                }));
            }
        }

        writer.flush()?;
        Ok(records_written)
    }
}

fn read_next_record(reader: &mut BufReader<File>) -> Result<Option<SpillRecord>> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            continue;
        }
        if let Some(record) = SpillRecord::from_spill_line(trimmed) {
            return Ok(Some(record));
        }
        // Chunk files are engine-written; anything unparsable is skipped.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::chunk::ChunkProcessor;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn merge_restores_total_order_across_chunks() {
        let dir = tempdir().unwrap();
        let spill = dir.path().join("spill.tsv");
        let lines = [
            "cccc\t10.000000\tc\tC",
            "aaaa\t50.000000\ta-mid\tA",
            "bbbb\t20.000000\tb\tB",
            "aaaa\t90.000000\ta-best\tA",
            "aaaa\t10.000000\ta-worst\tA",
        ];
        fs::write(&spill, lines.join("\n") + "\n").unwrap();

        // One record per chunk, then merge all five.
        let processor = ChunkProcessor::new(1, 8 * 1024, dir.path().to_path_buf());
        let chunks = processor.split_into_chunks(&spill).unwrap();
        assert_eq!(chunks.len(), 5);

        let sorted = dir.path().join("sorted.tsv");
        let written = ChunkMerger::new(8 * 1024).merge_chunks(&chunks, &sorted).unwrap();
        assert_eq!(written, 5);

        let content = fs::read_to_string(&sorted).unwrap();
        let keys_and_lines: Vec<&str> = content.lines().collect();
        assert!(keys_and_lines[0].contains("a-best"));
        assert!(keys_and_lines[1].contains("a-mid"));
        assert!(keys_and_lines[2].contains("a-worst"));
        assert!(keys_and_lines[3].contains("b\tB"));
        assert!(keys_and_lines[4].contains("c\tC"));
    }

    #[test]
    fn equal_key_and_rank_preserve_chunk_order() {
        let dir = tempdir().unwrap();
        let sorted = dir.path().join("sorted.tsv");

        // Two single-record chunks with identical (key, rank): the record
        // from the earlier chunk must win the heap tie.
        let mut chunks = Vec::new();
        for (chunk_id, tag) in [(0usize, "first"), (1usize, "second")] {
            let path = dir.path().join(format!("chunk_{}.tsv", chunk_id));
            fs::write(&path, format!("aaaa\t42.000000\t{}\tx\n", tag)).unwrap();
            chunks.push(ChunkMetadata {
                chunk_id,
                file_path: path,
                record_count: 1,
            });
        }

        ChunkMerger::new(8 * 1024).merge_chunks(&chunks, &sorted).unwrap();
        let content = fs::read_to_string(&sorted).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines[0].contains("first"));
        assert!(lines[1].contains("second"));
    }

    #[test]
    fn merging_zero_chunks_creates_empty_output() {
        let dir = tempdir().unwrap();
        let sorted = dir.path().join("sorted.tsv");
        let written = ChunkMerger::new(8 * 1024).merge_chunks(&[], &sorted).unwrap();
        assert_eq!(written, 0);
        assert_eq!(fs::read_to_string(&sorted).unwrap(), "");
    }
}
