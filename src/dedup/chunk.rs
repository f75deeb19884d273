use anyhow::{Context, Result};
use log::warn;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::dedup::record::SpillRecord;

/// Splits the raw spill file into memory-sized runs, sorts each run by the
/// composite (key asc, rank desc) order and writes it to its own chunk file.
/// Chunk ids follow input order, which the merge relies on for stability.
pub struct ChunkProcessor {
    chunk_size_bytes: usize,
    io_buffer_size: usize,
    scratch_directory: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ChunkMetadata {
    pub chunk_id: usize,
    pub file_path: PathBuf,
    pub record_count: usize,
}

impl ChunkProcessor {
    pub fn new(chunk_size_bytes: usize, io_buffer_size: usize, scratch_directory: PathBuf) -> Self {
        Self {
            chunk_size_bytes,
            io_buffer_size,
            scratch_directory,
        }
    }

    /// Streams the raw spill file into sorted chunk files. Never holds more
    /// than one chunk of records in memory.
    pub fn split_into_chunks(&self, spill_path: &Path) -> Result<Vec<ChunkMetadata>> {
        let file = File::open(spill_path)
            .with_context(|| format!("cannot open spill file {}", spill_path.display()))?;
        let mut reader = BufReader::with_capacity(self.io_buffer_size, file);

        let mut chunks = Vec::new();
        let mut current_chunk: Vec<SpillRecord> = Vec::new();
        let mut current_size = 0;
        let mut line = String::new();
        let mut line_number = 0usize;

        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            line_number += 1;
            let trimmed = line.trim_end_matches(['\r', '\n']);
            if trimmed.is_empty() {
                continue;
            }

            let Some(record) = SpillRecord::from_spill_line(trimmed) else {
                warn!("skipping unparsable spill line {}: {}", line_number, trimmed);
                continue;
            };

            let record_size = record.estimated_size();
            if current_size + record_size > self.chunk_size_bytes && !current_chunk.is_empty() {
                let chunk_id = chunks.len();
                chunks.push(self.sort_and_write_chunk(chunk_id, std::mem::take(&mut current_chunk))?);
                current_size = 0;
            }

            current_chunk.push(record);
            current_size += record_size;
        }

        if !current_chunk.is_empty() {
            let chunk_id = chunks.len();
            chunks.push(self.sort_and_write_chunk(chunk_id, current_chunk)?);
        }

        Ok(chunks)
    }

    fn sort_and_write_chunk(
        &self,
        chunk_id: usize,
        mut records: Vec<SpillRecord>,
    ) -> Result<ChunkMetadata> {
        // par_sort_by is stable, so equal (key, rank) records keep their
        // input order within the chunk.
        records.par_sort_by(|a, b| a.compare(b));

        let chunk_file = self.scratch_directory.join(format!(
            "{}{}{}",
            CHUNK_FILE_PREFIX, chunk_id, CHUNK_FILE_EXTENSION
        ));
        let file = File::create(&chunk_file)
            .with_context(|| format!("cannot create chunk file {}", chunk_file.display()))?;
        let mut writer = BufWriter::with_capacity(self.io_buffer_size, file);

        let record_count = records.len();
        for record in records {
            writeln!(writer, "{}", record.to_spill_line())?;
        }
        writer.flush()?;

        Ok(ChunkMetadata {
            chunk_id,
            file_path: chunk_file,
            record_count,
        })
    }
}
