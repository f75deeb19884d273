use anyhow::{Context, Result};
use log::warn;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::constants::*;
use crate::dedup::extract::trim_line_ending;
use crate::dedup::record::{duplicate_key_raw, InputRecord};

/// Deduplication against an existing reference corpus: input rows whose
/// duplicate key already appears in the reference are dropped, everything
/// else passes through in input order as two-column rows.
///
/// The reference keys are held in memory as raw 64-bit hashes; the main
/// input is still streamed.
pub struct ExclusionFilter {
    keys: HashSet<u64>,
}

pub struct ExclusionStats {
    pub reference_keys: usize,
    pub records_kept: usize,
    pub records_excluded: usize,
    pub malformed_skipped: usize,
}

impl ExclusionFilter {
    /// Collects the duplicate keys of every well-formed row in the
    /// reference corpus (its header skipped).
    pub fn from_corpus(path: &Path, io_buffer_size: usize) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("cannot open reference corpus {}", path.display()))?;
        let mut reader = BufReader::with_capacity(io_buffer_size, file);

        let mut header = String::new();
        if reader.read_line(&mut header)? == 0 {
            anyhow::bail!("reference corpus {} is empty", path.display());
        }

        let mut keys = HashSet::new();
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            trim_line_ending(&mut line);
            if let Some(record) = InputRecord::parse(&line) {
                keys.insert(duplicate_key_raw(record.source, record.target));
            }
        }

        Ok(Self { keys })
    }

    pub fn contains(&self, source: &str, target: &str) -> bool {
        self.keys.contains(&duplicate_key_raw(source, target))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Streams `input_path` once, writing the header plus every row whose
    /// key is absent from the reference set.
    pub fn filter(
        &self,
        input_path: &Path,
        output_path: &Path,
        io_buffer_size: usize,
    ) -> Result<ExclusionStats> {
        let input = File::open(input_path)
            .with_context(|| format!("cannot open input corpus {}", input_path.display()))?;
        let mut reader = BufReader::with_capacity(io_buffer_size, input);

        let output = File::create(output_path)
            .with_context(|| format!("cannot create output {}", output_path.display()))?;
        let mut writer = BufWriter::with_capacity(io_buffer_size, output);

        let mut header = String::new();
        if reader.read_line(&mut header)? == 0 {
            anyhow::bail!("input corpus {} is empty, expected a header row", input_path.display());
        }
        trim_line_ending(&mut header);
        writeln!(writer, "{}", header)?;

        let mut stats = ExclusionStats {
            reference_keys: self.keys.len(),
            records_kept: 0,
            records_excluded: 0,
            malformed_skipped: 0,
        };

        let mut line = String::new();
        let mut line_number = 1usize;
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            line_number += 1;
            trim_line_ending(&mut line);

            match InputRecord::parse(&line) {
                Some(record) => {
                    if self.contains(record.source, record.target) {
                        stats.records_excluded += 1;
                    } else {
                        writeln!(
                            writer,
                            "{}{}{}",
                            record.source, FIELD_SEPARATOR, record.target
                        )?;
                        stats.records_kept += 1;
                    }
                }
                None => {
                    warn!("skipping malformed line {}: {}", line_number, line);
                    stats.malformed_skipped += 1;
                }
            }
        }

        writer.flush()?;
        Ok(stats)
    }
}
