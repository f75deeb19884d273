use anyhow::{Context, Result};
use log::warn;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::constants::*;

/// Final pipeline stage: one sequential pass over the sorted spill file,
/// emitting the first record of every contiguous key group. Constant
/// memory: only the last emitted key is retained, never a whole group.
pub struct GroupCollapser {
    io_buffer_size: usize,
}

pub struct CollapseOutcome {
    pub unique_records: usize,
    pub duplicates_removed: usize,
}

impl GroupCollapser {
    pub fn new(io_buffer_size: usize) -> Self {
        Self { io_buffer_size }
    }

    /// Writes `header` followed by the two-column projection of each group
    /// representative. When `duplicates_path` is set, every dropped row is
    /// mirrored there (same two-column shape, no header) for inspection.
    pub fn collapse(
        &self,
        sorted_spill_path: &Path,
        output_path: &Path,
        header: &str,
        duplicates_path: Option<&Path>,
    ) -> Result<CollapseOutcome> {
        let sorted = File::open(sorted_spill_path).with_context(|| {
            format!("cannot open sorted spill {}", sorted_spill_path.display())
        })?;
        let mut reader = BufReader::with_capacity(self.io_buffer_size, sorted);

        let output = File::create(output_path)
            .with_context(|| format!("cannot create output {}", output_path.display()))?;
        let mut writer = BufWriter::with_capacity(self.io_buffer_size, output);

        let mut duplicates_writer = match duplicates_path {
            Some(path) => {
                let file = File::create(path).with_context(|| {
                    format!("cannot create duplicates file {}", path.display())
                })?;
                Some(BufWriter::with_capacity(self.io_buffer_size, file))
            }
            None => None,
        };

        writeln!(writer, "{}", header)?;

        let mut last_key: Option<String> = None;
        let mut unique_records = 0;
        let mut duplicates_removed = 0;
        let mut line = String::new();
        let mut line_number = 0usize;

        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            line_number += 1;
            let trimmed = line.trim_end_matches(['\r', '\n']);

            // key, rank, source, then the rest of the original line starting
            // with the target field.
            let mut tokens = trimmed.splitn(4, FIELD_SEPARATOR);
            let (Some(key), Some(_rank), Some(source), Some(rest)) =
                (tokens.next(), tokens.next(), tokens.next(), tokens.next())
            else {
                warn!("skipping malformed sorted spill line {}", line_number);
                continue;
            };
            let target = rest.split(FIELD_SEPARATOR).next().unwrap_or(rest);

            if last_key.as_deref() != Some(key) {
                writeln!(writer, "{}{}{}", source, FIELD_SEPARATOR, target)?;
                unique_records += 1;
                last_key = Some(key.to_string());
            } else {
                duplicates_removed += 1;
                if let Some(dupes) = duplicates_writer.as_mut() {
                    writeln!(dupes, "{}{}{}", source, FIELD_SEPARATOR, target)?;
                }
            }
        }

        writer.flush()?;
        if let Some(mut dupes) = duplicates_writer {
            dupes.flush()?;
        }

        Ok(CollapseOutcome {
            unique_records,
            duplicates_removed,
        })
    }
}
