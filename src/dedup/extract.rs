use anyhow::{Context, Result};
use log::warn;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::dedup::record::{InputRecord, SpillRecord};

/// First pipeline stage: streams the input corpus once and appends
/// `key<TAB>rank<TAB>originalLine` to the raw spill file for every
/// well-formed data row. The header row is retained, not spilled.
pub struct KeyExtractor {
    io_buffer_size: usize,
}

pub struct ExtractOutcome {
    /// Header line verbatim (without the trailing newline), reproduced at
    /// the top of the final output.
    pub header: String,
    pub records_spilled: usize,
    pub malformed_skipped: usize,
}

impl KeyExtractor {
    pub fn new(io_buffer_size: usize) -> Self {
        Self { io_buffer_size }
    }

    pub fn extract(&self, input_path: &Path, spill_path: &Path) -> Result<ExtractOutcome> {
        let input = File::open(input_path)
            .with_context(|| format!("cannot open input corpus {}", input_path.display()))?;
        let mut reader = BufReader::with_capacity(self.io_buffer_size, input);

        let spill = File::create(spill_path)
            .with_context(|| format!("cannot create spill file {}", spill_path.display()))?;
        let mut writer = BufWriter::with_capacity(self.io_buffer_size, spill);

        let mut header = String::new();
        let bytes = reader.read_line(&mut header)?;
        if bytes == 0 {
            anyhow::bail!("input corpus {} is empty, expected a header row", input_path.display());
        }
        trim_line_ending(&mut header);

        let mut records_spilled = 0;
        let mut malformed_skipped = 0;
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
                    let spill_record = SpillRecord::from_input(&record);
                    writeln!(writer, "{}", spill_record.to_spill_line())?;
                    records_spilled += 1;
                }
                None => {
                    warn!("skipping malformed line {}: {}", line_number, line);
                    malformed_skipped += 1;
                }
            }
        }

        writer.flush()?;
        Ok(ExtractOutcome {
            header,
            records_spilled,
            malformed_skipped,
        })
    }
}

/// Strips a trailing `\n` or `\r\n` in place.
pub fn trim_line_ending(line: &mut String) {
    if line.ends_with('\n') {
        line.pop();
    }
    if line.ends_with('\r') {
        line.pop();
    }
}
