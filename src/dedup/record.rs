use std::cmp::Ordering;
use std::hash::Hasher;

use deunicode::deunicode;
use twox_hash::XxHash64;

use crate::constants::*;

/// Aggressive normalization applied to a sentence before key hashing:
/// lowercase, transliterate to ASCII, drop everything that is neither
/// alphabetic nor whitespace, collapse whitespace runs.
///
/// Must stay locale-independent: two records that differ only in case,
/// accents or punctuation normalize to the same string on every platform.
pub fn normalize_for_key(text: &str) -> String {
    let folded = deunicode(&text.to_lowercase());
    let kept: String = folded
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 64-bit duplicate key over the normalized sentence pair.
pub fn duplicate_key_raw(source: &str, target: &str) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(normalize_for_key(source).as_bytes());
    hasher.write(b"\t");
    hasher.write(normalize_for_key(target).as_bytes());
    hasher.finish()
}

/// Duplicate key rendered as 16 lowercase hex digits, so byte-order
/// comparison of serialized keys equals numeric comparison.
pub fn duplicate_key(source: &str, target: &str) -> String {
    format!("{:016x}", duplicate_key_raw(source, target))
}

/// Tie-break score: mean Unicode code-point value of the unnormalized
/// concatenated pair, 0.0 for empty text. A crude placeholder signal, but
/// it must be reproduced exactly for output compatibility.
pub fn quality_rank(source: &str, target: &str) -> f64 {
    let mut sum: u64 = 0;
    let mut count: u64 = 0;
    for ch in source.chars().chain(target.chars()) {
        sum += ch as u64;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

/// One line of an input corpus, split into the fields the engine cares
/// about. Extra score columns stay inside `line` untouched.
pub struct InputRecord<'a> {
    pub source: &'a str,
    pub target: &'a str,
    pub line: &'a str,
}

impl<'a> InputRecord<'a> {
    /// Parses a data row. Returns `None` when the row has fewer than two
    /// tab-separated fields; the caller decides whether to warn or abort.
    pub fn parse(line: &'a str) -> Option<Self> {
        let mut fields = line.split(FIELD_SEPARATOR);
        let source = fields.next()?;
        let target = fields.next()?;
        Some(Self { source, target, line })
    }
}

/// Working tuple persisted between the extract, sort and collapse stages,
/// serialized as `key<TAB>rank<TAB>originalLine`.
#[derive(Debug, Clone)]
pub struct SpillRecord {
    pub key: String,
    pub rank: f64,
    pub line: String,
}

impl SpillRecord {
    pub fn from_input(record: &InputRecord) -> Self {
        Self {
            key: duplicate_key(record.source, record.target),
            rank: quality_rank(record.source, record.target),
            line: record.line.to_string(),
        }
    }

    pub fn from_spill_line(spill_line: &str) -> Option<Self> {
        let mut parts = spill_line.splitn(3, FIELD_SEPARATOR);
        let key = parts.next()?;
        let rank: f64 = parts.next()?.parse().ok()?;
        let line = parts.next()?;
        Some(Self {
            key: key.to_string(),
            rank,
            line: line.to_string(),
        })
    }

    pub fn to_spill_line(&self) -> String {
        format!(
            "{}{}{:.*}{}{}",
            self.key, FIELD_SEPARATOR, RANK_PRECISION, self.rank, FIELD_SEPARATOR, self.line
        )
    }

    /// Two-column projection of the original row. `None` when the carried
    /// line lost its target field somewhere along the way.
    pub fn output_fields(&self) -> Option<(&str, &str)> {
        let mut fields = self.line.split(FIELD_SEPARATOR);
        let source = fields.next()?;
        let target = fields.next()?;
        Some((source, target))
    }

    /// Composite sort order: key ascending in byte order, then rank
    /// descending. Equal (key, rank) records compare equal so stable sorts
    /// and the merge tie-break preserve input order.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| other.rank.total_cmp(&self.rank))
    }

    pub fn estimated_size(&self) -> usize {
        self.key.len() + self.line.len() + ESTIMATED_RECORD_OVERHEAD_BYTES
    }
}
