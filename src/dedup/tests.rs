#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    use crate::dedup::record::duplicate_key;
    use crate::dedup::{deduplicate_corpus, DedupConfig, DedupProcessor};

    fn test_config(scratch: &Path) -> DedupConfig {
        let mut config = DedupConfig::default();
        config.scratch_directory = scratch.to_path_buf();
        config
    }

    #[test]
    fn surface_variants_collapse_to_best_ranked_row() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.tsv");
        let output = dir.path().join("output.tsv");
        fs::write(
            &input,
            "src\ttgt\n\
             Hello world.\tBonjour monde.\n\
             hello   world\tbonjour monde\n\
             Goodbye.\tAu revoir.\n",
        )
        .unwrap();

        let stats =
            deduplicate_corpus(&input, &output, test_config(dir.path())).unwrap();
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.unique_records, 2);
        assert_eq!(stats.duplicates_removed, 1);

        let content = fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "src\ttgt");
        assert_eq!(lines.len(), 3);
        // The all-lowercase variant has the higher mean code point, so it is
        // the surviving representative of its group.
        assert!(lines.contains(&"hello   world\tbonjour monde"));
        assert!(lines.contains(&"Goodbye.\tAu revoir."));
        assert!(!content.contains("Hello world."));
    }

    #[test]
    fn output_keys_are_unique_and_rows_come_from_input() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.tsv");
        let output = dir.path().join("output.tsv");
        let data_rows = [
            "One.\tUn.",
            "one\tun",
            "ONE!\tUN!",
            "Two.\tDeux.",
            "Three.\tTrois.",
            "two\tdeux\t0.5",
        ];
        fs::write(&input, format!("src\ttgt\n{}\n", data_rows.join("\n"))).unwrap();

        deduplicate_corpus(&input, &output, test_config(dir.path())).unwrap();

        let content = fs::read_to_string(&output).unwrap();
        let mut seen_keys = HashSet::new();
        for line in content.lines().skip(1) {
            let mut fields = line.split('\t');
            let source = fields.next().unwrap();
            let target = fields.next().unwrap();
            assert!(fields.next().is_none(), "output must have exactly two columns");

            assert!(
                seen_keys.insert(duplicate_key(source, target)),
                "duplicate key in output: {}",
                line
            );
            assert!(
                data_rows
                    .iter()
                    .any(|row| row.starts_with(&format!("{}\t{}", source, target))),
                "output row not present in input: {}",
                line
            );
        }
        assert_eq!(seen_keys.len(), 3);
    }

    #[test]
    fn rank_ties_keep_earliest_input_row() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.tsv");
        let output = dir.path().join("output.tsv");
        // Same normalized key, and the punctuation swap keeps the code-point
        // multiset identical, so the ranks tie exactly.
        fs::write(&input, "src\ttgt\nab.\tcd,\nab,\tcd.\n").unwrap();

        let stats =
            deduplicate_corpus(&input, &output, test_config(dir.path())).unwrap();
        assert_eq!(stats.unique_records, 1);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "src\ttgt\nab.\tcd,\n"
        );
    }

    #[test]
    fn malformed_rows_are_dropped_without_aborting() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.tsv");
        let output = dir.path().join("output.tsv");
        fs::write(&input, "src\ttgt\nonly one field\na\tb\n").unwrap();

        let stats =
            deduplicate_corpus(&input, &output, test_config(dir.path())).unwrap();
        assert_eq!(stats.malformed_skipped, 1);
        assert_eq!(stats.unique_records, 1);

        let content = fs::read_to_string(&output).unwrap();
        assert!(!content.contains("only one field"));
        assert!(content.contains("a\tb"));
    }

    #[test]
    fn header_only_input_produces_header_only_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.tsv");
        let output = dir.path().join("output.tsv");
        fs::write(&input, "source_text\ttarget_text\n").unwrap();

        let stats =
            deduplicate_corpus(&input, &output, test_config(dir.path())).unwrap();
        assert_eq!(stats.total_records, 0);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "source_text\ttarget_text\n"
        );
    }

    #[test]
    fn deduplication_is_idempotent() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.tsv");
        let once = dir.path().join("once.tsv");
        let twice = dir.path().join("twice.tsv");
        fs::write(
            &input,
            "src\ttgt\n\
             Hello world.\tBonjour monde.\n\
             hello   world\tbonjour monde\n\
             Goodbye.\tAu revoir.\n\
             Goodbye.\tAu revoir.\n",
        )
        .unwrap();

        deduplicate_corpus(&input, &once, test_config(dir.path())).unwrap();
        let second_stats =
            deduplicate_corpus(&once, &twice, test_config(dir.path())).unwrap();

        assert_eq!(second_stats.duplicates_removed, 0);
        assert_eq!(
            fs::read_to_string(&once).unwrap(),
            fs::read_to_string(&twice).unwrap()
        );
    }

    #[test]
    fn empty_input_is_a_fatal_error() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.tsv");
        let output = dir.path().join("output.tsv");
        fs::write(&input, "").unwrap();

        let result = deduplicate_corpus(&input, &output, test_config(dir.path()));
        assert!(result.is_err());
    }

    #[test]
    fn duplicates_sink_captures_dropped_rows() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.tsv");
        let output = dir.path().join("output.tsv");
        let dupes = dir.path().join("dupes.tsv");
        fs::write(&input, "src\ttgt\na\tb\na\tb\nc\td\n").unwrap();

        let processor = DedupProcessor::new(test_config(dir.path())).unwrap();
        let stats = processor.run(&input, &output, Some(&dupes)).unwrap();
        assert_eq!(stats.duplicates_removed, 1);
        assert_eq!(fs::read_to_string(&dupes).unwrap(), "a\tb\n");
    }

    #[test]
    fn scratch_directory_is_reclaimed_after_the_run() {
        let dir = tempdir().unwrap();
        let scratch_root = dir.path().join("scratch");
        let input = dir.path().join("input.tsv");
        let output = dir.path().join("output.tsv");
        fs::write(&input, "src\ttgt\na\tb\n").unwrap();

        let mut config = DedupConfig::default();
        config.scratch_directory = scratch_root.clone();
        deduplicate_corpus(&input, &output, config).unwrap();

        let leftovers: Vec<_> = fs::read_dir(&scratch_root).unwrap().collect();
        assert!(leftovers.is_empty(), "spill files must not outlive the run");
    }

    #[test]
    fn scratch_directory_is_reclaimed_on_failure() {
        let dir = tempdir().unwrap();
        let scratch_root = dir.path().join("scratch");
        let input = dir.path().join("missing.tsv");
        let output = dir.path().join("output.tsv");

        let mut config = DedupConfig::default();
        config.scratch_directory = scratch_root.clone();
        assert!(deduplicate_corpus(&input, &output, config).is_err());

        let leftovers: Vec<_> = fs::read_dir(&scratch_root).unwrap().collect();
        assert!(leftovers.is_empty());
    }
}
