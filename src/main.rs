use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use bitext_sift::dedup::{DedupConfig, DedupProcessor, ExclusionFilter};

#[derive(Parser)]
#[command(name = "bitext-sift")]
#[command(about = "🧹 Bitext Sift - External-sort deduplicator for bilingual sentence-pair corpora")]
#[command(version)]
struct Args {
    #[arg(short, long, help = "Input TSV corpus (header + source/target columns)")]
    input: PathBuf,

    #[arg(short, long, help = "Output file for the deduplicated corpus")]
    output: PathBuf,

    #[arg(short, long, help = "Configuration file (JSON); created with defaults if missing")]
    config: Option<PathBuf>,

    #[arg(long, help = "Also write dropped duplicate rows to this file")]
    duplicates: Option<PathBuf>,

    #[arg(long, help = "Drop rows already present in this reference corpus instead of self-deduplicating")]
    exclude: Option<PathBuf>,

    #[arg(long, help = "Scratch directory override for spill files")]
    temp_dir: Option<PathBuf>,

    #[arg(short, long, help = "Verbose output")]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        if args.verbose { "debug" } else { "info" },
    ))
    .init();

    let mut config = match &args.config {
        Some(path) if path.exists() => DedupConfig::from_file(path)?,
        Some(path) => {
            println!("📄 Config file not found, creating default: {}", path.display());
            let default_config = DedupConfig::default();
            default_config.to_file(path)?;
            default_config
        }
        None => DedupConfig::default(),
    };

    if args.verbose {
        config.verbose = true;
    }
    if let Some(temp_dir) = args.temp_dir {
        config.scratch_directory = temp_dir;
    }

    if !args.input.exists() {
        anyhow::bail!("Input corpus does not exist: {}", args.input.display());
    }
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    println!("🔍 Input: {}", args.input.display());
    println!("📝 Output: {}", args.output.display());

    let start_time = Instant::now();

    if let Some(exclude) = &args.exclude {
        let filter = ExclusionFilter::from_corpus(exclude, config.io_buffer_size_bytes())?;
        let stats = filter.filter(&args.input, &args.output, config.io_buffer_size_bytes())?;

        println!("\n🎉 Exclusion dedup completed!");
        println!("🔑 Reference keys: {}", stats.reference_keys);
        println!("✨ Records kept: {}", stats.records_kept);
        println!("🗑️ Records excluded: {}", stats.records_excluded);
        println!("⚠️ Malformed lines skipped: {}", stats.malformed_skipped);
        println!("⏱️ Total time: {:.2}s", start_time.elapsed().as_secs_f64());
        return Ok(());
    }

    let processor = DedupProcessor::new(config)?;
    let stats = processor.run(&args.input, &args.output, args.duplicates.as_deref())?;
    let total_time = start_time.elapsed();

    println!("\n🎉 Deduplication completed!");
    println!("📊 Total records: {}", stats.total_records);
    println!("✨ Unique records: {}", stats.unique_records);
    println!(
        "🗑️ Duplicates removed: {} ({:.2}%)",
        stats.duplicates_removed,
        100.0 * stats.duplicates_removed as f64 / stats.total_records.max(1) as f64
    );
    println!("⚠️ Malformed lines skipped: {}", stats.malformed_skipped);
    println!("📦 Chunks created: {}", stats.chunks_created);
    println!("⏱️ Total time: {:.2}s", total_time.as_secs_f64());

    let throughput = stats.total_records as f64 / total_time.as_secs_f64().max(f64::EPSILON);
    println!("🔄 Throughput: {:.0} records/sec", throughput);

    Ok(())
}
