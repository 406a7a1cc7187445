use anyhow::{Context, Result};
use bam2fastq::{
    ConvertOptions, Converter, DumpTool, ExhaustedPolicy, FastqSink, OrphanPolicy,
    OutputCompression, OutputSink, ReconcileOptions, RetryPolicy, SamSink,
};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bam2fastq", version)]
#[command(about = "Convert SAM/BAM back to paired reads, split by read group", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// samtools executable used to decode the input
    #[arg(long, global = true, default_value = "samtools")]
    samtools: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write <read_group>.1.fq / <read_group>.2.fq per read group
    Fastq(FastqArgs),
    /// Write de-mapped, unordered SAM pairs to stdout for re-alignment
    Sam(SamArgs),
}

#[derive(Args, Debug)]
struct Common {
    /// Input SAM/BAM file
    input: PathBuf,

    /// Only convert records overlapping this region (e.g. chr1:1000-2000)
    #[arg(long)]
    region: Option<String>,

    /// Pair records with both mates unmapped in a sorted pass at the end
    #[arg(long)]
    collect_unmapped: bool,

    /// Log progress every N records (0 disables)
    #[arg(long, default_value_t = 100_000)]
    progress_interval: u64,
}

#[derive(Args, Debug)]
struct FastqArgs {
    #[command(flatten)]
    common: Common,

    /// Output directory
    #[arg(default_value = ".")]
    out_dir: PathBuf,

    /// Gzip the FASTQ files
    #[arg(long)]
    gzip: bool,

    /// gzip level
    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(0..=9))]
    compression_level: u32,

    /// Have samtools drop secondary alignments before they reach the pairing step
    #[arg(long)]
    exclude_secondary: bool,
}

#[derive(Args, Debug)]
struct SamArgs {
    #[command(flatten)]
    common: Common,

    /// Write attempts per pair when the downstream reader disconnects
    #[arg(long, default_value_t = 10)]
    max_retries: u32,

    /// Exit with an error instead of dropping pairs once retries run out
    #[arg(long)]
    fail_on_broken_pipe: bool,
}

fn options(samtools: PathBuf, common: &Common, exclude_secondary: bool) -> ConvertOptions {
    ConvertOptions {
        tool: DumpTool::new(samtools),
        region: common.region.clone(),
        exclude_secondary,
        reconcile: ReconcileOptions {
            orphan_policy: if common.collect_unmapped {
                OrphanPolicy::CollectUnmapped
            } else {
                OrphanPolicy::Discard
            },
            progress_interval: common.progress_interval,
        },
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Fastq(args) => {
            std::fs::create_dir_all(&args.out_dir).with_context(|| {
                format!("creating output directory {}", args.out_dir.display())
            })?;
            let compression = if args.gzip {
                OutputCompression::Gzip(args.compression_level)
            } else {
                OutputCompression::Plain
            };
            let converter = Converter::new(options(
                cli.samtools,
                &args.common,
                args.exclude_secondary,
            ));
            let sink: OutputSink = OutputSink::Fastq(FastqSink::new(&args.out_dir, compression));
            let summary = converter
                .run(&args.common.input, sink)
                .with_context(|| format!("converting {}", args.common.input.display()))?;
            info!(
                "wrote {} pairs into {} files",
                summary.sink.pairs_written,
                summary.sink.files.len()
            );
        }
        Command::Sam(args) => {
            // secondary alignments are always filtered at the source here
            let converter = Converter::new(options(cli.samtools, &args.common, true));
            let retry = RetryPolicy {
                max_attempts: args.max_retries.max(1),
                on_exhausted: if args.fail_on_broken_pipe {
                    ExhaustedPolicy::Fail
                } else {
                    ExhaustedPolicy::Drop
                },
                ..RetryPolicy::default()
            };
            let sink = OutputSink::Sam(SamSink::stdout(retry));
            let summary = converter
                .run(&args.common.input, sink)
                .with_context(|| format!("converting {}", args.common.input.display()))?;
            info!(
                "wrote {} pairs, dropped {}",
                summary.sink.pairs_written, summary.sink.dropped_pairs
            );
        }
    }
    Ok(())
}
