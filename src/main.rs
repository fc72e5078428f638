use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use rumulet::config::{CounterConfig, InferenceConfig};
use rumulet::pipeline::{run_count, run_detect};

/// Multiplet detection for single-cell ATAC-seq from per-cell read overlaps.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream a sorted fragment file and find regions where a cell has more
    /// reads stacked than expected.
    Count {
        /// Fragment file (chr, start, end, barcode), optionally gzipped
        fragments: PathBuf,
        /// Single-cell CSV with `barcode` and `is__cell_barcode` columns
        single_cell: PathBuf,
        /// Chromosomes to use, one per line
        chromosomes: PathBuf,
        /// Output directory
        outdir: PathBuf,
        #[arg(long, default_value_t = 2)]
        expected_overlap: usize,
        #[arg(long, default_value_t = 900)]
        max_insert_size: i64,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        start_offset: i64,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        end_offset: i64,
        /// 1-based fragment column holding the read's mapping quality
        #[arg(long)]
        mapq_column: Option<usize>,
        /// Skip reads with mapping quality at or below this (needs --mapq-column)
        #[arg(long)]
        max_low_mapq: Option<u32>,
    },
    /// Infer repetitive regions and multiplets from the output of `count`.
    Detect {
        /// Overlaps.txt written by `count`
        overlaps: PathBuf,
        /// OverlapSummary.txt written by `count`
        summary: PathBuf,
        /// Output directory
        outdir: PathBuf,
        /// BED file of known repeats to filter out first
        #[arg(long)]
        repeats: Option<PathBuf>,
        #[arg(long, default_value_t = 0.01)]
        q: f64,
        #[arg(long, default_value_t = 0.01)]
        q_repeat: f64,
        #[arg(long, default_value_t = 2)]
        expected_overlap: usize,
        #[arg(long, default_value_t = 1)]
        min_overlap: i64,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Command::Count {
            fragments,
            single_cell,
            chromosomes,
            outdir,
            expected_overlap,
            max_insert_size,
            start_offset,
            end_offset,
            mapq_column,
            max_low_mapq,
        } => {
            let config = CounterConfig {
                expected_overlap,
                max_insert_size,
                start_offset,
                end_offset,
                max_low_mapq,
                mapq_column,
            };
            let summary = run_count(&fragments, &single_cell, &chromosomes, &outdir, &config)
                .with_context(|| format!("counting overlaps in {}", fragments.display()))?;
            info!(
                "{} cells, {} overlaps, mean insert size {:.1}",
                summary.cells,
                summary.overlaps,
                summary.statistics.mean_insert_size()
            );
        }
        Command::Detect {
            overlaps,
            summary,
            outdir,
            repeats,
            q,
            q_repeat,
            expected_overlap,
            min_overlap,
        } => {
            let config = InferenceConfig {
                q_threshold: q,
                q_repeat_threshold: q_repeat,
                expected_overlap,
                min_overlap_length: min_overlap,
            };
            let report = run_detect(&overlaps, &summary, repeats.as_deref(), &outdir, &config)
                .with_context(|| format!("detecting multiplets from {}", overlaps.display()))?;
            info!(
                "Number of cells: {}, merged regions: {}, multiplets: {} ({:.2}%)",
                report.n_cells(),
                report.n_union_regions(),
                report.n_multiplets(),
                report.multiplet_percent()
            );
        }
    }

    Ok(())
}
