//! File-to-file drivers behind the `count` and `detect` commands.

use std::fs;
use std::path::Path;
use std::time::Instant;

use log::{debug, info};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::chromosomes::ChromosomeCodes;
use crate::config::{CounterConfig, InferenceConfig};
use crate::errors::Result;
use crate::io::{
    read_bed_regions, read_cell_barcodes, read_chromosome_list, read_overlap_summary,
    read_overlap_table, write_multiplet_report, write_overlap_summary, write_run_statistics,
    FragmentReader, OverlapWriter,
};
use crate::multiplets::{infer_multiplets, MultipletReport};
use crate::stream::{OverlapCounter, RunStatistics};

const PROGRESS_INTERVAL: usize = 10_000_000;

/// What a counting run found, beyond the files it wrote.
#[derive(Debug, Clone)]
pub struct CountSummary {
    pub cells: usize,
    pub overlaps: u64,
    pub statistics: RunStatistics,
}

/// Streams a sorted fragment file and writes `Overlaps.txt`,
/// `OverlapSummary.txt` and `StatSummary.txt` into `outdir`.
pub fn run_count(
    fragments: &Path,
    single_cell_csv: &Path,
    chromosome_list: &Path,
    outdir: &Path,
    config: &CounterConfig,
) -> Result<CountSummary> {
    config.validate()?;
    fs::create_dir_all(outdir)?;

    let cells = read_cell_barcodes(single_cell_csv)?;
    info!("Read {} cell barcodes", cells.len());

    let mut chromosomes = ChromosomeCodes::new();
    let allowed: FxHashSet<i64> = read_chromosome_list(chromosome_list)?
        .iter()
        .map(|name| chromosomes.encode(name))
        .collect();
    info!("Counting overlaps on {} chromosomes", allowed.len());

    let start = Instant::now();
    let mut counter = OverlapCounter::new(cells, Some(allowed), config.clone());
    let mut reader = FragmentReader::from_path(fragments, chromosomes, config.clone())?;
    let mut writer = OverlapWriter::create(&outdir.join("Overlaps.txt"))?;
    let mut overlaps: u64 = 0;
    let mut next_report = PROGRESS_INTERVAL;

    while let Some(read) = reader.next() {
        let read = read?;
        for segment in counter.push(&read) {
            writer.write_segment(&segment, reader.chromosomes())?;
            overlaps += 1;
        }
        if reader.lines_read() >= next_report {
            info!("Processed {} reads", reader.lines_read());
            next_report += PROGRESS_INTERVAL;
        }
    }
    for segment in counter.finish() {
        writer.write_segment(&segment, reader.chromosomes())?;
        overlaps += 1;
    }
    writer.finish()?;
    debug!("Overlap counting took {:?}", start.elapsed());

    write_overlap_summary(
        &outdir.join("OverlapSummary.txt"),
        counter.barcodes(),
        counter.cell_counts(),
    )?;
    let statistics = counter.statistics().clone();
    write_run_statistics(
        &outdir.join("StatSummary.txt"),
        &statistics,
        counter.barcodes().len(),
    )?;

    info!(
        "Found {} overlaps in {} valid of {} total reads",
        overlaps, statistics.valid_reads, statistics.total_reads
    );

    Ok(CountSummary {
        cells: counter.barcodes().len(),
        overlaps,
        statistics,
    })
}

/// Reads the outputs of [`run_count`], infers repetitive regions and
/// multiplets, and writes the report files into `outdir`.
pub fn run_detect(
    overlap_table: &Path,
    overlap_summary: &Path,
    repeats: Option<&Path>,
    outdir: &Path,
    config: &InferenceConfig,
) -> Result<MultipletReport> {
    config.validate()?;
    fs::create_dir_all(outdir)?;

    let mut chromosomes = ChromosomeCodes::new();
    info!("Loading overlaps.");
    let segments = read_overlap_table(overlap_table, &mut chromosomes)?;
    let pairs = read_overlap_summary(overlap_summary)?;
    let known_repeats = match repeats {
        Some(path) => read_bed_regions(path, &mut chromosomes)?,
        None => Vec::new(),
    };
    info!(
        "Loaded {} overlaps, {} cells and {} known repeat regions",
        segments.len(),
        pairs.len(),
        known_repeats.len()
    );

    let cells: Vec<String> = pairs.iter().map(|(cell, _)| cell.clone()).collect();
    let barcodes: FxHashMap<String, String> = pairs.into_iter().collect();

    let report = infer_multiplets(&segments, &cells, &known_repeats, config)?;
    write_multiplet_report(outdir, &report, &barcodes, &chromosomes)?;

    info!(
        "Identified {} multiplets among {} cells ({:.2}%)",
        report.n_multiplets(),
        report.n_cells(),
        report.multiplet_percent()
    );
    Ok(report)
}
