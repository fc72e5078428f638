use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::CounterConfig;
use crate::overlaps::detect_overlaps;
use crate::rumulet_structs::{OverlapSegment, Read};

/// Running state of one barcode: the reads of the current group and the
/// furthest end seen so far.
#[derive(Debug, Clone)]
pub struct BarcodeState {
    starts: Vec<i64>,
    ends: Vec<i64>,
    mapqs: Vec<Option<u32>>,
    previous_end: i64,
}

impl Default for BarcodeState {
    fn default() -> Self {
        BarcodeState {
            starts: Vec::new(),
            ends: Vec::new(),
            mapqs: Vec::new(),
            previous_end: i64::MIN,
        }
    }
}

impl BarcodeState {
    fn push(&mut self, read: &Read) {
        self.starts.push(read.start);
        self.ends.push(read.end);
        self.mapqs.push(read.mapq);
    }

    fn reset(&mut self) {
        self.starts.clear();
        self.ends.clear();
        self.mapqs.clear();
        self.previous_end = i64::MIN;
    }
}

/// Per-cell counters reported once the stream is done.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellCounts {
    pub total_reads: u64,
    pub valid_reads: u64,
    pub overlaps: u64,
}

/// Whole-run counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStatistics {
    pub total_reads: u64,
    pub valid_reads: u64,
    pub low_mapq_reads: u64,
    pub insert_size_sum: i64,
    pub groups: u64,
    pub group_size_sum: u64,
    pub max_group_size: usize,
}

impl RunStatistics {
    pub fn mean_group_size(&self) -> f64 {
        if self.groups == 0 {
            0.0
        } else {
            self.group_size_sum as f64 / self.groups as f64
        }
    }

    pub fn mean_insert_size(&self) -> f64 {
        if self.valid_reads == 0 {
            0.0
        } else {
            self.insert_size_sum as f64 / self.valid_reads as f64
        }
    }
}

/// Streams chromosome/start sorted reads and emits per-barcode overlap segments.
///
/// Only barcodes in the universe are tracked. Each barcode keeps a group of
/// reads that chain into each other; once a read starts past the group's
/// furthest end the group can gain no more overlaps and is swept. All groups
/// are swept when the chromosome changes and when [`OverlapCounter::finish`]
/// is called.
#[derive(Debug)]
pub struct OverlapCounter {
    config: CounterConfig,
    barcodes: Vec<String>,
    barcode_ids: FxHashMap<String, usize>,
    allowed_chromosomes: Option<FxHashSet<i64>>,
    states: Vec<BarcodeState>,
    counts: Vec<CellCounts>,
    current_chr: Option<i64>,
    stats: RunStatistics,
}

impl OverlapCounter {
    /// `allowed_chromosomes` of `None` accepts every chromosome.
    pub fn new(
        barcodes: Vec<String>,
        allowed_chromosomes: Option<FxHashSet<i64>>,
        config: CounterConfig,
    ) -> Self {
        let mut barcode_ids = FxHashMap::default();
        for (i, barcode) in barcodes.iter().enumerate() {
            barcode_ids.entry(barcode.clone()).or_insert(i);
        }
        let n = barcodes.len();
        OverlapCounter {
            config,
            barcodes,
            barcode_ids,
            allowed_chromosomes,
            states: vec![BarcodeState::default(); n],
            counts: vec![CellCounts::default(); n],
            current_chr: None,
            stats: RunStatistics::default(),
        }
    }

    /// Consumes one read and returns the segments it caused to be finalised.
    pub fn push(&mut self, read: &Read) -> Vec<OverlapSegment> {
        let mut emitted = Vec::new();
        self.stats.total_reads += 1;

        let Some(&cell) = self.barcode_ids.get(&read.barcode) else {
            return emitted;
        };
        self.counts[cell].total_reads += 1;

        if read.insert_size() > self.config.max_insert_size {
            return emitted;
        }
        if let Some(allowed) = &self.allowed_chromosomes {
            if !allowed.contains(&read.chr) {
                return emitted;
            }
        }
        if let (Some(limit), Some(mapq)) = (self.config.max_low_mapq, read.mapq) {
            if mapq <= limit {
                self.stats.low_mapq_reads += 1;
                return emitted;
            }
        }

        self.counts[cell].valid_reads += 1;
        self.stats.valid_reads += 1;
        self.stats.insert_size_sum += read.insert_size();

        if self.current_chr != Some(read.chr) {
            if let Some(chr) = self.current_chr {
                debug!("Chromosome {} finished, sweeping all barcodes", chr);
            }
            emitted.extend(self.flush_all());
            self.current_chr = Some(read.chr);
        }

        if self.states[cell].previous_end < read.start {
            emitted.extend(self.flush(cell));
        }
        let state = &mut self.states[cell];
        state.push(read);
        state.previous_end = state.previous_end.max(read.end);

        emitted
    }

    /// Sweeps every pending group at the end of the stream.
    pub fn finish(&mut self) -> Vec<OverlapSegment> {
        let emitted = self.flush_all();
        self.current_chr = None;
        emitted
    }

    fn flush_all(&mut self) -> Vec<OverlapSegment> {
        let mut emitted = Vec::new();
        for cell in 0..self.states.len() {
            emitted.extend(self.flush(cell));
            self.states[cell].reset();
        }
        emitted
    }

    fn flush(&mut self, cell: usize) -> Vec<OverlapSegment> {
        let state = &mut self.states[cell];
        if state.starts.is_empty() {
            return Vec::new();
        }
        let Some(chr) = self.current_chr else {
            state.reset();
            return Vec::new();
        };

        self.stats.groups += 1;
        self.stats.group_size_sum += state.starts.len() as u64;
        self.stats.max_group_size = self.stats.max_group_size.max(state.starts.len());

        let segments = detect_overlaps(
            chr,
            &state.starts,
            &state.ends,
            &state.mapqs,
            &self.barcodes[cell],
            self.config.expected_overlap,
        );
        self.counts[cell].overlaps += segments.len() as u64;

        state.starts.clear();
        state.ends.clear();
        state.mapqs.clear();

        segments
    }

    pub fn barcodes(&self) -> &[String] {
        &self.barcodes
    }

    pub fn cell_counts(&self) -> &[CellCounts] {
        &self.counts
    }

    pub fn statistics(&self) -> &RunStatistics {
        &self.stats
    }
}
