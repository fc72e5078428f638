use std::time::Instant;

use log::{debug, info};

use crate::config::InferenceConfig;
use crate::errors::Result;
use crate::interval_index::{overlap_flags, IntervalIndex};
use crate::matrix::build_overlap_matrix;
use crate::merge::union_regions;
use crate::repeats::{filter_min_length, split_repeat_overlaps};
use crate::rumulet_structs::{ClassificationRecord, FilteredOverlap, OverlapSegment, Region};
use crate::stats::classify_counts;

/// Everything downstream reporting needs from one inference run.
#[derive(Debug, Clone)]
pub struct MultipletReport {
    /// Column ids: the cell barcodes, in the order they were given.
    pub cells: Vec<String>,
    /// Row ids of `repeat_records`: the union of the filtered overlaps.
    pub union_regions: Vec<Region>,
    pub repeat_records: Vec<ClassificationRecord>,
    /// One record per entry of `cells`.
    pub multiplet_records: Vec<ClassificationRecord>,
    pub input_segments: usize,
    pub filtered_segments: usize,
    pub q_threshold: f64,
    pub q_repeat_threshold: f64,
}

impl MultipletReport {
    pub fn repetitive_regions(&self) -> Vec<Region> {
        self.repeat_records
            .iter()
            .filter(|r| r.is_positive(self.q_repeat_threshold))
            .map(|r| self.union_regions[r.idx])
            .collect()
    }

    pub fn multiplets(&self) -> Vec<&str> {
        self.multiplet_records
            .iter()
            .filter(|r| r.is_positive(self.q_threshold))
            .map(|r| self.cells[r.idx].as_str())
            .collect()
    }

    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn n_union_regions(&self) -> usize {
        self.union_regions.len()
    }

    pub fn n_multiplets(&self) -> usize {
        self.multiplet_records
            .iter()
            .filter(|r| r.is_positive(self.q_threshold))
            .count()
    }

    pub fn multiplet_percent(&self) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        self.n_multiplets() as f64 * 100.0 / self.cells.len() as f64
    }

    pub fn removed_segments(&self) -> usize {
        self.input_segments.saturating_sub(self.filtered_segments)
    }
}

/// Separates multiplet signal from repeat artifacts.
///
/// 1. Reads in known repeats are removed and segments re-swept; short
///    segments are dropped.
/// 2. The union of what is left forms the rows of a region x cell matrix.
///    Rows with unexpectedly many cells are called repetitive.
/// 3. Segments touching a repetitive row are removed, the matrix is rebuilt,
///    and cells with unexpectedly many regions are called multiplets.
pub fn infer_multiplets(
    segments: &[OverlapSegment],
    cells: &[String],
    known_repeats: &[Region],
    config: &InferenceConfig,
) -> Result<MultipletReport> {
    config.validate()?;
    let start = Instant::now();

    let repeats = union_regions(&[known_repeats]);
    let repeat_index = IntervalIndex::build(&repeats);
    debug!("Known repeats collapse into {} regions", repeats.len());

    let filtered = split_repeat_overlaps(segments, &repeat_index, config.expected_overlap);
    let filtered = filter_min_length(filtered, config.min_overlap_length);
    let removed = segments.len().saturating_sub(filtered.len());
    let removed_percent = if segments.is_empty() {
        0.0
    } else {
        100.0 * removed as f64 / segments.len() as f64
    };
    info!("Number of regions filtered: {} ({:.4}%)", removed, removed_percent);

    info!("Detecting multiplets.");
    let regions: Vec<Region> = filtered.iter().map(FilteredOverlap::region).collect();
    let union = union_regions(&[regions.as_slice()]);
    let (matrix, _) = build_overlap_matrix(&filtered, cells, &union);
    let repeat_records = classify_counts(&matrix.row_sums())?;

    let repetitive: Vec<Region> = repeat_records
        .iter()
        .filter(|r| r.is_positive(config.q_repeat_threshold))
        .map(|r| union[r.idx])
        .collect();
    info!("Inferred {} repetitive regions", repetitive.len());

    let touches_repeat = overlap_flags(&regions, &repetitive);
    let kept: Vec<FilteredOverlap> = filtered
        .iter()
        .zip(touches_repeat)
        .filter(|(_, hit)| !hit)
        .map(|(o, _)| o.clone())
        .collect();
    let kept_regions: Vec<Region> = kept.iter().map(FilteredOverlap::region).collect();
    let kept_union = union_regions(&[kept_regions.as_slice()]);
    let (kept_matrix, _) = build_overlap_matrix(&kept, cells, &kept_union);
    let multiplet_records = classify_counts(&kept_matrix.col_sums())?;

    debug!("Inference finished in {:?}", start.elapsed());

    Ok(MultipletReport {
        cells: cells.to_vec(),
        union_regions: union,
        repeat_records,
        multiplet_records,
        input_segments: segments.len(),
        filtered_segments: filtered.len(),
        q_threshold: config.q_threshold,
        q_repeat_threshold: config.q_repeat_threshold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(chr: i64, start: i64, end: i64, barcode: &str) -> OverlapSegment {
        OverlapSegment {
            chr,
            start,
            end,
            min_depth: 3,
            max_depth: 3,
            read_starts: vec![start - 5, start - 2, start],
            read_ends: vec![end, end + 3, end + 6],
            barcode: barcode.to_string(),
            mapq: None,
        }
    }

    fn cells(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("cell{i}")).collect()
    }

    #[test]
    fn empty_input_reports_nothing() {
        let report = infer_multiplets(&[], &[], &[], &InferenceConfig::default()).unwrap();
        assert_eq!(report.n_cells(), 0);
        assert_eq!(report.n_union_regions(), 0);
        assert_eq!(report.n_multiplets(), 0);
        assert_eq!(report.multiplet_percent(), 0.0);
        assert!(report.repeat_records.is_empty());
        assert!(report.multiplet_records.is_empty());
    }

    #[test]
    fn cells_without_overlaps_get_a_record_each() {
        let report = infer_multiplets(&[], &cells(3), &[], &InferenceConfig::default()).unwrap();
        assert_eq!(report.multiplet_records.len(), 3);
        assert!(report.multiplet_records.iter().all(|r| r.raw_p == 1.0));
        assert_eq!(report.n_multiplets(), 0);
    }

    #[test]
    fn a_cell_with_many_private_overlaps_is_a_multiplet() {
        let cells = cells(100);
        let mut segments = Vec::new();
        // Every cell has one private overlap; cell7 has forty.
        for (i, cell) in cells.iter().enumerate() {
            let base = 1_000 + 1_000 * i as i64;
            segments.push(segment(0, base, base + 50, cell));
        }
        for k in 0..40 {
            let base = 1_000_000 + 1_000 * k;
            segments.push(segment(0, base, base + 50, "cell7"));
        }

        let report = infer_multiplets(&segments, &cells, &[], &InferenceConfig::default()).unwrap();
        assert_eq!(report.multiplets(), vec!["cell7"]);
        assert_eq!(report.n_multiplets(), 1);
        assert!((report.multiplet_percent() - 1.0).abs() < 1e-12);
        assert_eq!(report.n_union_regions(), 140);
        assert!(report.repetitive_regions().is_empty());
    }

    #[test]
    fn a_region_shared_by_most_cells_is_repetitive_and_removed() {
        let cells = cells(60);
        let mut segments = Vec::new();
        for (i, cell) in cells.iter().enumerate() {
            // Shared hot spot in every cell.
            segments.push(segment(0, 500, 560, cell));
            let base = 10_000 + 1_000 * i as i64;
            segments.push(segment(0, base, base + 40, cell));
        }
        for k in 0..30 {
            let base = 5_000_000 + 1_000 * k;
            segments.push(segment(0, base, base + 40, "cell3"));
        }

        let report = infer_multiplets(&segments, &cells, &[], &InferenceConfig::default()).unwrap();
        assert_eq!(report.repetitive_regions(), vec![Region::new(0, 500, 560)]);
        assert_eq!(report.multiplets(), vec!["cell3"]);
    }

    #[test]
    fn known_repeats_remove_supporting_reads() {
        let cells = cells(2);
        let segments = vec![segment(0, 100, 200, "cell0"), segment(0, 100, 200, "cell1")];
        let repeats = vec![Region::new(0, 1, 100)];
        let report = infer_multiplets(&segments, &cells, &repeats, &InferenceConfig::default()).unwrap();
        assert_eq!(report.filtered_segments, 0);
        assert_eq!(report.removed_segments(), 2);
        assert_eq!(report.n_union_regions(), 0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = InferenceConfig {
            q_threshold: 2.0,
            ..InferenceConfig::default()
        };
        assert!(infer_multiplets(&[], &[], &[], &cfg).is_err());
    }
}
