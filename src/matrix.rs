use rustc_hash::FxHashMap;

use crate::interval_index::IntervalIndex;
use crate::rumulet_structs::{FilteredOverlap, Region};

/// Dense region x cell presence grid, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<u8>,
}

impl OverlapMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        OverlapMatrix {
            rows,
            cols,
            cells: vec![0; rows * cols],
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.cells[row * self.cols + col]
    }

    #[inline]
    fn set(&mut self, row: usize, col: usize) {
        self.cells[row * self.cols + col] = 1;
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn n_cols(&self) -> usize {
        self.cols
    }

    pub fn row_sums(&self) -> Vec<u64> {
        if self.cols == 0 {
            return vec![0; self.rows];
        }
        self.cells
            .chunks(self.cols)
            .map(|row| row.iter().map(|&v| u64::from(v)).sum())
            .collect()
    }

    pub fn col_sums(&self) -> Vec<u64> {
        let mut sums = vec![0u64; self.cols];
        if self.cols == 0 {
            return sums;
        }
        for row in self.cells.chunks(self.cols) {
            for (sum, &v) in sums.iter_mut().zip(row) {
                *sum += u64::from(v);
            }
        }
        sums
    }
}

/// Length of one overlap hitting a merged region, and its share of that region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionHit {
    pub length: i64,
    pub fraction: f64,
}

/// Sets (region, cell) for every overlap falling in a union region.
///
/// Columns follow `barcodes`; overlaps from barcodes outside it are skipped.
/// Besides the matrix, each matched region collects the length of every
/// overlap landing in it relative to the region's own length.
pub fn build_overlap_matrix(
    overlaps: &[FilteredOverlap],
    barcodes: &[String],
    union: &[Region],
) -> (OverlapMatrix, FxHashMap<usize, Vec<RegionHit>>) {
    let mut columns: FxHashMap<&str, usize> = FxHashMap::default();
    for (i, barcode) in barcodes.iter().enumerate() {
        columns.entry(barcode.as_str()).or_insert(i);
    }

    let index = IntervalIndex::build(union);
    let mut matrix = OverlapMatrix::zeros(union.len(), barcodes.len());
    let mut region_hits: FxHashMap<usize, Vec<RegionHit>> = FxHashMap::default();

    for overlap in overlaps {
        let Some(&col) = columns.get(overlap.barcode.as_str()) else {
            continue;
        };
        for row in index.query(overlap.chr, overlap.start, overlap.end + 1) {
            matrix.set(row, col);
            let length = overlap.len();
            region_hits.entry(row).or_default().push(RegionHit {
                length,
                fraction: length as f64 / union[row].len() as f64,
            });
        }
    }

    (matrix, region_hits)
}
