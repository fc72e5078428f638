use rustc_hash::FxHashSet;

use crate::interval_index::IntervalIndex;
use crate::overlaps::sweep_depth_segments;
use crate::rumulet_structs::{FilteredOverlap, OverlapSegment};

/// Re-derives overlap segments once reads falling in known repeats are removed.
///
/// Per segment, each distinct (start, end) read is tested against `repeats`
/// and kept only if it touches none. When every constituent read survives the
/// segment is kept as is. Otherwise the survivors are swept again with the
/// same threshold if there are more than `expected_overlap` of them, which may
/// split the segment into narrower pieces; if not, the segment is dropped.
/// Duplicate reads count as removed, so a segment built from repeated
/// fragments is always re-swept.
pub fn split_repeat_overlaps(
    segments: &[OverlapSegment],
    repeats: &IntervalIndex,
    expected_overlap: usize,
) -> Vec<FilteredOverlap> {
    let mut kept = Vec::with_capacity(segments.len());

    for segment in segments {
        let mut observed: FxHashSet<(i64, i64)> = FxHashSet::default();
        let mut starts = Vec::with_capacity(segment.read_starts.len());
        let mut ends = Vec::with_capacity(segment.read_ends.len());

        for (&start, &end) in segment.read_starts.iter().zip(&segment.read_ends) {
            if !observed.insert((start, end)) {
                continue;
            }
            if !repeats.overlaps_any(segment.chr, start, end) {
                starts.push(start);
                ends.push(end);
            }
        }

        if starts.len() == segment.read_starts.len() {
            kept.push(FilteredOverlap {
                chr: segment.chr,
                start: segment.start,
                end: segment.end,
                barcode: segment.barcode.clone(),
            });
        } else if starts.len() > expected_overlap {
            for d in sweep_depth_segments(&starts, &ends, expected_overlap as i64) {
                kept.push(FilteredOverlap {
                    chr: segment.chr,
                    start: d.start,
                    end: d.end,
                    barcode: segment.barcode.clone(),
                });
            }
        }
    }

    kept
}

/// Drops overlaps spanning fewer than `min_length` bases.
pub fn filter_min_length(overlaps: Vec<FilteredOverlap>, min_length: i64) -> Vec<FilteredOverlap> {
    overlaps.into_iter().filter(|o| o.len() >= min_length).collect()
}
