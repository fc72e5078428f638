use rustc_hash::FxHashMap;

use crate::rumulet_structs::{IndexedStart, Region};
use crate::sorts;

/// Start-sorted lookup over a fixed region set.
///
/// A query bisects to a region whose start is close to the query start and
/// then scans forward while region starts are below the query end. Regions
/// that start well before that point are not revisited, so a long region
/// sitting in front of a dense cluster can be missed; counts built on top of
/// this index are defined with that behaviour.
#[derive(Debug, Default, Clone)]
pub struct IntervalIndex {
    starts: FxHashMap<i64, Vec<IndexedStart>>,
}

impl IntervalIndex {
    pub fn build(regions: &[Region]) -> Self {
        IntervalIndex {
            starts: sorts::build_chromosome_start_sorted(regions),
        }
    }

    /// Indices (into the slice given to [`IntervalIndex::build`]) of the regions
    /// overlapping `[start, end]`.
    ///
    /// Only regions starting strictly before `end` are visited. Callers that
    /// want a region starting exactly at `end` to count pass `end + 1`.
    pub fn query(&self, chr: i64, start: i64, end: i64) -> Vec<usize> {
        let mut hits = Vec::new();
        let Some(sorted) = self.starts.get(&chr) else {
            return hits;
        };

        let mut idx = bisect_start(sorted, start);
        while idx < sorted.len() && end > sorted[idx].start {
            let candidate = &sorted[idx];
            if start <= candidate.end && end >= candidate.start {
                hits.push(candidate.idx);
            }
            idx += 1;
        }

        hits
    }

    pub fn overlaps_any(&self, chr: i64, start: i64, end: i64) -> bool {
        !self.query(chr, start, end).is_empty()
    }

    pub fn len(&self) -> usize {
        self.starts.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.values().all(Vec::is_empty)
    }
}

/// Narrows `[s, e)` until one slot is left or an exact start match is hit.
fn bisect_start(sorted: &[IndexedStart], start: i64) -> usize {
    let mut s = 0;
    let mut e = sorted.len();
    while e - s > 1 {
        let mi = s + (e - s) / 2;
        let mstart = sorted[mi].start;
        if mstart < start {
            s = mi;
        } else if mstart > start {
            e = mi;
        } else {
            s = mi;
            e = mi;
        }
    }
    s
}

/// For each region in `regions`, whether it overlaps any region of `set`.
pub fn overlap_flags(regions: &[Region], set: &[Region]) -> Vec<bool> {
    let index = IntervalIndex::build(set);
    regions
        .iter()
        .map(|r| index.overlaps_any(r.chr, r.start, r.end))
        .collect()
}

/// How many of `sets` each region overlaps, plus the per-set flags
/// (`flags[i][j]` is region `i` against set `j`).
pub fn overlap_counts(regions: &[Region], sets: &[&[Region]]) -> (Vec<usize>, Vec<Vec<bool>>) {
    let mut counts = vec![0usize; regions.len()];
    let mut flags = vec![vec![false; sets.len()]; regions.len()];

    for (j, set) in sets.iter().enumerate() {
        for (i, hit) in overlap_flags(regions, set).into_iter().enumerate() {
            if hit {
                counts[i] += 1;
                flags[i][j] = true;
            }
        }
    }

    (counts, flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn regions() -> Vec<Region> {
        vec![
            Region::new(0, 100, 200),
            Region::new(0, 10, 50),
            Region::new(0, 300, 400),
            Region::new(1, 10, 20),
        ]
    }

    #[rstest]
    #[case(0, 40, 120, vec![1, 0])]
    #[case(0, 201, 299, vec![])]
    #[case(0, 200, 201, vec![0])]
    #[case(1, 15, 16, vec![3])]
    #[case(0, 50, 51, vec![1])]
    fn query_finds_overlapping_regions(
        #[case] chr: i64,
        #[case] start: i64,
        #[case] end: i64,
        #[case] expected: Vec<usize>,
    ) {
        let index = IntervalIndex::build(&regions());
        let mut hits = index.query(chr, start, end);
        hits.sort();
        let mut expected = expected;
        expected.sort();
        assert_eq!(hits, expected);
    }

    #[test]
    fn query_on_unknown_chromosome_is_empty() {
        let index = IntervalIndex::build(&regions());
        assert!(index.query(9, 1, 1_000).is_empty());
        assert!(IntervalIndex::build(&[]).query(0, 1, 2).is_empty());
    }

    #[test]
    fn region_starting_at_query_end_needs_end_plus_one() {
        let index = IntervalIndex::build(&[Region::new(0, 10, 20)]);
        assert!(index.query(0, 5, 10).is_empty());
        assert_eq!(index.query(0, 5, 11), vec![0]);
    }

    #[test]
    fn long_region_far_before_the_bisection_point_is_not_revisited() {
        let regions = vec![
            Region::new(0, 1, 1_000),
            Region::new(0, 400, 410),
            Region::new(0, 500, 510),
            Region::new(0, 600, 610),
        ];
        let index = IntervalIndex::build(&regions);
        assert_eq!(index.query(0, 600, 605), vec![3]);
    }

    #[test]
    fn overlap_counts_across_sets() {
        let query = vec![Region::new(0, 5, 15), Region::new(0, 100, 110)];
        let a = vec![Region::new(0, 1, 10)];
        let b = vec![Region::new(0, 12, 20), Region::new(0, 105, 107)];
        let (counts, flags) = overlap_counts(&query, &[a.as_slice(), b.as_slice()]);
        assert_eq!(counts, vec![2, 1]);
        assert_eq!(flags, vec![vec![true, true], vec![false, true]]);
        assert_eq!(overlap_flags(&query, &a), vec![true, false]);
    }

    proptest! {
        #[test]
        fn every_hit_truly_overlaps(
            raw in prop::collection::vec((0i64..2, 1i64..500, 0i64..60), 0..40),
            q_start in 1i64..500,
            q_len in 0i64..80,
        ) {
            let regions: Vec<Region> = raw
                .iter()
                .map(|&(chr, start, len)| Region::new(chr, start, start + len))
                .collect();
            let index = IntervalIndex::build(&regions);
            let q_end = q_start + q_len;
            for idx in index.query(0, q_start, q_end) {
                let r = regions[idx];
                prop_assert_eq!(r.chr, 0);
                prop_assert!(q_start <= r.end && q_end >= r.start);
            }
        }

        #[test]
        fn disjoint_sets_are_found_completely(
            raw in prop::collection::vec((1i64..30, 0i64..20), 1..30),
            q_start in 1i64..1_500,
            q_len in 0i64..100,
        ) {
            // Non-overlapping regions: the forward scan reaches every hit.
            let mut regions = Vec::new();
            let mut pos = 1;
            for (gap, len) in raw {
                let start = pos + gap;
                regions.push(Region::new(0, start, start + len));
                pos = start + len + 1;
            }
            let index = IntervalIndex::build(&regions);
            let q_end = q_start + q_len;
            let mut hits = index.query(0, q_start, q_end + 1);
            hits.sort();
            let expected: Vec<usize> = regions
                .iter()
                .enumerate()
                .filter(|(_, r)| r.overlaps(q_start, q_end))
                .map(|(i, _)| i)
                .collect();
            prop_assert_eq!(hits, expected);
        }
    }
}
