use std::time::Instant;

use log::debug;

use crate::rumulet_structs::Region;
use crate::sorts;

/// Merges every region that touches or overlaps another into one span.
///
/// All sets are pooled and sorted by (chr, start). A region is folded into the
/// running span while its start is `<=` the running end; the first gap emits
/// the running span. Output is sorted and pairwise disjoint.
pub fn union_regions(region_sets: &[&[Region]]) -> Vec<Region> {
    let start = Instant::now();

    let pooled: Vec<Region> = region_sets.iter().flat_map(|s| s.iter().copied()).collect();
    let mut merged = Vec::with_capacity(pooled.len());
    if pooled.is_empty() {
        return merged;
    }

    let sorted = sorts::build_sorted_regions(&pooled);
    let mut current = sorted[0];

    for next in &sorted[1..] {
        if next.chr != current.chr || next.start > current.end {
            merged.push(current);
            current = *next;
        } else {
            current.end = current.end.max(next.end);
        }
    }
    merged.push(current);

    debug!(
        "Merged {} regions into {} in {:?}",
        pooled.len(),
        merged.len(),
        start.elapsed()
    );

    merged
}

/// Spans where every set has a region at the same time.
///
/// Per chromosome one cursor walks each start-sorted set. The current regions
/// give `max_start` and `min_end`; `max_start < min_end` yields a consensus
/// span, and the cursor holding the smallest end moves on. A chromosome is
/// done as soon as any set runs out of regions on it, so a chromosome missing
/// from one set yields nothing.
pub fn strict_consensus(region_sets: &[&[Region]]) -> Vec<Region> {
    let mut consensus = Vec::new();
    if region_sets.is_empty() {
        return consensus;
    }

    let by_chr: Vec<_> = region_sets
        .iter()
        .map(|s| sorts::split_by_chromosome(s))
        .collect();

    let mut chromosomes: Vec<i64> = by_chr.iter().flat_map(|m| m.keys().copied()).collect();
    radsort::sort(&mut chromosomes);
    chromosomes.dedup();

    for chr in chromosomes {
        let Some(lists) = by_chr
            .iter()
            .map(|m| m.get(&chr).map(Vec::as_slice))
            .collect::<Option<Vec<&[Region]>>>()
        else {
            continue;
        };

        let mut cursors = vec![0usize; lists.len()];
        loop {
            let mut max_start = lists[0][cursors[0]].start;
            let mut min_end = lists[0][cursors[0]].end;
            let mut min_end_idx = 0;
            for i in 1..lists.len() {
                let current = &lists[i][cursors[i]];
                if current.start > max_start {
                    max_start = current.start;
                }
                if current.end < min_end {
                    min_end = current.end;
                    min_end_idx = i;
                }
            }

            if max_start < min_end {
                consensus.push(Region::new(chr, max_start, min_end));
            }

            cursors[min_end_idx] += 1;
            if cursors
                .iter()
                .zip(&lists)
                .any(|(&c, list)| c >= list.len())
            {
                break;
            }
        }
    }

    consensus
}
