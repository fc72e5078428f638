use radsort::sort_by_key;
use rustc_hash::FxHashMap;

use crate::rumulet_structs::DepthEvent;
use crate::rumulet_structs::IndexedStart;
use crate::rumulet_structs::Region;

/// Builds one +1 event per start and one -1 event per end, sorted by position.
///
/// The radix sort is stable, so events sharing a position keep their input
/// order. Callers sum those events anyway.
pub fn build_sorted_depth_events(starts: &[i64], ends: &[i64]) -> Vec<DepthEvent> {
    let mut events: Vec<DepthEvent> = Vec::with_capacity(starts.len() + ends.len());

    for i in 0..starts.len() {
        events.push(DepthEvent {
            pos: starts[i],
            delta: 1,
        });
        events.push(DepthEvent {
            pos: ends[i],
            delta: -1,
        });
    }

    sort_by_key(&mut events, |e| e.pos);

    events
}

/// Returns the regions sorted by (chr, start); ties keep input order.
pub fn build_sorted_regions(regions: &[Region]) -> Vec<Region> {
    let mut sorted = regions.to_vec();

    sort_by_key(&mut sorted, |r| r.start);
    sort_by_key(&mut sorted, |r| r.chr);

    sorted
}

/// Groups regions by chromosome, each group holding (start, end, original index)
/// sorted ascending by start. Ties keep their original order.
pub fn build_chromosome_start_sorted(regions: &[Region]) -> FxHashMap<i64, Vec<IndexedStart>> {
    let mut result: FxHashMap<i64, Vec<IndexedStart>> = FxHashMap::default();

    for (idx, region) in regions.iter().enumerate() {
        result.entry(region.chr).or_default().push(IndexedStart {
            start: region.start,
            end: region.end,
            idx,
        });
    }

    for starts in result.values_mut() {
        sort_by_key(starts, |s| s.start);
    }

    result
}

/// Splits regions by chromosome, each group sorted by start.
pub fn split_by_chromosome(regions: &[Region]) -> FxHashMap<i64, Vec<Region>> {
    let mut result: FxHashMap<i64, Vec<Region>> = FxHashMap::default();
    if regions.is_empty() {
        return result;
    }

    for region in build_sorted_regions(regions) {
        result.entry(region.chr).or_default().push(region);
    }

    result
}
