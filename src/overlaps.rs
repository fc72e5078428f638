use crate::rumulet_structs::{DepthEvent, MappingQualityStats, OverlapSegment};
use crate::sorts;

/// A span of the depth profile that stayed above the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthSegment {
    pub start: i64,
    pub end: i64,
    pub min_depth: i64,
    pub max_depth: i64,
}

/// Collapses sorted events into (position, cumulative depth) pairs.
///
/// Events sharing a position are summed into one entry before the running
/// total is recorded, so a read ending where another starts nets out.
pub fn running_depth(events: &[DepthEvent]) -> Vec<(i64, i64)> {
    let mut profile: Vec<(i64, i64)> = Vec::with_capacity(events.len());
    let mut depth = 0;

    for e in events {
        depth += e.delta;
        match profile.last_mut() {
            Some(last) if last.0 == e.pos => last.1 = depth,
            _ => profile.push((e.pos, depth)),
        }
    }

    profile
}

/// Scans a depth profile for spans where depth exceeds `threshold`.
///
/// A span opens at the first position with depth `> threshold` and closes at
/// the first later position with depth `<= threshold`. A span still open at
/// the end of the profile closes at the last position.
pub fn segments_above(profile: &[(i64, i64)], threshold: i64) -> Vec<DepthSegment> {
    let mut segments = Vec::new();
    let mut open: Option<DepthSegment> = None;

    for &(pos, depth) in profile {
        match open.as_mut() {
            Some(seg) => {
                if depth <= threshold {
                    seg.end = pos;
                    segments.push(*seg);
                    open = None;
                } else {
                    seg.min_depth = seg.min_depth.min(depth);
                    seg.max_depth = seg.max_depth.max(depth);
                }
            }
            None => {
                if depth > threshold {
                    open = Some(DepthSegment {
                        start: pos,
                        end: pos,
                        min_depth: depth,
                        max_depth: depth,
                    });
                }
            }
        }
    }

    if let (Some(mut seg), Some(&(last_pos, _))) = (open, profile.last()) {
        seg.end = last_pos;
        segments.push(seg);
    }

    segments
}

/// Runs the start/end sweep over raw read coordinates.
pub fn sweep_depth_segments(starts: &[i64], ends: &[i64], threshold: i64) -> Vec<DepthSegment> {
    let events = sorts::build_sorted_depth_events(starts, ends);
    let profile = running_depth(&events);
    segments_above(&profile, threshold)
}

/// Finds the overlap segments of one barcode on one chromosome.
///
/// `starts`/`ends` describe the barcode's reads in stream order (sorted by
/// start). `mapqs` is either empty or holds one mapping quality per read.
/// With `threshold` or fewer reads the depth can never exceed the threshold,
/// so nothing is sorted.
pub fn detect_overlaps(
    chr: i64,
    starts: &[i64],
    ends: &[i64],
    mapqs: &[Option<u32>],
    barcode: &str,
    threshold: usize,
) -> Vec<OverlapSegment> {
    if starts.len() <= threshold {
        return Vec::new();
    }

    let mut segments: Vec<OverlapSegment> = sweep_depth_segments(starts, ends, threshold as i64)
        .into_iter()
        .map(|d| OverlapSegment {
            chr,
            start: d.start,
            end: d.end,
            min_depth: d.min_depth,
            max_depth: d.max_depth,
            read_starts: Vec::new(),
            read_ends: Vec::new(),
            barcode: barcode.to_string(),
            mapq: None,
        })
        .collect();

    let members = assign_reads_within_segments(&mut segments, starts, ends);
    if mapqs.len() == starts.len() {
        for (segment, reads) in segments.iter_mut().zip(members) {
            segment.mapq = mapping_quality_stats(reads.iter().map(|&i| mapqs[i]));
        }
    }

    segments
}

/// Fills each segment's constituent read lists and returns, per segment, the
/// indices of the reads assigned to it.
///
/// Reads are walked once. A read whose end reaches the current segment's end
/// may still touch the next segment, so it is carried forward instead of
/// being re-scanned from the start of the read list.
pub fn assign_reads_within_segments(
    segments: &mut [OverlapSegment],
    starts: &[i64],
    ends: &[i64],
) -> Vec<Vec<usize>> {
    let mut members = Vec::with_capacity(segments.len());
    let mut carried: Vec<usize> = Vec::new();
    let mut ri = 0;

    for segment in segments.iter_mut() {
        let (seg_start, seg_end) = (segment.start, segment.end);
        let mut assigned = Vec::new();
        let mut next_carried = Vec::new();

        for &i in &carried {
            if ends[i] >= seg_start && seg_end >= starts[i] {
                assigned.push(i);
            }
            if ends[i] >= seg_end {
                next_carried.push(i);
            }
        }

        while ri < starts.len() && starts[ri] <= seg_end {
            if ends[ri] >= seg_start {
                assigned.push(ri);
            }
            if ends[ri] >= seg_end {
                next_carried.push(ri);
            }
            ri += 1;
        }

        carried = next_carried;
        segment.read_starts = assigned.iter().map(|&i| starts[i]).collect();
        segment.read_ends = assigned.iter().map(|&i| ends[i]).collect();
        members.push(assigned);
    }

    members
}

/// Mean/min/max over the given qualities; `None` if any read lacks one.
fn mapping_quality_stats<I>(mapqs: I) -> Option<MappingQualityStats>
where
    I: IntoIterator<Item = Option<u32>>,
{
    let mut count = 0u64;
    let mut sum = 0u64;
    let mut min = u32::MAX;
    let mut max = 0u32;

    for mapq in mapqs {
        let mapq = mapq?;
        count += 1;
        sum += u64::from(mapq);
        min = min.min(mapq);
        max = max.max(mapq);
    }

    if count == 0 {
        return None;
    }

    Some(MappingQualityStats {
        mean: sum as f64 / count as f64,
        min,
        max,
    })
}
