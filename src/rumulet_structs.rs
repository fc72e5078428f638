/// A genomic span in position format (1-based, fully closed).
///
/// `chr` is a code handed out by [`crate::chromosomes::ChromosomeCodes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub chr: i64,
    pub start: i64,
    pub end: i64,
}

impl Region {
    pub fn new(chr: i64, start: i64, end: i64) -> Self {
        Region { chr, start, end }
    }

    #[inline]
    pub fn len(&self) -> i64 {
        self.end - self.start + 1
    }

    #[inline]
    pub fn overlaps(&self, start: i64, end: i64) -> bool {
        start <= self.end && end >= self.start
    }
}

/// One observed fragment tagged with its cell barcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Read {
    pub chr: i64,
    pub start: i64,
    pub end: i64,
    pub barcode: String,
    pub mapq: Option<u32>,
}

impl Read {
    #[inline]
    pub fn insert_size(&self) -> i64 {
        self.end - self.start
    }
}

/// Mean/min/max mapping quality of the reads making up a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappingQualityStats {
    pub mean: f64,
    pub min: u32,
    pub max: u32,
}

/// A maximal span where the depth of one barcode's reads exceeded the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlapSegment {
    pub chr: i64,
    pub start: i64,
    pub end: i64,
    pub min_depth: i64,
    pub max_depth: i64,
    pub read_starts: Vec<i64>,
    pub read_ends: Vec<i64>,
    pub barcode: String,
    pub mapq: Option<MappingQualityStats>,
}

impl OverlapSegment {
    pub fn region(&self) -> Region {
        Region::new(self.chr, self.start, self.end)
    }
}

/// A segment that survived repeat splitting; read lists are no longer needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredOverlap {
    pub chr: i64,
    pub start: i64,
    pub end: i64,
    pub barcode: String,
}

impl FilteredOverlap {
    pub fn region(&self) -> Region {
        Region::new(self.chr, self.start, self.end)
    }

    #[inline]
    pub fn len(&self) -> i64 {
        self.end - self.start + 1
    }
}

/// A depth event in the sweep line:
/// - `pos`: the coordinate (start or end of a read)
/// - `delta`: +1 for a start, -1 for an end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthEvent {
    pub pos: i64,
    pub delta: i64,
}

/// Start of a region together with its end and its index in the unsorted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedStart {
    pub start: i64,
    pub end: i64,
    pub idx: usize,
}

/// Outcome of testing one entity (region row or cell column).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationRecord {
    pub idx: usize,
    pub observed: u64,
    pub raw_p: f64,
    pub corrected_p: f64,
}

impl ClassificationRecord {
    #[inline]
    pub fn is_positive(&self, q_threshold: f64) -> bool {
        self.corrected_p < q_threshold
    }
}
