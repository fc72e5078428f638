use crate::errors::{Result, RumuletError};

/// Settings of the streaming overlap counter.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterConfig {
    /// Depth a single diploid cell can explain; overlaps need more than this.
    pub expected_overlap: usize,
    /// Reads with `end - start` above this are skipped.
    pub max_insert_size: i64,
    /// Added to every fragment start as it is read.
    pub start_offset: i64,
    /// Added to every fragment end as it is read.
    pub end_offset: i64,
    /// Reads whose mapping quality is at or below this are skipped.
    pub max_low_mapq: Option<u32>,
    /// 1-based fragment column holding the mapping quality, if any.
    pub mapq_column: Option<usize>,
}

impl Default for CounterConfig {
    fn default() -> Self {
        CounterConfig {
            expected_overlap: 2,
            max_insert_size: 900,
            start_offset: 0,
            end_offset: 0,
            max_low_mapq: None,
            mapq_column: None,
        }
    }
}

impl CounterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_insert_size < 0 {
            return Err(RumuletError::InvalidParameter {
                parameter: "max-insert-size".to_string(),
                reason: format!("must be >= 0, got {}", self.max_insert_size),
            });
        }
        if let Some(column) = self.mapq_column {
            if column < 5 {
                return Err(RumuletError::InvalidParameter {
                    parameter: "mapq-column".to_string(),
                    reason: format!("columns 1-4 are chr, start, end and barcode, got {column}"),
                });
            }
        }
        if self.max_low_mapq.is_some() && self.mapq_column.is_none() {
            return Err(RumuletError::InvalidParameter {
                parameter: "max-low-mapq".to_string(),
                reason: "needs --mapq-column to know where qualities are".to_string(),
            });
        }
        Ok(())
    }
}

/// Settings of the repeat and multiplet inference.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceConfig {
    /// Corrected probability below which a cell is called a multiplet.
    pub q_threshold: f64,
    /// Corrected probability below which a region is called repetitive.
    pub q_repeat_threshold: f64,
    pub expected_overlap: usize,
    /// Shortest overlap (in bp) kept after repeat splitting.
    pub min_overlap_length: i64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        InferenceConfig {
            q_threshold: 0.01,
            q_repeat_threshold: 0.01,
            expected_overlap: 2,
            min_overlap_length: 1,
        }
    }
}

impl InferenceConfig {
    pub fn validate(&self) -> Result<()> {
        check_q("q", self.q_threshold)?;
        check_q("q-repeat", self.q_repeat_threshold)?;
        if self.min_overlap_length < 1 {
            return Err(RumuletError::InvalidParameter {
                parameter: "min-overlap".to_string(),
                reason: format!("must be >= 1, got {}", self.min_overlap_length),
            });
        }
        Ok(())
    }
}

fn check_q(parameter: &str, value: f64) -> Result<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(RumuletError::InvalidParameter {
            parameter: parameter.to_string(),
            reason: format!("must be in (0, 1], got {value}"),
        })
    }
}
