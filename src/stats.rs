use radsort::sort_by_key;
use statrs::distribution::{DiscreteCDF, Poisson};

use crate::errors::{Result, RumuletError};
use crate::rumulet_structs::ClassificationRecord;

/// `P(X >= observed)` for `X ~ Poisson(lambda)`.
///
/// A rate of zero (nothing observed anywhere) gives 1 for every count.
pub fn poisson_upper_tail(observed: u64, lambda: f64) -> Result<f64> {
    if observed == 0 || lambda <= 0.0 {
        return Ok(1.0);
    }
    let poisson = Poisson::new(lambda).map_err(|e| RumuletError::Statistics(e.to_string()))?;
    // sf(k) is P(X > k)
    Ok(poisson.sf(observed - 1))
}

/// Benjamini-Hochberg adjusted p-values, returned in input order.
///
/// Sorted ascending, the i-th (1-based) value becomes `p * n / i`; a running
/// minimum taken from the largest value down keeps the result monotone, and
/// everything is capped at 1.
pub fn fdr_bh(p_values: &[f64]) -> Vec<f64> {
    let n = p_values.len();
    let mut corrected = vec![0.0; n];
    if n == 0 {
        return corrected;
    }

    let mut order: Vec<usize> = (0..n).collect();
    sort_by_key(&mut order, |&i| p_values[i]);

    let mut running_min = 1.0f64;
    for rank in (0..n).rev() {
        let i = order[rank];
        let scaled = p_values[i] * n as f64 / (rank + 1) as f64;
        running_min = running_min.min(scaled);
        corrected[i] = running_min;
    }

    corrected
}

/// Tests every entity's count against one Poisson rate shared by all of them.
///
/// The rate is the mean count. Raw tail probabilities are corrected jointly
/// with Benjamini-Hochberg. Records come back in input order and carry the
/// observed count and both probabilities whatever the outcome.
pub fn classify_counts(counts: &[u64]) -> Result<Vec<ClassificationRecord>> {
    if counts.is_empty() {
        return Ok(Vec::new());
    }

    let lambda = counts.iter().sum::<u64>() as f64 / counts.len() as f64;
    let raw = counts
        .iter()
        .map(|&c| poisson_upper_tail(c, lambda))
        .collect::<Result<Vec<f64>>>()?;
    let corrected = fdr_bh(&raw);

    Ok(counts
        .iter()
        .enumerate()
        .map(|(idx, &observed)| ClassificationRecord {
            idx,
            observed,
            raw_p: raw[idx],
            corrected_p: corrected[idx],
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 3.0, 1.0)]
    #[case(1, 0.0, 1.0)]
    #[case(1, 1.0, 1.0 - (-1.0f64).exp())]
    #[case(2, 2.0, 1.0 - 3.0 * (-2.0f64).exp())]
    fn upper_tail_includes_the_observed_value(
        #[case] observed: u64,
        #[case] lambda: f64,
        #[case] expected: f64,
    ) {
        let p = poisson_upper_tail(observed, lambda).unwrap();
        assert!((p - expected).abs() < 1e-9, "{p} vs {expected}");
    }

    #[test]
    fn bh_matches_hand_computed_values() {
        let corrected = fdr_bh(&[0.01, 0.04, 0.03, 0.20]);
        // ranks: 0.01 -> 1, 0.03 -> 2, 0.04 -> 3, 0.20 -> 4
        let expected = [0.04, 0.04 * 4.0 / 3.0, 0.04 * 4.0 / 3.0, 0.20];
        for (c, e) in corrected.iter().zip(expected) {
            assert!((c - e).abs() < 1e-12, "{c} vs {e}");
        }
    }

    #[test]
    fn bh_caps_at_one_and_handles_empty_input() {
        assert!(fdr_bh(&[]).is_empty());
        assert_eq!(fdr_bh(&[1.0, 1.0]), vec![1.0, 1.0]);
    }

    #[test]
    fn identical_counts_are_never_positive() {
        let records = classify_counts(&[5; 20]).unwrap();
        assert_eq!(records.len(), 20);
        for r in &records {
            assert_eq!(r.observed, 5);
            assert!(r.raw_p > 0.4 && r.raw_p < 0.7);
            assert!((r.corrected_p - r.raw_p).abs() < 1e-12);
            assert!(!r.is_positive(0.01));
        }
    }

    #[test]
    fn an_outlier_stands_out() {
        let mut counts = vec![2u64; 200];
        counts[17] = 40;
        let records = classify_counts(&counts).unwrap();
        let positives: Vec<usize> = records
            .iter()
            .filter(|r| r.is_positive(0.01))
            .map(|r| r.idx)
            .collect();
        assert_eq!(positives, vec![17]);
    }

    #[test]
    fn all_zero_counts_are_degenerate_not_nan() {
        let records = classify_counts(&[0, 0, 0]).unwrap();
        for r in &records {
            assert_eq!(r.raw_p, 1.0);
            assert_eq!(r.corrected_p, 1.0);
        }
        assert!(classify_counts(&[]).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn bh_is_monotone_and_never_below_raw(
            p in prop::collection::vec(0.0f64..=1.0, 1..60),
        ) {
            let corrected = fdr_bh(&p);
            let mut order: Vec<usize> = (0..p.len()).collect();
            order.sort_by(|&a, &b| p[a].partial_cmp(&p[b]).unwrap());
            for pair in order.windows(2) {
                prop_assert!(corrected[pair[0]] <= corrected[pair[1]] + 1e-15);
            }
            for (raw, adj) in p.iter().zip(&corrected) {
                prop_assert!(*adj >= *raw - 1e-15);
                prop_assert!(*adj <= 1.0);
            }
        }
    }
}
