use super::{rank_with_ties, tie_sum};
use anyhow::{bail, Result};
use statrs::distribution::{ChiSquared, ContinuousCDF};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KruskalResult {
    pub statistic: f64,
    pub p_value: f64,
}

/// Kruskal-Wallis H test for independent samples, corrected for ties.
pub fn kruskal_wallis(samples: &[&[f64]]) -> Result<KruskalResult> {
    if samples.len() < 2 {
        bail!("Kruskal-Wallis needs at least 2 samples, got {}", samples.len());
    }
    if samples.iter().any(|s| s.is_empty()) {
        bail!("Kruskal-Wallis samples must not be empty");
    }

    let pooled: Vec<f64> = samples.iter().flat_map(|s| s.iter().copied()).collect();
    let n = pooled.len() as f64;
    let (ranks, ties) = rank_with_ties(&pooled);

    let correction = 1.0 - tie_sum(&ties) / (n * n * n - n);
    if correction == 0.0 {
        bail!("All numbers are identical in Kruskal-Wallis");
    }

    let mut offset = 0;
    let mut rank_term = 0.0;
    for sample in samples {
        let rank_sum: f64 = ranks[offset..offset + sample.len()].iter().sum();
        rank_term += rank_sum * rank_sum / sample.len() as f64;
        offset += sample.len();
    }

    let h = (12.0 / (n * (n + 1.0)) * rank_term - 3.0 * (n + 1.0)) / correction;
    let chi2 = ChiSquared::new((samples.len() - 1) as f64)?;
    Ok(KruskalResult {
        statistic: h,
        p_value: chi2.sf(h),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separated_samples() {
        let east = [1.0, 2.0, 3.0];
        let west = [4.0, 5.0, 6.0];
        let interior = [7.0, 8.0, 9.0];
        let samples: [&[f64]; 3] = [&east, &west, &interior];
        let result = kruskal_wallis(&samples).unwrap();
        // H = 12/(9*10) * (36+225+576)/3 - 30 = 7.2
        assert!((result.statistic - 7.2).abs() < 1e-9);
        assert!((result.p_value - (-3.6f64).exp()).abs() < 1e-7);
    }

    #[test]
    fn test_tie_correction() {
        let a = [1.0, 1.0, 2.0];
        let b = [2.0, 3.0, 3.0];
        let samples: [&[f64]; 2] = [&a, &b];
        let result = kruskal_wallis(&samples).unwrap();
        // Ranks a: 1.5,1.5,3.5 (6.5); b: 3.5,5.5,5.5 (14.5); three tie pairs.
        let raw = 12.0 / 42.0 * (6.5 * 6.5 / 3.0 + 14.5 * 14.5 / 3.0) - 21.0;
        let expected = raw / (1.0 - 18.0 / 210.0);
        assert!((result.statistic - expected).abs() < 1e-9);
    }

    #[test]
    fn test_identical_values_are_an_error() {
        let a = [2.0, 2.0];
        let b = [2.0];
        let identical: [&[f64]; 2] = [&a, &b];
        assert!(kruskal_wallis(&identical).is_err());
        let with_empty: [&[f64]; 2] = [&a, &[]];
        assert!(kruskal_wallis(&with_empty).is_err());
    }
}
