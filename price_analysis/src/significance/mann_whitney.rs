use super::{rank_with_ties, tie_sum};
use anyhow::{bail, Result};
use statrs::distribution::{ContinuousCDF, Normal};

/// Largest sample size for which the exact null distribution is used.
const EXACT_MAX_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MannWhitneyResult {
    /// U statistic of the first sample.
    pub statistic: f64,
    pub p_value: f64,
}

/// Two-sided Mann-Whitney U test.
///
/// The exact null distribution is used when one sample has at most 8
/// observations and no value is tied; otherwise the normal approximation
/// with tie and continuity correction.
pub fn mann_whitney_u(x: &[f64], y: &[f64]) -> Result<MannWhitneyResult> {
    if x.is_empty() || y.is_empty() {
        bail!("Mann-Whitney U needs two non-empty samples");
    }
    if x.iter().chain(y).any(|v| v.is_nan()) {
        bail!("Mann-Whitney U samples contain NaN");
    }

    let n1 = x.len();
    let n2 = y.len();
    let pooled: Vec<f64> = x.iter().chain(y).copied().collect();
    let (ranks, ties) = rank_with_ties(&pooled);

    let r1: f64 = ranks[..n1].iter().sum();
    let u1 = r1 - (n1 * (n1 + 1)) as f64 / 2.0;
    let u2 = (n1 * n2) as f64 - u1;
    let u = u1.max(u2);

    let p_value = if n1.min(n2) <= EXACT_MAX_SIZE && ties.is_empty() {
        exact_p_value(u, n1, n2)
    } else {
        asymptotic_p_value(u, n1, n2, tie_sum(&ties))?
    };

    Ok(MannWhitneyResult {
        statistic: u1,
        p_value: p_value.min(1.0),
    })
}

/// Two-sided exact p-value, `2 * P(U >= u)`.
fn exact_p_value(u: f64, n1: usize, n2: usize) -> f64 {
    let counts = u_frequencies(n1, n2);
    let total: f64 = counts.iter().sum();
    // u is an integer for untied samples.
    let start = u.round() as usize;
    let upper: f64 = counts.iter().skip(start).sum();
    2.0 * upper / total
}

/// Number of arrangements giving each value of U, the coefficients of the
/// Gaussian binomial `[n1 + n2 choose n1]`.
fn u_frequencies(n1: usize, n2: usize) -> Vec<f64> {
    let max_u = n1 * n2;
    let mut coeffs = vec![0.0; max_u + 1];
    coeffs[0] = 1.0;
    for k in 1..=n1 {
        // Multiply by (1 - q^(n2 + k)).
        let shift = n2 + k;
        for j in (shift..=max_u).rev() {
            coeffs[j] -= coeffs[j - shift];
        }
        // Divide by (1 - q^k).
        for j in k..=max_u {
            coeffs[j] += coeffs[j - k];
        }
    }
    coeffs
}

fn asymptotic_p_value(u: f64, n1: usize, n2: usize, tie_term: f64) -> Result<f64> {
    let n1f = n1 as f64;
    let n2f = n2 as f64;
    let n = n1f + n2f;
    let mu = n1f * n2f / 2.0;
    let sigma = (n1f * n2f / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)))).sqrt();
    if sigma == 0.0 || sigma.is_nan() {
        return Ok(1.0);
    }
    let z = (u - mu - 0.5) / sigma;
    let normal = Normal::new(0.0, 1.0)?;
    Ok(2.0 * normal.sf(z))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_distribution_frequencies() {
        // [4 choose 2]_q = 1 + q + 2q^2 + q^3 + q^4
        assert_eq!(u_frequencies(2, 2), vec![1.0, 1.0, 2.0, 1.0, 1.0]);
        let total: f64 = u_frequencies(3, 5).iter().sum();
        assert_eq!(total, 56.0);
    }

    #[test]
    fn test_exact_separated_samples() {
        let result = mann_whitney_u(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
        assert_eq!(result.statistic, 0.0);
        // 2 / C(6, 3)
        assert!((result.p_value - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_single_observations() {
        let result = mann_whitney_u(&[12.0], &[10.0]).unwrap();
        assert_eq!(result.statistic, 1.0);
        assert!((result.p_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ties_use_normal_approximation() {
        let x = [1.0, 2.0, 2.0, 3.0];
        let y = [2.0, 3.0, 4.0, 5.0];
        let result = mann_whitney_u(&x, &y).unwrap();
        // Ranks of x: 1, 3, 3, 5.5 -> R1 = 12.5, U1 = 2.5
        assert!((result.statistic - 2.5).abs() < 1e-12);
        let sigma = (16.0f64 / 12.0 * (9.0 - 30.0 / 56.0)).sqrt();
        let z = (13.5 - 8.0 - 0.5) / sigma;
        let expected = 2.0 * Normal::new(0.0, 1.0).unwrap().sf(z);
        assert!((result.p_value - expected).abs() < 1e-12);
    }

    #[test]
    fn test_all_tied_gives_unit_p_value() {
        let result = mann_whitney_u(&[3.0, 3.0], &[3.0, 3.0, 3.0]).unwrap();
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn test_empty_sample_is_an_error() {
        assert!(mann_whitney_u(&[], &[1.0]).is_err());
    }
}
