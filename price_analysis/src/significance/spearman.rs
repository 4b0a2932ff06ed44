use super::{mean, rank_with_ties};
use anyhow::{bail, Result};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpearmanResult {
    pub correlation: f64,
    pub p_value: f64,
}

impl SpearmanResult {
    fn undefined() -> Self {
        Self {
            correlation: f64::NAN,
            p_value: f64::NAN,
        }
    }
}

/// Spearman's rank correlation with a two-sided t-distribution p-value.
///
/// Fewer than 2 pairs, or a constant input, gives NaN for both fields. Two
/// pairs give a rho of +/-1 with a NaN p-value.
pub fn spearman(x: &[f64], y: &[f64]) -> Result<SpearmanResult> {
    if x.len() != y.len() {
        bail!("Spearman needs paired samples, got {} and {}", x.len(), y.len());
    }
    let n = x.len();
    if n < 2 {
        return Ok(SpearmanResult::undefined());
    }

    let (rx, _) = rank_with_ties(x);
    let (ry, _) = rank_with_ties(y);
    let mx = mean(&rx);
    let my = mean(&ry);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in rx.iter().zip(&ry) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return Ok(SpearmanResult::undefined());
    }

    let rho = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    if n == 2 {
        return Ok(SpearmanResult {
            correlation: rho,
            p_value: f64::NAN,
        });
    }
    let dof = (n - 2) as f64;
    let p_value = if (1.0 - rho.abs()) < f64::EPSILON {
        0.0
    } else {
        let t = rho * (dof / ((1.0 + rho) * (1.0 - rho))).sqrt();
        let dist = StudentsT::new(0.0, 1.0, dof)?;
        (2.0 * dist.sf(t.abs())).min(1.0)
    };

    Ok(SpearmanResult {
        correlation: rho,
        p_value,
    })
}
