use super::mean;
use super::studentized_range::{ptukey, qtukey};
use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// One pairwise comparison of Tukey's honestly significant difference test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TukeyPair {
    pub group1: String,
    pub group2: String,
    /// `mean(group2) - mean(group1)`
    pub meandiff: f64,
    pub p_adj: f64,
    pub lower: f64,
    pub upper: f64,
    pub reject: bool,
}

/// Tukey's HSD over `values` partitioned by `groups`.
///
/// Groups are compared in lexical order of their labels. The pooled
/// within-group variance has `N - k` degrees of freedom, which must be at
/// least 2.
pub fn tukey_hsd(values: &[f64], groups: &[String], alpha: f64) -> Result<Vec<TukeyPair>> {
    if values.len() != groups.len() {
        bail!(
            "{} values but {} group labels",
            values.len(),
            groups.len()
        );
    }

    let mut by_group: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for (value, group) in values.iter().zip(groups) {
        by_group.entry(group.as_str()).or_default().push(*value);
    }

    let k = by_group.len();
    if k < 2 {
        bail!("Tukey HSD needs at least 2 groups, got {}", k);
    }
    let df = (values.len() - k) as f64;
    if df < 2.0 {
        bail!("Tukey HSD needs at least 2 residual degrees of freedom, got {}", df);
    }

    let stats: Vec<(&str, f64, f64)> = by_group
        .iter()
        .map(|(name, xs)| (*name, mean(xs), xs.len() as f64))
        .collect();
    let sse: f64 = by_group
        .values()
        .map(|xs| {
            let m = mean(xs);
            xs.iter().map(|x| (x - m).powi(2)).sum::<f64>()
        })
        .sum();
    let mse = sse / df;
    let q_crit = qtukey(1.0 - alpha, k as f64, df);

    let mut pairs = Vec::with_capacity(k * (k - 1) / 2);
    for i in 0..k {
        for j in (i + 1)..k {
            let (name1, mean1, n1) = stats[i];
            let (name2, mean2, n2) = stats[j];
            let meandiff = mean2 - mean1;
            let std_pair = (mse / 2.0 * (1.0 / n1 + 1.0 / n2)).sqrt();
            let q = meandiff.abs() / std_pair;
            let p_adj = (1.0 - ptukey(q, k as f64, df)).clamp(0.0, 1.0);
            let half_width = q_crit * std_pair;
            pairs.push(TukeyPair {
                group1: name1.to_string(),
                group2: name2.to_string(),
                meandiff,
                p_adj,
                lower: meandiff - half_width,
                upper: meandiff + half_width,
                reject: meandiff.abs() > half_width,
            });
        }
    }
    Ok(pairs)
}
