//! Between-group significance tests.
//!
//! The tests follow the textbook definitions used by SciPy and R: Tukey's HSD
//! with p-values from the studentized range distribution, tie-corrected
//! Kruskal-Wallis H, two-sided Mann-Whitney U (exact for small untied samples),
//! and Spearman's rho with a t-distribution p-value.

pub mod kruskal;
pub mod mann_whitney;
pub mod per_product;
pub mod spearman;
pub mod studentized_range;
pub mod tukey;

pub use kruskal::{kruskal_wallis, KruskalResult};
pub use mann_whitney::{mann_whitney_u, MannWhitneyResult};
pub use per_product::{partition_eligible, tukey_per_product, tukey_table, Eligibility};
pub use spearman::{spearman, SpearmanResult};
pub use tukey::{tukey_hsd, TukeyPair};

/// Average ranks (1-based, ties share their mean rank) and the size of every
/// tie group with more than one member.
pub(crate) fn rank_with_ties(values: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut ties = Vec::new();
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && values[order[j]] == values[order[i]] {
            j += 1;
        }
        // Positions i..j share ranks i+1..=j.
        let rank = (i + 1 + j) as f64 / 2.0;
        for &idx in &order[i..j] {
            ranks[idx] = rank;
        }
        if j - i > 1 {
            ties.push(j - i);
        }
        i = j;
    }
    (ranks, ties)
}

/// `sum(t^3 - t)` over tie groups.
pub(crate) fn tie_sum(ties: &[usize]) -> f64 {
    ties.iter()
        .map(|&t| {
            let t = t as f64;
            t * t * t - t
        })
        .sum()
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
