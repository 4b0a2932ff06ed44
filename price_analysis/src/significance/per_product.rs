use super::tukey::{tukey_hsd, TukeyPair};
use crate::frame::{self, filter_rows};
use anyhow::Result;
use log::info;
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Products split by whether they can enter a between-group test.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Eligibility {
    pub eligible: Vec<String>,
    /// Product and the reason it was left out.
    pub ineligible: Vec<(String, String)>,
}

/// Partitions the products of `df` by whether their rows fall into exactly
/// `expected_groups` labels of `group_col` with at least 2 residual degrees
/// of freedom. Rows without a group label are ignored.
pub fn partition_eligible(
    df: &DataFrame,
    product_col: &str,
    group_col: &str,
    expected_groups: usize,
) -> Result<Eligibility> {
    let products = frame::str_values(df, product_col)?;
    let groups = frame::str_values(df, group_col)?;

    let mut seen: BTreeMap<String, (BTreeSet<String>, usize)> = BTreeMap::new();
    for (product, group) in products.iter().zip(&groups) {
        if let (Some(product), Some(group)) = (product, group) {
            let entry = seen.entry(product.clone()).or_default();
            entry.0.insert(group.clone());
            entry.1 += 1;
        }
    }

    let mut eligibility = Eligibility::default();
    for product in frame::distinct_in_order(&products) {
        let (labels, rows) = seen.remove(&product).unwrap_or_default();
        let reason = if labels.len() != expected_groups {
            Some(format!(
                "{} of {} {} groups present",
                labels.len(),
                expected_groups,
                group_col
            ))
        } else if rows < labels.len() + 2 {
            Some(format!("{} rows leave fewer than 2 degrees of freedom", rows))
        } else {
            None
        };
        match reason {
            Some(reason) => {
                info!("Skipping {}: {}", product.trim_end(), reason);
                eligibility.ineligible.push((product, reason));
            }
            None => eligibility.eligible.push(product),
        }
    }
    Ok(eligibility)
}

/// Tukey HSD of `response_col` across `group_col`, run separately for every
/// eligible product. Returns the pairwise table with a trailing `Product`
/// column; ineligible products contribute no row.
pub fn tukey_per_product(
    df: &DataFrame,
    product_col: &str,
    response_col: &str,
    group_col: &str,
    expected_groups: usize,
    alpha: f64,
) -> Result<DataFrame> {
    let responses = frame::f64_values(df, response_col)?;
    let keep: Vec<bool> = responses.iter().map(|v| v.is_some()).collect();
    let complete = filter_rows(df, &keep)?;

    let eligibility = partition_eligible(&complete, product_col, group_col, expected_groups)?;

    let products = frame::str_values(&complete, product_col)?;
    let groups = frame::str_values(&complete, group_col)?;
    let values = frame::f64_values(&complete, response_col)?;

    let mut rows: Vec<(String, TukeyPair)> = Vec::new();
    for product in &eligibility.eligible {
        let mut product_values = Vec::new();
        let mut product_groups = Vec::new();
        for ((p, g), v) in products.iter().zip(&groups).zip(&values) {
            if let (Some(p), Some(g), Some(v)) = (p, g, v) {
                if p == product {
                    product_values.push(*v);
                    product_groups.push(g.clone());
                }
            }
        }
        for pair in tukey_hsd(&product_values, &product_groups, alpha)? {
            rows.push((product.clone(), pair));
        }
    }

    tukey_frame(&rows)
}

/// Pairwise Tukey rows as a table with the statsmodels summary headers.
pub fn tukey_table(pairs: &[TukeyPair]) -> Result<DataFrame> {
    let df = df!(
        "group1" => pairs.iter().map(|p| p.group1.clone()).collect::<Vec<_>>(),
        "group2" => pairs.iter().map(|p| p.group2.clone()).collect::<Vec<_>>(),
        "meandiff" => pairs.iter().map(|p| p.meandiff).collect::<Vec<_>>(),
        "p-adj" => pairs.iter().map(|p| p.p_adj).collect::<Vec<_>>(),
        "lower" => pairs.iter().map(|p| p.lower).collect::<Vec<_>>(),
        "upper" => pairs.iter().map(|p| p.upper).collect::<Vec<_>>(),
        "reject" => pairs.iter().map(|p| p.reject).collect::<Vec<_>>()
    )?;
    Ok(df)
}

fn tukey_frame(rows: &[(String, TukeyPair)]) -> Result<DataFrame> {
    let pairs: Vec<TukeyPair> = rows.iter().map(|(_, pair)| pair.clone()).collect();
    let mut df = tukey_table(&pairs)?;
    let products: Vec<String> = rows.iter().map(|(product, _)| product.clone()).collect();
    df.with_column(Series::new("Product".into(), products))?;
    Ok(df)
}
