use anyhow::Result;
use polars::prelude::*;

/// Groups `df` by `keys` and reduces each `(value, alias)` column to its mean.
///
/// Output columns are the keys followed by the aliases, sorted by the keys.
pub fn group_means(df: &DataFrame, keys: &[&str], values: &[(&str, &str)]) -> Result<DataFrame> {
    let key_exprs: Vec<Expr> = keys.iter().map(|k| col(*k)).collect();
    let aggs: Vec<Expr> = values
        .iter()
        .map(|(value, alias)| col(*value).cast(DataType::Float64).mean().alias(*alias))
        .collect();

    let grouped = df
        .clone()
        .lazy()
        .group_by(key_exprs.clone())
        .agg(aggs)
        .sort_by_exprs(
            key_exprs,
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;
    Ok(grouped)
}

pub fn group_mean(df: &DataFrame, keys: &[&str], value: &str, alias: &str) -> Result<DataFrame> {
    group_means(df, keys, &[(value, alias)])
}

/// Inner join on identically named key columns. Keys present on only one
/// side contribute no row.
pub fn inner_join(left: &DataFrame, right: &DataFrame, keys: &[&str]) -> Result<DataFrame> {
    let on: Vec<Expr> = keys.iter().map(|k| col(*k)).collect();
    let joined = left
        .clone()
        .lazy()
        .join(
            right.clone().lazy(),
            on.clone(),
            on,
            JoinArgs::new(JoinType::Inner),
        )
        .collect()?;
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{f64_values, i32_values, str_values};

    #[test]
    fn test_group_mean_by_year_and_geo() {
        let df = df!(
            "Year" => [2020i32, 2020, 2021, 2020],
            "GEO" => ["Ontario", "Ontario", "Ontario", "Quebec"],
            "VALUE" => [2.0, 4.0, 5.0, 1.0]
        )
        .unwrap();

        let out = group_mean(&df, &["Year", "GEO"], "VALUE", "Average_Price").unwrap();
        assert_eq!(out.height(), 3);
        assert_eq!(
            f64_values(&out, "Average_Price").unwrap(),
            vec![Some(3.0), Some(1.0), Some(5.0)]
        );
    }

    #[test]
    fn test_reaggregation_is_idempotent() {
        let df = df!(
            "Year" => [2020i32, 2021, 2021],
            "GEO" => ["Ontario", "Ontario", "Ontario"],
            "VALUE" => [2.0, 4.0, 6.0]
        )
        .unwrap();

        let once = group_mean(&df, &["Year", "GEO"], "VALUE", "VALUE").unwrap();
        let twice = group_mean(&once, &["Year", "GEO"], "VALUE", "VALUE").unwrap();
        assert!(once.equals(&twice));
    }

    #[test]
    fn test_inner_join_drops_unmatched_keys() {
        let prices = df!(
            "Year" => [2020i32, 2020],
            "Quarter" => [1i32, 2],
            "GEO" => ["Ontario", "Ontario"],
            "Average_Price" => [3.0, 4.0]
        )
        .unwrap();
        let income = df!(
            "Year" => [2020i32],
            "Quarter" => [1i32],
            "GEO" => ["Ontario"],
            "Average_Weekly_Income" => [1100.0]
        )
        .unwrap();

        let merged = inner_join(&prices, &income, &["Year", "Quarter", "GEO"]).unwrap();
        assert_eq!(merged.height(), 1);
        assert_eq!(i32_values(&merged, "Quarter").unwrap(), vec![Some(1)]);
        assert_eq!(
            str_values(&merged, "GEO").unwrap(),
            vec![Some("Ontario".to_string())]
        );
        assert_eq!(
            f64_values(&merged, "Average_Weekly_Income").unwrap(),
            vec![Some(1100.0)]
        );
    }
}
