use crate::frame::{self, filter_rows, sort_by};
use anyhow::Result;
use polars::prelude::*;

/// Percent change of each value over the previous one, `None` for the first
/// and for a 0 to 0 step.
pub fn percent_changes(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut changes = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for value in values {
        changes.push(match (prev, value) {
            (Some(p), Some(v)) => Some((v / p - 1.0) * 100.0).filter(|c| !c.is_nan()),
            _ => None,
        });
        prev = *value;
    }
    changes
}

/// Sorts by `group_keys` then `order_by` and appends `output`, the percent
/// change of `value` over the previous row of the same group.
pub fn with_percent_change(
    df: &DataFrame,
    group_keys: &[&str],
    order_by: &str,
    value: &str,
    output: &str,
) -> Result<DataFrame> {
    let mut sort_columns = group_keys.to_vec();
    sort_columns.push(order_by);
    let mut sorted = sort_by(df.clone(), &sort_columns, false)?;

    let keys: Vec<Vec<Option<String>>> = group_keys
        .iter()
        .map(|k| frame::str_values(&sorted, k))
        .collect::<Result<_>>()?;
    let values = frame::f64_values(&sorted, value)?;

    let mut changes = Vec::with_capacity(values.len());
    let mut start = 0;
    while start < values.len() {
        let mut end = start + 1;
        while end < values.len() && keys.iter().all(|k| k[end] == k[start]) {
            end += 1;
        }
        changes.extend(percent_changes(&values[start..end]));
        start = end;
    }

    sorted.with_column(Series::new(output.into(), changes))?;
    Ok(sorted)
}

/// Drops rows whose `column` is null, i.e. the first row of every group.
pub fn drop_incomplete(df: &DataFrame, column: &str) -> Result<DataFrame> {
    let keep: Vec<bool> = frame::f64_values(df, column)?
        .iter()
        .map(|v| v.is_some())
        .collect();
    filter_rows(df, &keep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::f64_values;

    #[test]
    fn test_percent_change_over_previous_row() {
        let changes = percent_changes(&[Some(10.0), Some(12.0), Some(9.0)]);
        assert_eq!(changes[0], None);
        assert!((changes[1].unwrap() - 20.0).abs() < 1e-9);
        assert!((changes[2].unwrap() + 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_to_zero_step_is_incomplete() {
        let df = df!(
            "REF_DATE" => ["2020-01-01", "2020-02-01", "2020-03-01"],
            "Products" => ["Eggs", "Eggs", "Eggs"],
            "VALUE" => [0.0, 0.0, 2.0]
        )
        .unwrap();
        let out = with_percent_change(&df, &["Products"], "REF_DATE", "VALUE", "MoM_Increase").unwrap();
        let complete = drop_incomplete(&out, "MoM_Increase").unwrap();
        let changes = f64_values(&complete, "MoM_Increase").unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0], Some(f64::INFINITY));
    }

    #[test]
    fn test_changes_restart_per_product_and_follow_date_order() {
        let df = df!(
            "REF_DATE" => ["2020-03-01", "2020-01-01", "2020-02-01", "2020-01-01", "2020-02-01"],
            "Products" => ["Eggs", "Eggs", "Eggs", "Milk", "Milk"],
            "VALUE" => [9.0, 10.0, 12.0, 4.0, 5.0]
        )
        .unwrap();

        let out = with_percent_change(&df, &["Products"], "REF_DATE", "VALUE", "MoM_Increase").unwrap();
        let complete = drop_incomplete(&out, "MoM_Increase").unwrap();
        let changes: Vec<f64> = f64_values(&complete, "MoM_Increase")
            .unwrap()
            .into_iter()
            .flatten()
            .collect();

        assert_eq!(changes.len(), 3);
        assert!((changes[0] - 20.0).abs() < 1e-9);
        assert!((changes[1] + 25.0).abs() < 1e-9);
        assert!((changes[2] - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_without_group_keys_uses_one_series() {
        let df = df!(
            "Year" => [2019i32, 2020],
            "Average_Price" => [2.0, 3.0]
        )
        .unwrap();
        let out = with_percent_change(&df, &[], "Year", "Average_Price", "YoY_Increase").unwrap();
        assert_eq!(
            f64_values(&out, "YoY_Increase").unwrap(),
            vec![None, Some(50.0)]
        );
    }
}
