//! Thin helpers over polars for the CSV tables passed between stages.
//!
//! Tables are read with every column as text and cast explicitly, so a
//! column's type never depends on what the first rows of a file look like.

use anyhow::{Context, Result};
use log::info;
use polars::prelude::*;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// A required column is absent from an input table.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingColumn {
    pub column: String,
    pub source: PathBuf,
}

impl fmt::Display for MissingColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "missing column '{}' in {}",
            self.column,
            self.source.display()
        )
    }
}

impl std::error::Error for MissingColumn {}

pub fn read_csv(path: &Path) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("Failed to open {}", path.display()))?
        .finish()
        .with_context(|| format!("Failed to read CSV {}", path.display()))
}

/// Reads a table, checks that `columns` exist, and casts the typed ones.
pub fn read_table(path: &Path, columns: &[&str], casts: &[(&str, DataType)]) -> Result<DataFrame> {
    let df = read_csv(path)?;
    require_columns(&df, columns, path)?;
    cast_columns(df, casts)
}

pub fn require_columns(df: &DataFrame, columns: &[&str], source: &Path) -> Result<()> {
    for name in columns {
        if df.get_column_index(name).is_none() {
            return Err(MissingColumn {
                column: name.to_string(),
                source: source.to_path_buf(),
            }
            .into());
        }
    }
    Ok(())
}

pub fn cast_columns(df: DataFrame, casts: &[(&str, DataType)]) -> Result<DataFrame> {
    if casts.is_empty() {
        return Ok(df);
    }
    let exprs: Vec<Expr> = casts
        .iter()
        .map(|(name, dtype)| col(*name).cast(dtype.clone()))
        .collect();
    Ok(df.lazy().with_columns(exprs).collect()?)
}

/// Writes `df` as `dir/file_name`, creating `dir` if needed.
pub fn write_csv(df: &mut DataFrame, dir: &Path, file_name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    let path = dir.join(file_name);
    let mut file =
        File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Saved {} rows to {}", df.height(), path.display());
    Ok(path)
}

pub fn str_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df.column(name)?.cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect();
    Ok(values)
}

pub fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df.column(name)?.cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

pub fn i32_values(df: &DataFrame, name: &str) -> Result<Vec<Option<i32>>> {
    let series = df.column(name)?.cast(&DataType::Int32)?;
    Ok(series.i32()?.into_iter().collect())
}

pub fn filter_rows(df: &DataFrame, keep: &[bool]) -> Result<DataFrame> {
    let mask: BooleanChunked = keep.iter().copied().collect();
    Ok(df.filter(&mask)?)
}

/// Stable sort on `columns`, all in the same direction.
pub fn sort_by(df: DataFrame, columns: &[&str], descending: bool) -> Result<DataFrame> {
    let exprs: Vec<Expr> = columns.iter().map(|c| col(*c)).collect();
    let options = SortMultipleOptions::default()
        .with_order_descending(descending)
        .with_maintain_order(true);
    Ok(df.lazy().sort_by_exprs(exprs, options).collect()?)
}

/// Selects `(source, target)` pairs, renaming each source column.
pub fn select_renamed(df: &DataFrame, columns: &[(&str, &str)]) -> Result<DataFrame> {
    let exprs: Vec<Expr> = columns
        .iter()
        .map(|(source, target)| col(*source).alias(*target))
        .collect();
    Ok(df.clone().lazy().select(exprs).collect()?)
}

/// Distinct non-null values in order of first appearance.
pub fn distinct_in_order(values: &[Option<String>]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .iter()
        .flatten()
        .filter(|v| seen.insert(v.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_column_is_typed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prices.csv");
        std::fs::write(&path, "REF_DATE,VALUE\n2020-01,1.5\n").unwrap();

        let err = read_table(&path, &["REF_DATE", "GEO"], &[]).unwrap_err();
        let missing = err.downcast_ref::<MissingColumn>().unwrap();
        assert_eq!(missing.column, "GEO");
    }

    #[test]
    fn test_write_then_read_keeps_values() {
        let dir = TempDir::new().unwrap();
        let mut df = df!(
            "GEO" => ["Ontario", "Quebec"],
            "VALUE" => [1.25, 2.5]
        )
        .unwrap();

        let path = write_csv(&mut df, &dir.path().join("nested/out"), "t.csv").unwrap();
        let back = read_table(&path, &["GEO", "VALUE"], &[("VALUE", DataType::Float64)]).unwrap();
        assert_eq!(f64_values(&back, "VALUE").unwrap(), vec![Some(1.25), Some(2.5)]);
        assert_eq!(
            str_values(&back, "GEO").unwrap(),
            vec![Some("Ontario".to_string()), Some("Quebec".to_string())]
        );
    }

    #[test]
    fn test_distinct_in_order_keeps_first_appearance() {
        let values = vec![
            Some("b".to_string()),
            Some("a".to_string()),
            None,
            Some("b".to_string()),
        ];
        assert_eq!(distinct_in_order(&values), vec!["b", "a"]);
    }
}
