use crate::frame::{self, filter_rows};
use crate::models::{FOOD_PRICE_COLUMNS, INDICATOR_COLUMNS, REF_DATE, VALUE};
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use log::{info, warn};
use polars::prelude::*;
use std::path::Path;

/// Output format of normalized reference dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Loads a StatCan extract restricted to a fixed column subset.
///
/// REF_DATE is normalized to `YYYY-MM-DD` text (monthly periods land on the
/// first of the month) and VALUE is cast to `f64`. Rows without a numeric
/// VALUE are dropped.
pub struct DataLoader {
    columns: Vec<&'static str>,
}

impl DataLoader {
    pub fn new(columns: &[&'static str]) -> Self {
        Self {
            columns: columns.to_vec(),
        }
    }

    /// REF_DATE, GEO, Products, VALUE
    pub fn food_prices() -> Self {
        Self::new(&FOOD_PRICE_COLUMNS)
    }

    /// REF_DATE, GEO, VALUE for income and population extracts.
    pub fn indicator() -> Self {
        Self::new(&INDICATOR_COLUMNS)
    }

    pub fn load(&self, path: &Path) -> Result<DataFrame> {
        let raw = frame::read_table(path, &self.columns, &[])?;
        let mut df = raw.select(self.columns.iter().copied())?;

        let dates = frame::str_values(&df, REF_DATE)?
            .iter()
            .enumerate()
            .map(|(row, text)| {
                let text = text
                    .as_deref()
                    .ok_or_else(|| anyhow!("empty {} at row {}", REF_DATE, row + 1))?;
                parse_ref_date(text)
                    .map(|d| d.format(DATE_FORMAT).to_string())
                    .with_context(|| format!("{} row {}", path.display(), row + 1))
            })
            .collect::<Result<Vec<String>>>()?;
        df.with_column(Series::new(REF_DATE.into(), dates))?;

        let values = frame::f64_values(&df, VALUE)?;
        df.with_column(Series::new(VALUE.into(), values.clone()))?;

        let keep: Vec<bool> = values.iter().map(|v| v.is_some()).collect();
        let dropped = keep.iter().filter(|k| !**k).count();
        if dropped > 0 {
            warn!(
                "Dropped {} rows without a numeric {} from {}",
                dropped,
                VALUE,
                path.display()
            );
            df = filter_rows(&df, &keep)?;
        }

        info!("Loaded {} rows from {}", df.height(), path.display());
        Ok(df)
    }
}

/// Parses a reference period, either a month (`2024-08`) or a full date.
pub fn parse_ref_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, DATE_FORMAT) {
        return Ok(date);
    }
    // Timestamps written by other tools carry a time part we can ignore.
    if let Some((day, _time)) = text.split_once(' ') {
        if let Ok(date) = NaiveDate::parse_from_str(day, DATE_FORMAT) {
            return Ok(date);
        }
    }
    let (year, month) = text
        .split_once('-')
        .ok_or_else(|| anyhow!("unrecognized reference date '{}'", text))?;
    let year: i32 = year
        .parse()
        .map_err(|_| anyhow!("unrecognized reference date '{}'", text))?;
    let month: u32 = month
        .parse()
        .map_err(|_| anyhow!("unrecognized reference date '{}'", text))?;
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| anyhow!("unrecognized reference date '{}'", text))
}

/// Parses the normalized REF_DATE column of a loaded or cleaned table.
pub fn ref_dates(df: &DataFrame) -> Result<Vec<NaiveDate>> {
    frame::str_values(df, REF_DATE)?
        .iter()
        .enumerate()
        .map(|(row, text)| {
            let text = text
                .as_deref()
                .ok_or_else(|| anyhow!("empty {} at row {}", REF_DATE, row + 1))?;
            parse_ref_date(text)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::MissingColumn;
    use tempfile::TempDir;

    #[test]
    fn test_parse_month_and_day_granularity() {
        assert_eq!(
            parse_ref_date("2024-08").unwrap(),
            NaiveDate::from_ymd_opt(2024, 8, 1).unwrap()
        );
        assert_eq!(
            parse_ref_date("2019-12-31").unwrap(),
            NaiveDate::from_ymd_opt(2019, 12, 31).unwrap()
        );
        assert_eq!(
            parse_ref_date("2020-01-01 00:00:00").unwrap(),
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
        );
        assert!(parse_ref_date("2024-13").is_err());
        assert!(parse_ref_date("August 2024").is_err());
    }

    #[test]
    fn test_load_selects_columns_and_drops_empty_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("food.csv");
        std::fs::write(
            &path,
            "REF_DATE,GEO,DGUID,Products,UOM,VALUE\n\
             2024-08,Ontario,x,\"Milk, 4 litres\",Dollars,6.5\n\
             2024-09,Ontario,x,\"Milk, 4 litres\",Dollars,\n",
        )
        .unwrap();

        let df = DataLoader::food_prices().load(&path).unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.width(), 4);
        assert_eq!(
            frame::str_values(&df, REF_DATE).unwrap(),
            vec![Some("2024-08-01".to_string())]
        );
        assert_eq!(frame::f64_values(&df, VALUE).unwrap(), vec![Some(6.5)]);
    }

    #[test]
    fn test_load_fails_on_missing_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("income.csv");
        std::fs::write(&path, "REF_DATE,VALUE\n2020-01,900\n").unwrap();

        let err = DataLoader::indicator().load(&path).unwrap_err();
        assert_eq!(err.downcast_ref::<MissingColumn>().unwrap().column, "GEO");
    }

    #[test]
    fn test_load_fails_on_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(DataLoader::indicator()
            .load(&dir.path().join("absent.csv"))
            .is_err());
    }
}
