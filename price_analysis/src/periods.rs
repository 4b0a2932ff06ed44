//! Calendar truncation and the fixed period/geography labelers.

use crate::config::PipelineConfig;
use crate::data_loader::ref_dates;
use crate::frame::{self, filter_rows};
use crate::models::{
    Coast, CovidPeriod, PresidencyPeriod, COAST, COVID_PERIOD, GEO, NATIONAL_GEO,
    PRESIDENCY_PERIOD, QUARTER, YEAR,
};
use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

/// Start of the lockdown period, inclusive.
pub const COVID_START: (i32, u32, u32) = (2020, 1, 1);
/// End of the lockdown period, inclusive.
pub const COVID_END: (i32, u32, u32) = (2022, 5, 30);

/// Right-closed presidency bins `(lower, upper]`, in order.
pub const PRESIDENCY_BINS: [((i32, u32, u32), (i32, u32, u32), PresidencyPeriod); 3] = [
    ((2015, 12, 31), (2017, 1, 20), PresidencyPeriod::Pre),
    ((2017, 1, 20), (2021, 1, 20), PresidencyPeriod::During),
    ((2021, 1, 20), (2024, 12, 31), PresidencyPeriod::Post),
];

fn ymd((y, m, d): (i32, u32, u32)) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("period boundaries are valid dates")
}

pub fn covid_period(date: NaiveDate) -> CovidPeriod {
    if date < ymd(COVID_START) {
        CovidPeriod::Pre
    } else if date <= ymd(COVID_END) {
        CovidPeriod::During
    } else {
        CovidPeriod::Post
    }
}

/// `None` outside `(2015-12-31, 2024-12-31]`.
pub fn presidency_period(date: NaiveDate) -> Option<PresidencyPeriod> {
    PRESIDENCY_BINS
        .iter()
        .find(|(lower, upper, _)| date > ymd(*lower) && date <= ymd(*upper))
        .map(|(_, _, period)| *period)
}

pub fn quarter(date: NaiveDate) -> i32 {
    (date.month0() / 3 + 1) as i32
}

/// Appends `Year` derived from REF_DATE.
pub fn with_year(df: &DataFrame) -> Result<DataFrame> {
    let years: Vec<i32> = ref_dates(df)?.iter().map(|d| d.year()).collect();
    let mut out = df.clone();
    out.with_column(Series::new(YEAR.into(), years))?;
    Ok(out)
}

/// Appends `Year` and `Quarter` derived from REF_DATE.
pub fn with_year_quarter(df: &DataFrame) -> Result<DataFrame> {
    let dates = ref_dates(df)?;
    let years: Vec<i32> = dates.iter().map(|d| d.year()).collect();
    let quarters: Vec<i32> = dates.iter().map(|d| quarter(*d)).collect();
    let mut out = df.clone();
    out.with_column(Series::new(YEAR.into(), years))?;
    out.with_column(Series::new(QUARTER.into(), quarters))?;
    Ok(out)
}

pub fn with_covid_period(df: &DataFrame) -> Result<DataFrame> {
    let labels: Vec<&str> = ref_dates(df)?
        .iter()
        .map(|d| covid_period(*d).as_str())
        .collect();
    let mut out = df.clone();
    out.with_column(Series::new(COVID_PERIOD.into(), labels))?;
    Ok(out)
}

pub fn with_presidency_period(df: &DataFrame) -> Result<DataFrame> {
    let labels: Vec<Option<&str>> = ref_dates(df)?
        .iter()
        .map(|d| presidency_period(*d).map(|p| p.as_str()))
        .collect();
    let mut out = df.clone();
    out.with_column(Series::new(PRESIDENCY_PERIOD.into(), labels))?;
    Ok(out)
}

/// Drops the national aggregate and labels each province with its coast,
/// `Unknown` when the province is not in the lookup table.
pub fn with_coast(df: &DataFrame, config: &PipelineConfig) -> Result<DataFrame> {
    let geos = frame::str_values(df, GEO)?;
    let keep: Vec<bool> = geos
        .iter()
        .map(|g| g.as_deref() != Some(NATIONAL_GEO))
        .collect();
    let mut out = filter_rows(df, &keep)?;

    let labels: Vec<&str> = geos
        .iter()
        .zip(&keep)
        .filter(|(_, kept)| **kept)
        .map(|(geo, _)| {
            geo.as_deref()
                .and_then(|g| config.coast_for(g))
                .unwrap_or(Coast::Unknown)
                .as_str()
        })
        .collect();
    out.with_column(Series::new(COAST.into(), labels))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_covid_boundaries() {
        assert_eq!(covid_period(date(2019, 12, 31)), CovidPeriod::Pre);
        assert_eq!(covid_period(date(2020, 1, 1)), CovidPeriod::During);
        assert_eq!(covid_period(date(2022, 5, 30)), CovidPeriod::During);
        assert_eq!(covid_period(date(2022, 5, 31)), CovidPeriod::Post);
        assert_eq!(covid_period(date(1995, 1, 1)), CovidPeriod::Pre);
    }

    #[test]
    fn test_presidency_bins_are_right_closed() {
        assert_eq!(presidency_period(date(2015, 12, 31)), None);
        assert_eq!(presidency_period(date(2016, 1, 1)), Some(PresidencyPeriod::Pre));
        assert_eq!(presidency_period(date(2017, 1, 20)), Some(PresidencyPeriod::Pre));
        assert_eq!(presidency_period(date(2017, 1, 21)), Some(PresidencyPeriod::During));
        assert_eq!(presidency_period(date(2021, 1, 20)), Some(PresidencyPeriod::During));
        assert_eq!(presidency_period(date(2021, 2, 1)), Some(PresidencyPeriod::Post));
        assert_eq!(presidency_period(date(2024, 12, 31)), Some(PresidencyPeriod::Post));
        assert_eq!(presidency_period(date(2025, 1, 1)), None);
    }

    #[test]
    fn test_quarter_truncation() {
        assert_eq!(quarter(date(2024, 1, 1)), 1);
        assert_eq!(quarter(date(2024, 3, 31)), 1);
        assert_eq!(quarter(date(2024, 4, 1)), 2);
        assert_eq!(quarter(date(2024, 12, 1)), 4);
    }

    #[test]
    fn test_with_coast_drops_canada_and_fills_unknown() {
        let df = df!(
            "REF_DATE" => ["2020-01-01", "2020-01-01", "2020-01-01"],
            "GEO" => ["Canada", "British Columbia", "Yukon"],
            "VALUE" => [1.0, 2.0, 3.0]
        )
        .unwrap();

        let out = with_coast(&df, &PipelineConfig::default()).unwrap();
        assert_eq!(out.height(), 2);
        assert_eq!(
            frame::str_values(&out, COAST).unwrap(),
            vec![Some("West Coast".to_string()), Some("Unknown".to_string())]
        );
    }

    #[test]
    fn test_every_row_gets_one_covid_label() {
        let df = df!(
            "REF_DATE" => ["2019-12-01", "2020-01-01", "2022-06-01"],
            "VALUE" => [1.0, 2.0, 3.0]
        )
        .unwrap();
        let out = with_covid_period(&df).unwrap();
        assert_eq!(
            frame::str_values(&out, COVID_PERIOD).unwrap(),
            vec![
                Some("Pre-COVID".to_string()),
                Some("During-COVID".to_string()),
                Some("Post-COVID".to_string())
            ]
        );
    }
}
