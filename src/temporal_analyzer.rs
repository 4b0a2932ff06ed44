use crate::visualization::ChartRenderer;
use anyhow::{Context, Result};
use glob::glob;
use log::{info, warn};
use polars::prelude::*;
use price_analysis::aggregator::group_mean;
use price_analysis::change_rate::{drop_incomplete, with_percent_change};
use price_analysis::frame::{self, read_table, write_csv};
use price_analysis::models::{
    COVID_PERIOD, GEO, PRESIDENCY_PERIOD, PRODUCTS, REF_DATE, VALUE, YEAR,
};
use price_analysis::significance::{tukey_hsd, tukey_per_product, tukey_table};
use price_analysis::{periods, DataLoader, PipelineConfig};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const ALPHA: f64 = 0.05;
/// Pre, during, and post.
const PERIOD_COUNT: usize = 3;

/// Year-over-year series per category and the period comparisons.
pub struct TemporalAnalyzer<'a> {
    config: &'a PipelineConfig,
}

impl<'a> TemporalAnalyzer<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<()> {
        let mut yoy = self.yoy_by_category()?;
        write_csv(&mut yoy, &self.config.temporal_dir(), "yoy_by_category.csv")?;
        if self.config.render_charts {
            self.plot_yoy(&yoy)?;
        }

        let covid_path = self.config.cleaned_dir().join("covid_period_food.csv");
        let covid = read_table(
            &covid_path,
            &[REF_DATE, GEO, PRODUCTS, VALUE, COVID_PERIOD],
            &[(VALUE, DataType::Float64)],
        )?;
        let covid_changes = product_changes(&covid, "YoY_Increase")?;

        let mut avg_increase = group_mean(&covid_changes, &[COVID_PERIOD], "YoY_Increase", "YoY_Increase")?;
        write_csv(
            &mut avg_increase,
            &self.config.temporal_dir(),
            "avg_increase_by_covid_period.csv",
        )?;
        self.overall_covid_tukey(&covid_changes)?;

        let mut mom = covid_changes.clone();
        mom.rename("YoY_Increase", "MoM_Increase".into())?;
        let mut per_product = tukey_per_product(
            &mom,
            PRODUCTS,
            "MoM_Increase",
            COVID_PERIOD,
            PERIOD_COUNT,
            ALPHA,
        )?;
        write_csv(&mut per_product, &self.config.output_root, "tukey_covid.csv")?;

        let presidency_path = self.config.cleaned_dir().join("presidency.csv");
        let presidency = read_table(
            &presidency_path,
            &[REF_DATE, GEO, PRODUCTS, VALUE, PRESIDENCY_PERIOD],
            &[(VALUE, DataType::Float64)],
        )?;
        let presidency_changes = product_changes(&presidency, "MoM_Increase")?;
        let mut per_product = tukey_per_product(
            &presidency_changes,
            PRODUCTS,
            "MoM_Increase",
            PRESIDENCY_PERIOD,
            PERIOD_COUNT,
            ALPHA,
        )?;
        write_csv(&mut per_product, &self.config.output_root, "tukey_pres.csv")?;

        info!("Temporal analysis complete");
        Ok(())
    }

    /// Split files in name order.
    fn category_files(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.config.split_dir().join("*.csv");
        let mut files: Vec<PathBuf> = glob(&pattern.to_string_lossy())?
            .filter_map(Result::ok)
            .collect();
        files.sort();
        Ok(files)
    }

    /// Concatenated `category, Year, Average_Price, YoY_Increase` rows.
    fn yoy_by_category(&self) -> Result<DataFrame> {
        let files = self.category_files()?;
        if files.is_empty() {
            warn!(
                "No category files in {}, run the clean stage first",
                self.config.split_dir().display()
            );
        }

        let mut combined: Option<DataFrame> = None;
        for path in files {
            let Some(yearly) = category_yoy(&path)? else {
                continue;
            };
            match combined.as_mut() {
                Some(acc) => {
                    acc.vstack_mut(&yearly)?;
                }
                None => combined = Some(yearly),
            }
        }

        match combined {
            Some(df) => Ok(df),
            None => Ok(DataFrame::new(vec![
                Series::new_empty("category".into(), &DataType::String),
                Series::new_empty(YEAR.into(), &DataType::Int32),
                Series::new_empty("Average_Price".into(), &DataType::Float64),
                Series::new_empty("YoY_Increase".into(), &DataType::Float64),
            ])?),
        }
    }

    /// Tukey HSD across the COVID periods over every product's changes.
    fn overall_covid_tukey(&self, changes: &DataFrame) -> Result<()> {
        let mut values = Vec::with_capacity(changes.height());
        let mut groups = Vec::with_capacity(changes.height());
        let labels = frame::str_values(changes, COVID_PERIOD)?;
        for (value, label) in frame::f64_values(changes, "YoY_Increase")?.into_iter().zip(labels) {
            if let (Some(value), Some(label)) = (value, label) {
                values.push(value);
                groups.push(label);
            }
        }

        let distinct: BTreeSet<&str> = groups.iter().map(String::as_str).collect();
        if distinct.len() < 2 {
            warn!(
                "Only {} COVID period(s) present, skipping the overall Tukey test",
                distinct.len()
            );
            return Ok(());
        }

        let pairs = tukey_hsd(&values, &groups, ALPHA)?;
        let mut table = tukey_table(&pairs)?;
        write_csv(&mut table, &self.config.temporal_dir(), "tukey_covid_overall.csv")?;
        Ok(())
    }

    fn plot_yoy(&self, yoy: &DataFrame) -> Result<()> {
        let categories = frame::str_values(yoy, "category")?;
        let years = frame::i32_values(yoy, YEAR)?;
        let changes = frame::f64_values(yoy, "YoY_Increase")?;

        let mut series: Vec<(String, Vec<(f64, f64)>)> = Vec::new();
        for ((category, year), change) in categories.iter().zip(&years).zip(&changes) {
            let (Some(category), Some(year), Some(change)) = (category, year, change) else {
                continue;
            };
            match series.iter_mut().find(|(name, _)| name == category) {
                Some((_, points)) => points.push((*year as f64, *change)),
                None => series.push((category.clone(), vec![(*year as f64, *change)])),
            }
        }

        let renderer = ChartRenderer::new(&self.config.png_dir())?;
        renderer.line_chart(
            "yoy_by_category.png",
            "Year-over-Year Price Increase by Category",
            "Year",
            "YoY Price Increase (%)",
            &series,
        )?;
        Ok(())
    }
}

/// Per-product percent change over the previous observation, first rows dropped.
fn product_changes(df: &DataFrame, output: &str) -> Result<DataFrame> {
    let changes = with_percent_change(df, &[PRODUCTS], REF_DATE, VALUE, output)?;
    drop_incomplete(&changes, output)
}

/// Yearly mean price of one category file and its year-over-year change.
/// `None` when the file is empty or spans a single year.
fn category_yoy(path: &Path) -> Result<Option<DataFrame>> {
    let category = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .with_context(|| format!("No file name in {}", path.display()))?;
    let df = DataLoader::food_prices().load(path)?;
    if df.height() == 0 {
        info!("Skipping empty category {}", category);
        return Ok(None);
    }

    let with_year = periods::with_year(&df)?;
    let yearly = group_mean(&with_year, &[YEAR], VALUE, "Average_Price")?;
    let mut yearly = with_percent_change(&yearly, &[], YEAR, "Average_Price", "YoY_Increase")?;
    if frame::f64_values(&yearly, "YoY_Increase")?.iter().all(|v| v.is_none()) {
        info!("Skipping {}: a single year of prices", category);
        return Ok(None);
    }

    let labels = vec![category; yearly.height()];
    yearly.insert_column(0, Series::new("category".into(), labels))?;
    Ok(Some(yearly))
}
