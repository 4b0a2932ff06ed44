use crate::visualization::ChartRenderer;
use anyhow::{Context, Result};
use log::info;
use polars::prelude::*;
use price_analysis::aggregator::{group_mean, group_means, inner_join};
use price_analysis::frame::{self, filter_rows, read_table, select_renamed, write_csv};
use price_analysis::models::{GEO, VALUE, YEAR};
use price_analysis::significance::spearman;
use price_analysis::{periods, DataLoader, PipelineConfig};
use std::path::PathBuf;

/// Provincial indicator compared against category prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Income,
    Population,
}

impl Indicator {
    /// Column name and output directory of the indicator.
    pub fn name(&self) -> &'static str {
        match self {
            Indicator::Income => "income",
            Indicator::Population => "population",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Indicator::Income => "Income",
            Indicator::Population => "Population",
        }
    }

    fn source_path(&self, config: &PipelineConfig) -> PathBuf {
        match self {
            Indicator::Income => config.income_path.clone(),
            Indicator::Population => config.population_path.clone(),
        }
    }
}

/// Correlates one indicator with the yearly category prices of each province.
pub struct SocioeconomicAnalyzer<'a> {
    config: &'a PipelineConfig,
    indicator: Indicator,
}

impl<'a> SocioeconomicAnalyzer<'a> {
    pub fn new(config: &'a PipelineConfig, indicator: Indicator) -> Self {
        Self { config, indicator }
    }

    fn output_dir(&self) -> PathBuf {
        self.config.geo_csv_dir().join(self.indicator.name())
    }

    pub fn run(&self) -> Result<()> {
        let name = self.indicator.name();
        info!("Comparing {} with category prices", name);

        let yearly = self.yearly_indicator()?;
        let prices = self.category_prices()?;
        let merged = inner_join(&prices, &yearly, &["year", "province"])?;
        info!("{} province-year rows matched {}", merged.height(), name);

        let mut comparison = group_means(
            &merged,
            &["province", "year", "category"],
            &[("price", "price"), (name, name)],
        )?;
        write_csv(
            &mut comparison,
            &self.output_dir(),
            &format!("{}_cat_analysis.csv", name),
        )?;

        let mut correlations = correlate_by_category(&comparison, name)?;
        write_csv(
            &mut correlations,
            &self.output_dir(),
            &format!("cor_{}_analysis.csv", name),
        )?;

        if self.config.render_charts {
            self.plot(&comparison)?;
        }
        Ok(())
    }

    /// Yearly mean of the indicator per province, names trimmed.
    fn yearly_indicator(&self) -> Result<DataFrame> {
        let name = self.indicator.name();
        let path = self.indicator.source_path(self.config);
        let raw = DataLoader::indicator()
            .load(&path)
            .with_context(|| format!("Failed to load {}", name))?;
        let with_year = periods::with_year(&raw)?;
        let renamed = select_renamed(
            &with_year,
            &[(GEO, "province"), (YEAR, "year"), (VALUE, name)],
        )?;
        let mut yearly = group_mean(&renamed, &["province", "year"], name, name)?;

        let trimmed: Vec<Option<String>> = frame::str_values(&yearly, "province")?
            .into_iter()
            .map(|p| p.map(|p| p.trim().to_string()))
            .collect();
        let keep: Vec<bool> = trimmed
            .iter()
            .map(|p| p.as_deref().is_some_and(|p| self.config.is_province(p)))
            .collect();
        yearly.with_column(Series::new("province".into(), trimmed))?;
        filter_rows(&yearly, &keep)
    }

    fn category_prices(&self) -> Result<DataFrame> {
        let mut prices = read_table(
            &self.config.avg_year_prov_path(),
            &["year", "province", "avg_value", "category"],
            &[("year", DataType::Int32), ("avg_value", DataType::Float64)],
        )?;
        prices.rename("avg_value", "price".into())?;
        Ok(prices)
    }

    fn plot(&self, comparison: &DataFrame) -> Result<()> {
        let name = self.indicator.name();
        let categories = frame::str_values(comparison, "category")?;
        let xs = frame::f64_values(comparison, name)?;
        let ys = frame::f64_values(comparison, "price")?;

        let mut groups: Vec<(String, Vec<(f64, f64)>)> = Vec::new();
        for ((category, x), y) in categories.iter().zip(&xs).zip(&ys) {
            let (Some(category), Some(x), Some(y)) = (category, x, y) else {
                continue;
            };
            match groups.iter_mut().find(|(g, _)| g == category) {
                Some((_, points)) => points.push((*x, *y)),
                None => groups.push((category.clone(), vec![(*x, *y)])),
            }
        }

        let label = self.indicator.label();
        let renderer = ChartRenderer::new(&self.config.png_dir())?;
        renderer.scatter(
            &format!("{}_vs_price.png", name),
            &format!("{} vs Average Price of Categories by Province", label),
            &format!("Average {}", label),
            "Average Price",
            &groups,
        )?;
        Ok(())
    }
}

/// Spearman's rho between `indicator` and price for each category, in
/// order of first appearance.
fn correlate_by_category(df: &DataFrame, indicator: &str) -> Result<DataFrame> {
    let categories = frame::str_values(df, "category")?;
    let xs = frame::f64_values(df, indicator)?;
    let ys = frame::f64_values(df, "price")?;

    let names = frame::distinct_in_order(&categories);
    let mut correlations = Vec::with_capacity(names.len());
    let mut p_values = Vec::with_capacity(names.len());
    for category in &names {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..df.height() {
            if categories[i].as_deref() != Some(category.as_str()) {
                continue;
            }
            if let (Some(a), Some(b)) = (xs[i], ys[i]) {
                x.push(a);
                y.push(b);
            }
        }
        let result = spearman(&x, &y)?;
        correlations.push(result.correlation);
        p_values.push(result.p_value);
    }

    Ok(df!(
        "Category" => names,
        "Correlation" => correlations,
        "P-Value" => p_values
    )?)
}
