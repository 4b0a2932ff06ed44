use anyhow::{Context, Result};
use log::info;
use polars::prelude::*;
use price_analysis::aggregator::{group_mean, inner_join};
use price_analysis::frame::{self, filter_rows, sort_by, write_csv};
use price_analysis::models::{COAST, GEO, PRODUCTS, QUARTER, REF_DATE, VALUE, YEAR};
use price_analysis::periods;
use price_analysis::{CategorySplitter, DataLoader, PipelineConfig};

/// Quarterly keys shared by the price, income, and population tables.
const QUARTER_KEYS: [&str; 3] = [YEAR, QUARTER, GEO];

/// Cleans the raw extracts into the tables every later stage reads.
pub struct CleaningProcessor<'a> {
    config: &'a PipelineConfig,
}

impl<'a> CleaningProcessor<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<()> {
        info!("Cleaning {}", self.config.food_prices_path.display());
        let food = DataLoader::food_prices()
            .load(&self.config.food_prices_path)
            .context("Failed to load food prices")?;

        self.write_food_list(&food)?;
        let filtered = self.split_categories(&food)?;

        self.yearly_avg_prices(&filtered)?;
        let quarterly = self.quarterly_avg_prices(&filtered)?;
        self.covid_period_food(&filtered)?;
        self.coasts(&filtered)?;
        self.current_prices(&filtered)?;

        let population = self.quarter_population()?;
        let income = self.quarterly_avg_income()?;

        let mut with_income = inner_join(&quarterly, &income, &QUARTER_KEYS)?;
        write_csv(&mut with_income, &self.config.cleaned_dir(), "quarter_prices_and_income.csv")?;
        let mut with_population = inner_join(&quarterly, &population, &QUARTER_KEYS)?;
        write_csv(
            &mut with_population,
            &self.config.cleaned_dir(),
            "quarter_prices_and_population.csv",
        )?;

        self.presidency(&filtered)?;
        info!("Cleaning complete");
        Ok(())
    }

    /// Every distinct product label of the raw extract, first appearance first.
    fn write_food_list(&self, food: &DataFrame) -> Result<()> {
        let products = frame::distinct_in_order(&frame::str_values(food, PRODUCTS)?);
        let mut list = DataFrame::new(vec![Series::new(PRODUCTS.into(), products)])?;
        write_csv(&mut list, &self.config.output_root, "all_food_list.csv")?;
        Ok(())
    }

    /// Writes one file per category and returns the allow-listed rows.
    fn split_categories(&self, food: &DataFrame) -> Result<DataFrame> {
        let split = CategorySplitter::new(&self.config.categories).split(food)?;
        for (name, mut table) in split.per_category {
            write_csv(&mut table, &self.config.split_dir(), &format!("{}.csv", name))?;
        }

        let mut combined = split.combined;
        info!(
            "{} of {} rows belong to a category",
            combined.height(),
            food.height()
        );
        write_csv(&mut combined, &self.config.cleaned_dir(), "filtered_items.csv")?;
        Ok(combined)
    }

    fn yearly_avg_prices(&self, df: &DataFrame) -> Result<DataFrame> {
        let with_year = periods::with_year(df)?;
        let avg = group_mean(&with_year, &[YEAR, GEO, PRODUCTS], VALUE, "Average_Price")?;
        let mut avg = sort_by(avg, &[GEO, YEAR], false)?;
        write_csv(&mut avg, &self.config.cleaned_dir(), "yearly_avg_prices.csv")?;
        Ok(avg)
    }

    fn quarterly_avg_prices(&self, df: &DataFrame) -> Result<DataFrame> {
        let with_quarter = periods::with_year_quarter(df)?;
        let avg = group_mean(
            &with_quarter,
            &[YEAR, QUARTER, GEO, PRODUCTS],
            VALUE,
            "Average_Price",
        )?;
        let mut avg = sort_by(avg, &[GEO, YEAR], false)?;
        write_csv(&mut avg, &self.config.cleaned_dir(), "quarterly_avg_prices.csv")?;
        Ok(avg)
    }

    fn covid_period_food(&self, df: &DataFrame) -> Result<()> {
        let labeled = periods::with_covid_period(df)?;
        let mut labeled = sort_by(labeled, &[GEO, REF_DATE], false)?;
        write_csv(&mut labeled, &self.config.cleaned_dir(), "covid_period_food.csv")?;
        Ok(())
    }

    fn coasts(&self, df: &DataFrame) -> Result<()> {
        let labeled = periods::with_coast(df, self.config)?;
        let mut labeled = sort_by(labeled, &[COAST, GEO, REF_DATE], true)?;
        write_csv(&mut labeled, &self.config.cleaned_dir(), "coasts.csv")?;
        Ok(())
    }

    fn current_prices(&self, df: &DataFrame) -> Result<()> {
        let month_prefix = format!("{}-", self.config.current_month);
        let keep: Vec<bool> = frame::str_values(df, REF_DATE)?
            .iter()
            .map(|d| d.as_deref().is_some_and(|d| d.starts_with(&month_prefix)))
            .collect();
        let mut current = filter_rows(df, &keep)?;
        info!(
            "{} prices for {}",
            current.height(),
            self.config.current_month
        );
        write_csv(&mut current, &self.config.cleaned_dir(), "current_prices.csv")?;
        Ok(())
    }

    /// Population rows keyed by year and quarter instead of the reference date.
    fn quarter_population(&self) -> Result<DataFrame> {
        let population = DataLoader::indicator()
            .load(&self.config.population_path)
            .context("Failed to load population")?;
        let with_quarter = periods::with_year_quarter(&population)?.drop(REF_DATE)?;
        let mut sorted = sort_by(with_quarter, &[GEO, YEAR], false)?;
        write_csv(&mut sorted, &self.config.cleaned_dir(), "quarter_population.csv")?;
        Ok(sorted)
    }

    fn quarterly_avg_income(&self) -> Result<DataFrame> {
        let income = DataLoader::indicator()
            .load(&self.config.income_path)
            .context("Failed to load income")?;
        let with_quarter = periods::with_year_quarter(&income)?;
        let avg = group_mean(&with_quarter, &QUARTER_KEYS, VALUE, "Average_Weekly_Income")?;
        let mut avg = sort_by(avg, &[GEO, YEAR], false)?;
        write_csv(&mut avg, &self.config.cleaned_dir(), "quarterly_avg_income.csv")?;
        Ok(avg)
    }

    fn presidency(&self, df: &DataFrame) -> Result<()> {
        let mut labeled = periods::with_presidency_period(df)?;
        write_csv(&mut labeled, &self.config.cleaned_dir(), "presidency.csv")?;
        Ok(())
    }
}
