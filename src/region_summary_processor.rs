use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use polars::prelude::*;
use price_analysis::aggregator::group_mean;
use price_analysis::frame::{self, filter_rows, read_table, select_renamed, write_csv};
use price_analysis::models::{GEO, PRODUCTS, REF_DATE, VALUE, YEAR};
use price_analysis::{periods, DataLoader, PipelineConfig};
use std::path::PathBuf;

/// Base name of the combined allow-listed table's summaries.
pub const COMBINED_BASE_NAME: &str = "food_prices";

/// Provincial yearly and overall product means for every category.
pub struct RegionSummaryProcessor<'a> {
    config: &'a PipelineConfig,
}

impl<'a> RegionSummaryProcessor<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<()> {
        let inputs = self.inputs();
        info!("Summarizing {} files by province", inputs.len());

        let pb = ProgressBar::new(inputs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?,
        );
        for (base_name, path) in &inputs {
            pb.set_message(base_name.clone());
            self.summarize_file(base_name, path)?;
            pb.inc(1);
        }
        pb.finish_and_clear();

        let mut avg_year_prov = self.avg_year_prov()?;
        write_csv(
            &mut avg_year_prov,
            &self.config.geo_csv_dir(),
            "avg_year_prov.csv",
        )?;
        Ok(())
    }

    /// `(base name, path)` of every category split plus the combined table.
    fn inputs(&self) -> Vec<(String, PathBuf)> {
        let mut inputs: Vec<(String, PathBuf)> = self
            .config
            .sorted_category_names()
            .into_iter()
            .map(|name| {
                let path = self.config.split_dir().join(format!("{}.csv", name));
                (name, path)
            })
            .collect();
        inputs.push((
            COMBINED_BASE_NAME.to_string(),
            self.config.cleaned_dir().join("filtered_items.csv"),
        ));
        inputs
    }

    fn summarize_file(&self, base_name: &str, path: &std::path::Path) -> Result<()> {
        let df = DataLoader::food_prices()
            .load(path)
            .with_context(|| format!("Failed to summarize {}", base_name))?;

        let keep: Vec<bool> = frame::str_values(&df, GEO)?
            .iter()
            .map(|g| g.as_deref().is_some_and(|g| self.config.is_province(g)))
            .collect();
        let provincial = periods::with_year(&filter_rows(&df, &keep)?)?;
        let renamed = select_renamed(
            &provincial,
            &[
                (PRODUCTS, PRODUCTS),
                (GEO, "province"),
                (REF_DATE, "date"),
                (VALUE, "value"),
                (YEAR, "year"),
            ],
        )?;

        let mut items = group_mean(&renamed, &[PRODUCTS, "province", "year"], "value", "avg_total_yearly")?;
        write_csv(
            &mut items,
            &self.config.years_dir(),
            &format!("{}_item.csv", base_name),
        )?;

        let mut overall = group_mean(&renamed, &[PRODUCTS, "province"], "value", "avg_total")?;
        write_csv(
            &mut overall,
            &self.config.avg_dir(),
            &format!("{}_avg_prov.csv", base_name),
        )?;
        Ok(())
    }

    /// Mean of each category's yearly item summary by year and province,
    /// categories stacked in name order.
    fn avg_year_prov(&self) -> Result<DataFrame> {
        let mut frames = Vec::new();
        for category in self.config.sorted_category_names() {
            let path = self.config.years_dir().join(format!("{}_item.csv", category));
            let items = read_table(
                &path,
                &["year", "province", "avg_total_yearly"],
                &[
                    ("year", DataType::Int32),
                    ("avg_total_yearly", DataType::Float64),
                ],
            )?;
            let mut grouped = group_mean(&items, &["year", "province"], "avg_total_yearly", "avg_value")?;
            let labels = vec![category.as_str(); grouped.height()];
            grouped.with_column(Series::new("category".into(), labels))?;
            frames.push(grouped.lazy());
        }

        let combined = concat(frames.as_slice(), UnionArgs::default())?.collect()?;
        info!("{} province-year category means", combined.height());
        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning_processor::CleaningProcessor;
    use crate::test_support::fixture_config;
    use price_analysis::frame::{read_csv, str_values};
    use tempfile::TempDir;

    #[test]
    fn test_region_summaries() {
        let dir = TempDir::new().unwrap();
        let config = fixture_config(&dir);
        CleaningProcessor::new(&config).run().unwrap();
        RegionSummaryProcessor::new(&config).run().unwrap();

        let items = read_csv(&config.food_prices_item_path()).unwrap();
        let columns: Vec<String> = items.get_columns().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(columns, vec!["Products", "province", "year", "avg_total_yearly"]);
        // 4 products x 5 provinces x 10 years, Canada excluded.
        assert_eq!(items.height(), 200);
        assert!(str_values(&items, "province")
            .unwrap()
            .iter()
            .all(|p| p.as_deref() != Some("Canada")));

        let overall = read_csv(&config.avg_dir().join("dairy_avg_prov.csv")).unwrap();
        assert_eq!(overall.height(), 5);

        let avg = read_csv(&config.avg_year_prov_path()).unwrap();
        let categories = frame::distinct_in_order(&str_values(&avg, "category").unwrap());
        assert_eq!(categories, vec!["dairy", "fruits", "meats", "veggies"]);
        assert_eq!(avg.height(), 4 * 5 * 10);
    }
}
