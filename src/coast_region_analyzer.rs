use crate::visualization::ChartRenderer;
use anyhow::Result;
use log::info;
use polars::prelude::*;
use price_analysis::aggregator::group_mean;
use price_analysis::frame::{self, filter_rows, read_table, write_csv};
use price_analysis::models::Coast;
use price_analysis::significance::kruskal_wallis;
use price_analysis::PipelineConfig;
use std::collections::BTreeMap;

/// Regional means of the region-comparison categories and the tests
/// between the coasts and the interior.
pub struct CoastRegionAnalyzer<'a> {
    config: &'a PipelineConfig,
}

/// One `(region, year, category, avg_value)` row of the regional table.
#[derive(Debug, Clone, PartialEq)]
struct RegionRow {
    region: String,
    year: i32,
    category: String,
    avg_value: f64,
}

impl<'a> CoastRegionAnalyzer<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<()> {
        let mut regional = self.average_by_region()?;
        write_csv(&mut regional, &self.config.regions_dir(), "avg_value_reg.csv")?;
        let rows = region_rows(&regional)?;

        let mut pairwise = pairwise_differences(&rows)?;
        write_csv(
            &mut pairwise,
            &self.config.geo_csv_dir(),
            "pairwise_region_comparison_results.csv",
        )?;

        let mut kruskal = kruskal_by_category(&rows)?;
        write_csv(
            &mut kruskal,
            &self.config.geo_csv_dir(),
            "extended_region_comparison_results.csv",
        )?;

        if self.config.render_charts {
            self.plot(&rows)?;
        }
        info!("Coast region analysis complete");
        Ok(())
    }

    /// Provinces mapped to their coast, restricted to the comparison categories.
    fn average_by_region(&self) -> Result<DataFrame> {
        let df = read_table(
            &self.config.avg_year_prov_path(),
            &["year", "province", "avg_value", "category"],
            &[("year", DataType::Int32), ("avg_value", DataType::Float64)],
        )?;

        let provinces = frame::str_values(&df, "province")?;
        let categories = frame::str_values(&df, "category")?;
        let regions: Vec<Option<&str>> = provinces
            .iter()
            .map(|p| p.as_deref().and_then(|p| self.config.coast_for(p)).map(|c| c.as_str()))
            .collect();
        let keep: Vec<bool> = regions
            .iter()
            .zip(&categories)
            .map(|(region, category)| {
                region.is_some()
                    && category
                        .as_deref()
                        .is_some_and(|c| self.config.is_region_category(c))
            })
            .collect();

        let mut labeled = df.clone();
        labeled.with_column(Series::new("region".into(), regions))?;
        let labeled = filter_rows(&labeled, &keep)?;
        group_mean(&labeled, &["region", "year", "category"], "avg_value", "avg_value")
    }

    fn plot(&self, rows: &[RegionRow]) -> Result<()> {
        let renderer = ChartRenderer::new(&self.config.png_dir())?;

        let mut lines: BTreeMap<(String, String), Vec<(f64, f64)>> = BTreeMap::new();
        for row in rows {
            lines
                .entry((row.region.clone(), row.category.clone()))
                .or_default()
                .push((row.year as f64, row.avg_value));
        }
        let series: Vec<(String, Vec<(f64, f64)>)> = lines
            .into_iter()
            .map(|((region, category), points)| (format!("{} / {}", region, category), points))
            .collect();
        renderer.line_chart(
            "line_Regions.png",
            "Trends of Average Values Over Years by Region and Category",
            "Year",
            "Average Value",
            &series,
        )?;

        let (row_labels, col_labels, values) = pivot_by_year(rows);
        renderer.heatmap(
            "heatmap_differences_regions.png",
            "Heatmap of Average Values by Region and Category Over Years",
            &row_labels,
            &col_labels,
            &values,
        )?;
        Ok(())
    }
}

fn region_rows(df: &DataFrame) -> Result<Vec<RegionRow>> {
    let regions = frame::str_values(df, "region")?;
    let years = frame::i32_values(df, "year")?;
    let categories = frame::str_values(df, "category")?;
    let values = frame::f64_values(df, "avg_value")?;

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        if let (Some(region), Some(year), Some(category), Some(avg_value)) = (
            regions[i].clone(),
            years[i],
            categories[i].clone(),
            values[i],
        ) {
            rows.push(RegionRow {
                region,
                year,
                category,
                avg_value,
            });
        }
    }
    Ok(rows)
}

/// Values of `region` among `rows`.
fn region_values<'r>(rows: impl Iterator<Item = &'r RegionRow>, region: Coast) -> Vec<f64> {
    rows.filter(|r| r.region == region.as_str())
        .map(|r| r.avg_value)
        .collect()
}

/// Absolute differences between the regions for every `(year, category)`
/// where each region has exactly one value.
fn pairwise_differences(rows: &[RegionRow]) -> Result<DataFrame> {
    let mut years = Vec::new();
    let mut categories = Vec::new();
    let mut east_west = Vec::new();
    let mut east_interior = Vec::new();
    let mut west_interior = Vec::new();

    let mut keys: Vec<(i32, &str)> = Vec::new();
    for row in rows {
        let key = (row.year, row.category.as_str());
        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    for (year, category) in keys {
        let cell = || {
            rows.iter()
                .filter(move |r| r.year == year && r.category == category)
        };
        let east = region_values(cell(), Coast::East);
        let west = region_values(cell(), Coast::West);
        let interior = region_values(cell(), Coast::Interior);
        if let ([e], [w], [i]) = (east.as_slice(), west.as_slice(), interior.as_slice()) {
            years.push(year);
            categories.push(category.to_string());
            east_west.push((e - w).abs());
            east_interior.push((e - i).abs());
            west_interior.push((w - i).abs());
        }
    }

    Ok(df!(
        "year" => years,
        "category" => categories,
        "diff_east_west" => east_west,
        "diff_east_interior" => east_interior,
        "diff_west_interior" => west_interior
    )?)
}

/// Kruskal-Wallis H across the three regions' yearly values, per category.
fn kruskal_by_category(rows: &[RegionRow]) -> Result<DataFrame> {
    let mut categories: Vec<String> = Vec::new();
    for row in rows {
        if !categories.contains(&row.category) {
            categories.push(row.category.clone());
        }
    }

    let mut tested = Vec::new();
    let mut statistics = Vec::new();
    let mut p_values = Vec::new();
    for category in categories {
        let in_category = || rows.iter().filter(|r| r.category == category);
        let east = region_values(in_category(), Coast::East);
        let west = region_values(in_category(), Coast::West);
        let interior = region_values(in_category(), Coast::Interior);
        if east.is_empty() || west.is_empty() || interior.is_empty() {
            info!("Skipping {}: a region has no values", category);
            continue;
        }

        let samples: [&[f64]; 3] = [&east, &west, &interior];
        let result = kruskal_wallis(&samples)?;
        tested.push(category);
        statistics.push(result.statistic);
        p_values.push(result.p_value);
    }

    Ok(df!(
        "category" => tested,
        "kruskal_stat" => statistics,
        "kruskal_p" => p_values
    )?)
}

/// `region / category` rows by year columns.
fn pivot_by_year(rows: &[RegionRow]) -> (Vec<String>, Vec<String>, Vec<Vec<Option<f64>>>) {
    let mut cells: BTreeMap<String, BTreeMap<i32, f64>> = BTreeMap::new();
    let mut years: Vec<i32> = rows.iter().map(|r| r.year).collect();
    years.sort_unstable();
    years.dedup();
    for row in rows {
        cells
            .entry(format!("{} / {}", row.region, row.category))
            .or_default()
            .insert(row.year, row.avg_value);
    }

    let row_labels: Vec<String> = cells.keys().cloned().collect();
    let values = cells
        .values()
        .map(|by_year| years.iter().map(|y| by_year.get(y).copied()).collect())
        .collect();
    let col_labels = years.iter().map(|y| y.to_string()).collect();
    (row_labels, col_labels, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning_processor::CleaningProcessor;
    use crate::region_summary_processor::RegionSummaryProcessor;
    use crate::test_support::fixture_config;
    use price_analysis::frame::read_csv;
    use tempfile::TempDir;

    fn row(region: Coast, year: i32, category: &str, avg_value: f64) -> RegionRow {
        RegionRow {
            region: region.as_str().to_string(),
            year,
            category: category.to_string(),
            avg_value,
        }
    }

    #[test]
    fn test_pairwise_needs_one_value_per_region() {
        let rows = vec![
            row(Coast::East, 2020, "fruits", 5.0),
            row(Coast::West, 2020, "fruits", 4.0),
            row(Coast::Interior, 2020, "fruits", 3.5),
            row(Coast::East, 2021, "fruits", 5.0),
            row(Coast::West, 2021, "fruits", 4.0),
        ];
        let out = pairwise_differences(&rows).unwrap();
        assert_eq!(out.height(), 1);
        assert_eq!(frame::f64_values(&out, "diff_east_west").unwrap(), vec![Some(1.0)]);
        assert_eq!(frame::f64_values(&out, "diff_east_interior").unwrap(), vec![Some(1.5)]);
        assert_eq!(frame::f64_values(&out, "diff_west_interior").unwrap(), vec![Some(0.5)]);
    }

    #[test]
    fn test_kruskal_skips_category_missing_a_region() {
        let rows = vec![
            row(Coast::East, 2020, "dairy", 1.0),
            row(Coast::East, 2021, "dairy", 2.0),
            row(Coast::West, 2020, "dairy", 4.0),
            row(Coast::West, 2021, "dairy", 5.0),
            row(Coast::Interior, 2020, "dairy", 7.0),
            row(Coast::Interior, 2021, "dairy", 8.0),
            row(Coast::East, 2020, "veggies", 1.0),
        ];
        let out = kruskal_by_category(&rows).unwrap();
        assert_eq!(out.height(), 1);
        let h = frame::f64_values(&out, "kruskal_stat").unwrap()[0].unwrap();
        // Ranks 1+2, 3+4, 5+6: H = 12/42 * (9+49+121)/2 - 21
        assert!((h - (12.0 / 42.0 * 179.0 / 2.0 - 21.0)).abs() < 1e-9);
    }

    #[test]
    fn test_coast_region_stage() {
        let dir = TempDir::new().unwrap();
        let config = fixture_config(&dir);
        CleaningProcessor::new(&config).run().unwrap();
        RegionSummaryProcessor::new(&config).run().unwrap();
        CoastRegionAnalyzer::new(&config).run().unwrap();

        let regional = read_csv(&config.regions_dir().join("avg_value_reg.csv")).unwrap();
        // 3 regions x 10 years x fruits, veggies, meats, dairy.
        assert_eq!(regional.height(), 120);

        let pairwise =
            read_csv(&config.geo_csv_dir().join("pairwise_region_comparison_results.csv")).unwrap();
        assert_eq!(pairwise.height(), 40);

        let kruskal =
            read_csv(&config.geo_csv_dir().join("extended_region_comparison_results.csv")).unwrap();
        assert_eq!(kruskal.height(), 4);
    }
}
