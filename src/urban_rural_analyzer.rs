use crate::visualization::ChartRenderer;
use anyhow::Result;
use log::{info, warn};
use polars::prelude::*;
use price_analysis::aggregator::group_mean;
use price_analysis::frame::{self, filter_rows, read_table, write_csv};
use price_analysis::models::{RegionType, PRODUCTS};
use price_analysis::significance::mann_whitney_u;
use price_analysis::PipelineConfig;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Urban and rural means closer than this skip the basic test.
const NEGLIGIBLE_DIFF: f64 = 1e-6;

/// Urban against rural provinces, per product and per region category.
pub struct UrbanRuralAnalyzer<'a> {
    config: &'a PipelineConfig,
}

/// Urban and rural mean of one product.
#[derive(Debug, Clone, PartialEq)]
struct ProductPair {
    product: String,
    urban: Option<f64>,
    rural: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct BasicRow {
    product: String,
    u_statistic: Option<f64>,
    p_value: Option<f64>,
    notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct ExtendedRow {
    product: String,
    u_statistic: Option<f64>,
    p_value: Option<f64>,
    effect_size: Option<f64>,
    diff: Option<f64>,
    percent_diff: Option<f64>,
    notes: Option<String>,
}

impl<'a> UrbanRuralAnalyzer<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<()> {
        let out_dir = self.config.urban_rural_dir();

        let mut by_region = self.average_by_region()?;
        write_csv(&mut by_region, &out_dir, "avg_val_urban_rural.csv")?;

        let mut summary = self.region_summary()?;
        let pairs = pivot_region_types(&summary)?;

        let basic: Vec<BasicRow> = pairs.iter().map(basic_test).collect();
        write_csv(&mut basic_table(&basic)?, &out_dir, "mannwhitneyu_results.csv")?;

        let mut extended: Vec<ExtendedRow> = pairs.iter().map(extended_test).collect();
        extended.sort_by(|a, b| descending_nulls_last(a.diff, b.diff));
        write_csv(
            &mut extended_table(&extended)?,
            &out_dir,
            "mannwhitneyu_results_small.csv",
        )?;

        if self.config.render_charts {
            self.plot(&pairs, &by_region)?;
        }
        write_csv(&mut summary, &out_dir, "urban_vs_rural_summary.csv")?;
        info!("Urban and rural comparison complete");
        Ok(())
    }

    /// Mean of the region categories by urban/rural region and year.
    fn average_by_region(&self) -> Result<DataFrame> {
        let df = read_table(
            &self.config.avg_year_prov_path(),
            &["year", "province", "avg_value", "category"],
            &[("year", DataType::Int32), ("avg_value", DataType::Float64)],
        )?;
        let regions: Vec<Option<&str>> = frame::str_values(&df, "province")?
            .iter()
            .map(|p| {
                p.as_deref()
                    .and_then(|p| self.config.region_type_for(p))
                    .map(|r| r.as_str())
            })
            .collect();
        let keep: Vec<bool> = regions
            .iter()
            .zip(frame::str_values(&df, "category")?)
            .map(|(region, category)| {
                region.is_some()
                    && category.is_some_and(|c| self.config.is_region_category(&c))
            })
            .collect();

        let mut labeled = df.clone();
        labeled.with_column(Series::new("region".into(), regions))?;
        let labeled = filter_rows(&labeled, &keep)?;
        group_mean(&labeled, &["region", "year", "category"], "avg_value", "avg_value")
    }

    /// `Products, region_type, region_avg` over the yearly item summary.
    fn region_summary(&self) -> Result<DataFrame> {
        let items = read_table(
            &self.config.food_prices_item_path(),
            &[PRODUCTS, "province", "year", "avg_total_yearly"],
            &[("avg_total_yearly", DataType::Float64)],
        )?;
        let region_types: Vec<&str> = frame::str_values(&items, "province")?
            .iter()
            .map(|p| {
                let region_type = match p.as_deref().and_then(|p| self.config.region_type_for(p)) {
                    Some(RegionType::Urban) => RegionType::Urban,
                    _ => RegionType::Rural,
                };
                region_type.as_str()
            })
            .collect();

        let mut typed = items.clone();
        typed.with_column(Series::new("region_type".into(), region_types))?;
        group_mean(&typed, &[PRODUCTS, "region_type"], "avg_total_yearly", "region_avg")
    }

    fn plot(&self, pairs: &[ProductPair], by_region: &DataFrame) -> Result<()> {
        let renderer = ChartRenderer::new(&self.config.png_dir())?;

        let labels: Vec<String> = pairs.iter().map(|p| p.product.clone()).collect();
        let bars = vec![
            ("Rural".to_string(), pairs.iter().map(|p| p.rural).collect()),
            ("Urban".to_string(), pairs.iter().map(|p| p.urban).collect()),
        ];
        renderer.grouped_bar(
            "urban_vs_rural_prices.png",
            "Urban vs Rural Average Prices by Product",
            "Average Price",
            &labels,
            &bars,
        )?;

        let regions = frame::str_values(by_region, "region")?;
        let years = frame::i32_values(by_region, "year")?;
        let categories = frame::str_values(by_region, "category")?;
        let values = frame::f64_values(by_region, "avg_value")?;
        let mut lines: BTreeMap<String, Vec<(f64, f64)>> = BTreeMap::new();
        for i in 0..by_region.height() {
            if let (Some(region), Some(year), Some(category), Some(value)) =
                (&regions[i], years[i], &categories[i], values[i])
            {
                lines
                    .entry(format!("{} / {}", region, category))
                    .or_default()
                    .push((year as f64, value));
            }
        }
        let series: Vec<(String, Vec<(f64, f64)>)> = lines.into_iter().collect();
        renderer.line_chart(
            "yearly_trends_by_region_and_category.png",
            "Yearly Trends in Average Values by Region and Category",
            "Year",
            "Average Value ($)",
            &series,
        )?;
        Ok(())
    }
}

/// One row per product in lexical order, with its urban and rural means.
fn pivot_region_types(summary: &DataFrame) -> Result<Vec<ProductPair>> {
    let products = frame::str_values(summary, PRODUCTS)?;
    let types = frame::str_values(summary, "region_type")?;
    let values = frame::f64_values(summary, "region_avg")?;

    let mut pairs: BTreeMap<String, ProductPair> = BTreeMap::new();
    for i in 0..summary.height() {
        let Some(product) = products[i].clone() else {
            continue;
        };
        let pair = pairs.entry(product.clone()).or_insert_with(|| ProductPair {
            product,
            urban: None,
            rural: None,
        });
        match types[i].as_deref() {
            Some("Urban") => pair.urban = values[i],
            Some("Rural") => pair.rural = values[i],
            _ => {}
        }
    }
    Ok(pairs.into_values().collect())
}

fn basic_test(pair: &ProductPair) -> BasicRow {
    let mut row = BasicRow {
        product: pair.product.clone(),
        ..BasicRow::default()
    };
    let (Some(urban), Some(rural)) = (pair.urban, pair.rural) else {
        row.notes = Some("Missing data".to_string());
        return row;
    };
    if (urban - rural).abs() < NEGLIGIBLE_DIFF {
        row.notes = Some("Very small mean difference (treated as negligible)".to_string());
        return row;
    }

    match mann_whitney_u(&[urban], &[rural]) {
        Ok(result) => {
            row.u_statistic = Some(result.statistic);
            row.p_value = Some(result.p_value);
        }
        Err(e) => {
            warn!("Mann-Whitney U failed for {}: {}", pair.product, e);
            row.notes = Some(format!("Error: {}", e));
        }
    }
    row
}

/// The basic test plus the signed, relative, and normalized difference.
fn extended_test(pair: &ProductPair) -> ExtendedRow {
    let mut row = ExtendedRow {
        product: pair.product.clone(),
        ..ExtendedRow::default()
    };
    let (Some(urban), Some(rural)) = (pair.urban, pair.rural) else {
        row.notes = Some("Missing data".to_string());
        return row;
    };

    let diff = urban - rural;
    match mann_whitney_u(&[urban], &[rural]) {
        Ok(result) => {
            let mean_price = (urban + rural) / 2.0;
            row.u_statistic = Some(result.statistic);
            row.p_value = Some(result.p_value);
            row.effect_size = (mean_price != 0.0).then(|| diff / mean_price);
            row.diff = Some(diff);
            row.percent_diff = (rural != 0.0).then(|| diff / rural * 100.0);
        }
        Err(e) => {
            warn!("Mann-Whitney U failed for {}: {}", pair.product, e);
            row.notes = Some(format!("Error: {}", e));
        }
    }
    row
}

fn descending_nulls_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn basic_table(rows: &[BasicRow]) -> Result<DataFrame> {
    Ok(df!(
        "Product" => rows.iter().map(|r| r.product.clone()).collect::<Vec<_>>(),
        "U-Statistic" => rows.iter().map(|r| r.u_statistic).collect::<Vec<_>>(),
        "P-Value" => rows.iter().map(|r| r.p_value).collect::<Vec<_>>(),
        "Notes" => rows.iter().map(|r| r.notes.clone()).collect::<Vec<_>>()
    )?)
}

fn extended_table(rows: &[ExtendedRow]) -> Result<DataFrame> {
    Ok(df!(
        "Product" => rows.iter().map(|r| r.product.clone()).collect::<Vec<_>>(),
        "U-Statistic" => rows.iter().map(|r| r.u_statistic).collect::<Vec<_>>(),
        "P-Value" => rows.iter().map(|r| r.p_value).collect::<Vec<_>>(),
        "Effect Size" => rows.iter().map(|r| r.effect_size).collect::<Vec<_>>(),
        "Urban-Rural Diff" => rows.iter().map(|r| r.diff).collect::<Vec<_>>(),
        "Percent Diff (%)" => rows.iter().map(|r| r.percent_diff).collect::<Vec<_>>(),
        "Notes" => rows.iter().map(|r| r.notes.clone()).collect::<Vec<_>>()
    )?)
}
