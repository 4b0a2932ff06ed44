//! Synthetic StatCan-shaped extracts for the stage tests.

use price_analysis::PipelineConfig;
use std::fmt::Write;
use std::path::Path;
use tempfile::TempDir;

pub const GEOS: [&str; 6] = [
    "Canada",
    "Ontario",
    "British Columbia",
    "Nova Scotia",
    "Manitoba",
    "Prince Edward Island",
];

/// Product label, base price. The last one is in no category.
pub const PRODUCTS: [(&str, f64); 5] = [
    ("Apples, per kilogram", 4.5),
    ("Milk, 4 litres", 6.2),
    ("Bacon, 500 grams", 7.8),
    ("Potatoes, per kilogram", 2.9),
    ("Caviar, 50 grams", 95.0),
];

fn months(from: (i32, u32), to: (i32, u32)) -> Vec<(i32, u32)> {
    let mut out = Vec::new();
    let (mut y, mut m) = from;
    while (y, m) <= to {
        out.push((y, m));
        m += 1;
        if m > 12 {
            m = 1;
            y += 1;
        }
    }
    out
}

fn write_food_prices(path: &Path) {
    let mut csv = String::from("REF_DATE,GEO,DGUID,Products,UOM,VALUE,STATUS\n");
    for (t, (y, m)) in months((2015, 6), (2024, 8)).iter().enumerate() {
        for (g, geo) in GEOS.iter().enumerate() {
            for (p, (product, base)) in PRODUCTS.iter().enumerate() {
                let wiggle = ((t * 7 + g * 3 + p * 5) % 11) as f64 * 0.03;
                let value = base * (1.0 + 0.002 * t as f64) + wiggle + g as f64 * 0.1;
                writeln!(
                    csv,
                    "{y}-{m:02},{geo},x,\"{product}\",Dollars,{value:.2},"
                )
                .unwrap();
            }
        }
    }
    // Suppressed observation.
    csv.push_str("2024-08,Ontario,x,\"Milk, 4 litres\",Dollars,,..\n");
    std::fs::write(path, csv).unwrap();
}

fn write_population(path: &Path) {
    let mut csv = String::from("REF_DATE,GEO,DGUID,VALUE\n");
    for (t, (y, m)) in months((2017, 1), (2024, 7)).iter().enumerate() {
        if (m - 1) % 3 != 0 {
            continue;
        }
        for (g, geo) in GEOS.iter().enumerate() {
            let value = 150_000.0 * (g as f64 + 1.0) + 400.0 * t as f64;
            writeln!(csv, "{y}-{m:02},{geo},x,{value:.0}").unwrap();
        }
    }
    std::fs::write(path, csv).unwrap();
}

fn write_income(path: &Path) {
    let mut csv = String::from("REF_DATE,GEO,DGUID,Estimate,VALUE\n");
    for (t, (y, m)) in months((2017, 1), (2024, 8)).iter().enumerate() {
        for (g, geo) in GEOS.iter().enumerate() {
            let value = 950.0 + 35.0 * g as f64 + 1.5 * t as f64 + ((t + g) % 4) as f64;
            writeln!(csv, "{y}-{m:02},{geo},x,Average weekly earnings,{value:.2}").unwrap();
        }
    }
    std::fs::write(path, csv).unwrap();
}

/// Writes the three extracts into `dir` and returns a chart-less config
/// rooted there.
pub fn fixture_config(dir: &TempDir) -> PipelineConfig {
    let root = dir.path();
    let food_prices_path = root.join("food_prices_sample.csv");
    let population_path = root.join("population.csv");
    let income_path = root.join("income.csv");
    write_food_prices(&food_prices_path);
    write_population(&population_path);
    write_income(&income_path);

    PipelineConfig {
        food_prices_path,
        population_path,
        income_path,
        output_root: root.to_path_buf(),
        render_charts: false,
        ..PipelineConfig::default()
    }
}
