use crate::models::{Coast, ProductCategory, RegionType};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const PROVINCES: [&str; 10] = [
    "British Columbia",
    "Alberta",
    "Manitoba",
    "Quebec",
    "Ontario",
    "Saskatchewan",
    "Prince Edward Island",
    "Newfoundland and Labrador",
    "New Brunswick",
    "Nova Scotia",
];

pub const COAST_BY_PROVINCE: [(&str, Coast); 10] = [
    ("British Columbia", Coast::West),
    ("Alberta", Coast::Interior),
    ("Saskatchewan", Coast::Interior),
    ("Manitoba", Coast::Interior),
    ("Ontario", Coast::Interior),
    ("Quebec", Coast::Interior),
    ("Newfoundland and Labrador", Coast::East),
    ("Nova Scotia", Coast::East),
    ("New Brunswick", Coast::East),
    ("Prince Edward Island", Coast::East),
];

pub const REGION_TYPE_BY_PROVINCE: [(&str, RegionType); 10] = [
    ("Ontario", RegionType::Urban),
    ("Quebec", RegionType::Urban),
    ("Alberta", RegionType::Urban),
    ("British Columbia", RegionType::Urban),
    ("New Brunswick", RegionType::Urban),
    ("Nova Scotia", RegionType::Urban),
    ("Manitoba", RegionType::Rural),
    ("Saskatchewan", RegionType::Rural),
    ("Prince Edward Island", RegionType::Rural),
    ("Newfoundland and Labrador", RegionType::Rural),
];

/// Product labels are matched byte for byte, trailing spaces included.
pub const CATEGORY_PRODUCTS: [(&str, &[&str]); 13] = [
    (
        "meats",
        &[
            "Ground beef, per kilogram",
            "Pork loin cuts, per kilogram",
            "Chicken breasts, per kilogram",
            "Bacon, 500 grams",
            "Wieners, 400 grams",
        ],
    ),
    ("seafood", &["Salmon, per kilogram", "Shrimp, 300 grams"]),
    (
        "meat_alts",
        &["Meatless burgers, 226 grams", "Tofu, 350 grams ", "Eggs, 1 dozen"],
    ),
    (
        "dairy",
        &[
            "Milk, 4 litres",
            "Cream, 1 litre",
            "Butter, 454 grams",
            "Margarine, 907 grams",
            "Block cheese, 500 grams",
            "Yogurt, 500 grams",
        ],
    ),
    (
        "fruits",
        &[
            "Apples, per kilogram",
            "Oranges, per kilogram",
            "Bananas, per kilogram",
            "Pears, per kilogram",
            "Lemons, unit",
            "Limes, unit",
            "Grapes, per kilogram",
            "Cantaloupe, unit",
            "Avocado, unit",
        ],
    ),
    (
        "veggies",
        &[
            "Potatoes, per kilogram",
            "Tomatoes, per kilogram",
            "Cabbage, per kilogram",
            "Onions, per kilogram",
            "Celery, unit",
            "Cucumber, unit",
            "Iceberg lettuce, unit",
            "Broccoli, unit",
            "Peppers, per kilogram",
            "Squash, per kilogram",
        ],
    ),
    (
        "grains",
        &[
            "White bread, 675 grams",
            "Flatbread and pita, 500 grams ",
            "Dry or fresh pasta, 500 grams",
            "Cereal, 400 grams",
        ],
    ),
    (
        "drinks",
        &[
            "Apple juice, 2 litres",
            "Orange juice, 2 litres",
            "Roasted or ground coffee, 340 grams",
            "Tea (20 bags)",
        ],
    ),
    (
        "condiments",
        &[
            "Ketchup, 1 litre",
            "Vegetable oil, 3 litres",
            "Mayonnaise, 890 millilitres ",
            "Salsa, 418 millilitres",
            "Pasta sauce, 650 millilitres",
            "Salad dressing, 475 millilitres",
        ],
    ),
    (
        "canned",
        &[
            "Canned soup, 284 millilitres",
            "Canned beans and lentils, 540 millilitres",
        ],
    ),
    ("nuts", &["Almonds, 200 grams", "Peanuts, 450 grams"]),
    ("baby", &["Baby food, 128 millilitres", "Infant formula, 900 grams "]),
    (
        "pantry",
        &[
            "White sugar, 2 kilograms",
            "Wheat flour, 2.5 kilograms",
            "Brown rice, 900 grams ",
            "White rice, 2 kilograms",
        ],
    ),
];

pub const REGION_CATEGORIES: [&str; 4] = ["fruits", "veggies", "meats", "dairy"];

/// Inputs, outputs, and lookup tables for every pipeline stage.
///
/// Every field defaults to the StatCan extract layout, so a
/// JSON config file only needs to name what it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub food_prices_path: PathBuf,
    pub population_path: PathBuf,
    pub income_path: PathBuf,
    pub output_root: PathBuf,
    pub provinces: Vec<String>,
    pub categories: Vec<ProductCategory>,
    pub coast_by_province: BTreeMap<String, Coast>,
    pub region_type_by_province: BTreeMap<String, RegionType>,
    pub region_categories: Vec<String>,
    /// Month selected into `current_prices.csv`, as `YYYY-MM`.
    pub current_month: String,
    pub render_charts: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            food_prices_path: PathBuf::from("food_prices_sample.csv"),
            population_path: PathBuf::from("population.csv"),
            income_path: PathBuf::from("income.csv"),
            output_root: PathBuf::from("."),
            provinces: PROVINCES.iter().map(|p| p.to_string()).collect(),
            categories: CATEGORY_PRODUCTS
                .iter()
                .map(|(name, products)| ProductCategory::new(name, products))
                .collect(),
            coast_by_province: COAST_BY_PROVINCE
                .iter()
                .map(|(province, coast)| (province.to_string(), *coast))
                .collect(),
            region_type_by_province: REGION_TYPE_BY_PROVINCE
                .iter()
                .map(|(province, kind)| (province.to_string(), *kind))
                .collect(),
            region_categories: REGION_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            current_month: "2024-08".to_string(),
            render_charts: true,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn cleaned_dir(&self) -> PathBuf {
        self.output_root.join("cleaned_data")
    }

    pub fn split_dir(&self) -> PathBuf {
        self.output_root.join("split_data")
    }

    pub fn temporal_dir(&self) -> PathBuf {
        self.output_root.join("output").join("temporal")
    }

    pub fn geo_csv_dir(&self) -> PathBuf {
        self.output_root.join("output").join("geo_csv")
    }

    pub fn years_dir(&self) -> PathBuf {
        self.geo_csv_dir().join("years")
    }

    pub fn avg_dir(&self) -> PathBuf {
        self.geo_csv_dir().join("avg")
    }

    pub fn regions_dir(&self) -> PathBuf {
        self.geo_csv_dir().join("regions")
    }

    pub fn urban_rural_dir(&self) -> PathBuf {
        self.geo_csv_dir().join("urban_rural")
    }

    pub fn png_dir(&self) -> PathBuf {
        self.output_root.join("output").join("geo_png")
    }

    /// Yearly item summary of the combined allow-listed table.
    pub fn food_prices_item_path(&self) -> PathBuf {
        self.years_dir().join("food_prices_item.csv")
    }

    pub fn avg_year_prov_path(&self) -> PathBuf {
        self.geo_csv_dir().join("avg_year_prov.csv")
    }

    pub fn is_province(&self, geo: &str) -> bool {
        self.provinces.iter().any(|p| p == geo)
    }

    pub fn coast_for(&self, province: &str) -> Option<Coast> {
        self.coast_by_province.get(province).copied()
    }

    pub fn region_type_for(&self, province: &str) -> Option<RegionType> {
        self.region_type_by_province.get(province).copied()
    }

    pub fn is_region_category(&self, category: &str) -> bool {
        let lowered = category.to_lowercase();
        self.region_categories.iter().any(|c| c.to_lowercase() == lowered)
    }

    /// Category names in lexical order, the order summaries are concatenated in.
    pub fn sorted_category_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.categories.iter().map(|c| c.name.clone()).collect();
        names.sort();
        names
    }
}
