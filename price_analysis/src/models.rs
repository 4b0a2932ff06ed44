use serde::{Deserialize, Serialize};

// Column names shared by the raw StatCan extracts and the derived tables.
pub const REF_DATE: &str = "REF_DATE";
pub const GEO: &str = "GEO";
pub const PRODUCTS: &str = "Products";
pub const VALUE: &str = "VALUE";
pub const YEAR: &str = "Year";
pub const QUARTER: &str = "Quarter";
pub const COVID_PERIOD: &str = "COVID_Period";
pub const PRESIDENCY_PERIOD: &str = "Presidency_Period";
pub const COAST: &str = "Coast";

/// The raw food price extract carries a product label, the others do not.
pub const FOOD_PRICE_COLUMNS: [&str; 4] = [REF_DATE, GEO, PRODUCTS, VALUE];
pub const INDICATOR_COLUMNS: [&str; 3] = [REF_DATE, GEO, VALUE];

/// Aggregate row that is not a province.
pub const NATIONAL_GEO: &str = "Canada";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CovidPeriod {
    #[serde(rename = "Pre-COVID")]
    Pre,
    #[serde(rename = "During-COVID")]
    During,
    #[serde(rename = "Post-COVID")]
    Post,
}

impl CovidPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CovidPeriod::Pre => "Pre-COVID",
            CovidPeriod::During => "During-COVID",
            CovidPeriod::Post => "Post-COVID",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PresidencyPeriod {
    #[serde(rename = "Pre-Trump")]
    Pre,
    #[serde(rename = "During-Trump")]
    During,
    #[serde(rename = "Post-Trump")]
    Post,
}

impl PresidencyPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresidencyPeriod::Pre => "Pre-Trump",
            PresidencyPeriod::During => "During-Trump",
            PresidencyPeriod::Post => "Post-Trump",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Coast {
    #[serde(rename = "West Coast")]
    West,
    #[serde(rename = "Interior")]
    Interior,
    #[serde(rename = "East Coast")]
    East,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Coast {
    pub fn as_str(&self) -> &'static str {
        match self {
            Coast::West => "West Coast",
            Coast::Interior => "Interior",
            Coast::East => "East Coast",
            Coast::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RegionType {
    Urban,
    Rural,
}

impl RegionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionType::Urban => "Urban",
            RegionType::Rural => "Rural",
        }
    }
}

/// A named allow-list of exact product labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCategory {
    pub name: String,
    pub products: Vec<String>,
}

impl ProductCategory {
    pub fn new(name: &str, products: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            products: products.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn contains(&self, product: &str) -> bool {
        self.products.iter().any(|p| p == product)
    }
}
