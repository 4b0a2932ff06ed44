use crate::frame::{self, filter_rows};
use crate::models::{ProductCategory, PRODUCTS};
use anyhow::Result;
use polars::prelude::DataFrame;

pub struct CategorySplit {
    /// One table per category, in category order.
    pub per_category: Vec<(String, DataFrame)>,
    /// Every row whose product belongs to some category.
    pub combined: DataFrame,
}

/// Splits a product-level table by an allow-list of exact product labels.
pub struct CategorySplitter<'a> {
    categories: &'a [ProductCategory],
}

impl<'a> CategorySplitter<'a> {
    pub fn new(categories: &'a [ProductCategory]) -> Self {
        Self { categories }
    }

    pub fn category_of(&self, product: &str) -> Option<&'a str> {
        self.categories
            .iter()
            .find(|c| c.contains(product))
            .map(|c| c.name.as_str())
    }

    pub fn split(&self, df: &DataFrame) -> Result<CategorySplit> {
        let products = frame::str_values(df, PRODUCTS)?;

        let mut per_category = Vec::with_capacity(self.categories.len());
        for category in self.categories {
            let keep: Vec<bool> = products
                .iter()
                .map(|p| p.as_deref().is_some_and(|p| category.contains(p)))
                .collect();
            per_category.push((category.name.clone(), filter_rows(df, &keep)?));
        }

        let keep: Vec<bool> = products
            .iter()
            .map(|p| p.as_deref().and_then(|p| self.category_of(p)).is_some())
            .collect();
        let combined = filter_rows(df, &keep)?;

        Ok(CategorySplit {
            per_category,
            combined,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn categories() -> Vec<ProductCategory> {
        vec![
            ProductCategory::new("meats", &["Bacon, 500 grams"]),
            ProductCategory::new("dairy", &["Milk, 4 litres", "Butter, 454 grams"]),
        ]
    }

    #[test]
    fn test_split_is_an_allow_list() {
        let df = df!(
            "Products" => ["Bacon, 500 grams", "Milk, 4 litres", "Caviar, 50 grams", "Butter, 454 grams"],
            "VALUE" => [8.0, 6.0, 99.0, 7.0]
        )
        .unwrap();
        let categories = categories();
        let split = CategorySplitter::new(&categories).split(&df).unwrap();

        let combined = frame::str_values(&split.combined, PRODUCTS).unwrap();
        assert_eq!(combined.len(), 3);
        assert!(!combined.contains(&Some("Caviar, 50 grams".to_string())));

        let (name, meats) = &split.per_category[0];
        assert_eq!(name, "meats");
        assert_eq!(
            frame::str_values(meats, PRODUCTS).unwrap(),
            vec![Some("Bacon, 500 grams".to_string())]
        );
        assert_eq!(split.per_category[1].1.height(), 2);
    }

    #[test]
    fn test_category_lookup() {
        let categories = categories();
        let splitter = CategorySplitter::new(&categories);
        assert_eq!(splitter.category_of("Butter, 454 grams"), Some("dairy"));
        assert_eq!(splitter.category_of("butter, 454 grams"), None);
    }
}
