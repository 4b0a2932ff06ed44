pub mod aggregator;
pub mod categories;
pub mod change_rate;
pub mod config;
pub mod data_loader;
pub mod frame;
pub mod models;
pub mod periods;
pub mod significance;

pub use categories::{CategorySplit, CategorySplitter};
pub use config::PipelineConfig;
pub use data_loader::DataLoader;
pub use frame::MissingColumn;
pub use models::{Coast, CovidPeriod, PresidencyPeriod, ProductCategory, RegionType};
