use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use price_analysis::PipelineConfig;
use std::path::PathBuf;
use std::time::Instant;

mod cleaning_processor;
mod coast_region_analyzer;
mod region_summary_processor;
mod socioeconomic_analyzer;
mod temporal_analyzer;
mod urban_rural_analyzer;
mod visualization;

#[cfg(test)]
mod test_support;

use cleaning_processor::CleaningProcessor;
use coast_region_analyzer::CoastRegionAnalyzer;
use region_summary_processor::RegionSummaryProcessor;
use socioeconomic_analyzer::{Indicator, SocioeconomicAnalyzer};
use temporal_analyzer::TemporalAnalyzer;
use urban_rural_analyzer::UrbanRuralAnalyzer;

#[derive(Parser)]
#[command(name = "food_price_pipeline")]
#[command(about = "Canadian food price cleaning and analysis", long_about = None)]
struct Cli {
    /// JSON file overriding any of the default settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory every output is written under
    #[arg(long, global = true)]
    output_root: Option<PathBuf>,

    /// Skip rendering PNG charts
    #[arg(long, global = true)]
    no_charts: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Split, label, and aggregate the raw extracts
    Clean,
    /// Year-over-year series and period tests
    Temporal,
    /// Provincial yearly means per category
    RegionSummary,
    /// East, West, and Interior comparisons
    CoastRegions,
    /// Income against category prices
    Income,
    /// Population against category prices
    Population,
    /// Urban against rural prices
    UrbanRural,
    /// Every stage in order
    RunAll,
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(root) = &cli.output_root {
        config.output_root = root.clone();
    }
    if cli.no_charts {
        config.render_charts = false;
    }
    Ok(config)
}

fn run_stage(command: Commands, config: &PipelineConfig) -> Result<()> {
    match command {
        Commands::Clean => CleaningProcessor::new(config).run(),
        Commands::Temporal => TemporalAnalyzer::new(config).run(),
        Commands::RegionSummary => RegionSummaryProcessor::new(config).run(),
        Commands::CoastRegions => CoastRegionAnalyzer::new(config).run(),
        Commands::Income => SocioeconomicAnalyzer::new(config, Indicator::Income).run(),
        Commands::Population => SocioeconomicAnalyzer::new(config, Indicator::Population).run(),
        Commands::UrbanRural => UrbanRuralAnalyzer::new(config).run(),
        Commands::RunAll => {
            for stage in [
                Commands::Clean,
                Commands::Temporal,
                Commands::RegionSummary,
                Commands::CoastRegions,
                Commands::Income,
                Commands::Population,
                Commands::UrbanRural,
            ] {
                run_stage(stage, config)?;
            }
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    info!("Writing outputs under {}", config.output_root.display());

    let start = Instant::now();
    run_stage(cli.command, &config)?;
    info!("Processing complete in {:?}", start.elapsed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture_config;
    use tempfile::TempDir;

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "food_price_pipeline",
            "temporal",
            "--output-root",
            "/tmp/prices",
            "--no-charts",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.output_root, PathBuf::from("/tmp/prices"));
        assert!(!config.render_charts);
        assert!(matches!(cli.command, Commands::Temporal));
    }

    #[test]
    fn test_run_all_writes_final_outputs() {
        let dir = TempDir::new().unwrap();
        let config = fixture_config(&dir);
        run_stage(Commands::RunAll, &config).unwrap();

        for path in [
            dir.path().join("tukey_covid.csv"),
            dir.path().join("tukey_pres.csv"),
            config.geo_csv_dir().join("extended_region_comparison_results.csv"),
            config.geo_csv_dir().join("income").join("cor_income_analysis.csv"),
            config.geo_csv_dir().join("population").join("cor_population_analysis.csv"),
            config.urban_rural_dir().join("mannwhitneyu_results_small.csv"),
        ] {
            assert!(path.exists(), "{} missing", path.display());
        }
    }
}
