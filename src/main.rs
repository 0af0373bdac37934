use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use sr_levels::analysis::{analyze, diagnose};
use sr_levels::config::AppConfig;
use sr_levels::data::PriceSeries;
use sr_levels::loader::load_series_from_csv;
use sr_levels::logging::init_logging;
use sr_levels::output::{print_diagnostics, print_json, print_report};

fn main() -> Result<()> {
    init_logging();
    let config = AppConfig::parse();
    run(&config)
}

fn run(config: &AppConfig) -> Result<()> {
    let analysis_config = config.analysis_config()?;

    let mut series: Vec<PriceSeries> = Vec::with_capacity(config.series.len());
    for (timeframe, path) in &config.series {
        if !path.exists() {
            bail!("input file {:?} for {} does not exist", path, timeframe);
        }
        let loaded = load_series_from_csv(path, timeframe)
            .with_context(|| format!("failed to load {timeframe} data from {:?}", path))?;
        info!(timeframe = %timeframe, bars = loaded.len(), "loaded series");
        series.push(loaded);
    }

    let report = analyze(&series, &analysis_config)?;
    let diagnostics = config
        .diagnostic_range()
        .map(|(start, end)| diagnose(&series, start, end));

    if config.json {
        return print_json(&report, diagnostics.as_ref());
    }

    print_report(&report, config.max_levels);
    if let Some(diagnostics) = &diagnostics {
        print_diagnostics(diagnostics);
    }

    Ok(())
}
