use anyhow::Result;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::analysis::diagnostics::RangeDiagnostics;
use crate::analysis::engine::AnalysisReport;
use crate::analysis::tolerance::ToleranceMode;
use crate::data::CombinedLevel;

#[derive(Tabled)]
struct LevelRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Type")]
    kind: &'static str,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Touches")]
    touches: usize,
    #[tabled(rename = "Weighted")]
    weighted: usize,
    #[tabled(rename = "Timeframes")]
    timeframes: String,
}

#[derive(Tabled)]
struct ObservationRow {
    #[tabled(rename = "Timeframe")]
    timeframe: String,
    #[tabled(rename = "Type")]
    kind: &'static str,
    #[tabled(rename = "Price")]
    price: String,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    report: &'a AnalysisReport,
    chart_string: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostics: Option<&'a RangeDiagnostics>,
}

pub fn levels_table(levels: &[CombinedLevel], max_levels: Option<usize>) -> String {
    let limit = max_levels.unwrap_or(levels.len());
    let rows: Vec<LevelRow> = levels
        .iter()
        .take(limit)
        .enumerate()
        .map(|(idx, level)| LevelRow {
            rank: idx + 1,
            kind: level.kind.label(),
            price: format!("{:.2}", level.price),
            touches: level.total_touches,
            weighted: level.total_weighted_touches,
            timeframes: level.timeframes_involved.join(", "),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.to_string()
}

pub fn print_report(report: &AnalysisReport, max_levels: Option<usize>) {
    println!("\n=== Support & Resistance Levels ===\n");
    if let Some(price) = report.current_price {
        println!("Current Price: {price:.2}");
    }

    let tolerance = &report.tolerance;
    let mode = match tolerance.mode {
        ToleranceMode::FixedReference => "fixed reference",
        ToleranceMode::PerLevel => "per level",
        ToleranceMode::Volatility => "volatility (ATR)",
    };
    match tolerance.absolute {
        Some(absolute) => println!(
            "Tolerance: {:.3}% = {absolute:.4} ({mode})",
            tolerance.percentage
        ),
        None => println!("Tolerance: {:.3}% ({mode})", tolerance.percentage),
    }
    if let Some(atr) = tolerance.atr {
        println!("ATR: {atr:.4}");
    }
    println!(
        "Grouping: {:?} | Min touches: {} | Raw levels: {}",
        tolerance.strategy, report.min_touches, report.raw_level_count
    );
    if !report.skipped_timeframes.is_empty() {
        println!(
            "Skipped timeframes (no data): {}",
            report.skipped_timeframes.join(", ")
        );
    }

    if report.levels.is_empty() {
        println!("No levels met the minimum touch threshold.");
        return;
    }

    println!("\n{}\n", levels_table(&report.levels, max_levels));
    println!("Chart levels: {}", report.chart_string());
}

pub fn print_diagnostics(diagnostics: &RangeDiagnostics) {
    println!(
        "\n=== Range Diagnostics {:.2} to {:.2} ===\n",
        diagnostics.range_start, diagnostics.range_end
    );

    if diagnostics.matching_observations.is_empty() {
        println!("No highs or lows fall inside this range.");
        return;
    }

    let rows: Vec<ObservationRow> = diagnostics
        .matching_observations
        .iter()
        .map(|obs| ObservationRow {
            timeframe: obs.timeframe.clone(),
            kind: obs.kind.label(),
            price: format!("{:.2}", obs.price),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}\n");

    println!(
        "{} observations, {} distinct prices",
        diagnostics.matching_observations.len(),
        diagnostics.distinct_prices
    );
    match (
        diagnostics.min_observed_gap,
        diagnostics.suggested_tolerance_percent,
    ) {
        (Some(gap), Some(pct)) => {
            println!("Closest gap: {gap:.4}");
            println!("Suggested per-level tolerance: {pct:.3}%");
        }
        (Some(gap), None) => println!("Closest gap: {gap:.4}"),
        _ => println!("Fewer than two distinct prices; no tolerance suggestion."),
    }
}

pub fn print_json(report: &AnalysisReport, diagnostics: Option<&RangeDiagnostics>) -> Result<()> {
    let output = JsonOutput {
        report,
        chart_string: report.chart_string(),
        diagnostics,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::LevelKind;

    fn level(price: f64, timeframes: &[&str]) -> CombinedLevel {
        CombinedLevel {
            price,
            kind: LevelKind::Resistance,
            total_touches: 4,
            total_weighted_touches: 8,
            timeframes_involved: timeframes.iter().map(|s| s.to_string()).collect(),
            timeframe_count: timeframes.len(),
            members: Vec::new(),
        }
    }

    #[test]
    fn table_lists_levels_in_rank_order() {
        let levels = [level(150.0025, &["1D", "1H"]), level(98.1, &["4H"])];
        let table = levels_table(&levels, None);
        assert!(table.contains("150.00"));
        assert!(table.contains("1D, 1H"));
        assert!(table.contains("98.10"));
        assert!(table.find("150.00") < table.find("98.10"));
    }

    #[test]
    fn table_respects_max_levels() {
        let levels = [level(1.0, &["1D"]), level(2.0, &["1D"]), level(3.0, &["1D"])];
        let table = levels_table(&levels, Some(1));
        assert!(table.contains("1.00"));
        assert!(!table.contains("3.00"));
    }
}
