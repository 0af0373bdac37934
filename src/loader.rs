use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use thiserror::Error;
use tracing::debug;

use crate::data::{Bar, PriceSeries};

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("missing required columns in {timeframe}: {missing:?}. Available: {available:?}")]
    MissingColumns {
        timeframe: String,
        missing: Vec<&'static str>,
        available: Vec<String>,
    },
}

/// Column positions after alias normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
    timestamp: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Open,
    High,
    Low,
    Close,
    Volume,
    Timestamp,
}

fn classify_header(name: &str) -> Option<Column> {
    match name.trim().to_ascii_lowercase().as_str() {
        "open" | "o" => Some(Column::Open),
        "high" | "h" => Some(Column::High),
        "low" | "l" => Some(Column::Low),
        "close" | "c" => Some(Column::Close),
        "volume" | "vol" | "v" => Some(Column::Volume),
        "date" | "datetime" | "timestamp" | "time" => Some(Column::Timestamp),
        _ => None,
    }
}

fn map_columns(headers: &StringRecord, timeframe: &str) -> Result<ColumnMap, LoaderError> {
    let (mut open, mut high, mut low, mut close) = (None, None, None, None);
    let (mut volume, mut timestamp) = (None, None);
    for (idx, header) in headers.iter().enumerate() {
        // First matching column wins.
        let slot = match classify_header(header) {
            Some(Column::Open) => &mut open,
            Some(Column::High) => &mut high,
            Some(Column::Low) => &mut low,
            Some(Column::Close) => &mut close,
            Some(Column::Volume) => &mut volume,
            Some(Column::Timestamp) => &mut timestamp,
            None => continue,
        };
        slot.get_or_insert(idx);
    }

    match (open, high, low, close) {
        (Some(open), Some(high), Some(low), Some(close)) => Ok(ColumnMap {
            open,
            high,
            low,
            close,
            volume,
            timestamp,
        }),
        _ => {
            let missing = [("Open", open), ("High", high), ("Low", low), ("Close", close)]
                .iter()
                .filter(|(_, idx)| idx.is_none())
                .map(|(name, _)| *name)
                .collect();
            Err(LoaderError::MissingColumns {
                timeframe: timeframe.to_string(),
                missing,
                available: headers.iter().map(|h| h.trim().to_string()).collect(),
            })
        }
    }
}

/// Load one timeframe from a CSV file with a header row.
pub fn load_series_from_csv<P: AsRef<Path>>(path: P, timeframe: &str) -> Result<PriceSeries> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref).with_context(|| format!("failed to open {:?}", path_ref))?;
    read_series(file, timeframe)
        .with_context(|| format!("failed to read {timeframe} series from {:?}", path_ref))
}

/// Read a series from any CSV source. Rows with a missing or non-numeric OHLC field are dropped.
pub fn read_series<R: Read>(reader: R, timeframe: &str) -> Result<PriceSeries> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let columns = map_columns(&headers, timeframe)?;

    let mut bars = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        match parse_record(&record, &columns) {
            Some(bar) => bars.push(bar),
            None => dropped += 1,
        }
    }

    debug!(timeframe, rows = bars.len(), dropped, "loaded price series");
    Ok(PriceSeries::new(timeframe, bars))
}

fn parse_record(record: &StringRecord, columns: &ColumnMap) -> Option<Bar> {
    let open = parse_number(record.get(columns.open))?;
    let high = parse_number(record.get(columns.high))?;
    let low = parse_number(record.get(columns.low))?;
    let close = parse_number(record.get(columns.close))?;
    let volume = columns.volume.and_then(|idx| parse_number(record.get(idx)));
    let timestamp = columns
        .timestamp
        .and_then(|idx| record.get(idx))
        .and_then(parse_timestamp);

    Some(Bar {
        timestamp,
        open,
        high,
        low,
        close,
        volume,
    })
}

fn parse_number(value: Option<&str>) -> Option<f64> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    value
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    let datetime_patterns = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
    ];
    for pattern in &datetime_patterns {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, pattern) {
            return Some(datetime);
        }
    }

    let date_patterns = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
    for pattern in &date_patterns {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, pattern) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_short_aliases_in_any_case() {
        let csv = "Date,O,H,L,C,Vol\n2024-01-02,1,2,0.5,1.5,100\n2024-01-03,1.5,2.5,1,2,\n";
        let series = read_series(csv.as_bytes(), "1D").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars[0].high, 2.0);
        assert_eq!(series.bars[0].volume, Some(100.0));
        assert_eq!(series.bars[1].volume, None);
        assert_eq!(
            series.bars[0].timestamp,
            NaiveDate::from_ymd_opt(2024, 1, 2).and_then(|d| d.and_hms_opt(0, 0, 0))
        );
    }

    #[test]
    fn drops_rows_with_missing_prices() {
        let csv = "open,high,low,close\n1,2,0.5,1.5\n1,,0.5,1.5\n1,2,abc,1.5\n\"1,000\",\"1,010\",990,1005\n";
        let series = read_series(csv.as_bytes(), "4H").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars[1].open, 1000.0);
        assert_eq!(series.bars[1].high, 1010.0);
    }

    #[test]
    fn reports_missing_columns() {
        let csv = "open,high,close\n1,2,1.5\n";
        let err = read_series(csv.as_bytes(), "1H").unwrap_err();
        let loader_err = err.downcast_ref::<LoaderError>().unwrap();
        match loader_err {
            LoaderError::MissingColumns {
                timeframe, missing, ..
            } => {
                assert_eq!(timeframe, "1H");
                assert_eq!(missing, &vec!["Low"]);
            }
        }
    }

    #[test]
    fn header_only_file_is_an_empty_series() {
        let series = read_series("High,Low,Open,Close\n".as_bytes(), "1D").unwrap();
        assert!(series.is_empty());
    }
}
