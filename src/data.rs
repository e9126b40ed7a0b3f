//! Loading historical closing prices and deriving daily returns.
//!
//! Input is a long-format table with one row per (ticker, date) and a closing
//! price column. Both CSV and Parquet files are supported; column names are
//! matched against common spellings.

use crate::error::{Result, VarError};
use crate::types::{PriceRecord, ReturnRecord};
use arrow::array::Array;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

/// Raw CSV row with flexible column naming.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(
        alias = "Ticker",
        alias = "TICKER",
        alias = "symbol",
        alias = "Symbol",
        alias = "SYMBOL"
    )]
    ticker: String,
    #[serde(
        alias = "Date",
        alias = "DATE",
        alias = "Timestamp",
        alias = "timestamp",
        alias = "datetime",
        alias = "Datetime"
    )]
    date: String,
    #[serde(
        alias = "Close",
        alias = "CLOSE",
        alias = "Adj Close",
        alias = "adj_close",
        alias = "close_price",
        default
    )]
    close: Option<String>,
}

/// Parse a close field. Empty or non-numeric markers (`NA`, `null`, `-`)
/// yield NaN so the day stays in the series as missing.
fn parse_close(field: Option<&str>) -> f64 {
    field
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// Data source configuration.
#[derive(Debug, Clone)]
pub struct DataConfig {
    /// Date format string for parsing (e.g., "%Y-%m-%d").
    pub date_format: Option<String>,
    /// Whether the CSV has headers.
    pub has_headers: bool,
    /// CSV delimiter character. If None, delimiter is auto-detected.
    pub delimiter: Option<u8>,
    /// Skip unparseable rows instead of failing.
    pub skip_invalid: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            date_format: None,
            has_headers: true,
            delimiter: None,
            skip_invalid: true,
        }
    }
}

/// Detect the CSV delimiter from the first few lines of the file.
///
/// Picks the delimiter that yields a consistent column count of at least three
/// (ticker, date, close) across the sampled lines.
fn detect_delimiter(path: &Path) -> Result<u8> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let lines: Vec<String> = reader.lines().take(5).filter_map(|l| l.ok()).collect();

    if lines.is_empty() {
        return Ok(b',');
    }

    let delimiters = [b',', b'\t', b';', b'|'];
    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in &delimiters {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| line.as_bytes().iter().filter(|&&b| b == delim).count() + 1)
            .collect();

        let first_count = counts[0];
        let all_consistent = counts.iter().all(|&c| c == first_count);

        if all_consistent && first_count >= 3 && first_count > best_score {
            best_score = first_count;
            best_delimiter = delim;
        }
    }

    debug!(
        "Detected delimiter {:?} with {} fields",
        best_delimiter as char, best_score
    );
    Ok(best_delimiter)
}

/// Parse a date string, trying an explicit format first and then common ones.
pub fn parse_date(s: &str, format: Option<&str>) -> Result<NaiveDate> {
    let s = s.trim();

    if let Some(fmt) = format {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }

    let date_formats = [
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%Y%m%d",
        "%d-%m-%Y",
        "%m/%d/%Y",
        "%d-%b-%Y",
        "%b %d, %Y",
    ];
    for fmt in &date_formats {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%SZ",
        "%Y-%m-%dT%H:%M:%S%.fZ",
    ];
    for fmt in &datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }

    if let Ok(ts) = s.parse::<i64>() {
        if let Some(dt) = DateTime::from_timestamp(ts, 0) {
            return Ok(dt.date_naive());
        }
    }

    Err(VarError::DataError(format!("Could not parse date: '{}'", s)))
}

/// Load closing prices from a CSV file.
///
/// Rows whose close is empty are kept with a NaN close so that the day is
/// treated as missing when returns are derived.
pub fn load_csv(path: impl AsRef<Path>, config: &DataConfig) -> Result<Vec<PriceRecord>> {
    let path = path.as_ref();
    info!("Loading prices from: {}", path.display());

    let delimiter = match config.delimiter {
        Some(d) => d,
        None => detect_delimiter(path)?,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(config.has_headers)
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut records = Vec::new();
    let mut skipped = 0;

    for (row_idx, result) in reader.deserialize().enumerate() {
        let row_num = row_idx + 1;
        let row: CsvRow = match result {
            Ok(r) => r,
            Err(e) if config.skip_invalid => {
                debug!("Skipping row {}: {}", row_num, e);
                skipped += 1;
                continue;
            }
            Err(e) => return Err(VarError::CsvError(e)),
        };

        let date = match parse_date(&row.date, config.date_format.as_deref()) {
            Ok(d) => d,
            Err(e) if config.skip_invalid => {
                debug!("Skipping row {} due to date parse error: {}", row_num, e);
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        records.push(PriceRecord::new(
            row.ticker,
            date,
            parse_close(row.close.as_deref()),
        ));
    }

    finish_load(records, skipped)
}

/// Load closing prices from a Parquet file.
///
/// The ticker column must be a string column. The date column may be a
/// `Date32`, any Arrow timestamp, an Int64 Unix timestamp or a string. The
/// close column may be Float64 or Int64; nulls are treated as missing closes.
pub fn load_parquet(path: impl AsRef<Path>, config: &DataConfig) -> Result<Vec<PriceRecord>> {
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    let path = path.as_ref();
    info!("Loading Parquet prices from: {}", path.display());

    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| VarError::DataError(format!("Failed to open parquet file: {}", e)))?;
    let reader = builder
        .build()
        .map_err(|e| VarError::DataError(format!("Failed to build parquet reader: {}", e)))?;

    let schema = arrow::record_batch::RecordBatchReader::schema(&reader);
    debug!("Parquet schema: {:?}", schema);

    fn find_column_index(schema: &arrow::datatypes::Schema, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|name| schema.index_of(name).ok())
    }

    let ticker_idx = find_column_index(
        &schema,
        &["ticker", "Ticker", "TICKER", "symbol", "Symbol", "SYMBOL"],
    )
    .ok_or_else(|| VarError::DataError("No ticker column found in parquet file".to_string()))?;
    let date_idx = find_column_index(
        &schema,
        &["date", "Date", "DATE", "timestamp", "Timestamp", "datetime"],
    )
    .ok_or_else(|| VarError::DataError("No date column found in parquet file".to_string()))?;
    let close_idx = find_column_index(
        &schema,
        &["close", "Close", "CLOSE", "adj_close", "Adj Close", "close_price"],
    )
    .ok_or_else(|| VarError::DataError("No close column found in parquet file".to_string()))?;

    let mut records = Vec::new();
    let mut skipped = 0;
    let mut row_num = 0;

    for batch_result in reader {
        let batch = batch_result
            .map_err(|e| VarError::DataError(format!("Failed to read parquet batch: {}", e)))?;

        let ticker_col = batch.column(ticker_idx);
        let date_col = batch.column(date_idx);
        let closes = get_f64_values(batch.column(close_idx).as_ref())?;

        for (i, close) in closes.into_iter().enumerate() {
            row_num += 1;

            let parsed = string_value(ticker_col.as_ref(), i).and_then(|ticker| {
                parse_arrow_date(date_col.as_ref(), i, config.date_format.as_deref())
                    .map(|date| (ticker, date))
            });

            let (ticker, date) = match parsed {
                Ok(v) => v,
                Err(e) if config.skip_invalid => {
                    debug!("Skipping row {}: {}", row_num, e);
                    skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            records.push(PriceRecord::new(ticker, date, close.unwrap_or(f64::NAN)));
        }
    }

    finish_load(records, skipped)
}

fn finish_load(records: Vec<PriceRecord>, skipped: usize) -> Result<Vec<PriceRecord>> {
    if skipped > 0 {
        warn!("Skipped {} invalid rows", skipped);
    }

    let missing = records.iter().filter(|r| !r.is_valid()).count();
    if missing > 0 {
        debug!("{} rows have a missing or non-positive close", missing);
    }

    if records.is_empty() {
        return Err(VarError::NoData);
    }

    info!("Loaded {} price rows", records.len());
    Ok(records)
}

/// Read a numeric column as optional f64 values (Float64 or Int64).
fn get_f64_values(array: &dyn Array) -> Result<Vec<Option<f64>>> {
    use arrow::array::{Float64Array, Int64Array};

    if let Some(arr) = array.as_any().downcast_ref::<Float64Array>() {
        Ok(arr.iter().collect())
    } else if let Some(arr) = array.as_any().downcast_ref::<Int64Array>() {
        Ok(arr.iter().map(|v| v.map(|x| x as f64)).collect())
    } else {
        Err(VarError::DataError(format!(
            "Unsupported close column type: {:?}",
            array.data_type()
        )))
    }
}

fn string_value(array: &dyn Array, idx: usize) -> Result<String> {
    use arrow::array::{LargeStringArray, StringArray};

    if array.is_null(idx) {
        return Err(VarError::DataError(format!("Null ticker at index {}", idx)));
    }
    if let Some(arr) = array.as_any().downcast_ref::<StringArray>() {
        return Ok(arr.value(idx).to_string());
    }
    if let Some(arr) = array.as_any().downcast_ref::<LargeStringArray>() {
        return Ok(arr.value(idx).to_string());
    }
    Err(VarError::DataError(format!(
        "Unsupported ticker column type: {:?}",
        array.data_type()
    )))
}

/// Parse a date from an Arrow array at the given index.
fn parse_arrow_date(
    array: &dyn Array,
    idx: usize,
    date_format: Option<&str>,
) -> Result<NaiveDate> {
    use arrow::array::{
        Date32Array, Int64Array, LargeStringArray, StringArray, TimestampMicrosecondArray,
        TimestampMillisecondArray, TimestampNanosecondArray, TimestampSecondArray,
    };

    if array.is_null(idx) {
        return Err(VarError::DataError(format!("Null date at index {}", idx)));
    }

    let any = array.as_any();
    let invalid = || VarError::DataError(format!("Invalid date value at index {}", idx));

    if let Some(arr) = any.downcast_ref::<Date32Array>() {
        return arr.value_as_date(idx).ok_or_else(invalid);
    }
    if let Some(arr) = any.downcast_ref::<TimestampSecondArray>() {
        return arr.value_as_datetime(idx).map(|d| d.date()).ok_or_else(invalid);
    }
    if let Some(arr) = any.downcast_ref::<TimestampMillisecondArray>() {
        return arr.value_as_datetime(idx).map(|d| d.date()).ok_or_else(invalid);
    }
    if let Some(arr) = any.downcast_ref::<TimestampMicrosecondArray>() {
        return arr.value_as_datetime(idx).map(|d| d.date()).ok_or_else(invalid);
    }
    if let Some(arr) = any.downcast_ref::<TimestampNanosecondArray>() {
        return arr.value_as_datetime(idx).map(|d| d.date()).ok_or_else(invalid);
    }

    // Int64 as Unix timestamp: milliseconds if > 1e12, else seconds
    if let Some(arr) = any.downcast_ref::<Int64Array>() {
        let val = arr.value(idx);
        let dt = if val > 1_000_000_000_000 {
            DateTime::from_timestamp_millis(val)
        } else {
            DateTime::from_timestamp(val, 0)
        };
        return dt.map(|d| d.date_naive()).ok_or_else(invalid);
    }

    if let Some(arr) = any.downcast_ref::<StringArray>() {
        return parse_date(arr.value(idx), date_format);
    }
    if let Some(arr) = any.downcast_ref::<LargeStringArray>() {
        return parse_date(arr.value(idx), date_format);
    }

    Err(VarError::DataError(format!(
        "Unsupported date column type: {:?}",
        array.data_type()
    )))
}

/// Input file format, detected from the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Parquet,
}

impl DataFormat {
    /// Detect format from file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" | "tsv" | "txt" => Some(DataFormat::Csv),
            "parquet" | "pq" => Some(DataFormat::Parquet),
            _ => None,
        }
    }
}

/// Load closing prices, choosing the reader from the file extension.
pub fn load_prices(path: impl AsRef<Path>, config: &DataConfig) -> Result<Vec<PriceRecord>> {
    let path = path.as_ref();
    let format = DataFormat::from_path(path).ok_or_else(|| {
        VarError::DataError(format!(
            "Unknown file format for: {}. Supported: .csv, .parquet, .pq",
            path.display()
        ))
    })?;

    match format {
        DataFormat::Csv => load_csv(path, config),
        DataFormat::Parquet => load_parquet(path, config),
    }
}

/// Group records by ticker, each series in chronological order.
///
/// When a ticker has several rows for the same date the first one wins.
pub fn group_by_ticker(records: &[PriceRecord]) -> BTreeMap<String, Vec<PriceRecord>> {
    let mut grouped: BTreeMap<String, Vec<PriceRecord>> = BTreeMap::new();
    for record in records {
        grouped
            .entry(record.ticker.clone())
            .or_default()
            .push(record.clone());
    }

    for (ticker, series) in grouped.iter_mut() {
        series.sort_by_key(|r| r.date);
        let original_len = series.len();
        series.dedup_by_key(|r| r.date);
        if series.len() < original_len {
            warn!(
                "Removed {} duplicate dates for {}",
                original_len - series.len(),
                ticker
            );
        }
    }

    grouped
}

/// Daily percent changes from the previous close, per ticker.
///
/// The first day of each ticker has no previous close and produces no record.
/// A day with a missing close produces no record, and neither does the day
/// after it.
pub fn daily_returns(records: &[PriceRecord]) -> Vec<ReturnRecord> {
    let mut returns = Vec::new();

    for (ticker, series) in group_by_ticker(records) {
        for pair in series.windows(2) {
            let (prev, curr) = (&pair[0], &pair[1]);
            if !prev.is_valid() || !curr.is_valid() {
                continue;
            }
            returns.push(ReturnRecord {
                ticker: ticker.clone(),
                date: curr.date,
                pct_change: (curr.close / prev.close - 1.0) * 100.0,
            });
        }
    }

    debug!("Derived {} daily returns", returns.len());
    returns
}

/// Most recent valid close for each ticker.
pub fn latest_prices(records: &[PriceRecord]) -> BTreeMap<String, f64> {
    group_by_ticker(records)
        .into_iter()
        .filter_map(|(ticker, series)| {
            series
                .iter()
                .rev()
                .find(|r| r.is_valid())
                .map(|r| (ticker, r.close))
        })
        .collect()
}
