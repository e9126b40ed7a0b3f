//! Writing results and price data to files.

use crate::error::{Result, VarError};
use crate::monte_carlo::VarReport;
use crate::simulation::SimulationPath;
use crate::types::PriceRecord;
use chrono::NaiveDate;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Write every run's gain, sorted ascending, one per line.
pub fn export_distribution_csv(report: &VarReport, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "rank,gain,final_value")?;
    for (rank, gain) in report.distribution.iter().enumerate() {
        writeln!(
            writer,
            "{},{:.4},{:.4}",
            rank,
            gain,
            report.initial_value + gain
        )?;
    }
    writer.flush()?;

    info!(
        "Wrote {} outcomes to {}",
        report.distribution.len(),
        path.display()
    );
    Ok(())
}

/// Write a simulated path's total value per day.
pub fn export_history_csv(sim_path: &SimulationPath, path: impl AsRef<Path>) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "day,total_value")?;
    for (day, value) in sim_path.history.iter().enumerate() {
        writeln!(writer, "{},{:.4}", day, value)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a report as pretty JSON.
pub fn export_report_json(report: &VarReport, path: impl AsRef<Path>) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)?;
    Ok(())
}

/// Write price records to a Parquet file with `ticker`, `date` (Date32) and
/// `close` columns, readable by [`crate::data::load_parquet`].
pub fn export_prices_parquet(records: &[PriceRecord], path: impl AsRef<Path>) -> Result<()> {
    use arrow::array::{Date32Array, Float64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use std::sync::Arc;

    if records.is_empty() {
        return Err(VarError::DataError("No price records to export".to_string()));
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("ticker", DataType::Utf8, false),
        Field::new("date", DataType::Date32, false),
        Field::new("close", DataType::Float64, true),
    ]));

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
        .ok_or_else(|| VarError::DataError("Invalid epoch date".to_string()))?;

    let tickers: Vec<&str> = records.iter().map(|r| r.ticker.as_str()).collect();
    let dates: Vec<i32> = records
        .iter()
        .map(|r| (r.date - epoch).num_days() as i32)
        .collect();
    let closes: Vec<Option<f64>> = records
        .iter()
        .map(|r| if r.close.is_nan() { None } else { Some(r.close) })
        .collect();

    let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
        Arc::new(StringArray::from(tickers)),
        Arc::new(Date32Array::from(dates)),
        Arc::new(Float64Array::from(closes)),
    ];

    let batch = RecordBatch::try_new(schema.clone(), arrays)
        .map_err(|e| VarError::DataError(format!("Failed to create record batch: {}", e)))?;

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)
        .map_err(|e| VarError::DataError(format!("Failed to create parquet writer: {}", e)))?;

    writer
        .write(&batch)
        .map_err(|e| VarError::DataError(format!("Failed to write parquet: {}", e)))?;
    writer
        .close()
        .map_err(|e| VarError::DataError(format!("Failed to close parquet writer: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{load_parquet, DataConfig};
    use crate::monte_carlo::VarConfig;
    use tempfile::TempDir;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_export_distribution_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("outcomes.csv");
        let report =
            VarReport::from_gains(&VarConfig::default(), 0, 1, 100.0, vec![5.0, -3.0, 1.0])
                .unwrap();

        export_distribution_csv(&report, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "rank,gain,final_value");
        assert_eq!(lines[1], "0,-3.0000,97.0000");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_export_history_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("path.csv");
        let sim_path = SimulationPath {
            seed: 1,
            final_portfolio: Default::default(),
            history: vec![100.0, 101.0, 99.5],
        };

        export_history_csv(&sim_path, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 4);
        assert!(content.contains("2,99.5000"));
    }

    #[test]
    fn test_export_report_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        let report =
            VarReport::from_gains(&VarConfig::default(), 9, 1, 50.0, vec![2.0, -4.0]).unwrap();

        export_report_json(&report, &path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["master_seed"].as_u64(), Some(9));
        assert_eq!(value["var"].as_f64(), Some(-4.0));
    }

    #[test]
    fn test_parquet_export_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prices.parquet");
        let records = vec![
            PriceRecord::new("AAPL", date(1), 170.0),
            PriceRecord::new("AAPL", date(4), f64::NAN),
            PriceRecord::new("MSFT", date(1), 410.5),
        ];

        export_prices_parquet(&records, &path).unwrap();
        let loaded = load_parquet(&path, &DataConfig::default()).unwrap();

        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0], records[0]);
        assert_eq!(loaded[2], records[2]);
        assert!(loaded[1].close.is_nan());
        assert_eq!(loaded[1].date, date(4));
    }

    #[test]
    fn test_parquet_export_rejects_empty() {
        let dir = TempDir::new().unwrap();
        assert!(export_prices_parquet(&[], dir.path().join("x.parquet")).is_err());
    }
}
