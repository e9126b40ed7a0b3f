//! Integration tests for the value-at-risk pipeline.

use chrono::NaiveDate;
use mcvar::config::VarFileConfig;
use mcvar::data::{daily_returns, latest_prices, load_prices, DataConfig};
use mcvar::export::{export_distribution_csv, export_prices_parquet};
use mcvar::monte_carlo::{VarConfig, VarSimulator};
use mcvar::portfolio::{random_portfolio, ShareCountRange};
use mcvar::simulation::{simulate, simulate_with_history};
use mcvar::stats::estimate_distributions;
use mcvar::types::{DistributionMap, DistributionParams, Portfolio, PriceRecord};
use std::collections::BTreeMap;
use std::fs;
use tempfile::TempDir;

/// Create deterministic price history for a few tickers.
fn create_price_records(days: usize) -> Vec<PriceRecord> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let mut records = Vec::new();

    for (t, (ticker, base)) in [("AAPL", 150.0), ("GOOG", 95.0), ("MSFT", 240.0)]
        .into_iter()
        .enumerate()
    {
        let mut price: f64 = base;
        for i in 0..days {
            let noise = ((i as f64 * 0.7 + t as f64).sin() * 1.5 + (i as f64 * 1.3).cos()) * 0.01;
            price *= 1.0 + noise;
            records.push(PriceRecord::new(
                ticker,
                start + chrono::Duration::days(i as i64),
                price,
            ));
        }
    }
    records
}

fn write_csv(dir: &TempDir, records: &[PriceRecord]) -> std::path::PathBuf {
    let path = dir.path().join("prices.csv");
    let mut content = String::from("ticker,date,close\n");
    for r in records {
        content.push_str(&format!("{},{},{}\n", r.ticker, r.date.format("%Y-%m-%d"), r.close));
    }
    fs::write(&path, content).unwrap();
    path
}

fn two_ticker_params() -> DistributionMap {
    [
        ("AAA".to_string(), DistributionParams::new(0.1, 1.5)),
        ("BBB".to_string(), DistributionParams::new(-0.05, 2.0)),
    ]
    .into_iter()
    .collect()
}

#[test]
fn test_full_pipeline_from_csv() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(&dir, &create_price_records(120));

    let records = load_prices(&path, &DataConfig::default()).unwrap();
    assert_eq!(records.len(), 360);

    let params = estimate_distributions(&daily_returns(&records));
    assert_eq!(params.len(), 3);
    for p in params.values() {
        assert!(p.std_dev > 0.0);
    }

    let portfolio =
        random_portfolio(&latest_prices(&records), &ShareCountRange::default(), 42).unwrap();
    assert_eq!(portfolio.len(), 3);

    let config = VarConfig::default()
        .with_simulations(2_000)
        .with_days(5)
        .with_seed(11);
    let report = VarSimulator::new(config).run(&portfolio, &params).unwrap();

    assert_eq!(report.num_simulations, 2_000);
    assert_eq!(report.distribution.len(), 2_000);
    assert_eq!(report.var, report.distribution[100]);
    assert!(report.expected_shortfall <= report.var);
    assert!(report.distribution.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_csv_and_parquet_agree() {
    let dir = TempDir::new().unwrap();
    let records = create_price_records(60);
    let csv_path = write_csv(&dir, &records);
    let parquet_path = dir.path().join("prices.parquet");

    let from_csv = load_prices(&csv_path, &DataConfig::default()).unwrap();
    export_prices_parquet(&from_csv, &parquet_path).unwrap();
    let from_parquet = load_prices(&parquet_path, &DataConfig::default()).unwrap();

    assert_eq!(from_csv, from_parquet);
    assert_eq!(
        estimate_distributions(&daily_returns(&from_csv)),
        estimate_distributions(&daily_returns(&from_parquet))
    );
}

#[test]
fn test_same_seed_same_report() {
    let portfolio = Portfolio::from_positions([("AAA", 50_000.0), ("BBB", 25_000.0)]);
    let params = two_ticker_params();
    let config = VarConfig::quick().with_seed(2024);

    let a = VarSimulator::new(config.clone()).run(&portfolio, &params).unwrap();
    let b = VarSimulator::new(config).run(&portfolio, &params).unwrap();

    assert_eq!(a.master_seed, 2024);
    assert_eq!(a.distribution, b.distribution);
    assert_eq!(a.var, b.var);
}

#[test]
fn test_path_matches_simulate() {
    let portfolio = Portfolio::from_positions([("AAA", 1_000.0), ("BBB", 2_000.0)]);
    let params = two_ticker_params();

    let path = simulate_with_history(&portfolio, &params, 10, 99).unwrap();
    let final_portfolio = simulate(&portfolio, &params, 10, 99).unwrap();

    assert_eq!(path.history.len(), 11);
    assert_eq!(path.final_portfolio, final_portfolio);
    assert!((path.final_value() - final_portfolio.total_value()).abs() < 1e-9);
    assert!((path.initial_value() - 3_000.0).abs() < 1e-9);
}

#[test]
fn test_zero_volatility_has_no_risk() {
    let portfolio = Portfolio::from_positions([("FLAT", 10_000.0)]);
    let params: DistributionMap = [("FLAT".to_string(), DistributionParams::new(0.0, 0.0))]
        .into_iter()
        .collect();

    let report = VarSimulator::new(VarConfig::quick().with_seed(1))
        .run(&portfolio, &params)
        .unwrap();

    assert!(report.var.abs() < 1e-9);
    assert_eq!(report.loss_at_risk(), 0.0);
    assert_eq!(report.prob_loss, 0.0);
}

#[test]
fn test_missing_parameters_fail_batch() {
    let portfolio = Portfolio::from_positions([("AAA", 1_000.0), ("ZZZ", 1_000.0)]);
    let result = VarSimulator::new(VarConfig::quick().with_seed(3)).run(&portfolio, &two_ticker_params());
    assert!(result.is_err());
}

#[test]
fn test_missing_close_excluded_from_returns() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gaps.csv");
    fs::write(
        &path,
        "ticker,date,close\n\
         XYZ,2024-01-01,100\n\
         XYZ,2024-01-02,110\n\
         XYZ,2024-01-03,\n\
         XYZ,2024-01-04,90\n\
         XYZ,2024-01-05,99\n",
    )
    .unwrap();

    let records = load_prices(&path, &DataConfig::default()).unwrap();
    let returns = daily_returns(&records);

    // 01-02 and 01-05 only; 01-03 is missing and 01-04 has no valid previous close
    assert_eq!(returns.len(), 2);
    assert!((returns[0].pct_change - 10.0).abs() < 1e-9);
    assert!((returns[1].pct_change - 10.0).abs() < 1e-9);
}

#[test]
fn test_na_close_excluded_from_returns() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("na.csv");
    fs::write(
        &path,
        "ticker,date,close\n\
         XYZ,2024-01-01,100\n\
         XYZ,2024-01-02,110\n\
         XYZ,2024-01-03,NA\n\
         XYZ,2024-01-04,90\n\
         XYZ,2024-01-05,99\n",
    )
    .unwrap();

    let records = load_prices(&path, &DataConfig::default()).unwrap();
    assert_eq!(records.len(), 5);

    let returns = daily_returns(&records);
    let dates: Vec<String> = returns.iter().map(|r| r.date.to_string()).collect();
    assert_eq!(dates, ["2024-01-02", "2024-01-05"]);
    assert!(returns.iter().all(|r| (r.pct_change - 10.0).abs() < 1e-9));
}

#[test]
fn test_config_driven_run() {
    let dir = TempDir::new().unwrap();
    let data_path = write_csv(&dir, &create_price_records(40));
    let config_path = dir.path().join("mcvar.toml");

    let mut file_config = VarFileConfig::default();
    file_config.data.path = Some(data_path.to_string_lossy().into_owned());
    file_config.simulation.num_simulations = 500;
    file_config.simulation.seed = Some(5);
    file_config.portfolio.positions = BTreeMap::from([
        ("AAPL".to_string(), 60_000.0),
        ("MSFT".to_string(), 40_000.0),
    ]);
    file_config.save(&config_path).unwrap();

    let loaded = VarFileConfig::load(&config_path).unwrap();
    let records = load_prices(
        loaded.data.path.as_deref().unwrap(),
        &loaded.to_data_config().unwrap(),
    )
    .unwrap();
    let params = estimate_distributions(&daily_returns(&records));
    let portfolio = Portfolio::from_positions(
        loaded.portfolio.positions.iter().map(|(t, v)| (t.clone(), *v)),
    );

    let report = VarSimulator::new(loaded.to_var_config().unwrap())
        .run(&portfolio, &params)
        .unwrap();

    assert_eq!(report.num_simulations, 500);
    assert_eq!(report.num_positions, 2);
    assert!((report.initial_value - 100_000.0).abs() < 1e-9);
    assert_eq!(report.var, report.distribution[25]);

    let export_path = dir.path().join("outcomes.csv");
    export_distribution_csv(&report, &export_path).unwrap();
    assert_eq!(fs::read_to_string(&export_path).unwrap().lines().count(), 501);
}
