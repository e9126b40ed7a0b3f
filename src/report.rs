//! Terminal, JSON and CSV formatting of simulation results.

use crate::monte_carlo::VarReport;
use crate::simulation::SimulationPath;
use crate::types::{DistributionMap, Portfolio};
use colored::Colorize;
use tabled::{builder::Builder, settings::Style};

/// Formats reports for output.
pub struct ReportFormatter;

impl ReportFormatter {
    /// Print a full value-at-risk report.
    pub fn print_report(report: &VarReport) {
        println!();
        println!("{}", "═".repeat(60).blue());
        println!("{}", " MONTE CARLO VALUE AT RISK ".bold().blue());
        println!("{}", "═".repeat(60).blue());
        println!();

        println!("{}", "Overview".bold().underline());
        println!("  Simulations:     {:>14}", report.num_simulations);
        println!("  Horizon:         {:>14} days", report.days);
        println!("  Positions:       {:>14}", report.num_positions);
        println!("  Master Seed:     {:>14}", report.master_seed);
        println!("  Initial Value:   ${:>13.2}", report.initial_value);
        println!();

        println!("{}", "Outcome".bold().underline());
        println!(
            "  Mean Gain:       ${:>13.2}  {}",
            report.mean_gain,
            Self::format_signed(report.mean_gain)
        );
        println!("  Median Gain:     ${:>13.2}", report.median_gain);
        println!("  Std Dev:         ${:>13.2}", report.std_gain);
        println!("  P(Loss):         {:>13.1}%", report.prob_loss * 100.0);
        println!();

        println!("{}", "Risk".bold().underline());
        println!(
            "  VaR ({:>5.2}%):   ${:>13.2}  {}",
            report.percentile * 100.0,
            report.var,
            Self::format_signed(report.var_pct())
        );
        println!("  Exp. Shortfall:  ${:>13.2}", report.expected_shortfall);
        println!();

        println!("{}", "Percentiles".bold().underline());
        for point in &report.percentiles {
            println!(
                "  {:>5.1}%:          ${:>13.2}",
                point.percentile * 100.0,
                point.value
            );
        }
        println!();

        println!("{}", "═".repeat(60).blue());
    }

    /// Format a signed percentage with color.
    fn format_signed(pct: f64) -> String {
        if pct >= 0.0 {
            format!("(+{:.2}%)", pct).green().to_string()
        } else {
            format!("({:.2}%)", pct).red().to_string()
        }
    }

    /// Render per-ticker distribution parameters as a table.
    pub fn params_table(params: &DistributionMap) -> String {
        let mut builder = Builder::new();
        builder.push_record(["Ticker", "Mean %", "Std Dev %"]);
        for (ticker, p) in params {
            builder.push_record([
                ticker.clone(),
                format!("{:.4}", p.mean),
                format!("{:.4}", p.std_dev),
            ]);
        }
        builder.build().with(Style::rounded()).to_string()
    }

    /// Render a portfolio as a table with a total row.
    pub fn portfolio_table(portfolio: &Portfolio) -> String {
        let mut builder = Builder::new();
        builder.push_record(["Ticker", "Value"]);
        for (ticker, value) in portfolio {
            builder.push_record([ticker.clone(), format!("{:.2}", value)]);
        }
        builder.push_record(["TOTAL".to_string(), format!("{:.2}", portfolio.total_value())]);
        builder.build().with(Style::rounded()).to_string()
    }

    /// Print a single simulated path.
    pub fn print_path(path: &SimulationPath) {
        println!();
        println!("{}", format!("Simulated path (seed {})", path.seed).bold().underline());
        for (day, value) in path.history.iter().enumerate() {
            println!("  Day {:>4}: ${:>15.2}", day, value);
        }
        let change_pct = if path.initial_value() == 0.0 {
            0.0
        } else {
            path.gain() / path.initial_value() * 100.0
        };
        println!(
            "  Gain:     ${:>15.2}  {}",
            path.gain(),
            Self::format_signed(change_pct)
        );
        println!();
    }

    /// Export a report to JSON.
    pub fn to_json(report: &VarReport) -> String {
        serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
    }

    /// Export distribution parameters to JSON.
    pub fn params_to_json(params: &DistributionMap) -> String {
        serde_json::to_string_pretty(params).unwrap_or_else(|_| "{}".to_string())
    }

    /// Export a report to a CSV line.
    pub fn to_csv_line(report: &VarReport) -> String {
        format!(
            "{},{},{},{:.4},{:.2},{:.2},{:.2},{:.2},{:.2},{:.4}",
            report.num_simulations,
            report.days,
            report.num_positions,
            report.percentile,
            report.initial_value,
            report.var,
            report.expected_shortfall,
            report.mean_gain,
            report.median_gain,
            report.prob_loss
        )
    }

    /// Get CSV header.
    pub fn csv_header() -> &'static str {
        "num_simulations,days,num_positions,percentile,initial_value,var,expected_shortfall,mean_gain,median_gain,prob_loss"
    }

    /// Distribution parameters as CSV lines, including header.
    pub fn params_to_csv(params: &DistributionMap) -> String {
        let mut out = String::from("ticker,mean_pct,std_dev_pct\n");
        for (ticker, p) in params {
            out.push_str(&format!("{},{:.6},{:.6}\n", ticker, p.mean, p.std_dev));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monte_carlo::VarConfig;
    use crate::types::DistributionParams;

    fn params() -> DistributionMap {
        [
            ("AAPL".to_string(), DistributionParams::new(0.05, 1.7)),
            ("MSFT".to_string(), DistributionParams::new(0.07, 1.5)),
        ]
        .into_iter()
        .collect()
    }

    fn report() -> VarReport {
        let gains: Vec<f64> = (0..20).map(|i| i as f64 * 10.0 - 100.0).collect();
        VarReport::from_gains(&VarConfig::default(), 1, 2, 1_000.0, gains).unwrap()
    }

    #[test]
    fn test_params_table_lists_tickers() {
        let table = ReportFormatter::params_table(&params());
        assert!(table.contains("AAPL"));
        assert!(table.contains("MSFT"));
        assert!(table.contains("1.7000"));
    }

    #[test]
    fn test_portfolio_table_total() {
        let portfolio = Portfolio::from_positions([("AAPL", 100.0), ("MSFT", 50.5)]);
        let table = ReportFormatter::portfolio_table(&portfolio);
        assert!(table.contains("TOTAL"));
        assert!(table.contains("150.50"));
    }

    #[test]
    fn test_csv_line_matches_header() {
        let line = ReportFormatter::to_csv_line(&report());
        let header = ReportFormatter::csv_header();
        assert_eq!(line.split(',').count(), header.split(',').count());
        assert!(line.starts_with("20,5,2,"));
    }

    #[test]
    fn test_json_round_trips_var() {
        let json = ReportFormatter::to_json(&report());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["var"].as_f64(), Some(-90.0));
        assert_eq!(value["distribution"].as_array().map(|a| a.len()), Some(20));
        assert_eq!(value["num_simulations"].as_u64(), Some(20));
        assert!(value.get("config").is_none());
    }

    #[test]
    fn test_params_csv() {
        let csv = ReportFormatter::params_to_csv(&params());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "AAPL,0.050000,1.700000");
    }
}
