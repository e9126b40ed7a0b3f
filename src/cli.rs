//! Command-line interface for the value-at-risk simulator.

use mcvar::config::VarFileConfig;
use mcvar::data::{daily_returns, latest_prices, load_csv, load_prices, DataConfig};
use mcvar::error::{Result, VarError};
use mcvar::export::{
    export_distribution_csv, export_history_csv, export_prices_parquet, export_report_json,
};
use mcvar::monte_carlo::{VarConfig, VarSimulator};
use mcvar::portfolio::{random_portfolio, ShareCountRange};
use mcvar::report::ReportFormatter;
use mcvar::simulation::simulate_with_history;
use mcvar::stats::estimate_distributions;
use mcvar::types::{DistributionMap, Portfolio};

use clap::{Parser, Subcommand, ValueEnum};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// mcvar - Monte Carlo value-at-risk over historical security returns.
#[derive(Parser)]
#[command(name = "mcvar")]
#[command(version)]
#[command(about = "Estimate portfolio value-at-risk by Monte Carlo simulation")]
#[command(long_about = None)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print per-ticker mean and standard deviation of daily percent change
    Stats {
        /// Path to price file (CSV or Parquet)
        #[arg(short, long)]
        data: PathBuf,
    },

    /// Estimate value-at-risk for a random portfolio
    Simulate {
        /// Path to price file (CSV or Parquet)
        #[arg(short, long)]
        data: PathBuf,

        /// Number of simulations
        #[arg(short = 'n', long, default_value = "10000")]
        simulations: usize,

        /// Days simulated per run
        #[arg(long, default_value = "5")]
        days: usize,

        /// Percentile read as the VaR (e.g., 0.05 for 5%)
        #[arg(short, long, default_value = "0.05")]
        percentile: f64,

        /// Master seed for the simulation batch
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        portfolio: PortfolioArgs,

        /// Write the sorted outcome distribution to a CSV file
        #[arg(long)]
        export: Option<PathBuf>,

        /// Write the full report as JSON
        #[arg(long)]
        save_report: Option<PathBuf>,

        /// Show a progress bar
        #[arg(long)]
        progress: bool,
    },

    /// Run one seeded simulation and show the daily portfolio value
    Path {
        /// Path to price file (CSV or Parquet)
        #[arg(short, long)]
        data: PathBuf,

        /// Days to simulate
        #[arg(long, default_value = "5")]
        days: usize,

        /// Seed for the run
        #[arg(long, default_value = "0")]
        seed: u64,

        #[command(flatten)]
        portfolio: PortfolioArgs,

        /// Write the daily values to a CSV file
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Convert a CSV price file to Parquet
    Convert {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Output Parquet file
        #[arg(short = 'O', long)]
        out: PathBuf,
    },

    /// Generate an example configuration file
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = "mcvar.toml")]
        file: PathBuf,
    },

    /// Run a value-at-risk estimate from a configuration file
    RunConfig {
        /// Path to TOML configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Write the sorted outcome distribution to a CSV file
        #[arg(long)]
        export: Option<PathBuf>,

        /// Write the full report as JSON
        #[arg(long)]
        save_report: Option<PathBuf>,
    },
}

/// Random portfolio options shared by several commands.
#[derive(clap::Args)]
pub struct PortfolioArgs {
    /// Minimum shares drawn per position
    #[arg(long, default_value = "0")]
    min_shares: u64,

    /// Maximum shares drawn per position
    #[arg(long, default_value = "1000")]
    max_shares: u64,

    /// Seed for the random share counts
    #[arg(long, default_value = "42")]
    portfolio_seed: u64,
}

impl PortfolioArgs {
    fn share_range(&self) -> Result<ShareCountRange> {
        ShareCountRange::new(self.min_shares, self.max_shares)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl Cli {
    /// Initialize logging based on verbosity level.
    pub fn init_logging(&self) {
        let level = match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };

        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();

        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("Failed to set tracing subscriber: {}", e);
        }
    }
}

/// Run the CLI application.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    cli.init_logging();

    match &cli.command {
        Commands::Stats { data } => print_stats(data, cli.output),

        Commands::Simulate {
            data,
            simulations,
            days,
            percentile,
            seed,
            portfolio,
            export,
            save_report,
            progress,
        } => {
            let mut config = VarConfig::default()
                .with_simulations(*simulations)
                .with_days(*days)
                .with_percentile(*percentile)
                .with_progress(*progress);
            config.seed = *seed;

            let (portfolio, params) = prepare_inputs(
                data,
                &DataConfig::default(),
                &portfolio.share_range()?,
                portfolio.portfolio_seed,
                &BTreeMap::new(),
            )?;
            let outputs = RunOutputs {
                distribution: export.as_deref(),
                report: save_report.as_deref(),
            };
            run_var(&portfolio, &params, config, &outputs, cli.output)
        }

        Commands::Path {
            data,
            days,
            seed,
            portfolio,
            export,
        } => {
            let (portfolio, params) = prepare_inputs(
                data,
                &DataConfig::default(),
                &portfolio.share_range()?,
                portfolio.portfolio_seed,
                &BTreeMap::new(),
            )?;
            run_path(&portfolio, &params, *days, *seed, export.as_deref(), cli.output)
        }

        Commands::Convert { input, out } => convert(input, out),

        Commands::Init { file } => init_config(file),

        Commands::RunConfig {
            config,
            export,
            save_report,
        } => {
            let outputs = RunOutputs {
                distribution: export.as_deref(),
                report: save_report.as_deref(),
            };
            run_from_config(config, &outputs, cli.output)
        }
    }
}

/// Optional files written after a value-at-risk run.
struct RunOutputs<'a> {
    distribution: Option<&'a Path>,
    report: Option<&'a Path>,
}

/// Load prices, estimate distributions and build the portfolio.
///
/// Explicit `positions` take precedence over a random portfolio.
fn prepare_inputs(
    data_path: &Path,
    data_config: &DataConfig,
    range: &ShareCountRange,
    portfolio_seed: u64,
    positions: &BTreeMap<String, f64>,
) -> Result<(Portfolio, DistributionMap)> {
    let records = load_prices(data_path, data_config)?;
    let params = estimate_distributions(&daily_returns(&records));
    if params.is_empty() {
        return Err(VarError::DataError(
            "No ticker has enough history to estimate returns".to_string(),
        ));
    }

    let portfolio = if positions.is_empty() {
        // Only securities with estimated parameters can be simulated
        let prices: BTreeMap<String, f64> = latest_prices(&records)
            .into_iter()
            .filter(|(ticker, _)| params.contains_key(ticker))
            .collect();
        random_portfolio(&prices, range, portfolio_seed)?
    } else {
        Portfolio::from_positions(positions.iter().map(|(t, v)| (t.clone(), *v)))
    };

    Ok((portfolio, params))
}

fn print_stats(data_path: &Path, output: OutputFormat) -> Result<()> {
    let records = load_prices(data_path, &DataConfig::default())?;
    let params = estimate_distributions(&daily_returns(&records));

    match output {
        OutputFormat::Text => {
            println!("\nDaily percent change by ticker:\n");
            println!("{}", ReportFormatter::params_table(&params));
        }
        OutputFormat::Json => println!("{}", ReportFormatter::params_to_json(&params)),
        OutputFormat::Csv => print!("{}", ReportFormatter::params_to_csv(&params)),
    }
    Ok(())
}

fn run_var(
    portfolio: &Portfolio,
    params: &DistributionMap,
    config: VarConfig,
    outputs: &RunOutputs<'_>,
    output: OutputFormat,
) -> Result<()> {
    let report = VarSimulator::new(config).run(portfolio, params)?;

    match output {
        OutputFormat::Text => {
            println!("\nPortfolio:\n");
            println!("{}", ReportFormatter::portfolio_table(portfolio));
            ReportFormatter::print_report(&report);
        }
        OutputFormat::Json => println!("{}", ReportFormatter::to_json(&report)),
        OutputFormat::Csv => {
            println!("{}", ReportFormatter::csv_header());
            println!("{}", ReportFormatter::to_csv_line(&report));
        }
    }

    if let Some(path) = outputs.distribution {
        export_distribution_csv(&report, path)?;
    }
    if let Some(path) = outputs.report {
        export_report_json(&report, path)?;
    }
    Ok(())
}

fn run_path(
    portfolio: &Portfolio,
    params: &DistributionMap,
    days: usize,
    seed: u64,
    export: Option<&Path>,
    output: OutputFormat,
) -> Result<()> {
    let path = simulate_with_history(portfolio, params, days, seed)?;

    match output {
        OutputFormat::Text => ReportFormatter::print_path(&path),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&path)?),
        OutputFormat::Csv => {
            println!("day,total_value");
            for (day, value) in path.history.iter().enumerate() {
                println!("{},{:.4}", day, value);
            }
        }
    }

    if let Some(file) = export {
        export_history_csv(&path, file)?;
    }
    Ok(())
}

fn convert(input: &Path, out: &Path) -> Result<()> {
    let records = load_csv(input, &DataConfig::default())?;
    export_prices_parquet(&records, out)?;
    println!(
        "Converted {} rows from {} to {}",
        records.len(),
        input.display(),
        out.display()
    );
    Ok(())
}

fn init_config(output: &Path) -> Result<()> {
    let example = VarFileConfig::example();
    fs::write(output, example)?;
    println!("Created example configuration file: {}", output.display());
    println!("\nEdit this file to point at your price data, then run:");
    println!("  mcvar run-config -c {}", output.display());
    Ok(())
}

fn run_from_config(config_path: &Path, outputs: &RunOutputs<'_>, output: OutputFormat) -> Result<()> {
    info!("Loading configuration from: {}", config_path.display());

    let file_config = VarFileConfig::load(config_path)?;
    let var_config = file_config.to_var_config()?;
    let data_config = file_config.to_data_config()?;

    let data_path = file_config.data.path.as_deref().ok_or_else(|| {
        VarError::ConfigError("No data path specified in config".to_string())
    })?;

    let (portfolio, params) = prepare_inputs(
        Path::new(data_path),
        &data_config,
        &file_config.share_range()?,
        file_config.portfolio.seed,
        &file_config.portfolio.positions,
    )?;

    run_var(&portfolio, &params, var_config, outputs, output)
}
