mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::analytics::{ConvergenceArgs, GreeksArgs, ParityArgs};
use commands::pricing::PriceArgs;

/// European option pricing on a binomial lattice
#[derive(Parser)]
#[command(
    name = "bopm",
    version,
    about = "European option pricing on a binomial lattice",
    long_about = "Prices European calls and puts on a recombining Cox-Ross-Rubinstein \
                  lattice with decimal precision. Reports the root price, or every \
                  lattice node in graphical mode, plus lattice Greeks, a put-call \
                  parity check and a step-count convergence study."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log filter for stderr (overrides RUST_LOG), e.g. "debug"
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Price a European option (numeric or graphical mode)
    Price(PriceArgs),
    /// Delta, gamma and theta read off the lattice
    Greeks(GreeksArgs),
    /// Price call and put on one lattice and check put-call parity
    Parity(ParityArgs),
    /// Compare lattice prices over a range of step counts with Black-Scholes
    Convergence(ConvergenceArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Price(args) => commands::pricing::run_price(args),
        Commands::Greeks(args) => commands::analytics::run_greeks(args),
        Commands::Parity(args) => commands::analytics::run_parity(args),
        Commands::Convergence(args) => commands::analytics::run_convergence(args),
        Commands::Version => {
            println!("bopm {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
