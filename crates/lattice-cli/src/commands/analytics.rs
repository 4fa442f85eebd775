use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use lattice_core::analytics::{
    convergence_study, lattice_greeks, put_call_parity, ConvergenceInput,
};
use lattice_core::binomial::MarketParameters;
use lattice_core::OptionType;

use super::pricing::{MarketArgs, OptionTypeArg};
use crate::input;

/// Arguments for lattice Greeks
#[derive(Args)]
pub struct GreeksArgs {
    #[command(flatten)]
    pub market: MarketArgs,
}

pub fn run_greeks(args: GreeksArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = args.market.pricing_config(None)?;
    let result = lattice_greeks(&config)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for the put-call parity check
#[derive(Args)]
pub struct ParityArgs {
    #[command(flatten)]
    pub market: MarketArgs,
}

pub fn run_parity(args: ParityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let market: MarketParameters = match input::load(args.market.input.as_deref())? {
        Some(market) => market,
        None => args.market.market_from_flags()?,
    };
    let result = put_call_parity(&market)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for a step-count convergence study
#[derive(Args)]
pub struct ConvergenceArgs {
    /// Path to a JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long)]
    pub spot: Option<Decimal>,

    #[arg(long)]
    pub strike: Option<Decimal>,

    #[arg(long)]
    pub risk_free_rate: Option<Decimal>,

    #[arg(long)]
    pub maturity: Option<Decimal>,

    #[arg(long)]
    pub volatility: Option<Decimal>,

    #[arg(long, value_enum)]
    pub option_type: Option<OptionTypeArg>,

    /// First step count in the sweep
    #[arg(long)]
    pub from_steps: Option<u32>,

    /// Last step count in the sweep (always included)
    #[arg(long)]
    pub to_steps: Option<u32>,

    /// Increment between step counts
    #[arg(long, default_value = "1")]
    pub stride: u32,
}

pub fn run_convergence(args: ConvergenceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let study: ConvergenceInput = match input::load(args.input.as_deref())? {
        Some(study) => study,
        None => ConvergenceInput {
            spot: args.spot.ok_or("--spot is required (or provide --input)")?,
            strike: args.strike.ok_or("--strike is required (or provide --input)")?,
            risk_free_rate: args
                .risk_free_rate
                .ok_or("--risk-free-rate is required (or provide --input)")?,
            maturity: args
                .maturity
                .ok_or("--maturity is required (or provide --input)")?,
            volatility: args
                .volatility
                .ok_or("--volatility is required (or provide --input)")?,
            option_type: args.option_type.map(OptionType::from).unwrap_or_default(),
            from_steps: args
                .from_steps
                .ok_or("--from-steps is required (or provide --input)")?,
            to_steps: args
                .to_steps
                .ok_or("--to-steps is required (or provide --input)")?,
            stride: args.stride,
        },
    };
    let result = convergence_study(&study)?;
    Ok(serde_json::to_value(result)?)
}
