use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use lattice_core::binomial::{price_option, render_lattice, MarketParameters, PricingConfig};
use lattice_core::{OptionType, OutputMode};

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OptionTypeArg {
    Call,
    Put,
}

impl From<OptionTypeArg> for OptionType {
    fn from(arg: OptionTypeArg) -> Self {
        match arg {
            OptionTypeArg::Call => OptionType::Call,
            OptionTypeArg::Put => OptionType::Put,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Numeric,
    Graphical,
}

impl From<ModeArg> for OutputMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Numeric => OutputMode::Numeric,
            ModeArg::Graphical => OutputMode::Graphical,
        }
    }
}

/// Contract inputs shared by every lattice command
#[derive(Args, Debug, Default)]
pub struct MarketArgs {
    /// Path to a JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// Initial asset price
    #[arg(long)]
    pub spot: Option<Decimal>,

    /// Exercise price
    #[arg(long)]
    pub strike: Option<Decimal>,

    /// Annual continuously compounded rate as a decimal (0.05 = 5%)
    #[arg(long)]
    pub risk_free_rate: Option<Decimal>,

    /// Number of time partitions
    #[arg(long)]
    pub steps: Option<u32>,

    /// Time to expiration in years
    #[arg(long)]
    pub maturity: Option<Decimal>,

    /// Annual volatility as a decimal (0.20 = 20%)
    #[arg(long)]
    pub volatility: Option<Decimal>,

    /// Payoff variant (default: call)
    #[arg(long, value_enum)]
    pub option_type: Option<OptionTypeArg>,
}

impl MarketArgs {
    /// Build the market inputs from flags alone.
    pub fn market_from_flags(&self) -> Result<MarketParameters, Box<dyn std::error::Error>> {
        Ok(MarketParameters {
            spot: self.spot.ok_or("--spot is required (or provide --input)")?,
            strike: self.strike.ok_or("--strike is required (or provide --input)")?,
            risk_free_rate: self
                .risk_free_rate
                .ok_or("--risk-free-rate is required (or provide --input)")?,
            steps: self.steps.ok_or("--steps is required (or provide --input)")?,
            maturity: self
                .maturity
                .ok_or("--maturity is required (or provide --input)")?,
            volatility: self
                .volatility
                .ok_or("--volatility is required (or provide --input)")?,
        })
    }

    pub fn config_from_flags(
        &self,
        mode: Option<ModeArg>,
    ) -> Result<PricingConfig, Box<dyn std::error::Error>> {
        Ok(PricingConfig::new(
            self.market_from_flags()?,
            self.option_type.map(OptionType::from).unwrap_or_default(),
            mode.map(OutputMode::from).unwrap_or_default(),
        ))
    }

    /// File, then stdin, then flags.
    pub fn pricing_config(
        &self,
        mode: Option<ModeArg>,
    ) -> Result<PricingConfig, Box<dyn std::error::Error>> {
        match input::load::<PricingConfig>(self.input.as_deref())? {
            Some(config) => Ok(config),
            None => self.config_from_flags(mode),
        }
    }
}

/// Arguments for pricing a European option on the lattice
#[derive(Args)]
pub struct PriceArgs {
    #[command(flatten)]
    pub market: MarketArgs,

    /// numeric prints the root price; graphical adds every lattice node
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,
}

pub fn run_price(args: PriceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = args.market.pricing_config(args.mode)?;
    debug!(
        mode = ?config.mode,
        option_type = ?config.option_type,
        steps = config.market.steps,
        "price command"
    );
    let value = match config.mode {
        OutputMode::Numeric => serde_json::to_value(price_option(&config)?)?,
        OutputMode::Graphical => serde_json::to_value(render_lattice(&config)?)?,
    };
    Ok(value)
}
