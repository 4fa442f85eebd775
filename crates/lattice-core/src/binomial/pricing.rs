use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Instant;
use tracing::{debug, warn};

use super::export::{self, LatticeRender, PriceOutput, PriceReport, ResultConsumer, Valuation};
use super::induction::{induct_grid, roll_back};
use super::lattice::{build_lattice, build_terminal_row};
use super::parameters::{validate, DerivedParameters, PricingConfig};
use super::payoff::terminal_payoffs;
use crate::types::*;
use crate::LatticeResult;

const METHODOLOGY: &str = "Cox-Ross-Rubinstein binomial lattice (European, backward induction)";

/// Step counts above this get a warning: work and memory grow with steps².
pub const LARGE_STEP_COUNT: u32 = 1000;

/// Distance from 0 or 1 at which the risk-neutral probability is flagged.
const PROBABILITY_EDGE: Decimal = dec!(0.000001);

fn run_warnings(derived: &DerivedParameters) -> Vec<String> {
    let mut warnings = Vec::new();
    if derived.steps > LARGE_STEP_COUNT {
        warn!(steps = derived.steps, "large lattice requested");
        warnings.push(format!(
            "{} steps builds {} nodes; runtime grows quadratically with steps",
            derived.steps,
            derived.node_count()
        ));
    }
    if derived.probability < PROBABILITY_EDGE
        || derived.probability > Decimal::ONE - PROBABILITY_EDGE
    {
        warnings.push(format!(
            "Risk-neutral probability {} is at the edge of [0, 1]; the lattice is effectively one-sided",
            derived.probability
        ));
    }
    warnings
}

fn assumptions(
    option_type: OptionType,
    mode: OutputMode,
    derived: &DerivedParameters,
) -> serde_json::Value {
    serde_json::json!({
        "model": METHODOLOGY,
        "exercise": "European",
        "option_type": option_type,
        "mode": mode,
        "steps": derived.steps,
        "dt": derived.dt.to_string(),
        "up": derived.up.to_string(),
        "down": derived.down.to_string(),
        "discount": derived.discount.to_string(),
        "risk_neutral_probability": derived.probability.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Pipeline stages
// ---------------------------------------------------------------------------

/// Root price only: terminal row, payoffs, rolling induction.
pub(crate) fn root_price(
    derived: &DerivedParameters,
    option_type: OptionType,
) -> LatticeResult<Money> {
    let terminal = build_terminal_row(derived)?;
    let payoffs = terminal_payoffs(option_type, &terminal, derived.strike);
    roll_back(derived, payoffs)
}

/// Full lattice and value grid.
pub(crate) fn full_valuation(
    derived: DerivedParameters,
    option_type: OptionType,
) -> LatticeResult<Valuation> {
    let lattice = build_lattice(&derived)?;
    let payoffs = terminal_payoffs(option_type, lattice.terminal_row(), derived.strike);
    let values = induct_grid(&derived, &payoffs)?;
    let price = values.root();
    Ok(Valuation {
        option_type,
        derived,
        lattice,
        values,
        price,
    })
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run one valuation and hand the result to `consumer`.
///
/// Numeric consumers never see the interior of the lattice, so the run keeps
/// a single row alive. Graphical consumers get the full lattice and grid.
pub fn price_with<C: ResultConsumer>(
    config: &PricingConfig,
    consumer: C,
) -> LatticeResult<ComputationOutput<C::Output>> {
    let start = Instant::now();
    let derived = validate(&config.market)?;
    let warnings = run_warnings(&derived);
    let mode = consumer.mode();
    let assumptions = assumptions(config.option_type, mode, &derived);

    let output = match mode {
        OutputMode::Numeric => {
            let price = root_price(&derived, config.option_type)?;
            consumer.finish(export::summarize(config.option_type, &derived, price))
        }
        OutputMode::Graphical => {
            let valuation = full_valuation(derived, config.option_type)?;
            export::export(consumer, &valuation)
        }
    };

    let elapsed = start.elapsed().as_micros() as u64;
    debug!(?mode, elapsed_us = elapsed, "pricing run complete");
    Ok(with_metadata(
        METHODOLOGY,
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

/// Numeric mode: the root option price.
pub fn price_option(config: &PricingConfig) -> LatticeResult<ComputationOutput<PriceOutput>> {
    price_with(config, PriceReport::new())
}

/// Graphical mode: the root price plus every node.
pub fn render_lattice(
    config: &PricingConfig,
) -> LatticeResult<ComputationOutput<export::LatticeOutput>> {
    price_with(config, LatticeRender::new())
}

/// The complete valuation, for callers that want to walk the lattice themselves.
pub fn value_option(config: &PricingConfig) -> LatticeResult<ComputationOutput<Valuation>> {
    let start = Instant::now();
    let derived = validate(&config.market)?;
    let warnings = run_warnings(&derived);
    let assumptions = assumptions(config.option_type, OutputMode::Graphical, &derived);
    let valuation = full_valuation(derived, config.option_type)?;
    debug!(
        price = %valuation.price,
        nodes = valuation.lattice.node_count(),
        "valuation complete"
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        METHODOLOGY,
        &assumptions,
        warnings,
        elapsed,
        valuation,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binomial::parameters::MarketParameters;
    use crate::error::LatticeError;

    fn approx_eq(a: Decimal, b: Decimal, tol: Decimal) -> bool {
        (a - b).abs() < tol
    }

    fn market() -> MarketParameters {
        MarketParameters {
            spot: dec!(100),
            strike: dec!(100),
            risk_free_rate: dec!(0.05),
            steps: 2,
            maturity: dec!(1),
            volatility: dec!(0.20),
        }
    }

    fn config(option_type: OptionType, mode: OutputMode) -> PricingConfig {
        PricingConfig::new(market(), option_type, mode)
    }

    #[test]
    fn test_price_option_two_step_call() {
        let out = price_option(&config(OptionType::Call, OutputMode::Numeric)).unwrap();
        assert!(
            approx_eq(out.result.price, dec!(9.55), dec!(0.05)),
            "price = {}",
            out.result.price
        );
        assert_eq!(out.result.steps, 2);
        assert_eq!(out.result.option_type, OptionType::Call);
    }

    #[test]
    fn test_numeric_and_graphical_agree() {
        for option_type in [OptionType::Call, OptionType::Put] {
            let numeric = price_option(&config(option_type, OutputMode::Numeric)).unwrap();
            let graphical = render_lattice(&config(option_type, OutputMode::Graphical)).unwrap();
            assert_eq!(numeric.result.price, graphical.result.price);
            assert_eq!(graphical.result.nodes.len(), 6);
        }
    }

    #[test]
    fn test_value_option_matches_price_option() {
        let cfg = PricingConfig::new(
            MarketParameters {
                steps: 25,
                ..market()
            },
            OptionType::Put,
            OutputMode::Numeric,
        );
        let valuation = value_option(&cfg).unwrap().result;
        let priced = price_option(&cfg).unwrap().result;
        assert_eq!(valuation.price, priced.price);
        assert_eq!(valuation.values.root(), priced.price);
    }

    #[test]
    fn test_validation_runs_before_lattice_work() {
        let cfg = PricingConfig::new(
            MarketParameters {
                spot: dec!(-1),
                ..market()
            },
            OptionType::Call,
            OutputMode::Graphical,
        );
        let err = render_lattice(&cfg).unwrap_err();
        assert!(err.is_config_error());
        match err {
            LatticeError::InvalidInput { field, .. } => assert_eq!(field, "spot"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_large_step_warning() {
        let cfg = PricingConfig::new(
            MarketParameters {
                steps: LARGE_STEP_COUNT + 1,
                ..market()
            },
            OptionType::Call,
            OutputMode::Numeric,
        );
        let out = price_option(&cfg).unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].contains("1001 steps"));
    }

    #[test]
    fn test_no_warnings_for_ordinary_run() {
        let out = price_option(&config(OptionType::Call, OutputMode::Numeric)).unwrap();
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_metadata_populated() {
        let out = price_option(&config(OptionType::Put, OutputMode::Numeric)).unwrap();
        assert_eq!(out.methodology, METHODOLOGY);
        assert_eq!(out.assumptions["exercise"], "European");
        assert_eq!(out.assumptions["option_type"], "put");
        assert_eq!(out.assumptions["mode"], "numeric");
        assert!(!out.metadata.version.is_empty());
    }
}
