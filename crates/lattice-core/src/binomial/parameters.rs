use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LatticeError;
use crate::math;
use crate::types::*;
use crate::LatticeResult;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The six raw market inputs of one pricing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketParameters {
    /// Initial asset price
    pub spot: Money,
    /// Exercise price
    pub strike: Money,
    /// Annualised, continuously compounded (0.05 = 5%)
    pub risk_free_rate: Rate,
    /// Number of time partitions
    pub steps: u32,
    /// Time to expiration in years
    pub maturity: Years,
    /// Annualised standard deviation of returns (0.20 = 20%)
    pub volatility: Rate,
}

/// Everything a run needs: market inputs plus the payoff and output choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(flatten)]
    pub market: MarketParameters,
    #[serde(default)]
    pub option_type: OptionType,
    #[serde(default)]
    pub mode: OutputMode,
}

impl PricingConfig {
    pub fn new(market: MarketParameters, option_type: OptionType, mode: OutputMode) -> Self {
        Self {
            market,
            option_type,
            mode,
        }
    }
}

/// Validated inputs and the per-step factors derived from them.
///
/// Only [`validate`] produces one, so holding a `DerivedParameters` means the
/// inputs passed every check and `0 <= probability <= 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedParameters {
    pub spot: Money,
    pub strike: Money,
    pub risk_free_rate: Rate,
    pub maturity: Years,
    pub volatility: Rate,
    pub steps: u32,
    /// maturity / steps
    pub dt: Years,
    /// exp(volatility * sqrt(dt))
    pub up: Decimal,
    /// 1 / up
    pub down: Decimal,
    /// exp(risk_free_rate * dt)
    pub growth: Decimal,
    /// exp(-risk_free_rate * dt)
    pub discount: Decimal,
    /// (growth - down) / (up - down)
    pub probability: Decimal,
}

impl DerivedParameters {
    /// Weight of the down branch, `1 - p`.
    pub fn down_probability(&self) -> Decimal {
        Decimal::ONE - self.probability
    }

    /// Nodes in the full lattice: (steps + 1)(steps + 2) / 2.
    pub fn node_count(&self) -> usize {
        let n = self.steps as usize;
        (n + 1) * (n + 2) / 2
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn require_positive(value: Decimal, field: &str) -> LatticeResult<()> {
    if value <= Decimal::ZERO {
        return Err(LatticeError::InvalidInput {
            field: field.into(),
            reason: "must be positive".into(),
        });
    }
    Ok(())
}

/// Domain checks shared by every model that prices the same contract.
pub(crate) fn validate_contract(
    spot: Money,
    strike: Money,
    maturity: Years,
    volatility: Rate,
) -> LatticeResult<()> {
    require_positive(spot, "spot")?;
    require_positive(strike, "strike")?;
    require_positive(volatility, "volatility")?;
    require_positive(maturity, "maturity")
}

/// Check the raw inputs and derive `dt`, `up`, `down`, `discount` and `p`.
///
/// Fails with a configuration error if any input is out of domain or the
/// risk-neutral probability leaves `[0, 1]`, and with a numeric error if a
/// derived factor overflows. Nothing is clamped.
pub fn validate(params: &MarketParameters) -> LatticeResult<DerivedParameters> {
    validate_contract(params.spot, params.strike, params.maturity, params.volatility)?;
    if params.steps < 1 {
        return Err(LatticeError::InvalidInput {
            field: "steps".into(),
            reason: "must be at least 1".into(),
        });
    }

    let dt = math::div(params.maturity, Decimal::from(params.steps), "dt")?;
    let sqrt_dt = math::sqrt(dt, "sqrt(dt)")?;
    let vol_sqrt_dt = math::mul(params.volatility, sqrt_dt, "volatility * sqrt(dt)")?;
    let up = math::exp(vol_sqrt_dt, "up")?;
    let down = math::div(Decimal::ONE, up, "down")?;
    if up <= down {
        return Err(LatticeError::DegenerateLattice {
            reason: format!(
                "volatility {} is too small to separate up and down moves over dt = {}",
                params.volatility, dt
            ),
        });
    }

    let rate_dt = math::mul(params.risk_free_rate, dt, "risk_free_rate * dt")?;
    let growth = math::exp(rate_dt, "growth")?;
    let discount = math::exp(-rate_dt, "discount")?;

    let probability = math::div(growth - down, up - down, "risk-neutral probability")?;
    if probability < Decimal::ZERO || probability > Decimal::ONE {
        return Err(LatticeError::ArbitrageViolation {
            probability,
            up,
            down,
            growth,
        });
    }

    debug!(
        steps = params.steps,
        %dt,
        %up,
        %down,
        %discount,
        %probability,
        "derived lattice parameters"
    );

    Ok(DerivedParameters {
        spot: params.spot,
        strike: params.strike,
        risk_free_rate: params.risk_free_rate,
        maturity: params.maturity,
        volatility: params.volatility,
        steps: params.steps,
        dt,
        up,
        down,
        growth,
        discount,
        probability,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn approx_eq(a: Decimal, b: Decimal, tol: Decimal) -> bool {
        (a - b).abs() < tol
    }

    fn two_step_market() -> MarketParameters {
        MarketParameters {
            spot: dec!(100),
            strike: dec!(100),
            risk_free_rate: dec!(0.05),
            steps: 2,
            maturity: dec!(1),
            volatility: dec!(0.20),
        }
    }

    fn expect_invalid(params: MarketParameters, expected_field: &str) {
        match validate(&params).unwrap_err() {
            LatticeError::InvalidInput { field, .. } => assert_eq!(field, expected_field),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_derived_values_two_step() {
        let d = validate(&two_step_market()).unwrap();
        assert_eq!(d.dt, dec!(0.5));
        assert!(approx_eq(d.up, dec!(1.1518), dec!(0.001)), "up = {}", d.up);
        assert!(approx_eq(d.down, dec!(0.8682), dec!(0.001)), "down = {}", d.down);
        assert!(
            approx_eq(d.probability, dec!(0.5543), dec!(0.001)),
            "p = {}",
            d.probability
        );
        assert!(
            approx_eq(d.discount, dec!(0.9753), dec!(0.0001)),
            "discount = {}",
            d.discount
        );
    }

    #[test]
    fn test_up_down_reciprocal() {
        let d = validate(&two_step_market()).unwrap();
        assert!(approx_eq(d.up * d.down, Decimal::ONE, dec!(0.000000000001)));
        assert!(approx_eq(
            d.growth * d.discount,
            Decimal::ONE,
            dec!(0.000000000001)
        ));
    }

    #[test]
    fn test_probability_in_unit_interval() {
        let d = validate(&two_step_market()).unwrap();
        assert!(d.probability >= Decimal::ZERO && d.probability <= Decimal::ONE);
        assert_eq!(d.probability + d.down_probability(), Decimal::ONE);
    }

    #[test]
    fn test_negative_rate_accepted() {
        let params = MarketParameters {
            risk_free_rate: dec!(-0.01),
            ..two_step_market()
        };
        let d = validate(&params).unwrap();
        assert!(d.discount > Decimal::ONE);
    }

    #[test]
    fn test_non_positive_spot() {
        expect_invalid(
            MarketParameters {
                spot: dec!(0),
                ..two_step_market()
            },
            "spot",
        );
    }

    #[test]
    fn test_non_positive_strike() {
        expect_invalid(
            MarketParameters {
                strike: dec!(-5),
                ..two_step_market()
            },
            "strike",
        );
    }

    #[test]
    fn test_non_positive_volatility() {
        expect_invalid(
            MarketParameters {
                volatility: dec!(0),
                ..two_step_market()
            },
            "volatility",
        );
    }

    #[test]
    fn test_non_positive_maturity() {
        expect_invalid(
            MarketParameters {
                maturity: dec!(-1),
                ..two_step_market()
            },
            "maturity",
        );
    }

    #[test]
    fn test_zero_steps() {
        expect_invalid(
            MarketParameters {
                steps: 0,
                ..two_step_market()
            },
            "steps",
        );
    }

    #[test]
    fn test_arbitrage_violation_when_rate_dominates_volatility() {
        // growth = e^0.25 > up = e^0.01, so p > 1
        let params = MarketParameters {
            risk_free_rate: dec!(0.25),
            volatility: dec!(0.01),
            steps: 1,
            ..two_step_market()
        };
        let err = validate(&params).unwrap_err();
        assert!(err.is_config_error());
        match err {
            LatticeError::ArbitrageViolation { probability, .. } => {
                assert!(probability > Decimal::ONE)
            }
            other => panic!("Expected ArbitrageViolation, got {other:?}"),
        }
    }

    #[test]
    fn test_arbitrage_violation_negative_probability() {
        let params = MarketParameters {
            risk_free_rate: dec!(-0.30),
            volatility: dec!(0.01),
            steps: 1,
            ..two_step_market()
        };
        match validate(&params).unwrap_err() {
            LatticeError::ArbitrageViolation { probability, .. } => {
                assert!(probability < Decimal::ZERO)
            }
            other => panic!("Expected ArbitrageViolation, got {other:?}"),
        }
    }

    #[test]
    fn test_node_count() {
        let d = validate(&two_step_market()).unwrap();
        assert_eq!(d.node_count(), 6);
    }

    #[test]
    fn test_config_deserializes_flat_with_defaults() {
        let json = r#"{
            "spot": 40, "strike": 40, "risk_free_rate": 0.04,
            "steps": 101, "maturity": 0.5, "volatility": 0.30
        }"#;
        let cfg: PricingConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.market.steps, 101);
        assert_eq!(cfg.market.volatility, dec!(0.30));
        assert_eq!(cfg.option_type, OptionType::Call);
        assert_eq!(cfg.mode, OutputMode::Numeric);
    }

    #[test]
    fn test_config_deserializes_put_graphical() {
        let json = r#"{
            "spot": "100", "strike": "95", "risk_free_rate": "0.03",
            "steps": 3, "maturity": "1", "volatility": "0.25",
            "option_type": "put", "mode": "graphical"
        }"#;
        let cfg: PricingConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.option_type, OptionType::Put);
        assert_eq!(cfg.mode, OutputMode::Graphical);
        assert_eq!(cfg.market.strike, dec!(95));
    }
}
