use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::binomial::export::Valuation;
use crate::binomial::parameters::{validate, PricingConfig};
use crate::binomial::pricing::full_valuation;
use crate::error::LatticeError;
use crate::math;
use crate::types::*;
use crate::LatticeResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatticeGreeks {
    pub price: Money,
    pub delta: Decimal,
    /// Needs at least two steps.
    pub gamma: Option<Decimal>,
    /// Per year. Needs at least two steps.
    pub theta: Option<Decimal>,
    /// Per calendar day (theta / 365).
    pub theta_per_day: Option<Decimal>,
}

fn node(valuation: &Valuation, layer: usize, up_count: usize) -> LatticeResult<(Money, Money)> {
    let price = valuation.lattice.price(layer, up_count);
    let value = valuation.values.value(layer, up_count);
    price.zip(value).ok_or_else(|| LatticeError::InvalidInput {
        field: "steps".into(),
        reason: format!("lattice has no node ({layer}, {up_count})"),
    })
}

/// Slope of option value against asset price between two nodes of one layer.
fn slope(low: (Money, Money), high: (Money, Money), context: &str) -> LatticeResult<Decimal> {
    math::div(high.1 - low.1, high.0 - low.0, context)
}

/// Greeks read straight off the lattice: delta from layer 1, gamma from
/// layer 2, theta from the middle node of layer 2 against the root.
pub fn greeks_from_valuation(valuation: &Valuation) -> LatticeResult<LatticeGreeks> {
    let delta = slope(node(valuation, 1, 0)?, node(valuation, 1, 1)?, "delta")?;

    let (gamma, theta) = if valuation.derived.steps >= 2 {
        let s20 = node(valuation, 2, 0)?;
        let s21 = node(valuation, 2, 1)?;
        let s22 = node(valuation, 2, 2)?;
        let upper = slope(s21, s22, "gamma")?;
        let lower = slope(s20, s21, "gamma")?;
        let half_span = (s22.0 - s20.0) / dec!(2);
        let gamma = math::div(upper - lower, half_span, "gamma")?;
        let theta = math::div(
            s21.1 - valuation.price,
            dec!(2) * valuation.derived.dt,
            "theta",
        )?;
        (Some(gamma), Some(theta))
    } else {
        (None, None)
    };

    Ok(LatticeGreeks {
        price: valuation.price,
        delta,
        gamma,
        theta,
        theta_per_day: theta.map(|t| t / dec!(365)),
    })
}

pub fn lattice_greeks(config: &PricingConfig) -> LatticeResult<ComputationOutput<LatticeGreeks>> {
    let start = Instant::now();
    let derived = validate(&config.market)?;
    let steps = derived.steps;
    let valuation = full_valuation(derived, config.option_type)?;
    let greeks = greeks_from_valuation(&valuation)?;

    let mut warnings = Vec::new();
    if steps < 2 {
        warnings.push("Gamma and theta need at least 2 steps; only delta is reported".to_string());
    }

    let assumptions = serde_json::json!({
        "model": "CRR lattice finite differences",
        "option_type": config.option_type,
        "steps": steps,
        "theta_day_count": 365,
    });

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Lattice Greeks (delta from layer 1, gamma and theta from layer 2)",
        &assumptions,
        warnings,
        elapsed,
        greeks,
    ))
}
