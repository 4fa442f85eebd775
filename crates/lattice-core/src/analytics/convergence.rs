use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use super::reference::black_scholes_price;
use crate::binomial::parameters::{validate, MarketParameters};
use crate::binomial::pricing::{root_price, LARGE_STEP_COUNT};
use crate::error::LatticeError;
use crate::math;
use crate::types::*;
use crate::LatticeResult;

/// One contract priced over a range of lattice sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceInput {
    pub spot: Money,
    pub strike: Money,
    pub risk_free_rate: Rate,
    pub maturity: Years,
    pub volatility: Rate,
    #[serde(default)]
    pub option_type: OptionType,
    pub from_steps: u32,
    pub to_steps: u32,
    pub stride: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceRow {
    pub steps: u32,
    pub price: Money,
    /// lattice price - reference price
    pub error: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceOutput {
    pub reference_price: Money,
    pub rows: Vec<ConvergenceRow>,
    /// Smallest |error| across the sweep
    pub best_steps: u32,
}

/// Step counts `from..=to` by `stride`, always ending on `to`.
fn step_sweep(input: &ConvergenceInput) -> LatticeResult<Vec<u32>> {
    if input.stride == 0 {
        return Err(LatticeError::InvalidInput {
            field: "stride".into(),
            reason: "must be positive".into(),
        });
    }
    if input.from_steps < 1 {
        return Err(LatticeError::InvalidInput {
            field: "from_steps".into(),
            reason: "must be at least 1".into(),
        });
    }
    if input.from_steps > input.to_steps {
        return Err(LatticeError::InvalidInput {
            field: "from_steps".into(),
            reason: "must be <= to_steps".into(),
        });
    }

    let mut steps: Vec<u32> = (input.from_steps..=input.to_steps)
        .step_by(input.stride as usize)
        .collect();
    if steps.last() != Some(&input.to_steps) {
        steps.push(input.to_steps);
    }
    Ok(steps)
}

pub fn convergence_study(
    input: &ConvergenceInput,
) -> LatticeResult<ComputationOutput<ConvergenceOutput>> {
    let start = Instant::now();
    let sweep = step_sweep(input)?;

    let market = |steps: u32| MarketParameters {
        spot: input.spot,
        strike: input.strike,
        risk_free_rate: input.risk_free_rate,
        steps,
        maturity: input.maturity,
        volatility: input.volatility,
    };
    // Lattice rejections (arbitrage, overflow) take precedence over the closed form.
    validate(&market(input.from_steps))?;
    let reference_price = black_scholes_price(&market(input.to_steps), input.option_type)?;

    let mut rows = Vec::with_capacity(sweep.len());
    for steps in sweep {
        let derived = validate(&market(steps))?;
        let price = root_price(&derived, input.option_type)?;
        rows.push(ConvergenceRow {
            steps,
            price,
            error: math::sub(price, reference_price, "lattice - reference")?,
        });
    }

    let best_steps = rows
        .iter()
        .min_by_key(|row| row.error.abs())
        .map(|row| row.steps)
        .unwrap_or(input.to_steps);
    debug!(rows = rows.len(), best_steps, "convergence sweep complete");

    let mut warnings = Vec::new();
    if input.to_steps > LARGE_STEP_COUNT {
        warnings.push(format!(
            "Sweep reaches {} steps; runtime grows quadratically with steps",
            input.to_steps
        ));
    }

    let assumptions = serde_json::json!({
        "model": "CRR lattice vs Black-Scholes closed form",
        "option_type": input.option_type,
        "from_steps": input.from_steps,
        "to_steps": input.to_steps,
        "stride": input.stride,
    });

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Binomial convergence study against the Black-Scholes price",
        &assumptions,
        warnings,
        elapsed,
        ConvergenceOutput {
            reference_price,
            rows,
            best_steps,
        },
    ))
}
