use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::binomial::parameters::{validate, validate_contract, MarketParameters};
use crate::binomial::pricing::root_price;
use crate::math;
use crate::types::*;
use crate::LatticeResult;

// ---------------------------------------------------------------------------
// Black-Scholes reference
// ---------------------------------------------------------------------------

/// Closed-form European price for the same contract; `steps` is ignored.
pub fn black_scholes_price(
    market: &MarketParameters,
    option_type: OptionType,
) -> LatticeResult<Money> {
    validate_contract(market.spot, market.strike, market.maturity, market.volatility)?;

    let s = market.spot;
    let k = market.strike;
    let t = market.maturity;
    let r = market.risk_free_rate;
    let sigma = market.volatility;

    let sigma_sqrt_t = math::mul(sigma, math::sqrt(t, "sqrt(maturity)")?, "sigma * sqrt(T)")?;
    let log_moneyness = math::ln(math::div(s, k, "spot / strike")?, "ln(spot / strike)")?;
    let half_variance = math::div(math::mul(sigma, sigma, "sigma^2")?, dec!(2), "sigma^2 / 2")?;
    let drift = math::mul(math::add(r, half_variance, "r + sigma^2 / 2")?, t, "drift * T")?;
    let d1 = math::div(
        math::add(log_moneyness, drift, "d1 numerator")?,
        sigma_sqrt_t,
        "d1",
    )?;
    let d2 = math::sub(d1, sigma_sqrt_t, "d2")?;
    let discounted_strike = math::mul(k, discount_to_expiry(market)?, "K * exp(-rT)")?;

    let (asset_leg, strike_leg) = match option_type {
        OptionType::Call => (
            math::mul(s, d1.norm_cdf(), "S * N(d1)")?,
            math::mul(discounted_strike, d2.norm_cdf(), "K * exp(-rT) * N(d2)")?,
        ),
        OptionType::Put => (
            math::mul(s, (-d1).norm_cdf(), "S * N(-d1)")?,
            math::mul(discounted_strike, (-d2).norm_cdf(), "K * exp(-rT) * N(-d2)")?,
        ),
    };
    let price = match option_type {
        OptionType::Call => math::sub(asset_leg, strike_leg, "call price")?,
        OptionType::Put => math::sub(strike_leg, asset_leg, "put price")?,
    };
    Ok(price)
}

/// `exp(-rT)`
fn discount_to_expiry(market: &MarketParameters) -> LatticeResult<Rate> {
    let rate_time = math::mul(market.risk_free_rate, market.maturity, "r * T")?;
    math::exp(-rate_time, "exp(-rT)")
}

// ---------------------------------------------------------------------------
// Put-call parity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParityCheck {
    pub call_price: Money,
    pub put_price: Money,
    /// call - put
    pub call_minus_put: Money,
    /// spot - strike * exp(-rT)
    pub forward_value: Money,
    /// |call - put - forward_value|
    pub parity_gap: Money,
}

/// Price both payoffs on one lattice and compare against the forward.
pub fn put_call_parity(
    market: &MarketParameters,
) -> LatticeResult<ComputationOutput<ParityCheck>> {
    let start = Instant::now();
    let derived = validate(market)?;

    let call_price = root_price(&derived, OptionType::Call)?;
    let put_price = root_price(&derived, OptionType::Put)?;
    let discounted_strike = math::mul(
        market.strike,
        discount_to_expiry(market)?,
        "K * exp(-rT)",
    )?;
    let forward_value = math::sub(market.spot, discounted_strike, "forward value")?;
    let call_minus_put = math::sub(call_price, put_price, "call - put")?;
    let parity_gap = math::sub(call_minus_put, forward_value, "parity gap")?.abs();

    let mut warnings = Vec::new();
    if parity_gap > dec!(0.0001) {
        warnings.push(format!("Put-call parity gap {parity_gap} exceeds 0.0001"));
    }

    let assumptions = serde_json::json!({
        "model": "CRR lattice, call and put on the same lattice",
        "steps": derived.steps,
        "risk_free_rate": market.risk_free_rate.to_string(),
        "maturity": market.maturity.to_string(),
    });

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Put-call parity check: C - P = S - K*exp(-rT)",
        &assumptions,
        warnings,
        elapsed,
        ParityCheck {
            call_price,
            put_price,
            call_minus_put,
            forward_value,
            parity_gap,
        },
    ))
}
