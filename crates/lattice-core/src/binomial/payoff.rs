use rust_decimal::Decimal;

use crate::types::{Money, OptionType};

/// Exercise value of one node at expiry.
#[inline]
pub fn payoff(option_type: OptionType, asset_price: Money, strike: Money) -> Money {
    match option_type {
        OptionType::Call => (asset_price - strike).max(Decimal::ZERO),
        OptionType::Put => (strike - asset_price).max(Decimal::ZERO),
    }
}

/// Payoffs for the terminal row, in the same order as the prices.
pub fn terminal_payoffs(
    option_type: OptionType,
    terminal_prices: &[Money],
    strike: Money,
) -> Vec<Money> {
    terminal_prices
        .iter()
        .map(|&price| payoff(option_type, price, strike))
        .collect()
}
