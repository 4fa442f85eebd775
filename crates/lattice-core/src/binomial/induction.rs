use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::lattice::node_index;
use super::parameters::DerivedParameters;
use crate::math;
use crate::types::Money;
use crate::LatticeResult;

/// Option value at every lattice node, laid out like [`Lattice`](super::lattice::Lattice).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueGrid {
    steps: u32,
    values: Vec<Money>,
}

impl ValueGrid {
    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn layers(&self) -> usize {
        self.steps as usize + 1
    }

    pub fn value(&self, layer: usize, up_count: usize) -> Option<Money> {
        if layer >= self.layers() || up_count > layer {
            return None;
        }
        Some(self.values[node_index(layer, up_count)])
    }

    pub fn row(&self, layer: usize) -> &[Money] {
        let start = node_index(layer, 0);
        &self.values[start..start + layer + 1]
    }

    /// Option price at `(0, 0)`.
    pub fn root(&self) -> Money {
        self.values[0]
    }
}

/// Discounted risk-neutral expectation of one node's two successors.
///
/// A negative rate puts `discount` above one, so node values can grow past
/// `Decimal::MAX` even for inputs that validate.
#[inline]
fn continuation(
    derived: &DerivedParameters,
    up_value: Money,
    down_value: Money,
) -> LatticeResult<Money> {
    let expected = math::add(
        math::mul(derived.probability, up_value, "p * V(up)")?,
        math::mul(derived.down_probability(), down_value, "(1 - p) * V(down)")?,
        "expected node value",
    )?;
    math::mul(derived.discount, expected, "discounted node value")
}

/// Root value, reusing the payoff buffer as the single live row.
///
/// Row `i` overwrites row `i + 1` in place: node `j` reads `j` and `j + 1`
/// before anything at `j + 1` is rewritten, so walking `j` upwards is safe.
pub fn roll_back(
    derived: &DerivedParameters,
    terminal_payoffs: Vec<Money>,
) -> LatticeResult<Money> {
    let mut values = terminal_payoffs;
    let steps = derived.steps as usize;
    debug_assert_eq!(values.len(), steps + 1);

    for layer in (0..steps).rev() {
        for j in 0..=layer {
            values[j] = continuation(derived, values[j + 1], values[j])?;
        }
    }
    Ok(values.first().copied().unwrap_or(Decimal::ZERO))
}

/// Full value grid, for callers that inspect or render interior nodes.
pub fn induct_grid(
    derived: &DerivedParameters,
    terminal_payoffs: &[Money],
) -> LatticeResult<ValueGrid> {
    let steps = derived.steps as usize;
    debug_assert_eq!(terminal_payoffs.len(), steps + 1);

    let mut values = vec![Decimal::ZERO; node_index(steps, steps) + 1];
    let terminal_start = node_index(steps, 0);
    values[terminal_start..].copy_from_slice(terminal_payoffs);

    for layer in (0..steps).rev() {
        let here = node_index(layer, 0);
        let next = node_index(layer + 1, 0);
        for j in 0..=layer {
            values[here + j] = continuation(derived, values[next + j + 1], values[next + j])?;
        }
    }

    Ok(ValueGrid {
        steps: derived.steps,
        values,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binomial::lattice::build_terminal_row;
    use crate::binomial::parameters::{validate, MarketParameters};
    use crate::binomial::payoff::terminal_payoffs;
    use crate::types::OptionType;
    use rust_decimal_macros::dec;

    fn approx_eq(a: Decimal, b: Decimal, tol: Decimal) -> bool {
        (a - b).abs() < tol
    }

    fn derived(steps: u32) -> DerivedParameters {
        validate(&MarketParameters {
            spot: dec!(100),
            strike: dec!(100),
            risk_free_rate: dec!(0.05),
            steps,
            maturity: dec!(1),
            volatility: dec!(0.20),
        })
        .unwrap()
    }

    fn payoffs(d: &DerivedParameters, option_type: OptionType) -> Vec<Money> {
        terminal_payoffs(option_type, &build_terminal_row(d).unwrap(), d.strike)
    }

    #[test]
    fn test_two_step_root_value() {
        let d = derived(2);
        let root = roll_back(&d, payoffs(&d, OptionType::Call)).unwrap();
        assert!(approx_eq(root, dec!(9.55), dec!(0.05)), "root = {root}");
        assert!(approx_eq(root, dec!(9.5405), dec!(0.001)), "root = {root}");
    }

    #[test]
    fn test_grid_matches_rolling_row() {
        for steps in [1, 2, 5, 30] {
            let d = derived(steps);
            let terminal = payoffs(&d, OptionType::Put);
            let grid = induct_grid(&d, &terminal).unwrap();
            let root = roll_back(&d, terminal).unwrap();
            assert_eq!(grid.root(), root, "steps = {steps}");
        }
    }

    #[test]
    fn test_grid_keeps_terminal_payoffs() {
        let d = derived(4);
        let terminal = payoffs(&d, OptionType::Call);
        let grid = induct_grid(&d, &terminal).unwrap();
        assert_eq!(grid.row(4), terminal.as_slice());
    }

    #[test]
    fn test_each_node_is_discounted_expectation() {
        let d = derived(3);
        let grid = induct_grid(&d, &payoffs(&d, OptionType::Call)).unwrap();
        for layer in 0..3 {
            for j in 0..=layer {
                let expected = d.discount
                    * (d.probability * grid.value(layer + 1, j + 1).unwrap()
                        + (Decimal::ONE - d.probability) * grid.value(layer + 1, j).unwrap());
                assert_eq!(grid.value(layer, j).unwrap(), expected);
            }
        }
    }

    #[test]
    fn test_intermediate_layer_two_step() {
        let d = derived(2);
        let grid = induct_grid(&d, &payoffs(&d, OptionType::Call)).unwrap();
        assert_eq!(grid.value(1, 0), Some(Decimal::ZERO));
        assert!(approx_eq(grid.value(1, 1).unwrap(), dec!(17.66), dec!(0.01)));
        assert_eq!(grid.value(2, 3), None);
    }

    #[test]
    fn test_no_early_exercise_floor() {
        // A deep in-the-money European put with positive rates is worth less
        // than its intrinsic value; the engine must not lift it.
        let d = validate(&MarketParameters {
            spot: dec!(20),
            strike: dec!(100),
            risk_free_rate: dec!(0.10),
            steps: 50,
            maturity: dec!(2),
            volatility: dec!(0.20),
        })
        .unwrap();
        let root = roll_back(&d, payoffs(&d, OptionType::Put)).unwrap();
        assert!(root < dec!(80), "root = {root}");
    }

    #[test]
    fn test_negative_rate_overflow_is_reported() {
        // discount = e^0.5 lifts a put payoff near Decimal::MAX past the limit.
        let d = validate(&MarketParameters {
            spot: dec!(1),
            strike: dec!(70000000000000000000000000000),
            risk_free_rate: dec!(-0.5),
            steps: 1,
            maturity: dec!(1),
            volatility: dec!(1),
        })
        .unwrap();
        let terminal = payoffs(&d, OptionType::Put);
        let err = roll_back(&d, terminal.clone()).unwrap_err();
        assert!(err.is_numeric_error(), "got {err:?}");
        assert!(induct_grid(&d, &terminal).unwrap_err().is_numeric_error());
    }
}
