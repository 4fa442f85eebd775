use serde::{Deserialize, Serialize};
use tracing::debug;

use super::parameters::DerivedParameters;
use crate::math;
use crate::types::Money;
use crate::LatticeResult;

/// Offset of node `(layer, up_count)` in a row-major triangular arena.
#[inline]
pub(crate) fn node_index(layer: usize, up_count: usize) -> usize {
    layer * (layer + 1) / 2 + up_count
}

/// Recombining grid of asset prices.
///
/// Stored as one flat arena: row `i` holds `i + 1` prices ordered by up
/// count, and node `(i, j)` lives at `i(i+1)/2 + j`. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    steps: u32,
    prices: Vec<Money>,
}

impl Lattice {
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Number of layers, `steps + 1`.
    pub fn layers(&self) -> usize {
        self.steps as usize + 1
    }

    pub fn node_count(&self) -> usize {
        self.prices.len()
    }

    /// Asset price at `(layer, up_count)`, or `None` outside the triangle.
    pub fn price(&self, layer: usize, up_count: usize) -> Option<Money> {
        if layer >= self.layers() || up_count > layer {
            return None;
        }
        Some(self.prices[node_index(layer, up_count)])
    }

    pub fn row(&self, layer: usize) -> &[Money] {
        let start = node_index(layer, 0);
        &self.prices[start..start + layer + 1]
    }

    pub fn terminal_row(&self) -> &[Money] {
        self.row(self.steps as usize)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Money]> + '_ {
        (0..self.layers()).map(move |i| self.row(i))
    }
}

/// Powers `base^0 ..= base^n`, each computed directly rather than by
/// running multiplication, so layer `n` carries no accumulated drift.
fn powers(base: Money, n: u32, label: &str) -> LatticeResult<Vec<Money>> {
    (0..=n).map(|k| math::powu(base, k, label)).collect()
}

struct PriceFormula {
    spot: Money,
    up_powers: Vec<Money>,
    down_powers: Vec<Money>,
}

impl PriceFormula {
    fn new(derived: &DerivedParameters, max_layer: u32) -> LatticeResult<Self> {
        Ok(Self {
            spot: derived.spot,
            up_powers: powers(derived.up, max_layer, "up^k")?,
            down_powers: powers(derived.down, max_layer, "down^k")?,
        })
    }

    /// `spot * up^j * down^(i - j)`, taken as a single net power of `up` or
    /// `down` since `down = 1/up`.
    fn at(&self, layer: usize, up_count: usize) -> LatticeResult<Money> {
        let down_count = layer - up_count;
        let factor = if up_count >= down_count {
            self.up_powers[up_count - down_count]
        } else {
            self.down_powers[down_count - up_count]
        };
        math::mul(self.spot, factor, "lattice asset price")
    }
}

/// Build every layer of the price lattice from validated parameters.
pub fn build_lattice(derived: &DerivedParameters) -> LatticeResult<Lattice> {
    let formula = PriceFormula::new(derived, derived.steps)?;
    let layers = derived.steps as usize + 1;

    let mut prices = Vec::with_capacity(derived.node_count());
    for layer in 0..layers {
        for up_count in 0..=layer {
            prices.push(formula.at(layer, up_count)?);
        }
    }

    debug!(steps = derived.steps, nodes = prices.len(), "built price lattice");
    Ok(Lattice {
        steps: derived.steps,
        prices,
    })
}

/// Only the expiry layer, for runs that never need interior prices.
pub fn build_terminal_row(derived: &DerivedParameters) -> LatticeResult<Vec<Money>> {
    let formula = PriceFormula::new(derived, derived.steps)?;
    let layer = derived.steps as usize;
    (0..=layer).map(|j| formula.at(layer, j)).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
