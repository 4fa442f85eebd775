//! European option valuation on a recombining Cox-Ross-Rubinstein lattice.
//!
//! The pipeline is strictly linear: [`parameters::validate`] checks the
//! inputs and derives the per-step factors, [`lattice`] lays out asset prices,
//! [`payoff`] values the expiry layer, [`induction`] discounts back to the
//! root, and [`export`] hands the outcome to a [`export::ResultConsumer`].
//! [`pricing`] wires the stages together.

pub mod export;
pub mod induction;
pub mod lattice;
pub mod parameters;
pub mod payoff;
pub mod pricing;

pub use export::{
    LatticeOutput, LatticeRender, NodeRecord, PriceOutput, PriceReport, ResultConsumer, Valuation,
};
pub use induction::ValueGrid;
pub use lattice::Lattice;
pub use parameters::{validate, DerivedParameters, MarketParameters, PricingConfig};
pub use pricing::{price_option, price_with, render_lattice, value_option};
