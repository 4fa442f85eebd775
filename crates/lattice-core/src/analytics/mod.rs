//! Checks and diagnostics built on top of the lattice pricer.

pub mod convergence;
pub mod greeks;
pub mod reference;

pub use convergence::{convergence_study, ConvergenceInput, ConvergenceOutput, ConvergenceRow};
pub use greeks::{greeks_from_valuation, lattice_greeks, LatticeGreeks};
pub use reference::{black_scholes_price, put_call_parity, ParityCheck};
