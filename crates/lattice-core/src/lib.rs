pub mod binomial;
pub mod error;
pub(crate) mod math;
pub mod types;

#[cfg(feature = "analytics")]
pub mod analytics;

pub use error::LatticeError;
pub use types::*;

/// Standard result type for all lattice operations
pub type LatticeResult<T> = Result<T, LatticeError>;
