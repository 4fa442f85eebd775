use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LatticeError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Arbitrage violation: risk-neutral probability {probability} outside [0, 1] (up: {up}, down: {down}, growth: {growth})")]
    ArbitrageViolation {
        probability: Decimal,
        up: Decimal,
        down: Decimal,
        growth: Decimal,
    },

    #[error("Degenerate lattice: {reason}")]
    DegenerateLattice { reason: String },

    #[error("Numeric overflow in {context}")]
    NumericOverflow { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl LatticeError {
    /// Invalid or out-of-domain parameters, raised before any lattice work.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            LatticeError::InvalidInput { .. }
                | LatticeError::ArbitrageViolation { .. }
                | LatticeError::DegenerateLattice { .. }
        )
    }

    pub fn is_numeric_error(&self) -> bool {
        matches!(self, LatticeError::NumericOverflow { .. })
    }

    pub(crate) fn overflow(context: impl Into<String>) -> Self {
        LatticeError::NumericOverflow {
            context: context.into(),
        }
    }
}

impl From<serde_json::Error> for LatticeError {
    fn from(e: serde_json::Error) -> Self {
        LatticeError::SerializationError(e.to_string())
    }
}
