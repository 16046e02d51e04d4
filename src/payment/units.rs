//! Display amount <-> smallest unit conversion
//!
//! Amounts with at most `decimals` fractional digits convert exactly.
//! Anything finer is rounded half up (midpoint away from zero) to the
//! nearest smallest unit, and the adjustment is logged.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use tracing::warn;

/// Native currency precision (1 ALGO = 10^6 microAlgos)
pub const DEFAULT_UNIT_DECIMALS: u32 = 6;

/// Largest scale whose factor still fits in a u64
pub const MAX_UNIT_DECIMALS: u32 = 19;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnitError {
    #[error("amount must be greater than zero, got {0}")]
    NotPositive(Decimal),

    #[error("amount {0} is smaller than one smallest unit")]
    BelowSmallestUnit(Decimal),

    #[error("amount {0} exceeds the largest transferable value")]
    Overflow(Decimal),

    #[error("unit scale of {0} decimals is not supported")]
    UnsupportedScale(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitScale {
    decimals: u32,
}

impl Default for UnitScale {
    fn default() -> Self {
        Self {
            decimals: DEFAULT_UNIT_DECIMALS,
        }
    }
}

impl UnitScale {
    pub fn new(decimals: u32) -> Result<Self, UnitError> {
        if decimals > MAX_UNIT_DECIMALS {
            return Err(UnitError::UnsupportedScale(decimals));
        }
        Ok(Self { decimals })
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    fn factor(&self) -> Decimal {
        Decimal::from_i128_with_scale(10_i128.pow(self.decimals), 0)
    }

    /// Display amount to smallest units
    pub fn to_smallest_unit(&self, amount: Decimal) -> Result<u64, UnitError> {
        if amount <= Decimal::ZERO {
            return Err(UnitError::NotPositive(amount));
        }

        let scaled = amount
            .checked_mul(self.factor())
            .ok_or(UnitError::Overflow(amount))?;
        let rounded = scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        if rounded != scaled {
            warn!(
                "Amount {} has more than {} decimal places; rounded half up to {} smallest units",
                amount, self.decimals, rounded
            );
        }

        let units = rounded.to_u64().ok_or(UnitError::Overflow(amount))?;
        if units == 0 {
            return Err(UnitError::BelowSmallestUnit(amount));
        }
        Ok(units)
    }

    /// Smallest units back to a display amount
    pub fn from_smallest_unit(&self, units: u64) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(units), self.decimals).normalize()
    }
}
