//! Cart line quantity.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    /// Zero (or a negative value coerced to zero) is never a valid quantity.
    #[error("quantity must be at least 1")]
    Zero,
    /// The value does not fit the storage column.
    #[error("quantity must be at most {max}")]
    TooLarge {
        /// Largest accepted quantity.
        max: u32,
    },
}

/// A strictly positive quantity, bounded by the `INTEGER` storage range.
///
/// Every cart line carries one of these, so a line can never hold a zero or
/// negative amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// Largest storable quantity (`i32::MAX`).
    pub const MAX: u32 = i32::MAX.unsigned_abs();

    /// A quantity of one.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create a quantity.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::Zero`] for 0 and [`QuantityError::TooLarge`]
    /// above [`Quantity::MAX`].
    pub fn new(value: u32) -> Result<Self, QuantityError> {
        if value > Self::MAX {
            return Err(QuantityError::TooLarge { max: Self::MAX });
        }
        NonZeroU32::new(value).map(Self).ok_or(QuantityError::Zero)
    }

    /// The raw value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Add `other`, failing if the sum leaves the storable range.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::TooLarge`] on overflow.
    pub fn checked_add(self, other: Self) -> Result<Self, QuantityError> {
        self.get()
            .checked_add(other.get())
            .ok_or(QuantityError::TooLarge { max: Self::MAX })
            .and_then(Self::new)
    }

    /// Subtract `other`, never going below one.
    #[must_use]
    pub fn saturating_sub_to_one(self, other: Self) -> Self {
        Self::new(self.get().saturating_sub(other.get())).unwrap_or(Self::ONE)
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map_err(|_| QuantityError::Zero)
            .and_then(Self::new)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.get()
    }
}

impl From<Quantity> for i32 {
    fn from(quantity: Quantity) -> Self {
        // MAX is i32::MAX so this never saturates
        Self::try_from(quantity.get()).unwrap_or(Self::MAX)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_and_negative_rejected() {
        assert_eq!(Quantity::new(0), Err(QuantityError::Zero));
        assert_eq!(Quantity::try_from(-4_i32), Err(QuantityError::Zero));
    }

    #[test]
    fn test_upper_bound() {
        assert!(Quantity::new(Quantity::MAX).is_ok());
        assert!(matches!(
            Quantity::new(Quantity::MAX + 1),
            Err(QuantityError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_checked_add_overflow() {
        let big = Quantity::new(Quantity::MAX).unwrap();
        assert!(big.checked_add(Quantity::ONE).is_err());
        let three = Quantity::new(1).unwrap().checked_add(Quantity::new(2).unwrap());
        assert_eq!(three.unwrap().get(), 3);
    }

    #[test]
    fn test_saturating_sub_clamps_at_one() {
        let five = Quantity::new(5).unwrap();
        assert_eq!(five.saturating_sub_to_one(Quantity::new(2).unwrap()).get(), 3);
        assert_eq!(five.saturating_sub_to_one(five), Quantity::ONE);
        assert_eq!(five.saturating_sub_to_one(Quantity::new(9).unwrap()), Quantity::ONE);
    }

    #[test]
    fn test_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("2").unwrap().get(), 2);
    }
}
