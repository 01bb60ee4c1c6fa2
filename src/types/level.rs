//! Price level type with decimal precision.

use serde::{Deserialize, Serialize};

use super::{Price, Size};

/// One price point's aggregate resting size on one side of the book.
///
/// Both fields travel as decimal strings (`{"price": "0.046", "size": "1.5"}`).
/// Equality is value based: `"1.50"` and `"1.5"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Price of this level
    pub price: Price,
    /// Aggregate size at this price
    pub size: Size,
}

impl PriceLevel {
    /// Create a new price level
    #[must_use]
    pub const fn new(price: Price, size: Size) -> Self {
        Self { price, size }
    }

    /// Whether this level signals removal (size equals exactly zero)
    #[must_use]
    pub fn is_removal(&self) -> bool {
        self.size.is_zero()
    }
}
