//! Shopping cart held on the user aggregate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use emporium_core::{ProductId, Quantity, QuantityError};

/// Errors from cart mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CartError {
    /// The cart has no line for this product.
    #[error("product {0} is not in the cart")]
    LineNotFound(ProductId),

    /// The resulting quantity is out of range.
    #[error(transparent)]
    Quantity(#[from] QuantityError),
}

/// One product and how many of it the user wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(rename = "product")]
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// An ordered list of cart lines, at most one per product.
///
/// Lines keep the position they were first added at; growing or shrinking a
/// line never reorders the cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Build a cart from stored lines, merging any repeated product.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Quantity`] if merged lines overflow.
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Result<Self, CartError> {
        let mut cart = Self::default();
        for line in lines {
            cart.add(line.product_id, line.quantity)?;
        }
        Ok(cart)
    }

    /// Lines in display order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// The line for `product_id`, if any.
    #[must_use]
    pub fn get(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    /// Distinct products in the cart, in display order.
    pub fn product_ids(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.lines.iter().map(|line| line.product_id)
    }

    fn position(&self, product_id: ProductId) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.product_id == product_id)
    }

    /// Add `quantity` of a product: grows the existing line or appends a new one.
    ///
    /// Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Quantity`] if the sum overflows.
    pub fn add(&mut self, product_id: ProductId, quantity: Quantity) -> Result<Quantity, CartError> {
        match self.position(product_id) {
            Some(idx) => {
                let line = &mut self.lines[idx];
                line.quantity = line.quantity.checked_add(quantity)?;
                Ok(line.quantity)
            }
            None => {
                self.lines.push(CartLine {
                    product_id,
                    quantity,
                });
                Ok(quantity)
            }
        }
    }

    /// Grow an existing line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if the product is not in the cart.
    pub fn increment(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Quantity, CartError> {
        let idx = self
            .position(product_id)
            .ok_or(CartError::LineNotFound(product_id))?;
        let line = &mut self.lines[idx];
        line.quantity = line.quantity.checked_add(quantity)?;
        Ok(line.quantity)
    }

    /// Shrink an existing line, stopping at one. The line is never removed.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if the product is not in the cart.
    pub fn decrement_clamped(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Quantity, CartError> {
        let idx = self
            .position(product_id)
            .ok_or(CartError::LineNotFound(product_id))?;
        let line = &mut self.lines[idx];
        line.quantity = line.quantity.saturating_sub_to_one(quantity);
        Ok(line.quantity)
    }

    /// Remove a line entirely.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if the product is not in the cart.
    pub fn remove(&mut self, product_id: ProductId) -> Result<CartLine, CartError> {
        let idx = self
            .position(product_id)
            .ok_or(CartError::LineNotFound(product_id))?;
        Ok(self.lines.remove(idx))
    }

    /// Drop every line for `product_id` without complaint. Used when a
    /// product leaves the catalog.
    pub fn purge(&mut self, product_id: ProductId) {
        self.lines.retain(|line| line.product_id != product_id);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    fn qty(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[test]
    fn test_add_appends_then_grows() {
        let mut cart = Cart::default();
        let a = ProductId::generate();
        let b = ProductId::generate();

        assert_eq!(cart.add(a, qty(2)).unwrap(), qty(2));
        assert_eq!(cart.add(b, Quantity::ONE).unwrap(), Quantity::ONE);
        assert_eq!(cart.add(a, qty(3)).unwrap(), qty(5));

        let order: Vec<_> = cart.product_ids().collect();
        assert_eq!(order, vec![a, b]);
        assert_eq!(cart.get(a).unwrap().quantity, qty(5));
    }

    #[test]
    fn test_increment_requires_existing_line() {
        let mut cart = Cart::default();
        let a = ProductId::generate();
        assert_eq!(
            cart.increment(a, Quantity::ONE),
            Err(CartError::LineNotFound(a))
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn test_decrement_clamps_at_one() {
        let mut cart = Cart::default();
        let a = ProductId::generate();
        cart.add(a, qty(3)).unwrap();

        assert_eq!(cart.decrement_clamped(a, Quantity::ONE).unwrap(), qty(2));
        assert_eq!(cart.decrement_clamped(a, qty(10)).unwrap(), Quantity::ONE);
        assert_eq!(cart.decrement_clamped(a, Quantity::ONE).unwrap(), Quantity::ONE);
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_decrement_missing_line() {
        let mut cart = Cart::default();
        let a = ProductId::generate();
        assert!(matches!(
            cart.decrement_clamped(a, Quantity::ONE),
            Err(CartError::LineNotFound(_))
        ));
    }

    #[test]
    fn test_remove_line() {
        let mut cart = Cart::default();
        let a = ProductId::generate();
        let b = ProductId::generate();
        cart.add(a, Quantity::ONE).unwrap();
        cart.add(b, qty(4)).unwrap();

        let removed = cart.remove(a).unwrap();
        assert_eq!(removed.product_id, a);
        assert_eq!(cart.product_ids().collect::<Vec<_>>(), vec![b]);
        assert!(cart.remove(a).is_err());
    }

    #[test]
    fn test_add_overflow_leaves_line_untouched() {
        let mut cart = Cart::default();
        let a = ProductId::generate();
        cart.add(a, qty(Quantity::MAX)).unwrap();
        assert!(matches!(
            cart.add(a, Quantity::ONE),
            Err(CartError::Quantity(QuantityError::TooLarge { .. }))
        ));
        assert_eq!(cart.get(a).unwrap().quantity, qty(Quantity::MAX));
    }

    #[test]
    fn test_from_lines_merges_duplicates() {
        let a = ProductId::generate();
        let cart = Cart::from_lines([
            CartLine {
                product_id: a,
                quantity: qty(2),
            },
            CartLine {
                product_id: a,
                quantity: qty(3),
            },
        ])
        .unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.get(a).unwrap().quantity, qty(5));
    }

    #[test]
    fn test_from_lines_reports_merge_overflow() {
        let a = ProductId::generate();
        let line = CartLine {
            product_id: a,
            quantity: qty(Quantity::MAX),
        };
        assert!(matches!(
            Cart::from_lines([line, line]),
            Err(CartError::Quantity(QuantityError::TooLarge { .. }))
        ));
    }

    #[test]
    fn test_wire_shape() {
        let a = ProductId::generate();
        let mut cart = Cart::default();
        cart.add(a, qty(2)).unwrap();
        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "product": a.to_string(), "quantity": 2 }])
        );
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(usize, u32),
        Increment(usize, u32),
        Decrement(usize, u32),
        Remove(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..4usize, 1..50u32).prop_map(|(p, n)| Op::Add(p, n)),
            (0..4usize, 1..50u32).prop_map(|(p, n)| Op::Increment(p, n)),
            (0..4usize, 1..50u32).prop_map(|(p, n)| Op::Decrement(p, n)),
            (0..4usize).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn prop_lines_stay_unique_and_positive(ops in prop::collection::vec(op(), 0..60)) {
            let products: Vec<ProductId> = (0..4).map(|_| ProductId::generate()).collect();
            let mut cart = Cart::default();

            for op in ops {
                let _ = match op {
                    Op::Add(p, n) => cart.add(products[p], qty(n)).map(|_| ()),
                    Op::Increment(p, n) => cart.increment(products[p], qty(n)).map(|_| ()),
                    Op::Decrement(p, n) => cart.decrement_clamped(products[p], qty(n)).map(|_| ()),
                    Op::Remove(p) => cart.remove(products[p]).map(|_| ()),
                };

                let distinct: HashSet<_> = cart.product_ids().collect();
                prop_assert_eq!(distinct.len(), cart.len());
                prop_assert!(cart.lines().iter().all(|line| line.quantity.get() >= 1));
            }
        }

        #[test]
        fn prop_decrement_never_drops_line(start in 1..100u32, by in 1..200u32) {
            let a = ProductId::generate();
            let mut cart = Cart::default();
            cart.add(a, qty(start)).unwrap();
            let left = cart.decrement_clamped(a, qty(by)).unwrap();
            prop_assert_eq!(left.get(), start.saturating_sub(by).max(1));
            prop_assert_eq!(cart.len(), 1);
        }
    }
}
