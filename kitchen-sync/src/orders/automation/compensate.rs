//! Verify-then-correct combinator for forced cart mutations
//!
//! 1. snapshot the cart and derive the intended lines from it
//! 2. run the normal forced mutation
//! 3. read back; done if the check passes
//! 4. otherwise one direct overwrite with the intended lines, then check again

use crate::orders::cart::{CartKey, CartStore};
use crate::orders::error::{OrderError, OrderResult};
use shared::order::CartLine;

/// Which tier made the change stick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyPath {
    Direct,
    Corrected,
}

/// A forced mutation with its intended result and post-condition
pub struct VerifiedMutation<'a> {
    /// Intended lines given the snapshot taken before the mutation
    pub intended: Box<dyn FnOnce(&[CartLine]) -> Vec<CartLine> + 'a>,
    /// Normal forced path
    pub apply: Box<dyn FnOnce(&CartStore) -> OrderResult<()> + 'a>,
    /// Post-condition on the lines read back
    pub verify: Box<dyn Fn(&[CartLine]) -> bool + 'a>,
}

pub fn run_verified(
    carts: &CartStore,
    key: &CartKey,
    label: &str,
    mutation: VerifiedMutation<'_>,
) -> OrderResult<(Vec<CartLine>, ApplyPath)> {
    let before = carts.list(key);
    let intended = (mutation.intended)(&before);

    match (mutation.apply)(carts) {
        Ok(()) => {}
        // bad input is not something a corrective write can fix
        Err(e @ OrderError::Validation(_)) => return Err(e),
        Err(e) => {
            tracing::warn!(cart = %key, action = label, error = %e, "Forced mutation failed, correcting");
        }
    }

    let after = carts.list(key);
    if (mutation.verify)(&after) {
        return Ok((after, ApplyPath::Direct));
    }

    tracing::warn!(cart = %key, action = label, "Forced mutation not reflected in cart, writing directly");
    if let Err(e) = carts.overwrite(key, intended) {
        tracing::error!(cart = %key, action = label, error = %e, "Corrective write failed");
    }

    let corrected = carts.list(key);
    if (mutation.verify)(&corrected) {
        Ok((corrected, ApplyPath::Corrected))
    } else {
        Err(OrderError::MutationUnverified(format!("{} on {}", label, key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::cart::storage::CartStorage;
    use crate::orders::cart::MutationMode;
    use shared::models::MenuItem;

    fn setup() -> (CartStore, CartKey, MenuItem) {
        (
            CartStore::new(CartStorage::open_in_memory().unwrap()),
            CartKey::new("t-1", "T1"),
            MenuItem::new("m1", "Garlic Naan", 80.0),
        )
    }

    fn naan_line(qty: i32) -> CartLine {
        CartLine {
            item_id: "m1".into(),
            name: "Garlic Naan".into(),
            unit_price: 80.0,
            quantity: qty,
            total: 80.0 * qty as f64,
            variant_selections: vec![],
            note: None,
        }
    }

    fn has_qty(qty: i32) -> Box<dyn Fn(&[CartLine]) -> bool> {
        Box::new(move |lines: &[CartLine]| lines.iter().any(|l| l.item_id == "m1" && l.quantity >= qty))
    }

    #[test]
    fn test_direct_path() {
        let (carts, key, item) = setup();
        let (lines, path) = run_verified(
            &carts,
            &key,
            "add",
            VerifiedMutation {
                intended: Box::new(|_: &[CartLine]| vec![naan_line(2)]),
                apply: Box::new(|c: &CartStore| {
                    c.add_line(&key, &item, 2, vec![], MutationMode::Forced)
                        .map(|_| ())
                }),
                verify: has_qty(2),
            },
        )
        .unwrap();
        assert_eq!(path, ApplyPath::Direct);
        assert_eq!(lines[0].quantity, 2);
    }

    #[test]
    fn test_corrected_when_apply_is_lost() {
        let (carts, key, _) = setup();
        let (lines, path) = run_verified(
            &carts,
            &key,
            "add",
            VerifiedMutation {
                intended: Box::new(|_: &[CartLine]| vec![naan_line(2)]),
                // simulates a mutation swallowed by a concurrent phase change
                apply: Box::new(|_: &CartStore| Ok(())),
                verify: has_qty(2),
            },
        )
        .unwrap();
        assert_eq!(path, ApplyPath::Corrected);
        assert_eq!(lines, vec![naan_line(2)]);
    }

    #[test]
    fn test_unverified_after_correction() {
        let (carts, key, _) = setup();
        let err = run_verified(
            &carts,
            &key,
            "add",
            VerifiedMutation {
                intended: Box::new(|_: &[CartLine]| vec![]),
                apply: Box::new(|_: &CartStore| Ok(())),
                verify: has_qty(2),
            },
        )
        .unwrap_err();
        assert!(matches!(err, OrderError::MutationUnverified(_)));
    }

    #[test]
    fn test_validation_error_not_corrected() {
        let (carts, key, item) = setup();
        let err = run_verified(
            &carts,
            &key,
            "add",
            VerifiedMutation {
                intended: Box::new(|_: &[CartLine]| vec![naan_line(1)]),
                apply: Box::new(|c: &CartStore| {
                    c.add_line(&key, &item, 0, vec![], MutationMode::Forced)
                        .map(|_| ())
                }),
                verify: has_qty(1),
            },
        )
        .unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
        assert!(carts.is_empty(&key));
    }
}
