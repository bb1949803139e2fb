//! Equality functions for selector subscriptions.

use std::sync::Arc;

/// Compare by `PartialEq`. The default for [`Store::select`](crate::Store::select).
pub fn by_value<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

/// Compare by allocation identity.
pub fn by_ptr<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    Arc::ptr_eq(a, b)
}

/// Element-wise identity: same length and every pair of `Arc`s points at the
/// same allocation.
pub fn shallow<T: ?Sized>(a: &[Arc<T>], b: &[Arc<T>]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Arc::ptr_eq(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shallow_compares_identity_not_contents() {
        let a = Arc::new("a".to_string());
        let b = Arc::new("b".to_string());

        assert!(shallow(&[a.clone(), b.clone()], &[a.clone(), b.clone()]));
        assert!(!shallow(&[a.clone()], &[Arc::new("a".to_string())]));
        assert!(!shallow(&[a.clone()], &[a.clone(), b]));
    }

    #[test]
    fn by_ptr_and_by_value_disagree_on_copies() {
        let a = Arc::new(vec![1, 2]);
        let copy = Arc::new(vec![1, 2]);

        assert!(by_value(&a, &copy));
        assert!(!by_ptr(&a, &copy));
        assert!(by_ptr(&a, &a.clone()));
    }
}
