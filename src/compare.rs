//! Key ordering supplied by the caller.
//!
//! Every comparison the tree makes goes through a [`Comparator`]. The default,
//! [`Natural`], defers to the key's [`Ord`] implementation; any
//! `Fn(&K, &K) -> Ordering` closure can be used instead to index keys that are
//! not `Ord` or to impose a different order.
//!
//! ```
//! use bplustree::Tree;
//!
//! // Largest key first.
//! let mut tree = Tree::with_comparator(4, |a: &i32, b: &i32| b.cmp(a)).unwrap();
//! for k in [1, 3, 2] {
//! 	tree.insert(k, ()).unwrap();
//! }
//! let keys: Vec<i32> = tree.iter().map(|(k, _)| *k).collect();
//! assert_eq!(keys, vec![3, 2, 1]);
//! ```

use std::cmp::Ordering;

/// A three-way comparison over keys of type `K`.
///
/// Implementations must describe a total order: the tree relies on it being
/// consistent across calls for as long as a key is stored.
pub trait Comparator<K: ?Sized> {
	/// Compares `a` with `b`.
	fn compare(&self, a: &K, b: &K) -> Ordering;

	/// Returns `true` if `key` has a position in this order.
	///
	/// The default accepts exactly the keys that compare equal to themselves.
	#[inline]
	fn is_ordered(&self, key: &K) -> bool {
		self.compare(key, key) == Ordering::Equal
	}
}

/// Orders keys by their [`Ord`] implementation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Natural;

impl<K: Ord + ?Sized> Comparator<K> for Natural {
	#[inline]
	fn compare(&self, a: &K, b: &K) -> Ordering {
		a.cmp(b)
	}
}

impl<K: ?Sized, F> Comparator<K> for F
where
	F: Fn(&K, &K) -> Ordering,
{
	#[inline]
	fn compare(&self, a: &K, b: &K) -> Ordering {
		self(a, b)
	}
}
