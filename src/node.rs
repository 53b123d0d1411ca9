//! Tree nodes and the order that bounds them.
//!
//! A [`Node`] is either a [`LeafNode`], which stores key-value pairs and a
//! link to the next leaf, or an [`InternalNode`], which stores separator keys
//! and the handles of its children. Both carry a non-owning `parent` handle.
//!
//! Everything here is local to a single node. Choosing where to insert or
//! remove, and keeping neighbouring nodes consistent, is the job of the
//! splitter and rebalancer.

use std::cmp::Ordering;
use std::fmt;

use smallvec::SmallVec;

use crate::arena::NodeId;
use crate::compare::Comparator;
use crate::error::{Error, Result};

/// Number of keys a node stores inline before spilling to the heap.
pub(crate) const INLINE_KEYS: usize = 8;

/// The smallest order a tree can be built with.
pub const MIN_ORDER: usize = 3;

// ===========================================================================
// Order
// ===========================================================================

/// The order `m` of a tree: the maximum number of children of a node.
///
/// A node holds at most `m - 1` keys. Every node except the root holds at
/// least `ceil(m / 2) - 1` keys.
///
/// ```
/// use bplustree::Order;
///
/// let order = Order::new(5).unwrap();
/// assert_eq!(order.max_keys(), 4);
/// assert_eq!(order.min_keys(), 2);
/// assert!(Order::new(2).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order(usize);

impl Order {
	/// Validates `order`, which must be at least [`MIN_ORDER`].
	pub fn new(order: usize) -> Result<Self> {
		if order < MIN_ORDER {
			return Err(Error::InvalidOrder {
				order,
				min: MIN_ORDER,
			});
		}
		Ok(Order(order))
	}

	/// Returns `m`.
	#[inline]
	pub fn get(self) -> usize {
		self.0
	}

	/// Maximum number of keys in any node.
	#[inline]
	pub fn max_keys(self) -> usize {
		self.0 - 1
	}

	/// Minimum number of keys in any non-root node.
	#[inline]
	pub fn min_keys(self) -> usize {
		self.0.div_ceil(2) - 1
	}
}

// ===========================================================================
// Node
// ===========================================================================

pub(crate) enum Node<K, V> {
	/// An internal (index) node containing separator keys and child handles.
	Internal(InternalNode<K>),
	/// A leaf node containing key-value pairs.
	Leaf(LeafNode<K, V>),
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Node<K, V> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Node::Internal(ref internal) => f.debug_tuple("Internal").field(internal).finish(),
			Node::Leaf(ref leaf) => f.debug_tuple("Leaf").field(leaf).finish(),
		}
	}
}

impl<K, V> Node<K, V> {
	#[inline]
	pub(crate) fn is_leaf(&self) -> bool {
		matches!(self, Node::Leaf(_))
	}

	/// Returns a reference to the inner leaf node.
	///
	/// # Panics
	///
	/// Panics if called on an internal node.
	#[inline]
	pub(crate) fn as_leaf(&self) -> &LeafNode<K, V> {
		match self {
			Node::Leaf(ref leaf) => leaf,
			Node::Internal(_) => {
				unreachable!("as_leaf() called on internal node - this indicates a tree traversal bug")
			}
		}
	}

	/// Returns a mutable reference to the inner leaf node.
	///
	/// # Panics
	///
	/// Panics if called on an internal node.
	#[inline]
	pub(crate) fn as_leaf_mut(&mut self) -> &mut LeafNode<K, V> {
		match self {
			Node::Leaf(ref mut leaf) => leaf,
			Node::Internal(_) => {
				unreachable!(
					"as_leaf_mut() called on internal node - this indicates a tree traversal bug"
				)
			}
		}
	}

	/// Returns a reference to the inner internal node.
	///
	/// # Panics
	///
	/// Panics if called on a leaf node.
	#[inline]
	pub(crate) fn as_internal(&self) -> &InternalNode<K> {
		match self {
			Node::Internal(ref internal) => internal,
			Node::Leaf(_) => {
				unreachable!("as_internal() called on leaf node - this indicates a tree traversal bug")
			}
		}
	}

	/// Returns a mutable reference to the inner internal node.
	///
	/// # Panics
	///
	/// Panics if called on a leaf node.
	#[inline]
	pub(crate) fn as_internal_mut(&mut self) -> &mut InternalNode<K> {
		match self {
			Node::Internal(ref mut internal) => internal,
			Node::Leaf(_) => {
				unreachable!(
					"as_internal_mut() called on leaf node - this indicates a tree traversal bug"
				)
			}
		}
	}

	#[inline]
	pub(crate) fn keys(&self) -> &[K] {
		match self {
			Node::Internal(ref internal) => &internal.keys,
			Node::Leaf(ref leaf) => &leaf.keys,
		}
	}

	/// Number of keys in the node.
	#[inline]
	pub(crate) fn len(&self) -> usize {
		self.keys().len()
	}

	#[inline]
	pub(crate) fn parent(&self) -> Option<NodeId> {
		match self {
			Node::Internal(ref internal) => internal.parent,
			Node::Leaf(ref leaf) => leaf.parent,
		}
	}

	#[inline]
	pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
		match self {
			Node::Internal(ref mut internal) => internal.parent = parent,
			Node::Leaf(ref mut leaf) => leaf.parent = parent,
		}
	}

	/// Returns `true` if the node holds more keys than the order allows and
	/// must be split.
	#[inline]
	pub(crate) fn is_overflow(&self, order: Order) -> bool {
		self.len() > order.max_keys()
	}

	/// Returns `true` if the node holds fewer keys than the order requires.
	///
	/// The root has no parent and is never underflowing.
	#[inline]
	pub(crate) fn is_underflow(&self, order: Order) -> bool {
		self.parent().is_some() && self.len() < order.min_keys()
	}
}

// ===========================================================================
// Leaf Node
// ===========================================================================

/// A leaf node, storing the actual key-value pairs.
///
/// `keys` and `values` are parallel and sorted by key. Equal keys sit next to
/// each other in insertion order. `next` links to the leaf holding the
/// following keys, or is `None` for the last leaf.
pub(crate) struct LeafNode<K, V> {
	pub(crate) keys: SmallVec<[K; INLINE_KEYS]>,
	pub(crate) values: SmallVec<[V; INLINE_KEYS]>,
	pub(crate) parent: Option<NodeId>,
	pub(crate) next: Option<NodeId>,
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for LeafNode<K, V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LeafNode")
			.field("keys", &self.keys)
			.field("values", &self.values)
			.field("parent", &self.parent)
			.field("next", &self.next)
			.finish()
	}
}

impl<K, V> LeafNode<K, V> {
	pub(crate) fn new() -> LeafNode<K, V> {
		LeafNode {
			keys: SmallVec::new(),
			values: SmallVec::new(),
			parent: None,
			next: None,
		}
	}

	#[inline]
	pub(crate) fn len(&self) -> usize {
		self.keys.len()
	}

	/// Position of the first key not less than `key`.
	#[inline]
	pub(crate) fn lower_bound<C: Comparator<K>>(&self, key: &K, cmp: &C) -> usize {
		self.keys.partition_point(|k| cmp.compare(k, key) == Ordering::Less)
	}

	/// Position after the last key not greater than `key`.
	///
	/// Inserting here places a duplicate after every equal key already
	/// stored.
	#[inline]
	pub(crate) fn upper_bound<C: Comparator<K>>(&self, key: &K, cmp: &C) -> usize {
		self.keys.partition_point(|k| cmp.compare(k, key) != Ordering::Greater)
	}

	/// Position of the first entry whose key equals `key`.
	pub(crate) fn find_entry_index<C: Comparator<K>>(&self, key: &K, cmp: &C) -> Option<usize> {
		let pos = self.lower_bound(key, cmp);
		match self.keys.get(pos) {
			Some(k) if cmp.compare(k, key) == Ordering::Equal => Some(pos),
			_ => None,
		}
	}

	pub(crate) fn insert_entry_at(&mut self, pos: usize, key: K, value: V) {
		self.keys.insert(pos, key);
		self.values.insert(pos, value);
	}

	pub(crate) fn remove_entry_at(&mut self, pos: usize) -> (K, V) {
		(self.keys.remove(pos), self.values.remove(pos))
	}

	/// Moves the entries at `[at, len)` into a new right sibling.
	///
	/// The sibling takes over this leaf's `next` link and parent. The caller
	/// links this leaf to the sibling once the sibling has a handle.
	pub(crate) fn split_off(&mut self, at: usize) -> LeafNode<K, V> {
		assert!(at < self.len(), "leaf split position {} out of bounds", at);
		LeafNode {
			keys: self.keys.drain(at..).collect(),
			values: self.values.drain(at..).collect(),
			parent: self.parent,
			next: self.next.take(),
		}
	}

	/// Appends every entry of `right`, which must be this leaf's successor in
	/// the leaf chain, and unlinks `right` from the chain.
	pub(crate) fn append(&mut self, right: LeafNode<K, V>) {
		self.keys.extend(right.keys);
		self.values.extend(right.values);
		self.next = right.next;
	}
}

// ===========================================================================
// Internal Node
// ===========================================================================

/// An internal (index) node, storing separator keys and child handles.
///
/// ```text
/// keys:         [K0,   K1,   ...  K(n-1)]
/// children:  [C0,   C1,   C2,  ...     Cn]
///
/// Navigation: key K descends into C(i) for the first i with K < K(i),
///             or into Cn when there is no such i.
/// ```
///
/// `keys[i]` is the smallest key stored anywhere below `children[i + 1]`.
pub(crate) struct InternalNode<K> {
	pub(crate) keys: SmallVec<[K; INLINE_KEYS]>,
	pub(crate) children: SmallVec<[NodeId; INLINE_KEYS + 1]>,
	pub(crate) parent: Option<NodeId>,
}

impl<K: fmt::Debug> fmt::Debug for InternalNode<K> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("InternalNode")
			.field("keys", &self.keys)
			.field("children", &self.children)
			.field("parent", &self.parent)
			.finish()
	}
}

impl<K> InternalNode<K> {
	pub(crate) fn new() -> InternalNode<K> {
		InternalNode {
			keys: SmallVec::new(),
			children: SmallVec::new(),
			parent: None,
		}
	}

	#[inline]
	pub(crate) fn len(&self) -> usize {
		self.keys.len()
	}

	/// Index of the child a lookup for `key` descends into.
	#[inline]
	pub(crate) fn find_descent_index<C: Comparator<K>>(&self, key: &K, cmp: &C) -> usize {
		self.keys.partition_point(|k| cmp.compare(k, key) != Ordering::Greater)
	}

	/// Index of the leftmost child that can hold a key equal to `key`.
	///
	/// Differs from [`find_descent_index`](Self::find_descent_index) only when
	/// `key` equals a separator, in which case equal keys may also sit at the
	/// end of the child left of that separator.
	#[inline]
	pub(crate) fn find_lower_descent_index<C: Comparator<K>>(&self, key: &K, cmp: &C) -> usize {
		self.keys.partition_point(|k| cmp.compare(k, key) == Ordering::Less)
	}

	/// Position of `child` among this node's children.
	///
	/// # Panics
	///
	/// Panics if `child` is not a child of this node.
	pub(crate) fn child_position(&self, child: NodeId) -> usize {
		match self.children.iter().position(|&c| c == child) {
			Some(pos) => pos,
			None => panic!("node {:?} is not a child of its parent", child),
		}
	}

	pub(crate) fn insert_key_at(&mut self, pos: usize, key: K) {
		self.keys.insert(pos, key);
	}

	pub(crate) fn remove_key_at(&mut self, pos: usize) -> K {
		self.keys.remove(pos)
	}

	/// Replaces the key at `pos`, returning the previous one.
	pub(crate) fn replace_key_at(&mut self, pos: usize, key: K) -> K {
		std::mem::replace(&mut self.keys[pos], key)
	}

	pub(crate) fn insert_child_at(&mut self, pos: usize, child: NodeId) {
		self.children.insert(pos, child);
	}

	pub(crate) fn remove_child_at(&mut self, pos: usize) -> NodeId {
		self.children.remove(pos)
	}

	/// Splits around the key at `mid`.
	///
	/// Keys after `mid` and children after `mid + 1` move into a new right
	/// sibling. The key at `mid` is removed from both halves and returned so
	/// the caller can move it up into the parent.
	pub(crate) fn split_off(&mut self, mid: usize) -> (K, InternalNode<K>) {
		assert!(mid < self.len(), "internal split position {} out of bounds", mid);
		let keys = self.keys.drain(mid + 1..).collect();
		let children = self.children.drain(mid + 1..).collect();
		let separator = match self.keys.pop() {
			Some(key) => key,
			None => unreachable!("split position is within bounds"),
		};
		let right = InternalNode {
			keys,
			children,
			parent: self.parent,
		};
		(separator, right)
	}

	/// Appends `right`, this node's right sibling, with `separator` pulled
	/// down from the parent between the two key runs.
	///
	/// The caller re-parents the children taken over from `right`.
	pub(crate) fn append(&mut self, separator: K, right: InternalNode<K>) {
		self.keys.push(separator);
		self.keys.extend(right.keys);
		self.children.extend(right.children);
	}
}
