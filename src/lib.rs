//! # An In-Memory B+ Tree Index
//!
//! This crate provides an ordered index over caller-comparable keys. Values
//! live only in the leaves, and the leaves are chained left to right so that
//! ordered scans never have to climb back up the tree.
//!
//! ## Design Overview
//!
//! **Order**: a tree of order `m` stores at most `m - 1` keys per node. Every
//! node except the root stores at least `ceil(m / 2) - 1` keys, and an
//! internal node with `n` keys has exactly `n + 1` children.
//!
//! **Separators**: internal nodes hold routing keys only. The key at index
//! `i` is the smallest key stored under child `i + 1`, so a lookup for `k`
//! descends into the first child whose separator is greater than `k`.
//!
//! **Duplicates**: equal keys are allowed. A new entry is placed after every
//! entry with an equal key.
//!
//! **Ownership**: nodes are stored in an arena and linked by handles. Parents
//! own their children; the `parent` and `next` links are plain handles used
//! only for navigation.
//!
//! ### Tree Structure
//!
//! ```text
//!                         ┌──────────────┐
//!                         │ Internal (30)│  <- separator keys only
//!                         └──────┬───────┘
//!                    ┌───────────┴────────────┐
//!                    ▼                        ▼
//!            ┌──────────────┐        ┌────────────────┐
//!            │ (22, 26)     │        │ (33, 36, 41)   │
//!            └──┬─────┬──┬──┘        └──┬────┬────┬──┬┘
//!               ▼     ▼  ▼              ▼    ▼    ▼  ▼
//!   head ─► [13,17,21]─►[22,24]─►[26..29]─►[30,31]─► ... ─►[41,53,97]
//!           leaves hold the entries and are chained by `next`
//! ```
//!
//! ## Basic Usage
//!
//! ```
//! use bplustree::Tree;
//!
//! let mut tree = Tree::new(5).unwrap();
//!
//! tree.insert(39, "thirty-nine").unwrap();
//! tree.insert(22, "twenty-two").unwrap();
//! tree.insert(97, "ninety-seven").unwrap();
//!
//! assert_eq!(tree.search(&22), Some(&"twenty-two"));
//! assert_eq!(tree.search(&50), None);
//!
//! let keys: Vec<i32> = tree.iter().map(|(k, _)| *k).collect();
//! assert_eq!(keys, vec![22, 39, 97]);
//!
//! assert_eq!(tree.delete(&22).unwrap(), Some("twenty-two"));
//! assert_eq!(tree.delete(&22).unwrap(), None); // already gone
//! ```
//!
//! ## Thread Safety
//!
//! The tree is a plain single-threaded structure. Share it between threads by
//! wrapping it in a lock that serializes every mutation.

use std::fmt;

mod arena;
pub mod compare;
pub mod error;
pub mod iter;
mod node;
mod rebalance;
mod split;
#[cfg(test)]
mod util;

pub use compare::{Comparator, Natural};
pub use error::{Error, Result};
pub use iter::{Iter, Leaves};
pub use node::{Order, MIN_ORDER};

use arena::{Arena, NodeId};
use node::{LeafNode, Node};

// ---------------------------------------------------------------------------
// Configuration Constants
// ---------------------------------------------------------------------------

/// Order used by [`Tree::default`].
pub const DEFAULT_ORDER: usize = 64;

// ---------------------------------------------------------------------------
// Core Tree Structure
// ---------------------------------------------------------------------------

/// A B+ tree mapping keys to values, ordered by a [`Comparator`].
///
/// # Type Parameters
///
/// - `K`: The key type. Must be `Clone` to be inserted, since separators are
///   copies of leaf keys.
/// - `V`: The value type.
/// - `C`: The comparator. Defaults to [`Natural`], which uses `K: Ord`.
pub struct Tree<K, V, C = Natural> {
	/// Every live node of the tree.
	pub(crate) nodes: Arena<Node<K, V>>,
	/// The root node: a leaf while the tree fits in one node, internal after.
	pub(crate) root: NodeId,
	/// The leftmost leaf, where the leaf chain starts.
	pub(crate) head: NodeId,
	pub(crate) order: Order,
	/// Number of stored entries.
	pub(crate) len: usize,
	/// Number of levels. A single leaf root has height 1.
	pub(crate) height: usize,
	pub(crate) cmp: C,
}

impl<K: Ord, V> Tree<K, V> {
	/// Creates an empty tree of the given order, ordered by `K: Ord`.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidOrder`] if `order` is less than [`MIN_ORDER`].
	///
	/// # Example
	///
	/// ```
	/// use bplustree::{Error, Tree};
	///
	/// let tree: Tree<u64, String> = Tree::new(4).unwrap();
	/// assert!(tree.is_empty());
	/// assert_eq!(tree.height(), 1);
	///
	/// assert!(matches!(Tree::<u64, String>::new(2), Err(Error::InvalidOrder { .. })));
	/// ```
	pub fn new(order: usize) -> Result<Self> {
		Self::with_comparator(order, Natural)
	}
}

impl<K: Ord, V> Default for Tree<K, V> {
	/// Creates an empty tree of order [`DEFAULT_ORDER`].
	fn default() -> Self {
		match Order::new(DEFAULT_ORDER) {
			Ok(order) => Self::from_parts(order, Natural),
			Err(_) => unreachable!("the default order is valid"),
		}
	}
}

impl<K, V, C: Comparator<K>> Tree<K, V, C> {
	// -----------------------------------------------------------------------
	// Construction
	// -----------------------------------------------------------------------

	/// Creates an empty tree of the given order, ordered by `cmp`.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidOrder`] if `order` is less than [`MIN_ORDER`].
	pub fn with_comparator(order: usize, cmp: C) -> Result<Self> {
		Ok(Self::from_parts(Order::new(order)?, cmp))
	}

	fn from_parts(order: Order, cmp: C) -> Self {
		let mut nodes = Arena::new();
		let root = nodes.alloc(Node::Leaf(LeafNode::new()));
		Tree {
			nodes,
			root,
			head: root,
			order,
			len: 0,
			height: 1,
			cmp,
		}
	}

	// -----------------------------------------------------------------------
	// Tree Metadata
	// -----------------------------------------------------------------------

	/// Returns the order the tree was built with.
	pub fn order(&self) -> Order {
		self.order
	}

	/// Returns the number of entries, counting every duplicate.
	pub fn len(&self) -> usize {
		self.len
	}

	/// Returns `true` if the tree holds no entries.
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Returns the number of levels in the tree.
	///
	/// - Height 1: the root is a single leaf
	/// - Height N: N-1 levels of internal nodes above the leaves
	pub fn height(&self) -> usize {
		self.height
	}

	// -----------------------------------------------------------------------
	// Descent
	// -----------------------------------------------------------------------

	/// Returns the leaf a lookup for `key` ends in.
	fn find_leaf(&self, key: &K) -> NodeId {
		let mut id = self.root;
		loop {
			match self.nodes.get(id) {
				Node::Internal(internal) => {
					id = internal.children[internal.find_descent_index(key, &self.cmp)];
				}
				Node::Leaf(_) => return id,
			}
		}
	}

	/// Returns the leftmost leaf that can hold an entry not less than `key`.
	fn find_lower_leaf(&self, key: &K) -> NodeId {
		let mut id = self.root;
		loop {
			match self.nodes.get(id) {
				Node::Internal(internal) => {
					id = internal.children[internal.find_lower_descent_index(key, &self.cmp)];
				}
				Node::Leaf(_) => return id,
			}
		}
	}

	fn rightmost_leaf(&self) -> NodeId {
		let mut id = self.root;
		while let Node::Internal(internal) = self.nodes.get(id) {
			id = internal.children[internal.children.len() - 1];
		}
		id
	}

	fn validate_key(&self, key: &K) -> Result<()> {
		if self.cmp.is_ordered(key) {
			Ok(())
		} else {
			Err(Error::InvalidInput)
		}
	}

	// -----------------------------------------------------------------------
	// Public API: Read Operations
	// -----------------------------------------------------------------------

	/// Returns the value stored for `key`.
	///
	/// If the key was inserted more than once, the value of one of the
	/// matching entries is returned.
	///
	/// # Example
	///
	/// ```
	/// use bplustree::Tree;
	///
	/// let mut tree = Tree::new(3).unwrap();
	/// tree.insert("apple", 3).unwrap();
	///
	/// assert_eq!(tree.search(&"apple"), Some(&3));
	/// assert_eq!(tree.search(&"pear"), None);
	/// ```
	pub fn search(&self, key: &K) -> Option<&V> {
		let leaf = self.nodes.get(self.find_leaf(key)).as_leaf();
		leaf.find_entry_index(key, &self.cmp).map(|pos| &leaf.values[pos])
	}

	/// Returns a mutable reference to the value stored for `key`.
	pub fn search_mut(&mut self, key: &K) -> Option<&mut V> {
		let id = self.find_leaf(key);
		let leaf = self.nodes.get_mut(id).as_leaf_mut();
		let pos = leaf.find_entry_index(key, &self.cmp)?;
		Some(&mut leaf.values[pos])
	}

	/// Returns `true` if at least one entry has the given key.
	pub fn contains_key(&self, key: &K) -> bool {
		self.search(key).is_some()
	}

	/// Returns the entry with the smallest key.
	pub fn first_key_value(&self) -> Option<(&K, &V)> {
		self.iter().next()
	}

	/// Returns the entry with the largest key. Among equal keys, the one
	/// inserted last.
	pub fn last_key_value(&self) -> Option<(&K, &V)> {
		let leaf = self.nodes.get(self.rightmost_leaf()).as_leaf();
		let last = leaf.len().checked_sub(1)?;
		Some((&leaf.keys[last], &leaf.values[last]))
	}

	/// Returns an ascending iterator over all entries, starting at the head
	/// of the leaf chain.
	///
	/// Each call starts over from the current first leaf.
	pub fn iter(&self) -> Iter<'_, K, V> {
		Iter::new(&self.nodes, self.head, 0, self.len)
	}

	/// Returns an ascending iterator starting at the first entry whose key is
	/// not less than `key`.
	///
	/// # Example
	///
	/// ```
	/// use bplustree::Tree;
	///
	/// let mut tree = Tree::new(4).unwrap();
	/// for k in (0..100).step_by(10) {
	/// 	tree.insert(k, k / 10).unwrap();
	/// }
	///
	/// let scan: Vec<i32> = tree.iter_from(&35).take(3).map(|(k, _)| *k).collect();
	/// assert_eq!(scan, vec![40, 50, 60]);
	/// ```
	pub fn iter_from(&self, key: &K) -> Iter<'_, K, V> {
		let id = self.find_lower_leaf(key);
		let pos = self.nodes.get(id).as_leaf().lower_bound(key, &self.cmp);
		Iter::new(&self.nodes, id, pos, self.len)
	}

	/// Returns an iterator over the keys of each leaf, in chain order.
	pub fn leaves(&self) -> Leaves<'_, K, V> {
		Leaves::new(&self.nodes, self.head)
	}

	// -----------------------------------------------------------------------
	// Diagnostics
	// -----------------------------------------------------------------------

	/// Returns the keys of every node, level by level from the root.
	///
	/// # Example
	///
	/// ```
	/// use bplustree::Tree;
	///
	/// let mut tree = Tree::new(5).unwrap();
	/// for k in [39, 22, 97, 41, 53] {
	/// 	tree.insert(k, ()).unwrap();
	/// }
	///
	/// assert_eq!(tree.levels(), vec![
	/// 	vec![vec![41]],
	/// 	vec![vec![22, 39], vec![41, 53, 97]],
	/// ]);
	/// ```
	pub fn levels(&self) -> Vec<Vec<Vec<K>>>
	where
		K: Clone,
	{
		let mut levels = Vec::with_capacity(self.height);
		let mut level = vec![self.root];
		while !level.is_empty() {
			let mut below = Vec::new();
			let mut keys = Vec::with_capacity(level.len());
			for id in level {
				let node = self.nodes.get(id);
				keys.push(node.keys().to_vec());
				if let Node::Internal(internal) = node {
					below.extend(internal.children.iter().copied());
				}
			}
			levels.push(keys);
			level = below;
		}
		levels
	}

	/// Renders the tree one level per line, each node as `(k1,k2,...)`.
	///
	/// Meant for debugging; the format is not stable.
	///
	/// ```
	/// use bplustree::Tree;
	///
	/// let mut tree = Tree::new(5).unwrap();
	/// for k in [39, 22, 97, 41, 53] {
	/// 	tree.insert(k, ()).unwrap();
	/// }
	/// assert_eq!(tree.debug_print(), "(41)\n(22,39) (41,53,97)\n");
	/// ```
	pub fn debug_print(&self) -> String
	where
		K: fmt::Debug,
	{
		let mut out = String::new();
		let mut level = vec![self.root];
		while !level.is_empty() {
			let mut below = Vec::new();
			let nodes: Vec<String> = level
				.iter()
				.map(|&id| {
					let node = self.nodes.get(id);
					if let Node::Internal(internal) = node {
						below.extend(internal.children.iter().copied());
					}
					let keys: Vec<String> = node.keys().iter().map(|k| format!("{:?}", k)).collect();
					format!("({})", keys.join(","))
				})
				.collect();
			out.push_str(&nodes.join(" "));
			out.push('\n');
			level = below;
		}
		out
	}
}

impl<K: Clone, V, C: Comparator<K>> Tree<K, V, C> {
	// -----------------------------------------------------------------------
	// Public API: Write Operations
	// -----------------------------------------------------------------------

	/// Inserts an entry.
	///
	/// Existing entries with an equal key are kept; the new entry is placed
	/// after them.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidInput`] if the key is not ordered with respect
	/// to itself under the tree's comparator. The tree is left unchanged.
	///
	/// # Algorithm
	///
	/// 1. Descend to the leaf that covers `key`
	/// 2. Insert the entry at its sorted position
	/// 3. If the leaf overflows, split it and any overflowing ancestors
	///
	/// # Example
	///
	/// ```
	/// use bplustree::Tree;
	///
	/// let mut tree = Tree::new(4).unwrap();
	/// tree.insert(1, "first").unwrap();
	/// tree.insert(1, "second").unwrap();
	///
	/// assert_eq!(tree.len(), 2);
	/// let values: Vec<&str> = tree.iter().map(|(_, v)| *v).collect();
	/// assert_eq!(values, vec!["first", "second"]);
	/// ```
	pub fn insert(&mut self, key: K, value: V) -> Result<()> {
		self.validate_key(&key)?;

		let id = self.find_leaf(&key);
		let leaf = self.nodes.get_mut(id).as_leaf_mut();
		let pos = leaf.upper_bound(&key, &self.cmp);
		leaf.insert_entry_at(pos, key, value);
		self.len += 1;

		if self.nodes.get(id).is_overflow(self.order) {
			self.split(id);
		}
		Ok(())
	}

	/// Removes one entry with the given key and returns its value.
	///
	/// Deleting a key that is not present is a no-op and returns `Ok(None)`.
	/// When the key occurs more than once, a single entry is removed.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidInput`] if the key is not ordered with respect
	/// to itself under the tree's comparator. The tree is left unchanged.
	///
	/// # Algorithm
	///
	/// 1. Descend to the leaf that covers `key` and remove the first match
	/// 2. If the leaf's first key changed, refresh the separator routing to it
	/// 3. If the leaf underflows, borrow from or merge with a sibling,
	///    repeating for ancestors that underflow in turn
	pub fn delete(&mut self, key: &K) -> Result<Option<V>> {
		self.validate_key(key)?;

		let id = self.find_leaf(key);
		let leaf = self.nodes.get_mut(id).as_leaf_mut();
		let pos = match leaf.find_entry_index(key, &self.cmp) {
			Some(pos) => pos,
			None => return Ok(None),
		};
		let (_, value) = leaf.remove_entry_at(pos);
		self.len -= 1;

		if pos == 0 {
			self.refresh_separator(id);
		}
		if self.nodes.get(id).is_underflow(self.order) {
			self.rebalance(id);
		}
		Ok(Some(value))
	}

	/// Removes every entry, leaving a single empty leaf as the root.
	pub fn clear(&mut self) {
		self.nodes.clear();
		self.root = self.nodes.alloc(Node::Leaf(LeafNode::new()));
		self.head = self.root;
		self.len = 0;
		self.height = 1;
	}

	// -----------------------------------------------------------------------
	// Structural Bookkeeping
	// -----------------------------------------------------------------------

	/// Points `head` at the leftmost leaf.
	pub(crate) fn refresh_head(&mut self) {
		let mut id = self.root;
		while let Node::Internal(internal) = self.nodes.get(id) {
			id = internal.children[0];
		}
		self.head = id;
	}

	/// Sets the parent of every child of the internal node `id` to `id`.
	pub(crate) fn adopt_children(&mut self, id: NodeId) {
		let count = self.nodes.get(id).as_internal().children.len();
		for i in 0..count {
			let child = self.nodes.get(id).as_internal().children[i];
			self.nodes.get_mut(child).set_parent(Some(id));
		}
	}
}

impl<'t, K, V, C: Comparator<K>> IntoIterator for &'t Tree<K, V, C> {
	type Item = (&'t K, &'t V);
	type IntoIter = Iter<'t, K, V>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

impl<K: fmt::Debug, V: fmt::Debug, C: Comparator<K>> fmt::Debug for Tree<K, V, C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.iter()).finish()
	}
}

// ===========================================================================
// Test-Only Validation Module
// ===========================================================================

/// Invariant validation for testing.
#[cfg(any(test, feature = "test-utils"))]
impl<K: fmt::Debug, V, C: Comparator<K>> Tree<K, V, C> {
	/// Validates all tree invariants. Panics with diagnostic info if any
	/// invariant is violated.
	///
	/// # Invariants Checked
	///
	/// 1. Balance: all leaves sit at depth `height - 1`
	/// 2. Occupancy: every non-root node holds between `min_keys` and
	///    `max_keys` keys
	/// 3. Fan-out: internal nodes have one more child than keys
	/// 4. Key ordering: keys are non-decreasing within each node
	/// 5. Leaf chain: starts at `head`, visits every leaf once, left to right,
	///    and yields `len` entries in non-decreasing order
	/// 6. Separators: each equals the smallest key under its right child and
	///    bounds the keys of both neighbouring subtrees
	/// 7. Bookkeeping: parent links match ownership and the arena holds no
	///    unreachable nodes
	pub fn assert_invariants(&self) {
		assert!(self.nodes.get(self.root).parent().is_none(), "root has a parent link");

		let mut leaves = Vec::new();
		let reachable = self.validate_node(self.root, None, 0, None, None, &mut leaves);
		assert_eq!(reachable, self.nodes.len(), "arena holds unreachable nodes");

		// Invariant 5: the chain matches the in-order leaf sequence
		assert_eq!(self.head, leaves[0], "head is not the leftmost leaf");
		let mut chained = Vec::with_capacity(leaves.len());
		let mut cursor = Some(self.head);
		while let Some(id) = cursor {
			chained.push(id);
			assert!(chained.len() <= leaves.len(), "leaf chain is longer than the leaf level");
			cursor = self.nodes.get(id).as_leaf().next;
		}
		assert_eq!(chained, leaves, "leaf chain does not follow the leaf level");

		let mut count = 0;
		let mut prev: Option<&K> = None;
		for (key, _) in self.iter() {
			if let Some(prev) = prev {
				assert!(
					self.cmp.compare(prev, key) != std::cmp::Ordering::Greater,
					"leaf chain out of order: {:?} before {:?}",
					prev,
					key
				);
			}
			prev = Some(key);
			count += 1;
		}
		assert_eq!(count, self.len, "leaf chain holds {} entries, len is {}", count, self.len);
	}

	/// Recursively validates a node and its subtree, returning the number of
	/// nodes in it.
	///
	/// # Arguments
	/// * `id` - The node to validate
	/// * `parent` - The node's expected parent link
	/// * `level` - Current level (0 = root)
	/// * `lower` - Separator to the left of this subtree, None if leftmost
	/// * `upper` - Separator to the right of this subtree, None if rightmost
	/// * `leaves` - Collects leaf handles in key order
	fn validate_node<'a>(
		&'a self,
		id: NodeId,
		parent: Option<NodeId>,
		level: usize,
		lower: Option<&'a K>,
		upper: Option<&'a K>,
		leaves: &mut Vec<NodeId>,
	) -> usize {
		use std::cmp::Ordering;

		let node = self.nodes.get(id);
		let keys = node.keys();

		assert_eq!(node.parent(), parent, "node {:?} has a wrong parent link", id);

		// Invariant 2: Occupancy
		assert!(
			keys.len() <= self.order.max_keys(),
			"node {:?} holds {} keys, max is {}",
			id,
			keys.len(),
			self.order.max_keys()
		);
		if parent.is_some() {
			assert!(
				keys.len() >= self.order.min_keys(),
				"node {:?} holds {} keys, min is {}",
				id,
				keys.len(),
				self.order.min_keys()
			);
		}

		// Invariant 4: Key ordering
		for pair in keys.windows(2) {
			assert!(
				self.cmp.compare(&pair[0], &pair[1]) != Ordering::Greater,
				"keys not sorted in node {:?}: {:?} > {:?}",
				id,
				pair[0],
				pair[1]
			);
		}

		// Invariant 6: Keys within the bounds set by the parent
		for key in keys {
			if let Some(lower) = lower {
				assert!(
					self.cmp.compare(key, lower) != Ordering::Less,
					"key {:?} below separator {:?}",
					key,
					lower
				);
			}
			if let Some(upper) = upper {
				assert!(
					self.cmp.compare(key, upper) != Ordering::Greater,
					"key {:?} above separator {:?}",
					key,
					upper
				);
			}
		}

		match node {
			Node::Leaf(leaf) => {
				// Invariant 1: Balance
				assert_eq!(level, self.height - 1, "leaf {:?} at level {} (height {})", id, level, self.height);
				assert_eq!(leaf.keys.len(), leaf.values.len(), "leaf {:?} keys and values differ", id);
				leaves.push(id);
				1
			}
			Node::Internal(internal) => {
				assert!(
					level + 1 < self.height,
					"internal node {:?} at leaf level {} (height {})",
					id,
					level,
					self.height
				);

				// Invariant 3: Fan-out
				assert_eq!(
					internal.children.len(),
					internal.keys.len() + 1,
					"internal node {:?} has {} keys and {} children",
					id,
					internal.keys.len(),
					internal.children.len()
				);

				let mut total = 1;
				for (i, &child) in internal.children.iter().enumerate() {
					let child_lower = if i == 0 {
						lower
					} else {
						Some(&internal.keys[i - 1])
					};
					let child_upper = internal.keys.get(i).or(upper);
					total += self.validate_node(child, Some(id), level + 1, child_lower, child_upper, leaves);

					if i > 0 {
						let smallest = self.subtree_first_key(child);
						assert!(
							smallest.map(|k| self.cmp.compare(k, &internal.keys[i - 1]))
								== Some(Ordering::Equal),
							"separator {:?} differs from smallest key {:?} of its right child",
							internal.keys[i - 1],
							smallest
						);
					}
				}
				total
			}
		}
	}

	fn subtree_first_key(&self, mut id: NodeId) -> Option<&K> {
		while let Node::Internal(internal) = self.nodes.get(id) {
			id = internal.children[0];
		}
		self.nodes.get(id).keys().first()
	}
}
