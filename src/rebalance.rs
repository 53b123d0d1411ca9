//! Underflow repair after deletion.
//!
//! A non-root node left with fewer than `min_keys` keys is repaired from its
//! adjacent siblings, trying in order:
//!
//! 1. Borrow the last entry (or key and child) of the left sibling.
//! 2. Borrow the first entry (or key and child) of the right sibling.
//! 3. Merge with the left sibling, or absorb the right sibling when there is
//!    no left one. The parent loses one separator and one child and may
//!    underflow in turn.
//!
//! An internal root left without keys is replaced by its only child.
//!
//! ```text
//! Internal borrow from the left (rotation through the parent):
//!
//!   Parent:        [.., 40, ..]              [.., 30, ..]
//!                    /      \                  /      \
//!   Left: [10, 20, 30]    [50]      Left: [10, 20]    [40, 50]
//!                  └─ c                           c ─┘
//! ```

use crate::arena::NodeId;
use crate::compare::Comparator;
use crate::node::Node;
use crate::Tree;

impl<K: Clone, V, C: Comparator<K>> Tree<K, V, C> {
	/// Repairs the underflowing node `id` and any ancestors that underflow
	/// as a consequence.
	///
	/// # Panics
	///
	/// Panics if `id` is not underflowing.
	pub(crate) fn rebalance(&mut self, id: NodeId) {
		let mut current = id;
		loop {
			assert!(
				self.nodes.get(current).is_underflow(self.order),
				"rebalance called on node {:?} which is not underflowing",
				current
			);
			let min_keys = self.order.min_keys();
			let parent_id = match self.nodes.get(current).parent() {
				Some(parent_id) => parent_id,
				None => unreachable!("an underflowing node always has a parent"),
			};
			let parent = self.nodes.get(parent_id).as_internal();
			let pos = parent.child_position(current);
			let left = pos.checked_sub(1).map(|i| parent.children[i]);
			let right = parent.children.get(pos + 1).copied();

			if let Some(left_id) = left.filter(|&l| self.nodes.get(l).len() > min_keys) {
				self.borrow_from_left(current, left_id, parent_id, pos);
				break;
			}
			if let Some(right_id) = right.filter(|&r| self.nodes.get(r).len() > min_keys) {
				self.borrow_from_right(current, right_id, parent_id, pos);
				break;
			}

			let survivor = match (left, right) {
				(Some(left_id), _) => {
					self.merge(left_id, current, parent_id, pos - 1);
					left_id
				}
				(None, Some(right_id)) => {
					self.merge(current, right_id, parent_id, pos);
					current
				}
				(None, None) => unreachable!("a non-root node always has a sibling"),
			};

			if parent_id == self.root {
				if self.nodes.get(parent_id).len() == 0 {
					self.collapse_root(survivor);
				}
				break;
			}
			if !self.nodes.get(parent_id).is_underflow(self.order) {
				break;
			}
			current = parent_id;
		}
		self.refresh_head();
	}

	/// Moves the last entry of the left sibling to the front of `id`.
	fn borrow_from_left(&mut self, id: NodeId, left_id: NodeId, parent_id: NodeId, pos: usize) {
		match self.nodes.get_mut(left_id) {
			Node::Leaf(left) => {
				let (key, value) = left.remove_entry_at(left.len() - 1);
				let separator = key.clone();
				self.nodes.get_mut(id).as_leaf_mut().insert_entry_at(0, key, value);
				self.nodes.get_mut(parent_id).as_internal_mut().replace_key_at(pos - 1, separator);
			}
			Node::Internal(left) => {
				let key = left.remove_key_at(left.len() - 1);
				let child = left.remove_child_at(left.children.len() - 1);
				let separator =
					self.nodes.get_mut(parent_id).as_internal_mut().replace_key_at(pos - 1, key);

				let node = self.nodes.get_mut(id).as_internal_mut();
				node.insert_key_at(0, separator);
				node.insert_child_at(0, child);
				self.nodes.get_mut(child).set_parent(Some(id));
			}
		}

		tracing::trace!(node = ?id, sibling = ?left_id, "borrowed from left sibling");
	}

	/// Moves the first entry of the right sibling to the back of `id`.
	fn borrow_from_right(&mut self, id: NodeId, right_id: NodeId, parent_id: NodeId, pos: usize) {
		match self.nodes.get_mut(right_id) {
			Node::Leaf(right) => {
				let (key, value) = right.remove_entry_at(0);
				let separator = right.keys[0].clone();
				self.nodes.get_mut(parent_id).as_internal_mut().replace_key_at(pos, separator);

				let node = self.nodes.get_mut(id).as_leaf_mut();
				let end = node.len();
				node.insert_entry_at(end, key, value);
				if end == 0 {
					// The borrowed entry is now this leaf's smallest key.
					self.refresh_separator(id);
				}
			}
			Node::Internal(right) => {
				let key = right.remove_key_at(0);
				let child = right.remove_child_at(0);
				let separator =
					self.nodes.get_mut(parent_id).as_internal_mut().replace_key_at(pos, key);

				let node = self.nodes.get_mut(id).as_internal_mut();
				let end = node.len();
				node.insert_key_at(end, separator);
				node.insert_child_at(end + 1, child);
				self.nodes.get_mut(child).set_parent(Some(id));
			}
		}

		tracing::trace!(node = ?id, sibling = ?right_id, "borrowed from right sibling");
	}

	/// Merges `right_id` into its left sibling `left_id`. The separator at
	/// `sep_pos` in the parent and the right child are removed from the
	/// parent, and the right node is freed.
	///
	/// # Panics
	///
	/// Panics if the two nodes are not adjacent children of `parent_id`.
	fn merge(&mut self, left_id: NodeId, right_id: NodeId, parent_id: NodeId, sep_pos: usize) {
		let parent = self.nodes.get_mut(parent_id).as_internal_mut();
		assert!(
			parent.children.get(sep_pos) == Some(&left_id)
				&& parent.children.get(sep_pos + 1) == Some(&right_id),
			"merge called on nodes {:?} and {:?} which are not adjacent siblings",
			left_id,
			right_id
		);
		let separator = parent.remove_key_at(sep_pos);
		parent.remove_child_at(sep_pos + 1);

		match self.nodes.take(right_id) {
			Node::Leaf(right) => {
				let left = self.nodes.get_mut(left_id).as_leaf_mut();
				let was_empty = left.len() == 0;
				left.append(right);
				if was_empty {
					self.refresh_separator(left_id);
				}
			}
			Node::Internal(right) => {
				self.nodes.get_mut(left_id).as_internal_mut().append(separator, right);
				self.adopt_children(left_id);
			}
		}

		tracing::trace!(
			node = ?left_id,
			absorbed = ?right_id,
			keys = self.nodes.get(left_id).len(),
			"merged siblings"
		);
	}

	/// Replaces the keyless internal root with its only child.
	fn collapse_root(&mut self, child: NodeId) {
		let old_root = self.root;
		let root = self.nodes.take(old_root);
		debug_assert_eq!(root.as_internal().children.as_slice(), &[child]);

		self.nodes.get_mut(child).set_parent(None);
		self.root = child;
		self.height -= 1;

		tracing::debug!(root = ?child, height = self.height, "collapsed root");
	}

	/// Sets the separator that routes to leaf `id` to the leaf's current
	/// first key.
	///
	/// That separator lives in the nearest ancestor where the path to the
	/// leaf does not go through the first child. The leftmost leaf has no
	/// such separator.
	pub(crate) fn refresh_separator(&mut self, id: NodeId) {
		let first = match self.nodes.get(id).keys().first() {
			Some(first) => first.clone(),
			None => return,
		};

		let mut child = id;
		while let Some(parent_id) = self.nodes.get(child).parent() {
			let parent = self.nodes.get_mut(parent_id).as_internal_mut();
			let pos = parent.child_position(child);
			if pos > 0 {
				parent.replace_key_at(pos - 1, first);
				tracing::trace!(node = ?id, ancestor = ?parent_id, "refreshed separator");
				return;
			}
			child = parent_id;
		}
	}
}
