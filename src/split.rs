//! Node splitting.
//!
//! Insertion may leave a node holding one key more than the order allows.
//! Splitting divides that node around `mid = max_keys / 2` and hands a
//! separator to the parent, repeating upward while parents overflow in turn.
//!
//! ```text
//! Leaf split (separator copied up, order 5):
//!
//!   Parent: [...]                Parent: [..., 41, ...]
//!              │                            │    │
//!   Leaf: [22, 39, 41, 53, 97]   Left: [22, 39]  Right: [41, 53, 97]
//!                                  next ───────────►
//!
//! Internal split (separator moved up, order 5):
//!
//!   Node: [22, 26, 30, 36, 41]   Parent: [..., 30, ...]
//!                                            │    │
//!                                Left: [22, 26]  Right: [36, 41]
//! ```

use crate::arena::NodeId;
use crate::compare::Comparator;
use crate::node::{InternalNode, Node};
use crate::Tree;

impl<K: Clone, V, C: Comparator<K>> Tree<K, V, C> {
	/// Splits the overflowing node `id`, then every ancestor that overflows
	/// as a result.
	pub(crate) fn split(&mut self, id: NodeId) {
		let mut next = Some(id);
		while let Some(id) = next {
			next = self.split_node(id);
		}
		self.refresh_head();
	}

	/// Splits a single node and returns its parent if the parent now
	/// overflows.
	///
	/// # Panics
	///
	/// Panics if the node is not overflowing.
	fn split_node(&mut self, id: NodeId) -> Option<NodeId> {
		assert!(
			self.nodes.get(id).is_overflow(self.order),
			"split called on node {:?} which is not overflowing",
			id
		);

		let parent_id = match self.nodes.get(id).parent() {
			Some(parent_id) => parent_id,
			None => self.grow_root(id),
		};

		let mid = self.order.max_keys() / 2;
		let (separator, right) = match self.nodes.get_mut(id) {
			Node::Leaf(leaf) => {
				let right = leaf.split_off(mid);
				// Leaves keep their own copy of every key.
				(right.keys[0].clone(), Node::Leaf(right))
			}
			Node::Internal(internal) => {
				let (separator, right) = internal.split_off(mid);
				(separator, Node::Internal(right))
			}
		};
		let is_leaf = right.is_leaf();
		let right_id = self.nodes.alloc(right);

		if is_leaf {
			self.nodes.get_mut(id).as_leaf_mut().next = Some(right_id);
		} else {
			self.adopt_children(right_id);
		}

		let parent = self.nodes.get_mut(parent_id).as_internal_mut();
		let pos = parent.child_position(id);
		parent.insert_key_at(pos, separator);
		parent.insert_child_at(pos + 1, right_id);

		tracing::trace!(
			node = ?id,
			right = ?right_id,
			parent = ?parent_id,
			leaf = is_leaf,
			left_keys = self.nodes.get(id).len(),
			right_keys = self.nodes.get(right_id).len(),
			"split node"
		);

		self.nodes.get(parent_id).is_overflow(self.order).then_some(parent_id)
	}

	/// Places a new, empty internal root above `old_root`.
	fn grow_root(&mut self, old_root: NodeId) -> NodeId {
		let mut root = InternalNode::new();
		root.children.push(old_root);
		let root_id = self.nodes.alloc(Node::Internal(root));

		self.nodes.get_mut(old_root).set_parent(Some(root_id));
		self.root = root_id;
		self.height += 1;

		tracing::debug!(root = ?root_id, height = self.height, "grew new root");
		root_id
	}
}
