//! Iterators over the leaf chain of a [`Tree`](crate::Tree).
//!
//! All iterators walk the `next` links between leaves, so after the initial
//! positioning they never descend from the root again.
use std::iter::FusedIterator;

use crate::arena::{Arena, NodeId};
use crate::node::{LeafNode, Node};

/// An ascending iterator over the entries of a tree.
///
/// Created by [`Tree::iter`](crate::Tree::iter) and
/// [`Tree::iter_from`](crate::Tree::iter_from).
pub struct Iter<'t, K, V> {
	nodes: &'t Arena<Node<K, V>>,
	leaf: Option<&'t LeafNode<K, V>>,
	pos: usize,
	remaining: usize,
}

impl<'t, K, V> Iter<'t, K, V> {
	/// Starts at entry `pos` of `leaf`. `remaining` bounds the number of
	/// entries left, for `size_hint`.
	pub(crate) fn new(
		nodes: &'t Arena<Node<K, V>>,
		leaf: NodeId,
		pos: usize,
		remaining: usize,
	) -> Iter<'t, K, V> {
		Iter {
			nodes,
			leaf: Some(nodes.get(leaf).as_leaf()),
			pos,
			remaining,
		}
	}
}

impl<'t, K, V> Iterator for Iter<'t, K, V> {
	type Item = (&'t K, &'t V);

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			let leaf = self.leaf?;
			if self.pos < leaf.len() {
				let pos = self.pos;
				self.pos += 1;
				self.remaining = self.remaining.saturating_sub(1);
				return Some((&leaf.keys[pos], &leaf.values[pos]));
			}
			// Exhausted this leaf, follow the chain.
			self.leaf = leaf.next.map(|id| self.nodes.get(id).as_leaf());
			self.pos = 0;
		}
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		match self.leaf {
			Some(leaf) => {
				let in_leaf = leaf.len().saturating_sub(self.pos);
				(in_leaf.min(self.remaining), Some(self.remaining))
			}
			None => (0, Some(0)),
		}
	}
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// An iterator over the key runs of every leaf, in chain order.
///
/// Created by [`Tree::leaves`](crate::Tree::leaves).
pub struct Leaves<'t, K, V> {
	nodes: &'t Arena<Node<K, V>>,
	next: Option<NodeId>,
}

impl<'t, K, V> Leaves<'t, K, V> {
	pub(crate) fn new(nodes: &'t Arena<Node<K, V>>, head: NodeId) -> Leaves<'t, K, V> {
		Leaves {
			nodes,
			next: Some(head),
		}
	}
}

impl<'t, K, V> Iterator for Leaves<'t, K, V> {
	type Item = &'t [K];

	fn next(&mut self) -> Option<Self::Item> {
		let leaf = self.nodes.get(self.next?).as_leaf();
		self.next = leaf.next;
		Some(&leaf.keys)
	}
}

impl<K, V> FusedIterator for Leaves<'_, K, V> {}
