//! Node pool for the tree.
//!
//! Nodes live in a slot vector and refer to each other through [`NodeId`]
//! handles. Ownership runs strictly downward through the tree's child lists;
//! `parent` and `next` links are plain handles that never keep a node alive.
//! Freed slots are recycled through a free list.

use std::num::NonZeroU32;

/// Handle to a node slot in an [`Arena`].
///
/// Stored as `index + 1` so that `Option<NodeId>` stays four bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub(crate) struct NodeId(NonZeroU32);

impl NodeId {
	pub(crate) const MAX: usize = (u32::MAX - 1) as usize;

	#[inline]
	pub(crate) fn from_index(index: usize) -> Self {
		assert!(index <= Self::MAX, "`NodeId::from_index()` - `index` > `NodeId::MAX`");
		match NonZeroU32::new((index + 1) as u32) {
			Some(raw) => NodeId(raw),
			None => unreachable!("index + 1 is never zero"),
		}
	}

	#[inline]
	pub(crate) fn to_index(self) -> usize {
		(self.0.get() - 1) as usize
	}
}

#[derive(Clone, Debug)]
pub(crate) struct Arena<T> {
	slots: Vec<Option<T>>,
	free: Vec<NodeId>,
}

impl<T> Arena<T> {
	pub(crate) const fn new() -> Self {
		Self {
			slots: Vec::new(),
			free: Vec::new(),
		}
	}

	/// Number of live elements.
	#[inline]
	pub(crate) fn len(&self) -> usize {
		self.slots.len() - self.free.len()
	}

	pub(crate) fn alloc(&mut self, element: T) -> NodeId {
		if let Some(id) = self.free.pop() {
			self.slots[id.to_index()] = Some(element);
			id
		} else {
			self.slots.push(Some(element));
			NodeId::from_index(self.slots.len() - 1)
		}
	}

	#[inline]
	pub(crate) fn get(&self, id: NodeId) -> &T {
		self.slots[id.to_index()].as_ref().expect("`Arena::get()` - `id` is not live")
	}

	#[inline]
	pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut T {
		self.slots[id.to_index()].as_mut().expect("`Arena::get_mut()` - `id` is not live")
	}

	/// Removes the element and releases its slot for reuse.
	pub(crate) fn take(&mut self, id: NodeId) -> T {
		let element =
			self.slots[id.to_index()].take().expect("`Arena::take()` - `id` is not live");
		self.free.push(id);
		element
	}

	pub(crate) fn clear(&mut self) {
		self.slots.clear();
		self.free.clear();
	}
}
