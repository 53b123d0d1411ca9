//! # Error Types for the B+ Tree
//!
//! This module defines the errors surfaced by the public tree API.
//!
//! ## Error Handling Strategy
//!
//! Only caller mistakes are reported through [`Error`]. Each of them is
//! detected before the tree is touched, so a failed call leaves the tree
//! exactly as it was and the caller can simply retry with valid input.
//!
//! A key that is not present is never an error: lookups return `None` and
//! deletes become a no-op.
//!
//! Broken structural invariants (splitting a node that is not overflowing,
//! merging nodes that are not siblings, a child missing from its parent) are
//! bugs in the tree itself. They panic instead of being returned.

use thiserror::Error;

/// Errors that can occur during B+ tree operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
	/// The requested tree order is too small to form a valid B+ tree.
	///
	/// An order `m` tree stores at most `m - 1` keys per node, and a split
	/// must leave at least one key on either side, so `m` must be at least 3.
	#[error("tree order must be at least {min}, got {order}")]
	InvalidOrder {
		/// The order that was requested.
		order: usize,
		/// The smallest supported order.
		min: usize,
	},

	/// The supplied key has no position in the tree's total order.
	///
	/// A key is rejected when the tree's comparator does not report it as
	/// equal to itself, for example `f64::NAN` under a float comparator.
	/// Such a key could never be found again once stored.
	#[error("key is not ordered with respect to itself")]
	InvalidInput,
}

/// A Result type alias using our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;
