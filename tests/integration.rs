//! # Integration Tests for the B+ Tree
//!
//! This module contains end-to-end integration tests that exercise the tree
//! through its public API with realistic workloads.

use std::cmp::Ordering;
use std::sync::Once;

use bplustree::{Comparator, Error, Tree};
use rand::prelude::*;
use tracing_subscriber::EnvFilter;

/// Routes the tree's split and merge events to the test output. Set
/// `RUST_LOG=bplustree=trace` to see them.
fn init_tracing() {
	static INIT: Once = Once::new();
	INIT.call_once(|| {
		let filter =
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bplustree=debug"));
		let _ = tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_test_writer()
			.with_ansi(false)
			.try_init();
	});
}

// ===========================================================================
// Large Scale Operation Tests
// ===========================================================================

#[test]
fn large_scale_insert_and_search() {
	init_tracing();
	let mut tree: Tree<i32, i32> = Tree::new(16).unwrap();

	for i in 0..10_000 {
		tree.insert(i, i * 10).unwrap();
	}

	tree.assert_invariants();
	assert_eq!(tree.len(), 10_000);

	for i in 0..10_000 {
		assert_eq!(tree.search(&i), Some(&(i * 10)), "Failed to find key {}", i);
	}
}

#[test]
fn large_scale_insert_and_delete() {
	init_tracing();
	let mut tree: Tree<i32, i32> = Tree::new(7).unwrap();

	for i in 0..10_000 {
		tree.insert(i, i).unwrap();
	}
	tree.assert_invariants();

	for i in (0..10_000).step_by(3) {
		assert_eq!(tree.delete(&i).unwrap(), Some(i));
	}
	tree.assert_invariants();

	for i in 0..10_000 {
		assert_eq!(tree.contains_key(&i), i % 3 != 0, "Key {}", i);
	}
}

#[test]
fn large_scale_random_operations() {
	init_tracing();
	let mut rng = StdRng::seed_from_u64(7);
	let mut tree: Tree<u64, u64> = Tree::default();
	let mut expected: Vec<u64> = Vec::new();

	for _ in 0..20_000 {
		let key = rng.random_range(0..5_000);
		if rng.random_bool(0.6) {
			tree.insert(key, key).unwrap();
			let pos = expected.partition_point(|k| *k <= key);
			expected.insert(pos, key);
		} else if let Ok(pos) = expected.binary_search(&key) {
			expected.remove(pos);
			assert_eq!(tree.delete(&key).unwrap(), Some(key));
		} else {
			assert_eq!(tree.delete(&key).unwrap(), None);
		}
	}

	tree.assert_invariants();
	let keys: Vec<u64> = tree.iter().map(|(k, _)| *k).collect();
	assert_eq!(keys, expected);
}

// ===========================================================================
// Key Type and Comparator Tests
// ===========================================================================

#[test]
fn string_keys() {
	let mut tree: Tree<String, usize> = Tree::new(4).unwrap();
	let words = ["delta", "alpha", "echo", "charlie", "bravo", "golf", "foxtrot", "hotel"];
	for (i, w) in words.iter().enumerate() {
		tree.insert(w.to_string(), i).unwrap();
	}

	tree.assert_invariants();
	assert_eq!(tree.search(&"echo".to_string()), Some(&2));

	let sorted: Vec<&str> = tree.iter().map(|(k, _)| k.as_str()).collect();
	assert_eq!(
		sorted,
		vec!["alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel"]
	);
}

#[test]
fn descending_comparator() {
	let mut tree = Tree::with_comparator(5, |a: &i32, b: &i32| b.cmp(a)).unwrap();
	for k in 0..200 {
		tree.insert(k, k).unwrap();
	}

	tree.assert_invariants();
	let keys: Vec<i32> = tree.iter().map(|(k, _)| *k).collect();
	assert_eq!(keys, (0..200).rev().collect::<Vec<_>>());

	// Bounds follow the comparator: "not less than 150" means 150 and below.
	let scan: Vec<i32> = tree.iter_from(&150).take(3).map(|(k, _)| *k).collect();
	assert_eq!(scan, vec![150, 149, 148]);

	for k in 0..200 {
		assert_eq!(tree.delete(&k).unwrap(), Some(k));
	}
	tree.assert_invariants();
}

/// Orders strings ignoring ASCII case.
struct CaseInsensitive;

impl Comparator<String> for CaseInsensitive {
	fn compare(&self, a: &String, b: &String) -> Ordering {
		a.bytes().map(|c| c.to_ascii_lowercase()).cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
	}
}

#[test]
fn custom_comparator_type() {
	let mut tree = Tree::with_comparator(3, CaseInsensitive).unwrap();
	tree.insert("Banana".to_string(), 1).unwrap();
	tree.insert("apple".to_string(), 2).unwrap();
	tree.insert("APPLE".to_string(), 3).unwrap();
	tree.insert("cherry".to_string(), 4).unwrap();

	tree.assert_invariants();
	assert_eq!(tree.len(), 4);
	assert!(tree.contains_key(&"BANANA".to_string()));

	let values: Vec<i32> = tree.iter().map(|(_, v)| *v).collect();
	assert_eq!(values, vec![2, 3, 1, 4]);
}

#[test]
fn float_keys_reject_nan() {
	let mut tree =
		Tree::with_comparator(4, |a: &f64, b: &f64| a.partial_cmp(b).unwrap_or(Ordering::Less))
			.unwrap();

	for i in 0..50 {
		tree.insert(i as f64 / 4.0, i).unwrap();
	}
	let before = tree.levels();

	assert_eq!(tree.insert(f64::NAN, 99), Err(Error::InvalidInput));
	assert_eq!(tree.delete(&f64::NAN), Err(Error::InvalidInput));
	assert_eq!(tree.levels(), before);
	assert_eq!(tree.len(), 50);

	assert_eq!(tree.search(&2.5), Some(&10));
	assert_eq!(tree.search(&f64::INFINITY), None);
	tree.insert(f64::NEG_INFINITY, -1).unwrap();
	assert_eq!(tree.first_key_value(), Some((&f64::NEG_INFINITY, &-1)));
	tree.assert_invariants();
}

// ===========================================================================
// Range Scan Tests
// ===========================================================================

#[test]
fn range_query_forward() {
	let mut tree: Tree<i32, i32> = Tree::new(6).unwrap();
	for i in 0..1000 {
		tree.insert(i * 2, i).unwrap();
	}

	let range: Vec<i32> =
		tree.iter_from(&101).take_while(|(k, _)| **k < 200).map(|(k, _)| *k).collect();
	assert_eq!(range, (102..200).step_by(2).collect::<Vec<_>>());
}

#[test]
fn range_query_nonexistent_bounds() {
	let mut tree: Tree<i32, i32> = Tree::new(6).unwrap();
	for i in 100..200 {
		tree.insert(i, i).unwrap();
	}

	assert_eq!(tree.iter_from(&0).count(), 100);
	assert_eq!(tree.iter_from(&50).next(), Some((&100, &100)));
	assert_eq!(tree.iter_from(&200).next(), None);
	assert_eq!(tree.iter_from(&199).count(), 1);
}

#[test]
fn scan_after_heavy_deletes() {
	let mut rng = rand::rng();
	let mut tree: Tree<i32, i32> = Tree::new(4).unwrap();
	let mut keys: Vec<i32> = (0..2000).collect();
	for &k in &keys {
		tree.insert(k, k).unwrap();
	}

	keys.shuffle(&mut rng);
	let (gone, kept) = keys.split_at(1500);
	for k in gone {
		tree.delete(k).unwrap();
	}
	tree.assert_invariants();

	let mut kept = kept.to_vec();
	kept.sort();
	let scanned: Vec<i32> = tree.iter().map(|(k, _)| *k).collect();
	assert_eq!(scanned, kept);

	let leaf_keys: Vec<i32> = tree.leaves().flat_map(|keys| keys.iter().copied()).collect();
	assert_eq!(leaf_keys, kept);
}

// ===========================================================================
// Edge Case Tests
// ===========================================================================

#[test]
fn single_element_operations() {
	let mut tree: Tree<i32, &str> = Tree::new(3).unwrap();

	tree.insert(42, "answer").unwrap();
	assert_eq!(tree.len(), 1);
	assert_eq!(tree.first_key_value(), tree.last_key_value());

	assert_eq!(tree.delete(&42).unwrap(), Some("answer"));
	assert!(tree.is_empty());
	assert_eq!(tree.iter().next(), None);
	assert_eq!(tree.leaves().count(), 1);
	tree.assert_invariants();
}

#[test]
fn clear_and_reuse() {
	let mut tree: Tree<i32, i32> = Tree::new(5).unwrap();
	for i in 0..1000 {
		tree.insert(i, i).unwrap();
	}

	tree.clear();
	tree.assert_invariants();
	assert_eq!(tree.iter().count(), 0);

	for i in (0..1000).rev() {
		tree.insert(i, -i).unwrap();
	}
	tree.assert_invariants();
	assert_eq!(tree.search(&500), Some(&-500));
}

#[test]
fn search_mut_in_place() {
	let mut tree: Tree<&str, Vec<u32>> = Tree::new(4).unwrap();
	for name in ["a", "b", "c", "d", "e"] {
		tree.insert(name, Vec::new()).unwrap();
	}

	for (i, name) in ["c", "c", "e"].iter().enumerate() {
		if let Some(list) = tree.search_mut(name) {
			list.push(i as u32);
		}
	}

	assert_eq!(tree.search(&"c"), Some(&vec![0, 1]));
	assert_eq!(tree.search(&"e"), Some(&vec![2]));
	assert_eq!(tree.search(&"a"), Some(&vec![]));
}

#[test]
fn debug_print_and_debug_format() {
	let mut tree: Tree<i32, char> = Tree::new(3).unwrap();
	for (k, v) in [(2, 'b'), (1, 'a'), (3, 'c')] {
		tree.insert(k, v).unwrap();
	}

	assert_eq!(tree.debug_print(), "(2)\n(1) (2,3)\n");
	assert_eq!(format!("{:?}", tree), "{1: 'a', 2: 'b', 3: 'c'}");
}

#[test]
fn order_accessors() {
	let tree: Tree<i32, i32> = Tree::new(7).unwrap();
	assert_eq!(tree.order().get(), 7);
	assert_eq!(tree.order().max_keys(), 6);
	assert_eq!(tree.order().min_keys(), 3);

	let err = Tree::<i32, i32>::new(1).err();
	assert_eq!(
		err,
		Some(Error::InvalidOrder {
			order: 1,
			min: bplustree::MIN_ORDER
		})
	);
}
