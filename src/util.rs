//! Test utilities for loading sample trees from JSON fixtures
use crate::arena::NodeId;
use crate::node::{InternalNode, LeafNode, Node, Order};
use crate::{Natural, Tree};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum TreeNode {
	Internal {
		keys: Vec<i64>,
		children: Vec<TreeNode>,
	},
	Leaf {
		keys: Vec<i64>,
	},
}

#[derive(Deserialize, Debug)]
struct SampleTree {
	order: usize,
	root: TreeNode,
}

/// Allocates `tree_node` and its subtree, returning its handle and depth.
/// Leaves are appended to `leaves` left to right; every value equals its key.
fn translate_node(
	tree: &mut Tree<i64, i64>,
	tree_node: TreeNode,
	parent: Option<NodeId>,
	leaves: &mut Vec<NodeId>,
) -> (NodeId, usize) {
	match tree_node {
		TreeNode::Internal {
			keys,
			children,
		} => {
			assert_eq!(keys.len() + 1, children.len(), "fixture node {:?} has a wrong fan-out", keys);
			let mut internal = InternalNode::new();
			internal.keys.extend(keys);
			internal.parent = parent;
			let id = tree.nodes.alloc(Node::Internal(internal));

			let mut depth = 0;
			for child in children {
				let (child_id, child_depth) = translate_node(tree, child, Some(id), leaves);
				tree.nodes.get_mut(id).as_internal_mut().children.push(child_id);
				depth = child_depth;
			}
			(id, depth + 1)
		}
		TreeNode::Leaf {
			keys,
		} => {
			let mut leaf = LeafNode::new();
			leaf.values.extend(keys.iter().copied());
			leaf.keys.extend(keys);
			leaf.parent = parent;
			tree.len += leaf.len();
			let id = tree.nodes.alloc(Node::Leaf(leaf));
			leaves.push(id);
			(id, 1)
		}
	}
}

pub fn sample_tree<P: AsRef<std::path::Path>>(path: P) -> Tree<i64, i64> {
	let file = std::fs::File::open(path).expect("failed to find file");
	let json_tree: SampleTree = serde_json::from_reader(file).unwrap();

	let mut tree = Tree {
		nodes: crate::arena::Arena::new(),
		root: NodeId::from_index(0),
		head: NodeId::from_index(0),
		order: Order::new(json_tree.order).unwrap(),
		len: 0,
		height: 0,
		cmp: Natural,
	};

	let mut leaves = Vec::new();
	let (root, height) = translate_node(&mut tree, json_tree.root, None, &mut leaves);
	for pair in leaves.windows(2) {
		tree.nodes.get_mut(pair[0]).as_leaf_mut().next = Some(pair[1]);
	}
	tree.root = root;
	tree.head = leaves[0];
	tree.height = height;
	tree
}
