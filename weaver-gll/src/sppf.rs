use std::collections::HashMap;

use petgraph::{
	dot::{Config, Dot},
	graph::{DefaultIx, NodeIndex},
	Directed, Direction, Graph,
};

use crate::{error::GrammarError, grammar::Grammar, slot::{GrammarSlot, SlotId}, NonterminalId, TerminalId};

/// SPPF nodes are stored in a petgraph arena, references are stored as integers.
pub type SppfNodeIndex = NodeIndex<SppfIx>;

type SppfIx = DefaultIx;

/// The graph itself. Edges carry no data, their order does.
pub type SppfGraph = Graph<SppfNode, (), Directed, SppfIx>;

/// Result type for SPPF operations.
pub type SppfResult<T> = Result<T, GrammarError>;

/// A node of the shared packed parse forest.
///
/// Every kind except [`SppfNode::Packed`] is unique per label and extents. Packed nodes are unique per parent, slot
/// and pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SppfNode {
	/// `$` node in the original paper: "nothing parsed yet".
	Dummy,
	/// A single token.
	Terminal {
		/// The matched terminal.
		terminal: TerminalId,
		/// The position of the token.
		left: usize,
		/// Always `left + 1`.
		right: usize,
	},
	/// The empty string, at `position`.
	Epsilon {
		/// Where the empty string was derived.
		position: usize,
	},
	/// A completed nonterminal over `left..right`.
	Symbol {
		/// The recognized nonterminal.
		nonterminal: NonterminalId,
		/// Start of the span.
		left: usize,
		/// End of the span.
		right: usize,
	},
	/// A prefix of an alternative over `left..right`, up to `slot`.
	Intermediate {
		/// The slot the prefix ends in.
		slot: SlotId,
		/// Start of the span.
		left: usize,
		/// End of the span.
		right: usize,
	},
	/// One way of deriving the parent. Its children are the left part (optional) and the right part, split at `pivot`.
	Packed {
		/// The slot the derivation ends in.
		slot: SlotId,
		/// Where the left part ends and the right part starts.
		pivot: usize,
	},
}

impl SppfNode {
	/// The left extent of the node. `None` for [`SppfNode::Dummy`] and [`SppfNode::Packed`].
	#[must_use]
	pub const fn left_extent(&self) -> Option<usize> {
		match self {
			Self::Terminal { left, .. } | Self::Symbol { left, .. } | Self::Intermediate { left, .. } => Some(*left),
			Self::Epsilon { position } => Some(*position),
			Self::Dummy | Self::Packed { .. } => None,
		}
	}

	/// The right extent of the node. `None` for [`SppfNode::Dummy`] and [`SppfNode::Packed`].
	#[must_use]
	pub const fn right_extent(&self) -> Option<usize> {
		match self {
			Self::Terminal { right, .. } | Self::Symbol { right, .. } | Self::Intermediate { right, .. } => Some(*right),
			Self::Epsilon { position } => Some(*position),
			Self::Dummy | Self::Packed { .. } => None,
		}
	}

	/// Whether this is a packed node.
	#[must_use]
	pub const fn is_packed(&self) -> bool {
		matches!(self, Self::Packed { .. })
	}

	/// A string representation of the node, e.g. `(E,0,3)` or `(E -> E + • num,0,2)`.
	#[must_use]
	pub fn to_string(&self, grammar: &Grammar) -> String {
		let slot = |id: &SlotId| grammar.slot(*id).map(|s| s.to_string(grammar)).unwrap_or_default();
		match self {
			Self::Dummy => "$".to_string(),
			Self::Terminal { terminal, left, right } => format!("({},{left},{right})", grammar.terminal_name(*terminal)),
			Self::Epsilon { position } => format!("(ε,{position},{position})"),
			Self::Symbol { nonterminal, left, right } => format!("({},{left},{right})", grammar.nonterminal_name(*nonterminal)),
			Self::Intermediate { slot: id, left, right } => format!("({},{left},{right})", slot(id)),
			Self::Packed { slot: id, pivot } => format!("({},{pivot})", slot(id)),
		}
	}
}

/// The shared packed parse forest.
///
/// Nodes are interned: asking for the same node twice yields the same index. Nothing is ever removed.
#[derive(Debug)]
pub struct Sppf {
	graph: SppfGraph,
	map: HashMap<SppfNode, SppfNodeIndex>,
	packed: HashMap<(SppfNodeIndex, SlotId, usize), SppfNodeIndex>,
	dummy: SppfNodeIndex,
}

impl Default for Sppf {
	fn default() -> Self {
		Self::new()
	}
}

impl Sppf {
	/// A forest containing only the dummy node.
	#[must_use]
	pub fn new() -> Self {
		let mut graph = SppfGraph::default();
		let dummy = graph.add_node(SppfNode::Dummy);
		Self { graph, map: HashMap::from([(SppfNode::Dummy, dummy)]), packed: HashMap::new(), dummy }
	}

	/// The `$` node.
	#[must_use]
	pub const fn dummy(&self) -> SppfNodeIndex {
		self.dummy
	}

	fn find_or_create(&mut self, node: SppfNode) -> SppfNodeIndex {
		if let Some(ix) = self.map.get(&node) {
			*ix
		} else {
			let ix = self.graph.add_node(node);
			self.map.insert(node, ix);
			ix
		}
	}

	/// Look up an interned node.
	#[must_use]
	pub fn find(&self, node: &SppfNode) -> Option<SppfNodeIndex> {
		self.map.get(node).copied()
	}

	/// The node for a token of `terminal` at `position`.
	pub fn terminal_node(&mut self, terminal: TerminalId, position: usize) -> SppfNodeIndex {
		self.find_or_create(SppfNode::Terminal { terminal, left: position, right: position + 1 })
	}

	/// The node for the empty string at `position`.
	pub fn epsilon_node(&mut self, position: usize) -> SppfNodeIndex {
		self.find_or_create(SppfNode::Epsilon { position })
	}

	/// The node for `nonterminal` over `left..right`.
	pub fn symbol_node(&mut self, nonterminal: NonterminalId, left: usize, right: usize) -> SppfNodeIndex {
		self.find_or_create(SppfNode::Symbol { nonterminal, left, right })
	}

	/// The node for the prefix up to `slot` over `left..right`.
	pub fn intermediate_node(&mut self, slot: SlotId, left: usize, right: usize) -> SppfNodeIndex {
		self.find_or_create(SppfNode::Intermediate { slot, left, right })
	}

	/// Attach a packed node to `parent` unless one with the same slot and pivot is already there.
	///
	/// Returns the packed node and whether it was created.
	pub fn add_packed(&mut self, parent: SppfNodeIndex, slot: SlotId, pivot: usize, left: Option<SppfNodeIndex>, right: SppfNodeIndex) -> (SppfNodeIndex, bool) {
		let key = (parent, slot, pivot);
		if let Some(ix) = self.packed.get(&key) {
			return (*ix, false);
		}
		let ix = self.graph.add_node(SppfNode::Packed { slot, pivot });
		self.packed.insert(key, ix);
		self.graph.add_edge(parent, ix, ());
		if let Some(left) = left {
			self.graph.add_edge(ix, left, ());
		}
		self.graph.add_edge(ix, right, ());
		(ix, true)
	}

	/// Combine `left` (possibly the dummy) and `right` into the node labelled by `make`.
	fn pack(&mut self, slot: &GrammarSlot, left: SppfNodeIndex, right: SppfNodeIndex, make: impl FnOnce(usize, usize) -> SppfNode) -> SppfResult<SppfNodeIndex> {
		let (right_left, right_right) = self.extents(right)?;
		let (lower, pivot, left_child) = if left == self.dummy {
			(right_left, right_left, None)
		} else {
			let (left_left, left_right) = self.extents(left)?;
			if left_right != right_left {
				return Err(GrammarError::Fatal(format!("cannot pack {left:?} ending at {left_right} with {right:?} starting at {right_left}")));
			}
			(left_left, left_right, Some(left))
		};
		let parent = self.find_or_create(make(lower, right_right));
		self.add_packed(parent, slot.id(), pivot, left_child, right);
		Ok(parent)
	}

	/// Find or create the symbol node for the nonterminal of the completed `slot`, and pack `left` and `right` under it.
	///
	/// # Errors
	/// Returns [`GrammarError::Fatal`] if `right` has no extents or `left` and `right` are not adjacent.
	pub fn packed_symbol(&mut self, slot: &GrammarSlot, left: SppfNodeIndex, right: SppfNodeIndex) -> SppfResult<SppfNodeIndex> {
		let nonterminal = slot.nonterminal;
		self.pack(slot, left, right, |l, r| SppfNode::Symbol { nonterminal, left: l, right: r })
	}

	/// Find or create the intermediate node for `slot`, and pack `left` and `right` under it.
	///
	/// # Errors
	/// See [`Sppf::packed_symbol`].
	pub fn packed_intermediate(&mut self, slot: &GrammarSlot, left: SppfNodeIndex, right: SppfNodeIndex) -> SppfResult<SppfNodeIndex> {
		let id = slot.id();
		self.pack(slot, left, right, |l, r| SppfNode::Intermediate { slot: id, left: l, right: r })
	}

	/// `getNodeP` in the original paper: the node for everything parsed up to `slot`, given the previously
	/// parsed `left` and the just-parsed `right`.
	///
	/// If the prefix before `slot` is a single special symbol and the alternative is not yet complete, no new node
	/// is needed and `right` is returned as is.
	///
	/// # Errors
	/// See [`Sppf::packed_symbol`].
	pub fn get_node_p(&mut self, slot: &GrammarSlot, left: SppfNodeIndex, right: SppfNodeIndex) -> SppfResult<SppfNodeIndex> {
		if slot.is_alpha_special() && !slot.is_end() {
			Ok(right)
		} else if slot.is_end() {
			self.packed_symbol(slot, left, right)
		} else {
			self.packed_intermediate(slot, left, right)
		}
	}

	/// Get the data of a node.
	#[must_use]
	pub fn node(&self, ix: SppfNodeIndex) -> Option<&SppfNode> {
		self.graph.node_weight(ix)
	}

	/// The extents of a non-packed, non-dummy node.
	///
	/// # Errors
	/// Returns [`GrammarError::Fatal`] for anything else.
	pub fn extents(&self, ix: SppfNodeIndex) -> SppfResult<(usize, usize)> {
		self.node(ix)
			.and_then(|node| node.left_extent().zip(node.right_extent()))
			.ok_or_else(|| GrammarError::Fatal(format!("SPPF node {} has no extents", ix.index())))
	}

	/// The children of a node, in order.
	///
	/// Packed nodes for a symbol or intermediate node, the left and right part for a packed node.
	#[must_use]
	pub fn children(&self, ix: SppfNodeIndex) -> Vec<SppfNodeIndex> {
		let mut children: Vec<SppfNodeIndex> = self.graph.neighbors_directed(ix, Direction::Outgoing).collect();
		// Petgraph iterates the adjacency list newest-first.
		children.reverse();
		children
	}

	/// The amount of nodes, packed nodes and the dummy node included.
	#[must_use]
	pub fn node_count(&self) -> usize {
		self.graph.node_count()
	}

	/// The amount of packed nodes.
	#[must_use]
	pub fn packed_count(&self) -> usize {
		self.packed.len()
	}

	/// The underlying graph.
	#[must_use]
	pub const fn graph(&self) -> &SppfGraph {
		&self.graph
	}

	/// Render the forest in graphviz format, `crop`ped to the nodes in `keep` if given.
	#[must_use]
	pub fn to_dot(&self, grammar: &Grammar, keep: Option<&[SppfNodeIndex]>) -> String {
		let graph = self.graph.filter_map(
			|ix, node| match keep {
				Some(keep) if !keep.contains(&ix) => None,
				_ => Some(node.to_string(grammar)),
			},
			|_, _| Some(String::new()),
		);
		format!("{}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
	}
}
