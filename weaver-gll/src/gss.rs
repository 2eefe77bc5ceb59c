use std::collections::HashMap;

use petgraph::{
	dot::Dot,
	graph::{DefaultIx, EdgeIndex, NodeIndex},
	visit::EdgeRef,
	Directed, Direction, Graph,
};

use crate::{grammar::Grammar, slot::SlotId, sppf::SppfNodeIndex, NonterminalId};

/// GSS nodes are stored in a petgraph arena, references are stored as integers.
pub type GssNodeIndex = NodeIndex<GssIx>;
/// Index of an edge in the GSS.
pub type GssEdgeIndex = EdgeIndex<GssIx>;

type GssIx = DefaultIx;

/// A call of `nonterminal` at input `position`.
///
/// Every call of the same nonterminal at the same position shares this single node. That sharing is what keeps
/// left recursion from looping: the second call finds the node already there and only adds an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GssNode {
	/// The called nonterminal.
	pub nonterminal: NonterminalId,
	/// Where in the input it was called.
	pub position: usize,
}

/// An edge from a callee back to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GssEdge {
	/// The slot to continue at in the caller once the callee returns.
	pub slot: SlotId,
	/// The SPPF node of what the caller had parsed before making the call.
	pub sppf: SppfNodeIndex,
}

/// The graph itself.
pub type GssGraph = Graph<GssNode, GssEdge, Directed, GssIx>;

/// The graph-structured stack.
///
/// Nodes and edges are never removed. Both are deduplicated: at most one node per `(nonterminal, position)` and at
/// most one edge per `(callee, return slot, caller)`. The SPPF node on an edge is fully determined by those three,
/// so it does not take part in edge identity.
#[derive(Debug, Default)]
pub struct Gss {
	graph: GssGraph,
	nodes: HashMap<GssNode, GssNodeIndex>,
	edges: HashMap<(GssNodeIndex, SlotId, GssNodeIndex), GssEdgeIndex>,
}

impl Gss {
	/// An empty stack.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Get the node for `nonterminal` at `position`, creating it if needed. Also returns whether it was created.
	pub fn get_or_create_node(&mut self, nonterminal: NonterminalId, position: usize) -> (GssNodeIndex, bool) {
		let node = GssNode { nonterminal, position };
		if let Some(ix) = self.nodes.get(&node) {
			(*ix, false)
		} else {
			let ix = self.graph.add_node(node);
			self.nodes.insert(node, ix);
			(ix, true)
		}
	}

	/// Look up the node for `nonterminal` at `position`.
	#[must_use]
	pub fn find(&self, nonterminal: NonterminalId, position: usize) -> Option<GssNodeIndex> {
		self.nodes.get(&GssNode { nonterminal, position }).copied()
	}

	/// Add an edge `node -> predecessor`, labelled with `slot` and `sppf`. Also returns whether it was created.
	pub fn add_edge(&mut self, node: GssNodeIndex, slot: SlotId, predecessor: GssNodeIndex, sppf: SppfNodeIndex) -> (GssEdgeIndex, bool) {
		let key = (node, slot, predecessor);
		if let Some(ix) = self.edges.get(&key) {
			(*ix, false)
		} else {
			let ix = self.graph.add_edge(node, predecessor, GssEdge { slot, sppf });
			self.edges.insert(key, ix);
			(ix, true)
		}
	}

	/// All outgoing edges of `node` with their targets, in the order they were added.
	#[must_use]
	pub fn edges_of(&self, node: GssNodeIndex) -> Vec<(GssEdge, GssNodeIndex)> {
		// Petgraph iterates the adjacency list newest-first.
		let mut edges: Vec<(GssEdge, GssNodeIndex)> = self.graph.edges_directed(node, Direction::Outgoing).map(|e| (*e.weight(), e.target())).collect();
		edges.reverse();
		edges
	}

	/// Get the data of a node.
	#[must_use]
	pub fn node(&self, ix: GssNodeIndex) -> Option<&GssNode> {
		self.graph.node_weight(ix)
	}

	/// The amount of nodes.
	#[must_use]
	pub fn node_count(&self) -> usize {
		self.graph.node_count()
	}

	/// The amount of edges.
	#[must_use]
	pub fn edge_count(&self) -> usize {
		self.graph.edge_count()
	}

	/// The underlying graph.
	#[must_use]
	pub const fn graph(&self) -> &GssGraph {
		&self.graph
	}

	/// Render the stack in graphviz format.
	#[must_use]
	pub fn to_dot(&self, grammar: &Grammar) -> String {
		let graph = self.graph.map(
			|_, node| format!("({},{})", grammar.nonterminal_name(node.nonterminal), node.position),
			|_, edge| grammar.slot(edge.slot).map(|slot| slot.to_string(grammar)).unwrap_or_default(),
		);
		format!("{}", Dot::new(&graph))
	}
}
