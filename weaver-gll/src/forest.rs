use std::collections::HashMap;

use petgraph::visit::Dfs;
use thiserror::Error;

use crate::{
	grammar::Grammar,
	sppf::{Sppf, SppfNode, SppfNodeIndex},
	state::ParseStats,
	NonterminalId, TerminalId,
};

/// Everything that can go wrong while reading a single derivation out of a forest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForestError {
	/// An [`AmbiguityPolicy`] refused to pick between derivations.
	#[error("ambiguous derivation at {0}")]
	Ambiguous(String),
	/// Every remaining derivation loops back into itself.
	#[error("cyclic derivation through {0}")]
	Cyclic(String),
	/// The forest does not have the expected shape.
	#[error("malformed forest: {0}")]
	Malformed(String),
}

/// Result type for forest traversals.
pub type ForestResult<T> = Result<T, ForestError>;

/// Decides which derivation to keep where the forest is ambiguous.
///
/// The engine itself never drops derivations. Policies only come into play when a single tree is read out of the
/// forest with [`ParseForest::derivation`].
pub trait AmbiguityPolicy {
	/// Order `candidates`, the packed children of the ambiguous `node`, from most to least preferred.
	///
	/// Candidates left out are never used. If the preferred candidate turns out to be cyclic the next one is tried.
	///
	/// # Errors
	/// Return an error to abort the extraction altogether.
	fn rank(&self, forest: &ParseForest<'_>, node: SppfNodeIndex, candidates: Vec<SppfNodeIndex>) -> ForestResult<Vec<SppfNodeIndex>>;
}

/// Prefer the alternative declared first, then the one with the shortest left part.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlternativeOrder;

impl AmbiguityPolicy for AlternativeOrder {
	fn rank(&self, forest: &ParseForest<'_>, _node: SppfNodeIndex, mut candidates: Vec<SppfNodeIndex>) -> ForestResult<Vec<SppfNodeIndex>> {
		candidates.sort_by_key(|packed| match forest.node(*packed) {
			Some(SppfNode::Packed { slot, pivot }) => (forest.grammar.slot(*slot).map_or(usize::MAX, |s| s.alternative), *pivot),
			_ => (usize::MAX, usize::MAX),
		});
		Ok(candidates)
	}
}

/// Refuse any ambiguity.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectAmbiguity;

impl AmbiguityPolicy for RejectAmbiguity {
	fn rank(&self, forest: &ParseForest<'_>, node: SppfNodeIndex, candidates: Vec<SppfNodeIndex>) -> ForestResult<Vec<SppfNodeIndex>> {
		if candidates.len() > 1 {
			Err(ForestError::Ambiguous(forest.label(node)))
		} else {
			Ok(candidates)
		}
	}
}

/// A single parse tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Derivation {
	/// A nonterminal, derived with one of its alternatives.
	Node {
		/// The derived nonterminal.
		nonterminal: NonterminalId,
		/// Which alternative was used.
		alternative: usize,
		/// Start of the span.
		left: usize,
		/// End of the span.
		right: usize,
		/// One entry per terminal or nonterminal of the alternative.
		children: Vec<Derivation>,
	},
	/// A token.
	Token {
		/// The matched terminal.
		terminal: TerminalId,
		/// The position of the token.
		position: usize,
	},
}

impl Derivation {
	/// An s-expression for this tree, e.g. `(E (E num) + num)`.
	#[must_use]
	pub fn to_string(&self, grammar: &Grammar) -> String {
		match self {
			Self::Token { terminal, .. } => grammar.terminal_name(*terminal).to_string(),
			Self::Node { nonterminal, children, .. } => {
				let mut res = format!("({}", grammar.nonterminal_name(*nonterminal));
				for child in children {
					res.push(' ');
					res.push_str(&child.to_string(grammar));
				}
				res.push(')');
				res
			}
		}
	}
}

/// The result of a successful parse: every derivation of the input, shared and packed.
///
/// The forest borrows the [`Grammar`] it was built with to give nodes their names.
#[derive(Debug)]
pub struct ParseForest<'g> {
	grammar: &'g Grammar,
	sppf: Sppf,
	root: SppfNodeIndex,
	stats: ParseStats,
}

impl<'g> ParseForest<'g> {
	pub(crate) const fn new(grammar: &'g Grammar, sppf: Sppf, root: SppfNodeIndex, stats: ParseStats) -> Self {
		Self { grammar, sppf, root, stats }
	}

	/// The symbol node of the start nonterminal spanning the whole input.
	#[must_use]
	pub const fn root(&self) -> SppfNodeIndex {
		self.root
	}

	/// The grammar this forest was parsed with.
	#[must_use]
	pub const fn grammar(&self) -> &'g Grammar {
		self.grammar
	}

	/// The raw forest.
	#[must_use]
	pub const fn sppf(&self) -> &Sppf {
		&self.sppf
	}

	/// Size counters of the session that built this forest.
	#[must_use]
	pub const fn stats(&self) -> ParseStats {
		self.stats
	}

	/// Get the data of a node.
	#[must_use]
	pub fn node(&self, ix: SppfNodeIndex) -> Option<&SppfNode> {
		self.sppf.node(ix)
	}

	/// The children of a node, in order.
	#[must_use]
	pub fn children(&self, ix: SppfNodeIndex) -> Vec<SppfNodeIndex> {
		self.sppf.children(ix)
	}

	/// The span of a node. Packed nodes take the span of their children.
	#[must_use]
	pub fn extents(&self, ix: SppfNodeIndex) -> Option<(usize, usize)> {
		match self.node(ix)? {
			SppfNode::Packed { .. } => {
				let children = self.children(ix);
				let left = self.node(*children.first()?)?.left_extent()?;
				let right = self.node(*children.last()?)?.right_extent()?;
				Some((left, right))
			}
			node => node.left_extent().zip(node.right_extent()),
		}
	}

	/// A human readable label for a node.
	#[must_use]
	pub fn label(&self, ix: SppfNodeIndex) -> String {
		self.node(ix).map(|node| node.to_string(self.grammar)).unwrap_or_default()
	}

	/// All nodes reachable from the root, in depth-first order.
	#[must_use]
	pub fn reachable(&self) -> Vec<SppfNodeIndex> {
		let graph = self.sppf.graph();
		let mut dfs = Dfs::new(graph, self.root);
		let mut res = Vec::new();
		while let Some(ix) = dfs.next(graph) {
			res.push(ix);
		}
		res
	}

	/// Reachable symbol and intermediate nodes with more than one packed child.
	#[must_use]
	pub fn ambiguous_nodes(&self) -> Vec<SppfNodeIndex> {
		self.reachable()
			.into_iter()
			.filter(|ix| matches!(self.node(*ix), Some(SppfNode::Symbol { .. } | SppfNode::Intermediate { .. })) && self.children(*ix).len() > 1)
			.collect()
	}

	/// Whether the input has more than one derivation.
	#[must_use]
	pub fn is_ambiguous(&self) -> bool {
		!self.ambiguous_nodes().is_empty()
	}

	/// The number of distinct derivations of the input.
	///
	/// `None` if the forest is cyclic, in which case there are infinitely many. Saturates at [`u128::MAX`].
	#[must_use]
	pub fn derivation_count(&self) -> Option<u128> {
		self.count(self.root, &mut HashMap::new())
	}

	/// Entries in `memo` are `None` while their node is being counted.
	fn count(&self, ix: SppfNodeIndex, memo: &mut HashMap<SppfNodeIndex, Option<u128>>) -> Option<u128> {
		if let Some(known) = memo.get(&ix) {
			return *known;
		}
		memo.insert(ix, None);
		let count = match self.node(ix)? {
			SppfNode::Dummy | SppfNode::Terminal { .. } | SppfNode::Epsilon { .. } => 1,
			SppfNode::Packed { .. } => {
				let mut product: u128 = 1;
				for child in self.children(ix) {
					product = product.saturating_mul(self.count(child, memo)?);
				}
				product
			}
			SppfNode::Symbol { .. } | SppfNode::Intermediate { .. } => {
				let mut sum: u128 = 0;
				for child in self.children(ix) {
					sum = sum.saturating_add(self.count(child, memo)?);
				}
				sum
			}
		};
		memo.insert(ix, Some(count));
		Some(count)
	}

	/// Read a single parse tree out of the forest, resolving ambiguity with `policy`.
	///
	/// Cyclic derivations are skipped, so a cyclic forest still yields a tree as long as it has a finite one.
	///
	/// # Errors
	/// Returns [`ForestError::Ambiguous`] if the policy refuses, or [`ForestError::Cyclic`] if every derivation is
	/// infinite.
	pub fn derivation(&self, policy: &impl AmbiguityPolicy) -> ForestResult<Derivation> {
		self.build_symbol(self.root, policy, &mut Vec::new())
	}

	fn build_symbol(&self, ix: SppfNodeIndex, policy: &impl AmbiguityPolicy, path: &mut Vec<SppfNodeIndex>) -> ForestResult<Derivation> {
		let Some(SppfNode::Symbol { nonterminal, left, right }) = self.node(ix).copied() else {
			return Err(ForestError::Malformed(format!("{} is not a symbol node", self.label(ix))));
		};
		let mut children = Vec::new();
		let packed = self.choose(ix, policy, path, &mut children)?;
		let alternative = match self.node(packed) {
			Some(SppfNode::Packed { slot, .. }) => self.grammar.slot(*slot).map_or(0, |s| s.alternative),
			_ => 0,
		};
		Ok(Derivation::Node { nonterminal, alternative, left, right, children })
	}

	/// Expand the first acceptable packed child of `ix` into `out`. Returns the packed node that was used.
	fn choose(&self, ix: SppfNodeIndex, policy: &impl AmbiguityPolicy, path: &mut Vec<SppfNodeIndex>, out: &mut Vec<Derivation>) -> ForestResult<SppfNodeIndex> {
		if path.contains(&ix) {
			return Err(ForestError::Cyclic(self.label(ix)));
		}
		let mut candidates = self.children(ix);
		if candidates.len() > 1 {
			candidates = policy.rank(self, ix, candidates)?;
		}
		path.push(ix);
		let mark = out.len();
		let mut result = Err(ForestError::Malformed(format!("{} has no usable derivation", self.label(ix))));
		for packed in candidates {
			match self.expand_packed(packed, policy, path, out) {
				Ok(()) => {
					result = Ok(packed);
					break;
				}
				Err(err @ ForestError::Cyclic(_)) => {
					out.truncate(mark);
					result = Err(err);
				}
				Err(err) => {
					result = Err(err);
					break;
				}
			}
		}
		path.pop();
		result
	}

	fn expand_packed(&self, packed: SppfNodeIndex, policy: &impl AmbiguityPolicy, path: &mut Vec<SppfNodeIndex>, out: &mut Vec<Derivation>) -> ForestResult<()> {
		for child in self.children(packed) {
			match self.node(child).copied() {
				Some(SppfNode::Terminal { terminal, left, .. }) => out.push(Derivation::Token { terminal, position: left }),
				Some(SppfNode::Epsilon { .. }) => {}
				Some(SppfNode::Symbol { .. }) => out.push(self.build_symbol(child, policy, path)?),
				Some(SppfNode::Intermediate { .. }) => {
					self.choose(child, policy, path, out)?;
				}
				_ => return Err(ForestError::Malformed(format!("unexpected child {} of a packed node", self.label(child)))),
			}
		}
		Ok(())
	}

	/// Render the forest in graphviz format. With `crop`, only the nodes reachable from the root are shown.
	#[must_use]
	pub fn to_dot(&self, crop: bool) -> String {
		let reachable = if crop { Some(self.reachable()) } else { None };
		self.sppf.to_dot(self.grammar, reachable.as_deref())
	}
}
