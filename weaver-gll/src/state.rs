use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexSet;
use itertools::Itertools;
use tracing::{debug, info, trace};

use crate::{
	config::{ParseConfig, Resource},
	descriptor::Descriptor,
	error::{GllError, GllResult, GrammarError, ParseFailure},
	filter,
	forest::ParseForest,
	grammar::{Grammar, Lookahead},
	gss::{Gss, GssNodeIndex},
	slot::{GrammarSlot, SlotId, SlotKind},
	sppf::{Sppf, SppfNode, SppfNodeIndex},
	token::{self, Token},
	NonterminalId, TerminalId,
};

/// Counters describing the size of a parse session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
	/// Nodes in the graph-structured stack.
	pub gss_nodes: usize,
	/// Edges in the graph-structured stack.
	pub gss_edges: usize,
	/// Nodes in the forest, packed nodes and the dummy node included.
	pub sppf_nodes: usize,
	/// Packed nodes in the forest.
	pub packed_nodes: usize,
	/// Distinct descriptors scheduled.
	pub descriptors: usize,
}

fn fatal(msg: impl Into<String>) -> GllError {
	GllError::Contract(GrammarError::Fatal(msg.into()))
}

/// The state object for a single GLL parse.
///
/// Holds the [`Gss`], the [`Sppf`] and the descriptor worklist, and implements the operations of the original
/// paper on top of them (`add`, `create`, `pop`, `getNodeP`). Descriptors are processed one input position at a
/// time, first-in first-out within a position. Once a position is done, nothing can be scheduled there again, so
/// its visited set is dropped.
///
/// Most users want [`Grammar::parse`] instead. Driving the state by hand gives access to the raw structures.
///
/// # Example
/// ```
/// use weaver_gll::{GllState, GrammarBuilder, ParseConfig, Token};
///
/// let mut builder = GrammarBuilder::new();
/// let s = builder.nonterminal("S");
/// let a = builder.terminal("a");
/// builder.alternative(s, [a.into()]);
/// let grammar = builder.build().unwrap();
///
/// let tokens = [Token::new(a, 0..1)];
/// let mut state = GllState::init(&grammar, s, &tokens, ParseConfig::default()).unwrap();
/// state.main().unwrap();
/// assert!(state.accepts());
/// assert_eq!(1, state.gss().node_count());
/// ```
#[derive(Debug)]
pub struct GllState<'g, 'i> {
	grammar: &'g Grammar,
	input: &'i [Token],
	config: ParseConfig,
	start: NonterminalId,
	// Main structures
	gss: Gss,
	sppf: Sppf,
	gss_root: GssNodeIndex,
	// Memoization
	todo: Vec<VecDeque<Descriptor>>, // R, one queue per input position
	visited: Vec<HashSet<Descriptor>>, // U, one set per input position
	pop: HashMap<GssNodeIndex, IndexSet<SppfNodeIndex>>, // P
	level: usize,
	// Diagnostics
	furthest: usize,
	expected: IndexSet<SlotId>,
	descriptors: usize,
}

impl<'g, 'i> GllState<'g, 'i> {
	/// Initialize the state: create the root GSS node for `start` at position 0 and schedule its alternatives.
	///
	/// # Errors
	/// Returns [`GllError::Contract`] if `start` is not part of `grammar`.
	pub fn init(grammar: &'g Grammar, start: NonterminalId, input: &'i [Token], config: ParseConfig) -> GllResult<Self> {
		if !grammar.contains(start) {
			return Err(GllError::Contract(GrammarError::UndefinedNonterminal(start.0)));
		}
		let mut gss = Gss::new();
		let (gss_root, _) = gss.get_or_create_node(start, 0);
		let levels = input.len() + 1;
		let mut state = Self {
			grammar,
			input,
			config,
			start,
			gss,
			sppf: Sppf::new(),
			gss_root,
			todo: vec![VecDeque::new(); levels],
			visited: vec![HashSet::new(); levels],
			pop: HashMap::new(),
			level: 0,
			furthest: 0,
			expected: IndexSet::new(),
			descriptors: 0,
		};
		debug!(start = grammar.nonterminal_name(start), tokens = input.len(), "starting parse");
		state.schedule_alternatives(start, gss_root, 0)?;
		Ok(state)
	}

	/// Process descriptors until there are none left.
	///
	/// # Errors
	/// Returns [`GllError::ResourceExhausted`] if a limit from the [`ParseConfig`] is hit, or
	/// [`GllError::Contract`] if the session finds itself in an impossible state.
	pub fn main(&mut self) -> GllResult<()> {
		while self.level < self.todo.len() {
			while let Some(descriptor) = self.todo[self.level].pop_front() {
				self.process(descriptor)?;
			}
			self.visited[self.level] = HashSet::new();
			debug!(level = self.level, gss_nodes = self.gss.node_count(), sppf_nodes = self.sppf.node_count(), "position drained");
			self.level += 1;
		}
		let stats = self.stats();
		info!(
			accepted = self.accepts(),
			gss_nodes = stats.gss_nodes,
			sppf_nodes = stats.sppf_nodes,
			descriptors = stats.descriptors,
			"parse finished"
		);
		Ok(())
	}

	/// The node of the start symbol spanning the whole input, if it exists.
	#[must_use]
	pub fn root(&self) -> Option<SppfNodeIndex> {
		self.sppf.find(&SppfNode::Symbol { nonterminal: self.start, left: 0, right: self.input.len() })
	}

	/// Whether the input was recognized.
	#[must_use]
	pub fn accepts(&self) -> bool {
		self.root().is_some()
	}

	/// Hand the forest over, or explain why there is none.
	///
	/// # Errors
	/// Returns [`GllError::NoParse`] if the input was not recognized.
	pub fn into_forest(self) -> GllResult<ParseForest<'g>> {
		match self.root() {
			Some(root) => {
				let stats = self.stats();
				Ok(ParseForest::new(self.grammar, self.sppf, root, stats))
			}
			None => Err(GllError::NoParse(self.failure())),
		}
	}

	/// The graph-structured stack built so far.
	#[must_use]
	pub const fn gss(&self) -> &Gss {
		&self.gss
	}

	/// The forest built so far.
	#[must_use]
	pub const fn sppf(&self) -> &Sppf {
		&self.sppf
	}

	/// Size counters of this session.
	#[must_use]
	pub fn stats(&self) -> ParseStats {
		ParseStats {
			gss_nodes: self.gss.node_count(),
			gss_edges: self.gss.edge_count(),
			sppf_nodes: self.sppf.node_count(),
			packed_nodes: self.sppf.packed_count(),
			descriptors: self.descriptors,
		}
	}

	/// Render the GSS in graphviz format.
	#[must_use]
	pub fn gss_dot(&self) -> String {
		self.gss.to_dot(self.grammar)
	}

	/// Render the full SPPF in graphviz format.
	#[must_use]
	pub fn sppf_dot(&self) -> String {
		self.sppf.to_dot(self.grammar, None)
	}

	/// Explain why the input was not recognized.
	#[must_use]
	pub fn failure(&self) -> ParseFailure {
		let grammar = self.grammar;
		let expected: Vec<SlotId> = self.expected.iter().copied().collect();
		let expected_terminals = expected
			.iter()
			.flat_map(|id| match grammar.slot(*id).map(GrammarSlot::kind) {
				Some(SlotKind::Terminal(t)) => vec![Lookahead::Terminal(t)],
				_ => grammar.test_set(*id).into_iter().flatten().copied().collect(),
			})
			.sorted()
			.dedup()
			.map(|la| grammar.lookahead_name(la).to_string())
			.collect();
		ParseFailure {
			position: self.furthest,
			expected,
			expected_terminals,
			found: self.input.get(self.furthest).map(|t| grammar.terminal_name(t.terminal).to_string()),
			span: token::span_at(self.input, self.furthest),
		}
	}

	fn slot(&self, id: SlotId) -> GllResult<&'g GrammarSlot> {
		self.grammar.slot(id).ok_or_else(|| fatal(format!("unknown slot {}", id.index())))
	}

	fn next_slot(&self, slot: &GrammarSlot) -> GllResult<&'g GrammarSlot> {
		let id = slot.next().ok_or_else(|| fatal(format!("no slot after {}", slot.to_string(self.grammar))))?;
		self.slot(id)
	}

	fn process(&mut self, descriptor: Descriptor) -> GllResult<()> {
		if descriptor.position > self.furthest {
			self.furthest = descriptor.position;
			self.expected.clear();
		}
		let slot = self.slot(descriptor.slot)?;
		trace!(slot = %slot.to_string(self.grammar), position = descriptor.position, "processing descriptor");
		match slot.kind() {
			SlotKind::Terminal(terminal) => self.match_terminal(slot, terminal, descriptor),
			SlotKind::Call(nonterminal) => self.call(slot, nonterminal, descriptor),
			SlotKind::End => self.complete(slot, descriptor),
		}
	}

	fn expect(&mut self, position: usize, slot: SlotId) {
		trace!(slot = %self.grammar.slot(slot).map(|s| s.to_string(self.grammar)).unwrap_or_default(), position, "expected input not found");
		if position == self.furthest {
			self.expected.insert(slot);
		}
	}

	fn match_terminal(&mut self, slot: &'g GrammarSlot, terminal: TerminalId, descriptor: Descriptor) -> GllResult<()> {
		let Descriptor { gss, position, sppf, .. } = descriptor;
		let restrictions = self.grammar.restrictions(slot.id());
		if !filter::precede_allowed(restrictions, self.input, position) {
			debug!(slot = %slot.to_string(self.grammar), position, "precede restriction rejected terminal");
			return Ok(());
		}
		if token::lookahead(self.input, position) != Lookahead::Terminal(terminal) {
			self.expect(position, slot.id());
			return Ok(());
		}
		if !filter::follow_allowed(restrictions, self.input, position, position + 1) {
			debug!(slot = %slot.to_string(self.grammar), position, "follow restriction rejected terminal");
			return Ok(());
		}
		let right = self.sppf.terminal_node(terminal, position);
		let next = self.next_slot(slot)?;
		let node = self.sppf.get_node_p(next, sppf, right)?;
		self.add(next.id(), gss, position + 1, node)
	}

	fn call(&mut self, slot: &'g GrammarSlot, nonterminal: NonterminalId, descriptor: Descriptor) -> GllResult<()> {
		let Descriptor { gss, position, sppf, .. } = descriptor;
		if !filter::precede_allowed(self.grammar.restrictions(slot.id()), self.input, position) {
			debug!(slot = %slot.to_string(self.grammar), position, "precede restriction rejected call");
			return Ok(());
		}
		if self.config.lookahead && !self.grammar.accepts(slot.id(), token::lookahead(self.input, position)) {
			self.expect(position, slot.id());
			return Ok(());
		}
		let next = self.next_slot(slot)?;
		self.create(next.id(), nonterminal, gss, position, sppf)
	}

	fn complete(&mut self, slot: &'g GrammarSlot, descriptor: Descriptor) -> GllResult<()> {
		let Descriptor { gss, position, sppf, .. } = descriptor;
		let node = if slot.dot == 0 {
			let epsilon = self.sppf.epsilon_node(position);
			self.sppf.get_node_p(slot, sppf, epsilon)?
		} else {
			sppf
		};
		if gss == self.gss_root && position < self.input.len() {
			// The start symbol is done but input remains.
			self.expect(position, slot.id());
		}
		self.pop(gss, node)
	}

	/// Schedule every alternative of `nonterminal` at `position` for the new GSS node `node`.
	fn schedule_alternatives(&mut self, nonterminal: NonterminalId, node: GssNodeIndex, position: usize) -> GllResult<()> {
		let grammar = self.grammar;
		let lookahead = token::lookahead(self.input, position);
		let dummy = self.sppf.dummy();
		for alternative in grammar.alternatives(nonterminal) {
			if self.config.lookahead && !grammar.accepts(*alternative, lookahead) {
				debug!(alternative = %grammar.slot(*alternative).map(|s| s.to_string(grammar)).unwrap_or_default(), position, "lookahead pruned alternative");
				self.expect(position, *alternative);
				continue;
			}
			self.add(*alternative, node, position, dummy)?;
		}
		Ok(())
	}

	/// Call `nonterminal` at `position` from `caller`, to continue at `slot` once it returns.
	///
	/// This is the `create` method in the original paper. The arguments map as follows:
	/// * `L` => `slot`.
	/// * `u` => `caller`.
	/// * `i` => `position`.
	/// * `w` => `parsed`.
	fn create(&mut self, slot: SlotId, nonterminal: NonterminalId, caller: GssNodeIndex, position: usize, parsed: SppfNodeIndex) -> GllResult<()> {
		let (node, created) = self.gss.get_or_create_node(nonterminal, position);
		if created {
			trace!(nonterminal = self.grammar.nonterminal_name(nonterminal), position, "new GSS node");
			self.schedule_alternatives(nonterminal, node, position)?;
		}
		let (_, new_edge) = self.gss.add_edge(node, slot, caller, parsed);
		if new_edge {
			// The callee may already have returned before this caller showed up.
			let popped: Vec<SppfNodeIndex> = self.pop.get(&node).map(|set| set.iter().copied().collect()).unwrap_or_default();
			for result in popped {
				self.return_to(slot, caller, parsed, result)?;
			}
		}
		self.check_resources()
	}

	/// Return `result` from the call `node` to all its callers.
	fn pop(&mut self, node: GssNodeIndex, result: SppfNodeIndex) -> GllResult<()> {
		if !self.pop.entry(node).or_default().insert(result) {
			return Ok(());
		}
		for (edge, caller) in self.gss.edges_of(node) {
			self.return_to(edge.slot, caller, edge.sppf, result)?;
		}
		Ok(())
	}

	/// Continue the caller `caller` at `slot` after the callee produced `result`.
	///
	/// Follow and exclude restrictions of the call are checked here, before anything new enters the forest.
	fn return_to(&mut self, slot: SlotId, caller: GssNodeIndex, parsed: SppfNodeIndex, result: SppfNodeIndex) -> GllResult<()> {
		let slot = self.slot(slot)?;
		let call = slot.prev().ok_or_else(|| fatal(format!("return into {}", slot.to_string(self.grammar))))?;
		let (left, right) = self.sppf.extents(result)?;
		if !filter::follow_allowed(self.grammar.restrictions(call), self.input, left, right) {
			debug!(slot = %slot.to_string(self.grammar), left, right, "follow restriction rejected return");
			return Ok(());
		}
		let node = self.sppf.get_node_p(slot, parsed, result)?;
		self.add(slot.id(), caller, right, node)
	}

	/// Schedule a descriptor, unless it was scheduled before.
	fn add(&mut self, slot: SlotId, gss: GssNodeIndex, position: usize, sppf: SppfNodeIndex) -> GllResult<()> {
		let descriptor = Descriptor::new(slot, gss, position, sppf);
		let visited = self.visited.get_mut(position).ok_or_else(|| fatal(format!("descriptor at {position} is past the end of the input")))?;
		if visited.insert(descriptor) {
			self.descriptors += 1;
			self.config.check(Resource::Descriptors, self.descriptors)?;
			self.todo[position].push_back(descriptor);
		}
		self.check_resources()
	}

	fn check_resources(&self) -> GllResult<()> {
		self.config.check(Resource::GssNodes, self.gss.node_count())?;
		self.config.check(Resource::SppfNodes, self.sppf.node_count())
	}
}
