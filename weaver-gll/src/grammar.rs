use std::collections::HashSet;

use indexmap::IndexSet;
use tracing::debug;

use crate::{
	config::ParseConfig,
	error::{GllResult, GrammarError},
	filter::Restriction,
	forest::ParseForest,
	slot::{GrammarSlot, SlotId, SlotKind},
	state::GllState,
	token::Token,
	NonterminalId, Symbol, TerminalId,
};

mod analysis;

/// Alternatives per nonterminal, each a sequence of symbols.
pub(crate) type Rules = Vec<Vec<Vec<Symbol>>>;

/// What the parser sees when it peeks at the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lookahead {
	/// A token of this terminal.
	Terminal(TerminalId),
	/// The end of the input.
	End,
}

/// Incrementally declare a [`Grammar`].
///
/// Terminals and nonterminals are interned by name: declaring the same name twice returns the same id.
/// Nothing is checked until [`GrammarBuilder::build`].
#[derive(Debug, Default)]
pub struct GrammarBuilder {
	terminals: IndexSet<String>,
	nonterminals: IndexSet<String>,
	alternatives: Vec<(NonterminalId, Vec<Symbol>)>,
	restrictions: Vec<(NonterminalId, usize, usize, Restriction)>,
}

impl GrammarBuilder {
	/// Start with an empty grammar.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Declare (or look up) a terminal.
	pub fn terminal(&mut self, name: &str) -> TerminalId {
		TerminalId(self.terminals.insert_full(name.to_owned()).0)
	}

	/// Declare (or look up) a nonterminal.
	pub fn nonterminal(&mut self, name: &str) -> NonterminalId {
		NonterminalId(self.nonterminals.insert_full(name.to_owned()).0)
	}

	/// Add an alternative to `nonterminal`. Returns the index of the new alternative.
	///
	/// An empty `symbols` is an epsilon alternative.
	pub fn alternative(&mut self, nonterminal: NonterminalId, symbols: impl IntoIterator<Item = Symbol>) -> usize {
		let index = self.alternatives.iter().filter(|(nt, _)| *nt == nonterminal).count();
		self.alternatives.push((nonterminal, symbols.into_iter().collect()));
		index
	}

	/// Attach a restriction to the symbol at `position` of alternative `alternative` of `nonterminal`.
	///
	/// `position` is the index of the restricted symbol, i.e. the dot of the slot in front of it.
	pub fn restrict(&mut self, nonterminal: NonterminalId, alternative: usize, position: usize, restriction: Restriction) -> &mut Self {
		self.restrictions.push((nonterminal, alternative, position, restriction));
		self
	}

	/// Validate the grammar and precompute everything the engine needs.
	///
	/// # Errors
	/// Returns a [`GrammarError`] if an id from another builder is used, a nonterminal has no alternatives,
	/// or a restriction is attached somewhere it can never apply.
	pub fn build(self) -> Result<Grammar, GrammarError> {
		let mut rules: Rules = vec![Vec::new(); self.nonterminals.len()];
		for (nt, symbols) in self.alternatives {
			for symbol in &symbols {
				match symbol {
					Symbol::Terminal(t) if t.0 >= self.terminals.len() => return Err(GrammarError::UndefinedTerminal(t.0)),
					Symbol::Nonterminal(n) if n.0 >= self.nonterminals.len() => return Err(GrammarError::UndefinedNonterminal(n.0)),
					_ => {}
				}
			}
			rules.get_mut(nt.0).ok_or(GrammarError::UndefinedNonterminal(nt.0))?.push(symbols);
		}
		let nonterminals: Vec<String> = self.nonterminals.into_iter().collect();
		let terminals: Vec<String> = self.terminals.into_iter().collect();
		if let Some(nt) = rules.iter().position(Vec::is_empty) {
			return Err(GrammarError::NoAlternatives(nonterminals[nt].clone()));
		}

		let nullable = analysis::nullables(&rules);
		let first = analysis::first_sets(&rules, &nullable);
		let follow = analysis::follow_sets(&rules, &first, &nullable);

		let mut slots = Vec::new();
		let mut alternative_slots = Vec::with_capacity(rules.len());
		let mut test_sets = Vec::new();
		for (nt, alts) in rules.iter().enumerate() {
			let mut starts = Vec::with_capacity(alts.len());
			for (alt, symbols) in alts.iter().enumerate() {
				starts.push(SlotId(slots.len()));
				for dot in 0..=symbols.len() {
					let kind = match symbols.get(dot) {
						Some(Symbol::Terminal(t)) => SlotKind::Terminal(*t),
						Some(Symbol::Nonterminal(n)) => SlotKind::Call(*n),
						None => SlotKind::End,
					};
					let alpha_special = dot == 1
						&& match symbols[0] {
							Symbol::Terminal(_) => true,
							Symbol::Nonterminal(n) => !nullable[n.0],
						};
					slots.push(GrammarSlot::new(SlotId(slots.len()), NonterminalId(nt), alt, dot, kind, alpha_special));

					let rest = &symbols[dot..];
					let mut test: HashSet<Lookahead> = analysis::sequence_first(rest, &first, &nullable).into_iter().map(Lookahead::Terminal).collect();
					if analysis::sequence_nullable(rest, &nullable) {
						test.extend(follow[nt].iter().copied());
					}
					test_sets.push(test);
				}
			}
			alternative_slots.push(starts);
		}

		let mut restrictions = vec![Vec::new(); slots.len()];
		for (nt, alt, position, restriction) in self.restrictions {
			let name = || nonterminals.get(nt.0).cloned().unwrap_or_default();
			let length = rules.get(nt.0).ok_or(GrammarError::UndefinedNonterminal(nt.0))?.get(alt).map(Vec::len);
			let start = match (length, alternative_slots[nt.0].get(alt)) {
				(Some(length), Some(start)) if position < length => *start,
				_ => return Err(GrammarError::InvalidRestrictionSlot { nonterminal: name(), alternative: alt, position }),
			};
			for seq in restriction.sequences() {
				if seq.is_empty() {
					return Err(GrammarError::EmptyRestriction { nonterminal: name(), alternative: alt, position });
				}
				if let Some(t) = seq.iter().find(|t| t.0 >= terminals.len()) {
					return Err(GrammarError::UndefinedTerminal(t.0));
				}
			}
			restrictions[start.0 + position].push(restriction);
		}

		debug!(nonterminals = nonterminals.len(), terminals = terminals.len(), slots = slots.len(), "built grammar");
		Ok(Grammar { terminals, nonterminals, rules, slots, alternative_slots, restrictions, nullable, first, follow, test_sets })
	}
}

/// A validated context-free grammar, elaborated into [`GrammarSlot`]s.
///
/// Immutable once built. A single grammar can drive any amount of parses.
#[derive(Debug, Clone)]
pub struct Grammar {
	terminals: Vec<String>,
	nonterminals: Vec<String>,
	rules: Rules,
	slots: Vec<GrammarSlot>,
	alternative_slots: Vec<Vec<SlotId>>,
	restrictions: Vec<Vec<Restriction>>,
	nullable: Vec<bool>,
	first: Vec<HashSet<TerminalId>>,
	follow: Vec<HashSet<Lookahead>>,
	test_sets: Vec<HashSet<Lookahead>>,
}

impl Grammar {
	/// Parse `tokens` as a `start`, with the default [`ParseConfig`].
	///
	/// # Errors
	/// * [`GllError::NoParse`](crate::GllError::NoParse) if the input is not in the language.
	/// * [`GllError::Contract`](crate::GllError::Contract) if `start` is not part of this grammar.
	pub fn parse(&self, start: NonterminalId, tokens: &[Token]) -> GllResult<ParseForest<'_>> {
		self.parse_with_config(start, tokens, ParseConfig::default())
	}

	/// Parse `tokens` as a `start`.
	///
	/// # Errors
	/// As [`Grammar::parse`], and additionally [`GllError::ResourceExhausted`](crate::GllError::ResourceExhausted)
	/// if the session grows past a limit in `config`.
	pub fn parse_with_config(&self, start: NonterminalId, tokens: &[Token], config: ParseConfig) -> GllResult<ParseForest<'_>> {
		let mut state = GllState::init(self, start, tokens, config)?;
		state.main()?;
		state.into_forest()
	}

	/// Look up a terminal by name.
	#[must_use]
	pub fn terminal_id(&self, name: &str) -> Option<TerminalId> {
		self.terminals.iter().position(|t| t == name).map(TerminalId)
	}

	/// Look up a nonterminal by name.
	#[must_use]
	pub fn nonterminal_id(&self, name: &str) -> Option<NonterminalId> {
		self.nonterminals.iter().position(|n| n == name).map(NonterminalId)
	}

	/// The name of a terminal. Ids from another grammar get `"?"`.
	#[must_use]
	pub fn terminal_name(&self, terminal: TerminalId) -> &str {
		self.terminals.get(terminal.0).map_or("?", String::as_str)
	}

	/// The name of a nonterminal. Ids from another grammar get `"?"`.
	#[must_use]
	pub fn nonterminal_name(&self, nonterminal: NonterminalId) -> &str {
		self.nonterminals.get(nonterminal.0).map_or("?", String::as_str)
	}

	/// The name of any symbol.
	#[must_use]
	pub fn symbol_name(&self, symbol: Symbol) -> &str {
		match symbol {
			Symbol::Terminal(t) => self.terminal_name(t),
			Symbol::Nonterminal(n) => self.nonterminal_name(n),
		}
	}

	/// The name of whatever a lookahead sees.
	#[must_use]
	pub fn lookahead_name(&self, lookahead: Lookahead) -> &str {
		match lookahead {
			Lookahead::Terminal(t) => self.terminal_name(t),
			Lookahead::End => "end of input",
		}
	}

	/// The amount of terminals.
	#[must_use]
	pub fn terminal_count(&self) -> usize {
		self.terminals.len()
	}

	/// The amount of nonterminals.
	#[must_use]
	pub fn nonterminal_count(&self) -> usize {
		self.nonterminals.len()
	}

	/// Whether `nonterminal` belongs to this grammar.
	#[must_use]
	pub fn contains(&self, nonterminal: NonterminalId) -> bool {
		nonterminal.0 < self.nonterminals.len()
	}

	/// The symbols of an alternative. Empty for unknown alternatives.
	#[must_use]
	pub fn rule(&self, nonterminal: NonterminalId, alternative: usize) -> &[Symbol] {
		self.rules.get(nonterminal.0).and_then(|alts| alts.get(alternative)).map(Vec::as_slice).unwrap_or_default()
	}

	/// Get a slot by id.
	#[must_use]
	pub fn slot(&self, id: SlotId) -> Option<&GrammarSlot> {
		self.slots.get(id.0)
	}

	/// All slots of this grammar.
	#[must_use]
	pub fn slots(&self) -> &[GrammarSlot] {
		&self.slots
	}

	/// The initial slot (dot at 0) of each alternative of `nonterminal`, in declaration order.
	#[must_use]
	pub fn alternatives(&self, nonterminal: NonterminalId) -> &[SlotId] {
		self.alternative_slots.get(nonterminal.0).map(Vec::as_slice).unwrap_or_default()
	}

	/// The restrictions attached to `slot`.
	#[must_use]
	pub fn restrictions(&self, slot: SlotId) -> &[Restriction] {
		self.restrictions.get(slot.0).map(Vec::as_slice).unwrap_or_default()
	}

	/// Whether `nonterminal` derives the empty string.
	#[must_use]
	pub fn is_nullable(&self, nonterminal: NonterminalId) -> bool {
		self.nullable.get(nonterminal.0).copied().unwrap_or(false)
	}

	/// The terminals that can start a derivation of `nonterminal`.
	#[must_use]
	pub fn first(&self, nonterminal: NonterminalId) -> Option<&HashSet<TerminalId>> {
		self.first.get(nonterminal.0)
	}

	/// What can come after `nonterminal`. Always contains [`Lookahead::End`].
	#[must_use]
	pub fn follow(&self, nonterminal: NonterminalId) -> Option<&HashSet<Lookahead>> {
		self.follow.get(nonterminal.0)
	}

	/// The lookahead test set of a slot `A -> α • β`: FIRST(β), plus FOLLOW(A) if β is nullable.
	#[must_use]
	pub fn test_set(&self, slot: SlotId) -> Option<&HashSet<Lookahead>> {
		self.test_sets.get(slot.0)
	}

	/// Whether `lookahead` passes the test set of `slot`.
	#[must_use]
	pub fn accepts(&self, slot: SlotId, lookahead: Lookahead) -> bool {
		self.test_set(slot).is_some_and(|set| set.contains(&lookahead))
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashSet;

	use super::{GrammarBuilder, Lookahead};
	use crate::{GrammarError, NonterminalId, Restriction, SlotKind, Symbol, TerminalId};
	use pretty_assertions::assert_eq;

	#[test]
	fn test_interning() {
		let mut builder = GrammarBuilder::new();
		let a = builder.terminal("a");
		assert_eq!(a, builder.terminal("a"));
		let s = builder.nonterminal("S");
		assert_eq!(s, builder.nonterminal("S"));
		assert_eq!(0, builder.alternative(s, [a.into()]));
		assert_eq!(1, builder.alternative(s, []));
		let grammar = builder.build().unwrap();
		assert_eq!(Some(a), grammar.terminal_id("a"));
		assert_eq!(Some(s), grammar.nonterminal_id("S"));
		assert_eq!(None, grammar.terminal_id("S"));
		assert_eq!("a", grammar.terminal_name(a));
		assert_eq!("?", grammar.terminal_name(TerminalId(12)));
	}

	#[test]
	fn test_slot_elaboration() {
		let mut builder = GrammarBuilder::new();
		let s = builder.nonterminal("S");
		let a = builder.nonterminal("A");
		let x = builder.terminal("x");
		builder.alternative(s, [Symbol::from(a), x.into()]);
		builder.alternative(a, []);
		let grammar = builder.build().unwrap();

		assert_eq!(4, grammar.slots().len());
		let kinds: Vec<SlotKind> = grammar.slots().iter().map(|s| s.kind()).collect();
		assert_eq!(vec![SlotKind::Call(a), SlotKind::Terminal(x), SlotKind::End, SlotKind::End], kinds);
		// A is nullable, so `S -> A • x` needs an intermediate node.
		assert!(!grammar.slots()[1].is_alpha_special());
		assert!(grammar.is_nullable(a));
		assert!(!grammar.is_nullable(s));
		assert_eq!(1, grammar.alternatives(s).len());
		assert_eq!(3, grammar.alternatives(a)[0].index());
	}

	#[test]
	fn test_test_sets() {
		let mut builder = GrammarBuilder::new();
		let s = builder.nonterminal("S");
		let a = builder.nonterminal("A");
		let x = builder.terminal("x");
		let y = builder.terminal("y");
		builder.alternative(s, [Symbol::from(a), x.into()]);
		builder.alternative(a, [y.into()]);
		builder.alternative(a, []);
		let grammar = builder.build().unwrap();

		let call_a = grammar.alternatives(s)[0];
		assert_eq!(Some(&HashSet::from([Lookahead::Terminal(x), Lookahead::Terminal(y)])), grammar.test_set(call_a));
		let eps = grammar.alternatives(a)[1];
		assert_eq!(Some(&HashSet::from([Lookahead::Terminal(x), Lookahead::End])), grammar.test_set(eps));
		assert!(grammar.accepts(eps, Lookahead::End));
		assert!(!grammar.accepts(grammar.alternatives(a)[0], Lookahead::Terminal(x)));
		assert_eq!(Some(&HashSet::from([Lookahead::Terminal(x), Lookahead::End])), grammar.follow(a));
		assert_eq!(Some(&HashSet::from([x, y])), grammar.first(s));
		assert_eq!(Some(&HashSet::from([y])), grammar.first(a));
		assert_eq!((2, 2), (grammar.terminal_count(), grammar.nonterminal_count()));
	}

	#[test]
	fn test_no_alternatives() {
		let mut builder = GrammarBuilder::new();
		let s = builder.nonterminal("S");
		let t = builder.nonterminal("T");
		builder.alternative(s, [Symbol::from(t)]);
		assert_eq!(Err(GrammarError::NoAlternatives("T".to_string())), builder.build().map(|_| ()));
	}

	#[test]
	fn test_foreign_ids() {
		let mut builder = GrammarBuilder::new();
		let s = builder.nonterminal("S");
		builder.alternative(s, [Symbol::Terminal(TerminalId(4))]);
		assert_eq!(Err(GrammarError::UndefinedTerminal(4)), builder.build().map(|_| ()));

		let mut builder = GrammarBuilder::new();
		let s = builder.nonterminal("S");
		builder.alternative(s, [Symbol::Nonterminal(NonterminalId(2))]);
		assert_eq!(Err(GrammarError::UndefinedNonterminal(2)), builder.build().map(|_| ()));
	}

	#[test]
	fn test_restriction_validation() {
		let mut builder = GrammarBuilder::new();
		let s = builder.nonterminal("S");
		let a = builder.terminal("a");
		builder.alternative(s, [a.into()]);
		builder.restrict(s, 0, 1, Restriction::not_followed_by([a]));
		assert_eq!(
			Err(GrammarError::InvalidRestrictionSlot { nonterminal: "S".to_string(), alternative: 0, position: 1 }),
			builder.build().map(|_| ())
		);

		let mut builder = GrammarBuilder::new();
		let s = builder.nonterminal("S");
		let a = builder.terminal("a");
		builder.alternative(s, [a.into()]);
		builder.restrict(s, 0, 0, Restriction::NotFollowedBy(vec![vec![]]));
		assert_eq!(Err(GrammarError::EmptyRestriction { nonterminal: "S".to_string(), alternative: 0, position: 0 }), builder.build().map(|_| ()));

		let mut builder = GrammarBuilder::new();
		let s = builder.nonterminal("S");
		let a = builder.terminal("a");
		builder.alternative(s, [a.into()]);
		builder.restrict(s, 0, 0, Restriction::not_preceded_by([a]));
		let grammar = builder.build().unwrap();
		assert_eq!(&[Restriction::not_preceded_by([a])], grammar.restrictions(grammar.alternatives(s)[0]));
	}
}
