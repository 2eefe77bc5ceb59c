use derivative::Derivative;

use crate::{grammar::Grammar, NonterminalId, TerminalId};

/// Identifies a [`GrammarSlot`] inside its [`Grammar`].
///
/// Slots of a single alternative are numbered consecutively, so the slot after `id` is always `id + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub(crate) usize);

impl SlotId {
	/// The index of this slot in its grammar.
	#[must_use]
	pub const fn index(self) -> usize {
		self.0
	}
}

/// What the parser does when it reaches a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
	/// The dot is in front of a terminal, match it.
	Terminal(TerminalId),
	/// The dot is in front of a nonterminal, call it.
	Call(NonterminalId),
	/// The dot is at the end of the alternative, return.
	End,
}

#[derive(Debug, Clone, Derivative)]
#[derivative(PartialEq, Eq, Hash)]
/// A `GrammarSlot` as defined by the original GLL paper: an alternative with a `•` somewhere in it.
///
/// Two slots are the same if they point into the same alternative of the same nonterminal at the same place.
/// Everything else is precomputed by [`GrammarBuilder::build`](crate::GrammarBuilder::build).
pub struct GrammarSlot {
	/// The nonterminal this slot belongs to.
	pub nonterminal: NonterminalId,
	/// The index of the alternative inside that nonterminal.
	pub alternative: usize,
	/// The location of the `•` inside the alternative.
	pub dot: usize,
	#[derivative(PartialEq = "ignore")]
	#[derivative(Hash = "ignore")]
	id: SlotId,
	#[derivative(PartialEq = "ignore")]
	#[derivative(Hash = "ignore")]
	kind: SlotKind,
	#[derivative(PartialEq = "ignore")]
	#[derivative(Hash = "ignore")]
	alpha_special: bool,
}

impl GrammarSlot {
	pub(crate) const fn new(id: SlotId, nonterminal: NonterminalId, alternative: usize, dot: usize, kind: SlotKind, alpha_special: bool) -> Self {
		Self { nonterminal, alternative, dot, id, kind, alpha_special }
	}

	/// The id of this slot.
	#[must_use]
	pub const fn id(&self) -> SlotId {
		self.id
	}

	/// What comes after the dot.
	#[must_use]
	pub const fn kind(&self) -> SlotKind {
		self.kind
	}

	/// Is the dot at the end of the alternative?
	#[must_use]
	pub const fn is_end(&self) -> bool {
		matches!(self.kind, SlotKind::End)
	}

	/// Whether the part in front of the dot is a single terminal or a single non-nullable nonterminal.
	///
	/// The SPPF needs no intermediate node for such a prefix: the node of that one symbol already says everything.
	#[must_use]
	pub const fn is_alpha_special(&self) -> bool {
		self.alpha_special
	}

	/// The slot with the dot one symbol further, if the dot is not at the end yet.
	#[must_use]
	pub const fn next(&self) -> Option<SlotId> {
		if self.is_end() {
			None
		} else {
			Some(SlotId(self.id.0 + 1))
		}
	}

	/// The slot with the dot one symbol earlier, if the dot is not at the start.
	#[must_use]
	pub const fn prev(&self) -> Option<SlotId> {
		if self.dot == 0 {
			None
		} else {
			Some(SlotId(self.id.0 - 1))
		}
	}

	/// A string representation of the grammar slot.
	///
	/// For example, `E -> E + • num` for the second slot after the start of `E -> E + num`.
	#[must_use]
	pub fn to_string(&self, grammar: &Grammar) -> String {
		let mut res = String::new();
		res.push_str(grammar.nonterminal_name(self.nonterminal));
		res.push_str(" ->");
		for (i, symbol) in grammar.rule(self.nonterminal, self.alternative).iter().enumerate() {
			if i == self.dot {
				res.push_str(" •");
			}
			res.push(' ');
			res.push_str(grammar.symbol_name(*symbol));
		}
		if self.is_end() {
			res.push_str(" •");
		}
		res
	}
}
