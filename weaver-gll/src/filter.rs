use crate::{token::Token, TerminalId};

/// A sequence of terminals a [`Restriction`] compares the input against.
pub type TerminalSeq = Vec<TerminalId>;

/// A disambiguation filter, attached to the slot right in front of the symbol it restricts.
///
/// Precede restrictions are checked before the symbol is attempted, against the tokens right before the current
/// position. Follow and exclude restrictions are checked once the symbol has been recognized over some span, before
/// the node for that span is created. A symbol that fails a restriction leaves nothing behind: no forest node, no
/// return and no descriptor.
///
/// Every form holds a set of terminal sequences. A single token is just a sequence of length one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restriction {
	/// The tokens after the symbol must not start with any of these sequences.
	NotFollowedBy(Vec<TerminalSeq>),
	/// The tokens after the symbol must start with one of these sequences.
	FollowedBy(Vec<TerminalSeq>),
	/// The tokens before the symbol must not end with any of these sequences.
	NotPrecededBy(Vec<TerminalSeq>),
	/// The tokens before the symbol must end with one of these sequences.
	PrecededBy(Vec<TerminalSeq>),
	/// The symbol must not span exactly one of these sequences.
	Excludes(Vec<TerminalSeq>),
}

fn singletons(terminals: impl IntoIterator<Item = TerminalId>) -> Vec<TerminalSeq> {
	terminals.into_iter().map(|t| vec![t]).collect()
}

impl Restriction {
	/// A [`Restriction::NotFollowedBy`] over single tokens.
	#[must_use]
	pub fn not_followed_by(terminals: impl IntoIterator<Item = TerminalId>) -> Self {
		Self::NotFollowedBy(singletons(terminals))
	}

	/// A [`Restriction::FollowedBy`] over single tokens.
	#[must_use]
	pub fn followed_by(terminals: impl IntoIterator<Item = TerminalId>) -> Self {
		Self::FollowedBy(singletons(terminals))
	}

	/// A [`Restriction::NotPrecededBy`] over single tokens.
	#[must_use]
	pub fn not_preceded_by(terminals: impl IntoIterator<Item = TerminalId>) -> Self {
		Self::NotPrecededBy(singletons(terminals))
	}

	/// A [`Restriction::PrecededBy`] over single tokens.
	#[must_use]
	pub fn preceded_by(terminals: impl IntoIterator<Item = TerminalId>) -> Self {
		Self::PrecededBy(singletons(terminals))
	}

	/// A [`Restriction::Excludes`] over single tokens.
	#[must_use]
	pub fn excludes(terminals: impl IntoIterator<Item = TerminalId>) -> Self {
		Self::Excludes(singletons(terminals))
	}

	/// The terminal sequences of this restriction.
	#[must_use]
	pub fn sequences(&self) -> &[TerminalSeq] {
		match self {
			Self::NotFollowedBy(seqs) | Self::FollowedBy(seqs) | Self::NotPrecededBy(seqs) | Self::PrecededBy(seqs) | Self::Excludes(seqs) => seqs,
		}
	}

	/// Check the restriction before attempting a symbol at `position`.
	///
	/// Restrictions that only make sense after recognition always allow.
	#[must_use]
	pub fn allows_before(&self, input: &[Token], position: usize) -> bool {
		match self {
			Self::NotPrecededBy(seqs) => !seqs.iter().any(|seq| ends_with(input, position, seq)),
			Self::PrecededBy(seqs) => seqs.iter().any(|seq| ends_with(input, position, seq)),
			Self::NotFollowedBy(_) | Self::FollowedBy(_) | Self::Excludes(_) => true,
		}
	}

	/// Check the restriction for a symbol recognized over `left..right`.
	///
	/// Precede restrictions always allow, they have been checked before.
	#[must_use]
	pub fn allows_after(&self, input: &[Token], left: usize, right: usize) -> bool {
		match self {
			Self::NotFollowedBy(seqs) => !seqs.iter().any(|seq| starts_with(input, right, seq)),
			Self::FollowedBy(seqs) => seqs.iter().any(|seq| starts_with(input, right, seq)),
			Self::Excludes(seqs) => !seqs.iter().any(|seq| spans_exactly(input, left, right, seq)),
			Self::NotPrecededBy(_) | Self::PrecededBy(_) => true,
		}
	}
}

/// All precede restrictions in `restrictions` allow a symbol at `position`.
#[must_use]
pub fn precede_allowed(restrictions: &[Restriction], input: &[Token], position: usize) -> bool {
	restrictions.iter().all(|r| r.allows_before(input, position))
}

/// All follow and exclude restrictions in `restrictions` allow a symbol over `left..right`.
#[must_use]
pub fn follow_allowed(restrictions: &[Restriction], input: &[Token], left: usize, right: usize) -> bool {
	restrictions.iter().all(|r| r.allows_after(input, left, right))
}

fn matches(tokens: &[Token], seq: &[TerminalId]) -> bool {
	tokens.len() == seq.len() && tokens.iter().zip(seq).all(|(token, t)| token.terminal == *t)
}

fn starts_with(input: &[Token], position: usize, seq: &[TerminalId]) -> bool {
	input.get(position..position + seq.len()).is_some_and(|tokens| matches(tokens, seq))
}

fn ends_with(input: &[Token], position: usize, seq: &[TerminalId]) -> bool {
	position.checked_sub(seq.len()).and_then(|start| input.get(start..position)).is_some_and(|tokens| matches(tokens, seq))
}

fn spans_exactly(input: &[Token], left: usize, right: usize, seq: &[TerminalId]) -> bool {
	input.get(left..right).is_some_and(|tokens| matches(tokens, seq))
}
