#![warn(missing_docs)]
//! A generalized LL (GLL) parsing engine.
//!
//! Given a context-free [`Grammar`] (ambiguous, left-recursive, nullable, anything goes) and a sequence of
//! already-lexed [`Token`]s, the engine finds every derivation of the input and packs them into a shared packed
//! parse forest ([`ParseForest`]). Work is driven by descriptors, call stacks are shared in a graph-structured
//! stack ([`gss::Gss`]) and derivations are shared in the forest ([`sppf::Sppf`]), which keeps both time and space
//! polynomial.
//!
//! Grammars may attach [`Restriction`]s to specific slots. These follow/precede/exclude filters are evaluated
//! while parsing, so a rejected alternative never reaches the forest.
//!
//! # Example
//! ```
//! use weaver_gll::{GrammarBuilder, Symbol, Token};
//!
//! let mut builder = GrammarBuilder::new();
//! let e = builder.nonterminal("E");
//! let plus = builder.terminal("+");
//! let num = builder.terminal("num");
//! builder.alternative(e, [Symbol::from(e), plus.into(), num.into()]);
//! builder.alternative(e, [num.into()]);
//! let grammar = builder.build().unwrap();
//!
//! let tokens = vec![Token::new(num, 0..1), Token::new(plus, 2..3), Token::new(num, 4..5)];
//! let forest = grammar.parse(e, &tokens).unwrap();
//! assert!(!forest.is_ambiguous());
//! ```

/// The grammar representation the engine consumes, and its builder.
pub mod grammar;
/// Grammar slots, the "program counter" of the parser.
pub mod slot;
/// Follow, precede and exclude restrictions.
pub mod filter;
/// The graph-structured stack.
pub mod gss;
/// The shared packed parse forest.
pub mod sppf;
/// The parse session driving the descriptor worklist.
pub mod state;
/// The forest handed to downstream consumers.
pub mod forest;
/// Resource limits and parse options.
pub mod config;
/// Error types.
pub mod error;
mod descriptor;
mod token;

use std::fmt::Display;

pub use config::ParseConfig;
pub use error::{GllError, GllResult, GrammarError, ParseFailure};
pub use filter::Restriction;
pub use forest::{AlternativeOrder, AmbiguityPolicy, Derivation, ForestError, ParseForest, RejectAmbiguity};
pub use grammar::{Grammar, GrammarBuilder, Lookahead};
pub use slot::{GrammarSlot, SlotId, SlotKind};
pub use state::{GllState, ParseStats};
pub use token::Token;

/// Identifies a terminal of a [`Grammar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TerminalId(pub(crate) usize);

/// Identifies a nonterminal of a [`Grammar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonterminalId(pub(crate) usize);

impl TerminalId {
	/// The index of this terminal in its grammar.
	#[must_use]
	pub const fn index(self) -> usize {
		self.0
	}
}

impl NonterminalId {
	/// The index of this nonterminal in its grammar.
	#[must_use]
	pub const fn index(self) -> usize {
		self.0
	}
}

impl Display for TerminalId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "t{}", self.0)
	}
}

impl Display for NonterminalId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "N{}", self.0)
	}
}

/// A single symbol on the right-hand side of an alternative.
///
/// The empty string is written as an alternative without any symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
	/// Match one token of this terminal.
	Terminal(TerminalId),
	/// Call this nonterminal.
	Nonterminal(NonterminalId),
}

impl From<TerminalId> for Symbol {
	fn from(value: TerminalId) -> Self {
		Self::Terminal(value)
	}
}

impl From<NonterminalId> for Symbol {
	fn from(value: NonterminalId) -> Self {
		Self::Nonterminal(value)
	}
}

/// Parse `tokens` as a `start` with the default [`ParseConfig`].
///
/// Shorthand for [`Grammar::parse`].
///
/// # Errors
/// See [`Grammar::parse`].
pub fn parse<'g>(grammar: &'g Grammar, start: NonterminalId, tokens: &[Token]) -> GllResult<ParseForest<'g>> {
	grammar.parse(start, tokens)
}

#[cfg(test)]
mod tests;
