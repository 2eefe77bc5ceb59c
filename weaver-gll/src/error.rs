use thiserror::Error;
use weaver_utils::{comma_separated_with_or, ErrorReport, Span};

use crate::{config::Resource, slot::SlotId};

/// Result type for anything that can go wrong during a parse.
pub type GllResult<T> = Result<T, GllError>;

/// Everything that can stop a parse from producing a forest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GllError {
	/// The input is not in the language of the grammar.
	#[error("no parse: {0}")]
	NoParse(#[from] ParseFailure),
	/// The grammar given to the engine is malformed.
	#[error("grammar contract violation: {0}")]
	Contract(#[from] GrammarError),
	/// The session grew past a limit set in [`ParseConfig`](crate::ParseConfig).
	#[error("parse too expensive: more than {limit} {resource}")]
	ResourceExhausted {
		/// What ran out.
		resource: Resource,
		/// The configured limit.
		limit: usize,
	},
}

/// A malformed grammar.
///
/// Apart from [`GrammarError::Fatal`], these are all found by [`GrammarBuilder::build`](crate::GrammarBuilder::build)
/// before any parsing happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
	/// A nonterminal was declared but never given an alternative.
	#[error("nonterminal `{0}` has no alternatives")]
	NoAlternatives(String),
	/// A [`NonterminalId`](crate::NonterminalId) that does not belong to this grammar.
	#[error("reference to undefined nonterminal #{0}")]
	UndefinedNonterminal(usize),
	/// A [`TerminalId`](crate::TerminalId) that does not belong to this grammar.
	#[error("reference to undefined terminal #{0}")]
	UndefinedTerminal(usize),
	/// A restriction attached to a position which is not in front of a symbol.
	#[error("restriction attached to {nonterminal}.{alternative}@{position}, which is not in front of a symbol")]
	InvalidRestrictionSlot {
		/// The name of the nonterminal.
		nonterminal: String,
		/// The alternative index.
		alternative: usize,
		/// The position inside the alternative.
		position: usize,
	},
	/// A restriction containing an empty terminal sequence.
	#[error("restriction on {nonterminal}.{alternative}@{position} contains an empty terminal sequence")]
	EmptyRestriction {
		/// The name of the nonterminal.
		nonterminal: String,
		/// The alternative index.
		alternative: usize,
		/// The position inside the alternative.
		position: usize,
	},
	/// The parse session found itself in an impossible state.
	#[error("internal inconsistency: {0}")]
	Fatal(String),
}

/// The input does not match the grammar.
///
/// Reports the furthest position any descriptor reached and what the parser would have accepted there.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unexpected {} at position {position}, expected {}", .found.as_deref().unwrap_or("end of input"), comma_separated_with_or(.expected_terminals))]
pub struct ParseFailure {
	/// The furthest token position reached.
	pub position: usize,
	/// The slots that were waiting for input at [`ParseFailure::position`].
	pub expected: Vec<SlotId>,
	/// The names of the terminals that would have been accepted at [`ParseFailure::position`], sorted.
	pub expected_terminals: Vec<String>,
	/// The name of the terminal found at [`ParseFailure::position`], `None` at the end of the input.
	pub found: Option<String>,
	/// The source span of the offending token.
	pub span: Span,
}

impl ErrorReport for ParseFailure {
	fn msg(&self) -> (String, String) {
		("Unexpected token!".to_string(), self.to_string())
	}

	fn span(&self) -> Span {
		self.span.clone()
	}
}

impl ErrorReport for GrammarError {
	fn msg(&self) -> (String, String) {
		("Malformed grammar!".to_string(), self.to_string())
	}

	fn span(&self) -> Span {
		Span::default()
	}
}

impl ErrorReport for GllError {
	fn msg(&self) -> (String, String) {
		match self {
			Self::NoParse(failure) => failure.msg(),
			Self::Contract(err) => err.msg(),
			Self::ResourceExhausted { .. } => ("Parse too expensive!".to_string(), self.to_string()),
		}
	}

	fn span(&self) -> Span {
		match self {
			Self::NoParse(failure) => failure.span(),
			Self::Contract(_) | Self::ResourceExhausted { .. } => Span::default(),
		}
	}
}
