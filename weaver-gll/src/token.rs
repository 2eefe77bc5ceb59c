use weaver_utils::Span;

use crate::{grammar::Lookahead, TerminalId};

/// A lexed token: the terminal it was recognized as, and where it came from in the source text.
///
/// The engine only ever looks at [`Token::terminal`]. The span is carried along for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
	/// The terminal this token is an instance of.
	pub terminal: TerminalId,
	/// The byte range in the source text.
	pub span: Span,
}

impl Token {
	/// Construct a new token.
	#[must_use]
	pub const fn new(terminal: TerminalId, span: Span) -> Self {
		Self { terminal, span }
	}
}

/// What the parser sees at `position`.
pub(crate) fn lookahead(input: &[Token], position: usize) -> Lookahead {
	input.get(position).map_or(Lookahead::End, |token| Lookahead::Terminal(token.terminal))
}

/// The span to blame for something going wrong at `position`.
///
/// Past the end of the input, this is the empty span right after the last token.
pub(crate) fn span_at(input: &[Token], position: usize) -> Span {
	match input.get(position) {
		Some(token) => token.span.clone(),
		None => {
			let end = input.last().map_or(0, |token| token.span.end);
			end..end
		}
	}
}
