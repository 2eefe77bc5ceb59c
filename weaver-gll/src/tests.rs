use logos::Logos;
use pretty_assertions::assert_eq;
use weaver_utils::string_vec;

use crate::{
	sppf::SppfNode, AlternativeOrder, GllError, GllState, Grammar, GrammarBuilder, NonterminalId, ParseConfig, RejectAmbiguity, Restriction, Symbol,
	TerminalId, Token,
};

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\n\f]+")]
enum Lexeme {
	#[token("+")]
	Plus,
	#[token("*")]
	Star,
	#[regex("[0-9]+")]
	Num,
}

struct Calc {
	grammar: Grammar,
	e: NonterminalId,
	plus: TerminalId,
	star: TerminalId,
	num: TerminalId,
}

impl Calc {
	/// E -> E + num | num, or E -> E + E | E * E | num when `ambiguous`.
	fn new(ambiguous: bool) -> Self {
		let mut builder = GrammarBuilder::new();
		let e = builder.nonterminal("E");
		let plus = builder.terminal("+");
		let star = builder.terminal("*");
		let num = builder.terminal("num");
		if ambiguous {
			builder.alternative(e, [Symbol::from(e), plus.into(), e.into()]);
			builder.alternative(e, [Symbol::from(e), star.into(), e.into()]);
		} else {
			builder.alternative(e, [Symbol::from(e), plus.into(), num.into()]);
		}
		builder.alternative(e, [num.into()]);
		Self { grammar: builder.build().unwrap(), e, plus, star, num }
	}

	fn lex(&self, source: &str) -> Vec<Token> {
		Lexeme::lexer(source)
			.spanned()
			.map(|(lexeme, span)| {
				let terminal = match lexeme.unwrap() {
					Lexeme::Plus => self.plus,
					Lexeme::Star => self.star,
					Lexeme::Num => self.num,
				};
				Token::new(terminal, span)
			})
			.collect()
	}
}

/// Build a grammar where every terminal is a single character, and lex `input` against it.
fn chars(grammar: &Grammar, input: &str) -> Vec<Token> {
	input
		.char_indices()
		.map(|(i, c)| Token::new(grammar.terminal_id(&c.to_string()).unwrap(), i..i + 1))
		.collect()
}

/// Recognize `input`, checking that lookahead does not change the answer.
fn recognizes(grammar: &Grammar, start: NonterminalId, input: &str) -> bool {
	let tokens = chars(grammar, input);
	let with = grammar.parse(start, &tokens);
	let without = grammar.parse_with_config(start, &tokens, ParseConfig::default().with_lookahead(false));
	assert_eq!(with.is_ok(), without.is_ok(), "lookahead changed the outcome for {input:?}");
	if let (Ok(with), Ok(without)) = (&with, &without) {
		assert_eq!(with.derivation_count(), without.derivation_count());
	}
	with.is_ok()
}

#[test]
fn test_left_recursion_is_left_associative() {
	let calc = Calc::new(false);
	let tokens = calc.lex("1 + 2 + 3");
	let forest = calc.grammar.parse(calc.e, &tokens).unwrap();
	assert!(!forest.is_ambiguous());
	assert_eq!(Some(1), forest.derivation_count());
	let tree = forest.derivation(&RejectAmbiguity).unwrap();
	assert_eq!("(E (E (E num) + num) + num)", tree.to_string(&calc.grammar));
	assert_eq!(1, forest.stats().gss_nodes);
}

#[test]
fn test_long_left_recursion() {
	let calc = Calc::new(false);
	let source = vec!["7"; 200].join(" + ");
	let tokens = calc.lex(&source);
	let forest = calc.grammar.parse(calc.e, &tokens).unwrap();
	assert_eq!(Some(1), forest.derivation_count());
	assert_eq!(Some((0, tokens.len())), forest.extents(forest.root()));
}

#[test]
fn test_ambiguous_expressions() {
	let calc = Calc::new(true);
	let cases = [("1", 1), ("1 + 2", 1), ("1 + 2 * 3", 2), ("1 + 2 + 3 + 4", 5), ("1 * 2 * 3 * 4 * 5", 14)];
	for (source, expected) in cases {
		let forest = calc.grammar.parse(calc.e, &calc.lex(source)).unwrap();
		assert_eq!(Some(expected), forest.derivation_count(), "{source}");
		assert_eq!(expected > 1, forest.is_ambiguous(), "{source}");
	}
}

#[test]
fn test_packed_children_span_their_parent() {
	let calc = Calc::new(true);
	let tokens = calc.lex("1 + 2 * 3 + 4 * 5");
	let forest = crate::parse(&calc.grammar, calc.e, &tokens).unwrap();
	assert!(forest.is_ambiguous());
	for parent in forest.reachable() {
		if forest.node(parent).is_some_and(SppfNode::is_packed) {
			continue;
		}
		let (left, right) = forest.extents(parent).unwrap();
		for packed in forest.children(parent) {
			let Some(&SppfNode::Packed { pivot, .. }) = forest.node(packed) else {
				panic!("{} has a child that is not packed", forest.label(parent));
			};
			let extents: Vec<(usize, usize)> = forest.children(packed).into_iter().map(|child| forest.extents(child).unwrap()).collect();
			match extents.as_slice() {
				[(l, r)] => {
					assert_eq!((left, right), (*l, *r));
					assert_eq!(left, pivot);
				}
				[(l, m), (n, r)] => {
					assert_eq!((left, right), (*l, *r));
					assert_eq!(m, n);
					assert_eq!(pivot, *n);
				}
				other => panic!("packed node with children {other:?}"),
			}
		}
	}
}

#[test]
fn test_catalan_bounds() {
	let mut builder = GrammarBuilder::new();
	let s = builder.nonterminal("S");
	let a = builder.terminal("a");
	builder.alternative(s, [Symbol::from(s), s.into()]);
	builder.alternative(s, [a.into()]);
	let grammar = builder.build().unwrap();

	let catalan = [1, 1, 2, 5, 14, 42, 132, 429];
	for (i, expected) in catalan.into_iter().enumerate() {
		let n = i + 1;
		let tokens: Vec<Token> = (0..n).map(|j| Token::new(a, j..j + 1)).collect();
		let forest = grammar.parse(s, &tokens).unwrap();
		assert_eq!(Some(expected), forest.derivation_count(), "n = {n}");
		let stats = forest.stats();
		assert!(stats.gss_nodes <= n + 1);
		assert!(stats.sppf_nodes <= (n + 1).pow(3) + 1);
		assert!(stats.packed_nodes <= (n + 1).pow(3));
	}
}

#[test]
fn test_deterministic() {
	let calc = Calc::new(true);
	let tokens = calc.lex("1 + 2 * 3 + 4");
	let first = calc.grammar.parse(calc.e, &tokens).unwrap();
	let second = calc.grammar.parse(calc.e, &tokens).unwrap();
	assert_eq!(first.to_dot(false), second.to_dot(false));
	assert_eq!(first.stats(), second.stats());
	assert_eq!(first.derivation(&AlternativeOrder), second.derivation(&AlternativeOrder));
}

#[test]
fn test_nullable_grammars() {
	// S -> a S b | ε
	let mut builder = GrammarBuilder::new();
	let s = builder.nonterminal("S");
	let a = builder.terminal("a");
	let b = builder.terminal("b");
	builder.alternative(s, [Symbol::from(a), s.into(), b.into()]);
	builder.alternative(s, []);
	let grammar = builder.build().unwrap();
	for input in ["", "ab", "aabb", "aaabbb"] {
		assert!(recognizes(&grammar, s, input), "{input:?}");
	}
	for input in ["a", "b", "aab", "abab"] {
		assert!(!recognizes(&grammar, s, input), "{input:?}");
	}

	let forest = grammar.parse(s, &[]).unwrap();
	assert_eq!(Some(&SppfNode::Symbol { nonterminal: s, left: 0, right: 0 }), forest.node(forest.root()));
}

#[test]
fn test_hidden_left_recursion() {
	// S -> A S a | b, A -> ε
	let mut builder = GrammarBuilder::new();
	let s = builder.nonterminal("S");
	let a_nt = builder.nonterminal("A");
	let a = builder.terminal("a");
	let b = builder.terminal("b");
	builder.alternative(s, [Symbol::from(a_nt), s.into(), a.into()]);
	builder.alternative(s, [b.into()]);
	builder.alternative(a_nt, []);
	let grammar = builder.build().unwrap();
	assert!(recognizes(&grammar, s, "b"));
	assert!(recognizes(&grammar, s, "baa"));
	assert!(!recognizes(&grammar, s, "ab"));
}

#[test]
fn test_not_followed_by_terminal() {
	// S -> a S | b | c, where the a may not be followed by b.
	let mut builder = GrammarBuilder::new();
	let s = builder.nonterminal("S");
	let a = builder.terminal("a");
	let b = builder.terminal("b");
	let c = builder.terminal("c");
	builder.alternative(s, [Symbol::from(a), s.into()]);
	builder.alternative(s, [b.into()]);
	builder.alternative(s, [c.into()]);
	builder.restrict(s, 0, 0, Restriction::not_followed_by([b]));
	let grammar = builder.build().unwrap();
	for input in ["c", "ac", "aac", "b"] {
		assert!(recognizes(&grammar, s, input), "{input:?}");
	}
	for input in ["ab", "aab", "aaab"] {
		assert!(!recognizes(&grammar, s, input), "{input:?}");
	}
}

/// S -> a P T S | e T c, T -> b T | d, P -> ε
fn nullable_follow_grammar(restricted: bool) -> (Grammar, NonterminalId) {
	let mut builder = GrammarBuilder::new();
	let s = builder.nonterminal("S");
	let t = builder.nonterminal("T");
	let p = builder.nonterminal("P");
	let [a, b, c, d, e] = ["a", "b", "c", "d", "e"].map(|name| builder.terminal(name));
	builder.alternative(s, [Symbol::from(a), p.into(), t.into(), s.into()]);
	builder.alternative(s, [Symbol::from(e), t.into(), c.into()]);
	builder.alternative(t, [Symbol::from(b), t.into()]);
	builder.alternative(t, [d.into()]);
	builder.alternative(p, []);
	if restricted {
		builder.restrict(s, 0, 1, Restriction::not_followed_by([b]));
	}
	(builder.build().unwrap(), s)
}

#[test]
fn test_not_followed_by_nullable_nonterminal() {
	let (grammar, s) = nullable_follow_grammar(true);
	for input in ["adedc", "adebdc", "adebbbbdc"] {
		assert!(recognizes(&grammar, s, input), "{input:?}");
	}
	for input in ["abdedc", "abdebdc"] {
		assert!(!recognizes(&grammar, s, input), "{input:?}");
	}
	let (grammar, s) = nullable_follow_grammar(false);
	assert!(recognizes(&grammar, s, "abdedc"));
}

#[test]
fn test_not_preceded_by() {
	// S -> a S | b | ε, where the b may not be preceded by a.
	let mut builder = GrammarBuilder::new();
	let s = builder.nonterminal("S");
	let a = builder.terminal("a");
	let b = builder.terminal("b");
	builder.alternative(s, [Symbol::from(a), s.into()]);
	builder.alternative(s, [b.into()]);
	builder.alternative(s, []);
	builder.restrict(s, 1, 0, Restriction::not_preceded_by([a]));
	let grammar = builder.build().unwrap();
	for input in ["aaa", "b", "", "a"] {
		assert!(recognizes(&grammar, s, input), "{input:?}");
	}
	for input in ["ab", "aaaab"] {
		assert!(!recognizes(&grammar, s, input), "{input:?}");
	}
}

#[test]
fn test_excludes() {
	// S -> x T y, T -> a | b | c, where T may not be exactly a or b.
	let mut builder = GrammarBuilder::new();
	let s = builder.nonterminal("S");
	let t = builder.nonterminal("T");
	let [x, y, a, b, c] = ["x", "y", "a", "b", "c"].map(|name| builder.terminal(name));
	builder.alternative(s, [Symbol::from(x), t.into(), y.into()]);
	for terminal in [a, b, c] {
		builder.alternative(t, [terminal.into()]);
	}
	builder.restrict(s, 0, 1, Restriction::excludes([a, b]));
	let grammar = builder.build().unwrap();
	assert!(recognizes(&grammar, s, "xcy"));
	assert!(!recognizes(&grammar, s, "xay"));
	assert!(!recognizes(&grammar, s, "xby"));
}

#[test]
fn test_excludes_sequences() {
	// S -> x T y, T -> a a a | b b b | c c c, where T may not be aaa or bbb.
	let mut builder = GrammarBuilder::new();
	let s = builder.nonterminal("S");
	let t = builder.nonterminal("T");
	let [x, y, a, b, c] = ["x", "y", "a", "b", "c"].map(|name| builder.terminal(name));
	builder.alternative(s, [Symbol::from(x), t.into(), y.into()]);
	for terminal in [a, b, c] {
		builder.alternative(t, [Symbol::from(terminal), terminal.into(), terminal.into()]);
	}
	builder.restrict(s, 0, 1, Restriction::Excludes(vec![vec![a, a, a], vec![b, b, b]]));
	let grammar = builder.build().unwrap();
	assert!(recognizes(&grammar, s, "xcccy"));
	assert!(!recognizes(&grammar, s, "xaaay"));
	assert!(!recognizes(&grammar, s, "xbbby"));
}

#[test]
fn test_rejected_symbol_leaves_no_trace() {
	// S -> X T, T -> a | b, X -> x, where X may not be followed by a.
	let mut builder = GrammarBuilder::new();
	let s = builder.nonterminal("S");
	let x_nt = builder.nonterminal("X");
	let t = builder.nonterminal("T");
	let [x, a, b] = ["x", "a", "b"].map(|name| builder.terminal(name));
	builder.alternative(s, [Symbol::from(x_nt), t.into()]);
	builder.alternative(t, [a.into()]);
	builder.alternative(t, [b.into()]);
	builder.alternative(x_nt, [x.into()]);
	builder.restrict(s, 0, 0, Restriction::not_followed_by([a]));
	let grammar = builder.build().unwrap();
	assert!(recognizes(&grammar, s, "xb"));

	let tokens = chars(&grammar, "xa");
	for config in [ParseConfig::default(), ParseConfig::default().with_lookahead(false)] {
		let mut state = GllState::init(&grammar, s, &tokens, config).unwrap();
		state.main().unwrap();
		assert!(!state.accepts());
		assert_eq!(None, state.gss().find(t, 1));
		assert_eq!(None, state.sppf().find(&SppfNode::Terminal { terminal: a, left: 1, right: 2 }));
	}
}

#[test]
fn test_followed_by_and_preceded_by() {
	// S -> A B, A -> a | a a, B -> b | a b, where A must be followed by b and B must be preceded by a.
	let mut builder = GrammarBuilder::new();
	let s = builder.nonterminal("S");
	let a_nt = builder.nonterminal("A");
	let b_nt = builder.nonterminal("B");
	let a = builder.terminal("a");
	let b = builder.terminal("b");
	builder.alternative(s, [Symbol::from(a_nt), b_nt.into()]);
	builder.alternative(a_nt, [a.into()]);
	builder.alternative(a_nt, [Symbol::from(a), a.into()]);
	builder.alternative(b_nt, [b.into()]);
	builder.alternative(b_nt, [Symbol::from(a), b.into()]);
	builder.restrict(s, 0, 0, Restriction::followed_by([b]));
	builder.restrict(s, 0, 1, Restriction::preceded_by([a]));
	let grammar = builder.build().unwrap();

	// Without the follow restriction "aab" would be ambiguous.
	let forest = grammar.parse(s, &chars(&grammar, "aab")).unwrap();
	assert!(!forest.is_ambiguous());
	assert_eq!("(S (A a a) (B b))", forest.derivation(&RejectAmbiguity).unwrap().to_string(&grammar));
	assert!(recognizes(&grammar, s, "ab"));
}

#[test]
fn test_failure_diagnostics() {
	let calc = Calc::new(false);
	let Err(GllError::NoParse(failure)) = calc.grammar.parse(calc.e, &calc.lex("1 + + 2")) else {
		panic!("expected a parse failure");
	};
	assert_eq!(2, failure.position);
	assert_eq!(vec!["num".to_string()], failure.expected_terminals);
	assert_eq!(Some("+".to_string()), failure.found);
	assert_eq!(4..5, failure.span);
	assert_eq!("unexpected + at position 2, expected num", failure.to_string());

	let Err(GllError::NoParse(failure)) = calc.grammar.parse(calc.e, &calc.lex("1 +")) else {
		panic!("expected a parse failure");
	};
	assert_eq!(2, failure.position);
	assert_eq!(None, failure.found);
	assert_eq!(3..3, failure.span);

	let Err(GllError::NoParse(failure)) = calc.grammar.parse(calc.e, &calc.lex("* 1")) else {
		panic!("expected a parse failure");
	};
	assert_eq!(0, failure.position);
	assert_eq!(vec!["num".to_string()], failure.expected_terminals);

	let Err(GllError::NoParse(failure)) = calc.grammar.parse(calc.e, &calc.lex("1 2")) else {
		panic!("expected a parse failure");
	};
	assert_eq!(1, failure.position);
	assert_eq!(string_vec!["+", "end of input"], failure.expected_terminals);
	assert_eq!(Some("num".to_string()), failure.found);
	assert_eq!(2..3, failure.span);
	assert_eq!("unexpected num at position 1, expected + or end of input", failure.to_string());
}

#[test]
fn test_contract_violation() {
	let calc = Calc::new(false);
	let result = calc.grammar.parse(NonterminalId(9), &calc.lex("1"));
	assert!(matches!(result, Err(GllError::Contract(_))));
}
