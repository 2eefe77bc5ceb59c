use std::collections::HashSet;

use super::{Lookahead, Rules};
use crate::{Symbol, TerminalId};

/// Which nonterminals derive the empty string.
///
/// Plain fixpoint: keep marking nonterminals that have an alternative of only nullable symbols until nothing changes.
pub(crate) fn nullables(rules: &Rules) -> Vec<bool> {
	let mut nullable = vec![false; rules.len()];
	let mut changed = true;
	while changed {
		changed = false;
		for (nt, alts) in rules.iter().enumerate() {
			if !nullable[nt] && alts.iter().any(|alt| alt.iter().all(|sym| symbol_nullable(*sym, &nullable))) {
				nullable[nt] = true;
				changed = true;
			}
		}
	}
	nullable
}

fn symbol_nullable(symbol: Symbol, nullable: &[bool]) -> bool {
	match symbol {
		Symbol::Terminal(_) => false,
		Symbol::Nonterminal(nt) => nullable.get(nt.0).copied().unwrap_or(false),
	}
}

/// Whether every symbol of `seq` is nullable. The empty sequence is.
pub(crate) fn sequence_nullable(seq: &[Symbol], nullable: &[bool]) -> bool {
	seq.iter().all(|sym| symbol_nullable(*sym, nullable))
}

/// The terminals that can start a derivation of `seq`.
pub(crate) fn sequence_first(seq: &[Symbol], first: &[HashSet<TerminalId>], nullable: &[bool]) -> HashSet<TerminalId> {
	let mut res = HashSet::new();
	for symbol in seq {
		match symbol {
			Symbol::Terminal(t) => {
				res.insert(*t);
				return res;
			}
			Symbol::Nonterminal(nt) => {
				if let Some(set) = first.get(nt.0) {
					res.extend(set.iter().copied());
				}
				if !symbol_nullable(*symbol, nullable) {
					return res;
				}
			}
		}
	}
	res
}

/// FIRST sets of all nonterminals.
pub(crate) fn first_sets(rules: &Rules, nullable: &[bool]) -> Vec<HashSet<TerminalId>> {
	let mut first: Vec<HashSet<TerminalId>> = vec![HashSet::new(); rules.len()];
	let mut changed = true;
	while changed {
		changed = false;
		for (nt, alts) in rules.iter().enumerate() {
			for alt in alts {
				let found = sequence_first(alt, &first, nullable);
				let before = first[nt].len();
				first[nt].extend(found);
				changed |= first[nt].len() != before;
			}
		}
	}
	first
}

/// FOLLOW sets of all nonterminals.
///
/// Any nonterminal may be used as the start of a parse, so the end of the input follows every one of them.
pub(crate) fn follow_sets(rules: &Rules, first: &[HashSet<TerminalId>], nullable: &[bool]) -> Vec<HashSet<Lookahead>> {
	let mut follow: Vec<HashSet<Lookahead>> = (0..rules.len()).map(|_| HashSet::from([Lookahead::End])).collect();
	let mut changed = true;
	while changed {
		changed = false;
		for (nt, alts) in rules.iter().enumerate() {
			for alt in alts {
				for (i, symbol) in alt.iter().enumerate() {
					let Symbol::Nonterminal(target) = symbol else {
						continue;
					};
					let rest = &alt[i + 1..];
					let mut found: HashSet<Lookahead> = sequence_first(rest, first, nullable).into_iter().map(Lookahead::Terminal).collect();
					if sequence_nullable(rest, nullable) {
						found.extend(follow[nt].iter().copied());
					}
					let before = follow[target.0].len();
					follow[target.0].extend(found);
					changed |= follow[target.0].len() != before;
				}
			}
		}
	}
	follow
}
