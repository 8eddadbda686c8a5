//! Reference evaluation of the NFA by direct set-of-states simulation.
//! This is the executable definition of the automaton's language, used to
//! cross-check the subset construction; code generation never touches it.

use crate::nfa::Nfa;
use crate::util::StateSet;

/// Steps a byte string through the NFA, tracking the ε-closed set of
/// states the automaton could be in.
#[derive(Clone)]
pub struct NfaEvaluator<'a> {
    nfa: &'a Nfa,
    closures: Vec<StateSet>,
    current: StateSet,
}

impl Nfa {
    /// An evaluator positioned at the entry of the given start-state
    /// ordinal.
    pub fn evaluator(&self, start_ordinal: usize) -> NfaEvaluator<'_> {
        let closures = self.closures();
        let current = closures[self.starts[start_ordinal]].clone();
        NfaEvaluator {
            nfa: self,
            closures,
            current,
        }
    }
}

impl<'a> NfaEvaluator<'a> {
    /// Consumes one byte. Returns false once the set of possible states is
    /// empty; further steps keep it empty.
    pub fn step(&mut self, byte: u8) -> bool {
        let mut next = StateSet::new(self.nfa.states.len());
        for id in self.current.iter() {
            for tr in self.nfa.transitions_of(id) {
                if !tr.epsilon && tr.cond.contains(byte) {
                    if let Some(dest) = tr.dest {
                        next.union_with(&self.closures[dest]);
                    }
                }
            }
        }
        self.current = next;
        !self.current.is_empty()
    }

    /// The lowest-numbered rule accepted in the current state set, if any.
    pub fn done(&self) -> Option<usize> {
        self.current
            .iter()
            .filter_map(|id| self.nfa.done(id))
            .min()
    }

    pub fn is_dead(&self) -> bool {
        self.current.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn accepts(nfa: &Nfa, input: &[u8]) -> Option<usize> {
        let mut eval = nfa.evaluator(0);
        for &b in input {
            eval.step(b);
        }
        eval.done()
    }

    #[test]
    fn tracks_the_rule_union() {
        let spec = parser::parse(b"ab+ {}\na {}\n").unwrap();
        let nfa = Nfa::from_spec(&spec);
        assert_eq!(accepts(&nfa, b"a"), Some(2));
        assert_eq!(accepts(&nfa, b"ab"), Some(1));
        assert_eq!(accepts(&nfa, b"abbb"), Some(1));
        assert_eq!(accepts(&nfa, b"b"), None);
        assert_eq!(accepts(&nfa, b""), None);
    }

    #[test]
    fn lower_rule_wins_ties() {
        let spec = parser::parse(b"ab {}\na|ab {}\n").unwrap();
        let nfa = Nfa::from_spec(&spec);
        assert_eq!(accepts(&nfa, b"ab"), Some(1));
        assert_eq!(accepts(&nfa, b"a"), Some(2));
    }

    #[test]
    fn dead_sets_stay_dead() {
        let spec = parser::parse(b"a {}\n").unwrap();
        let nfa = Nfa::from_spec(&spec);
        let mut eval = nfa.evaluator(0);
        assert!(eval.step(b'a'));
        assert!(!eval.step(b'x'));
        assert!(!eval.step(b'a'));
        assert!(eval.is_dead());
        assert_eq!(eval.done(), None);
    }

    #[test]
    fn bounded_repetition_window() {
        let spec = parser::parse(b"a{2,4} {}\n").unwrap();
        let nfa = Nfa::from_spec(&spec);
        assert_eq!(accepts(&nfa, b"a"), None);
        assert_eq!(accepts(&nfa, b"aa"), Some(1));
        assert_eq!(accepts(&nfa, b"aaa"), Some(1));
        assert_eq!(accepts(&nfa, b"aaaa"), Some(1));
        assert_eq!(accepts(&nfa, b"aaaaa"), None);
    }
}
