//! # Subset construction
//! Converts the rule-union NFA into a deterministic automaton. Each DFA
//! state stands for an ε-closed set of NFA states; the construction
//! explores only the reachable sets, seeded with the closure of every
//! synthetic start-state entry in declaration order.
//!
//! The done-number of a DFA state is the minimum non-zero done-number of
//! its underlying NFA states, which is exactly the "first declared rule
//! wins on ties" policy. For every input byte the per-destination
//! conditions are merged, so a DFA state never has two outgoing
//! transitions to the same destination and the conditions of its outgoing
//! transitions are pairwise disjoint by construction.
//!
//! DFA state ids are assigned in discovery order and every byte is scanned
//! in increasing order, so the result is fully deterministic: compiling
//! the same specification twice yields the same automaton, transition for
//! transition.

use crate::charset::ByteSet;
use crate::nfa::Nfa;
use crate::util::StateSet;
use std::collections::HashMap;
use std::fmt;

pub mod eval;
pub use eval::DfaEvaluator;

/// A deterministic transition: a set of bytes and the state they lead to.
#[derive(Debug, Clone)]
pub struct DfaTransition {
    pub(crate) cond: ByteSet,
    pub(crate) dest: usize,
}

impl DfaTransition {
    pub fn cond(&self) -> &ByteSet {
        &self.cond
    }

    pub fn dest(&self) -> usize {
        self.dest
    }
}

/// A DFA state: its winning rule, if any, and its outgoing transitions
/// with pairwise-disjoint conditions.
#[derive(Debug, Clone)]
pub struct DfaState {
    pub(crate) done: Option<usize>,
    pub(crate) transitions: Vec<DfaTransition>,
}

impl DfaState {
    /// The 1-based index of the rule this state accepts, if any.
    pub fn done(&self) -> Option<usize> {
        self.done
    }

    pub fn transitions(&self) -> &[DfaTransition] {
        &self.transitions
    }
}

/// The deterministic automaton the emitter serializes.
#[derive(Debug, Clone)]
pub struct Dfa {
    pub(crate) states: Vec<DfaState>,
    /// Initial DFA state per start-state ordinal.
    pub(crate) starts: Vec<usize>,
}

impl Nfa {
    /// Runs the subset construction over this NFA.
    pub fn to_dfa(&self) -> Dfa {
        let closures = self.closures();
        let nfa_len = self.states().len();

        // Known sets in discovery order; `map` assigns each its DFA id.
        let mut map: HashMap<StateSet, usize> = HashMap::new();
        let mut sets: Vec<StateSet> = Vec::new();
        let mut intern = |set: StateSet, sets: &mut Vec<StateSet>| -> usize {
            if let Some(&id) = map.get(&set) {
                return id;
            }
            let id = sets.len();
            map.insert(set.clone(), id);
            sets.push(set);
            id
        };

        let starts: Vec<usize> = self
            .starts()
            .iter()
            .map(|&entry| intern(closures[entry].clone(), &mut sets))
            .collect();

        let mut states: Vec<DfaState> = Vec::new();
        let mut next = 0;
        while next < sets.len() {
            let current = sets[next].clone();
            next += 1;

            let done = current.iter().filter_map(|id| self.done(id)).min();

            // Destination sets per byte, merged into one condition per
            // destination, kept in first-encounter order.
            let mut out: Vec<(usize, ByteSet)> = Vec::new();
            for byte in 0..=255u8 {
                let mut target = StateSet::new(nfa_len);
                for id in current.iter() {
                    for tr in self.transitions_of(id) {
                        if !tr.epsilon && tr.cond.contains(byte) {
                            if let Some(dest) = tr.dest {
                                target.union_with(&closures[dest]);
                            }
                        }
                    }
                }
                if target.is_empty() {
                    continue;
                }
                let dest = intern(target, &mut sets);
                match out.iter_mut().find(|(d, _)| *d == dest) {
                    Some((_, cond)) => cond.insert(byte),
                    None => out.push((dest, ByteSet::single(byte))),
                }
            }

            states.push(DfaState {
                done,
                transitions: out
                    .into_iter()
                    .map(|(dest, cond)| DfaTransition { cond, dest })
                    .collect(),
            });
        }

        Dfa { states, starts }
    }
}

impl Dfa {
    pub fn states(&self) -> &[DfaState] {
        &self.states
    }

    /// Initial DFA state ids, indexed by start-state ordinal.
    pub fn starts(&self) -> &[usize] {
        &self.starts
    }
}

impl fmt::Display for Dfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (ordinal, &id) in self.starts.iter().enumerate() {
            writeln!(f, "start {ordinal} -> state {id}")?;
        }
        for (id, state) in self.states.iter().enumerate() {
            write!(f, "state {id}")?;
            if let Some(done) = state.done {
                write!(f, " [done {done}]")?;
            }
            writeln!(f, ":")?;
            for tr in &state.transitions {
                writeln!(f, "  {:?} -> {}", tr.cond, tr.dest)?;
            }
        }
        Ok(())
    }
}
