//! # NFA construction
//! Builds one nondeterministic finite automaton for a whole [LexerSpec]
//! using Thompson's construction. Every rule's regex becomes a fragment
//! with a single entry state and a list of dangling out-transitions; the
//! fragment is sealed by pointing the danglings at a fresh accepting state
//! carrying the rule's 1-based index as its done-number. Each declared
//! start state gets a synthetic entry state with ε-transitions to every
//! rule that is active in it (no selector, or a selector naming it).
//!
//! States and transitions live in arenas owned by the [Nfa] and are
//! referenced by index, so a fragment's dangling list is a plain index
//! vector rather than a pointer chain through the transitions.

use crate::charset::ByteSet;
use crate::regex::Regex;
use crate::spec::LexerSpec;
use crate::util::StateSet;
use std::fmt;

pub mod eval;
pub use eval::NfaEvaluator;

/// A state in the NFA: its accepting rule (if any) and its outgoing
/// transitions as indices into the transition arena.
#[derive(Debug, Clone)]
pub struct NfaState {
    pub(crate) done: Option<usize>,
    pub(crate) transitions: Vec<usize>,
}

impl NfaState {
    /// The 1-based index of the rule this state accepts, if any.
    pub fn done(&self) -> Option<usize> {
        self.done
    }
}

/// A transition: either an ε-move or a move on a set of bytes. `dest` is
/// `None` only while the transition dangles out of an unfinished fragment.
#[derive(Debug, Clone)]
pub struct Transition {
    pub(crate) epsilon: bool,
    pub(crate) cond: ByteSet,
    pub(crate) dest: Option<usize>,
}

/// An NFA fragment under construction: its entry state and the transitions
/// whose destinations are still unassigned.
struct Fragment {
    init: usize,
    dangling: Vec<usize>,
}

/// The NFA for a whole specification: the union of every rule's fragment,
/// entered through one synthetic state per declared start state.
#[derive(Debug, Clone, Default)]
pub struct Nfa {
    pub(crate) states: Vec<NfaState>,
    pub(crate) transitions: Vec<Transition>,
    /// Synthetic entry states, one per start state in declaration order.
    pub(crate) starts: Vec<usize>,
}

impl Nfa {
    /// Builds the NFA for every rule and start state of a parsed spec.
    pub fn from_spec(spec: &LexerSpec) -> Self {
        let mut nfa = Nfa::default();

        let entries: Vec<usize> = spec
            .rules
            .iter()
            .map(|rule| {
                let frag = nfa.fragment(&rule.regex);
                let accept = nfa.add_state();
                nfa.states[accept].done = Some(rule.index);
                nfa.patch(&frag.dangling, accept);
                frag.init
            })
            .collect();

        for name in &spec.start_states {
            let entry = nfa.add_state();
            for (rule, &rule_entry) in spec.rules.iter().zip(&entries) {
                let active =
                    rule.selectors.is_empty() || rule.selectors.iter().any(|s| s == name);
                if active {
                    let t = nfa.add_dangling(entry, true, ByteSet::new());
                    nfa.transitions[t].dest = Some(rule_entry);
                }
            }
            nfa.starts.push(entry);
        }

        nfa
    }

    pub fn states(&self) -> &[NfaState] {
        &self.states
    }

    /// The synthetic entry state ids, indexed by start-state ordinal.
    pub fn starts(&self) -> &[usize] {
        &self.starts
    }

    /// The accepting rule of a state, if any.
    pub fn done(&self, id: usize) -> Option<usize> {
        self.states[id].done
    }

    pub(crate) fn transitions_of(&self, id: usize) -> impl Iterator<Item = &Transition> {
        self.states[id].transitions.iter().map(|&t| &self.transitions[t])
    }

    fn add_state(&mut self) -> usize {
        self.states.push(NfaState {
            done: None,
            transitions: Vec::new(),
        });
        self.states.len() - 1
    }

    /// Adds a transition out of `from` with no destination yet and returns
    /// its id.
    fn add_dangling(&mut self, from: usize, epsilon: bool, cond: ByteSet) -> usize {
        let id = self.transitions.len();
        self.transitions.push(Transition {
            epsilon,
            cond,
            dest: None,
        });
        self.states[from].transitions.push(id);
        id
    }

    /// Points every listed dangling transition at `dest`.
    fn patch(&mut self, dangling: &[usize], dest: usize) {
        for &t in dangling {
            self.transitions[t].dest = Some(dest);
        }
    }

    /// Thompson construction for one regex node.
    fn fragment(&mut self, rx: &Regex) -> Fragment {
        match rx {
            Regex::Char(c) => self.condition_fragment(ByteSet::single(*c)),
            Regex::Class { negated, set } => {
                let cond = if *negated { set.complement() } else { *set };
                self.condition_fragment(cond)
            }
            Regex::Any => self.condition_fragment(ByteSet::full()),
            Regex::Epsilon => {
                let init = self.add_state();
                let t = self.add_dangling(init, true, ByteSet::new());
                Fragment {
                    init,
                    dangling: vec![t],
                }
            }
            Regex::Sequence(items) => {
                let init = self.add_state();
                let mut dangling = vec![self.add_dangling(init, true, ByteSet::new())];
                for item in items {
                    let sub = self.fragment(item);
                    self.patch(&dangling, sub.init);
                    dangling = sub.dangling;
                }
                Fragment { init, dangling }
            }
            Regex::Alt(branches) => {
                let init = self.add_state();
                let mut dangling = Vec::new();
                for branch in branches {
                    let sub = self.fragment(branch);
                    let t = self.add_dangling(init, true, ByteSet::new());
                    self.transitions[t].dest = Some(sub.init);
                    dangling.extend(sub.dangling);
                }
                Fragment { init, dangling }
            }
            Regex::Maybe(inner) => self.maybe_fragment(inner),
            Regex::Star(inner) => self.star_fragment(inner),
            Regex::Plus(inner) => {
                let sub = self.fragment(inner);
                let head = self.add_state();
                self.patch(&sub.dangling, head);
                let back = self.add_dangling(head, true, ByteSet::new());
                self.transitions[back].dest = Some(sub.init);
                let exit = self.add_dangling(head, true, ByteSet::new());
                Fragment {
                    init: sub.init,
                    dangling: vec![exit],
                }
            }
            Regex::Repeat { min, max, inner } => {
                let init = self.add_state();
                let mut dangling = vec![self.add_dangling(init, true, ByteSet::new())];
                let min = min.unwrap_or(0);
                for _ in 0..min {
                    let sub = self.fragment(inner);
                    self.patch(&dangling, sub.init);
                    dangling = sub.dangling;
                }
                match max {
                    Some(max) => {
                        for _ in min..*max {
                            let sub = self.maybe_fragment(inner);
                            self.patch(&dangling, sub.init);
                            dangling = sub.dangling;
                        }
                    }
                    None => {
                        let sub = self.star_fragment(inner);
                        self.patch(&dangling, sub.init);
                        dangling = sub.dangling;
                    }
                }
                Fragment { init, dangling }
            }
        }
    }

    /// A single state with one dangling transition on `cond`.
    fn condition_fragment(&mut self, cond: ByteSet) -> Fragment {
        let init = self.add_state();
        let t = self.add_dangling(init, false, cond);
        Fragment {
            init,
            dangling: vec![t],
        }
    }

    /// `x?`: an entry with an ε into the inner fragment and an ε-dangling
    /// bypass.
    fn maybe_fragment(&mut self, inner: &Regex) -> Fragment {
        let init = self.add_state();
        let sub = self.fragment(inner);
        let enter = self.add_dangling(init, true, ByteSet::new());
        self.transitions[enter].dest = Some(sub.init);
        let bypass = self.add_dangling(init, true, ByteSet::new());
        let mut dangling = vec![bypass];
        dangling.extend(sub.dangling);
        Fragment { init, dangling }
    }

    /// `x*`: like `x?` but the inner fragment's exits loop back to the
    /// entry.
    fn star_fragment(&mut self, inner: &Regex) -> Fragment {
        let init = self.add_state();
        let sub = self.fragment(inner);
        let enter = self.add_dangling(init, true, ByteSet::new());
        self.transitions[enter].dest = Some(sub.init);
        self.patch(&sub.dangling, init);
        let bypass = self.add_dangling(init, true, ByteSet::new());
        Fragment {
            init,
            dangling: vec![bypass],
        }
    }

    /// ε-closures of every state, computed once by recursive marking.
    pub(crate) fn closures(&self) -> Vec<StateSet> {
        (0..self.states.len())
            .map(|id| {
                let mut set = StateSet::new(self.states.len());
                self.mark_closure(id, &mut set);
                set
            })
            .collect()
    }

    fn mark_closure(&self, id: usize, set: &mut StateSet) {
        if !set.insert(id) {
            return;
        }
        for &t in &self.states[id].transitions {
            let tr = &self.transitions[t];
            if tr.epsilon {
                if let Some(dest) = tr.dest {
                    self.mark_closure(dest, set);
                }
            }
        }
    }
}

impl fmt::Display for Nfa {
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
            for &t in &state.transitions {
                let tr = &self.transitions[t];
                let dest = tr.dest.map_or("?".to_string(), |d| d.to_string());
                if tr.epsilon {
                    writeln!(f, "  eps -> {dest}")?;
                } else {
                    writeln!(f, "  {:?} -> {dest}", tr.cond)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn nfa_for(source: &[u8]) -> Nfa {
        Nfa::from_spec(&parser::parse(source).unwrap())
    }

    #[test]
    fn no_transition_dangles_after_construction() {
        let nfa = nfa_for(b"%state S\n%state T\n<S>ab*|c {}\n.+ {}\n");
        assert!(nfa.transitions.iter().all(|t| t.dest.is_some()));
    }

    #[test]
    fn accepting_states_carry_rule_indices() {
        let nfa = nfa_for(b"a {}\nb {}\n");
        let dones: Vec<usize> = nfa.states.iter().filter_map(|s| s.done).collect();
        assert_eq!(dones, vec![1, 2]);
    }

    #[test]
    fn one_entry_per_start_state() {
        let nfa = nfa_for(b"%state S\n%state T\na {}\n");
        assert_eq!(nfa.starts().len(), 2);
    }

    #[test]
    fn selectors_gate_the_entry_wiring() {
        // rule 1 only in S, rule 2 everywhere
        let nfa = nfa_for(b"%state S\n%state T\n<S>a {}\nb {}\n");
        let out = |id: usize| nfa.states[id].transitions.len();
        assert_eq!(out(nfa.starts()[0]), 2);
        assert_eq!(out(nfa.starts()[1]), 1);
    }

    #[test]
    fn closure_stops_at_byte_transitions() {
        let nfa = nfa_for(b"ab {}\n");
        let closures = nfa.closures();
        let closure = &closures[nfa.starts()[0]];
        // ε alone reaches the entry chain but nothing behind a byte
        // transition, in particular not the accepting state
        let behind_bytes: Vec<usize> = nfa
            .transitions
            .iter()
            .filter(|t| !t.epsilon)
            .map(|t| t.dest.unwrap())
            .collect();
        assert_eq!(behind_bytes.len(), 2);
        assert!(behind_bytes.iter().all(|&id| !closure.contains(id)));
    }

    #[test]
    fn star_bypass_makes_accept_epsilon_reachable() {
        let nfa = nfa_for(b"a* {}\n");
        let closures = nfa.closures();
        let closure = &closures[nfa.starts()[0]];
        assert!(nfa
            .states
            .iter()
            .enumerate()
            .any(|(id, s)| s.done.is_some() && closure.contains(id)));
    }

    #[test]
    fn repeat_unrolls_by_rewalking_the_subtree() {
        // {2,4} is two mandatory copies plus two optional ones: at least
        // four non-epsilon 'a' transitions must exist
        let nfa = nfa_for(b"a{2,4} {}\n");
        let byte_transitions = nfa.transitions.iter().filter(|t| !t.epsilon).count();
        assert_eq!(byte_transitions, 4);
    }

    #[test]
    fn unbounded_repeat_ends_in_a_loop() {
        let nfa = nfa_for(b"a{2,} {}\n");
        // two mandatory copies plus the star copy
        let byte_transitions = nfa.transitions.iter().filter(|t| !t.epsilon).count();
        assert_eq!(byte_transitions, 3);
    }
}
