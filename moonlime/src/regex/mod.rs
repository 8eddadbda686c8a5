//! # Regular expression trees
//! The parser compiles each rule's pattern into a [Regex] tree. The node
//! kinds mirror the surface syntax: literal bytes, character classes, `.`,
//! alternation, sequencing, the `?`/`*`/`+` quantifiers, bounded repetition
//! `{n,m}`, and the empty-string node produced by empty alternatives such as
//! `(a|)`.
//!
//! The tree is pure data: NFA construction ([crate::nfa::Nfa::from_spec])
//! borrows it and re-walks shared subtrees when unrolling bounded
//! repetition. Parse-time bookkeeping such as the parenthesis sentinel lives
//! in the parser's private stack frames, not here, so every reachable tree
//! is well-formed by construction.

use crate::charset::{escape_byte, ByteSet};
use std::fmt;

/// One node of a compiled regular expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Regex {
    /// A single literal byte.
    Char(u8),
    /// A character class `[...]` or `[^...]`.
    Class { negated: bool, set: ByteSet },
    /// `.` — any of the 256 byte values.
    Any,
    /// Alternation; at least two branches once parsing completes.
    Alt(Vec<Regex>),
    /// Concatenation, in order.
    Sequence(Vec<Regex>),
    /// `x?`
    Maybe(Box<Regex>),
    /// `x*`
    Star(Box<Regex>),
    /// `x+`
    Plus(Box<Regex>),
    /// `x{min,max}`; `min == None` means 0, `max == None` means unbounded.
    Repeat {
        min: Option<u32>,
        max: Option<u32>,
        inner: Box<Regex>,
    },
    /// Matches the empty string.
    Epsilon,
}

impl Regex {
    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        for _ in 0..depth {
            f.write_str(" ")?;
        }
        match self {
            Regex::Char(c) => {
                f.write_str("char '")?;
                escape_byte(*c, f)?;
                writeln!(f, "'")
            }
            Regex::Class { negated, set } => {
                writeln!(f, "class{}: {set:?}", if *negated { " [inv]" } else { "" })
            }
            Regex::Any => writeln!(f, "any"),
            Regex::Epsilon => writeln!(f, "epsilon"),
            Regex::Alt(branches) => {
                writeln!(f, "alt:")?;
                branches
                    .iter()
                    .try_for_each(|branch| branch.fmt_indented(f, depth + 1))
            }
            Regex::Sequence(items) => {
                writeln!(f, "seq:")?;
                items
                    .iter()
                    .try_for_each(|item| item.fmt_indented(f, depth + 1))
            }
            Regex::Maybe(inner) => {
                writeln!(f, "maybe:")?;
                inner.fmt_indented(f, depth + 1)
            }
            Regex::Star(inner) => {
                writeln!(f, "star:")?;
                inner.fmt_indented(f, depth + 1)
            }
            Regex::Plus(inner) => {
                writeln!(f, "plus:")?;
                inner.fmt_indented(f, depth + 1)
            }
            Regex::Repeat { min, max, inner } => {
                match (min, max) {
                    (Some(n), Some(m)) => writeln!(f, "repeat{{{n},{m}}}:"),
                    (Some(n), None) => writeln!(f, "repeat{{{n},}}:"),
                    (None, Some(m)) => writeln!(f, "repeat{{,{m}}}:"),
                    (None, None) => writeln!(f, "repeat{{,}}:"),
                }?;
                inner.fmt_indented(f, depth + 1)
            }
        }
    }
}

/// The verbose tree dump printed by `moonlime -v`, one node per line,
/// children indented by one space.
impl fmt::Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}
