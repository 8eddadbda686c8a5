//! # Table emission and template expansion
//! Serializes the DFA into the table layout the generated driver indexes,
//! and splices tables, start-state defines, user code blocks and action
//! dispatch into a template. A template is ordinary text with
//! `%NAME%` placeholders; anything else, including a `%` that does not
//! open a known placeholder, is copied through byte for byte.
//!
//! | Placeholder | Expansion |
//! |-------------|-----------|
//! | `%HEADER%` | the `%header` block, or nothing |
//! | `%TOP%` | the `%top` block, or nothing |
//! | `%PREFIX%` | the `%prefix` name, or `Lexer` |
//! | `%FASTATES%` | `{done, trans_start, trans_end}` rows, one per DFA state |
//! | `%FATRANS%` | `{ {32 condition bytes}, dest }` rows, one per transition |
//! | `%FASTARTS%` | initial DFA state ids by start-state ordinal |
//! | `%START_STATE_DEFS%` | `#define YY_STATE_<name>`, `YY_MAXSTATE`, `YY_INITSTATE` |
//! | `%ACTIONS%` | `case <i>: { <code> } break;` per rule |
//! | `%UPARAM%` | `, <T> *yy_ustate` when `%ustate T` was given |
//! | `%UDECL%` | `, <T> *` when `%ustate T` was given |
//! | `%UARG%` | `, yy_ustate` when `%ustate T` was given |
//!
//! The default templates produce the implementation file (driver plus
//! tables) and the header file declaring the opaque state type and the
//! `Init`/`Destroy`/`Read` entry points.

use crate::dfa::Dfa;
use crate::spec::LexerSpec;
use std::io::{self, Write};

/// The default implementation-file template.
pub const LEXER_TEMPLATE: &str = include_str!("templates/lexer.c.in");

/// The default header-file template.
pub const HEADER_TEMPLATE: &str = include_str!("templates/lexer.h.in");

/// The recognized placeholder names, without the delimiting `%`s.
fn is_placeholder(name: &[u8]) -> bool {
    matches!(
        name,
        b"HEADER"
            | b"TOP"
            | b"PREFIX"
            | b"FASTATES"
            | b"FATRANS"
            | b"FASTARTS"
            | b"START_STATE_DEFS"
            | b"ACTIONS"
            | b"UPARAM"
            | b"UDECL"
            | b"UARG"
    )
}

/// Expands templates for one compiled specification.
pub struct Codegen<'a> {
    spec: &'a LexerSpec,
    dfa: &'a Dfa,
}

impl<'a> Codegen<'a> {
    pub fn new(spec: &'a LexerSpec, dfa: &'a Dfa) -> Self {
        Self { spec, dfa }
    }

    /// Writes the template with every placeholder substituted.
    pub fn expand(&self, template: &str, out: &mut dyn Write) -> io::Result<()> {
        let mut rest = template.as_bytes();
        while let Some(pos) = rest.iter().position(|&b| b == b'%') {
            out.write_all(&rest[..pos])?;
            let after = &rest[pos + 1..];
            let placeholder = after
                .iter()
                .position(|&b| b == b'%')
                .map(|end| (&after[..end], &after[end + 1..]));
            rest = match placeholder {
                Some((name, tail)) if is_placeholder(name) => {
                    self.emit_placeholder(name, out)?;
                    tail
                }
                _ => {
                    out.write_all(b"%")?;
                    after
                }
            };
        }
        out.write_all(rest)
    }

    fn emit_placeholder(&self, name: &[u8], out: &mut dyn Write) -> io::Result<()> {
        match name {
            b"HEADER" => {
                if let Some(header) = &self.spec.header {
                    out.write_all(header)?;
                }
            }
            b"TOP" => {
                if let Some(top) = &self.spec.top {
                    out.write_all(top)?;
                }
            }
            b"PREFIX" => out.write_all(self.spec.prefix().as_bytes())?,
            b"FASTATES" => self.fa_states(out)?,
            b"FATRANS" => self.fa_trans(out)?,
            b"FASTARTS" => self.fa_starts(out)?,
            b"START_STATE_DEFS" => self.start_state_defs(out)?,
            b"ACTIONS" => self.actions(out)?,
            b"UPARAM" => {
                if let Some(t) = &self.spec.ustate {
                    write!(out, ", {t} *yy_ustate")?;
                }
            }
            b"UDECL" => {
                if let Some(t) = &self.spec.ustate {
                    write!(out, ", {t} *")?;
                }
            }
            b"UARG" => {
                if self.spec.ustate.is_some() {
                    write!(out, ", yy_ustate")?;
                }
            }
            _ => unreachable!("placeholder names are checked before emission"),
        }
        Ok(())
    }

    /// One row per DFA state: its done-number and the half-open range of
    /// its transitions in the flat transition array.
    fn fa_states(&self, out: &mut dyn Write) -> io::Result<()> {
        let mut trans = 0;
        for (idx, state) in self.dfa.states().iter().enumerate() {
            let sep = if idx == 0 { "" } else { "," };
            write!(out, "{sep}\n {{{}, {trans}, ", state.done().unwrap_or(0))?;
            trans += state.transitions().len();
            write!(out, "{trans}}}")?;
        }
        out.write_all(b"\n")
    }

    /// The flat transition array: 32 condition bytes and a destination per
    /// transition, grouped by source state.
    fn fa_trans(&self, out: &mut dyn Write) -> io::Result<()> {
        let mut first = true;
        for state in self.dfa.states() {
            for tr in state.transitions() {
                let sep = if first { "" } else { "," };
                first = false;
                write!(out, "{sep}\n {{ {{")?;
                for (i, byte) in tr.cond().to_row().iter().enumerate() {
                    let comma = if i < 31 { "," } else { "" };
                    write!(out, "{byte}{comma}")?;
                }
                write!(out, "}}, {} }}", tr.dest())?;
            }
        }
        out.write_all(b"\n")
    }

    fn fa_starts(&self, out: &mut dyn Write) -> io::Result<()> {
        for (idx, id) in self.dfa.starts().iter().enumerate() {
            let sep = if idx == 0 { "" } else { "," };
            write!(out, "{sep}\n {id}")?;
        }
        out.write_all(b"\n")
    }

    fn start_state_defs(&self, out: &mut dyn Write) -> io::Result<()> {
        let names = &self.spec.start_states;
        for (ordinal, name) in names.iter().enumerate() {
            writeln!(out, "#define YY_STATE_{name} {ordinal}")?;
        }
        writeln!(out, "#define YY_MAXSTATE {}", names.len() - 1)?;
        writeln!(
            out,
            "#define YY_INITSTATE YY_STATE_{}",
            self.spec.initial_state()
        )
    }

    /// The action dispatch arms, numbered by rule declaration order.
    fn actions(&self, out: &mut dyn Write) -> io::Result<()> {
        for rule in &self.spec.rules {
            write!(out, "case {}: {{\n", rule.index)?;
            out.write_all(&rule.code)?;
            out.write_all(b"\n} break;\n")?;
        }
        Ok(())
    }
}
