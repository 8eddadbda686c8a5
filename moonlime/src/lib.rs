//!# moonlime
//!
//! `moonlime` is a lexical-scanner generator: it compiles a specification
//! of regular-expression/action rules into a C implementation file (and
//! optional header) embedding a tabular DFA and a driver loop implementing
//! the classic longest-match, earliest-rule scanning discipline.
//!
//! ## Usage
//!
//! ```rust
//! use moonlime::emit::{Codegen, LEXER_TEMPLATE};
//! use moonlime::nfa::Nfa;
//!
//! let source = b"
//! %prefix Words
//! [ \\t\\n]+ { /* skip */ }
//! [abcdefghijklmnopqrstuvwxyz]+ { word(yytext, yylen); }
//! ";
//! let spec = moonlime::parser::parse(source).unwrap();
//! let nfa = Nfa::from_spec(&spec);
//! let dfa = nfa.to_dfa();
//!
//! // The reference evaluator implements the same longest-match rule as
//! // the generated driver: "hello" is a 5-byte match of rule 2.
//! assert_eq!(dfa.longest_match(0, b"hello world"), Some((5, 2)));
//!
//! let mut out = Vec::new();
//! Codegen::new(&spec, &dfa).expand(LEXER_TEMPLATE, &mut out).unwrap();
//! let generated = String::from_utf8(out).unwrap();
//! assert!(generated.contains("WordsInit"));
//! assert!(generated.contains("case 2: {"));
//! ```
//!
//! ## Specification files
//!
//! A specification is a sequence of directives and rules. A rule is a
//! regex, optionally prefixed by a `<state,...>` selector list, followed
//! by a brace-delimited action block that is pasted verbatim into the
//! generated dispatch switch:
//!
//! ```text
//! %state CODE
//! %state STRING
//! <CODE>\"   { YYSTART(STRING); }
//! <STRING>\" { YYSTART(CODE); }
//! <STRING>.  { push_char(yytext[0]); }
//! <CODE>.    { putchar(yytext[0]); }
//! ```
//!
//! Regexes support literals, escapes (`\n`, `\t`, `\xHH`, `\c`), `.`,
//! character classes `[...]`/`[^...]` (no ranges), grouping, alternation
//! `|`, the quantifiers `?`/`*`/`+`, and bounded repetition `{n}`,
//! `{n,}`, `{n,m}`, `{,m}`. Whitespace inside a pattern is insignificant
//! (escape it or put it in a class to match it), and `/* ... */` comments
//! are allowed between tokens.
//!
//! Directives: `%top { ... }` and `%header { ... }` splice code blocks
//! into the output, `%state`/`%initstate` declare start states,
//! `%prefix` renames the generated entry points, and `%ustate` threads a
//! user-context parameter into the read function and every action.
//!
//! ## Pipeline
//!
//! * [parser::parse] — specification text to a [spec::LexerSpec]
//! * [nfa::Nfa::from_spec] — Thompson construction over the rule union,
//!   one synthetic entry per start state
//! * [nfa::Nfa::to_dfa] — subset construction with rule priority baked
//!   into the accepting states
//! * [emit::Codegen] — table serialization and template expansion
//!
//! The [nfa::NfaEvaluator] and [dfa::DfaEvaluator] reference matchers
//! execute the automata directly; they exist so the construction can be
//! validated against the generated driver's semantics without a C
//! compiler in the loop.

pub mod charset;
pub mod dfa;
pub mod emit;
pub mod nfa;
pub mod parser;
pub mod regex;
pub mod spec;
mod util;
