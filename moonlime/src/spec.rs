//! # Parsed lexer specifications
//! A [LexerSpec] is what [crate::parser::parse] produces: the ordered rule
//! list, the declared start states, and the directive-supplied template
//! variables. It is the sole input to NFA construction and to the emitter.

use crate::regex::Regex;

/// One rule of the specification: a pattern, the action code to paste into
/// the generated dispatch switch, and the start states the rule is active
/// in (empty meaning all of them).
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub regex: Regex,
    /// Action code, verbatim bytes between the braces.
    pub code: Vec<u8>,
    /// Selector names, insertion-ordered and deduplicated.
    pub selectors: Vec<String>,
    /// 1-based declaration order; doubles as the done-number and as the
    /// tie-breaker on ambiguous matches (lower wins).
    pub index: usize,
}

/// Everything collected from one specification file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LexerSpec {
    pub rules: Vec<Rule>,
    /// Declared start states, insertion-ordered and deduplicated. The
    /// position of a name here is its ordinal in the emitted
    /// `YY_STATE_<name>` defines.
    pub start_states: Vec<String>,
    /// Name of the initial start state. The first `%state` unless
    /// `%initstate` was given; filled with the synthetic `"A"` by
    /// [LexerSpec::finish] when nothing was declared.
    pub initial_state: Option<String>,
    /// `%header` block: emitted into the header file and the top of the
    /// implementation file.
    pub header: Option<Vec<u8>>,
    /// `%top` block: emitted into the implementation file after the header.
    pub top: Option<Vec<u8>>,
    /// `%prefix` name; `Lexer` when absent.
    pub prefix: Option<String>,
    /// `%ustate` type name threaded through `%UPARAM%`/`%UARG%`/`%UDECL%`.
    pub ustate: Option<String>,
}

impl LexerSpec {
    /// Records a start state, keeping first-occurrence order. The first
    /// declared state becomes the initial state unless one was already
    /// chosen.
    pub(crate) fn declare_state(&mut self, name: &str) {
        if !self.start_states.iter().any(|s| s == name) {
            self.start_states.push(name.to_owned());
        }
        if self.initial_state.is_none() {
            self.initial_state = Some(name.to_owned());
        }
    }

    /// Applies the end-of-parse defaults: a spec that declares no start
    /// states gets the single synthetic state `"A"`.
    pub(crate) fn finish(&mut self) {
        if self.start_states.is_empty() {
            self.start_states.push("A".to_owned());
            self.initial_state = Some("A".to_owned());
        }
    }

    /// The initial start state's name.
    pub fn initial_state(&self) -> &str {
        self.initial_state
            .as_deref()
            .or(self.start_states.first().map(String::as_str))
            .unwrap_or("A")
    }

    /// The ordinal of the initial start state in [LexerSpec::start_states].
    pub fn initial_ordinal(&self) -> usize {
        let name = self.initial_state();
        self.start_states
            .iter()
            .position(|s| s == name)
            .unwrap_or(0)
    }

    /// The identifier prefix for the generated entry points.
    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or("Lexer")
    }
}
