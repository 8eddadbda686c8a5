//! # Specification parser
//! Parses a `.ml` lexer specification into a [LexerSpec]: directives, rules
//! made of a regex, an optional `<state,...>` selector list and a
//! brace-delimited action block, with `/* ... */` comments and whitespace
//! in between.
//!
//! The parser is a small mode machine mirroring the scanner states of the
//! specification language: top level, inside a regex, inside `<...>`,
//! inside `[...]`, inside a code block, and the three directive-argument
//! states. Each mode has its own token recognizer in [tokens]; regexes are
//! assembled incrementally by the operator stack in [builder].
//!
//! ```
//! let source = b"
//! %state INITIAL
//! /* keywords before identifiers */
//! if              { keyword(); }
//! [a-z]\\|x        { chars(); }
//! ";
//! let spec = moonlime::parser::parse(source).unwrap();
//! assert_eq!(spec.rules.len(), 2);
//! assert_eq!(spec.start_states, vec!["INITIAL".to_string()]);
//! assert_eq!(spec.rules[0].code, b" keyword(); ");
//! ```
//!
//! Note that character classes have no range syntax: `[a-z]` is the
//! three-byte class of `a`, `-` and `z`.

mod builder;
mod tokens;

use crate::charset::{escape_byte, ByteSet};
use crate::regex::Regex;
use crate::spec::{LexerSpec, Rule};
use builder::{BuildError, RegexBuilder};
use nom::IResult;
use std::mem;
use thiserror::Error;
use tokens::{ArgToken, ClassToken, CodeToken, SelectorToken, Token};

/// A syntax error in a lexer specification, with the line it was found on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {0}: unknown directive '{1}'")]
    UnknownDirective(usize, String),
    #[error("line {0}: expected an identifier after the directive")]
    ExpectedIdentifier(usize),
    #[error("line {0}: expected '{{' after the directive")]
    ExpectedCodeBlock(usize),
    #[error("line {0}: unexpected text after a directive argument")]
    TrailingDirectiveText(usize),
    #[error("line {0}: invalid start-state selector '{1}'")]
    InvalidSelector(usize, String),
    #[error("line {0}: repetition applied to an empty regex")]
    EmptyRepetition(usize),
    #[error("line {0}: bad repetition bounds {{{1},{2}}}")]
    BadRepetitionBounds(usize, u32, u32),
    #[error("line {0}: improper parenthesis nesting")]
    UnbalancedParens(usize),
    #[error("line {0}: code action inside a paren sub-regex")]
    CodeInsideParens(usize),
    #[error("line {0}: code action without a regex")]
    CodeWithoutRegex(usize),
    #[error("line {0}: unexpected character '{1}'")]
    UnexpectedChar(usize, String),
    #[error("line {0}: invalid escape sequence")]
    InvalidEscape(usize),
    #[error("line {0}: unterminated comment")]
    UnterminatedComment(usize),
    #[error("line {0}: unterminated string literal in action code")]
    UnterminatedString(usize),
    #[error("unexpected end of file inside {0}")]
    UnexpectedEof(&'static str),
}

/// Parses a complete specification. The returned [LexerSpec] has the
/// end-of-parse defaults applied (a spec without `%state` declarations gets
/// the synthetic start state `"A"`).
pub fn parse(source: &[u8]) -> Result<LexerSpec, ParseError> {
    Parser::new(source).run()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Main,
    Regex,
    Selector,
    Class,
    Code,
    /// Awaiting the identifier argument of `%state`/`%initstate`/
    /// `%prefix`/`%ustate`.
    DirectiveArg,
    /// Awaiting the `{` of `%top`/`%header`.
    DirectiveBlock,
    /// Awaiting whitespace after a directive argument.
    AfterArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    Top,
    Header,
    State,
    InitState,
    Prefix,
    Ustate,
}

struct Parser<'a> {
    rest: &'a [u8],
    line: usize,
    mode: Mode,
    spec: LexerSpec,
    builder: RegexBuilder,
    directive: Option<Directive>,
    /// Selector names collected for the upcoming rule.
    selectors: Vec<String>,
    /// The finished regex of the rule whose action block is open.
    pending: Option<Regex>,
    /// Bytes of the open code block.
    code: Vec<u8>,
    /// Brace-nesting depth inside the code block.
    nest: usize,
    /// The open character class, with its negation flag.
    class: Option<(bool, ByteSet)>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a [u8]) -> Self {
        Self {
            rest: source,
            line: 1,
            mode: Mode::Main,
            spec: LexerSpec::default(),
            builder: RegexBuilder::new(),
            directive: None,
            selectors: Vec::new(),
            pending: None,
            code: Vec::new(),
            nest: 0,
            class: None,
        }
    }

    fn run(mut self) -> Result<LexerSpec, ParseError> {
        while !self.rest.is_empty() {
            match self.mode {
                Mode::Main | Mode::Regex => self.step_pattern()?,
                Mode::Selector => self.step_selector()?,
                Mode::Class => self.step_class()?,
                Mode::Code => self.step_code()?,
                Mode::DirectiveArg | Mode::DirectiveBlock | Mode::AfterArg => {
                    self.step_directive()?
                }
            }
        }
        if !matches!(self.mode, Mode::Main | Mode::AfterArg) {
            return Err(self.eof_error());
        }
        self.spec.finish();
        Ok(self.spec)
    }

    /// Runs one token recognizer against the remaining input, advancing the
    /// position and the line counter past the consumed bytes.
    fn next<T>(
        &mut self,
        recognize: impl Fn(&'a [u8]) -> IResult<&'a [u8], T>,
    ) -> Result<T, ParseError> {
        match recognize(self.rest) {
            Ok((rest, token)) => {
                let consumed = &self.rest[..self.rest.len() - rest.len()];
                self.line += consumed.iter().filter(|&&b| b == b'\n').count();
                self.rest = rest;
                Ok(token)
            }
            Err(_) => Err(self.token_error()),
        }
    }

    /// Classifies a failed token recognition by looking at the input that
    /// refused to lex.
    fn token_error(&self) -> ParseError {
        match self.rest.first().copied() {
            None => self.eof_error(),
            Some(_) if self.rest.starts_with(b"/*") => {
                ParseError::UnterminatedComment(self.line)
            }
            Some(b'\\') => ParseError::InvalidEscape(self.line),
            Some(b'"' | b'\'') if self.mode == Mode::Code => {
                ParseError::UnterminatedString(self.line)
            }
            Some(b) => ParseError::UnexpectedChar(self.line, printable(&[b])),
        }
    }

    fn eof_error(&self) -> ParseError {
        ParseError::UnexpectedEof(match self.mode {
            Mode::Main | Mode::AfterArg => "the specification",
            Mode::Regex => "a rule's pattern",
            Mode::Selector => "a start-state selector",
            Mode::Class => "a character class",
            Mode::Code => "an action block",
            Mode::DirectiveArg | Mode::DirectiveBlock => "a directive",
        })
    }

    fn step_pattern(&mut self) -> Result<(), ParseError> {
        let line = self.line;
        let token = if self.mode == Mode::Main {
            self.next(tokens::main_token)?
        } else {
            self.next(tokens::regex_token)?
        };
        match token {
            Token::Skip => {}
            Token::Directive(name) => self.begin_directive(name, line)?,
            Token::SelectorOpen => self.mode = Mode::Selector,
            Token::Dot => {
                self.builder.atom(Regex::Any);
                self.mode = Mode::Regex;
            }
            Token::Literal(b) => {
                self.builder.atom(Regex::Char(b));
                self.mode = Mode::Regex;
            }
            Token::ClassOpen { negated } => {
                self.class = Some((negated, ByteSet::new()));
                self.mode = Mode::Class;
            }
            Token::GroupOpen => {
                self.builder.open_group();
                self.mode = Mode::Regex;
            }
            Token::GroupClose => {
                self.builder
                    .close_group()
                    .map_err(|_| ParseError::UnbalancedParens(line))?;
                self.mode = Mode::Regex;
            }
            Token::Alternate => {
                self.builder.alternate();
                self.mode = Mode::Regex;
            }
            Token::Maybe => self.quantify(line, Regex::Maybe)?,
            Token::Star => self.quantify(line, Regex::Star)?,
            Token::Plus => self.quantify(line, Regex::Plus)?,
            Token::Repeat { min, max } => {
                if let (Some(n), Some(m)) = (min, max) {
                    if n > m {
                        return Err(ParseError::BadRepetitionBounds(line, n, m));
                    }
                }
                self.quantify(line, |inner| Regex::Repeat { min, max, inner })?;
            }
            Token::CodeOpen => {
                let regex = self.builder.finish().map_err(|e| match e {
                    BuildError::CodeInsideParens => ParseError::CodeInsideParens(line),
                    _ => ParseError::CodeWithoutRegex(line),
                })?;
                self.pending = Some(regex);
                self.code.clear();
                self.nest = 1;
                self.directive = None;
                self.mode = Mode::Code;
            }
        }
        Ok(())
    }

    fn quantify(
        &mut self,
        line: usize,
        wrap: impl FnOnce(Box<Regex>) -> Regex,
    ) -> Result<(), ParseError> {
        self.builder
            .quantify(wrap)
            .map_err(|_| ParseError::EmptyRepetition(line))?;
        self.mode = Mode::Regex;
        Ok(())
    }

    fn begin_directive(&mut self, name: &[u8], line: usize) -> Result<(), ParseError> {
        let (directive, mode) = match name {
            b"%top" => (Directive::Top, Mode::DirectiveBlock),
            b"%header" => (Directive::Header, Mode::DirectiveBlock),
            b"%state" => (Directive::State, Mode::DirectiveArg),
            b"%initstate" => (Directive::InitState, Mode::DirectiveArg),
            b"%prefix" => (Directive::Prefix, Mode::DirectiveArg),
            b"%ustate" => (Directive::Ustate, Mode::DirectiveArg),
            _ => return Err(ParseError::UnknownDirective(line, printable(name))),
        };
        self.directive = Some(directive);
        self.mode = mode;
        Ok(())
    }

    fn step_selector(&mut self) -> Result<(), ParseError> {
        let line = self.line;
        match self.next(tokens::selector_token)? {
            SelectorToken::Close => self.mode = Mode::Regex,
            SelectorToken::Comma => {}
            SelectorToken::Name(bytes) => {
                if !tokens::is_identifier(bytes) {
                    return Err(ParseError::InvalidSelector(line, printable(bytes)));
                }
                let name = String::from_utf8_lossy(bytes).into_owned();
                if self.selectors.iter().all(|s| *s != name) {
                    self.selectors.push(name);
                }
            }
        }
        Ok(())
    }

    fn step_class(&mut self) -> Result<(), ParseError> {
        match self.next(tokens::class_token)? {
            ClassToken::Byte(b) => {
                if let Some((_, set)) = &mut self.class {
                    set.insert(b);
                }
            }
            ClassToken::Close => {
                let (negated, set) = self
                    .class
                    .take()
                    .expect("a class is open while in class mode");
                self.builder.atom(Regex::Class { negated, set });
                self.mode = Mode::Regex;
            }
        }
        Ok(())
    }

    fn step_code(&mut self) -> Result<(), ParseError> {
        match self.next(tokens::code_token)? {
            CodeToken::Open => {
                self.nest += 1;
                self.code.push(b'{');
            }
            CodeToken::Chunk(bytes) => self.code.extend_from_slice(bytes),
            CodeToken::Close => {
                self.nest -= 1;
                if self.nest > 0 {
                    self.code.push(b'}');
                    return Ok(());
                }
                let code = mem::take(&mut self.code);
                match self.directive.take() {
                    Some(Directive::Top) => self.spec.top = Some(code),
                    Some(Directive::Header) => self.spec.header = Some(code),
                    None => {
                        let regex = self
                            .pending
                            .take()
                            .expect("a rule's regex is finished before its action opens");
                        let index = self.spec.rules.len() + 1;
                        self.spec.rules.push(Rule {
                            regex,
                            code,
                            selectors: mem::take(&mut self.selectors),
                            index,
                        });
                    }
                    Some(other) => unreachable!("directive {other:?} has no code block"),
                }
                self.mode = Mode::Main;
            }
        }
        Ok(())
    }

    fn step_directive(&mut self) -> Result<(), ParseError> {
        let line = self.line;
        let token = match self.next(tokens::arg_token) {
            Ok(token) => token,
            // An unexpected character here gets the mode-specific message.
            Err(ParseError::UnexpectedChar(line, _)) => {
                return Err(match self.mode {
                    Mode::DirectiveArg => ParseError::ExpectedIdentifier(line),
                    Mode::DirectiveBlock => ParseError::ExpectedCodeBlock(line),
                    _ => ParseError::TrailingDirectiveText(line),
                });
            }
            Err(e) => return Err(e),
        };
        match (self.mode, token) {
            (_, ArgToken::Skip) => {
                if self.mode == Mode::AfterArg {
                    self.mode = Mode::Main;
                }
            }
            (Mode::DirectiveArg, ArgToken::Ident(name)) => {
                let name = String::from_utf8_lossy(name).into_owned();
                match self
                    .directive
                    .take()
                    .expect("a directive is active while awaiting its argument")
                {
                    Directive::State => self.spec.declare_state(&name),
                    Directive::InitState => {
                        self.spec.initial_state = Some(name.clone());
                        self.spec.declare_state(&name);
                    }
                    Directive::Prefix => self.spec.prefix = Some(name),
                    Directive::Ustate => self.spec.ustate = Some(name),
                    other => unreachable!("directive {other:?} takes no identifier"),
                }
                self.mode = Mode::AfterArg;
            }
            (Mode::DirectiveBlock, ArgToken::OpenBrace) => {
                self.code.clear();
                self.nest = 1;
                self.mode = Mode::Code;
            }
            (Mode::DirectiveArg, _) => return Err(ParseError::ExpectedIdentifier(line)),
            (Mode::DirectiveBlock, _) => return Err(ParseError::ExpectedCodeBlock(line)),
            (_, _) => return Err(ParseError::TrailingDirectiveText(line)),
        }
        Ok(())
    }
}

/// Renders token bytes for an error message, escaping the unprintable.
fn printable(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::new();
    for &b in bytes {
        // the Display-style escape never fails on a String
        let _ = escape_byte(b, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regex::Regex::*;

    fn parse_ok(source: &[u8]) -> LexerSpec {
        parse(source).unwrap()
    }

    fn single_rule(source: &[u8]) -> Rule {
        let spec = parse_ok(source);
        assert_eq!(spec.rules.len(), 1, "expected one rule");
        spec.rules.into_iter().next().unwrap()
    }

    #[test]
    fn empty_spec_gets_synthetic_state() {
        let spec = parse_ok(b"");
        assert!(spec.rules.is_empty());
        assert_eq!(spec.start_states, vec!["A"]);
        assert_eq!(spec.initial_state(), "A");
    }

    #[test]
    fn directives_fill_the_spec() {
        let spec = parse_ok(
            b"%top { #include \"y.h\" }\n\
              %header { int f(void); }\n\
              %state S\n%initstate T\n%prefix My\n%ustate ctx_t\n",
        );
        assert_eq!(spec.top.as_deref(), Some(&b" #include \"y.h\" "[..]));
        assert_eq!(spec.header.as_deref(), Some(&b" int f(void); "[..]));
        assert_eq!(spec.start_states, vec!["S", "T"]);
        assert_eq!(spec.initial_state(), "T");
        assert_eq!(spec.initial_ordinal(), 1);
        assert_eq!(spec.prefix(), "My");
        assert_eq!(spec.ustate.as_deref(), Some("ctx_t"));
    }

    #[test]
    fn last_directive_wins() {
        let spec = parse_ok(b"%top { a }\n%top { b }\n%prefix X\n%prefix Y\n");
        assert_eq!(spec.top.as_deref(), Some(&b" b "[..]));
        assert_eq!(spec.prefix(), "Y");
    }

    #[test]
    fn rule_collects_regex_selectors_and_code() {
        let rule = single_rule(b"%state S\n%state T\n<T,S,T>ab { act(); }\n");
        assert_eq!(rule.selectors, vec!["T", "S"]);
        assert_eq!(rule.code, b" act(); ");
        assert_eq!(rule.index, 1);
        assert_eq!(rule.regex, Sequence(vec![Char(b'a'), Char(b'b')]));
    }

    #[test]
    fn rule_indices_are_declaration_order() {
        let spec = parse_ok(b"a { one(); }\nb { two(); }\nc { three(); }\n");
        let indices: Vec<_> = spec.rules.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn alternation_and_grouping() {
        let rule = single_rule(b"a|b(c|d)* {}\n");
        assert_eq!(
            rule.regex,
            Alt(vec![
                Char(b'a'),
                Sequence(vec![
                    Char(b'b'),
                    Star(Box::new(Alt(vec![Char(b'c'), Char(b'd')]))),
                ]),
            ])
        );
    }

    #[test]
    fn quantifiers_and_bounds() {
        let rule = single_rule(b"a?b+c{2,4}d{3}e{,5}f{1,} {}\n");
        assert_eq!(
            rule.regex,
            Sequence(vec![
                Maybe(Box::new(Char(b'a'))),
                Plus(Box::new(Char(b'b'))),
                Repeat { min: Some(2), max: Some(4), inner: Box::new(Char(b'c')) },
                Repeat { min: Some(3), max: Some(3), inner: Box::new(Char(b'd')) },
                Repeat { min: None, max: Some(5), inner: Box::new(Char(b'e')) },
                Repeat { min: Some(1), max: None, inner: Box::new(Char(b'f')) },
            ])
        );
    }

    #[test]
    fn character_classes_have_no_ranges() {
        let rule = single_rule(b"[a-c] {}\n");
        let expected: ByteSet = [b'a', b'-', b'c'].into_iter().collect();
        assert_eq!(
            rule.regex,
            Class { negated: false, set: expected }
        );
    }

    #[test]
    fn negated_class_and_escapes() {
        let rule = single_rule(b"[^\\n\\t\\x20] {}\n");
        let expected: ByteSet = [b'\n', b'\t', b' '].into_iter().collect();
        assert_eq!(
            rule.regex,
            Class { negated: true, set: expected }
        );
    }

    #[test]
    fn whitespace_inside_class_is_a_member() {
        let rule = single_rule(b"[a b] {}\n");
        let expected: ByteSet = [b'a', b' ', b'b'].into_iter().collect();
        assert_eq!(rule.regex, Class { negated: false, set: expected });
    }

    #[test]
    fn escapes_make_literals() {
        let rule = single_rule(b"\\n\\x41\\* {}\n");
        assert_eq!(
            rule.regex,
            Sequence(vec![Char(b'\n'), Char(b'A'), Char(b'*')])
        );
    }

    #[test]
    fn whitespace_splits_nothing_in_a_pattern() {
        // whitespace between atoms is skipped, not significant
        let rule = single_rule(b"a b {}\n");
        assert_eq!(rule.regex, Sequence(vec![Char(b'a'), Char(b'b')]));
    }

    #[test]
    fn nested_braces_in_actions() {
        let rule = single_rule(b"a { if (x) { y(); } }\n");
        assert_eq!(rule.code, b" if (x) { y(); } ");
    }

    #[test]
    fn action_braces_in_strings_do_not_nest() {
        let rule = single_rule(b"a { s = \"}\"; c = '}'; /* } */ }\n");
        assert_eq!(rule.code, b" s = \"}\"; c = '}'; /* } */ ");
    }

    #[test]
    fn comments_are_skipped_between_rules() {
        let spec = parse_ok(b"/* one */ a {} /* two */ b {}\n");
        assert_eq!(spec.rules.len(), 2);
    }

    #[test]
    fn comment_inside_pattern_is_skipped() {
        let rule = single_rule(b"a/* gap */b {}\n");
        assert_eq!(rule.regex, Sequence(vec![Char(b'a'), Char(b'b')]));
    }

    #[test]
    fn errors_carry_line_numbers() {
        assert_eq!(
            parse(b"a {}\n\n* {}\n"),
            Err(ParseError::EmptyRepetition(3))
        );
    }

    #[test]
    fn error_cases() {
        assert!(matches!(
            parse(b"%bogus x\n"),
            Err(ParseError::UnknownDirective(1, _))
        ));
        assert_eq!(parse(b"a) {}\n"), Err(ParseError::UnbalancedParens(1)));
        assert_eq!(parse(b"(a{}\n"), Err(ParseError::CodeInsideParens(1)));
        assert_eq!(parse(b"{ code }\n"), Err(ParseError::CodeWithoutRegex(1)));
        assert_eq!(
            parse(b"a{4,2} {}\n"),
            Err(ParseError::BadRepetitionBounds(1, 4, 2))
        );
        assert_eq!(
            parse(b"<S>{ code }\n"),
            Err(ParseError::CodeWithoutRegex(1))
        );
        assert!(matches!(
            parse(b"< a>x {}\n"),
            Err(ParseError::InvalidSelector(1, _))
        ));
        assert_eq!(parse(b"%state 9x\n"), Err(ParseError::ExpectedIdentifier(1)));
        assert_eq!(parse(b"%top (\n"), Err(ParseError::ExpectedCodeBlock(1)));
        assert_eq!(
            parse(b"%state S%state T\n"),
            Err(ParseError::TrailingDirectiveText(1))
        );
        assert_eq!(parse(b"a] {}\n"), Err(ParseError::UnexpectedChar(1, "]".into())));
        assert_eq!(parse(b"ab\\xg4 {}\n"), Err(ParseError::InvalidEscape(1)));
        assert_eq!(parse(b"/* no end\n"), Err(ParseError::UnterminatedComment(1)));
        assert_eq!(
            parse(b"a { \"open\n"),
            Err(ParseError::UnterminatedString(1))
        );
    }

    #[test]
    fn eof_errors_name_the_open_construct() {
        assert_eq!(
            parse(b"ab"),
            Err(ParseError::UnexpectedEof("a rule's pattern"))
        );
        assert_eq!(
            parse(b"a { code"),
            Err(ParseError::UnexpectedEof("an action block"))
        );
        assert_eq!(
            parse(b"[ab"),
            Err(ParseError::UnexpectedEof("a character class"))
        );
        assert_eq!(
            parse(b"<S"),
            Err(ParseError::UnexpectedEof("a start-state selector"))
        );
        assert_eq!(
            parse(b"%state"),
            Err(ParseError::UnexpectedEof("a directive"))
        );
    }

    #[test]
    fn directive_argument_allows_same_line_rule() {
        // a single whitespace byte ends the argument wait state
        let spec = parse_ok(b"%state S x { act(); }\n");
        assert_eq!(spec.start_states, vec!["S"]);
        assert_eq!(spec.rules.len(), 1);
        assert_eq!(spec.rules[0].regex, Char(b'x'));
    }

    #[test]
    fn percent_mid_regex_is_literal() {
        let rule = single_rule(b"a% {}\n");
        assert_eq!(rule.regex, Sequence(vec![Char(b'a'), Char(b'%')]));
    }

    #[test]
    fn empty_alternative_gets_epsilon() {
        let rule = single_rule(b"(a|) {}\n");
        assert_eq!(rule.regex, Alt(vec![Char(b'a'), Epsilon]));
    }
}
