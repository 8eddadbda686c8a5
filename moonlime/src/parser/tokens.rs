//! Token-level recognizers, one set per scanner mode. All parsers work on
//! raw byte slices since specification files are 8-bit clean and never
//! assumed to be UTF-8.

use nom::branch::alt;
use nom::bytes::complete::{tag, take, take_till1, take_until, take_while, take_while1};
use nom::combinator::{cut, map, map_res, opt, recognize, value, verify};
use nom::sequence::{pair, preceded, terminated};
use nom::IResult;

/// A token in `MAIN` or `IN_REGEX` mode. The two modes share the regex
/// alphabet; directives and selector openers only lex from `MAIN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Token<'a> {
    /// Whitespace or a comment.
    Skip,
    /// `%name`, including the percent sign.
    Directive(&'a [u8]),
    /// `<` introducing a start-state selector list.
    SelectorOpen,
    /// A literal byte, either bare or from an escape sequence.
    Literal(u8),
    Dot,
    ClassOpen { negated: bool },
    GroupOpen,
    GroupClose,
    Alternate,
    Maybe,
    Star,
    Plus,
    /// `{n}`, `{n,}`, `{n,m}` or `{,m}`.
    Repeat { min: Option<u32>, max: Option<u32> },
    /// A bare `{` opening the rule's action block.
    CodeOpen,
}

/// A token inside `<...>`: names are maximal runs of anything that is not a
/// comma or the closing angle bracket, validated as identifiers afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum SelectorToken<'a> {
    Name(&'a [u8]),
    Comma,
    Close,
}

/// A token inside a character class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum ClassToken {
    Close,
    Byte(u8),
}

/// A token inside a brace-delimited code block. String literals, character
/// literals and comments come through as single chunks so braces inside
/// them never touch the nesting depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum CodeToken<'a> {
    Open,
    Close,
    Chunk(&'a [u8]),
}

/// A token while waiting for a directive's argument (`PRE_C_TOKEN`,
/// `PRE_C_CODE`) or for the end of line after one (`NON_WHSP_IS_ERROR`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum ArgToken<'a> {
    Skip,
    Ident(&'a [u8]),
    OpenBrace,
}

fn ws(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'))(input)
}

fn comment(input: &[u8]) -> IResult<&[u8], &[u8]> {
    recognize(preceded(
        tag("/*"),
        cut(terminated(take_until("*/"), tag("*/"))),
    ))(input)
}

pub(super) fn is_identifier(bytes: &[u8]) -> bool {
    match bytes.split_first() {
        None => false,
        Some((&first, rest)) => {
            (first.is_ascii_alphabetic() || first == b'_')
                && rest.iter().all(|&b| b.is_ascii_alphanumeric() || b == b'_')
        }
    }
}

fn identifier(input: &[u8]) -> IResult<&[u8], &[u8]> {
    recognize(pair(
        verify(take(1usize), |b: &[u8]| {
            b[0].is_ascii_alphabetic() || b[0] == b'_'
        }),
        take_while(|b: u8| b.is_ascii_alphanumeric() || b == b'_'),
    ))(input)
}

fn hex_digit(input: &[u8]) -> IResult<&[u8], u8> {
    map(
        verify(take(1usize), |b: &[u8]| b[0].is_ascii_hexdigit()),
        |b: &[u8]| match b[0] {
            d @ b'0'..=b'9' => d - b'0',
            d @ b'a'..=b'f' => d - b'a' + 10,
            d => d - b'A' + 10,
        },
    )(input)
}

/// `\n`, `\t`, `\xHH` (exactly two hex digits), or `\c` for a literal `c`.
/// Commits after the backslash: a lone trailing `\` or a malformed `\x` is
/// a hard error, not a literal.
fn escape(input: &[u8]) -> IResult<&[u8], u8> {
    preceded(
        tag("\\"),
        cut(alt((
            value(b'\n', tag("n")),
            value(b'\t', tag("t")),
            preceded(tag("x"), cut(map(pair(hex_digit, hex_digit), |(hi, lo)| (hi << 4) | lo))),
            map(take(1usize), |b: &[u8]| b[0]),
        ))),
    )(input)
}

fn number(input: &[u8]) -> IResult<&[u8], u32> {
    map_res(take_while1(|b: u8| b.is_ascii_digit()), |digits: &[u8]| {
        String::from_utf8_lossy(digits).parse::<u32>()
    })(input)
}

/// The four repetition forms. Anything else starting with `{` (including
/// `{}` and `{,}`) is not a repetition, so the brace falls through to
/// [Token::CodeOpen].
fn repeat_bounds(input: &[u8]) -> IResult<&[u8], Token> {
    terminated(
        preceded(
            tag("{"),
            alt((
                map(
                    pair(number, opt(preceded(tag(","), opt(number)))),
                    |(n, tail)| match tail {
                        None => Token::Repeat {
                            min: Some(n),
                            max: Some(n),
                        },
                        Some(None) => Token::Repeat {
                            min: Some(n),
                            max: None,
                        },
                        Some(Some(m)) => Token::Repeat {
                            min: Some(n),
                            max: Some(m),
                        },
                    },
                ),
                map(preceded(tag(","), number), |m| Token::Repeat {
                    min: None,
                    max: Some(m),
                }),
            )),
        ),
        tag("}"),
    )(input)
}

fn class_open(input: &[u8]) -> IResult<&[u8], Token> {
    map(preceded(tag("["), opt(tag("^"))), |neg| Token::ClassOpen {
        negated: neg.is_some(),
    })(input)
}

/// Any byte that is not claimed by another rule and not lexically invalid.
/// `<` and `]` are the only bytes with no reading at all in regex context.
fn literal(input: &[u8]) -> IResult<&[u8], Token> {
    map(
        verify(take(1usize), |b: &[u8]| b[0] != b'<' && b[0] != b']'),
        |b: &[u8]| Token::Literal(b[0]),
    )(input)
}

pub(super) fn regex_token(input: &[u8]) -> IResult<&[u8], Token> {
    alt((
        value(Token::Skip, ws),
        value(Token::Skip, comment),
        map(escape, Token::Literal),
        value(Token::Dot, tag(".")),
        class_open,
        value(Token::GroupOpen, tag("(")),
        value(Token::GroupClose, tag(")")),
        value(Token::Alternate, tag("|")),
        value(Token::Maybe, tag("?")),
        value(Token::Star, tag("*")),
        value(Token::Plus, tag("+")),
        repeat_bounds,
        value(Token::CodeOpen, tag("{")),
        literal,
    ))(input)
}

pub(super) fn main_token(input: &[u8]) -> IResult<&[u8], Token> {
    alt((
        map(
            recognize(pair(tag("%"), take_while1(|b: u8| b.is_ascii_lowercase()))),
            Token::Directive,
        ),
        value(Token::SelectorOpen, tag("<")),
        regex_token,
    ))(input)
}

pub(super) fn selector_token(input: &[u8]) -> IResult<&[u8], SelectorToken> {
    alt((
        value(SelectorToken::Close, tag(">")),
        value(SelectorToken::Comma, tag(",")),
        map(
            take_till1(|b| b == b',' || b == b'>'),
            SelectorToken::Name,
        ),
    ))(input)
}

pub(super) fn class_token(input: &[u8]) -> IResult<&[u8], ClassToken> {
    alt((
        value(ClassToken::Close, tag("]")),
        map(escape, ClassToken::Byte),
        map(take(1usize), |b: &[u8]| ClassToken::Byte(b[0])),
    ))(input)
}

/// A string or character literal, delimiters included, honoring backslash
/// escapes. Commits once the opening quote is seen; an unterminated literal
/// is a hard error.
fn quoted(quote: u8) -> impl Fn(&[u8]) -> IResult<&[u8], &[u8]> {
    move |input| {
        if input.first() != Some(&quote) {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Char,
            )));
        }
        let mut i = 1;
        while i < input.len() {
            match input[i] {
                b if b == quote => return Ok((&input[i + 1..], &input[..=i])),
                b'\\' => i += 2,
                _ => i += 1,
            }
        }
        Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TakeUntil,
        )))
    }
}

pub(super) fn code_token(input: &[u8]) -> IResult<&[u8], CodeToken> {
    alt((
        value(CodeToken::Open, tag("{")),
        value(CodeToken::Close, tag("}")),
        map(quoted(b'"'), CodeToken::Chunk),
        map(quoted(b'\''), CodeToken::Chunk),
        map(comment, CodeToken::Chunk),
        map(
            take_till1(|b| matches!(b, b'{' | b'}' | b'"' | b'\'' | b'/')),
            CodeToken::Chunk,
        ),
        map(tag("/"), CodeToken::Chunk),
    ))(input)
}

pub(super) fn arg_token(input: &[u8]) -> IResult<&[u8], ArgToken> {
    alt((
        value(ArgToken::Skip, ws),
        value(ArgToken::Skip, comment),
        map(identifier, ArgToken::Ident),
        value(ArgToken::OpenBrace, tag("{")),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full<T>(result: IResult<&[u8], T>) -> T {
        let (rest, token) = result.unwrap();
        assert!(rest.is_empty(), "unparsed input: {rest:?}");
        token
    }

    #[test]
    fn escapes_resolve() {
        assert_eq!(full(escape(b"\\n")), b'\n');
        assert_eq!(full(escape(b"\\t")), b'\t');
        assert_eq!(full(escape(b"\\x41")), b'A');
        assert_eq!(full(escape(b"\\xfF")), 0xff);
        assert_eq!(full(escape(b"\\*")), b'*');
        assert!(matches!(escape(b"\\xg1"), Err(nom::Err::Failure(_))));
        assert!(matches!(escape(b"\\"), Err(nom::Err::Failure(_))));
    }

    #[test]
    fn repetition_forms() {
        assert_eq!(
            full(repeat_bounds(b"{3}")),
            Token::Repeat { min: Some(3), max: Some(3) }
        );
        assert_eq!(
            full(repeat_bounds(b"{3,}")),
            Token::Repeat { min: Some(3), max: None }
        );
        assert_eq!(
            full(repeat_bounds(b"{3,7}")),
            Token::Repeat { min: Some(3), max: Some(7) }
        );
        assert_eq!(
            full(repeat_bounds(b"{,7}")),
            Token::Repeat { min: None, max: Some(7) }
        );
        assert!(repeat_bounds(b"{}").is_err());
        assert!(repeat_bounds(b"{,}").is_err());
    }

    #[test]
    fn brace_without_bounds_opens_code() {
        assert_eq!(full(regex_token(b"{")), Token::CodeOpen);
        let (rest, token) = regex_token(b"{ x(); }").unwrap();
        assert_eq!(token, Token::CodeOpen);
        assert_eq!(rest, b" x(); }");
    }

    #[test]
    fn comments_skip_and_commit() {
        assert_eq!(full(regex_token(b"/* regex | stuff */")), Token::Skip);
        assert!(matches!(
            regex_token(b"/* never closed"),
            Err(nom::Err::Failure(_))
        ));
        // a slash not opening a comment is an ordinary literal
        assert_eq!(full(regex_token(b"/")), Token::Literal(b'/'));
    }

    #[test]
    fn directives_need_a_lowercase_name() {
        assert_eq!(full(main_token(b"%state")), Token::Directive(b"%state"));
        // a bare percent sign is a literal
        assert_eq!(full(main_token(b"%")), Token::Literal(b'%'));
    }

    #[test]
    fn selector_names_keep_whitespace() {
        let (rest, token) = selector_token(b" a,b>").unwrap();
        assert_eq!(token, SelectorToken::Name(b" a"));
        assert_eq!(rest, b",b>");
    }

    #[test]
    fn code_literals_hide_braces() {
        assert_eq!(full(code_token(b"\"ab}c\"")), CodeToken::Chunk(b"\"ab}c\""));
        assert_eq!(full(code_token(b"'}'")), CodeToken::Chunk(b"'}'"));
        assert_eq!(
            full(code_token(b"\"esc\\\"}\"")),
            CodeToken::Chunk(b"\"esc\\\"}\"")
        );
        assert_eq!(full(code_token(b"/* } */")), CodeToken::Chunk(b"/* } */"));
        assert!(matches!(
            code_token(b"\"open"),
            Err(nom::Err::Failure(_))
        ));
    }

    #[test]
    fn identifier_shapes() {
        assert!(is_identifier(b"abc_123"));
        assert!(is_identifier(b"_x"));
        assert!(!is_identifier(b""));
        assert!(!is_identifier(b"1abc"));
        assert!(!is_identifier(b" abc"));
        assert!(!is_identifier(b"ab cd"));
    }
}
