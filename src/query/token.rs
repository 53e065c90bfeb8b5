//! Lexer for query text. The base query body is kept as a token stream so
//! that triple patterns and expressions pass through untouched.

use std::fmt;
use std::ops::Range;

use winnow::ascii::multispace0;
use winnow::combinator::{alt, opt};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{literal, take_while};

use crate::duration;
use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// `<...>`, stored without the angle brackets.
    Iri(String),
    PrefixedName(String),
    /// Variable name without the `?`/`$` sigil.
    Var(String),
    /// String literal including its quotes and escapes.
    Literal(String),
    /// `@en`, including the `@`.
    LangTag(String),
    DatatypeMark,
    Number(String),
    BlankNode(String),
    Word(String),
    Punct(String),
}

impl Token {
    /// Case-insensitive keyword match.
    pub fn is_word(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(keyword))
    }

    pub fn is_punct(&self, p: &str) -> bool {
        matches!(self, Token::Punct(q) if q == p)
    }

    pub fn var_name(&self) -> Option<&str> {
        match self {
            Token::Var(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Iri(iri) => write!(f, "<{iri}>"),
            Token::Var(name) => write!(f, "?{name}"),
            Token::DatatypeMark => f.write_str("^^"),
            Token::PrefixedName(s)
            | Token::Literal(s)
            | Token::LangTag(s)
            | Token::Number(s)
            | Token::BlankNode(s)
            | Token::Word(s)
            | Token::Punct(s) => f.write_str(s),
        }
    }
}

/// A token with its byte range in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub span: Range<usize>,
}

// ---------------------------------------------------------------------------
// Whitespace & comments
// ---------------------------------------------------------------------------

fn ws_skip(input: &mut &str) -> ModalResult<()> {
    loop {
        let _ = multispace0.parse_next(input)?;
        if opt(literal("#")).parse_next(input)?.is_some() {
            let _ = take_while(0.., |c: char| c != '\n').parse_next(input)?;
        } else {
            break;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Terms
// ---------------------------------------------------------------------------

fn iri(input: &mut &str) -> ModalResult<Token> {
    let saved = *input;
    literal("<").parse_next(input)?;
    let body = take_while(0.., |c: char| {
        c > ' ' && !matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\')
    })
    .parse_next(input)?;
    if opt(literal(">")).parse_next(input)?.is_none() {
        *input = saved;
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    Ok(Token::Iri(body.to_string()))
}

fn is_var_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn var(input: &mut &str) -> ModalResult<Token> {
    alt((literal("?"), literal("$"))).parse_next(input)?;
    let name = take_while(1.., is_var_char).parse_next(input)?;
    Ok(Token::Var(name.to_string()))
}

fn string_literal(input: &mut &str) -> ModalResult<Token> {
    let start = *input;
    let quote = ["\"\"\"", "'''", "\"", "'"]
        .into_iter()
        .find(|q| start.starts_with(q))
        .ok_or_else(|| ErrMode::Backtrack(ContextError::new()))?;
    let mut rest = &start[quote.len()..];
    loop {
        if rest.starts_with(quote) {
            rest = &rest[quote.len()..];
            let len = start.len() - rest.len();
            *input = rest;
            return Ok(Token::Literal(start[..len].to_string()));
        }
        let mut chars = rest.chars();
        match chars.next() {
            None => return Err(ErrMode::Cut(ContextError::new())),
            Some('\\') => {
                chars.next();
            }
            Some('\n' | '\r') if quote.len() == 1 => {
                return Err(ErrMode::Cut(ContextError::new()));
            }
            Some(_) => {}
        }
        rest = chars.as_str();
    }
}

fn lang_tag(input: &mut &str) -> ModalResult<Token> {
    let start = *input;
    literal("@").parse_next(input)?;
    take_while(1.., |c: char| c.is_ascii_alphabetic()).parse_next(input)?;
    let _ = take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '-').parse_next(input)?;
    let len = start.len() - input.len();
    Ok(Token::LangTag(start[..len].to_string()))
}

fn digits<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)
}

fn number(input: &mut &str) -> ModalResult<Token> {
    let start = *input;
    let _ = opt(alt((literal("+"), literal("-")))).parse_next(input)?;
    digits.parse_next(input)?;
    // A trailing dot only belongs to the number when digits follow it.
    if input.starts_with('.') && input[1..].starts_with(|c: char| c.is_ascii_digit()) {
        literal(".").parse_next(input)?;
        digits.parse_next(input)?;
    }
    let before_exponent = *input;
    if opt(alt((literal("e"), literal("E")))).parse_next(input)?.is_some() {
        let _ = opt(alt((literal("+"), literal("-")))).parse_next(input)?;
        if opt(digits).parse_next(input)?.is_none() {
            *input = before_exponent;
        }
    }
    let len = start.len() - input.len();
    Ok(Token::Number(start[..len].to_string()))
}

fn blank_node(input: &mut &str) -> ModalResult<Token> {
    literal("_:").parse_next(input)?;
    let label = take_while(1.., |c: char| c.is_alphanumeric() || c == '_' || c == '-')
        .parse_next(input)?;
    Ok(Token::BlankNode(format!("_:{label}")))
}

/// A prefixed name when a `:` follows the prefix, otherwise a bare word.
fn name(input: &mut &str) -> ModalResult<Token> {
    let start = *input;
    let head = take_while(0.., |c: char| {
        c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
    })
    .parse_next(input)?;
    let valid_prefix = !head.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.')
        && !head.ends_with('.');
    if input.starts_with(':') && valid_prefix {
        literal(":").parse_next(input)?;
        let local = take_while(0.., |c: char| {
            c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':' | '%')
        })
        .parse_next(input)?;
        let len = head.len() + 1 + local.trim_end_matches('.').len();
        *input = &start[len..];
        return Ok(Token::PrefixedName(start[..len].to_string()));
    }
    *input = start;
    // Bare durations with fractional seconds, e.g. `PT0.5S`.
    let run = start
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '.'))
        .map_or(start, |i| &start[..i])
        .trim_end_matches('.');
    if run.starts_with('P') && run.contains('.') && duration::is_valid_duration(run) {
        *input = &start[run.len()..];
        return Ok(Token::Word(run.to_string()));
    }
    if !start.starts_with(|c: char| c.is_alphabetic() || c == '_') {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    let word = take_while(1.., |c: char| c.is_alphanumeric() || c == '_').parse_next(input)?;
    Ok(Token::Word(word.to_string()))
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

fn punct(input: &mut &str) -> ModalResult<Token> {
    if opt(literal("^^")).parse_next(input)?.is_some() {
        return Ok(Token::DatatypeMark);
    }
    for op in ["&&", "||", "!=", "<=", ">="] {
        if opt(literal(op)).parse_next(input)?.is_some() {
            return Ok(Token::Punct(op.to_string()));
        }
    }
    match input.chars().next() {
        Some(c) if "{}()[].,;=<>!+-*/^|?".contains(c) => {
            *input = &input[c.len_utf8()..];
            Ok(Token::Punct(c.to_string()))
        }
        _ => Err(ErrMode::Backtrack(ContextError::new())),
    }
}

fn token(input: &mut &str) -> ModalResult<Token> {
    alt((
        iri,
        var,
        string_literal,
        lang_tag,
        number,
        blank_node,
        name,
        punct,
    ))
    .parse_next(input)
}

/// Splits `text` into tokens, skipping whitespace and `#` comments.
pub fn tokenize(text: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut input = text;
    let mut tokens = Vec::new();
    loop {
        let lexical = |input: &str, message: &str| ParseError::Lexical {
            offset: text.len() - input.len(),
            message: message.to_string(),
        };
        ws_skip(&mut input).map_err(|_| lexical(input, "unterminated comment"))?;
        if input.is_empty() {
            break;
        }
        let offset = text.len() - input.len();
        let token = token(&mut input).map_err(|e| match e {
            ErrMode::Cut(_) => lexical(&text[offset..], "unterminated string literal"),
            _ => {
                let c = text[offset..].chars().next().unwrap_or(' ');
                lexical(&text[offset..], &format!("unexpected character '{c}'"))
            }
        })?;
        let end = text.len() - input.len();
        tokens.push(Spanned {
            token,
            span: offset..end,
        });
    }
    Ok(tokens)
}

/// Joins tokens back into text, one space apart except around literal
/// suffixes and the `NOW-` marker.
pub fn join(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut glue_next = false;
    let mut prev: Option<&Token> = None;
    for token in tokens {
        let glue = glue_next
            || matches!(token, Token::LangTag(_) | Token::DatatypeMark)
            || (token.is_punct("-") && prev.is_some_and(|p| p.is_word("NOW")));
        if !out.is_empty() && !glue {
            out.push(' ');
        }
        out.push_str(&token.to_string());
        glue_next = matches!(token, Token::DatatypeMark)
            || (token.is_punct("-") && prev.is_some_and(|p| p.is_word("NOW")));
        prev = Some(token);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(text: &str) -> Vec<Token> {
        tokenize(text).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_terms() {
        assert_eq!(
            lex("?s <http://a/b> ex:p \"x\"@en 'y'^^xsd:string _:b1 a"),
            vec![
                Token::Var("s".into()),
                Token::Iri("http://a/b".into()),
                Token::PrefixedName("ex:p".into()),
                Token::Literal("\"x\"".into()),
                Token::LangTag("@en".into()),
                Token::Literal("'y'".into()),
                Token::DatatypeMark,
                Token::PrefixedName("xsd:string".into()),
                Token::BlankNode("_:b1".into()),
                Token::Word("a".into()),
            ]
        );
    }

    #[test]
    fn test_less_than_is_not_an_iri() {
        assert_eq!(
            lex("FILTER(?a < ?b)"),
            vec![
                Token::Word("FILTER".into()),
                Token::Punct("(".into()),
                Token::Var("a".into()),
                Token::Punct("<".into()),
                Token::Var("b".into()),
                Token::Punct(")".into()),
            ]
        );
    }

    #[test]
    fn test_trailing_dots() {
        assert_eq!(
            lex("?s ex:p 42."),
            vec![
                Token::Var("s".into()),
                Token::PrefixedName("ex:p".into()),
                Token::Number("42".into()),
                Token::Punct(".".into()),
            ]
        );
        assert_eq!(
            lex("?s a ex:Person."),
            vec![
                Token::Var("s".into()),
                Token::Word("a".into()),
                Token::PrefixedName("ex:Person".into()),
                Token::Punct(".".into()),
            ]
        );
        assert_eq!(lex("1.5e3")[0], Token::Number("1.5e3".into()));
        assert_eq!(lex("PT0.5S]")[0], Token::Word("PT0.5S".into()));
    }

    #[test]
    fn test_window_clause_tokens() {
        assert_eq!(
            lex("[FROM NOW-PT1H TO NOW-PT0S]"),
            vec![
                Token::Punct("[".into()),
                Token::Word("FROM".into()),
                Token::Word("NOW".into()),
                Token::Punct("-".into()),
                Token::Word("PT1H".into()),
                Token::Word("TO".into()),
                Token::Word("NOW".into()),
                Token::Punct("-".into()),
                Token::Word("PT0S".into()),
                Token::Punct("]".into()),
            ]
        );
    }

    #[test]
    fn test_comments_and_spans() {
        let tokens = tokenize("# header\nSELECT ?x # trailing\n").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].span, 16..18);
    }

    #[test]
    fn test_lexical_errors() {
        assert!(matches!(
            tokenize("SELECT \"open"),
            Err(ParseError::Lexical { offset: 7, .. })
        ));
        assert!(matches!(
            tokenize("SELECT ~"),
            Err(ParseError::Lexical { offset: 7, .. })
        ));
    }

    #[test]
    fn test_join() {
        let tokens = lex("\"PT1H\"^^xsd:duration NOW-?x ?s ex:p ?o .");
        assert_eq!(join(&tokens), "\"PT1H\"^^xsd:duration NOW-?x ?s ex:p ?o .");
    }
}
