//! Parser for native RSP-QL text.

mod cursor;

use std::time::Duration;

use oxigraph::sparql::SparqlEvaluator;
use tracing::debug;

use crate::error::ParseError;
use crate::prefixes::PrefixMapping;
use crate::query::token::{self, Token};
use crate::query::{
    DatasetClause, ExtendedQuery, GroupPattern, PatternPart, Prologue, QueryBody, ResultForm,
};
use crate::stream::OutputOperator;
use crate::term::Term;
use crate::vocabulary::xsd;
use crate::window::WindowSpec;

use cursor::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Duration,
    Count,
}

/// Parses the window and stream extensions and hands the plain SPARQL part
/// to oxigraph for validation.
#[derive(Debug, Clone)]
pub struct RspqlParser {
    validate_base: bool,
}

impl Default for RspqlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RspqlParser {
    pub fn new() -> Self {
        Self {
            validate_base: true,
        }
    }

    /// Skip the oxigraph check of the base query.
    pub fn without_base_validation(mut self) -> Self {
        self.validate_base = false;
        self
    }

    pub fn parse(&self, text: &str) -> Result<ExtendedQuery, ParseError> {
        let tokens: Vec<Token> = token::tokenize(text)?
            .into_iter()
            .map(|s| s.token)
            .collect();
        let mut cursor = Cursor::new(&tokens);

        let mut prologue = Prologue::default();
        parse_prologue(&mut cursor, &mut prologue)?;
        let register = parse_register(&mut cursor)?;
        parse_prologue(&mut cursor, &mut prologue)?;

        let resolver = Resolver {
            prefixes: &prologue.prefixes,
        };
        let (form, operator) = parse_result_form(&mut cursor)?;

        let mut dataset = Vec::new();
        let mut windows = Vec::new();
        while cursor.eat_word("FROM") {
            if cursor.eat_word("NAMED") {
                if cursor.eat_word("WINDOW") {
                    windows.push(parse_window(&mut cursor, &resolver)?);
                } else {
                    dataset.push(DatasetClause::Named(cursor.expect_iri_token()?));
                }
            } else {
                dataset.push(DatasetClause::Default(cursor.expect_iri_token()?));
            }
        }

        let has_where = cursor.eat_word("WHERE");
        let pattern = if has_where || cursor.at_punct("{") {
            cursor.expect_punct("{")?;
            Some(parse_group(&mut cursor, &resolver)?)
        } else {
            None
        };
        if pattern.is_none() && !matches!(form, ResultForm::Describe { .. }) {
            return Err(cursor.unexpected("WHERE clause"));
        }
        if matches!(form, ResultForm::Construct { template: None }) && !has_where {
            return Err(cursor.unexpected("WHERE"));
        }
        let modifiers = cursor.rest().to_vec();

        let body = QueryBody {
            form,
            dataset,
            pattern,
            modifiers,
        };
        let mut query = ExtendedQuery::new(prologue.clone(), body);
        for window in windows {
            query.add_window(window)?;
        }
        match register {
            Some((stream, register_operator)) => {
                let stream = resolver.term(&stream)?;
                let operator = if register_operator == OutputOperator::Unspecified {
                    operator
                } else {
                    register_operator
                };
                query.set_output_stream(stream, operator);
            }
            None => query.set_output_operator(operator),
        }

        if self.validate_base {
            validate_base(&query)?;
        }
        debug!(
            form = query.form().name(),
            windows = query.windows(None).len(),
            output = query.output_stream().is_some(),
            "parsed RSP-QL query"
        );
        Ok(query)
    }
}

/// Parses `text` with base query validation.
pub fn parse_query(text: &str) -> Result<ExtendedQuery, ParseError> {
    RspqlParser::new().parse(text)
}

/// Checks the plain SPARQL projection of `query` with oxigraph.
pub fn validate_base(query: &ExtendedQuery) -> Result<(), ParseError> {
    let text = crate::dialect::writer::plain_sparql(query);
    SparqlEvaluator::new()
        .parse_query(&text)
        .map(|_| ())
        .map_err(|e| ParseError::Base(e.to_string()))
}

struct Resolver<'a> {
    prefixes: &'a PrefixMapping,
}

impl Resolver<'_> {
    /// Resolves an IRI, prefixed name or variable token into a term.
    fn term(&self, token: &Token) -> Result<Term, ParseError> {
        match token {
            Token::Iri(iri) => Term::iri(iri),
            Token::PrefixedName(name) => {
                let iri = self.prefixes.expand(name).ok_or_else(|| {
                    let prefix = name.split(':').next().unwrap_or_default();
                    ParseError::UndeclaredPrefix(prefix.to_string())
                })?;
                Term::iri(&iri)
            }
            Token::Var(name) => Term::variable(name),
            other => Err(ParseError::Unexpected {
                expected: "IRI or variable".into(),
                found: other.to_string(),
            }),
        }
    }

    fn datatype(&self, token: &Token) -> Result<String, ParseError> {
        match self.term(token)? {
            Term::Iri(node) => Ok(node.into_string()),
            other => Err(ParseError::Unexpected {
                expected: "datatype IRI".into(),
                found: other.to_string(),
            }),
        }
    }
}

fn parse_prologue(cursor: &mut Cursor<'_>, prologue: &mut Prologue) -> Result<(), ParseError> {
    loop {
        if cursor.eat_word("BASE") {
            match cursor.next() {
                Some(Token::Iri(iri)) => prologue.base = Some(iri.clone()),
                other => return Err(cursor.mismatch("base IRI", other)),
            }
        } else if cursor.eat_word("PREFIX") {
            let prefix = match cursor.next() {
                Some(Token::PrefixedName(name)) if name.ends_with(':') => {
                    name.trim_end_matches(':').to_string()
                }
                other => return Err(cursor.mismatch("prefix declaration", other)),
            };
            match cursor.next() {
                Some(Token::Iri(iri)) => prologue.prefixes.insert(prefix, iri.clone()),
                other => return Err(cursor.mismatch("namespace IRI", other)),
            }
        } else {
            return Ok(());
        }
    }
}

fn parse_register(
    cursor: &mut Cursor<'_>,
) -> Result<Option<(Token, OutputOperator)>, ParseError> {
    if !cursor.eat_word("REGISTER") {
        return Ok(None);
    }
    let operator = match cursor.next() {
        Some(t) if t.is_word("STREAM") => OutputOperator::Unspecified,
        Some(t @ Token::Word(w)) => match OutputOperator::from_keyword(w) {
            Some(op) => op,
            None => return Err(cursor.mismatch("STREAM", Some(t))),
        },
        other => return Err(cursor.mismatch("STREAM", other)),
    };
    let stream = match cursor.next() {
        Some(t @ (Token::Iri(_) | Token::PrefixedName(_) | Token::Var(_))) => t.clone(),
        other => return Err(cursor.mismatch("output stream", other)),
    };
    cursor.expect_word("AS")?;
    Ok(Some((stream, operator)))
}

fn eat_operator(cursor: &mut Cursor<'_>) -> OutputOperator {
    if let Some(Token::Word(w)) = cursor.peek() {
        if let Some(op) = OutputOperator::from_keyword(w) {
            cursor.next();
            return op;
        }
    }
    OutputOperator::Unspecified
}

fn parse_result_form(
    cursor: &mut Cursor<'_>,
) -> Result<(ResultForm, OutputOperator), ParseError> {
    if cursor.eat_word("SELECT") {
        let operator = eat_operator(cursor);
        let modifier = match cursor.peek() {
            Some(t) if t.is_word("DISTINCT") || t.is_word("REDUCED") => cursor.next().cloned(),
            _ => None,
        };
        let projection = cursor
            .take_until(|t| t.is_word("FROM") || t.is_word("WHERE") || t.is_punct("{"))
            .to_vec();
        if projection.is_empty() {
            return Err(cursor.unexpected("projection"));
        }
        Ok((
            ResultForm::Select {
                modifier,
                projection,
            },
            operator,
        ))
    } else if cursor.eat_word("CONSTRUCT") {
        let operator = eat_operator(cursor);
        let template = if cursor.eat_punct("{") {
            Some(cursor.take_balanced("}")?)
        } else {
            None
        };
        Ok((ResultForm::Construct { template }, operator))
    } else if cursor.eat_word("ASK") {
        Ok((ResultForm::Ask, OutputOperator::Unspecified))
    } else if cursor.eat_word("DESCRIBE") {
        let targets = cursor
            .take_until(|t| t.is_word("FROM") || t.is_word("WHERE") || t.is_punct("{"))
            .to_vec();
        if targets.is_empty() {
            return Err(cursor.unexpected("DESCRIBE target"));
        }
        Ok((ResultForm::Describe { targets }, OutputOperator::Unspecified))
    } else {
        Err(cursor.unexpected("SELECT, CONSTRUCT, ASK or DESCRIBE"))
    }
}

/// `FROM NAMED WINDOW` has been consumed.
fn parse_window(cursor: &mut Cursor<'_>, resolver: &Resolver<'_>) -> Result<WindowSpec, ParseError> {
    let window_id = resolver.term(cursor.expect_next("window name")?)?;
    cursor.expect_word("ON")?;
    cursor.eat_word("STREAM");
    let stream_id = resolver.term(cursor.expect_next("stream name")?)?;
    cursor.expect_punct("[")?;

    let window = if cursor.eat_word("RANGE") {
        let range = parse_slot(cursor, resolver, Slot::Duration, "RANGE")?;
        let step = parse_step(cursor, resolver, Slot::Duration)?;
        WindowSpec::logical(window_id, stream_id, range, step)
    } else if cursor.eat_word("ITEM") {
        let count = parse_slot(cursor, resolver, Slot::Count, "ITEM")?;
        let step = parse_step(cursor, resolver, Slot::Count)?;
        WindowSpec::physical(window_id, stream_id, count, step)
    } else if cursor.eat_word("FROM") {
        let from = parse_now_offset(cursor, resolver, "FROM")?;
        cursor.expect_word("TO")?;
        let to = parse_now_offset(cursor, resolver, "TO")?;
        let step = parse_step(cursor, resolver, Slot::Duration)?;
        WindowSpec::logical_past(window_id, stream_id, from, to, step)
    } else {
        return Err(cursor.unexpected("RANGE, ITEM or FROM"));
    };
    cursor.expect_punct("]")?;
    Ok(window)
}

fn parse_step(
    cursor: &mut Cursor<'_>,
    resolver: &Resolver<'_>,
    slot: Slot,
) -> Result<Option<Term>, ParseError> {
    if cursor.eat_word("STEP") {
        parse_slot(cursor, resolver, slot, "STEP").map(Some)
    } else {
        Ok(None)
    }
}

/// `NOW-<slot>`, where `NOW-` may be omitted before a variable.
fn parse_now_offset(
    cursor: &mut Cursor<'_>,
    resolver: &Resolver<'_>,
    name: &'static str,
) -> Result<Term, ParseError> {
    if !cursor.eat_word("NOW") {
        return match cursor.peek() {
            Some(Token::Var(_)) => parse_slot(cursor, resolver, Slot::Duration, name),
            _ => Err(cursor.unexpected("NOW-")),
        };
    }
    if cursor.eat_punct("-") {
        return parse_slot(cursor, resolver, Slot::Duration, name);
    }
    // `NOW-3600` lexes as a negative number.
    match cursor.next() {
        Some(Token::Number(n)) if n.starts_with('-') => millis(&n[1..], name),
        other => Err(cursor.mismatch("NOW-", other)),
    }
}

fn millis(digits: &str, slot: &'static str) -> Result<Term, ParseError> {
    let ms: u64 = digits.parse().map_err(|_| ParseError::InvalidWindowValue {
        slot,
        value: digits.to_string(),
    })?;
    Ok(Term::from_duration(Duration::from_millis(ms)))
}

fn count(digits: &str, slot: &'static str) -> Result<Term, ParseError> {
    digits
        .parse::<u64>()
        .map(Term::integer)
        .map_err(|_| ParseError::InvalidWindowValue {
            slot,
            value: digits.to_string(),
        })
}

fn unquote(lexeme: &str) -> &str {
    let quote = if lexeme.starts_with("\"\"\"") || lexeme.starts_with("'''") {
        3
    } else {
        1
    };
    lexeme
        .get(quote..lexeme.len().saturating_sub(quote))
        .unwrap_or_default()
}

fn parse_slot(
    cursor: &mut Cursor<'_>,
    resolver: &Resolver<'_>,
    slot: Slot,
    name: &'static str,
) -> Result<Term, ParseError> {
    let invalid = |value: &str| ParseError::InvalidWindowValue {
        slot: name,
        value: value.to_string(),
    };
    match (cursor.next(), slot) {
        (Some(Token::Var(v)), _) => Term::variable(v),
        (Some(Token::Number(n)), Slot::Duration) => millis(n, name),
        (Some(Token::Number(n)), Slot::Count) => count(n, name),
        (Some(Token::Word(w)), Slot::Duration) => Ok(Term::duration(w)?),
        (Some(Token::Literal(lexeme)), _) => {
            let value = unquote(lexeme);
            let datatype = if cursor.eat_datatype_mark() {
                Some(resolver.datatype(cursor.expect_next("datatype")?)?)
            } else {
                None
            };
            match (datatype.as_deref(), slot) {
                (None | Some(xsd::DURATION), Slot::Duration) => Ok(Term::duration(value)?),
                (None | Some(xsd::INTEGER), Slot::Count) => count(value, name),
                _ => Err(invalid(lexeme)),
            }
        }
        (Some(other), _) => Err(invalid(&other.to_string())),
        (None, _) => Err(ParseError::UnexpectedEnd(format!("{name} value"))),
    }
}

fn parse_group(cursor: &mut Cursor<'_>, resolver: &Resolver<'_>) -> Result<GroupPattern, ParseError> {
    let mut parts = Vec::new();
    let mut current = Vec::new();
    let flush = |current: &mut Vec<Token>, parts: &mut Vec<PatternPart>| {
        if !current.is_empty() {
            parts.push(PatternPart::Tokens(std::mem::take(current)));
        }
    };
    loop {
        match cursor.peek() {
            None => return Err(ParseError::UnexpectedEnd("'}'".into())),
            Some(t) if t.is_punct("}") => {
                cursor.next();
                flush(&mut current, &mut parts);
                return Ok(GroupPattern::new(parts));
            }
            Some(t) if t.is_punct("{") => {
                cursor.next();
                flush(&mut current, &mut parts);
                parts.push(PatternPart::Group(parse_group(cursor, resolver)?));
            }
            Some(t) if t.is_word("WINDOW") && cursor.peek_at(2).is_some_and(|t| t.is_punct("{")) => {
                cursor.next();
                flush(&mut current, &mut parts);
                let name = resolver.term(cursor.expect_next("window name")?)?;
                cursor.expect_punct("{")?;
                let pattern = parse_group(cursor, resolver)?;
                parts.push(PatternPart::Window { name, pattern });
            }
            Some(t) => {
                current.push(t.clone());
                cursor.next();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::WindowKind;

    const DEBS: &str = "PREFIX  :     <http://debs2015.org/streams/>
PREFIX  debs: <http://debs2015.org/onto#>

REGISTER STREAM :stream1 AS

SELECT (count(?ride) AS ?rideCount)
FROM NAMED WINDOW :win ON :trips [RANGE PT1H STEP PT1H]
WHERE
  { WINDOW :win
      { ?ride debs:distance ?distance
        FILTER ( ?distance > 2 )
      }
  }";

    fn iri(s: &str) -> Term {
        Term::iri(s).unwrap()
    }

    #[test]
    fn test_parse_debs_query() {
        let query = parse_query(DEBS).unwrap();
        let stream = query.output_stream().unwrap();
        assert_eq!(stream.stream, iri("http://debs2015.org/streams/stream1"));
        assert_eq!(stream.operator, OutputOperator::Unspecified);

        let windows = query.windows(None);
        assert_eq!(windows.len(), 1);
        assert_eq!(
            windows[0],
            &WindowSpec::logical(
                iri("http://debs2015.org/streams/win"),
                iri("http://debs2015.org/streams/trips"),
                Term::duration("PT1H").unwrap(),
                Some(Term::duration("PT1H").unwrap()),
            )
        );
        let pattern = query.body().pattern.as_ref().unwrap();
        assert_eq!(pattern.window_names(), vec![&iri("http://debs2015.org/streams/win")]);
    }

    #[test]
    fn test_register_forms_and_operators() {
        let query = parse_query(
            "REGISTER RSTREAM <http://out> AS SELECT * FROM NAMED WINDOW <http://w> ON STREAM <http://s> [RANGE 10000 STEP 2000] WHERE { WINDOW <http://w> { ?s ?p ?o } }",
        )
        .unwrap();
        assert_eq!(query.output_operator(), OutputOperator::Rstream);
        let w = query.windows(None)[0];
        assert_eq!(w.kind(), WindowKind::Logical);
        assert_eq!(
            w.terms()[2],
            &Term::duration("PT10S").unwrap(),
            "milliseconds are normalised"
        );
        assert_eq!(w.step(), Some(&Term::duration("PT2S").unwrap()));

        let query = parse_query("SELECT ISTREAM ?s WHERE { ?s ?p ?o }").unwrap();
        assert_eq!(query.output_operator(), OutputOperator::Istream);
        assert_eq!(query.output_stream(), None);
    }

    #[test]
    fn test_physical_and_past_windows() {
        let query = parse_query(
            "PREFIX ex: <http://ex.org/>
             SELECT ?s
             FROM NAMED WINDOW ex:w1 ON ex:s1 [ITEM 10 STEP 2]
             FROM NAMED WINDOW ex:w2 ON ex:s1 [FROM NOW-PT1H TO NOW - PT30M STEP \"PT5M\"^^<http://www.w3.org/2001/XMLSchema#duration>]
             FROM NAMED WINDOW ex:w3 ON ex:s2 [FROM NOW-?from TO ?to]
             WHERE { WINDOW ex:w1 { ?s ?p ?o } }",
        )
        .unwrap();
        assert_eq!(query.windows(Some(WindowKind::Physical)).len(), 1);
        let past = query.windows(Some(WindowKind::LogicalPast));
        assert_eq!(past.len(), 2);
        assert_eq!(past[0].step(), Some(&Term::duration("PT5M").unwrap()));
        assert!(past[1].terms()[2].is_variable());
        assert!(past[1].terms()[3].is_variable());
        assert_eq!(
            query.window(&iri("http://ex.org/w1")).unwrap().terms()[2],
            &Term::integer(10)
        );
    }

    #[test]
    fn test_duplicate_window_is_a_parse_error() {
        let err = parse_query(
            "SELECT * FROM NAMED WINDOW <http://w> ON <http://s1> [RANGE PT1S]
             FROM NAMED WINDOW <http://w> ON <http://s2> [ITEM 5] WHERE { ?s ?p ?o }",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ParseError::Construction(crate::error::ConstructionError::DuplicateWindowId(_))
        ));
    }

    #[test]
    fn test_bad_queries() {
        assert!(matches!(
            parse_query("SELECT * FROM NAMED WINDOW ex:w ON <http://s> [RANGE PT1S] WHERE { ?s ?p ?o }"),
            Err(ParseError::UndeclaredPrefix(p)) if p == "ex"
        ));
        assert!(matches!(
            parse_query("SELECT * FROM NAMED WINDOW <http://w> ON <http://s> [RANGE ten] WHERE { ?s ?p ?o }"),
            Err(ParseError::Duration(_))
        ));
        assert!(matches!(
            parse_query("SELECT * WHERE { ?s ?p }"),
            Err(ParseError::Base(_))
        ));
        assert!(matches!(
            parse_query("SELECT * WHERE { ?s ?p ?o"),
            Err(ParseError::UnexpectedEnd(_))
        ));
    }

    #[test]
    fn test_plain_sparql_query_is_an_extended_query() {
        let query = parse_query("ASK { ?s ?p ?o }").unwrap();
        assert!(query.windows(None).is_empty());
        assert_eq!(query.output_stream(), None);
    }
}
