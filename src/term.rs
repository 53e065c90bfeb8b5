use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

use oxigraph::model::{Literal, NamedNode, Variable};

use crate::duration::{self, DurationError};
use crate::error::ParseError;
use crate::prefixes::PrefixMapping;
use crate::vocabulary::{self, xsd};

/// A window or stream slot: a bound RDF value or an unbound variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Iri(NamedNode),
    Literal(Literal),
    Variable(Variable),
}

impl Term {
    pub fn iri(iri: &str) -> Result<Self, ParseError> {
        NamedNode::new(iri)
            .map(Term::Iri)
            .map_err(|_| ParseError::InvalidIri(iri.to_string()))
    }

    pub fn variable(name: &str) -> Result<Self, ParseError> {
        Variable::new(name)
            .map(Term::Variable)
            .map_err(|_| ParseError::InvalidVariable(name.to_string()))
    }

    /// An `xsd:duration` literal; the lexical form is checked.
    pub fn duration(lexical: &str) -> Result<Self, DurationError> {
        duration::parse_xsd_duration(lexical)?;
        Ok(Term::Literal(Literal::new_typed_literal(
            lexical,
            vocabulary::node(xsd::DURATION),
        )))
    }

    pub fn from_duration(value: Duration) -> Self {
        Term::Literal(Literal::new_typed_literal(
            duration::to_lexical(value),
            vocabulary::node(xsd::DURATION),
        ))
    }

    pub fn integer(value: u64) -> Self {
        Term::Literal(Literal::new_typed_literal(
            value.to_string(),
            vocabulary::node(xsd::INTEGER),
        ))
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Term::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_iri(&self) -> Option<&NamedNode> {
        match self {
            Term::Iri(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(l) => Some(l),
            _ => None,
        }
    }

    /// Reads a bound duration literal; `None` for variables and non-literals.
    pub fn to_duration(&self) -> Option<Result<Duration, DurationError>> {
        self.as_literal().map(|l| duration::parse_duration(l.value()))
    }

    /// Reads a bound non-negative integer literal.
    pub fn to_count(&self) -> Option<u64> {
        self.as_literal().and_then(|l| l.value().parse().ok())
    }

    /// The lexical text used in window slots: bare literal values, `?var`,
    /// or an IRI (abbreviated when `prefixes` has a matching namespace).
    pub fn to_slot_string(&self, prefixes: Option<&PrefixMapping>) -> String {
        match self {
            Term::Literal(l) => l.value().to_string(),
            _ => self.to_sparql(prefixes),
        }
    }

    /// SPARQL surface form of the term.
    pub fn to_sparql(&self, prefixes: Option<&PrefixMapping>) -> String {
        match self {
            Term::Iri(n) => prefixes
                .and_then(|p| p.short_form(n.as_str()))
                .unwrap_or_else(|| n.to_string()),
            _ => self.to_string(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Term::Iri(_) => 0,
            Term::Literal(_) => 1,
            Term::Variable(_) => 2,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(n) => write!(f, "{n}"),
            Term::Literal(l) => write!(f, "{l}"),
            Term::Variable(v) => write!(f, "{v}"),
        }
    }
}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Term {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.to_string().cmp(&other.to_string()))
    }
}

impl From<NamedNode> for Term {
    fn from(node: NamedNode) -> Self {
        Term::Iri(node)
    }
}

impl From<Literal> for Term {
    fn from(literal: Literal) -> Self {
        Term::Literal(literal)
    }
}

impl From<Variable> for Term {
    fn from(variable: Variable) -> Self {
        Term::Variable(variable)
    }
}
