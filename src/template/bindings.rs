//! Conversion of raw parameter strings into typed terms.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use oxigraph::model::{Literal, NamedNode};

use crate::duration;
use crate::error::BindingError;
use crate::prefixes::PrefixMapping;
use crate::term::Term;
use crate::vocabulary::{self, rdf, rdfs, xsd};

/// Argument values keyed by variable name.
pub type Bindings = BTreeMap<String, Term>;

/// Best-effort result of binding creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingOutcome {
    pub bindings: Bindings,
    pub errors: Vec<BindingError>,
    /// Undeclared parameters, recorded by strict checkers only.
    pub warnings: Vec<BindingError>,
}

impl BindingOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Whether `value_type` names a datatype rather than a resource class.
pub fn is_datatype(value_type: &NamedNode) -> bool {
    let iri = value_type.as_str();
    iri.starts_with(xsd::NS) || iri == rdfs::LITERAL || iri == rdf::LANG_STRING
}

fn strip_brackets(raw: &str) -> &str {
    raw.strip_prefix('<')
        .and_then(|r| r.strip_suffix('>'))
        .unwrap_or(raw)
}

fn resource(var: &str, raw: &str, prefixes: &PrefixMapping) -> Result<Term, BindingError> {
    let iri = prefixes.expand_or_keep(strip_brackets(raw.trim()));
    NamedNode::new(iri)
        .map(Term::Iri)
        .map_err(|_| BindingError::InvalidResource {
            var: var.to_string(),
            value: raw.to_string(),
        })
}

/// Lexical check for the XSD datatypes with a known value space.
fn is_valid_lexical(datatype: &str, value: &str) -> bool {
    match datatype {
        xsd::INTEGER => {
            let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
            !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
        }
        xsd::DECIMAL => {
            let unsigned = value.strip_prefix(['+', '-']).unwrap_or(value);
            let (int, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
            !(int.is_empty() && frac.is_empty())
                && int.chars().all(|c| c.is_ascii_digit())
                && frac.chars().all(|c| c.is_ascii_digit())
        }
        xsd::DOUBLE | xsd::FLOAT => {
            matches!(value, "INF" | "-INF" | "NaN") || value.parse::<f64>().is_ok_and(f64::is_finite)
        }
        xsd::BOOLEAN => matches!(value, "true" | "false" | "1" | "0"),
        xsd::DURATION => duration::is_valid_duration(value),
        xsd::DATE_TIME => {
            DateTime::parse_from_rfc3339(value).is_ok()
                || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        }
        xsd::DATE => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
        xsd::ANY_URI => !value.chars().any(char::is_whitespace),
        _ => true,
    }
}

/// Converts a raw value for `var` according to `value_type`.
///
/// Datatypes produce typed literals (lexically checked for the known XSD
/// types). Any other type requires an absolute IRI, possibly in prefixed
/// form. Without a type, an absolute IRI becomes a resource and anything
/// else a plain string literal.
pub fn to_term(
    var: &str,
    raw: &str,
    value_type: Option<&NamedNode>,
    prefixes: &PrefixMapping,
) -> Result<Term, BindingError> {
    let Some(value_type) = value_type else {
        return Ok(resource(var, raw, prefixes)
            .unwrap_or_else(|_| Term::Literal(Literal::new_simple_literal(raw))));
    };
    if !is_datatype(value_type) {
        return resource(var, raw, prefixes);
    }
    match value_type.as_str() {
        rdfs::LITERAL | xsd::STRING => Ok(Term::Literal(Literal::new_simple_literal(raw))),
        datatype if is_valid_lexical(datatype, raw.trim()) => Ok(Term::Literal(
            Literal::new_typed_literal(raw.trim(), vocabulary::node(datatype)),
        )),
        datatype => Err(BindingError::UnparseableLiteral {
            var: var.to_string(),
            value: raw.to_string(),
            datatype: datatype.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xsd(local: &str) -> NamedNode {
        NamedNode::new(format!("{}{local}", xsd::NS)).unwrap()
    }

    #[test]
    fn test_typed_literals() {
        let prefixes = PrefixMapping::with_defaults();
        assert_eq!(
            to_term("n", "42", Some(&xsd("integer")), &prefixes),
            Ok(Term::integer(42))
        );
        assert_eq!(
            to_term("r", "PT10S", Some(&xsd("duration")), &prefixes),
            Ok(Term::duration("PT10S").unwrap())
        );
        assert!(to_term("d", "2024-02-30", Some(&xsd("date")), &prefixes).is_err());
        assert!(to_term("t", "2024-02-01T10:00:00Z", Some(&xsd("dateTime")), &prefixes).is_ok());
        assert_eq!(
            to_term("b", "yes", Some(&xsd("boolean")), &prefixes),
            Err(BindingError::UnparseableLiteral {
                var: "b".to_string(),
                value: "yes".to_string(),
                datatype: xsd::BOOLEAN.to_string(),
            })
        );
    }

    #[test]
    fn test_resources() {
        let mut prefixes = PrefixMapping::with_defaults();
        prefixes.insert("ex", "http://ex.org/");
        let sensor = NamedNode::new("http://ex.org/Sensor").unwrap();
        assert_eq!(
            to_term("s", "ex:s1", Some(&sensor), &prefixes),
            Ok(Term::iri("http://ex.org/s1").unwrap())
        );
        assert!(matches!(
            to_term("s", "not an iri", Some(&sensor), &prefixes),
            Err(BindingError::InvalidResource { .. })
        ));
    }

    #[test]
    fn test_untyped_values() {
        let prefixes = PrefixMapping::new();
        assert_eq!(
            to_term("x", "<http://ex.org/a>", None, &prefixes),
            Ok(Term::iri("http://ex.org/a").unwrap())
        );
        assert_eq!(
            to_term("x", "hello world", None, &prefixes),
            Ok(Term::Literal(Literal::new_simple_literal("hello world")))
        );
    }
}
