use tracing::{debug, warn};

use crate::engine::GraphOracle;
use crate::error::{BindingError, ValidationError};
use crate::prefixes::PrefixMapping;
use crate::term::Term;
use crate::vocabulary::{rdfs, xsd};

use super::Template;
use super::bindings::{self, BindingOutcome, Bindings};

/// Turns raw parameters into bindings and checks them against the argument
/// declarations of a template.
pub struct ArgumentChecker {
    ontology: Option<GraphOracle>,
    prefixes: PrefixMapping,
    strict: bool,
}

impl Default for ArgumentChecker {
    fn default() -> Self {
        Self::new(PrefixMapping::with_defaults())
    }
}

impl ArgumentChecker {
    pub fn new(prefixes: PrefixMapping) -> Self {
        Self {
            ontology: None,
            prefixes,
            strict: false,
        }
    }

    /// Resource values are checked for is-a against `ontology`.
    pub fn with_ontology(mut self, ontology: GraphOracle) -> Self {
        self.ontology = Some(ontology);
        self
    }

    pub fn prefixes(&self) -> &PrefixMapping {
        &self.prefixes
    }

    /// Record undeclared parameters as warnings.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn create_bindings<'a>(
        &self,
        template: &Template,
        params: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> BindingOutcome {
        let prefixes = template.prefixes(&self.prefixes);
        let mut outcome = BindingOutcome::default();
        for (name, raw) in params {
            let var = name.trim_start_matches(['?', '$']);
            let Some(argument) = template.argument(var) else {
                if self.strict {
                    warn!(handle = template.handle().as_str(), parameter = name, "undeclared parameter");
                    outcome
                        .warnings
                        .push(BindingError::UndeclaredParameter(name.to_string()));
                }
                continue;
            };
            match bindings::to_term(var, raw, argument.value_type.as_ref(), &prefixes) {
                Ok(term) => {
                    outcome.bindings.insert(var.to_string(), term);
                }
                Err(e) => outcome.errors.push(e),
            }
        }
        for argument in template.arguments() {
            if outcome.bindings.contains_key(&argument.var_name) {
                continue;
            }
            if let Some(default) = &argument.default_value {
                outcome
                    .bindings
                    .insert(argument.var_name.clone(), default.clone());
            }
        }
        debug!(
            handle = template.handle().as_str(),
            bound = outcome.bindings.len(),
            errors = outcome.errors.len(),
            "created bindings"
        );
        outcome
    }

    /// Every violated declaration. Never mutates `bindings`.
    pub fn validate(&self, template: &Template, bindings: &Bindings) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for argument in template.arguments() {
            let var = &argument.var_name;
            let Some(value) = bindings.get(var) else {
                if !argument.optional {
                    errors.push(ValidationError::MissingRequiredArgument { var: var.clone() });
                }
                continue;
            };
            let Some(expected) = &argument.value_type else {
                continue;
            };
            let satisfied = match value {
                Term::Iri(iri) => expected.as_str() == rdfs::RESOURCE || self.is_a(iri.as_str(), expected.as_str()),
                Term::Literal(literal) => {
                    let datatype = if literal.language().is_some() {
                        xsd::STRING
                    } else {
                        literal.datatype().as_str()
                    };
                    expected.as_str() == rdfs::LITERAL || expected.as_str() == datatype
                }
                Term::Variable(_) => true,
            };
            if !satisfied {
                errors.push(ValidationError::TypeMismatch {
                    var: var.clone(),
                    value: value.to_string(),
                    expected: expected.as_str().to_string(),
                });
            }
        }
        errors
    }

    fn is_a(&self, value: &str, class: &str) -> bool {
        let Some(ontology) = &self.ontology else {
            return value == class;
        };
        ontology.is_a(value, class).unwrap_or_else(|e| {
            warn!(value, class, error = %e, "is-a check failed");
            false
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::TripleContainer;
    use crate::parser::parse_query;
    use crate::template::ArgumentDecl;
    use crate::vocabulary::{self, rdf};
    use oxigraph::model::{Literal, NamedNode, Triple};

    fn template() -> Template {
        let body = parse_query(
            "PREFIX ex: <http://ex.org/>
             REGISTER STREAM ?out AS
             SELECT ?o
             FROM NAMED WINDOW ex:w ON ?sensor [RANGE ?range]
             WHERE { WINDOW ex:w { ?sensor ex:value ?o ; ex:label ?name } }",
        )
        .unwrap();
        let mut t = Template::new(body, "http://ex.org/t").unwrap();
        for decl in [
            ArgumentDecl::new("out").value_type("rdfs:Resource"),
            ArgumentDecl::new("range").value_type("xsd:duration").default_value("PT10S"),
            ArgumentDecl::new("sensor").value_type("ex:Sensor").optional(true),
            ArgumentDecl::new("name").value_type("xsd:string").optional(true),
        ] {
            t.add_argument_constraint(decl).unwrap();
        }
        t
    }

    #[test]
    fn test_defaults_fill_unbound_arguments() {
        let t = template();
        let outcome = ArgumentChecker::default().create_bindings(&t, []);
        assert!(outcome.is_clean());
        assert_eq!(outcome.bindings.len(), 1);
        assert_eq!(outcome.bindings["range"], Term::duration("PT10S").unwrap());

        let errors = ArgumentChecker::default().validate(&t, &outcome.bindings);
        assert_eq!(
            errors,
            vec![ValidationError::MissingRequiredArgument {
                var: "out".to_string()
            }]
        );
    }

    #[test]
    fn test_binding_errors_are_collected() {
        let t = template();
        let outcome = ArgumentChecker::default()
            .strict(true)
            .create_bindings(&t, [("range", "ten seconds"), ("out", "ex:results"), ("bogus", "1")]);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(
            outcome.warnings,
            vec![BindingError::UndeclaredParameter("bogus".to_string())]
        );
        // The default replaces the unparseable value.
        assert_eq!(outcome.bindings["range"], Term::duration("PT10S").unwrap());
        assert_eq!(outcome.bindings["out"], Term::iri("http://ex.org/results").unwrap());

        let lenient = ArgumentChecker::default().create_bindings(&t, [("bogus", "1")]);
        assert!(lenient.warnings.is_empty());
    }

    #[test]
    fn test_type_checks() {
        let t = template();
        let mut ontology = TripleContainer::default();
        ontology.add(Triple::new(
            NamedNode::new("http://ex.org/s1").unwrap(),
            vocabulary::node(rdf::TYPE),
            NamedNode::new("http://ex.org/Sensor").unwrap(),
        ));
        let checker = ArgumentChecker::default().with_ontology(GraphOracle::new(&ontology).unwrap());

        let mut bindings = Bindings::new();
        bindings.insert("out".into(), Term::iri("http://ex.org/out").unwrap());
        bindings.insert("sensor".into(), Term::iri("http://ex.org/s1").unwrap());
        bindings.insert(
            "name".into(),
            Term::Literal(Literal::new_language_tagged_literal("speed", "en").unwrap()),
        );
        bindings.insert("range".into(), Term::integer(10));
        let errors = checker.validate(&t, &bindings);
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], ValidationError::TypeMismatch { var, .. } if var == "range"));

        bindings.insert("sensor".into(), Term::iri("http://ex.org/s2").unwrap());
        bindings.insert("range".into(), Term::duration("PT1M").unwrap());
        let errors = checker.validate(&t, &bindings);
        assert!(matches!(&errors[..], [ValidationError::TypeMismatch { var, .. }] if var == "sensor"));
    }
}
