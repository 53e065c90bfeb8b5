use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::dialect::rspql;
use crate::error::TemplateError;
use crate::query::token::{self, Token};
use crate::term::Term;

use super::Template;
use super::bindings::Bindings;

static TYPED_SLOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b(RANGE|STEP|ITEM|FROM|TO)(\s+(?:NOW\s*-\s*)?)"([A-Z0-9.+-]+)"\^\^<http://www\.w3\.org/2001/XMLSchema#(?:duration|integer)>"#,
    )
    .expect("window slot pattern is valid")
});

/// Rewrites typed duration and integer literals in window slots back into
/// their bare form, e.g. `RANGE "PT10S"^^xsd:duration` to `RANGE PT10S`.
pub fn clean(text: &str) -> String {
    TYPED_SLOT.replace_all(text, "$1$2$3").into_owned()
}

/// Replaces every bound variable of `text` with the N-Triples form of its
/// value. Variables bound to variables are renamed.
fn substitute(text: &str, bindings: &Bindings) -> Result<String, TemplateError> {
    let tokens = token::tokenize(text)?;
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for spanned in &tokens {
        let Token::Var(name) = &spanned.token else {
            continue;
        };
        let Some(value) = bindings.get(name) else {
            continue;
        };
        out.push_str(&text[last..spanned.span.start]);
        match value {
            Term::Variable(v) => out.push_str(&format!("?{}", v.as_str())),
            bound => out.push_str(&bound.to_string()),
        }
        last = spanned.span.end;
    }
    out.push_str(&text[last..]);
    Ok(out)
}

pub(super) fn instantiate(template: &Template, bindings: &Bindings) -> Result<String, TemplateError> {
    let text = rspql::to_native_string(template.body())?;
    let text = clean(&substitute(&text, bindings)?);
    debug!(
        handle = template.handle().as_str(),
        bound = bindings.len(),
        "instantiated template"
    );
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_query;
    use crate::template::ArgumentDecl;

    #[test]
    fn test_clean_window_slots() {
        let d = "^^<http://www.w3.org/2001/XMLSchema#duration>";
        let i = "^^<http://www.w3.org/2001/XMLSchema#integer>";
        assert_eq!(
            clean(&format!("[RANGE \"PT10S\"{d} STEP \"PT1S\"{d}]")),
            "[RANGE PT10S STEP PT1S]"
        );
        assert_eq!(
            clean(&format!("[FROM NOW-\"PT1H\"{d} TO NOW-\"PT0S\"{d}]")),
            "[FROM NOW-PT1H TO NOW-PT0S]"
        );
        assert_eq!(clean(&format!("[ITEM \"10\"{i} STEP \"2\"{i}]")), "[ITEM 10 STEP 2]");
        // Literals outside window slots keep their datatype.
        let filter = format!("FILTER(?v > \"5\"{i})");
        assert_eq!(clean(&filter), filter);
    }

    #[test]
    fn test_substitute_values() {
        let mut bindings = Bindings::new();
        bindings.insert("out".into(), Term::iri("http://ex.org/out").unwrap());
        bindings.insert("name".into(), Term::Literal(oxigraph::model::Literal::new_simple_literal("a \"b\"")));
        let text = substitute("REGISTER STREAM ?out AS SELECT ?s WHERE { ?s ?p ?name . ?outer ?p ?o }", &bindings)
            .unwrap();
        assert_eq!(
            text,
            "REGISTER STREAM <http://ex.org/out> AS SELECT ?s WHERE { ?s ?p \"a \\\"b\\\"\" . ?outer ?p ?o }"
        );
    }

    #[test]
    fn test_instantiate_window_template() {
        let body = parse_query(
            "PREFIX ex: <http://ex.org/>
             REGISTER STREAM ?out AS
             SELECT ?s
             FROM NAMED WINDOW ex:w ON ?stream [RANGE ?range STEP PT1S]
             WHERE { WINDOW ex:w { ?s ex:p ?o } }",
        )
        .unwrap();
        let mut template = Template::new(body, "http://ex.org/t").unwrap();
        template
            .add_argument_constraint(ArgumentDecl::new("range").value_type("xsd:duration").default_value("PT10S"))
            .unwrap();
        template
            .add_argument_constraint(ArgumentDecl::new("out"))
            .unwrap();
        template
            .add_argument_constraint(ArgumentDecl::new("stream"))
            .unwrap();

        let outcome = template.create_bindings([("out", "http://ex.org/out"), ("stream", "ex:s1")]);
        assert!(outcome.is_clean());
        let query = template.instantiate_query(&outcome.bindings).unwrap();
        let windows = query.windows(None);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].stream_id(), &Term::iri("http://ex.org/s1").unwrap());
        assert_eq!(
            query.output_stream().map(|d| d.stream),
            Some(Term::iri("http://ex.org/out").unwrap())
        );
        let text = template.instantiate(&outcome.bindings).unwrap();
        assert!(text.contains("RANGE PT10S STEP PT1S"), "{text}");
    }
}
