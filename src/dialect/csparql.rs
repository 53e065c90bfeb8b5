use std::time::Duration;

use tracing::debug;

use crate::dialect::writer::{self, BodyLayout, QueryWriter};
use crate::dialect::{
    Capabilities, Degradations, Dialect, Projection, Projector, format_count, format_duration, plan,
};
use crate::duration::TimeUnit;
use crate::error::SerializationError;
use crate::query::{ExtendedQuery, QueryForm};
use crate::stream::OutputOperator;
use crate::term::Term;
use crate::window::{WindowKind, WindowSpec};

const UNITS: [TimeUnit; 5] = [
    TimeUnit::new(1_000_000, "ms"),
    TimeUnit::new(1_000_000_000, "s"),
    TimeUnit::new(60_000_000_000, "m"),
    TimeUnit::new(3_600_000_000_000, "h"),
    TimeUnit::new(86_400_000_000_000, "d"),
];

const MIN_STEP: Duration = Duration::from_millis(1);

/// C-SPARQL: one `FROM STREAM` clause per stream and a named query
/// registration in front of the prologue.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsparqlProjector;

impl Projector for CsparqlProjector {
    fn dialect(&self) -> Dialect {
        Dialect::Csparql
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            max_windows_per_stream: Some(1),
            window_kinds: &[WindowKind::Logical, WindowKind::Physical],
            operators: &[OutputOperator::Rstream],
            default_operator: OutputOperator::Rstream,
            named_output_stream: true,
            ask: false,
            describe: false,
            min_step: MIN_STEP,
            units: &UNITS,
            unit_separator: "",
        }
    }

    fn project(&self, query: &ExtendedQuery, strict: bool) -> Result<Projection, SerializationError> {
        let caps = self.capabilities();
        let mut log = Degradations::new(Dialect::Csparql, strict);
        let plan = plan(query, &caps, &mut log)?;

        let mut clauses = Vec::with_capacity(plan.windows.len());
        for window in &plan.windows {
            clauses.push(stream_clause(window, &caps, &mut log)?);
        }

        let mut w = QueryWriter::new();
        if let Some(stream) = &plan.output_stream {
            let kind = if query.form() == QueryForm::Select {
                "QUERY"
            } else {
                "STREAM"
            };
            w.line(&format!("REGISTER {kind} {} AS", query_name(stream)));
            w.blank_line();
        }
        w.prologue(query.prologue());

        let flatten = |_: &Term| -> Option<String> { None };
        let layout = BodyLayout {
            operator: None,
            stream_clauses: clauses,
            window_block: &flatten,
        };
        writer::write_body(&mut w, query, &layout);
        let text = w.finish();
        debug!(dialect = Dialect::Csparql.name(), len = text.len(), "serialized query");
        Ok(Projection {
            text,
            warnings: log.into_warnings(),
        })
    }
}

/// The last path or fragment segment of the output stream IRI.
pub fn query_name(stream: &Term) -> String {
    match stream {
        Term::Iri(node) => {
            let iri = node.as_str().trim_end_matches(['/', '#']);
            iri.rsplit(['/', '#']).next().unwrap_or(iri).to_string()
        }
        Term::Variable(v) => v.as_str().to_string(),
        Term::Literal(l) => l.value().to_string(),
    }
}

fn stream_clause(
    window: &WindowSpec,
    caps: &Capabilities,
    log: &mut Degradations,
) -> Result<String, SerializationError> {
    let frame = match window {
        WindowSpec::Logical { range, step, .. } => {
            let range = format_duration(range, caps, Dialect::Csparql, window, "range")?;
            let step = match step {
                Some(step) => format_duration(step, caps, Dialect::Csparql, window, "step")?,
                None => {
                    log.note(format!(
                        "STEP of window {} is missing, using the minimum value (1ms)",
                        window.window_id()
                    ));
                    format_duration(&Term::from_duration(MIN_STEP), caps, Dialect::Csparql, window, "step")?
                }
            };
            format!("RANGE {range} STEP {step}")
        }
        WindowSpec::Physical {
            item_count, step, ..
        } => {
            if step.is_some() {
                log.degrade(
                    SerializationError::UnsupportedConstruct {
                        dialect: Dialect::Csparql.name(),
                        construct: "STEP on physical windows".into(),
                    },
                    format!("STEP of physical window {} is ignored", window.window_id()),
                )?;
            }
            format!("TRIPLES {}", format_count(item_count, window, "item count")?)
        }
        WindowSpec::LogicalPast { .. } => {
            return Err(SerializationError::UnsupportedWindowKind {
                dialect: Dialect::Csparql.name(),
                kind: window.kind().name(),
            });
        }
    };
    Ok(format!(
        "FROM STREAM {} [{frame}]",
        writer::full_iri(window.stream_id())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_query;

    const DEBS: &str = "PREFIX  :     <http://debs2015.org/streams/>
PREFIX  debs: <http://debs2015.org/onto#>
REGISTER STREAM :stream1 AS
SELECT (count(?ride) AS ?rideCount)
FROM NAMED WINDOW :win ON :trips [RANGE PT1H STEP PT1H]
WHERE { WINDOW :win { ?ride debs:distance ?distance FILTER ( ?distance > 2 ) } }";

    #[test]
    fn test_debs_query() {
        let query = parse_query(DEBS).unwrap();
        let p = CsparqlProjector.project(&query, true).unwrap();
        assert!(p.text.starts_with("REGISTER QUERY stream1 AS\n\nPREFIX : <http://debs2015.org/streams/>\n"));
        assert!(p.text.contains("FROM STREAM <http://debs2015.org/streams/trips> [RANGE 1h STEP 1h]\n"));
        assert!(!p.text.contains("WINDOW"));
        assert!(p.warnings.is_empty());
    }

    #[test]
    fn test_windows_over_one_stream_are_reconciled() {
        let query = parse_query(
            "SELECT ?s
             FROM NAMED WINDOW <http://w1> ON <http://s> [RANGE PT10S STEP PT5S]
             FROM NAMED WINDOW <http://w2> ON <http://s> [RANGE PT20S STEP PT2S]
             WHERE { WINDOW <http://w1> { ?s ?p ?o } }",
        )
        .unwrap();
        assert!(matches!(
            CsparqlProjector.project(&query, true),
            Err(SerializationError::UnsupportedMultipleWindows { .. })
        ));
        let p = CsparqlProjector.project(&query, false).unwrap();
        assert!(p.text.contains("FROM STREAM <http://s> [RANGE 20s STEP 2s]"));
        assert_eq!(p.text.matches("FROM STREAM").count(), 1);
        assert_eq!(p.warnings.len(), 1);
    }

    #[test]
    fn test_missing_step_and_physical_windows() {
        let query = parse_query(
            "SELECT ?s
             FROM NAMED WINDOW <http://w1> ON <http://s1> [RANGE PT90S]
             FROM NAMED WINDOW <http://w2> ON <http://s2> [ITEM 100 STEP 10]
             WHERE { ?s ?p ?o }",
        )
        .unwrap();
        assert!(matches!(
            CsparqlProjector.project(&query, true),
            Err(SerializationError::UnsupportedConstruct { .. })
        ));
        let p = CsparqlProjector.project(&query, false).unwrap();
        assert!(p.text.contains("FROM STREAM <http://s1> [RANGE 90s STEP 1ms]"));
        assert!(p.text.contains("FROM STREAM <http://s2> [TRIPLES 100]"));
        assert_eq!(p.warnings.len(), 2);
        assert!(!p.text.contains("REGISTER"));
    }

    #[test]
    fn test_past_windows_are_rejected() {
        let query = parse_query(
            "SELECT ?s FROM NAMED WINDOW <http://w> ON <http://s> [FROM NOW-PT1H TO NOW-PT5M] WHERE { ?s ?p ?o }",
        )
        .unwrap();
        assert!(matches!(
            CsparqlProjector.project(&query, false),
            Err(SerializationError::UnsupportedWindowKind { kind: "logical past", .. })
        ));
    }

    #[test]
    fn test_query_name() {
        assert_eq!(query_name(&Term::iri("http://ex.org/streams#out").unwrap()), "out");
        assert_eq!(query_name(&Term::iri("http://ex.org/q1/").unwrap()), "q1");
    }
}
