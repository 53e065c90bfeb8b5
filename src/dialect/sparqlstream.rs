use std::time::Duration;

use tracing::debug;

use crate::dialect::writer::{self, BodyLayout, QueryWriter};
use crate::dialect::{Capabilities, Degradations, Dialect, Projection, Projector, format_duration, plan};
use crate::duration::TimeUnit;
use crate::error::SerializationError;
use crate::query::ExtendedQuery;
use crate::stream::OutputOperator;
use crate::term::Term;
use crate::window::{WindowKind, WindowSpec};

const UNITS: [TimeUnit; 6] = [
    TimeUnit::new(1_000_000, "MS"),
    TimeUnit::new(1_000_000_000, "S"),
    TimeUnit::new(60_000_000_000, "MINUTE"),
    TimeUnit::new(3_600_000_000_000, "HOUR"),
    TimeUnit::new(86_400_000_000_000, "DAY"),
    TimeUnit::new(604_800_000_000_000, "WEEK"),
];

/// SPARQLStream: windows are framed relative to `NOW`, one per stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct SparqlStreamProjector;

impl Projector for SparqlStreamProjector {
    fn dialect(&self) -> Dialect {
        Dialect::SparqlStream
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            max_windows_per_stream: Some(1),
            window_kinds: &[WindowKind::Logical, WindowKind::LogicalPast],
            operators: &[
                OutputOperator::Istream,
                OutputOperator::Dstream,
                OutputOperator::Rstream,
            ],
            default_operator: OutputOperator::Rstream,
            named_output_stream: false,
            ask: false,
            describe: false,
            min_step: Duration::from_millis(1),
            units: &UNITS,
            unit_separator: " ",
        }
    }

    fn project(&self, query: &ExtendedQuery, strict: bool) -> Result<Projection, SerializationError> {
        let caps = self.capabilities();
        let mut log = Degradations::new(Dialect::SparqlStream, strict);
        let plan = plan(query, &caps, &mut log)?;

        let clauses = plan
            .windows
            .iter()
            .map(|window| stream_clause(window, &caps))
            .collect::<Result<Vec<_>, _>>()?;

        let flattened = match &query.body().pattern {
            Some(pattern) => {
                let (pattern, graphs) = pattern.without_window_graphs();
                for (window, graph) in graphs {
                    log.degrade(
                        SerializationError::UnsupportedConstruct {
                            dialect: Dialect::SparqlStream.name(),
                            construct: "named graphs inside a stream pattern".into(),
                        },
                        format!(
                            "GRAPH {graph} inside the pattern of window {window} is not supported in SPARQLStream, its triples are added to the default graph"
                        ),
                    )?;
                }
                query.with_pattern(pattern)
            }
            None => query.clone(),
        };

        let flatten = |_: &Term| -> Option<String> { None };
        let layout = BodyLayout {
            operator: plan.operator.keyword(),
            stream_clauses: clauses,
            window_block: &flatten,
        };
        let mut w = QueryWriter::new();
        w.prologue(query.prologue());
        writer::write_body(&mut w, &flattened, &layout);
        let text = w.finish();
        debug!(dialect = Dialect::SparqlStream.name(), len = text.len(), "serialized query");
        Ok(Projection {
            text,
            warnings: log.into_warnings(),
        })
    }
}

fn stream_clause(window: &WindowSpec, caps: &Capabilities) -> Result<String, SerializationError> {
    let fmt = |term: &Term, field| format_duration(term, caps, Dialect::SparqlStream, window, field);
    let slide = match window.step() {
        Some(step) => format!(" SLIDE {}", fmt(step, "step")?),
        None => String::new(),
    };
    let frame = match window {
        WindowSpec::Logical { range, .. } => format!("NOW-{}{slide}", fmt(range, "range")?),
        WindowSpec::LogicalPast { from, to, .. } => {
            format!("NOW-{} TO NOW-{}{slide}", fmt(from, "from")?, fmt(to, "to")?)
        }
        WindowSpec::Physical { .. } => {
            return Err(SerializationError::UnsupportedWindowKind {
                dialect: Dialect::SparqlStream.name(),
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

    #[test]
    fn test_now_framing() {
        let query = parse_query(
            "PREFIX : <http://debs2015.org/streams/>
             SELECT RSTREAM ?s
             FROM NAMED WINDOW :win ON :trips [RANGE PT3600S STEP PT1H]
             FROM NAMED WINDOW :past ON :other [FROM NOW-P14D TO NOW-PT90S]
             WHERE { WINDOW :win { ?s ?p ?o } }",
        )
        .unwrap();
        let p = SparqlStreamProjector.project(&query, true).unwrap();
        assert!(p.text.contains("SELECT RSTREAM ?s\n"));
        assert!(p.text.contains("FROM STREAM <http://debs2015.org/streams/trips> [NOW-1 HOUR SLIDE 1 HOUR]"));
        assert!(p.text.contains("FROM STREAM <http://debs2015.org/streams/other> [NOW-2 WEEK TO NOW-90 S]"));
    }

    #[test]
    fn test_physical_windows_are_rejected() {
        let query = parse_query(
            "SELECT ?s FROM NAMED WINDOW <http://w> ON <http://s> [ITEM 5] WHERE { ?s ?p ?o }",
        )
        .unwrap();
        assert!(matches!(
            SparqlStreamProjector.project(&query, false),
            Err(SerializationError::UnsupportedWindowKind { kind: "physical", .. })
        ));
    }

    #[test]
    fn test_sub_millisecond_durations_are_unrepresentable() {
        let query = parse_query(
            "SELECT ?s FROM NAMED WINDOW <http://w> ON <http://s> [RANGE PT0.0005S] WHERE { ?s ?p ?o }",
        )
        .unwrap();
        assert!(matches!(
            SparqlStreamProjector.project(&query, false),
            Err(SerializationError::UnrepresentableDuration { .. })
        ));
    }

    #[test]
    fn test_named_graphs_in_stream_patterns() {
        let query = parse_query(
            "PREFIX : <http://ex.org/>
             SELECT ?s
             FROM NAMED WINDOW :w ON :s [RANGE PT10S STEP PT1S]
             WHERE { WINDOW :w { ?s :p ?o GRAPH :g { ?o :q ?r } } }",
        )
        .unwrap();
        assert!(matches!(
            SparqlStreamProjector.project(&query, true),
            Err(SerializationError::UnsupportedConstruct { .. })
        ));

        let p = SparqlStreamProjector.project(&query, false).unwrap();
        assert_eq!(p.warnings.len(), 1);
        assert!(p.warnings[0].contains("GRAPH :g"));
        assert!(!p.text.contains("GRAPH"));
        assert!(p.text.contains("?s :p ?o ."), "{}", p.text);
        assert!(p.text.contains("?o :q ?r"), "{}", p.text);
    }

    #[test]
    fn test_graphs_outside_windows_are_kept() {
        let query = parse_query(
            "SELECT ?s FROM NAMED WINDOW <http://w> ON <http://s> [RANGE PT10S]
             WHERE { GRAPH <http://g> { ?s ?p ?o } WINDOW <http://w> { ?s ?q ?r } }",
        )
        .unwrap();
        let p = SparqlStreamProjector.project(&query, true).unwrap();
        assert!(p.warnings.is_empty());
        assert!(p.text.contains("GRAPH <http://g> {"));
    }
}
