use std::time::Duration;

use tracing::debug;

use crate::dialect::writer::{self, BodyLayout, QueryWriter};
use crate::dialect::{
    Capabilities, Degradations, Dialect, Projection, Projector, format_count, format_duration, plan,
};
use crate::duration::TimeUnit;
use crate::error::SerializationError;
use crate::query::{ExtendedQuery, GroupPattern};
use crate::stream::OutputOperator;
use crate::term::Term;
use crate::window::{WindowKind, WindowSpec};

const UNITS: [TimeUnit; 6] = [
    TimeUnit::new(1, "ns"),
    TimeUnit::new(1_000_000, "ms"),
    TimeUnit::new(1_000_000_000, "s"),
    TimeUnit::new(60_000_000_000, "m"),
    TimeUnit::new(3_600_000_000_000, "h"),
    TimeUnit::new(86_400_000_000_000, "d"),
];

/// CQELS-QL: windows are written inline as `STREAM <s> [...] { ... }`
/// blocks inside WHERE, results are always an insert stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct CqelsProjector;

impl Projector for CqelsProjector {
    fn dialect(&self) -> Dialect {
        Dialect::Cqels
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            max_windows_per_stream: None,
            window_kinds: &[WindowKind::Logical, WindowKind::Physical],
            operators: &[OutputOperator::Istream],
            default_operator: OutputOperator::Istream,
            named_output_stream: false,
            ask: false,
            describe: false,
            min_step: Duration::from_nanos(1),
            units: &UNITS,
            unit_separator: "",
        }
    }

    fn project(&self, query: &ExtendedQuery, strict: bool) -> Result<Projection, SerializationError> {
        let caps = self.capabilities();
        let mut log = Degradations::new(Dialect::Cqels, strict);
        let plan = plan(query, &caps, &mut log)?;

        let mut frames = Vec::with_capacity(plan.windows.len());
        for window in &plan.windows {
            frames.push((window.window_id().clone(), stream_block(window, &caps, &mut log)?));
        }

        let used = query
            .body()
            .pattern
            .as_ref()
            .map(|p| p.window_names())
            .unwrap_or_default();
        if let Some(unknown) = used.iter().find(|name| !frames.iter().any(|(id, _)| id == **name)) {
            return Err(SerializationError::UnknownWindow(unknown.to_string()));
        }
        for (window_id, _) in &frames {
            if !used.contains(&window_id) {
                log.degrade(
                    SerializationError::UnsupportedConstruct {
                        dialect: Dialect::Cqels.name(),
                        construct: format!("window {window_id} without a WINDOW block"),
                    },
                    format!("window {window_id} is not used in a WINDOW block and is omitted"),
                )?;
            }
        }
        if let Some(pattern) = &query.body().pattern {
            check_stream_patterns(pattern, &mut log)?;
        }

        let inline = |name: &Term| {
            frames
                .iter()
                .find(|(id, _)| id == name)
                .map(|(_, block)| block.clone())
        };
        let layout = BodyLayout {
            operator: None,
            stream_clauses: Vec::new(),
            window_block: &inline,
        };

        let mut w = QueryWriter::new();
        w.prologue(query.prologue());
        writer::write_body(&mut w, query, &layout);
        let text = w.finish();
        debug!(dialect = Dialect::Cqels.name(), len = text.len(), "serialized query");
        Ok(Projection {
            text,
            warnings: log.into_warnings(),
        })
    }
}

/// Stream blocks hold basic triple patterns and plain groups only.
fn check_stream_patterns(pattern: &GroupPattern, log: &mut Degradations) -> Result<(), SerializationError> {
    for (name, block) in pattern.window_patterns() {
        for keyword in block.non_triple_keywords() {
            log.degrade(
                SerializationError::UnsupportedConstruct {
                    dialect: Dialect::Cqels.name(),
                    construct: format!("{keyword} inside a stream block"),
                },
                format!("{keyword} inside the stream block of {name} is not supported in CQELS-QL and is written as is"),
            )?;
        }
    }
    Ok(())
}

/// `STREAM <s> [RANGE 1h SLIDE 1h]` or `STREAM <s> [TRIPLES 10]`.
fn stream_block(
    window: &WindowSpec,
    caps: &Capabilities,
    log: &mut Degradations,
) -> Result<String, SerializationError> {
    let stream = writer::full_iri(window.stream_id());
    let frame = match window {
        WindowSpec::Logical { range, step, .. } => {
            let range = format_duration(range, caps, Dialect::Cqels, window, "range")?;
            match step {
                Some(step) => format!(
                    "RANGE {range} SLIDE {}",
                    format_duration(step, caps, Dialect::Cqels, window, "step")?
                ),
                None => format!("RANGE {range}"),
            }
        }
        WindowSpec::Physical {
            item_count, step, ..
        } => {
            if step.is_some() {
                log.degrade(
                    SerializationError::UnsupportedConstruct {
                        dialect: Dialect::Cqels.name(),
                        construct: "STEP on physical windows".into(),
                    },
                    format!("STEP of physical window {} is ignored", window.window_id()),
                )?;
            }
            format!("TRIPLES {}", format_count(item_count, window, "item count")?)
        }
        WindowSpec::LogicalPast { .. } => {
            return Err(SerializationError::UnsupportedWindowKind {
                dialect: Dialect::Cqels.name(),
                kind: window.kind().name(),
            });
        }
    };
    Ok(format!("STREAM {stream} [{frame}]"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_query;

    #[test]
    fn test_inline_stream_blocks() {
        let query = parse_query(
            "PREFIX : <http://debs2015.org/streams/>
             SELECT ?s
             FROM NAMED WINDOW :win ON :trips [RANGE PT3600S STEP PT90S]
             FROM NAMED WINDOW :count ON :trips [ITEM 25]
             WHERE { WINDOW :win { ?s ?p ?o } WINDOW :count { ?s ?q ?r } }",
        )
        .unwrap();
        let p = CqelsProjector.project(&query, true).unwrap();
        assert!(p.warnings.is_empty());
        assert!(p.text.contains(
            "STREAM <http://debs2015.org/streams/trips> [RANGE 1h SLIDE 90s] {"
        ));
        assert!(p.text.contains("STREAM <http://debs2015.org/streams/trips> [TRIPLES 25] {"));
        assert!(!p.text.contains("FROM NAMED WINDOW"));
    }

    #[test]
    fn test_operator_and_register_degrade() {
        let text = "REGISTER STREAM <http://out> AS
             SELECT RSTREAM ?s
             FROM NAMED WINDOW <http://w> ON <http://s> [RANGE PT1S]
             WHERE { WINDOW <http://w> { ?s ?p ?o } }";
        let query = parse_query(text).unwrap();
        assert!(matches!(
            CqelsProjector.project(&query, true),
            Err(SerializationError::UnsupportedOutputOperator { .. })
        ));
        let p = CqelsProjector.project(&query, false).unwrap();
        assert_eq!(p.warnings.len(), 2);
        assert!(!p.text.contains("REGISTER"));
        assert!(!p.text.contains("RSTREAM"));
    }

    #[test]
    fn test_unknown_window_block() {
        let query = parse_query(
            "SELECT ?s FROM NAMED WINDOW <http://w> ON <http://s> [RANGE PT1S]
             WHERE { WINDOW <http://w> { ?s ?p ?o } WINDOW <http://other> { ?s ?q ?r } }",
        )
        .unwrap();
        assert_eq!(
            CqelsProjector.project(&query, false),
            Err(SerializationError::UnknownWindow("<http://other>".into()))
        );
    }

    #[test]
    fn test_ask_is_rejected_in_both_modes() {
        let query = parse_query("ASK { ?s ?p ?o }").unwrap();
        for strict in [true, false] {
            assert!(matches!(
                CqelsProjector.project(&query, strict),
                Err(SerializationError::UnsupportedQueryForm { form: "ASK", .. })
            ));
        }
    }

    #[test]
    fn test_stream_blocks_hold_triple_patterns_only() {
        let query = parse_query(
            "PREFIX : <http://ex.org/>
             SELECT ?s
             FROM NAMED WINDOW :w ON :s [RANGE PT10S]
             WHERE { WINDOW :w { ?s :p ?o OPTIONAL { ?o :q ?r } FILTER(?o > 3) } }",
        )
        .unwrap();
        assert!(matches!(
            CqelsProjector.project(&query, true),
            Err(SerializationError::UnsupportedConstruct { .. })
        ));

        let p = CqelsProjector.project(&query, false).unwrap();
        assert_eq!(p.warnings.len(), 2);
        assert!(p.warnings[0].starts_with("OPTIONAL"));
        assert!(p.warnings[1].starts_with("FILTER"));
        assert!(p.text.contains("STREAM <http://ex.org/s> [RANGE 10s] {"));
    }

    #[test]
    fn test_filters_outside_stream_blocks_are_accepted() {
        let query = parse_query(
            "SELECT ?s FROM NAMED WINDOW <http://w> ON <http://s> [RANGE PT1S]
             WHERE { WINDOW <http://w> { ?s a ?type { ?s ?p ?o } } FILTER(?s != ?type) }",
        )
        .unwrap();
        let p = CqelsProjector.project(&query, true).unwrap();
        assert!(p.warnings.is_empty());
        assert!(p.text.contains("FILTER"));
    }
}
