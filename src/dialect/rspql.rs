use std::time::Duration;

use tracing::debug;

use crate::dialect::writer::{self, BodyLayout, QueryWriter};
use crate::dialect::{Capabilities, Dialect, Projection, Projector};
use crate::error::SerializationError;
use crate::prefixes::PrefixMapping;
use crate::query::{ExtendedQuery, QueryForm};
use crate::stream::OutputOperator;
use crate::term::Term;
use crate::window::{WindowKind, WindowSpec};

/// Native RSP-QL output. Everything in the model is expressible, so
/// projection never degrades.
#[derive(Debug, Clone, Copy, Default)]
pub struct RspqlProjector;

impl Projector for RspqlProjector {
    fn dialect(&self) -> Dialect {
        Dialect::Rspql
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            max_windows_per_stream: None,
            window_kinds: &WindowKind::ALL,
            operators: &[
                OutputOperator::Istream,
                OutputOperator::Dstream,
                OutputOperator::Rstream,
            ],
            default_operator: OutputOperator::Unspecified,
            named_output_stream: true,
            ask: true,
            describe: true,
            min_step: Duration::from_nanos(1),
            units: &[],
            unit_separator: "",
        }
    }

    fn project(&self, query: &ExtendedQuery, _strict: bool) -> Result<Projection, SerializationError> {
        Ok(Projection {
            text: to_native_string(query)?,
            warnings: Vec::new(),
        })
    }
}

/// `FROM NAMED WINDOW` clause of one window.
pub fn window_clause(window: &WindowSpec, prefixes: &PrefixMapping) -> String {
    let slot = |t: &Term| t.to_slot_string(Some(prefixes));
    let step = window
        .step()
        .map(|s| format!(" STEP {}", slot(s)))
        .unwrap_or_default();
    let frame = match window {
        WindowSpec::Logical { range, .. } => format!("RANGE {}{step}", slot(range)),
        WindowSpec::Physical { item_count, .. } => format!("ITEM {}{step}", slot(item_count)),
        WindowSpec::LogicalPast { from, to, .. } => {
            format!("FROM NOW-{} TO NOW-{}{step}", slot(from), slot(to))
        }
    };
    format!(
        "FROM NAMED WINDOW {} ON {} [{frame}]",
        slot(window.window_id()),
        slot(window.stream_id())
    )
}

pub fn to_native_string(query: &ExtendedQuery) -> Result<String, SerializationError> {
    let prefixes = &query.prologue().prefixes;
    let operator = query.output_operator();
    let keyword_in_form = matches!(query.form(), QueryForm::Select | QueryForm::Construct);

    let mut w = QueryWriter::new();
    w.prologue(query.prologue());
    if let Some(decl) = query.output_stream() {
        let register = match operator.keyword() {
            Some(keyword) if !keyword_in_form => keyword,
            _ => "STREAM",
        };
        w.line(&format!(
            "REGISTER {register} {} AS",
            decl.stream.to_sparql(Some(prefixes))
        ));
    }

    let named = |name: &Term| Some(format!("WINDOW {}", name.to_sparql(Some(prefixes))));
    let layout = BodyLayout {
        operator: operator.keyword().filter(|_| keyword_in_form),
        stream_clauses: query
            .windows(None)
            .into_iter()
            .map(|window| window_clause(window, prefixes))
            .collect(),
        window_block: &named,
    };
    writer::write_body(&mut w, query, &layout);
    let text = w.finish();
    debug!(dialect = Dialect::Rspql.name(), len = text.len(), "serialized query");
    Ok(text)
}

/// Prologue and base body with its `WINDOW` blocks, but without window
/// declarations, `REGISTER` clause or operator keyword.
pub fn body_text(query: &ExtendedQuery) -> String {
    let prefixes = &query.prologue().prefixes;
    let named = |name: &Term| Some(format!("WINDOW {}", name.to_sparql(Some(prefixes))));
    let layout = BodyLayout {
        operator: None,
        stream_clauses: Vec::new(),
        window_block: &named,
    };
    let mut w = QueryWriter::new();
    w.prologue(query.prologue());
    writer::write_body(&mut w, query, &layout);
    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_query;

    #[test]
    fn test_native_output() {
        let query = parse_query(
            "PREFIX ex: <http://ex.org/>
             REGISTER STREAM ex:out AS
             SELECT RSTREAM ?s
             FROM NAMED WINDOW ex:w1 ON ex:s1 [RANGE PT10S STEP PT5S]
             FROM NAMED WINDOW ex:w2 ON ex:s1 [ITEM 10]
             FROM NAMED WINDOW ex:w3 ON ex:s2 [FROM NOW-PT1H TO NOW-PT0S STEP ?step]
             WHERE { WINDOW ex:w1 { ?s ?p ?o } }",
        )
        .unwrap();
        let text = to_native_string(&query).unwrap();
        assert_eq!(
            text,
            "PREFIX ex: <http://ex.org/>

REGISTER STREAM ex:out AS
SELECT RSTREAM ?s
FROM NAMED WINDOW ex:w1 ON ex:s1 [RANGE PT10S STEP PT5S]
FROM NAMED WINDOW ex:w2 ON ex:s1 [ITEM 10]
FROM NAMED WINDOW ex:w3 ON ex:s2 [FROM NOW-PT1H TO NOW-PT0S STEP ?step]
WHERE {
  WINDOW ex:w1 {
    ?s ?p ?o
  }
}
"
        );
    }

    #[test]
    fn test_native_round_trip() {
        let query = parse_query(
            "PREFIX ex: <http://ex.org/>
             REGISTER ISTREAM <http://out> AS
             CONSTRUCT { ?s ex:seen ?o . }
             FROM <http://static>
             FROM NAMED WINDOW ex:w ON ex:s [RANGE 60000]
             WHERE { WINDOW ex:w { ?s ex:p ?o FILTER(?o > 2.5) } } LIMIT 10",
        )
        .unwrap();
        let copy = query.clone_via_roundtrip().unwrap();
        assert_eq!(copy, query);
        assert_eq!(copy.output_stream().unwrap().operator, OutputOperator::Istream);
    }
}
