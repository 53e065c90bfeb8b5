use oxigraph::sparql::{QueryResults, SparqlEvaluator};
use oxigraph::store::Store;
use tracing::trace;

use crate::codec::TripleContainer;
use crate::error::OracleError;
use crate::vocabulary::{rdf, rdfs, rsp, sp};

/// Answers ASK queries over an in-memory store loaded with a canonical graph.
///
/// Used for the variable checks of argument declarations (over the encoded
/// template body) and for is-a reasoning of template bindings (over an
/// ontology graph).
pub struct GraphOracle {
    store: Store,
    size: usize,
}

impl GraphOracle {
    /// Create an oracle over the triples of `graph`
    pub fn new(graph: &TripleContainer) -> Result<Self, OracleError> {
        let store = Store::new().map_err(|e| OracleError(e.to_string()))?;
        for quad in graph.quads() {
            store.insert(&quad).map_err(|e| OracleError(e.to_string()))?;
        }
        Ok(Self {
            store,
            size: graph.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Evaluate an ASK query
    pub fn ask(&self, query: &str) -> Result<bool, OracleError> {
        trace!(query, triples = self.size, "oracle ask");
        let results = SparqlEvaluator::new()
            .parse_query(query)
            .map_err(|e| OracleError(e.to_string()))?
            .on_store(&self.store)
            .execute()
            .map_err(|e| OracleError(e.to_string()))?;
        match results {
            QueryResults::Boolean(answer) => Ok(answer),
            _ => Err(OracleError(format!("not an ASK query: {query}"))),
        }
    }

    /// Whether `name` occurs in the pattern, a window slot or the output
    /// stream of an encoded query.
    pub fn has_variable(&self, name: &str) -> Result<bool, OracleError> {
        self.ask(&format!(
            "ASK {{
                {{ ?q <{where_}> ?list . ?list <{member}> ?v }}
                UNION {{ ?q <{window}> ?w . ?w ?p ?v }}
                UNION {{ ?q <{output}> ?v }}
                ?v a <{variable}> ; <{var_name}> {name} .
            }}",
            where_ = sp::WHERE,
            member = rsp::VARIABLE,
            window = rsp::FROM_NAMED_WINDOW,
            output = rsp::HAS_OUTPUT_STREAM,
            variable = sp::VARIABLE,
            var_name = sp::VAR_NAME,
            name = string_literal(name),
        ))
    }

    /// Whether `name` is one of the result variables of an encoded query.
    pub fn is_projected(&self, name: &str) -> Result<bool, OracleError> {
        self.ask(&format!(
            "ASK {{ ?q <{results}> ?list . ?list <{member}> ?v . ?v <{var_name}> {name} }}",
            results = sp::RESULT_VARIABLES,
            member = rsp::VARIABLE,
            var_name = sp::VAR_NAME,
            name = string_literal(name),
        ))
    }

    /// Whether `value` is an instance, subclass or subproperty of `class`,
    /// following `rdfs:subClassOf` and `rdfs:subPropertyOf` transitively.
    pub fn is_a(&self, value: &str, class: &str) -> Result<bool, OracleError> {
        if value == class {
            return Ok(true);
        }
        self.ask(&format!(
            "ASK {{ <{value}> (<{ty}>/<{sub_class}>*)|<{sub_class}>+|<{sub_property}>+ <{class}> }}",
            ty = rdf::TYPE,
            sub_class = rdfs::SUB_CLASS_OF,
            sub_property = rdfs::SUB_PROPERTY_OF,
        ))
    }
}

fn string_literal(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}
