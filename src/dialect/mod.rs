//! Projection of extended queries onto concrete continuous query dialects.

pub mod cqels;
pub mod csparql;
pub mod reconcile;
pub mod rspql;
pub mod sparqlstream;
pub mod writer;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::duration::TimeUnit;
use crate::error::SerializationError;
use crate::query::{ExtendedQuery, QueryForm};
use crate::stream::OutputOperator;
use crate::term::Term;
use crate::window::{WindowKind, WindowSpec};

pub use cqels::CqelsProjector;
pub use csparql::CsparqlProjector;
pub use rspql::RspqlProjector;
pub use sparqlstream::SparqlStreamProjector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// RSP-QL, the native syntax.
    Rspql,
    /// CQELS-QL.
    Cqels,
    /// C-SPARQL.
    Csparql,
    /// SPARQLStream (morph-streams).
    SparqlStream,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::Rspql,
        Dialect::Cqels,
        Dialect::Csparql,
        Dialect::SparqlStream,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Rspql => "RSP-QL",
            Dialect::Cqels => "CQELS-QL",
            Dialect::Csparql => "C-SPARQL",
            Dialect::SparqlStream => "SPARQLStream",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "rspql" | "native" => Ok(Dialect::Rspql),
            "cqels" | "cqelsql" => Ok(Dialect::Cqels),
            "csparql" => Ok(Dialect::Csparql),
            "sparqlstream" | "morph" | "morphstream" => Ok(Dialect::SparqlStream),
            _ => Err(format!("unknown dialect '{s}'")),
        }
    }
}

/// What a dialect can express.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    /// `None` when any number of windows may share a stream.
    pub max_windows_per_stream: Option<usize>,
    pub window_kinds: &'static [WindowKind],
    /// Explicit operators; an unspecified operator is always accepted.
    pub operators: &'static [OutputOperator],
    /// Operator assumed when the query's operator is not available.
    pub default_operator: OutputOperator,
    pub named_output_stream: bool,
    pub ask: bool,
    pub describe: bool,
    /// Smallest step the dialect can state, used when merging steps.
    pub min_step: Duration,
    /// Time units, smallest first.
    pub units: &'static [TimeUnit],
    /// Between the amount and the unit symbol.
    pub unit_separator: &'static str,
}

impl Capabilities {
    pub fn supports_kind(&self, kind: WindowKind) -> bool {
        self.window_kinds.contains(&kind)
    }

    pub fn supports_operator(&self, operator: OutputOperator) -> bool {
        operator == OutputOperator::Unspecified || self.operators.contains(&operator)
    }

    pub fn supports_form(&self, form: QueryForm) -> bool {
        match form {
            QueryForm::Select | QueryForm::Construct => true,
            QueryForm::Ask => self.ask,
            QueryForm::Describe => self.describe,
        }
    }
}

/// Dialect text plus everything that was dropped or approximated to produce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub text: String,
    pub warnings: Vec<String>,
}

pub trait Projector: Send + Sync {
    fn dialect(&self) -> Dialect;

    fn capabilities(&self) -> Capabilities;

    /// In strict mode anything the dialect cannot express is an error;
    /// otherwise it is degraded with a warning.
    fn project(&self, query: &ExtendedQuery, strict: bool) -> Result<Projection, SerializationError>;
}

pub fn projector_for(dialect: Dialect) -> &'static dyn Projector {
    match dialect {
        Dialect::Rspql => &RspqlProjector,
        Dialect::Cqels => &CqelsProjector,
        Dialect::Csparql => &CsparqlProjector,
        Dialect::SparqlStream => &SparqlStreamProjector,
    }
}

/// Projects `query` onto `dialect`.
pub fn project(
    query: &ExtendedQuery,
    dialect: Dialect,
    strict: bool,
) -> Result<Projection, SerializationError> {
    projector_for(dialect).project(query, strict)
}

/// Collects degradations in lenient mode, turns them into errors in strict mode.
#[derive(Debug)]
pub(crate) struct Degradations {
    dialect: Dialect,
    strict: bool,
    warnings: Vec<String>,
}

impl Degradations {
    pub(crate) fn new(dialect: Dialect, strict: bool) -> Self {
        Self {
            dialect,
            strict,
            warnings: Vec::new(),
        }
    }

    pub(crate) fn strict(&self) -> bool {
        self.strict
    }

    /// Fails with `error` in strict mode, records `message` otherwise.
    pub(crate) fn degrade(
        &mut self,
        error: SerializationError,
        message: impl Into<String>,
    ) -> Result<(), SerializationError> {
        if self.strict {
            return Err(error);
        }
        self.note(message);
        Ok(())
    }

    /// A warning in both modes.
    pub(crate) fn note(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(dialect = self.dialect.name(), "{message}");
        self.warnings.push(message);
    }

    pub(crate) fn into_warnings(self) -> Vec<String> {
        self.warnings
    }
}

/// The windows, operator and output stream a restrictive dialect will print.
#[derive(Debug)]
pub(crate) struct Plan {
    pub windows: Vec<WindowSpec>,
    pub operator: OutputOperator,
    pub output_stream: Option<Term>,
}

/// Shared capability checks and window reconciliation.
pub(crate) fn plan(
    query: &ExtendedQuery,
    caps: &Capabilities,
    log: &mut Degradations,
) -> Result<Plan, SerializationError> {
    let dialect = log.dialect.name();
    let form = query.form();
    if !caps.supports_form(form) {
        return Err(SerializationError::UnsupportedQueryForm {
            dialect,
            form: form.name(),
        });
    }

    let mut windows = Vec::new();
    for window in query.windows(None) {
        if caps.supports_kind(window.kind()) {
            windows.push(window.clone());
            continue;
        }
        let error = SerializationError::UnsupportedWindowKind {
            dialect,
            kind: window.kind().name(),
        };
        match reconcile::as_logical(window) {
            Some(logical) if caps.supports_kind(WindowKind::Logical) && !log.strict() => {
                log.note(format!(
                    "{dialect} does not support {} windows, {} is treated as a logical window",
                    window.kind().name(),
                    window.window_id()
                ));
                windows.push(logical);
            }
            _ => return Err(error),
        }
    }

    let windows = if caps.max_windows_per_stream == Some(1) {
        let mut merged = Vec::new();
        for (stream, group) in reconcile::group_by_stream(windows) {
            if group.len() > 1 {
                log.degrade(
                    SerializationError::UnsupportedMultipleWindows {
                        dialect,
                        stream: stream.to_string(),
                    },
                    format!(
                        "{dialect} does not support multiple windows over {stream}, {} windows are combined",
                        group.len()
                    ),
                )?;
            }
            merged.push(reconcile::combine_all(&group, caps.min_step)?);
        }
        merged
    } else {
        let mut sorted = windows;
        sorted.sort();
        sorted
    };

    let mut operator = query.output_operator();
    if !caps.supports_operator(operator) {
        log.degrade(
            SerializationError::UnsupportedOutputOperator {
                dialect,
                operator: operator.name(),
            },
            format!(
                "{operator} is not supported in {dialect}, {} is used instead",
                caps.default_operator
            ),
        )?;
        operator = caps.default_operator;
    }

    let mut output_stream = query.output_stream().map(|decl| decl.stream);
    if let Some(stream) = &output_stream {
        if !caps.named_output_stream {
            log.degrade(
                SerializationError::UnsupportedOutputStreamName { dialect },
                format!("REGISTER of {stream} is not supported in {dialect} and is omitted"),
            )?;
            output_stream = None;
        }
    }

    Ok(Plan {
        windows,
        operator,
        output_stream,
    })
}

/// Formats a bound duration with the dialect's units; variables pass through.
pub(crate) fn format_duration(
    term: &Term,
    caps: &Capabilities,
    dialect: Dialect,
    window: &WindowSpec,
    field: &'static str,
) -> Result<String, SerializationError> {
    if term.is_variable() {
        return Ok(term.to_string());
    }
    let duration = term
        .to_duration()
        .ok_or_else(|| SerializationError::InvalidScalar {
            window: window.window_id().to_string(),
            field,
            expected: "duration",
        })??;
    crate::duration::format_with_units(duration, caps.units, caps.unit_separator).ok_or_else(|| {
        SerializationError::UnrepresentableDuration {
            dialect: dialect.name(),
            value: term.to_slot_string(None),
        }
    })
}

/// Formats a bound count; variables pass through.
pub(crate) fn format_count(
    term: &Term,
    window: &WindowSpec,
    field: &'static str,
) -> Result<String, SerializationError> {
    if term.is_variable() {
        return Ok(term.to_string());
    }
    term.to_count()
        .map(|n| n.to_string())
        .ok_or_else(|| SerializationError::InvalidScalar {
            window: window.window_id().to_string(),
            field,
            expected: "count",
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_names() {
        for dialect in Dialect::ALL {
            assert_eq!(projector_for(dialect).dialect(), dialect);
        }
        assert_eq!("C-SPARQL".parse::<Dialect>(), Ok(Dialect::Csparql));
        assert_eq!("morph".parse::<Dialect>(), Ok(Dialect::SparqlStream));
        assert!("sql".parse::<Dialect>().is_err());
    }
}
