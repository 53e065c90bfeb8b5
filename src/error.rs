use std::fmt;

use crate::duration::DurationError;

/// Fatal errors raised while building the query model or a template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstructionError {
    #[error("window {0} is already declared")]
    DuplicateWindowId(String),
    #[error("'{0}' is not a valid template handle")]
    InvalidTemplateHandle(String),
    #[error("'{0}' is not a variable in the query")]
    UnknownVariable(String),
    #[error("projected variable '{0}' cannot be a parameter")]
    ProjectedVariable(String),
    #[error("'{0}' is an illegal variable name")]
    InvalidVariableName(String),
    #[error("'{0}' is not a valid value type")]
    InvalidValueType(String),
    #[error("argument '{0}' is already declared")]
    DuplicateArgument(String),
    #[error("invalid default value for '{var}': {reason}")]
    InvalidDefaultValue { var: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("lexical error at byte {offset}: {message}")]
    Lexical { offset: usize, message: String },
    #[error("expected {expected}, found '{found}'")]
    Unexpected { expected: String, found: String },
    #[error("unexpected end of query, expected {0}")]
    UnexpectedEnd(String),
    #[error("undeclared prefix '{0}'")]
    UndeclaredPrefix(String),
    #[error("invalid IRI <{0}>")]
    InvalidIri(String),
    #[error("invalid variable name '{0}'")]
    InvalidVariable(String),
    #[error("invalid {slot} value '{value}'")]
    InvalidWindowValue { slot: &'static str, value: String },
    #[error(transparent)]
    Duration(#[from] DurationError),
    #[error(transparent)]
    Construction(#[from] ConstructionError),
    #[error("base query rejected by the SPARQL parser: {0}")]
    Base(String),
}

/// Errors of the canonical graph codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("graph has no query node")]
    MissingQueryNode,
    #[error("graph has more than one query node")]
    AmbiguousQueryNode,
    #[error("unknown window type {0}")]
    UnknownWindowType(String),
    #[error("unknown output stream operator {0}")]
    UnknownOperator(String),
    #[error("node {node} lacks mandatory property {property}")]
    MissingProperty { node: String, property: String },
    #[error("{0} cannot be decoded as a query term")]
    InvalidTerm(String),
    #[error("{0} is not a template")]
    NotATemplate(String),
    #[error("invalid N-Triples: {0}")]
    NTriples(String),
    #[error("query text could not be decoded: {0}")]
    Body(#[from] ParseError),
    #[error(transparent)]
    Construction(#[from] ConstructionError),
}

/// Recoverable failure while turning a raw parameter into a term.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error("value '{value}' for parameter '{var}' could not be parsed as instance of datatype '{datatype}'")]
    UnparseableLiteral {
        var: String,
        value: String,
        datatype: String,
    },
    #[error("'{value}' for parameter '{var}' is not a valid resource URI")]
    InvalidResource { var: String, value: String },
    #[error("'{0}' is not a parameter in the template")]
    UndeclaredParameter(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required parameter '{var}'")]
    MissingRequiredArgument { var: String },
    #[error("value {value} for parameter '{var}' does not satisfy value type <{expected}>")]
    TypeMismatch {
        var: String,
        value: String,
        expected: String,
    },
}

/// Fatal to one `project` call only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerializationError {
    #[error("{dialect} does not support multiple windows over stream {stream}")]
    UnsupportedMultipleWindows { dialect: &'static str, stream: String },
    #[error("windows over stream {stream} cannot be combined: {first} and {second}")]
    IncompatibleWindowKinds {
        stream: String,
        first: &'static str,
        second: &'static str,
    },
    #[error("unable to combine windows over stream {stream} across variables ({field})")]
    CannotCombineAcrossVariables { stream: String, field: &'static str },
    #[error("{dialect} does not support {kind} windows")]
    UnsupportedWindowKind {
        dialect: &'static str,
        kind: &'static str,
    },
    #[error("{dialect} does not support the {operator} output operator")]
    UnsupportedOutputOperator {
        dialect: &'static str,
        operator: &'static str,
    },
    #[error("{dialect} does not support naming of the output stream")]
    UnsupportedOutputStreamName { dialect: &'static str },
    #[error("{dialect} does not support {form} queries")]
    UnsupportedQueryForm {
        dialect: &'static str,
        form: &'static str,
    },
    #[error("{dialect} does not support {construct}")]
    UnsupportedConstruct {
        dialect: &'static str,
        construct: String,
    },
    #[error("no window is declared for {0}")]
    UnknownWindow(String),
    #[error("{dialect} cannot represent duration {value}")]
    UnrepresentableDuration { dialect: &'static str, value: String },
    #[error("{field} of window {window} is not a {expected}")]
    InvalidScalar {
        window: String,
        field: &'static str,
        expected: &'static str,
    },
    #[error(transparent)]
    Duration(#[from] DurationError),
}

/// The graph oracle failed to evaluate a sub-query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("oracle query failed: {0}")]
pub struct OracleError(pub String);

/// Collected validation failures, returned by the validating instantiation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template '{0}' is not registered")]
    UnknownTemplate(String),
    #[error("template URI '{0}' already in use")]
    AlreadyRegistered(String),
    #[error("bindings failed validation: {0}")]
    Validation(ValidationErrors),
    #[error("missing required value for '{0}'")]
    MissingField(&'static str),
    #[error("template document is not valid JSON: {0}")]
    Json(String),
    #[error("instantiated query is not well formed: {0}")]
    Instantiation(ParseError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Construction(#[from] ConstructionError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error("prefix '{prefix}' maps to an invalid namespace <{namespace}>")]
    InvalidNamespace { prefix: String, namespace: String },
    #[error("template namespace <{0}> is not an absolute IRI")]
    InvalidTemplateNamespace(String),
    #[error("invalid log filter: {0}")]
    LogFilter(String),
}

/// Crate-level error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Construction(#[from] ConstructionError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Duration(#[from] DurationError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
