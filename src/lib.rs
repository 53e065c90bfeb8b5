//! RSP-QL continuous queries: window and output stream model, canonical
//! graph encoding, parameterised templates and projection onto C-SPARQL,
//! CQELS-QL and SPARQLStream.

pub mod codec;
pub mod config;
pub mod dialect;
pub mod duration;
pub mod engine;
pub mod error;
pub mod logging;
pub mod parser;
pub mod prefixes;
pub mod query;
pub mod stream;
pub mod template;
pub mod term;
pub mod vocabulary;
pub mod window;

pub use codec::{TripleContainer, decode_query, decode_template, decode_templates, encode_query, encode_template};
pub use config::RspConfig;
pub use dialect::{Capabilities, Dialect, Projection, Projector, project, projector_for};
pub use engine::GraphOracle;
pub use error::{Error, Result};
pub use parser::{RspqlParser, parse_query};
pub use prefixes::PrefixMapping;
pub use query::ExtendedQuery;
pub use stream::{OutputOperator, OutputStreamDecl};
pub use template::{
    Argument, ArgumentChecker, ArgumentDecl, Bindings, Instantiation, Template, TemplateRegistry,
};
pub use term::Term;
pub use window::{WindowKind, WindowSpec};
