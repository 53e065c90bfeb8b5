//! The oxigraph side of the crate: sub-query oracles over canonical graphs.

pub mod oracle;

pub use oracle::GraphOracle;
