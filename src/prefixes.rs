use std::collections::BTreeMap;

use crate::vocabulary::{arg, rdf, rdfs, rsp, sp, spin, spl, xsd};

/// Prefix to namespace mapping, passed explicitly wherever prefixed names
/// have to be expanded or IRIs abbreviated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixMapping {
    entries: BTreeMap<String, String>,
}

impl PrefixMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// The vocabularies used by the canonical graph encoding.
    pub fn with_defaults() -> Self {
        let mut mapping = Self::new();
        for (prefix, ns) in [
            ("rdf", rdf::NS),
            ("rdfs", rdfs::NS),
            ("xsd", xsd::NS),
            ("sp", sp::NS),
            ("spin", spin::NS),
            ("spl", spl::NS),
            ("arg", arg::NS),
            ("rsp", rsp::NS),
        ] {
            mapping.insert(prefix, ns);
        }
        mapping
    }

    pub fn insert(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.entries.insert(prefix.into(), namespace.into());
    }

    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.entries.get(prefix).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, n)| (p.as_str(), n.as_str()))
    }

    /// Entries of `other` override entries of `self`.
    pub fn merged(&self, other: &PrefixMapping) -> PrefixMapping {
        let mut entries = self.entries.clone();
        for (p, n) in &other.entries {
            entries.insert(p.clone(), n.clone());
        }
        PrefixMapping { entries }
    }

    /// Expands `prefix:local` when the prefix is known.
    pub fn expand(&self, value: &str) -> Option<String> {
        let (prefix, local) = value.split_once(':')?;
        if local.starts_with("//") {
            return None;
        }
        self.namespace(prefix).map(|ns| format!("{ns}{local}"))
    }

    pub fn expand_or_keep(&self, value: &str) -> String {
        self.expand(value).unwrap_or_else(|| value.to_string())
    }

    /// Abbreviates `iri` with the longest matching namespace.
    pub fn short_form(&self, iri: &str) -> Option<String> {
        self.entries
            .iter()
            .filter(|(_, ns)| iri.starts_with(ns.as_str()))
            .max_by_key(|(_, ns)| ns.len())
            .and_then(|(prefix, ns)| {
                let local = &iri[ns.len()..];
                is_simple_local(local).then(|| format!("{prefix}:{local}"))
            })
    }
}

fn is_simple_local(local: &str) -> bool {
    local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        && !local.starts_with('-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_and_short_form() {
        let mut prefixes = PrefixMapping::with_defaults();
        prefixes.insert("ex", "http://example.org/");
        assert_eq!(
            prefixes.expand("xsd:duration").as_deref(),
            Some("http://www.w3.org/2001/XMLSchema#duration")
        );
        assert_eq!(prefixes.expand("http://example.org/a"), None);
        assert_eq!(prefixes.expand("unknown:a"), None);
        assert_eq!(
            prefixes.short_form("http://example.org/stream1").as_deref(),
            Some("ex:stream1")
        );
        assert_eq!(prefixes.short_form("http://example.org/a/b"), None);
    }

    #[test]
    fn test_merged_overrides() {
        let mut base = PrefixMapping::new();
        base.insert("ex", "http://a/");
        let mut other = PrefixMapping::new();
        other.insert("ex", "http://b/");
        assert_eq!(base.merged(&other).namespace("ex"), Some("http://b/"));
    }
}
