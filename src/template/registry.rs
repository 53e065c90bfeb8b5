//! Thread-safe library of templates keyed by handle.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use oxigraph::model::NamedNode;
use tracing::{debug, info};

use crate::codec::{self, TripleContainer};
use crate::config::RspConfig;
use crate::error::{ConstructionError, TemplateError};
use crate::prefixes::PrefixMapping;

use super::checker::ArgumentChecker;
use super::json::TemplateDocument;
use super::Template;

pub const DEFAULT_NAMESPACE: &str = "http://w3id.org/rsp/templates/";

/// Result of instantiating a registered template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instantiation {
    /// `None` when validation failed.
    pub query: Option<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

fn is_short_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '(' | ')'))
}

/// Expands a handle: `<iri>` and absolute IRIs are kept, prefixed names are
/// expanded with `prefixes`, short ids are appended to `namespace`.
pub fn resolve_handle(handle: &str, namespace: &str, prefixes: &PrefixMapping) -> Result<String, ConstructionError> {
    let handle = handle.trim();
    let handle = handle
        .strip_prefix('<')
        .and_then(|h| h.strip_suffix('>'))
        .unwrap_or(handle);
    let resolved = if is_short_id(handle) {
        format!("{namespace}{handle}")
    } else {
        prefixes.expand_or_keep(handle)
    };
    NamedNode::new(resolved.as_str())
        .map(NamedNode::into_string)
        .map_err(|_| ConstructionError::InvalidTemplateHandle(handle.to_string()))
}

/// Concurrent lookups share a read lock; registration and removal take the
/// write lock, so the "already registered" check and the insert are atomic.
pub struct TemplateRegistry {
    templates: RwLock<HashMap<String, Arc<Template>>>,
    namespace: String,
    checker: ArgumentChecker,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl TemplateRegistry {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self::with_checker(namespace, ArgumentChecker::default())
    }

    pub fn with_checker(namespace: impl Into<String>, checker: ArgumentChecker) -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
            namespace: namespace.into(),
            checker,
        }
    }

    pub fn from_config(config: &RspConfig) -> Self {
        let checker = ArgumentChecker::new(config.prefix_mapping()).strict(config.templates.strict);
        Self::with_checker(config.templates.namespace.clone(), checker)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn prefixes(&self) -> &PrefixMapping {
        self.checker.prefixes()
    }

    pub fn resolve(&self, handle: &str) -> Result<String, ConstructionError> {
        resolve_handle(handle, &self.namespace, self.prefixes())
    }

    /// Registers `template`; an existing handle is replaced only when
    /// `replace` is set.
    pub fn add_template(&self, template: Template, replace: bool) -> Result<Arc<Template>, TemplateError> {
        let handle = template.handle().as_str().to_string();
        let template = Arc::new(template);
        let mut templates = self.templates.write().unwrap_or_else(PoisonError::into_inner);
        if !replace && templates.contains_key(&handle) {
            return Err(TemplateError::AlreadyRegistered(handle));
        }
        templates.insert(handle.clone(), Arc::clone(&template));
        info!(handle = handle.as_str(), replace, "registered template");
        Ok(template)
    }

    pub fn get_template(&self, handle: &str) -> Option<Arc<Template>> {
        let handle = self.resolve(handle).ok()?;
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&handle)
            .cloned()
    }

    pub fn remove_template(&self, handle: &str) -> Option<Arc<Template>> {
        let handle = self.resolve(handle).ok()?;
        let removed = self
            .templates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle);
        if removed.is_some() {
            info!(handle = handle.as_str(), "removed template");
        }
        removed
    }

    /// Registered handles, sorted.
    pub fn list_templates(&self) -> Vec<String> {
        let mut handles: Vec<String> = self
            .templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        handles.sort();
        handles
    }

    pub fn len(&self) -> usize {
        self.templates.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.templates.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Binds, validates and instantiates the template at `handle`. Binding
    /// errors are reported alongside the query; validation errors leave
    /// `query` empty.
    pub fn instantiate<'a>(
        &self,
        handle: &str,
        params: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Instantiation {
        let Some(template) = self.get_template(handle) else {
            return Instantiation {
                errors: vec![TemplateError::UnknownTemplate(handle.to_string()).to_string()],
                ..Instantiation::default()
            };
        };
        let outcome = self.checker.create_bindings(&template, params);
        let mut result = Instantiation {
            errors: outcome.errors.iter().map(ToString::to_string).collect(),
            warnings: outcome.warnings.iter().map(ToString::to_string).collect(),
            ..Instantiation::default()
        };
        let validation = self.checker.validate(&template, &outcome.bindings);
        if !validation.is_empty() {
            result.errors.extend(validation.iter().map(ToString::to_string));
            return result;
        }
        match template.instantiate_unchecked(&outcome.bindings) {
            Ok(query) => result.query = Some(query),
            Err(e) => result.errors.push(e.to_string()),
        }
        debug!(
            handle = template.handle().as_str(),
            errors = result.errors.len(),
            "instantiated registered template"
        );
        result
    }

    pub fn create_template_from_json(&self, json: &str, replace: bool) -> Result<Arc<Template>, TemplateError> {
        let template = TemplateDocument::from_json(json)?.into_template(&self.namespace, self.prefixes())?;
        self.add_template(template, replace)
    }

    pub fn template_to_json(&self, handle: &str) -> Result<String, TemplateError> {
        let template = self
            .get_template(handle)
            .ok_or_else(|| TemplateError::UnknownTemplate(handle.to_string()))?;
        TemplateDocument::from_template(&template)?.to_json()
    }

    /// The whole library as one canonical graph.
    pub fn export_graph(&self) -> TripleContainer {
        let templates = self.templates.read().unwrap_or_else(PoisonError::into_inner);
        let mut graph = TripleContainer::default();
        for template in templates.values() {
            graph.extend(codec::encode_template(template));
        }
        debug!(templates = templates.len(), triples = graph.len(), "exported template library");
        graph
    }

    /// Registers every template of `graph`, returning how many were added.
    /// Either all templates are registered or none is.
    pub fn import_graph(&self, graph: &TripleContainer, replace: bool) -> Result<usize, TemplateError> {
        let decoded = codec::decode_templates(graph)?;
        let count = decoded.len();
        let mut templates = self.templates.write().unwrap_or_else(PoisonError::into_inner);
        if !replace {
            if let Some(existing) = decoded
                .iter()
                .map(|t| t.handle().as_str())
                .find(|handle| templates.contains_key(*handle))
            {
                return Err(TemplateError::AlreadyRegistered(existing.to_string()));
            }
        }
        for template in decoded {
            templates.insert(template.handle().as_str().to_string(), Arc::new(template));
        }
        info!(templates = count, replace, "imported template library");
        Ok(count)
    }
}
