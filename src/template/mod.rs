//! Parameterised query templates.
//!
//! A [`Template`] wraps an extended query body and declares typed,
//! optionally defaulted arguments over its variables. Raw parameters become
//! [`Bindings`] through an [`ArgumentChecker`], are validated against the
//! declarations and are finally substituted into the native text of the
//! body.

pub mod bindings;
pub mod checker;
mod instantiate;
pub mod json;
pub mod registry;

use oxigraph::model::NamedNode;
use tracing::debug;

use crate::codec;
use crate::engine::GraphOracle;
use crate::error::{ConstructionError, TemplateError, ValidationErrors};
use crate::prefixes::PrefixMapping;
use crate::query::ExtendedQuery;
use crate::term::Term;

pub use bindings::{BindingOutcome, Bindings};
pub use checker::ArgumentChecker;
pub use instantiate::clean;
pub use registry::{Instantiation, TemplateRegistry};

/// A declared template parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub var_name: String,
    /// A datatype or resource class; `None` accepts any term.
    pub value_type: Option<NamedNode>,
    pub optional: bool,
    pub default_value: Option<Term>,
    pub label: Option<String>,
    pub comment: Option<String>,
}

/// Raw argument declaration, resolved by [`Template::add_argument_constraint`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentDecl {
    pub var_name: String,
    pub value_type: Option<String>,
    pub default_value: Option<String>,
    pub optional: bool,
    pub label: Option<String>,
    pub comment: Option<String>,
}

impl ArgumentDecl {
    pub fn new(var_name: impl Into<String>) -> Self {
        Self {
            var_name: var_name.into(),
            ..Self::default()
        }
    }

    pub fn value_type(mut self, value_type: impl Into<String>) -> Self {
        self.value_type = Some(value_type.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    handle: NamedNode,
    body: ExtendedQuery,
    arguments: Vec<Argument>,
    label: Option<String>,
    comment: Option<String>,
}

/// `<iri>`, a prefixed name with a known prefix, or a full IRI.
fn resolve_type(raw: &str, prefixes: &PrefixMapping) -> Option<NamedNode> {
    let raw = raw.trim();
    let iri = match raw.strip_prefix('<').and_then(|r| r.strip_suffix('>')) {
        Some(iri) => iri.to_string(),
        None => prefixes
            .expand(raw)
            .or_else(|| raw.contains("://").then(|| raw.to_string()))?,
    };
    NamedNode::new(iri).ok()
}

/// Variable names usable as arguments.
pub(crate) fn is_valid_var_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Template {
    /// Wraps `body` under `handle`, which must be an absolute IRI.
    pub fn new(body: ExtendedQuery, handle: &str) -> Result<Self, ConstructionError> {
        let handle = NamedNode::new(handle.trim_start_matches('<').trim_end_matches('>'))
            .map_err(|_| ConstructionError::InvalidTemplateHandle(handle.to_string()))?;
        debug!(handle = handle.as_str(), "created template");
        Ok(Self::from_parts(handle, body, Vec::new(), None, None))
    }

    pub(crate) fn from_parts(
        handle: NamedNode,
        body: ExtendedQuery,
        mut arguments: Vec<Argument>,
        label: Option<String>,
        comment: Option<String>,
    ) -> Self {
        arguments.sort_by(|a, b| a.var_name.cmp(&b.var_name));
        Self {
            handle,
            body,
            arguments,
            label,
            comment,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn handle(&self) -> &NamedNode {
        &self.handle
    }

    pub fn body(&self) -> &ExtendedQuery {
        &self.body
    }

    /// Declared arguments, sorted by variable name.
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn argument(&self, var_name: &str) -> Option<&Argument> {
        self.arguments.iter().find(|a| a.var_name == var_name)
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Prefixes for resolving raw values: the body prologue over `defaults`.
    pub fn prefixes(&self, defaults: &PrefixMapping) -> PrefixMapping {
        defaults.merged(&self.body.prologue().prefixes)
    }

    /// Declares an argument, resolving prefixed names against the body
    /// prologue and the built-in prefixes.
    pub fn add_argument_constraint(&mut self, decl: ArgumentDecl) -> Result<(), TemplateError> {
        self.add_argument_constraint_with(decl, &PrefixMapping::with_defaults())
    }

    /// Declares an argument. The variable must occur in the encoded body,
    /// outside the projection.
    pub fn add_argument_constraint_with(
        &mut self,
        decl: ArgumentDecl,
        defaults: &PrefixMapping,
    ) -> Result<(), TemplateError> {
        let var_name = decl.var_name.trim_start_matches(['?', '$']).to_string();
        if !is_valid_var_name(&var_name) {
            return Err(ConstructionError::InvalidVariableName(var_name).into());
        }
        if self.argument(&var_name).is_some() {
            return Err(ConstructionError::DuplicateArgument(var_name).into());
        }

        let oracle = GraphOracle::new(&codec::encode_query(&self.body))?;
        if !oracle.has_variable(&var_name)? {
            return Err(ConstructionError::UnknownVariable(var_name).into());
        }
        if oracle.is_projected(&var_name)? {
            return Err(ConstructionError::ProjectedVariable(var_name).into());
        }

        let prefixes = self.prefixes(defaults);
        let value_type = decl
            .value_type
            .as_deref()
            .map(|raw| {
                resolve_type(raw, &prefixes)
                    .ok_or_else(|| ConstructionError::InvalidValueType(raw.to_string()))
            })
            .transpose()?;
        let default_value = decl
            .default_value
            .as_deref()
            .map(|raw| {
                bindings::to_term(&var_name, raw, value_type.as_ref(), &prefixes).map_err(|e| {
                    ConstructionError::InvalidDefaultValue {
                        var: var_name.clone(),
                        reason: e.to_string(),
                    }
                })
            })
            .transpose()?;

        debug!(
            handle = self.handle.as_str(),
            var = var_name.as_str(),
            value_type = value_type.as_ref().map(NamedNode::as_str),
            "declared template argument"
        );
        self.arguments.push(Argument {
            var_name,
            value_type,
            optional: decl.optional,
            default_value,
            label: decl.label,
            comment: decl.comment,
        });
        self.arguments.sort_by(|a, b| a.var_name.cmp(&b.var_name));
        Ok(())
    }

    /// Shorthand for [`ArgumentChecker::create_bindings`] with a lenient checker.
    pub fn create_bindings<'a>(
        &self,
        params: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> BindingOutcome {
        ArgumentChecker::default().create_bindings(self, params)
    }

    /// Shorthand for [`ArgumentChecker::validate`] without an ontology.
    pub fn validate(&self, bindings: &Bindings) -> Vec<crate::error::ValidationError> {
        ArgumentChecker::default().validate(self, bindings)
    }

    /// Validates `bindings` and substitutes them into the native body text.
    pub fn instantiate(&self, bindings: &Bindings) -> Result<String, TemplateError> {
        let errors = self.validate(bindings);
        if !errors.is_empty() {
            return Err(TemplateError::Validation(ValidationErrors(errors)));
        }
        self.instantiate_unchecked(bindings)
    }

    /// Substitutes `bindings` without validating them first.
    pub fn instantiate_unchecked(&self, bindings: &Bindings) -> Result<String, TemplateError> {
        instantiate::instantiate(self, bindings)
    }

    /// Validated instantiation returning the re-parsed query.
    pub fn instantiate_query(&self, bindings: &Bindings) -> Result<ExtendedQuery, TemplateError> {
        let text = self.instantiate(bindings)?;
        crate::parser::parse_query(&text).map_err(TemplateError::Instantiation)
    }
}
