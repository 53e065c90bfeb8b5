//! Canonical graph encoding of extended queries and templates.
//!
//! A query becomes one blank node typed by its result form. The base body
//! is stored as text under `sp:text`; its variables are listed under
//! `sp:where` and `sp:resultVariables`. Windows hang off the query node via
//! `rsp:fromNamedWindow`. Variables are `sp:Variable` nodes shared by name
//! across one encoding.

pub mod graph;

use std::collections::HashMap;

use oxigraph::model::{BlankNode, Literal, NamedNode, Term as RdfTerm, Triple};
use tracing::debug;

use crate::dialect::rspql;
use crate::error::CodecError;
use crate::parser::RspqlParser;
use crate::query::{ExtendedQuery, QueryForm};
use crate::stream::OutputOperator;
use crate::template::{Argument, Template};
use crate::term::Term;
use crate::vocabulary::{self, arg, rdf, rdfs, rsp, sp, spin, spl, xsd};
use crate::window::{WindowKind, WindowSpec};

pub use graph::TripleContainer;

/// Accumulates the triples of one encoding.
#[derive(Debug, Default)]
pub struct Encoder {
    graph: TripleContainer,
    variables: HashMap<String, BlankNode>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> TripleContainer {
        self.graph
    }

    fn add(&mut self, subject: impl Into<RdfSubject>, predicate: &str, object: impl Into<RdfTerm>) {
        let triple = match subject.into() {
            RdfSubject::Named(n) => Triple::new(n, vocabulary::node(predicate), object),
            RdfSubject::Blank(b) => Triple::new(b, vocabulary::node(predicate), object),
        };
        self.graph.add(triple);
    }

    fn variable(&mut self, name: &str) -> BlankNode {
        if let Some(node) = self.variables.get(name) {
            return node.clone();
        }
        let node = BlankNode::default();
        self.add(node.clone(), rdf::TYPE, vocabulary::node(sp::VARIABLE));
        self.add(node.clone(), sp::VAR_NAME, Literal::new_simple_literal(name));
        self.variables.insert(name.to_string(), node.clone());
        node
    }

    fn term(&mut self, term: &Term) -> RdfTerm {
        match term {
            Term::Iri(n) => n.clone().into(),
            Term::Literal(l) => l.clone().into(),
            Term::Variable(v) => self.variable(v.as_str()).into(),
        }
    }

    fn variable_list<'a>(&mut self, names: impl IntoIterator<Item = &'a String>) -> BlankNode {
        let list = BlankNode::default();
        for name in names {
            let var = self.variable(name);
            self.add(list.clone(), rsp::VARIABLE, var);
        }
        list
    }

    /// Encodes `query` and returns its node.
    pub fn encode_query(&mut self, query: &ExtendedQuery) -> BlankNode {
        let node = BlankNode::default();
        let body = query.body();
        self.add(node.clone(), rdf::TYPE, vocabulary::node(query.form().type_iri()));
        self.add(
            node.clone(),
            sp::TEXT,
            Literal::new_simple_literal(rspql::body_text(query)),
        );

        let pattern_vars = body.pattern_variables();
        if !pattern_vars.is_empty() {
            let list = self.variable_list(&pattern_vars);
            self.add(node.clone(), sp::WHERE, list);
        }
        let projected = body.projected_variables();
        if !projected.is_empty() {
            let list = self.variable_list(&projected);
            self.add(node.clone(), sp::RESULT_VARIABLES, list);
        }

        let mut windows = query.windows(None);
        windows.sort();
        for window in windows {
            let window_node = self.encode_window(window);
            self.add(node.clone(), rsp::FROM_NAMED_WINDOW, window_node);
        }

        if let Some(decl) = query.output_stream() {
            let stream = self.term(&decl.stream);
            self.add(node.clone(), rsp::HAS_OUTPUT_STREAM, stream);
        }
        if let Some(operator) = query.output_operator().iri() {
            self.add(
                node.clone(),
                rsp::HAS_OUTPUT_STREAM_OPERATOR,
                vocabulary::node(operator),
            );
        }
        node
    }

    fn encode_window(&mut self, window: &WindowSpec) -> BlankNode {
        let node = BlankNode::default();
        self.add(node.clone(), rdf::TYPE, vocabulary::node(window.kind().type_iri()));
        let mut props: Vec<(&str, &Term)> = vec![
            (rsp::WINDOW_URI, window.window_id()),
            (rsp::STREAM_URI, window.stream_id()),
        ];
        match window {
            WindowSpec::Logical { range, step, .. } => {
                props.push((rsp::LOGICAL_RANGE, range));
                props.extend(step.iter().map(|s| (rsp::LOGICAL_STEP, s)));
            }
            WindowSpec::LogicalPast { from, to, step, .. } => {
                props.push((rsp::FROM, from));
                props.push((rsp::TO, to));
                props.extend(step.iter().map(|s| (rsp::LOGICAL_STEP, s)));
            }
            WindowSpec::Physical {
                item_count, step, ..
            } => {
                props.push((rsp::PHYSICAL_RANGE, item_count));
                props.extend(step.iter().map(|s| (rsp::PHYSICAL_STEP, s)));
            }
        }
        for (predicate, term) in props {
            let object = self.term(term);
            self.add(node.clone(), predicate, object);
        }
        node
    }

    pub fn encode_template(&mut self, template: &Template) {
        let handle = template.handle().clone();
        let form_type = match template.body().form() {
            QueryForm::Select => spin::SELECT_TEMPLATE,
            QueryForm::Construct => spin::CONSTRUCT_TEMPLATE,
            QueryForm::Ask => spin::ASK_TEMPLATE,
            QueryForm::Describe => spin::DESCRIBE_TEMPLATE,
        };
        self.add(handle.clone(), rdf::TYPE, vocabulary::node(spin::TEMPLATE));
        self.add(handle.clone(), rdf::TYPE, vocabulary::node(form_type));
        let body = self.encode_query(template.body());
        self.add(handle.clone(), spin::BODY, body);
        if let Some(label) = template.label() {
            self.add(handle.clone(), rdfs::LABEL, Literal::new_simple_literal(label));
        }
        if let Some(comment) = template.comment() {
            self.add(handle.clone(), rdfs::COMMENT, Literal::new_simple_literal(comment));
        }
        for argument in template.arguments() {
            let node = self.encode_argument(argument);
            self.add(handle.clone(), spin::CONSTRAINT, node);
        }
    }

    fn encode_argument(&mut self, argument: &Argument) -> BlankNode {
        let node = BlankNode::default();
        self.add(node.clone(), rdf::TYPE, vocabulary::node(spl::ARGUMENT));
        self.add(
            node.clone(),
            spl::PREDICATE,
            vocabulary::node(&format!("{}{}", arg::NS, argument.var_name)),
        );
        if let Some(value_type) = &argument.value_type {
            self.add(node.clone(), spl::VALUE_TYPE, value_type.clone());
        }
        if let Some(default) = &argument.default_value {
            let object = self.term(default);
            self.add(node.clone(), spl::DEFAULT_VALUE, object);
        }
        self.add(
            node.clone(),
            spl::OPTIONAL,
            Literal::new_typed_literal(argument.optional.to_string(), vocabulary::node(xsd::BOOLEAN)),
        );
        if let Some(label) = &argument.label {
            self.add(node.clone(), rdfs::LABEL, Literal::new_simple_literal(label));
        }
        if let Some(comment) = &argument.comment {
            self.add(node.clone(), rdfs::COMMENT, Literal::new_simple_literal(comment));
        }
        node
    }
}

enum RdfSubject {
    Named(NamedNode),
    Blank(BlankNode),
}

impl From<NamedNode> for RdfSubject {
    fn from(n: NamedNode) -> Self {
        RdfSubject::Named(n)
    }
}

impl From<BlankNode> for RdfSubject {
    fn from(b: BlankNode) -> Self {
        RdfSubject::Blank(b)
    }
}

pub fn encode_query(query: &ExtendedQuery) -> TripleContainer {
    let mut encoder = Encoder::new();
    encoder.encode_query(query);
    let graph = encoder.finish();
    debug!(triples = graph.len(), "encoded query");
    graph
}

pub fn encode_template(template: &Template) -> TripleContainer {
    let mut encoder = Encoder::new();
    encoder.encode_template(template);
    let graph = encoder.finish();
    debug!(handle = template.handle().as_str(), triples = graph.len(), "encoded template");
    graph
}

/// Reads terms and nodes back out of a canonical graph.
pub struct Decoder<'a> {
    graph: &'a TripleContainer,
}

impl<'a> Decoder<'a> {
    pub fn new(graph: &'a TripleContainer) -> Self {
        Self { graph }
    }

    /// Query nodes, sorted.
    pub fn query_nodes(&self) -> Vec<String> {
        let mut nodes: Vec<String> = [
            QueryForm::Select,
            QueryForm::Construct,
            QueryForm::Ask,
            QueryForm::Describe,
        ]
        .iter()
        .flat_map(|form| self.graph.subjects(rdf::TYPE, &format!("<{}>", form.type_iri())))
        .collect();
        nodes.sort();
        nodes
    }

    fn required(&self, node: &str, predicate: &str) -> Result<&'a RdfTerm, CodecError> {
        self.graph
            .object(node, predicate)
            .ok_or_else(|| CodecError::MissingProperty {
                node: node.to_string(),
                property: predicate.to_string(),
            })
    }

    fn literal_value(&self, node: &str, predicate: &str) -> Option<String> {
        match self.graph.object(node, predicate) {
            Some(RdfTerm::Literal(l)) => Some(l.value().to_string()),
            _ => None,
        }
    }

    fn term(&self, object: &RdfTerm) -> Result<Term, CodecError> {
        match object {
            RdfTerm::NamedNode(n) => Ok(Term::Iri(n.clone())),
            RdfTerm::Literal(l) => Ok(Term::Literal(l.clone())),
            RdfTerm::BlankNode(b) => {
                let key = b.to_string();
                let name = self
                    .literal_value(&key, sp::VAR_NAME)
                    .ok_or_else(|| CodecError::InvalidTerm(key.clone()))?;
                Term::variable(&name).map_err(|_| CodecError::InvalidTerm(name))
            }
            #[allow(unreachable_patterns)]
            other => Err(CodecError::InvalidTerm(other.to_string())),
        }
    }

    fn window(&self, node: &str) -> Result<WindowSpec, CodecError> {
        let kind = self
            .graph
            .objects(node, rdf::TYPE)
            .filter_map(|o| match o {
                RdfTerm::NamedNode(n) => WindowKind::from_type_iri(n.as_str()),
                _ => None,
            })
            .next()
            .ok_or_else(|| {
                let types: Vec<String> = self.graph.objects(node, rdf::TYPE).map(ToString::to_string).collect();
                CodecError::UnknownWindowType(if types.is_empty() {
                    format!("(untyped window {node})")
                } else {
                    types.join(", ")
                })
            })?;
        let get = |predicate: &str| -> Result<Term, CodecError> { self.term(self.required(node, predicate)?) };
        let optional = |predicate: &str| -> Result<Option<Term>, CodecError> {
            self.graph.object(node, predicate).map(|o| self.term(o)).transpose()
        };

        let window_id = get(rsp::WINDOW_URI)?;
        let stream_id = get(rsp::STREAM_URI)?;
        Ok(match kind {
            WindowKind::Logical => WindowSpec::logical(
                window_id,
                stream_id,
                get(rsp::LOGICAL_RANGE)?,
                optional(rsp::LOGICAL_STEP)?,
            ),
            WindowKind::LogicalPast => WindowSpec::logical_past(
                window_id,
                stream_id,
                get(rsp::FROM)?,
                get(rsp::TO)?,
                optional(rsp::LOGICAL_STEP)?,
            ),
            WindowKind::Physical => WindowSpec::physical(
                window_id,
                stream_id,
                get(rsp::PHYSICAL_RANGE)?,
                optional(rsp::PHYSICAL_STEP)?,
            ),
        })
    }

    /// Decodes the query at `node`.
    pub fn query(&self, node: &str) -> Result<ExtendedQuery, CodecError> {
        let text = self
            .literal_value(node, sp::TEXT)
            .ok_or_else(|| CodecError::MissingProperty {
                node: node.to_string(),
                property: sp::TEXT.to_string(),
            })?;
        let mut query = RspqlParser::new().parse(&text)?;

        let mut window_nodes: Vec<String> = self
            .graph
            .objects(node, rsp::FROM_NAMED_WINDOW)
            .map(ToString::to_string)
            .collect();
        window_nodes.sort();
        for window_node in window_nodes {
            query.add_window(self.window(&window_node)?)?;
        }

        let operator = match self.graph.object(node, rsp::HAS_OUTPUT_STREAM_OPERATOR) {
            Some(RdfTerm::NamedNode(n)) => OutputOperator::from_iri(n.as_str())
                .ok_or_else(|| CodecError::UnknownOperator(n.to_string()))?,
            Some(other) => return Err(CodecError::UnknownOperator(other.to_string())),
            None => OutputOperator::Unspecified,
        };
        match self.graph.object(node, rsp::HAS_OUTPUT_STREAM) {
            Some(stream) => query.set_output_stream(self.term(stream)?, operator),
            None => query.set_output_operator(operator),
        }
        Ok(query)
    }

    /// Template handles, sorted.
    pub fn template_handles(&self) -> Vec<String> {
        self.graph
            .subjects(rdf::TYPE, &format!("<{}>", spin::TEMPLATE))
    }

    pub fn template(&self, handle: &str) -> Result<Template, CodecError> {
        let key = if handle.starts_with('<') {
            handle.to_string()
        } else {
            format!("<{handle}>")
        };
        if !self.graph.has_type(&key, spin::TEMPLATE) {
            return Err(CodecError::NotATemplate(key));
        }
        let iri = key.trim_start_matches('<').trim_end_matches('>');
        let handle = NamedNode::new(iri).map_err(|_| CodecError::NotATemplate(key.clone()))?;
        let body_node = self.required(&key, spin::BODY)?.to_string();
        let body = self.query(&body_node)?;

        let mut arguments = Vec::new();
        let mut constraint_nodes: Vec<String> = self
            .graph
            .objects(&key, spin::CONSTRAINT)
            .map(ToString::to_string)
            .collect();
        constraint_nodes.sort();
        for node in constraint_nodes {
            arguments.push(self.argument(&node)?);
        }
        Ok(Template::from_parts(
            handle,
            body,
            arguments,
            self.literal_value(&key, rdfs::LABEL),
            self.literal_value(&key, rdfs::COMMENT),
        ))
    }

    fn argument(&self, node: &str) -> Result<Argument, CodecError> {
        let var_name = match self.required(node, spl::PREDICATE)? {
            RdfTerm::NamedNode(n) => {
                let iri = n.as_str();
                iri.strip_prefix(arg::NS)
                    .unwrap_or_else(|| iri.rsplit(['#', '/']).next().unwrap_or(iri))
                    .to_string()
            }
            other => return Err(CodecError::InvalidTerm(other.to_string())),
        };
        let value_type = match self.graph.object(node, spl::VALUE_TYPE) {
            Some(RdfTerm::NamedNode(n)) => Some(n.clone()),
            Some(other) => return Err(CodecError::InvalidTerm(other.to_string())),
            None => None,
        };
        let default_value = self
            .graph
            .object(node, spl::DEFAULT_VALUE)
            .map(|o| self.term(o))
            .transpose()?;
        let optional = self
            .literal_value(node, spl::OPTIONAL)
            .is_some_and(|v| v == "true" || v == "1");
        Ok(Argument {
            var_name,
            value_type,
            optional,
            default_value,
            label: self.literal_value(node, rdfs::LABEL),
            comment: self.literal_value(node, rdfs::COMMENT),
        })
    }
}

/// Decodes the single query of `graph`.
pub fn decode_query(graph: &TripleContainer) -> Result<ExtendedQuery, CodecError> {
    let decoder = Decoder::new(graph);
    let nodes = decoder.query_nodes();
    let node = match nodes.as_slice() {
        [] => return Err(CodecError::MissingQueryNode),
        [node] => node,
        _ => return Err(CodecError::AmbiguousQueryNode),
    };
    let query = decoder.query(node)?;
    debug!(windows = query.windows(None).len(), "decoded query");
    Ok(query)
}

pub fn decode_template(graph: &TripleContainer, handle: &str) -> Result<Template, CodecError> {
    Decoder::new(graph).template(handle)
}

/// Every template of `graph`, sorted by handle.
pub fn decode_templates(graph: &TripleContainer) -> Result<Vec<Template>, CodecError> {
    let decoder = Decoder::new(graph);
    decoder
        .template_handles()
        .iter()
        .map(|handle| decoder.template(handle))
        .collect()
}
