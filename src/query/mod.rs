//! The extended query model: a base query body decorated with window
//! declarations and an output stream.

pub mod pattern;
pub mod token;

use std::collections::BTreeSet;

use crate::error::{ConstructionError, Result};
use crate::prefixes::PrefixMapping;
use crate::stream::{OutputOperator, OutputStreamDecl};
use crate::term::Term;
use crate::vocabulary::sp;
use crate::window::{WindowKind, WindowSpec};

pub use pattern::{GroupPattern, PatternPart};
pub use token::Token;

/// `BASE` and `PREFIX` declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prologue {
    pub base: Option<String>,
    pub prefixes: PrefixMapping,
}

impl Prologue {
    pub fn is_empty(&self) -> bool {
        self.base.is_none() && self.prefixes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryForm {
    Select,
    Construct,
    Ask,
    Describe,
}

impl QueryForm {
    pub fn name(&self) -> &'static str {
        match self {
            QueryForm::Select => "SELECT",
            QueryForm::Construct => "CONSTRUCT",
            QueryForm::Ask => "ASK",
            QueryForm::Describe => "DESCRIBE",
        }
    }

    pub fn type_iri(&self) -> &'static str {
        match self {
            QueryForm::Select => sp::SELECT,
            QueryForm::Construct => sp::CONSTRUCT,
            QueryForm::Ask => sp::ASK,
            QueryForm::Describe => sp::DESCRIBE,
        }
    }

    pub fn from_type_iri(iri: &str) -> Option<Self> {
        [
            QueryForm::Select,
            QueryForm::Construct,
            QueryForm::Ask,
            QueryForm::Describe,
        ]
        .into_iter()
        .find(|f| f.type_iri() == iri)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultForm {
    Select {
        /// `DISTINCT` or `REDUCED`.
        modifier: Option<Token>,
        projection: Vec<Token>,
    },
    /// `None` for the `CONSTRUCT WHERE` short form.
    Construct { template: Option<Vec<Token>> },
    Ask,
    Describe { targets: Vec<Token> },
}

impl ResultForm {
    pub fn form(&self) -> QueryForm {
        match self {
            ResultForm::Select { .. } => QueryForm::Select,
            ResultForm::Construct { .. } => QueryForm::Construct,
            ResultForm::Ask => QueryForm::Ask,
            ResultForm::Describe { .. } => QueryForm::Describe,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetClause {
    /// `FROM <g>`
    Default(Token),
    /// `FROM NAMED <g>`
    Named(Token),
}

/// The part of a query owned by the base SPARQL grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBody {
    pub form: ResultForm,
    pub dataset: Vec<DatasetClause>,
    pub pattern: Option<GroupPattern>,
    /// Everything after the WHERE clause (GROUP BY, ORDER BY, LIMIT, VALUES...).
    pub modifiers: Vec<Token>,
}

impl QueryBody {
    pub fn new(form: ResultForm, pattern: GroupPattern) -> Self {
        Self {
            form,
            dataset: Vec::new(),
            pattern: Some(pattern),
            modifiers: Vec::new(),
        }
    }

    /// Variables of the WHERE clause, the CONSTRUCT template and the solution modifiers.
    pub fn pattern_variables(&self) -> BTreeSet<String> {
        let mut vars = self.pattern.as_ref().map(GroupPattern::variables).unwrap_or_default();
        let mut extend = |tokens: &[Token]| {
            vars.extend(tokens.iter().filter_map(Token::var_name).map(String::from));
        };
        match &self.form {
            ResultForm::Construct {
                template: Some(template),
            } => extend(template),
            ResultForm::Describe { targets } => extend(targets),
            _ => {}
        }
        extend(&self.modifiers);
        vars
    }

    /// Variables the SELECT clause projects: plain `?v` items and `AS ?v` aliases.
    pub fn projected_variables(&self) -> BTreeSet<String> {
        let ResultForm::Select { projection, .. } = &self.form else {
            return BTreeSet::new();
        };
        let mut vars = BTreeSet::new();
        let mut depth = 0usize;
        let mut prev: Option<&Token> = None;
        for token in projection {
            if token.is_punct("(") {
                depth += 1;
            } else if token.is_punct(")") {
                depth = depth.saturating_sub(1);
            } else if let Some(name) = token.var_name() {
                if depth == 0 || prev.is_some_and(|p| p.is_word("AS")) {
                    vars.insert(name.to_string());
                }
            }
            prev = Some(token);
        }
        vars
    }

    /// Every variable of the projection, including those inside expressions.
    pub fn projection_tokens_variables(&self) -> BTreeSet<String> {
        match &self.form {
            ResultForm::Select { projection, .. } => projection
                .iter()
                .filter_map(Token::var_name)
                .map(String::from)
                .collect(),
            _ => BTreeSet::new(),
        }
    }
}

/// A continuous query: base body, window declarations and output stream.
#[derive(Debug, Clone)]
pub struct ExtendedQuery {
    prologue: Prologue,
    body: QueryBody,
    windows: Vec<WindowSpec>,
    output_stream: Option<Term>,
    operator: OutputOperator,
}

impl ExtendedQuery {
    pub fn new(prologue: Prologue, body: QueryBody) -> Self {
        Self {
            prologue,
            body,
            windows: Vec::new(),
            output_stream: None,
            operator: OutputOperator::Unspecified,
        }
    }

    pub fn prologue(&self) -> &Prologue {
        &self.prologue
    }

    pub fn body(&self) -> &QueryBody {
        &self.body
    }

    pub fn form(&self) -> QueryForm {
        self.body.form.form()
    }

    /// A copy of the query with its WHERE pattern replaced.
    pub(crate) fn with_pattern(&self, pattern: GroupPattern) -> ExtendedQuery {
        let mut query = self.clone();
        query.body.pattern = Some(pattern);
        query
    }

    /// Fails when a window with the same id is already declared.
    pub fn add_window(&mut self, window: WindowSpec) -> Result<(), ConstructionError> {
        if self.has_window_id(window.window_id()) {
            return Err(ConstructionError::DuplicateWindowId(
                window.window_id().to_string(),
            ));
        }
        self.windows.push(window);
        Ok(())
    }

    /// Declared windows in declaration order, optionally of one kind only.
    pub fn windows(&self, kind: Option<WindowKind>) -> Vec<&WindowSpec> {
        self.windows
            .iter()
            .filter(|w| kind.is_none_or(|k| w.kind() == k))
            .collect()
    }

    pub fn window(&self, window_id: &Term) -> Option<&WindowSpec> {
        self.windows.iter().find(|w| w.window_id() == window_id)
    }

    pub fn has_window_id(&self, window_id: &Term) -> bool {
        self.window(window_id).is_some()
    }

    pub fn set_output_stream(&mut self, stream: Term, operator: OutputOperator) {
        self.output_stream = Some(stream);
        self.operator = operator;
    }

    /// Sets the operator keyword of the result form without naming a stream.
    pub fn set_output_operator(&mut self, operator: OutputOperator) {
        self.operator = operator;
    }

    /// `None` unless a `REGISTER` stream is declared.
    pub fn output_stream(&self) -> Option<OutputStreamDecl> {
        self.output_stream
            .as_ref()
            .map(|s| OutputStreamDecl::new(s.clone(), self.operator))
    }

    pub fn output_operator(&self) -> OutputOperator {
        self.operator
    }

    /// Every variable of the query: body, window scalars and output stream.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut vars = self.body.pattern_variables();
        vars.extend(self.body.projection_tokens_variables());
        let scalar_vars = self
            .windows
            .iter()
            .flat_map(|w| w.terms())
            .chain(self.output_stream.as_ref())
            .filter_map(Term::as_variable)
            .map(|v| v.as_str().to_string());
        vars.extend(scalar_vars);
        vars
    }

    /// Deep copy through the native text form.
    pub fn clone_via_roundtrip(&self) -> Result<ExtendedQuery> {
        let text = crate::dialect::rspql::to_native_string(self)?;
        Ok(crate::parser::parse_query(&text)?)
    }
}

impl PartialEq for ExtendedQuery {
    fn eq(&self, other: &Self) -> bool {
        let mut mine: Vec<&WindowSpec> = self.windows.iter().collect();
        let mut theirs: Vec<&WindowSpec> = other.windows.iter().collect();
        mine.sort();
        theirs.sort();
        self.prologue == other.prologue
            && self.body == other.body
            && mine == theirs
            && self.output_stream == other.output_stream
            && self.operator == other.operator
    }
}

impl Eq for ExtendedQuery {}

#[cfg(test)]
mod tests {
    use super::*;

    fn select_all() -> ExtendedQuery {
        let body = QueryBody::new(
            ResultForm::Select {
                modifier: None,
                projection: vec![Token::Punct("*".into())],
            },
            GroupPattern::default(),
        );
        ExtendedQuery::new(Prologue::default(), body)
    }

    fn logical(window: &str, stream: &str) -> WindowSpec {
        WindowSpec::logical(
            Term::iri(window).unwrap(),
            Term::iri(stream).unwrap(),
            Term::duration("PT10S").unwrap(),
            None,
        )
    }

    #[test]
    fn test_duplicate_window_id_is_rejected_regardless_of_kind() {
        let mut query = select_all();
        query.add_window(logical("http://w1", "http://s1")).unwrap();
        let physical = WindowSpec::physical(
            Term::iri("http://w1").unwrap(),
            Term::iri("http://s2").unwrap(),
            Term::integer(3),
            None,
        );
        assert_eq!(
            query.add_window(physical),
            Err(ConstructionError::DuplicateWindowId("<http://w1>".into()))
        );
        assert_eq!(query.windows(None).len(), 1);
    }

    #[test]
    fn test_window_lookup_and_kind_filter() {
        let mut query = select_all();
        query.add_window(logical("http://w1", "http://s1")).unwrap();
        query
            .add_window(WindowSpec::physical(
                Term::iri("http://w2").unwrap(),
                Term::iri("http://s1").unwrap(),
                Term::integer(3),
                None,
            ))
            .unwrap();
        assert!(query.has_window_id(&Term::iri("http://w2").unwrap()));
        assert!(!query.has_window_id(&Term::iri("http://s1").unwrap()));
        assert_eq!(query.windows(Some(WindowKind::Physical)).len(), 1);
        assert_eq!(query.windows(Some(WindowKind::LogicalPast)).len(), 0);
    }

    #[test]
    fn test_output_stream() {
        let mut query = select_all();
        assert_eq!(query.output_stream(), None);
        query.set_output_operator(OutputOperator::Istream);
        assert_eq!(query.output_stream(), None);
        query.set_output_stream(Term::iri("http://out").unwrap(), OutputOperator::Rstream);
        let decl = query.output_stream().unwrap();
        assert_eq!(decl.operator, OutputOperator::Rstream);
    }

    #[test]
    fn test_equality_ignores_window_order() {
        let mut a = select_all();
        let mut b = select_all();
        a.add_window(logical("http://w1", "http://s1")).unwrap();
        a.add_window(logical("http://w2", "http://s2")).unwrap();
        b.add_window(logical("http://w2", "http://s2")).unwrap();
        b.add_window(logical("http://w1", "http://s1")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_projected_variables() {
        let body = QueryBody::new(
            ResultForm::Select {
                modifier: None,
                projection: vec![
                    Token::Var("a".into()),
                    Token::Punct("(".into()),
                    Token::Word("COUNT".into()),
                    Token::Punct("(".into()),
                    Token::Var("b".into()),
                    Token::Punct(")".into()),
                    Token::Word("AS".into()),
                    Token::Var("c".into()),
                    Token::Punct(")".into()),
                ],
            },
            GroupPattern::default(),
        );
        let projected: Vec<String> = body.projected_variables().into_iter().collect();
        assert_eq!(projected, vec!["a", "c"]);
    }
}
