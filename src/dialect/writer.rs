//! Indented text output shared by all projectors.

use crate::prefixes::PrefixMapping;
use crate::query::token::{self, Token};
use crate::query::{DatasetClause, ExtendedQuery, GroupPattern, PatternPart, Prologue, ResultForm};
use crate::term::Term;

const INDENT: &str = "  ";

/// Header printed in front of a `WINDOW` block, or `None` to keep the
/// inner pattern as a plain group. Projectors resolve window names up front.
pub type WindowBlock<'a> = dyn Fn(&Term) -> Option<String> + 'a;

#[derive(Debug, Default)]
pub struct QueryWriter {
    out: String,
    line: String,
    indent: usize,
}

impl QueryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `text` to the current line, one space after what is there.
    pub fn word(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if !self.line.is_empty() {
            self.line.push(' ');
        }
        self.line.push_str(text);
    }

    pub fn newline(&mut self) {
        if self.line.is_empty() {
            return;
        }
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
        self.out.push_str(&self.line);
        self.out.push('\n');
        self.line.clear();
    }

    pub fn blank_line(&mut self) {
        self.newline();
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    pub fn line(&mut self, text: &str) {
        self.newline();
        self.word(text);
        self.newline();
    }

    pub fn finish(mut self) -> String {
        self.newline();
        self.out
    }

    pub fn prologue(&mut self, prologue: &Prologue) {
        if let Some(base) = &prologue.base {
            self.line(&format!("BASE <{base}>"));
        }
        for (prefix, ns) in prologue.prefixes.iter() {
            self.line(&format!("PREFIX {prefix}: <{ns}>"));
        }
        if !prologue.is_empty() {
            self.blank_line();
        }
    }

    /// Verbatim tokens, breaking the line after each `.`.
    pub fn tokens(&mut self, tokens: &[Token]) {
        for chunk in tokens.split_inclusive(|t| t.is_punct(".")) {
            self.word(&token::join(chunk));
            if chunk.last().is_some_and(|t| t.is_punct(".")) {
                self.newline();
            }
        }
    }

    pub fn group(&mut self, group: &GroupPattern, window_block: &WindowBlock<'_>) {
        self.word("{");
        self.newline();
        self.indent += 1;
        for part in &group.parts {
            match part {
                PatternPart::Tokens(tokens) => self.tokens(tokens),
                PatternPart::Group(inner) => self.group(inner, window_block),
                PatternPart::Window { name, pattern } => {
                    self.newline();
                    if let Some(header) = window_block(name) {
                        self.word(&header);
                    }
                    self.group(pattern, window_block);
                    self.newline();
                }
            }
        }
        self.newline();
        self.indent -= 1;
        self.word("}");
    }
}

/// How a projector renders the parts of a query around the base body.
pub struct BodyLayout<'a> {
    /// Operator keyword after `SELECT` / `CONSTRUCT`.
    pub operator: Option<&'a str>,
    /// Window or stream clauses, one per line, after the dataset clauses.
    pub stream_clauses: Vec<String>,
    pub window_block: &'a WindowBlock<'a>,
}

/// Result form, dataset, stream clauses, WHERE clause and solution modifiers.
pub fn write_body(w: &mut QueryWriter, query: &ExtendedQuery, layout: &BodyLayout<'_>) {
    let body = query.body();
    match &body.form {
        ResultForm::Select {
            modifier,
            projection,
        } => {
            w.word("SELECT");
            w.word(layout.operator.unwrap_or_default());
            if let Some(m) = modifier {
                w.word(&m.to_string());
            }
            w.word(&token::join(projection));
        }
        ResultForm::Construct { template } => {
            w.word("CONSTRUCT");
            w.word(layout.operator.unwrap_or_default());
            if let Some(template) = template {
                w.word("{");
                w.newline();
                w.indent += 1;
                w.tokens(template);
                w.newline();
                w.indent -= 1;
                w.word("}");
            }
        }
        ResultForm::Ask => w.word("ASK"),
        ResultForm::Describe { targets } => {
            w.word("DESCRIBE");
            w.word(&token::join(targets));
        }
    }
    w.newline();

    for clause in &body.dataset {
        match clause {
            DatasetClause::Default(g) => w.line(&format!("FROM {g}")),
            DatasetClause::Named(g) => w.line(&format!("FROM NAMED {g}")),
        }
    }
    for clause in &layout.stream_clauses {
        w.line(clause);
    }
    if let Some(pattern) = &body.pattern {
        w.word("WHERE");
        w.group(pattern, layout.window_block);
        w.newline();
    }
    if !body.modifiers.is_empty() {
        w.tokens(&body.modifiers);
        w.newline();
    }
}

/// The base query as plain SPARQL: window and register clauses removed,
/// `WINDOW` blocks turned into `GRAPH` blocks.
pub fn plain_sparql(query: &ExtendedQuery) -> String {
    let prefixes = &query.prologue().prefixes;
    let graph = |name: &Term| Some(format!("GRAPH {}", name.to_sparql(Some(prefixes))));
    let layout = BodyLayout {
        operator: None,
        stream_clauses: Vec::new(),
        window_block: &graph,
    };
    let mut w = QueryWriter::new();
    w.prologue(query.prologue());
    write_body(&mut w, query, &layout);
    w.finish()
}

/// IRI text for dialects that print stream IRIs in full.
pub fn full_iri(term: &Term) -> String {
    term.to_sparql(None)
}

pub fn compact(term: &Term, prefixes: &PrefixMapping) -> String {
    term.to_sparql(Some(prefixes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::RspqlParser;

    #[test]
    fn test_plain_sparql_rewrites_window_blocks() {
        let query = RspqlParser::new()
            .without_base_validation()
            .parse(
                "PREFIX ex: <http://ex.org/>
                 REGISTER STREAM ex:out AS
                 SELECT ISTREAM ?s
                 FROM NAMED WINDOW ex:w ON ex:s [RANGE PT10S]
                 WHERE { ?a ?b ?c . WINDOW ex:w { ?s ?p ?o } } LIMIT 5",
            )
            .unwrap();
        let text = plain_sparql(&query);
        assert_eq!(
            text,
            "PREFIX ex: <http://ex.org/>\n\nSELECT ?s\nWHERE {\n  ?a ?b ?c .\n  GRAPH ex:w {\n    ?s ?p ?o\n  }\n}\nLIMIT 5\n"
        );
    }

    #[test]
    fn test_nested_groups_share_a_line_with_keywords() {
        let query = RspqlParser::new()
            .without_base_validation()
            .parse("SELECT * WHERE { ?s ?p ?o OPTIONAL { ?o ?q ?r } }")
            .unwrap();
        assert_eq!(
            plain_sparql(&query),
            "SELECT *\nWHERE {\n  ?s ?p ?o OPTIONAL {\n    ?o ?q ?r\n  }\n}\n"
        );
    }
}
