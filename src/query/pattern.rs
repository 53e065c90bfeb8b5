use std::collections::BTreeSet;

use crate::query::token::Token;
use crate::term::Term;

/// One element of a group graph pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternPart {
    /// Triples, filters, keywords and expressions, kept verbatim.
    Tokens(Vec<Token>),
    /// A nested `{ ... }` group (OPTIONAL, UNION, sub-select bodies and the like).
    Group(GroupPattern),
    /// `WINDOW <name> { ... }`
    Window { name: Term, pattern: GroupPattern },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupPattern {
    pub parts: Vec<PatternPart>,
}

impl GroupPattern {
    pub fn new(parts: Vec<PatternPart>) -> Self {
        Self { parts }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Names of every variable mentioned in the pattern, window names included.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut vars = BTreeSet::new();
        self.collect_variables(&mut vars);
        vars
    }

    fn collect_variables(&self, vars: &mut BTreeSet<String>) {
        for part in &self.parts {
            match part {
                PatternPart::Tokens(tokens) => {
                    vars.extend(tokens.iter().filter_map(Token::var_name).map(String::from));
                }
                PatternPart::Group(group) => group.collect_variables(vars),
                PatternPart::Window { name, pattern } => {
                    if let Some(v) = name.as_variable() {
                        vars.insert(v.as_str().to_string());
                    }
                    pattern.collect_variables(vars);
                }
            }
        }
    }

    /// Window names referenced by `WINDOW` blocks, in order of appearance.
    pub fn window_names(&self) -> Vec<&Term> {
        let mut names = Vec::new();
        self.collect_window_names(&mut names);
        names
    }

    fn collect_window_names<'a>(&'a self, names: &mut Vec<&'a Term>) {
        for part in &self.parts {
            match part {
                PatternPart::Tokens(_) => {}
                PatternPart::Group(group) => group.collect_window_names(names),
                PatternPart::Window { name, pattern } => {
                    names.push(name);
                    pattern.collect_window_names(names);
                }
            }
        }
    }

    /// `WINDOW` blocks with their patterns, in order of appearance.
    pub fn window_patterns(&self) -> Vec<(&Term, &GroupPattern)> {
        let mut blocks = Vec::new();
        self.collect_window_patterns(&mut blocks);
        blocks
    }

    fn collect_window_patterns<'a>(&'a self, blocks: &mut Vec<(&'a Term, &'a GroupPattern)>) {
        for part in &self.parts {
            match part {
                PatternPart::Tokens(_) => {}
                PatternPart::Group(group) => group.collect_window_patterns(blocks),
                PatternPart::Window { name, pattern } => {
                    blocks.push((name, pattern));
                    pattern.collect_window_patterns(blocks);
                }
            }
        }
    }

    /// Keywords that are not part of a basic triple pattern (`FILTER`,
    /// `OPTIONAL`, `BIND`, `SELECT`, ...), upper-cased, first occurrence only.
    pub fn non_triple_keywords(&self) -> Vec<String> {
        let mut keywords = Vec::new();
        self.collect_keywords(&mut keywords);
        keywords
    }

    fn collect_keywords(&self, keywords: &mut Vec<String>) {
        for part in &self.parts {
            match part {
                PatternPart::Tokens(tokens) => {
                    for token in tokens {
                        let Token::Word(word) = token else { continue };
                        if TRIPLE_WORDS.iter().any(|w| word.eq_ignore_ascii_case(w)) {
                            continue;
                        }
                        let word = word.to_ascii_uppercase();
                        if !keywords.contains(&word) {
                            keywords.push(word);
                        }
                    }
                }
                PatternPart::Group(group) => group.collect_keywords(keywords),
                PatternPart::Window { pattern, .. } => {
                    if !keywords.iter().any(|k| k == "WINDOW") {
                        keywords.push("WINDOW".to_string());
                    }
                    pattern.collect_keywords(keywords);
                }
            }
        }
    }

    /// Removes `GRAPH <g> { ... }` wrappers inside `WINDOW` blocks and
    /// inlines their triples. Returns the rewritten pattern with the
    /// `(window, graph)` pairs that were removed.
    pub fn without_window_graphs(&self) -> (GroupPattern, Vec<(Term, Token)>) {
        let mut removed = Vec::new();
        let pattern = self.strip_graphs(None, &mut removed);
        (pattern, removed)
    }

    fn strip_graphs(&self, window: Option<&Term>, removed: &mut Vec<(Term, Token)>) -> GroupPattern {
        let mut parts: Vec<PatternPart> = Vec::with_capacity(self.parts.len());
        for part in &self.parts {
            match part {
                PatternPart::Group(group) => {
                    let graph = window.and_then(|w| take_graph_header(&mut parts).map(|g| (w, g)));
                    let inner = group.strip_graphs(window, removed);
                    match graph {
                        Some((w, g)) => {
                            removed.push((w.clone(), g));
                            terminate(&mut parts);
                            parts.extend(inner.parts);
                            terminate(&mut parts);
                        }
                        None => parts.push(PatternPart::Group(inner)),
                    }
                }
                PatternPart::Window { name, pattern } => parts.push(PatternPart::Window {
                    name: name.clone(),
                    pattern: pattern.strip_graphs(Some(name), removed),
                }),
                PatternPart::Tokens(tokens) => parts.push(PatternPart::Tokens(tokens.clone())),
            }
        }
        GroupPattern { parts }
    }

    /// Applies `f` to every token, recursively.
    pub fn map_tokens(&self, f: &mut impl FnMut(&Token) -> Token) -> GroupPattern {
        let parts = self
            .parts
            .iter()
            .map(|part| match part {
                PatternPart::Tokens(tokens) => PatternPart::Tokens(tokens.iter().map(&mut *f).collect()),
                PatternPart::Group(group) => PatternPart::Group(group.map_tokens(f)),
                PatternPart::Window { name, pattern } => PatternPart::Window {
                    name: name.clone(),
                    pattern: pattern.map_tokens(f),
                },
            })
            .collect();
        GroupPattern { parts }
    }
}

/// Words that may appear inside a basic triple pattern.
const TRIPLE_WORDS: [&str; 3] = ["a", "true", "false"];

/// Pops a trailing `GRAPH <g>` off the last token run.
fn take_graph_header(parts: &mut Vec<PatternPart>) -> Option<Token> {
    let Some(PatternPart::Tokens(tokens)) = parts.last_mut() else {
        return None;
    };
    let [.., keyword, _] = tokens.as_slice() else {
        return None;
    };
    if !keyword.is_word("GRAPH") {
        return None;
    }
    let graph = tokens.pop()?;
    tokens.pop();
    if tokens.is_empty() {
        parts.pop();
    }
    Some(graph)
}

/// Ends a trailing token run with `.` so that inlined triples stay separate.
fn terminate(parts: &mut [PatternPart]) {
    if let Some(PatternPart::Tokens(tokens)) = parts.last_mut() {
        if tokens.last().is_some_and(|t| !t.is_punct(".")) {
            tokens.push(Token::Punct(".".into()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variables_and_window_names() {
        let pattern = GroupPattern::new(vec![
            PatternPart::Tokens(vec![Token::Var("a".into()), Token::Punct(".".into())]),
            PatternPart::Window {
                name: Term::variable("w").unwrap(),
                pattern: GroupPattern::new(vec![
                    PatternPart::Tokens(vec![Token::Var("b".into())]),
                    PatternPart::Group(GroupPattern::new(vec![PatternPart::Tokens(vec![
                        Token::Var("c".into()),
                    ])])),
                ]),
            },
        ]);
        let vars: Vec<String> = pattern.variables().into_iter().collect();
        assert_eq!(vars, vec!["a", "b", "c", "w"]);
        assert_eq!(pattern.window_names(), vec![&Term::variable("w").unwrap()]);
    }
}
