use std::cmp::Ordering;

use crate::term::Term;
use crate::vocabulary::rsp;

/// The three mutually exclusive kinds of window declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowKind {
    Logical,
    LogicalPast,
    Physical,
}

impl WindowKind {
    pub const ALL: [WindowKind; 3] = [
        WindowKind::Logical,
        WindowKind::LogicalPast,
        WindowKind::Physical,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WindowKind::Logical => "logical",
            WindowKind::LogicalPast => "logical past",
            WindowKind::Physical => "physical",
        }
    }

    /// `rdf:type` of the window node in the canonical graph.
    pub fn type_iri(&self) -> &'static str {
        match self {
            WindowKind::Logical => rsp::LOGICAL_WINDOW,
            WindowKind::LogicalPast => rsp::LOGICAL_PAST_WINDOW,
            WindowKind::Physical => rsp::PHYSICAL_WINDOW,
        }
    }

    pub fn from_type_iri(iri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.type_iri() == iri)
    }
}

// Representing a named window declared over a stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WindowSpec {
    /// Count based: the last `item_count` items, sliding every `step` items.
    Physical {
        window_id: Term,
        stream_id: Term,
        item_count: Term,
        step: Option<Term>,
    },
    /// Time based: the last `range`, sliding every `step`.
    Logical {
        window_id: Term,
        stream_id: Term,
        range: Term,
        step: Option<Term>,
    },
    /// Time based between `NOW-from` and `NOW-to`.
    LogicalPast {
        window_id: Term,
        stream_id: Term,
        from: Term,
        to: Term,
        step: Option<Term>,
    },
}

impl WindowSpec {
    pub fn physical(window_id: Term, stream_id: Term, item_count: Term, step: Option<Term>) -> Self {
        WindowSpec::Physical {
            window_id,
            stream_id,
            item_count,
            step,
        }
    }

    pub fn logical(window_id: Term, stream_id: Term, range: Term, step: Option<Term>) -> Self {
        WindowSpec::Logical {
            window_id,
            stream_id,
            range,
            step,
        }
    }

    pub fn logical_past(
        window_id: Term,
        stream_id: Term,
        from: Term,
        to: Term,
        step: Option<Term>,
    ) -> Self {
        WindowSpec::LogicalPast {
            window_id,
            stream_id,
            from,
            to,
            step,
        }
    }

    pub fn kind(&self) -> WindowKind {
        match self {
            WindowSpec::Physical { .. } => WindowKind::Physical,
            WindowSpec::Logical { .. } => WindowKind::Logical,
            WindowSpec::LogicalPast { .. } => WindowKind::LogicalPast,
        }
    }

    pub fn window_id(&self) -> &Term {
        match self {
            WindowSpec::Physical { window_id, .. }
            | WindowSpec::Logical { window_id, .. }
            | WindowSpec::LogicalPast { window_id, .. } => window_id,
        }
    }

    pub fn stream_id(&self) -> &Term {
        match self {
            WindowSpec::Physical { stream_id, .. }
            | WindowSpec::Logical { stream_id, .. }
            | WindowSpec::LogicalPast { stream_id, .. } => stream_id,
        }
    }

    pub fn step(&self) -> Option<&Term> {
        match self {
            WindowSpec::Physical { step, .. }
            | WindowSpec::Logical { step, .. }
            | WindowSpec::LogicalPast { step, .. } => step.as_ref(),
        }
    }

    /// Every term of the declaration, identifiers first.
    pub fn terms(&self) -> Vec<&Term> {
        let mut terms = vec![self.window_id(), self.stream_id()];
        match self {
            WindowSpec::Physical { item_count, .. } => terms.push(item_count),
            WindowSpec::Logical { range, .. } => terms.push(range),
            WindowSpec::LogicalPast { from, to, .. } => {
                terms.push(from);
                terms.push(to);
            }
        }
        terms.extend(self.step());
        terms
    }

    pub fn is_same_window(&self, other: &WindowSpec) -> bool {
        self.window_id() == other.window_id()
    }
}

impl PartialOrd for WindowSpec {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WindowSpec {
    fn cmp(&self, other: &Self) -> Ordering {
        self.window_id()
            .cmp(other.window_id())
            .then_with(|| self.stream_id().cmp(other.stream_id()))
            .then_with(|| self.kind().name().cmp(other.kind().name()))
            .then_with(|| self.terms().cmp(&other.terms()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iri(s: &str) -> Term {
        Term::iri(s).unwrap()
    }

    #[test]
    fn test_accessors() {
        let w = WindowSpec::logical_past(
            iri("http://w"),
            iri("http://s"),
            Term::duration("PT1H").unwrap(),
            Term::duration("PT30M").unwrap(),
            None,
        );
        assert_eq!(w.kind(), WindowKind::LogicalPast);
        assert_eq!(w.window_id(), &iri("http://w"));
        assert_eq!(w.stream_id(), &iri("http://s"));
        assert_eq!(w.step(), None);
        assert_eq!(w.terms().len(), 4);
    }

    #[test]
    fn test_ordering_is_by_window_then_stream_then_kind() {
        let a = WindowSpec::physical(iri("http://a"), iri("http://s2"), Term::integer(5), None);
        let b = WindowSpec::logical(
            iri("http://b"),
            iri("http://s1"),
            Term::duration("PT1S").unwrap(),
            None,
        );
        let a_logical = WindowSpec::logical(
            iri("http://a"),
            iri("http://s2"),
            Term::duration("PT1S").unwrap(),
            None,
        );
        let mut windows = vec![b.clone(), a.clone(), a_logical.clone()];
        windows.sort();
        assert_eq!(windows, vec![a_logical, a, b]);
    }

    #[test]
    fn test_kind_type_iris() {
        for kind in WindowKind::ALL {
            assert_eq!(WindowKind::from_type_iri(kind.type_iri()), Some(kind));
        }
        assert_eq!(WindowKind::from_type_iri("http://w3id.org/rsp/spin#Other"), None);
    }
}
