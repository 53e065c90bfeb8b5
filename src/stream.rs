use std::fmt;

use crate::term::Term;
use crate::vocabulary::rsp;

/// How query results are turned into the output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputOperator {
    /// Insertions only.
    Istream,
    /// Deletions only.
    Dstream,
    /// The relative change since the previous evaluation.
    Rstream,
    #[default]
    Unspecified,
}

impl OutputOperator {
    /// Surface keyword, `None` for [`OutputOperator::Unspecified`].
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            OutputOperator::Istream => Some("ISTREAM"),
            OutputOperator::Dstream => Some("DSTREAM"),
            OutputOperator::Rstream => Some("RSTREAM"),
            OutputOperator::Unspecified => None,
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "ISTREAM" => Some(OutputOperator::Istream),
            "DSTREAM" => Some(OutputOperator::Dstream),
            "RSTREAM" => Some(OutputOperator::Rstream),
            _ => None,
        }
    }

    /// Operator resource of the canonical graph.
    pub fn iri(&self) -> Option<&'static str> {
        match self {
            OutputOperator::Istream => Some(rsp::ISTREAM),
            OutputOperator::Dstream => Some(rsp::DSTREAM),
            OutputOperator::Rstream => Some(rsp::RSTREAM),
            OutputOperator::Unspecified => None,
        }
    }

    pub fn from_iri(iri: &str) -> Option<Self> {
        [
            OutputOperator::Istream,
            OutputOperator::Dstream,
            OutputOperator::Rstream,
        ]
        .into_iter()
        .find(|op| op.iri() == Some(iri))
    }

    pub fn name(&self) -> &'static str {
        self.keyword().unwrap_or("unspecified")
    }
}

impl fmt::Display for OutputOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The `REGISTER ... AS` declaration of a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputStreamDecl {
    pub stream: Term,
    pub operator: OutputOperator,
}

impl OutputStreamDecl {
    pub fn new(stream: Term, operator: OutputOperator) -> Self {
        Self { stream, operator }
    }
}
