use serde::{Deserialize, Serialize};
use std::fmt;

/// Program identifier (one function-level benchmark program).
pub type ProgramId = String;

/// Source language name, taken from the corpus directory layout (e.g. "c", "java", "python").
pub type Language = String;

/// A location in a source file. Immutable once annotated.
///
/// Ordering is (file, line, symbol) so that any collection of points sorts the
/// same way on every run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProgramPoint {
    pub file: String,
    pub line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

impl ProgramPoint {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
            symbol: None,
        }
    }

    pub fn with_symbol(file: impl Into<String>, line: u32, symbol: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            symbol: Some(symbol.into()),
        }
    }
}

impl fmt::Display for ProgramPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.symbol {
            Some(sym) => write!(f, "{}:L{}({})", self.file, self.line, sym),
            None => write!(f, "{}:L{}", self.file, self.line),
        }
    }
}
