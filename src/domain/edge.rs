use crate::domain::point::ProgramPoint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dependency kind. The three reasoning tasks share this taxonomy: a "data"
/// task queries data-dependency edges, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepKind {
    Data,
    Control,
    #[serde(alias = "information_flow", alias = "info_flow", alias = "info-flow")]
    Infoflow,
}

impl DepKind {
    pub const ALL: [DepKind; 3] = [DepKind::Data, DepKind::Control, DepKind::Infoflow];

    pub fn as_str(&self) -> &'static str {
        match self {
            DepKind::Data => "data",
            DepKind::Control => "control",
            DepKind::Infoflow => "infoflow",
        }
    }

    /// Case-insensitive parse, accepting the aliases used in task identifiers.
    pub fn parse(s: &str) -> Option<DepKind> {
        match s.to_ascii_lowercase().as_str() {
            "data" => Some(DepKind::Data),
            "control" => Some(DepKind::Control),
            "infoflow" | "info_flow" | "info-flow" | "information_flow" => Some(DepKind::Infoflow),
            _ => None,
        }
    }
}

impl fmt::Display for DepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed dependency relation between two program points. The kind is
/// implicit: edges are stored per (program, kind) in the annotation store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub source: ProgramPoint,
    pub target: ProgramPoint,
    /// Order-sensitive justification chain, when the annotators recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<Vec<ProgramPoint>>,
    /// Self-edges are rejected at load time unless flagged trivial.
    #[serde(default)]
    pub trivial: bool,
}

impl DependencyEdge {
    pub fn new(source: ProgramPoint, target: ProgramPoint) -> Self {
        Self {
            source,
            target,
            chain: None,
            trivial: false,
        }
    }
}
