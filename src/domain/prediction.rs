use crate::domain::point::ProgramPoint;
use std::collections::BTreeSet;

/// Structured prediction extracted from a raw model response. Created fresh
/// per (query, response) pair and never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredPrediction {
    Sources(SourcePrediction),
    Trace(TracePrediction),
}

/// Source-mode prediction: the claimed set of dependency sources.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourcePrediction {
    /// Points that resolved against the query's scan record.
    pub points: BTreeSet<ProgramPoint>,
    /// Point-shaped tokens with no counterpart in the scan metadata. Kept so
    /// the scorer can penalize hallucinated points distinctly from missing
    /// ones.
    pub unresolved: Vec<String>,
}

/// Trace-mode prediction: a classification plus the claimed dependency chain.
#[derive(Debug, Clone, PartialEq)]
pub struct TracePrediction {
    pub dependent: bool,
    pub chain: Vec<ProgramPoint>,
    pub chain_unresolved: Vec<String>,
}

impl TracePrediction {
    pub fn classification(dependent: bool) -> Self {
        Self {
            dependent,
            chain: Vec::new(),
            chain_unresolved: Vec::new(),
        }
    }
}

/// A response with no recognizable answer. Recorded as a scored outcome,
/// never raised as an error - one unparseable reply must not interrupt the
/// batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionFailure {
    pub raw_text: String,
}

/// Outcome of response extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Prediction(StructuredPrediction),
    Failure(ExtractionFailure),
}

impl Extraction {
    pub fn failed(raw_text: impl Into<String>) -> Self {
        Extraction::Failure(ExtractionFailure {
            raw_text: raw_text.into(),
        })
    }
}
