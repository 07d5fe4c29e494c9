use crate::domain::edge::DepKind;
use crate::domain::point::{Language, ProgramId, ProgramPoint};
use crate::domain::prediction::{Extraction, SourcePrediction, StructuredPrediction, TracePrediction};
use crate::domain::query::{GoldAnswer, QueryInstance, QueryMode};
use serde::{Deserialize, Serialize};

/// Set-retrieval metrics for one source-mode instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceMetrics {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    /// Predicted points absent from the scan metadata; already counted in
    /// `false_positives`, broken out for reporting.
    pub unresolved: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Classification metrics for one trace-mode instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceMetrics {
    pub correct: bool,
    /// Chain agreement, present only when gold and prediction are both
    /// positive and a gold chain is recorded. A right answer for the wrong
    /// reason is a materially different failure mode, so this is never
    /// blended into `correct`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_exact: Option<bool>,
}

/// Mode-specific per-instance metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstanceMetrics {
    Source(SourceMetrics),
    Trace(TraceMetrics),
}

/// Per-instance score record. Never mutated after construction; the
/// aggregator consumes a stream of these.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub instance_id: String,
    pub task: DepKind,
    pub language: Language,
    pub mode: QueryMode,
    pub program_id: ProgramId,
    pub target: ProgramPoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_source: Option<ProgramPoint>,
    pub extraction_failed: bool,
    pub metrics: InstanceMetrics,
}

/// Score a structured prediction against the query's gold answer.
///
/// Pure and stateless: identical inputs yield identical results, and disjoint
/// result sets may be scored concurrently.
pub fn score(query: &QueryInstance, extraction: &Extraction) -> EvaluationResult {
    let (extraction_failed, metrics) = match (&query.gold, extraction) {
        (GoldAnswer::Sources(gold), Extraction::Prediction(StructuredPrediction::Sources(pred))) => {
            (false, InstanceMetrics::Source(score_sources(gold, pred)))
        }
        (
            GoldAnswer::Trace { dependent, chain },
            Extraction::Prediction(StructuredPrediction::Trace(pred)),
        ) => (
            false,
            InstanceMetrics::Trace(score_trace(*dependent, chain.as_deref(), pred)),
        ),
        (_, Extraction::Failure(_)) => (true, no_credit(query)),
        // A prediction of the wrong shape carries no usable answer.
        (_, Extraction::Prediction(_)) => (true, no_credit(query)),
    };

    EvaluationResult {
        instance_id: query.instance_id(),
        task: query.task,
        language: query.language.clone(),
        mode: query.mode,
        program_id: query.program_id.clone(),
        target: query.target.clone(),
        candidate_source: query.candidate_source.clone(),
        extraction_failed,
        metrics,
    }
}

fn score_sources(
    gold: &std::collections::BTreeSet<ProgramPoint>,
    pred: &SourcePrediction,
) -> SourceMetrics {
    let tp = gold.intersection(&pred.points).count();
    let fp = pred.points.difference(gold).count() + pred.unresolved.len();
    let fn_count = gold.difference(&pred.points).count();

    // Zero denominators resolve to 1.0: nothing predicted means nothing
    // imprecise, nothing to recall means full recall. The only all-1.0
    // outcome without true positives is the vacuous empty/empty match.
    let precision = if tp + fp == 0 {
        1.0
    } else {
        tp as f64 / (tp + fp) as f64
    };
    let recall = if tp + fn_count == 0 {
        1.0
    } else {
        tp as f64 / (tp + fn_count) as f64
    };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    SourceMetrics {
        true_positives: tp,
        false_positives: fp,
        false_negatives: fn_count,
        unresolved: pred.unresolved.len(),
        precision,
        recall,
        f1,
    }
}

fn score_trace(
    gold_dependent: bool,
    gold_chain: Option<&[ProgramPoint]>,
    pred: &TracePrediction,
) -> TraceMetrics {
    let correct = pred.dependent == gold_dependent;
    let chain_exact = match (gold_dependent && pred.dependent, gold_chain) {
        (true, Some(chain)) => {
            Some(pred.chain_unresolved.is_empty() && pred.chain == chain)
        }
        _ => None,
    };
    TraceMetrics {
        correct,
        chain_exact,
    }
}

/// No-credit baseline for the query's mode, used when extraction failed.
fn no_credit(query: &QueryInstance) -> InstanceMetrics {
    match &query.gold {
        GoldAnswer::Sources(gold) => InstanceMetrics::Source(SourceMetrics {
            true_positives: 0,
            false_positives: 0,
            false_negatives: gold.len(),
            unresolved: 0,
            precision: 0.0,
            recall: 0.0,
            f1: 0.0,
        }),
        GoldAnswer::Trace { .. } => InstanceMetrics::Trace(TraceMetrics {
            correct: false,
            chain_exact: None,
        }),
    }
}
