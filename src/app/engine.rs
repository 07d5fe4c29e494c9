use crate::adapters::corpus::loader::LiteIndex;
use crate::adapters::response::extractor::extract;
use crate::adapters::response::records::ResponseRecord;
use crate::app::aggregate::Aggregator;
use crate::app::dto::Report;
use crate::domain::edge::DepKind;
use crate::domain::point::{Language, ProgramId};
use crate::domain::query::{build_queries, QueryInstance, QueryMode};
use crate::domain::score::{score, EvaluationResult};
use crate::domain::store::AnnotationStore;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use tracing::{info, warn};

/// Joins a response record to its query instance.
type InstanceKey = (DepKind, Language, QueryMode, ProgramId, u32, Option<u32>);

/// Evaluation engine: builds query instances over the immutable store, joins
/// collected responses to them, extracts and scores in parallel, and reduces
/// partial tallies into a report.
pub struct EvalEngine {
    store: AnnotationStore,
}

/// Output of one evaluation run: the per-instance result stream plus its
/// aggregate report.
pub struct Evaluation {
    pub results: Vec<EvaluationResult>,
    pub report: Report,
}

impl EvalEngine {
    pub fn new(store: AnnotationStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    /// Score every response record against the corpus. Scoring is a pure
    /// function of (record, query, store), so records are processed with no
    /// ordering dependency; the result vector still follows record order.
    pub fn evaluate(&self, records: &[ResponseRecord], lite: Option<&LiteIndex>) -> Evaluation {
        let queries = self.query_index(records, lite);

        let outcomes: Vec<Option<EvaluationResult>> = records
            .par_iter()
            .map(|record| {
                let Some(query) = queries.get(&record_key(record)) else {
                    warn!(
                        task = %record.task,
                        program_id = %record.program_id,
                        target_line = record.target_line,
                        "response record matches no query instance"
                    );
                    return None;
                };
                let scan = self.store.scan_for(&record.program_id)?;
                let extraction = extract(&record.response, query, scan);
                Some(score(query, &extraction))
            })
            .collect();

        let unmatched = outcomes.iter().filter(|o| o.is_none()).count();
        let results: Vec<EvaluationResult> = outcomes.into_iter().flatten().collect();

        let mut aggregator = results
            .par_iter()
            .fold(Aggregator::default, |mut acc, result| {
                acc.observe(result);
                acc
            })
            .reduce(Aggregator::default, Aggregator::merge);
        aggregator.add_unmatched(unmatched);

        info!(
            scored = results.len(),
            unmatched,
            instances = queries.len(),
            "evaluation complete"
        );

        Evaluation {
            results,
            report: aggregator.finish(),
        }
    }

    /// Build the query index for every (task, language, mode) the record
    /// stream touches.
    fn query_index(
        &self,
        records: &[ResponseRecord],
        lite: Option<&LiteIndex>,
    ) -> HashMap<InstanceKey, QueryInstance> {
        let group_keys: BTreeSet<(DepKind, Language, QueryMode)> = records
            .iter()
            .map(|r| (r.task, r.language.clone(), r.mode))
            .collect();

        let mut queries = HashMap::new();
        for (task, language, mode) in group_keys {
            let subset = lite.map(|l| l.subset_for(task, &language));
            for query in build_queries(&self.store, task, &language, mode, subset.as_ref()) {
                queries.insert(query_key(&query), query);
            }
        }
        queries
    }
}

fn query_key(query: &QueryInstance) -> InstanceKey {
    (
        query.task,
        query.language.clone(),
        query.mode,
        query.program_id.clone(),
        query.target.line,
        query.candidate_source.as_ref().map(|p| p.line),
    )
}

fn record_key(record: &ResponseRecord) -> InstanceKey {
    (
        record.task,
        record.language.clone(),
        record.mode,
        record.program_id.clone(),
        record.target_line,
        record.source_line,
    )
}
