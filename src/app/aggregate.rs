//! Reduction of per-instance results into group tallies.
//!
//! Workers accumulate partial `GroupTally` values (counts and sums only, so
//! memory stays bounded) and a single reducer merges them. Merging is
//! associative and commutative, so the final report does not depend on worker
//! scheduling order.

use crate::app::dto::{GroupKey, GroupSummary, Report, ReportRow};
use crate::domain::score::{EvaluationResult, InstanceMetrics};
use std::collections::BTreeMap;

/// Partial per-group tally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupTally {
    pub instances: usize,
    pub extraction_failures: usize,
    pub source_instances: usize,
    pub sum_precision: f64,
    pub sum_recall: f64,
    pub sum_f1: f64,
    pub trace_instances: usize,
    pub trace_correct: usize,
    pub chain_checked: usize,
    pub chain_exact: usize,
}

impl GroupTally {
    pub fn observe(&mut self, result: &EvaluationResult) {
        self.instances += 1;
        if result.extraction_failed {
            self.extraction_failures += 1;
        }
        match result.metrics {
            InstanceMetrics::Source(m) => {
                self.source_instances += 1;
                self.sum_precision += m.precision;
                self.sum_recall += m.recall;
                self.sum_f1 += m.f1;
            }
            InstanceMetrics::Trace(m) => {
                self.trace_instances += 1;
                if m.correct {
                    self.trace_correct += 1;
                }
                if let Some(exact) = m.chain_exact {
                    self.chain_checked += 1;
                    if exact {
                        self.chain_exact += 1;
                    }
                }
            }
        }
    }

    pub fn merge(&mut self, other: &GroupTally) {
        self.instances += other.instances;
        self.extraction_failures += other.extraction_failures;
        self.source_instances += other.source_instances;
        self.sum_precision += other.sum_precision;
        self.sum_recall += other.sum_recall;
        self.sum_f1 += other.sum_f1;
        self.trace_instances += other.trace_instances;
        self.trace_correct += other.trace_correct;
        self.chain_checked += other.chain_checked;
        self.chain_exact += other.chain_exact;
    }

    /// Finalize ratios. Metrics whose denominator is zero come out as `None`:
    /// macro averages are meaningless for a group with no source instances,
    /// accuracy for one with no trace instances.
    pub fn summary(&self) -> GroupSummary {
        GroupSummary {
            instances: self.instances,
            extraction_failures: self.extraction_failures,
            extraction_failure_rate: ratio(self.extraction_failures, self.instances),
            precision: ratio_f(self.sum_precision, self.source_instances),
            recall: ratio_f(self.sum_recall, self.source_instances),
            f1: ratio_f(self.sum_f1, self.source_instances),
            accuracy: ratio(self.trace_correct, self.trace_instances),
            chain_exact_rate: ratio(self.chain_exact, self.chain_checked),
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}

fn ratio_f(sum: f64, denominator: usize) -> Option<f64> {
    (denominator > 0).then(|| sum / denominator as f64)
}

/// Accumulates results into per-group and overall tallies.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    groups: BTreeMap<GroupKey, GroupTally>,
    overall: GroupTally,
    unmatched_responses: usize,
}

impl Aggregator {
    pub fn observe(&mut self, result: &EvaluationResult) {
        let key = GroupKey {
            task: result.task,
            language: result.language.clone(),
            mode: result.mode,
        };
        self.groups.entry(key).or_default().observe(result);
        self.overall.observe(result);
    }

    pub fn add_unmatched(&mut self, count: usize) {
        self.unmatched_responses += count;
    }

    pub fn merge(mut self, other: Aggregator) -> Aggregator {
        for (key, tally) in other.groups {
            self.groups.entry(key).or_default().merge(&tally);
        }
        self.overall.merge(&other.overall);
        self.unmatched_responses += other.unmatched_responses;
        self
    }

    pub fn finish(self) -> Report {
        Report {
            groups: self
                .groups
                .into_iter()
                .map(|(key, tally)| ReportRow {
                    key,
                    summary: tally.summary(),
                })
                .collect(),
            overall: self.overall.summary(),
            unmatched_responses: self.unmatched_responses,
        }
    }
}

/// Aggregate a full result stream in one pass.
pub fn aggregate<'a, I>(results: I) -> Report
where
    I: IntoIterator<Item = &'a EvaluationResult>,
{
    let mut agg = Aggregator::default();
    for result in results {
        agg.observe(result);
    }
    agg.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::edge::DepKind;
    use crate::domain::point::ProgramPoint;
    use crate::domain::query::QueryMode;
    use crate::domain::score::{SourceMetrics, TraceMetrics};

    fn source_result(program: &str, f1: f64, failed: bool) -> EvaluationResult {
        EvaluationResult {
            instance_id: format!("data_{program}_10"),
            task: DepKind::Data,
            language: "c".into(),
            mode: QueryMode::Source,
            program_id: program.into(),
            target: ProgramPoint::new("a.c", 10),
            candidate_source: None,
            extraction_failed: failed,
            metrics: InstanceMetrics::Source(SourceMetrics {
                true_positives: 1,
                false_positives: 0,
                false_negatives: 0,
                unresolved: 0,
                precision: f1,
                recall: f1,
                f1,
            }),
        }
    }

    fn trace_result(program: &str, correct: bool, chain_exact: Option<bool>) -> EvaluationResult {
        EvaluationResult {
            instance_id: format!("control_{program}_10_2"),
            task: DepKind::Control,
            language: "java".into(),
            mode: QueryMode::Trace,
            program_id: program.into(),
            target: ProgramPoint::new("A.java", 10),
            candidate_source: Some(ProgramPoint::new("A.java", 2)),
            extraction_failed: false,
            metrics: InstanceMetrics::Trace(TraceMetrics {
                correct,
                chain_exact,
            }),
        }
    }

    #[test]
    fn test_macro_average_and_rates() {
        let results = vec![
            source_result("p1", 1.0, false),
            source_result("p2", 0.5, false),
            source_result("p3", 0.0, true),
            trace_result("p4", true, Some(true)),
            trace_result("p5", true, Some(false)),
            trace_result("p6", false, None),
        ];
        let report = aggregate(&results);

        assert_eq!(report.overall.instances, 6);
        assert_eq!(report.overall.extraction_failures, 1);
        assert_eq!(report.groups.len(), 2);

        let source_group = &report.groups[0];
        assert_eq!(source_group.key.task, DepKind::Data);
        assert_eq!(source_group.summary.f1, Some(0.5));
        assert_eq!(source_group.summary.accuracy, None);

        let trace_group = &report.groups[1];
        assert_eq!(trace_group.key.mode, QueryMode::Trace);
        assert_eq!(trace_group.summary.precision, None);
        assert!((trace_group.summary.accuracy.unwrap() - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(trace_group.summary.chain_exact_rate, Some(0.5));
    }

    #[test]
    fn test_empty_stream_reports_no_data() {
        let report = aggregate([]);
        assert_eq!(report.overall.instances, 0);
        assert_eq!(report.overall.extraction_failure_rate, None);
        assert_eq!(report.overall.precision, None);
        assert_eq!(report.overall.accuracy, None);
        assert!(report.groups.is_empty());
    }

    #[test]
    fn test_merge_is_partition_independent() {
        let results: Vec<EvaluationResult> = vec![
            source_result("p1", 1.0, false),
            source_result("p2", 0.25, true),
            trace_result("p3", true, Some(true)),
            trace_result("p4", false, None),
            source_result("p5", 0.75, false),
        ];

        let whole = aggregate(&results);

        for split in 0..=results.len() {
            let (left, right) = results.split_at(split);
            let mut a = Aggregator::default();
            left.iter().for_each(|r| a.observe(r));
            let mut b = Aggregator::default();
            right.iter().for_each(|r| b.observe(r));

            let merged = a.merge(b).finish();
            assert_eq!(merged.overall, whole.overall, "split at {split}");
            assert_eq!(merged.groups.len(), whole.groups.len());

            // commuted
            let mut a = Aggregator::default();
            left.iter().for_each(|r| a.observe(r));
            let mut b = Aggregator::default();
            right.iter().for_each(|r| b.observe(r));
            let commuted = b.merge(a).finish();
            assert_eq!(commuted.overall, whole.overall);
        }
    }
}
