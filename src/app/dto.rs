use crate::domain::edge::DepKind;
use crate::domain::point::Language;
use crate::domain::query::QueryMode;
use serde::Serialize;

/// Grouping key for aggregate reporting.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupKey {
    pub task: DepKind,
    pub language: Language,
    pub mode: QueryMode,
}

/// Aggregate metrics for one group. Inapplicable metrics and empty groups are
/// explicit nulls, never zeros - a zero would silently imply measured
/// performance where no instances exist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub instances: usize,
    pub extraction_failures: usize,
    pub extraction_failure_rate: Option<f64>,
    /// Macro-averaged over source-mode instances.
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1: Option<f64>,
    /// Classification accuracy over trace-mode instances.
    pub accuracy: Option<f64>,
    /// Chain-exact rate over correctly-classified positive pairs.
    pub chain_exact_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    #[serde(flatten)]
    pub key: GroupKey,
    #[serde(flatten)]
    pub summary: GroupSummary,
}

/// Summary report over a full evaluation run: per-(task, language, mode)
/// groups plus an overall row.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub groups: Vec<ReportRow>,
    pub overall: GroupSummary,
    /// Response records with no matching query instance.
    pub unmatched_responses: usize,
}

impl Report {
    /// Render as CSV for publication; empty cells stand for "no data".
    pub fn to_csv(&self) -> String {
        let mut out = String::from(
            "task,language,mode,instances,extraction_failures,extraction_failure_rate,precision,recall,f1,accuracy,chain_exact_rate\n",
        );
        for row in &self.groups {
            out.push_str(&format!(
                "{},{},{},{}\n",
                row.key.task,
                row.key.language,
                row.key.mode,
                summary_cells(&row.summary)
            ));
        }
        out.push_str(&format!("overall,all,all,{}\n", summary_cells(&self.overall)));
        out
    }
}

fn summary_cells(s: &GroupSummary) -> String {
    format!(
        "{},{},{},{},{},{},{},{}",
        s.instances,
        s.extraction_failures,
        cell(s.extraction_failure_rate),
        cell(s.precision),
        cell(s.recall),
        cell(s.f1),
        cell(s.accuracy),
        cell(s.chain_exact_rate)
    )
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_default()
}
