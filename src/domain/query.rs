use crate::domain::edge::DepKind;
use crate::domain::point::{Language, ProgramId, ProgramPoint};
use crate::domain::store::{AnnotationStore, ProgramAnnotation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Query mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// Enumerate every dependency source of a target point.
    Source,
    /// Classify a specific source/target pair, with a justification chain.
    Trace,
}

impl QueryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::Source => "source",
            QueryMode::Trace => "trace",
        }
    }

    pub fn parse(s: &str) -> Option<QueryMode> {
        match s.to_ascii_lowercase().as_str() {
            "source" => Some(QueryMode::Source),
            "trace" => Some(QueryMode::Trace),
            _ => None,
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gold answer, shaped by the query mode.
#[derive(Debug, Clone, PartialEq)]
pub enum GoldAnswer {
    /// All sources with an edge of the query's kind into the target.
    Sources(BTreeSet<ProgramPoint>),
    /// Whether the candidate pair is dependency-related, plus the annotated
    /// justification chain when one was recorded.
    Trace {
        dependent: bool,
        chain: Option<Vec<ProgramPoint>>,
    },
}

/// One evaluation unit. Gold is computed from the store's edge set at build
/// time; points are small value types, so the query owns clones and the store
/// stays the sole owner of the corpus.
#[derive(Debug, Clone)]
pub struct QueryInstance {
    pub task: DepKind,
    pub mode: QueryMode,
    pub language: Language,
    pub program_id: ProgramId,
    pub target: ProgramPoint,
    /// Trace mode only.
    pub candidate_source: Option<ProgramPoint>,
    pub gold: GoldAnswer,
}

impl QueryInstance {
    /// Stable identifier matching the prompt-corpus convention:
    /// `<task>_<program>_<target-line>[_<source-line>]`.
    pub fn instance_id(&self) -> String {
        match &self.candidate_source {
            Some(src) => format!(
                "{}_{}_{}_{}",
                self.task, self.program_id, self.target.line, src.line
            ),
            None => format!("{}_{}_{}", self.task, self.program_id, self.target.line),
        }
    }
}

/// Parse an instance identifier back into (program id, target line). The
/// program id itself may contain underscores, so the numeric segments are
/// taken from the tail: one for source mode, two for trace mode (the last
/// being the candidate-source line).
pub fn parse_instance_id(id: &str, task: DepKind) -> Option<(ProgramId, u32)> {
    let rest = id.strip_prefix(task.as_str())?.strip_prefix('_')?;
    let segments: Vec<&str> = rest.split('_').collect();
    let numeric_tail = segments
        .iter()
        .rev()
        .take_while(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .count()
        .min(2);
    if numeric_tail == 0 || segments.len() <= numeric_tail {
        return None;
    }
    let target_idx = segments.len() - numeric_tail;
    let program_id = segments[..target_idx].join("_");
    let target_line: u32 = segments[target_idx].parse().ok()?;
    Some((program_id, target_line))
}

/// Subset filter ("Lite"): restricts query generation to a named set of
/// (program, target line) pairs. Entries the store does not know are simply
/// never generated - filters are allowed to be supersets of the corpus.
#[derive(Debug, Clone, Default)]
pub struct SubsetFilter {
    entries: BTreeSet<(ProgramId, u32)>,
}

impl SubsetFilter {
    pub fn insert(&mut self, program_id: impl Into<ProgramId>, target_line: u32) {
        self.entries.insert((program_id.into(), target_line));
    }

    pub fn allows(&self, program_id: &str, target: &ProgramPoint) -> bool {
        self.entries
            .contains(&(program_id.to_string(), target.line))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build every query instance for (task, language, mode) over the store.
///
/// Deterministic and restartable: programs are visited in id order, targets in
/// point order, trace candidates in point order, so two runs over the same
/// store enumerate instances identically. That is what makes named subsets and
/// parallel sharding reproducible.
pub fn build_queries<'a>(
    store: &'a AnnotationStore,
    task: DepKind,
    language: &'a str,
    mode: QueryMode,
    filter: Option<&'a SubsetFilter>,
) -> impl Iterator<Item = QueryInstance> + 'a {
    store
        .programs()
        .filter(move |(_, ann)| ann.language == language)
        .flat_map(move |(id, ann)| program_queries(id, ann, task, mode, filter))
}

fn program_queries(
    program_id: &ProgramId,
    ann: &ProgramAnnotation,
    task: DepKind,
    mode: QueryMode,
    filter: Option<&SubsetFilter>,
) -> Vec<QueryInstance> {
    let graph = ann.edges_for(task);
    let mut queries = Vec::new();

    for target in eligible_targets(ann, task) {
        if let Some(f) = filter {
            if !f.allows(program_id, &target) {
                continue;
            }
        }
        let gold_sources = graph
            .map(|g| g.sources_of(&target))
            .unwrap_or_default();

        match mode {
            QueryMode::Source => {
                queries.push(QueryInstance {
                    task,
                    mode,
                    language: ann.language.clone(),
                    program_id: program_id.clone(),
                    target,
                    candidate_source: None,
                    gold: GoldAnswer::Sources(gold_sources),
                });
            }
            QueryMode::Trace => {
                // Positive pair per annotated source, negative pair per
                // preceding candidate statement that is not one.
                for source in &gold_sources {
                    let chain = graph
                        .and_then(|g| g.edge(source, &target))
                        .and_then(|label| label.chain.clone());
                    queries.push(QueryInstance {
                        task,
                        mode,
                        language: ann.language.clone(),
                        program_id: program_id.clone(),
                        target: target.clone(),
                        candidate_source: Some(source.clone()),
                        gold: GoldAnswer::Trace {
                            dependent: true,
                            chain,
                        },
                    });
                }
                for candidate in ann.scan.candidates_before(target.line) {
                    if gold_sources.contains(&candidate) || candidate == target {
                        continue;
                    }
                    queries.push(QueryInstance {
                        task,
                        mode,
                        language: ann.language.clone(),
                        program_id: program_id.clone(),
                        target: target.clone(),
                        candidate_source: Some(candidate),
                        gold: GoldAnswer::Trace {
                            dependent: false,
                            chain: None,
                        },
                    });
                }
            }
        }
    }

    queries
}

/// Eligible targets for a task: the scanner's candidate sites of the matching
/// role plus every annotated edge target, minus degenerate cases.
fn eligible_targets(ann: &ProgramAnnotation, task: DepKind) -> BTreeSet<ProgramPoint> {
    let scan = &ann.scan;
    let candidate_sites = match task {
        DepKind::Data | DepKind::Infoflow => &scan.uses,
        DepKind::Control => &scan.statements,
    };

    let mut targets: BTreeSet<ProgramPoint> =
        candidate_sites.iter().map(|sp| scan.point(sp)).collect();
    if let Some(graph) = ann.edges_for(task) {
        targets.extend(graph.targets());
    }
    targets.retain(|t| !scan.is_degenerate_target(task, t));
    targets
}
