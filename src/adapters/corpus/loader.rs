//! Corpus loading: per-language label/scan files into an `AnnotationStore`.
//!
//! Loading is eager and total. Every entry is validated and cross-matched up
//! front; any malformed label or unmatched scan entry aborts the load, so a
//! bad fixture can never silently drop coverage for one program while the
//! rest of the run proceeds.

use crate::adapters::corpus::format::{
    LabelEntry, LabelFile, LiteFile, RawPoint, ScanEntry, ScanFile, LABELS_FILE, SCAN_FILE,
};
use crate::domain::edge::{DepKind, DependencyEdge};
use crate::domain::graph::DependencyGraph;
use crate::domain::point::ProgramPoint;
use crate::domain::query::{parse_instance_id, SubsetFilter};
use crate::domain::scan::{ScanPoint, ScanRecord};
use crate::domain::store::{AnnotationStore, ProgramAnnotation};
use crate::errors::{CorpusError, CorpusResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load and validate a corpus rooted at `corpus_root`.
pub fn load(corpus_root: &Path) -> CorpusResult<AnnotationStore> {
    let mut language_dirs: Vec<(String, std::path::PathBuf)> = Vec::new();
    for entry in fs::read_dir(corpus_root)? {
        let entry = entry?;
        if entry.path().is_dir() {
            language_dirs.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
        }
    }
    language_dirs.sort();

    if language_dirs.is_empty() {
        return Err(CorpusError::format(
            corpus_root.display().to_string(),
            "no language directories found",
        ));
    }

    let mut programs: BTreeMap<String, ProgramAnnotation> = BTreeMap::new();
    for (language, dir) in language_dirs {
        load_language(&language, &dir, &mut programs)?;
    }

    info!(programs = programs.len(), "corpus loaded");
    Ok(AnnotationStore::new(programs))
}

fn load_language(
    language: &str,
    dir: &Path,
    programs: &mut BTreeMap<String, ProgramAnnotation>,
) -> CorpusResult<()> {
    let labels_path = dir.join(LABELS_FILE);
    let scan_path = dir.join(SCAN_FILE);

    let labels: LabelFile = parse_json_file(&labels_path)?;
    let scans: ScanFile = parse_json_file(&scan_path)?;

    let mut matched_scan_ids: Vec<&String> = Vec::new();
    for (program_id, label) in &labels {
        if programs.contains_key(program_id) {
            return Err(CorpusError::format(
                labels_path.display().to_string(),
                format!("duplicate program id {program_id}"),
            ));
        }

        // Scan entries are keyed independently of program ids; match on
        // (file, function name, line span) the way the scanner reports them.
        let (scan_id, scan_entry) = scans
            .iter()
            .find(|(_, s)| scan_matches_label(s, label))
            .ok_or_else(|| {
                CorpusError::mismatch(
                    program_id.clone(),
                    format!(
                        "no scan entry for {} {} L{}-L{}",
                        label.filepath,
                        label.function_name,
                        label.function_start_line,
                        label.function_end_line
                    ),
                )
            })?;
        matched_scan_ids.push(scan_id);

        let file = file_name(&label.filepath);
        let scan = scan_record(&file, scan_entry);
        let edges = build_edge_graphs(&labels_path, program_id, &scan, label)?;

        programs.insert(
            program_id.clone(),
            ProgramAnnotation {
                language: language.to_string(),
                scan,
                edges,
            },
        );
    }

    // The reverse direction is an error too: scan metadata referencing a
    // program absent from the label set means the corpus halves disagree.
    for (scan_id, scan_entry) in &scans {
        if !matched_scan_ids.contains(&scan_id) {
            return Err(CorpusError::mismatch(
                scan_id.clone(),
                format!(
                    "scan entry {} ({}) has no label entry",
                    scan_id,
                    file_name(&scan_entry.filepath)
                ),
            ));
        }
    }

    info!(language, programs = labels.len(), "language loaded");
    Ok(())
}

fn build_edge_graphs(
    labels_path: &Path,
    program_id: &str,
    scan: &ScanRecord,
    label: &LabelEntry,
) -> CorpusResult<BTreeMap<DepKind, DependencyGraph>> {
    let mut edges: BTreeMap<DepKind, DependencyGraph> = BTreeMap::new();
    for (&kind, raw_edges) in &label.edges {
        let graph = edges.entry(kind).or_default();
        for raw in raw_edges {
            // Canonicalize every labeled point through the scan record, so
            // gold points and resolved predictions share one representation.
            let source = resolve_label_point(program_id, scan, &raw.source)?;
            let target = resolve_label_point(program_id, scan, &raw.target)?;
            if source == target && !raw.trivial {
                return Err(CorpusError::format(
                    labels_path.display().to_string(),
                    format!(
                        "{program_id}: self-edge at L{} not flagged trivial",
                        source.line
                    ),
                ));
            }
            let chain = raw
                .chain
                .as_ref()
                .map(|points| {
                    points
                        .iter()
                        .map(|rp| resolve_label_point(program_id, scan, rp))
                        .collect::<CorpusResult<Vec<_>>>()
                })
                .transpose()?;
            let inserted = graph.insert(DependencyEdge {
                source,
                target,
                chain,
                trivial: raw.trivial,
            });
            if !inserted {
                debug!(
                    source_line = raw.source.line,
                    target_line = raw.target.line,
                    %kind,
                    program_id,
                    "duplicate edge collapsed"
                );
            }
        }
    }
    Ok(edges)
}

fn resolve_label_point(
    program_id: &str,
    scan: &ScanRecord,
    raw: &RawPoint,
) -> CorpusResult<ProgramPoint> {
    scan.resolve(raw.line).ok_or_else(|| {
        CorpusError::mismatch(
            program_id,
            format!("label point L{} not present in scan metadata", raw.line),
        )
    })
}

fn scan_matches_label(scan: &ScanEntry, label: &LabelEntry) -> bool {
    file_name(&scan.filepath) == file_name(&label.filepath)
        && scan.function_name == label.function_name
        && scan.function_start_line == label.function_start_line
        && scan.function_end_line == label.function_end_line
}

fn scan_record(file: &str, entry: &ScanEntry) -> ScanRecord {
    ScanRecord {
        file: file.to_string(),
        function_name: entry.function_name.clone(),
        function_start_line: entry.function_start_line,
        function_end_line: entry.function_end_line,
        statements: scan_points(&entry.statements),
        definitions: scan_points(&entry.definitions),
        uses: scan_points(&entry.uses),
        branches: scan_points(&entry.branches),
    }
}

fn scan_points(raw: &[RawPoint]) -> Vec<ScanPoint> {
    raw.iter()
        .map(|rp| ScanPoint {
            line: rp.line,
            symbol: rp.symbol.clone(),
        })
        .collect()
}

/// Label and scan files may record paths rooted differently; entries are
/// compared and stored by file name only.
fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

fn parse_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> CorpusResult<T> {
    let content = fs::read_to_string(path).map_err(|e| {
        CorpusError::format(path.display().to_string(), format!("unreadable: {e}"))
    })?;
    serde_json::from_str(&content)
        .map_err(|e| CorpusError::format(path.display().to_string(), e.to_string()))
}

/// Parsed Lite subset file. Entries for tasks, languages, or programs the
/// store does not know are tolerated - subsets may be supersets.
pub struct LiteIndex {
    entries: LiteFile,
}

impl LiteIndex {
    pub fn load(path: &Path) -> CorpusResult<LiteIndex> {
        let content = fs::read_to_string(path)?;
        let entries: LiteFile = serde_json::from_str(&content)?;
        Ok(LiteIndex { entries })
    }

    /// The (program, target line) subset named for one (task, language).
    pub fn subset_for(&self, task: DepKind, language: &str) -> SubsetFilter {
        let mut filter = SubsetFilter::default();
        let Some(ids) = self
            .entries
            .get(task.as_str())
            .and_then(|by_lang| by_lang.get(language))
        else {
            return filter;
        };
        for id in ids {
            match parse_instance_id(id, task) {
                Some((program_id, target_line)) => filter.insert(program_id, target_line),
                None => warn!(%id, "unparseable lite instance id, skipped"),
            }
        }
        filter
    }
}
