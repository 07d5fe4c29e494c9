use crate::domain::edge::DepKind;
use crate::domain::graph::DependencyGraph;
use crate::domain::point::{Language, ProgramId};
use crate::domain::scan::ScanRecord;
use std::collections::BTreeMap;

/// Ground-truth annotations and scan metadata for one program.
#[derive(Debug)]
pub struct ProgramAnnotation {
    pub language: Language,
    pub scan: ScanRecord,
    pub edges: BTreeMap<DepKind, DependencyGraph>,
}

impl ProgramAnnotation {
    pub fn edges_for(&self, kind: DepKind) -> Option<&DependencyGraph> {
        self.edges.get(&kind)
    }
}

/// Immutable, corpus-lifetime store of dependency annotations.
///
/// Loaded once (see `adapters::corpus::loader`) and read-only thereafter, so
/// any number of scoring workers may share it by reference without locking.
#[derive(Debug)]
pub struct AnnotationStore {
    programs: BTreeMap<ProgramId, ProgramAnnotation>,
}

impl AnnotationStore {
    pub fn new(programs: BTreeMap<ProgramId, ProgramAnnotation>) -> Self {
        Self { programs }
    }

    /// Programs in id order. The ordering is what makes query enumeration
    /// reproducible across runs.
    pub fn programs(&self) -> impl Iterator<Item = (&ProgramId, &ProgramAnnotation)> {
        self.programs.iter()
    }

    pub fn get(&self, program_id: &str) -> Option<&ProgramAnnotation> {
        self.programs.get(program_id)
    }

    pub fn edges_for(&self, program_id: &str, kind: DepKind) -> Option<&DependencyGraph> {
        self.get(program_id)?.edges_for(kind)
    }

    pub fn scan_for(&self, program_id: &str) -> Option<&ScanRecord> {
        self.get(program_id).map(|p| &p.scan)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}
