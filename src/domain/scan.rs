use crate::domain::edge::DepKind;
use crate::domain::point::ProgramPoint;
use serde::{Deserialize, Serialize};

/// One candidate site listed by the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanPoint {
    pub line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

/// Structural metadata for one scanned program: candidate statements, variable
/// definition/use sites, and branch points. Read-only input produced by an
/// external scanner; the core only queries it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub file: String,
    pub function_name: String,
    pub function_start_line: u32,
    pub function_end_line: u32,
    #[serde(default)]
    pub statements: Vec<ScanPoint>,
    #[serde(default)]
    pub definitions: Vec<ScanPoint>,
    #[serde(default)]
    pub uses: Vec<ScanPoint>,
    #[serde(default)]
    pub branches: Vec<ScanPoint>,
}

impl ScanRecord {
    pub fn contains_line(&self, line: u32) -> bool {
        line >= self.function_start_line && line <= self.function_end_line
    }

    fn lists(&self) -> [&[ScanPoint]; 4] {
        [&self.statements, &self.definitions, &self.uses, &self.branches]
    }

    /// Canonicalize a line reference against the scan metadata. A line the
    /// scanner never listed does not resolve - predictions naming it are kept
    /// as unresolved rather than silently accepted.
    pub fn resolve(&self, line: u32) -> Option<ProgramPoint> {
        for list in self.lists() {
            if let Some(sp) = list.iter().find(|sp| sp.line == line) {
                return Some(self.point(sp));
            }
        }
        None
    }

    pub fn point(&self, sp: &ScanPoint) -> ProgramPoint {
        match &sp.symbol {
            Some(sym) => ProgramPoint::with_symbol(self.file.clone(), sp.line, sym.clone()),
            None => ProgramPoint::new(self.file.clone(), sp.line),
        }
    }

    /// Candidate statements strictly before `target_line`, used to enumerate
    /// trace-mode negative pairs.
    pub fn candidates_before(&self, target_line: u32) -> Vec<ProgramPoint> {
        let mut points: Vec<ProgramPoint> = self
            .statements
            .iter()
            .filter(|sp| sp.line < target_line)
            .map(|sp| self.point(sp))
            .collect();
        points.sort();
        points.dedup();
        points
    }

    /// Degenerate targets carry no real question and are excluded from query
    /// generation: points outside the scanned span, data/infoflow targets in a
    /// function with fewer than two definition sites (no alternative source to
    /// pick from), control targets in a function with no branch point.
    pub fn is_degenerate_target(&self, kind: DepKind, target: &ProgramPoint) -> bool {
        if !self.contains_line(target.line) {
            return true;
        }
        match kind {
            DepKind::Data | DepKind::Infoflow => self.definitions.len() < 2,
            DepKind::Control => self.branches.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp(line: u32) -> ScanPoint {
        ScanPoint { line, symbol: None }
    }

    fn record() -> ScanRecord {
        ScanRecord {
            file: "main.c".into(),
            function_name: "f".into(),
            function_start_line: 10,
            function_end_line: 40,
            statements: vec![sp(12), sp(15), sp(20)],
            definitions: vec![
                ScanPoint {
                    line: 12,
                    symbol: Some("x".into()),
                },
                sp(15),
            ],
            uses: vec![sp(20)],
            branches: vec![sp(14)],
        }
    }

    #[test]
    fn test_resolve_prefers_statement_entry() {
        let r = record();
        assert_eq!(r.resolve(20), Some(ProgramPoint::new("main.c", 20)));
        // 12 appears both as a statement and as a definition with a symbol;
        // the statement entry wins.
        assert_eq!(r.resolve(12), Some(ProgramPoint::new("main.c", 12)));
        assert_eq!(r.resolve(99), None);
        // 14 is only a branch point, still resolvable
        assert_eq!(r.resolve(14), Some(ProgramPoint::new("main.c", 14)));
    }

    #[test]
    fn test_candidates_before() {
        let r = record();
        let before = r.candidates_before(20);
        assert_eq!(
            before,
            vec![
                ProgramPoint::new("main.c", 12),
                ProgramPoint::new("main.c", 15)
            ]
        );
    }

    #[test]
    fn test_degenerate_targets() {
        let r = record();
        let inside = ProgramPoint::new("main.c", 20);
        let outside = ProgramPoint::new("main.c", 99);

        assert!(!r.is_degenerate_target(DepKind::Data, &inside));
        assert!(r.is_degenerate_target(DepKind::Data, &outside));

        let mut no_branches = record();
        no_branches.branches.clear();
        assert!(no_branches.is_degenerate_target(DepKind::Control, &inside));

        let mut single_def = record();
        single_def.definitions.truncate(1);
        assert!(single_def.is_degenerate_target(DepKind::Infoflow, &inside));
    }
}
