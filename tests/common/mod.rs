//! Shared test utilities for integration tests.
//! This module is not compiled as a test binary — it is included by test files.
#![allow(dead_code)]

use dep_judge::domain::edge::{DepKind, DependencyEdge};
use dep_judge::domain::graph::DependencyGraph;
use dep_judge::domain::point::ProgramPoint;
use dep_judge::domain::scan::{ScanPoint, ScanRecord};
use dep_judge::domain::store::{AnnotationStore, ProgramAnnotation};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const P1_FILE: &str = "p1_main_1_30.c";

pub fn point(line: u32) -> ProgramPoint {
    ProgramPoint::new(P1_FILE, line)
}

/// Scan record for the fixture program `p1`:
/// statements on lines 2, 3, 5, 7, 9, 12, 20; definitions on 2, 3, 5;
/// uses on 9 and 20; a branch on 7.
pub fn p1_scan() -> ScanRecord {
    let sp = |line| ScanPoint { line, symbol: None };
    ScanRecord {
        file: P1_FILE.into(),
        function_name: "main".into(),
        function_start_line: 1,
        function_end_line: 30,
        statements: vec![sp(2), sp(3), sp(5), sp(7), sp(9), sp(12), sp(20)],
        definitions: vec![
            ScanPoint {
                line: 2,
                symbol: Some("x".into()),
            },
            ScanPoint {
                line: 3,
                symbol: Some("y".into()),
            },
            ScanPoint {
                line: 5,
                symbol: Some("x".into()),
            },
        ],
        uses: vec![sp(9), sp(20)],
        branches: vec![sp(7)],
    }
}

/// In-memory store holding `p1` (language "c") with:
/// data edges 3 -> 20 and 7 -> 20;
/// control edge 2 -> 9 with justification chain [2, 5, 9].
pub fn p1_store() -> AnnotationStore {
    let mut data = DependencyGraph::new();
    data.insert(DependencyEdge::new(point(3), point(20)));
    data.insert(DependencyEdge::new(point(7), point(20)));

    let mut control = DependencyGraph::new();
    control.insert(DependencyEdge {
        source: point(2),
        target: point(9),
        chain: Some(vec![point(2), point(5), point(9)]),
        trivial: false,
    });

    let mut edges = BTreeMap::new();
    edges.insert(DepKind::Data, data);
    edges.insert(DepKind::Control, control);

    let mut programs = BTreeMap::new();
    programs.insert(
        "p1".to_string(),
        ProgramAnnotation {
            language: "c".into(),
            scan: p1_scan(),
            edges,
        },
    );
    AnnotationStore::new(programs)
}

pub const P1_LABELS_JSON: &str = r#"{
  "p1": {
    "filepath": "/corpus/c/p1_main_1_30.c",
    "function_name": "main",
    "function_start_line": 1,
    "function_end_line": 30,
    "edges": {
      "data": [
        {"source": {"line": 3}, "target": {"line": 20}},
        {"source": {"line": 7}, "target": {"line": 20}}
      ],
      "control": [
        {"source": {"line": 2}, "target": {"line": 9},
         "chain": [{"line": 2}, {"line": 5}, {"line": 9}]}
      ]
    }
  }
}"#;

pub const P1_SCAN_JSON: &str = r#"{
  "17": {
    "filepath": "/scans/c/p1_main_1_30.c",
    "function_name": "main",
    "function_start_line": 1,
    "function_end_line": 30,
    "statements": [
      {"line": 2}, {"line": 3}, {"line": 5}, {"line": 7},
      {"line": 9}, {"line": 12}, {"line": 20}
    ],
    "definitions": [
      {"line": 2, "symbol": "x"}, {"line": 3, "symbol": "y"}, {"line": 5, "symbol": "x"}
    ],
    "uses": [{"line": 9}, {"line": 20}],
    "branches": [{"line": 7}]
  }
}"#;

/// Write the standard single-program corpus under `root/c/`.
pub fn write_p1_corpus(root: &Path) {
    write_language(root, "c", P1_LABELS_JSON, P1_SCAN_JSON);
}

pub fn write_language(root: &Path, language: &str, labels: &str, scan: &str) {
    let dir = root.join(language);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("labels.json"), labels).unwrap();
    fs::write(dir.join("scan.json"), scan).unwrap();
}
