//! On-disk corpus encoding.
//!
//! The corpus root holds one directory per source language, each containing
//! `labels.json` (ground-truth dependency edges per program) and `scan.json`
//! (structural scan results). Both files are JSON maps keyed by entry id.
//! Label and scan entries describe the same function-level programs and are
//! matched by (file, function name, line span) at load time.

use crate::domain::edge::DepKind;
use serde::Deserialize;
use std::collections::BTreeMap;

pub const LABELS_FILE: &str = "labels.json";
pub const SCAN_FILE: &str = "scan.json";

/// `labels.json`: program id -> label entry.
pub type LabelFile = BTreeMap<String, LabelEntry>;

/// `scan.json`: scan entry id -> scan entry.
pub type ScanFile = BTreeMap<String, ScanEntry>;

#[derive(Debug, Deserialize)]
pub struct LabelEntry {
    pub filepath: String,
    pub function_name: String,
    pub function_start_line: u32,
    pub function_end_line: u32,
    #[serde(default)]
    pub edges: BTreeMap<DepKind, Vec<RawEdge>>,
}

#[derive(Debug, Deserialize)]
pub struct RawEdge {
    pub source: RawPoint,
    pub target: RawPoint,
    #[serde(default)]
    pub chain: Option<Vec<RawPoint>>,
    #[serde(default)]
    pub trivial: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPoint {
    pub line: u32,
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScanEntry {
    pub filepath: String,
    pub function_name: String,
    pub function_start_line: u32,
    pub function_end_line: u32,
    #[serde(default)]
    pub statements: Vec<RawPoint>,
    #[serde(default)]
    pub definitions: Vec<RawPoint>,
    #[serde(default)]
    pub uses: Vec<RawPoint>,
    #[serde(default)]
    pub branches: Vec<RawPoint>,
}

/// Lite subset file: task -> language -> instance ids.
pub type LiteFile = BTreeMap<String, BTreeMap<String, Vec<String>>>;
