//! Model response records produced by the external request dispatcher.
//!
//! One JSONL record per query instance. Reading is lenient: a line that fails
//! to parse is skipped with a warning, since one corrupt record must not
//! invalidate the rest of the batch.

use crate::domain::edge::DepKind;
use crate::domain::point::{Language, ProgramId};
use crate::domain::query::QueryMode;
use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

/// One collected model response, keyed to its query instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub task: DepKind,
    pub language: Language,
    pub mode: QueryMode,
    pub program_id: ProgramId,
    pub target_line: u32,
    /// Trace mode only: the candidate source line of the queried pair.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_line: Option<u32>,
    /// Raw model text, unconstrained.
    pub response: String,
}

/// Read response records from a JSONL file.
pub fn read_jsonl(path: &Path) -> Result<Vec<ResponseRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read response file: {}", path.display()))?;

    let mut records = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ResponseRecord>(line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(
                file = %path.display(),
                line = idx + 1,
                error = %e,
                "skipping unparseable response record"
            ),
        }
    }
    Ok(records)
}

/// Read records from a single JSONL file or every `.jsonl` file in a
/// directory (sorted, so batches concatenate deterministically).
pub fn read_path(path: &Path) -> Result<Vec<ResponseRecord>> {
    if path.is_file() {
        return read_jsonl(path);
    }

    let mut files: Vec<_> = fs::read_dir(path)
        .with_context(|| format!("Failed to read response directory: {}", path.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "jsonl"))
        .collect();
    files.sort();

    let mut records = Vec::new();
    for file in files {
        records.extend(read_jsonl(&file)?);
    }
    Ok(records)
}
