//! Error types for corpus loading.

/// Load-time corpus errors. All variants are fatal: a corpus that fails
/// validation is rejected before any scoring begins, so a bad fixture cannot
/// silently drop coverage for one program while passing others.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("annotation format error in {file}: {reason}")]
    AnnotationFormat { file: String, reason: String },

    #[error("scan mismatch for program {program_id}: {reason}")]
    ScanMismatch { program_id: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CorpusError {
    pub fn format(file: impl Into<String>, reason: impl Into<String>) -> Self {
        CorpusError::AnnotationFormat {
            file: file.into(),
            reason: reason.into(),
        }
    }

    pub fn mismatch(program_id: impl Into<String>, reason: impl Into<String>) -> Self {
        CorpusError::ScanMismatch {
            program_id: program_id.into(),
            reason: reason.into(),
        }
    }
}

pub type CorpusResult<T> = Result<T, CorpusError>;
