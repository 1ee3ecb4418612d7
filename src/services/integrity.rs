use serde::Serialize;

use crate::database::models::{DatasetFile, FileStatus};

/// Per-dataset summary returned with detail and processing responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Integrity {
    pub files_total: usize,
    pub files_processed: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Integrity {
    pub fn summarize(files: &[DatasetFile]) -> Self {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for file in files {
            if file.status == FileStatus::Error {
                errors.push(format!("File '{}' failed processing", file.filename));
            }
            if file.size_bytes == 0 {
                warnings.push(format!("File '{}' is empty", file.filename));
            }
        }

        Self {
            files_total: files.len(),
            files_processed: files.iter().filter(|f| f.status == FileStatus::Processed).count(),
            errors,
            warnings,
        }
    }
}
