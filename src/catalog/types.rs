use serde::Serialize;
use utoipa::ToSchema;

use crate::elements::FormatError;

/// A three-line group that was skipped during a load.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupError {
    /// 1-based index of the group within the loaded text.
    pub group: usize,
    /// 1-based line number of the group's name line.
    pub line: usize,
    pub error: FormatError,
}

/// Outcome of a catalog load: how many records went in, and what was skipped.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub added: usize,
    /// Subset of `added` that overwrote an existing name.
    pub replaced: usize,
    pub errors: Vec<GroupError>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoadSummary {
    pub added: usize,
    pub replaced: usize,
    pub skipped: usize,
    pub total: usize,
    pub errors: Vec<String>,
}

impl LoadReport {
    pub fn summary(&self, total: usize) -> LoadSummary {
        LoadSummary {
            added: self.added,
            replaced: self.replaced,
            skipped: self.errors.len(),
            total,
            errors: self
                .errors
                .iter()
                .map(|e| format!("group {} (line {}): {}", e.group, e.line, e.error))
                .collect(),
        }
    }
}
