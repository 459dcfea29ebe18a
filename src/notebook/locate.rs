use super::document::{Cell, Notebook, NotebookError};

impl Cell {
    pub fn joined_source(&self) -> String {
        self.source.concat()
    }

    pub fn source_starts_with(&self, lines: &[String]) -> bool {
        self.source.starts_with(lines)
    }
}

impl Notebook {
    /// Index of the first code cell whose joined source contains `marker`.
    pub fn find_code_cell(&self, marker: &str) -> Option<usize> {
        self.cells
            .iter()
            .position(|cell| cell.is_code() && cell.joined_source().contains(marker))
    }

    pub fn require_code_cell(&self, marker: &str) -> Result<usize, NotebookError> {
        self.find_code_cell(marker)
            .ok_or_else(|| NotebookError::MarkerNotFound {
                marker: marker.to_string(),
            })
    }
}
