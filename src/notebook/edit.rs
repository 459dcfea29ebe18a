use super::document::{Cell, Notebook, NotebookError};

#[derive(Debug, Clone, PartialEq)]
pub enum CellEdit {
    InsertAfter(Cell),
    /// Not idempotent: applying it twice prepends the block twice.
    Prepend(Vec<String>),
    Replace(Vec<String>),
}

impl Notebook {
    /// Applies `edit` relative to the cell at `index` and returns the index of
    /// the cell that was inserted or rewritten.
    pub fn apply_edit(&mut self, index: usize, edit: CellEdit) -> Result<usize, NotebookError> {
        let len = self.cells.len();
        if index >= len {
            return Err(NotebookError::IndexOutOfRange { index, len });
        }

        match edit {
            CellEdit::InsertAfter(new_cell) => {
                self.cells.insert(index + 1, new_cell);
                Ok(index + 1)
            }
            CellEdit::Prepend(mut lines) => {
                let cell = &mut self.cells[index];
                lines.append(&mut cell.source);
                cell.source = lines;
                Ok(index)
            }
            CellEdit::Replace(lines) => {
                self.cells[index].source = lines;
                Ok(index)
            }
        }
    }
}
