mod document;
mod edit;
mod locate;
pub mod patches;

pub use document::{Cell, CellKind, Notebook, NotebookError, split_lines};
pub use edit::CellEdit;
pub use patches::{Patch, PatchOutcome};
