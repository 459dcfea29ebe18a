use serde::{Deserialize, Deserializer, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Markdown,
    Code,
    Raw,
}

/// One notebook cell. Everything besides the kind and the source lines is kept
/// verbatim in `extra` so it round-trips untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub cell_type: CellKind,
    #[serde(deserialize_with = "deserialize_source")]
    pub source: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Cell {
    pub fn markdown(source: Vec<String>) -> Self {
        let mut extra = Map::new();
        extra.insert("metadata".to_string(), Value::Object(Map::new()));
        Self {
            cell_type: CellKind::Markdown,
            source,
            extra,
        }
    }

    pub fn code(source: Vec<String>) -> Self {
        let mut extra = Map::new();
        extra.insert("execution_count".to_string(), Value::Null);
        extra.insert("metadata".to_string(), Value::Object(Map::new()));
        extra.insert("outputs".to_string(), Value::Array(Vec::new()));
        Self {
            cell_type: CellKind::Code,
            source,
            extra,
        }
    }

    pub fn is_code(&self) -> bool {
        self.cell_type == CellKind::Code
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    pub cells: Vec<Cell>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Notebook {
    pub fn load(path: &Path) -> Result<Self, NotebookError> {
        let text = fs::read_to_string(path).map_err(|err| NotebookError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

        serde_json::from_str(&text).map_err(|err| NotebookError::Parse {
            origin: path.display().to_string(),
            message: err.to_string(),
        })
    }

    pub fn from_json(text: &str) -> Result<Self, NotebookError> {
        serde_json::from_str(text).map_err(|err| NotebookError::Parse {
            origin: "<input>".to_string(),
            message: err.to_string(),
        })
    }

    /// Serializes the way Jupyter writes notebooks to disk: one-space indent,
    /// sorted keys, literal unicode, trailing newline.
    pub fn to_json_string(&self) -> Result<String, NotebookError> {
        let mut value =
            serde_json::to_value(self).map_err(|err| NotebookError::Serialize(err.to_string()))?;
        // Key order otherwise depends on whether serde_json's preserve_order
        // feature is switched on somewhere in the dependency graph.
        value.sort_all_objects();

        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b" "));
        value
            .serialize(&mut serializer)
            .map_err(|err| NotebookError::Serialize(err.to_string()))?;

        let mut text =
            String::from_utf8(buf).map_err(|err| NotebookError::Serialize(err.to_string()))?;
        text.push('\n');
        Ok(text)
    }

    pub fn save(&self, path: &Path) -> Result<(), NotebookError> {
        let text = self.to_json_string()?;
        fs::write(path, text).map_err(|err| NotebookError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotebookError {
    Io { path: PathBuf, message: String },
    Parse { origin: String, message: String },
    Serialize(String),
    MarkerNotFound { marker: String },
    IndexOutOfRange { index: usize, len: usize },
}

impl Display for NotebookError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, message } => {
                write!(f, "unable to access notebook {}: {message}", path.display())
            }
            Self::Parse { origin, message } => {
                write!(f, "malformed notebook {origin}: {message}")
            }
            Self::Serialize(msg) => write!(f, "unable to serialize notebook: {msg}"),
            Self::MarkerNotFound { marker } => {
                write!(f, "no code cell contains marker {marker:?}")
            }
            Self::IndexOutOfRange { index, len } => {
                write!(f, "cell index {index} out of range for notebook with {len} cells")
            }
        }
    }
}

impl Error for NotebookError {}

/// Splits text into lines, each keeping its trailing newline.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(ToOwned::to_owned).collect()
}

fn deserialize_source<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawSource {
        Text(String),
        Lines(Vec<String>),
    }

    Ok(match RawSource::deserialize(deserializer)? {
        RawSource::Text(text) => split_lines(&text),
        RawSource::Lines(lines) => lines,
    })
}
