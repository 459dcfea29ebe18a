use crate::http::debug::RedactedMessage;
use anyhow::{Result, anyhow, bail};
use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const TRACE_DIR_NAME: &str = "nbfix/traces";
const KIND_WIDTH: usize = 9;

/// Something that happened during a run, written to the trace as one or more
/// lines sharing a timestamp and kind column.
#[derive(Debug, Clone, Copy)]
pub enum TraceEvent<'a> {
    NotebookLoaded { path: &'a Path, cells: usize },
    PatchResult(&'a str),
    NotebookSaved { path: &'a Path, cells: usize },
    UserTurn(&'a str),
    AssistantTurn(&'a str),
    HttpRequest(&'a RedactedMessage),
    HttpResponse(&'a RedactedMessage),
    HttpFailure(&'a str),
}

impl TraceEvent<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Self::NotebookLoaded { .. } => "nb.load",
            Self::PatchResult(_) => "nb.patch",
            Self::NotebookSaved { .. } => "nb.save",
            Self::UserTurn(_) => "chat.user",
            Self::AssistantTurn(_) => "chat.ai",
            Self::HttpRequest(_) => "http.req",
            Self::HttpResponse(_) => "http.res",
            Self::HttpFailure(_) => "http.err",
        }
    }

    fn lines(&self) -> Vec<String> {
        match self {
            Self::NotebookLoaded { path, cells } | Self::NotebookSaved { path, cells } => {
                vec![format!("{} ({cells} cells)", path.display())]
            }
            Self::PatchResult(text) | Self::HttpFailure(text) => vec![(*text).to_string()],
            Self::UserTurn(text) | Self::AssistantTurn(text) => text_lines(text),
            Self::HttpRequest(message) | Self::HttpResponse(message) => {
                let mut lines = vec![message.start_line.clone()];
                lines.extend(message.headers.iter().cloned());
                lines.extend(text_lines(&message.body));
                lines
            }
        }
    }
}

fn text_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return vec!["<empty>".to_string()];
    }
    text.lines().map(ToOwned::to_owned).collect()
}

/// Per-run log file under the XDG state dir, readable by the owner only.
#[derive(Clone)]
pub struct SessionTrace {
    inner: Arc<TraceInner>,
}

struct TraceInner {
    writer: Mutex<BufWriter<File>>,
    file_path: PathBuf,
    warned: AtomicBool,
}

impl SessionTrace {
    /// Opens the trace for this run. If that is not possible the run goes on
    /// untraced after a single warning.
    pub fn open_or_warn(session_id: &str) -> Option<Self> {
        match resolve_trace_dir_from_env().and_then(|dir| Self::open_in(&dir, session_id)) {
            Ok(trace) => Some(trace),
            Err(err) => {
                eprintln!("nbfix trace warning: {err}; continuing without a trace");
                None
            }
        }
    }

    pub fn open_in(trace_dir: &Path, session_id: &str) -> Result<Self> {
        fs::create_dir_all(trace_dir).map_err(|err| {
            anyhow!(
                "Failed to create trace directory {}: {err}",
                trace_dir.display()
            )
        })?;

        let file_path = trace_dir.join(format!("nbfix-{session_id}.log"));
        let file = create_trace_file(&file_path)
            .map_err(|err| anyhow!("Failed to create trace file {}: {err}", file_path.display()))?;

        Ok(Self {
            inner: Arc::new(TraceInner {
                writer: Mutex::new(BufWriter::new(file)),
                file_path,
                warned: AtomicBool::new(false),
            }),
        })
    }

    pub fn file_path(&self) -> &Path {
        &self.inner.file_path
    }

    pub fn record(&self, event: TraceEvent<'_>) {
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown-time".to_string());
        let kind = event.kind();
        let entry: String = event
            .lines()
            .into_iter()
            .map(|line| format!("[{timestamp}] [{kind:<width$}] {line}\n", width = KIND_WIDTH))
            .collect();
        self.append(&entry);
    }

    fn append(&self, entry: &str) {
        let Ok(mut writer) = self.inner.writer.lock() else {
            self.warn_once("trace writer lock poisoned");
            return;
        };

        if writer.write_all(entry.as_bytes()).is_err() || writer.flush().is_err() {
            self.warn_once("failed to write to trace file");
        }
    }

    fn warn_once(&self, message: &str) {
        if !self.inner.warned.swap(true, Ordering::Relaxed) {
            eprintln!(
                "nbfix trace warning: {message} ({})",
                self.inner.file_path.display()
            );
        }
    }
}

#[cfg(unix)]
fn create_trace_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_trace_file(path: &Path) -> std::io::Result<File> {
    File::create(path)
}

fn resolve_trace_dir_from_env() -> Result<PathBuf> {
    let xdg_state = env::var("XDG_STATE_HOME").ok();
    let home = dirs::home_dir();
    resolve_trace_dir(xdg_state.as_deref(), home.as_deref())
}

fn resolve_trace_dir(xdg_state_home: Option<&str>, home_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(xdg) = xdg_state_home {
        let trimmed = xdg.trim();
        if trimmed.is_empty() {
            bail!("Failed to resolve trace path: XDG_STATE_HOME is set but empty");
        }
        return Ok(PathBuf::from(trimmed).join(TRACE_DIR_NAME));
    }

    let home = home_dir
        .ok_or_else(|| anyhow!("Failed to resolve trace path: HOME directory is unavailable"))?;
    Ok(home.join(".local/state").join(TRACE_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::{SessionTrace, TraceEvent, resolve_trace_dir};
    use crate::http::debug::RedactedMessage;
    use std::fs;
    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::tempdir;

    fn read(trace: &SessionTrace) -> String {
        fs::read_to_string(trace.file_path()).expect("read trace")
    }

    #[test]
    fn resolve_trace_dir_prefers_xdg_state() {
        let dir = resolve_trace_dir(Some("/tmp/state"), Some(Path::new("/home/fallback")))
            .expect("trace path");
        assert_eq!(dir, Path::new("/tmp/state/nbfix/traces"));

        let dir = resolve_trace_dir(None, Some(Path::new("/home/alice"))).expect("trace path");
        assert_eq!(dir, Path::new("/home/alice/.local/state/nbfix/traces"));
    }

    #[test]
    fn resolve_trace_dir_rejects_blank_xdg_state_and_missing_home() {
        let err = resolve_trace_dir(Some("   "), Some(Path::new("/home/alice")))
            .expect_err("blank xdg state should fail");
        assert!(err.to_string().contains("XDG_STATE_HOME is set but empty"));

        let err = resolve_trace_dir(None, None).expect_err("missing home should fail");
        assert!(err.to_string().contains("HOME directory is unavailable"));
    }

    #[test]
    fn open_in_fails_when_directory_is_a_file() {
        let dir = tempdir().expect("tempdir");
        let blocker = dir.path().join("state");
        fs::write(&blocker, "not a dir").expect("write blocker");

        let err = SessionTrace::open_in(&blocker.join("traces"), "abc")
            .err()
            .expect("file in the way");
        assert!(err.to_string().contains("Failed to create trace directory"));
    }

    #[test]
    fn notebook_events_use_rfc3339_timestamp_and_padded_kind() {
        let dir = tempdir().expect("tempdir");
        let trace = SessionTrace::open_in(dir.path(), "abc").expect("trace");
        trace.record(TraceEvent::NotebookLoaded {
            path: Path::new("lab.ipynb"),
            cells: 3,
        });
        trace.record(TraceEvent::PatchResult("Fixed cell 2"));

        let content = read(&trace);
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines[0].starts_with("[20"));
        assert!(lines[0].ends_with("Z] [nb.load  ] lab.ipynb (3 cells)"));
        assert!(lines[1].ends_with("[nb.patch ] Fixed cell 2"));
    }

    #[test]
    fn chat_turns_are_logged_line_by_line() {
        let dir = tempdir().expect("tempdir");
        let trace = SessionTrace::open_in(dir.path(), "chat").expect("trace");
        trace.record(TraceEvent::UserTurn("first\nsecond"));
        trace.record(TraceEvent::AssistantTurn(""));

        let content = read(&trace);
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("[chat.user] first"));
        assert!(lines[1].ends_with("[chat.user] second"));
        assert!(lines[2].ends_with("[chat.ai  ] <empty>"));
    }

    #[test]
    fn http_events_write_start_line_headers_and_body() {
        let dir = tempdir().expect("tempdir");
        let trace = SessionTrace::open_in(dir.path(), "http").expect("trace");
        let message = RedactedMessage {
            start_line: "HTTP 200".to_string(),
            headers: vec!["content-type: application/json".to_string()],
            body: "{\"ok\":true}".to_string(),
        };
        trace.record(TraceEvent::HttpResponse(&message));

        let content = read(&trace);
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("[http.res ] HTTP 200"));
        assert!(lines[1].ends_with("[http.res ] content-type: application/json"));
        assert!(lines[2].ends_with("[http.res ] {\"ok\":true}"));
    }

    #[cfg(unix)]
    #[test]
    fn trace_file_permissions_are_owner_only() {
        let dir = tempdir().expect("tempdir");
        let trace = SessionTrace::open_in(dir.path(), "abc").expect("trace");
        let mode = fs::metadata(trace.file_path())
            .expect("metadata")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o600);
    }
}
