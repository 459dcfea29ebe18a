use super::debug::{HttpDebugConfig, RedactedMessage};
use crate::trace::{SessionTrace, TraceEvent};
use reqwest::Client;
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};
#[cfg(test)]
use std::sync::{Arc, Mutex};

/// JSON-over-HTTPS client for the chat API. Every exchange can be mirrored,
/// redacted, to stderr (`--verbose`) and to the session trace.
#[derive(Clone)]
pub struct HttpClient {
    inner: Client,
    debug: HttpDebugConfig,
    sink: DebugSink,
    trace: Option<SessionTrace>,
}

#[derive(Clone)]
enum DebugSink {
    Stderr,
    #[cfg(test)]
    Buffer(Arc<Mutex<Vec<String>>>),
}

impl DebugSink {
    fn write_lines(&self, lines: Vec<String>) {
        match self {
            Self::Stderr => {
                let mut stderr = io::stderr().lock();
                for line in lines {
                    let _ = writeln!(stderr, "{line}");
                }
            }
            #[cfg(test)]
            Self::Buffer(buffer) => {
                if let Ok(mut buffer) = buffer.lock() {
                    buffer.extend(lines);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Request,
    Response,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("debug", &self.debug)
            .field("traced", &self.trace.is_some())
            .finish()
    }
}

impl HttpClient {
    pub fn new(inner: Client, debug: HttpDebugConfig) -> Self {
        Self {
            inner,
            debug,
            sink: DebugSink::Stderr,
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: Option<SessionTrace>) -> Self {
        self.trace = trace;
        self
    }

    /// POSTs `payload` as JSON with bearer auth. Non-2xx statuses are returned
    /// as data, only transport failures are errors.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        bearer_token: &str,
        payload: &T,
    ) -> Result<HttpResponseData, reqwest::Error> {
        let request = self
            .inner
            .post(url)
            .bearer_auth(bearer_token)
            .json(payload)
            .build()?;
        if self.is_observed() {
            let body = request
                .body()
                .and_then(reqwest::Body::as_bytes)
                .map(String::from_utf8_lossy)
                .unwrap_or_default();
            self.observe(Direction::Request, &RedactedMessage::request(&request, &body));
        }

        let response = self
            .inner
            .execute(request)
            .await
            .inspect_err(|err| self.observe_failure(err))?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .inspect_err(|err| self.observe_failure(err))?;

        if self.is_observed() {
            self.observe(
                Direction::Response,
                &RedactedMessage::response(status, &headers, &body),
            );
        }
        Ok(HttpResponseData { status, body })
    }

    fn is_observed(&self) -> bool {
        self.debug.enabled || self.trace.is_some()
    }

    fn observe(&self, direction: Direction, message: &RedactedMessage) {
        if self.debug.enabled {
            let arrow = match direction {
                Direction::Request => '>',
                Direction::Response => '<',
            };
            self.sink
                .write_lines(message.debug_lines(arrow, self.debug.max_body_chars));
        }
        if let Some(trace) = &self.trace {
            trace.record(match direction {
                Direction::Request => TraceEvent::HttpRequest(message),
                Direction::Response => TraceEvent::HttpResponse(message),
            });
        }
    }

    fn observe_failure(&self, err: &reqwest::Error) {
        if self.debug.enabled {
            self.sink
                .write_lines(vec![format!("[http-debug] ! {err}")]);
        }
        if let Some(trace) = &self.trace {
            trace.record(TraceEvent::HttpFailure(&err.to_string()));
        }
    }

    #[cfg(test)]
    pub fn with_buffer_sink(
        inner: Client,
        debug: HttpDebugConfig,
    ) -> (Self, Arc<Mutex<Vec<String>>>) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let client = Self {
            inner,
            debug,
            sink: DebugSink::Buffer(Arc::clone(&buffer)),
            trace: None,
        };
        (client, buffer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponseData {
    pub status: u16,
    pub body: String,
}
