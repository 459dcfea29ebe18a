use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Request, Url};
use serde_json::Value;

const REDACTION: &str = "***REDACTED***";
const SENSITIVE_KEYS: [&str; 11] = [
    "key",
    "api_key",
    "apikey",
    "openai_api_key",
    "token",
    "access_token",
    "authorization",
    "secret",
    "password",
    "x-api-key",
    "openai-organization",
];

/// Settings for the `--verbose` exchange log on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpDebugConfig {
    pub enabled: bool,
    pub max_body_chars: usize,
}

impl HttpDebugConfig {
    pub fn from_verbose(verbose: bool) -> Self {
        Self {
            enabled: verbose,
            max_body_chars: 4_000,
        }
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self::from_verbose(false)
    }
}

/// One side of an HTTP exchange with every secret already masked. The stderr
/// debug log and the session trace both render from this, so neither ever
/// sees the raw bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactedMessage {
    pub start_line: String,
    pub headers: Vec<String>,
    pub body: String,
}

impl RedactedMessage {
    pub fn request(request: &Request, body: &str) -> Self {
        Self {
            start_line: format!("{} {}", request.method(), redact_url(request.url())),
            headers: header_lines(request.headers()),
            body: redact_text_body(body),
        }
    }

    pub fn response(status: u16, headers: &HeaderMap, body: &str) -> Self {
        Self {
            start_line: format!("HTTP {status}"),
            headers: header_lines(headers),
            body: redact_text_body(body),
        }
    }

    /// `[http-debug]` lines, `direction` being `>` for requests and `<` for
    /// responses. The body is cut to `max_body_chars`.
    pub fn debug_lines(&self, direction: char, max_body_chars: usize) -> Vec<String> {
        let prefix = format!("[http-debug] {direction}");
        let mut lines = vec![format!("{prefix} {}", self.start_line)];
        lines.extend(self.headers.iter().map(|header| format!("{prefix} {header}")));
        lines.push(prefix.clone());

        let body = truncate_for_log(&self.body, max_body_chars);
        if body.is_empty() {
            lines.push(format!("{prefix} <empty body>"));
        } else {
            lines.extend(body.lines().map(|line| format!("{prefix} {line}")));
        }
        lines
    }
}

fn header_lines(headers: &HeaderMap) -> Vec<String> {
    headers
        .iter()
        .map(|(name, value)| {
            format!(
                "{}: {}",
                name.as_str(),
                redact_header_value(name.as_str(), value)
            )
        })
        .collect()
}

pub fn redact_url(url: &Url) -> String {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if is_sensitive_key(&k) {
                REDACTION.to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();
    if pairs.is_empty() {
        return url.as_str().to_string();
    }

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.as_str().to_string()
}

pub fn redact_header_value(name: &str, value: &HeaderValue) -> String {
    if is_sensitive_key(name) {
        return REDACTION.to_string();
    }
    value
        .to_str()
        .map(ToOwned::to_owned)
        .unwrap_or_else(|_| "<non-utf8>".to_string())
}

/// Masks sensitive keys anywhere in a JSON body. Non-JSON text is returned
/// unchanged.
pub fn redact_text_body(raw: &str) -> String {
    let Ok(mut json) = serde_json::from_str::<Value>(raw) else {
        return raw.to_string();
    };
    redact_json_value(&mut json);
    serde_json::to_string(&json).unwrap_or_else(|_| raw.to_string())
}

pub fn truncate_for_log(input: &str, max_chars: usize) -> String {
    let count = input.chars().count();
    if count <= max_chars {
        return input.to_string();
    }

    let truncated = input.chars().take(max_chars).collect::<String>();
    format!("{truncated}... <truncated {} chars>", count - max_chars)
}

fn redact_json_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, item) in map {
                if is_sensitive_key(key) {
                    *item = Value::String(REDACTION.to_string());
                } else {
                    redact_json_value(item);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_json_value),
        _ => {}
    }
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS
        .iter()
        .any(|sensitive| sensitive.eq_ignore_ascii_case(key))
}

#[cfg(test)]
mod tests {
    use super::{
        HttpDebugConfig, RedactedMessage, redact_header_value, redact_text_body, redact_url,
        truncate_for_log,
    };
    use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
    use reqwest::{Method, Request, Url};

    #[test]
    fn from_verbose_sets_body_limit() {
        let cfg = HttpDebugConfig::from_verbose(true);
        assert!(cfg.enabled);
        assert_eq!(cfg.max_body_chars, 4_000);
        assert!(!HttpDebugConfig::disabled().enabled);
    }

    #[test]
    fn redact_url_masks_sensitive_query_params() {
        let url = Url::parse("https://example.com/v1?api_key=super-secret&stream=false")
            .expect("url");
        let redacted = redact_url(&url);
        assert!(redacted.contains("stream=false"));
        assert!(!redacted.contains("super-secret"));
    }

    #[test]
    fn redact_url_leaves_plain_urls_alone() {
        let url = Url::parse("https://api.openai.com/v1/chat/completions").expect("url");
        assert_eq!(
            redact_url(&url),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn redact_header_value_masks_authorization_case_insensitively() {
        let value = HeaderValue::from_static("Bearer sk-secret");
        assert_eq!(redact_header_value("Authorization", &value), "***REDACTED***");
        let plain = HeaderValue::from_static("application/json");
        assert_eq!(redact_header_value("content-type", &plain), "application/json");
    }

    #[test]
    fn redact_text_body_masks_nested_json_keys_only() {
        let raw = r#"{"messages":[{"role":"user","content":"hi"}],"nested":{"openai_api_key":"123"}}"#;
        let redacted = redact_text_body(raw);
        assert!(redacted.contains("\"content\":\"hi\""));
        assert!(redacted.contains("\"openai_api_key\":\"***REDACTED***\""));
        assert!(!redacted.contains("123"));
    }

    #[test]
    fn redact_text_body_passes_through_non_json() {
        assert_eq!(redact_text_body("token=abc"), "token=abc");
    }

    #[test]
    fn truncate_for_log_appends_marker() {
        let out = truncate_for_log("abcdefghijklmnopqrstuvwxyz", 5);
        assert_eq!(out, "abcde... <truncated 21 chars>");
        assert_eq!(truncate_for_log("short", 5), "short");
    }

    #[test]
    fn request_message_hides_bearer_token() {
        let mut request = Request::new(
            Method::POST,
            Url::parse("https://api.example.com/v1/chat/completions").expect("valid url"),
        );
        request
            .headers_mut()
            .insert(AUTHORIZATION, HeaderValue::from_static("Bearer sk-secret"));

        let message = RedactedMessage::request(&request, r#"{"model":"gpt-4.1-mini","token":"abc"}"#);

        assert_eq!(
            message.start_line,
            "POST https://api.example.com/v1/chat/completions"
        );
        assert_eq!(message.headers, vec!["authorization: ***REDACTED***".to_string()]);
        insta::assert_snapshot!(message.debug_lines('>', 4_000).join("\n"), @r#"
        [http-debug] > POST https://api.example.com/v1/chat/completions
        [http-debug] > authorization: ***REDACTED***
        [http-debug] >
        [http-debug] > {"model":"gpt-4.1-mini","token":"***REDACTED***"}
        "#);
    }

    #[test]
    fn response_debug_lines_split_multiline_bodies() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        let message = RedactedMessage::response(500, &headers, "line one\nline two");
        insta::assert_snapshot!(message.debug_lines('<', 4_000).join("\n"), @r#"
        [http-debug] < HTTP 500
        [http-debug] < content-type: text/plain
        [http-debug] <
        [http-debug] < line one
        [http-debug] < line two
        "#);
    }

    #[test]
    fn response_debug_lines_mark_empty_body() {
        let message = RedactedMessage::response(204, &HeaderMap::new(), "");
        assert_eq!(
            message.debug_lines('<', 4_000),
            vec![
                "[http-debug] < HTTP 204".to_string(),
                "[http-debug] <".to_string(),
                "[http-debug] < <empty body>".to_string(),
            ]
        );
    }

    #[test]
    fn response_debug_lines_truncate_long_bodies() {
        let message = RedactedMessage::response(200, &HeaderMap::new(), "abcdefghijklmnopqrstuvwxyz");
        assert_eq!(
            message.debug_lines('<', 10).last().map(String::as_str),
            Some("[http-debug] < abcdefghij... <truncated 16 chars>")
        );
    }
}
