use serde::{Deserialize, Serialize};

use super::provider::{ChatMessage, ChatReply, ChatRequest, LlmError, LlmProvider, LlmResult};
use crate::http::client::HttpClient;

#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    http: HttpClient,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(
        http: HttpClient,
        api_key: Option<String>,
        model: String,
        base_url: String,
    ) -> LlmResult<Self> {
        let api_key = api_key
            .filter(|v| !v.trim().is_empty())
            .ok_or(LlmError::MissingApiKey)?;

        Ok(Self {
            http,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    /// First choice with non-blank content, returned exactly as sent.
    fn extract_content(resp: CompletionResponse) -> LlmResult<String> {
        resp.choices
            .into_iter()
            .filter_map(|choice| choice.message.content)
            .find(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

impl LlmProvider for OpenAiProvider {
    async fn complete(&self, request: ChatRequest) -> LlmResult<ChatReply> {
        let payload = CompletionRequest {
            model: &self.model,
            messages: &request.messages,
        };
        let resp = self
            .http
            .post_json(&self.endpoint(), &self.api_key, &payload)
            .await
            .map_err(|err| LlmError::Transport(err.to_string()))?;

        if !(200..300).contains(&resp.status) {
            let body = resp.body.chars().take(400).collect::<String>();
            return Err(LlmError::HttpStatus {
                status: resp.status,
                body,
            });
        }

        let parsed = serde_json::from_str::<CompletionResponse>(&resp.body)
            .map_err(|err| LlmError::Parse(err.to_string()))?;
        let content = Self::extract_content(parsed)?;
        Ok(ChatReply { content })
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::OpenAiProvider;
    use crate::http::client::HttpClient;
    use crate::http::debug::HttpDebugConfig;
    use crate::llm::provider::{ChatMessage, ChatRequest, LlmError, LlmProvider};
    use reqwest::Client;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: String, key: &str) -> OpenAiProvider {
        OpenAiProvider::new(
            HttpClient::new(Client::new(), HttpDebugConfig::disabled()),
            Some(key.to_string()),
            "test-model".to_string(),
            base_url,
        )
        .expect("provider")
    }

    fn request(question: &str) -> ChatRequest {
        ChatRequest {
            messages: vec![ChatMessage::user(question)],
        }
    }

    #[tokio::test]
    async fn complete_sends_full_history_and_returns_first_content() {
        let server = MockServer::start().await;
        let body = r#"{
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "  "}},
                {"index": 1, "message": {"role": "assistant", "content": "Logistics is promising."}}
            ]
        }"#;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "test-model",
                "messages": [
                    {"role": "user", "content": "first"},
                    {"role": "assistant", "content": "answer"},
                    {"role": "user", "content": "second"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
            .mount(&server)
            .await;

        let reply = provider(format!("{}/", server.uri()), "test-key")
            .complete(ChatRequest {
                messages: vec![
                    ChatMessage::user("first"),
                    ChatMessage::assistant("answer"),
                    ChatMessage::user("second"),
                ],
            })
            .await
            .expect("success response");

        assert_eq!(reply.content, "Logistics is promising.");
    }

    #[tokio::test]
    async fn complete_keeps_reply_whitespace_verbatim() {
        let server = MockServer::start().await;
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "\n- Retail\n- Logistics\n"}}]}"#;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
            .mount(&server)
            .await;

        let reply = provider(server.uri(), "test-key")
            .complete(request("hello"))
            .await
            .expect("success response");

        assert_eq!(reply.content, "\n- Retail\n- Logistics\n");
    }

    #[tokio::test]
    async fn complete_maps_http_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = provider(server.uri(), "bad-key")
            .complete(request("hello"))
            .await
            .expect_err("expected auth error");

        match err {
            LlmError::HttpStatus { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("invalid api key"));
            }
            other => panic!("expected HttpStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn complete_returns_empty_response_error_for_null_content() {
        let server = MockServer::start().await;
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
            .mount(&server)
            .await;

        let err = provider(server.uri(), "test-key")
            .complete(request("hello"))
            .await
            .expect_err("expected empty response error");

        assert_eq!(err, LlmError::EmptyResponse);
    }

    #[tokio::test]
    async fn complete_reports_unparseable_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = provider(server.uri(), "test-key")
            .complete(request("hello"))
            .await
            .expect_err("expected parse error");

        assert!(matches!(err, LlmError::Parse(_)));
    }

    #[test]
    fn new_requires_api_key() {
        let err = OpenAiProvider::new(
            HttpClient::new(Client::new(), HttpDebugConfig::disabled()),
            Some("   ".to_string()),
            "test-model".to_string(),
            "https://example.com".to_string(),
        )
        .expect_err("blank key should fail");

        assert_eq!(err, LlmError::MissingApiKey);
    }
}
