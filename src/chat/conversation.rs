use crate::llm::provider::{ChatMessage, ChatRequest, LlmProvider, LlmResult};

/// Message history sent in full on every exchange, so the model keeps context
/// across otherwise stateless calls.
///
/// Entries always alternate user/assistant, starting with user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Appends `question`, sends the whole history and appends the reply.
    /// On failure the question is dropped again and the history is unchanged.
    pub async fn ask<P: LlmProvider>(&mut self, provider: &P, question: &str) -> LlmResult<String> {
        self.messages.push(ChatMessage::user(question));
        let request = ChatRequest {
            messages: self.messages.clone(),
        };

        match provider.complete(request).await {
            Ok(reply) => {
                self.messages
                    .push(ChatMessage::assistant(reply.content.clone()));
                Ok(reply.content)
            }
            Err(err) => {
                self.messages.pop();
                Err(err)
            }
        }
    }
}

/// Sends `question` with no history at all. The model cannot resolve
/// references to earlier turns.
pub async fn ask_stateless<P: LlmProvider>(provider: &P, question: &str) -> LlmResult<String> {
    let reply = provider
        .complete(ChatRequest {
            messages: vec![ChatMessage::user(question)],
        })
        .await?;
    Ok(reply.content)
}
