//! Dummy provider: echoes the last user message back prefixed with `[echo]`.
//! Lets the console exercise the whole pipeline without an API key.

use crate::llm::{CompletionRequest, LlmResponse, ProviderError, Role};

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse, ProviderError> {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(LlmResponse { text: format!("[echo] {last_user}"), usage: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    fn request(messages: Vec<ChatMessage>) -> CompletionRequest {
        CompletionRequest {
            model: "m".into(),
            messages,
            temperature: None,
            top_p: None,
            presence_penalty: None,
            frequency_penalty: None,
            token_limit: None,
            user: None,
        }
    }

    #[tokio::test]
    async fn echoes_last_user_message() {
        let req = request(vec![
            ChatMessage::new(Role::System, "sys"),
            ChatMessage::new(Role::User, "first"),
            ChatMessage::new(Role::Assistant, "reply"),
            ChatMessage::new(Role::User, "hello"),
        ]);
        assert_eq!(DummyProvider.complete(&req).await.unwrap().text, "[echo] hello");
    }

    #[tokio::test]
    async fn no_user_message_echoes_empty() {
        let req = request(vec![ChatMessage::new(Role::System, "sys")]);
        assert_eq!(DummyProvider.complete(&req).await.unwrap().text, "[echo] ");
    }
}
