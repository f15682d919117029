//! Scripted chat model for tests and offline demos.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ModelError, Result};
use crate::model::{ChatModel, ChatRequest, ChatResponse};

/// A [`ChatModel`] that replays canned replies in order and records every request.
///
/// Once the script is exhausted, further calls fail with
/// [`ModelError::InvalidResponse`].
///
/// # Example
///
/// ```rust,ignore
/// use ragline_model::MockChatModel;
///
/// let model = MockChatModel::new(["{\"summary\": \"x\", \"sources\": []}"]);
/// let reply = model.invoke(messages).await?;
/// assert_eq!(model.requests().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockChatModel {
    name: String,
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockChatModel {
    /// Create a mock that answers with `replies`, one per call.
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: "mock".to_string(),
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Override the reported model name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Return a copy of every request received so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of scripted replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: ChatRequest) -> Result<ChatResponse> {
        debug!(model = %self.name, message_count = request.messages.len(), "mock generate");

        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let reply = self.replies.lock().ok().and_then(|mut r| r.pop_front()).ok_or_else(|| {
            ModelError::InvalidResponse {
                provider: self.name.clone(),
                message: "no scripted replies left".to_string(),
            }
        })?;

        Ok(ChatResponse { content: reply, model: self.name.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[tokio::test]
    async fn replays_in_order_then_fails() {
        let model = MockChatModel::new(["first", "second"]);

        assert_eq!(model.invoke(vec![Message::user("a")]).await.unwrap(), "first");
        assert_eq!(model.invoke(vec![Message::user("b")]).await.unwrap(), "second");
        assert!(matches!(
            model.invoke(vec![Message::user("c")]).await,
            Err(ModelError::InvalidResponse { .. })
        ));

        let requests = model.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].messages[0].content, "b");
        assert_eq!(model.remaining(), 0);
    }
}
