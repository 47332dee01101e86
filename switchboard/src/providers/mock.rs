//! Scripted chat client for tests and offline development.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::{ChatClient, ChatMessage, ChatOptions, ChatReply};
use crate::errors::{Result, ServerError};
use crate::tools::ToolDescriptor;

/// A [`ChatClient`] that replays a fixed script of replies.
///
/// Each call to [`complete`](ChatClient::complete) pops the next scripted
/// reply; an exhausted script is a provider error. The conversations passed
/// to each call are recorded and can be inspected afterwards.
#[derive(Default)]
pub struct MockChatClient {
    replies: Mutex<VecDeque<ChatReply>>,
    recorded: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a reply to the script.
    pub fn push_reply(&self, reply: ChatReply) {
        lock(&self.replies).push_back(reply);
    }

    /// Builder-style helper to script a reply.
    pub fn with_reply(self, reply: ChatReply) -> Self {
        self.push_reply(reply);
        self
    }

    /// The conversations observed so far, one per completion call.
    pub fn recorded_conversations(&self) -> Vec<Vec<ChatMessage>> {
        lock(&self.recorded).clone()
    }

    /// Number of completion calls made so far.
    pub fn call_count(&self) -> usize {
        lock(&self.recorded).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait::async_trait]
impl ChatClient for MockChatClient {
    fn model_name(&self) -> &str {
        "mock-model"
    }

    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        _tools: Vec<ToolDescriptor>,
        _options: &ChatOptions,
    ) -> Result<ChatReply> {
        lock(&self.recorded).push(messages);

        lock(&self.replies)
            .pop_front()
            .ok_or_else(|| ServerError::Provider {
                provider: "mock".to_string(),
                message: "no scripted reply remaining".to_string(),
            })
    }
}
