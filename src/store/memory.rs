//! In-memory store implementation.

use super::{ChatMessage, ConversationLog, EstimateStore, Role, StoreError};
use crate::estimate::Estimate;
use async_trait::async_trait;
use dashmap::DashMap;

/// DashMap-backed store for tests and single-process embedding.
#[derive(Default)]
pub struct InMemoryStore {
    estimates: DashMap<String, Vec<Estimate>>,
    messages: DashMap<String, Vec<ChatMessage>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conversation history for a task, in append order.
    pub fn messages(&self, task_id: &str) -> Vec<ChatMessage> {
        self.messages
            .get(task_id)
            .map(|m| m.value().clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EstimateStore for InMemoryStore {
    async fn load(&self, task_id: &str) -> Result<Vec<Estimate>, StoreError> {
        Ok(self
            .estimates
            .get(task_id)
            .map(|e| e.value().clone())
            .unwrap_or_default())
    }

    async fn save(&self, task_id: &str, estimates: &[Estimate]) -> Result<(), StoreError> {
        self.estimates
            .insert(task_id.to_string(), estimates.to_vec());
        Ok(())
    }
}

#[async_trait]
impl ConversationLog for InMemoryStore {
    async fn append(&self, task_id: &str, role: Role, content: &str) -> Result<(), StoreError> {
        self.messages
            .entry(task_id.to_string())
            .or_default()
            .push(ChatMessage::new(task_id, role, content));
        Ok(())
    }
}
