//! Persistence collaborator interfaces.
//!
//! Storage schema and ORM concerns live outside this crate; the engines only
//! depend on these traits. An in-memory implementation is provided for tests
//! and single-process embedding.

use crate::estimate::Estimate;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod memory;

pub use memory::InMemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One conversation history entry. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub task_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(task_id: &str, role: Role, content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id: task_id.to_string(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Persisted estimate set per task.
#[async_trait]
pub trait EstimateStore: Send + Sync {
    /// Load the current estimate set; an unknown task loads as empty.
    async fn load(&self, task_id: &str) -> Result<Vec<Estimate>, StoreError>;

    /// Replace the task's estimate set.
    async fn save(&self, task_id: &str, estimates: &[Estimate]) -> Result<(), StoreError>;
}

/// Append-only conversation history per task.
#[async_trait]
pub trait ConversationLog: Send + Sync {
    async fn append(&self, task_id: &str, role: Role, content: &str) -> Result<(), StoreError>;
}
