//! Sekisan - Resilient LLM effort-estimation core
//!
//! This library estimates software-project effort from a deliverable list
//! plus free-text requirements, and supports a chat-based adjustment flow.
//! Every external model call runs through a protection pipeline (retry with
//! backoff, circuit breaker, cost ledger, rate limiting); adjustment
//! requests are resolved by deterministic rules reconciled against
//! model-generated results.
//!
//! The HTTP layer, persistence schema, file parsing and locale loading are
//! external collaborators reached through the traits in [`store`] and
//! [`transport`].

pub mod adjust;
pub mod config;
pub mod control;
pub mod estimate;
pub mod logging;
pub mod metrics;
pub mod question;
pub mod store;
pub mod transport;
pub mod validate;
