//! Clarifying-question generation.

use crate::config::LlmConfig;
use crate::control::pipeline::{CallError, ProtectedClient};
use crate::estimate::Deliverable;
use crate::transport::CompletionRequest;
use std::sync::Arc;

/// Number of questions every caller receives, no matter what the model says.
const QUESTION_COUNT: usize = 3;

/// Generates clarifying questions through the protection pipeline, with
/// static defaults as the fallback.
pub struct QuestionEngine {
    client: Arc<ProtectedClient>,
    llm: LlmConfig,
}

impl QuestionEngine {
    pub fn new(client: Arc<ProtectedClient>, llm: LlmConfig) -> Self {
        Self { client, llm }
    }

    /// Generate exactly 3 questions to improve estimation accuracy.
    ///
    /// Short model replies are padded with the static defaults, long ones
    /// truncated; a failed call returns the 3 defaults unchanged.
    /// A budget breach still aborts (fatal everywhere).
    pub async fn generate_questions(
        &self,
        deliverables: &[Deliverable],
        requirements: &str,
    ) -> Result<Vec<String>, crate::control::budget::BudgetError> {
        let request = CompletionRequest {
            system_prompt: question_system_prompt(),
            user_prompt: question_prompt(deliverables, requirements),
            model: self.llm.model.clone(),
            max_tokens: self.llm.question_max_tokens,
            temperature: self.llm.question_temperature,
            timeout: self.llm.timeout(),
        };

        match self.client.call("question", request).await {
            Ok(completion) => {
                let mut questions: Vec<String> = completion
                    .text
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(String::from)
                    .collect();

                if questions.len() < QUESTION_COUNT {
                    let defaults = default_questions();
                    questions.extend(defaults.into_iter().skip(questions.len()));
                }
                questions.truncate(QUESTION_COUNT);
                Ok(questions)
            }
            Err(CallError::Budget(err)) => Err(err),
            Err(err) => {
                tracing::error!(error = %err, "Question generation failed; using defaults");
                crate::metrics::record_fallback("question");
                Ok(default_questions())
            }
        }
    }
}

fn question_system_prompt() -> String {
    "You are a senior project manager preparing an effort estimate. \
Ask sharp, answerable clarifying questions."
        .to_string()
}

fn question_prompt(deliverables: &[Deliverable], requirements: &str) -> String {
    let deliverable_list = deliverables
        .iter()
        .map(|d| format!("- {}: {}", d.name, d.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Generate 3 questions that would most improve the accuracy of this estimate.

[Deliverables]
{deliverable_list}

[System requirements]
{requirements}

[Instructions]
1. Cover technical complexity, schedule and resources.
2. Keep each question concrete and easy to answer.
3. One line per question.
4. Output only the question text, no numbering.
"#,
        deliverable_list = deliverable_list,
        requirements = requirements,
    )
}

/// Static fallback questions.
fn default_questions() -> Vec<String> {
    vec![
        "What is the expected number of users and peak concurrent load?".to_string(),
        "Are there existing systems or data sources this must integrate with?".to_string(),
        "What is the target release date, and which deliverables are highest priority?"
            .to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::breaker::BreakerRegistry;
    use crate::control::budget::CostTracker;
    use crate::control::retry::RetryPolicy;
    use crate::transport::{Completion, ModelTransport, TokenUsage, TransportError};
    use async_trait::async_trait;
    use std::time::Duration;

    struct CannedTransport {
        response: Result<String, ()>,
    }

    #[async_trait]
    impl ModelTransport for CannedTransport {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<Completion, TransportError> {
            match &self.response {
                Ok(text) => Ok(Completion {
                    text: text.clone(),
                    usage: TokenUsage::default(),
                }),
                Err(()) => Err(TransportError::Network("down".into())),
            }
        }
    }

    fn engine(response: Result<String, ()>) -> QuestionEngine {
        let client = Arc::new(ProtectedClient::new(
            Arc::new(CannedTransport { response }),
            Arc::new(BreakerRegistry::new(10, Duration::from_secs(60))),
            RetryPolicy::new(2, Duration::from_millis(1), 2.0),
            Arc::new(CostTracker::new(0.15, 0.60, 10.0, 200.0)),
        ));
        QuestionEngine::new(client, LlmConfig::default())
    }

    fn deliverables() -> Vec<Deliverable> {
        vec![Deliverable::new(0, "要件定義書", "要件を定義する")]
    }

    #[tokio::test]
    async fn test_returns_exactly_three_questions() {
        let engine = engine(Ok("q1\nq2\nq3\nq4\nq5".to_string()));
        let questions = engine
            .generate_questions(&deliverables(), "req")
            .await
            .unwrap();
        assert_eq!(questions, vec!["q1", "q2", "q3"]);
    }

    #[tokio::test]
    async fn test_short_reply_padded_with_defaults() {
        let engine = engine(Ok("only one question?".to_string()));
        let questions = engine
            .generate_questions(&deliverables(), "req")
            .await
            .unwrap();
        assert_eq!(questions.len(), 3);
        assert_eq!(questions[0], "only one question?");
        assert_eq!(questions[1], default_questions()[1]);
    }

    #[tokio::test]
    async fn test_blank_lines_are_dropped() {
        let engine = engine(Ok("\n q1 \n\n q2 \n\n q3 \n".to_string()));
        let questions = engine
            .generate_questions(&deliverables(), "req")
            .await
            .unwrap();
        assert_eq!(questions, vec!["q1", "q2", "q3"]);
    }

    #[tokio::test]
    async fn test_failure_returns_defaults() {
        let engine = engine(Err(()));
        let questions = engine
            .generate_questions(&deliverables(), "req")
            .await
            .unwrap();
        assert_eq!(questions, default_questions());
    }
}
