//! Prompt construction for estimation calls.

use super::{Deliverable, QaPair};

/// System prompt for estimation calls.
pub fn estimate_system_prompt() -> String {
    "You are a senior project manager producing effort estimates for software \
deliverables. Respond with strictly formatted JSON only."
        .to_string()
}

/// Render Q&A context as a prompt block.
pub fn format_qa_pairs(qa_pairs: &[QaPair]) -> String {
    qa_pairs
        .iter()
        .map(|qa| format!("Q: {}\nA: {}", qa.question, qa.answer))
        .collect::<Vec<_>>()
        .join("\n")
}

/// User prompt for a single deliverable.
///
/// Asks for JSON with `person_days`, a bulleted per-phase breakdown and
/// prose notes, with explicit unit discipline so the model doesn't confuse
/// digits (e.g. 4.5 person-days written as 45).
pub fn estimate_prompt(deliverable: &Deliverable, requirements: &str, qa_text: &str) -> String {
    format!(
        r#"Estimate the effort for the following deliverable in person-days.

[Deliverable]
Name: {name}
Description: {description}

[System requirements]
{requirements}

[Additional context]
{qa_text}

[Strict rules]
- Always use "person-days" as the unit and keep one decimal place (e.g. 4.5, never 45).
- Every figure inside reasoning_breakdown also uses person-days with one decimal.

[Output format]
Return only the following JSON, without a code block:
{{
  "person_days": number with one decimal (e.g. 4.5),
  "reasoning_breakdown": "per-phase breakdown as a bulleted list (Markdown allowed)",
  "reasoning_notes": "assumptions, risks and remarks as prose (Markdown allowed)"
}}

[Estimation scope]
- Include design, implementation, testing and documentation.
- Keep the figure realistic for the deliverable's complexity.
- reasoning_breakdown holds the numeric per-phase split; reasoning_notes holds assumptions and risks."#,
        name = deliverable.name,
        description = deliverable.description,
        requirements = requirements,
        qa_text = qa_text,
    )
}
