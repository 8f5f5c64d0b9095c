//! Prompts for the memory classifier.

use super::{ComparisonRequest, NO_CODE};
use crate::types::Message;

pub const CLASSIFIER_SYSTEM_PROMPT: &str = r#"You are a coding tutor checking whether a learner still remembers how to solve a problem they solved before.

You will be given the problem, the learner's original approach and code, and a new attempt made from memory. Judge retention of the solution idea, not code style.

Respond with a single JSON object and nothing else:
{"summary": "<at most 3 sentences of feedback on what was retained, lost or improved>", "rating": "<REMEMBERED|PARTIAL|FORGOT>"}

Ratings:
- REMEMBERED: the new attempt is correct and reaches the original (or an equally good) approach.
- PARTIAL: the core idea is there but details are missing, wrong, or clearly suboptimal.
- FORGOT: the attempt is wrong, unrelated, or stuck."#;

/// Build the user message for a comparison.
pub fn comparison_prompt(request: &ComparisonRequest) -> String {
    format!(
        "Problem:\n{}\n\nOriginal approach:\n{}\n\nOriginal code:\n{}\n\nNew approach:\n{}\n\nNew code:\n{}\n",
        non_empty(&request.problem_description),
        non_empty(&request.original_approach),
        code_or_placeholder(request.original_code.as_deref()),
        non_empty(&request.new_approach),
        code_or_placeholder(request.new_code.as_deref()),
    )
}

/// Full message list sent to the LLM.
pub fn comparison_messages(request: &ComparisonRequest) -> Vec<Message> {
    vec![
        Message::system(CLASSIFIER_SYSTEM_PROMPT),
        Message::user(comparison_prompt(request)),
    ]
}

fn non_empty(text: &str) -> &str {
    if text.trim().is_empty() {
        NO_CODE
    } else {
        text
    }
}

fn code_or_placeholder(code: Option<&str>) -> &str {
    code.map(non_empty).unwrap_or(NO_CODE)
}
