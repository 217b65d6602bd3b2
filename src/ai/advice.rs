//! Asks for a savings tip based on where the money went this month.

use crate::{
    ai::{ChatMessage, CompletionRequest},
    expense::CategoryTotal,
};

/// Shown when the completion service fails.
pub const ADVICE_FALLBACK: &str = "Could not generate advice at this time.";

/// Shown when no completion service has been configured.
pub const ADVICE_NOT_CONFIGURED: &str = "AI assistant is not configured.";

const SYSTEM_PROMPT: &str = "You are a financial advisor giving brief, actionable tips.";

/// Render category totals as "Food: 5000.00, Transport: 1200.00".
pub(crate) fn summary_text(summary: &[CategoryTotal]) -> String {
    summary
        .iter()
        .map(|total| format!("{}: {:.2}", total.category, total.total))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the request for a savings tip about `summary`.
pub(crate) fn advice_request(summary: &[CategoryTotal]) -> CompletionRequest {
    let prompt = format!(
        "Analyze this monthly spending breakdown: {}.\n\
        \n\
        Provide ONE short, specific, and actionable savings tip (max 2 sentences).\n\
        Focus on the highest spending category.\n\
        Example: \"You spent 40% on Food. Cooking at home more often could save you Rs. 3000.\"\n\
        Do NOT be generic. Be direct and helpful.",
        summary_text(summary)
    );

    CompletionRequest {
        messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
        temperature: 0.7,
        max_tokens: Some(100),
    }
}
