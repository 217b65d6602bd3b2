//! Extracts structured expenses from free text and writes savings tips using
//! an external text-completion service.

mod advice;
mod assistant;
mod client;
mod extraction;
#[cfg(test)]
mod fake;

pub use advice::{ADVICE_FALLBACK, ADVICE_NOT_CONFIGURED};
pub use assistant::ExpenseAssistant;
pub use client::{
    AiError, ChatMessage, CompletionBackend, CompletionRequest, GroqBackend, GroqConfig, Role,
};
pub use extraction::ExpenseCandidate;
#[cfg(test)]
pub(crate) use fake::FakeBackend;
