//! The entry point the rest of the app uses for AI features.

use std::sync::Arc;

use crate::{
    ai::{
        ADVICE_FALLBACK, ADVICE_NOT_CONFIGURED, CompletionBackend, ExpenseCandidate,
        advice::advice_request,
        extraction::{extraction_request, parse_candidate},
    },
    expense::CategoryTotal,
};

/// Reads expenses from free text and writes savings tips.
///
/// Works without a backend, in which case [ExpenseAssistant::parse_expense]
/// finds nothing and advice explains that AI is not configured.
#[derive(Debug, Clone, Default)]
pub struct ExpenseAssistant {
    backend: Option<Arc<dyn CompletionBackend>>,
}

impl ExpenseAssistant {
    /// An assistant that sends its requests to `backend`.
    pub fn new(backend: impl CompletionBackend + 'static) -> Self {
        Self {
            backend: Some(Arc::new(backend)),
        }
    }

    /// An assistant without a backend.
    pub fn disabled() -> Self {
        Self { backend: None }
    }

    /// Whether a completion backend has been configured.
    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    /// Read an expense from `text`, e.g. "Lunch at the cafe 350".
    ///
    /// Returns `None` if there is no backend, the request fails, or the
    /// response cannot be read as an expense. Failures are logged.
    pub async fn parse_expense(&self, text: &str) -> Option<ExpenseCandidate> {
        let Some(backend) = &self.backend else {
            tracing::warn!("Cannot parse expense, the AI assistant is not configured.");
            return None;
        };

        let completion = backend
            .complete(extraction_request(text))
            .await
            .inspect_err(|error| tracing::error!("Expense extraction request failed: {error}"))
            .ok()?;

        parse_candidate(&completion)
            .inspect_err(|error| {
                tracing::error!("Could not read expense from completion {completion:?}: {error}")
            })
            .ok()
    }

    /// Get a short savings tip based on this month's spending per category.
    ///
    /// Never fails: returns a fixed message if there is no backend or the
    /// request fails.
    pub async fn budget_advice(&self, summary: &[CategoryTotal]) -> String {
        let Some(backend) = &self.backend else {
            return ADVICE_NOT_CONFIGURED.to_owned();
        };

        match backend.complete(advice_request(summary)).await {
            Ok(advice) => advice,
            Err(error) => {
                tracing::error!("Budget advice request failed: {error}");
                ADVICE_FALLBACK.to_owned()
            }
        }
    }
}

#[cfg(test)]
mod expense_assistant_tests {
    use crate::{
        ai::{ExpenseAssistant, ExpenseCandidate, FakeBackend},
        expense::CategoryTotal,
    };

    #[tokio::test]
    async fn parses_expense_with_currency_and_prose() {
        let backend = FakeBackend::replying(
            r#"Sure! Here you go: {"item":"Burger","amount":"Rs 500","category":"Food"}"#,
        );
        let assistant = ExpenseAssistant::new(backend.clone());

        let got = assistant.parse_expense("burger 500 rs").await;

        assert_eq!(
            got,
            Some(ExpenseCandidate {
                item: "Burger".to_owned(),
                amount: 500.0,
                category: "Food".to_owned(),
            })
        );
        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].messages[1].content.contains("burger 500 rs"));
    }

    #[tokio::test]
    async fn text_without_json_gives_nothing() {
        let assistant =
            ExpenseAssistant::new(FakeBackend::replying("Sorry, I cannot help with that."));

        assert_eq!(assistant.parse_expense("hello").await, None);
    }

    #[tokio::test]
    async fn failed_request_gives_nothing() {
        let assistant = ExpenseAssistant::new(FakeBackend::failing());

        assert_eq!(assistant.parse_expense("taxi 300").await, None);
    }

    #[tokio::test]
    async fn disabled_assistant() {
        let assistant = ExpenseAssistant::disabled();

        assert!(!assistant.is_configured());
        assert_eq!(assistant.parse_expense("taxi 300").await, None);
        assert_eq!(
            assistant.budget_advice(&[]).await,
            "AI assistant is not configured."
        );
    }

    #[tokio::test]
    async fn advice_is_returned_as_is() {
        let backend = FakeBackend::replying("Cook at home twice a week.");
        let assistant = ExpenseAssistant::new(backend.clone());
        let summary = [CategoryTotal {
            category: "Food".to_owned(),
            total: 4200.0,
        }];

        let advice = assistant.budget_advice(&summary).await;

        assert_eq!(advice, "Cook at home twice a week.");
        assert!(backend.requests()[0].messages[1].content.contains("Food: 4200.00"));
    }

    #[tokio::test]
    async fn advice_for_empty_summary_does_not_fail() {
        let assistant = ExpenseAssistant::new(FakeBackend::replying("Keep it up."));

        assert_eq!(assistant.budget_advice(&[]).await, "Keep it up.");
    }

    #[tokio::test]
    async fn advice_falls_back_on_failure() {
        let assistant = ExpenseAssistant::new(FakeBackend::failing());

        assert_eq!(
            assistant.budget_advice(&[]).await,
            "Could not generate advice at this time."
        );
    }
}
