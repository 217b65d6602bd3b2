//! The AI savings tip, loaded after the rest of the dashboard.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    ai::ExpenseAssistant,
    auth::UserID,
    budget::{BudgetPeriod, period_start},
    expense::get_category_totals,
    html::CARD_STYLE,
    timezone::local_now,
};

/// The advice given before anything has been spent this month.
pub const NO_EXPENSES_THIS_MONTH: &str =
    "No expenses recorded this month yet! Add some expenses to get advice.";

/// Ask for a savings tip based on what the user has spent this month.
///
/// The database lock is released before the completion service is called.
///
/// # Errors
/// Returns an error if the timezone is invalid or this month's totals cannot be read.
pub async fn get_monthly_advice(
    user_id: UserID,
    db_connection: &Mutex<Connection>,
    local_timezone: &str,
    expense_assistant: &ExpenseAssistant,
) -> Result<String, Error> {
    let month_start = period_start(BudgetPeriod::Monthly, local_now(local_timezone)?);

    let category_totals = {
        let connection = db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_category_totals(user_id, Some(month_start), &connection).inspect_err(|error| {
            tracing::error!("Could not get this month's totals for {user_id}: {error}")
        })?
    };

    if category_totals.is_empty() {
        return Ok(NO_EXPENSES_THIS_MONTH.to_owned());
    }

    Ok(expense_assistant.budget_advice(&category_totals).await)
}

/// The state needed to get a savings tip.
#[derive(Debug, Clone)]
pub struct SavingsTipState {
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kathmandu".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
    pub expense_assistant: ExpenseAssistant,
}

impl FromRef<AppState> for SavingsTipState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
            expense_assistant: state.expense_assistant.clone(),
        }
    }
}

/// Render the savings tip card that replaces the placeholder on the dashboard.
pub async fn get_savings_tip(
    State(state): State<SavingsTipState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    match get_monthly_advice(
        user_id,
        &state.db_connection,
        &state.local_timezone,
        &state.expense_assistant,
    )
    .await
    {
        Ok(advice) => savings_tip_view(&advice).into_response(),
        Err(error) => error.into_alert_response(),
    }
}

fn savings_tip_view(advice: &str) -> Markup {
    html! {
        div class=(CARD_STYLE) data-savings-tip
        {
            h3 class="text-lg font-semibold mb-2" { "Savings Tip" }
            p class="text-gray-700 dark:text-gray-300" { (advice) }
        }
    }
}
