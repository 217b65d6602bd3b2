//! The page for adding expenses, either as free text read by the AI assistant
//! or by filling in the item, amount and category by hand.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    ai::ExpenseAssistant,
    auth::UserID,
    category::{Category, CategoryName, get_all_categories, get_or_create_category},
    endpoints,
    expense::{Expense, NewExpense, create_expense, round_to_cents},
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
        loading_spinner,
    },
    navigation::NavBar,
};

/// Shown when the AI assistant could not turn the text into an expense.
pub const AI_NO_RESULT_MESSAGE: &str =
    "AI could not process this. Please try again with more detail.";

/// The state needed for adding expenses.
#[derive(Debug, Clone)]
pub struct CreateExpenseState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub expense_assistant: ExpenseAssistant,
}

impl FromRef<AppState> for CreateExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            expense_assistant: state.expense_assistant.clone(),
        }
    }
}

/// Free text describing an expense, e.g. "Lunch at the cafe 350".
#[derive(Debug, Deserialize)]
pub struct ExpenseTextForm {
    pub text: String,
}

/// An expense entered by hand.
#[derive(Debug, Deserialize)]
pub struct ExpenseForm {
    pub item: String,
    pub amount: f64,
    /// The name of a new or existing category.
    #[serde(default)]
    pub category: Option<String>,
}

/// Render the page for adding an expense.
pub async fn get_new_expense_page(State(state): State<CreateExpenseState>) -> Result<Response, Error> {
    let categories = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_all_categories(&connection)
            .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?
    };

    Ok(new_expense_view(state.expense_assistant.is_configured(), &categories).into_response())
}

/// Save an expense, creating its category if needed.
///
/// A blank `category_name` leaves the expense uncategorized.
pub fn record_expense(
    item: &str,
    amount: f64,
    category_name: Option<&str>,
    raw_text: &str,
    user_id: UserID,
    created_at: OffsetDateTime,
    connection: &Connection,
) -> Result<Expense, Error> {
    let category_id = match category_name.map(CategoryName::new) {
        Some(Ok(name)) => Some(get_or_create_category(name, connection)?.id),
        Some(Err(_)) | None => None,
    };

    create_expense(
        NewExpense {
            item: item.trim().to_owned(),
            amount: round_to_cents(amount),
            category_id,
            raw_text: raw_text.to_owned(),
        },
        user_id,
        created_at,
        connection,
    )
}

/// The dashboard URL that shows a confirmation and any budget alerts for `expense`.
pub fn expense_added_redirect(expense: &Expense) -> String {
    format!("{}?expense_added={}", endpoints::DASHBOARD_VIEW, expense.id)
}

fn save_and_redirect(
    state: &CreateExpenseState,
    item: &str,
    amount: f64,
    category_name: Option<&str>,
    raw_text: &str,
    user_id: UserID,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match record_expense(
        item,
        amount,
        category_name,
        raw_text,
        user_id,
        OffsetDateTime::now_utc(),
        &connection,
    ) {
        Ok(expense) => {
            tracing::info!("Recorded expense {} for {user_id}", expense.id);

            (
                HxRedirect(expense_added_redirect(&expense)),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("Could not record expense: {error}");
            error.into_alert_response()
        }
    }
}

/// Ask the AI assistant to read an expense from free text and save it.
///
/// Redirects to the dashboard on success, otherwise the form is shown again
/// with an error message.
pub async fn create_expense_from_text_endpoint(
    State(state): State<CreateExpenseState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<ExpenseTextForm>,
) -> Response {
    let text = form.text.trim();

    if text.is_empty() {
        return ai_form_view(
            state.expense_assistant.is_configured(),
            "",
            "Describe what you spent money on, e.g. \"Lunch at the cafe 350\".",
        )
        .into_response();
    }

    // The database lock is only taken once the AI request has finished.
    let Some(candidate) = state.expense_assistant.parse_expense(text).await else {
        return ai_form_view(
            state.expense_assistant.is_configured(),
            text,
            AI_NO_RESULT_MESSAGE,
        )
        .into_response();
    };

    save_and_redirect(
        &state,
        &candidate.item,
        candidate.amount,
        Some(&candidate.category),
        text,
        user_id,
    )
}

/// Save an expense entered by hand, without the AI assistant.
pub async fn create_expense_endpoint(
    State(state): State<CreateExpenseState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<ExpenseForm>,
) -> Response {
    if form.item.trim().is_empty() {
        return manual_form_view(&form.item, "Error: Item cannot be empty").into_response();
    }

    if !form.amount.is_finite() {
        return manual_form_view(&form.item, "Error: Amount must be a number").into_response();
    }

    save_and_redirect(
        &state,
        &form.item,
        form.amount,
        form.category.as_deref(),
        "",
        user_id,
    )
}

fn new_expense_view(ai_configured: bool, categories: &[Category]) -> Markup {
    let nav_bar = NavBar::new(endpoints::NEW_EXPENSE_VIEW).into_html();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            section class="w-full space-y-4"
            {
                h1 class="text-xl font-bold" { "Add Expense" }
                (ai_form_view(ai_configured, "", ""))
            }

            section class="w-full space-y-4 mt-8"
            {
                h2 class="text-lg font-semibold" { "Or enter it yourself" }
                (manual_form_view("", ""))

                datalist id="category-options"
                {
                    @for category in categories {
                        option value=(category.name) {}
                    }
                }
            }
        }
    };

    base("Add Expense", &[], &content)
}

fn ai_form_view(ai_configured: bool, text: &str, error_message: &str) -> Markup {
    html! {
        form
            hx-post=(endpoints::POST_EXPENSE_TEXT)
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            hx-disabled-elt="find button"
            class="w-full space-y-4 md:space-y-6"
            data-form="ai"
        {
            div
            {
                label for="text" class=(FORM_LABEL_STYLE) { "What did you spend on?" }

                textarea
                    id="text"
                    name="text"
                    rows="3"
                    placeholder="e.g. Lunch at the cafe 350"
                    required
                    class=(FORM_TEXT_INPUT_STYLE)
                {
                    (text)
                }
            }

            @if !ai_configured {
                div class="text-sm text-gray-500 dark:text-gray-400"
                {
                    "The AI assistant is not configured, so free text cannot be read. "
                    "Use the form below instead."
                }
            }

            @if !error_message.is_empty() {
                p class="text-red-600 dark:text-red-400" { (error_message) }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="htmx-indicator" { (loading_spinner()) }
                "Add with AI"
            }
        }
    }
}

fn manual_form_view(item: &str, error_message: &str) -> Markup {
    html! {
        form
            hx-post=(endpoints::POST_EXPENSE)
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
            data-form="manual"
        {
            div
            {
                label for="item" class=(FORM_LABEL_STYLE) { "Item" }

                input
                    id="item"
                    type="text"
                    name="item"
                    placeholder="e.g. Burger"
                    value=(item)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                input
                    id="amount"
                    type="number"
                    name="amount"
                    step="0.01"
                    min="0"
                    placeholder="0.00"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="category" class=(FORM_LABEL_STYLE) { "Category" }

                input
                    id="category"
                    type="text"
                    name="category"
                    list="category-options"
                    placeholder="Leave blank for uncategorized"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            @if !error_message.is_empty() {
                p class="text-red-600 dark:text-red-400" { (error_message) }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Add Expense" }
        }
    }
}
