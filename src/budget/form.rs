//! Pages and endpoints for creating and editing budgets.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
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
    auth::UserID,
    budget::{
        Budget, BudgetPeriod, UpsertOutcome, check_category_exists, get_budget, update_budget,
        upsert_budget,
    },
    category::{Category, get_all_categories},
    database_id::{BudgetID, CategoryID},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
    },
    navigation::NavBar,
};

/// The state needed for the budget form pages and endpoints.
#[derive(Debug, Clone)]
pub struct BudgetFormState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BudgetFormState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form data for creating or editing a budget.
#[derive(Debug, Deserialize)]
pub struct BudgetForm {
    /// The category the budget applies to, empty for an overall budget.
    #[serde(default)]
    pub category_id: Option<CategoryID>,
    /// The spending limit per period.
    pub amount: f64,
    pub period: BudgetPeriod,
}

/// Render the page for creating a budget.
pub async fn get_new_budget_page(State(state): State<BudgetFormState>) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let categories = get_all_categories(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;

    let form = budget_form_view(FormTarget::Create, None, &categories);

    Ok(budget_page("Create Budget", endpoints::NEW_BUDGET_VIEW, &form).into_response())
}

/// Render the page for editing one of the user's budgets.
pub async fn get_edit_budget_page(
    Path(budget_id): Path<BudgetID>,
    State(state): State<BudgetFormState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let budget = get_budget(budget_id, user_id, &connection)?;
    let categories = get_all_categories(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;

    let edit_endpoint = endpoints::format_endpoint(endpoints::EDIT_BUDGET_VIEW, budget_id);
    let form = budget_form_view(FormTarget::Update(budget_id), Some(&budget), &categories);

    Ok(budget_page("Edit Budget", &edit_endpoint, &form).into_response())
}

/// Create a budget for the submitted category and period, or update the limit
/// of the existing one. Redirects to the budget list on success.
pub async fn create_budget_endpoint(
    State(state): State<BudgetFormState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<BudgetForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    if let Err(error) = check_category_exists(form.category_id, &connection) {
        return error.into_alert_response();
    }

    match upsert_budget(
        user_id,
        form.category_id,
        form.period,
        form.amount,
        OffsetDateTime::now_utc(),
        &connection,
    ) {
        Ok(outcome) => {
            match &outcome {
                UpsertOutcome::Created(budget) => tracing::info!("Created budget {}", budget.id),
                UpsertOutcome::Updated(budget) => tracing::info!("Updated budget {}", budget.id),
            }

            (
                HxRedirect(endpoints::BUDGETS_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("Could not save budget: {error}");
            error.into_alert_response()
        }
    }
}

/// Change the category, period and limit of one of the user's budgets.
/// Redirects to the budget list on success.
pub async fn update_budget_endpoint(
    Path(budget_id): Path<BudgetID>,
    State(state): State<BudgetFormState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<BudgetForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    if let Err(error) = check_category_exists(form.category_id, &connection) {
        return error.into_alert_response();
    }

    match update_budget(
        budget_id,
        user_id,
        form.category_id,
        form.period,
        form.amount,
        OffsetDateTime::now_utc(),
        &connection,
    ) {
        Ok(_) => (
            HxRedirect(endpoints::BUDGETS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Could not update budget {budget_id}: {error}");
            error.into_alert_response()
        }
    }
}

/// Where the budget form is submitted.
#[derive(Debug, Clone, Copy)]
enum FormTarget {
    Create,
    Update(BudgetID),
}

fn budget_page(title: &str, active_endpoint: &str, form: &Markup) -> Markup {
    let nav_bar = NavBar::new(active_endpoint).into_html();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { (title) }
            (form)
        }
    };

    base(title, &[], &content)
}

fn budget_form_view(target: FormTarget, budget: Option<&Budget>, categories: &[Category]) -> Markup {
    let selected_category = budget.and_then(|budget| budget.category_id);
    let selected_period = budget.map(|budget| budget.period).unwrap_or_default();
    let amount = budget.map(|budget| format!("{:.2}", budget.amount));
    let (hx_post, hx_put, submit_text) = match target {
        FormTarget::Create => (Some(endpoints::POST_BUDGET.to_owned()), None, "Save Budget"),
        FormTarget::Update(budget_id) => (
            None,
            Some(endpoints::format_endpoint(endpoints::PUT_BUDGET, budget_id)),
            "Update Budget",
        ),
    };

    html! {
        form
            hx-post=[hx_post]
            hx-put=[hx_put]
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="category_id" class=(FORM_LABEL_STYLE) { "Category" }

                select
                    name="category_id"
                    id="category_id"
                    class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" selected[selected_category.is_none()]
                    {
                        "Overall (all categories)"
                    }

                    @for category in categories {
                        option
                            value=(category.id)
                            selected[selected_category == Some(category.id)]
                        {
                            (category.name)
                        }
                    }
                }
            }

            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Limit" }

                input
                    name="amount"
                    id="amount"
                    type="number"
                    step="0.01"
                    min="0"
                    placeholder="0.00"
                    required
                    value=[amount]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="period" class=(FORM_LABEL_STYLE) { "Period" }

                select
                    name="period"
                    id="period"
                    class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for period in BudgetPeriod::ALL {
                        option value=(period.as_str()) selected[period == selected_period]
                        {
                            (period.label())
                        }
                    }
                }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { (submit_text) }
        }
    }
}
