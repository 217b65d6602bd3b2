//! The budgets page, showing how much of each budget has been spent this period.

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
    auth::UserID,
    budget::{AlertLevel, BudgetWithStatus, WARNING_THRESHOLD, classify, get_budgets_with_status},
    endpoints,
    html::{
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, edit_delete_action_links, format_currency, format_percentage,
    },
    navigation::NavBar,
    timezone::local_now,
};

/// The state needed for the budgets page.
#[derive(Debug, Clone)]
pub struct BudgetsPageState {
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kathmandu".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BudgetsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the user's budgets with their spending in the current period.
pub async fn get_budgets_page(
    State(state): State<BudgetsPageState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let now = local_now(&state.local_timezone)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let budgets = get_budgets_with_status(user_id, now, &connection)
        .inspect_err(|error| tracing::error!("Could not get budgets for {user_id}: {error}"))?;

    Ok(budgets_view(&budgets).into_response())
}

fn progress_bar_style(level: Option<AlertLevel>) -> &'static str {
    match level {
        Some(AlertLevel::Exceeded) => "h-2.5 rounded-full bg-red-600",
        Some(AlertLevel::Warning) => "h-2.5 rounded-full bg-yellow-400",
        None => "h-2.5 rounded-full bg-green-600",
    }
}

fn budget_row(budget_with_status: &BudgetWithStatus) -> Markup {
    let BudgetWithStatus { budget, status } = budget_with_status;
    let level = classify(status, WARNING_THRESHOLD);
    let bar_width = status.percentage_used.clamp(0.0, 100.0);
    let edit_url = endpoints::format_endpoint(endpoints::EDIT_BUDGET_VIEW, budget.id);
    let delete_url = endpoints::format_endpoint(endpoints::DELETE_BUDGET, budget.id);
    let confirm_message = format!(
        "Are you sure you want to delete the {} {} budget?",
        budget.period,
        budget.scope_label()
    );

    html! {
        tr class=(TABLE_ROW_STYLE) data-budget-row
        {
            td class=(TABLE_CELL_STYLE) { (budget.scope_label()) }
            td class=(TABLE_CELL_STYLE) { (budget.period.label()) }
            td class=(TABLE_CELL_STYLE) { (format_currency(budget.amount)) }
            td class=(TABLE_CELL_STYLE) { (format_currency(status.spent)) }
            td class=(TABLE_CELL_STYLE)
            {
                @if status.is_exceeded {
                    span class="text-red-600 dark:text-red-400" data-exceeded
                    {
                        "Over by " (format_currency(status.remaining.abs()))
                    }
                } @else {
                    (format_currency(status.remaining))
                }
            }
            td class=(TABLE_CELL_STYLE)
            {
                div class="w-32 bg-gray-200 rounded-full h-2.5 dark:bg-gray-700"
                {
                    div
                        class=(progress_bar_style(level))
                        style=(format!("width: {bar_width:.1}%")) {}
                }
                span class="text-xs" { (format_percentage(status.percentage_used)) }
                @if level == Some(AlertLevel::Warning) {
                    span class="ml-1 text-xs text-yellow-600 dark:text-yellow-300" data-warning
                    {
                        "Almost used"
                    }
                }
            }
            td class=(TABLE_CELL_STYLE)
            {
                div class="flex gap-4"
                {
                    (edit_delete_action_links(&edit_url, &delete_url, &confirm_message, "closest tr"))
                }
            }
        }
    }
}

fn budgets_view(budgets: &[BudgetWithStatus]) -> Markup {
    let new_budget_route = endpoints::NEW_BUDGET_VIEW;
    let nav_bar = NavBar::new(endpoints::BUDGETS_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full lg:max-w-5xl"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Budgets" }

                    a href=(new_budget_route) class=(LINK_STYLE)
                    {
                        "Create Budget"
                    }
                }

                div class="overflow-x-auto"
                {
                    table class="w-full text-sm text-left rtl:text-right
                        text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Period" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Limit" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Spent" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Remaining" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Used" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for budget in budgets {
                                (budget_row(budget))
                            }

                            @if budgets.is_empty() {
                                tr
                                {
                                    td
                                        colspan="7"
                                        class="px-6 py-4 text-center text-gray-500 dark:text-gray-400"
                                    {
                                        "No budgets yet. "
                                        a href=(new_budget_route) class=(LINK_STYLE)
                                        {
                                            "Set a spending limit"
                                        }
                                        " to keep track of your spending."
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Budgets", &[], &content)
}
