//! The dashboard page: charts, statistics, recent expenses and budget alerts.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::{OffsetDateTime, Time};

use crate::{
    AppState, Error,
    alert::Alert,
    auth::UserID,
    budget::{
        BudgetAlert, DASHBOARD_WARNING_THRESHOLD, alerts_after_expense, collect_alerts,
        get_budgets_with_status,
    },
    dashboard::{
        charts::{
            DashboardChart, category_chart, charts_script, daily_trend_chart, monthly_trend_chart,
        },
        trends::{daily_totals, first_trend_day, first_trend_month, monthly_totals},
    },
    database_id::ExpenseID,
    endpoints,
    expense::{
        Expense, ExpenseStats, format_expense_date, get_category_totals, get_expense,
        get_expense_stats, get_expenses_since, get_recent_expenses,
    },
    html::{
        CARD_STYLE, CATEGORY_BADGE_STYLE, HeadElement, LINK_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency, link,
        loading_spinner,
    },
    navigation::NavBar,
    timezone::local_now,
};

/// How many of the latest expenses are listed on the dashboard.
const RECENT_EXPENSE_COUNT: u32 = 5;

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading expenses and budgets.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kathmandu".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Query parameters for the dashboard.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    /// The expense that was just added, set when redirecting from the add expense page.
    pub expense_added: Option<ExpenseID>,
}

/// Holds all the data needed to render the dashboard.
struct DashboardData {
    /// Confirmation of a just added expense and the budgets it pushed over the line.
    notices: Vec<Alert>,
    budget_alerts: Vec<BudgetAlert>,
    stats: ExpenseStats,
    recent_expenses: Vec<Expense>,
    charts: [DashboardChart; 3],
}

/// Display a page with an overview of the user's spending.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, Error> {
    let now = local_now(&state.local_timezone)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW);

    match build_dashboard_data(user_id, query.expense_added, now, &connection)? {
        Some(data) => Ok(dashboard_view(nav_bar, data, now).into_response()),
        None => Ok(dashboard_no_data_view(nav_bar).into_response()),
    }
}

/// Confirm the expense `expense_id` was added and check the budgets it counts toward.
///
/// Nothing is shown if the expense does not exist or belongs to another user.
fn expense_added_notices(
    user_id: UserID,
    expense_id: ExpenseID,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Vec<Alert>, Error> {
    let expense = match get_expense(expense_id, user_id, connection) {
        Ok(expense) => expense,
        Err(Error::NotFound) => {
            tracing::warn!("User {user_id} was redirected with unknown expense {expense_id}");
            return Ok(Vec::new());
        }
        Err(error) => return Err(error),
    };

    let mut notices = vec![Alert::Success {
        message: "Expense added".to_owned(),
        details: format!(
            "{} for {} in {}.",
            expense.item,
            format_currency(expense.amount),
            expense.category_label()
        ),
    }];

    let budget_alerts = alerts_after_expense(user_id, expense.category_id, now, connection)
        .inspect_err(|error| tracing::error!("Could not check budgets for {user_id}: {error}"))?;
    notices.extend(budget_alerts.into_iter().map(BudgetAlert::into_alert));

    Ok(notices)
}

/// Fetches and builds all data needed for the dashboard display.
///
/// Returns `None` if the user has not recorded any expenses.
fn build_dashboard_data(
    user_id: UserID,
    expense_added: Option<ExpenseID>,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Option<DashboardData>, Error> {
    let stats = get_expense_stats(user_id, connection)
        .inspect_err(|error| tracing::error!("Could not get expense stats for {user_id}: {error}"))?;

    if stats.count == 0 {
        return Ok(None);
    }

    let notices = match expense_added {
        Some(expense_id) => expense_added_notices(user_id, expense_id, now, connection)?,
        None => Vec::new(),
    };

    let budgets = get_budgets_with_status(user_id, now, connection)
        .inspect_err(|error| tracing::error!("Could not get budgets for {user_id}: {error}"))?;
    let budget_alerts = collect_alerts(budgets, DASHBOARD_WARNING_THRESHOLD);

    let recent_expenses = get_recent_expenses(user_id, RECENT_EXPENSE_COUNT, connection)
        .inspect_err(|error| tracing::error!("Could not get recent expenses: {error}"))?;

    let category_totals = get_category_totals(user_id, None, connection)
        .inspect_err(|error| tracing::error!("Could not get category totals: {error}"))?;

    let today = now.date();
    let trend_start = first_trend_day(today).min(first_trend_month(today));
    let trend_start = trend_start.with_time(Time::MIDNIGHT).assume_offset(now.offset());
    let trend_expenses = get_expenses_since(user_id, trend_start, connection)
        .inspect_err(|error| tracing::error!("Could not get expenses for trends: {error}"))?;

    let charts = [
        DashboardChart {
            id: "category-chart",
            options: category_chart(&category_totals).to_string(),
        },
        DashboardChart {
            id: "daily-trend-chart",
            options: daily_trend_chart(&daily_totals(&trend_expenses, today, now.offset()))
                .to_string(),
        },
        DashboardChart {
            id: "monthly-trend-chart",
            options: monthly_trend_chart(&monthly_totals(&trend_expenses, today, now.offset()))
                .to_string(),
        },
    ];

    Ok(Some(DashboardData {
        notices,
        budget_alerts,
        stats,
        recent_expenses,
        charts,
    }))
}

/// Renders the dashboard page when the user has no expenses.
fn dashboard_no_data_view(nav_bar: NavBar) -> Markup {
    let nav_bar = nav_bar.into_html();
    let new_expense_link = link(endpoints::NEW_EXPENSE_VIEW, "adding an expense");
    let budgets_link = link(endpoints::NEW_BUDGET_VIEW, "set a budget");

    let content = html!(
        (nav_bar)

        div class="flex flex-col items-center px-6 py-8 mx-auto text-gray-900 dark:text-white"
        {
            h2 class="text-xl font-bold"
            {
                "Nothing here yet..."
            }

            p
            {
                "Charts will show up here once you start " (new_expense_link) ".
                You can also " (budgets_link) " to get warned before you overspend."
            }
        }
    );

    base("Dashboard", &[], &content)
}

fn stat_card(label: &str, value: &str) -> Markup {
    html! {
        div class=(CARD_STYLE) data-stat
        {
            p class="text-sm text-gray-500 dark:text-gray-400" { (label) }
            p class="text-2xl font-bold" { (value) }
        }
    }
}

fn budget_alerts_view(budget_alerts: Vec<BudgetAlert>) -> Markup {
    html! {
        section class="w-full space-y-2"
        {
            h3 class="text-xl font-semibold" { "Budget Alerts" }

            @for budget_alert in budget_alerts {
                div data-budget-alert
                {
                    (budget_alert.into_alert().into_html())
                }
            }
        }
    }
}

fn recent_expenses_view(recent_expenses: &[Expense], now: OffsetDateTime) -> Markup {
    html! {
        section class="w-full space-y-2"
        {
            div class="flex justify-between items-baseline"
            {
                h3 class="text-xl font-semibold" { "Recent Expenses" }
                a href=(endpoints::EXPENSES_VIEW) class=(LINK_STYLE) { "View all" }
            }

            div class="overflow-x-auto"
            {
                table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Item" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                            th scope="col" class="px-6 py-4 text-right" { "Amount" }
                        }
                    }

                    tbody
                    {
                        @for expense in recent_expenses {
                            tr class=(TABLE_ROW_STYLE) data-recent-expense
                            {
                                td class=(TABLE_CELL_STYLE) { (format_expense_date(expense, now.offset())) }
                                td class=(TABLE_CELL_STYLE) { (expense.item) }
                                td class=(TABLE_CELL_STYLE)
                                {
                                    span class=(CATEGORY_BADGE_STYLE) { (expense.category_label()) }
                                }
                                td class="px-6 py-4 text-right" { (format_currency(expense.amount)) }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Renders the main dashboard page.
fn dashboard_view(nav_bar: NavBar, data: DashboardData, now: OffsetDateTime) -> Markup {
    let nav_bar = nav_bar.into_html();
    let DashboardData {
        notices,
        budget_alerts,
        stats,
        recent_expenses,
        charts,
    } = data;

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-screen-xl space-y-6"
            {
                @if !notices.is_empty() {
                    section class="w-full space-y-2" data-notices
                    {
                        @for notice in notices {
                            (notice.into_html())
                        }
                    }
                }

                section class="grid grid-cols-1 md:grid-cols-3 gap-4"
                {
                    (stat_card("Expenses recorded", &stats.count.to_string()))
                    (stat_card("Total spent", &format_currency(stats.total)))
                    (stat_card("Average expense", &format_currency(stats.average())))
                }

                @if !budget_alerts.is_empty() {
                    (budget_alerts_view(budget_alerts))
                }

                div
                    hx-get=(endpoints::SAVINGS_TIP_VIEW)
                    hx-trigger="load"
                    hx-swap="outerHTML"
                    class=(CARD_STYLE)
                {
                    span class="inline-flex items-center gap-2"
                    {
                        (loading_spinner())
                        "Thinking of a savings tip..."
                    }
                }

                section id="charts" class="w-full"
                {
                    div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
                    {
                        @for chart in &charts {
                            div
                                id=(chart.id)
                                class="min-h-[380px] rounded dark:bg-gray-100"
                            {}
                        }
                    }
                }

                (recent_expenses_view(&recent_expenses, now))
            }
        }
    );

    let scripts = [
        HeadElement::ScriptLink("/static/echarts.6.0.0.min.js".to_owned()),
        charts_script(&charts),
    ];

    base("Dashboard", &scripts, &content)
}
