//! The expense history page.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::{UtcOffset, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    AppState, Error,
    auth::UserID,
    endpoints,
    expense::{Expense, get_expenses},
    html::{
        CATEGORY_BADGE_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, delete_button, format_currency,
    },
    navigation::NavBar,
    timezone::get_local_offset,
};

/// How expense timestamps are shown, e.g. "2025-06-18 14:05".
pub const EXPENSE_DATE_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

/// Format when an expense was recorded in the local timezone.
pub fn format_expense_date(expense: &Expense, local_offset: UtcOffset) -> String {
    expense
        .created_at
        .to_offset(local_offset)
        .format(EXPENSE_DATE_FORMAT)
        .unwrap_or_else(|error| {
            tracing::error!("Could not format date of expense {}: {error}", expense.id);
            expense.created_at.date().to_string()
        })
}

/// The state needed for the expense history page.
#[derive(Debug, Clone)]
pub struct ExpensesPageState {
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kathmandu".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ExpensesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render all of the user's expenses, newest first.
pub async fn get_expenses_page(
    State(state): State<ExpensesPageState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let local_offset = get_local_offset(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let expenses = get_expenses(user_id, &connection)
        .inspect_err(|error| tracing::error!("Could not get expenses for {user_id}: {error}"))?;

    Ok(expenses_view(&expenses, local_offset).into_response())
}

fn export_link(format: &str, label: &str) -> Markup {
    let url = endpoints::EXPORT_EXPENSES.replace("{format}", format);

    html! {
        a href=(url) class=(LINK_STYLE) data-export=(format) { (label) }
    }
}

fn expenses_view(expenses: &[Expense], local_offset: UtcOffset) -> Markup {
    let nav_bar = NavBar::new(endpoints::EXPENSES_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full lg:max-w-5xl"
            {
                header class="flex justify-between flex-wrap items-end gap-4"
                {
                    h1 class="text-xl font-bold" { "Expense History" }

                    div class="flex gap-4"
                    {
                        a href=(endpoints::NEW_EXPENSE_VIEW) class=(LINK_STYLE) { "Add Expense" }
                        (export_link("csv", "Export CSV"))
                        (export_link("pdf", "Export PDF"))
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
                                th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Item" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                                th scope="col" class="px-6 py-4 text-right" { "Amount" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for expense in expenses {
                                @let delete_url = endpoints::format_endpoint(
                                    endpoints::DELETE_EXPENSE,
                                    expense.id,
                                );
                                @let confirm_message = format!(
                                    "Are you sure you want to delete '{}'?",
                                    expense.item
                                );

                                tr class=(TABLE_ROW_STYLE) data-expense-row
                                {
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        (format_expense_date(expense, local_offset))
                                    }
                                    td class=(TABLE_CELL_STYLE) title=(expense.raw_text)
                                    {
                                        (expense.item)
                                    }
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        span class=(CATEGORY_BADGE_STYLE)
                                        {
                                            (expense.category_label())
                                        }
                                    }
                                    td class="px-6 py-4 text-right"
                                    {
                                        (format_currency(expense.amount))
                                    }
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        (delete_button(&delete_url, &confirm_message, "closest tr"))
                                    }
                                }
                            }

                            @if expenses.is_empty() {
                                tr
                                {
                                    td
                                        colspan="5"
                                        class="px-6 py-4 text-center text-gray-500 dark:text-gray-400"
                                    {
                                        "No expenses recorded yet. "
                                        a href=(endpoints::NEW_EXPENSE_VIEW) class=(LINK_STYLE)
                                        {
                                            "Add your first expense"
                                        }
                                        "."
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Expense History", &[], &content)
}

#[cfg(test)]
mod expenses_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use rusqlite::Connection;
    use scraper::Selector;
    use time::{UtcOffset, macros::datetime};

    use crate::{
        auth::UserID,
        db::initialize,
        expense::{NewExpense, create_expense},
        test_utils::{assert_valid_html, parse_html_document},
    };

    use super::{ExpensesPageState, format_expense_date, get_expenses_page};

    fn get_state() -> ExpensesPageState {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
            .execute_batch(
                "INSERT INTO user (id, username, password) VALUES (1, 'alice', 'hash');
                INSERT INTO user (id, username, password) VALUES (2, 'bob', 'hash');",
            )
            .unwrap();

        ExpensesPageState {
            local_timezone: "Etc/UTC".to_owned(),
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    fn insert(state: &ExpensesPageState, user_id: i64, item: &str, created_at: time::OffsetDateTime) {
        create_expense(
            NewExpense {
                item: item.to_owned(),
                amount: 12.5,
                category_id: None,
                raw_text: format!("{item} 12.5"),
            },
            UserID::new(user_id),
            created_at,
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn lists_own_expenses_newest_first() {
        let state = get_state();
        insert(&state, 1, "Coffee", datetime!(2025-06-01 8:00 UTC));
        insert(&state, 1, "Lunch", datetime!(2025-06-02 12:30 UTC));
        insert(&state, 2, "Rent", datetime!(2025-06-03 9:00 UTC));

        let response = get_expenses_page(State(state), Extension(UserID::new(1)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let items: Vec<String> = html
            .select(&Selector::parse("tr[data-expense-row] td:nth-child(2)").unwrap())
            .map(|cell| cell.text().collect::<String>().trim().to_owned())
            .collect();
        assert_eq!(items, ["Lunch", "Coffee"]);
        let buttons_selector = Selector::parse("button[hx-delete]").unwrap();
        let buttons = html.select(&buttons_selector);
        assert_eq!(buttons.count(), 2);
    }

    #[tokio::test]
    async fn has_export_links() {
        let state = get_state();

        let response = get_expenses_page(State(state), Extension(UserID::new(1)))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        let links: Vec<_> = html
            .select(&Selector::parse("a[data-export]").unwrap())
            .filter_map(|link| link.value().attr("href"))
            .collect();
        assert_eq!(links, ["/expenses/export/csv", "/expenses/export/pdf"]);
        let text: String = html.root_element().text().collect();
        assert!(text.contains("No expenses recorded yet."));
    }

    #[test]
    fn dates_are_shown_in_local_time() {
        let expense = crate::expense::Expense {
            id: 1,
            user_id: UserID::new(1),
            item: "Tea".to_owned(),
            amount: 1.0,
            category_id: None,
            category_name: None,
            raw_text: String::new(),
            created_at: datetime!(2025-06-18 20:30 UTC),
        };
        let nepal = UtcOffset::from_hms(5, 45, 0).unwrap();

        assert_eq!(format_expense_date(&expense, nepal), "2025-06-19 02:15");
    }
}
