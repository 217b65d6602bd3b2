//! Expenses recorded by users, the pages for adding and reviewing them, and
//! the sums the budgets and dashboard are built from.

mod aggregate;
mod core;
mod create;
mod delete;
mod export;
mod list;

pub use aggregate::{
    CategoryFilter, CategoryTotal, ExpenseStats, get_category_totals, get_expense_stats,
    sum_expenses,
};
pub use core::{
    Expense, NewExpense, UNCATEGORIZED, create_expense, create_expense_table, delete_expense,
    get_expense, get_expenses, get_expenses_since, get_recent_expenses, round_to_cents,
};
pub use create::{
    AI_NO_RESULT_MESSAGE, create_expense_endpoint, create_expense_from_text_endpoint,
    expense_added_redirect, get_new_expense_page, record_expense,
};
pub use delete::delete_expense_endpoint;
pub use export::export_expenses_endpoint;
pub use list::{format_expense_date, get_expenses_page};
