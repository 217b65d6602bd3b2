//! Spending limits per category and period, how much of them has been spent,
//! and the warnings shown when a limit is close or exceeded.

mod alert;
mod core;
mod delete;
mod engine;
mod form;
mod list;

pub use alert::{
    AlertLevel, BudgetAlert, DASHBOARD_WARNING_THRESHOLD, WARNING_THRESHOLD, alerts_after_expense,
    classify, collect_alerts,
};
pub use core::{
    Budget, BudgetPeriod, OVERALL, UpsertOutcome, check_category_exists, create_budget_table,
    delete_budget, get_budget, get_budgets, get_budgets_covering, update_budget, upsert_budget,
    validate_budget_amount,
};
pub use delete::delete_budget_endpoint;
pub use engine::{
    BudgetStatus, BudgetWithStatus, get_budgets_with_status, get_spent_amount, period_start,
    with_status,
};
pub use form::{
    create_budget_endpoint, get_edit_budget_page, get_new_budget_page, update_budget_endpoint,
};
pub use list::get_budgets_page;
