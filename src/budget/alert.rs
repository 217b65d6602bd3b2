//! Decides which budgets need the user's attention.
//!
//! Alerts are worked out on demand and never stored.

use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    Error,
    alert::Alert,
    auth::UserID,
    budget::{BudgetStatus, BudgetWithStatus, get_budgets_covering, with_status},
    database_id::CategoryID,
    html::{format_currency, format_percentage},
};

/// Budgets at or above this percentage are flagged after recording an expense
/// and on the budget list.
pub const WARNING_THRESHOLD: f64 = 90.0;

/// Budgets at or above this percentage are flagged on the dashboard.
pub const DASHBOARD_WARNING_THRESHOLD: f64 = 80.0;

/// How serious a budget alert is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    /// More than the limit has been spent.
    Exceeded,
    /// The budget is close to its limit.
    Warning,
}

/// Classify a budget's status, flagging budgets used at or above `warning_threshold` percent.
pub fn classify(status: &BudgetStatus, warning_threshold: f64) -> Option<AlertLevel> {
    if status.is_exceeded {
        Some(AlertLevel::Exceeded)
    } else if status.percentage_used >= warning_threshold {
        Some(AlertLevel::Warning)
    } else {
        None
    }
}

/// A budget that has been exceeded or is close to its limit.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetAlert {
    pub level: AlertLevel,
    pub budget: BudgetWithStatus,
}

impl BudgetAlert {
    /// The message shown to the user, e.g.
    /// "Budget Alert! Food budget (weekly) is 92.5% used."
    pub fn message(&self) -> String {
        let BudgetWithStatus { budget, status } = &self.budget;

        match self.level {
            AlertLevel::Exceeded => format!(
                "Budget Exceeded! {} budget ({}) exceeded by {}",
                budget.scope_label(),
                budget.period,
                format_currency(status.remaining.abs())
            ),
            AlertLevel::Warning => format!(
                "Budget Alert! {} budget ({}) is {} used.",
                budget.scope_label(),
                budget.period,
                format_percentage(status.percentage_used)
            ),
        }
    }

    /// Convert into a warning that can be rendered as HTML.
    pub fn into_alert(self) -> Alert {
        let BudgetWithStatus { budget, status } = &self.budget;
        let details = format!(
            "Spent {} of {}.",
            format_currency(status.spent),
            format_currency(budget.amount)
        );

        Alert::Warning {
            message: self.message(),
            details,
        }
    }
}

/// Keep the budgets that need an alert at `warning_threshold`, in their original order.
pub fn collect_alerts(budgets: Vec<BudgetWithStatus>, warning_threshold: f64) -> Vec<BudgetAlert> {
    budgets
        .into_iter()
        .filter_map(|budget| {
            classify(&budget.status, warning_threshold).map(|level| BudgetAlert { level, budget })
        })
        .collect()
}

/// Check the budgets affected by a new expense in `category_id`.
///
/// Only the budgets for that category and the overall budgets are checked.
pub fn alerts_after_expense(
    user_id: UserID,
    category_id: Option<CategoryID>,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Vec<BudgetAlert>, Error> {
    let budgets = get_budgets_covering(user_id, category_id, connection)?;
    let budgets = with_status(budgets, now, connection)?;

    Ok(collect_alerts(budgets, WARNING_THRESHOLD))
}
