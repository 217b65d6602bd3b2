//! Works out where a budget's current period starts and how much of the budget has been spent.

use rusqlite::Connection;
use time::{Duration, OffsetDateTime, Time};

use crate::{
    Error,
    auth::UserID,
    budget::{Budget, BudgetPeriod, get_budgets},
    expense::{round_to_cents, sum_expenses},
};

/// The start of the period containing `now`, at midnight in `now`'s offset.
///
/// Weeks start on Monday.
pub fn period_start(period: BudgetPeriod, now: OffsetDateTime) -> OffsetDateTime {
    let today = now.date();

    let days_since_start = match period {
        BudgetPeriod::Daily => 0,
        BudgetPeriod::Weekly => i64::from(today.weekday().number_days_from_monday()),
        BudgetPeriod::Monthly => i64::from(today.day()) - 1,
        BudgetPeriod::Yearly => i64::from(today.ordinal()) - 1,
    };

    (now - Duration::days(days_since_start)).replace_time(Time::MIDNIGHT)
}

/// How much of a budget has been spent in its current period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetStatus {
    /// The total of the matching expenses since the period started.
    pub spent: f64,
    /// The limit minus what has been spent, negative once the budget is exceeded.
    pub remaining: f64,
    /// Spent as a percentage of the limit, zero for a zero limit.
    pub percentage_used: f64,
    /// Whether more than the limit has been spent.
    pub is_exceeded: bool,
}

impl BudgetStatus {
    /// Derive the status of a budget with the limit `amount` after spending `spent`.
    pub fn new(amount: f64, spent: f64) -> Self {
        let percentage_used = if amount > 0.0 {
            spent / amount * 100.0
        } else {
            0.0
        };

        Self {
            spent,
            remaining: round_to_cents(amount - spent),
            percentage_used,
            is_exceeded: spent > amount,
        }
    }

    /// Aggregate the expenses covered by `budget` in the period containing `now`.
    pub fn for_budget(
        budget: &Budget,
        now: OffsetDateTime,
        connection: &Connection,
    ) -> Result<Self, Error> {
        let spent = get_spent_amount(budget, now, connection)?;

        Ok(Self::new(budget.amount, spent))
    }
}

/// The total of the owner's expenses in the budget's current period.
///
/// Only expenses in the budget's category count, unless it is an overall budget.
pub fn get_spent_amount(
    budget: &Budget,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<f64, Error> {
    sum_expenses(
        budget.user_id,
        period_start(budget.period, now),
        budget.category_id.into(),
        connection,
    )
}

/// A budget together with its status for the current period.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetWithStatus {
    pub budget: Budget,
    pub status: BudgetStatus,
}

/// Attach the current status to each budget.
pub fn with_status(
    budgets: Vec<Budget>,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Vec<BudgetWithStatus>, Error> {
    budgets
        .into_iter()
        .map(|budget| {
            let status = BudgetStatus::for_budget(&budget, now, connection)?;
            Ok(BudgetWithStatus { budget, status })
        })
        .collect()
}

/// All of a user's budgets with their current status, newest first.
pub fn get_budgets_with_status(
    user_id: UserID,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Vec<BudgetWithStatus>, Error> {
    let budgets = get_budgets(user_id, connection)?;

    with_status(budgets, now, connection)
}
