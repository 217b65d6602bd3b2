//! Sums and counts over a user's expenses.

use rusqlite::Connection;
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    database_id::CategoryID,
    expense::{UNCATEGORIZED, round_to_cents},
};

/// The total spent in one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// The category name, "Uncategorized" for expenses without a category.
    pub category: String,
    pub total: f64,
}

/// How many expenses a user has recorded and how much they add up to.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExpenseStats {
    pub count: u32,
    pub total: f64,
}

impl ExpenseStats {
    /// The mean expense amount, zero when there are no expenses.
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            round_to_cents(self.total / f64::from(self.count))
        }
    }
}

/// Which expenses [sum_expenses] adds up by category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CategoryFilter {
    /// Every expense regardless of category.
    Any,
    /// Only expenses in the given category.
    Only(CategoryID),
}

impl From<Option<CategoryID>> for CategoryFilter {
    fn from(category_id: Option<CategoryID>) -> Self {
        match category_id {
            Some(id) => CategoryFilter::Only(id),
            None => CategoryFilter::Any,
        }
    }
}

/// Sum the amounts of a user's expenses created at or after `since`.
///
/// Returns zero if no expenses match.
pub fn sum_expenses(
    user_id: UserID,
    since: OffsetDateTime,
    category: CategoryFilter,
    connection: &Connection,
) -> Result<f64, Error> {
    let total: f64 = match category {
        CategoryFilter::Any => connection.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM expense \
            WHERE user_id = ?1 AND created_at >= ?2",
            (user_id.as_i64(), since.unix_timestamp()),
            |row| row.get(0),
        )?,
        CategoryFilter::Only(category_id) => connection.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM expense \
            WHERE user_id = ?1 AND created_at >= ?2 AND category_id = ?3",
            (user_id.as_i64(), since.unix_timestamp(), category_id),
            |row| row.get(0),
        )?,
    };

    Ok(round_to_cents(total))
}

/// Total a user's spending per category, largest total first.
///
/// Only expenses created at or after `since` are counted when it is given.
pub fn get_category_totals(
    user_id: UserID,
    since: Option<OffsetDateTime>,
    connection: &Connection,
) -> Result<Vec<CategoryTotal>, Error> {
    // Unix time zero is before any expense could have been recorded.
    let since = since.map_or(0, OffsetDateTime::unix_timestamp);

    connection
        .prepare(
            "SELECT category.name, SUM(expense.amount) AS total
            FROM expense LEFT JOIN category ON category.id = expense.category_id
            WHERE expense.user_id = ?1 AND expense.created_at >= ?2
            GROUP BY expense.category_id
            ORDER BY total DESC, category.name ASC",
        )?
        .query_map((user_id.as_i64(), since), |row| {
            let name: Option<String> = row.get(0)?;
            let total: f64 = row.get(1)?;

            Ok(CategoryTotal {
                category: name.unwrap_or_else(|| UNCATEGORIZED.to_owned()),
                total: round_to_cents(total),
            })
        })?
        .map(|maybe_total| maybe_total.map_err(Error::from))
        .collect()
}

/// Count and total all of a user's expenses.
pub fn get_expense_stats(user_id: UserID, connection: &Connection) -> Result<ExpenseStats, Error> {
    let (count, total): (u32, f64) = connection.query_row(
        "SELECT COUNT(id), COALESCE(SUM(amount), 0) FROM expense WHERE user_id = ?1",
        [user_id.as_i64()],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(ExpenseStats {
        count,
        total: round_to_cents(total),
    })
}
