//! Defines the expense model and the database queries for creating, reading and deleting expenses.

use rusqlite::{Connection, Row, types::Type};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    database_id::{CategoryID, ExpenseID},
};

// ============================================================================
// MODELS
// ============================================================================

/// Money spent by a user on a single item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expense {
    /// The ID of the expense.
    pub id: ExpenseID,
    /// The user who recorded the expense.
    pub user_id: UserID,
    /// What the money was spent on, e.g. "Burger".
    pub item: String,
    /// The amount spent, rounded to cents.
    pub amount: f64,
    /// The category of the expense, `None` if it was never set or the category no longer exists.
    pub category_id: Option<CategoryID>,
    /// The name of the category, joined from the category table.
    pub category_name: Option<String>,
    /// The text the user typed in when recording the expense.
    pub raw_text: String,
    /// When the expense was recorded. Never changes after creation.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Expense {
    /// The category name to show the user, "Uncategorized" if the expense has no category.
    pub fn category_label(&self) -> &str {
        self.category_name.as_deref().unwrap_or(UNCATEGORIZED)
    }
}

/// The label used for expenses without a category.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// The data needed to record a new expense.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub item: String,
    pub amount: f64,
    pub category_id: Option<CategoryID>,
    pub raw_text: String,
}

/// Round `amount` to whole cents.
pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const SELECT_EXPENSE: &str = "SELECT expense.id, expense.user_id, expense.item, expense.amount, \
    expense.category_id, category.name, expense.raw_text, expense.created_at \
    FROM expense LEFT JOIN category ON category.id = expense.category_id";

/// Record a new expense for `user_id` created at `created_at`.
///
/// The amount is rounded to cents before it is stored.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error,
/// e.g. the category or user does not exist.
pub fn create_expense(
    new_expense: NewExpense,
    user_id: UserID,
    created_at: OffsetDateTime,
    connection: &Connection,
) -> Result<Expense, Error> {
    connection.execute(
        "INSERT INTO expense (user_id, item, amount, category_id, raw_text, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            user_id.as_i64(),
            &new_expense.item,
            round_to_cents(new_expense.amount),
            new_expense.category_id,
            &new_expense.raw_text,
            created_at.unix_timestamp(),
        ),
    )?;

    get_expense(connection.last_insert_rowid(), user_id, connection)
}

/// Retrieve the expense `id` owned by `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to an expense owned by `user_id`,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_expense(id: ExpenseID, user_id: UserID, connection: &Connection) -> Result<Expense, Error> {
    connection
        .prepare(&format!(
            "{SELECT_EXPENSE} WHERE expense.id = ?1 AND expense.user_id = ?2"
        ))?
        .query_row((id, user_id.as_i64()), map_expense_row)
        .map_err(|error| error.into())
}

/// Retrieve all of a user's expenses, newest first.
pub fn get_expenses(user_id: UserID, connection: &Connection) -> Result<Vec<Expense>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_EXPENSE} WHERE expense.user_id = ?1 \
            ORDER BY expense.created_at DESC, expense.id DESC"
        ))?
        .query_map([user_id.as_i64()], map_expense_row)?
        .map(|maybe_expense| maybe_expense.map_err(Error::from))
        .collect()
}

/// Retrieve a user's `limit` most recent expenses, newest first.
pub fn get_recent_expenses(
    user_id: UserID,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<Expense>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_EXPENSE} WHERE expense.user_id = ?1 \
            ORDER BY expense.created_at DESC, expense.id DESC LIMIT ?2"
        ))?
        .query_map((user_id.as_i64(), limit), map_expense_row)?
        .map(|maybe_expense| maybe_expense.map_err(Error::from))
        .collect()
}

/// Retrieve a user's expenses created at or after `since`, oldest first.
pub fn get_expenses_since(
    user_id: UserID,
    since: OffsetDateTime,
    connection: &Connection,
) -> Result<Vec<Expense>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_EXPENSE} WHERE expense.user_id = ?1 AND expense.created_at >= ?2 \
            ORDER BY expense.created_at ASC, expense.id ASC"
        ))?
        .query_map((user_id.as_i64(), since.unix_timestamp()), map_expense_row)?
        .map(|maybe_expense| maybe_expense.map_err(Error::from))
        .collect()
}

/// Delete the expense `id` owned by `user_id`.
///
/// # Errors
/// Returns [Error::DeleteMissingExpense] if the user has no expense with that ID.
pub fn delete_expense(id: ExpenseID, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM expense WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingExpense);
    }

    Ok(())
}

/// Create the expense table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS expense (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            item TEXT NOT NULL,
            amount REAL NOT NULL,
            category_id INTEGER,
            raw_text TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL
        );

        CREATE INDEX IF NOT EXISTS idx_expense_user_created_at ON expense(user_id, created_at);",
    )?;

    Ok(())
}

/// Map a database row to an Expense.
///
/// Expects the columns in the order of `SELECT_EXPENSE`.
fn map_expense_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    let timestamp: i64 = row.get(7)?;
    let created_at = OffsetDateTime::from_unix_timestamp(timestamp).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(7, Type::Integer, Box::new(error))
    })?;

    Ok(Expense {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        item: row.get(2)?,
        amount: row.get(3)?,
        category_id: row.get(4)?,
        category_name: row.get(5)?,
        raw_text: row.get(6)?,
        created_at,
    })
}
