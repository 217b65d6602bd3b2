//! Sets up the SQLite database used by the application.

use rusqlite::{Connection, TransactionBehavior};

use crate::{
    Error, auth::create_user_table, budget::create_budget_table,
    category::create_category_table, expense::create_expense_table,
};

/// Create the tables for users, categories, expenses and budgets if they do not exist.
///
/// Foreign key enforcement is switched on for `connection` so that budgets
/// cascade with their owner and category.
///
/// # Errors
/// Returns an error if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // The pragma is a no-op inside a transaction, so it must be set first.
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;

    let transaction =
        rusqlite::Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_category_table(&transaction)?;
    create_expense_table(&transaction)?;
    create_budget_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
