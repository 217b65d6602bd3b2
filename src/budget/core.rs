//! Defines the budget model and the database queries for managing budgets.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, types::Type};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    category::get_category,
    database_id::{BudgetID, CategoryID},
    expense::round_to_cents,
};

/// The recurring window a budget applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl BudgetPeriod {
    /// All periods in order from shortest to longest.
    pub const ALL: [BudgetPeriod; 4] = [
        BudgetPeriod::Daily,
        BudgetPeriod::Weekly,
        BudgetPeriod::Monthly,
        BudgetPeriod::Yearly,
    ];

    /// The lowercase name stored in the database, e.g. "monthly".
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetPeriod::Daily => "daily",
            BudgetPeriod::Weekly => "weekly",
            BudgetPeriod::Monthly => "monthly",
            BudgetPeriod::Yearly => "yearly",
        }
    }

    /// The capitalised name shown to the user, e.g. "Monthly".
    pub fn label(&self) -> &'static str {
        match self {
            BudgetPeriod::Daily => "Daily",
            BudgetPeriod::Weekly => "Weekly",
            BudgetPeriod::Monthly => "Monthly",
            BudgetPeriod::Yearly => "Yearly",
        }
    }
}

impl FromStr for BudgetPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(BudgetPeriod::Daily),
            "weekly" => Ok(BudgetPeriod::Weekly),
            "monthly" => Ok(BudgetPeriod::Monthly),
            "yearly" => Ok(BudgetPeriod::Yearly),
            other => Err(format!("unknown budget period \"{other}\"")),
        }
    }
}

impl Display for BudgetPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A spending limit for one user over a recurring period.
///
/// A budget without a category is an overall budget that covers every expense.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Budget {
    pub id: BudgetID,
    pub user_id: UserID,
    pub category_id: Option<CategoryID>,
    /// The name of the category, joined from the category table.
    pub category_name: Option<String>,
    /// The spending limit for one period.
    pub amount: f64,
    pub period: BudgetPeriod,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// The label used for budgets that cover every category.
pub const OVERALL: &str = "Overall";

impl Budget {
    /// The category name to show the user, "Overall" for an overall budget.
    pub fn scope_label(&self) -> &str {
        self.category_name.as_deref().unwrap_or(OVERALL)
    }
}

/// Whether [upsert_budget] created a new budget or changed an existing one.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    Created(Budget),
    Updated(Budget),
}

impl UpsertOutcome {
    /// The budget that was created or updated.
    pub fn budget(&self) -> &Budget {
        match self {
            UpsertOutcome::Created(budget) | UpsertOutcome::Updated(budget) => budget,
        }
    }
}

/// Check that a budget limit is a finite, non-negative amount and round it to cents.
///
/// # Errors
/// Returns [Error::InvalidBudgetAmount] for negative, infinite or NaN amounts.
pub fn validate_budget_amount(amount: f64) -> Result<f64, Error> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(round_to_cents(amount))
    } else {
        Err(Error::InvalidBudgetAmount(amount))
    }
}

/// Check that `category_id` refers to an existing category. An overall budget
/// has no category and always passes.
///
/// # Errors
/// Returns [Error::NotFound] if there is no category with that ID.
pub fn check_category_exists(
    category_id: Option<CategoryID>,
    connection: &Connection,
) -> Result<(), Error> {
    match category_id {
        Some(category_id) => get_category(category_id, connection).map(|_| ()),
        None => Ok(()),
    }
}

const SELECT_BUDGET: &str = "SELECT budget.id, budget.user_id, budget.category_id, category.name, \
    budget.amount, budget.period, budget.created_at, budget.updated_at \
    FROM budget LEFT JOIN category ON category.id = budget.category_id";

/// Set the limit of the user's budget for `category_id` and `period`, creating
/// the budget if it does not exist yet.
///
/// # Errors
/// Returns [Error::InvalidBudgetAmount] if `amount` is negative or not finite.
pub fn upsert_budget(
    user_id: UserID,
    category_id: Option<CategoryID>,
    period: BudgetPeriod,
    amount: f64,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<UpsertOutcome, Error> {
    let amount = validate_budget_amount(amount)?;
    let timestamp = now.unix_timestamp();

    let existing_id: Option<BudgetID> = connection
        .query_row(
            "SELECT id FROM budget WHERE user_id = ?1 AND category_id IS ?2 AND period = ?3",
            (user_id.as_i64(), category_id, period.as_str()),
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            error => Err(error),
        })?;

    match existing_id {
        Some(id) => {
            connection.execute(
                "UPDATE budget SET amount = ?1, updated_at = ?2 WHERE id = ?3",
                (amount, timestamp, id),
            )?;

            Ok(UpsertOutcome::Updated(get_budget(id, user_id, connection)?))
        }
        None => {
            connection.execute(
                "INSERT INTO budget (user_id, category_id, amount, period, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                (
                    user_id.as_i64(),
                    category_id,
                    amount,
                    period.as_str(),
                    timestamp,
                ),
            )?;

            let id = connection.last_insert_rowid();

            Ok(UpsertOutcome::Created(get_budget(id, user_id, connection)?))
        }
    }
}

/// Change the category, period and limit of the budget `id` owned by `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidBudgetAmount] if `amount` is negative or not finite,
/// - [Error::UpdateMissingBudget] if the user has no budget with that ID,
/// - or [Error::DuplicateBudget] if another of the user's budgets already
///   covers the same category and period.
pub fn update_budget(
    id: BudgetID,
    user_id: UserID,
    category_id: Option<CategoryID>,
    period: BudgetPeriod,
    amount: f64,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Budget, Error> {
    let amount = validate_budget_amount(amount)?;

    let rows_affected = connection.execute(
        "UPDATE budget SET category_id = ?1, period = ?2, amount = ?3, updated_at = ?4
        WHERE id = ?5 AND user_id = ?6",
        (
            category_id,
            period.as_str(),
            amount,
            now.unix_timestamp(),
            id,
            user_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingBudget);
    }

    get_budget(id, user_id, connection)
}

/// Retrieve the budget `id` owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the user has no budget with that ID.
pub fn get_budget(id: BudgetID, user_id: UserID, connection: &Connection) -> Result<Budget, Error> {
    connection
        .prepare(&format!(
            "{SELECT_BUDGET} WHERE budget.id = ?1 AND budget.user_id = ?2"
        ))?
        .query_row((id, user_id.as_i64()), map_budget_row)
        .map_err(|error| error.into())
}

/// Retrieve all of a user's budgets, newest first.
pub fn get_budgets(user_id: UserID, connection: &Connection) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_BUDGET} WHERE budget.user_id = ?1 \
            ORDER BY budget.created_at DESC, budget.id DESC"
        ))?
        .query_map([user_id.as_i64()], map_budget_row)?
        .map(|maybe_budget| maybe_budget.map_err(Error::from))
        .collect()
}

/// Retrieve the user's budgets that cover expenses in `category_id`.
///
/// These are the budgets for that category plus the overall budgets.
pub fn get_budgets_covering(
    user_id: UserID,
    category_id: Option<CategoryID>,
    connection: &Connection,
) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_BUDGET} WHERE budget.user_id = ?1 \
            AND (budget.category_id IS NULL OR budget.category_id IS ?2) \
            ORDER BY budget.created_at DESC, budget.id DESC"
        ))?
        .query_map((user_id.as_i64(), category_id), map_budget_row)?
        .map(|maybe_budget| maybe_budget.map_err(Error::from))
        .collect()
}

/// Delete the budget `id` owned by `user_id`.
///
/// # Errors
/// Returns [Error::DeleteMissingBudget] if the user has no budget with that ID.
pub fn delete_budget(id: BudgetID, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM budget WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingBudget);
    }

    Ok(())
}

/// Create the budget table in the database.
///
/// The unique index treats a missing category as its own value, so a user can
/// only have one overall budget per period.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            category_id INTEGER,
            amount REAL NOT NULL,
            period TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_budget_scope
            ON budget(user_id, COALESCE(category_id, 0), period);",
    )?;

    Ok(())
}

fn timestamp_column(row: &Row, index: usize) -> Result<OffsetDateTime, rusqlite::Error> {
    let timestamp: i64 = row.get(index)?;

    OffsetDateTime::from_unix_timestamp(timestamp).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Integer, Box::new(error))
    })
}

/// Map a database row to a Budget.
///
/// Expects the columns in the order of `SELECT_BUDGET`.
fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    let id: BudgetID = row.get(0)?;
    let raw_period: String = row.get(5)?;
    let period = raw_period.parse::<BudgetPeriod>().unwrap_or_else(|error| {
        tracing::warn!("Budget {id} has {error}, treating it as monthly");
        BudgetPeriod::Monthly
    });

    Ok(Budget {
        id,
        user_id: UserID::new(row.get(1)?),
        category_id: row.get(2)?,
        category_name: row.get(3)?,
        amount: row.get(4)?,
        period,
        created_at: timestamp_column(row, 6)?,
        updated_at: timestamp_column(row, 7)?,
    })
}

#[cfg(test)]
mod budget_query_tests {
    use rusqlite::Connection;
    use time::{Duration, macros::datetime};

    use crate::{
        Error,
        auth::UserID,
        budget::{
            BudgetPeriod, UpsertOutcome, delete_budget, get_budget, get_budgets,
            get_budgets_covering, update_budget, upsert_budget,
        },
        category::{CategoryName, get_or_create_category},
        db::initialize,
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
            .execute_batch(
                "INSERT INTO user (id, username, password) VALUES (1, 'alice', 'hash');
                INSERT INTO user (id, username, password) VALUES (2, 'bob', 'hash');",
            )
            .unwrap();
        connection
    }

    fn category(connection: &Connection, name: &str) -> i64 {
        get_or_create_category(CategoryName::new_unchecked(name), connection)
            .unwrap()
            .id
    }

    #[test]
    fn period_parses_stored_names() {
        for period in BudgetPeriod::ALL {
            assert_eq!(period.as_str().parse::<BudgetPeriod>(), Ok(period));
        }
        assert!("fortnightly".parse::<BudgetPeriod>().is_err());
    }

    #[test]
    fn upsert_creates_then_updates() {
        let connection = get_test_connection();
        let food = category(&connection, "Food");
        let now = datetime!(2025-06-01 9:00 UTC);

        let created = upsert_budget(
            UserID::new(1),
            Some(food),
            BudgetPeriod::Weekly,
            250.0,
            now,
            &connection,
        )
        .unwrap();
        let updated = upsert_budget(
            UserID::new(1),
            Some(food),
            BudgetPeriod::Weekly,
            300.0,
            now + Duration::hours(1),
            &connection,
        )
        .unwrap();

        let created = match created {
            UpsertOutcome::Created(budget) => budget,
            other => panic!("want created budget, got {other:?}"),
        };
        let updated = match updated {
            UpsertOutcome::Updated(budget) => budget,
            other => panic!("want updated budget, got {other:?}"),
        };
        assert_eq!(created.id, updated.id);
        assert_eq!(updated.amount, 300.0);
        assert_eq!(updated.scope_label(), "Food");
        assert_eq!(updated.created_at, now);
        assert_eq!(updated.updated_at, now + Duration::hours(1));
        assert_eq!(get_budgets(UserID::new(1), &connection).unwrap().len(), 1);
    }

    #[test]
    fn upsert_overall_budget_is_unique_per_period() {
        let connection = get_test_connection();
        let now = datetime!(2025-06-01 9:00 UTC);

        upsert_budget(UserID::new(1), None, BudgetPeriod::Monthly, 1000.0, now, &connection)
            .unwrap();
        let second =
            upsert_budget(UserID::new(1), None, BudgetPeriod::Monthly, 2000.0, now, &connection)
                .unwrap();

        assert!(matches!(second, UpsertOutcome::Updated(_)));
        assert_eq!(second.budget().scope_label(), "Overall");
        assert_eq!(get_budgets(UserID::new(1), &connection).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_overall_budget_insert_is_rejected() {
        let connection = get_test_connection();
        let insert = "INSERT INTO budget (user_id, category_id, amount, period, created_at, updated_at) \
            VALUES (1, NULL, 100, 'monthly', 0, 0)";
        connection.execute(insert, []).unwrap();

        let result = connection.execute(insert, []).map_err(Error::from);

        assert_eq!(result, Err(Error::DuplicateBudget));
    }

    #[test]
    fn upsert_rejects_negative_amount() {
        let connection = get_test_connection();

        let result = upsert_budget(
            UserID::new(1),
            None,
            BudgetPeriod::Daily,
            -1.0,
            datetime!(2025-06-01 9:00 UTC),
            &connection,
        );

        assert_eq!(result, Err(Error::InvalidBudgetAmount(-1.0)));
    }

    #[test]
    fn update_budget_changes_scope() {
        let connection = get_test_connection();
        let food = category(&connection, "Food");
        let now = datetime!(2025-06-01 9:00 UTC);
        let budget =
            upsert_budget(UserID::new(1), None, BudgetPeriod::Monthly, 1000.0, now, &connection)
                .unwrap();

        let updated = update_budget(
            budget.budget().id,
            UserID::new(1),
            Some(food),
            BudgetPeriod::Yearly,
            5000.0,
            now,
            &connection,
        )
        .unwrap();

        assert_eq!(updated.category_id, Some(food));
        assert_eq!(updated.period, BudgetPeriod::Yearly);
        assert_eq!(updated.amount, 5000.0);
    }

    #[test]
    fn update_budget_into_existing_scope_is_duplicate() {
        let connection = get_test_connection();
        let now = datetime!(2025-06-01 9:00 UTC);
        upsert_budget(UserID::new(1), None, BudgetPeriod::Monthly, 1000.0, now, &connection)
            .unwrap();
        let weekly =
            upsert_budget(UserID::new(1), None, BudgetPeriod::Weekly, 200.0, now, &connection)
                .unwrap();

        let result = update_budget(
            weekly.budget().id,
            UserID::new(1),
            None,
            BudgetPeriod::Monthly,
            200.0,
            now,
            &connection,
        );

        assert_eq!(result, Err(Error::DuplicateBudget));
    }

    #[test]
    fn other_users_budget_is_not_found() {
        let connection = get_test_connection();
        let now = datetime!(2025-06-01 9:00 UTC);
        let budget =
            upsert_budget(UserID::new(1), None, BudgetPeriod::Monthly, 1000.0, now, &connection)
                .unwrap();
        let id = budget.budget().id;

        assert_eq!(get_budget(id, UserID::new(2), &connection), Err(Error::NotFound));
        assert_eq!(
            update_budget(id, UserID::new(2), None, BudgetPeriod::Daily, 1.0, now, &connection),
            Err(Error::UpdateMissingBudget)
        );
        assert_eq!(
            delete_budget(id, UserID::new(2), &connection),
            Err(Error::DeleteMissingBudget)
        );
        assert!(get_budget(id, UserID::new(1), &connection).is_ok());
    }

    #[test]
    fn delete_budget_succeeds() {
        let connection = get_test_connection();
        let now = datetime!(2025-06-01 9:00 UTC);
        let budget =
            upsert_budget(UserID::new(1), None, BudgetPeriod::Monthly, 1000.0, now, &connection)
                .unwrap();

        delete_budget(budget.budget().id, UserID::new(1), &connection).unwrap();

        assert!(get_budgets(UserID::new(1), &connection).unwrap().is_empty());
    }

    #[test]
    fn budgets_are_newest_first() {
        let connection = get_test_connection();
        let now = datetime!(2025-06-01 9:00 UTC);
        upsert_budget(UserID::new(1), None, BudgetPeriod::Monthly, 1.0, now, &connection).unwrap();
        upsert_budget(
            UserID::new(1),
            None,
            BudgetPeriod::Daily,
            1.0,
            now + Duration::days(1),
            &connection,
        )
        .unwrap();

        let periods: Vec<BudgetPeriod> = get_budgets(UserID::new(1), &connection)
            .unwrap()
            .into_iter()
            .map(|budget| budget.period)
            .collect();

        assert_eq!(periods, [BudgetPeriod::Daily, BudgetPeriod::Monthly]);
    }

    #[test]
    fn covering_budgets_include_overall_and_same_category() {
        let connection = get_test_connection();
        let food = category(&connection, "Food");
        let bills = category(&connection, "Bills");
        let now = datetime!(2025-06-01 9:00 UTC);
        for category_id in [None, Some(food), Some(bills)] {
            upsert_budget(
                UserID::new(1),
                category_id,
                BudgetPeriod::Monthly,
                100.0,
                now,
                &connection,
            )
            .unwrap();
        }

        let covering = get_budgets_covering(UserID::new(1), Some(food), &connection).unwrap();
        let uncategorized = get_budgets_covering(UserID::new(1), None, &connection).unwrap();

        let mut scopes: Vec<Option<i64>> =
            covering.iter().map(|budget| budget.category_id).collect();
        scopes.sort();
        assert_eq!(scopes, [None, Some(food)]);
        assert_eq!(uncategorized.len(), 1);
        assert_eq!(uncategorized[0].category_id, None);
    }

    #[test]
    fn unknown_stored_period_reads_as_monthly() {
        let connection = get_test_connection();
        connection
            .execute(
                "INSERT INTO budget (user_id, category_id, amount, period, created_at, updated_at) \
                VALUES (1, NULL, 100, 'fortnightly', 0, 0)",
                [],
            )
            .unwrap();

        let budgets = get_budgets(UserID::new(1), &connection).unwrap();

        assert_eq!(budgets[0].period, BudgetPeriod::Monthly);
    }
}
