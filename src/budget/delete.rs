use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error, alert::Alert, auth::UserID, budget::delete_budget, database_id::BudgetID,
};

/// The state needed to delete a budget.
#[derive(Debug, Clone)]
pub struct DeleteBudgetState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteBudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Delete one of the user's budgets. Expenses are not affected.
pub async fn delete_budget_endpoint(
    Path(budget_id): Path<BudgetID>,
    State(state): State<DeleteBudgetState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_budget(budget_id, user_id, &connection) {
        Ok(()) => Alert::SuccessSimple {
            message: "Budget deleted successfully".to_owned(),
        }
        .into_response(),
        Err(error) => {
            tracing::error!("Could not delete budget {budget_id}: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod delete_budget_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
    };
    use rusqlite::Connection;
    use time::OffsetDateTime;

    use crate::{
        Error,
        auth::UserID,
        budget::{BudgetPeriod, get_budget, upsert_budget},
        db::initialize,
        expense::{NewExpense, create_expense, get_expenses},
    };

    use super::{DeleteBudgetState, delete_budget_endpoint};

    fn get_state() -> DeleteBudgetState {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
            .execute_batch(
                "INSERT INTO user (id, username, password) VALUES (1, 'alice', 'hash');
                INSERT INTO user (id, username, password) VALUES (2, 'bob', 'hash');",
            )
            .unwrap();

        DeleteBudgetState {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    fn insert_budget(state: &DeleteBudgetState, user_id: i64) -> i64 {
        let connection = state.db_connection.lock().unwrap();

        upsert_budget(
            UserID::new(user_id),
            None,
            BudgetPeriod::Monthly,
            500.0,
            OffsetDateTime::now_utc(),
            &connection,
        )
        .unwrap()
        .budget()
        .id
    }

    #[tokio::test]
    async fn deletes_budget_and_keeps_expenses() {
        let state = get_state();
        let budget_id = insert_budget(&state, 1);
        create_expense(
            NewExpense {
                item: "Tea".to_owned(),
                amount: 40.0,
                category_id: None,
                raw_text: String::new(),
            },
            UserID::new(1),
            OffsetDateTime::now_utc(),
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();

        let response = delete_budget_endpoint(
            Path(budget_id),
            State(state.clone()),
            Extension(UserID::new(1)),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let connection = state.db_connection.lock().unwrap();
        assert_eq!(
            get_budget(budget_id, UserID::new(1), &connection),
            Err(Error::NotFound)
        );
        assert_eq!(get_expenses(UserID::new(1), &connection).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_budget_is_not_found() {
        let state = get_state();

        let response =
            delete_budget_endpoint(Path(42), State(state), Extension(UserID::new(1))).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cannot_delete_other_users_budget() {
        let state = get_state();
        let budget_id = insert_budget(&state, 2);

        let response = delete_budget_endpoint(
            Path(budget_id),
            State(state.clone()),
            Extension(UserID::new(1)),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let connection = state.db_connection.lock().unwrap();
        assert!(get_budget(budget_id, UserID::new(2), &connection).is_ok());
    }
}
