//! A small JSON API for scripted access to expenses, budgets, categories and advice.
//!
//! Errors are returned as `{"error": "..."}` with an appropriate status code.
//! Records owned by another user are reported as not found.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    ai::ExpenseAssistant,
    auth::UserID,
    budget::{
        Budget, BudgetPeriod, BudgetStatus, BudgetWithStatus, UpsertOutcome, check_category_exists,
        delete_budget, get_budget, get_budgets_with_status, update_budget, upsert_budget,
    },
    category::{
        Category, CategoryName, get_all_categories, get_category_by_name, get_or_create_category,
    },
    dashboard::get_monthly_advice,
    database_id::{BudgetID, CategoryID, ExpenseID},
    expense::{Expense, delete_expense, get_expense, get_expenses, record_expense},
    timezone::local_now,
};

/// The state needed by the JSON API.
#[derive(Debug, Clone)]
pub struct ApiState {
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kathmandu".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
    pub expense_assistant: ExpenseAssistant,
}

impl FromRef<AppState> for ApiState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
            expense_assistant: state.expense_assistant.clone(),
        }
    }
}

impl ApiState {
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db_connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            ApiError::from(Error::DatabaseLockError)
        })
    }
}

/// An error response with a JSON body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.to_owned(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        match error {
            Error::NotFound
            | Error::DeleteMissingExpense
            | Error::UpdateMissingBudget
            | Error::DeleteMissingBudget => Self {
                status: StatusCode::NOT_FOUND,
                message: "Not found.".to_owned(),
            },
            Error::EmptyCategoryName | Error::InvalidBudgetAmount(_) | Error::DuplicateBudget => {
                Self::bad_request(&error.to_string())
            }
            error => {
                tracing::error!("An unexpected error occurred: {error}");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Internal server error.".to_owned(),
                }
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected JSON body: {rejection}");
        Self::bad_request(&rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// An expense as returned by the API.
#[derive(Debug, Serialize)]
pub struct ExpenseResponse {
    id: ExpenseID,
    user: UserID,
    item: String,
    amount: f64,
    category: Option<CategoryID>,
    category_name: String,
    raw_text: String,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

impl From<Expense> for ExpenseResponse {
    fn from(expense: Expense) -> Self {
        Self {
            category_name: expense.category_label().to_owned(),
            id: expense.id,
            user: expense.user_id,
            item: expense.item,
            amount: expense.amount,
            category: expense.category_id,
            raw_text: expense.raw_text,
            created_at: expense.created_at,
        }
    }
}

/// A budget and its current status as returned by the API.
#[derive(Debug, Serialize)]
pub struct BudgetResponse {
    id: BudgetID,
    user: UserID,
    category: Option<CategoryID>,
    category_name: String,
    amount: f64,
    period: BudgetPeriod,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
    spent_amount: f64,
    remaining_amount: f64,
    percentage_used: f64,
    is_exceeded: bool,
}

impl From<BudgetWithStatus> for BudgetResponse {
    fn from(BudgetWithStatus { budget, status }: BudgetWithStatus) -> Self {
        Self {
            category_name: budget.scope_label().to_owned(),
            id: budget.id,
            user: budget.user_id,
            category: budget.category_id,
            amount: budget.amount,
            period: budget.period,
            created_at: budget.created_at,
            updated_at: budget.updated_at,
            spent_amount: status.spent,
            remaining_amount: status.remaining,
            percentage_used: status.percentage_used,
            is_exceeded: status.is_exceeded,
        }
    }
}

/// The body for creating an expense from free text.
#[derive(Debug, Deserialize)]
pub struct AiExpenseRequest {
    #[serde(default)]
    text: Option<String>,
}

/// The body for creating an expense without the AI assistant.
#[derive(Debug, Deserialize)]
pub struct ExpenseRequest {
    item: String,
    amount: f64,
    /// Created if it does not exist yet. Missing or blank leaves the expense uncategorized.
    #[serde(default)]
    category_name: Option<String>,
    #[serde(default)]
    raw_text: String,
}

/// The body for creating or editing a budget.
#[derive(Debug, Deserialize)]
pub struct BudgetRequest {
    /// Missing or null for an overall budget.
    #[serde(default)]
    category: Option<CategoryID>,
    #[serde(default)]
    period: BudgetPeriod,
    amount: f64,
}

/// The body for creating a category.
#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    name: String,
}

/// List the user's expenses, newest first.
pub async fn list_expenses(
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<ExpenseResponse>>, ApiError> {
    let connection = state.lock()?;
    let expenses = get_expenses(user_id, &connection)?;

    Ok(Json(expenses.into_iter().map(ExpenseResponse::from).collect()))
}

/// Create an expense from an item, amount and optional category name.
pub async fn create_expense(
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<ExpenseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ExpenseResponse>), ApiError> {
    let Json(request) = payload?;

    if request.item.trim().is_empty() {
        return Err(ApiError::bad_request("item field is required"));
    }

    if !request.amount.is_finite() {
        return Err(ApiError::bad_request("amount must be a number"));
    }

    let connection = state.lock()?;
    let expense = record_expense(
        &request.item,
        request.amount,
        request.category_name.as_deref(),
        &request.raw_text,
        user_id,
        OffsetDateTime::now_utc(),
        &connection,
    )
    .inspect_err(|error| tracing::error!("Could not save expense for {user_id}: {error}"))?;

    Ok((StatusCode::CREATED, Json(ExpenseResponse::from(expense))))
}

/// Get one of the user's expenses.
pub async fn retrieve_expense(
    Path(expense_id): Path<ExpenseID>,
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<ExpenseResponse>, ApiError> {
    let connection = state.lock()?;
    let expense = get_expense(expense_id, user_id, &connection)?;

    Ok(Json(ExpenseResponse::from(expense)))
}

/// Delete one of the user's expenses.
pub async fn destroy_expense(
    Path(expense_id): Path<ExpenseID>,
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
) -> Result<StatusCode, ApiError> {
    let connection = state.lock()?;
    delete_expense(expense_id, user_id, &connection)?;

    tracing::info!("User {user_id} deleted expense {expense_id} via the API");

    Ok(StatusCode::NO_CONTENT)
}

/// Create an expense from free text using the AI assistant.
pub async fn create_expense_with_ai(
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<AiExpenseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ExpenseResponse>), ApiError> {
    let Json(request) = payload?;
    let text = request.text.as_deref().map(str::trim).unwrap_or_default();

    if text.is_empty() {
        return Err(ApiError::bad_request("text field is required"));
    }

    let candidate = state
        .expense_assistant
        .parse_expense(text)
        .await
        .ok_or_else(|| ApiError::bad_request("AI could not parse the text"))?;

    let connection = state.lock()?;
    let expense = record_expense(
        &candidate.item,
        candidate.amount,
        Some(&candidate.category),
        text,
        user_id,
        OffsetDateTime::now_utc(),
        &connection,
    )
    .inspect_err(|error| tracing::error!("Could not save expense for {user_id}: {error}"))?;

    tracing::info!("User {user_id} added expense {} via the API", expense.id);

    Ok((StatusCode::CREATED, Json(ExpenseResponse::from(expense))))
}

/// List the user's budgets with how much has been spent in the current period.
pub async fn list_budgets(
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<BudgetResponse>>, ApiError> {
    let now = local_now(&state.local_timezone)?;
    let connection = state.lock()?;
    let budgets = get_budgets_with_status(user_id, now, &connection)?;

    Ok(Json(budgets.into_iter().map(BudgetResponse::from).collect()))
}

fn budget_response(
    budget: Budget,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<BudgetResponse, Error> {
    let status = BudgetStatus::for_budget(&budget, now, connection)?;

    Ok(BudgetResponse::from(BudgetWithStatus { budget, status }))
}

/// Set the limit for a category and period, creating the budget if needed.
///
/// Responds with 201 Created for a new budget and 200 OK when an existing
/// budget's limit was replaced.
pub async fn create_budget(
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<BudgetRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BudgetResponse>), ApiError> {
    let Json(request) = payload?;
    let now = local_now(&state.local_timezone)?;
    let connection = state.lock()?;
    check_category_exists(request.category, &connection)?;

    let outcome = upsert_budget(
        user_id,
        request.category,
        request.period,
        request.amount,
        OffsetDateTime::now_utc(),
        &connection,
    )?;

    let (status_code, budget) = match outcome {
        UpsertOutcome::Created(budget) => {
            tracing::info!("Created budget {} via the API", budget.id);
            (StatusCode::CREATED, budget)
        }
        UpsertOutcome::Updated(budget) => {
            tracing::info!("Updated budget {} via the API", budget.id);
            (StatusCode::OK, budget)
        }
    };

    Ok((status_code, Json(budget_response(budget, now, &connection)?)))
}

/// Get one of the user's budgets with its current status.
pub async fn retrieve_budget(
    Path(budget_id): Path<BudgetID>,
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<BudgetResponse>, ApiError> {
    let now = local_now(&state.local_timezone)?;
    let connection = state.lock()?;
    let budget = get_budget(budget_id, user_id, &connection)?;

    Ok(Json(budget_response(budget, now, &connection)?))
}

/// Replace the category, period and limit of one of the user's budgets.
pub async fn replace_budget(
    Path(budget_id): Path<BudgetID>,
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<BudgetRequest>, JsonRejection>,
) -> Result<Json<BudgetResponse>, ApiError> {
    let Json(request) = payload?;
    let now = local_now(&state.local_timezone)?;
    let connection = state.lock()?;
    check_category_exists(request.category, &connection)?;

    let budget = update_budget(
        budget_id,
        user_id,
        request.category,
        request.period,
        request.amount,
        OffsetDateTime::now_utc(),
        &connection,
    )?;

    Ok(Json(budget_response(budget, now, &connection)?))
}

/// Delete one of the user's budgets.
pub async fn destroy_budget(
    Path(budget_id): Path<BudgetID>,
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
) -> Result<StatusCode, ApiError> {
    let connection = state.lock()?;
    delete_budget(budget_id, user_id, &connection)?;

    tracing::info!("User {user_id} deleted budget {budget_id} via the API");

    Ok(StatusCode::NO_CONTENT)
}

/// List every category.
pub async fn list_categories(
    State(state): State<ApiState>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let connection = state.lock()?;

    Ok(Json(get_all_categories(&connection)?))
}

/// Create a category. An existing category with the same name is returned
/// with 200 OK instead of being duplicated.
pub async fn create_category(
    State(state): State<ApiState>,
    payload: Result<Json<CategoryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let Json(request) = payload?;
    let name = CategoryName::new(&request.name)?;
    let connection = state.lock()?;

    match get_category_by_name(name.as_ref(), &connection) {
        Ok(category) => Ok((StatusCode::OK, Json(category))),
        Err(Error::NotFound) => {
            let category = get_or_create_category(name, &connection)?;
            tracing::info!("Created category {} via the API", category.id);

            Ok((StatusCode::CREATED, Json(category)))
        }
        Err(error) => Err(error.into()),
    }
}

/// Get a savings tip for this month's spending.
pub async fn get_advice(
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let advice = get_monthly_advice(
        user_id,
        &state.db_connection,
        &state.local_timezone,
        &state.expense_assistant,
    )
    .await?;

    Ok(Json(json!({ "advice": advice })))
}
