//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/budgets/{budget_id}', use [format_endpoint].

/// The root route which redirects to the dashboard or log in page.
pub const ROOT: &str = "/";
/// The landing page for logged in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The HTMX fragment with an AI savings tip for the current month.
pub const SAVINGS_TIP_VIEW: &str = "/dashboard/savings_tip";
/// The page for displaying a user's expenses.
pub const EXPENSES_VIEW: &str = "/expenses";
/// The page for adding a new expense.
pub const NEW_EXPENSE_VIEW: &str = "/expenses/new";
/// The route for downloading a user's expenses as a file, e.g. '/expenses/export/csv'.
pub const EXPORT_EXPENSES: &str = "/expenses/export/{format}";
/// The page for listing budgets with their current status.
pub const BUDGETS_VIEW: &str = "/budgets";
/// The page for creating a budget.
pub const NEW_BUDGET_VIEW: &str = "/budgets/new";
/// The page for editing an existing budget.
pub const EDIT_BUDGET_VIEW: &str = "/budgets/{budget_id}/edit";
/// The page for listing all categories.
pub const CATEGORIES_VIEW: &str = "/categories";
/// The page for creating a new category.
pub const NEW_CATEGORY_VIEW: &str = "/categories/new";
/// The route for getting the registration page.
pub const REGISTER_VIEW: &str = "/register";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to create users.
pub const USERS: &str = "/api/users";
/// The route for the manual add expense form.
pub const POST_EXPENSE: &str = "/expenses";
/// The route for the add expense form that parses free text with the AI assistant.
pub const POST_EXPENSE_TEXT: &str = "/expenses/text";
/// The route to delete an expense from the history page.
pub const DELETE_EXPENSE: &str = "/expenses/{expense_id}";
/// The route for the budget form, which creates or updates a budget.
pub const POST_BUDGET: &str = "/budgets";
/// The route for the edit budget form.
pub const PUT_BUDGET: &str = "/budgets/{budget_id}";
/// The route to delete a budget from the budgets page.
pub const DELETE_BUDGET: &str = "/budgets/{budget_id}";
/// The route for the new category form.
pub const POST_CATEGORY: &str = "/categories";

/// JSON: GET lists a user's expenses, POST creates one.
pub const EXPENSES_API: &str = "/api/expenses";
/// JSON: GET or DELETE a single expense.
pub const EXPENSE_API: &str = "/api/expenses/{expense_id}";
/// JSON: parse free text with the AI assistant and create an expense.
pub const POST_EXPENSE_AI: &str = "/api/expenses/ai";
/// JSON: GET lists a user's budgets with their status, POST creates or updates one.
pub const BUDGETS_API: &str = "/api/budgets";
/// JSON: GET, PUT or DELETE a single budget.
pub const BUDGET_API: &str = "/api/budgets/{budget_id}";
/// JSON: GET lists all categories, POST creates one.
pub const CATEGORIES_API: &str = "/api/categories";
/// JSON: AI savings advice on the current month's spending.
pub const ADVICE_API: &str = "/api/advice";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
