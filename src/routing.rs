//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{delete, get, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    api::{
        create_budget, create_category, create_expense, create_expense_with_ai, destroy_budget,
        destroy_expense, get_advice, list_budgets, list_categories, list_expenses, replace_budget,
        retrieve_budget, retrieve_expense,
    },
    auth::{
        auth_guard, auth_guard_hx, auth_guard_json, get_log_in_page, get_log_out,
        get_register_page, post_log_in, register_user,
    },
    budget::{
        create_budget_endpoint, delete_budget_endpoint, get_budgets_page, get_edit_budget_page,
        get_new_budget_page, update_budget_endpoint,
    },
    category::{create_category_endpoint, get_categories_page, get_new_category_page},
    dashboard::{get_dashboard_page, get_savings_tip},
    endpoints,
    expense::{
        create_expense_endpoint, create_expense_from_text_endpoint, delete_expense_endpoint,
        export_expenses_endpoint, get_expenses_page, get_new_expense_page,
    },
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::USERS, post(register_user))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::EXPENSES_VIEW, get(get_expenses_page))
        .route(endpoints::NEW_EXPENSE_VIEW, get(get_new_expense_page))
        .route(endpoints::EXPORT_EXPENSES, get(export_expenses_endpoint))
        .route(endpoints::BUDGETS_VIEW, get(get_budgets_page))
        .route(endpoints::NEW_BUDGET_VIEW, get(get_new_budget_page))
        .route(endpoints::EDIT_BUDGET_VIEW, get(get_edit_budget_page))
        .route(endpoints::CATEGORIES_VIEW, get(get_categories_page))
        .route(endpoints::NEW_CATEGORY_VIEW, get(get_new_category_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These routes need to use the HX-REDIRECT header for auth redirects to work properly for HTMX requests.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(endpoints::SAVINGS_TIP_VIEW, get(get_savings_tip))
            .route(endpoints::POST_EXPENSE, post(create_expense_endpoint))
            .route(
                endpoints::POST_EXPENSE_TEXT,
                post(create_expense_from_text_endpoint),
            )
            .route(endpoints::DELETE_EXPENSE, delete(delete_expense_endpoint))
            .route(endpoints::POST_BUDGET, post(create_budget_endpoint))
            .route(endpoints::PUT_BUDGET, put(update_budget_endpoint))
            .route(endpoints::DELETE_BUDGET, delete(delete_budget_endpoint))
            .route(endpoints::POST_CATEGORY, post(create_category_endpoint))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
    );

    // JSON clients get a 401 instead of a redirect.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(
                endpoints::EXPENSES_API,
                get(list_expenses).post(create_expense),
            )
            .route(
                endpoints::EXPENSE_API,
                get(retrieve_expense).delete(destroy_expense),
            )
            .route(endpoints::POST_EXPENSE_AI, post(create_expense_with_ai))
            .route(endpoints::BUDGETS_API, get(list_budgets).post(create_budget))
            .route(
                endpoints::BUDGET_API,
                get(retrieve_budget)
                    .put(replace_budget)
                    .delete(destroy_budget),
            )
            .route(
                endpoints::CATEGORIES_API,
                get(list_categories).post(create_category),
            )
            .route(endpoints::ADVICE_API, get(get_advice))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_json)),
    );

    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}
