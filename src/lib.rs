//! Spendwise is a web app for tracking personal expenses against budgets.
//!
//! Expenses can be entered as free text, which is turned into a structured
//! item, amount and category by an external AI text-completion service.
//! Budgets are set per category (or overall) and per period, and the app
//! reports how much of each budget has been spent in the current period.
//!
//! This library provides a REST API that directly serves HTML pages, plus a
//! small JSON API for scripted access.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod ai;
mod alert;
mod api;
mod app_state;
mod auth;
mod budget;
mod category;
mod dashboard;
mod database_id;
mod db;
mod endpoints;
mod error;
mod expense;
mod html;
mod internal_server_error;
mod logging;
mod navigation;
mod not_found;
mod routing;
mod timezone;

#[cfg(test)]
mod test_utils;

pub use ai::{
    AiError, ChatMessage, CompletionBackend, CompletionRequest, ExpenseAssistant, ExpenseCandidate,
    GroqBackend, GroqConfig, Role,
};
pub use app_state::AppState;
pub use auth::{
    PasswordHash, User, UserID, ValidatedPassword, get_user_by_username, update_password,
};
pub use db::initialize as initialize_db;
pub use error::Error;
pub use logging::logging_middleware;
pub use routing::build_router;
pub use timezone::get_local_offset;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
