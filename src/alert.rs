//! Alert messages shown to the user after an action succeeds or fails, and
//! the budget warnings shown on the dashboard and after adding an expense.

use axum::response::{IntoResponse, Response};
use maud::{Markup, html};

const SUCCESS_STYLE: &str = "p-4 mb-4 text-sm text-green-800 rounded-lg bg-green-50 \
    dark:bg-gray-800 dark:text-green-400 border border-green-300 dark:border-green-800";
const WARNING_STYLE: &str = "p-4 mb-4 text-sm text-yellow-800 rounded-lg bg-yellow-50 \
    dark:bg-gray-800 dark:text-yellow-300 border border-yellow-300 dark:border-yellow-800";
const ERROR_STYLE: &str = "p-4 mb-4 text-sm text-red-800 rounded-lg bg-red-50 \
    dark:bg-gray-800 dark:text-red-400 border border-red-300 dark:border-red-800";

/// An alert message with a severity that controls how it is styled.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// A success message with extra details.
    Success { message: String, details: String },
    /// A success message on its own.
    SuccessSimple { message: String },
    /// A warning, e.g., a budget close to its limit.
    Warning { message: String, details: String },
    /// An error message with details on how to fix the error.
    Error { message: String, details: String },
    /// An error message on its own.
    ErrorSimple { message: String },
}

impl Alert {
    /// The headline of the alert.
    pub fn message(&self) -> &str {
        match self {
            Alert::Success { message, .. }
            | Alert::SuccessSimple { message }
            | Alert::Warning { message, .. }
            | Alert::Error { message, .. }
            | Alert::ErrorSimple { message } => message,
        }
    }

    /// Render the alert as an HTML fragment.
    pub fn into_html(self) -> Markup {
        let (style, role, message, details) = match self {
            Alert::Success { message, details } => (SUCCESS_STYLE, "status", message, details),
            Alert::SuccessSimple { message } => (SUCCESS_STYLE, "status", message, String::new()),
            Alert::Warning { message, details } => (WARNING_STYLE, "alert", message, details),
            Alert::Error { message, details } => (ERROR_STYLE, "alert", message, details),
            Alert::ErrorSimple { message } => (ERROR_STYLE, "alert", message, String::new()),
        };

        html! {
            div class=(style) role=(role) data-alert
            {
                p class="font-medium" { (message) }

                @if !details.is_empty() {
                    p class="mt-1" { (details) }
                }
            }
        }
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        self.into_html().into_response()
    }
}
