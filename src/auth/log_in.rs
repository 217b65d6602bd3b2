//! This file defines the routes for displaying the log-in page and handling log-in requests.
//! The auth module handles the lower level authentication and cookie auth logic.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    auth::{
        get_user_by_username, invalidate_auth_cookie, redirect::normalize_redirect_url,
        set_auth_cookie,
    },
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, LINK_STYLE, base, loading_spinner, log_in_register, password_input,
        username_input,
    },
    timezone::get_local_offset,
};

fn log_in_form(username: &str, error_message: Option<&str>, redirect_url: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-indicator="#indicator"
            hx-disabled-elt="#username, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

            (username_input(username, None))
            (password_input("", 0, error_message))

            div class="flex items-center gap-x-3"
            {
                input
                    type="checkbox"
                    name="remember_me"
                    id="remember_me"
                    tabindex="0"
                    class="rounded-xs";

                label
                    for="remember_me"
                    class="block text-sm font-medium text-gray-900 dark:text-white"
                {
                    "Keep me logged in for one week"
                }
            }

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Log in"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400" {
                "Don't have an account? "
                a href=(endpoints::REGISTER_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                  "Register here"
                }
            }
        }
    }
}

fn parse_redirect_url(raw_url: Option<&str>, source: &str) -> Option<String> {
    match raw_url.and_then(normalize_redirect_url) {
        Some(redirect_url) => Some(redirect_url),
        None => {
            if let Some(raw_url) = raw_url {
                tracing::warn!("Invalid redirect URL from {source}: {raw_url}");
            }
            None
        }
    }
}

/// Display the log-in page.
pub async fn get_log_in_page(Query(query): Query<RedirectQuery>) -> Response {
    let redirect_url = parse_redirect_url(query.redirect_url.as_deref(), "log-in query");
    let log_in_form = log_in_form("", None, redirect_url.as_deref());
    let content = log_in_register("Log in to your account", &log_in_form);
    base("Log In", &[], &content).into_response()
}

/// How long the auth cookie should last if the user selects "remember me" at log-in.
const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kathmandu".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

pub const INVALID_CREDENTIALS_ERROR_MSG: &str = "Invalid username or password.";
const INTERNAL_ERROR_MSG: &str = "An internal error occurred. Please try again later.";

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request, the auth cookie set and the client is redirected to the dashboard page.
/// Otherwise, the form is returned with an error message explaining the problem.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let redirect_url = parse_redirect_url(user_data.redirect_url.as_deref(), "log-in form");
    let redirect_url = redirect_url.as_deref();
    let log_in_error =
        |message: &str| log_in_form(&user_data.username, Some(message), redirect_url);

    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return log_in_error(INTERNAL_ERROR_MSG).into_response();
            }
        };

        match get_user_by_username(&user_data.username, &connection) {
            Ok(user) => user,
            Err(Error::NotFound) => {
                return log_in_error(INVALID_CREDENTIALS_ERROR_MSG).into_response();
            }
            Err(error) => {
                tracing::error!("Unhandled error while verifying credentials: {error}");
                return log_in_error(INTERNAL_ERROR_MSG).into_response();
            }
        }
    };

    match user.password_hash.verify(&user_data.password) {
        Ok(true) => {}
        Ok(false) => return log_in_error(INVALID_CREDENTIALS_ERROR_MSG).into_response(),
        Err(error) => {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            return log_in_error(INTERNAL_ERROR_MSG).into_response();
        }
    }

    let cookie_duration = if user_data.remember_me.is_some() {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    let local_offset = match get_local_offset(&state.local_timezone) {
        Some(offset) => offset,
        None => return Error::InvalidTimezoneError(state.local_timezone).into_response(),
    };

    let redirect_url = redirect_url.unwrap_or(endpoints::DASHBOARD_VIEW);

    match set_auth_cookie(jar.clone(), user.id, cookie_duration, local_offset) {
        Ok(updated_jar) => (
            StatusCode::SEE_OTHER,
            HxRedirect(redirect_url.to_owned()),
            updated_jar,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Error setting auth cookie: {error}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
                invalidate_auth_cookie(jar),
            )
                .into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct RedirectQuery {
    pub redirect_url: Option<String>,
}

/// The raw data entered by the user in the log-in form.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    pub username: String,

    /// Password entered during log-in, compared against the stored hash.
    pub password: String,

    /// Whether to extend the initial auth cookie duration.
    ///
    /// This value comes from a checkbox, so it either has a string value or is not set.
    /// The `Some` variant should be interpreted as `true` irregardless of the
    /// string value, and the `None` variant should be interpreted as `false`.
    pub remember_me: Option<String>,

    /// Optional URL to redirect to after logging in.
    pub redirect_url: Option<String>,
}

#[cfg(test)]
mod log_in_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Form,
        extract::{Query, State},
        http::StatusCode,
    };
    use axum_extra::extract::PrivateCookieJar;
    use rusqlite::Connection;
    use time::Duration;

    use crate::{
        app_state::create_cookie_key,
        auth::{
            PasswordHash, ValidatedPassword,
            cookie::{COOKIE_TOKEN, DEFAULT_COOKIE_DURATION},
            user::{Username, create_user, create_user_table},
        },
        endpoints,
        test_utils::{
            assert_form_input, assert_hx_endpoint, assert_hx_redirect, assert_valid_html,
            must_get_form, parse_html_document, parse_html_fragment,
        },
    };

    use super::{
        INVALID_CREDENTIALS_ERROR_MSG, LogInData, LoginState, RedirectQuery, get_log_in_page,
        post_log_in,
    };

    const PASSWORD: &str = "averysafeandsecurepassword";

    fn get_state() -> LoginState {
        let connection = Connection::open_in_memory().unwrap();
        create_user_table(&connection).unwrap();
        create_user(
            Username::new_unchecked("alice"),
            PasswordHash::new(ValidatedPassword::new_unchecked(PASSWORD), 4).unwrap(),
            &connection,
        )
        .unwrap();

        LoginState {
            cookie_key: create_cookie_key("foobar"),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            local_timezone: "Etc/UTC".to_owned(),
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    fn log_in_data(username: &str, password: &str) -> LogInData {
        LogInData {
            username: username.to_owned(),
            password: password.to_owned(),
            remember_me: None,
            redirect_url: None,
        }
    }

    #[tokio::test]
    async fn log_in_page_displays_form() {
        let response = get_log_in_page(Query(RedirectQuery { redirect_url: None })).await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::LOG_IN_API, "hx-post");
        assert_form_input(&form, "username", "text");
        assert_form_input(&form, "password", "password");
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let state = get_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = post_log_in(
            State(state),
            jar,
            Form(log_in_data("alice", PASSWORD)),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::DASHBOARD_VIEW);
        let set_cookie = response
            .headers()
            .get("set-cookie")
            .expect("auth cookie not set")
            .to_str()
            .unwrap();
        assert!(set_cookie.starts_with(COOKIE_TOKEN));
    }

    #[tokio::test]
    async fn log_in_redirects_to_requested_page() {
        let state = get_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());
        let mut data = log_in_data("alice", PASSWORD);
        data.redirect_url = Some(endpoints::BUDGETS_VIEW.to_owned());

        let response = post_log_in(State(state), jar, Form(data)).await;

        assert_hx_redirect(&response, endpoints::BUDGETS_VIEW);
    }

    #[tokio::test]
    async fn remember_me_extends_cookie() {
        let state = get_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());
        let mut data = log_in_data("alice", PASSWORD);
        data.remember_me = Some("on".to_owned());

        let response = post_log_in(State(state), jar, Form(data)).await;

        let set_cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap();
        let cookie = axum_extra::extract::cookie::Cookie::parse(set_cookie).unwrap();
        let expires = cookie.expires_datetime().unwrap();
        assert!(expires - time::OffsetDateTime::now_utc() > Duration::days(6));
    }

    #[tokio::test]
    async fn log_in_fails_with_wrong_password() {
        let state = get_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = post_log_in(
            State(state),
            jar,
            Form(log_in_data("alice", "wrongpassword")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains(INVALID_CREDENTIALS_ERROR_MSG));
    }

    #[tokio::test]
    async fn log_in_fails_with_unknown_username() {
        let state = get_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response =
            post_log_in(State(state), jar, Form(log_in_data("mallory", PASSWORD))).await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains(INVALID_CREDENTIALS_ERROR_MSG));
    }
}
