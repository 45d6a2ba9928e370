//! Gateway routes
//!
//! Mounted under the configured base path:
//!
//! - `GET /check`: proxy subrequest, answers 200, 401 or 403 with no body
//! - `POST /`: login form submission
//! - `GET /logout`: destroy the session
//! - `GET /*`: login form, or the signed-in page when a user is present

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Form,
};
use portier_auth::SessionHandle;
use portier_core::INVALID_CREDENTIALS_MESSAGE;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{debug, error};

use crate::server::AppState;
use crate::session::CookieSession;
use crate::views;

/// Login form fields
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub request_uri: Option<String>,
}

/// Query string of the login page
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    pub request_uri: Option<String>,
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// GET /check
pub async fn check(State(state): State<AppState>, session: Session) -> StatusCode {
    let decision = state.gateway.check_access(&CookieSession(session)).await;
    state.metrics.record_check(decision);

    status(decision.http_status())
}

/// POST /
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let action = state.config.server.path("/");
    let session = CookieSession(session);

    match state
        .gateway
        .login(&session, &form.username, &form.password)
        .await
    {
        Ok(outcome) if outcome.is_authenticated() => {
            state.metrics.record_login(&outcome);
            let location = state.gateway.resolve_redirect(form.request_uri.as_deref());
            debug!("Redirecting {} to {}", form.username, location);
            found(&location)
        }
        Ok(outcome) => {
            state.metrics.record_login(&outcome);
            Html(views::login_page(
                &action,
                Some(INVALID_CREDENTIALS_MESSAGE),
                form.request_uri.as_deref(),
            ))
            .into_response()
        }
        Err(e) => {
            error!("Login for {} failed: {}", form.username, e);
            state.metrics.record_login_error(e.code());
            (
                status(e.http_status()),
                Html(views::login_page(
                    &action,
                    Some(INVALID_CREDENTIALS_MESSAGE),
                    form.request_uri.as_deref(),
                )),
            )
                .into_response()
        }
    }
}

/// GET /logout
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    if let Err(e) = state.gateway.logout(&CookieSession(session)).await {
        error!("Failed to destroy session: {}", e);
    }
    state.metrics.record_logout();

    found(&state.config.server.path("/"))
}

/// GET /*
pub async fn page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<PageQuery>,
) -> Html<String> {
    let server = &state.config.server;

    let user = match CookieSession(session).user().await {
        Ok(user) => user,
        Err(e) => {
            error!("Unreadable session: {}", e);
            None
        }
    };

    match user {
        Some(user) => Html(views::authenticated_page(
            user.greeting_name(),
            &server.path("/logout"),
        )),
        None => Html(views::login_page(
            &server.path("/"),
            None,
            query.request_uri.as_deref(),
        )),
    }
}
