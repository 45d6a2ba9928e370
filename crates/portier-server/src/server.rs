//! HTTP server for the Portier gateway

use axum::{http::StatusCode, routing::get, Router};
use portier_auth::{Directory, Gateway};
use portier_core::{config::PortierConfig, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::info;

use crate::metrics::{metrics_handler, MetricsRecorder};
use crate::routes;
use crate::session::session_layer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PortierConfig>,
    pub gateway: Arc<Gateway>,
    pub metrics: Arc<MetricsRecorder>,
}

impl AppState {
    pub fn new(config: PortierConfig, directory: Arc<dyn Directory>) -> Result<Self> {
        let gateway = Gateway::new(&config, directory)?;

        Ok(Self {
            config: Arc::new(config),
            gateway: Arc::new(gateway),
            metrics: Arc::new(MetricsRecorder::new()),
        })
    }

    /// State talking to the LDAP server from `config`
    pub fn from_config(config: PortierConfig) -> Result<Self> {
        let gateway = Gateway::from_config(&config)?;

        Ok(Self {
            config: Arc::new(config),
            gateway: Arc::new(gateway),
            metrics: Arc::new(MetricsRecorder::new()),
        })
    }
}

/// Portier server
pub struct PortierServer {
    config: PortierConfig,
}

impl PortierServer {
    pub fn new(config: PortierConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.server.bind_address, self.config.server.port);
        let base = self.config.server.path("/");
        let ldap_url = self.config.ldap.server_url.clone();

        let state = AppState::from_config(self.config)?;
        let environment = state.gateway.environment();
        info!("Prometheus metrics initialized");

        let app = build_router(state);
        let listener = TcpListener::bind(&addr).await?;

        info!("🚀 Portier listening on http://{}{} ({})", addr, base, environment.as_str());
        info!("🔐 Auth subrequest endpoint at {}", routes_path(&base, "check"));
        info!("📒 Directory at {}", ldap_url);
        info!("📈 Prometheus metrics at http://{}/metrics", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Portier stopped");
        Ok(())
    }
}

fn routes_path(base: &str, route: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), route)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Build the application router.
///
/// Gateway routes live under the configured base path, `/metrics` stays at
/// the root. The base path answers with and without a trailing slash.
pub fn build_router(state: AppState) -> Router {
    let server = &state.config.server;
    let timeout = Duration::from_secs(server.request_timeout_secs);
    let base = server.path("/");

    let mut router = Router::new()
        .route("/metrics", get(metrics_handler))
        .route(&server.path("/check"), get(routes::check))
        .route(&server.path("/logout"), get(routes::logout))
        .route(&base, get(routes::page).post(routes::login))
        .route(&routes_path(&base, "{*rest}"), get(routes::page));

    if base != "/" {
        router = router.route(&format!("{}/", base), get(routes::page).post(routes::login));
    }

    router
        .layer(session_layer(&state.config.session))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use portier_auth::{DirectoryEntry, MemoryDirectory};
    use portier_core::config::{LdapConfigSection, RedirectConfig};
    use tower::ServiceExt;

    const SERVICE_DN: &str = "cn=svc-portier,ou=services,dc=example,dc=local";

    fn config(groups: &[&str]) -> PortierConfig {
        PortierConfig {
            ldap: LdapConfigSection {
                server_url: "ldap://dc1.example.local".to_string(),
                bind_dn: SERVICE_DN.to_string(),
                bind_password: "service-secret".to_string(),
                search_base: "dc=example,dc=local".to_string(),
                groups: groups.iter().map(|g| g.to_string()).collect(),
                ..Default::default()
            },
            redirect: RedirectConfig {
                domains: vec!["intranet.example.com".to_string()],
                default_path: "/".to_string(),
            },
            ..Default::default()
        }
    }

    fn app(groups: &[&str]) -> Router {
        let directory = MemoryDirectory::new();
        directory.add_account(DirectoryEntry::new(SERVICE_DN), "service-secret");
        directory.add_account(
            DirectoryEntry::new("cn=John Doe,ou=people,dc=example,dc=local")
                .with_attr("sAMAccountName", ["jdoe"])
                .with_attr("givenName", ["John"])
                .with_attr("memberOf", ["CN=Portal Users,OU=Groups,DC=example,DC=local"]),
            "hunter2",
        );

        let state = AppState::new(config(groups), Arc::new(directory)).unwrap();
        build_router(state)
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn login_request(form: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/auth")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap()
    }

    fn session_cookie(response: &Response) -> String {
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("session cookie")
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_check_without_session_is_401() {
        let app = app(&["portal users"]);

        let response = send(&app, get_request("/auth/check", None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_text(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_login_then_check() {
        let app = app(&["portal users"]);

        let response = send(
            &app,
            login_request(
                "username=jdoe&password=hunter2&request_uri=https%3A%2F%2Fintranet.example.com%2Fapp",
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "https://intranet.example.com/app");
        let cookie = session_cookie(&response);

        let response = send(&app, get_request("/auth/check", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, get_request("/auth", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("John"));
        assert!(body.contains("/auth/logout"));
    }

    #[tokio::test]
    async fn test_login_outside_groups_is_403() {
        let app = app(&["finance"]);

        let response = send(&app, login_request("username=jdoe&password=hunter2")).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/");
        let cookie = session_cookie(&response);

        let response = send(&app, get_request("/auth/check", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unsafe_redirect_falls_back() {
        let app = app(&[]);

        let response = send(
            &app,
            login_request(
                "username=jdoe&password=hunter2&request_uri=https%3A%2F%2Fevil.example.net%2F",
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn test_wrong_password_renders_form() {
        let app = app(&[]);

        let response = send(
            &app,
            login_request("username=jdoe&password=wrong&request_uri=%2Fback"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());

        let body = body_text(response).await;
        assert!(body.contains("Invalid username or password."));
        assert!(body.contains(r#"value="/back""#));
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let app = app(&[]);

        let response = send(&app, login_request("username=jdoe&password=hunter2")).await;
        let cookie = session_cookie(&response);

        let response = send(&app, get_request("/auth/logout", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/auth");

        let response = send(&app, get_request("/auth/check", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_page_keeps_request_uri() {
        let app = app(&[]);

        let response = send(
            &app,
            get_request("/auth/anything?request_uri=https%3A%2F%2Fintranet.example.com%2F", None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains(r#"action="/auth""#));
        assert!(body.contains("https://intranet.example.com/"));
    }

    #[tokio::test]
    async fn test_base_path_with_trailing_slash() {
        let app = app(&[]);

        let response = send(&app, get_request("/auth/", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains(r#"action="/auth""#));

        let response = send(
            &app,
            Request::builder()
                .method("POST")
                .uri("/auth/")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("username=jdoe&password=hunter2"))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FOUND);
        let cookie = session_cookie(&response);

        let response = send(&app, get_request("/auth/", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("/auth/logout"));
    }

    #[tokio::test]
    async fn test_state_from_config_does_not_contact_directory() {
        // Nothing listens on this port; only /check is exercised
        let mut config = config(&[]);
        config.ldap.server_url = "ldap://127.0.0.1:1".to_string();

        let state = AppState::from_config(config).unwrap();
        assert_eq!(state.gateway.environment(), portier_core::Environment::Production);

        let app = build_router(state);
        let response = send(&app, get_request("/auth/check", None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_metrics_at_root() {
        let app = app(&[]);

        let _ = send(&app, get_request("/auth/check", None)).await;
        let response = send(&app, get_request("/metrics", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_root_base_path() {
        let mut config = config(&[]);
        config.server.base_path = "/".to_string();
        let state = AppState::new(config, Arc::new(MemoryDirectory::new())).unwrap();
        let app = build_router(state);

        let response = send(&app, get_request("/check", None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
