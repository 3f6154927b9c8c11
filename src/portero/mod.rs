use crate::cli::globals::GlobalArgs;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{Extension, MatchedPath},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub(crate) mod captcha;
pub(crate) mod error;
pub(crate) mod handlers;
mod openapi;
pub(crate) mod rate_limit;
pub(crate) mod state;
pub(crate) mod storage;
mod sweeper;
pub(crate) mod tokens;
pub(crate) mod totp;
pub(crate) mod types;

pub use captcha::{CaptchaVerifier, HttpCaptchaVerifier, StaticCaptchaVerifier};
pub use state::{AuthConfig, AuthState};

/// Build the application router.
///
/// The pool and auth state ride in as `Extension` layers so handlers stay
/// testable with fake dependencies.
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/login", post(handlers::login))
        .route(
            "/verify-session",
            get(handlers::verify_session).post(handlers::verify_session),
        )
        .route("/logout", post(handlers::logout))
        .route("/create-admin", post(handlers::create_admin))
        .route("/setup-2fa", post(handlers::setup_two_factor))
        .route("/verify-2fa", post(handlers::verify_two_factor))
        .merge(
            SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: String, globals: &GlobalArgs) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let captcha = HttpCaptchaVerifier::new(&globals.captcha_url, globals.captcha_secret.clone())
        .context("Failed to build CAPTCHA verifier")?;
    let auth_state = Arc::new(AuthState::new(AuthConfig::new(), Arc::new(captcha)));

    // Expired sessions are reaped in the background; reads never see them
    // either way thanks to the expiry predicate.
    sweeper::spawn_session_sweeper(pool.clone());

    // The admin SPA may be served from anywhere, so the API answers any
    // origin. Credentials travel in the Authorization header, not cookies.
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(Any);

    let app = router().layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(cors)
            .layer(Extension(auth_state))
            .layer(Extension(pool)),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    // ConnectInfo feeds the peer address to the login rate limiter when no
    // proxy headers are present.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
