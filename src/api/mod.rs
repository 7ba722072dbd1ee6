//! HTTP surface: routes, middleware, server bootstrap, and the OpenAPI
//! document.

use crate::api::handlers::{auth, health, user};
use crate::api::storage::{PgUserStore, UserStore};
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::path::Path;
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, sync::mpsc};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    services::ServeDir,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa::OpenApi;

pub mod handlers;
mod openapi;
pub mod principal;
pub mod storage;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::signup::register,
        auth::signup::verify_otp,
        auth::login::login,
        auth::reset::forgot_password,
        auth::reset::verify_forgot_otp,
        auth::reset::reset_password,
        auth::oauth::oauth_redirect,
        auth::oauth::oauth_callback,
        user::profile::profile,
        user::picture::upload_profile_pic,
    ),
    components(schemas(
        health::Health,
        auth::types::RegisterRequest,
        auth::types::VerifyOtpRequest,
        auth::types::LoginRequest,
        auth::types::ForgotPasswordRequest,
        auth::types::ResetPasswordRequest,
        auth::types::MessageResponse,
        auth::types::TokenResponse,
        auth::types::AuthenticatedUser,
        auth::types::ProfileResponse,
        auth::types::ProfilePicResponse,
    )),
    tags(
        (name = "health", description = "Service health"),
        (name = "auth", description = "Signup, login, and password reset"),
        (name = "oauth", description = "Provider login round trips"),
        (name = "user", description = "Profile endpoints")
    )
)]
struct ApiDoc;

/// The generated `OpenAPI` document.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Every documented route plus the meta endpoints (`/openapi.json`,
/// the static `/uploads` tree).
fn router(upload_dir: &Path) -> Router {
    Router::new()
        .route(
            "/health",
            get(health::health).options(health::health),
        )
        .route("/openapi.json", get(openapi::openapi_json))
        .route("/api/auth/register", post(auth::signup::register))
        .route("/api/auth/verify-otp", post(auth::signup::verify_otp))
        .route("/api/auth/login", post(auth::login::login))
        .route("/api/auth/forgot-password", post(auth::reset::forgot_password))
        .route(
            "/api/auth/verify-forgot-otp",
            post(auth::reset::verify_forgot_otp),
        )
        .route("/api/auth/reset-password", post(auth::reset::reset_password))
        .route("/api/auth/:provider", get(auth::oauth::oauth_redirect))
        .route(
            "/api/auth/:provider/callback",
            get(auth::oauth::oauth_callback),
        )
        .route("/api/user/profile", get(user::profile::profile))
        .route(
            "/api/user/upload-profile-pic/:id",
            post(user::picture::upload_profile_pic),
        )
        .nest_service("/uploads", ServeDir::new(upload_dir))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: String, auth_state: Arc<auth::AuthState>) -> Result<()> {
    // Ctrl-c flips the serve loop into graceful shutdown.
    let (tx, mut rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = tx.send(());
            }
            Err(err) => error!("Failed to listen for ctrl-c: {}", err),
        }
    });

    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let store: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));

    let frontend_origin = frontend_origin(auth_state.config().frontend_url())?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    let app = router(auth_state.config().upload_dir()).layer(
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
            .layer(Extension(store))
            .layer(Extension(pool)),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            rx.recv().await;
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

fn frontend_origin(frontend_url: &str) -> Result<HeaderValue> {
    let parsed =
        Url::parse(frontend_url).with_context(|| format!("Invalid frontend URL: {frontend_url}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("Frontend URL must include a host: {frontend_url}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);

    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}
