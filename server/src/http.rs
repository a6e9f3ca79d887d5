use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use async_graphql::{EmptySubscription, Schema, http::GraphiQLSource};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use optitalent_api::{
    MutationRoot, QueryRoot, TenantTag,
    auth::{AuthConfig, CurrentUser, SESSION_COOKIE, authenticate},
    tenants::{self, ProvisionTenant},
};
use platform_api::{ApiError, ErrorCode};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use serde::Serialize;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug, error, info};

use crate::{
    rate_limit::{RateLimiter, limit_requests},
    tenant::{TENANT_HEADER, tag_tenant},
};

pub type AppGraphqlSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub schema: AppGraphqlSchema,
    pub auth: Arc<AuthConfig>,
    pub limiter: Arc<RateLimiter>,
    pub base_domain: Arc<str>,
    pub cors_allowed_origins: Vec<String>,
}

pub async fn serve(bind: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;

    info!(%bind, "optitalent server listening");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let cors = CorsLayer::new()
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_methods([Method::POST, Method::GET]);
    // credentials cannot be combined with a wildcard origin
    if allowed.is_empty() {
        cors.allow_origin(AllowOrigin::any())
    } else {
        cors.allow_origin(AllowOrigin::list(allowed))
            .allow_credentials(true)
    }
}

const SECURITY_HEADERS: [(&str, &str); 5] = [
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    (
        "permissions-policy",
        "camera=(self), microphone=(), geolocation=()",
    ),
    (
        "strict-transport-security",
        "max-age=63072000; includeSubDomains; preload",
    ),
];

pub fn build_router(state: AppState) -> Router {
    let request_id = HeaderName::from_static("x-request-id");
    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/graphiql", get(graphiql_handler))
        .route("/graphql", get(graphql_handler).post(graphql_handler))
        .route(
            "/api/tenants",
            get(list_tenants_handler).post(provision_tenant_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.base_domain.clone(),
            tag_tenant,
        ))
        .layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            limit_requests,
        ));
    // outside the limiter so 429 responses carry them too
    for (name, value) in SECURITY_HEADERS {
        router = router.layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
    }
    router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.cors_allowed_origins)),
        )
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    ok: bool,
    db_ok: bool,
    version: &'static str,
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let backend = state.db.get_database_backend();
    let db_ok = state
        .db
        .execute(Statement::from_string(backend, "SELECT 1".to_string()))
        .await
        .is_ok();
    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(HealthResponse {
            ok: db_ok,
            db_ok,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

async fn graphiql_handler() -> Html<String> {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

/// Bearer token first, then the session cookie.
fn request_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Anonymous when there is no token or it does not check out; resolvers
/// that need a user report `UNAUTHENTICATED` themselves.
async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let mut request = request.into_inner();
    if let Some(token) = request_token(&headers, &jar) {
        match authenticate(state.db.as_ref(), &state.auth, &token).await {
            Ok(user) => request = request.data(user),
            Err(err) => debug!(error = %err, "ignoring request credentials"),
        }
    }
    let tenant = headers
        .get(TENANT_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|slug| TenantTag(slug.to_string()));
    if let Some(tenant) = tenant {
        request = request.data(tenant);
    }
    state.schema.execute(request).await.into()
}

async fn require_super_admin(
    state: &AppState,
    headers: &HeaderMap,
    jar: &CookieJar,
) -> HttpResult<CurrentUser> {
    let token = request_token(headers, jar).ok_or_else(|| HttpError::from(ApiError::Unauthenticated))?;
    let user = authenticate(state.db.as_ref(), &state.auth, &token).await?;
    if !user.is_super_admin() {
        return Err(ApiError::Forbidden.into());
    }
    Ok(user)
}

async fn list_tenants_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> HttpResult<Response> {
    require_super_admin(&state, &headers, &jar).await?;
    let tenants = tenants::list_tenants(state.db.as_ref()).await?;
    Ok(Json(tenants).into_response())
}

async fn provision_tenant_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    body: Result<Json<ProvisionTenant>, JsonRejection>,
) -> HttpResult<Response> {
    let user = require_super_admin(&state, &headers, &jar).await?;
    let Json(input) = body.map_err(|rejection| {
        HttpError::new(
            StatusCode::BAD_REQUEST,
            ErrorCode::Validation.as_str(),
            rejection.body_text(),
        )
    })?;
    let provisioned = tenants::provision_tenant(state.db.as_ref(), input).await?;
    info!(by = %user.user_id, tenant = %provisioned.tenant.slug, "tenant provisioned over REST");
    Ok((StatusCode::CREATED, Json(provisioned)).into_response())
}

pub type HttpResult<T> = Result<T, HttpError>;

/// JSON error body `{"error": {"code", "message"}}`.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        let code = err.code();
        let status = match code {
            ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Validation => StatusCode::BAD_REQUEST,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::LimitExceeded => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::AiService => StatusCode::BAD_GATEWAY,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if let ApiError::Internal(inner) = &err {
            error!(error = ?inner, "internal error");
        }
        Self::new(status, code.as_str(), err.to_string())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = json!({ "error": { "code": self.code, "message": self.message } });
        (self.status, Json(body)).into_response()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use http_body_util::BodyExt;
    use migration::{Migrator, MigratorTrait};
    use optitalent_api::{AppSchema, build_schema, seed::seed_demo};
    use platform_genai::CannedClient;
    use sea_orm::Database;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::RateLimitConfig;

    const PASSWORD: &str = "demo-password";

    async fn test_state(max_requests: u32) -> AppState {
        let conn = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&conn, None).await.unwrap();
        seed_demo(&conn, "default", "Default", PASSWORD).await.unwrap();
        let db = Arc::new(conn);
        let auth = Arc::new(AuthConfig {
            jwt_secret: "router-test-secret-router-test-secret".into(),
            session_ttl_minutes: 30,
            default_tenant_slug: "default".into(),
            secure_cookies: false,
        });
        let AppSchema(schema) =
            build_schema(db.clone(), auth.clone(), Arc::new(CannedClient::new()));
        AppState {
            db,
            schema,
            auth,
            limiter: Arc::new(RateLimiter::new(RateLimitConfig {
                max_requests,
                window: Duration::from_secs(60),
            })),
            base_domain: Arc::from("localhost"),
            cors_allowed_origins: vec!["http://localhost:3000".into()],
        }
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn graphql(host: &str, token: Option<&str>, query: Value) -> axum::http::Request<Body> {
        let mut builder = axum::http::Request::post("/graphql")
            .header(header::HOST, host)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(query.to_string())).unwrap()
    }

    async fn login(router: &Router, host: &str, email: &str) -> Value {
        let query = json!({
            "query": "mutation($e: String!, $p: String!) { login(email: $e, password: $p) { ok token error } }",
            "variables": { "e": email, "p": PASSWORD }
        });
        let response = router
            .clone()
            .oneshot(graphql(host, None, query))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["data"]["login"].clone()
    }

    #[tokio::test]
    async fn health_reports_database_and_security_headers() {
        let router = build_router(test_state(100).await);
        let response = router
            .oneshot(axum::http::Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
        assert!(headers.contains_key("strict-transport-security"));
        assert!(headers.contains_key("x-request-id"));
        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["dbOk"], true);
    }

    #[tokio::test]
    async fn requests_over_the_limit_get_429() {
        let router = build_router(test_state(100).await);
        let request = || {
            axum::http::Request::get("/health")
                .header("x-forwarded-for", "198.51.100.4")
                .body(Body::empty())
                .unwrap()
        };
        for _ in 0..100 {
            let response = router.clone().oneshot(request()).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        let response = router.clone().oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
        assert_eq!(response.headers()["x-frame-options"], "DENY");
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "RATE_LIMITED");

        let other = axum::http::Request::get("/health")
            .header("x-forwarded-for", "198.51.100.5")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(other).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn bearer_token_authenticates_graphql() {
        let router = build_router(test_state(1000).await);
        let payload = login(&router, "localhost", "employee@optitalent.test").await;
        assert_eq!(payload["ok"], true);
        let token = payload["token"].as_str().unwrap().to_string();

        let me = json!({ "query": "{ me { email } }" });
        let response = router
            .clone()
            .oneshot(graphql("localhost", Some(&token), me.clone()))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["data"]["me"]["email"], "employee@optitalent.test");

        let response = router
            .oneshot(graphql("localhost", Some("garbage"), me))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["extensions"]["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn login_uses_the_subdomain_tenant() {
        let router = build_router(test_state(1000).await);
        let payload = login(&router, "default.localhost:8080", "hr@optitalent.test").await;
        assert_eq!(payload["ok"], true);
        let payload = login(&router, "ghost.localhost:8080", "hr@optitalent.test").await;
        assert_eq!(payload["ok"], false);
        assert_eq!(payload["error"], "Invalid credentials");
    }

    #[tokio::test]
    async fn tenant_provisioning_requires_super_admin() {
        let router = build_router(test_state(1000).await);
        let body = json!({
            "slug": "acme",
            "name": "Acme Corp",
            "adminEmail": "owner@acme.test",
            "adminName": "Acme Owner"
        });
        let post = |token: Option<&str>| {
            let mut builder = axum::http::Request::post("/api/tenants")
                .header(header::CONTENT_TYPE, "application/json");
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            builder.body(Body::from(body.to_string())).unwrap()
        };

        let response = router.clone().oneshot(post(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"]["code"], "UNAUTHENTICATED");

        let admin = login(&router, "localhost", "admin@optitalent.test").await;
        let admin = admin["token"].as_str().unwrap().to_string();
        let response = router.clone().oneshot(post(Some(&admin))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let root = login(&router, "localhost", "super@optitalent.test").await;
        let root = root["token"].as_str().unwrap().to_string();
        let response = router.clone().oneshot(post(Some(&root))).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["tenant"]["slug"], "acme");
        assert_eq!(created["adminEmail"], "owner@acme.test");
        assert!(created["generatedPassword"].as_str().unwrap().len() >= 12);

        let response = router.clone().oneshot(post(Some(&root))).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let list = axum::http::Request::get("/api/tenants")
            .header(header::AUTHORIZATION, format!("Bearer {root}"))
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(list).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let slugs: Vec<String> = body_json(response)
            .await
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["slug"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(slugs, vec!["acme".to_string(), "default".to_string()]);
    }
}
