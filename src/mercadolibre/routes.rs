// HTTP routes of the MercadoLibre relay

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::oauth;
use crate::config::MercadoLibreConfig;
use crate::error::ApiError;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared state of the relay handlers
#[derive(Clone)]
pub struct RelayState {
    pub config: Arc<MercadoLibreConfig>,
    pub client: Client,
}

impl RelayState {
    pub fn new(config: MercadoLibreConfig, request_timeout: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }
}

/// Query string MercadoLibre appends to the redirect URI
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Health check routes (no auth required)
pub fn health_routes() -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
}

/// OAuth relay and proxy routes
pub fn relay_routes(state: RelayState) -> Router {
    Router::new()
        .route("/mercadolibre/auth", get(authorize_handler))
        .route("/mercadolibre/callback", get(callback_handler))
        .route("/mercadolibre/items", get(list_items_handler))
        .route("/mercadolibre/items/:id", get(get_item_handler))
        .with_state(state)
}

/// Full relay application: routes, CORS and request tracing
pub fn build_app(state: RelayState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(relay_routes(state))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// The admin frontend calls the relay from another origin
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// 302 to `location`
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Caller's MercadoLibre token from `Authorization: Bearer ...`
fn bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::AuthError("Missing bearer token".to_string()))
}

/// GET / - Simple health check
async fn root_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "MercadoLibre relay is running",
        "version": VERSION
    }))
}

/// GET /health - Detailed health check
async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "version": VERSION
    }))
}

/// GET /mercadolibre/auth - Send the user to MercadoLibre's consent page
async fn authorize_handler(State(state): State<RelayState>) -> Result<Response, ApiError> {
    let csrf_state = uuid::Uuid::new_v4().to_string();
    let url = oauth::authorization_url(&state.config, &csrf_state)?;

    tracing::info!("Redirecting to MercadoLibre authorization");
    Ok(found(url.as_str()))
}

/// GET /mercadolibre/callback - Exchange the code and hand the token to the frontend
async fn callback_handler(
    State(state): State<RelayState>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, ApiError> {
    if let Some(error) = params.error {
        tracing::warn!(
            "MercadoLibre authorization denied: {} ({})",
            error,
            params.error_description.as_deref().unwrap_or("no description")
        );
        let url = oauth::frontend_error_url(&state.config, &error)?;
        return Ok(found(url.as_str()));
    }

    let code = params
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ApiError::ValidationError("Missing authorization code".to_string()))?;

    let token = oauth::exchange_code(&state.client, &state.config, &code)
        .await
        .map_err(|e| ApiError::Upstream(format!("{:#}", e)))?;

    let url = oauth::frontend_redirect_url(&state.config, &token, params.state.as_deref())?;
    Ok(found(url.as_str()))
}

/// GET /mercadolibre/items - Items published by the token's owner
async fn list_items_handler(
    State(state): State<RelayState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let token = bearer_token(&headers)?;

    let me = oauth::fetch(&state.client, &state.config, "users/me", &token).await?;
    let user_id = me
        .get("id")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| ApiError::Upstream("users/me response has no id".to_string()))?;

    let items = oauth::fetch(
        &state.client,
        &state.config,
        &format!("users/{}/items/search", user_id),
        &token,
    )
    .await?;

    Ok(Json(items))
}

/// GET /mercadolibre/items/:id - Single item detail for import
async fn get_item_handler(
    State(state): State<RelayState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let token = bearer_token(&headers)?;

    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ApiError::ValidationError(format!("Invalid item id: {}", id)));
    }

    let item = oauth::fetch(
        &state.client,
        &state.config,
        &format!("items/{}", id),
        &token,
    )
    .await?;
    Ok(Json(item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use mockito::Matcher;
    use tower::util::ServiceExt;

    fn state_for(upstream: &str) -> RelayState {
        RelayState::new(
            MercadoLibreConfig {
                client_id: "1234".to_string(),
                client_secret: "secret".to_string(),
                redirect_uri: "https://relay.example.com/mercadolibre/callback".to_string(),
                frontend_callback_url: "http://localhost:5173/admin/mercadolibre".to_string(),
                auth_url: upstream.to_string(),
                api_url: upstream.to_string(),
            },
            5,
        )
        .unwrap()
    }

    async fn call(app: Router, request: Request<Body>) -> Response {
        app.oneshot(request).await.unwrap()
    }

    fn location(response: &Response) -> String {
        response.headers()[header::LOCATION]
            .to_str()
            .unwrap()
            .to_string()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_err());

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert!(bearer_token(&headers).is_err());

        headers.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert!(bearer_token(&headers).is_err());

        headers.insert(header::AUTHORIZATION, "Bearer APP_USR-1".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap(), "APP_USR-1");
    }

    #[tokio::test]
    async fn test_authorize_redirects_to_mercadolibre() {
        let app = build_app(state_for("https://auth.mercadolibre.com.ar"));
        let response = call(
            app,
            Request::builder()
                .uri("/mercadolibre/auth")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = location(&response);
        assert!(location.starts_with("https://auth.mercadolibre.com.ar/authorization?"));
        assert!(location.contains("client_id=1234"));
        assert!(location.contains("state="));
    }

    #[tokio::test]
    async fn test_callback_relays_token_to_frontend() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("client_id".into(), "1234".into()),
                Matcher::UrlEncoded("client_secret".into(), "secret".into()),
                Matcher::UrlEncoded("code".into(), "TG-code".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token":"APP_USR-1","token_type":"Bearer","expires_in":21600,"user_id":42,"refresh_token":"TG-r"}"#)
            .expect(1)
            .create_async()
            .await;

        let app = build_app(state_for(&server.url()));
        let response = call(
            app,
            Request::builder()
                .uri("/mercadolibre/callback?code=TG-code&state=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            location(&response),
            "http://localhost:5173/admin/mercadolibre?access_token=APP_USR-1&refresh_token=TG-r&user_id=42&expires_in=21600&state=abc"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_callback_without_code() {
        let app = build_app(state_for("http://127.0.0.1:1"));
        let response = call(
            app,
            Request::builder()
                .uri("/mercadolibre/callback")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["type"], "validation_error");
    }

    #[tokio::test]
    async fn test_callback_denied_by_user() {
        let app = build_app(state_for("http://127.0.0.1:1"));
        let response = call(
            app,
            Request::builder()
                .uri("/mercadolibre/callback?error=access_denied&error_description=denied")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            location(&response),
            "http://localhost:5173/admin/mercadolibre?error=access_denied"
        );
    }

    #[tokio::test]
    async fn test_callback_exchange_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant","message":"Error validating grant"}"#)
            .create_async()
            .await;

        let app = build_app(state_for(&server.url()));
        let response = call(
            app,
            Request::builder()
                .uri("/mercadolibre/callback?code=expired")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("400"));
    }

    #[tokio::test]
    async fn test_list_items_proxies_with_bearer() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/me")
            .match_header("authorization", "Bearer APP_USR-1")
            .with_status(200)
            .with_body(r#"{"id":42,"nickname":"INMOBILIARIA"}"#)
            .create_async()
            .await;
        let search = server
            .mock("GET", "/users/42/items/search")
            .match_header("authorization", "Bearer APP_USR-1")
            .with_status(200)
            .with_body(r#"{"results":["MLA1","MLA2"],"paging":{"total":2}}"#)
            .expect(1)
            .create_async()
            .await;

        let app = build_app(state_for(&server.url()));
        let response = call(
            app,
            Request::builder()
                .uri("/mercadolibre/items")
                .header("authorization", "Bearer APP_USR-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["results"], json!(["MLA1", "MLA2"]));
        search.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_items_requires_bearer() {
        let app = build_app(state_for("http://127.0.0.1:1"));
        let response = call(
            app,
            Request::builder()
                .uri("/mercadolibre/items")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_get_item_passes_upstream_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/items/MLA404")
            .with_status(404)
            .with_body(r#"{"message":"Item with id MLA404 not found"}"#)
            .create_async()
            .await;

        let app = build_app(state_for(&server.url()));
        let response = call(
            app,
            Request::builder()
                .uri("/mercadolibre/items/MLA404")
                .header("authorization", "Bearer APP_USR-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_item_rejects_odd_ids() {
        let app = build_app(state_for("http://127.0.0.1:1"));
        let response = call(
            app,
            Request::builder()
                .uri("/mercadolibre/items/MLA1%2F..")
                .header("authorization", "Bearer APP_USR-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_root_endpoint() {
        let response = call(
            health_routes(),
            Request::builder().uri("/").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], VERSION);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = call(
            health_routes(),
            Request::builder().uri("/health").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
    }
}
