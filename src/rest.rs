//! REST API layer using Axum.
//!
//! Public routes: signup, login, health. Everything else sits behind the
//! bearer-token middleware, which puts the caller's id into the request
//! extensions. All routes are served at the root and again under `/api`.

use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::accounts::{AuthService, LoginResponse, Signup};
use crate::articles::{ArticleFlags, ArticleService, SaveArticle};
use crate::auth::TokenManager;
use crate::error::{ApiError, ApiResult};
use crate::models::{FetchedArticle, SavedArticle, Summary, UserProfile};
use crate::news::{NewsGateway, NewsProvider};
use crate::storage::Storage;

/// Services shared by all handlers. Each one owns its own handle to the store.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub articles: ArticleService,
    pub news: NewsGateway,
}

impl AppState {
    pub fn new(
        storage: Storage,
        tokens: TokenManager,
        bcrypt_cost: u32,
        provider: Arc<dyn NewsProvider>,
    ) -> Self {
        Self {
            auth: AuthService::new(storage.clone(), tokens, bcrypt_cost),
            articles: ArticleService::new(storage.clone()),
            news: NewsGateway::new(storage, provider),
        }
    }
}

/// Authenticated caller, inserted by [`auth_middleware`].
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Ack {
    pub message: String,
}

impl Ack {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    let user_id = state.auth.authenticate(token)?;
    req.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(req).await)
}

fn api_routes(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/auth/profile", get(profile_handler))
        .route("/news", get(news_handler))
        .route("/articles/save", post(save_handler))
        .route("/articles/saved", get(list_handler))
        .route("/articles/:id", delete(delete_handler).patch(flags_handler))
        .route("/articles/delete/:id", delete(delete_handler))
        .route("/articles/summarize/:id", post(summarize_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/health", get(health_handler))
        .merge(protected)
        .with_state(state)
}

/// Create the Axum router.
pub fn create_router(state: AppState) -> Router {
    let api = api_routes(Arc::new(state));
    Router::new().merge(api.clone()).nest("/api", api)
}

/// CORS and request tracing. An empty origin list allows any origin.
pub fn with_http_layers(router: Router, cors_origins: &[String]) -> Router {
    let cors = if cors_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = cors_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(%origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };
    router.layer(cors).layer(TraceLayer::new_for_http())
}

async fn signup_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Signup>, JsonRejection>,
) -> ApiResult<Json<Ack>> {
    let Json(signup) = payload?;
    state.auth.register(signup).await?;
    Ok(Ack::new("User registered successfully"))
}

async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(login) = payload?;
    Ok(Json(state.auth.login(&login.email, &login.password).await?))
}

async fn profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.auth.profile(user_id)?))
}

async fn news_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> ApiResult<Json<Vec<FetchedArticle>>> {
    Ok(Json(state.news.fetch_for_user(user_id).await?))
}

async fn save_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    payload: Result<Json<SaveArticle>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SavedArticle>)> {
    let Json(input) = payload?;
    let saved = state.articles.save(user_id, input)?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn list_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> ApiResult<Json<Vec<SavedArticle>>> {
    Ok(Json(state.articles.list(user_id)?))
}

async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(article_id): Path<String>,
) -> ApiResult<Json<Ack>> {
    state.articles.delete(user_id, &article_id)?;
    Ok(Ack::new("Article deleted successfully"))
}

async fn flags_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(article_id): Path<String>,
    payload: Result<Json<ArticleFlags>, JsonRejection>,
) -> ApiResult<Json<SavedArticle>> {
    let Json(flags) = payload?;
    Ok(Json(state.articles.update_flags(user_id, &article_id, flags)?))
}

async fn summarize_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(article_id): Path<String>,
) -> ApiResult<Json<Summary>> {
    Ok(Json(state.articles.summarize(user_id, &article_id)?))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ManualClock;
    use async_trait::async_trait;
    use axum::{body::Body, http::Method};
    use chrono::Utc;
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt; // For .oneshot() testing

    struct StubProvider;

    #[async_trait]
    impl NewsProvider for StubProvider {
        async fn search(&self, query: &str) -> ApiResult<Vec<FetchedArticle>> {
            if query == "outage" {
                return Err(ApiError::Gateway {
                    status: Some(429),
                    message: "rate limited".into(),
                });
            }
            Ok(vec![FetchedArticle {
                title: format!("{query} headline"),
                description: Some("Something good happened.".into()),
                content: None,
                url: format!("https://news.test/{query}"),
                image: None,
                published_at: None,
                source: Some("Stub".into()),
            }])
        }
    }

    fn app_with_clock(clock: ManualClock) -> Router {
        let storage = Storage::open_temporary().expect("storage");
        let tokens =
            TokenManager::with_clock(b"rest-test-secret", Duration::from_secs(3600), Arc::new(clock));
        create_router(AppState::new(storage, tokens, 4, Arc::new(StubProvider)))
    }

    fn app() -> Router {
        app_with_clock(ManualClock::new(Utc::now()))
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = axum::http::Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .expect("request");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn signup_and_login(app: &Router, email: &str, interests: &[&str]) -> (String, String) {
        let (status, _) = send(
            app,
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({
                "name": "Reader",
                "email": email,
                "password": "pa55word",
                "interests": interests,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": email, "password": "pa55word" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["user"].get("passwordHash").is_none());
        assert!(body["user"].get("password_hash").is_none());
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    fn article_body(tags: Value) -> Value {
        json!({
            "title": "Rust 2.0 announced",
            "description": "This is great and wonderful. The community celebrated. More soon.",
            "url": "https://news.test/rust",
            "image": "https://news.test/rust.png",
            "publishedAt": "2025-03-01T10:00:00Z",
            "source": { "name": "Wire", "url": "https://news.test" },
            "tags": tags,
        })
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        let (status, _) = send(&app, Method::GET, "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_signup_login_profile() {
        let app = app();
        let (token, user_id) = signup_and_login(&app, "ada@example.com", &["science"]).await;

        let (status, profile) = send(&app, Method::GET, "/auth/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["id"], user_id.as_str());
        assert_eq!(profile["email"], "ada@example.com");
        assert_eq!(profile["interests"], json!(["science"]));

        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({ "name": "Again", "email": "ADA@example.com", "password": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "conflict");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "pa55wore" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_validation_errors() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({ "email": "no-name@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        let app = app();
        for (method, uri) in [
            (Method::GET, "/auth/profile"),
            (Method::GET, "/news"),
            (Method::GET, "/articles/saved"),
            (Method::POST, "/articles/save"),
            (Method::DELETE, "/articles/0190a0b0-0000-7000-8000-000000000000"),
            (Method::POST, "/articles/summarize/0190a0b0-0000-7000-8000-000000000000"),
        ] {
            let (status, _) = send(&app, method.clone(), uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
            let (status, _) = send(&app, method.clone(), uri, Some("garbage"), None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let clock = ManualClock::new(Utc::now());
        let app = app_with_clock(clock.clone());
        let (token, _) = signup_and_login(&app, "late@example.com", &[]).await;

        let (status, _) = send(&app, Method::GET, "/auth/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        clock.advance(chrono::Duration::seconds(3601));
        let (status, _) = send(&app, Method::GET, "/auth/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_news_uses_first_interest_and_surfaces_gateway_errors() {
        let app = app();
        let (token, _) = signup_and_login(&app, "fan@example.com", &["sports", "tech"]).await;
        let (status, body) = send(&app, Method::GET, "/news", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["title"], "sports headline");

        let (token, _) = signup_and_login(&app, "none@example.com", &[]).await;
        let (_, body) = send(&app, Method::GET, "/api/news", Some(&token), None).await;
        assert_eq!(body[0]["title"], "general headline");

        let (token, _) = signup_and_login(&app, "down@example.com", &["outage"]).await;
        let (status, body) = send(&app, Method::GET, "/news", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "gateway_error");
        assert!(body["message"].as_str().unwrap().contains("rate limited"));
    }

    #[tokio::test]
    async fn test_article_lifecycle_and_owner_scoping() {
        let app = app();
        let (alice, _) = signup_and_login(&app, "alice@example.com", &["tech"]).await;
        let (bob, _) = signup_and_login(&app, "bob@example.com", &["tech"]).await;

        let (status, body) =
            send(&app, Method::POST, "/articles/save", Some(&alice), Some(article_body(json!("  ")))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");

        let (status, saved) = send(
            &app,
            Method::POST,
            "/articles/save",
            Some(&alice),
            Some(article_body(json!("tech, sports, tech"))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(saved["tags"], json!(["sports", "tech"]));
        assert_eq!(saved["isRead"], false);
        assert_eq!(saved["source"], "Wire");
        let id = saved["id"].as_str().unwrap().to_string();

        let (_, listed) = send(&app, Method::GET, "/articles/saved", Some(&alice), None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        let (_, listed) = send(&app, Method::GET, "/articles/saved", Some(&bob), None).await;
        assert_eq!(listed, json!([]));

        let uri = format!("/articles/summarize/{id}");
        let (status, summary) = send(&app, Method::POST, &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["summary"].as_array().unwrap().len(), 3);
        assert_eq!(summary["sentiment"], "Positive");
        let (status, _) = send(&app, Method::POST, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let uri = format!("/articles/{id}");
        let (status, _) =
            send(&app, Method::PATCH, &uri, Some(&bob), Some(json!({ "isLiked": true }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, updated) =
            send(&app, Method::PATCH, &uri, Some(&alice), Some(json!({ "isLiked": true }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["isLiked"], true);

        let (status, body) = send(&app, Method::DELETE, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");

        let legacy = format!("/api/articles/delete/{id}");
        let (status, _) = send(&app, Method::DELETE, &legacy, Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, Method::DELETE, &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, listed) = send(&app, Method::GET, "/articles/saved", Some(&alice), None).await;
        assert_eq!(listed, json!([]));
    }
}
