use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{Credentials, HelloResponse, PublicUser},
        extractors::{AuthUser, BearerToken},
        jwt::{IssuedToken, JwtKeys},
    },
    errors::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/hello", get(hello))
        .route("/auth/refresh_token", get(refresh))
}

fn bad_body(rejection: JsonRejection) -> ApiError {
    warn!(error = %rejection.body_text(), "rejected request body");
    ApiError::Validation(format!("invalid request body: {}", rejection.body_text()))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let Json(creds) = payload.map_err(bad_body)?;

    let user = state
        .auth
        .register(creds)
        .await
        .map_err(|e| ApiError::from_auth(e, &state.auth.keys().realm))?;

    Ok((
        StatusCode::CREATED,
        Json(PublicUser {
            id: user.id,
            username: user.username,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<IssuedToken>, ApiError> {
    let Json(creds) = payload.map_err(bad_body)?;

    let issued = state
        .auth
        .login(creds)
        .await
        .map_err(|e| ApiError::from_auth(e, &state.auth.keys().realm))?;

    Ok(Json(issued))
}

#[instrument(skip_all)]
pub async fn refresh(
    State(keys): State<JwtKeys>,
    BearerToken(token): BearerToken,
) -> Result<Json<IssuedToken>, ApiError> {
    match keys.refresh(&token) {
        Ok(issued) => Ok(Json(issued)),
        Err(e) => {
            warn!(reason = %e, "token refresh rejected");
            Err(ApiError::from_auth(e.into(), &keys.realm))
        }
    }
}

#[instrument(skip_all)]
pub async fn hello(AuthUser(subject): AuthUser) -> Json<HelloResponse> {
    Json(HelloResponse {
        subject,
        text: "You are logged in.",
        current_time: OffsetDateTime::now_utc(),
    })
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, HeaderMap, Request},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::app::build_app;

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with_bearer(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    fn app() -> Router {
        build_app(AppState::fake())
    }

    async fn login_token(app: &Router, username: &str, password: &str) -> String {
        let (status, _, body) = send(
            app,
            post_json("/login", json!({"username": username, "password": password})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().expect("token").to_string()
    }

    #[tokio::test]
    async fn alice_can_register_login_and_reach_hello() {
        let app = app();

        let (status, _, body) = send(
            &app,
            post_json("/register", json!({"username": "alice", "password": "s3cret"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["username"], "alice");
        assert!(body["id"].is_string());
        assert!(body.get("password").is_none());
        assert!(body.get("password_hash").is_none());

        let (status, _, body) = send(
            &app,
            post_json("/login", json!({"username": "alice", "password": "s3cret"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["expires_at"].is_string());
        let token = body["token"].as_str().unwrap().to_string();

        let (status, _, body) = send(&app, get_with_bearer("/auth/hello", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subject"], "alice");

        let (status, headers, body) = send(&app, get_with_bearer("/auth/hello", "garbage")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["kind"], "verification");
        assert_eq!(
            headers.get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer realm=\"jwt auth\""
        );
    }

    #[tokio::test]
    async fn missing_authorization_header_is_rejected() {
        let app = app();
        let request = Request::builder()
            .uri("/auth/hello")
            .body(Body::empty())
            .unwrap();
        let (status, headers, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], 401);
        assert!(headers.contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn wrong_password_matches_unknown_user_response() {
        let app = app();
        send(
            &app,
            post_json("/register", json!({"username": "alice", "password": "s3cret"})),
        )
        .await;

        let wrong = send(
            &app,
            post_json("/login", json!({"username": "alice", "password": "wrong"})),
        )
        .await;
        let unknown = send(
            &app,
            post_json("/login", json!({"username": "mallory", "password": "wrong"})),
        )
        .await;

        assert_eq!(wrong.0, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.0, unknown.0);
        assert_eq!(wrong.2, unknown.2);
        assert_eq!(wrong.2["kind"], "authentication");
        assert_eq!(wrong.2["message"], "incorrect username or password");
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let app = app();
        let first = send(
            &app,
            post_json("/register", json!({"username": "alice", "password": "one"})),
        )
        .await;
        assert_eq!(first.0, StatusCode::CREATED);

        let (status, _, body) = send(
            &app,
            post_json("/register", json!({"username": "alice", "password": "two"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "conflict");
        assert_eq!(body["message"], "username already exists");
    }

    #[tokio::test]
    async fn missing_fields_and_bad_json_are_bad_requests() {
        let app = app();

        let (status, _, body) = send(&app, post_json("/register", json!({"username": "alice"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation");
        assert_eq!(body["message"], "missing username or password");

        let (status, _, _) = send(&app, post_json("/login", json!({"password": "x"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let request = Request::builder()
            .method("POST")
            .uri("/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation");
    }

    #[tokio::test]
    async fn refresh_issues_new_token_for_same_subject() {
        let app = app();
        send(
            &app,
            post_json("/register", json!({"username": "alice", "password": "s3cret"})),
        )
        .await;
        let token = login_token(&app, "alice", "s3cret").await;

        let (status, _, body) = send(&app, get_with_bearer("/auth/refresh_token", &token)).await;
        assert_eq!(status, StatusCode::OK);
        let refreshed = body["token"].as_str().unwrap();

        let (status, _, body) = send(&app, get_with_bearer("/auth/hello", refreshed)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subject"], "alice");
    }

    #[tokio::test]
    async fn refresh_rejects_invalid_token() {
        let app = app();
        let (status, headers, _) = send(&app, get_with_bearer("/auth/refresh_token", "1234")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(headers.contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn every_challenge_uses_the_configured_realm() {
        let app = build_app(AppState::fake_with_realm("staff area"));
        let expected = "Bearer realm=\"staff area\"";

        let (status, headers, _) = send(
            &app,
            post_json("/login", json!({"username": "ghost", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(headers.get(header::WWW_AUTHENTICATE).unwrap(), expected);

        for uri in ["/auth/hello", "/auth/refresh_token"] {
            let (status, headers, _) = send(&app, get_with_bearer(uri, "garbage")).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(headers.get(header::WWW_AUTHENTICATE).unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = app();
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
