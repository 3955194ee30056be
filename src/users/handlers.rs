use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::{
    auth::{
        dto::UserResponse,
        jwt::AuthUser,
        validators::{validate_email, validate_password, validate_username},
    },
    error::ApiError,
    state::AppState,
    users::model::{PublicUser, UserUpdate},
};

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 {
    100
}

/// Self-service profile changes. `is_active` is not client-settable.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<PublicUser>,
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/me", patch(update_me).delete(delete_me))
}

#[instrument(skip(state, query))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<Pagination>, QueryRejection>,
) -> Result<Json<UserListResponse>, ApiError> {
    let Query(p) = query
        .map_err(|e| ApiError::validation_with("Invalid query parameters", vec![e.body_text()]))?;
    let users: Vec<PublicUser> = state
        .users
        .list_active(p.limit, p.offset)
        .await?
        .into_iter()
        .map(PublicUser::from)
        .collect();
    debug!(caller = user_id, count = users.len(), "listed users");
    Ok(Json(UserListResponse { users }))
}

fn validate_update(req: &UpdateUserRequest) -> Result<(), ApiError> {
    if let Some(email) = &req.email {
        if !validate_email(email) {
            return Err(ApiError::validation("Invalid email format"));
        }
    }
    if let Some(password) = &req.password {
        let errors = validate_password(password);
        if !errors.is_empty() {
            return Err(ApiError::validation_with("Invalid password", errors));
        }
    }
    if let Some(username) = &req.username {
        let errors = validate_username(username);
        if !errors.is_empty() {
            return Err(ApiError::validation_with("Invalid username", errors));
        }
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Json(req) = payload?;
    validate_update(&req)?;

    let update = UserUpdate {
        email: req.email,
        username: req.username,
        password: req.password,
        is_active: None,
    };
    if update.is_empty() {
        return Err(ApiError::validation("No updatable fields provided"));
    }

    let current = state.users.get_by_id(user_id).await?.ok_or(ApiError::NotFound)?;
    if !current.is_active {
        warn!(user_id, "update attempted on deactivated account");
        return Err(ApiError::Deactivated);
    }

    let user = state
        .users
        .update(user_id, update)
        .await?
        .ok_or(ApiError::NotFound)?;

    info!(user_id, "user updated");
    Ok(Json(UserResponse { user: user.into() }))
}

#[instrument(skip(state))]
pub async fn delete_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<StatusCode, ApiError> {
    if !state.users.soft_delete(user_id).await? {
        return Err(ApiError::NotFound);
    }
    info!(user_id, "user deactivated");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        extract::FromRef,
        http::{header, Method, Request},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{app::build_app, auth::jwt::JwtKeys, config::AppConfig};

    use super::*;

    struct Harness {
        app: Router,
        state: AppState,
    }

    impl Harness {
        fn new() -> Self {
            let state = AppState::in_memory(AppConfig::for_tests());
            Self {
                app: build_app(state.clone()),
                state,
            }
        }

        async fn user(&self, email: &str, username: &str) -> (i64, String) {
            let user = self
                .state
                .users
                .create(email, username, "Passw0rd")
                .await
                .unwrap();
            let token = JwtKeys::from_ref(&self.state).sign(user.id).unwrap();
            (user.id, token)
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            token: &str,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut req = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {token}"));
            let body = match body {
                Some(v) => {
                    req = req.header(header::CONTENT_TYPE, "application/json");
                    Body::from(v.to_string())
                }
                None => Body::empty(),
            };
            let res = self.app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
            let status = res.status();
            let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
                .await
                .unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }
    }

    #[tokio::test]
    async fn list_excludes_deactivated_users() {
        let h = Harness::new();
        let (_, token) = h.user("a@b.com", "alice").await;
        let (bob, _) = h.user("b@b.com", "bob").await;
        h.state.users.soft_delete(bob).await.unwrap();

        let (status, body) = h.send(Method::GET, "/api/users", &token, None).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body["users"]
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["username"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["alice"]);
    }

    #[tokio::test]
    async fn list_honours_paging() {
        let h = Harness::new();
        let (_, token) = h.user("a@b.com", "alice").await;
        h.user("b@b.com", "bob").await;
        h.user("c@b.com", "carol").await;

        let (_, body) = h
            .send(Method::GET, "/api/users?limit=1&offset=1", &token, None)
            .await;
        assert_eq!(body["users"][0]["username"], "bob");
        assert_eq!(body["users"].as_array().unwrap().len(), 1);

        let (status, _) = h
            .send(Method::GET, "/api/users?limit=abc", &token, None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_me_changes_allowed_fields() {
        let h = Harness::new();
        let (id, token) = h.user("a@b.com", "alice").await;

        let (status, body) = h
            .send(
                Method::PATCH,
                "/api/users/me",
                &token,
                Some(json!({ "username": "alice_new", "password": "N3wPassword" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["username"], "alice_new");

        let stored = h.state.users.get_by_id(id).await.unwrap().unwrap();
        assert!(crate::auth::password::verify_password("N3wPassword", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn update_me_validates_and_detects_conflicts() {
        let h = Harness::new();
        let (_, token) = h.user("a@b.com", "alice").await;
        h.user("b@b.com", "bob").await;

        let (status, body) = h
            .send(Method::PATCH, "/api/users/me", &token, Some(json!({ "email": "nope" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid email format");

        let (status, body) = h
            .send(Method::PATCH, "/api/users/me", &token, Some(json!({ "email": "b@b.com" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Email already registered");

        let (status, body) = h
            .send(Method::PATCH, "/api/users/me", &token, Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No updatable fields provided");
    }

    #[tokio::test]
    async fn delete_me_deactivates_and_blocks_login() {
        let h = Harness::new();
        let (id, token) = h.user("a@b.com", "alice").await;

        let (status, _) = h.send(Method::DELETE, "/api/users/me", &token, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(!h.state.users.get_by_id(id).await.unwrap().unwrap().is_active);

        let (status, body) = h
            .send(Method::PATCH, "/api/users/me", &token, Some(json!({ "username": "zed" })))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Account is deactivated");

        let (status, body) = h
            .send(
                Method::POST,
                "/api/auth/login",
                "",
                Some(json!({ "email": "a@b.com", "password": "Passw0rd" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Account is deactivated");
    }

    #[tokio::test]
    async fn delete_unknown_user_is_404() {
        let h = Harness::new();
        let token = JwtKeys::from_ref(&h.state).sign(777).unwrap();
        let (status, _) = h.send(Method::DELETE, "/api/users/me", &token, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
