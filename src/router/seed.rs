//! Reset the user store with fixture data.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::user::UserService;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Handler for `GET /api/seed`.
///
/// Destructive: every existing user is removed first.
pub async fn handler(State(users): State<UserService>) -> (StatusCode, Json<Response>) {
    match users.seed().await {
        Ok(count) => (
            StatusCode::CREATED,
            Json(Response {
                success: true,
                message: Some("Database reset and seeded successfully!".into()),
                count: Some(count),
                error: None,
            }),
        ),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Response {
                success: false,
                message: None,
                count: None,
                error: Some(err.short_message()),
            }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;

    use super::*;
    use crate::*;

    #[tokio::test]
    async fn test_seed_handler_is_repeatable() {
        let (state, _) = router::tests::state();
        let app = app(state);

        for _ in 0..2 {
            let response =
                make_request(app.clone(), Method::GET, "/api/seed", String::default()).await;
            assert_eq!(response.status(), StatusCode::CREATED);

            let body = response.into_body().collect().await.unwrap().to_bytes();
            let body: Response = serde_json::from_slice(&body).unwrap();
            assert!(body.success);
            assert_eq!(body.count, Some(5));
            assert_eq!(
                body.message.as_deref(),
                Some("Database reset and seeded successfully!")
            );
        }

        let response =
            make_request(app, Method::GET, "/api/users", String::default()).await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let users = body["users"].as_array().unwrap();
        assert_eq!(users.len(), 5);
        assert_eq!(users[0]["name"], "John Doe");
        assert_eq!(users[0]["isAdmin"], true);
    }

    #[tokio::test]
    async fn test_seed_handler_without_store() {
        let (state, store) = router::tests::state();
        store.set_offline(true);
        let app = app(state);

        let response = make_request(app, Method::GET, "/api/seed", String::default()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Response = serde_json::from_slice(&body).unwrap();
        assert!(!body.success);
        assert_eq!(body.error.as_deref(), Some("Failed to connect to database."));
    }
}
