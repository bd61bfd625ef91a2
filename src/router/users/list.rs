//! List users, degrading to an empty list when the store fails.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::ServerError;
use crate::user::{UserService, UserSummary};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub users: Vec<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn handler(State(users): State<UserService>) -> (StatusCode, Json<Response>) {
    match users.list().await {
        Ok(users) => (StatusCode::OK, Json(Response { users, error: None })),
        Err(err) => {
            tracing::error!(error = %err, "failed to fetch users");

            let error = match err {
                ServerError::StoreUnavailable(_) => "Failed to connect to database.",
                _ => "Failed to fetch users from database.",
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Response {
                    users: Vec::new(),
                    error: Some(error.into()),
                }),
            )
        },
    }
}
