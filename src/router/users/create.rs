//! Create a user.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::router::Valid;
use crate::user::{User, UserInput, UserService};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub user: User,
}

/// Handler to create user.
pub async fn handler(
    State(users): State<UserService>,
    Valid(body): Valid<UserInput>,
) -> Result<(StatusCode, Json<Response>)> {
    let user = users.create(body).await?;
    Ok((StatusCode::CREATED, Json(Response { user })))
}
