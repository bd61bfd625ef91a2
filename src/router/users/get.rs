//! Get one user.

use axum::Json;
use axum::extract::{Path, State};

use crate::ServerError;
use crate::user::{User, UserService};

pub async fn handler(
    State(users): State<UserService>,
    Path(id): Path<String>,
) -> Result<Json<User>, ServerError> {
    Ok(Json(users.get(&id).await?))
}
