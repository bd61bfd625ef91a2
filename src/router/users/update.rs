//! Replace user data.

use axum::Json;
use axum::extract::{Path, State};

use crate::ServerError;
use crate::router::Valid;
use crate::user::{User, UserInput, UserService};

pub async fn handler(
    State(users): State<UserService>,
    Path(id): Path<String>,
    Valid(body): Valid<UserInput>,
) -> Result<Json<User>, ServerError> {
    Ok(Json(users.update(&id, body).await?))
}
