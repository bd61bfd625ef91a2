//! Delete user from the store.

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use crate::ServerError;
use crate::user::UserService;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub message: String,
}

pub async fn handler(
    State(users): State<UserService>,
    Path(id): Path<String>,
) -> Result<Json<Response>, ServerError> {
    users.delete(&id).await?;

    Ok(Json(Response {
        message: "User deleted successfully".into(),
    }))
}

#[cfg(test)]
pub(super) mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::json;

    use super::*;
    use crate::user::ObjectId;
    use crate::*;

    #[tokio::test]
    async fn test_delete_handler() {
        let (state, _) = router::tests::state();
        let app = app(state);

        let response = make_request(
            app.clone(),
            Method::POST,
            "/api/users",
            json!({ "name": "A", "email": "a@x.com" }).to_string(),
        )
        .await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: router::users::create::Response = serde_json::from_slice(&body).unwrap();
        let path = format!("/api/users/{}", body.user.id);

        let response =
            make_request(app.clone(), Method::DELETE, &path, String::default()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Response = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.message, "User deleted successfully");

        // User must be deleted.
        let response =
            make_request(app.clone(), Method::DELETE, &path, String::default()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = make_request(app, Method::GET, &path, String::default()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_with_invalid_id() {
        let (state, _) = router::tests::state();
        let app = app(state);

        let response =
            make_request(app.clone(), Method::DELETE, "/api/users/123", String::default())
                .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let path = format!("/api/users/{}", ObjectId::new());
        let response = make_request(app, Method::DELETE, &path, String::default()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
