//! Error handler for the user directory.

use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use sqlx::Error as SQLxError;
use thiserror::Error;
use validator::ValidationErrors;

pub type Result<T> = std::result::Result<T, ServerError>;

/// PostgreSQL `unique_violation` code.
const UNIQUE_VIOLATION: &str = "23505";

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Axum(#[from] JsonRejection),

    #[error("invalid user ID format")]
    InvalidIdentifier,

    #[error("user not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("{0}")]
    SeedFailure(String),

    #[error("SQL request failed: {0}")]
    Sql(SQLxError),
}

impl From<SQLxError> for ServerError {
    fn from(err: SQLxError) -> Self {
        match &err {
            SQLxError::PoolTimedOut
            | SQLxError::PoolClosed
            | SQLxError::Io(_)
            | SQLxError::Tls(_) => ServerError::StoreUnavailable(err.to_string()),
            SQLxError::Database(db)
                if db.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                ServerError::Conflict("User with this email already exists".into())
            },
            _ => ServerError::Sql(err),
        }
    }
}

impl ServerError {
    /// HTTP status bound to this error kind.
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Validation(_)
            | ServerError::Axum(_)
            | ServerError::InvalidIdentifier => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::StoreUnavailable(_)
            | ServerError::SeedFailure(_)
            | ServerError::Sql(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short message read by clients in the `error` field.
    pub fn short_message(&self) -> String {
        match self {
            ServerError::Validation(errors) => first_message(errors),
            ServerError::Axum(_) => "Invalid request body".into(),
            ServerError::InvalidIdentifier => "Invalid user ID format".into(),
            ServerError::NotFound => "User not found".into(),
            ServerError::Conflict(message) | ServerError::SeedFailure(message) => {
                message.clone()
            },
            ServerError::StoreUnavailable(_) => {
                "Failed to connect to database.".into()
            },
            ServerError::Sql(_) => "Database request failed.".into(),
        }
    }
}

/// Structure for detailed error responses.
#[derive(Debug, Serialize)]
pub struct ResponseError {
    error: String,
    r#type: Option<String>,
    title: String,
    status: u16,
    detail: String,
    instance: Option<String>,
    errors: Option<Vec<FieldError>>,
}

impl ResponseError {
    /// Update error status code.
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code.as_u16();
        self
    }

    /// Update `title` field.
    pub fn title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    /// Update the short `error` message.
    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.error = message.into();
        self
    }

    /// Add detailed error.
    pub fn details(mut self, description: &str) -> Self {
        self.detail = description.into();
        self
    }

    /// Automatically add errors field.
    pub fn errors(mut self, errors: &ValidationErrors) -> Self {
        self.errors = Some(parse_validation_errors(errors));
        self
    }

    /// Transform [`ResponseError`] into axum [`Response`].
    pub fn into_response(self) -> std::result::Result<Response, axum::http::Error> {
        if let Ok(body) = serde_json::to_string(&self) {
            Response::builder()
                .status(self.status)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
        } else {
            Ok(internal_server_error())
        }
    }
}

impl Default for ResponseError {
    fn default() -> Self {
        Self {
            error: "Internal server error".to_owned(),
            r#type: None,
            title: "Internal server error.".to_owned(),
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            detail: String::default(),
            instance: None,
            errors: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct FieldError {
    field: String,
    message: String,
}

fn parse_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, issues)| {
            issues.iter().map(move |issue| FieldError {
                field: field.to_string(),
                message: issue
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| issue.code.to_string()),
            })
        })
        .collect::<Vec<_>>();
    fields.sort_by(|a, b| a.field.cmp(&b.field));
    fields
}

/// First message in field order, so the output does not depend on map order.
fn first_message(errors: &ValidationErrors) -> String {
    parse_validation_errors(errors)
        .into_iter()
        .next()
        .map(|e| e.message)
        .unwrap_or_else(|| "Invalid request body".into())
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let response = ResponseError::default()
            .title("There were validation errors with your request.")
            .details(&self.to_string())
            .error(self.short_message())
            .status(self.status());

        let response = match &self {
            ServerError::Validation(validation_errors) => {
                response.errors(validation_errors)
            },

            ServerError::InvalidIdentifier => {
                response.title("Malformed identifier.")
            },

            ServerError::NotFound => response.title("Resource not found."),

            ServerError::Conflict(_) => response.title("Resource already exists."),

            ServerError::StoreUnavailable(_)
            | ServerError::SeedFailure(_)
            | ServerError::Sql(_) => {
                tracing::error!(err = %self, "server returned 500 status");

                response.title("Internal server error.").details("")
            },

            ServerError::Axum(_) => response,
        };

        response
            .into_response()
            .unwrap_or_else(|_| internal_server_error())
    }
}

fn internal_server_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(
            serde_json::json!({
                "error": "Internal server error",
                "type": null,
                "title": "Internal server error.",
                "status": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                "detail": null,
                "instance": null,
                "errors": null,
            })
            .to_string()
            .into(),
        )
        .unwrap_or_else(|_| Response::new("Internal server error".into()))
}
