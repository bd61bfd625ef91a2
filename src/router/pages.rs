//! Localized page shell.
//!
//! Pages only describe the context a client needs to render: the locale,
//! its text direction and where the API lives.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::config::Configuration;
use crate::locale::LocaleRouter;

/// Locales written right to left.
const RTL_LOCALES: [&str; 1] = ["ar"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ltr,
    Rtl,
}

impl Direction {
    pub fn of(locale: &str) -> Self {
        if RTL_LOCALES.contains(&locale) {
            Direction::Rtl
        } else {
            Direction::Ltr
        }
    }
}

/// Page context sent to clients.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub locale: String,
    pub direction: Direction,
    /// Path below the locale, starting with `/`.
    pub path: String,
    pub api_base_url: String,
}

fn render(
    config: &Configuration,
    locales: &LocaleRouter,
    locale: String,
    path: &str,
) -> Response {
    if !locales.is_supported(&locale) {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Page not found" })),
        )
            .into_response();
    }

    Json(Page {
        direction: Direction::of(&locale),
        locale,
        path: format!("/{}", path.trim_matches('/')),
        api_base_url: config.url.clone(),
    })
    .into_response()
}

/// Handler for `GET /{locale}`.
pub async fn home(
    State(config): State<Arc<Configuration>>,
    State(locales): State<Arc<LocaleRouter>>,
    Path(locale): Path<String>,
) -> Response {
    render(&config, &locales, locale, "")
}

/// Handler for `GET /{locale}/{*path}`.
pub async fn page(
    State(config): State<Arc<Configuration>>,
    State(locales): State<Arc<LocaleRouter>>,
    Path((locale, path)): Path<(String, String)>,
) -> Response {
    render(&config, &locales, locale, &path)
}
