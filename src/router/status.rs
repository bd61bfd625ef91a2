//! Public instance information for front-end identification.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::locale::LocaleRouter;

/// Structured configuration.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    name: String,
    version: String,
    locales: Vec<String>,
    default_locale: String,
}

/// Public server status (configuration).
pub async fn status(
    State(config): State<Arc<crate::config::Configuration>>,
    State(locales): State<Arc<LocaleRouter>>,
) -> Json<Status> {
    Json(Status {
        name: config.name.clone(),
        version: config.version().to_owned(),
        locales: locales.supported().to_vec(),
        default_locale: locales.default_locale().to_owned(),
    })
}
