//! Configuration manager for the user directory.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::AppState;
use crate::database;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Base URL used by pages when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_PORT: u16 = 3000;

/// Server configuration, read from `config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Base URL pages use to call the API.
    pub url: String,
    /// Listening port.
    pub port: u16,
    version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Related to PostgreSQL configuration.
    #[serde(skip_serializing)]
    pub postgres: Option<Postgres>,
    /// Related to locale-prefixed routing.
    pub locales: Locales,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: env!("CARGO_CRATE_NAME").into(),
            url: DEFAULT_BASE_URL.into(),
            port: DEFAULT_PORT,
            version: VERSION.into(),
            path: PathBuf::default(),
            postgres: None,
            locales: Locales::default(),
        }
    }
}

/// PostgreSQL configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Postgres {
    /// Full connection URL; wins over discrete fields.
    pub url: Option<String>,
    /// Hostname:(?port) for PostgreSQL instance.
    pub address: String,
    /// Database name.
    pub database: Option<String>,
    /// Username credential to connect.
    pub username: Option<String>,
    /// Password credential to connect.
    pub password: Option<String>,
    /// Maximum pool connections.
    pub pool_size: Option<u32>,
}

impl Postgres {
    /// Connection URL for this instance.
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }

        database::LazyPool::url(
            &self.address,
            self.username
                .as_deref()
                .unwrap_or(database::DEFAULT_CREDENTIALS),
            self.password
                .as_deref()
                .unwrap_or(database::DEFAULT_CREDENTIALS),
            self.database
                .as_deref()
                .unwrap_or(database::DEFAULT_DATABASE_NAME),
        )
    }
}

/// Locale routing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Locales {
    /// Supported locale codes, in order of preference.
    pub supported: Vec<String>,
    /// Used when nothing else resolves.
    pub default: String,
    /// Honor the `Accept-Language` header.
    pub detection: bool,
    /// Cookie remembering the last locale.
    pub cookie: String,
}

impl Default for Locales {
    fn default() -> Self {
        Self {
            supported: vec!["en".into(), "ar".into()],
            default: "en".into(),
            detection: true,
            cookie: "NEXT_LOCALE".into(),
        }
    }
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    /// Read the configuration from `path` instead of the default location.
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Normalizes a URL string by ensuring it starts with a valid scheme
    /// (`http` or `https`). Trailing slash is removed.
    fn normalize_url(&self, url: &str) -> Result<String, url::ParseError> {
        let url_with_scheme =
            if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else {
                format!("https://{url}")
            };

        let parsed_url = Url::parse(&url_with_scheme)?;
        Ok(parsed_url.as_str().trim_end_matches('/').to_owned())
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location, then applies environment overrides.
    pub fn read(self) -> Result<Arc<Self>, url::ParseError> {
        let file_path = if self.path.is_file() {
            self.path.clone()
        } else {
            std::env::var("CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| Path::new(DEFAULT_CONFIG_PATH).to_path_buf())
        };

        let mut config = match File::open(&file_path) {
            Ok(file) => match serde_yaml::from_reader::<_, Configuration>(file) {
                Ok(config) => config,
                Err(err) => self.error(err),
            },
            Err(err) => self.error(err),
        };

        // set app version.
        config.version = VERSION.to_owned();

        // environment wins over file.
        if let Ok(url) = std::env::var("API_BASE_URL") {
            config.url = url;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            config.port = port;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.postgres = Some(Postgres {
                url: Some(url),
                ..config.postgres.unwrap_or_default()
            });
        }

        config.url = if config.url.is_empty() {
            DEFAULT_BASE_URL.to_owned()
        } else {
            self.normalize_url(&config.url)?
        };
        config.locales = config.locales.sanitize();

        Ok(Arc::new(config))
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file not found or invalid");
        Self {
            version: VERSION.to_owned(),
            ..Default::default()
        }
    }

    /// Running version.
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl Locales {
    /// Lowercase codes, and make sure the default is supported.
    fn sanitize(mut self) -> Self {
        self.supported = self
            .supported
            .into_iter()
            .map(|l| l.trim().to_ascii_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        self.default = self.default.trim().to_ascii_lowercase();

        if self.supported.is_empty() {
            self.supported = Locales::default().supported;
        }
        if !self.supported.contains(&self.default) {
            tracing::warn!(
                default = %self.default,
                "default locale is not supported, using the first supported one"
            );
            self.default = self.supported[0].clone();
        }
        self
    }
}
