//! Locale-prefixed routing.
//!
//! Every routable path must start with a supported locale code. The
//! decision for one request is computed by [`LocaleRouter::classify`],
//! a pure function over the path and the request's locale signals.

use std::sync::{Arc, LazyLock};

use axum::extract::FromRef;
use regex_lite::Regex;

use crate::AppState;
use crate::config::Locales;

/// First segments never carrying a locale.
const EXCLUDED_PREFIXES: [&str; 4] = ["api", "_next", "metrics", "static"];

/// Two letters with an optional region, e.g. `fr` or `en-US`.
static LOCALE_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]{2}(?:[-_][A-Za-z0-9]{2,4})?$").expect("valid locale pattern")
});

/// Outcome of routing one request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Infrastructure or static asset path, left untouched.
    Excluded,
    /// Path starts with a supported locale.
    Localized { locale: String },
    /// Path must be sent to `location`.
    NeedsRedirect { location: String },
}

/// Per-request locale hints.
#[derive(Debug, Default, Clone, Copy)]
pub struct Signals<'a> {
    /// Locale remembered in a cookie.
    pub cookie: Option<&'a str>,
    /// Raw `Accept-Language` header.
    pub accept_language: Option<&'a str>,
}

/// Routing rules built from [`Locales`].
#[derive(Debug, Clone)]
pub struct LocaleRouter {
    supported: Vec<String>,
    default: String,
    detection: bool,
    cookie: String,
}

impl FromRef<AppState> for Arc<LocaleRouter> {
    fn from_ref(state: &AppState) -> Arc<LocaleRouter> {
        Arc::clone(&state.locales)
    }
}

impl LocaleRouter {
    /// Create a new [`LocaleRouter`].
    pub fn new(config: &Locales) -> Self {
        Self {
            supported: config.supported.clone(),
            default: config.default.clone(),
            detection: config.detection,
            cookie: config.cookie.clone(),
        }
    }

    /// Name of the preference cookie.
    pub fn cookie_name(&self) -> &str {
        &self.cookie
    }

    pub fn supported(&self) -> &[String] {
        &self.supported
    }

    pub fn default_locale(&self) -> &str {
        &self.default
    }

    pub fn is_supported(&self, locale: &str) -> bool {
        self.supported.iter().any(|l| l == locale)
    }

    /// Pick the locale for a request with no valid prefix.
    ///
    /// Cookie first, then `Accept-Language` if detection is on, then default.
    pub fn resolve(&self, signals: &Signals<'_>) -> &str {
        if let Some(locale) = signals
            .cookie
            .and_then(|c| self.supported.iter().find(|l| l.as_str() == c))
        {
            return locale;
        }

        if self.detection {
            if let Some(locale) = signals
                .accept_language
                .and_then(|header| self.negotiate(header))
            {
                return locale;
            }
        }

        &self.default
    }

    /// Best supported language of an `Accept-Language` header.
    fn negotiate(&self, header: &str) -> Option<&str> {
        let mut ranges = header
            .split(',')
            .filter_map(|range| {
                let mut parts = range.trim().split(';');
                let tag = parts.next()?.trim();
                let quality = parts
                    .find_map(|p| p.trim().strip_prefix("q="))
                    .map(|q| q.trim().parse::<f32>().unwrap_or(0.0))
                    .unwrap_or(1.0);
                let primary = tag.split(['-', '_']).next()?.to_ascii_lowercase();
                (quality > 0.0 && !primary.is_empty()).then_some((primary, quality))
            })
            .collect::<Vec<_>>();

        // stable: equal weights keep header order.
        ranges.sort_by(|a, b| b.1.total_cmp(&a.1));

        ranges.into_iter().find_map(|(primary, _)| {
            self.supported
                .iter()
                .find(|l| **l == primary)
                .map(String::as_str)
        })
    }

    /// Route a request path.
    pub fn classify(
        &self,
        path: &str,
        query: Option<&str>,
        signals: &Signals<'_>,
    ) -> Route {
        if is_excluded(path) {
            return Route::Excluded;
        }

        let rest = path.trim_start_matches('/');
        let (first, tail) = match rest.split_once('/') {
            Some((first, tail)) => (first, tail),
            None => (rest, ""),
        };

        if self.is_supported(first) {
            return Route::Localized {
                locale: first.to_owned(),
            };
        }

        // unsupported but well-formed locales are replaced, not nested.
        let remainder = if LOCALE_SHAPE.is_match(first) { tail } else { rest };
        let locale = self.resolve(signals);

        let mut location = format!("/{locale}");
        if !remainder.is_empty() {
            location.push('/');
            location.push_str(remainder);
        }
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            location.push('?');
            location.push_str(query);
        }

        Route::NeedsRedirect { location }
    }
}

/// Whether `path` is an infrastructure route or a file.
fn is_excluded(path: &str) -> bool {
    let rest = path.trim_start_matches('/');
    let first = rest.split('/').next().unwrap_or_default();
    let last = rest.rsplit('/').next().unwrap_or_default();

    EXCLUDED_PREFIXES.contains(&first) || last.contains('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> LocaleRouter {
        LocaleRouter::new(&Locales::default())
    }

    fn redirect(location: &str) -> Route {
        Route::NeedsRedirect {
            location: location.to_owned(),
        }
    }

    #[test]
    fn test_root_redirects_to_default() {
        let router = router();
        let none = Signals::default();

        assert_eq!(router.classify("/", None, &none), redirect("/en"));
        assert_eq!(router.classify("", None, &none), redirect("/en"));
    }

    #[test]
    fn test_supported_prefix_passes_through() {
        let router = router();
        let none = Signals::default();

        for path in ["/ar/x", "/ar", "/ar/", "/en/users/new"] {
            assert!(
                matches!(router.classify(path, None, &none), Route::Localized { .. }),
                "{path} should pass"
            );
        }
        assert_eq!(
            router.classify("/ar/x", None, &none),
            Route::Localized {
                locale: "ar".into()
            }
        );
    }

    #[test]
    fn test_unsupported_locale_is_replaced() {
        let router = router();
        let none = Signals::default();

        assert_eq!(router.classify("/fr/x", None, &none), redirect("/en/x"));
        assert_eq!(router.classify("/fr", None, &none), redirect("/en"));
        assert_eq!(router.classify("/fr/", None, &none), redirect("/en"));
        assert_eq!(router.classify("/en-US/users", None, &none), redirect("/en/users"));
        // case matters for supported codes.
        assert_eq!(router.classify("/AR/x", None, &none), redirect("/en/x"));
    }

    #[test]
    fn test_missing_prefix_is_added() {
        let router = router();
        let none = Signals::default();

        assert_eq!(router.classify("/users", None, &none), redirect("/en/users"));
        assert_eq!(
            router.classify("/users/42", Some("tab=bio"), &none),
            redirect("/en/users/42?tab=bio")
        );
        assert_eq!(router.classify("/about", Some(""), &none), redirect("/en/about"));
    }

    #[test]
    fn test_excluded_paths() {
        let router = router();
        let none = Signals::default();

        for path in [
            "/api/users",
            "/api",
            "/_next/static/chunk.js",
            "/favicon.ico",
            "/status.json",
            "/metrics",
            "/static/logo",
            "/users/avatar.png",
        ] {
            assert_eq!(router.classify(path, None, &none), Route::Excluded, "{path}");
        }
    }

    #[test]
    fn test_cookie_wins_over_header() {
        let router = router();
        let signals = Signals {
            cookie: Some("ar"),
            accept_language: Some("en-US,en;q=0.9"),
        };

        assert_eq!(router.classify("/", None, &signals), redirect("/ar"));
    }

    #[test]
    fn test_unknown_cookie_is_ignored() {
        let router = router();
        let signals = Signals {
            cookie: Some("fr"),
            accept_language: None,
        };

        assert_eq!(router.resolve(&signals), "en");
    }

    #[test]
    fn test_accept_language_negotiation() {
        let router = router();
        let resolve = |header: &str| {
            router
                .resolve(&Signals {
                    cookie: None,
                    accept_language: Some(header),
                })
                .to_owned()
        };

        assert_eq!(resolve("ar"), "ar");
        assert_eq!(resolve("ar-EG,ar;q=0.9"), "ar");
        assert_eq!(resolve("fr-FR, ar;q=0.5, en;q=0.8"), "en");
        assert_eq!(resolve("fr, de"), "en");
        assert_eq!(resolve("ar;q=0, en;q=0.1"), "en");
        assert_eq!(resolve("*"), "en");
    }

    #[test]
    fn test_detection_can_be_disabled() {
        let router = LocaleRouter::new(&Locales {
            detection: false,
            ..Default::default()
        });
        let signals = Signals {
            cookie: None,
            accept_language: Some("ar"),
        };

        assert_eq!(router.resolve(&signals), "en");
    }
}
