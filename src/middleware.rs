//! Middlewares for routes.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use cookie::{Cookie, SameSite};

use crate::locale::{LocaleRouter, Route, Signals};

/// Value of cookie `name` in the `Cookie` headers.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| Cookie::parse(pair.trim()).ok())
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_owned())
}

/// `Set-Cookie` value remembering `locale`.
fn remember(name: &str, locale: &str) -> String {
    Cookie::build((name, locale))
        .path("/")
        .same_site(SameSite::Lax)
        .build()
        .to_string()
}

/// Make sure every routable path carries a supported locale.
///
/// Runs once per request, ahead of page and API handlers.
pub async fn localize(
    State(locales): State<Arc<LocaleRouter>>,
    req: Request,
    next: Next,
) -> Response {
    let headers = req.headers();
    let remembered = cookie_value(headers, locales.cookie_name());
    let signals = Signals {
        cookie: remembered.as_deref(),
        accept_language: headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok()),
    };

    match locales.classify(req.uri().path(), req.uri().query(), &signals) {
        Route::Excluded => next.run(req).await,
        Route::NeedsRedirect { location } => {
            tracing::debug!(from = %req.uri(), to = %location, "locale redirect");
            Redirect::temporary(&location).into_response()
        },
        Route::Localized { locale } => {
            let stale = remembered.as_deref() != Some(locale.as_str());
            let mut response = next.run(req).await;

            if stale {
                let value = remember(locales.cookie_name(), &locale);
                if let Ok(value) = HeaderValue::from_str(&value) {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
            }
            response
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_lookup() {
        let mut headers = HeaderMap::new();
        headers.append(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; NEXT_LOCALE=ar"),
        );
        headers.append(header::COOKIE, HeaderValue::from_static("session=1"));

        assert_eq!(cookie_value(&headers, "NEXT_LOCALE").as_deref(), Some("ar"));
        assert_eq!(cookie_value(&headers, "session").as_deref(), Some("1"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_remember_locale() {
        let value = remember("NEXT_LOCALE", "ar");
        let parsed = Cookie::parse(value.as_str()).unwrap();

        assert_eq!(parsed.name(), "NEXT_LOCALE");
        assert_eq!(parsed.value(), "ar");
        assert_eq!(parsed.path(), Some("/"));
        assert_eq!(parsed.same_site(), Some(SameSite::Lax));
    }
}
