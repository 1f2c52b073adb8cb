//! # Authentication Module
//!
//! Two independent checks guard the Manhaj HTTP API:
//!
//! 1. An optional shared API key (`MANHAJ_API_KEY`). When set, every request
//!    except `/health` must carry `Authorization: Bearer <key>`.
//! 2. The caller's identity, sent as `X-Actor-Id: <user id>` and resolved to
//!    an [`Actor`] by the [`Authenticated`] extractor on protected routes.
//!
//! Login and session issuance happen in front of this service; it only
//! trusts an already-resolved user id.

use super::AppState;
use super::error::{ApiError, Message};
use crate::config::Locale;
use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{HeaderMap, Request, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use manhaj_core::{Actor, ErrorKind, ManhajError, UserId};
use subtle::ConstantTimeEq;

/// Header carrying the resolved user id.
pub const ACTOR_HEADER: &str = "x-actor-id";

// =============================================================================
// LOCALE
// =============================================================================

/// The caller's message language, negotiated from `Accept-Language`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lang(pub Locale);

impl Lang {
    pub fn from_headers(headers: &HeaderMap, default: Locale) -> Self {
        let accept = headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok());
        Self(Locale::negotiate(accept, default))
    }

    /// Adapter for `map_err`: render an engine error in this language.
    pub fn err(self) -> impl Fn(ManhajError) -> ApiError {
        move |e| ApiError::from_core(e, self.0)
    }

    pub fn message(self, message: Message, detail: impl Into<String>) -> ApiError {
        ApiError::new(message, self.0, detail)
    }
}

impl FromRequestParts<AppState> for Lang {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers, state.settings.locale))
    }
}

// =============================================================================
// ACTOR IDENTITY
// =============================================================================

/// The resolved caller of a protected route.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Actor);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let lang = Lang::from_headers(&parts.headers, state.settings.locale);

        let Some(raw) = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
        else {
            tracing::debug!(event = "auth_failure", reason = "missing_actor");
            return Err(lang.message(Message::Unauthorized, "missing X-Actor-Id header"));
        };

        match state.catalog.actor(&UserId::new(raw)) {
            Ok(actor) => Ok(Self(actor)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(event = "auth_failure", reason = "unknown_actor", actor = %raw);
                Err(lang.message(Message::Unauthorized, format!("unknown actor '{raw}'")))
            }
            Err(e) => Err(ApiError::from_core(e, lang.0)),
        }
    }
}

// =============================================================================
// API KEY AUTHENTICATION
// =============================================================================

/// Get API key from environment variable.
///
/// Returns `Some(key)` if `MANHAJ_API_KEY` is set and non-empty,
/// `None` otherwise (disabling the key check).
pub fn get_api_key_from_env() -> Option<String> {
    std::env::var("MANHAJ_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
}

/// Compare two keys in constant time over the longer of the two lengths.
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    let max_len = provided.len().max(expected.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided.len()].copy_from_slice(provided);
    padded_expected[..expected.len()].copy_from_slice(expected);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided.len() == expected.len()
}

/// API key authentication middleware.
///
/// The key is read on every request so it can be rotated without a restart.
/// `/health` is always allowed for load balancer checks.
pub async fn api_key_auth_middleware(
    State(default_locale): State<Locale>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = get_api_key_from_env() else {
        return next.run(request).await;
    };

    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let lang = Lang::from_headers(request.headers(), default_locale);
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(value) => {
            let provided = value.strip_prefix("Bearer ").unwrap_or(value);
            if keys_match(provided.as_bytes(), expected.as_bytes()) {
                next.run(request).await
            } else {
                tracing::warn!(
                    event = "auth_failure",
                    reason = "invalid_api_key",
                    "Authentication failed: invalid API key"
                );
                lang.message(Message::Unauthorized, "invalid API key")
                    .into_response()
            }
        }
        None => {
            tracing::warn!(
                event = "auth_failure",
                reason = "missing_authorization_header",
                "Missing Authorization header"
            );
            lang.message(Message::Unauthorized, "missing Authorization header")
                .into_response()
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
