//! # Middleware Module
//!
//! Global rate limiting for the Manhaj HTTP API.
//!
//! The budget comes from `Settings::rate_limit` (requests per second,
//! `MANHAJ_RATE_LIMIT` in the environment). Zero disables the limiter.

use super::auth::Lang;
use super::error::Message;
use crate::config::Locale;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Default rate limit: 100 requests per second.
const DEFAULT_RPS: NonZeroU32 = match NonZeroU32::new(100) {
    Some(rps) => rps,
    None => NonZeroU32::MIN,
};

// =============================================================================
// RATE LIMITER
// =============================================================================

/// Global rate limiter type alias.
pub type GlobalRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Create a new global rate limiter. Zero falls back to the default.
pub fn create_rate_limiter(requests_per_second: u32) -> GlobalRateLimiter {
    let rps = NonZeroU32::new(requests_per_second).unwrap_or(DEFAULT_RPS);
    Arc::new(RateLimiter::direct(Quota::per_second(rps)))
}

/// State of the rate limiting layer.
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: GlobalRateLimiter,
    pub locale: Locale,
}

/// Returns 429 with a localized body once the global budget is spent.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match state.limiter.check() {
        Ok(()) => next.run(request).await,
        Err(_) => {
            tracing::warn!("Rate limit exceeded");
            Lang::from_headers(request.headers(), state.locale)
                .message(Message::RateLimited, "retry later")
                .into_response()
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
