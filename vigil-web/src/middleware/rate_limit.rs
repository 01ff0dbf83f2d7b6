//! Fixed-window rate limiting
//!
//! Decisions come from [`RateLimiter`] over the shared store, so limits
//! hold across server instances. When the store itself fails the request
//! is admitted and the failure logged; the limiter protects capacity and
//! must not become the outage.

use std::sync::Arc;

use axum::extract::Request;
use axum::http::{header::RETRY_AFTER, HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::IntoResponse;
use chrono::{Duration, SecondsFormat, Utc};
use tracing::{debug, warn};

use vigil_auth::{RateLimitDecision, RateLimiter};
use vigil_rbac::AuthContext;

use super::auth::client_ip;
use super::GuardFuture;
use crate::errors::WebError;

pub const RATE_LIMIT_LIMIT_HEADER: &str = "X-RateLimit-Limit";
pub const RATE_LIMIT_REMAINING_HEADER: &str = "X-RateLimit-Remaining";
pub const RATE_LIMIT_RESET_HEADER: &str = "X-RateLimit-Reset";

/// Build a guard admitting `max_requests` per `window` per caller.
///
/// Authenticated callers are counted per user id, anonymous callers per
/// client address. Both allowed and denied responses carry the
/// `X-RateLimit-*` headers; denials add `Retry-After` in seconds.
pub fn rate_limit(
    max_requests: u32,
    window: Duration,
) -> impl Fn(Request, Next) -> GuardFuture + Clone {
    move |request: Request, next: Next| {
        Box::pin(async move {
            let limiter = request
                .extensions()
                .get::<Arc<RateLimiter>>()
                .cloned()
                .ok_or_else(|| WebError::internal("Rate limiter not wired into the router"))?;
            let key = limiter_key(&request);

            let decision = match limiter.check(&key, max_requests, window).await {
                Ok(decision) => decision,
                Err(e) => {
                    warn!(key = %key, error = %e, "rate limiter unavailable, admitting request");
                    return Ok(next.run(request).await);
                }
            };

            if !decision.allowed {
                debug!(key = %key, limit = decision.limit, "rate limit exceeded");
                let retry_after = decision.retry_after_secs(Utc::now());
                let mut response =
                    WebError::RateLimited { retry_after_secs: retry_after }.into_response();
                apply_headers(response.headers_mut(), &decision);
                if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                    response.headers_mut().insert(RETRY_AFTER, value);
                }
                return Ok(response);
            }

            let mut response = next.run(request).await;
            apply_headers(response.headers_mut(), &decision);
            Ok(response)
        })
    }
}

/// `user:<id>` for authenticated callers, `ip:<addr>` otherwise
fn limiter_key(request: &Request) -> String {
    if let Some(context) = request.extensions().get::<AuthContext>() {
        return format!("user:{}", context.user_id);
    }
    match client_ip(request) {
        Some(ip) => format!("ip:{ip}"),
        None => "ip:unknown".to_string(),
    }
}

fn apply_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    let values = [
        (RATE_LIMIT_LIMIT_HEADER, decision.limit.to_string()),
        (RATE_LIMIT_REMAINING_HEADER, decision.remaining.to_string()),
        (
            RATE_LIMIT_RESET_HEADER,
            decision.reset_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        ),
    ];
    for (name, value) in values {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }
}
