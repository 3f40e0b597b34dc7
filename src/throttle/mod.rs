//! Per-client sliding-window throttle for sensitive endpoints.
//!
//! Fixed-window approximation in process memory: one `{window_start, count}`
//! cell per client key, reset when the window elapses. The per-key update is
//! done under a lock so two concurrent requests cannot both slip through at
//! the admission boundary. Counters are process-local; behind multiple
//! instances each process enforces its own budget (see DESIGN.md).

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::warn;

const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
const DEFAULT_MAX_REQUESTS: u32 = 10;

#[derive(Clone, Debug)]
pub struct ThrottleConfig {
    window: Duration,
    max_requests: u32,
    path_fragments: Vec<String>,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ThrottleConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            max_requests: DEFAULT_MAX_REQUESTS,
            path_fragments: vec!["/v1/auth/".to_string()],
        }
    }

    #[must_use]
    pub fn with_window_seconds(mut self, seconds: u64) -> Self {
        self.window = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_max_requests(mut self, max_requests: u32) -> Self {
        self.max_requests = max_requests;
        self
    }

    #[must_use]
    pub fn with_path_fragments(mut self, fragments: Vec<String>) -> Self {
        self.path_fragments = fragments;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allowed,
    Limited { retry_after: Duration },
}

struct Window {
    started: Instant,
    count: u32,
}

pub struct RequestThrottle {
    config: ThrottleConfig,
    // Cells are created lazily and never removed; bounded growth per
    // distinct client key is the accepted trade-off.
    windows: Mutex<HashMap<String, Window>>,
}

impl std::fmt::Debug for RequestThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestThrottle")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RequestThrottle {
    #[must_use]
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Whether the throttle watches this path.
    #[must_use]
    pub fn applies_to(&self, path: &str) -> bool {
        self.config
            .path_fragments
            .iter()
            .any(|fragment| path.contains(fragment.as_str()))
    }

    /// Admit or reject one request for `client_key`.
    pub fn check(&self, client_key: &str) -> ThrottleDecision {
        self.check_at(client_key, Instant::now())
    }

    fn check_at(&self, client_key: &str, now: Instant) -> ThrottleDecision {
        // Counter state stays usable even if a holder panicked.
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let window = windows.entry(client_key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(window.started) >= self.config.window {
            window.started = now;
            window.count = 0;
        }

        window.count += 1;
        if window.count > self.config.max_requests {
            let elapsed = now.duration_since(window.started);
            let retry_after = self.config.window.saturating_sub(elapsed);
            ThrottleDecision::Limited { retry_after }
        } else {
            ThrottleDecision::Allowed
        }
    }
}

/// Client key for throttling: first forwarded-for entry when present,
/// otherwise the direct peer headers, otherwise a shared bucket.
fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        })
        .unwrap_or("unknown")
        .to_string()
}

/// Middleware guarding sensitive paths; rejections short-circuit with 429
/// before any business logic runs.
pub async fn throttle_middleware(
    State(throttle): State<Arc<RequestThrottle>>,
    request: Request,
    next: Next,
) -> Response {
    if !throttle.applies_to(request.uri().path()) {
        return next.run(request).await;
    }

    let key = client_key(request.headers());
    match throttle.check(&key) {
        ThrottleDecision::Allowed => next.run(request).await,
        ThrottleDecision::Limited { retry_after } => {
            warn!(client = %key, path = %request.uri().path(), "request throttled");
            let retry_after_seconds = retry_after.as_secs().max(1);
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(RETRY_AFTER, retry_after_seconds.to_string())],
                Json(json!({ "error": "Too many requests, slow down" })),
            )
                .into_response()
        }
    }
}
