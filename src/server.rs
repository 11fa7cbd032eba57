//! Web server module for the exporter.
//!
//! Serves the metrics endpoint and the liveness/readiness probes.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

use crate::collector::{CollectorRegistry, ScrapeContext};
use crate::metrics::{HandlerMetrics, MetricsError, TEXT_CONTENT_TYPE};

/// Header carrying the scraper's timeout in seconds.
pub const SCRAPE_TIMEOUT_HEADER: &str = "X-Prometheus-Scrape-Timeout-Seconds";

/// HSTS value set on https requests.
pub const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains; preload";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<CollectorRegistry>,
    /// Bound on concurrent scrapes; `None` means unbounded.
    pub limiter: Option<Arc<Semaphore>>,
    pub handler_metrics: HandlerMetrics,
}

impl AppState {
    /// `max_requests` of 0 disables the bound.
    ///
    /// The metrics handler's own counters are registered in the registry's
    /// process registry.
    pub fn new(
        registry: Arc<CollectorRegistry>,
        max_requests: usize,
    ) -> Result<Self, MetricsError> {
        let limiter = (max_requests > 0).then(|| Arc::new(Semaphore::new(max_requests)));
        let handler_metrics = HandlerMetrics::registered(registry.registry())?;
        Ok(Self {
            registry,
            limiter,
            handler_metrics,
        })
    }
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState, metrics_path: &str) -> Router {
    Router::new()
        .route(metrics_path, get(metrics_handler))
        .route("/-/healthy", get(healthy_handler))
        .route("/-/ready", get(ready_handler))
        .layer(middleware::from_fn(hsts_layer))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .with_state(state)
}

/// Liveness probe.
async fn healthy_handler() -> &'static str {
    "OK"
}

/// Readiness probe.
async fn ready_handler() -> &'static str {
    "OK"
}

/// Serve one scrape, counting it by status code.
async fn metrics_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let _in_flight = state.handler_metrics.track();
    let response = scrape_response(&state, &headers).await;
    state.handler_metrics.observe(response.status().as_u16());
    response
}

/// Run one scrape and render it in the text exposition format.
async fn scrape_response(state: &AppState, headers: &HeaderMap) -> Response {
    let _permit = match &state.limiter {
        Some(limiter) => match Arc::clone(limiter).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!("Too many concurrent scrape requests");
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Too many concurrent scrape requests",
                )
                    .into_response();
            }
        },
        None => None,
    };

    let mut ctx = ScrapeContext::new();
    if let Some(timeout) = scrape_timeout(headers) {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => ctx = ctx.with_deadline(deadline),
            None => tracing::warn!(
                timeout = ?timeout,
                "Scrape timeout out of range, scraping without deadline"
            ),
        }
    }

    match state.registry.render(&ctx).await {
        Ok(body) => ([(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {e}")).into_response()
        }
    }
}

/// Parse the scrape timeout header. Invalid values are logged and ignored.
fn scrape_timeout(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(SCRAPE_TIMEOUT_HEADER)?;
    let parsed = raw
        .to_str()
        .map_err(|e| e.to_string())
        .and_then(|v| v.trim().parse::<f64>().map_err(|e| e.to_string()))
        .and_then(|secs| Duration::try_from_secs_f64(secs).map_err(|e| e.to_string()));

    match parsed {
        Ok(timeout) => Some(timeout),
        Err(e) => {
            tracing::error!(
                value = ?raw,
                error = %e,
                "Failed to parse timeout from Prometheus header"
            );
            None
        }
    }
}

/// Add `Strict-Transport-Security` to responses of https requests.
async fn hsts_layer(req: Request, next: Next) -> Response {
    let https = req.uri().scheme_str() == Some("https")
        || req
            .headers()
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("https"));

    let mut response = next.run(req).await;
    if https {
        response.headers_mut().insert(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(HSTS_VALUE),
        );
    }
    response
}
