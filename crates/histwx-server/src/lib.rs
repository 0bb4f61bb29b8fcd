use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use opentelemetry::metrics::{Counter, MeterProvider};
use opentelemetry_prometheus::exporter;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use histwx_archive::{HistoricResolver, UpdateOutcome};
use histwx_core::AttributeKey;

/// One configured sensor group behind the read API
pub struct SensorGroup {
    pub location: String,
    pub offset_days: u32,
    resolver: Mutex<HistoricResolver>,
}

pub struct AppState {
    ready: AtomicBool,
    registry: Registry,
    #[allow(dead_code)]
    provider: SdkMeterProvider,
    requests_total: Counter<u64>,
    groups: Vec<SensorGroup>,
}

pub fn build_app(resolvers: Vec<HistoricResolver>) -> (Router, Arc<AppState>) {
    // Prometheus exporter via OpenTelemetry
    let registry = Registry::new();
    let reader = exporter()
        .with_registry(registry.clone())
        .build()
        .expect("prom exporter");
    let provider = SdkMeterProvider::builder().with_reader(reader).build();
    let meter = provider.meter("histwx-server");

    let requests_total = meter
        .u64_counter("histwx_requests_total")
        .with_description("Total HTTP requests served")
        .init();

    let groups = resolvers
        .into_iter()
        .map(|resolver| SensorGroup {
            location: resolver.location().to_string(),
            offset_days: resolver.offset_days(),
            resolver: Mutex::new(resolver),
        })
        .collect();

    let state = Arc::new(AppState {
        ready: AtomicBool::new(false),
        registry,
        provider,
        requests_total,
        groups,
    });

    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/sensors", get(sensors))
        .route("/api/v1/current", get(current))
        .with_state(Arc::clone(&state));

    (router, state)
}

/// Periodically refresh every resolver in the background.
pub fn spawn_refresh(state: Arc<AppState>, every: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            for group in &state.groups {
                let mut resolver = group.resolver.lock().await;
                if resolver.update() == UpdateOutcome::Changed {
                    tracing::info!(
                        location = %group.location,
                        offset_days = group.offset_days,
                        "sample changed"
                    );
                }
            }
        }
    })
}

pub fn set_ready(state: &Arc<AppState>, is_ready: bool) {
    state.ready.store(is_ready, Ordering::Relaxed);
}

async fn healthz(State(state): State<Arc<AppState>>) -> StatusCode {
    state.requests_total.add(1, &[]);
    StatusCode::OK
}

async fn readyz(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn metrics(
    State(state): State<Arc<AppState>>,
) -> (
    [(axum::http::header::HeaderName, axum::http::HeaderValue); 1],
    String,
) {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buf) {
        tracing::warn!(error=?e, "failed to encode metrics");
    }
    let body = String::from_utf8(buf).unwrap_or_default();
    let header = (
        header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    ([header], body)
}

/// Metadata for every group x attribute pair
async fn sensors(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.requests_total.add(1, &[]);

    let mut out = Vec::with_capacity(state.groups.len() * AttributeKey::ALL.len());
    for group in &state.groups {
        let resolver = group.resolver.lock().await;
        for key in AttributeKey::ALL {
            let icon = match key {
                AttributeKey::Moon => resolver.moon_icon(),
                _ => key.icon(),
            };
            out.push(serde_json::json!({
                "unique_id": key.unique_id(&group.location, group.offset_days),
                "name": key.entity_name(&group.location, group.offset_days),
                "unit": key.unit(),
                "icon": icon,
            }));
        }
    }

    (StatusCode::OK, Json(out))
}

#[derive(Deserialize)]
struct CurrentQuery {
    location: String,
    offset_days: u32,
}

/// Latest envelope for one sensor group; 204 until the first resolution
async fn current(
    State(state): State<Arc<AppState>>,
    Query(q): Query<CurrentQuery>,
) -> impl IntoResponse {
    state.requests_total.add(1, &[]);

    let Some(group) = state
        .groups
        .iter()
        .find(|g| g.location == q.location && g.offset_days == q.offset_days)
    else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let resolver = group.resolver.lock().await;
    match resolver.envelope() {
        Some(envelope) => (StatusCode::OK, Json(envelope)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
