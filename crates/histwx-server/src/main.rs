use std::net::SocketAddr;
use tokio::net::TcpListener;

use histwx_archive::{HistoricResolver, HistoricSeries};
use histwx_core::Observer;

#[tokio::main]
async fn main() {
    // Observability
    histwx_obs::init("histwx-server");

    // Config
    let cfg = histwx_config::AppConfig::load().unwrap_or_default();
    let timezone = cfg.timezone().expect("Invalid station timezone");
    let observer = Observer {
        latitude: cfg.latitude(),
        longitude: cfg.longitude(),
        elevation: cfg.elevation(),
    };

    // One resolver per configured sensor group; load failures are fatal
    let mut resolvers = Vec::with_capacity(cfg.sensors.len());
    for sensor in &cfg.sensors {
        let series = HistoricSeries::load(&sensor.filename, timezone, sensor.offset_days)
            .unwrap_or_else(|e| panic!("Failed to load history file {}: {e}", sensor.filename));
        tracing::info!(
            location = %sensor.location,
            records = series.len(),
            offset_days = sensor.offset_days,
            "history loaded"
        );
        resolvers.push(HistoricResolver::new(
            series,
            timezone,
            observer,
            sensor.location.clone(),
            sensor.offset_days,
            sensor.offset_hours,
        ));
    }

    // Build app and state
    let (app, state) = histwx_server::build_app(resolvers);

    // Refresh samples in the background on the daemon cadence
    let every = std::time::Duration::from_secs(cfg.scan_interval_secs());
    let _refresh = histwx_server::spawn_refresh(state.clone(), every);

    // Start HTTP server
    let addr: SocketAddr = cfg.http_bind().parse().expect("Invalid HTTP bind address");
    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind TCP listener");

    // Mark ready just before serving
    histwx_server::set_ready(&state, true);

    tracing::info!(%addr, "HTTP server listening");
    axum::serve(listener, app).await.expect("server error");
}
