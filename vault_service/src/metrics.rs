// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use axum::{http::StatusCode, routing::get, Router};
use log::{error, info};
use prometheus::TextEncoder;
use tokio::net::TcpListener;

/// Text exposition of every metric in the global registry.
async fn handle_metrics() -> Result<String, (StatusCode, String)> {
    TextEncoder::new()
        .encode_to_string(&prometheus::gather())
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Serves `GET /metrics` on `port` until the process exits.
pub async fn run_server(port: u16) {
    let app = Router::new().route("/metrics", get(handle_metrics));
    let listener = match TcpListener::bind(("0.0.0.0", port)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind metrics server to port {port}: {e}");
            return;
        }
    };
    info!("Metrics server listening on port {port}");
    if let Err(e) = axum::serve(listener, app).await {
        error!("Metrics server error: {e}");
    }
}

#[cfg(test)]
mod tests {
    use prometheus::{register_int_counter, IntCounter};

    use super::*;

    #[tokio::test]
    async fn registered_counters_are_exposed() {
        let counter: IntCounter =
            register_int_counter!("metrics_exposition_test", "Counter used by a test.").unwrap();
        counter.inc_by(3);

        let body = handle_metrics().await.unwrap();
        assert!(body.contains("metrics_exposition_test 3"));
    }
}
