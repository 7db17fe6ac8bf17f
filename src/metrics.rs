//! Prometheus metrics.
//!
//! Exposes:
//! - `rag_helpdesk_http_request_duration_seconds` (histogram by route)
//! - `rag_helpdesk_http_requests_total` (counter by route and status)
//! - `rag_helpdesk_classifications_total` (counter by label)
//! - `rag_helpdesk_command_duration_seconds`, `rag_helpdesk_command_total`,
//!   `rag_helpdesk_command_inflight` for CLI commands
//! - process metrics via `process` collector
//!
//! The scrape endpoint runs on its own address, separate from the web app.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use once_cell::sync::Lazy;
use prometheus::process_collector::ProcessCollector;
use prometheus::{
    default_registry, register_histogram_vec, register_int_counter_vec, register_int_gauge_vec,
    Encoder, HistogramVec, IntCounterVec, IntGaugeVec, TextEncoder,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

static PROCESS_COLLECTOR: Lazy<()> = Lazy::new(|| {
    if let Err(err) = default_registry().register(Box::new(ProcessCollector::for_self())) {
        warn!("Failed to register process collector: {}", err);
    }
});

static HTTP_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    // Model calls dominate: 10ms up to ~80s.
    let buckets =
        prometheus::exponential_buckets(0.01, 2.0, 14).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "rag_helpdesk_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "route"],
        buckets
    )
    .expect("failed to register http duration histogram")
});

static HTTP_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "rag_helpdesk_http_requests_total",
        "HTTP requests by route and status code",
        &["method", "route", "status"]
    )
    .expect("failed to register http counter")
});

static CLASSIFICATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "rag_helpdesk_classifications_total",
        "Routed questions by classification",
        &["label"]
    )
    .expect("failed to register classification counter")
});

static COMMAND_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets =
        prometheus::exponential_buckets(0.05, 2.0, 14).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "rag_helpdesk_command_duration_seconds",
        "CLI command duration in seconds",
        &["command"],
        buckets
    )
    .expect("failed to register command duration histogram")
});

static COMMAND_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "rag_helpdesk_command_total",
        "Total command executions by status",
        &["command", "status"]
    )
    .expect("failed to register command counter")
});

static COMMAND_INFLIGHT: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "rag_helpdesk_command_inflight",
        "Number of in-flight commands",
        &["command"]
    )
    .expect("failed to register inflight gauge")
});

fn init_collectors() {
    Lazy::force(&PROCESS_COLLECTOR);
    Lazy::force(&HTTP_DURATION);
    Lazy::force(&HTTP_TOTAL);
    Lazy::force(&CLASSIFICATIONS);
    Lazy::force(&COMMAND_DURATION);
    Lazy::force(&COMMAND_TOTAL);
    Lazy::force(&COMMAND_INFLIGHT);
}

/// Record one finished HTTP request. `route` is the matched route template.
pub fn record_http_request(method: &str, route: &str, status: u16, duration: Duration) {
    HTTP_DURATION
        .with_label_values(&[method, route])
        .observe(duration.as_secs_f64());
    HTTP_TOTAL
        .with_label_values(&[method, route, &status.to_string()])
        .inc();
}

pub fn record_classification(label: &str) {
    CLASSIFICATIONS.with_label_values(&[label]).inc();
}

/// Increment inflight gauge for a command.
pub fn record_command_start(command: &'static str) {
    init_collectors();
    COMMAND_INFLIGHT.with_label_values(&[command]).inc();
}

/// Record command completion with duration and status.
pub fn record_command_result(command: &'static str, duration: Duration, success: bool) {
    init_collectors();
    COMMAND_INFLIGHT.with_label_values(&[command]).dec();
    COMMAND_DURATION
        .with_label_values(&[command])
        .observe(duration.as_secs_f64());
    COMMAND_TOTAL
        .with_label_values(&[command, if success { "ok" } else { "error" }])
        .inc();
}

fn plain(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}

async fn metrics_response() -> Result<Response<Full<Bytes>>, Infallible> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", err);
        return Ok(plain(StatusCode::INTERNAL_SERVER_ERROR, "encode error"));
    }

    let mut response = plain(StatusCode::OK, buffer);
    if let Ok(value) = HeaderValue::from_str(encoder.format_type()) {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    Ok(response)
}

async fn handle_request(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    match req.uri().path() {
        "/metrics" => metrics_response().await,
        _ => Ok(plain(StatusCode::NOT_FOUND, Bytes::new())),
    }
}

async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Prometheus metrics endpoint started");

    loop {
        let (stream, peer) = listener.accept().await?;
        let service = service_fn(handle_request);
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(?peer, "Metrics connection error: {}", err);
            }
        });
    }
}

/// Spawn the metrics HTTP endpoint on the given address.
pub fn spawn_metrics_server(addr: SocketAddr) {
    init_collectors();
    tokio::spawn(async move {
        if let Err(err) = serve(addr).await {
            error!(%addr, "Metrics server failed: {}", err);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn scrape() -> String {
        let response = metrics_response().await.expect("metrics response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[test]
    fn records_http_requests_by_route_and_status() {
        record_http_request("POST", "/test-route-a", 200, Duration::from_millis(30));
        record_http_request("POST", "/test-route-a", 500, Duration::from_millis(5));

        assert_eq!(
            HTTP_TOTAL
                .with_label_values(&["POST", "/test-route-a", "200"])
                .get(),
            1
        );
        assert_eq!(
            HTTP_TOTAL
                .with_label_values(&["POST", "/test-route-a", "500"])
                .get(),
            1
        );
        assert_eq!(
            HTTP_DURATION
                .with_label_values(&["POST", "/test-route-a"])
                .get_sample_count(),
            2
        );
    }

    #[test]
    fn records_command_lifecycle() {
        let cmd = "test_command_lifecycle";

        record_command_start(cmd);
        assert_eq!(COMMAND_INFLIGHT.with_label_values(&[cmd]).get(), 1);

        record_command_result(cmd, Duration::from_millis(120), false);

        assert_eq!(COMMAND_INFLIGHT.with_label_values(&[cmd]).get(), 0);
        assert_eq!(COMMAND_TOTAL.with_label_values(&[cmd, "error"]).get(), 1);
        assert_eq!(
            COMMAND_DURATION.with_label_values(&[cmd]).get_sample_count(),
            1
        );
    }

    #[tokio::test]
    async fn scrape_contains_registered_metrics() {
        init_collectors();
        record_classification("chat");
        record_http_request("GET", "/test-scrape", 200, Duration::from_millis(1));

        let text = scrape().await;
        assert!(text.contains("rag_helpdesk_http_requests_total"));
        assert!(text.contains("/test-scrape"));
        assert!(text.contains("rag_helpdesk_classifications_total"));
    }

    #[tokio::test]
    async fn scrape_has_text_content_type() {
        let response = metrics_response().await.unwrap();
        let content_type = response.headers().get(CONTENT_TYPE).unwrap();
        assert!(content_type.to_str().unwrap().starts_with("text/plain"));
    }
}
