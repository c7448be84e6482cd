use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all server metrics
const PREFIX: &str = "directus_mcp";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // MCP Metrics
    pub static ref MCP_MESSAGES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_messages_total"), "Total MCP messages by method"),
        &["method", "status"]
    ).expect("Failed to create messages_total metric");

    pub static ref MCP_TOOL_CALLS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_tool_calls_total"), "Total tool calls by tool and outcome"),
        &["tool", "outcome"]
    ).expect("Failed to create tool_calls_total metric");

    pub static ref MCP_TOOL_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_tool_duration_seconds"),
            "Tool execution duration in seconds"
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["tool"]
    ).expect("Failed to create tool_duration_seconds metric");

    // Bootstrap Metrics
    pub static ref BOOTSTRAP_FAILURES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_bootstrap_failures_total"), "Failed per-request server bootstraps"),
        &["stage"]
    ).expect("Failed to create bootstrap_failures_total metric");

    pub static ref BUNDLES_TORN_DOWN_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_bundles_torn_down_total"),
        "Per-request server bundles released"
    ).expect("Failed to create bundles_torn_down_total metric");

    pub static ref ACTIVE_BUNDLES: Gauge = Gauge::new(
        format!("{PREFIX}_active_bundles"),
        "Per-request server bundles currently alive"
    ).expect("Failed to create active_bundles metric");

    // Process Metrics
    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(MCP_MESSAGES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(MCP_TOOL_CALLS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(MCP_TOOL_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(BOOTSTRAP_FAILURES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(BUNDLES_TORN_DOWN_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ACTIVE_BUNDLES.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record a handled MCP message. `status` is "ok" or "error".
pub fn record_mcp_message(method: &str, status: &str) {
    MCP_MESSAGES_TOTAL.with_label_values(&[method, status]).inc();
}

/// Record a tool call. `outcome` is "success", "error" or "panic".
pub fn record_tool_call(tool: &str, outcome: &str, duration: Duration) {
    MCP_TOOL_CALLS_TOTAL
        .with_label_values(&[tool, outcome])
        .inc();

    MCP_TOOL_DURATION_SECONDS
        .with_label_values(&[tool])
        .observe(duration.as_secs_f64());
}

/// Record a bootstrap failure at the given stage
pub fn record_bootstrap_failure(stage: &str) {
    BOOTSTRAP_FAILURES_TOTAL.with_label_values(&[stage]).inc();
}

pub fn bundle_created() {
    ACTIVE_BUNDLES.inc();
}

pub fn bundle_released() {
    ACTIVE_BUNDLES.dec();
    BUNDLES_TORN_DOWN_TOTAL.inc();
}

/// Update process memory usage
pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            for line in status.lines() {
                if line.starts_with("VmRSS:") {
                    // RSS is reported in kB
                    if let Some(kb_str) = line.split_whitespace().nth(1) {
                        if let Ok(kb) = kb_str.parse::<f64>() {
                            PROCESS_MEMORY_BYTES.set(kb * 1024.0);
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
