//! Per-attempt tracing spans
//!
//! Every network attempt gets its own span so retries are individually
//! observable. Field names follow the OpenTelemetry HTTP conventions and are
//! picked up as-is by a `tracing-opentelemetry` layer.

use osc_domain::{OpenStackError, Result};
use reqwest::{Method, Response};
use tracing::{field, info_span, Span};
use url::Url;

/// Component and operation names attached to each attempt span.
///
/// Unset values default to the URL host and the HTTP method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceMetadata {
    pub component: Option<String>,
    pub operation: Option<String>,
}

impl TraceMetadata {
    pub fn new(component: impl Into<String>, operation: impl Into<String>) -> Self {
        Self { component: Some(component.into()), operation: Some(operation.into()) }
    }

    pub(crate) fn component_for(&self, url: &Url) -> String {
        self.component
            .clone()
            .unwrap_or_else(|| url.host_str().unwrap_or("unknown").to_string())
    }

    pub(crate) fn operation_for(&self, method: &Method) -> String {
        self.operation.clone().unwrap_or_else(|| method.to_string())
    }
}

/// Open the span covering one attempt.
pub(crate) fn attempt_span(meta: &TraceMetadata, attempt: u32, method: &Method, url: &Url) -> Span {
    let component = meta.component_for(url);
    let operation = meta.operation_for(method);
    info_span!(
        "http.attempt",
        otel.kind = "client",
        component = %component,
        operation = %operation,
        http.method = %method,
        http.url = %url,
        attempt,
        http.status_code = field::Empty,
        otel.status_code = field::Empty,
        error = field::Empty,
    )
}

/// Record the attempt outcome on its span.
pub(crate) fn finish_attempt(span: &Span, result: &Result<Response>) {
    match result {
        Ok(response) => {
            span.record("http.status_code", response.status().as_u16());
            span.record("otel.status_code", "OK");
        }
        Err(error) => record_error(span, error),
    }
}

fn record_error(span: &Span, error: &OpenStackError) {
    if let Some(code) = error.status_code() {
        span.record("http.status_code", code);
    }
    span.record("otel.status_code", "ERROR");
    span.record("error", field::display(error));
}
