use axum::{
    extract::{MatchedPath, Request},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};

/// Log one line when a request arrives and one when it completes, at a level
/// chosen by the response status class.
pub async fn log_request(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let req_id: String = request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    tracing::debug!(
        request_id = %req_id,
        method = %method,
        uri = %uri,
        "incoming request"
    );

    let response = next.run(request).await;
    let status = response.status();
    let duration_ms = start.elapsed().as_millis();

    match status_class(status) {
        StatusClass::ServerError => tracing::error!(
            request_id = %req_id,
            method = %method,
            route = %route,
            status = %status,
            duration_ms = %duration_ms,
            "request failed"
        ),
        StatusClass::ClientError => tracing::warn!(
            request_id = %req_id,
            method = %method,
            route = %route,
            status = %status,
            duration_ms = %duration_ms,
            "request rejected"
        ),
        StatusClass::Success => tracing::info!(
            request_id = %req_id,
            method = %method,
            route = %route,
            status = %status,
            duration_ms = %duration_ms,
            "request completed"
        ),
    }

    response
}

#[derive(Debug, PartialEq, Eq)]
enum StatusClass {
    Success,
    ClientError,
    ServerError,
}

fn status_class(status: StatusCode) -> StatusClass {
    if status.is_server_error() {
        StatusClass::ServerError
    } else if status.is_client_error() {
        StatusClass::ClientError
    } else {
        StatusClass::Success
    }
}

pub fn request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}
