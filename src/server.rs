//! HTTP Listeners
//!
//! The scrape listener serves the collectors' exposition text; the telemetry
//! listener serves the exporter's own metrics.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::collectors::CollectorRegistry;
use crate::error::{Error, Result};
use crate::metrics::{filter_exposition, requested_families, ExporterMetrics};

/// Content type of the text exposition format
pub const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

const INDEX_PAGE: &str = "<html>\n\
<head><title>OpenShift Metrics Server</title></head>\n\
<body>\n\
<h1>OpenShift Metrics</h1>\n\
<ul>\n\
<li><a href='/metrics'>metrics</a></li>\n\
<li><a href='/healthz'>healthz</a></li>\n\
</ul>\n\
</body>\n\
</html>\n";

const TELEMETRY_INDEX_PAGE: &str = "<html>\n\
<head><title>OpenShift State Metrics Telemetry</title></head>\n\
<body>\n\
<h1>OpenShift State Metrics Telemetry</h1>\n\
<ul>\n\
<li><a href='/metrics'>metrics</a></li>\n\
</ul>\n\
</body>\n\
</html>\n";

fn respond(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn not_found() -> Response<Full<Bytes>> {
    respond(StatusCode::NOT_FOUND, "text/plain", "not found")
}

// =============================================================================
// Routes
// =============================================================================

/// Route a scrape listener request
pub fn route_metrics(
    path: &str,
    query: Option<&str>,
    registry: &CollectorRegistry,
) -> Response<Full<Bytes>> {
    match path {
        "/metrics" => {
            let names = requested_families(query);
            let body = filter_exposition(&registry.gather(), &names);
            respond(StatusCode::OK, TEXT_FORMAT, body)
        }
        "/healthz" => respond(StatusCode::OK, "text/plain", "ok"),
        "/" => respond(StatusCode::OK, "text/html", INDEX_PAGE),
        _ => not_found(),
    }
}

/// Route a telemetry listener request
pub fn route_telemetry(path: &str, telemetry: &ExporterMetrics) -> Response<Full<Bytes>> {
    match path {
        "/metrics" => match telemetry.encode() {
            Ok(body) => respond(StatusCode::OK, TEXT_FORMAT, body),
            Err(e) => {
                error!("Failed to encode telemetry: {}", e);
                respond(StatusCode::INTERNAL_SERVER_ERROR, "text/plain", e.to_string())
            }
        },
        "/" => respond(StatusCode::OK, "text/html", TELEMETRY_INDEX_PAGE),
        _ => not_found(),
    }
}

// =============================================================================
// Listeners
// =============================================================================

/// Listen address from a host and port; IPv6 hosts may be bracketed
pub fn listen_addr(host: &str, port: u16) -> Result<SocketAddr> {
    let ip = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    let ip: IpAddr = ip
        .parse()
        .map_err(|e| Error::Config(format!("Invalid listen host {:?}: {}", host, e)))?;
    Ok(SocketAddr::new(ip, port))
}

async fn bind(addr: SocketAddr, what: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind {} on {}: {}", what, addr, e)))?;

    info!("{} listening on {}", what, addr);
    Ok(listener)
}

/// Serve `/metrics`, `/healthz` and `/` until cancelled
pub async fn serve_metrics(
    addr: SocketAddr,
    registry: Arc<CollectorRegistry>,
    cancel: CancellationToken,
) -> Result<()> {
    let listener = bind(addr, "Metrics server").await?;

    loop {
        let stream = tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => accepted?.0,
        };

        let io = TokioIo::new(stream);
        let registry = registry.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let registry = registry.clone();
                async move {
                    debug!(path = req.uri().path(), "Scrape request");
                    Ok::<_, Infallible>(route_metrics(
                        req.uri().path(),
                        req.uri().query(),
                        &registry,
                    ))
                }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                error!("Metrics server connection error: {}", e);
            }
        });
    }

    info!("Metrics server stopped");
    Ok(())
}

/// Serve the exporter's own metrics until cancelled
pub async fn serve_telemetry(
    addr: SocketAddr,
    telemetry: Arc<ExporterMetrics>,
    cancel: CancellationToken,
) -> Result<()> {
    let listener = bind(addr, "Telemetry server").await?;

    loop {
        let stream = tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => accepted?.0,
        };

        let io = TokioIo::new(stream);
        let telemetry = telemetry.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let telemetry = telemetry.clone();
                async move { Ok::<_, Infallible>(route_telemetry(req.uri().path(), &telemetry)) }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                error!("Telemetry server connection error: {}", e);
            }
        });
    }

    info!("Telemetry server stopped");
    Ok(())
}
