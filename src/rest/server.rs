//! Serves the administrative surface over HTTP/1

use crate::gateway::StatsGateway;

use hyper::body::{Bytes, HttpBody};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

/// Largest request body accepted, in bytes
const MAX_BODY: usize = 64 * 1024;

fn status_only(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

fn into_response(rest: super::Response) -> Response<Body> {
    let status = StatusCode::from_u16(rest.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = match rest.body {
        Some(value) => {
            let mut response = Response::new(Body::from(value.to_string()));
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        None => Response::new(Body::empty()),
    };
    *response.status_mut() = status;
    response
}

/// Buffers a request body of at most `limit` bytes.
/// Returns the status to answer with otherwise.
async fn read_body(mut body: Body, limit: usize) -> Result<Bytes, StatusCode> {
    if body.size_hint().lower() > limit as u64 {
        return Err(StatusCode::PAYLOAD_TOO_LARGE);
    }
    let mut buf = Vec::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk.map_err(|e| {
            debug!("Cannot read a request body: {}", e);
            StatusCode::BAD_REQUEST
        })?;
        if buf.len() + chunk.len() > limit {
            return Err(StatusCode::PAYLOAD_TOO_LARGE);
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(buf))
}

async fn serve(gateway: Arc<StatsGateway>, request: Request<Body>) -> Response<Body> {
    let method = request.method().as_str().to_owned();
    let path = request.uri().path().to_owned();
    let body = match read_body(request.into_body(), MAX_BODY).await {
        Ok(body) => body,
        Err(status) => {
            warn!("Rejecting the body of {} {} with {}", method, path, status);
            return status_only(status);
        }
    };
    debug!("{} {} with a {} byte body", method, path, body.len());

    // Stats queries block until the switch answers
    let handled = tokio::task::spawn_blocking(move || super::handle(&gateway, &method, &path, &body));
    match handled.await {
        Ok(rest) => into_response(rest),
        Err(e) => {
            error!("Request handler failed: {}", e);
            status_only(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Runs the HTTP server on `addr` until it fails
pub fn run(addr: SocketAddr, gateway: Arc<StatsGateway>) -> io::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(async move {
        let make_service = make_service_fn(move |_| {
            let gateway = gateway.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |request| {
                    let gateway = gateway.clone();
                    async move { Ok::<_, Infallible>(serve(gateway, request).await) }
                }))
            }
        });
        let server = Server::try_bind(&addr)
            .map_err(|e| io::Error::new(io::ErrorKind::AddrNotAvailable, e))?
            .serve(make_service);
        info!("REST surface listening on {}", server.local_addr());
        server.await.map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    })
}
