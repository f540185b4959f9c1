//! HTTP front end.
//!
//! ```text
//! GET /thumb/{path}      square thumbnail (image/jpeg, cached)
//! GET /small/{path}      fit-within preview (image/jpeg, cached)
//! GET /original/{path}   source file as-is
//! GET /view/{path}       single-image HTML page
//! GET /gallery[/{path}]  directory HTML page
//! ```
//!
//! HEAD is accepted wherever GET is. Anything else is 405. Unknown routes
//! are 404, or a 301 to `/gallery/` when `catch_all` is set.
//!
//! The accept loop runs on the calling thread and hands each request to a
//! rayon pool sized by `workers`; handlers share one [`RequestCoordinator`].

use crate::config::{ServerConfig, effective_workers};
use crate::coordinator::{Body, Reply, RequestCoordinator, ServeError, Variant};
use percent_encoding::percent_decode_str;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::sync::Arc;
use thiserror::Error;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tracing::{debug, info, warn};

/// A parsed request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Derivative(Variant, String),
    Original(String),
    View(String),
    Gallery(String),
}

/// Why a URL did not map to a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// No route prefix matched.
    Unmatched,
    /// Percent-decoding produced invalid UTF-8.
    BadEncoding,
}

/// Match a request URL (path plus optional query) to a route.
pub fn parse_route(url: &str) -> Result<Route, RouteError> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map_err(|_| RouteError::BadEncoding)?;

    if decoded == "/gallery" {
        return Ok(Route::Gallery(String::new()));
    }

    let (route, rest) = decoded
        .strip_prefix('/')
        .and_then(|p| p.split_once('/'))
        .ok_or(RouteError::Unmatched)?;
    let rest = rest.to_string();

    match route {
        "thumb" => Ok(Route::Derivative(Variant::Thumb, rest)),
        "small" => Ok(Route::Derivative(Variant::Small, rest)),
        "original" => Ok(Route::Original(rest)),
        "view" => Ok(Route::View(rest)),
        "gallery" => Ok(Route::Gallery(rest)),
        _ => Err(RouteError::Unmatched),
    }
}

/// Produce the reply for one request. No I/O beyond what the route needs.
pub fn handle(coordinator: &RequestCoordinator, method: &Method, url: &str) -> Reply {
    if !matches!(method, Method::Get | Method::Head) {
        return Reply::text(405, "Method Not Allowed");
    }

    match parse_route(url) {
        Ok(Route::Derivative(variant, path)) => coordinator.reply_derivative(variant, &path),
        Ok(Route::Original(path)) => coordinator.reply_original(&path),
        Ok(Route::View(path)) => coordinator.reply_view(&path),
        Ok(Route::Gallery(path)) => coordinator.reply_gallery(&path),
        Err(RouteError::BadEncoding) => Reply::text(400, "Invalid path encoding"),
        Err(RouteError::Unmatched) if coordinator.config().catch_all => {
            Reply::redirect("/gallery/")
        }
        Err(RouteError::Unmatched) => Reply::text(404, "Not Found"),
    }
}

/// Errors that stop the server from starting.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Setup(#[from] ServeError),
    #[error("Cannot build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("Cannot listen on {addr}: {reason}")]
    Bind { addr: String, reason: String },
}

/// Bind `listen` and serve until the process is killed.
pub fn serve(config: Arc<ServerConfig>, listen: &str) -> Result<(), StartupError> {
    let workers = effective_workers(&config);
    let coordinator = Arc::new(RequestCoordinator::new(config)?);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("proofsheet-worker-{i}"))
        .build()?;

    let server = Server::http(listen).map_err(|e| StartupError::Bind {
        addr: listen.to_string(),
        reason: e.to_string(),
    })?;

    info!(
        "Listening on http://{} (base {}, cache {}, {} engine, {} workers)",
        listen,
        coordinator.resolver().base().display(),
        coordinator.cache().dir().display(),
        coordinator.engine_name(),
        workers
    );

    for request in server.incoming_requests() {
        let coordinator = Arc::clone(&coordinator);
        pool.spawn(move || respond(&coordinator, request));
    }
    Ok(())
}

fn respond(coordinator: &RequestCoordinator, request: Request) {
    let method = request.method().clone();
    let url = request.url().to_string();
    let reply = handle(coordinator, &method, &url);
    let status = reply.status;

    let response = match into_response(reply) {
        Ok(response) => response,
        Err(e) => {
            warn!("Failed to open {} for {}: {}", url, method, e);
            into_response(Reply::text(500, "Internal Server Error"))
                .unwrap_or_else(|_| Response::empty(500).boxed())
        }
    };

    debug!("{} {} -> {}", method, url, status);
    // tiny_http drops the body itself for HEAD.
    if let Err(e) = request.respond(response) {
        debug!("Client went away during {}: {}", url, e);
    }
}

/// Bytes shared with the cache, readable without copying.
struct SharedBytes(Arc<Vec<u8>>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

type BoxedResponse = Response<Box<dyn Read + Send>>;

fn into_response(reply: Reply) -> io::Result<BoxedResponse> {
    let mut headers = Vec::new();
    push_header(&mut headers, "Content-Type", reply.content_type);
    push_header(&mut headers, "Cache-Control", reply.cache_control);
    push_header(&mut headers, "Location", reply.location.as_deref());

    let (reader, len): (Box<dyn Read + Send>, usize) = match reply.body {
        Body::Bytes(bytes) => {
            let len = bytes.len();
            (Box::new(Cursor::new(SharedBytes(bytes))), len)
        }
        Body::File(path) => {
            let file = File::open(&path)?;
            let len = usize::try_from(file.metadata()?.len()).map_err(io::Error::other)?;
            (Box::new(file), len)
        }
        Body::Html(s) | Body::Text(s) => {
            let len = s.len();
            (Box::new(Cursor::new(s.into_bytes())), len)
        }
        Body::Empty => (Box::new(io::empty()), 0),
    };

    Ok(Response::new(
        StatusCode(reply.status),
        headers,
        reader,
        Some(len),
        None,
    ))
}

fn push_header(headers: &mut Vec<Header>, name: &str, value: Option<&str>) {
    let Some(value) = value else { return };
    match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
        Ok(header) => headers.push(header),
        Err(()) => warn!("Dropping invalid {} header {:?}", name, value),
    }
}
