//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: route matching, method checks and
//! access logging.

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{REFERER, USER_AGENT};
use hyper::{Method, Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use super::contact::ContactForm;
use super::driver::DriverForm;
use super::submission::handle_submission;
use crate::config::{AppState, Config};
use crate::http;
use crate::logger::{self, AccessLogEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Contact,
    Driver,
    Health,
    NotFound,
}

/// Resolve a request path against the configured endpoints
pub fn resolve(path: &str, config: &Config) -> Route {
    if path == config.forms.contact_path {
        Route::Contact
    } else if path == config.forms.driver_path {
        Route::Driver
    } else if config.health.enabled && path == config.health.liveness_path {
        Route::Health
    } else {
        Route::NotFound
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let entry = state
        .config
        .logging
        .access_log
        .then(|| access_entry(&req, remote_addr));

    let mut response = route_request(req, &state).await;
    http::set_server_header(&mut response, &state.config.http.server_name);

    if let Some(mut entry) = entry {
        entry.status = response.status().as_u16();
        entry.body_bytes = usize::try_from(response.body().size_hint().exact().unwrap_or(0))
            .unwrap_or(usize::MAX);
        entry.request_time_us =
            u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Route request based on path and method
pub async fn route_request<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let route = resolve(req.uri().path(), &state.config);
    let method = req.method().clone();

    match route {
        Route::Contact | Route::Driver if method != Method::POST => {
            logger::log_warning(&format!(
                "Method not allowed: {method} {}",
                req.uri().path()
            ));
            http::build_405_response()
        }
        Route::Contact => handle_submission(&ContactForm, req, state).await,
        Route::Driver => handle_submission(&DriverForm, req, state).await,
        Route::Health if method == Method::GET || method == Method::HEAD => {
            http::build_health_response(method == Method::HEAD)
        }
        Route::Health | Route::NotFound => http::build_404_response(),
    }
}

fn access_entry<B>(req: &Request<B>, remote_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: hyper::header::HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        remote_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_label(req.version()).to_string();
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
