//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: splits API routes from client
//! assets, records the change log line and dispatches to the handlers.

use crate::config::AppState;
use crate::handler::{articles, static_files};
use crate::http;
use crate::logger;
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_LENGTH, IF_NONE_MATCH, SERVER};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;

const LIVENESS_PATH: &str = "/healthz";

/// API routes under `/api`
#[derive(Debug, PartialEq, Eq)]
enum ApiRoute<'a> {
    /// `/api/articles`
    Articles,
    /// `/api/articles/new`
    NewArticle,
    /// `/api/articles/:id`
    Article(&'a str),
    /// Anything else under `/api`
    Unknown,
}

impl<'a> ApiRoute<'a> {
    /// `None` when the path is not an API path at all
    fn parse(path: &'a str) -> Option<Self> {
        let rest = path.strip_prefix("/api")?;
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }

        let route = match rest.trim_end_matches('/') {
            "/articles" => Self::Articles,
            "/articles/new" => Self::NewArticle,
            other => match other.strip_prefix("/articles/") {
                Some(id) if !id.is_empty() && !id.contains('/') => Self::Article(id),
                _ => Self::Unknown,
            },
        };
        Some(route)
    }
}

/// Main entry point for HTTP request handling
///
/// Generic over the body so the same path serves hyper connections and tests.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<articles::BoxError>,
{
    let (parts, body) = req.into_parts();
    let method = parts.method;
    let path = parts.uri.path();
    let target = parts
        .uri
        .path_and_query()
        .map_or(path, hyper::http::uri::PathAndQuery::as_str);
    let enable_cors = state.config.http.enable_cors;

    let mut response = if method == Method::OPTIONS {
        http::build_options_response(enable_cors)
    } else if let Some(route) = ApiRoute::parse(path) {
        if let Some(resp) = check_body_size(&parts.headers, state.config.http.max_body_size) {
            resp
        } else {
            let mut resp = route_api(route, &method, target, body, &state).await;
            logger::log_api_request(method.as_str(), target, resp.status().as_u16());
            if enable_cors {
                resp.headers_mut()
                    .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
            }
            resp
        }
    } else {
        let if_none_match = parts
            .headers
            .get(IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok());
        route_static(&method, path, target, if_none_match, &state).await
    };

    if let Ok(server) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server);
    }
    Ok(response)
}

/// Dispatch an API route by method
async fn route_api<B>(
    route: ApiRoute<'_>,
    method: &Method,
    target: &str,
    body: B,
    state: &AppState,
) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<articles::BoxError>,
{
    match (route, method) {
        (ApiRoute::Articles, &Method::GET | &Method::HEAD) => {
            state
                .change_log
                .record(&format!("API Request: {method} {target}"));
            articles::list_articles(state).await
        }
        (ApiRoute::Articles, _) => http::json_method_not_allowed("GET, HEAD, OPTIONS"),
        (ApiRoute::NewArticle, &Method::POST) => {
            state
                .change_log
                .record(&format!("POST Request: {method} {target}"));
            articles::create_article(body, state).await
        }
        (ApiRoute::NewArticle, _) => http::json_method_not_allowed("POST, OPTIONS"),
        (ApiRoute::Article(id), &Method::PUT) => {
            state
                .change_log
                .record(&format!("PUT Request: {method} {target}"));
            articles::update_article(id, body, state).await
        }
        (ApiRoute::Article(id), &Method::DELETE) => {
            state
                .change_log
                .record(&format!("DELETE Request: {method} {target}"));
            articles::delete_article(id, state).await
        }
        (ApiRoute::Article(_), _) => http::json_method_not_allowed("PUT, DELETE, OPTIONS"),
        (ApiRoute::Unknown, _) => {
            http::json_error(hyper::StatusCode::NOT_FOUND, "Not Found", None)
        }
    }
}

/// Serve the health probe and client assets
async fn route_static(
    method: &Method,
    path: &str,
    target: &str,
    if_none_match: Option<&str>,
    state: &AppState,
) -> Response<Full<Bytes>> {
    let is_head = match *method {
        Method::GET => false,
        Method::HEAD => true,
        _ => {
            logger::log_warning(&format!("Method not allowed: {method} {path}"));
            return http::build_405_response();
        }
    };

    if path == LIVENESS_PATH {
        return http::build_health_response(is_head);
    }

    if path == "/" {
        state
            .change_log
            .record(&format!("Frontend Request: {method} {target}"));
    }

    static_files::serve_asset(path, is_head, if_none_match, &state.config.static_files).await
}

/// Reject requests whose declared Content-Length exceeds the limit
fn check_body_size(
    headers: &hyper::HeaderMap,
    max_body_size: u64,
) -> Option<Response<Full<Bytes>>> {
    let content_length = headers.get(CONTENT_LENGTH)?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_error(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}
