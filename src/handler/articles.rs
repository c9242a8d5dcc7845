//! Article API handlers
//!
//! Validate the request, call the store and map the outcome to a JSON
//! response. Request bodies are decoded into [`ArticlePayload`] and turned into
//! [`ArticleFields`] once, before the store is touched.

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::AppState;
use crate::http::{build_413_response, json_error, json_response};
use crate::logger;
use crate::store::{Article, ArticleFields, StoreError};

/// Boxed error produced by request bodies
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

const NOT_FOUND_MESSAGE: &str = "Article not found.";

/// Request body for create and update
#[derive(Debug, Default, Deserialize)]
pub struct ArticlePayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl ArticlePayload {
    pub fn into_fields(self) -> Result<ArticleFields, StoreError> {
        ArticleFields::new(self.title, self.content)
    }
}

#[derive(Serialize)]
struct ArticleMessage<'a> {
    message: &'a str,
    article: &'a Article,
}

#[derive(Serialize)]
struct Message<'a> {
    message: &'a str,
}

/// `GET /api/articles`
pub async fn list_articles(state: &AppState) -> Response<Full<Bytes>> {
    match state.store.list().await {
        Ok(articles) => json_response(StatusCode::OK, &articles),
        Err(e) => store_error_response(&e, "Failed to retrieve articles."),
    }
}

/// `POST /api/articles/new`
pub async fn create_article<B>(body: B, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let fields = match read_fields(body, state.config.http.max_body_size).await {
        Ok(fields) => fields,
        Err(resp) => return resp,
    };

    match state.store.create(fields).await {
        Ok(article) => {
            state
                .change_log
                .record(&format!("Article created: ID {}", article.id));
            json_response(
                StatusCode::CREATED,
                &ArticleMessage {
                    message: "Article created",
                    article: &article,
                },
            )
        }
        Err(e) => store_error_response(&e, "Failed to save article."),
    }
}

/// `PUT /api/articles/:id`
pub async fn update_article<B>(raw_id: &str, body: B, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let fields = match read_fields(body, state.config.http.max_body_size).await {
        Ok(fields) => fields,
        Err(resp) => return resp,
    };

    let Some(id) = parse_id(raw_id) else {
        return json_error(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE, None);
    };

    match state.store.update(id, fields).await {
        Ok(article) => {
            state
                .change_log
                .record(&format!("Article updated: ID {}", article.id));
            json_response(
                StatusCode::OK,
                &ArticleMessage {
                    message: "Article updated",
                    article: &article,
                },
            )
        }
        Err(e) => store_error_response(&e, "Failed to update article."),
    }
}

/// `DELETE /api/articles/:id`
pub async fn delete_article(raw_id: &str, state: &AppState) -> Response<Full<Bytes>> {
    let Some(id) = parse_id(raw_id) else {
        return json_error(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE, None);
    };

    match state.store.delete(id).await {
        Ok(article) => {
            state
                .change_log
                .record(&format!("Article deleted: ID {}", article.id));
            json_response(
                StatusCode::OK,
                &Message {
                    message: "Article deleted successfully",
                },
            )
        }
        Err(e) => store_error_response(&e, "Failed to delete article."),
    }
}

/// Ids that are not unsigned integers cannot name an article
fn parse_id(raw_id: &str) -> Option<u64> {
    raw_id.parse().ok()
}

/// Collect the body (bounded by `max_body_size`) and validate it
async fn read_fields<B>(body: B, max_body_size: u64) -> Result<ArticleFields, Response<Full<Bytes>>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let bytes = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_warning(&format!("Request body exceeds {max_body_size} bytes"));
            return Err(build_413_response());
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body: {e}"));
            return Err(json_error(
                StatusCode::BAD_REQUEST,
                "Failed to read request body.",
                None,
            ));
        }
    };

    let payload = decode_payload(&bytes).map_err(|e| {
        json_error(
            StatusCode::BAD_REQUEST,
            "Invalid JSON body.",
            Some(&e.to_string()),
        )
    })?;

    payload
        .into_fields()
        .map_err(|e| store_error_response(&e, "Invalid request."))
}

/// An empty body or a JSON `null` counts as a payload with no fields
fn decode_payload(bytes: &[u8]) -> Result<ArticlePayload, serde_json::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(ArticlePayload::default());
    }
    let payload: Option<ArticlePayload> = serde_json::from_slice(bytes)?;
    Ok(payload.unwrap_or_default())
}

/// Map a store error to its HTTP status; storage failures carry `details`
fn store_error_response(err: &StoreError, failure: &str) -> Response<Full<Bytes>> {
    match err {
        StoreError::InvalidInput(message) => json_error(StatusCode::BAD_REQUEST, message, None),
        StoreError::NotFound(_) => json_error(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE, None),
        StoreError::IdsExhausted(_)
        | StoreError::StorageCorrupt { .. }
        | StoreError::StorageRead { .. }
        | StoreError::StorageWrite { .. } => {
            logger::log_error(&format!("{failure} {err}"));
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                failure,
                Some(&err.to_string()),
            )
        }
    }
}
