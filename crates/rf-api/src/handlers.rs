//! # rf-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the query engine.

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use rf_core::error::QueryError;
use rf_core::models::{PostId, VoteTargetKind};
use rf_core::QueryEngine;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub engine: QueryEngine,
}

impl AppState {
    pub fn new(engine: QueryEngine) -> Self {
        Self { engine }
    }
}

/// Everything a handler can fail with, mapped onto HTTP statuses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Query(QueryError::Retrieval(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Query(QueryError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // Storage details stay in the log, never in the body.
        let message = match self {
            ApiError::Query(err) => {
                log::error!("query failed: {err}");
                match err {
                    QueryError::Retrieval(_) => "internal error".to_string(),
                    QueryError::Cancelled => "request cancelled".to_string(),
                }
            }
            other => other.to_string(),
        };
        HttpResponse::build(status).json(json!({ "error": message }))
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

/// `GET /api/search?q=`: posts, boards and clubs in one envelope.
/// A missing or blank `q` is a valid "no results" response, not a 400.
pub async fn search(
    data: web::Data<AppState>,
    params: web::Query<SearchParams>,
) -> Result<HttpResponse, ApiError> {
    let results = data.engine.search(&params.q).await?;
    Ok(HttpResponse::Ok().json(results))
}

/// `GET /api/posts/{id}`: the post, its tally and its comment tree.
pub async fn view_thread(
    data: web::Data<AppState>,
    path: web::Path<PostId>,
) -> Result<HttpResponse, ApiError> {
    let post_id = path.into_inner();
    match data.engine.thread(post_id).await? {
        Some(view) => Ok(HttpResponse::Ok().json(view)),
        None => Err(ApiError::NotFound(format!("post {post_id}"))),
    }
}

/// `GET /api/posts/{id}/comments`
pub async fn comment_tree(
    data: web::Data<AppState>,
    path: web::Path<PostId>,
) -> Result<HttpResponse, ApiError> {
    let tree = data.engine.build_tree(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(tree))
}

/// `GET /api/votes/{kind}/{id}` returns `{"likes": n, "dislikes": n}`, the shape the
/// post page polls after a like/dislike click.
pub async fn vote_tally(
    data: web::Data<AppState>,
    path: web::Path<(String, i64)>,
) -> Result<HttpResponse, ApiError> {
    let (kind, id) = path.into_inner();
    let kind: VoteTargetKind = kind
        .parse()
        .map_err(|e: rf_core::models::UnknownTargetKind| ApiError::BadRequest(e.to_string()))?;

    let tally = data.engine.tally(kind.target(id)).await?;
    Ok(HttpResponse::Ok().json(tally))
}
