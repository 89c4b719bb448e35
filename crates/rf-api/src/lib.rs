//! # rf-api
//!
//! The JSON query surface for Rusty-Forum: search, thread views, comment
//! trees and vote tallies.

pub mod handlers;
pub mod middleware;

use actix_web::web;

/// Mounts the read-only query routes under `/api`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // Cross-entity search (e.g., /api/search?q=rust)
            .route("/search", web::get().to(handlers::search))
            // Thread view (e.g., /api/posts/42)
            .route("/posts/{id}", web::get().to(handlers::view_thread))
            .route("/posts/{id}/comments", web::get().to(handlers::comment_tree))
            // Live counters (e.g., /api/votes/comment/7)
            .route("/votes/{kind}/{id}", web::get().to(handlers::vote_tally)),
    );
}
