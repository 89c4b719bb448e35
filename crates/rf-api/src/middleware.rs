//! rusty-forum/crates/rf-api/src/middleware.rs Middleware
//!
//! Access logging, CORS and response headers for the query API.

use actix_cors::Cors;
use actix_web::middleware::{DefaultHeaders, Logger};

/// Access log line per request.
pub fn standard_middleware() -> Logger {
    // remote-ip "request-line" status-code response-size time-taken
    Logger::new("%a \"%r\" %s %b %Dms")
}

// The search box may be served from another origin than the API, and it
// only ever issues GETs.
pub fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET"])
        .max_age(3600)
}

/// Results reflect live votes, so nothing in between may cache them.
pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("Referrer-Policy", "strict-origin-when-cross-origin"))
        .add(("Cache-Control", "no-store"))
}
