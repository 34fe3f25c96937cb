//! JSON HTTP surface over the content service.

mod handlers;
mod middleware;
mod views;

use std::sync::Arc;

use axum::{Router, middleware as axum_middleware, routing::get};

use crate::{application::content::ContentService, domain::open_graph::SiteIdentity};

use self::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub content: Arc<ContentService>,
    pub site: Arc<SiteIdentity>,
}

impl HttpState {
    pub fn new(content: ContentService, site: SiteIdentity) -> Self {
        Self {
            content: Arc::new(content),
            site: Arc::new(site),
        }
    }
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::health))
        .route("/syntax.css", get(handlers::syntax_stylesheet))
        .route("/{collection}", get(handlers::list_entries))
        .route("/{collection}/{slug}", get(handlers::entry_detail))
        .fallback(handlers::fallback)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
