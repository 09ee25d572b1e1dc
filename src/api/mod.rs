//! Minimal HTTP surface: the display read path plus the commands that feed
//! the store. Every response uses the `{"c", "d", "m"}` envelope clients
//! already expect.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use serde::Serialize;

mod error;
mod routes;

pub use error::ApiError;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    /// Zero on success, otherwise one of the `CODE_*` values in `error`.
    pub c: i32,
    pub d: T,
    pub m: String,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            c: 0,
            d: data,
            m: String::new(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/phrases", get(routes::get_phrases))
        .route(
            "/phrase",
            post(routes::add_phrase)
                .patch(routes::patch_phrase)
                .delete(routes::delete_phrase),
        )
        .route("/phrase_hot", post(routes::record_clicks))
        .route("/healthz", get(routes::healthz))
        .with_state(state)
}
