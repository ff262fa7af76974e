//! Defines every route of the quote board.
//!
//! ## Structure
//! - **Pages**
//!   - `GET        /`             : all quotes, newest first
//!   - `GET        /quote?{fp}`   : one quote by fingerprint
//!   - `GET|POST   /add-quote`    : add a quote (password protected)
//!   - `GET|POST   /upload-video` : upload a video to attach (password protected)
//!   - `GET        /incorrect`    : wrong password notice
//!   - `GET        /robots.txt`   : disallow all crawlers
//!
//! - **Files**
//!   - `GET /embed/{*name}`: uploaded videos, served from the videos directory
//!
//! - **Probes**
//!   - `GET /healthz`, `GET /readyz`

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        quote_handlers::{add_quote, add_quote_form, list_quotes, view_quote},
        static_handlers::{incorrect, robots_txt},
        video_handlers::{upload_video, upload_video_form},
    },
    services::session::session_middleware,
    state::AppState,
};
use axum::{Router, extract::DefaultBodyLimit, middleware, routing::get};
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Build the full application router.
///
/// Only the two form routes resolve a visitor `Session`; read-only pages,
/// static files and probes never create one.
pub fn routes(state: AppState) -> Router {
    let forms = Router::new()
        .route("/add-quote", get(add_quote_form).post(add_quote))
        .route(
            "/upload-video",
            get(upload_video_form)
                .post(upload_video)
                .layer(DefaultBodyLimit::max(state.config.max_upload_bytes)),
        )
        .route_layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            session_middleware,
        ));

    Router::new()
        .route("/", get(list_quotes))
        .route("/quote", get(view_quote))
        .route("/incorrect", get(incorrect))
        .merge(forms)
        .route("/robots.txt", get(robots_txt))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .nest_service("/embed", ServeDir::new(&state.config.videos_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
