//! Fixed pages that need nothing beyond the site name.

use crate::{state::AppState, views};
use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse},
};

const ROBOTS_TXT: &str = "User-agent: *\nDisallow: /";

/// `GET /incorrect`
pub async fn incorrect(State(state): State<AppState>) -> Html<String> {
    Html(views::incorrect_page(&state.config.website_name))
}

/// `GET /robots.txt`: keep crawlers out entirely.
pub async fn robots_txt() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], ROBOTS_TXT)
}
