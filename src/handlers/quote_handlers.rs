//! Listing, viewing and adding quotes.

use crate::{
    errors::AppError,
    models::quote::Quote,
    services::session::Session,
    state::AppState,
    views::{self, AddQuoteValues},
};
use axum::{
    Extension, Form,
    extract::{RawQuery, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

const INCORRECT_PASSWORD: &str = "The password is incorrect.";
const MISSING_FIELDS: &str = "Both who said it and what they said are required.";

/// Body of `POST /add-quote`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddQuoteForm {
    pub author: String,
    pub text: String,
    pub password: String,
}

/// `GET /`: every quote, newest first.
pub async fn list_quotes(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let quotes = state.store.list().await?;
    Ok(Html(views::index_page(&state.renderer, &quotes)))
}

/// `GET /quote?{fingerprint}`
///
/// An unknown or missing fingerprint shows a placeholder quote instead of
/// an error page.
pub async fn view_quote(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Html<String>, AppError> {
    let found = match fingerprint_from_query(query.as_deref()) {
        Some(fingerprint) => state.store.find(fingerprint).await?,
        None => None,
    };
    let quote = found.unwrap_or_else(Quote::placeholder);

    Ok(Html(views::quote_page(&state.renderer, &quote)))
}

/// `GET /add-quote`
pub async fn add_quote_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Html<String> {
    let pending = session.pending_video().await;
    Html(views::add_quote_page(
        &state.config.website_name,
        &pending,
        None,
        &AddQuoteValues::default(),
    ))
}

/// `POST /add-quote`
///
/// Attaches the session's pending video, saves the quote and clears the
/// pending video.
pub async fn add_quote(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<AddQuoteForm>,
) -> Result<Response, AppError> {
    let pending = session.pending_video().await;

    let problem = if form.password != state.config.password {
        warn!("rejected quote submission with incorrect password");
        Some(INCORRECT_PASSWORD)
    } else if form.author.trim().is_empty() || form.text.trim().is_empty() {
        Some(MISSING_FIELDS)
    } else {
        None
    };

    if let Some(message) = problem {
        let page = views::add_quote_page(
            &state.config.website_name,
            &pending,
            Some(message),
            &AddQuoteValues {
                author: &form.author,
                text: &form.text,
            },
        );
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response());
    }

    let quote = Quote::new(form.author.trim(), form.text.trim_end(), pending);
    let path = state.store.save(&quote).await?;
    session.clear_pending_video().await;

    info!(
        "saved quote {} by {} to {}",
        quote.fingerprint(),
        quote.author,
        path.display()
    );
    Ok(Redirect::to("/").into_response())
}

/// The fingerprint is the first key of the query string (`/quote?abc123`).
fn fingerprint_from_query(query: Option<&str>) -> Option<&str> {
    let first = query?.split('&').next()?;
    let key = first.split('=').next().unwrap_or(first);
    (!key.is_empty()).then_some(key)
}
