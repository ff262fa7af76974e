//! Video upload form and submission.

use crate::{
    errors::AppError,
    services::{
        session::Session,
        upload_gate::{UploadError, UploadedVideo},
    },
    state::AppState,
    views,
};
use axum::{
    Extension,
    extract::{Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::{error, warn};

const FILE_FIELD: &str = "myFile";
const PASSWORD_FIELD: &str = "password";

/// Fields read from the multipart upload form.
#[derive(Debug, Default)]
struct UploadForm {
    password: String,
    video: Option<UploadedVideo>,
}

/// `GET /upload-video`
pub async fn upload_video_form(State(state): State<AppState>) -> Html<String> {
    Html(views::upload_video_page(&state.config.website_name, None))
}

/// `POST /upload-video`
///
/// A wrong password redirects to `/incorrect` before anything touches the
/// disk. Validation failures re-render the form with the reason.
pub async fn upload_video(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = match read_upload_form(multipart).await {
        Ok(form) => form,
        Err((status, message)) => return Ok(form_error(&state, status, &message)),
    };

    if form.password != state.config.password {
        warn!("rejected video upload with incorrect password");
        return Ok(Redirect::to("/incorrect").into_response());
    }

    let Some(video) = form.video else {
        return Ok(form_error(
            &state,
            StatusCode::UNPROCESSABLE_ENTITY,
            &UploadError::MissingFile.to_string(),
        ));
    };

    match state.gate.accept(&video, &session).await {
        Ok(_) => Ok(Redirect::to("/add-quote").into_response()),
        Err(UploadError::Io(err)) => {
            error!("failed to store uploaded video: {}", err);
            Err(AppError::internal("couldn't store video"))
        }
        Err(err) => {
            warn!("rejected video {}: {}", video.file_name, err);
            Ok(form_error(
                &state,
                StatusCode::UNPROCESSABLE_ENTITY,
                &err.to_string(),
            ))
        }
    }
}

fn form_error(state: &AppState, status: StatusCode, message: &str) -> Response {
    let page = views::upload_video_page(&state.config.website_name, Some(message));
    (status, Html(page)).into_response()
}

/// Read the password and the file field. A file input left empty by the
/// browser counts as no file.
async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, (StatusCode, String)> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (e.status(), format!("couldn't read upload: {}", e.body_text())))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(PASSWORD_FIELD) => {
                form.password = field
                    .text()
                    .await
                    .map_err(|e| (e.status(), e.body_text()))?;
            }
            Some(FILE_FIELD) => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| (e.status(), format!("couldn't read upload: {}", e.body_text())))?;

                if !(file_name.is_empty() && bytes.is_empty()) {
                    form.video = Some(UploadedVideo {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
            }
            _ => {}
        }
    }

    Ok(form)
}
