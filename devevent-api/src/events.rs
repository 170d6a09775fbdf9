use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use devevent_domain::event::NewEvent;
use devevent_domain::media::ImageUpload;
use devevent_domain::saga::ImageSaga;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::{ApiContext, AppError};
use crate::state::AppState;

pub const INVALID_FORM: &str = "Invalid JSON data format";
pub const IMAGE_REQUIRED: &str = "Image is required";
pub const UPLOAD_TOO_LARGE: &str = "Upload is too large";
pub const CREATE_FAILED: &str = "Event Creation Failed";
pub const FETCH_FAILED: &str = "Event Fetching Failed";

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/events", get(list_events).post(create_event))
}

fn form_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::payload_too_large(UPLOAD_TOO_LARGE)
    } else {
        AppError::bad_request(INVALID_FORM)
    }
}

/// Text parts by name plus the `image` file part, if one was sent.
struct EventForm {
    fields: BTreeMap<String, String>,
    image: Option<ImageUpload>,
}

async fn read_event_form(multipart: &mut Multipart) -> Result<EventForm, AppError> {
    let mut fields = BTreeMap::new();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(form_error)?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "image" {
            let file_name = field.file_name().map(str::to_owned);
            let content_type = field.content_type().map(str::to_owned);
            let bytes = field
                .bytes()
                .await
                .map_err(form_error)?;
            // An empty part is what browsers send for an untouched file input.
            image = (!bytes.is_empty()).then(|| ImageUpload {
                file_name,
                content_type,
                bytes,
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(form_error)?;
            fields.insert(name, value);
        }
    }

    Ok(EventForm { fields, image })
}

/// POST /api/events
async fn create_event(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let mut multipart = multipart.map_err(|_| AppError::bad_request(INVALID_FORM))?;
    let form = read_event_form(&mut multipart).await?;
    let image = form.image.ok_or_else(|| AppError::bad_request(IMAGE_REQUIRED))?;

    let events = state.store.events().await.api_context(CREATE_FAILED)?;

    let mut draft = NewEvent::from_fields(form.fields);
    debug!("Creating event from form: {:?}", draft.title);

    let saga = ImageSaga::new(state.media.clone(), state.media_folder.clone());
    let event = saga
        .run(image, |asset| async move {
            draft.image = asset.secure_url;
            events.create(draft).await
        })
        .await
        .api_context(CREATE_FAILED)?;

    info!("Event created: {} ({})", event.id, event.title);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Event Created Successfully",
            "event": event,
        })),
    ))
}

/// GET /api/events
async fn list_events(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let events = state.store.events().await.api_context(FETCH_FAILED)?;
    let events = events.list_newest_first().await.api_context(FETCH_FAILED)?;

    Ok(Json(json!({ "events": events })))
}
