use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    routing::post,
    Router,
};
use devevent_domain::booking::CreateBookingRequest;
use devevent_domain::StoreError;
use devevent_shared::MaskedEmail;
use serde_json::{json, Value};
use tracing::info;

use crate::error::{ApiContext, AppError};
use crate::events::INVALID_FORM;
use crate::state::AppState;

pub const BOOKING_FAILED: &str = "Booking Creation Failed";

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/bookings", post(create_booking))
}

/// POST /api/bookings
async fn create_booking(
    State(state): State<AppState>,
    req: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(req) = req.map_err(|_| AppError::bad_request(INVALID_FORM))?;
    let mut booking = req
        .into_booking()
        .map_err(|e| AppError::bad_request(e.to_string()))?;

    let bookings = state.store.bookings().await.api_context(BOOKING_FAILED)?;

    match bookings.save(&mut booking).await {
        Ok(()) => {}
        Err(StoreError::Validation(e)) => return Err(AppError::bad_request(e.to_string())),
        Err(e) => return Err(AppError::failure(BOOKING_FAILED, e)),
    }

    info!(
        "Booking created: {} for {} on event {}",
        booking.id(),
        MaskedEmail(booking.email()),
        booking.event_id()
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Booking Created Successfully",
            "booking": booking,
        })),
    ))
}
