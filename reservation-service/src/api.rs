use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::*;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{require_staff, StaffAuth};
use crate::bookings::{
    BookingConfirmation, BookingRequest, BookingService, ReservationListing, StatusUpdate,
    StatusUpdateResult,
};
use crate::reconciler::ReplyReconciler;
use crate::scheduler::ReminderScheduler;

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingService>,
    pub reconciler: Arc<ReplyReconciler>,
    pub reminders: Arc<ReminderScheduler>,
    pub staff_auth: StaffAuth,
}

#[derive(Debug, Deserialize)]
pub struct SmsWebhookPayload {
    pub sender: Option<String>,
    pub message: Option<String>,
    pub received_at: Option<String>,
    pub original_custom_ref: Option<String>,
}

impl From<SmsWebhookPayload> for InboundReply {
    fn from(payload: SmsWebhookPayload) -> Self {
        InboundReply {
            phone: payload.sender.unwrap_or_default(),
            message: payload.message.unwrap_or_default(),
            received_at: payload.received_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn create_router(state: AppState) -> Router {
    let staff = Router::new()
        .route("/staff/api/reservations/:date", get(list_reservations))
        .route("/staff/api/update_status", post(update_status))
        .route("/staff/reminders/:cohort", post(send_reminders))
        .route_layer(middleware::from_fn_with_state(
            state.staff_auth.clone(),
            require_staff,
        ));

    Router::new()
        .route("/reservations", post(create_reservation))
        .route("/sms-webhook", post(sms_webhook))
        .route("/health", get(health_check))
        .merge(staff)
        .with_state(state)
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
}

pub async fn create_reservation(
    State(state): State<AppState>,
    Json(request): Json<BookingRequest>,
) -> Result<Json<BookingConfirmation>, (StatusCode, Json<ErrorResponse>)> {
    match state.bookings.create_reservation(request).await {
        Ok(confirmation) => Ok(Json(confirmation)),
        Err(e) if e.is_client_error() => {
            tracing::warn!("Rejected booking: {}", e);
            Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
        Err(e) => {
            tracing::error!("Failed to create reservation: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to create reservation: {}", e),
                }),
            ))
        }
    }
}

pub async fn sms_webhook(
    State(state): State<AppState>,
    payload: Result<Json<SmsWebhookPayload>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::error!("Error processing webhook: {}", rejection);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": rejection.body_text() })),
            );
        }
    };

    tracing::info!(
        "Received SMS from {:?} (ref {:?})",
        payload.sender,
        payload.original_custom_ref
    );

    if state.reconciler.reconcile(&payload.into()).await.is_matched() {
        (StatusCode::OK, Json(json!({ "status": "success" })))
    } else {
        (
            StatusCode::OK,
            Json(json!({ "status": "warning", "message": "No matching reservation" })),
        )
    }
}

pub async fn list_reservations(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Json<ReservationListing> {
    Json(state.bookings.list_reservations(&date).await)
}

pub async fn update_status(
    State(state): State<AppState>,
    Json(update): Json<StatusUpdate>,
) -> Json<StatusUpdateResult> {
    Json(state.bookings.update_status(update).await)
}

pub async fn send_reminders(
    State(state): State<AppState>,
    Path(cohort): Path<String>,
) -> Result<String, (StatusCode, String)> {
    let cohort: Cohort = cohort
        .parse()
        .map_err(|e: DomainError| (StatusCode::NOT_FOUND, e.to_string()))?;
    Ok(state.reminders.run_cohort(cohort).await.to_string())
}

pub async fn health_check() -> &'static str {
    "OK"
}
