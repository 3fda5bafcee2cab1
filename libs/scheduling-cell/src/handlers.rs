// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use uuid::Uuid;

use directory_cell::services::{
    EmployeeDirectory, PatientDirectory, RoomDirectory, ServiceCatalog,
};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    Appointment, AppointmentAuditEntry, AppointmentDetails, AvailabilityRequest,
    AvailabilityResponse, BookAppointmentRequest, CancelAppointmentRequest,
    RescheduleAppointmentRequest, SchedulingError, StatusUpdateRequest,
};
use crate::services::{
    BookingOrchestrator, CalendarReader, ConflictValidator, DurationCalculator, EventPublisher,
    LifecycleManager, SlotSearchEngine,
};

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct AvailabilityQueryParams {
    pub date: NaiveDate,
    pub employee_code: String,
    /// Comma-separated service codes.
    pub service_codes: String,
    /// Comma-separated employee codes of extra participants.
    pub participant_codes: Option<String>,
}

fn split_codes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

// ==============================================================================
// SERVICE WIRING
// ==============================================================================

struct SchedulingStack {
    search: SlotSearchEngine,
    booking: BookingOrchestrator,
    lifecycle: Arc<LifecycleManager>,
}

fn build_stack(config: &Arc<AppConfig>) -> SchedulingStack {
    let supabase = Arc::new(SupabaseClient::new(config));

    let patients = Arc::new(PatientDirectory::new(supabase.clone()));
    let employees = Arc::new(EmployeeDirectory::new(supabase.clone()));
    let rooms = Arc::new(RoomDirectory::new(supabase.clone()));
    let catalog = Arc::new(ServiceCatalog::new(supabase.clone()));

    let calendar = Arc::new(CalendarReader::new(supabase.clone()));
    let duration = Arc::new(DurationCalculator::new(catalog));
    let conflicts = Arc::new(ConflictValidator::new(calendar.clone()));
    let events = Arc::new(EventPublisher::new(config));
    let lifecycle = Arc::new(LifecycleManager::new(supabase.clone(), events.clone()));

    let search = SlotSearchEngine::new(
        config.clone(),
        calendar,
        duration.clone(),
        employees.clone(),
        rooms.clone(),
    );
    let booking = BookingOrchestrator::new(
        config.clone(),
        supabase,
        patients,
        employees,
        rooms,
        duration,
        conflicts,
        lifecycle.clone(),
        events,
    );

    SchedulingStack {
        search,
        booking,
        lifecycle,
    }
}

// ==============================================================================
// HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Query(params): Query<AvailabilityQueryParams>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let request = AvailabilityRequest {
        date: params.date,
        employee_code: params.employee_code,
        service_codes: split_codes(&params.service_codes),
        participant_codes: params
            .participant_codes
            .as_deref()
            .map(split_codes)
            .unwrap_or_default(),
    };

    let stack = build_stack(&state);
    let response = stack
        .search
        .find_slots(&request, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<AppointmentDetails>), AppError> {
    let stack = build_stack(&state);
    let details = stack
        .booking
        .book(&request, &user.id, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok((StatusCode::CREATED, Json(details)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<AppointmentDetails>, AppError> {
    let stack = build_stack(&state);
    let details = stack
        .booking
        .get_details(appointment_id, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(details))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    let stack = build_stack(&state);
    let cancelled = stack
        .booking
        .cancel(appointment_id, &request, &user.id, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(cancelled))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<AppointmentDetails>, AppError> {
    let stack = build_stack(&state);
    let details = stack
        .booking
        .reschedule(appointment_id, &request, &user.id, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(details))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<Appointment>, AppError> {
    let stack = build_stack(&state);
    let updated = stack
        .lifecycle
        .update_status(appointment_id, &request, &user.id, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(updated))
}

#[axum::debug_handler]
pub async fn get_appointment_audit(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Vec<AppointmentAuditEntry>>, AppError> {
    let stack = build_stack(&state);
    let trail = stack
        .lifecycle
        .audit_trail(appointment_id, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(trail))
}

// ==============================================================================
// ERROR MAPPING
// ==============================================================================

fn map_scheduling_error(e: SchedulingError) -> AppError {
    use SchedulingError::*;
    match e {
        InvalidDate(_) | EmptyServiceList | Validation(_) => AppError::BadRequest(e.to_string()),

        PatientNotFound(_) | EmployeeNotFound(_) | RoomNotFound(_) | ServiceNotFound(_)
        | ParticipantNotFound(_) | AppointmentNotFound(_) => AppError::NotFound(e.to_string()),

        PatientInactive(_) | EmployeeInactive(_) | RoomInactive(_) | ServiceInactive(_)
        | ParticipantInactive(_)
        | MissingSpecialization { .. }
        | RoomIncompatible { .. } => AppError::BadRequest(e.to_string()),

        EmployeeConflict(_) | ParticipantConflict(_) | RoomConflict(_) | PatientConflict(_)
        | InvalidStatusTransition { .. } => AppError::Conflict(e.to_string()),

        SearchTimeout => AppError::Timeout(e.to_string()),
        Database(msg) => AppError::Database(msg),
    }
}
