// libs/scheduling-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub appointment_code: String,
    pub patient_id: Uuid,
    pub employee_id: Uuid,
    pub room_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    CheckedIn,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Statuses that occupy the calendar for conflict purposes.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Scheduled
                | AppointmentStatus::CheckedIn
                | AppointmentStatus::InProgress
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed
                | AppointmentStatus::Cancelled
                | AppointmentStatus::NoShow
        )
    }

    pub fn can_transition_to(&self, next: &AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Scheduled, CheckedIn)
                | (CheckedIn, InProgress)
                | (InProgress, Completed)
                | (Scheduled, Cancelled)
                | (CheckedIn, Cancelled)
                | (Scheduled, NoShow)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::CheckedIn => write!(f, "checked_in"),
            AppointmentStatus::InProgress => write!(f, "in_progress"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

/// PostgREST filter selecting only calendar-occupying statuses.
pub const ACTIVE_STATUS_FILTER: &str = "status=in.(scheduled,checked_in,in_progress)";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Doctor,
    Assistant,
}

impl fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticipantRole::Doctor => write!(f, "doctor"),
            ParticipantRole::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentParticipant {
    pub appointment_id: Uuid,
    pub employee_id: Uuid,
    pub role: ParticipantRole,
}

/// Line item snapshotting catalog timing at booking time, so later catalog
/// edits never alter historical bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentServiceLine {
    pub appointment_id: Uuid,
    pub service_id: Uuid,
    pub service_code: String,
    pub duration_minutes: i64,
    pub buffer_minutes: i64,
}

/// Trail of who did what to an appointment. Rows are written by the same
/// database functions that mutate the appointment, never separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentAuditEntry {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub action: String,
    pub actor_id: String,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A busy `[start, end)` window on some resource's calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

// ==============================================================================
// DURATION / ROOM PLANNING MODELS
// ==============================================================================

#[derive(Debug, Clone)]
pub struct PlannedServiceLine {
    pub service_id: Uuid,
    pub service_code: String,
    pub duration_minutes: i64,
    pub buffer_minutes: i64,
    pub specialization_id: Option<String>,
}

/// Result of resolving a set of requested services: total time the booking
/// occupies and the rooms able to host every requested service.
#[derive(Debug, Clone)]
pub struct ServicePlan {
    pub total_duration_minutes: i64,
    pub service_lines: Vec<PlannedServiceLine>,
    pub compatible_room_codes: Vec<String>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityRequest {
    pub date: NaiveDate,
    pub employee_code: String,
    pub service_codes: Vec<String>,
    #[serde(default)]
    pub participant_codes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotOption {
    pub start_time: DateTime<Utc>,
    pub available_room_codes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub date: NaiveDate,
    pub employee_code: String,
    pub total_duration_minutes: i64,
    pub slots: Vec<SlotOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_code: String,
    pub employee_code: String,
    pub room_code: String,
    pub start_time: DateTime<Utc>,
    pub service_codes: Vec<String>,
    #[serde(default)]
    pub participant_codes: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_start_time: DateTime<Utc>,
    pub room_code: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateRequest {
    pub new_status: AppointmentStatus,
    pub reason: Option<String>,
}

// ==============================================================================
// AGGREGATE DETAIL MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: Uuid,
    pub patient_code: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeSummary {
    pub id: Uuid,
    pub employee_code: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummary {
    pub id: Uuid,
    pub room_code: String,
    pub room_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceLineSummary {
    pub service_code: String,
    pub duration_minutes: i64,
    pub buffer_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantSummary {
    pub employee_code: String,
    pub full_name: String,
    pub role: ParticipantRole,
}

/// Persisted aggregate with nested summaries so callers render without
/// further round-trips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentDetails {
    pub appointment: Appointment,
    pub patient: PatientSummary,
    pub doctor: EmployeeSummary,
    pub room: RoomSummary,
    pub services: Vec<ServiceLineSummary>,
    pub participants: Vec<ParticipantSummary>,
}

// ==============================================================================
// ERROR TAXONOMY
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum SchedulingError {
    // Input validation - rejected before any I/O
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("At least one service code is required")]
    EmptyServiceList,

    #[error("Validation error: {0}")]
    Validation(String),

    // Referential - named entity misses
    #[error("Patient '{0}' not found")]
    PatientNotFound(String),

    #[error("Patient '{0}' is inactive")]
    PatientInactive(String),

    #[error("Employee '{0}' not found")]
    EmployeeNotFound(String),

    #[error("Employee '{0}' is inactive")]
    EmployeeInactive(String),

    #[error("Room '{0}' not found")]
    RoomNotFound(String),

    #[error("Room '{0}' is inactive")]
    RoomInactive(String),

    #[error("Service '{0}' not found")]
    ServiceNotFound(String),

    #[error("Service '{0}' is inactive")]
    ServiceInactive(String),

    #[error("Participant '{0}' not found")]
    ParticipantNotFound(String),

    #[error("Participant '{0}' is inactive")]
    ParticipantInactive(String),

    // Business rules
    #[error("Employee '{employee_code}' lacks the specialization required by service '{service_code}'")]
    MissingSpecialization {
        employee_code: String,
        service_code: String,
    },

    #[error("Room '{room_code}' does not support service '{service_code}'")]
    RoomIncompatible {
        room_code: String,
        service_code: String,
    },

    // Resource conflicts - detected inside the authoritative transaction
    #[error("Employee '{0}' already has an overlapping appointment")]
    EmployeeConflict(String),

    #[error("Participant '{0}' already has an overlapping appointment")]
    ParticipantConflict(String),

    #[error("Room '{0}' already has an overlapping appointment")]
    RoomConflict(String),

    #[error("Patient '{0}' already has an overlapping appointment")]
    PatientConflict(String),

    // Lifecycle
    #[error("Appointment {0} not found")]
    AppointmentNotFound(Uuid),

    #[error("Invalid status transition from '{from}' to '{to}'")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    // Infra
    #[error("Availability search timed out")]
    SearchTimeout,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<directory_cell::DirectoryError> for SchedulingError {
    fn from(err: directory_cell::DirectoryError) -> Self {
        use directory_cell::DirectoryError::*;
        match err {
            PatientNotFound(code) => SchedulingError::PatientNotFound(code),
            EmployeeNotFound(code) => SchedulingError::EmployeeNotFound(code),
            RoomNotFound(code) => SchedulingError::RoomNotFound(code),
            ServiceNotFound(code) => SchedulingError::ServiceNotFound(code),
            Database(msg) => SchedulingError::Database(msg),
        }
    }
}
