pub mod booking;
pub mod calendar;
pub mod conflict;
pub mod duration;
pub mod events;
pub mod lifecycle;
pub mod slot_search;

pub use booking::BookingOrchestrator;
pub use calendar::CalendarReader;
pub use conflict::ConflictValidator;
pub use duration::DurationCalculator;
pub use events::EventPublisher;
pub use lifecycle::LifecycleManager;
pub use slot_search::SlotSearchEngine;

use shared_database::supabase::ApiError;

use crate::models::SchedulingError;

/// Outcome of a failed write RPC, split by how the caller should react.
#[derive(Debug)]
pub(crate) enum RpcFailure {
    /// Domain rule raised inside the transaction; surfaced as-is.
    Domain(SchedulingError),
    /// Serialization failure or lock contention; safe to retry.
    Retryable(String),
    /// Anything else.
    Other(SchedulingError),
}

/// Maps a PostgREST error body onto the scheduling error taxonomy. The
/// database functions raise exceptions with `<kind>: <code>` messages.
pub(crate) fn classify_rpc_error(err: anyhow::Error) -> RpcFailure {
    let Some(api_err) = err.downcast_ref::<ApiError>() else {
        return RpcFailure::Other(SchedulingError::Database(err.to_string()));
    };

    let body = api_err.body.as_str();

    if let Some(code) = extract_code(body, "employee_conflict") {
        return RpcFailure::Domain(SchedulingError::EmployeeConflict(code));
    }
    if let Some(code) = extract_code(body, "participant_conflict") {
        return RpcFailure::Domain(SchedulingError::ParticipantConflict(code));
    }
    if let Some(code) = extract_code(body, "room_conflict") {
        return RpcFailure::Domain(SchedulingError::RoomConflict(code));
    }
    if let Some(code) = extract_code(body, "patient_conflict") {
        return RpcFailure::Domain(SchedulingError::PatientConflict(code));
    }
    if body.contains("appointment_not_found") {
        return RpcFailure::Other(SchedulingError::Database(
            "appointment vanished during write".to_string(),
        ));
    }

    // Postgres serialization failure (40001) or deadlock (40P01): the
    // transaction lost a race but nothing is wrong with the request.
    if body.contains("40001") || body.contains("40P01") || body.contains("deadlock") {
        return RpcFailure::Retryable(body.to_string());
    }

    RpcFailure::Other(SchedulingError::Database(format!(
        "{}: {}",
        api_err.status, body
    )))
}

/// Pulls the resource code out of `... <kind>: <code> ...` error messages.
fn extract_code(body: &str, kind: &str) -> Option<String> {
    let idx = body.find(kind)?;
    let rest = &body[idx + kind.len()..];
    let rest = rest.strip_prefix(':')?.trim_start();
    let code: String = rest
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != '"' && *c != '\\' && *c != ',' && *c != '}')
        .collect();
    if code.is_empty() {
        None
    } else {
        Some(code)
    }
}
