use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::models::SchedulingError;
use crate::services::calendar::{intervals_overlap, CalendarReader, ResourceRef};

/// One booked resource with the code used to name it in conflict errors.
#[derive(Debug, Clone)]
pub struct BookedResource {
    pub id: Uuid,
    pub code: String,
}

impl BookedResource {
    pub fn new(id: Uuid, code: impl Into<String>) -> Self {
        Self { id, code: code.into() }
    }
}

/// Everything a booking window must be checked against.
#[derive(Debug, Clone)]
pub struct ConflictCheck {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub doctor: BookedResource,
    pub participants: Vec<BookedResource>,
    pub room: BookedResource,
    pub patient: BookedResource,
    /// Set when rescheduling so the outgoing appointment is ignored.
    pub exclude_appointment_id: Option<Uuid>,
}

pub struct ConflictValidator {
    calendar: Arc<CalendarReader>,
}

impl ConflictValidator {
    pub fn new(calendar: Arc<CalendarReader>) -> Self {
        Self { calendar }
    }

    /// Four-way conflict check. The first overlapping calendar wins and the
    /// error names the offending resource by code. Check order is doctor,
    /// participants, room, patient.
    pub async fn validate(
        &self,
        check: &ConflictCheck,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        debug!(
            "Checking conflicts for window {} .. {}",
            check.start_time, check.end_time
        );

        if self
            .resource_is_busy(ResourceRef::Doctor(check.doctor.id), check, auth_token)
            .await?
        {
            return Err(SchedulingError::EmployeeConflict(check.doctor.code.clone()));
        }

        for participant in &check.participants {
            if self
                .resource_is_busy(ResourceRef::Doctor(participant.id), check, auth_token)
                .await?
            {
                return Err(SchedulingError::ParticipantConflict(participant.code.clone()));
            }
        }

        if self
            .resource_is_busy(ResourceRef::Room(check.room.id), check, auth_token)
            .await?
        {
            return Err(SchedulingError::RoomConflict(check.room.code.clone()));
        }

        if self
            .resource_is_busy(ResourceRef::Patient(check.patient.id), check, auth_token)
            .await?
        {
            return Err(SchedulingError::PatientConflict(check.patient.code.clone()));
        }

        Ok(())
    }

    async fn resource_is_busy(
        &self,
        resource: ResourceRef,
        check: &ConflictCheck,
        auth_token: &str,
    ) -> Result<bool, SchedulingError> {
        let busy = self
            .calendar
            .busy_intervals(
                resource,
                check.start_time,
                check.end_time,
                check.exclude_appointment_id,
                auth_token,
            )
            .await?;

        Ok(busy
            .iter()
            .any(|b| intervals_overlap(check.start_time, check.end_time, b.start, b.end)))
    }
}
