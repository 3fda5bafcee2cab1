use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use directory_cell::models::{Employee, Patient, Room};
use directory_cell::services::{EmployeeDirectory, PatientDirectory, RoomDirectory};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentDetails, AppointmentStatus, BookAppointmentRequest,
    CancelAppointmentRequest, EmployeeSummary, ParticipantRole, ParticipantSummary,
    PatientSummary, PlannedServiceLine, RescheduleAppointmentRequest, RoomSummary,
    SchedulingError, ServiceLineSummary,
};
use crate::services::conflict::{BookedResource, ConflictCheck, ConflictValidator};
use crate::services::duration::DurationCalculator;
use crate::services::events::EventPublisher;
use crate::services::lifecycle::LifecycleManager;
use crate::services::slot_search::check_specializations;
use crate::services::{classify_rpc_error, RpcFailure};

const LOCK_TIMEOUT_SECONDS: i64 = 30;

/// Fully resolved and validated booking, ready for the write transaction.
struct BookingPlan {
    appointment_id: Uuid,
    appointment_code: String,
    patient: Patient,
    doctor: Employee,
    room: Room,
    participants: Vec<Employee>,
    service_lines: Vec<PlannedServiceLine>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    notes: Option<String>,
    /// Appointment being replaced, for reschedules.
    replaces: Option<Uuid>,
}

/// Books, cancels and reschedules appointments. Validation runs up front
/// against the directory; the final conflict check and all writes happen
/// under per-resource scheduling locks with the database function as the
/// single transaction.
pub struct BookingOrchestrator {
    config: Arc<AppConfig>,
    supabase: Arc<SupabaseClient>,
    patients: Arc<PatientDirectory>,
    employees: Arc<EmployeeDirectory>,
    rooms: Arc<RoomDirectory>,
    duration: Arc<DurationCalculator>,
    conflicts: Arc<ConflictValidator>,
    lifecycle: Arc<LifecycleManager>,
    events: Arc<EventPublisher>,
}

impl BookingOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<AppConfig>,
        supabase: Arc<SupabaseClient>,
        patients: Arc<PatientDirectory>,
        employees: Arc<EmployeeDirectory>,
        rooms: Arc<RoomDirectory>,
        duration: Arc<DurationCalculator>,
        conflicts: Arc<ConflictValidator>,
        lifecycle: Arc<LifecycleManager>,
        events: Arc<EventPublisher>,
    ) -> Self {
        Self {
            config,
            supabase,
            patients,
            employees,
            rooms,
            duration,
            conflicts,
            lifecycle,
            events,
        }
    }

    // ==========================================================================
    // BOOKING
    // ==========================================================================

    #[instrument(skip(self, request, auth_token), fields(patient = %request.patient_code, employee = %request.employee_code))]
    pub async fn book(
        &self,
        request: &BookAppointmentRequest,
        actor_id: &str,
        auth_token: &str,
    ) -> Result<AppointmentDetails, SchedulingError> {
        if request.start_time < Utc::now() {
            return Err(SchedulingError::InvalidDate(format!(
                "start time {} is in the past",
                request.start_time
            )));
        }

        let plan = self.resolve_booking(request, auth_token).await?;
        let appointment = self
            .write_with_retry(&plan, actor_id, auth_token)
            .await?;

        info!(
            "Booked appointment {} ({}) at {}",
            appointment.id, appointment.appointment_code, appointment.start_time
        );
        self.events.appointment_changed(appointment.id, "booked");

        Ok(assemble_details(appointment, &plan))
    }

    /// Resolves every referenced entity and applies the business rules that
    /// don't need the calendar: active flags, specializations, room
    /// compatibility, participant sanity.
    async fn resolve_booking(
        &self,
        request: &BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<BookingPlan, SchedulingError> {
        let plan = self.duration.plan(&request.service_codes, auth_token).await?;

        let patient = self
            .patients
            .find_by_code(&request.patient_code, auth_token)
            .await?;
        if !patient.is_active {
            return Err(SchedulingError::PatientInactive(patient.patient_code));
        }

        let doctor = self
            .employees
            .find_by_code(&request.employee_code, auth_token)
            .await?;
        if !doctor.is_active {
            return Err(SchedulingError::EmployeeInactive(doctor.employee_code));
        }
        check_specializations(&doctor, &plan)?;

        let participants = self
            .resolve_participants(&request.participant_codes, &doctor, auth_token)
            .await?;

        let room = self.rooms.find_by_code(&request.room_code, auth_token).await?;
        if !room.is_active {
            return Err(SchedulingError::RoomInactive(room.room_code));
        }
        self.ensure_room_supports(&room, &plan.service_lines, auth_token)
            .await?;

        let end_time = request.start_time + chrono::Duration::minutes(plan.total_duration_minutes);

        Ok(BookingPlan {
            appointment_id: Uuid::new_v4(),
            appointment_code: generate_appointment_code(),
            patient,
            doctor,
            room,
            participants,
            service_lines: plan.service_lines,
            start_time: request.start_time,
            end_time,
            notes: request.notes.clone(),
            replaces: None,
        })
    }

    async fn resolve_participants(
        &self,
        codes: &[String],
        doctor: &Employee,
        auth_token: &str,
    ) -> Result<Vec<Employee>, SchedulingError> {
        let mut participants: Vec<Employee> = Vec::with_capacity(codes.len());
        for code in codes {
            if code == &doctor.employee_code {
                return Err(SchedulingError::Validation(format!(
                    "'{}' is already the primary doctor",
                    code
                )));
            }
            if participants.iter().any(|p| &p.employee_code == code) {
                return Err(SchedulingError::Validation(format!(
                    "participant '{}' listed twice",
                    code
                )));
            }

            let participant = self
                .employees
                .find_by_code(code, auth_token)
                .await
                .map_err(|e| match e {
                    directory_cell::DirectoryError::EmployeeNotFound(c) => {
                        SchedulingError::ParticipantNotFound(c)
                    }
                    other => other.into(),
                })?;
            if !participant.is_active {
                return Err(SchedulingError::ParticipantInactive(code.clone()));
            }
            participants.push(participant);
        }
        Ok(participants)
    }

    /// The chosen room must cover every requested service, not merely some.
    async fn ensure_room_supports(
        &self,
        room: &Room,
        service_lines: &[PlannedServiceLine],
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        let supported = self
            .rooms
            .service_codes_for_room(&room.room_code, auth_token)
            .await?;

        for line in service_lines {
            if !supported.contains(&line.service_code) {
                return Err(SchedulingError::RoomIncompatible {
                    room_code: room.room_code.clone(),
                    service_code: line.service_code.clone(),
                });
            }
        }
        Ok(())
    }

    /// Retry loop around the locked write. A genuine overlap never retries;
    /// only lock contention and serialization failures do, with jittered
    /// backoff so colliding writers don't re-collide in step.
    async fn write_with_retry(
        &self,
        plan: &BookingPlan,
        actor_id: &str,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let max_attempts = self.config.booking_retry_attempts.max(1);

        for attempt in 1..=max_attempts {
            debug!("Booking write attempt {}/{}", attempt, max_attempts);

            match self.try_locked_write(plan, actor_id, auth_token).await {
                Ok(appointment) => return Ok(appointment),
                Err(WriteAttemptError::Retryable(msg)) if attempt < max_attempts => {
                    warn!("Booking attempt {} lost a race, retrying: {}", attempt, msg);
                    let jitter = rand::thread_rng().gen_range(0..50);
                    let backoff = 100 * attempt as u64 + jitter;
                    tokio::time::sleep(tokio::time::Duration::from_millis(backoff)).await;
                }
                Err(WriteAttemptError::Retryable(msg)) => {
                    return Err(SchedulingError::Database(format!(
                        "booking failed after {} attempts: {}",
                        max_attempts, msg
                    )));
                }
                Err(WriteAttemptError::Fatal(e)) => return Err(e),
            }
        }

        Err(SchedulingError::Database(
            "booking failed after multiple attempts".to_string(),
        ))
    }

    async fn try_locked_write(
        &self,
        plan: &BookingPlan,
        actor_id: &str,
        auth_token: &str,
    ) -> Result<Appointment, WriteAttemptError> {
        let lock_keys = slot_lock_keys(plan);

        let mut held: Vec<String> = Vec::with_capacity(lock_keys.len());
        for key in &lock_keys {
            match self.acquire_scheduling_lock(key).await {
                Ok(true) => held.push(key.clone()),
                Ok(false) => {
                    self.release_scheduling_locks(&held).await;
                    return Err(WriteAttemptError::Retryable(format!(
                        "lock contention on {}",
                        key
                    )));
                }
                Err(e) => {
                    self.release_scheduling_locks(&held).await;
                    return Err(WriteAttemptError::Fatal(e));
                }
            }
        }

        // Re-check the calendar now that the slot is fenced off.
        let check = ConflictCheck {
            start_time: plan.start_time,
            end_time: plan.end_time,
            doctor: BookedResource::new(plan.doctor.id, plan.doctor.employee_code.clone()),
            participants: plan
                .participants
                .iter()
                .map(|p| BookedResource::new(p.id, p.employee_code.clone()))
                .collect(),
            room: BookedResource::new(plan.room.id, plan.room.room_code.clone()),
            patient: BookedResource::new(plan.patient.id, plan.patient.patient_code.clone()),
            exclude_appointment_id: plan.replaces,
        };

        if let Err(e) = self.conflicts.validate(&check, auth_token).await {
            self.release_scheduling_locks(&held).await;
            return Err(WriteAttemptError::Fatal(e));
        }

        let result = self.run_booking_rpc(plan, actor_id, auth_token).await;
        self.release_scheduling_locks(&held).await;
        result
    }

    /// One database function writes the appointment row, its service line
    /// snapshot, participant rows and the audit entry, re-checking overlaps
    /// against committed rows inside the same transaction.
    async fn run_booking_rpc(
        &self,
        plan: &BookingPlan,
        actor_id: &str,
        auth_token: &str,
    ) -> Result<Appointment, WriteAttemptError> {
        let service_lines: Vec<Value> = plan
            .service_lines
            .iter()
            .map(|line| {
                json!({
                    "service_id": line.service_id,
                    "service_code": line.service_code,
                    "duration_minutes": line.duration_minutes,
                    "buffer_minutes": line.buffer_minutes,
                })
            })
            .collect();

        let participants: Vec<Value> = plan
            .participants
            .iter()
            .map(|p| {
                json!({
                    "employee_id": p.id,
                    "employee_code": p.employee_code,
                    "role": ParticipantRole::Assistant.to_string(),
                })
            })
            .collect();

        let mut args = json!({
            "p_appointment_id": plan.appointment_id,
            "p_appointment_code": plan.appointment_code,
            "p_patient_id": plan.patient.id,
            "p_patient_code": plan.patient.patient_code,
            "p_employee_id": plan.doctor.id,
            "p_employee_code": plan.doctor.employee_code,
            "p_room_id": plan.room.id,
            "p_room_code": plan.room.room_code,
            "p_start_time": plan.start_time.to_rfc3339(),
            "p_end_time": plan.end_time.to_rfc3339(),
            "p_notes": plan.notes,
            "p_service_lines": service_lines,
            "p_participants": participants,
            "p_actor_id": actor_id,
        });

        let function = if let Some(old_id) = plan.replaces {
            args["p_replaces_appointment_id"] = json!(old_id);
            "reschedule_appointment"
        } else {
            "book_appointment"
        };

        self.supabase
            .rpc::<Appointment>(function, Some(auth_token), args)
            .await
            .map_err(|e| match classify_rpc_error(e) {
                RpcFailure::Domain(err) => WriteAttemptError::Fatal(err),
                RpcFailure::Retryable(msg) => WriteAttemptError::Retryable(msg),
                RpcFailure::Other(err) => WriteAttemptError::Fatal(err),
            })
    }

    // ==========================================================================
    // CANCELLATION
    // ==========================================================================

    #[instrument(skip(self, request, auth_token))]
    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        request: &CancelAppointmentRequest,
        actor_id: &str,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let current = self.lifecycle.get_appointment(appointment_id, auth_token).await?;
        if !current.status.can_transition_to(&AppointmentStatus::Cancelled) {
            return Err(SchedulingError::InvalidStatusTransition {
                from: current.status,
                to: AppointmentStatus::Cancelled,
            });
        }

        let args = json!({
            "p_appointment_id": appointment_id,
            "p_expected_status": current.status.to_string(),
            "p_reason": request.reason,
            "p_actor_id": actor_id,
        });

        let cancelled: Appointment = self
            .supabase
            .rpc("cancel_appointment", Some(auth_token), args)
            .await
            .map_err(|e| match classify_rpc_error(e) {
                RpcFailure::Domain(err) | RpcFailure::Other(err) => err,
                RpcFailure::Retryable(msg) => SchedulingError::Database(msg),
            })?;

        info!("Cancelled appointment {}", appointment_id);
        self.events.appointment_changed(appointment_id, "cancelled");

        Ok(cancelled)
    }

    // ==========================================================================
    // RESCHEDULING
    // ==========================================================================

    /// Cancel-old plus book-new in one transaction. The replacement keeps the
    /// original patient, doctor, participants and service line snapshot; only
    /// the window (and optionally the room) moves.
    #[instrument(skip(self, request, auth_token))]
    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        request: &RescheduleAppointmentRequest,
        actor_id: &str,
        auth_token: &str,
    ) -> Result<AppointmentDetails, SchedulingError> {
        let current = self.lifecycle.get_appointment(appointment_id, auth_token).await?;
        if !current.status.can_transition_to(&AppointmentStatus::Cancelled) {
            return Err(SchedulingError::InvalidStatusTransition {
                from: current.status,
                to: AppointmentStatus::Cancelled,
            });
        }

        if request.new_start_time < Utc::now() {
            return Err(SchedulingError::InvalidDate(format!(
                "start time {} is in the past",
                request.new_start_time
            )));
        }

        let patient = self.patients.find_by_id(current.patient_id, auth_token).await?;
        let doctor = self.employees.find_by_id(current.employee_id, auth_token).await?;
        if !doctor.is_active {
            return Err(SchedulingError::EmployeeInactive(doctor.employee_code));
        }

        let service_lines = self.stored_service_lines(appointment_id, auth_token).await?;
        let total_minutes: i64 = service_lines
            .iter()
            .map(|l| l.duration_minutes + l.buffer_minutes)
            .sum();

        let room = match &request.room_code {
            Some(code) => {
                let room = self.rooms.find_by_code(code, auth_token).await?;
                if !room.is_active {
                    return Err(SchedulingError::RoomInactive(room.room_code));
                }
                self.ensure_room_supports(&room, &service_lines, auth_token)
                    .await?;
                room
            }
            None => self.rooms.find_by_id(current.room_id, auth_token).await?,
        };

        let mut participants = Vec::new();
        for employee_id in self.stored_participant_ids(appointment_id, auth_token).await? {
            let participant = self.employees.find_by_id(employee_id, auth_token).await?;
            if !participant.is_active {
                return Err(SchedulingError::ParticipantInactive(
                    participant.employee_code,
                ));
            }
            participants.push(participant);
        }

        let plan = BookingPlan {
            appointment_id: Uuid::new_v4(),
            appointment_code: generate_appointment_code(),
            patient,
            doctor,
            room,
            participants,
            service_lines,
            start_time: request.new_start_time,
            end_time: request.new_start_time + chrono::Duration::minutes(total_minutes),
            notes: current.notes.clone(),
            replaces: Some(appointment_id),
        };

        let replacement = self.write_with_retry(&plan, actor_id, auth_token).await?;

        info!(
            "Rescheduled appointment {} to {} ({})",
            appointment_id, replacement.id, replacement.appointment_code
        );
        self.events.appointment_changed(appointment_id, "cancelled");
        self.events.appointment_changed(replacement.id, "booked");

        Ok(assemble_details(replacement, &plan))
    }

    async fn stored_service_lines(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<PlannedServiceLine>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointment_service_lines?appointment_id=eq.{}&order=service_code.asc",
            appointment_id
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                Ok(PlannedServiceLine {
                    service_id: parse_uuid(&row, "service_id")?,
                    service_code: parse_string(&row, "service_code")?,
                    duration_minutes: parse_i64(&row, "duration_minutes")?,
                    buffer_minutes: parse_i64(&row, "buffer_minutes")?,
                    specialization_id: None,
                })
            })
            .collect()
    }

    async fn stored_participant_ids(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Uuid>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointment_participants?appointment_id=eq.{}&select=employee_id",
            appointment_id
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|row| parse_uuid(&row, "employee_id"))
            .collect()
    }

    // ==========================================================================
    // READ SIDE
    // ==========================================================================

    pub async fn get_details(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<AppointmentDetails, SchedulingError> {
        let appointment = self.lifecycle.get_appointment(appointment_id, auth_token).await?;

        let patient = self.patients.find_by_id(appointment.patient_id, auth_token).await?;
        let doctor = self.employees.find_by_id(appointment.employee_id, auth_token).await?;
        let room = self.rooms.find_by_id(appointment.room_id, auth_token).await?;

        let services = self
            .stored_service_lines(appointment_id, auth_token)
            .await?
            .into_iter()
            .map(|line| ServiceLineSummary {
                service_code: line.service_code,
                duration_minutes: line.duration_minutes,
                buffer_minutes: line.buffer_minutes,
            })
            .collect();

        let mut participants = Vec::new();
        for employee_id in self.stored_participant_ids(appointment_id, auth_token).await? {
            let participant = self.employees.find_by_id(employee_id, auth_token).await?;
            participants.push(ParticipantSummary {
                employee_code: participant.employee_code.clone(),
                full_name: participant.full_name(),
                role: ParticipantRole::Assistant,
            });
        }

        Ok(AppointmentDetails {
            patient: PatientSummary {
                id: patient.id,
                patient_code: patient.patient_code.clone(),
                full_name: patient.full_name(),
            },
            doctor: EmployeeSummary {
                id: doctor.id,
                employee_code: doctor.employee_code.clone(),
                full_name: doctor.full_name(),
            },
            room: RoomSummary {
                id: room.id,
                room_code: room.room_code,
                room_type: room.room_type,
            },
            services,
            participants,
            appointment,
        })
    }

    // ==========================================================================
    // SCHEDULING LOCKS
    // ==========================================================================

    /// Inserting the lock row either succeeds (lock held) or violates the
    /// unique key (someone else holds it). Expired rows are cleaned up and
    /// the insert tried once more.
    async fn acquire_scheduling_lock(&self, lock_key: &str) -> Result<bool, SchedulingError> {
        match self.insert_lock_row(lock_key).await {
            Ok(()) => Ok(true),
            Err(_) => {
                if self.cleanup_expired_lock(lock_key).await? {
                    Ok(self.insert_lock_row(lock_key).await.is_ok())
                } else {
                    Ok(false)
                }
            }
        }
    }

    async fn insert_lock_row(&self, lock_key: &str) -> Result<(), SchedulingError> {
        let lock_data = json!({
            "lock_key": lock_key,
            "acquired_at": Utc::now().to_rfc3339(),
            "expires_at": (Utc::now() + chrono::Duration::seconds(LOCK_TIMEOUT_SECONDS)).to_rfc3339(),
            "process_id": format!("scheduler_{}", Uuid::new_v4()),
        });

        self.supabase
            .request_with_headers::<Vec<Value>>(
                Method::POST,
                "/rest/v1/scheduling_locks",
                None,
                Some(lock_data),
                Some(representation_header()),
            )
            .await
            .map(|_| ())
            .map_err(|e| SchedulingError::Database(e.to_string()))
    }

    /// Deletes the lock row if its expiry has passed. Returns whether a row
    /// was removed.
    async fn cleanup_expired_lock(&self, lock_key: &str) -> Result<bool, SchedulingError> {
        let path = format!(
            "/rest/v1/scheduling_locks?lock_key=eq.{}&expires_at=lt.{}",
            urlencoding::encode(lock_key),
            urlencoding::encode(&Utc::now().to_rfc3339()),
        );

        let deleted: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                None,
                None,
                Some(representation_header()),
            )
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        Ok(!deleted.is_empty())
    }

    async fn release_scheduling_locks(&self, lock_keys: &[String]) {
        for key in lock_keys {
            let path = format!(
                "/rest/v1/scheduling_locks?lock_key=eq.{}",
                urlencoding::encode(key)
            );
            if let Err(e) = self
                .supabase
                .request_with_headers::<Vec<Value>>(
                    Method::DELETE,
                    &path,
                    None,
                    None,
                    Some(representation_header()),
                )
                .await
            {
                // Expiry reclaims leaked locks, so log and move on.
                warn!("Failed to release scheduling lock {}: {}", key, e);
            }
        }
    }
}

enum WriteAttemptError {
    Retryable(String),
    Fatal(SchedulingError),
}

fn parse_string(row: &Value, field: &str) -> Result<String, SchedulingError> {
    row.get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| SchedulingError::Database(format!("Missing {} in row", field)))
}

fn parse_i64(row: &Value, field: &str) -> Result<i64, SchedulingError> {
    row.get(field)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| SchedulingError::Database(format!("Missing {} in row", field)))
}

fn parse_uuid(row: &Value, field: &str) -> Result<Uuid, SchedulingError> {
    row.get(field)
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| SchedulingError::Database(format!("Missing {} in row", field)))
}

fn representation_header() -> reqwest::header::HeaderMap {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        "Prefer",
        reqwest::header::HeaderValue::from_static("return=representation"),
    );
    headers
}

/// One lock per resource whose calendar the booking touches, sorted so every
/// writer acquires in the same order.
fn slot_lock_keys(plan: &BookingPlan) -> Vec<String> {
    let start_ts = plan.start_time.timestamp();
    let end_ts = plan.end_time.timestamp();

    let mut keys = vec![
        format!("slot_employee_{}_{}_{}", plan.doctor.id, start_ts, end_ts),
        format!("slot_room_{}_{}_{}", plan.room.id, start_ts, end_ts),
        format!("slot_patient_{}_{}_{}", plan.patient.id, start_ts, end_ts),
    ];
    for participant in &plan.participants {
        keys.push(format!(
            "slot_employee_{}_{}_{}",
            participant.id, start_ts, end_ts
        ));
    }
    keys.sort();
    keys.dedup();
    keys
}

/// Human-facing booking reference, `APT-` plus 8 uppercase hex characters.
fn generate_appointment_code() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("APT-{}", id[..8].to_uppercase())
}

fn assemble_details(appointment: Appointment, plan: &BookingPlan) -> AppointmentDetails {
    AppointmentDetails {
        patient: PatientSummary {
            id: plan.patient.id,
            patient_code: plan.patient.patient_code.clone(),
            full_name: plan.patient.full_name(),
        },
        doctor: EmployeeSummary {
            id: plan.doctor.id,
            employee_code: plan.doctor.employee_code.clone(),
            full_name: plan.doctor.full_name(),
        },
        room: RoomSummary {
            id: plan.room.id,
            room_code: plan.room.room_code.clone(),
            room_type: plan.room.room_type.clone(),
        },
        services: plan
            .service_lines
            .iter()
            .map(|line| ServiceLineSummary {
                service_code: line.service_code.clone(),
                duration_minutes: line.duration_minutes,
                buffer_minutes: line.buffer_minutes,
            })
            .collect(),
        participants: plan
            .participants
            .iter()
            .map(|p| ParticipantSummary {
                employee_code: p.employee_code.clone(),
                full_name: p.full_name(),
                role: ParticipantRole::Assistant,
            })
            .collect(),
        appointment,
    }
}
