use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, instrument};

use directory_cell::services::{EmployeeDirectory, RoomDirectory};
use shared_config::AppConfig;

use crate::models::{
    AvailabilityRequest, AvailabilityResponse, BusyInterval, SchedulingError, ServicePlan,
    SlotOption,
};
use crate::services::calendar::{intervals_overlap, merge_intervals, CalendarReader, ResourceRef};
use crate::services::duration::DurationCalculator;

/// Advisory slot search over one doctor's day. Results reflect the calendar
/// at read time; booking re-validates inside its own transaction.
pub struct SlotSearchEngine {
    config: Arc<AppConfig>,
    calendar: Arc<CalendarReader>,
    duration: Arc<DurationCalculator>,
    employees: Arc<EmployeeDirectory>,
    rooms: Arc<RoomDirectory>,
}

impl SlotSearchEngine {
    pub fn new(
        config: Arc<AppConfig>,
        calendar: Arc<CalendarReader>,
        duration: Arc<DurationCalculator>,
        employees: Arc<EmployeeDirectory>,
        rooms: Arc<RoomDirectory>,
    ) -> Self {
        Self {
            config,
            calendar,
            duration,
            employees,
            rooms,
        }
    }

    /// Runs the search under the configured deadline so one slow query can't
    /// hang the request.
    #[instrument(skip(self, auth_token), fields(date = %request.date, employee = %request.employee_code))]
    pub async fn find_slots(
        &self,
        request: &AvailabilityRequest,
        auth_token: &str,
    ) -> Result<AvailabilityResponse, SchedulingError> {
        let deadline = StdDuration::from_secs(self.config.availability_timeout_secs);
        tokio::time::timeout(deadline, self.find_slots_inner(request, auth_token))
            .await
            .map_err(|_| SchedulingError::SearchTimeout)?
    }

    async fn find_slots_inner(
        &self,
        request: &AvailabilityRequest,
        auth_token: &str,
    ) -> Result<AvailabilityResponse, SchedulingError> {
        let now = Utc::now();
        if request.date < now.date_naive() {
            return Err(SchedulingError::InvalidDate(format!(
                "{} is in the past",
                request.date
            )));
        }

        let plan = self.duration.plan(&request.service_codes, auth_token).await?;

        let doctor = self
            .employees
            .find_by_code(&request.employee_code, auth_token)
            .await?;
        if !doctor.is_active {
            return Err(SchedulingError::EmployeeInactive(doctor.employee_code));
        }
        check_specializations(&doctor, &plan)?;

        let mut participants = Vec::with_capacity(request.participant_codes.len());
        for code in &request.participant_codes {
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

        if plan.compatible_room_codes.is_empty() {
            info!("No room supports all requested services");
            return Ok(AvailabilityResponse {
                date: request.date,
                employee_code: request.employee_code.clone(),
                total_duration_minutes: plan.total_duration_minutes,
                slots: Vec::new(),
                message: Some("No room supports all requested services".to_string()),
            });
        }

        let day_open = day_boundary(request.date, self.config.clinic_opening_time);
        let day_close = day_boundary(request.date, self.config.clinic_closing_time);

        // One calendar read per resource up front, then a pure in-memory scan
        // over the grid.
        let doctor_busy = merge_intervals(
            self.calendar
                .busy_intervals(ResourceRef::Doctor(doctor.id), day_open, day_close, None, auth_token)
                .await?,
        );

        let mut participants_busy = Vec::with_capacity(participants.len());
        for participant in &participants {
            let busy = merge_intervals(
                self.calendar
                    .busy_intervals(
                        ResourceRef::Doctor(participant.id),
                        day_open,
                        day_close,
                        None,
                        auth_token,
                    )
                    .await?,
            );
            participants_busy.push(busy);
        }

        let mut room_calendars: Vec<(String, Vec<BusyInterval>)> =
            Vec::with_capacity(plan.compatible_room_codes.len());
        for room_code in &plan.compatible_room_codes {
            let room = self.rooms.find_by_code(room_code, auth_token).await?;
            let busy = merge_intervals(
                self.calendar
                    .busy_intervals(ResourceRef::Room(room.id), day_open, day_close, None, auth_token)
                    .await?,
            );
            room_calendars.push((room_code.clone(), busy));
        }

        let slot_length = Duration::minutes(plan.total_duration_minutes);
        let starts = candidate_starts(
            day_open,
            day_close,
            Duration::minutes(self.config.slot_grid_minutes),
            slot_length,
        );

        let mut slots = Vec::new();
        for start in starts {
            // Same-day searches never offer slots already behind the clock.
            if start < now {
                continue;
            }
            let end = start + slot_length;

            if !is_free(start, end, &doctor_busy) {
                continue;
            }
            if participants_busy.iter().any(|busy| !is_free(start, end, busy)) {
                continue;
            }

            let available_room_codes: Vec<String> = room_calendars
                .iter()
                .filter(|(_, busy)| is_free(start, end, busy))
                .map(|(code, _)| code.clone())
                .collect();

            if !available_room_codes.is_empty() {
                slots.push(SlotOption {
                    start_time: start,
                    available_room_codes,
                });
            }
        }

        debug!("Found {} candidate slots", slots.len());
        Ok(AvailabilityResponse {
            date: request.date,
            employee_code: request.employee_code.clone(),
            total_duration_minutes: plan.total_duration_minutes,
            slots,
            message: None,
        })
    }
}

pub(crate) fn check_specializations(
    doctor: &directory_cell::Employee,
    plan: &ServicePlan,
) -> Result<(), SchedulingError> {
    for line in &plan.service_lines {
        if let Some(spec) = &line.specialization_id {
            if !doctor.has_specialization(spec) {
                return Err(SchedulingError::MissingSpecialization {
                    employee_code: doctor.employee_code.clone(),
                    service_code: line.service_code.clone(),
                });
            }
        }
    }
    Ok(())
}

fn day_boundary(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    date.and_time(time).and_utc()
}

/// Grid of candidate start times: every `step` from opening, keeping only
/// starts whose slot still ends by closing.
fn candidate_starts(
    open: DateTime<Utc>,
    close: DateTime<Utc>,
    step: Duration,
    slot_length: Duration,
) -> Vec<DateTime<Utc>> {
    let mut starts = Vec::new();
    let mut cursor = open;
    while cursor + slot_length <= close {
        starts.push(cursor);
        cursor += step;
    }
    starts
}

fn is_free(start: DateTime<Utc>, end: DateTime<Utc>, busy: &[BusyInterval]) -> bool {
    !busy.iter().any(|b| intervals_overlap(start, end, b.start, b.end))
}
