use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{BusyInterval, SchedulingError, ACTIVE_STATUS_FILTER};

/// Half-open interval overlap: `[s1, e1)` intersects `[s2, e2)`.
/// Back-to-back appointments (e1 == s2) do not overlap.
pub fn intervals_overlap(
    start1: DateTime<Utc>,
    end1: DateTime<Utc>,
    start2: DateTime<Utc>,
    end2: DateTime<Utc>,
) -> bool {
    start1 < end2 && start2 < end1
}

/// A calendar owner whose busy windows can be read.
#[derive(Debug, Clone, Copy)]
pub enum ResourceRef {
    /// Includes both primary assignments and participant rows.
    Doctor(Uuid),
    Room(Uuid),
    Patient(Uuid),
}

pub struct CalendarReader {
    supabase: Arc<SupabaseClient>,
}

impl CalendarReader {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Active busy intervals for a resource inside `[from, to)`, sorted by
    /// start. `exclude_appointment_id` drops one appointment from the result,
    /// used when rescheduling so the old booking doesn't block its own slot.
    pub async fn busy_intervals(
        &self,
        resource: ResourceRef,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<BusyInterval>, SchedulingError> {
        let mut intervals = match resource {
            ResourceRef::Doctor(id) => {
                let mut primary = self
                    .query_appointments("employee_id", id, from, to, exclude_appointment_id, auth_token)
                    .await?;
                let secondary = self
                    .participant_intervals(id, from, to, exclude_appointment_id, auth_token)
                    .await?;
                primary.extend(secondary);
                primary
            }
            ResourceRef::Room(id) => {
                self.query_appointments("room_id", id, from, to, exclude_appointment_id, auth_token)
                    .await?
            }
            ResourceRef::Patient(id) => {
                self.query_appointments("patient_id", id, from, to, exclude_appointment_id, auth_token)
                    .await?
            }
        };

        intervals.sort_by_key(|i| i.start);
        Ok(intervals)
    }

    /// Envelope query: any active appointment intersecting `[from, to)`
    /// satisfies `start_time < to AND end_time > from`.
    async fn query_appointments(
        &self,
        field: &str,
        id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<BusyInterval>, SchedulingError> {
        let mut path = format!(
            "/rest/v1/appointments?{}=eq.{}&{}&start_time=lt.{}&end_time=gt.{}&select=id,start_time,end_time",
            field,
            id,
            ACTIVE_STATUS_FILTER,
            urlencoding::encode(&to.to_rfc3339()),
            urlencoding::encode(&from.to_rfc3339()),
        );
        if let Some(excluded) = exclude_appointment_id {
            path.push_str(&format!("&id=neq.{}", excluded));
        }

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        debug!("{} busy rows for {}={}", rows.len(), field, id);
        parse_intervals(rows)
    }

    /// Appointments where the employee is booked as a participant rather
    /// than the primary doctor. Two-step: bridge rows first, then the
    /// appointment windows.
    async fn participant_intervals(
        &self,
        employee_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<BusyInterval>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointment_participants?employee_id=eq.{}&select=appointment_id",
            employee_id
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        let appointment_ids: Vec<String> = rows
            .into_iter()
            .filter_map(|row| {
                row.get("appointment_id")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
            })
            .filter(|id| {
                exclude_appointment_id
                    .map(|excluded| id != &excluded.to_string())
                    .unwrap_or(true)
            })
            .collect();

        if appointment_ids.is_empty() {
            return Ok(Vec::new());
        }

        let path = format!(
            "/rest/v1/appointments?id=in.({})&{}&start_time=lt.{}&end_time=gt.{}&select=id,start_time,end_time",
            appointment_ids.join(","),
            ACTIVE_STATUS_FILTER,
            urlencoding::encode(&to.to_rfc3339()),
            urlencoding::encode(&from.to_rfc3339()),
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        parse_intervals(rows)
    }
}

fn parse_intervals(rows: Vec<Value>) -> Result<Vec<BusyInterval>, SchedulingError> {
    rows.into_iter()
        .map(|row| {
            let start = parse_timestamp(&row, "start_time")?;
            let end = parse_timestamp(&row, "end_time")?;
            Ok(BusyInterval { start, end })
        })
        .collect()
}

fn parse_timestamp(row: &Value, field: &str) -> Result<DateTime<Utc>, SchedulingError> {
    row.get(field)
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| SchedulingError::Database(format!("Invalid {} in appointment row", field)))
}

/// Coalesce sorted intervals so the slot scan touches each busy window once.
pub fn merge_intervals(mut intervals: Vec<BusyInterval>) -> Vec<BusyInterval> {
    intervals.sort_by_key(|i| i.start);

    let mut merged: Vec<BusyInterval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => {
                if interval.end > last.end {
                    last.end = interval.end;
                }
            }
            _ => merged.push(interval),
        }
    }
    merged
}
