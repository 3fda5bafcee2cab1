use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentAuditEntry, AppointmentStatus, SchedulingError, StatusUpdateRequest,
};
use crate::services::events::EventPublisher;
use crate::services::{classify_rpc_error, RpcFailure};

/// Drives the appointment status machine. Every accepted transition is
/// written together with its audit entry by a single database function.
pub struct LifecycleManager {
    supabase: Arc<SupabaseClient>,
    events: Arc<EventPublisher>,
}

impl LifecycleManager {
    pub fn new(supabase: Arc<SupabaseClient>, events: Arc<EventPublisher>) -> Self {
        Self { supabase, events }
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        let row = rows
            .into_iter()
            .next()
            .ok_or(SchedulingError::AppointmentNotFound(appointment_id))?;

        serde_json::from_value(row)
            .map_err(|e| SchedulingError::Database(format!("Failed to parse appointment: {}", e)))
    }

    /// Validates the transition against the current row, then applies it. The
    /// database function re-checks the stored status, so a concurrent
    /// transition loses cleanly instead of double-applying.
    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        request: &StatusUpdateRequest,
        actor_id: &str,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;
        self.ensure_transition(&current, request.new_status)?;

        let args = json!({
            "p_appointment_id": appointment_id,
            "p_expected_status": current.status.to_string(),
            "p_new_status": request.new_status.to_string(),
            "p_reason": request.reason,
            "p_actor_id": actor_id,
        });

        let updated: Appointment = self
            .supabase
            .rpc("update_appointment_status", Some(auth_token), args)
            .await
            .map_err(|e| match classify_rpc_error(e) {
                RpcFailure::Domain(err) | RpcFailure::Other(err) => err,
                RpcFailure::Retryable(msg) => SchedulingError::Database(msg),
            })?;

        info!(
            "Appointment {} moved {} -> {}",
            appointment_id, current.status, updated.status
        );
        self.events.appointment_changed(appointment_id, "status_changed");

        Ok(updated)
    }

    pub async fn audit_trail(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<AppointmentAuditEntry>, SchedulingError> {
        // 404 for an id nobody has ever written to
        self.get_appointment(appointment_id, auth_token).await?;

        let path = format!(
            "/rest/v1/appointment_audit?appointment_id=eq.{}&order=created_at.asc",
            appointment_id
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| {
                    SchedulingError::Database(format!("Failed to parse audit entry: {}", e))
                })
            })
            .collect()
    }

    fn ensure_transition(
        &self,
        current: &Appointment,
        next: AppointmentStatus,
    ) -> Result<(), SchedulingError> {
        if !current.status.can_transition_to(&next) {
            return Err(SchedulingError::InvalidStatusTransition {
                from: current.status,
                to: next,
            });
        }
        Ok(())
    }
}
