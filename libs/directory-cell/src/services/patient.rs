use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_database::supabase::SupabaseClient;

use crate::models::{DirectoryError, Patient};

pub struct PatientDirectory {
    supabase: Arc<SupabaseClient>,
}

impl PatientDirectory {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Look up a patient by business code. Active/inactive is for the caller
    /// to judge; only a missing row is an error here.
    pub async fn find_by_code(
        &self,
        patient_code: &str,
        auth_token: &str,
    ) -> Result<Patient, DirectoryError> {
        debug!("Looking up patient: {}", patient_code);

        let path = format!(
            "/rest/v1/patients?patient_code=eq.{}",
            urlencoding::encode(patient_code)
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DirectoryError::Database(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| DirectoryError::PatientNotFound(patient_code.to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| DirectoryError::Database(format!("Failed to parse patient: {}", e)))
    }

    pub async fn find_by_id(
        &self,
        patient_id: uuid::Uuid,
        auth_token: &str,
    ) -> Result<Patient, DirectoryError> {
        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DirectoryError::Database(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| DirectoryError::PatientNotFound(patient_id.to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| DirectoryError::Database(format!("Failed to parse patient: {}", e)))
    }
}
