use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_database::supabase::SupabaseClient;

use crate::models::{DentalService, DirectoryError};

pub struct ServiceCatalog {
    supabase: Arc<SupabaseClient>,
}

impl ServiceCatalog {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn find_by_code(
        &self,
        service_code: &str,
        auth_token: &str,
    ) -> Result<DentalService, DirectoryError> {
        debug!("Looking up service: {}", service_code);

        let path = format!(
            "/rest/v1/dental_services?service_code=eq.{}",
            urlencoding::encode(service_code)
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DirectoryError::Database(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| DirectoryError::ServiceNotFound(service_code.to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| DirectoryError::Database(format!("Failed to parse service: {}", e)))
    }

    /// Active room codes whose compatibility bridge covers a service.
    pub async fn room_codes_for_service(
        &self,
        service_code: &str,
        auth_token: &str,
    ) -> Result<Vec<String>, DirectoryError> {
        let path = format!(
            "/rest/v1/room_services?service_code=eq.{}&select=room_code",
            urlencoding::encode(service_code)
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DirectoryError::Database(e.to_string()))?;

        Ok(result
            .into_iter()
            .filter_map(|row| {
                row.get("room_code")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
            })
            .collect())
    }

    /// Room codes that are currently active, used to filter the bridge rows.
    pub async fn active_room_codes(
        &self,
        auth_token: &str,
    ) -> Result<Vec<String>, DirectoryError> {
        let path = "/rest/v1/rooms?is_active=eq.true&select=room_code&order=room_code.asc";
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| DirectoryError::Database(e.to_string()))?;

        Ok(result
            .into_iter()
            .filter_map(|row| {
                row.get("room_code")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
            })
            .collect())
    }
}
