use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_database::supabase::SupabaseClient;

use crate::models::{DirectoryError, Room};

pub struct RoomDirectory {
    supabase: Arc<SupabaseClient>,
}

impl RoomDirectory {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn find_by_code(
        &self,
        room_code: &str,
        auth_token: &str,
    ) -> Result<Room, DirectoryError> {
        debug!("Looking up room: {}", room_code);

        let path = format!(
            "/rest/v1/rooms?room_code=eq.{}",
            urlencoding::encode(room_code)
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DirectoryError::Database(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| DirectoryError::RoomNotFound(room_code.to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| DirectoryError::Database(format!("Failed to parse room: {}", e)))
    }

    pub async fn find_by_id(
        &self,
        room_id: uuid::Uuid,
        auth_token: &str,
    ) -> Result<Room, DirectoryError> {
        let path = format!("/rest/v1/rooms?id=eq.{}", room_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DirectoryError::Database(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| DirectoryError::RoomNotFound(room_id.to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| DirectoryError::Database(format!("Failed to parse room: {}", e)))
    }

    /// Service codes supported by a room, from the room_services bridge.
    pub async fn service_codes_for_room(
        &self,
        room_code: &str,
        auth_token: &str,
    ) -> Result<Vec<String>, DirectoryError> {
        let path = format!(
            "/rest/v1/room_services?room_code=eq.{}&select=service_code",
            urlencoding::encode(room_code)
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DirectoryError::Database(e.to_string()))?;

        Ok(result
            .into_iter()
            .filter_map(|row| {
                row.get("service_code")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
            })
            .collect())
    }
}
