use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_database::supabase::SupabaseClient;

use crate::models::{DirectoryError, Employee};

pub struct EmployeeDirectory {
    supabase: Arc<SupabaseClient>,
}

impl EmployeeDirectory {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn find_by_code(
        &self,
        employee_code: &str,
        auth_token: &str,
    ) -> Result<Employee, DirectoryError> {
        debug!("Looking up employee: {}", employee_code);

        let path = format!(
            "/rest/v1/employees?employee_code=eq.{}",
            urlencoding::encode(employee_code)
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DirectoryError::Database(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| DirectoryError::EmployeeNotFound(employee_code.to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| DirectoryError::Database(format!("Failed to parse employee: {}", e)))
    }

    pub async fn find_by_id(
        &self,
        employee_id: uuid::Uuid,
        auth_token: &str,
    ) -> Result<Employee, DirectoryError> {
        let path = format!("/rest/v1/employees?id=eq.{}", employee_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DirectoryError::Database(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| DirectoryError::EmployeeNotFound(employee_id.to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| DirectoryError::Database(format!("Failed to parse employee: {}", e)))
    }
}
