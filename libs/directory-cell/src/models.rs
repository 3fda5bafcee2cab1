use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub patient_code: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub specialization_ids: Vec<String>,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn has_specialization(&self, specialization_id: &str) -> bool {
        self.specialization_ids
            .iter()
            .any(|s| s == specialization_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub room_code: String,
    pub room_type: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DentalService {
    pub id: Uuid,
    pub service_code: String,
    pub name: String,
    pub default_duration_minutes: i64,
    pub default_buffer_minutes: i64,
    pub specialization_id: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DirectoryError {
    #[error("Patient '{0}' not found")]
    PatientNotFound(String),

    #[error("Employee '{0}' not found")]
    EmployeeNotFound(String),

    #[error("Room '{0}' not found")]
    RoomNotFound(String),

    #[error("Service '{0}' not found")]
    ServiceNotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}
