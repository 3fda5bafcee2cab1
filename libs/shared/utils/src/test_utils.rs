use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            redis_url: None,
            clinic_opening_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            clinic_closing_time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            slot_grid_minutes: 15,
            availability_timeout_secs: 10,
            booking_retry_attempts: 2,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "receptionist".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn receptionist(email: &str) -> Self {
        Self::new(email, "receptionist")
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }
}

/// Canned PostgREST response bodies for the dental-clinic schema.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn patient_response(id: &str, patient_code: &str, is_active: bool) -> Value {
        json!({
            "id": id,
            "patient_code": patient_code,
            "first_name": "Test",
            "last_name": "Patient",
            "is_active": is_active,
            "created_at": Utc::now().to_rfc3339()
        })
    }

    pub fn employee_response(
        id: &str,
        employee_code: &str,
        specialization_ids: Vec<&str>,
        is_active: bool,
    ) -> Value {
        json!({
            "id": id,
            "employee_code": employee_code,
            "first_name": "Test",
            "last_name": "Doctor",
            "specialization_ids": specialization_ids,
            "is_active": is_active,
            "created_at": Utc::now().to_rfc3339()
        })
    }

    pub fn room_response(id: &str, room_code: &str, room_type: &str, is_active: bool) -> Value {
        json!({
            "id": id,
            "room_code": room_code,
            "room_type": room_type,
            "is_active": is_active
        })
    }

    pub fn service_response(
        id: &str,
        service_code: &str,
        duration_minutes: i64,
        buffer_minutes: i64,
        specialization_id: Option<&str>,
    ) -> Value {
        json!({
            "id": id,
            "service_code": service_code,
            "name": service_code,
            "default_duration_minutes": duration_minutes,
            "default_buffer_minutes": buffer_minutes,
            "specialization_id": specialization_id,
            "is_active": true
        })
    }

    pub fn room_service_row(room_code: &str, service_code: &str) -> Value {
        json!({
            "room_code": room_code,
            "service_code": service_code
        })
    }

    pub fn appointment_row(
        id: &str,
        patient_id: &str,
        employee_id: &str,
        room_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        status: &str,
    ) -> Value {
        json!({
            "id": id,
            "appointment_code": format!("APT-{}", &id[..8.min(id.len())]),
            "patient_id": patient_id,
            "employee_id": employee_id,
            "room_id": room_id,
            "start_time": start_time.to_rfc3339(),
            "end_time": end_time.to_rfc3339(),
            "status": status,
            "notes": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        })
    }
}
