use std::env;

use chrono::NaiveTime;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub redis_url: Option<String>,
    pub clinic_opening_time: NaiveTime,
    pub clinic_closing_time: NaiveTime,
    pub slot_grid_minutes: i64,
    pub availability_timeout_secs: u64,
    pub booking_retry_attempts: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            redis_url: env::var("REDIS_URL").ok(),
            clinic_opening_time: parse_time_var("CLINIC_OPENING_TIME", "08:00"),
            clinic_closing_time: parse_time_var("CLINIC_CLOSING_TIME", "20:00"),
            slot_grid_minutes: parse_num_var("SLOT_GRID_MINUTES", 15),
            availability_timeout_secs: parse_num_var("AVAILABILITY_TIMEOUT_SECS", 10),
            booking_retry_attempts: parse_num_var("BOOKING_RETRY_ATTEMPTS", 2),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_event_publishing_configured(&self) -> bool {
        self.redis_url.is_some()
    }
}

fn parse_time_var(name: &str, default: &str) -> NaiveTime {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    NaiveTime::parse_from_str(&raw, "%H:%M").unwrap_or_else(|_| {
        warn!("{} is not a valid HH:MM time, using default {}", name, default);
        NaiveTime::parse_from_str(default, "%H:%M").unwrap()
    })
}

fn parse_num_var<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} is not a valid number, using default", name);
            default
        }),
        Err(_) => default,
    }
}
