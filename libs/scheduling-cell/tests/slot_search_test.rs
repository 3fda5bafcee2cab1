// libs/scheduling-cell/tests/slot_search_test.rs
use std::sync::Arc;

use chrono::{Duration, NaiveTime, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use directory_cell::services::{EmployeeDirectory, RoomDirectory, ServiceCatalog};
use scheduling_cell::models::{AvailabilityRequest, SchedulingError};
use scheduling_cell::services::{CalendarReader, DurationCalculator, SlotSearchEngine};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn build_engine(config: Arc<AppConfig>) -> SlotSearchEngine {
    let supabase = Arc::new(SupabaseClient::new(&config));
    let calendar = Arc::new(CalendarReader::new(supabase.clone()));
    let catalog = Arc::new(ServiceCatalog::new(supabase.clone()));
    let duration = Arc::new(DurationCalculator::new(catalog));
    let employees = Arc::new(EmployeeDirectory::new(supabase.clone()));
    let rooms = Arc::new(RoomDirectory::new(supabase));
    SlotSearchEngine::new(config, calendar, duration, employees, rooms)
}

fn future_date() -> chrono::NaiveDate {
    Utc::now().date_naive() + Duration::days(30)
}

async fn mount_catalog_mocks(server: &MockServer, doctor_id: &str, room_id: &str) {
    // Two services: 30+10 cleaning, 20+5 x-ray, 65 minutes total
    Mock::given(method("GET"))
        .and(path("/rest/v1/dental_services"))
        .and(query_param("service_code", "eq.SVC-CLEAN"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::service_response(
                &Uuid::new_v4().to_string(), "SVC-CLEAN", 30, 10, None
            )
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/dental_services"))
        .and(query_param("service_code", "eq.SVC-XRAY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::service_response(
                &Uuid::new_v4().to_string(), "SVC-XRAY", 20, 5, None
            )
        ])))
        .mount(server)
        .await;

    // Both services supported by R-OP1
    Mock::given(method("GET"))
        .and(path("/rest/v1/room_services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::room_service_row("R-OP1", "SVC-CLEAN"),
            MockSupabaseResponses::room_service_row("R-OP1", "SVC-XRAY"),
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/rooms"))
        .and(query_param("is_active", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"room_code": "R-OP1"}
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/rooms"))
        .and(query_param("room_code", "eq.R-OP1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::room_response(room_id, "R-OP1", "operatory", true)
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/employees"))
        .and(query_param("employee_code", "eq.D-100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::employee_response(doctor_id, "D-100", vec![], true)
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointment_participants"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn busy_window_removes_overlapping_starts() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();

    let doctor_id = Uuid::new_v4().to_string();
    let room_id = Uuid::new_v4().to_string();
    mount_catalog_mocks(&mock_server, &doctor_id, &room_id).await;

    let date = future_date();
    let busy_start = date.and_hms_opt(9, 0, 0).unwrap().and_utc();
    let busy_end = date.and_hms_opt(10, 0, 0).unwrap().and_utc();

    // Doctor busy 09:00-10:00; room calendar empty
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("employee_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &doctor_id,
                &room_id,
                busy_start,
                busy_end,
                "scheduled",
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("room_id", format!("eq.{}", room_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let engine = build_engine(config);
    let request = AvailabilityRequest {
        date,
        employee_code: "D-100".to_string(),
        service_codes: vec!["SVC-CLEAN".to_string(), "SVC-XRAY".to_string()],
        participant_codes: vec![],
    };

    let response = engine.find_slots(&request, "test-token").await.unwrap();

    assert_eq!(response.total_duration_minutes, 65);
    assert!(response.message.is_none());

    let starts: Vec<_> = response.slots.iter().map(|s| s.start_time).collect();
    let at = |h, m| date.and_hms_opt(h, m, 0).unwrap().and_utc();

    // 08:00 + 65min = 09:05, overlapping the busy window
    assert!(!starts.contains(&at(8, 0)));
    assert!(!starts.contains(&at(9, 30)));
    // back-to-back after the busy window is fine
    assert!(starts.contains(&at(10, 0)));
    assert!(starts.contains(&at(10, 15)));

    for slot in &response.slots {
        assert_eq!(slot.available_room_codes, vec!["R-OP1"]);
    }
}

#[tokio::test]
async fn slots_never_run_past_closing_time() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();

    let doctor_id = Uuid::new_v4().to_string();
    let room_id = Uuid::new_v4().to_string();
    mount_catalog_mocks(&mock_server, &doctor_id, &room_id).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let date = future_date();
    let engine = build_engine(config);
    let request = AvailabilityRequest {
        date,
        employee_code: "D-100".to_string(),
        service_codes: vec!["SVC-CLEAN".to_string(), "SVC-XRAY".to_string()],
        participant_codes: vec![],
    };

    let response = engine.find_slots(&request, "test-token").await.unwrap();

    let closing = date.and_hms_opt(20, 0, 0).unwrap().and_utc();
    for slot in &response.slots {
        assert!(slot.start_time + Duration::minutes(65) <= closing);
    }
    // 18:45 + 65min = 19:50 fits; 19:00 + 65min = 20:05 does not
    let starts: Vec<_> = response.slots.iter().map(|s| s.start_time).collect();
    assert!(starts.contains(&date.and_hms_opt(18, 45, 0).unwrap().and_utc()));
    assert!(!starts.contains(&date.and_hms_opt(19, 0, 0).unwrap().and_utc()));
}

#[tokio::test]
async fn reports_when_no_room_supports_all_services() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();

    Mock::given(method("GET"))
        .and(path("/rest/v1/dental_services"))
        .and(query_param("service_code", "eq.SVC-CLEAN"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::service_response(
                &Uuid::new_v4().to_string(), "SVC-CLEAN", 30, 10, None
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/dental_services"))
        .and(query_param("service_code", "eq.SVC-SURG"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::service_response(
                &Uuid::new_v4().to_string(), "SVC-SURG", 60, 15, None
            )
        ])))
        .mount(&mock_server)
        .await;

    // Disjoint room sets
    Mock::given(method("GET"))
        .and(path("/rest/v1/room_services"))
        .and(query_param("service_code", "eq.SVC-CLEAN"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::room_service_row("R-OP1", "SVC-CLEAN")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/room_services"))
        .and(query_param("service_code", "eq.SVC-SURG"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::room_service_row("R-SURG1", "SVC-SURG")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/rooms"))
        .and(query_param("is_active", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"room_code": "R-OP1"}, {"room_code": "R-SURG1"}
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/employees"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::employee_response(
                &Uuid::new_v4().to_string(), "D-100", vec![], true
            )
        ])))
        .mount(&mock_server)
        .await;

    let engine = build_engine(config);
    let request = AvailabilityRequest {
        date: future_date(),
        employee_code: "D-100".to_string(),
        service_codes: vec!["SVC-CLEAN".to_string(), "SVC-SURG".to_string()],
        participant_codes: vec![],
    };

    let response = engine.find_slots(&request, "test-token").await.unwrap();

    assert!(response.slots.is_empty());
    assert_eq!(
        response.message.as_deref(),
        Some("No room supports all requested services")
    );
}

#[tokio::test]
async fn past_date_is_rejected_before_any_lookup() {
    let config = TestConfig::default().to_arc();
    let engine = build_engine(config);

    let request = AvailabilityRequest {
        date: Utc::now().date_naive() - Duration::days(1),
        employee_code: "D-100".to_string(),
        service_codes: vec!["SVC-CLEAN".to_string()],
        participant_codes: vec![],
    };

    let err = engine.find_slots(&request, "test-token").await.unwrap_err();
    assert!(matches!(err, SchedulingError::InvalidDate(_)));
}

#[tokio::test]
async fn empty_service_list_is_rejected() {
    let config = TestConfig::default().to_arc();
    let engine = build_engine(config);

    let request = AvailabilityRequest {
        date: future_date(),
        employee_code: "D-100".to_string(),
        service_codes: vec![],
        participant_codes: vec![],
    };

    let err = engine.find_slots(&request, "test-token").await.unwrap_err();
    assert!(matches!(err, SchedulingError::EmptyServiceList));
}

#[tokio::test]
async fn slow_backend_turns_into_search_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/dental_services"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([MockSupabaseResponses::service_response(
                    &Uuid::new_v4().to_string(),
                    "SVC-CLEAN",
                    30,
                    10,
                    None
                )]))
                .set_delay(std::time::Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let base = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let config = Arc::new(AppConfig {
        availability_timeout_secs: 0,
        ..base
    });

    let engine = build_engine(config);
    let request = AvailabilityRequest {
        date: future_date(),
        employee_code: "D-100".to_string(),
        service_codes: vec!["SVC-CLEAN".to_string()],
        participant_codes: vec![],
    };

    let err = engine.find_slots(&request, "test-token").await.unwrap_err();
    assert!(matches!(err, SchedulingError::SearchTimeout));
}

#[tokio::test]
async fn doctor_without_required_specialization_is_rejected() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();

    Mock::given(method("GET"))
        .and(path("/rest/v1/dental_services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::service_response(
                &Uuid::new_v4().to_string(), "SVC-ORTHO", 45, 15, Some("orthodontics")
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/room_services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::room_service_row("R-OP1", "SVC-ORTHO")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/rooms"))
        .and(query_param("is_active", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"room_code": "R-OP1"}
        ])))
        .mount(&mock_server)
        .await;

    // General dentist, no orthodontics
    Mock::given(method("GET"))
        .and(path("/rest/v1/employees"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::employee_response(
                &Uuid::new_v4().to_string(), "D-100", vec!["general"], true
            )
        ])))
        .mount(&mock_server)
        .await;

    let engine = build_engine(config);
    let request = AvailabilityRequest {
        date: future_date(),
        employee_code: "D-100".to_string(),
        service_codes: vec!["SVC-ORTHO".to_string()],
        participant_codes: vec![],
    };

    let err = engine.find_slots(&request, "test-token").await.unwrap_err();
    match err {
        SchedulingError::MissingSpecialization {
            employee_code,
            service_code,
        } => {
            assert_eq!(employee_code, "D-100");
            assert_eq!(service_code, "SVC-ORTHO");
        }
        other => panic!("expected MissingSpecialization, got {:?}", other),
    }
}

#[tokio::test]
async fn participant_calendar_constrains_the_grid() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();

    let doctor_id = Uuid::new_v4().to_string();
    let assistant_id = Uuid::new_v4().to_string();
    let room_id = Uuid::new_v4().to_string();
    mount_catalog_mocks(&mock_server, &doctor_id, &room_id).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/employees"))
        .and(query_param("employee_code", "eq.A-200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::employee_response(&assistant_id, "A-200", vec![], true)
        ])))
        .mount(&mock_server)
        .await;

    let date = future_date();
    let busy_start = date.and_hms_opt(14, 0, 0).unwrap().and_utc();
    let busy_end = date.and_hms_opt(15, 0, 0).unwrap().and_utc();

    // Assistant busy mid-afternoon, everyone else free
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("employee_id", format!("eq.{}", assistant_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &assistant_id,
                &room_id,
                busy_start,
                busy_end,
                "checked_in",
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("employee_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("room_id", format!("eq.{}", room_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let engine = build_engine(config);
    let request = AvailabilityRequest {
        date,
        employee_code: "D-100".to_string(),
        service_codes: vec!["SVC-CLEAN".to_string(), "SVC-XRAY".to_string()],
        participant_codes: vec!["A-200".to_string()],
    };

    let response = engine.find_slots(&request, "test-token").await.unwrap();
    let starts: Vec<_> = response.slots.iter().map(|s| s.start_time).collect();

    assert!(!starts.contains(&date.and_hms_opt(14, 0, 0).unwrap().and_utc()));
    assert!(!starts.contains(&date.and_hms_opt(13, 30, 0).unwrap().and_utc()));
    assert!(starts.contains(&date.and_hms_opt(15, 0, 0).unwrap().and_utc()));
}

#[tokio::test]
async fn today_is_a_valid_search_date() {
    // Validation only; no slots asserted because "now" moves.
    let mock_server = MockServer::start().await;
    let config = Arc::new(AppConfig {
        clinic_opening_time: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
        ..TestConfig::with_supabase_url(&mock_server.uri()).to_app_config()
    });

    let doctor_id = Uuid::new_v4().to_string();
    let room_id = Uuid::new_v4().to_string();
    mount_catalog_mocks(&mock_server, &doctor_id, &room_id).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let engine = build_engine(config);
    let request = AvailabilityRequest {
        date: Utc::now().date_naive(),
        employee_code: "D-100".to_string(),
        service_codes: vec!["SVC-CLEAN".to_string()],
        participant_codes: vec![],
    };

    let response = engine.find_slots(&request, "test-token").await.unwrap();
    let now = Utc::now();
    for slot in &response.slots {
        assert!(slot.start_time >= now - Duration::minutes(1));
    }
}

#[tokio::test]
async fn deterministic_output_for_identical_state() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();

    let doctor_id = Uuid::new_v4().to_string();
    let room_id = Uuid::new_v4().to_string();
    mount_catalog_mocks(&mock_server, &doctor_id, &room_id).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let engine = build_engine(config);
    let request = AvailabilityRequest {
        date: future_date(),
        employee_code: "D-100".to_string(),
        service_codes: vec!["SVC-CLEAN".to_string(), "SVC-XRAY".to_string()],
        participant_codes: vec![],
    };

    let first = engine.find_slots(&request, "test-token").await.unwrap();
    let second = engine.find_slots(&request, "test-token").await.unwrap();

    let starts =
        |r: &scheduling_cell::models::AvailabilityResponse| -> Vec<(chrono::DateTime<Utc>, Vec<String>)> {
            r.slots
                .iter()
                .map(|s| (s.start_time, s.available_room_codes.clone()))
                .collect()
        };
    assert_eq!(starts(&first), starts(&second));
}
