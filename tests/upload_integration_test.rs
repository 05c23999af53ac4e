mod common;

use common::CapturedEvents;
use httpmock::prelude::*;
use msdb_client::{ApiClient, ClientConfig, ErrorCategory, SimanCalculation, UploadOutcome};
use serde_json::{json, Map, Value};
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use tempfile::NamedTempFile;
use tracing::Level;

fn config_for(server: &MockServer) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.server.base_url = server.url("/api/");
    config.server.token = Some("test-token".to_string());
    config
}

fn info(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

fn structure_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"data_LiCoO2\n_cell_length_a 2.82\n").unwrap();
    file
}

/// mp_id 存在時走只更新欄位的路徑，且 matproject_id 帶相同值
#[test]
fn test_metadata_only_upload_sends_alias() {
    let server = MockServer::start();
    let cards_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chemicals_compounds/chemical_cards/")
            .header("Authorization", "JWT test-token")
            .x_www_form_urlencoded_tuple("mp_id", "mp-1")
            .x_www_form_urlencoded_tuple("matproject_id", "mp-1")
            .x_www_form_urlencoded_tuple("band_gap", "1.25")
            .x_www_form_urlencoded_tuple("reduction_reaction", "-");
        then.status(201).json_body(json!({"id": 42}));
    });

    let client = ApiClient::new(&config_for(&server));
    let main = info(json!({"mp_id": "mp-1", "band_gap": 1.25, "ignored": 3}));

    let outcome = client.post_structure(None, Some(&main), None);

    cards_mock.assert();
    assert_eq!(outcome, UploadOutcome::Created { id: "42".to_string() });
}

#[test]
fn test_file_upload_is_multipart() {
    let server = MockServer::start();
    let cards_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chemicals_compounds/chemical_cards/")
            .header_exists("Authorization")
            .body_contains("name=\"file\"")
            .body_contains("data_LiCoO2")
            .body_contains("name=\"extra_info\"")
            .body_contains("{\"code\":\"vasp\"}");
        then.status(201).json_body(json!({"id": "card-7"}));
    });

    let client = ApiClient::new(&config_for(&server));
    let file = structure_file();
    let main = info(json!({"tag": "batch"}));

    let outcome = client.post_structure(
        Some(file.path()),
        Some(&main),
        Some(&json!({"code": "vasp"})),
    );

    cards_mock.assert();
    assert_eq!(outcome.id(), Some("card-7"));
}

#[test]
fn test_missing_identifier_and_file_makes_no_request() {
    let server = MockServer::start();
    let cards_mock = server.mock(|when, then| {
        when.method(POST);
        then.status(201).json_body(json!({"id": 1}));
    });

    let client = ApiClient::new(&config_for(&server));
    let main = info(json!({"band_gap": 1.0}));
    let outcome = client.post_structure(None, Some(&main), None);

    cards_mock.assert_hits(0);
    assert_eq!(
        outcome.failure().map(|f| f.category),
        Some(ErrorCategory::Precondition)
    );
}

#[test]
fn test_rejected_card_carries_status_and_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/chemicals_compounds/chemical_cards/");
        then.status(400).body("{\"mp_id\":[\"already exists\"]}");
    });

    let client = ApiClient::new(&config_for(&server));
    let main = info(json!({"mp_id": "mp-9"}));
    let outcome = client.post_structure(None, Some(&main), None);

    let failure = outcome.failure().expect("must fail");
    assert_eq!(failure.status, Some(400));
    assert_eq!(failure.detail, "{\"mp_id\":[\"already exists\"]}");
}

#[test]
fn test_unreadable_structure_file_is_reported() {
    let server = MockServer::start();
    let cards_mock = server.mock(|when, then| {
        when.method(POST);
        then.status(201).json_body(json!({"id": 1}));
    });

    let client = ApiClient::new(&config_for(&server));
    let main = info(json!({"tag": "x"}));
    let outcome = client.post_structure(
        Some(std::path::Path::new("/nonexistent/dir/missing.cif")),
        Some(&main),
        None,
    );

    assert!(!outcome.is_success());
    cards_mock.assert_hits(0);
}

#[test]
fn test_connection_failure_becomes_failure_outcome() {
    // 沒有伺服器在監聽的位址
    let mut config = ClientConfig::default();
    config.server.base_url = "http://127.0.0.1:9/api/".to_string();

    let client = ApiClient::new(&config);
    let main = info(json!({"mp_id": "mp-1"}));
    let outcome = client.post_structure(None, Some(&main), None);

    let failure = outcome.failure().expect("must fail");
    assert_eq!(failure.category, ErrorCategory::Transport);
}

#[test]
fn test_submit_calculation_sends_encoded_object() {
    let server = MockServer::start();
    let cards_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chemicals_compounds/chemical_cards/")
            .body_contains("name=\"siman_calc\"")
            .body_contains("siman_calculation")
            .body_contains("name=\"file\"");
        then.status(201).json_body(json!({"id": 5}));
    });

    let client = ApiClient::new(&config_for(&server));
    let file = structure_file();
    let calc = SimanCalculation {
        name: "LiCoO2.su".to_string(),
        energy_sigma0: Some(-22.5),
        ..Default::default()
    };

    let outcome = client.submit_calculation(Some(&calc), Some(file.path()), None, None);

    cards_mock.assert();
    assert_eq!(outcome.id(), Some("5"));
}

#[test]
fn test_session_reuses_client_for_all_calls() {
    let server = MockServer::start();
    let cards_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chemicals_compounds/chemical_cards/");
        then.status(201).json_body(json!({"id": 1}));
    });

    let config = config_for(&server);
    let outcomes = ApiClient::session(&config, |client| {
        let first = client.post_structure(None, Some(&info(json!({"mp_id": "mp-1"}))), None);
        let second = client.post_structure(None, Some(&info(json!({"mp_id": "mp-2"}))), None);
        vec![first, second]
    })
    .unwrap();

    cards_mock.assert_hits(2);
    assert!(outcomes.iter().all(UploadOutcome::is_success));
}

#[test]
fn test_session_closes_when_closure_panics() {
    let server = MockServer::start();
    let config = config_for(&server);
    let events = CapturedEvents::default();

    let result = events.capture(|| {
        panic::catch_unwind(AssertUnwindSafe(|| {
            ApiClient::session(&config, |_client| -> usize { panic!("upload aborted") })
        }))
    });

    assert!(result.is_err());
    let logged = events.messages_at(Level::INFO);
    let opened = logged.iter().position(|m| m == "APIClient: Opening session");
    let closed = logged.iter().position(|m| m == "APIClient: Closing session");
    assert!(opened.is_some());
    assert!(closed > opened);
}
