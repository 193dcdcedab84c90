//! Mock HTTP tests for ErpClient and roster lookups during enrollment.
//!
//! These tests cover:
//! - Token authorization on every request
//! - The credential check and employee roster endpoints
//! - Rejected credentials and unknown employee ids
//! - Filling in the enrollment name from the roster

use face_punch::erp::{Employee, ErpClient, ErpError};
use face_punch::kiosk::resolve_employee;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> ErpClient {
    ErpClient::new(server.uri(), "kiosk-key", "kiosk-secret").unwrap()
}

async fn mount_roster(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/resource/Employee"))
        .and(header("Authorization", "token kiosk-key:kiosk-secret"))
        .and(query_param("fields", r#"["name","employee_name"]"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                {"name": "HR-EMP-00001", "employee_name": "Asha Rao"},
                {"name": "HR-EMP-00002", "employee_name": "Ravi Kumar"},
                {"name": "HR-EMP-00003"}
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_logged_user_sends_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/method/frappe.auth.get_logged_user"))
        .and(header("Authorization", "token kiosk-key:kiosk-secret"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"message": "kiosk@example.com"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let user = client(&mock_server).logged_user().await.unwrap();
    assert_eq!(user, "kiosk@example.com");
}

#[tokio::test]
async fn test_rejected_credentials_are_unauthorized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/method/frappe.auth.get_logged_user"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid token"))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server).logged_user().await.unwrap_err();
    assert!(err.is_unauthorized());
    match err {
        ErpError::Status { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "Invalid token");
        }
        other => panic!("Expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_employees_lists_roster() {
    let mock_server = MockServer::start().await;
    mount_roster(&mock_server).await;

    let employees = client(&mock_server).employees().await.unwrap();

    assert_eq!(employees.len(), 3);
    assert_eq!(
        employees[0],
        Employee {
            id: "HR-EMP-00001".to_string(),
            employee_name: Some("Asha Rao".to_string()),
        }
    );
    assert_eq!(employees[2].display_name(), "HR-EMP-00003");
}

#[tokio::test]
async fn test_unexpected_roster_shape_is_protocol_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/resource/Employee"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server).employees().await.unwrap_err();
    assert!(matches!(err, ErpError::Protocol(_)));
}

#[tokio::test]
async fn test_find_employee_unknown_id() {
    let mock_server = MockServer::start().await;
    mount_roster(&mock_server).await;

    let erp = client(&mock_server);
    let found = erp.find_employee("HR-EMP-00002").await.unwrap();
    assert_eq!(found.display_name(), "Ravi Kumar");

    let err = erp.find_employee("HR-EMP-09999").await.unwrap_err();
    assert!(matches!(err, ErpError::UnknownEmployee(ref id) if id == "HR-EMP-09999"));
}

#[tokio::test]
async fn test_enrollment_name_comes_from_roster() {
    let mock_server = MockServer::start().await;
    mount_roster(&mock_server).await;
    let erp = client(&mock_server);

    let name = resolve_employee(Some(&erp), "HR-EMP-00001", None).await;
    assert_eq!(name, Ok("Asha Rao".to_string()));

    // An explicit name wins, but the id must still be on the roster.
    let name = resolve_employee(Some(&erp), "HR-EMP-00002", Some("Ravi K.")).await;
    assert_eq!(name, Ok("Ravi K.".to_string()));

    let err = resolve_employee(Some(&erp), "HR-EMP-09999", Some("Ghost"))
        .await
        .unwrap_err();
    assert!(err.contains("HR-EMP-09999"));
}

#[tokio::test]
async fn test_rejected_credentials_block_enrollment() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/resource/Employee"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&mock_server)
        .await;

    let err = resolve_employee(Some(&client(&mock_server)), "HR-EMP-00001", None)
        .await
        .unwrap_err();
    assert!(err.contains("rejected the API key"));
}
