mod common;

use axum::http::StatusCode;
use common::{get, TestApp};
use tenant_service::models::{Agency, AgencyTier};

#[tokio::test]
async fn health_check_reports_dependencies() {
    let app = TestApp::spawn();

    let (status, body) = app.send(get("example.com", "/health").build()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "tenant-service-test");
    assert_eq!(body["checks"]["directory"], "up");
    assert_eq!(body["checks"]["cache"], "up");
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = TestApp::spawn();

    let response = tower::util::ServiceExt::oneshot(
        app.router(),
        get("example.com", "/health")
            .header("x-request-id", "req-123")
            .build(),
    )
    .await
    .unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-123");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn subdomain_availability() {
    let app = TestApp::spawn().with_agency(Agency::new("a1", "Acme", "acme", AgencyTier::Starter));

    let cases = [
        ("acme", "taken", false),
        ("support", "reserved", false),
        ("ab", "invalid_format", false),
        ("-acme", "invalid_format", false),
        ("fresh-agency", "available", true),
    ];

    for (subdomain, expected, available) in cases {
        let path = format!("/api/subdomains/{}/availability", subdomain);
        let (status, body) = app.send(get("example.com", &path).build()).await;

        assert_eq!(status, StatusCode::OK, "{}", subdomain);
        assert_eq!(body["status"], expected, "{}", subdomain);
        assert_eq!(body["available"], available, "{}", subdomain);
    }
}

#[tokio::test]
async fn soft_deleted_subdomain_is_not_available() {
    let app = TestApp::spawn().with_agency(Agency::new("a1", "Acme", "acme", AgencyTier::Starter));
    app.directory.soft_delete("a1");

    let (status, body) = app
        .send(get("example.com", "/api/subdomains/acme/availability").build())
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "taken");
    assert_eq!(body["available"], false);
}
