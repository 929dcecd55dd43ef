use oas_stub::test_support::{AppHarness, PETSTORE_SPEC};
use oas_stub::{ApiConfiguration, ApiDefinitions, ApiOptions};
use serde_json::json;

fn recorded_petstore() -> ApiDefinitions {
    ApiDefinitions::default()
        .with_specification(PETSTORE_SPEC)
        .with_configuration(
            "/v1/pets",
            ApiConfiguration::default().with_options(ApiOptions::default().with_should_record(true)),
        )
}

#[tokio::test]
async fn records_request_and_response() {
    let h = AppHarness::builder()
        .with_application("petstore", recorded_petstore())
        .build()
        .await;
    let resp = h
        .post("/oas/petstore/v1/pets")
        .with_header("cookie", "session=abc; theme=dark")
        .with_json(&json!({"name": "rex"}))
        .expect_status(201)
        .await;

    let records = h.records("petstore");
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.method, "POST");
    assert_eq!(record.path, "/v1/pets");
    assert_eq!(record.request.content_type.as_deref(), Some("application/json"));
    assert_eq!(record.request.cookies["session"], "abc");
    assert_eq!(record.request.cookies["theme"], "dark");
    assert_eq!(
        record.request.body.as_deref(),
        Some(br#"{"name":"rex"}"#.as_slice())
    );
    assert_eq!(record.response.status, 201);
    assert_eq!(record.response.body.as_deref(), Some(resp.bytes()));
}

#[tokio::test]
async fn unrecorded_paths_leave_no_record() {
    let h = AppHarness::builder()
        .with_application("petstore", recorded_petstore())
        .build()
        .await;
    h.get("/oas/petstore/v1/pets/1").expect_status(200).await;
    assert!(h.records("petstore").is_empty());
    assert_eq!(h.metrics("petstore").len(), 1);
}

#[tokio::test]
async fn monitoring_can_be_switched_off() {
    let definitions = ApiDefinitions::default()
        .with_specification(PETSTORE_SPEC)
        .with_options(ApiOptions::default().with_should_monitor(false));
    let h = AppHarness::builder()
        .with_application("petstore", definitions)
        .build()
        .await;
    h.get("/oas/petstore/v1/pets/1").expect_status(200).await;
    h.get("/oas/petstore/v1/owners").expect_status(404).await;
    assert!(h.metrics("petstore").is_empty());
}

#[tokio::test]
async fn metrics_capture_request_identity() {
    let h = AppHarness::builder()
        .with_application(
            "petstore",
            ApiDefinitions::default().with_specification(PETSTORE_SPEC),
        )
        .build()
        .await;
    h.get("/oas/petstore/v1/secure").expect_status(401).await;
    let metrics = h.metrics("petstore");
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].http_method, "GET");
    assert_eq!(metrics[0].api_path, "/v1/secure");
    assert_eq!(metrics[0].http_status, 401);
    assert!(metrics[0].error.is_none());
}
