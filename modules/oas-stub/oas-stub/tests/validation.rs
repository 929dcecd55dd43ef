use oas_stub::test_support::{AppHarness, PETSTORE_SPEC};
use oas_stub::{ApiConfiguration, ApiDefinitions, ApiOptions};
use serde_json::json;

async fn petstore(definitions: ApiDefinitions) -> AppHarness {
    AppHarness::builder()
        .with_application("petstore", definitions.with_specification(PETSTORE_SPEC))
        .build()
        .await
}

#[tokio::test]
async fn valid_body_gets_created_response() {
    let h = petstore(ApiDefinitions::default()).await;
    let resp = h
        .post("/oas/petstore/v1/pets")
        .with_json(&json!({"name": "rex"}))
        .expect_status(201)
        .await;
    assert!(resp.json()["id"].as_i64().unwrap() >= 1);
}

#[tokio::test]
async fn invalid_body_gets_declared_400() {
    let h = petstore(ApiDefinitions::default()).await;
    for body in [json!({}), json!({"name": 7}), json!({"name": "rex", "age": 3})] {
        h.post("/oas/petstore/v1/pets")
            .with_json(&body)
            .expect_status(400)
            .await;
    }
}

#[tokio::test]
async fn missing_body_is_invalid() {
    let h = petstore(ApiDefinitions::default()).await;
    h.post("/oas/petstore/v1/pets").expect_status(400).await;
}

#[tokio::test]
async fn unparsable_json_is_invalid() {
    let h = petstore(ApiDefinitions::default()).await;
    h.post("/oas/petstore/v1/pets")
        .with_header("content-type", "application/json")
        .with_body("{\"name\":")
        .expect_status(400)
        .await;
}

#[tokio::test]
async fn undeclared_content_type_is_invalid() {
    let h = petstore(ApiDefinitions::default()).await;
    h.post("/oas/petstore/v1/pets")
        .with_header("content-type", "application/xml")
        .with_body("<pet/>")
        .expect_status(400)
        .await;
}

#[tokio::test]
async fn missing_api_key_is_401() {
    let h = petstore(ApiDefinitions::default()).await;
    h.get("/oas/petstore/v1/secure").expect_status(401).await;
    h.get("/oas/petstore/v1/secure")
        .with_header("x-api-key", "secret")
        .expect_status(200)
        .await;
}

#[tokio::test]
async fn invalid_path_variable_picks_next_declared_code() {
    // `/pets/{id}` declares 200 and 404 only: the smallest code at or above
    // 400 answers.
    let h = petstore(ApiDefinitions::default()).await;
    h.get("/oas/petstore/v1/pets/0").expect_status(404).await;
    h.get("/oas/petstore/v1/pets/abc").expect_status(404).await;
}

#[tokio::test]
async fn no_declared_error_response_yields_problem_details() {
    let spec = r"
openapi: 3.0.3
info: {title: t, version: '1'}
paths:
  /items:
    get:
      parameters:
        - {name: limit, in: query, required: true, schema: {type: integer, maximum: 10}}
      responses:
        '200': {description: ok}
";
    let h = AppHarness::builder()
        .with_application("items", ApiDefinitions::default().with_specification(spec))
        .build()
        .await;
    h.get("/oas/items/items?limit=50")
        .expect_status(400)
        .await
        .assert_validation_error("limit", "Maximum value is 10");

    let resp = h.get("/oas/items/items").expect_status(400).await;
    assert_eq!(
        resp.json()["errors"][0]["reason"],
        "Query parameter 'limit' is required"
    );
    h.get("/oas/items/items?limit=5").expect_status(200).await;
}

#[tokio::test]
async fn disabled_validation_always_succeeds() {
    let definitions = ApiDefinitions::default().with_configuration(
        "/v1/pets",
        ApiConfiguration::default().with_options(ApiOptions::default().with_should_validate(false)),
    );
    let h = petstore(definitions).await;
    h.post("/oas/petstore/v1/pets")
        .with_json(&json!({"unexpected": true}))
        .expect_status(201)
        .await;
    // Other paths keep validating.
    h.get("/oas/petstore/v1/secure").expect_status(401).await;
}
