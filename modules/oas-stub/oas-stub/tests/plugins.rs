use std::sync::Arc;

use oas_stub::test_support::{AppHarness, PETSTORE_SPEC, StaticPlugin, StaticPluginCompiler};
use oas_stub::{ApiConfiguration, ApiData, ApiDefinitions, PluginDefinition, ResponseContext};
use serde_json::json;

async fn petstore_with(plugin: PluginDefinition) -> AppHarness {
    let definitions = ApiDefinitions::default()
        .with_specification(PETSTORE_SPEC)
        .with_configuration("/v1/pets/{id}", ApiConfiguration::default().with_plugin(plugin));
    AppHarness::builder()
        .with_compiler(Arc::new(
            StaticPluginCompiler::new()
                .with_script(
                    "teapot",
                    StaticPlugin::responding(ResponseContext::new(418).with_content("short and stout")),
                )
                .with_script("broken", StaticPlugin::failing("runtime failure")),
        ))
        .with_application("petstore", definitions)
        .build()
        .await
}

#[tokio::test]
async fn plugin_failures_leave_response_untouched() {
    for plugin in [
        PluginDefinition::new("rhai", "let x = ;"),
        PluginDefinition::new("static", "no such script"),
        PluginDefinition::new("static", "broken"),
        PluginDefinition::new("groovy", "return response"),
    ] {
        let h = petstore_with(plugin).await;
        let resp = h.get("/oas/petstore/v1/pets/1").expect_status(200).await;
        resp.assert_header("content-type", "application/json");
        assert_eq!(resp.json()["id"], 1);
        assert_eq!(resp.json()["name"], "rex");
    }
}

#[tokio::test]
async fn failing_plugin_keeps_bytes_identical() {
    let plain = AppHarness::builder()
        .with_application(
            "petstore",
            ApiDefinitions::default().with_specification(PETSTORE_SPEC),
        )
        .build()
        .await;
    let expected = plain.get("/oas/petstore/v1/pets/1").expect_status(200).await;

    let h = petstore_with(PluginDefinition::new("rhai", "this is not rhai {")).await;
    let actual = h.get("/oas/petstore/v1/pets/1").expect_status(200).await;
    assert_eq!(actual.bytes(), expected.bytes());
}

#[tokio::test]
async fn static_plugin_replaces_response() {
    let h = petstore_with(PluginDefinition::new("static", "teapot")).await;
    let resp = h.get("/oas/petstore/v1/pets/1").expect_status(418).await;
    assert_eq!(resp.text(), "short and stout");
}

#[tokio::test]
async fn rhai_plugin_customizes_response() {
    let script = r#"
        let id = context.request.apiPath.split("/")[3];
        #{
            status: 200,
            contentType: "application/json",
            headers: #{ "x-plugin": ["rhai"] },
            content: #{ id: parse_int(id), name: context.data.name }
        }
    "#;
    let definitions = ApiDefinitions::default()
        .with_specification(PETSTORE_SPEC)
        .with_data(ApiData::from(
            json!({"name": "fido"}).as_object().cloned().unwrap(),
        ))
        .with_configuration(
            "/v1/pets/{id}",
            ApiConfiguration::default().with_plugin(PluginDefinition::new("rhai", script)),
        );
    let h = AppHarness::builder()
        .with_application("petstore", definitions)
        .build()
        .await;
    let resp = h.get("/oas/petstore/v1/pets/42").expect_status(200).await;
    resp.assert_header("x-plugin", "rhai");
    assert_eq!(resp.json(), json!({"id": 42, "name": "fido"}));
}

#[tokio::test]
async fn rhai_unit_result_keeps_response() {
    let h = petstore_with(PluginDefinition::new("rhai", "let unused = 1;")).await;
    let resp = h.get("/oas/petstore/v1/pets/1").expect_status(200).await;
    assert_eq!(resp.json()["id"], 1);
}

#[tokio::test]
async fn rhai_session_survives_between_requests() {
    let script = r#"
        let hits = session_get("hits");
        let next = if hits == () { 1 } else { hits + 1 };
        session_put("hits", next);
        #{ status: 200, contentType: "text/plain", content: `${next}` }
    "#;
    let h = petstore_with(PluginDefinition::new("rhai", script)).await;
    for expected in ["1", "2", "3"] {
        let resp = h.get("/oas/petstore/v1/pets/1").expect_status(200).await;
        assert_eq!(resp.text(), expected);
    }
    assert_eq!(
        h.module().session_storage().get("hits"),
        Some(json!(3))
    );
}
