use bytes::Bytes;
use oas_stub_sdk::ResponseContext;
use rand::Rng;
use serde_json::Value;

use crate::domain::media;
use crate::domain::openapi::{MediaContent, Operation};
use crate::domain::populate::SchemaPopulator;
use crate::domain::validation::{PROBLEM_JSON, ValidationResult, ValidationResultType};

const DEFAULT_RESPONSE: &str = "default";
const FALLBACK_STATUS: u16 = 400;

/// Which declared response answers a request.
#[derive(Debug)]
pub enum ContentDecision<'a> {
    /// A declared response; its `content` may be absent.
    Found {
        status: u16,
        content: Option<Vec<MediaContent<'a>>>,
    },
    /// Nothing declared fits; the response is fixed.
    NotFound(ResponseContext),
}

fn base_status(result: &ValidationResult) -> u16 {
    match result.result_type() {
        ValidationResultType::Success => 200,
        ValidationResultType::ValidationError => 400,
        ValidationResultType::Security => 401,
    }
}

/// Smallest numeric code at or above the base status, then `default` with the
/// base status, then a 400 problem response.
#[must_use]
pub fn decide_content<'a>(operation: &Operation<'a>, result: &ValidationResult) -> ContentDecision<'a> {
    let base = base_status(result);
    let chosen = operation
        .response_codes()
        .into_iter()
        .filter_map(|code| code.parse::<u16>().ok().map(|status| (status, code)))
        .filter(|(status, _)| *status >= base)
        .min_by_key(|(status, _)| *status);

    let found = match chosen {
        Some((status, code)) => operation.response(code).map(|r| (status, r)),
        None => operation.response(DEFAULT_RESPONSE).map(|r| (base, r)),
    };
    match found {
        Some((status, response)) => ContentDecision::Found {
            status,
            content: response.content,
        },
        None => {
            let mut fallback = ResponseContext::new(FALLBACK_STATUS);
            if let Some(body) = result.to_problem_details(FALLBACK_STATUS) {
                fallback = fallback.with_content(body).with_content_type(PROBLEM_JSON);
            }
            ContentDecision::NotFound(fallback)
        }
    }
}

/// First acceptable declared type, else `application/json`, else the first
/// declared one.
#[must_use]
pub fn select_media<'c, 'a>(
    content: &'c [MediaContent<'a>],
    accept: &[String],
) -> Option<&'c MediaContent<'a>> {
    let accepted = accept
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .find_map(|wanted| {
            content
                .iter()
                .find(|m| media::same_essence(m.media_type, wanted))
        });
    accepted
        .or_else(|| content.iter().find(|m| m.media_type == media::APPLICATION_JSON))
        .or_else(|| content.first())
}

/// JSON media get JSON text; other media get strings raw.
#[must_use]
pub fn render(value: &Value, media_type: &str) -> Bytes {
    match value {
        Value::String(text) if !media::is_json(media_type) => Bytes::from(text.clone()),
        other => Bytes::from(other.to_string()),
    }
}

/// Build the pre-plugin response for a validated request.
pub fn synthesize<R: Rng + ?Sized>(
    operation: &Operation<'_>,
    result: &ValidationResult,
    accept: &[String],
    populator: &SchemaPopulator<'_>,
    rng: &mut R,
) -> ResponseContext {
    let (status, content) = match decide_content(operation, result) {
        ContentDecision::NotFound(response) => return response,
        ContentDecision::Found { status, content } => (status, content),
    };
    let response = ResponseContext::new(status);
    let Some(content) = content else {
        return response;
    };
    let Some(chosen) = select_media(&content, accept) else {
        return response;
    };
    let response = response.with_content_type(chosen.media_type);
    match &chosen.schema {
        Some(schema) => {
            let value = populator.populate(schema, rng);
            response.with_content(render(&value, chosen.media_type))
        }
        None => response,
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    use super::*;
    use crate::domain::openapi::OpenApiDocument;
    use crate::domain::validation::PatternCache;

    fn document(responses: &Value) -> OpenApiDocument {
        OpenApiDocument::from_value(json!({
            "openapi": "3.0.3",
            "paths": {"/x": {"get": {"responses": responses}}}
        }))
        .unwrap()
    }

    fn status_of(decision: &ContentDecision<'_>) -> u16 {
        match decision {
            ContentDecision::Found { status, .. } => *status,
            ContentDecision::NotFound(r) => r.status,
        }
    }

    #[test]
    fn smallest_code_at_or_above_base() {
        let doc = document(&json!({
            "201": {"description": "created"},
            "404": {"description": "missing"},
            "400": {"description": "bad"},
            "default": {"description": "other"}
        }));
        let op = doc.operation("/x", "get").unwrap();
        assert_eq!(status_of(&decide_content(&op, &ValidationResult::success())), 201);
        let invalid = ValidationResult::failed("nope", None);
        assert_eq!(status_of(&decide_content(&op, &invalid)), 400);
        let security = ValidationResult::security_failed("who", None);
        assert_eq!(status_of(&decide_content(&op, &security)), 404);
    }

    #[test]
    fn default_takes_base_status() {
        let doc = document(&json!({"200": {"description": "ok"}, "default": {"description": "d"}}));
        let op = doc.operation("/x", "get").unwrap();
        let security = ValidationResult::security_failed("who", None);
        assert_eq!(status_of(&decide_content(&op, &security)), 401);
    }

    #[test]
    fn nothing_declared_is_problem_response() {
        let doc = document(&json!({"200": {"description": "ok"}}));
        let op = doc.operation("/x", "get").unwrap();
        let invalid = ValidationResult::failed("Missing required field", Some("$.id"));
        let ContentDecision::NotFound(response) = decide_content(&op, &invalid) else {
            panic!("expected a fixed response");
        };
        assert_eq!(response.status, 400);
        assert_eq!(response.content_type.as_deref(), Some(PROBLEM_JSON));
        let body: Value = serde_json::from_slice(response.content.as_ref().unwrap()).unwrap();
        assert_eq!(body["errors"][0]["name"], json!("$.id"));
    }

    #[test]
    fn media_selection_order() {
        let content = vec![
            MediaContent { media_type: "text/plain", schema: None },
            MediaContent { media_type: "application/json", schema: None },
            MediaContent { media_type: "application/xml", schema: None },
        ];
        let pick = |accept: &[&str]| {
            let accept: Vec<String> = accept.iter().map(|s| (*s).to_owned()).collect();
            select_media(&content, &accept).unwrap().media_type
        };
        assert_eq!(pick(&["application/xml;q=0.9, text/html"]), "application/xml");
        assert_eq!(pick(&["image/png"]), "application/json");
        assert_eq!(pick(&[]), "application/json");
        assert_eq!(select_media(&content[..1], &[]).unwrap().media_type, "text/plain");
    }

    #[test]
    fn renders_strings_raw_for_text_media() {
        assert_eq!(render(&json!("hi"), "text/plain"), Bytes::from_static(b"hi"));
        assert_eq!(render(&json!("hi"), "application/json"), Bytes::from_static(b"\"hi\""));
        assert_eq!(render(&json!({"a": 1}), "text/plain"), Bytes::from_static(b"{\"a\":1}"));
    }

    #[test]
    fn synthesizes_declared_schema() {
        let doc = document(&json!({
            "200": {
                "description": "ok",
                "content": {"application/json": {"schema": {"type": "object", "properties": {"id": {"type": "integer", "minimum": 1}}}}}
            }
        }));
        let op = doc.operation("/x", "get").unwrap();
        let patterns = PatternCache::new();
        let populator = SchemaPopulator::new(doc.dialect(), &patterns);
        let response = synthesize(
            &op,
            &ValidationResult::success(),
            &[],
            &populator,
            &mut StdRng::seed_from_u64(3),
        );
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type.as_deref(), Some("application/json"));
        assert_eq!(response.content_as_str(), Some("{\"id\":1}"));
    }

    #[test]
    fn response_without_content_has_no_body() {
        let doc = document(&json!({"204": {"description": "gone"}}));
        let op = doc.operation("/x", "get").unwrap();
        let patterns = PatternCache::new();
        let populator = SchemaPopulator::new(doc.dialect(), &patterns);
        let response = synthesize(
            &op,
            &ValidationResult::success(),
            &[],
            &populator,
            &mut StdRng::seed_from_u64(3),
        );
        assert_eq!(response.status, 204);
        assert!(response.content.is_none());
    }
}
