use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::HeaderMap;
use oas_stub_sdk::body::{BodyStream, BoxError};
use oas_stub_sdk::{
    ApiDefinitions, ApiHeaders, ApiMetric, ApiRecord, ApiRequestRecord, ApiResponseRecord, Body,
    RequestContext, ResponseContext,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::documents::DocumentCache;
use super::request::{RequestParts, build_request_context};
use crate::domain::content;
use crate::domain::delay::remaining_delay;
use crate::domain::error::DomainError;
use crate::domain::failure::{FailureOutcome, inject_failure, resets_connection};
use crate::domain::merge::EffectiveConfig;
use crate::domain::openapi::{OpenApiDocument, Operation};
use crate::domain::path::{
    adjust_base_path, extract_api_name_and_path, extract_path_variables, find_matching_path,
};
use crate::domain::populate::SchemaPopulator;
use crate::domain::repo::{ApiDefinitionsRepository, ApiObserver, ApiRecorder};
use crate::domain::services::{StubOutcome, StubRequest, StubResponse, StubService};
use crate::domain::validation::{
    FormatValidators, RequestValidationInput, RequestValidators, ValidationResult,
};
use crate::infra::plugin::PluginPipeline;

/// One request's identity, shared by every stage.
struct Exchange<'a> {
    app: &'a str,
    api_path: &'a str,
    method: &'a str,
    headers: &'a HeaderMap,
    query: Option<&'a str>,
    started: Instant,
    requested_at: DateTime<Utc>,
}

/// Stub pipeline: resolve, validate, synthesize, customize, inject failures,
/// delay and emit.
pub struct StubServiceImpl {
    prefix: String,
    repository: Arc<dyn ApiDefinitionsRepository>,
    documents: Arc<DocumentCache>,
    validators: RequestValidators,
    plugins: PluginPipeline,
    observer: Arc<dyn ApiObserver>,
    recorder: Arc<dyn ApiRecorder>,
}

impl StubServiceImpl {
    #[must_use]
    pub fn new(
        prefix: impl Into<String>,
        repository: Arc<dyn ApiDefinitionsRepository>,
        plugins: PluginPipeline,
        observer: Arc<dyn ApiObserver>,
        recorder: Arc<dyn ApiRecorder>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            repository,
            documents: Arc::new(DocumentCache::new()),
            validators: RequestValidators::standard(Arc::new(FormatValidators::default())),
            plugins,
            observer,
            recorder,
        }
    }

    /// Share the parsed-document cache with the registration service.
    #[must_use]
    pub fn with_documents(mut self, documents: Arc<DocumentCache>) -> Self {
        self.documents = documents;
        self
    }

    #[must_use]
    pub fn with_validators(mut self, validators: RequestValidators) -> Self {
        self.validators = validators;
        self
    }

    async fn execute(
        &self,
        exchange: &Exchange<'_>,
        definitions: &ApiDefinitions,
        config: &EffectiveConfig,
        body: Body,
        cancel: &CancellationToken,
    ) -> Result<StubOutcome, DomainError> {
        let instance = exchange.api_path;
        let specification = definitions.specification.as_deref().ok_or_else(|| {
            DomainError::not_found("application has no specification", instance)
        })?;
        let document = self
            .documents
            .get(exchange.app, specification)
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let (adjusted, template, operation) = resolve_operation(&document, exchange)?;

        if resets_connection(config.failure()) {
            info!(app = %exchange.app, path = %instance, "connection reset injected");
            return Ok(StubOutcome::Aborted);
        }

        ensure_live(cancel, instance)?;
        let content = body.into_bytes().await.ok().filter(|b| !b.is_empty());
        let request = build_request_context(
            RequestParts {
                application_name: exchange.app,
                api_path: exchange.api_path,
                method: exchange.method,
                headers: exchange.headers,
                query: exchange.query,
            },
            content,
            config.headers.as_ref(),
        );

        ensure_live(cancel, instance)?;
        let path_variables = extract_path_variables(&adjusted, template);
        let validation = self.validators.validate(
            &RequestValidationInput {
                request: &request,
                operation,
                path_variables: &path_variables,
            },
            config.should_validate(),
        );
        if !validation.is_valid() {
            info!(
                app = %exchange.app,
                path = %instance,
                details = ?validation.details(),
                "request failed validation"
            );
        }

        ensure_live(cancel, instance)?;
        let mut response = self.synthesize(&operation, &validation, &request);
        merge_response_headers(&mut response, config.headers.as_ref());

        ensure_live(cancel, instance)?;
        let response = self
            .plugins
            .apply(config.plugin.as_ref(), &request, response, config.data.as_ref())
            .await;

        ensure_live(cancel, instance)?;
        let response = match inject_failure(config.failure(), response) {
            FailureOutcome::Reset => return Ok(StubOutcome::Aborted),
            FailureOutcome::ShortCircuit(response) => response,
            FailureOutcome::Proceed(response) => {
                delay(config, exchange.started, cancel, instance).await?;
                response
            }
        };

        if config.should_record() {
            self.recorder.record(exchange.app, record_of(&request, &response));
        }
        let latency = config.latency().map(|l| l.interval());
        Ok(StubOutcome::Response(emit(response, latency)))
    }

    fn synthesize(
        &self,
        operation: &Operation<'_>,
        validation: &ValidationResult,
        request: &RequestContext,
    ) -> ResponseContext {
        let populator = SchemaPopulator::new(
            operation.document().dialect(),
            self.validators.formats().patterns(),
        );
        let accept = request.header("accept").unwrap_or(&[]);
        content::synthesize(operation, validation, accept, &populator, &mut rand::rng())
    }

    fn monitor(&self, exchange: &Exchange<'_>, result: &Result<StubOutcome, DomainError>) {
        let (http_status, error) = match result {
            Ok(StubOutcome::Response(response)) => (response.status, None),
            Ok(StubOutcome::Aborted) => (0, Some("connection reset".to_owned())),
            Ok(StubOutcome::NotFound) | Err(DomainError::Cancelled { .. }) => return,
            Err(e) => (e.status_code().as_u16(), Some(e.to_string())),
        };
        self.observer.record(
            exchange.app,
            ApiMetric {
                request_timestamp: exchange.requested_at,
                execution_time: exchange.started.elapsed(),
                api_path: exchange.api_path.to_owned(),
                http_method: exchange.method.to_owned(),
                http_status,
                error,
            },
        );
    }
}

#[async_trait::async_trait]
impl StubService for StubServiceImpl {
    async fn handle(
        &self,
        request: StubRequest,
        cancel: CancellationToken,
    ) -> Result<StubOutcome, DomainError> {
        let started = Instant::now();
        let requested_at = Utc::now();
        let StubRequest {
            method,
            uri,
            headers,
            body,
        } = request;

        let Some((app, api_path)) = extract_api_name_and_path(&self.prefix, uri.path()) else {
            debug!(path = %uri.path(), "request path names no application");
            return Ok(StubOutcome::NotFound);
        };
        let Some(definitions) = self.repository.get(app).await? else {
            debug!(app = %app, "application is not registered");
            return Ok(StubOutcome::NotFound);
        };

        let exchange = Exchange {
            app,
            api_path,
            method: method.as_str(),
            headers: &headers,
            query: uri.query(),
            started,
            requested_at,
        };
        let config = EffectiveConfig::resolve(&definitions, api_path, method.as_str());
        let result = self
            .execute(&exchange, &definitions, &config, body, &cancel)
            .await;
        if config.should_monitor() {
            self.monitor(&exchange, &result);
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Stage helpers
// ---------------------------------------------------------------------------

/// Base-path adjusted api path, matched template and operation.
fn resolve_operation<'d>(
    document: &'d OpenApiDocument,
    exchange: &Exchange<'_>,
) -> Result<(String, &'d str, Operation<'d>), DomainError> {
    let instance = exchange.api_path;
    let adjusted = adjust_base_path(instance, &document.declared_servers()).ok_or_else(|| {
        DomainError::not_found(format!("no server base path matches {instance}"), instance)
    })?;
    let template = find_matching_path(&adjusted, document.path_templates()).ok_or_else(|| {
        DomainError::not_found(format!("no operation path matches {adjusted}"), instance)
    })?;
    let operation = document
        .operation(template, &exchange.method.to_ascii_lowercase())
        .ok_or_else(|| DomainError::method_not_allowed(exchange.method, instance))?;
    debug!(app = %exchange.app, template, method = %exchange.method, "operation resolved");
    Ok((adjusted, template, operation))
}

fn ensure_live(cancel: &CancellationToken, instance: &str) -> Result<(), DomainError> {
    if cancel.is_cancelled() {
        debug!(path = %instance, "request cancelled");
        return Err(DomainError::cancelled(instance));
    }
    Ok(())
}

/// Configured headers go under the response's own; own values win.
fn merge_response_headers(response: &mut ResponseContext, configured: Option<&ApiHeaders>) {
    let Some(configured) = configured else {
        return;
    };
    for (name, values) in &configured.response {
        response
            .headers
            .entry(name.clone())
            .or_insert_with(|| values.clone());
    }
}

async fn delay(
    config: &EffectiveConfig,
    started: Instant,
    cancel: &CancellationToken,
    instance: &str,
) -> Result<(), DomainError> {
    let Some(policy) = config.delay else {
        return Ok(());
    };
    let remaining = remaining_delay(&policy, started.elapsed());
    if remaining.is_zero() {
        return Ok(());
    }
    debug!(path = %instance, remaining_ms = remaining.as_millis(), "delaying response");
    tokio::select! {
        () = cancel.cancelled() => Err(DomainError::cancelled(instance)),
        () = tokio::time::sleep(remaining) => Ok(()),
    }
}

fn record_of(request: &RequestContext, response: &ResponseContext) -> ApiRecord {
    ApiRecord {
        method: request.method.clone(),
        path: request.api_path.clone(),
        request: ApiRequestRecord {
            content_type: request.content_type.clone(),
            headers: request.headers.clone(),
            cookies: request.cookies.clone(),
            body: request.content.clone(),
        },
        response: ApiResponseRecord {
            status: response.status,
            content_type: response.content_type.clone(),
            headers: response.headers.clone(),
            body: response.content.clone(),
        },
    }
}

fn emit(response: ResponseContext, latency: Option<Duration>) -> StubResponse {
    let ResponseContext {
        status,
        content,
        content_type,
        headers,
    } = response;
    let body = match (content, latency) {
        (Some(content), Some(interval)) if !content.is_empty() => {
            Body::Stream(paced(content, interval))
        }
        (content, _) => Body::from(content),
    };
    StubResponse {
        status,
        content_type,
        headers,
        body,
    }
}

/// One byte per chunk with `interval` between chunks.
fn paced(content: Bytes, interval: Duration) -> BodyStream {
    Box::pin(async_stream::stream! {
        for i in 0..content.len() {
            if i > 0 {
                tokio::time::sleep(interval).await;
            }
            yield Ok::<Bytes, BoxError>(content.slice(i..=i));
        }
    })
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    #[test]
    fn configured_response_headers_do_not_override() {
        let mut response = ResponseContext::new(200).with_header("x-own", "mine");
        let mut configured = ApiHeaders::default();
        configured
            .response
            .insert("x-own".to_owned(), vec!["configured".to_owned()]);
        configured
            .response
            .insert("x-extra".to_owned(), vec!["added".to_owned()]);
        merge_response_headers(&mut response, Some(&configured));
        assert_eq!(response.headers["x-own"], vec!["mine".to_owned()]);
        assert_eq!(response.headers["x-extra"], vec!["added".to_owned()]);
    }

    #[tokio::test(start_paused = true)]
    async fn latency_paces_each_byte() {
        let response = ResponseContext::new(200).with_content("abc");
        let emitted = emit(response, Some(Duration::from_millis(100)));
        let Body::Stream(mut stream) = emitted.body else {
            panic!("expected a streaming body");
        };
        let start = Instant::now();
        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next().await {
            chunks.push(chunk.unwrap());
        }
        assert_eq!(chunks, vec![Bytes::from("a"), Bytes::from("b"), Bytes::from("c")]);
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[test]
    fn no_latency_buffers_body() {
        let emitted = emit(ResponseContext::new(204), Some(Duration::from_millis(5)));
        assert!(emitted.body.is_empty());
        let emitted = emit(ResponseContext::new(200).with_content("x"), None);
        assert!(matches!(emitted.body, Body::Bytes(_)));
    }
}
