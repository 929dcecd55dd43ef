//! Translation of the transport request into a [`RequestContext`].

use std::collections::BTreeMap;

use bytes::Bytes;
use http::HeaderMap;
use oas_stub_sdk::{ApiHeaders, RequestContext};

/// Parts of the inbound request that feed the context.
#[derive(Debug, Clone, Copy)]
pub struct RequestParts<'a> {
    pub application_name: &'a str,
    pub api_path: &'a str,
    pub method: &'a str,
    pub headers: &'a HeaderMap,
    pub query: Option<&'a str>,
}

#[must_use]
pub fn build_request_context(
    parts: RequestParts<'_>,
    content: Option<Bytes>,
    configured: Option<&ApiHeaders>,
) -> RequestContext {
    let headers = effective_headers(parts.headers, configured);
    let content_type = headers
        .get("content-type")
        .and_then(|values| values.first())
        .cloned();
    let cookies = parse_cookies(headers.get("cookie").map_or(&[][..], Vec::as_slice));
    RequestContext {
        application_name: parts.application_name.to_owned(),
        api_path: parts.api_path.to_owned(),
        method: parts.method.to_owned(),
        content,
        content_type,
        headers,
        cookies,
        query_parameters: parts.query.map(parse_query).unwrap_or_default(),
    }
}

/// Configured request headers overlaid by the actual ones. Names are
/// lower-cased; an actual header replaces every configured value of that name.
fn effective_headers(
    actual: &HeaderMap,
    configured: Option<&ApiHeaders>,
) -> BTreeMap<String, Vec<String>> {
    let mut headers: BTreeMap<String, Vec<String>> = configured
        .map(|c| {
            c.request
                .iter()
                .map(|(name, values)| (name.to_ascii_lowercase(), values.clone()))
                .collect()
        })
        .unwrap_or_default();
    let mut from_request: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in actual {
        if let Ok(value) = value.to_str() {
            from_request
                .entry(name.as_str().to_owned())
                .or_default()
                .push(value.to_owned());
        }
    }
    headers.extend(from_request);
    headers
}

/// `a=1&b&a=2` gives `a: [1, 2]` and `b: [None]`.
#[must_use]
pub fn parse_query(query: &str) -> BTreeMap<String, Vec<Option<String>>> {
    let mut params: BTreeMap<String, Vec<Option<String>>> = BTreeMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let Some((key, value)) = form_urlencoded::parse(pair.as_bytes()).next() else {
            continue;
        };
        let value = pair.contains('=').then(|| value.into_owned());
        params.entry(key.into_owned()).or_default().push(value);
    }
    params
}

#[must_use]
pub fn parse_cookies(headers: &[String]) -> BTreeMap<String, String> {
    headers
        .iter()
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_owned(), value.trim().to_owned()))
        })
        .collect()
}
