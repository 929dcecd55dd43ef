use serde_json::Value;

use super::schema::{Dialect, Schema};

const MAX_REF_DEPTH: usize = 32;
const METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Specification text that could not be turned into a document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecError {
    #[error("failed to parse specification: {0}")]
    Parse(String),

    #[error("unsupported specification version: {0}")]
    UnsupportedVersion(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecVersion {
    V30,
    V31,
}

/// Parsed OpenAPI 3.x document.
///
/// Local `$ref`s are followed lazily on read; the tree itself is kept as
/// parsed.
#[derive(Debug, Clone)]
pub struct OpenApiDocument {
    root: Value,
    version: SpecVersion,
}

impl OpenApiDocument {
    /// Parse JSON (text starting with `{`) or YAML.
    ///
    /// # Errors
    /// Returns [`SpecError::Parse`] for malformed text and
    /// [`SpecError::UnsupportedVersion`] when `openapi` is missing or not 3.x.
    pub fn parse(text: &str) -> Result<Self, SpecError> {
        let root: Value = if text.trim_start().starts_with('{') {
            serde_json::from_str(text).map_err(|e| SpecError::Parse(e.to_string()))?
        } else {
            serde_saphyr::from_str(text).map_err(|e| SpecError::Parse(e.to_string()))?
        };
        Self::from_value(root)
    }

    /// # Errors
    /// Returns [`SpecError::UnsupportedVersion`] when `openapi` is missing or not 3.x.
    pub fn from_value(root: Value) -> Result<Self, SpecError> {
        let version = match root.get("openapi") {
            Some(Value::String(v)) if v.starts_with("3.1") => SpecVersion::V31,
            Some(Value::String(v)) if v.starts_with("3.") => SpecVersion::V30,
            Some(other) => return Err(SpecError::UnsupportedVersion(other.to_string())),
            None => return Err(SpecError::UnsupportedVersion("<missing>".to_owned())),
        };
        if !root.is_object() {
            return Err(SpecError::Parse("document root is not an object".to_owned()));
        }
        Ok(Self { root, version })
    }

    #[must_use]
    pub fn version(&self) -> SpecVersion {
        self.version
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        Dialect::for_version(self.version)
    }

    /// Path component of every `servers[].url`, or `["/"]` without servers.
    #[must_use]
    pub fn declared_servers(&self) -> Vec<String> {
        let servers: Vec<String> = self
            .root
            .get("servers")
            .and_then(Value::as_array)
            .map(|servers| {
                servers
                    .iter()
                    .filter_map(|s| s.get("url").and_then(Value::as_str))
                    .map(url_path)
                    .collect()
            })
            .unwrap_or_default();
        if servers.is_empty() {
            vec!["/".to_owned()]
        } else {
            servers
        }
    }

    /// Path templates in declaration order.
    #[must_use]
    pub fn path_templates(&self) -> Vec<&str> {
        self.root
            .get("paths")
            .and_then(Value::as_object)
            .map(|paths| paths.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn path_item(&self, template: &str) -> Option<&Value> {
        self.root
            .get("paths")
            .and_then(|p| p.get(template))
            .map(|item| self.resolve(item))
    }

    /// Operation for `template` and a method in any case.
    #[must_use]
    pub fn operation(&self, template: &str, method: &str) -> Option<Operation<'_>> {
        let method = method.to_ascii_lowercase();
        if !METHODS.contains(&method.as_str()) {
            return None;
        }
        let path_item = self.path_item(template)?;
        let op = path_item.get(&method)?;
        Some(Operation {
            doc: self,
            path_item,
            op: self.resolve(op),
        })
    }

    /// Follow local `$ref`s. External or dangling refs resolve to an empty
    /// object, which reads as an "any" schema.
    #[must_use]
    pub fn resolve<'a>(&'a self, value: &'a Value) -> &'a Value {
        static EMPTY: std::sync::LazyLock<Value> =
            std::sync::LazyLock::new(|| Value::Object(serde_json::Map::new()));
        let mut current = value;
        for _ in 0..MAX_REF_DEPTH {
            let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
                return current;
            };
            let Some(pointer) = reference.strip_prefix('#') else {
                return &EMPTY;
            };
            match self.root.pointer(pointer) {
                Some(target) => current = target,
                None => return &EMPTY,
            }
        }
        &EMPTY
    }

    #[must_use]
    pub fn schema<'a>(&'a self, value: &'a Value) -> Schema<'a> {
        Schema::new(self, self.resolve(value))
    }

    #[must_use]
    pub fn security_scheme(&self, name: &str) -> Option<&Value> {
        self.root
            .pointer("/components/securitySchemes")
            .and_then(|schemes| schemes.get(name))
            .map(|s| self.resolve(s))
    }

    fn top_level_security(&self) -> Option<&Value> {
        self.root.get("security")
    }
}

/// `http://host:8080/v1` -> `/v1`; relative URLs are returned as is.
fn url_path(url: &str) -> String {
    let without_scheme = match url.find("://") {
        Some(i) => &url[i + 3..],
        None => return url.to_owned(),
    };
    match without_scheme.find('/') {
        Some(i) => without_scheme[i..].to_owned(),
        None => "/".to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterLocation {
    Query,
    Header,
    Path,
    Cookie,
}

#[derive(Debug, Clone)]
pub struct Parameter<'a> {
    pub name: &'a str,
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: Option<Schema<'a>>,
}

#[derive(Debug, Clone)]
pub struct MediaContent<'a> {
    pub media_type: &'a str,
    pub schema: Option<Schema<'a>>,
}

#[derive(Debug, Clone)]
pub struct RequestBody<'a> {
    pub required: bool,
    pub content: Vec<MediaContent<'a>>,
}

#[derive(Debug, Clone)]
pub struct ApiResponse<'a> {
    pub content: Option<Vec<MediaContent<'a>>>,
    pub headers: Vec<&'a str>,
}

/// One security requirement: every named scheme must be satisfied.
pub type SecurityRequirement<'a> = Vec<&'a str>;

#[derive(Debug, Clone, Copy)]
pub struct Operation<'a> {
    doc: &'a OpenApiDocument,
    path_item: &'a Value,
    op: &'a Value,
}

impl<'a> Operation<'a> {
    #[must_use]
    pub fn document(&self) -> &'a OpenApiDocument {
        self.doc
    }

    /// The operation's own parameters, or the path item's when it has none.
    #[must_use]
    pub fn parameters(&self) -> Vec<Parameter<'a>> {
        let list = self
            .op
            .get("parameters")
            .or_else(|| self.path_item.get("parameters"))
            .and_then(Value::as_array);
        let Some(list) = list else {
            return Vec::new();
        };
        list.iter()
            .map(|p| self.doc.resolve(p))
            .filter_map(|p| {
                let name = p.get("name")?.as_str()?;
                let location = match p.get("in")?.as_str()? {
                    "query" => ParameterLocation::Query,
                    "header" => ParameterLocation::Header,
                    "path" => ParameterLocation::Path,
                    "cookie" => ParameterLocation::Cookie,
                    _ => return None,
                };
                let required = p
                    .get("required")
                    .and_then(Value::as_bool)
                    .unwrap_or(location == ParameterLocation::Path);
                Some(Parameter {
                    name,
                    location,
                    required,
                    schema: p.get("schema").map(|s| self.doc.schema(s)),
                })
            })
            .collect()
    }

    #[must_use]
    pub fn request_body(&self) -> Option<RequestBody<'a>> {
        let body = self.doc.resolve(self.op.get("requestBody")?);
        Some(RequestBody {
            required: body
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            content: self.media_contents(body).unwrap_or_default(),
        })
    }

    /// Declared response codes (`"200"`, `"default"`, ...) in declaration order.
    #[must_use]
    pub fn response_codes(&self) -> Vec<&'a str> {
        self.op
            .get("responses")
            .and_then(Value::as_object)
            .map(|r| r.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn response(&self, code: &str) -> Option<ApiResponse<'a>> {
        let response = self.doc.resolve(self.op.get("responses")?.get(code)?);
        Some(ApiResponse {
            content: self.media_contents(response),
            headers: response
                .get("headers")
                .and_then(Value::as_object)
                .map(|h| h.keys().map(String::as_str).collect())
                .unwrap_or_default(),
        })
    }

    /// The operation's `security`, or the document's when absent.
    #[must_use]
    pub fn security(&self) -> Vec<SecurityRequirement<'a>> {
        let Some(requirements) = self
            .op
            .get("security")
            .or_else(|| self.doc.top_level_security())
            .and_then(Value::as_array)
        else {
            return Vec::new();
        };
        requirements
            .iter()
            .filter_map(Value::as_object)
            .map(|req| req.keys().map(String::as_str).collect())
            .collect()
    }

    fn media_contents(&self, holder: &'a Value) -> Option<Vec<MediaContent<'a>>> {
        let content = holder.get("content")?.as_object()?;
        Some(
            content
                .iter()
                .map(|(media_type, media)| MediaContent {
                    media_type: media_type.as_str(),
                    schema: media.get("schema").map(|s| self.doc.schema(s)),
                })
                .collect(),
        )
    }
}
