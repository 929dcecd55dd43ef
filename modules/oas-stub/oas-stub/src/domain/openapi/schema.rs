use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde_json::Value;

use super::document::{OpenApiDocument, SpecVersion};

/// Kind a schema resolves to, independent of how the dialect spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Any,
}

impl SchemaType {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "string" => Self::String,
            "number" => Self::Number,
            "integer" => Self::Integer,
            "boolean" => Self::Boolean,
            "array" => Self::Array,
            "object" => Self::Object,
            _ => return None,
        })
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Any => "any",
        }
    }
}

/// JSON kind of a concrete value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    #[must_use]
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::Integer,
            Value::Number(n) if n.as_f64().is_some_and(|f| f.fract() == 0.0) => Self::Integer,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum AdditionalProperties<'a> {
    Forbidden,
    Permissive,
    Schema(Schema<'a>),
}

// ---------------------------------------------------------------------------
// Schema node
// ---------------------------------------------------------------------------

/// Read-only view of one schema fragment. Child accessors follow `$ref`s.
#[derive(Clone, Copy)]
pub struct Schema<'a> {
    doc: &'a OpenApiDocument,
    node: &'a Value,
}

impl std::fmt::Debug for Schema<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Schema({})", self.node)
    }
}

impl<'a> Schema<'a> {
    pub(crate) fn new(doc: &'a OpenApiDocument, node: &'a Value) -> Self {
        Self { doc, node }
    }

    #[must_use]
    pub fn raw(&self) -> &'a Value {
        self.node
    }

    fn str_field(&self, name: &str) -> Option<&'a str> {
        self.node.get(name).and_then(Value::as_str)
    }

    fn child(&self, value: &'a Value) -> Schema<'a> {
        self.doc.schema(value)
    }

    fn children(&self, name: &str) -> Option<Vec<Schema<'a>>> {
        self.node
            .get(name)
            .and_then(Value::as_array)
            .map(|list| list.iter().map(|s| self.child(s)).collect())
    }

    /// `type` as written: a single name or (3.1) a list of names.
    #[must_use]
    pub fn type_names(&self) -> Vec<&'a str> {
        match self.node.get("type") {
            Some(Value::String(s)) => vec![s.as_str()],
            Some(Value::Array(list)) => list.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Kind guessed from structure when no usable `type` is present.
    #[must_use]
    pub fn guess_type(&self) -> SchemaType {
        if self.node.get("properties").is_some() {
            SchemaType::Object
        } else if self.node.get("items").is_some() {
            SchemaType::Array
        } else {
            SchemaType::Any
        }
    }

    #[must_use]
    pub fn format(&self) -> Option<&'a str> {
        self.str_field("format")
    }

    #[must_use]
    pub fn pattern(&self) -> Option<&'a str> {
        self.str_field("pattern")
    }

    #[must_use]
    pub fn enum_values(&self) -> Option<&'a Vec<Value>> {
        self.node.get("enum").and_then(Value::as_array)
    }

    #[must_use]
    pub fn nullable(&self) -> bool {
        self.node
            .get("nullable")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// `minimum` as an exact decimal.
    #[must_use]
    pub fn minimum(&self) -> Option<BigDecimal> {
        self.decimal_field("minimum")
    }

    #[must_use]
    pub fn maximum(&self) -> Option<BigDecimal> {
        self.decimal_field("maximum")
    }

    fn decimal_field(&self, name: &str) -> Option<BigDecimal> {
        match self.node.get(name)? {
            Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn min_items(&self) -> Option<u64> {
        self.node.get("minItems").and_then(Value::as_u64)
    }

    #[must_use]
    pub fn max_items(&self) -> Option<u64> {
        self.node.get("maxItems").and_then(Value::as_u64)
    }

    #[must_use]
    pub fn required(&self) -> Vec<&'a str> {
        self.node
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn has_properties(&self) -> bool {
        self.node
            .get("properties")
            .and_then(Value::as_object)
            .is_some_and(|p| !p.is_empty())
    }

    #[must_use]
    pub fn properties(&self) -> Vec<(&'a str, Schema<'a>)> {
        self.node
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, s)| (name.as_str(), self.child(s)))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<Schema<'a>> {
        self.node
            .get("properties")
            .and_then(|p| p.get(name))
            .map(|s| self.child(s))
    }

    /// `false` or absent forbids undeclared properties; `true` or `{}` allows them.
    #[must_use]
    pub fn additional_properties(&self) -> AdditionalProperties<'a> {
        match self.node.get("additionalProperties") {
            None | Some(Value::Bool(false)) => AdditionalProperties::Forbidden,
            Some(Value::Object(o)) if o.is_empty() => AdditionalProperties::Permissive,
            Some(v @ Value::Object(_)) => AdditionalProperties::Schema(self.child(v)),
            Some(_) => AdditionalProperties::Permissive,
        }
    }

    #[must_use]
    pub fn items(&self) -> Option<Schema<'a>> {
        self.node.get("items").map(|s| self.child(s))
    }

    #[must_use]
    pub fn any_of(&self) -> Option<Vec<Schema<'a>>> {
        self.children("anyOf")
    }

    #[must_use]
    pub fn one_of(&self) -> Option<Vec<Schema<'a>>> {
        self.children("oneOf")
    }

    #[must_use]
    pub fn all_of(&self) -> Option<Vec<Schema<'a>>> {
        self.children("allOf")
    }

    /// `examples[0]`, else `example`.
    #[must_use]
    pub fn example(&self) -> Option<&'a Value> {
        self.node
            .get("examples")
            .and_then(Value::as_array)
            .and_then(|e| e.first())
            .or_else(|| self.node.get("example"))
    }
}

// ---------------------------------------------------------------------------
// Dialects
// ---------------------------------------------------------------------------

/// How one OpenAPI version discovers a schema's kind.
pub trait SchemaDialect: Send + Sync {
    /// Kind used to synthesize and to coerce parameters.
    fn effective_type(&self, schema: &Schema<'_>) -> SchemaType;

    /// Whether a value of `kind` may be checked against `schema`.
    fn admits(&self, schema: &Schema<'_>, kind: ValueKind) -> bool;
}

fn kind_matches(kind: ValueKind, ty: SchemaType) -> bool {
    matches!(
        (kind, ty),
        (_, SchemaType::Any)
            | (ValueKind::Integer, SchemaType::Integer | SchemaType::Number)
            | (ValueKind::Number, SchemaType::Number)
            | (ValueKind::Boolean, SchemaType::Boolean)
            | (ValueKind::String, SchemaType::String)
            | (ValueKind::Array, SchemaType::Array)
            | (ValueKind::Object, SchemaType::Object)
    )
}

/// OpenAPI 3.0: one `type` string, `nullable` for null.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenApi30Dialect;

impl SchemaDialect for OpenApi30Dialect {
    fn effective_type(&self, schema: &Schema<'_>) -> SchemaType {
        schema
            .type_names()
            .first()
            .and_then(|n| SchemaType::from_name(n))
            .unwrap_or_else(|| schema.guess_type())
    }

    fn admits(&self, schema: &Schema<'_>, kind: ValueKind) -> bool {
        let ty = self.effective_type(schema);
        if kind == ValueKind::Null {
            return ty == SchemaType::Any || schema.nullable();
        }
        kind_matches(kind, ty)
    }
}

/// OpenAPI 3.1: `type` may list several names, `"null"` among them.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenApi31Dialect;

impl SchemaDialect for OpenApi31Dialect {
    fn effective_type(&self, schema: &Schema<'_>) -> SchemaType {
        schema
            .type_names()
            .iter()
            .find(|n| **n != "null")
            .and_then(|n| SchemaType::from_name(n))
            .unwrap_or_else(|| schema.guess_type())
    }

    fn admits(&self, schema: &Schema<'_>, kind: ValueKind) -> bool {
        let names = schema.type_names();
        if names.is_empty() {
            let guessed = schema.guess_type();
            return guessed == SchemaType::Any || kind_matches(kind, guessed);
        }
        if kind == ValueKind::Null {
            return names.contains(&"null");
        }
        names
            .iter()
            .filter_map(|n| SchemaType::from_name(n))
            .any(|ty| kind_matches(kind, ty))
    }
}

static OPENAPI_30: OpenApi30Dialect = OpenApi30Dialect;
static OPENAPI_31: OpenApi31Dialect = OpenApi31Dialect;

/// Dialect handle for a document version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect(SpecVersion);

impl Dialect {
    #[must_use]
    pub fn for_version(version: SpecVersion) -> Self {
        Self(version)
    }

    #[must_use]
    pub fn adapter(self) -> &'static dyn SchemaDialect {
        match self.0 {
            SpecVersion::V30 => &OPENAPI_30,
            SpecVersion::V31 => &OPENAPI_31,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(version: &str, schema: &Value) -> OpenApiDocument {
        OpenApiDocument::from_value(json!({
            "openapi": version,
            "components": {"schemas": {"S": schema}}
        }))
        .unwrap()
    }

    fn with_schema<T>(version: &str, schema: Value, f: impl FnOnce(&Schema<'_>, Dialect) -> T) -> T {
        let d = doc(version, &schema);
        let node = json!({"$ref": "#/components/schemas/S"});
        let s = d.schema(&node);
        f(&s, d.dialect())
    }

    #[test]
    fn v30_guesses_type_from_structure() {
        with_schema("3.0.3", json!({"properties": {"a": {}}}), |s, d| {
            assert_eq!(d.adapter().effective_type(s), SchemaType::Object);
        });
        with_schema("3.0.3", json!({"items": {}}), |s, d| {
            assert_eq!(d.adapter().effective_type(s), SchemaType::Array);
        });
        with_schema("3.0.3", json!({}), |s, d| {
            assert_eq!(d.adapter().effective_type(s), SchemaType::Any);
        });
    }

    #[test]
    fn v30_null_needs_nullable() {
        with_schema("3.0.3", json!({"type": "string"}), |s, d| {
            assert!(!d.adapter().admits(s, ValueKind::Null));
        });
        with_schema("3.0.3", json!({"type": "string", "nullable": true}), |s, d| {
            assert!(d.adapter().admits(s, ValueKind::Null));
            assert!(d.adapter().admits(s, ValueKind::String));
        });
    }

    #[test]
    fn v31_type_lists() {
        with_schema("3.1.0", json!({"type": ["null", "integer"]}), |s, d| {
            let adapter = d.adapter();
            assert_eq!(adapter.effective_type(s), SchemaType::Integer);
            assert!(adapter.admits(s, ValueKind::Null));
            assert!(adapter.admits(s, ValueKind::Integer));
            assert!(!adapter.admits(s, ValueKind::Number));
            assert!(!adapter.admits(s, ValueKind::String));
        });
    }

    #[test]
    fn integral_floats_count_as_integers() {
        assert_eq!(ValueKind::of(&json!(3.0)), ValueKind::Integer);
        assert_eq!(ValueKind::of(&json!(3.5)), ValueKind::Number);
    }

    #[test]
    fn additional_properties_forms() {
        with_schema("3.0.3", json!({"type": "object"}), |s, _| {
            assert!(matches!(s.additional_properties(), AdditionalProperties::Forbidden));
        });
        with_schema("3.0.3", json!({"additionalProperties": {}}), |s, _| {
            assert!(matches!(s.additional_properties(), AdditionalProperties::Permissive));
        });
        with_schema("3.0.3", json!({"additionalProperties": {"type": "string"}}), |s, _| {
            assert!(matches!(s.additional_properties(), AdditionalProperties::Schema(_)));
        });
    }

    #[test]
    fn bounds_are_exact_decimals() {
        with_schema("3.0.3", json!({"minimum": 0.1, "maximum": 10}), |s, _| {
            assert_eq!(s.minimum().unwrap(), BigDecimal::from_str("0.1").unwrap());
            assert_eq!(s.maximum().unwrap(), BigDecimal::from(10));
        });
    }
}
