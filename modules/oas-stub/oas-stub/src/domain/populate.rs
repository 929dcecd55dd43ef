use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{SecondsFormat, Utc};
use rand::Rng;
use serde_json::{Map, Value};

use crate::domain::openapi::{Dialect, Schema, SchemaDialect, SchemaType};
use crate::domain::regexp;
use crate::domain::validation::PatternCache;

/// Recursive schemas stop producing values below this depth.
const MAX_DEPTH: usize = 16;
const DEFAULT_ARRAY_CAP: u64 = 10;
const EXAMPLE_EMAIL: &str = "example@example.com";

/// Synthesizes a plausible value for a schema.
///
/// Examples win over synthesis. `anyOf`/`oneOf` take their first branch and
/// `allOf` is not merged: it yields `null`.
pub struct SchemaPopulator<'p> {
    dialect: &'static dyn SchemaDialect,
    patterns: &'p PatternCache,
}

impl<'p> SchemaPopulator<'p> {
    #[must_use]
    pub fn new(dialect: Dialect, patterns: &'p PatternCache) -> Self {
        Self {
            dialect: dialect.adapter(),
            patterns,
        }
    }

    pub fn populate<R: Rng + ?Sized>(&self, schema: &Schema<'_>, rng: &mut R) -> Value {
        self.populate_at(schema, rng, 0)
    }

    fn populate_at<R: Rng + ?Sized>(&self, schema: &Schema<'_>, rng: &mut R, depth: usize) -> Value {
        if depth > MAX_DEPTH {
            return Value::Null;
        }
        if let Some(branches) = schema.any_of().or_else(|| schema.one_of()) {
            return branches
                .first()
                .map_or(Value::Null, |first| self.populate_at(first, rng, depth + 1));
        }
        if schema.all_of().is_some() {
            return Value::Null;
        }
        let ty = self.dialect.effective_type(schema);
        if let Some(example) = schema.example().and_then(|e| example_value(e, ty)) {
            return example;
        }
        match ty {
            SchemaType::String => self.populate_string(schema, rng),
            SchemaType::Number | SchemaType::Integer => number_from_bounds(schema, ty),
            SchemaType::Boolean => Value::Bool(true),
            SchemaType::Array => {
                let count = schema
                    .min_items()
                    .or_else(|| schema.max_items().map(|max| max.min(DEFAULT_ARRAY_CAP)))
                    .unwrap_or(1);
                let Some(items) = schema.items() else {
                    return Value::Array(Vec::new());
                };
                Value::Array(
                    (0..count)
                        .map(|_| self.populate_at(&items, rng, depth + 1))
                        .collect(),
                )
            }
            SchemaType::Object => Value::Object(
                schema
                    .properties()
                    .into_iter()
                    .map(|(name, property)| {
                        (name.to_owned(), self.populate_at(&property, rng, depth + 1))
                    })
                    .collect::<Map<String, Value>>(),
            ),
            SchemaType::Any => Value::Object(Map::new()),
        }
    }

    fn populate_string<R: Rng + ?Sized>(&self, schema: &Schema<'_>, rng: &mut R) -> Value {
        let text = match schema.format() {
            Some("uuid") => uuid::Uuid::new_v4().to_string(),
            Some("date-time") => Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            Some("date") => Utc::now().date_naive().format("%Y-%m-%d").to_string(),
            Some("email") => EXAMPLE_EMAIL.to_owned(),
            _ => match schema.pattern().and_then(|p| self.patterns.get(p)) {
                Some(node) => regexp::generate(&node, rng),
                None => first_enum_or_default(schema),
            },
        };
        Value::String(text)
    }
}

fn first_enum_or_default(schema: &Schema<'_>) -> String {
    match schema.enum_values().and_then(|values| values.first()) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "string".to_owned(),
    }
}

/// Interpret an example for the schema kind. `None` means synthesize instead.
fn example_value(example: &Value, ty: SchemaType) -> Option<Value> {
    let text = match example {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    match ty {
        SchemaType::Object | SchemaType::Array => match example {
            Value::String(s) => serde_json::from_str::<Value>(s)
                .ok()
                .filter(|v| v.is_object() || v.is_array()),
            other => Some(other.clone()),
        },
        SchemaType::Integer => serde_json::from_str::<Value>(text.trim())
            .ok()
            .filter(|v| v.is_i64() || v.is_u64()),
        SchemaType::Number => serde_json::from_str::<Value>(text.trim())
            .ok()
            .filter(Value::is_number),
        SchemaType::Boolean => match text.trim() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        SchemaType::String => Some(Value::String(text)),
        SchemaType::Any => Some(example.clone()),
    }
}

/// `minimum` when present, else a value derived from `maximum`, else 0.
fn number_from_bounds(schema: &Schema<'_>, ty: SchemaType) -> Value {
    let integer = ty == SchemaType::Integer;
    if let Some(min) = schema.minimum() {
        return decimal_value(&min, integer, Rounding::Up);
    }
    let Some(max) = schema.maximum() else {
        return Value::from(0);
    };
    let zero = BigDecimal::from(0);
    let one = BigDecimal::from(1);
    if max == zero {
        Value::from(-1)
    } else if max < one {
        decimal_value(&max, integer, Rounding::Down)
    } else {
        Value::from(1)
    }
}

#[derive(Clone, Copy)]
enum Rounding {
    Up,
    Down,
}

fn decimal_value(value: &BigDecimal, integer: bool, rounding: Rounding) -> Value {
    if integer {
        let Some(truncated) = value.to_i64() else {
            return Value::Null;
        };
        let back = BigDecimal::from(truncated);
        let adjusted = match rounding {
            Rounding::Up if back < *value => truncated.saturating_add(1),
            Rounding::Down if back > *value => truncated.saturating_sub(1),
            _ => truncated,
        };
        return Value::from(adjusted);
    }
    serde_json::from_str::<Value>(&value.normalized().to_string())
        .ok()
        .filter(Value::is_number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    use super::*;
    use crate::domain::openapi::OpenApiDocument;
    use crate::domain::validation::{FormatValidators, ROOT_PROPERTY, SchemaValidator};

    fn populate(version: &str, schema: &Value) -> Value {
        let doc = OpenApiDocument::from_value(json!({
            "openapi": version,
            "components": {"schemas": {"S": schema}}
        }))
        .unwrap();
        let root = json!({"$ref": "#/components/schemas/S"});
        let patterns = PatternCache::new();
        SchemaPopulator::new(doc.dialect(), &patterns)
            .populate(&doc.schema(&root), &mut StdRng::seed_from_u64(7))
    }

    #[test]
    fn numbers_follow_bounds() {
        assert_eq!(populate("3.0.3", &json!({"type": "integer", "minimum": 1})), json!(1));
        assert_eq!(populate("3.0.3", &json!({"type": "integer", "minimum": 1.5})), json!(2));
        assert_eq!(populate("3.0.3", &json!({"type": "integer", "maximum": 0})), json!(-1));
        assert_eq!(populate("3.0.3", &json!({"type": "integer", "maximum": -5})), json!(-5));
        assert_eq!(populate("3.0.3", &json!({"type": "number", "maximum": 0.5})), json!(0.5));
        assert_eq!(populate("3.0.3", &json!({"type": "integer", "maximum": 0.5})), json!(0));
        assert_eq!(populate("3.0.3", &json!({"type": "number", "maximum": 100})), json!(1));
        assert_eq!(populate("3.0.3", &json!({"type": "number"})), json!(0));
    }

    #[test]
    fn examples_take_priority() {
        assert_eq!(populate("3.0.3", &json!({"type": "integer", "example": "42"})), json!(42));
        assert_eq!(populate("3.0.3", &json!({"type": "boolean", "example": false})), json!(false));
        assert_eq!(
            populate("3.0.3", &json!({"type": "object", "example": "{\"a\":1}"})),
            json!({"a": 1})
        );
        assert_eq!(
            populate("3.1.0", &json!({"type": "string", "examples": ["first"], "example": "second"})),
            json!("first")
        );
        assert_eq!(populate("3.0.3", &json!({"type": "integer", "example": "many"})), json!(0));
    }

    #[test]
    fn objects_and_arrays() {
        let schema = json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer", "minimum": 1},
                "tags": {"type": "array", "maxItems": 30, "items": {"type": "string", "enum": ["a", "b"]}},
                "flags": {"type": "array", "minItems": 2, "items": {"type": "boolean"}},
                "free": {}
            }
        });
        let value = populate("3.0.3", &schema);
        assert_eq!(value["id"], json!(1));
        assert_eq!(value["tags"].as_array().unwrap().len(), 10);
        assert_eq!(value["tags"][0], json!("a"));
        assert_eq!(value["flags"], json!([true, true]));
        assert_eq!(value["free"], json!({}));
    }

    #[test]
    fn composed_schemas() {
        assert_eq!(
            populate("3.0.3", &json!({"oneOf": [{"type": "boolean"}, {"type": "string"}]})),
            json!(true)
        );
        assert_eq!(populate("3.0.3", &json!({"allOf": [{"type": "string"}]})), Value::Null);
    }

    #[test]
    fn type_lists_pick_first_non_null() {
        assert_eq!(populate("3.1.0", &json!({"type": ["null", "string"]})), json!("string"));
    }

    #[test]
    fn string_formats_validate() {
        let formats = FormatValidators::default();
        for format in ["uuid", "date", "date-time", "email"] {
            let schema = json!({"type": "string", "format": format});
            let doc = OpenApiDocument::from_value(json!({"openapi": "3.0.3"})).unwrap();
            let value = populate("3.0.3", &schema);
            let result = SchemaValidator::new(doc.dialect(), &formats).check(
                &value,
                ROOT_PROPERTY,
                &doc.schema(&schema),
            );
            assert!(result.is_valid(), "{format}: {value}");
        }
    }

    #[test]
    fn pattern_strings_are_generated() {
        let value = populate("3.0.3", &json!({"type": "string", "pattern": "^[A-Z]{2}\\d{2}$"}));
        let text = value.as_str().unwrap();
        assert_eq!(text.len(), 4);
        assert!(text[..2].chars().all(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn recursive_schema_terminates() {
        let doc = OpenApiDocument::from_value(json!({
            "openapi": "3.0.3",
            "components": {"schemas": {"Node": {
                "type": "object",
                "properties": {"child": {"$ref": "#/components/schemas/Node"}}
            }}}
        }))
        .unwrap();
        let root = json!({"$ref": "#/components/schemas/Node"});
        let patterns = PatternCache::new();
        let value = SchemaPopulator::new(doc.dialect(), &patterns)
            .populate(&doc.schema(&root), &mut StdRng::seed_from_u64(1));
        assert!(value["child"]["child"].is_object());
    }
}
