//! Declarative, closed input contracts.
//!
//! A contract is a tree of [`ObjectContract`]s. Running [`ObjectContract::validate`]
//! walks the raw JSON once, collects every violation with its field path, and
//! returns a normalized copy with defaults filled in. The same tree renders into
//! the JSON Schema advertised by `tools/list`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value, json};

/// Path reported for violations on the argument object itself.
pub const ROOT_PATH: &str = "arguments";

#[derive(Debug, Clone)]
pub enum Shape {
    String {
        min_len: usize,
        pattern: Option<&'static LazyLock<Regex>>,
    },
    Integer {
        min: Option<i64>,
        max: Option<i64>,
    },
    Number,
    Boolean,
    /// A single allowed string literal.
    Const(&'static str),
    Enum(&'static [&'static str]),
    Array {
        items: Box<Shape>,
        min_items: usize,
    },
    /// Free-form object whose values must all be strings.
    StringMap,
    Object(ObjectContract),
}

impl Shape {
    pub fn string() -> Self {
        Shape::String {
            min_len: 0,
            pattern: None,
        }
    }

    pub fn non_empty_string() -> Self {
        Shape::String {
            min_len: 1,
            pattern: None,
        }
    }

    pub fn pattern(regex: &'static LazyLock<Regex>) -> Self {
        Shape::String {
            min_len: 0,
            pattern: Some(regex),
        }
    }

    pub fn integer(min: Option<i64>, max: Option<i64>) -> Self {
        Shape::Integer { min, max }
    }

    pub fn array(items: Shape, min_items: usize) -> Self {
        Shape::Array {
            items: Box::new(items),
            min_items,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Shape::String { .. } | Shape::Const(_) | Shape::Enum(_) => "string",
            Shape::Integer { .. } => "integer",
            Shape::Number => "number",
            Shape::Boolean => "boolean",
            Shape::Array { .. } => "array",
            Shape::StringMap | Shape::Object(_) => "object",
        }
    }

    fn check(&self, value: &Value, path: &str, violations: &mut Vec<Violation>) -> Option<Value> {
        match self {
            Shape::String { min_len, pattern } => {
                let Some(s) = value.as_str() else {
                    return type_mismatch(self, value, path, violations);
                };
                if s.chars().count() < *min_len {
                    violations.push(Violation::new(
                        path,
                        format!("must be at least {min_len} character(s) long"),
                    ));
                    return None;
                }
                if let Some(regex) = pattern {
                    if !regex.is_match(s) {
                        violations.push(Violation::new(
                            path,
                            format!("must match pattern {}", regex.as_str()),
                        ));
                        return None;
                    }
                }
                Some(value.clone())
            }
            Shape::Integer { min, max } => {
                let Some(n) = as_integer(value) else {
                    return type_mismatch(self, value, path, violations);
                };
                if let Some(min) = min.filter(|min| n < *min) {
                    violations.push(Violation::new(path, format!("must be >= {min}")));
                    return None;
                }
                if let Some(max) = max.filter(|max| n > *max) {
                    violations.push(Violation::new(path, format!("must be <= {max}")));
                    return None;
                }
                Some(json!(n))
            }
            Shape::Number => {
                if value.is_number() {
                    Some(value.clone())
                } else {
                    type_mismatch(self, value, path, violations)
                }
            }
            Shape::Boolean => {
                if value.is_boolean() {
                    Some(value.clone())
                } else {
                    type_mismatch(self, value, path, violations)
                }
            }
            Shape::Const(expected) => {
                if value.as_str() == Some(*expected) {
                    Some(value.clone())
                } else {
                    violations.push(Violation::new(path, format!("must be \"{expected}\"")));
                    None
                }
            }
            Shape::Enum(allowed) => {
                let Some(s) = value.as_str() else {
                    return type_mismatch(self, value, path, violations);
                };
                if allowed.contains(&s) {
                    Some(value.clone())
                } else {
                    violations.push(Violation::new(
                        path,
                        format!("must be one of: {}", allowed.join(", ")),
                    ));
                    None
                }
            }
            Shape::Array { items, min_items } => {
                let Some(array) = value.as_array() else {
                    return type_mismatch(self, value, path, violations);
                };
                if array.len() < *min_items {
                    violations.push(Violation::new(
                        path,
                        format!("must contain at least {min_items} item(s)"),
                    ));
                    return None;
                }
                let before = violations.len();
                let normalized: Vec<Value> = array
                    .iter()
                    .enumerate()
                    .filter_map(|(index, item)| {
                        items.check(item, &format!("{path}[{index}]"), violations)
                    })
                    .collect();
                (violations.len() == before).then_some(Value::Array(normalized))
            }
            Shape::StringMap => {
                let Some(map) = value.as_object() else {
                    return type_mismatch(self, value, path, violations);
                };
                let before = violations.len();
                for (key, entry) in map {
                    if !entry.is_string() {
                        violations.push(Violation::new(
                            &child_path(path, key),
                            format!("expected string, got {}", value_type_name(entry)),
                        ));
                    }
                }
                (violations.len() == before).then(|| value.clone())
            }
            Shape::Object(contract) => contract.check(value, path, violations),
        }
    }

    fn to_json_schema(&self) -> Value {
        match self {
            Shape::String { min_len, pattern } => {
                let mut schema = json!({ "type": "string" });
                if *min_len > 0 {
                    schema["minLength"] = json!(min_len);
                }
                if let Some(regex) = pattern {
                    schema["pattern"] = json!(regex.as_str());
                }
                schema
            }
            Shape::Integer { min, max } => {
                let mut schema = json!({ "type": "integer" });
                if let Some(min) = min {
                    schema["minimum"] = json!(min);
                }
                if let Some(max) = max {
                    schema["maximum"] = json!(max);
                }
                schema
            }
            Shape::Number => json!({ "type": "number" }),
            Shape::Boolean => json!({ "type": "boolean" }),
            Shape::Const(value) => json!({ "type": "string", "const": value }),
            Shape::Enum(values) => json!({ "type": "string", "enum": values }),
            Shape::Array { items, min_items } => {
                let mut schema = json!({ "type": "array", "items": items.to_json_schema() });
                if *min_items > 0 {
                    schema["minItems"] = json!(min_items);
                }
                schema
            }
            Shape::StringMap => json!({
                "type": "object",
                "additionalProperties": { "type": "string" }
            }),
            Shape::Object(contract) => contract.to_json_schema(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    name: &'static str,
    shape: Shape,
    required: bool,
    default: Option<Value>,
    description: Option<&'static str>,
}

impl Field {
    pub fn required(name: &'static str, shape: Shape) -> Self {
        Self {
            name,
            shape,
            required: true,
            default: None,
            description: None,
        }
    }

    pub fn optional(name: &'static str, shape: Shape) -> Self {
        Self {
            required: false,
            ..Self::required(name, shape)
        }
    }

    /// Filled in when the field is absent. Only meaningful on optional fields.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObjectContract {
    fields: Vec<Field>,
    exactly_one_of: Vec<&'static str>,
    ordered: Option<(&'static str, &'static str)>,
    description: Option<&'static str>,
}

impl ObjectContract {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    /// Exactly one of `keys` must be present.
    pub fn exactly_one_of(mut self, keys: &[&'static str]) -> Self {
        self.exactly_one_of = keys.to_vec();
        self
    }

    /// When both are present, `upper` must be strictly greater than `lower`.
    pub fn ordered(mut self, lower: &'static str, upper: &'static str) -> Self {
        self.ordered = Some((lower, upper));
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|field| field.name)
    }

    /// Validate tool arguments. A missing or `null` argument object counts as `{}`.
    pub fn validate(&self, raw: &Value) -> Result<Value, ValidationErrors> {
        let empty = Value::Object(Map::new());
        let raw = if raw.is_null() { &empty } else { raw };
        let mut violations = Vec::new();
        match self.check(raw, "", &mut violations) {
            Some(normalized) if violations.is_empty() => Ok(normalized),
            _ => Err(ValidationErrors(violations)),
        }
    }

    fn check(&self, value: &Value, path: &str, violations: &mut Vec<Violation>) -> Option<Value> {
        let Some(object) = value.as_object() else {
            violations.push(Violation::new(
                display_path(path),
                format!("expected object, got {}", value_type_name(value)),
            ));
            return None;
        };

        let before = violations.len();
        let mut normalized = Map::new();

        for key in object.keys() {
            if !self.fields.iter().any(|field| field.name == key) {
                violations.push(Violation::new(&child_path(path, key), "unknown field"));
            }
        }

        for field in &self.fields {
            let field_path = child_path(path, field.name);
            match object.get(field.name) {
                Some(raw) => {
                    if let Some(value) = field.shape.check(raw, &field_path, violations) {
                        normalized.insert(field.name.to_string(), value);
                    }
                }
                None if field.required => {
                    violations.push(Violation::new(&field_path, "is required"));
                }
                None => {
                    if let Some(default) = &field.default {
                        normalized.insert(field.name.to_string(), default.clone());
                    }
                }
            }
        }

        if !self.exactly_one_of.is_empty() {
            let present: Vec<&str> = self
                .exactly_one_of
                .iter()
                .copied()
                .filter(|key| object.contains_key(*key))
                .collect();
            if present.len() != 1 {
                let found = if present.is_empty() {
                    "none".to_string()
                } else {
                    present.join(", ")
                };
                violations.push(Violation::new(
                    display_path(path),
                    format!(
                        "must contain exactly one of: {} (found {found})",
                        self.exactly_one_of.join(", ")
                    ),
                ));
            }
        }

        if let Some((lower, upper)) = self.ordered {
            let start = object.get(lower).and_then(as_integer);
            let end = object.get(upper).and_then(as_integer);
            if let (Some(start), Some(end)) = (start, end) {
                if end <= start {
                    violations.push(Violation::new(
                        &child_path(path, upper),
                        format!("must be greater than {lower}"),
                    ));
                }
            }
        }

        (violations.len() == before).then_some(Value::Object(normalized))
    }

    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            let mut schema = field.shape.to_json_schema();
            if let Some(description) = field.description {
                schema["description"] = json!(description);
            }
            if let Some(default) = &field.default {
                schema["default"] = default.clone();
            }
            properties.insert(field.name.to_string(), schema);
            if field.required {
                required.push(field.name);
            }
        }

        let mut schema = json!({
            "type": "object",
            "properties": properties,
            "additionalProperties": false,
        });
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        if !self.exactly_one_of.is_empty() {
            let branches: Vec<Value> = self
                .exactly_one_of
                .iter()
                .map(|key| json!({ "required": [key] }))
                .collect();
            schema["oneOf"] = Value::Array(branches);
        }
        if let Some(description) = self.description {
            schema["description"] = json!(description);
        }
        schema
    }
}

/// One violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: String,
    pub reason: String,
}

impl Violation {
    fn new(path: &str, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// Every violation found in one argument object. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<Violation>);

impl ValidationErrors {
    pub fn single(path: &str, reason: impl Into<String>) -> Self {
        Self(vec![Violation::new(path, reason)])
    }

    pub fn violations(&self) -> &[Violation] {
        &self.0
    }

    pub fn mentions(&self, path: &str) -> bool {
        self.0.iter().any(|violation| violation.path == path)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&rendered.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

fn type_mismatch(
    shape: &Shape,
    value: &Value,
    path: &str,
    violations: &mut Vec<Violation>,
) -> Option<Value> {
    violations.push(Violation::new(
        path,
        format!(
            "expected {}, got {}",
            shape.type_name(),
            value_type_name(value)
        ),
    ));
    None
}

fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64).then_some(f as i64)
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { ROOT_PATH } else { path }
}

#[cfg(test)]
mod tests {
    use super::*;

    static LANG: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[A-Za-z]{2}(-[A-Za-z]+)?$").expect("valid regex"));

    fn range() -> ObjectContract {
        ObjectContract::new(vec![
            Field::required("startIndex", Shape::integer(Some(1), None)),
            Field::required("endIndex", Shape::integer(Some(1), None)),
            Field::optional("segmentId", Shape::string()),
        ])
        .ordered("startIndex", "endIndex")
    }

    fn sample() -> ObjectContract {
        ObjectContract::new(vec![
            Field::required("id", Shape::non_empty_string()),
            Field::optional("size", Shape::integer(Some(1), Some(1000))),
            Field::optional("all", Shape::Boolean).with_default(json!(true)),
            Field::optional("lang", Shape::pattern(&LANG)),
            Field::optional("unit", Shape::Const("PT")).with_default(json!("PT")),
            Field::optional("tags", Shape::array(Shape::non_empty_string(), 1)),
            Field::optional("range", Shape::Object(range())),
        ])
    }

    #[test]
    fn applies_defaults_and_keeps_valid_fields() {
        let out = sample().validate(&json!({ "id": "abc", "size": 5.0 })).unwrap();
        assert_eq!(out, json!({ "id": "abc", "size": 5, "all": true, "unit": "PT" }));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let out = sample().validate(&json!({ "id": "abc", "all": false })).unwrap();
        assert_eq!(out["all"], json!(false));
    }

    #[test]
    fn reports_every_violation_with_paths() {
        let err = sample()
            .validate(&json!({
                "size": 0,
                "lang": "english",
                "tags": ["", "ok"],
                "extra": 1,
                "range": { "startIndex": 1.5, "endIndex": "x" }
            }))
            .unwrap_err();
        for path in ["id", "size", "lang", "tags[0]", "extra", "range.startIndex", "range.endIndex"] {
            assert!(err.mentions(path), "missing {path}: {err}");
        }
    }

    #[test]
    fn null_arguments_are_an_empty_object() {
        let err = sample().validate(&Value::Null).unwrap_err();
        assert_eq!(err.violations().len(), 1);
        assert!(err.mentions("id"));

        let empty = ObjectContract::new(vec![Field::optional("q", Shape::string())]);
        assert_eq!(empty.validate(&Value::Null).unwrap(), json!({}));
    }

    #[test]
    fn null_is_not_accepted_for_typed_fields() {
        let err = sample().validate(&json!({ "id": "a", "size": null })).unwrap_err();
        assert_eq!(err.violations()[0].reason, "expected integer, got null");
    }

    #[test]
    fn non_object_arguments_are_rejected_at_root() {
        let err = sample().validate(&json!([1, 2])).unwrap_err();
        assert!(err.mentions(ROOT_PATH));
    }

    #[test]
    fn range_end_must_follow_start() {
        let err = sample()
            .validate(&json!({ "id": "a", "range": { "startIndex": 5, "endIndex": 5 } }))
            .unwrap_err();
        assert_eq!(
            err.violations(),
            &[Violation::new("range.endIndex", "must be greater than startIndex")]
        );
        assert!(
            sample()
                .validate(&json!({ "id": "a", "range": { "startIndex": 5, "endIndex": 6 } }))
                .is_ok()
        );
    }

    #[test]
    fn exactly_one_of_rejects_zero_and_many() {
        let ops = ObjectContract::new(vec![
            Field::optional("a", Shape::Boolean),
            Field::optional("b", Shape::Boolean),
        ])
        .exactly_one_of(&["a", "b"]);

        assert!(ops.validate(&json!({ "a": true })).is_ok());
        let none = ops.validate(&json!({})).unwrap_err();
        assert!(none.violations()[0].reason.contains("found none"));
        let both = ops.validate(&json!({ "a": true, "b": false })).unwrap_err();
        assert!(both.violations()[0].reason.contains("found a, b"));
    }

    #[test]
    fn string_maps_require_string_values() {
        let meta = ObjectContract::new(vec![Field::optional("props", Shape::StringMap)]);
        assert!(meta.validate(&json!({ "props": { "k": "v" } })).is_ok());
        let err = meta.validate(&json!({ "props": { "k": 1 } })).unwrap_err();
        assert!(err.mentions("props.k"));
    }

    #[test]
    fn schema_is_closed_and_lists_required() {
        let schema = sample().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["additionalProperties"], json!(false));
        assert_eq!(schema["required"], json!(["id"]));
        assert_eq!(schema["properties"]["size"]["maximum"], json!(1000));
        assert_eq!(schema["properties"]["all"]["default"], json!(true));
        assert_eq!(schema["properties"]["lang"]["pattern"], LANG.as_str());
        assert_eq!(schema["properties"]["unit"]["const"], "PT");
        assert_eq!(schema["properties"]["tags"]["minItems"], json!(1));
        assert_eq!(
            schema["properties"]["range"]["additionalProperties"],
            json!(false)
        );
    }
}
