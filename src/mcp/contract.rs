//! Tool contracts: the declared argument shape of each tool.
//!
//! A contract is plain data. Validation walks the whole argument object and
//! collects every violation so the caller sees all problems in one message.

use serde_json::{json, Map, Value};

/// Type descriptor for a single argument.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String { min_length: Option<usize> },
    Number { exclusive_minimum: Option<f64> },
    Boolean,
    /// One of a fixed set of string literals.
    Enum(Vec<String>),
    Array(Box<FieldKind>),
    Object(ArgumentShape),
    /// An object whose values all share one kind (`Record<string, T>`).
    Record(Box<FieldKind>),
}

impl FieldKind {
    pub fn string() -> Self {
        Self::String { min_length: None }
    }

    pub fn non_empty_string() -> Self {
        Self::String { min_length: Some(1) }
    }

    pub fn number() -> Self {
        Self::Number {
            exclusive_minimum: None,
        }
    }

    pub fn positive_number() -> Self {
        Self::Number {
            exclusive_minimum: Some(0.0),
        }
    }

    pub fn literals<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum(options.into_iter().map(Into::into).collect())
    }

    pub fn string_array() -> Self {
        Self::Array(Box::new(Self::string()))
    }

    pub fn string_record() -> Self {
        Self::Record(Box::new(Self::string()))
    }

    fn expected(&self) -> String {
        match self {
            Self::String { .. } => "a string".into(),
            Self::Number { .. } => "a number".into(),
            Self::Boolean => "boolean".into(),
            Self::Enum(options) => options
                .iter()
                .map(|o| format!("\"{}\"", o))
                .collect::<Vec<_>>()
                .join(" or "),
            Self::Array(inner) => format!("an array of {}", plural(&inner.expected())),
            Self::Object(_) | Self::Record(_) => "an object".into(),
        }
    }

    fn check(&self, value: &Value, path: &str, out: &mut Vec<Violation>) {
        match self {
            Self::String { min_length } => match value.as_str() {
                None => out.push(Violation::new(path, self.expected(), describe(value))),
                Some(s) => {
                    if let Some(min) = min_length {
                        let len = s.chars().count();
                        if len < *min {
                            let expected = if *min == 1 {
                                "non-empty".to_string()
                            } else {
                                format!("at least length {}", min)
                            };
                            out.push(Violation::new(path, expected, describe(value)));
                        }
                    }
                }
            },
            Self::Number { exclusive_minimum } => match value.as_f64() {
                None => out.push(Violation::new(path, self.expected(), describe(value))),
                Some(n) => {
                    if let Some(min) = exclusive_minimum {
                        if n <= *min {
                            let expected = if *min == 0.0 {
                                "positive".to_string()
                            } else {
                                format!("more than {}", min)
                            };
                            out.push(Violation::new(path, expected, describe(value)));
                        }
                    }
                }
            },
            Self::Boolean => {
                if !value.is_boolean() {
                    out.push(Violation::new(path, self.expected(), describe(value)));
                }
            }
            Self::Enum(options) => {
                let ok = value
                    .as_str()
                    .map(|s| options.iter().any(|o| o == s))
                    .unwrap_or(false);
                if !ok {
                    out.push(Violation::new(path, self.expected(), describe(value)));
                }
            }
            Self::Array(inner) => match value.as_array() {
                None => out.push(Violation::new(path, self.expected(), describe(value))),
                Some(items) => {
                    for (i, item) in items.iter().enumerate() {
                        inner.check(item, &format!("{}[{}]", path, i), out);
                    }
                }
            },
            Self::Object(shape) => shape.check(value, path, out),
            Self::Record(inner) => match value.as_object() {
                None => out.push(Violation::new(path, self.expected(), describe(value))),
                Some(map) => {
                    for (key, item) in map {
                        inner.check(item, &join_path(path, key), out);
                    }
                }
            },
        }
    }

    fn json_schema(&self) -> Value {
        match self {
            Self::String { min_length } => {
                let mut schema = json!({ "type": "string" });
                if let Some(min) = min_length {
                    schema["minLength"] = json!(min);
                }
                schema
            }
            Self::Number { exclusive_minimum } => {
                let mut schema = json!({ "type": "number" });
                if let Some(min) = exclusive_minimum {
                    schema["exclusiveMinimum"] = json!(min);
                }
                schema
            }
            Self::Boolean => json!({ "type": "boolean" }),
            Self::Enum(options) => json!({ "enum": options }),
            Self::Array(inner) => json!({ "type": "array", "items": inner.json_schema() }),
            Self::Object(shape) => shape.json_schema(),
            Self::Record(inner) => json!({
                "type": "object",
                "additionalProperties": inner.json_schema(),
            }),
        }
    }
}

/// One named argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub optional: bool,
    pub description: Option<String>,
}

impl Field {
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: false,
            description: None,
        }
    }

    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            optional: true,
            ..Self::required(name, kind)
        }
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Ordered set of argument fields. Undeclared keys are accepted and ignored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArgumentShape {
    fields: Vec<Field>,
}

impl ArgumentShape {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Append every field of `other`, as for an intersection of two shapes.
    #[must_use]
    pub fn merge(mut self, other: ArgumentShape) -> Self {
        self.fields.extend(other.fields);
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate a complete arguments object.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationErrors> {
        let mut violations = Vec::new();
        self.check(value, "", &mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors::new(violations))
        }
    }

    fn check(&self, value: &Value, path: &str, out: &mut Vec<Violation>) {
        let Some(map) = value.as_object() else {
            let at = if path.is_empty() { "arguments" } else { path };
            out.push(Violation::new(at, "an object", describe(value)));
            return;
        };

        for field in &self.fields {
            let field_path = join_path(path, &field.name);
            match map.get(&field.name) {
                Some(v) => field.kind.check(v, &field_path, out),
                None if field.optional => {}
                None => out.push(Violation::new(field_path, field.kind.expected(), "missing")),
            }
        }
    }

    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            let mut schema = field.kind.json_schema();
            if let (Some(description), Some(obj)) = (&field.description, schema.as_object_mut()) {
                obj.insert("description".into(), json!(description));
            }
            properties.insert(field.name.clone(), schema);
            if !field.optional {
                required.push(json!(field.name));
            }
        }

        let mut schema = json!({ "type": "object", "properties": properties });
        if !required.is_empty() {
            schema["required"] = Value::Array(required);
        }
        schema
    }
}

/// The declared interface of one tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolContract {
    pub name: String,
    pub description: String,
    pub arguments: ArgumentShape,
}

impl ToolContract {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            arguments: ArgumentShape::new(),
        }
    }

    #[must_use]
    pub fn with_arguments(mut self, arguments: ArgumentShape) -> Self {
        self.arguments = arguments;
        self
    }

    /// Check a whole request: the name literal plus the argument shape.
    pub fn validate(&self, name: &str, arguments: &Value) -> Result<(), ValidationErrors> {
        let mut violations = Vec::new();
        if name != self.name {
            violations.push(Violation::new(
                "name",
                format!("\"{}\"", self.name),
                format!("\"{}\"", name),
            ));
        }
        self.arguments.check(arguments, "", &mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors::new(violations))
        }
    }
}

/// A single failed field constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub expected: String,
    pub actual: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} must be {} (was {})", self.path, self.expected, self.actual)
    }
}

/// Every violation found in one validation pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", join_violations(.0))]
pub struct ValidationErrors(Vec<Violation>);

impl ValidationErrors {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self(violations)
    }

    pub fn violations(&self) -> &[Violation] {
        &self.0
    }

    /// Human-readable summary, one violation per line.
    pub fn summary(&self) -> String {
        join_violations(&self.0)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

fn plural(expected: &str) -> String {
    let noun = expected
        .strip_prefix("an ")
        .or_else(|| expected.strip_prefix("a "))
        .unwrap_or(expected);
    format!("{}s", noun)
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("\"{}\"", s),
        Value::Array(_) => "an array".into(),
        Value::Object(_) => "an object".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smart_search_shape() -> ArgumentShape {
        ArgumentShape::new()
            .with(Field::required("query", FieldKind::non_empty_string()))
            .with(Field::optional(
                "filter",
                FieldKind::Object(
                    ArgumentShape::new()
                        .with(Field::optional("folders", FieldKind::string_array()))
                        .with(Field::optional("limit", FieldKind::positive_number())),
                ),
            ))
    }

    #[test]
    fn test_valid_arguments() {
        let shape = smart_search_shape();
        let args = json!({ "query": "rust", "filter": { "folders": ["Work"], "limit": 3 } });
        assert!(shape.validate(&args).is_ok());
    }

    #[test]
    fn test_all_violations_reported() {
        let shape = ArgumentShape::new()
            .with(Field::required("a", FieldKind::string()))
            .with(Field::required("b", FieldKind::positive_number()));
        let err = shape.validate(&json!({})).unwrap_err();
        assert_eq!(err.violations().len(), 2);
        let summary = err.summary();
        assert!(summary.contains("a must be a string (was missing)"));
        assert!(summary.contains("b must be a number (was missing)"));
    }

    #[test]
    fn test_nested_violations_have_paths() {
        let shape = smart_search_shape();
        let args = json!({ "query": "", "filter": { "folders": ["ok", 3], "limit": 0 } });
        let err = shape.validate(&args).unwrap_err();
        let summary = err.summary();
        assert!(summary.contains("query must be non-empty (was \"\")"));
        assert!(summary.contains("filter.folders[1] must be a string (was 3)"));
        assert!(summary.contains("filter.limit must be positive (was 0)"));
    }

    #[test]
    fn test_enum_and_boolean() {
        let shape = ArgumentShape::new()
            .with(Field::optional("format", FieldKind::literals(["markdown", "json"])))
            .with(Field::optional("raw", FieldKind::Boolean));
        assert!(shape.validate(&json!({ "format": "json", "raw": true })).is_ok());

        let err = shape
            .validate(&json!({ "format": "html", "raw": "yes" }))
            .unwrap_err();
        let summary = err.summary();
        assert!(summary.contains("format must be \"markdown\" or \"json\" (was \"html\")"));
        assert!(summary.contains("raw must be boolean (was \"yes\")"));
    }

    #[test]
    fn test_arguments_must_be_object() {
        let shape = ArgumentShape::new();
        let err = shape.validate(&json!([1, 2])).unwrap_err();
        assert_eq!(err.summary(), "arguments must be an object (was an array)");
    }

    #[test]
    fn test_undeclared_keys_are_ignored() {
        let shape = ArgumentShape::new().with(Field::required("filename", FieldKind::string()));
        assert!(shape.validate(&json!({ "filename": "a.md", "extra": 1 })).is_ok());
    }

    #[test]
    fn test_record_values_checked() {
        let shape = ArgumentShape::new().with(Field::required("arguments", FieldKind::string_record()));
        let err = shape
            .validate(&json!({ "arguments": { "name": "x", "age": 3 } }))
            .unwrap_err();
        assert_eq!(err.summary(), "arguments.age must be a string (was 3)");
    }

    #[test]
    fn test_contract_checks_name_literal() {
        let contract = ToolContract::new("fetch", "Fetch a page");
        let err = contract.validate("other", &json!({})).unwrap_err();
        assert_eq!(err.summary(), "name must be \"fetch\" (was \"other\")");
        assert!(contract.validate("fetch", &json!({})).is_ok());
    }

    #[test]
    fn test_json_schema_export() {
        let schema = smart_search_shape().json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["query"]));
        assert_eq!(schema["properties"]["query"]["minLength"], 1);
        let filter = &schema["properties"]["filter"];
        assert_eq!(filter["properties"]["folders"]["items"]["type"], "string");
        assert_eq!(filter["properties"]["limit"]["exclusiveMinimum"], 0.0);
        assert!(filter.get("required").is_none());
    }

    #[test]
    fn test_json_schema_descriptions() {
        let shape = ArgumentShape::new()
            .with(Field::optional("maxLength", FieldKind::number()).describe("Limit response length."));
        let schema = shape.json_schema();
        assert_eq!(
            schema["properties"]["maxLength"]["description"],
            "Limit response length."
        );
    }
}
