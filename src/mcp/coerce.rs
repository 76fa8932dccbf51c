//! Boolean-string coercion applied to tool arguments before validation.
//!
//! Some clients send `"true"`/`"false"` where a boolean is declared. Only
//! top-level fields are touched.

use serde_json::Value;

use super::contract::{ArgumentShape, FieldKind};

/// Replace `"true"`/`"false"` strings with native booleans for every top-level
/// field the shape declares as boolean. Everything else is left alone.
pub fn coerce_booleans(shape: &ArgumentShape, arguments: &mut Value) {
    let Some(map) = arguments.as_object_mut() else {
        return;
    };

    for field in shape.fields() {
        if field.kind != FieldKind::Boolean {
            continue;
        }
        if let Some(value) = map.get_mut(&field.name) {
            let coerced = match value.as_str() {
                Some("true") => true,
                Some("false") => false,
                _ => continue,
            };
            *value = Value::Bool(coerced);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::contract::Field;
    use serde_json::json;

    fn shape() -> ArgumentShape {
        ArgumentShape::new()
            .with(Field::optional("flag", FieldKind::Boolean))
            .with(Field::optional("label", FieldKind::string()))
            .with(Field::optional(
                "nested",
                FieldKind::Object(ArgumentShape::new().with(Field::optional("inner", FieldKind::Boolean))),
            ))
    }

    #[test]
    fn test_true_and_false_strings() {
        let mut args = json!({ "flag": "true" });
        coerce_booleans(&shape(), &mut args);
        assert_eq!(args["flag"], json!(true));

        let mut args = json!({ "flag": "false" });
        coerce_booleans(&shape(), &mut args);
        assert_eq!(args["flag"], json!(false));
    }

    #[test]
    fn test_other_strings_untouched() {
        let mut args = json!({ "flag": "yes", "label": "true" });
        coerce_booleans(&shape(), &mut args);
        assert_eq!(args, json!({ "flag": "yes", "label": "true" }));
    }

    #[test]
    fn test_nested_fields_untouched() {
        let mut args = json!({ "nested": { "inner": "true" } });
        coerce_booleans(&shape(), &mut args);
        assert_eq!(args["nested"]["inner"], json!("true"));
    }

    #[test]
    fn test_non_object_arguments() {
        let mut args = json!("true");
        coerce_booleans(&shape(), &mut args);
        assert_eq!(args, json!("true"));
    }
}
