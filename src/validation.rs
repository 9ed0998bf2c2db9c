//! Schema validation.
//!
//! Structural checks of a resource configuration against its [`Schema`]:
//! presence of required attributes, value types, closed value sets and
//! nested block counts. Resource handlers layer their cross-field rules on
//! top with [`require_any`] and [`conflicts_with`].
//!
//! ```
//! use hemmer_provider_logdna::schema::{Attribute, Schema};
//! use hemmer_provider_logdna::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("email", Attribute::required_string())
//!     .with_attribute(
//!         "role",
//!         Attribute::required_string().with_allowed_values(&["owner", "admin", "member", "readonly"]),
//!     );
//!
//! assert!(validate(&schema, &json!({"email": "a@b.c", "role": "admin"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"email": "a@b.c", "role": "root"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("role".to_string()));
//! ```

use crate::schema::{
    Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, DiagnosticSeverity, NestedBlock,
    Schema,
};
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// Returns one diagnostic per problem; an empty list means the value is valid.
/// Computed-only attributes are skipped since the provider sets them.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

/// Whether a configuration value counts as set: non-null, and non-empty for strings and lists.
pub fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(_) => true,
    }
}

/// Require at least one of `names` to be set in `config`.
pub fn require_any(config: &Value, names: &[&str]) -> Option<Diagnostic> {
    if names.iter().any(|name| is_set(config.get(*name))) {
        return None;
    }
    Some(
        Diagnostic::error(format!("One of {} must be set", names.join(", ")))
            .with_attribute(names[0]),
    )
}

/// Reject `name` when any of `others` is also set.
pub fn conflicts_with(config: &Value, name: &str, others: &[&str]) -> Option<Diagnostic> {
    if !is_set(config.get(name)) {
        return None;
    }
    others
        .iter()
        .find(|other| is_set(config.get(**other)))
        .map(|other| {
            Diagnostic::error(format!("'{}' conflicts with '{}'", name, other))
                .with_detail("Only one of these attributes may be configured")
                .with_attribute(name)
        })
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        _ => {
            let mut diagnostic =
                Diagnostic::error("Expected object").with_detail(format!("Got {}", value_type_name(value)));
            if !path.is_empty() {
                diagnostic = diagnostic.with_attribute(path);
            }
            diagnostics.push(diagnostic);
            return;
        }
    };

    for (name, attr) in &block.attributes {
        let attr_path = join_path(path, name);
        validate_attribute(attr, obj.get(name), &attr_path, diagnostics);
    }

    for (name, nested_block) in &block.blocks {
        let block_path = join_path(path, name);
        validate_nested_block(nested_block, obj.get(name), &block_path, diagnostics);
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.is_computed_only() {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        }
        Some(v) => {
            let before = diagnostics.len();
            validate_attribute_type(&attr.attr_type, v, path, diagnostics);
            if diagnostics.len() == before && !attr.allowed_values.is_empty() {
                validate_allowed_values(&attr.allowed_values, v, path, diagnostics);
            }
        }
    }
}

fn validate_allowed_values(
    allowed: &[String],
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let Some(s) = value.as_str() {
        if !allowed.iter().any(|a| a == s) {
            diagnostics.push(
                Diagnostic::error(format!("Invalid value for attribute '{}'", path))
                    .with_detail(format!(
                        "Expected one of {}, got \"{}\"",
                        allowed.join(", "),
                        s
                    ))
                    .with_attribute(path),
            );
        }
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        }
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        }
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        }
        AttributeType::List(element_type) => {
            if let Some(arr) = value.as_array() {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "list", value));
            }
        }
        AttributeType::Map(value_type) => {
            if let Some(obj) = value.as_object() {
                for (key, val) in obj {
                    let key_path = format!("{}.{}", path, key);
                    validate_attribute_type(value_type, val, &key_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "map", value));
            }
        }
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match nested.nesting_mode {
        BlockNestingMode::Single => validate_single_block(nested, value, path, diagnostics),
        BlockNestingMode::List => validate_list_block(nested, value, path, diagnostics),
    }
}

fn validate_single_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        None | Some(Value::Null) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required block '{}'", path))
                        .with_detail("At least one block is required")
                        .with_attribute(path),
                );
            }
        }
        Some(v) => validate_block(&nested.block, v, path, diagnostics),
    }
}

fn validate_list_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        None | Some(Value::Null) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s)",
                        path, nested.min_items
                    ))
                    .with_attribute(path),
                );
            }
        }
        Some(Value::Array(arr)) => {
            let len = arr.len() as u32;

            if len < nested.min_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s), got {}",
                        path, nested.min_items, len
                    ))
                    .with_attribute(path),
                );
            }

            // 0 means unlimited
            if nested.max_items > 0 && len > nested.max_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' allows at most {} item(s), got {}",
                        path, nested.max_items, len
                    ))
                    .with_attribute(path),
                );
            }

            for (i, item) in arr.iter().enumerate() {
                let item_path = format!("{}.{}", path, i);
                validate_block(&nested.block, item, &item_path, diagnostics);
            }
        }
        Some(v) => {
            diagnostics.push(
                Diagnostic::error(format!("Expected list for block '{}'", path))
                    .with_detail(format!("Got {}", value_type_name(v)))
                    .with_attribute(path),
            );
        }
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            if n.as_i64().is_some() {
                true
            } else if let Some(f) = n.as_f64() {
                f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
            } else {
                false
            }
        }
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic {
        severity: DiagnosticSeverity::Error,
        summary: format!("Invalid type for attribute '{}'", path),
        detail: Some(format!(
            "Expected {}, got {}",
            expected,
            value_type_name(got)
        )),
        attribute: Some(path.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Block, NestedBlock, Schema};
    use serde_json::json;

    fn exclusion_schema() -> Schema {
        Schema::v0()
            .with_attribute("title", Attribute::optional_string())
            .with_attribute("active", Attribute::optional_bool())
            .with_attribute("apps", Attribute::optional_string_list())
            .with_attribute("id", Attribute::computed_string())
    }

    #[test]
    fn test_validate_required_string() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(validate(&schema, &json!({"name": "errors"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("name".to_string()));

        let diagnostics = validate(&schema, &json!({"name": null}));
        assert_eq!(diagnostics.len(), 1);

        let diagnostics = validate(&schema, &json!({"name": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        let schema = exclusion_schema();
        assert!(validate(&schema, &json!({"id": 123})).is_empty());
    }

    #[test]
    fn test_validate_int64() {
        let schema = Schema::v0().with_attribute("expires", Attribute::required_int64());

        assert!(validate(&schema, &json!({"expires": 3600})).is_empty());
        assert!(validate(&schema, &json!({"expires": 3600.0})).is_empty());
        assert_eq!(validate(&schema, &json!({"expires": 1.5})).len(), 1);
        assert_eq!(validate(&schema, &json!({"expires": "3600"})).len(), 1);
    }

    #[test]
    fn test_validate_list_elements() {
        let schema = exclusion_schema();

        assert!(validate(&schema, &json!({"apps": ["nginx", "api"]})).is_empty());

        let diagnostics = validate(&schema, &json!({"apps": ["nginx", 5]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("apps.1".to_string()));

        assert_eq!(validate(&schema, &json!({"apps": "nginx"})).len(), 1);
    }

    #[test]
    fn test_validate_map() {
        let schema = Schema::v0().with_attribute("headers", Attribute::optional_string_map());

        assert!(validate(&schema, &json!({"headers": {"Auth": "x"}})).is_empty());

        let diagnostics = validate(&schema, &json!({"headers": {"Auth": "x", "Retry": 3}}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("headers.Retry".to_string()));
    }

    #[test]
    fn test_validate_allowed_values() {
        let schema = Schema::v0().with_attribute(
            "type",
            Attribute::required_string().with_allowed_values(&["ingestion", "service"]),
        );

        assert!(validate(&schema, &json!({"type": "service"})).is_empty());

        let diagnostics = validate(&schema, &json!({"type": "admin"}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0]
            .detail
            .as_deref()
            .unwrap()
            .contains("ingestion, service"));

        // A type error is reported alone, without a second allowed-values error
        assert_eq!(validate(&schema, &json!({"type": 1})).len(), 1);
    }

    #[test]
    fn test_validate_nested_block_list() {
        let schema = Schema::v0().with_block(
            "email_channel",
            NestedBlock::list(
                Block::new()
                    .with_attribute("emails", Attribute::required_string_list())
                    .with_attribute("triggerlimit", Attribute::required_int64()),
            )
            .with_max_items(2),
        );

        assert!(validate(
            &schema,
            &json!({"email_channel": [{"emails": ["a@b.c"], "triggerlimit": 15}]})
        )
        .is_empty());

        let diagnostics = validate(
            &schema,
            &json!({"email_channel": [{"emails": ["a@b.c"], "triggerlimit": "15"}]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute,
            Some("email_channel.0.triggerlimit".to_string())
        );

        let item = json!({"emails": ["a@b.c"], "triggerlimit": 1});
        let diagnostics = validate(&schema, &json!({"email_channel": [item.clone(), item.clone(), item]}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at most 2"));

        let diagnostics = validate(&schema, &json!({"email_channel": {"emails": []}}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected list"));
    }

    #[test]
    fn test_validate_nested_block_min_items() {
        let schema = Schema::v0().with_block(
            "settings",
            NestedBlock::single(Block::new().with_attribute("url", Attribute::required_string()))
                .with_min_items(1),
        );

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Missing required block"));
    }

    #[test]
    fn test_validate_root_not_object() {
        let schema = exclusion_schema();
        let diagnostics = validate(&schema, &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));
        assert!(diagnostics[0].attribute.is_none());
    }

    #[test]
    fn test_is_set() {
        assert!(!is_set(None));
        assert!(!is_set(Some(&json!(null))));
        assert!(!is_set(Some(&json!(""))));
        assert!(!is_set(Some(&json!([]))));
        assert!(is_set(Some(&json!(false))));
        assert!(is_set(Some(&json!(["a"]))));
    }

    #[test]
    fn test_require_any() {
        let names = ["apps", "hosts", "query"];
        assert!(require_any(&json!({"query": "level:debug"}), &names).is_none());

        let diagnostic = require_any(&json!({"title": "noise", "apps": []}), &names).unwrap();
        assert_eq!(diagnostic.summary, "One of apps, hosts, query must be set");
    }

    #[test]
    fn test_conflicts_with() {
        let others = ["email_channel", "slack_channel"];
        assert!(conflicts_with(&json!({"presetid": "p1"}), "presetid", &others).is_none());
        assert!(conflicts_with(&json!({"slack_channel": [{}]}), "presetid", &others).is_none());

        let diagnostic = conflicts_with(
            &json!({"presetid": "p1", "slack_channel": [{"url": "https://hooks"}]}),
            "presetid",
            &others,
        )
        .unwrap();
        assert_eq!(diagnostic.summary, "'presetid' conflicts with 'slack_channel'");
        assert!(is_valid(&exclusion_schema(), &json!({})));
    }
}
