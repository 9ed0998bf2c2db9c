//! Schema-driven planning.
//!
//! Every LogDNA resource plans the same way, so the rules live here rather
//! than in each handler:
//!
//! 1. absent optional attributes take their schema default (also inside channel blocks)
//! 2. computed attributes the proposal leaves empty keep their prior value
//! 3. each top-level attribute or block whose value differs becomes an [`AttributeChange`]
//! 4. a change to a `force_new` attribute of an existing resource requires replacement
//!
//! Null, empty strings, empty lists and empty maps all count as "unset" when
//! comparing, since the API returns `[]` where configuration usually omits the field.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::schema::{Block, BlockNestingMode, Schema};
use crate::types::{AttributeChange, PlanResult};
use crate::validation::is_set;

/// Compute the plan for one resource instance.
///
/// `prior` is `None` when the resource is being created. A null `proposed`
/// state means the resource is being destroyed.
pub fn plan(schema: &Schema, prior: Option<&Value>, proposed: Value) -> PlanResult {
    let prior = prior.filter(|p| !p.is_null());

    if proposed.is_null() {
        return plan_destroy(prior);
    }

    let mut planned = match proposed {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    apply_defaults(&schema.block, &mut planned);

    if let Some(Value::Object(prior_map)) = prior {
        carry_computed(schema, prior_map, &mut planned);
    }

    let planned = Value::Object(planned);
    let mut changes = Vec::new();
    let mut requires_replace = false;

    for name in top_level_names(schema) {
        let before = prior.and_then(|p| p.get(name.as_str()));
        let after = planned.get(name.as_str());

        if equivalent(before, after) {
            continue;
        }

        let change = match (before.filter(|v| is_set(Some(*v))), after.filter(|v| is_set(Some(*v)))) {
            (None, Some(a)) => AttributeChange::added(name.as_str(), a.clone()),
            (Some(b), None) => AttributeChange::removed(name.as_str(), b.clone()),
            (Some(b), Some(a)) => AttributeChange::modified(name.as_str(), b.clone(), a.clone()),
            (None, None) => continue,
        };

        if prior.is_some() && schema.attribute(&name).is_some_and(|a| a.force_new) {
            requires_replace = true;
        }
        changes.push(change);
    }

    PlanResult {
        planned_state: planned,
        changes,
        requires_replace,
    }
}

fn plan_destroy(prior: Option<&Value>) -> PlanResult {
    let changes = match prior {
        Some(Value::Object(map)) => {
            let mut names: Vec<_> = map.keys().collect();
            names.sort();
            names
                .into_iter()
                .filter(|name| is_set(map.get(*name)))
                .map(|name| AttributeChange::removed(name.as_str(), map[name].clone()))
                .collect()
        }
        _ => Vec::new(),
    };

    PlanResult {
        planned_state: Value::Null,
        changes,
        requires_replace: false,
    }
}

fn top_level_names(schema: &Schema) -> BTreeSet<String> {
    schema
        .block
        .attributes
        .keys()
        .chain(schema.block.blocks.keys())
        .cloned()
        .collect()
}

fn equivalent(a: Option<&Value>, b: Option<&Value>) -> bool {
    if !is_set(a) && !is_set(b) {
        return true;
    }
    a.map(normalize) == b.map(normalize)
}

/// Drop unset fields of nested objects so `{"timezone": null}` equals `{}`.
fn normalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| is_set(Some(*v)))
                .map(|(k, v)| (k.clone(), normalize(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        other => other.clone(),
    }
}

/// Fill schema defaults into `obj`, recursing into nested blocks.
pub fn apply_defaults(block: &Block, obj: &mut Map<String, Value>) {
    for (name, attr) in &block.attributes {
        if let Some(default) = &attr.default {
            let missing = obj.get(name).map_or(true, Value::is_null);
            if missing {
                obj.insert(name.clone(), default.clone());
            }
        }
    }

    for (name, nested) in &block.blocks {
        match (nested.nesting_mode, obj.get_mut(name)) {
            (BlockNestingMode::List, Some(Value::Array(items))) => {
                for item in items.iter_mut() {
                    if let Value::Object(item) = item {
                        apply_defaults(&nested.block, item);
                    }
                }
            }
            (BlockNestingMode::Single, Some(Value::Object(item))) => {
                apply_defaults(&nested.block, item);
            }
            _ => {}
        }
    }
}

fn carry_computed(schema: &Schema, prior: &Map<String, Value>, planned: &mut Map<String, Value>) {
    for (name, attr) in &schema.block.attributes {
        if !attr.flags.computed {
            continue;
        }
        let unset = !is_set(planned.get(name));
        if unset {
            if let Some(value) = prior.get(name).filter(|v| !v.is_null()) {
                planned.insert(name.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Block, NestedBlock};
    use serde_json::json;

    fn key_schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "type",
                Attribute::required_string()
                    .with_allowed_values(&["ingestion", "service"])
                    .with_force_new(),
            )
            .with_attribute("name", Attribute::optional_string())
            .with_attribute("key", Attribute::computed_string().sensitive())
            .with_attribute("id", Attribute::computed_string())
    }

    fn alert_schema() -> Schema {
        Schema::v0()
            .with_attribute("name", Attribute::required_string())
            .with_attribute("id", Attribute::computed_string())
            .with_block(
                "slack_channel",
                NestedBlock::list(
                    Block::new()
                        .with_attribute("url", Attribute::required_string())
                        .with_attribute("immediate", Attribute::optional_bool().with_default(json!(false)))
                        .with_attribute("terminal", Attribute::optional_bool().with_default(json!(true))),
                ),
            )
    }

    #[test]
    fn test_plan_create() {
        let result = plan(&key_schema(), None, json!({"type": "service", "name": "ci"}));

        assert!(!result.requires_replace);
        let paths: Vec<_> = result.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["name", "type"]);
        assert!(result.planned_state.get("id").is_none());
    }

    #[test]
    fn test_plan_fills_block_defaults() {
        let result = plan(
            &alert_schema(),
            None,
            json!({"name": "errors", "slack_channel": [{"url": "https://hooks.slack.com/x", "immediate": true}]}),
        );

        let channel = &result.planned_state["slack_channel"][0];
        assert_eq!(channel["immediate"], json!(true));
        assert_eq!(channel["terminal"], json!(true));
    }

    #[test]
    fn test_plan_update_carries_computed() {
        let prior = json!({"type": "service", "name": "ci", "key": "k-123", "id": "abc"});
        let result = plan(&key_schema(), Some(&prior), json!({"type": "service", "name": "deploy"}));

        assert_eq!(result.planned_state["id"], "abc");
        assert_eq!(result.planned_state["key"], "k-123");
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].path, "name");
        assert!(!result.requires_replace);
    }

    #[test]
    fn test_plan_force_new_requires_replace() {
        let prior = json!({"type": "service", "name": "ci", "id": "abc"});
        let result = plan(&key_schema(), Some(&prior), json!({"type": "ingestion", "name": "ci"}));

        assert!(result.requires_replace);
        assert_eq!(
            result.changes,
            vec![AttributeChange::modified("type", json!("service"), json!("ingestion"))]
        );
    }

    #[test]
    fn test_plan_no_changes_treats_empty_as_unset() {
        let schema = Schema::v0()
            .with_attribute("query", Attribute::optional_string())
            .with_attribute("apps", Attribute::optional_string_list())
            .with_attribute("id", Attribute::computed_string());
        let prior = json!({"query": "level:error", "apps": [], "id": "e1"});

        let result = plan(&schema, Some(&prior), json!({"query": "level:error", "apps": null}));
        assert!(!result.has_changes());
    }

    #[test]
    fn test_plan_ignores_unset_fields_inside_blocks() {
        let prior = json!({
            "name": "errors",
            "id": "p1",
            "slack_channel": [{"url": "https://a", "immediate": false, "terminal": true}]
        });
        let result = plan(
            &alert_schema(),
            Some(&prior),
            json!({"name": "errors", "slack_channel": [{"url": "https://a", "triggerinterval": null}]}),
        );
        assert!(!result.has_changes());
    }

    #[test]
    fn test_plan_removed_attribute() {
        let prior = json!({"type": "service", "name": "ci", "id": "abc"});
        let result = plan(&key_schema(), Some(&prior), json!({"type": "service"}));

        assert_eq!(
            result.changes,
            vec![AttributeChange::removed("name", json!("ci"))]
        );
    }

    #[test]
    fn test_plan_destroy() {
        let prior = json!({"type": "service", "name": "ci", "id": "abc"});
        let result = plan(&key_schema(), Some(&prior), Value::Null);

        assert!(result.planned_state.is_null());
        let paths: Vec<_> = result.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["id", "name", "type"]);
    }

    #[test]
    fn test_plan_block_change() {
        let prior = json!({
            "name": "errors",
            "id": "p1",
            "slack_channel": [{"url": "https://a", "immediate": false, "terminal": true}]
        });
        let result = plan(
            &alert_schema(),
            Some(&prior),
            json!({"name": "errors", "slack_channel": [{"url": "https://b"}]}),
        );

        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].path, "slack_channel");
        assert!(!result.requires_replace);
    }
}
