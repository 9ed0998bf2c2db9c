//! `logdna_view`: a saved search, optionally with alert channels.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::error::ProviderError;
use crate::resources::channels::{self, ChannelBlocks, ChannelRequest, ChannelResponse};
use crate::resources::wire::{decode_state, merge, segment, state_id};
use crate::resources::Resource;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation::conflicts_with;

const BASE_PATH: &str = "/v1/config/view";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ViewArgs {
    name: String,
    query: Option<String>,
    apps: Vec<String>,
    levels: Vec<String>,
    hosts: Vec<String>,
    tags: Vec<String>,
    categories: Vec<String>,
    presetid: Option<String>,
}

#[derive(Debug, Serialize)]
struct ViewRequest {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    apps: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    levels: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    hosts: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    category: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presetid: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    channels: Vec<ChannelRequest>,
}

impl ViewRequest {
    fn from_state(state: &Value) -> Result<Self, ProviderError> {
        let args: ViewArgs = decode_state(state)?;
        let blocks: ChannelBlocks = decode_state(state)?;
        Ok(Self {
            name: args.name,
            query: args.query.filter(|q| !q.is_empty()),
            apps: args.apps,
            levels: args.levels,
            hosts: args.hosts,
            tags: args.tags,
            category: args.categories,
            presetid: args.presetid.filter(|p| !p.is_empty()),
            channels: blocks.to_requests()?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ViewResponse {
    #[serde(rename = "viewID")]
    view_id: String,
    name: String,
    query: Option<String>,
    apps: Vec<String>,
    levels: Vec<String>,
    hosts: Vec<String>,
    tags: Vec<String>,
    category: Vec<Value>,
    presetid: Option<String>,
    presetids: Vec<String>,
    channels: Vec<ChannelResponse>,
}

impl ViewResponse {
    /// Categories come back either as names or as `{id, name}` objects.
    fn category_names(&self) -> Vec<String> {
        self.category
            .iter()
            .filter_map(|c| match c {
                Value::String(name) => Some(name.clone()),
                Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect()
    }

    fn to_state(&self, prior: &Value) -> Value {
        let presetid = self
            .presetid
            .clone()
            .or_else(|| self.presetids.first().cloned());

        let mut state = json!({
            "id": self.view_id,
            "name": self.name,
            "query": self.query,
            "apps": self.apps,
            "levels": self.levels,
            "hosts": self.hosts,
            "tags": self.tags,
            "categories": self.category_names(),
            "presetid": presetid,
        });
        if let Value::Object(map) = &mut state {
            map.extend(channels::channels_to_state(&self.channels, prior));
        }
        state
    }
}

/// Handler for `logdna_view`.
pub struct ViewResource;

#[async_trait]
impl Resource for ViewResource {
    fn type_name(&self) -> &'static str {
        "logdna_view"
    }

    fn schema(&self) -> Schema {
        let schema = Schema::v0()
            .with_description("A saved log view")
            .with_attribute("name", Attribute::required_string())
            .with_attribute("query", Attribute::optional_string())
            .with_attribute("apps", Attribute::optional_string_list())
            .with_attribute("levels", Attribute::optional_string_list())
            .with_attribute("hosts", Attribute::optional_string_list())
            .with_attribute("tags", Attribute::optional_string_list())
            .with_attribute("categories", Attribute::optional_string_list())
            .with_attribute(
                "presetid",
                Attribute::optional_string().with_description("Preset alert attached to the view"),
            )
            .with_attribute("id", Attribute::computed_string());
        channels::with_channel_blocks(schema, 0)
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = channels::validate_channels(config);
        diagnostics.extend(conflicts_with(config, "presetid", &channels::block_names()));
        diagnostics
    }

    async fn create(&self, client: &ApiClient, planned: &Value) -> Result<Value, ProviderError> {
        let request = ViewRequest::from_state(planned)?;
        let response: ViewResponse = client.post(BASE_PATH, &request).await?;
        if response.view_id.is_empty() {
            return Err(ProviderError::Api {
                status: 200,
                message: "view create response has no viewID".to_string(),
            });
        }
        Ok(merge(planned, json!({ "id": response.view_id })))
    }

    async fn read(&self, client: &ApiClient, state: &Value) -> Result<Value, ProviderError> {
        let id = state_id(state)?;
        let response: ViewResponse = client
            .get(&format!("{}/{}", BASE_PATH, segment(&id)))
            .await?;
        Ok(response.to_state(state))
    }

    async fn update(
        &self,
        client: &ApiClient,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let id = state_id(prior)?;
        let request = ViewRequest::from_state(planned)?;
        let _: Value = client
            .put(&format!("{}/{}", BASE_PATH, segment(&id)), &request)
            .await?;
        Ok(merge(planned, json!({ "id": id })))
    }

    async fn delete(&self, client: &ApiClient, state: &Value) -> Result<(), ProviderError> {
        let id = state_id(state)?;
        client.delete(&format!("{}/{}", BASE_PATH, segment(&id))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;

    #[test]
    fn test_request_from_state() {
        let state = json!({
            "name": "Errors",
            "query": "level:error",
            "apps": ["api"],
            "levels": null,
            "categories": ["Production"],
            "email_channel": [{"emails": ["ops@example.com"], "triggerlimit": 15}]
        });
        let request = serde_json::to_value(ViewRequest::from_state(&state).unwrap()).unwrap();

        assert_eq!(request["name"], "Errors");
        assert_eq!(request["category"], json!(["Production"]));
        assert!(request.get("levels").is_none());
        assert!(request.get("presetid").is_none());
        assert_eq!(request["channels"][0]["integration"], "email");
        assert_eq!(request["channels"][0]["terminal"], "true");
    }

    #[test]
    fn test_response_to_state() {
        let response: ViewResponse = serde_json::from_value(json!({
            "viewID": "5c4d3",
            "name": "Errors",
            "query": "level:error",
            "apps": ["api"],
            "levels": [],
            "category": [{"id": "c1", "name": "Production"}],
            "presetids": ["p9"],
            "channels": [{"integration": "slack", "url": "https://hooks.slack.com/x", "triggerlimit": 3,
                          "immediate": true, "terminal": false, "operator": "presence"}]
        }))
        .unwrap();

        let state = response.to_state(&json!({"id": "5c4d3"}));
        assert_eq!(state["id"], "5c4d3");
        assert_eq!(state["categories"], json!(["Production"]));
        assert_eq!(state["hosts"], json!([]));
        assert_eq!(state["presetid"], "p9");
        assert_eq!(state["slack_channel"][0]["url"], "https://hooks.slack.com/x");
        assert_eq!(state["email_channel"], json!([]));
    }

    #[test]
    fn test_presetid_conflicts_with_channels() {
        let config = json!({
            "name": "Errors",
            "presetid": "p9",
            "slack_channel": [{"url": "https://hooks.slack.com/x", "triggerlimit": 1}]
        });
        let resource = ViewResource;
        assert!(validate(&resource.schema(), &config).is_empty());

        let diagnostics = resource.validate(&config);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "'presetid' conflicts with 'slack_channel'");

        assert!(resource.validate(&json!({"name": "Errors", "presetid": "p9"})).is_empty());
    }
}
