//! `logdna_alert`: a preset alert that views can attach to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::error::ProviderError;
use crate::resources::channels::{self, ChannelBlocks, ChannelRequest, ChannelResponse};
use crate::resources::wire::{decode_state, merge, segment, state_id};
use crate::resources::Resource;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation::require_any;

const BASE_PATH: &str = "/v1/config/presetalert";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AlertArgs {
    name: String,
}

#[derive(Debug, Serialize)]
struct AlertRequest {
    name: String,
    channels: Vec<ChannelRequest>,
}

impl AlertRequest {
    fn from_state(state: &Value) -> Result<Self, ProviderError> {
        let args: AlertArgs = decode_state(state)?;
        let blocks: ChannelBlocks = decode_state(state)?;
        if blocks.is_empty() {
            return Err(ProviderError::Validation(
                "a preset alert needs at least one channel".to_string(),
            ));
        }
        Ok(Self {
            name: args.name,
            channels: blocks.to_requests()?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AlertResponse {
    presetid: String,
    name: String,
    channels: Vec<ChannelResponse>,
}

impl AlertResponse {
    fn to_state(&self, prior: &Value) -> Value {
        let mut state = json!({
            "id": self.presetid,
            "name": self.name,
        });
        if let Value::Object(map) = &mut state {
            map.extend(channels::channels_to_state(&self.channels, prior));
        }
        state
    }
}

/// Handler for `logdna_alert`.
pub struct AlertResource;

#[async_trait]
impl Resource for AlertResource {
    fn type_name(&self) -> &'static str {
        "logdna_alert"
    }

    fn schema(&self) -> Schema {
        let schema = Schema::v0()
            .with_description("A preset alert")
            .with_attribute("name", Attribute::required_string())
            .with_attribute("id", Attribute::computed_string());
        channels::with_channel_blocks(schema, 0)
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = channels::validate_channels(config);
        diagnostics.extend(require_any(config, &channels::block_names()));
        diagnostics
    }

    async fn create(&self, client: &ApiClient, planned: &Value) -> Result<Value, ProviderError> {
        let request = AlertRequest::from_state(planned)?;
        let response: AlertResponse = client.post(BASE_PATH, &request).await?;
        if response.presetid.is_empty() {
            return Err(ProviderError::Api {
                status: 200,
                message: "preset alert create response has no presetid".to_string(),
            });
        }
        Ok(merge(planned, json!({ "id": response.presetid })))
    }

    async fn read(&self, client: &ApiClient, state: &Value) -> Result<Value, ProviderError> {
        let id = state_id(state)?;
        let response: AlertResponse = client
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
        let request = AlertRequest::from_state(planned)?;
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

    #[test]
    fn test_alert_requires_a_channel() {
        let resource = AlertResource;
        let diagnostics = resource.validate(&json!({"name": "Errors"}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.starts_with("One of email_channel"));

        assert!(matches!(
            AlertRequest::from_state(&json!({"name": "Errors"})),
            Err(ProviderError::Validation(_))
        ));
    }

    #[test]
    fn test_request_from_state() {
        let state = json!({
            "name": "Errors",
            "pagerduty_channel": [{"key": "pd-key", "triggerlimit": 1, "autoresolve": true,
                                   "autoresolvelimit": 10, "autoresolveinterval": "15m"}]
        });
        let request = serde_json::to_value(AlertRequest::from_state(&state).unwrap()).unwrap();

        assert_eq!(
            request,
            json!({
                "name": "Errors",
                "channels": [{
                    "integration": "pagerduty",
                    "key": "pd-key",
                    "triggerlimit": 1,
                    "immediate": "false",
                    "terminal": "true",
                    "autoresolve": true,
                    "autoresolveinterval": "15m",
                    "autoresolvelimit": 10
                }]
            })
        );
    }

    #[test]
    fn test_response_to_state() {
        let response: AlertResponse = serde_json::from_value(json!({
            "presetid": "p1",
            "name": "Errors",
            "channels": [{"integration": "email", "emails": ["ops@example.com"], "triggerlimit": 15,
                          "immediate": false, "terminal": true}]
        }))
        .unwrap();

        let state = response.to_state(&json!({"id": "p1"}));
        assert_eq!(state["id"], "p1");
        assert_eq!(state["email_channel"][0]["emails"], json!(["ops@example.com"]));
        assert_eq!(state["webhook_channel"], json!([]));
    }
}
