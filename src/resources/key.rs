//! `logdna_key`: an ingestion or service key.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::error::ProviderError;
use crate::resources::wire::{decode_state, merge, segment, state_id};
use crate::resources::Resource;
use crate::schema::{Attribute, Schema};

const BASE_PATH: &str = "/v1/config/keys";
const KEY_TYPES: &[&str] = &["ingestion", "service"];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct KeyArgs {
    #[serde(rename = "type")]
    key_type: String,
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct KeyRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl From<KeyArgs> for KeyRequest {
    fn from(args: KeyArgs) -> Self {
        Self {
            name: args.name.filter(|n| !n.is_empty()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct KeyResponse {
    id: String,
    key: Option<String>,
    name: Option<String>,
    #[serde(rename = "type")]
    key_type: Option<String>,
    created: Option<i64>,
}

/// Handler for `logdna_key`.
pub struct KeyResource;

#[async_trait]
impl Resource for KeyResource {
    fn type_name(&self) -> &'static str {
        "logdna_key"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("An ingestion or service key")
            .with_attribute(
                "type",
                Attribute::required_string()
                    .with_allowed_values(KEY_TYPES)
                    .with_force_new(),
            )
            .with_attribute("name", Attribute::optional_string())
            .with_attribute("key", Attribute::computed_string().sensitive())
            .with_attribute(
                "created",
                Attribute::computed_int64().with_description("Creation time, seconds since the epoch"),
            )
            .with_attribute("id", Attribute::computed_string())
    }

    async fn create(&self, client: &ApiClient, planned: &Value) -> Result<Value, ProviderError> {
        let args: KeyArgs = decode_state(planned)?;
        let path = format!("{}?type={}", BASE_PATH, segment(&args.key_type));
        let response: KeyResponse = client.post(&path, &KeyRequest::from(args)).await?;
        if response.id.is_empty() {
            return Err(ProviderError::Api {
                status: 200,
                message: "key create response has no id".to_string(),
            });
        }
        Ok(merge(
            planned,
            json!({
                "id": response.id,
                "key": response.key,
                "created": response.created,
            }),
        ))
    }

    async fn read(&self, client: &ApiClient, state: &Value) -> Result<Value, ProviderError> {
        let id = state_id(state)?;
        let args: KeyArgs = decode_state(state)?;
        let response: KeyResponse = client
            .get(&format!("{}/{}", BASE_PATH, segment(&id)))
            .await?;

        let key = response
            .key
            .map(Value::String)
            .or_else(|| state.get("key").cloned())
            .unwrap_or(Value::Null);
        Ok(json!({
            "id": id,
            "type": response.key_type.unwrap_or(args.key_type),
            "name": response.name,
            "key": key,
            "created": response.created,
        }))
    }

    async fn update(
        &self,
        client: &ApiClient,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let id = state_id(prior)?;
        let args: KeyArgs = decode_state(planned)?;
        let _: Value = client
            .put(&format!("{}/{}", BASE_PATH, segment(&id)), &KeyRequest::from(args))
            .await?;
        Ok(merge(planned, json!({ "id": id })))
    }

    async fn delete(&self, client: &ApiClient, state: &Value) -> Result<(), ProviderError> {
        let id = state_id(state)?;
        client.delete(&format!("{}/{}", BASE_PATH, segment(&id))).await
    }
}
