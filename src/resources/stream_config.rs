//! `logdna_stream_config`: the account's Kafka streaming target.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::error::ProviderError;
use crate::resources::wire::{decode_state, merge};
use crate::resources::Resource;
use crate::schema::{Attribute, Schema};

const PATH: &str = "/v1/config/stream";

/// There is one stream configuration per account.
const STREAM_ID: &str = "stream";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StreamConfigArgs {
    brokers: Vec<String>,
    topic: String,
    user: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct StreamConfigRequest<'a> {
    brokers: &'a [String],
    topic: &'a str,
    user: &'a str,
    password: &'a str,
}

impl<'a> From<&'a StreamConfigArgs> for StreamConfigRequest<'a> {
    fn from(args: &'a StreamConfigArgs) -> Self {
        Self {
            brokers: &args.brokers,
            topic: &args.topic,
            user: &args.user,
            password: &args.password,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StreamConfigResponse {
    status: Option<String>,
    brokers: Vec<String>,
    topic: String,
    user: String,
}

/// Handler for `logdna_stream_config`.
pub struct StreamConfigResource;

impl StreamConfigResource {
    async fn write(
        &self,
        client: &ApiClient,
        method: reqwest::Method,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let args: StreamConfigArgs = decode_state(planned)?;
        let request = StreamConfigRequest::from(&args);
        let response: StreamConfigResponse = client.send(method, PATH, Some(&request)).await?;
        Ok(merge(
            planned,
            json!({ "id": STREAM_ID, "status": response.status }),
        ))
    }
}

#[async_trait]
impl Resource for StreamConfigResource {
    fn type_name(&self) -> &'static str {
        "logdna_stream_config"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Streaming of log lines to a Kafka cluster")
            .with_attribute("brokers", Attribute::required_string_list())
            .with_attribute("topic", Attribute::required_string())
            .with_attribute("user", Attribute::required_string())
            .with_attribute("password", Attribute::required_string().sensitive())
            .with_attribute(
                "status",
                Attribute::computed_string().with_description("Stream health as reported by the API"),
            )
            .with_attribute("id", Attribute::computed_string())
    }

    async fn create(&self, client: &ApiClient, planned: &Value) -> Result<Value, ProviderError> {
        self.write(client, reqwest::Method::POST, planned).await
    }

    async fn read(&self, client: &ApiClient, state: &Value) -> Result<Value, ProviderError> {
        let response: StreamConfigResponse = client.get(PATH).await?;
        Ok(json!({
            "id": STREAM_ID,
            "brokers": response.brokers,
            "topic": response.topic,
            "user": response.user,
            "password": state.get("password").cloned().unwrap_or(Value::Null),
            "status": response.status,
        }))
    }

    async fn update(
        &self,
        client: &ApiClient,
        _prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        self.write(client, reqwest::Method::PUT, planned).await
    }

    async fn delete(&self, client: &ApiClient, _state: &Value) -> Result<(), ProviderError> {
        client.delete(PATH).await
    }

    fn import_state(&self, _id: &str) -> Result<Value, ProviderError> {
        Ok(json!({ "id": STREAM_ID }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_state() {
        let args: StreamConfigArgs = decode_state(&json!({
            "brokers": ["kafka-1:9093", "kafka-2:9093"],
            "topic": "logs",
            "user": "logdna",
            "password": "hunter2",
            "status": "active"
        }))
        .unwrap();
        let request = serde_json::to_value(StreamConfigRequest::from(&args)).unwrap();
        assert_eq!(
            request,
            json!({
                "brokers": ["kafka-1:9093", "kafka-2:9093"],
                "topic": "logs",
                "user": "logdna",
                "password": "hunter2"
            })
        );
    }

    #[test]
    fn test_import_ignores_id() {
        assert_eq!(
            StreamConfigResource.import_state("anything").unwrap(),
            json!({"id": "stream"})
        );
    }

    #[test]
    fn test_password_is_sensitive() {
        let schema = StreamConfigResource.schema();
        assert!(schema.attribute("password").unwrap().flags.sensitive);
        assert!(schema.attribute("status").unwrap().flags.is_computed_only());
    }
}
