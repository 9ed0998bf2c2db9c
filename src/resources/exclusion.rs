//! `logdna_stream_exclusion` and `logdna_ingestion_exclusion`.
//!
//! Both are lists of rules matching lines by app, host or query. They share
//! one handler; ingestion rules additionally support `indexonly`, which keeps
//! matched lines searchable in live tail but drops them from the index.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::error::ProviderError;
use crate::resources::wire::{decode_state, lenient_bool, merge, segment, state_id};
use crate::resources::Resource;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation::require_any;

const MATCHERS: &[&str] = &["apps", "hosts", "query"];

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ExclusionArgs {
    title: Option<String>,
    active: bool,
    indexonly: bool,
    apps: Vec<String>,
    hosts: Vec<String>,
    query: Option<String>,
}

impl Default for ExclusionArgs {
    fn default() -> Self {
        Self {
            title: None,
            active: true,
            indexonly: false,
            apps: Vec::new(),
            hosts: Vec::new(),
            query: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ExclusionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    indexonly: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    apps: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    hosts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExclusionResponse {
    id: String,
    title: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    active: bool,
    #[serde(deserialize_with = "lenient_bool")]
    indexonly: bool,
    apps: Vec<String>,
    hosts: Vec<String>,
    query: Option<String>,
}

/// Handler for one kind of exclusion rule.
pub struct ExclusionResource {
    type_name: &'static str,
    base_path: &'static str,
    index_only: bool,
}

impl ExclusionResource {
    /// Rules applied to the Kafka stream.
    pub fn stream() -> Self {
        Self {
            type_name: "logdna_stream_exclusion",
            base_path: "/v1/config/stream/exclusions",
            index_only: false,
        }
    }

    /// Rules applied at ingestion.
    pub fn ingestion() -> Self {
        Self {
            type_name: "logdna_ingestion_exclusion",
            base_path: "/v1/config/ingestion/exclusions",
            index_only: true,
        }
    }

    fn item_path(&self, id: &str) -> String {
        format!("{}/{}", self.base_path, segment(id))
    }

    fn request(&self, state: &Value) -> Result<ExclusionRequest, ProviderError> {
        let args: ExclusionArgs = decode_state(state)?;
        Ok(ExclusionRequest {
            title: args.title.filter(|t| !t.is_empty()),
            active: args.active,
            indexonly: self.index_only.then_some(args.indexonly),
            apps: args.apps,
            hosts: args.hosts,
            query: args.query.filter(|q| !q.is_empty()),
        })
    }

    fn state(&self, response: ExclusionResponse) -> Value {
        let mut state = json!({
            "id": response.id,
            "title": response.title,
            "active": response.active,
            "apps": response.apps,
            "hosts": response.hosts,
            "query": response.query,
        });
        if self.index_only {
            state["indexonly"] = json!(response.indexonly);
        }
        state
    }
}

#[async_trait]
impl Resource for ExclusionResource {
    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn schema(&self) -> Schema {
        let schema = Schema::v0()
            .with_attribute("title", Attribute::optional_string())
            .with_attribute("active", Attribute::optional_bool().with_default(json!(true)))
            .with_attribute("apps", Attribute::optional_string_list())
            .with_attribute("hosts", Attribute::optional_string_list())
            .with_attribute("query", Attribute::optional_string())
            .with_attribute("id", Attribute::computed_string());

        if self.index_only {
            schema
                .with_description("A rule excluding matching lines at ingestion")
                .with_attribute(
                    "indexonly",
                    Attribute::optional_bool()
                        .with_default(json!(false))
                        .with_description("Keep matched lines in live tail but out of the index"),
                )
        } else {
            schema.with_description("A rule excluding matching lines from the stream")
        }
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        require_any(config, MATCHERS).into_iter().collect()
    }

    async fn create(&self, client: &ApiClient, planned: &Value) -> Result<Value, ProviderError> {
        let request = self.request(planned)?;
        let response: ExclusionResponse = client.post(self.base_path, &request).await?;
        if response.id.is_empty() {
            return Err(ProviderError::Api {
                status: 200,
                message: format!("{} create response has no id", self.type_name),
            });
        }
        Ok(merge(planned, json!({ "id": response.id })))
    }

    async fn read(&self, client: &ApiClient, state: &Value) -> Result<Value, ProviderError> {
        let id = state_id(state)?;
        let mut response: ExclusionResponse = client.get(&self.item_path(&id)).await?;
        if response.id.is_empty() {
            response.id = id;
        }
        Ok(self.state(response))
    }

    async fn update(
        &self,
        client: &ApiClient,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let id = state_id(prior)?;
        let request = self.request(planned)?;
        let _: Value = client
            .send(Method::PATCH, &self.item_path(&id), Some(&request))
            .await?;
        Ok(merge(planned, json!({ "id": id })))
    }

    async fn delete(&self, client: &ApiClient, state: &Value) -> Result<(), ProviderError> {
        let id = state_id(state)?;
        client.delete(&self.item_path(&id)).await
    }
}
