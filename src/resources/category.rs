//! `logdna_category`: a named category of views, boards or screens.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::error::ProviderError;
use crate::resources::wire::{decode_state, merge, segment, state_id};
use crate::resources::Resource;
use crate::schema::{Attribute, Schema};

const BASE_PATH: &str = "/v1/config/categories";
const CATEGORY_TYPES: &[&str] = &["views", "boards", "screens"];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CategoryArgs {
    #[serde(rename = "type")]
    category_type: String,
    name: String,
}

impl CategoryArgs {
    fn collection_path(&self) -> Result<String, ProviderError> {
        if self.category_type.is_empty() {
            return Err(ProviderError::InvalidRequest(
                "category state has no type".to_string(),
            ));
        }
        Ok(format!("{}/{}", BASE_PATH, segment(&self.category_type)))
    }
}

#[derive(Debug, Serialize)]
struct CategoryRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CategoryResponse {
    id: String,
    name: String,
    #[serde(rename = "type")]
    category_type: Option<String>,
}

/// Handler for `logdna_category`.
pub struct CategoryResource;

#[async_trait]
impl Resource for CategoryResource {
    fn type_name(&self) -> &'static str {
        "logdna_category"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A category used to group views, boards or screens")
            .with_attribute(
                "type",
                Attribute::required_string()
                    .with_allowed_values(CATEGORY_TYPES)
                    .with_force_new(),
            )
            .with_attribute("name", Attribute::required_string())
            .with_attribute("id", Attribute::computed_string())
    }

    async fn create(&self, client: &ApiClient, planned: &Value) -> Result<Value, ProviderError> {
        let args: CategoryArgs = decode_state(planned)?;
        let request = CategoryRequest { name: &args.name };
        let response: CategoryResponse = client.post(&args.collection_path()?, &request).await?;
        if response.id.is_empty() {
            return Err(ProviderError::Api {
                status: 200,
                message: "category create response has no id".to_string(),
            });
        }
        Ok(merge(planned, json!({ "id": response.id })))
    }

    async fn read(&self, client: &ApiClient, state: &Value) -> Result<Value, ProviderError> {
        let id = state_id(state)?;
        let args: CategoryArgs = decode_state(state)?;
        let response: CategoryResponse = client
            .get(&format!("{}/{}", args.collection_path()?, segment(&id)))
            .await?;

        Ok(json!({
            "id": id,
            "type": response.category_type.unwrap_or(args.category_type),
            "name": response.name,
        }))
    }

    async fn update(
        &self,
        client: &ApiClient,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let id = state_id(prior)?;
        let args: CategoryArgs = decode_state(planned)?;
        let request = CategoryRequest { name: &args.name };
        let _: Value = client
            .put(&format!("{}/{}", args.collection_path()?, segment(&id)), &request)
            .await?;
        Ok(merge(planned, json!({ "id": id })))
    }

    async fn delete(&self, client: &ApiClient, state: &Value) -> Result<(), ProviderError> {
        let id = state_id(state)?;
        let args: CategoryArgs = decode_state(state)?;
        client
            .delete(&format!("{}/{}", args.collection_path()?, segment(&id)))
            .await
    }

    /// Import ids have the form `<type>:<id>`, e.g. `views:5f1a`.
    fn import_state(&self, id: &str) -> Result<Value, ProviderError> {
        match id.split_once(':') {
            Some((category_type, category_id))
                if CATEGORY_TYPES.contains(&category_type) && !category_id.is_empty() =>
            {
                Ok(json!({ "type": category_type, "id": category_id }))
            }
            _ => Err(ProviderError::InvalidRequest(format!(
                "invalid category import id \"{}\", expected <type>:<id> with type one of {}",
                id,
                CATEGORY_TYPES.join(", ")
            ))),
        }
    }
}
