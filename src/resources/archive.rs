//! `logdna_archive`: the account's single archiving target.
//!
//! Each integration needs its own set of fields; the API rejects a
//! configuration missing any of them, so the same table drives validation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::error::ProviderError;
use crate::resources::wire::{decode_state, merge};
use crate::resources::Resource;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation::is_set;

const PATH: &str = "/v1/config/archiving";

const INTEGRATIONS: &[&str] = &["ibm", "s3", "azblob", "gcs", "dos", "swift"];

/// Secrets the API does not return.
const WRITE_ONLY: &[&str] = &["apikey", "accountkey", "secretkey", "password"];

fn required_fields(integration: &str) -> &'static [&'static str] {
    match integration {
        "ibm" => &["bucket", "endpoint", "apikey", "resourceinstanceid"],
        "s3" => &["bucket"],
        "azblob" => &["accountname", "accountkey"],
        "gcs" => &["bucket", "projectid"],
        "dos" => &["space", "endpoint", "accesskey", "secretkey"],
        "swift" => &["authurl", "expires", "username", "password", "tenantname"],
        _ => &[],
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ArchiveArgs {
    integration: String,
    bucket: Option<String>,
    endpoint: Option<String>,
    apikey: Option<String>,
    resourceinstanceid: Option<String>,
    accountname: Option<String>,
    accountkey: Option<String>,
    projectid: Option<String>,
    space: Option<String>,
    accesskey: Option<String>,
    secretkey: Option<String>,
    authurl: Option<String>,
    expires: Option<i64>,
    username: Option<String>,
    password: Option<String>,
    tenantname: Option<String>,
}

#[derive(Debug, Serialize)]
struct ArchiveRequest<'a> {
    integration: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    bucket: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    apikey: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resourceinstanceid: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    accountname: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    accountkey: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    projectid: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    space: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    accesskey: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    secretkey: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    authurl: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tenantname: Option<&'a str>,
}

impl<'a> From<&'a ArchiveArgs> for ArchiveRequest<'a> {
    fn from(args: &'a ArchiveArgs) -> Self {
        Self {
            integration: &args.integration,
            bucket: field(&args.bucket),
            endpoint: field(&args.endpoint),
            apikey: field(&args.apikey),
            resourceinstanceid: field(&args.resourceinstanceid),
            accountname: field(&args.accountname),
            accountkey: field(&args.accountkey),
            projectid: field(&args.projectid),
            space: field(&args.space),
            accesskey: field(&args.accesskey),
            secretkey: field(&args.secretkey),
            authurl: field(&args.authurl),
            expires: args.expires,
            username: field(&args.username),
            password: field(&args.password),
            tenantname: field(&args.tenantname),
        }
    }
}

fn field(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ArchiveResponse {
    integration: String,
    bucket: Option<String>,
    endpoint: Option<String>,
    resourceinstanceid: Option<String>,
    accountname: Option<String>,
    projectid: Option<String>,
    space: Option<String>,
    accesskey: Option<String>,
    authurl: Option<String>,
    expires: Option<i64>,
    username: Option<String>,
    tenantname: Option<String>,
}

impl ArchiveResponse {
    fn to_state(&self, prior: &Value) -> Value {
        let mut state = json!({
            "id": self.integration,
            "integration": self.integration,
            "bucket": self.bucket,
            "endpoint": self.endpoint,
            "resourceinstanceid": self.resourceinstanceid,
            "accountname": self.accountname,
            "projectid": self.projectid,
            "space": self.space,
            "accesskey": self.accesskey,
            "authurl": self.authurl,
            "expires": self.expires,
            "username": self.username,
            "tenantname": self.tenantname,
        });
        if let Value::Object(map) = &mut state {
            for name in WRITE_ONLY {
                let value = prior.get(*name).cloned().unwrap_or(Value::Null);
                map.insert(name.to_string(), value);
            }
        }
        state
    }
}

/// Handler for `logdna_archive`.
pub struct ArchiveResource;

impl ArchiveResource {
    async fn write(
        &self,
        client: &ApiClient,
        method: reqwest::Method,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let args: ArchiveArgs = decode_state(planned)?;
        let request = ArchiveRequest::from(&args);
        let _: Value = client.send(method, PATH, Some(&request)).await?;
        Ok(merge(planned, json!({ "id": args.integration })))
    }
}

#[async_trait]
impl Resource for ArchiveResource {
    fn type_name(&self) -> &'static str {
        "logdna_archive"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Archiving configuration for the account")
            .with_attribute(
                "integration",
                Attribute::required_string().with_allowed_values(INTEGRATIONS),
            )
            .with_attribute("bucket", Attribute::optional_string())
            .with_attribute("endpoint", Attribute::optional_string())
            .with_attribute("apikey", Attribute::optional_string().sensitive())
            .with_attribute("resourceinstanceid", Attribute::optional_string())
            .with_attribute("accountname", Attribute::optional_string())
            .with_attribute("accountkey", Attribute::optional_string().sensitive())
            .with_attribute("projectid", Attribute::optional_string())
            .with_attribute("space", Attribute::optional_string())
            .with_attribute("accesskey", Attribute::optional_string())
            .with_attribute("secretkey", Attribute::optional_string().sensitive())
            .with_attribute("authurl", Attribute::optional_string())
            .with_attribute(
                "expires",
                Attribute::optional_int64().with_description("Swift object expiry in seconds"),
            )
            .with_attribute("username", Attribute::optional_string())
            .with_attribute("password", Attribute::optional_string().sensitive())
            .with_attribute("tenantname", Attribute::optional_string())
            .with_attribute("id", Attribute::computed_string())
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let Some(integration) = config.get("integration").and_then(Value::as_str) else {
            return Vec::new();
        };
        required_fields(integration)
            .iter()
            .filter(|name| !is_set(config.get(**name)))
            .map(|name| {
                Diagnostic::error(format!(
                    "'{}' is required for the {} integration",
                    name, integration
                ))
                .with_attribute(*name)
            })
            .collect()
    }

    async fn create(&self, client: &ApiClient, planned: &Value) -> Result<Value, ProviderError> {
        self.write(client, reqwest::Method::POST, planned).await
    }

    async fn read(&self, client: &ApiClient, state: &Value) -> Result<Value, ProviderError> {
        let response: ArchiveResponse = client.get(PATH).await?;
        if response.integration.is_empty() {
            return Err(ProviderError::NotFound(
                "archiving is not configured".to_string(),
            ));
        }
        Ok(response.to_state(state))
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

    fn import_state(&self, id: &str) -> Result<Value, ProviderError> {
        if !INTEGRATIONS.contains(&id) {
            return Err(ProviderError::InvalidRequest(format!(
                "invalid archive import id \"{}\", expected one of {}",
                id,
                INTEGRATIONS.join(", ")
            )));
        }
        Ok(json!({ "id": id, "integration": id }))
    }
}
