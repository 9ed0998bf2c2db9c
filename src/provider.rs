//! The LogDNA provider: resource registration and CRUD dispatch.

use std::collections::BTreeMap;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::config::{OrgType, ProviderConfig};
use crate::error::ProviderError;
use crate::guard::check_org_type;
use crate::plan;
use crate::resources::{self, Resource};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation;

/// State established by `Configure`.
#[derive(Debug, Clone)]
struct Session {
    client: ApiClient,
    org_type: OrgType,
}

/// Provider serving every `logdna_*` resource.
pub struct LogdnaProvider {
    resources: BTreeMap<&'static str, Box<dyn Resource>>,
    session: RwLock<Option<Session>>,
}

impl Default for LogdnaProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LogdnaProvider {
    /// Create an unconfigured provider with every resource registered.
    pub fn new() -> Self {
        let resources = resources::all()
            .into_iter()
            .map(|r| (r.type_name(), r))
            .collect();
        Self {
            resources,
            session: RwLock::new(None),
        }
    }

    /// Configure from an already resolved configuration.
    pub async fn configure_with(&self, config: &ProviderConfig) -> Result<(), ProviderError> {
        let client = ApiClient::new(config)?;
        info!(url = %config.url, org_type = %config.org_type, "Provider configured");
        *self.session.write().await = Some(Session {
            client,
            org_type: config.org_type,
        });
        Ok(())
    }

    fn resource(&self, resource_type: &str) -> Result<&dyn Resource, ProviderError> {
        self.resources
            .get(resource_type)
            .map(|r| r.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    /// Look up the handler and a client allowed to operate it.
    async fn session_for(
        &self,
        resource_type: &str,
    ) -> Result<(&dyn Resource, ApiClient), ProviderError> {
        let resource = self.resource(resource_type)?;
        let session = self
            .session
            .read()
            .await
            .clone()
            .ok_or_else(|| ProviderError::Configuration("provider not configured".to_string()))?;
        check_org_type(session.org_type, resource.org_type(), resource_type)?;
        Ok((resource, session.client))
    }
}

#[async_trait::async_trait]
impl ProviderService for LogdnaProvider {
    fn schema(&self) -> ProviderSchema {
        self.resources.values().fold(
            ProviderSchema::new().with_provider_config(ProviderConfig::schema()),
            |schema, resource| schema.with_resource(resource.type_name(), resource.schema()),
        )
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(ProviderConfig::from_value(&config).err().unwrap_or_default())
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        match ProviderConfig::from_value(&config) {
            Ok(config) => {
                self.configure_with(&config).await?;
                Ok(vec![])
            }
            Err(diagnostics) => Ok(diagnostics),
        }
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let mut diagnostics = validation::validate(&resource.schema(), &config);
        diagnostics.extend(resource.validate(&config));
        Ok(diagnostics)
    }

    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let current = self.resource(resource_type)?.schema().version;
        if version < 0 || version as u64 > current {
            return Err(ProviderError::InvalidRequest(format!(
                "cannot upgrade {} state from schema version {} (current version is {})",
                resource_type, version, current
            )));
        }
        Ok(state)
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        Ok(plan::plan(
            &resource.schema(),
            prior_state.as_ref(),
            proposed_state,
        ))
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let (resource, client) = self.session_for(resource_type).await?;
        let state = resource.create(&client, &planned_state).await?;
        info!(resource_type, id = ?state.get("id"), "Created");
        Ok(state)
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let (resource, client) = self.session_for(resource_type).await?;
        match resource.read(&client, &current_state).await {
            Err(e) if e.is_not_found() => {
                warn!(resource_type, id = ?current_state.get("id"), "Remote object is gone");
                Ok(Value::Null)
            }
            other => other,
        }
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let (resource, client) = self.session_for(resource_type).await?;
        resource.update(&client, &prior_state, &planned_state).await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let (resource, client) = self.session_for(resource_type).await?;
        match resource.delete(&client, &current_state).await {
            Err(e) if e.is_not_found() => {
                debug!(resource_type, "Already deleted");
                Ok(())
            }
            other => other,
        }
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let (resource, client) = self.session_for(resource_type).await?;
        let seed = resource.import_state(id)?;
        let state = resource.read(&client, &seed).await?;
        Ok(vec![ImportedResource::new(resource_type, state)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_lists_every_resource() {
        let provider = LogdnaProvider::new();
        let schema = provider.schema();
        assert_eq!(schema.resources.len(), 10);
        assert!(schema.provider.attribute("servicekey").unwrap().flags.sensitive);

        let metadata = provider.metadata();
        assert_eq!(metadata.resources.first().map(String::as_str), Some("logdna_alert"));
        assert!(metadata.plan_destroy);
    }

    #[tokio::test]
    async fn test_crud_requires_configure() {
        let provider = LogdnaProvider::new();
        let err = provider
            .create("logdna_view", json!({"name": "Errors"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_unknown_resource() {
        let provider = LogdnaProvider::new();
        let err = provider
            .validate_resource_config("logdna_board", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_guard_runs_before_request() {
        let provider = LogdnaProvider::new();
        provider
            .configure_with(&ProviderConfig::new("key", OrgType::Regular).with_url("http://127.0.0.1:9"))
            .await
            .unwrap();

        let err = provider
            .read("logdna_child_organization", json!({"id": "acct"}))
            .await
            .unwrap_err();
        assert_eq!(
            err.message(),
            "Only enterprise organizations can instantiate a \"logdna_child_organization\" resource"
        );
    }

    #[test]
    fn test_validate_combines_schema_and_resource_rules() {
        let provider = LogdnaProvider::new();
        let diagnostics = tokio_test::block_on(
            provider.validate_resource_config("logdna_stream_exclusion", json!({"active": "yes"})),
        )
        .unwrap();

        let summaries: Vec<_> = diagnostics.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(
            summaries,
            vec![
                "Invalid type for attribute 'active'",
                "One of apps, hosts, query must be set"
            ]
        );
    }

    #[test]
    fn test_upgrade_rejects_future_versions() {
        let provider = LogdnaProvider::new();
        let state = json!({"id": "v1"});
        assert_eq!(
            tokio_test::block_on(provider.upgrade_resource_state("logdna_view", 0, state.clone()))
                .unwrap(),
            state
        );
        assert!(tokio_test::block_on(provider.upgrade_resource_state("logdna_view", 3, state)).is_err());
    }
}
