//! LogDNA resource handlers.
//!
//! Each handler maps one declarative resource onto the configuration API:
//! it reads declared fields out of the state JSON, builds the request type,
//! makes a single call through [`ApiClient`] and writes the response type
//! back into state. Request and response types are kept separate because
//! the API accepts different shapes than it returns.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::config::OrgType;
use crate::error::ProviderError;
use crate::schema::{Diagnostic, Schema};

pub mod alert;
pub mod archive;
pub mod category;
pub mod channels;
pub mod child_organization;
pub mod exclusion;
pub mod key;
pub mod member;
pub mod stream_config;
pub mod view;
pub mod wire;

/// CRUD handler for one resource type.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Resource type name, e.g. `logdna_view`.
    fn type_name(&self) -> &'static str;

    /// Static schema declaration.
    fn schema(&self) -> Schema;

    /// Organization type this resource can be used with.
    fn org_type(&self) -> OrgType {
        OrgType::Regular
    }

    /// Cross-field rules that the schema cannot express.
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let _ = config;
        Vec::new()
    }

    /// Create the remote object and return the new state.
    async fn create(&self, client: &ApiClient, planned: &Value) -> Result<Value, ProviderError>;

    /// Refresh state from the remote object.
    async fn read(&self, client: &ApiClient, state: &Value) -> Result<Value, ProviderError>;

    /// Update the remote object in place and return the new state.
    async fn update(
        &self,
        client: &ApiClient,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError>;

    /// Delete the remote object.
    async fn delete(&self, client: &ApiClient, state: &Value) -> Result<(), ProviderError>;

    /// Minimal state from which [`Resource::read`] can fetch an imported object.
    fn import_state(&self, id: &str) -> Result<Value, ProviderError> {
        if id.is_empty() {
            return Err(ProviderError::InvalidRequest(format!(
                "{} import requires a non-empty id",
                self.type_name()
            )));
        }
        Ok(json!({ "id": id }))
    }
}

/// Every resource the provider serves.
pub fn all() -> Vec<Box<dyn Resource>> {
    vec![
        Box::new(view::ViewResource),
        Box::new(alert::AlertResource),
        Box::new(category::CategoryResource),
        Box::new(archive::ArchiveResource),
        Box::new(stream_config::StreamConfigResource),
        Box::new(exclusion::ExclusionResource::stream()),
        Box::new(exclusion::ExclusionResource::ingestion()),
        Box::new(key::KeyResource),
        Box::new(member::MemberResource),
        Box::new(child_organization::ChildOrganizationResource),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_resource_names_are_unique() {
        let resources = all();
        let names: HashSet<_> = resources.iter().map(|r| r.type_name()).collect();
        assert_eq!(names.len(), resources.len());
        assert!(names.iter().all(|n| n.starts_with("logdna_")));
    }

    #[test]
    fn test_every_schema_has_computed_id() {
        for resource in all() {
            let schema = resource.schema();
            let id = schema
                .attribute("id")
                .unwrap_or_else(|| panic!("{} has no id", resource.type_name()));
            assert!(id.flags.computed, "{} id is not computed", resource.type_name());
        }
    }

    #[test]
    fn test_only_child_organization_is_enterprise() {
        let enterprise: Vec<_> = all()
            .into_iter()
            .filter(|r| r.org_type() == OrgType::Enterprise)
            .map(|r| r.type_name())
            .collect();
        assert_eq!(enterprise, vec!["logdna_child_organization"]);
    }

    #[test]
    fn test_default_import_state() {
        let view = view::ViewResource;
        assert_eq!(view.import_state("abc").unwrap(), json!({"id": "abc"}));
        assert!(view.import_state("").is_err());
    }
}
