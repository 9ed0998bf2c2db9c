//! `logdna_member`: a user invited into the organization.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::error::ProviderError;
use crate::resources::wire::{decode_state, merge, segment};
use crate::resources::Resource;
use crate::schema::{Attribute, Schema};

const BASE_PATH: &str = "/v1/config/members";
const ROLES: &[&str] = &["owner", "admin", "member", "readonly"];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MemberArgs {
    id: Option<String>,
    email: String,
    role: String,
    groups: Vec<String>,
}

impl MemberArgs {
    /// Members are addressed by email; older state may only carry the id.
    fn email(&self) -> Result<&str, ProviderError> {
        let email = if self.email.is_empty() {
            self.id.as_deref().unwrap_or_default()
        } else {
            &self.email
        };
        if email.is_empty() {
            return Err(ProviderError::InvalidRequest(
                "member state has no email".to_string(),
            ));
        }
        Ok(email)
    }
}

#[derive(Debug, Serialize)]
struct CreateMemberRequest<'a> {
    email: &'a str,
    role: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    groups: &'a [String],
}

#[derive(Debug, Serialize)]
struct UpdateMemberRequest<'a> {
    role: &'a str,
    groups: &'a [String],
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MemberResponse {
    email: String,
    role: String,
    groups: Vec<String>,
}

/// Handler for `logdna_member`.
pub struct MemberResource;

#[async_trait]
impl Resource for MemberResource {
    fn type_name(&self) -> &'static str {
        "logdna_member"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("An organization member")
            .with_attribute("email", Attribute::required_string().with_force_new())
            .with_attribute(
                "role",
                Attribute::required_string().with_allowed_values(ROLES),
            )
            .with_attribute(
                "groups",
                Attribute::optional_string_list().with_description("Group ids the member belongs to"),
            )
            .with_attribute("id", Attribute::computed_string())
    }

    async fn create(&self, client: &ApiClient, planned: &Value) -> Result<Value, ProviderError> {
        let args: MemberArgs = decode_state(planned)?;
        let email = args.email()?;
        let request = CreateMemberRequest {
            email,
            role: &args.role,
            groups: &args.groups,
        };
        let _: Value = client.post(BASE_PATH, &request).await?;
        Ok(merge(planned, json!({ "id": email })))
    }

    async fn read(&self, client: &ApiClient, state: &Value) -> Result<Value, ProviderError> {
        let args: MemberArgs = decode_state(state)?;
        let email = args.email()?;
        let response: MemberResponse = client
            .get(&format!("{}/{}", BASE_PATH, segment(email)))
            .await?;

        let email = if response.email.is_empty() {
            email.to_string()
        } else {
            response.email
        };
        Ok(json!({
            "id": email,
            "email": email,
            "role": response.role,
            "groups": response.groups,
        }))
    }

    async fn update(
        &self,
        client: &ApiClient,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let prior_args: MemberArgs = decode_state(prior)?;
        let email = prior_args.email()?;
        let args: MemberArgs = decode_state(planned)?;
        let request = UpdateMemberRequest {
            role: &args.role,
            groups: &args.groups,
        };
        let _: Value = client
            .put(&format!("{}/{}", BASE_PATH, segment(email)), &request)
            .await?;
        Ok(merge(planned, json!({ "id": email })))
    }

    async fn delete(&self, client: &ApiClient, state: &Value) -> Result<(), ProviderError> {
        let args: MemberArgs = decode_state(state)?;
        client
            .delete(&format!("{}/{}", BASE_PATH, segment(args.email()?)))
            .await
    }

    fn import_state(&self, id: &str) -> Result<Value, ProviderError> {
        if !id.contains('@') {
            return Err(ProviderError::InvalidRequest(format!(
                "invalid member import id \"{}\", expected an email address",
                id
            )));
        }
        Ok(json!({ "id": id, "email": id }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_falls_back_to_id() {
        let args: MemberArgs = decode_state(&json!({"id": "a@example.com"})).unwrap();
        assert_eq!(args.email().unwrap(), "a@example.com");

        let args: MemberArgs = decode_state(&json!({"role": "admin"})).unwrap();
        assert!(args.email().is_err());
    }

    #[test]
    fn test_create_request_shape() {
        let args: MemberArgs =
            decode_state(&json!({"email": "a@example.com", "role": "member"})).unwrap();
        let request = CreateMemberRequest {
            email: args.email().unwrap(),
            role: &args.role,
            groups: &args.groups,
        };
        assert_eq!(
            serde_json::to_value(request).unwrap(),
            json!({"email": "a@example.com", "role": "member"})
        );
    }

    #[test]
    fn test_import_by_email() {
        let resource = MemberResource;
        assert_eq!(
            resource.import_state("a@example.com").unwrap(),
            json!({"id": "a@example.com", "email": "a@example.com"})
        );
        assert!(resource.import_state("not-an-email").is_err());
    }
}
