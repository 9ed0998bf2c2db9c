//! Organization-type guard.

use crate::config::OrgType;
use crate::error::ProviderError;

/// Reject the operation unless the configured organization type is the one the resource needs.
pub fn check_org_type(
    configured: OrgType,
    required: OrgType,
    resource_type: &str,
) -> Result<(), ProviderError> {
    if configured == required {
        return Ok(());
    }
    Err(ProviderError::FailedPrecondition(format!(
        "Only {} organizations can instantiate a \"{}\" resource",
        required, resource_type
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_type_passes() {
        assert!(check_org_type(OrgType::Regular, OrgType::Regular, "logdna_view").is_ok());
        assert!(check_org_type(
            OrgType::Enterprise,
            OrgType::Enterprise,
            "logdna_child_organization"
        )
        .is_ok());
    }

    #[test]
    fn test_mismatch_names_required_type() {
        let err = check_org_type(OrgType::Enterprise, OrgType::Regular, "logdna_view").unwrap_err();
        assert_eq!(
            err.message(),
            "Only regular organizations can instantiate a \"logdna_view\" resource"
        );

        let err = check_org_type(
            OrgType::Regular,
            OrgType::Enterprise,
            "logdna_child_organization",
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::FailedPrecondition(_)));
        assert!(err.message().starts_with("Only enterprise organizations"));
    }
}
