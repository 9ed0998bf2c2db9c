//! Provider configuration.
//!
//! The host sends the provider block as JSON on `Configure`:
//!
//! ```json
//! { "servicekey": "...", "url": "https://api.logdna.com", "type": "regular" }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::schema::{Attribute, Diagnostic, Schema};

/// API endpoint used when `url` is not configured.
pub const DEFAULT_URL: &str = "https://api.logdna.com";

/// Account tier. Some resources only exist for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrgType {
    /// A standalone organization.
    #[default]
    Regular,
    /// A parent organization managing child organizations.
    Enterprise,
}

impl OrgType {
    /// Name as written in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgType::Regular => "regular",
            OrgType::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for OrgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrgType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regular" => Ok(OrgType::Regular),
            "enterprise" => Ok(OrgType::Enterprise),
            other => Err(format!(
                "Expected one of regular, enterprise, got \"{}\"",
                other
            )),
        }
    }
}

/// Raw shape of the provider block; every field may be null.
#[derive(Debug, Default, Deserialize)]
struct RawProviderConfig {
    servicekey: Option<String>,
    url: Option<String>,
    #[serde(rename = "type")]
    org_type: Option<String>,
}

/// Resolved provider configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Service key sent with every request.
    pub service_key: String,
    /// API base URL without a trailing slash.
    pub url: String,
    /// Configured account tier.
    pub org_type: OrgType,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("service_key", &"<redacted>")
            .field("url", &self.url)
            .field("org_type", &self.org_type)
            .finish()
    }
}

impl ProviderConfig {
    /// Create a configuration for the default endpoint.
    pub fn new(service_key: impl Into<String>, org_type: OrgType) -> Self {
        Self {
            service_key: service_key.into(),
            url: DEFAULT_URL.to_string(),
            org_type,
        }
    }

    /// Point the configuration at another endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Resolve the provider block, reporting every problem as a diagnostic.
    pub fn from_value(value: &Value) -> Result<Self, Vec<Diagnostic>> {
        let raw: RawProviderConfig = match value {
            Value::Null => RawProviderConfig::default(),
            other => serde_json::from_value(other.clone()).map_err(|e| {
                vec![Diagnostic::error("Invalid provider configuration").with_detail(e.to_string())]
            })?,
        };

        let mut diagnostics = Vec::new();

        let service_key = raw.servicekey.unwrap_or_default();
        if service_key.trim().is_empty() {
            diagnostics.push(
                Diagnostic::error("Missing required attribute 'servicekey'")
                    .with_detail("A LogDNA service key is required to call the configuration API")
                    .with_attribute("servicekey"),
            );
        }

        let url = raw
            .url
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_URL.to_string());
        match reqwest::Url::parse(&url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(parsed) => diagnostics.push(
                Diagnostic::error("Invalid value for attribute 'url'")
                    .with_detail(format!("Unsupported scheme \"{}\"", parsed.scheme()))
                    .with_attribute("url"),
            ),
            Err(e) => diagnostics.push(
                Diagnostic::error("Invalid value for attribute 'url'")
                    .with_detail(e.to_string())
                    .with_attribute("url"),
            ),
        }

        let org_type = match raw.org_type.as_deref() {
            None | Some("") => OrgType::default(),
            Some(s) => match s.parse() {
                Ok(t) => t,
                Err(detail) => {
                    diagnostics.push(
                        Diagnostic::error("Invalid value for attribute 'type'")
                            .with_detail(detail)
                            .with_attribute("type"),
                    );
                    OrgType::default()
                }
            },
        };

        if diagnostics.is_empty() {
            Ok(Self::new(service_key, org_type).with_url(url))
        } else {
            Err(diagnostics)
        }
    }

    /// Schema of the provider block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("LogDNA configuration API")
            .with_attribute(
                "servicekey",
                Attribute::required_string()
                    .sensitive()
                    .with_description("Service key used to authenticate API calls"),
            )
            .with_attribute(
                "url",
                Attribute::optional_string()
                    .with_default(json!(DEFAULT_URL))
                    .with_description("Base URL of the LogDNA API"),
            )
            .with_attribute(
                "type",
                Attribute::optional_string()
                    .with_default(json!("regular"))
                    .with_allowed_values(&["regular", "enterprise"])
                    .with_description("Organization type the service key belongs to"),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProviderConfig::from_value(&json!({"servicekey": "abc"})).unwrap();
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.org_type, OrgType::Regular);
    }

    #[test]
    fn test_null_fields_use_defaults() {
        let config = ProviderConfig::from_value(&json!({
            "servicekey": "abc",
            "url": null,
            "type": null
        }))
        .unwrap();
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.org_type, OrgType::Regular);
    }

    #[test]
    fn test_enterprise_with_custom_url() {
        let config = ProviderConfig::from_value(&json!({
            "servicekey": "abc",
            "url": "https://api.eu.logdna.com/",
            "type": "enterprise"
        }))
        .unwrap();
        assert_eq!(config.url, "https://api.eu.logdna.com");
        assert_eq!(config.org_type, OrgType::Enterprise);
    }

    #[test]
    fn test_reports_every_problem() {
        let diagnostics = ProviderConfig::from_value(&json!({
            "url": "ftp://example.com",
            "type": "team"
        }))
        .unwrap_err();

        let attrs: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.as_deref())
            .collect();
        assert_eq!(attrs, vec!["servicekey", "url", "type"]);
    }

    #[test]
    fn test_null_config_requires_servicekey() {
        let diagnostics = ProviderConfig::from_value(&Value::Null).unwrap_err();
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_debug_redacts_service_key() {
        let config = ProviderConfig::new("super-secret", OrgType::Regular);
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_org_type_parse() {
        assert_eq!("enterprise".parse::<OrgType>(), Ok(OrgType::Enterprise));
        assert!("Regular".parse::<OrgType>().is_err());
        assert_eq!(OrgType::Regular.to_string(), "regular");
    }
}
