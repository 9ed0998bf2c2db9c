//! Notification channels shared by views and preset alerts.
//!
//! In configuration each integration has its own list block
//! (`email_channel`, `slack_channel`, ...). On the wire they collapse into
//! one `channels` array tagged by `integration`. Requests carry
//! `immediate`/`terminal` as the strings `"true"`/`"false"` and the webhook
//! body template as a JSON object; responses carry real booleans and may
//! report `triggerinterval` as a number.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::client::strip_nulls;
use crate::error::ProviderError;
use crate::resources::wire::{lenient_bool, lenient_string};
use crate::schema::{Attribute, Block, Diagnostic, NestedBlock, Schema};

const OPERATORS: &[&str] = &["presence", "absence"];
const WEBHOOK_METHODS: &[&str] = &["post", "put", "patch", "get", "delete"];

/// A channel integration and the block that configures it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integration {
    /// `email_channel`
    Email,
    /// `pagerduty_channel`
    PagerDuty,
    /// `slack_channel`
    Slack,
    /// `webhook_channel`
    Webhook,
}

impl Integration {
    /// Every integration, in block order.
    pub const ALL: [Integration; 4] = [
        Integration::Email,
        Integration::PagerDuty,
        Integration::Slack,
        Integration::Webhook,
    ];

    /// Configuration block name.
    pub fn block_name(self) -> &'static str {
        match self {
            Integration::Email => "email_channel",
            Integration::PagerDuty => "pagerduty_channel",
            Integration::Slack => "slack_channel",
            Integration::Webhook => "webhook_channel",
        }
    }

    /// Value of the `integration` field on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Integration::Email => "email",
            Integration::PagerDuty => "pagerduty",
            Integration::Slack => "slack",
            Integration::Webhook => "webhook",
        }
    }

    fn from_api(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|i| i.as_str().eq_ignore_ascii_case(name))
    }

    fn block(self) -> Block {
        let block = match self {
            Integration::Email => Block::new()
                .with_attribute(
                    "emails",
                    Attribute::required_string_list().with_description("Recipient addresses"),
                )
                .with_attribute("timezone", Attribute::optional_string()),
            Integration::PagerDuty => Block::new()
                .with_attribute(
                    "key",
                    Attribute::required_string()
                        .sensitive()
                        .with_description("PagerDuty integration key"),
                )
                .with_attribute(
                    "autoresolve",
                    Attribute::optional_bool().with_default(json!(false)),
                )
                .with_attribute("autoresolveinterval", Attribute::optional_string())
                .with_attribute("autoresolvelimit", Attribute::optional_int64()),
            Integration::Slack => {
                Block::new().with_attribute("url", Attribute::required_string())
            }
            Integration::Webhook => Block::new()
                .with_attribute("url", Attribute::required_string())
                .with_attribute(
                    "method",
                    Attribute::optional_string()
                        .with_allowed_values(WEBHOOK_METHODS)
                        .with_default(json!("post")),
                )
                .with_attribute("headers", Attribute::optional_string_map())
                .with_attribute(
                    "bodytemplate",
                    Attribute::optional_string().with_description("JSON object sent as the request body"),
                ),
        };

        block
            .with_attribute(
                "operator",
                Attribute::optional_string()
                    .with_allowed_values(OPERATORS)
                    .with_default(json!("presence")),
            )
            .with_attribute(
                "triggerlimit",
                Attribute::required_int64().with_description("Number of lines that trigger the alert"),
            )
            .with_attribute("triggerinterval", Attribute::optional_string())
            .with_attribute("immediate", Attribute::optional_bool().with_default(json!(false)))
            .with_attribute("terminal", Attribute::optional_bool().with_default(json!(true)))
    }
}

/// Names of the four channel blocks.
pub fn block_names() -> Vec<&'static str> {
    Integration::ALL.iter().map(|i| i.block_name()).collect()
}

/// Add every channel block to `schema`.
pub fn with_channel_blocks(mut schema: Schema, min_items: u32) -> Schema {
    for integration in Integration::ALL {
        schema = schema.with_block(
            integration.block_name(),
            NestedBlock::list(integration.block()).with_min_items(min_items),
        );
    }
    schema
}

/// One channel block item as configured.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChannelArgs {
    emails: Vec<String>,
    key: Option<String>,
    url: Option<String>,
    method: Option<String>,
    headers: BTreeMap<String, String>,
    bodytemplate: Option<String>,
    operator: Option<String>,
    triggerlimit: Option<i64>,
    #[serde(deserialize_with = "lenient_string")]
    triggerinterval: Option<String>,
    immediate: Option<bool>,
    terminal: Option<bool>,
    timezone: Option<String>,
    autoresolve: Option<bool>,
    #[serde(deserialize_with = "lenient_string")]
    autoresolveinterval: Option<String>,
    autoresolvelimit: Option<i64>,
}

/// Every channel block of a view or alert.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChannelBlocks {
    email_channel: Vec<ChannelArgs>,
    pagerduty_channel: Vec<ChannelArgs>,
    slack_channel: Vec<ChannelArgs>,
    webhook_channel: Vec<ChannelArgs>,
}

impl ChannelBlocks {
    fn items(&self, integration: Integration) -> &[ChannelArgs] {
        match integration {
            Integration::Email => &self.email_channel,
            Integration::PagerDuty => &self.pagerduty_channel,
            Integration::Slack => &self.slack_channel,
            Integration::Webhook => &self.webhook_channel,
        }
    }

    /// Whether no channel is configured.
    pub fn is_empty(&self) -> bool {
        Integration::ALL.iter().all(|i| self.items(*i).is_empty())
    }

    /// Flatten the blocks into the request `channels` array.
    pub fn to_requests(&self) -> Result<Vec<ChannelRequest>, ProviderError> {
        let mut requests = Vec::new();
        for integration in Integration::ALL {
            for args in self.items(integration) {
                requests.push(ChannelRequest::new(integration, args)?);
            }
        }
        Ok(requests)
    }
}

/// A channel as the API accepts it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelRequest {
    integration: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    emails: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
    #[serde(rename = "bodyTemplate", skip_serializing_if = "Option::is_none")]
    body_template: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    operator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    triggerlimit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    triggerinterval: Option<String>,
    immediate: String,
    terminal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    autoresolve: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    autoresolveinterval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    autoresolvelimit: Option<i64>,
}

impl ChannelRequest {
    fn new(integration: Integration, args: &ChannelArgs) -> Result<Self, ProviderError> {
        let body_template = match args.bodytemplate.as_deref().filter(|t| !t.trim().is_empty()) {
            Some(template) => Some(parse_body_template(template)?),
            None => None,
        };
        let pagerduty = integration == Integration::PagerDuty;

        Ok(Self {
            integration: integration.as_str(),
            emails: args.emails.clone(),
            key: args.key.clone(),
            url: args.url.clone(),
            method: args.method.as_ref().map(|m| m.to_lowercase()),
            headers: args.headers.clone(),
            body_template,
            operator: args.operator.clone(),
            triggerlimit: args.triggerlimit,
            triggerinterval: args.triggerinterval.clone(),
            immediate: args.immediate.unwrap_or(false).to_string(),
            terminal: args.terminal.unwrap_or(true).to_string(),
            timezone: args.timezone.clone(),
            autoresolve: if pagerduty { Some(args.autoresolve.unwrap_or(false)) } else { None },
            autoresolveinterval: args.autoresolveinterval.clone(),
            autoresolvelimit: args.autoresolvelimit,
        })
    }
}

/// A channel as the API returns it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChannelResponse {
    integration: String,
    emails: Vec<String>,
    key: Option<String>,
    url: Option<String>,
    method: Option<String>,
    headers: BTreeMap<String, String>,
    #[serde(rename = "bodyTemplate")]
    body_template: Option<Value>,
    operator: Option<String>,
    triggerlimit: Option<i64>,
    #[serde(deserialize_with = "lenient_string")]
    triggerinterval: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    immediate: bool,
    #[serde(deserialize_with = "lenient_bool")]
    terminal: bool,
    timezone: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    autoresolve: bool,
    #[serde(deserialize_with = "lenient_string")]
    autoresolveinterval: Option<String>,
    autoresolvelimit: Option<i64>,
}

impl ChannelResponse {
    fn to_state(&self, integration: Integration, prior: Option<&Value>) -> Value {
        let mut item = Map::new();
        let mut put = |name: &str, value: Value| {
            item.insert(name.to_string(), value);
        };

        match integration {
            Integration::Email => {
                put("emails", json!(self.emails));
                put("timezone", json!(self.timezone));
            }
            Integration::PagerDuty => {
                // Older accounts do not echo the key back.
                let key = self
                    .key
                    .clone()
                    .or_else(|| prior_string(prior, "key"));
                put("key", json!(key));
                put("autoresolve", json!(self.autoresolve));
                put("autoresolveinterval", json!(self.autoresolveinterval));
                put("autoresolvelimit", json!(self.autoresolvelimit));
            }
            Integration::Slack => {
                put("url", json!(self.url));
            }
            Integration::Webhook => {
                put("url", json!(self.url));
                put("method", json!(self.method.as_ref().map(|m| m.to_lowercase())));
                if !self.headers.is_empty() {
                    put("headers", json!(self.headers));
                }
                put("bodytemplate", json!(self.body_template_state(prior)));
            }
        }

        put("operator", json!(self.operator));
        put("triggerlimit", json!(self.triggerlimit));
        put("triggerinterval", json!(self.triggerinterval));
        put("immediate", json!(self.immediate));
        put("terminal", json!(self.terminal));

        strip_nulls(Value::Object(item))
    }

    /// Keep the configured template text when it encodes the same object.
    fn body_template_state(&self, prior: Option<&Value>) -> Option<String> {
        let template = self.body_template.as_ref().filter(|t| !t.is_null())?;
        if let Some(text) = prior_string(prior, "bodytemplate") {
            if serde_json::from_str::<Value>(&text).ok().as_ref() == Some(template) {
                return Some(text);
            }
        }
        serde_json::to_string(template).ok()
    }
}

fn prior_string(prior: Option<&Value>, name: &str) -> Option<String> {
    prior
        .and_then(|p| p.get(name))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn parse_body_template(template: &str) -> Result<Value, ProviderError> {
    match serde_json::from_str::<Value>(template) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(ProviderError::Validation(
            "bodytemplate must be a JSON object".to_string(),
        )),
        Err(e) => Err(ProviderError::Validation(format!(
            "bodytemplate is not valid JSON: {}",
            e
        ))),
    }
}

/// Group response channels back into their blocks.
///
/// Every block name is present in the result so a channel removed remotely
/// shows up as a change. `prior` is the state being refreshed; it supplies
/// values the API does not echo.
pub fn channels_to_state(channels: &[ChannelResponse], prior: &Value) -> Map<String, Value> {
    let mut blocks: BTreeMap<&'static str, Vec<Value>> = Integration::ALL
        .iter()
        .map(|i| (i.block_name(), Vec::new()))
        .collect();

    for channel in channels {
        let Some(integration) = Integration::from_api(&channel.integration) else {
            tracing::warn!(integration = %channel.integration, "Skipping unknown channel integration");
            continue;
        };
        let items = blocks.entry(integration.block_name()).or_default();
        let prior_item = prior
            .get(integration.block_name())
            .and_then(|b| b.get(items.len()));
        items.push(channel.to_state(integration, prior_item));
    }

    blocks
        .into_iter()
        .map(|(name, items)| (name.to_string(), Value::Array(items)))
        .collect()
}

/// Checks the schema cannot express: template JSON.
pub fn validate_channels(config: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let Some(Value::Array(items)) = config.get(Integration::Webhook.block_name()) else {
        return diagnostics;
    };

    for (i, item) in items.iter().enumerate() {
        if let Some(template) = item.get("bodytemplate").and_then(Value::as_str) {
            if template.trim().is_empty() {
                continue;
            }
            if let Err(e) = parse_body_template(template) {
                diagnostics.push(
                    Diagnostic::error("Invalid webhook body template")
                        .with_detail(e.message())
                        .with_attribute(format!("webhook_channel.{}.bodytemplate", i)),
                );
            }
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::wire::decode_state;

    fn blocks(config: Value) -> ChannelBlocks {
        decode_state(&config).unwrap()
    }

    #[test]
    fn test_requests_flatten_blocks_in_order() {
        let blocks = blocks(json!({
            "slack_channel": [{"url": "https://hooks.slack.com/a", "triggerlimit": 5}],
            "email_channel": [{
                "emails": ["ops@example.com"],
                "triggerlimit": 15,
                "triggerinterval": "15m",
                "immediate": true,
                "terminal": false,
                "operator": "absence",
                "timezone": "Pacific/Samoa"
            }]
        }));
        let requests = serde_json::to_value(blocks.to_requests().unwrap()).unwrap();

        assert_eq!(
            requests,
            json!([
                {
                    "integration": "email",
                    "emails": ["ops@example.com"],
                    "operator": "absence",
                    "triggerlimit": 15,
                    "triggerinterval": "15m",
                    "immediate": "true",
                    "terminal": "false",
                    "timezone": "Pacific/Samoa"
                },
                {
                    "integration": "slack",
                    "url": "https://hooks.slack.com/a",
                    "triggerlimit": 5,
                    "immediate": "false",
                    "terminal": "true"
                }
            ])
        );
    }

    #[test]
    fn test_webhook_request_sends_template_object() {
        let blocks = blocks(json!({
            "webhook_channel": [{
                "url": "https://example.com/hook",
                "method": "PUT",
                "headers": {"x-token": "abc"},
                "bodytemplate": "{\"text\": \"{{ matches }} lines\"}",
                "triggerlimit": 1
            }]
        }));
        let requests = serde_json::to_value(blocks.to_requests().unwrap()).unwrap();

        assert_eq!(requests[0]["method"], "put");
        assert_eq!(requests[0]["headers"], json!({"x-token": "abc"}));
        assert_eq!(requests[0]["bodyTemplate"], json!({"text": "{{ matches }} lines"}));
    }

    #[test]
    fn test_pagerduty_request_always_sends_autoresolve() {
        let blocks = blocks(json!({"pagerduty_channel": [{"key": "pd", "triggerlimit": 1}]}));
        let requests = serde_json::to_value(blocks.to_requests().unwrap()).unwrap();
        assert_eq!(requests[0]["autoresolve"], json!(false));
        assert!(!blocks.is_empty());
    }

    #[test]
    fn test_invalid_template_rejected() {
        let blocks = blocks(json!({
            "webhook_channel": [{"url": "https://x", "bodytemplate": "[1, 2]", "triggerlimit": 1}]
        }));
        assert!(matches!(blocks.to_requests(), Err(ProviderError::Validation(_))));

        let diagnostics = validate_channels(&json!({
            "webhook_channel": [
                {"url": "https://x", "bodytemplate": "{\"ok\": true}"},
                {"url": "https://y", "bodytemplate": "{not json"}
            ]
        }));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute.as_deref(),
            Some("webhook_channel.1.bodytemplate")
        );
    }

    #[test]
    fn test_response_groups_by_integration() {
        let channels: Vec<ChannelResponse> = serde_json::from_value(json!([
            {"integration": "email", "emails": ["a@example.com"], "triggerlimit": 15,
             "triggerinterval": 30, "immediate": false, "terminal": true, "operator": "presence"},
            {"integration": "webhook", "url": "https://x", "method": "POST", "triggerlimit": 1,
             "bodyTemplate": {"b": 2, "a": 1}, "immediate": "true", "terminal": "false"},
            {"integration": "carrier-pigeon"}
        ]))
        .unwrap();

        let prior = json!({
            "webhook_channel": [{"bodytemplate": "{\"a\": 1, \"b\": 2}"}]
        });
        let state = channels_to_state(&channels, &prior);

        assert_eq!(
            state["email_channel"],
            json!([{
                "emails": ["a@example.com"],
                "operator": "presence",
                "triggerlimit": 15,
                "triggerinterval": "30",
                "immediate": false,
                "terminal": true
            }])
        );
        let webhook = &state["webhook_channel"][0];
        assert_eq!(webhook["method"], "post");
        assert_eq!(webhook["bodytemplate"], "{\"a\": 1, \"b\": 2}");
        assert_eq!(webhook["immediate"], json!(true));
        assert_eq!(state["slack_channel"], json!([]));
        assert_eq!(state["pagerduty_channel"], json!([]));
    }

    #[test]
    fn test_pagerduty_key_carried_from_prior() {
        let channels: Vec<ChannelResponse> =
            serde_json::from_value(json!([{"integration": "pagerduty", "triggerlimit": 1}])).unwrap();
        let prior = json!({"pagerduty_channel": [{"key": "pd-secret"}]});
        let state = channels_to_state(&channels, &prior);
        assert_eq!(state["pagerduty_channel"][0]["key"], "pd-secret");
        assert_eq!(state["pagerduty_channel"][0]["autoresolve"], json!(false));
    }

    #[test]
    fn test_channel_schema_blocks() {
        let schema = with_channel_blocks(Schema::v0(), 0);
        assert_eq!(block_names().len(), 4);
        let webhook = &schema.block.blocks["webhook_channel"].block;
        assert_eq!(webhook.attributes["method"].default, Some(json!("post")));
        let pagerduty = &schema.block.blocks["pagerduty_channel"].block;
        assert!(pagerduty.attributes["key"].flags.sensitive);
    }
}
