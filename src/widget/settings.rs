use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Hosted Chatwoot endpoint used when no `baseUrl` is supplied.
pub const DEFAULT_BASE_URL: &str = "https://app.chatwoot.com";
pub const SDK_PATH: &str = "/packs/js/sdk.js";
/// Element the SDK mounts the embedded widget into.
pub const EMBED_ELEMENT_ID: &str = "chatwoot-embed";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {field} value: {value}")]
pub struct SettingsError {
    pub field: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetType {
    Standard,
    ExpandedBubble,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Unbound,
    Standard,
}

impl FromStr for Position {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(SettingsError {
                field: "position",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for WidgetType {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "expanded_bubble" => Ok(Self::ExpandedBubble),
            other => Err(SettingsError {
                field: "type",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for Placement {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unbound" => Ok(Self::Unbound),
            "standard" => Ok(Self::Standard),
            other => Err(SettingsError {
                field: "placement",
                value: other.to_string(),
            }),
        }
    }
}

/// Widget configuration supplied by the embedding application.
///
/// Serialises with the camelCase keys the remote SDK reads from the page
/// global. Unset optional fields are omitted rather than written as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSettings {
    #[serde(alias = "website_token")]
    pub website_token: String,
    #[serde(default, alias = "base_url", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, alias = "dark_mode", skip_serializing_if = "Option::is_none")]
    pub dark_mode: Option<bool>,
    #[serde(
        default,
        rename = "type",
        alias = "widget_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub widget_type: Option<WidgetType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
}

impl WidgetSettings {
    pub fn new(website_token: impl Into<String>) -> Self {
        Self {
            website_token: website_token.into(),
            base_url: None,
            locale: None,
            position: None,
            dark_mode: None,
            widget_type: None,
            placement: None,
        }
    }

    /// Shallow merge over the documented defaults. Values already set win.
    pub fn with_defaults(mut self) -> Self {
        self.position.get_or_insert(Position::Right);
        self.locale.get_or_insert_with(|| "en".to_string());
        self.widget_type.get_or_insert(WidgetType::Standard);
        self.placement.get_or_insert(Placement::Unbound);
        self
    }

    /// Base URL the SDK is fetched from. An empty `baseUrl` counts as unset.
    pub fn sdk_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn sdk_src(&self) -> String {
        format!("{}{SDK_PATH}", self.sdk_base_url())
    }

    pub fn run_options(&self) -> SdkRunOptions {
        SdkRunOptions {
            website_token: self.website_token.clone(),
            base_url: self.sdk_base_url().to_string(),
            element_id: EMBED_ELEMENT_ID.to_string(),
        }
    }
}

/// Arguments handed to the SDK's `run` entry point once the script loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkRunOptions {
    pub website_token: String,
    pub base_url: String,
    pub element_id: String,
}
