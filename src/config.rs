use crate::gateway::{DEFAULT_BASE_PATH, GatewayConfig};
use crate::widget::settings::{Placement, Position, WidgetSettings, WidgetType};
use anyhow::Context;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

const DEFAULT_API_ORIGIN: &str = "http://localhost:3000";

/// Runtime configuration for the CLI and the shell server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Application shell served with the widget injected; a built-in page when unset.
    pub shell_html: Option<PathBuf>,
    pub enable_cors: bool,
    /// `None` when no website token is configured; pages are then served untouched.
    pub widget: Option<WidgetSettings>,
    pub gateway: GatewayConfig,
}

/// Optional TOML file layer. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    bind_addr: Option<SocketAddr>,
    shell_html: Option<PathBuf>,
    enable_cors: Option<bool>,
    widget: Option<WidgetSettings>,
    #[serde(default)]
    gateway: FileGatewayConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileGatewayConfig {
    origin: Option<String>,
    base_path: Option<String>,
    access_token: Option<String>,
}

impl AppConfig {
    /// Defaults, then the TOML file at `path` (if any), then environment variables.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                toml::from_str::<FileConfig>(&raw)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => FileConfig::default(),
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bind_addr = match env("BIND_ADDR") {
            Some(raw) => raw.parse().context("failed to parse BIND_ADDR")?,
            None => file
                .bind_addr
                .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080))),
        };

        let shell_html = env("SHELL_HTML").map(PathBuf::from).or(file.shell_html);

        let enable_cors = env("ENABLE_CORS")
            .map(|v| flag(&v))
            .or(file.enable_cors)
            .unwrap_or(false);

        let mut widget = file.widget;
        if let Some(token) = env("CHATWOOT_WEBSITE_TOKEN") {
            match widget.as_mut() {
                Some(settings) => settings.website_token = token,
                None => widget = Some(WidgetSettings::new(token)),
            }
        }
        if let Some(settings) = widget.as_mut() {
            if let Some(base_url) = env("CHATWOOT_BASE_URL") {
                settings.base_url = Some(base_url);
            }
            if let Some(locale) = env("CHATWOOT_LOCALE") {
                settings.locale = Some(locale);
            }
            if let Some(position) = env("CHATWOOT_POSITION") {
                settings.position =
                    Some(position.parse::<Position>().context("failed to parse CHATWOOT_POSITION")?);
            }
            if let Some(dark_mode) = env("CHATWOOT_DARK_MODE") {
                settings.dark_mode = Some(flag(&dark_mode));
            }
            if let Some(widget_type) = env("CHATWOOT_TYPE") {
                settings.widget_type =
                    Some(widget_type.parse::<WidgetType>().context("failed to parse CHATWOOT_TYPE")?);
            }
            if let Some(placement) = env("CHATWOOT_PLACEMENT") {
                settings.placement =
                    Some(placement.parse::<Placement>().context("failed to parse CHATWOOT_PLACEMENT")?);
            }
        }

        let gateway = GatewayConfig {
            origin: env("CHATWOOT_API_ORIGIN")
                .or(file.gateway.origin)
                .unwrap_or_else(|| DEFAULT_API_ORIGIN.to_string()),
            base_path: env("CHATWOOT_API_BASE")
                .or(file.gateway.base_path)
                .unwrap_or_else(|| DEFAULT_BASE_PATH.to_string()),
            access_token: env("CHATWOOT_API_TOKEN")
                .or(file.gateway.access_token)
                .unwrap_or_default(),
        };

        Ok(Self {
            bind_addr,
            shell_html,
            enable_cors,
            widget,
            gateway,
        })
    }
}

fn flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn resolve_with(file: FileConfig, vars: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::resolve(file, |key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_file_or_env() {
        let cfg = resolve_with(FileConfig::default(), &[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert!(cfg.widget.is_none());
        assert!(!cfg.enable_cors);
        assert_eq!(cfg.gateway.origin, "http://localhost:3000");
        assert_eq!(cfg.gateway.base_path, "/api");
        assert_eq!(cfg.gateway.access_token, "");
    }

    #[test]
    fn env_builds_widget_settings() {
        let cfg = resolve_with(
            FileConfig::default(),
            &[
                ("CHATWOOT_WEBSITE_TOKEN", "tok"),
                ("CHATWOOT_POSITION", "left"),
                ("CHATWOOT_TYPE", "expanded_bubble"),
                ("CHATWOOT_DARK_MODE", "TRUE"),
                ("CHATWOOT_API_TOKEN", "api-secret"),
            ],
        )
        .unwrap();
        let widget = cfg.widget.expect("widget");
        assert_eq!(widget.website_token, "tok");
        assert_eq!(widget.position, Some(Position::Left));
        assert_eq!(widget.widget_type, Some(WidgetType::ExpandedBubble));
        assert_eq!(widget.dark_mode, Some(true));
        assert!(widget.locale.is_none());
        assert_eq!(cfg.gateway.access_token, "api-secret");
    }

    #[test]
    fn widget_overrides_need_a_token() {
        let cfg = resolve_with(FileConfig::default(), &[("CHATWOOT_LOCALE", "fr")]).unwrap();
        assert!(cfg.widget.is_none());
    }

    #[test]
    fn invalid_enum_value_is_reported() {
        let err = resolve_with(
            FileConfig::default(),
            &[
                ("CHATWOOT_WEBSITE_TOKEN", "tok"),
                ("CHATWOOT_PLACEMENT", "floating"),
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("CHATWOOT_PLACEMENT"));
    }

    #[test]
    fn file_layer_sits_under_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
bind_addr = "127.0.0.1:9000"
enable_cors = true

[widget]
websiteToken = "from-file"
locale = "de"
placement = "standard"

[gateway]
origin = "https://chat.example.com"
access_token = "file-token"
"#
        )
        .unwrap();

        let raw = std::fs::read_to_string(file.path()).unwrap();
        let parsed: FileConfig = toml::from_str(&raw).unwrap();
        let cfg = resolve_with(parsed, &[("CHATWOOT_LOCALE", "es")]).unwrap();

        assert_eq!(cfg.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert!(cfg.enable_cors);
        let widget = cfg.widget.expect("widget");
        assert_eq!(widget.website_token, "from-file");
        assert_eq!(widget.locale.as_deref(), Some("es"));
        assert_eq!(cfg.gateway.origin, "https://chat.example.com");
        assert_eq!(cfg.gateway.base_path, "/api");
        assert_eq!(cfg.gateway.access_token, "file-token");
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/chatwoot-embed.toml"))).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }
}
