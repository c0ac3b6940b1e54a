use crate::config::AppConfig;
use crate::widget::html::render_with_widget;
use crate::widget::settings::EMBED_ELEMENT_ID;
use anyhow::Context;
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shell served when no `shell_html` is configured.
pub fn default_shell() -> String {
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>Support</title></head>\
         <body><div id=\"{EMBED_ELEMENT_ID}\"></div></body></html>"
    )
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    shell: Arc<String>,
}

impl AppState {
    pub fn new(config: AppConfig, shell: String) -> Self {
        Self {
            config: Arc::new(config),
            shell: Arc::new(shell),
        }
    }

    pub async fn load(config: AppConfig) -> anyhow::Result<Self> {
        let shell = match &config.shell_html {
            Some(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading shell html {}", path.display()))?,
            None => default_shell(),
        };
        Ok(Self::new(config, shell))
    }
}

pub fn router(state: AppState) -> Router {
    let enable_cors = state.config.enable_cors;
    let mut router = Router::new()
        .route("/healthz", get(healthz))
        .route("/widget/settings", get(widget_settings))
        .fallback(serve_shell)
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());
    if enable_cors {
        router = router.layer(CorsLayer::permissive());
    }
    router
}

pub async fn run(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, widget = state.config.widget.is_some(), "listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(?err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

async fn healthz() -> &'static str {
    "ok"
}

async fn widget_settings(State(state): State<AppState>) -> Response {
    match &state.config.widget {
        Some(settings) => Json(settings.clone().with_defaults()).into_response(),
        None => (StatusCode::NOT_FOUND, "widget not configured").into_response(),
    }
}

async fn serve_shell(State(state): State<AppState>, method: Method) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }
    let Some(settings) = state.config.widget.clone() else {
        return Html(state.shell.as_str().to_owned()).into_response();
    };
    match render_with_widget(&state.shell, settings) {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            error!(?err, "widget bootstrap failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayConfig;
    use crate::widget::settings::WidgetSettings;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    fn config(widget: Option<WidgetSettings>) -> AppConfig {
        AppConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            shell_html: None,
            enable_cors: false,
            widget,
            gateway: GatewayConfig {
                origin: "http://localhost:3000".into(),
                base_path: "/api".into(),
                access_token: String::new(),
            },
        }
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn shell_is_served_with_widget() {
        let shell = "<html><head><script src=\"/main.js\"></script></head><body></body></html>";
        let state = AppState::new(config(Some(WidgetSettings::new("tok"))), shell.into());
        let (status, body) = get_body(router(state), "/inbox/12").await;

        assert_eq!(status, StatusCode::OK);
        let sdk = body.find("/packs/js/sdk.js").expect("sdk script");
        let app = body.find("/main.js").expect("app script");
        assert!(sdk < app);
        assert!(body.contains("window.chatwootSettings = "));
    }

    #[tokio::test]
    async fn shell_is_untouched_without_widget() {
        let state = AppState::new(config(None), default_shell());
        let (status, body) = get_body(router(state), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, default_shell());
    }

    #[tokio::test]
    async fn settings_endpoint_returns_merged_settings() {
        let state = AppState::new(config(Some(WidgetSettings::new("tok"))), default_shell());
        let (status, body) = get_body(router(state), "/widget/settings").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["position"], "right");
        assert_eq!(json["websiteToken"], "tok");

        let state = AppState::new(config(None), default_shell());
        let (status, _) = get_body(router(state), "/widget/settings").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bootstrap_errors_become_500() {
        let state = AppState::new(config(Some(WidgetSettings::new(""))), default_shell());
        let (status, body) = get_body(router(state), "/").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("website token"));
    }

    #[tokio::test]
    async fn healthz_answers_ok() {
        let state = AppState::new(config(None), default_shell());
        let (status, body) = get_body(router(state), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}
