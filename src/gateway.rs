use async_trait::async_trait;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub const ACCESS_TOKEN_HEADER: &str = "api_access_token";
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const DEFAULT_BASE_PATH: &str = "/api";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Origin the base path is resolved against, e.g. `http://localhost:3000`.
    pub origin: String,
    /// Fixed path prefix in front of every endpoint.
    pub base_path: String,
    /// Sent verbatim; an empty token is left for the server to reject.
    pub access_token: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway configuration error: {0}")]
    Config(String),
    #[error("gateway transport error")]
    Transport(#[from] reqwest::Error),
    #[error("gateway responded with status {status}")]
    Status { status: StatusCode, data: Value },
}

#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Decoded JSON body; the raw text when it is not JSON, `null` when empty.
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Outgoing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub content: String,
    pub message_type: MessageType,
}

impl OutgoingMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            message_type: MessageType::Outgoing,
        }
    }
}

/// Conversation endpoints of the messaging backend.
#[async_trait]
pub trait ConversationApi: Send + Sync {
    async fn list_conversations(&self, account_id: &str) -> Result<GatewayResponse, GatewayError>;
    async fn get_messages(
        &self,
        account_id: &str,
        conversation_id: &str,
    ) -> Result<GatewayResponse, GatewayError>;
    async fn send_message(
        &self,
        account_id: &str,
        conversation_id: &str,
        message: &str,
    ) -> Result<GatewayResponse, GatewayError>;
}

/// HTTP client bound to one base path and one access token.
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    base: String,
}

impl GatewayClient {
    pub fn new(cfg: &GatewayConfig) -> Result<Self, GatewayError> {
        let origin = Url::parse(&cfg.origin)
            .map_err(|e| GatewayError::Config(format!("invalid origin {}: {e}", cfg.origin)))?;
        if origin.cannot_be_a_base() {
            return Err(GatewayError::Config(format!(
                "origin {} cannot carry a path",
                cfg.origin
            )));
        }

        let mut token = HeaderValue::from_str(&cfg.access_token)
            .map_err(|e| GatewayError::Config(format!("invalid access token: {e}")))?;
        token.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(ACCESS_TOKEN_HEADER), token);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

        let client = Client::builder()
            .user_agent(concat!("chatwoot-embed/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        let base = format!(
            "{}/{}",
            cfg.origin.trim_end_matches('/'),
            cfg.base_path.trim_matches('/')
        );
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn conversations_url(&self, account_id: &str) -> String {
        format!("{}/accounts/{account_id}/conversations", self.base)
    }

    fn messages_url(&self, account_id: &str, conversation_id: &str) -> String {
        format!(
            "{}/{conversation_id}/messages",
            self.conversations_url(account_id)
        )
    }
}

#[async_trait]
impl ConversationApi for GatewayClient {
    async fn list_conversations(&self, account_id: &str) -> Result<GatewayResponse, GatewayError> {
        let url = self.conversations_url(account_id);
        debug!(%url, "listing conversations");
        read_response(self.client.get(url).send().await?).await
    }

    async fn get_messages(
        &self,
        account_id: &str,
        conversation_id: &str,
    ) -> Result<GatewayResponse, GatewayError> {
        let url = self.messages_url(account_id, conversation_id);
        debug!(%url, "fetching messages");
        read_response(self.client.get(url).send().await?).await
    }

    async fn send_message(
        &self,
        account_id: &str,
        conversation_id: &str,
        message: &str,
    ) -> Result<GatewayResponse, GatewayError> {
        let url = self.messages_url(account_id, conversation_id);
        let body = serde_json::to_vec(&OutgoingMessage::new(message))
            .map_err(|e| GatewayError::Config(format!("encode message: {e}")))?;
        debug!(%url, bytes = body.len(), "sending message");
        read_response(self.client.post(url).body(body).send().await?).await
    }
}

async fn read_response(response: reqwest::Response) -> Result<GatewayResponse, GatewayError> {
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.bytes().await?;
    let data = decode_body(&bytes);
    if !status.is_success() {
        warn!(%status, "gateway request rejected");
        return Err(GatewayError::Status { status, data });
    }
    Ok(GatewayResponse {
        status,
        headers,
        data,
    })
}

fn decode_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
