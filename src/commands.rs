use crate::gateway::{ConversationApi, GatewayError, GatewayResponse};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "chatwoot-embed", version, about = "Chatwoot widget bootstrap and conversation API client")]
pub struct Cli {
    /// TOML config file layered under environment variables.
    #[arg(long, global = true, env = "CHATWOOT_EMBED_CONFIG")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the application shell with the widget injected.
    Serve,
    /// Print the shell HTML with the widget injected.
    Render {
        /// Shell to render instead of the configured one.
        #[arg(long)]
        html: Option<PathBuf>,
    },
    #[command(flatten)]
    Api(ApiCommand),
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum ApiCommand {
    /// List conversations of an account.
    Conversations { account_id: String },
    /// Fetch the messages of a conversation.
    Messages {
        account_id: String,
        conversation_id: String,
    },
    /// Post an outgoing message to a conversation.
    Send {
        account_id: String,
        conversation_id: String,
        message: String,
    },
}

pub async fn execute(
    api: &dyn ConversationApi,
    command: &ApiCommand,
) -> Result<GatewayResponse, GatewayError> {
    let response = match command {
        ApiCommand::Conversations { account_id } => api.list_conversations(account_id).await?,
        ApiCommand::Messages {
            account_id,
            conversation_id,
        } => api.get_messages(account_id, conversation_id).await?,
        ApiCommand::Send {
            account_id,
            conversation_id,
            message,
        } => {
            api.send_message(account_id, conversation_id, message)
                .await?
        }
    };
    info!(status = %response.status, "gateway call finished");
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use http::{HeaderMap, StatusCode};
    use serde_json::{Value, json};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeApi {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl FakeApi {
        fn reply(&self, call: String) -> Result<GatewayResponse, GatewayError> {
            self.calls.lock().unwrap().push(call.clone());
            if self.fail {
                return Err(GatewayError::Status {
                    status: StatusCode::UNAUTHORIZED,
                    data: json!({"error": "Invalid Access Token"}),
                });
            }
            Ok(GatewayResponse {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                data: Value::String(call),
            })
        }
    }

    #[async_trait]
    impl ConversationApi for FakeApi {
        async fn list_conversations(
            &self,
            account_id: &str,
        ) -> Result<GatewayResponse, GatewayError> {
            self.reply(format!("list:{account_id}"))
        }

        async fn get_messages(
            &self,
            account_id: &str,
            conversation_id: &str,
        ) -> Result<GatewayResponse, GatewayError> {
            self.reply(format!("messages:{account_id}:{conversation_id}"))
        }

        async fn send_message(
            &self,
            account_id: &str,
            conversation_id: &str,
            message: &str,
        ) -> Result<GatewayResponse, GatewayError> {
            self.reply(format!("send:{account_id}:{conversation_id}:{message}"))
        }
    }

    #[test]
    fn parses_api_subcommands() {
        let cli = Cli::try_parse_from(["chatwoot-embed", "send", "42", "7", "hello there"]).unwrap();
        match cli.command {
            Command::Api(cmd) => assert_eq!(
                cmd,
                ApiCommand::Send {
                    account_id: "42".into(),
                    conversation_id: "7".into(),
                    message: "hello there".into(),
                }
            ),
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from(["chatwoot-embed", "--config", "app.toml", "serve"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("app.toml")));
        assert!(matches!(cli.command, Command::Serve));
    }

    #[tokio::test]
    async fn dispatches_each_command_once() {
        let api = FakeApi::default();
        let commands = [
            ApiCommand::Conversations {
                account_id: "42".into(),
            },
            ApiCommand::Messages {
                account_id: "42".into(),
                conversation_id: "7".into(),
            },
            ApiCommand::Send {
                account_id: "42".into(),
                conversation_id: "7".into(),
                message: "hello".into(),
            },
        ];
        for command in &commands {
            execute(&api, command).await.unwrap();
        }
        assert_eq!(
            *api.calls.lock().unwrap(),
            vec!["list:42", "messages:42:7", "send:42:7:hello"]
        );
    }

    #[tokio::test]
    async fn failures_pass_through_untouched() {
        let api = FakeApi {
            fail: true,
            ..Default::default()
        };
        let err = execute(
            &api,
            &ApiCommand::Conversations {
                account_id: "42".into(),
            },
        )
        .await
        .unwrap_err();
        match err {
            GatewayError::Status { status, data } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(data["error"], "Invalid Access Token");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(api.calls.lock().unwrap().len(), 1);
    }
}
