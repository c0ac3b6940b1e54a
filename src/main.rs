use anyhow::Context;
use chatwoot_embed::commands::{Cli, Command, execute};
use chatwoot_embed::config::AppConfig;
use chatwoot_embed::gateway::GatewayClient;
use chatwoot_embed::server::{self, AppState};
use chatwoot_embed::widget::html::render_with_widget;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve => {
            let addr = config.bind_addr;
            let state = AppState::load(config).await?;
            tracing::info!(%addr, "starting chatwoot-embed server");
            server::run(addr, state).await?;
        }
        Command::Render { html } => {
            let shell = match html.as_ref().or(config.shell_html.as_ref()) {
                Some(path) => tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading shell html {}", path.display()))?,
                None => server::default_shell(),
            };
            let rendered = match config.widget {
                Some(settings) => render_with_widget(&shell, settings)?,
                None => {
                    tracing::warn!("CHATWOOT_WEBSITE_TOKEN not set; rendering shell without widget");
                    shell
                }
            };
            println!("{rendered}");
        }
        Command::Api(command) => {
            let client = GatewayClient::new(&config.gateway)?;
            let response = execute(&client, &command).await?;
            println!("{}", serde_json::to_string_pretty(&response.data)?);
        }
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}
