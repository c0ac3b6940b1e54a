pub mod commands;
pub mod config;
pub mod gateway;
pub mod server;
pub mod widget;

pub use gateway::{ConversationApi, GatewayClient, GatewayConfig, GatewayError, GatewayResponse};
pub use widget::session::{HandleAccessor, RemoteSdk, RemoteSession, WidgetSession};
pub use widget::settings::WidgetSettings;
pub use widget::{BootstrapError, BootstrapState, WidgetBootstrap};
