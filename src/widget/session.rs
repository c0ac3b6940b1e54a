use crate::widget::settings::SdkRunOptions;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

pub type Attributes = Map<String, Value>;

/// Control surface the loaded widget exposes to the host page.
pub trait RemoteSession: Send + Sync {
    fn set_user(&self, identifier: &str, attributes: &Attributes);
    fn set_custom_attributes(&self, attributes: &Attributes);
    fn reset(&self);
}

/// SDK entry point that becomes available once `sdk.js` has loaded.
pub trait RemoteSdk: Send + Sync {
    /// Starts the widget and returns the session handle it exposes, if any.
    fn run(&self, options: &SdkRunOptions) -> Option<Arc<dyn RemoteSession>>;
}

/// Looks up the remote handle at call time.
pub trait HandleAccessor {
    fn remote_handle(&self) -> Option<Arc<dyn RemoteSession>>;
}

impl<F> HandleAccessor for F
where
    F: Fn() -> Option<Arc<dyn RemoteSession>>,
{
    fn remote_handle(&self) -> Option<Arc<dyn RemoteSession>> {
        self()
    }
}

/// Post-init operations. Every call is a no-op while no handle is present.
pub struct WidgetSession<A> {
    accessor: A,
}

impl<A: HandleAccessor> WidgetSession<A> {
    pub fn new(accessor: A) -> Self {
        Self { accessor }
    }

    pub fn identify(&self, identifier: &str, attributes: &Attributes) {
        match self.accessor.remote_handle() {
            Some(handle) => {
                debug!(%identifier, attributes = attributes.len(), "identifying widget user");
                handle.set_user(identifier, attributes);
            }
            None => debug!("widget handle absent; identify skipped"),
        }
    }

    pub fn set_attributes(&self, attributes: &Attributes) {
        match self.accessor.remote_handle() {
            Some(handle) => handle.set_custom_attributes(attributes),
            None => debug!("widget handle absent; set_attributes skipped"),
        }
    }

    pub fn reset_session(&self) {
        match self.accessor.remote_handle() {
            Some(handle) => handle.reset(),
            None => debug!("widget handle absent; reset skipped"),
        }
    }
}
