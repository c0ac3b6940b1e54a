use crate::widget::page::{HostPage, LoadOutcome, LoadReporter, PageError, ScriptLoadError, ScriptTag};
use crate::widget::session::{HandleAccessor, RemoteSdk, RemoteSession};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Headless page with a window-like global scope and a script list.
///
/// Script loads stay pending until [`InMemoryPage::complete_load`] or
/// [`InMemoryPage::fail_load`] is called for their `src`.
#[derive(Default)]
pub struct InMemoryPage {
    state: Mutex<PageState>,
}

#[derive(Default)]
struct PageState {
    globals: HashMap<String, Value>,
    scripts: Vec<ScriptTag>,
    pending: Vec<(ScriptTag, LoadReporter)>,
    sdk: Option<Arc<dyn RemoteSdk>>,
    handle: Option<Arc<dyn RemoteSession>>,
}

impl InMemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page that already carries the given script sources, in document order.
    pub fn with_scripts<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let page = Self::new();
        page.lock().scripts = sources
            .into_iter()
            .map(|src| ScriptTag {
                src: src.into(),
                defer: false,
                async_load: false,
                on_load: Default::default(),
            })
            .collect();
        page
    }

    /// Makes `sdk` the entry point scripts run against when they finish loading.
    pub fn install_sdk(&self, sdk: Arc<dyn RemoteSdk>) {
        self.lock().sdk = Some(sdk);
    }

    pub fn global(&self, key: &str) -> Option<Value> {
        self.lock().globals.get(key).cloned()
    }

    pub fn scripts(&self) -> Vec<ScriptTag> {
        self.lock().scripts.clone()
    }

    pub fn pending_loads(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn session_handle(&self) -> Option<Arc<dyn RemoteSession>> {
        self.lock().handle.clone()
    }

    /// Finishes loading `src`: runs the SDK and stores the handle it exposes.
    /// Returns `false` when no load for `src` is pending.
    pub fn complete_load(&self, src: &str) -> bool {
        let (tag, reporter, sdk) = {
            let mut state = self.lock();
            let Some(idx) = state.pending.iter().position(|(tag, _)| tag.src == src) else {
                return false;
            };
            let (tag, reporter) = state.pending.remove(idx);
            (tag, reporter, state.sdk.clone())
        };

        let Some(sdk) = sdk else {
            warn!(%src, "script loaded without an SDK entry point");
            reporter.report(Err(ScriptLoadError::SdkMissing));
            return true;
        };

        let handle = sdk.run(&tag.on_load);
        debug!(%src, handle = handle.is_some(), "sdk run completed");
        self.lock().handle = handle;
        reporter.report(Ok(LoadOutcome::Loaded));
        true
    }

    /// Reports a load error for `src`. Returns `false` when nothing was pending.
    pub fn fail_load(&self, src: &str) -> bool {
        let mut state = self.lock();
        let Some(idx) = state.pending.iter().position(|(tag, _)| tag.src == src) else {
            return false;
        };
        let (tag, reporter) = state.pending.remove(idx);
        drop(state);
        reporter.report(Err(ScriptLoadError::Failed { src: tag.src }));
        true
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl HostPage for InMemoryPage {
    fn set_global(&self, key: &str, value: &Value) -> Result<(), PageError> {
        self.lock().globals.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn insert_script(&self, tag: ScriptTag, reporter: LoadReporter) -> Result<(), PageError> {
        let mut state = self.lock();
        state.scripts.insert(0, tag.clone());
        state.pending.push((tag, reporter));
        Ok(())
    }
}

impl HandleAccessor for InMemoryPage {
    fn remote_handle(&self) -> Option<Arc<dyn RemoteSession>> {
        self.session_handle()
    }
}
