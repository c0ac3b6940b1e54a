pub mod html;
pub mod memory;
pub mod page;
pub mod session;
pub mod settings;

use crate::widget::page::{
    HostPage, LoadOutcome, LoadResult, PageError, ScriptLoad, ScriptLoadError, ScriptTag,
};
use crate::widget::settings::WidgetSettings;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Page global the remote SDK reads its configuration from.
pub const SETTINGS_GLOBAL: &str = "chatwootSettings";

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("widget settings require a website token")]
    MissingWebsiteToken,
    #[error(transparent)]
    Page(#[from] PageError),
    #[error(transparent)]
    Load(#[from] ScriptLoadError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Uninitialized,
    Loading,
    Ready,
    /// The page was rendered for a client browser which performs the load.
    HandedOff,
    Failed,
}

/// One-shot bootstrap of the widget into a host page.
///
/// The first successful `initialize` moves the adapter out of
/// `Uninitialized`; later calls are logged and ignored.
#[derive(Clone)]
pub struct WidgetBootstrap {
    state: Arc<Mutex<BootstrapState>>,
}

impl Default for WidgetBootstrap {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetBootstrap {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BootstrapState::Uninitialized)),
        }
    }

    pub fn state(&self) -> BootstrapState {
        *lock(&self.state)
    }

    /// Configures the page global and injects the SDK script.
    ///
    /// Returns `Ok(None)` without touching anything when there is no host page
    /// or when the adapter was already initialized. Otherwise the returned
    /// [`Readiness`] resolves once the SDK has run, or fails with the load error.
    /// The adapter state follows the page's load report whether or not the
    /// readiness is awaited.
    pub fn initialize(
        &self,
        host: Option<&dyn HostPage>,
        settings: WidgetSettings,
    ) -> Result<Option<Readiness>, BootstrapError> {
        let Some(host) = host else {
            debug!("no host page; widget bootstrap skipped");
            return Ok(None);
        };

        let mut state = lock(&self.state);
        if *state != BootstrapState::Uninitialized {
            warn!(state = ?*state, "widget already initialized; ignoring repeat call");
            return Ok(None);
        }
        if settings.website_token.trim().is_empty() {
            return Err(BootstrapError::MissingWebsiteToken);
        }
        *state = BootstrapState::Loading;
        drop(state);

        match self.inject(host, settings) {
            Ok(load) => Ok(Some(Readiness { load })),
            Err(err) => {
                *lock(&self.state) = BootstrapState::Failed;
                Err(err.into())
            }
        }
    }

    fn inject(&self, host: &dyn HostPage, settings: WidgetSettings) -> Result<ScriptLoad, PageError> {
        let merged = settings.with_defaults();
        let global = serde_json::to_value(&merged)
            .map_err(|e| PageError::Html(format!("serialize widget settings: {e}")))?;
        host.set_global(SETTINGS_GLOBAL, &global)?;

        let tag = ScriptTag {
            src: merged.sdk_src(),
            defer: true,
            async_load: true,
            on_load: merged.run_options(),
        };
        info!(src = %tag.src, locale = ?merged.locale, "injecting chatwoot sdk");

        let (reporter, load) = ScriptLoad::channel();
        let state = self.state.clone();
        let reporter = reporter.observe(move |outcome| *lock(&state) = settle(outcome));
        host.insert_script(tag, reporter)?;
        Ok(load)
    }
}

fn settle(outcome: &LoadResult) -> BootstrapState {
    match outcome {
        Ok(LoadOutcome::Loaded) => BootstrapState::Ready,
        Ok(LoadOutcome::HandedOff) => BootstrapState::HandedOff,
        Err(err) => {
            warn!(%err, "chatwoot sdk did not load");
            BootstrapState::Failed
        }
    }
}

/// Completion of a bootstrap: resolves when the SDK ran, errors when the script failed.
///
/// Dropping it only stops observing; the load still settles the adapter state.
pub struct Readiness {
    load: ScriptLoad,
}

impl Future for Readiness {
    type Output = Result<LoadOutcome, BootstrapError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.load)
            .poll(cx)
            .map(|outcome| outcome.map_err(BootstrapError::from))
    }
}

fn lock(state: &Mutex<BootstrapState>) -> MutexGuard<'_, BootstrapState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
