use crate::widget::settings::SdkRunOptions;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("html manipulation failed: {0}")]
    Html(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScriptLoadError {
    #[error("script {src} failed to load")]
    Failed { src: String },
    #[error("script loaded but the page exposes no SDK entry point")]
    SdkMissing,
    #[error("page dropped the script before reporting a load result")]
    Abandoned,
}

/// How a script load finished from the adapter's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The SDK ran in this process and its handle is now available.
    Loaded,
    /// The page was rendered for a client; loading happens over there.
    HandedOff,
}

/// Script element the bootstrap asks the page to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTag {
    pub src: String,
    pub defer: bool,
    pub async_load: bool,
    /// Invoked against the page's SDK entry point once the script has loaded.
    pub on_load: SdkRunOptions,
}

pub type LoadResult = Result<LoadOutcome, ScriptLoadError>;
type LoadObserver = Box<dyn FnOnce(&LoadResult) + Send>;

/// Pending result of a script insertion, resolved by the page.
#[derive(Debug)]
pub struct ScriptLoad {
    rx: oneshot::Receiver<LoadResult>,
}

/// Page side of a [`ScriptLoad`].
///
/// Dropping it without a report counts as [`ScriptLoadError::Abandoned`].
pub struct LoadReporter {
    tx: Option<oneshot::Sender<LoadResult>>,
    observer: Option<LoadObserver>,
}

impl ScriptLoad {
    pub fn channel() -> (LoadReporter, ScriptLoad) {
        let (tx, rx) = oneshot::channel();
        (
            LoadReporter {
                tx: Some(tx),
                observer: None,
            },
            ScriptLoad { rx },
        )
    }
}

impl LoadReporter {
    /// Runs `observer` with the outcome as it is reported, even when the
    /// matching [`ScriptLoad`] is no longer awaited.
    pub fn observe(mut self, observer: impl FnOnce(&LoadResult) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn report(mut self, outcome: LoadResult) {
        self.finish(outcome);
    }

    fn finish(&mut self, outcome: LoadResult) {
        if let Some(observer) = self.observer.take() {
            observer(&outcome);
        }
        if let Some(tx) = self.tx.take() {
            // The waiting side may have been dropped; nobody is left to tell.
            let _ = tx.send(outcome);
        }
    }
}

impl Drop for LoadReporter {
    fn drop(&mut self) {
        if self.tx.is_some() {
            self.finish(Err(ScriptLoadError::Abandoned));
        }
    }
}

impl fmt::Debug for LoadReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadReporter")
            .field("reported", &self.tx.is_none())
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

impl Future for ScriptLoad {
    type Output = LoadResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(Err(ScriptLoadError::Abandoned)))
    }
}

/// Document the widget is bootstrapped into.
///
/// Implementations own whatever global scope the remote SDK reads from
/// (the `window` object in a browser, inline scripts in rendered HTML).
pub trait HostPage {
    /// Assigns a page-wide global, replacing any previous value for `key`.
    fn set_global(&self, key: &str, value: &Value) -> Result<(), PageError>;

    /// Inserts `tag` before the first existing script element in document order.
    /// The page reports the load result through `reporter` once it is known.
    fn insert_script(&self, tag: ScriptTag, reporter: LoadReporter) -> Result<(), PageError>;
}
