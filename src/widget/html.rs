use crate::widget::page::{HostPage, LoadOutcome, LoadReporter, PageError, ScriptTag};
use crate::widget::settings::WidgetSettings;
use crate::widget::{BootstrapError, WidgetBootstrap};
use kuchiki::NodeRef;
use kuchiki::traits::*;
use serde_json::Value;
use tracing::debug;

/// Global the loaded `sdk.js` installs its entry point under.
pub const SDK_GLOBAL: &str = "chatwootSDK";
const GLOBAL_ATTR: &str = "data-chatwoot-global";

/// Server-side host page: an HTML document the bootstrap is rendered into.
///
/// Globals become inline `<script>` assignments at the top of `<head>` so they
/// run before any injected script. Script loads happen in the client browser,
/// so every load is reported as [`LoadOutcome::HandedOff`].
pub struct HtmlPage {
    document: NodeRef,
}

impl HtmlPage {
    pub fn parse(html: &str) -> Self {
        Self {
            document: kuchiki::parse_html().one(html),
        }
    }

    pub fn to_html(&self) -> String {
        self.document.to_string()
    }

    fn container(&self) -> Result<NodeRef, PageError> {
        self.document
            .select_first("head")
            .or_else(|_| self.document.select_first("body"))
            .map(|node| node.as_node().clone())
            .map_err(|_| PageError::Html("document has neither head nor body".into()))
    }
}

impl HostPage for HtmlPage {
    fn set_global(&self, key: &str, value: &Value) -> Result<(), PageError> {
        let json = serde_json::to_string(value)
            .map_err(|e| PageError::Html(format!("serialize global {key}: {e}")))?;
        let text = NodeRef::new_text(format!("window.{key} = {};", escape_script(&json)));

        let selector = format!("script[{GLOBAL_ATTR}=\"{key}\"]");
        if let Ok(existing) = self.document.select_first(&selector) {
            let node = existing.as_node();
            let children: Vec<_> = node.children().collect();
            for child in children {
                child.detach();
            }
            node.append(text);
            debug!(%key, "replaced page global");
            return Ok(());
        }

        let script = parse_element(&format!("<script {GLOBAL_ATTR}=\"{key}\"></script>"))?;
        script.append(text);
        self.container()?.prepend(script);
        debug!(%key, "assigned page global");
        Ok(())
    }

    fn insert_script(&self, tag: ScriptTag, reporter: LoadReporter) -> Result<(), PageError> {
        let run_args = serde_json::to_string(&tag.on_load)
            .map_err(|e| PageError::Html(format!("serialize sdk run options: {e}")))?;
        let script = parse_element("<script></script>")?;
        if let Some(element) = script.as_element() {
            let mut attrs = element.attributes.borrow_mut();
            attrs.insert("src", tag.src.clone());
            if tag.defer {
                attrs.insert("defer", String::new());
            }
            if tag.async_load {
                attrs.insert("async", String::new());
            }
            attrs.insert("onload", format!("window.{SDK_GLOBAL}.run({run_args})"));
        }

        match self
            .document
            .select_first(&format!("script:not([{GLOBAL_ATTR}])"))
        {
            Ok(first) => first.as_node().insert_before(script),
            Err(()) => self.container()?.append(script),
        }
        debug!(src = %tag.src, "inserted sdk script");
        reporter.report(Ok(LoadOutcome::HandedOff));
        Ok(())
    }
}

/// Parses `html`, bootstraps the widget into it and serialises the result.
pub fn render_with_widget(html: &str, settings: WidgetSettings) -> Result<String, BootstrapError> {
    let page = HtmlPage::parse(html);
    // Rendered pages resolve as handed off; nothing to wait for here.
    let _handed_off = WidgetBootstrap::new().initialize(Some(&page), settings)?;
    Ok(page.to_html())
}

fn parse_element(markup: &str) -> Result<NodeRef, PageError> {
    // Parse wrapped to get a detached element out of a full document parse
    let wrapper_html = format!("<div id=\"__chatwoot_wrapper\">{markup}</div>");
    let fragment_doc = kuchiki::parse_html().one(wrapper_html);
    let wrapper = fragment_doc
        .select_first("#__chatwoot_wrapper")
        .map_err(|_| PageError::Html("select wrapper failed".into()))?;
    let node = wrapper
        .as_node()
        .first_child()
        .ok_or_else(|| PageError::Html(format!("no element parsed from {markup}")))?;
    node.detach();
    Ok(node)
}

/// Keeps markup-significant characters out of inline script text. Inside JSON
/// strings the `\uXXXX` forms decode to the same value.
fn escape_script(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for ch in json.chars() {
        match ch {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            _ => out.push(ch),
        }
    }
    out
}
