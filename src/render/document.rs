//! HTML document shell assembly.
//!
//! Wraps a rendered fragment with the head metadata, style links, script
//! tags, and hydration globals that make the page load in a browser.

use crate::utils::html::{escape_attr, script_safe_json};

/// Variables injected into the document shell for one response.
pub struct DocumentVars<'a> {
    /// Head markup captured during the render (title, meta).
    pub head: &'a str,
    /// Rendered application fragment, mounted at `#root`.
    pub body: &'a str,
    /// Script files, in load order.
    pub scripts: &'a [String],
    /// Stylesheet files, in load order.
    pub styles: &'a [String],
    /// Values serialized onto `window.*` before the scripts run.
    pub globals: &'a serde_json::Map<String, serde_json::Value>,
}

const SHELL: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta http-equiv="X-UA-Compatible" content="IE=edge">
<meta name="viewport" content="width=device-width, initial-scale=1">
{{head}}<base href="/">
{{styles}}</head>
<body>
<div id="root">{{body}}</div>
{{globals}}{{scripts}}</body>
</html>
"#;

/// Produce the full HTML document for one response.
pub fn render_document(vars: &DocumentVars) -> String {
    SHELL
        .replace("{{head}}", vars.head)
        .replace("{{styles}}", &style_tags(vars.styles))
        .replace("{{body}}", vars.body)
        .replace("{{globals}}", &globals_script(vars.globals))
        .replace("{{scripts}}", &script_tags(vars.scripts))
}

fn style_tags(styles: &[String]) -> String {
    styles
        .iter()
        .map(|file| format!("<link rel=\"stylesheet\" href=\"/{}\">\n", escape_attr(file)))
        .collect()
}

fn script_tags(scripts: &[String]) -> String {
    scripts
        .iter()
        .map(|file| format!("<script src=\"/{}\"></script>\n", escape_attr(file)))
        .collect()
}

/// Globals land on `window.*` before the bundle scripts execute, so the
/// client can hydrate against the state the server rendered with.
fn globals_script(globals: &serde_json::Map<String, serde_json::Value>) -> String {
    if globals.is_empty() {
        return String::new();
    }

    let assignments: String = globals
        .iter()
        .map(|(key, value)| format!("window.{key}={};", script_safe_json(value)))
        .collect();
    format!("<script>{assignments}</script>\n")
}

// ============================================================================
// Tests
// ============================================================================
