//! Email template rendering with Handlebars
//!
//! This module provides:
//! - `TemplateEngine`: renders HTML bodies and plain-text subjects
//! - `TemplateStore` trait with embedded, directory and in-memory stores
//!
//! Templates support:
//! - Variables: `{{customer_name}}` (HTML-escaped, missing renders empty)
//! - Conditionals: `{{#if special_requests}}...{{/if}}`
//! - Loops: `{{#each pricing.line_items}}...{{/each}}`
//! - Helpers: `eq`, `or`, `money` and `discount`

pub mod store;

pub use store::{DirectoryTemplateStore, EmbeddedTemplateStore, InMemoryTemplateStore, TemplateStore};

use crate::error::NotificationResult;
use crate::models::{parse_amount, NotificationType, RenderedMessage};
use handlebars::{
    Context, Handlebars, Helper, HelperResult, Output, RenderContext,
};
use serde_json::{Map, Value};
use tracing::warn;

/// Entities the HTML escaper can emit.
const SUBJECT_ENTITIES: [(&str, &str); 8] = [
    ("&amp;", "&"),
    ("&#x27;", "'"),
    ("&#x60;", "`"),
    ("&#x3D;", "="),
    ("&#39;", "'"),
    ("&quot;", "\""),
    ("&lt;", "<"),
    ("&gt;", ">"),
];

/// `{{money value [currency]}}`
///
/// Numbers are printed with two decimals, optionally prefixed with the
/// currency code. Strings are treated as already formatted and printed as-is.
fn money_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = h.param(0).map(|p| p.value()).unwrap_or(&Value::Null);
    let currency = h.param(1).and_then(|p| p.value().as_str());

    out.write(&handlebars::html_escape(&money_text(value, currency)))?;
    Ok(())
}

/// `{{discount value [currency]}}`
///
/// Like `money`, but always rendered as a single deduction (`-USD 20.00`,
/// `-$20.00`) whatever sign the upstream value carries.
fn discount_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = h.param(0).map(|p| p.value()).unwrap_or(&Value::Null);
    let currency = h.param(1).and_then(|p| p.value().as_str());

    let text = match value {
        Value::Number(n) => money_text(&Value::from(n.as_f64().unwrap_or_default().abs()), currency),
        other => money_text(other, currency).trim_start_matches('-').trim().to_string(),
    };
    if !text.is_empty() {
        out.write(&handlebars::html_escape(&format!("-{}", text)))?;
    }
    Ok(())
}

fn money_text(value: &Value, currency: Option<&str>) -> String {
    match value {
        Value::Number(n) => format_money(n.as_f64().unwrap_or_default(), currency),
        Value::String(s) if s.trim().parse::<f64>().is_ok() => {
            format_money(parse_amount(s), currency)
        }
        Value::String(s) => s.clone(),
        _ => String::new(),
    }
}

/// Two-decimal money text, e.g. `USD 180.00`.
pub fn format_money(amount: f64, currency: Option<&str>) -> String {
    match currency {
        Some(code) if !code.is_empty() => format!("{} {:.2}", code, amount),
        _ => format!("{:.2}", amount),
    }
}

/// Undo the escaping Handlebars applies, for plain-text headers.
///
/// Repeats until nothing changes, so entities already present in event
/// text (`R&amp;B`) come out plain too.
pub fn decode_entities(text: &str) -> String {
    let mut decoded = text.to_string();
    loop {
        let next = SUBJECT_ENTITIES
            .iter()
            .fold(decoded.clone(), |acc, (entity, plain)| acc.replace(entity, plain));
        if next == decoded {
            return decoded;
        }
        decoded = next;
    }
}

/// Literal `{{...}}` tokens left in rendered output.
pub fn unresolved_placeholders(rendered: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = rendered;
    while let Some(start) = rest.find("{{") {
        let tail = &rest[start..];
        match tail.find("}}") {
            Some(end) => {
                found.push(tail[..end + 2].to_string());
                rest = &tail[end + 2..];
            }
            None => break,
        }
    }
    found
}

/// Handlebars-based template engine.
///
/// Templates are compiled per render. Nothing rendered is cached.
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.register_helper("money", Box::new(money_helper));
        handlebars.register_helper("discount", Box::new(discount_helper));
        Self { handlebars }
    }

    /// Render an HTML body against a context.
    pub fn render(&self, source: &str, context: &Map<String, Value>) -> NotificationResult<String> {
        Ok(self.handlebars.render_template(source, context)?)
    }

    /// Render a subject line. The result is plain text, never HTML-escaped.
    pub fn render_subject(
        &self,
        subject_template: &str,
        context: &Map<String, Value>,
    ) -> NotificationResult<String> {
        let rendered = self.handlebars.render_template(subject_template, context)?;
        Ok(decode_entities(rendered.trim()))
    }

    /// Render subject and body for one notification.
    pub fn render_message(
        &self,
        notification_type: NotificationType,
        source: &str,
        context: &Map<String, Value>,
    ) -> NotificationResult<RenderedMessage> {
        let html = self.render(source, context)?;
        let subject = self.render_subject(notification_type.default_subject(), context)?;

        let leftovers = unresolved_placeholders(&html);
        if !leftovers.is_empty() {
            warn!(
                notification_type = %notification_type,
                placeholders = ?leftovers,
                "Rendered email still contains template tokens"
            );
        }

        Ok(RenderedMessage { subject, html })
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}
