//! Tenant branding and the template context merge.
//!
//! Precedence, lowest to highest: built-in defaults, tenant branding, event
//! data. The shared `TenantBranding` record is only ever read.

use crate::error::{NotificationError, NotificationResult};
use crate::models::{NotificationType, Sender};
use async_trait::async_trait;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

pub const DEFAULT_COMPANY_NAME: &str = "the operator";
pub const DEFAULT_CONTACT_EMAIL: &str = "support@example.com";
pub const DEFAULT_PRIMARY_COLOR: &str = "#1f2937";
pub const DEFAULT_SECONDARY_COLOR: &str = "#4b5563";
pub const DEFAULT_ACCENT_COLOR: &str = "#2563eb";

/// Tenant social profiles shown in the footer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tripadvisor: Option<String>,
}

impl SocialLinks {
    pub fn is_empty(&self) -> bool {
        self.facebook.is_none()
            && self.instagram.is_none()
            && self.twitter.is_none()
            && self.tripadvisor.is_none()
    }
}

/// Tenant identity injected into otherwise generic templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantBranding {
    pub company_name: Option<String>,
    pub logo_url: Option<String>,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub accent_color: Option<String>,
    pub contact_email: Option<String>,
    pub support_email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub social_links: SocialLinks,
    /// Sender identity override for this tenant's mail.
    pub sender_name: Option<String>,
    pub sender_email: Option<String>,
    /// Where admin booking alerts for this tenant go.
    pub admin_email: Option<String>,
}

impl TenantBranding {
    /// Sender override, present only when the tenant set a sender address.
    pub fn sender(&self) -> Option<Sender> {
        self.sender_email.as_ref().map(|email| {
            Sender::new(
                email.clone(),
                self.sender_name.clone().or_else(|| self.company_name.clone()),
            )
        })
    }

    /// Address replies should go to.
    pub fn reply_to(&self) -> Option<&str> {
        self.support_email
            .as_deref()
            .or(self.contact_email.as_deref())
    }

    /// Context entries this tenant overrides. Unset fields are left out.
    fn overrides(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let fields = [
            ("company_name", &self.company_name),
            ("logo_url", &self.logo_url),
            ("primary_color", &self.primary_color),
            ("secondary_color", &self.secondary_color),
            ("accent_color", &self.accent_color),
            ("contact_email", &self.contact_email),
            ("phone", &self.phone),
            ("website", &self.website),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                map.insert(key.to_string(), Value::String(value.clone()));
            }
        }
        if let Some(support) = self.reply_to() {
            map.insert("support_email".to_string(), Value::String(support.to_string()));
        }
        if !self.social_links.is_empty() {
            if let Ok(links) = serde_json::to_value(&self.social_links) {
                map.insert("social_links".to_string(), links);
            }
        }
        map
    }
}

fn default_branding() -> Map<String, Value> {
    let mut map = Map::new();
    let defaults = [
        ("company_name", DEFAULT_COMPANY_NAME),
        ("logo_url", ""),
        ("primary_color", DEFAULT_PRIMARY_COLOR),
        ("secondary_color", DEFAULT_SECONDARY_COLOR),
        ("accent_color", DEFAULT_ACCENT_COLOR),
        ("contact_email", DEFAULT_CONTACT_EMAIL),
        ("support_email", DEFAULT_CONTACT_EMAIL),
        ("phone", ""),
        ("website", ""),
    ];
    for (key, value) in defaults {
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
    map
}

/// Build the render context for one send.
///
/// `{ year, notification_type, ...defaults, ...branding, ...event data }`.
/// Null event fields are skipped so an absent optional never erases branding.
pub fn build_template_context<D>(
    notification_type: NotificationType,
    data: &D,
    branding: Option<&TenantBranding>,
) -> NotificationResult<Map<String, Value>>
where
    D: Serialize + ?Sized,
{
    let mut context = Map::new();
    context.insert("year".to_string(), Value::from(chrono::Utc::now().year()));
    context.insert(
        "notification_type".to_string(),
        Value::String(notification_type.as_str().to_string()),
    );
    context.extend(default_branding());

    if let Some(branding) = branding {
        context.extend(branding.overrides());
    }

    match serde_json::to_value(data)? {
        Value::Object(fields) => {
            context.extend(fields.into_iter().filter(|(_, value)| !value.is_null()));
        }
        Value::Null => {}
        other => {
            return Err(NotificationError::InvalidInput(format!(
                "event data for {} must be an object, got {}",
                notification_type, other
            )))
        }
    }

    Ok(context)
}

/// Read-only access to tenant branding, owned by the storefront.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrandingResolver: Send + Sync {
    /// Branding for a tenant, `None` for unknown or untenanted callers.
    async fn resolve(&self, tenant_id: &str) -> Option<TenantBranding>;
}

/// Map-backed resolver, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticBrandingResolver {
    tenants: HashMap<String, TenantBranding>,
}

impl StaticBrandingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>, branding: TenantBranding) -> Self {
        self.tenants.insert(tenant_id.into(), branding);
        self
    }
}

#[async_trait]
impl BrandingResolver for StaticBrandingResolver {
    async fn resolve(&self, tenant_id: &str) -> Option<TenantBranding> {
        self.tenants.get(tenant_id).cloned()
    }
}
