//! Storefront Notification CLI
//!
//! Operator tool for the booking notification pipeline: send one
//! notification from a JSON event, preview the rendered email, or check
//! that the configured provider is reachable.
//!
//! ## Usage
//!
//! ```text
//! storefront_notify send --type booking-confirmation --to ana@example.com \
//!     --data @booking.json --branding @tenant.json
//! storefront_notify preview --type welcome --data '{"customer_name":"Ana"}'
//! storefront_notify health
//! ```
//!
//! `--data` and `--branding` take inline JSON, or a file path prefixed with `@`.
//! Provider settings come from the environment (see `core_config::EmailConfig`).

use booking_email::{
    build_provider, DeliveryOutcome, NotificationService, NotificationType, RecordingProvider,
    TenantBranding,
};
use clap::{Parser, Subcommand};
use core_config::{EmailConfig, Environment, FromEnv};
use eyre::{bail, Result, WrapErr};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Send and preview storefront booking notifications")]
pub struct Cli {
    /// Print Prometheus metrics after the command finishes
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render and deliver one notification
    Send {
        /// Notification type, e.g. booking-confirmation
        #[arg(short = 't', long = "type")]
        notification_type: NotificationType,

        /// Recipient address (admin booking alerts resolve their own)
        #[arg(long)]
        to: Option<String>,

        /// Event data as JSON or @path
        #[arg(short, long)]
        data: String,

        /// Tenant branding as JSON or @path
        #[arg(short, long)]
        branding: Option<String>,
    },
    /// Render subject and body without sending
    Preview {
        #[arg(short = 't', long = "type")]
        notification_type: NotificationType,

        #[arg(short, long)]
        data: String,

        #[arg(short, long)]
        branding: Option<String>,
    },
    /// Verify the configured provider can be reached
    Health,
}

/// Parse and run the CLI.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    if cli.metrics {
        observability::init_metrics().wrap_err("Failed to install metrics recorder")?;
    }

    execute(cli.command).await?;

    if cli.metrics {
        print!("{}", observability::render_metrics());
    }

    Ok(())
}

async fn execute(command: Command) -> Result<()> {
    match command {
        Command::Send {
            notification_type,
            to,
            data,
            branding,
        } => {
            let config = EmailConfig::from_env().wrap_err("Failed to load email configuration")?;
            let provider = build_provider(&config).wrap_err("Failed to create email provider")?;
            let service = NotificationService::from_config(&config, provider);

            let data = read_json_arg(&data).wrap_err("Invalid --data")?;
            let branding = read_branding(branding.as_deref())?;

            let outcome = service
                .send_event(notification_type, to.as_deref(), data, branding.as_ref())
                .await
                .wrap_err_with(|| format!("Failed to send {}", notification_type))?;

            report(notification_type, &outcome);
        }
        Command::Preview {
            notification_type,
            data,
            branding,
        } => {
            let config = EmailConfig::from_env().wrap_err("Failed to load email configuration")?;
            // Preview never delivers; the recording provider keeps provider
            // credentials optional.
            let service = NotificationService::from_config(&config, Arc::new(RecordingProvider::new()));

            let data = read_json_arg(&data).wrap_err("Invalid --data")?;
            let branding = read_branding(branding.as_deref())?;

            let message = service
                .preview(notification_type, &data, branding.as_ref())
                .await
                .wrap_err_with(|| format!("Failed to render {}", notification_type))?;

            println!("Subject: {}", message.subject);
            println!();
            println!("{}", message.html);
        }
        Command::Health => {
            let config = EmailConfig::from_env().wrap_err("Failed to load email configuration")?;
            let provider = build_provider(&config).wrap_err("Failed to create email provider")?;

            provider
                .health_check()
                .await
                .wrap_err_with(|| format!("Provider '{}' is unhealthy", provider.name()))?;

            info!(provider = provider.name(), "Provider is healthy");
            println!("{}: ok", provider.name());
        }
    }

    Ok(())
}

fn report(notification_type: NotificationType, outcome: &DeliveryOutcome) {
    match outcome {
        DeliveryOutcome::Delivered { message_id } => {
            info!(%notification_type, %message_id, "Notification delivered");
            println!("delivered {}", message_id);
        }
        DeliveryOutcome::Degraded {
            message_id,
            omitted,
            reason,
        } => {
            warn!(%notification_type, %message_id, ?omitted, ?reason, "Notification delivered without some artifacts");
            println!("degraded {} ({:?})", message_id, reason);
        }
        DeliveryOutcome::Skipped { reason } => {
            warn!(%notification_type, %reason, "Notification skipped");
            println!("skipped: {}", reason);
        }
    }
}

/// Inline JSON, or the contents of a file when the argument starts with `@`.
pub fn read_json_arg(arg: &str) -> Result<Value> {
    let raw = match arg.strip_prefix('@') {
        Some(path) => {
            std::fs::read_to_string(path).wrap_err_with(|| format!("Failed to read {}", path))?
        }
        None => arg.to_string(),
    };

    let value: Value = serde_json::from_str(&raw).wrap_err("Malformed JSON")?;
    if !value.is_object() {
        bail!("expected a JSON object");
    }
    Ok(value)
}

fn read_branding(arg: Option<&str>) -> Result<Option<TenantBranding>> {
    arg.map(|raw| {
        let value = read_json_arg(raw).wrap_err("Invalid --branding")?;
        serde_json::from_value(value).wrap_err("Invalid --branding")
    })
    .transpose()
}
