//! Settings command - public site settings.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};
use examdesk_cache::{CacheConfig, ContactDetails, SiteFallbacks, SiteSettings};
use serde::Serialize;

use super::Context;

/// Arguments for the settings command.
#[derive(Args, Debug)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Fetch and show site name, logo and contact details
    Show,
}

/// Settings for JSON output.
#[derive(Debug, Serialize)]
struct SettingsOutput {
    site_name: String,
    logo_url: String,
    contact: ContactDetails,
    /// Settings that could not be fetched and show their fallback.
    fallbacks: Vec<&'static str>,
}

/// Run the settings command.
pub async fn run(args: SettingsArgs, ctx: &Context) -> Result<()> {
    match args.command {
        SettingsCommand::Show => cmd_show(ctx).await,
    }
}

async fn cmd_show(ctx: &Context) -> Result<()> {
    let site_config = ctx.config.site();
    let fallbacks = SiteFallbacks {
        site_name: site_config.fallback_name,
        logo_url: site_config.fallback_logo_url,
        contact: ContactDetails {
            email: site_config.fallback_contact_email,
            ..ContactDetails::default()
        },
    };
    let cache_config = CacheConfig::new().with_ttl(ctx.config.cache().ttl());
    let site = SiteSettings::new(ctx.client()?, cache_config, fallbacks);

    let [name, logo, contact] = site.revalidate_all().await;
    let mut failed = Vec::new();
    for (field, result) in [("site_name", name), ("logo_url", logo), ("contact", contact)] {
        if let Err(e) = result {
            tracing::debug!(field, error = %e, "Showing fallback");
            failed.push((field, e.to_string()));
        }
    }

    let output = SettingsOutput {
        site_name: site.site_name().current(),
        logo_url: site.logo().current(),
        contact: site.contact().current(),
        fallbacks: failed.iter().map(|(field, _)| *field).collect(),
    };

    if ctx.json_output {
        return ctx.print_json(&output);
    }

    let dim = Style::new().dim();
    let yellow = Style::new().yellow();
    println!();
    println!("{}", style("Site Settings").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    println!("  {} {}", dim.apply_to("Name:"), output.site_name);
    println!("  {} {}", dim.apply_to("Logo:"), output.logo_url);

    let contact = &output.contact;
    if contact.is_empty() {
        println!("  {} {}", dim.apply_to("Contact:"), dim.apply_to("none"));
    } else {
        for (label, value) in [
            ("Email:", &contact.email),
            ("Phone:", &contact.phone),
            ("Address:", &contact.address),
            ("Website:", &contact.website),
        ] {
            if let Some(value) = value {
                println!("  {} {}", dim.apply_to(label), value);
            }
        }
    }

    if !failed.is_empty() {
        println!();
        for (field, error) in &failed {
            if ctx.verbose {
                println!("  {} {}: {}", yellow.apply_to("!"), field, error);
            } else {
                println!("  {} {} (showing fallback)", yellow.apply_to("!"), field);
            }
        }
    }

    println!();
    Ok(())
}
