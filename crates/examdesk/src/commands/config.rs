//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};
use console::{Style, style};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./examdesk.toml) instead of user config
        #[arg(long)]
        local: bool,
    },

    /// Show configuration file path
    Path,
}

/// Run the config command.
pub fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(),
        ConfigCommand::Init { local } => cmd_init(local),
        ConfigCommand::Path => cmd_path(),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let mut effective = ctx.config.clone();
    effective.server = Some(ctx.config.server());
    effective.cache = Some(ctx.config.cache());
    effective.site = Some(ctx.config.site());
    effective.set_storage_dir(ctx.data_dir.as_path());

    if ctx.json_output {
        return ctx.print_json(&effective);
    }

    let dim = Style::new().dim();
    println!("{}", dim.apply_to("# examdesk configuration"));
    if ctx.sources.is_empty() {
        println!("{}", dim.apply_to("# No config files loaded (using defaults)"));
    } else {
        for source in &ctx.sources {
            println!("{}", dim.apply_to(format!("# from {}", source.display())));
        }
    }
    println!();
    print!("{}", effective.to_toml()?);

    if let Err(e) = effective.validate() {
        println!();
        println!("{} {}", Style::new().yellow().apply_to("!"), e);
    }
    Ok(())
}

fn cmd_which() -> Result<()> {
    let loaded = examdesk_config::load_config(None)?;

    println!("Config file search order (later overrides earlier):\n");

    for source in &loaded.sources {
        let status = if source.loaded {
            Style::new().green().apply_to("✓ loaded")
        } else {
            Style::new().dim().apply_to("· not found")
        };
        println!("  {} {}", status, source.path.display());
    }
    for warning in &loaded.warnings {
        println!("  {} {}", Style::new().yellow().apply_to("!"), warning);
    }

    println!();
    let loaded_count = loaded.loaded_from().len();
    if loaded_count == 0 {
        println!("No config files found. Run 'examdesk config init' to create one.");
    } else {
        println!("{} config file(s) loaded.", loaded_count);
    }

    Ok(())
}

const TEMPLATE: &str = r#"# examdesk configuration

# Backend connection
[server]
url = "http://localhost:3000/api/"
timeout_secs = 30
# Profile check timeout; a timeout never ends the session
profile_timeout_secs = 10
# user_agent = "examdesk"

# Site settings cache
[cache]
ttl_secs = 300

# Persisted session and exam progress (default: platform data dir)
# [storage]
# dir = "/path/to/examdesk-data"

# Shown until the site settings have been fetched
[site]
fallback_name = "Certification Exams"
fallback_logo_url = "/logo.png"
# fallback_contact_email = "support@example.com"
"#;

fn cmd_init(local: bool) -> Result<()> {
    let path = if local {
        PathBuf::from("examdesk.toml")
    } else {
        let dir = examdesk_config::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;
        std::fs::create_dir_all(&dir)?;
        dir.join("config.toml")
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    std::fs::write(&path, TEMPLATE)?;
    println!(
        "{} Created config file: {}",
        Style::new().green().apply_to("✓"),
        path.display()
    );
    println!();
    println!("{}", style("Next steps:").bold());
    println!("  examdesk config show       # verify configuration");
    println!("  examdesk auth login        # log in with a token");

    Ok(())
}

fn cmd_path() -> Result<()> {
    match examdesk_config::config_path() {
        Some(path) => println!("{}", path.display()),
        None => eprintln!("Could not determine config directory"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_to_defaults() {
        let config = examdesk_config::ExamdeskConfig::from_toml(TEMPLATE).unwrap();
        let defaults = examdesk_config::ExamdeskConfig::with_defaults();
        assert_eq!(config.server(), defaults.server());
        assert_eq!(config.cache(), defaults.cache());
        assert_eq!(config.site(), defaults.site());
        assert!(config.storage.is_none());
    }
}
