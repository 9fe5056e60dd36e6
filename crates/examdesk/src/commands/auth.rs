//! Auth command - session management.

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use console::{Style, style};
use examdesk_client::FaultKind;
use examdesk_state::{SessionState, VerifyOutcome, claims};
use serde::Serialize;

use super::Context;

/// Arguments for the auth command.
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Log in with a bearer token
    Login {
        /// Token to use (prompted for when omitted)
        #[arg(long)]
        token: Option<String>,
    },

    /// Clear the stored session
    Logout,

    /// Verify the stored session and show who is logged in
    Status,
}

/// Session summary for JSON output.
#[derive(Debug, Serialize)]
struct SessionOutput {
    logged_in: bool,
    verification: String,
    name: Option<String>,
    email: Option<String>,
    role: Option<String>,
    /// From the token's own claim; not checked against the server.
    token_expires_hint: Option<DateTime<Utc>>,
}

impl SessionOutput {
    fn new(state: &SessionState, outcome: VerifyOutcome) -> Self {
        let user = state.user.as_ref();
        Self {
            logged_in: state.is_logged_in,
            verification: describe(outcome),
            name: user.and_then(|u| u.name.clone()),
            email: user.and_then(|u| u.email.clone()),
            role: user.and_then(|u| u.role.clone()),
            token_expires_hint: state.token.as_deref().and_then(claims::peek_expiry),
        }
    }
}

/// Run the auth command.
pub async fn run(args: AuthArgs, ctx: &Context) -> Result<()> {
    match args.command {
        AuthCommand::Login { token } => cmd_login(token, ctx).await,
        AuthCommand::Logout => cmd_logout(ctx),
        AuthCommand::Status => cmd_status(ctx).await,
    }
}

async fn cmd_login(token: Option<String>, ctx: &Context) -> Result<()> {
    let token = match token {
        Some(token) => token,
        None => rpassword::prompt_password("Token: ")?,
    };

    let session = ctx.session()?;
    let outcome = session.login(&token).await?;
    let state = session.snapshot();

    if outcome == VerifyOutcome::Rejected {
        bail!("The server rejected this token");
    }

    if ctx.json_output {
        return ctx.print_json(&SessionOutput::new(&state, outcome));
    }

    let green = Style::new().green();
    let yellow = Style::new().yellow();
    let dim = Style::new().dim();
    match &state.user {
        Some(user) => println!(
            "{} Logged in as {}",
            green.apply_to("✓"),
            style(user.display_name()).bold()
        ),
        None => {
            println!(
                "{} Logged in, but the profile check did not complete ({})",
                yellow.apply_to("!"),
                describe(outcome)
            );
            println!(
                "  {}",
                dim.apply_to("The session is kept; run 'examdesk auth status' to retry.")
            );
        }
    }
    Ok(())
}

fn cmd_logout(ctx: &Context) -> Result<()> {
    let session = ctx.session()?;
    session.logout()?;

    if ctx.json_output {
        return ctx.print_json(&serde_json::json!({ "logged_in": false }));
    }
    println!("{} Logged out", Style::new().green().apply_to("✓"));
    Ok(())
}

async fn cmd_status(ctx: &Context) -> Result<()> {
    let session = ctx.session()?;
    let outcome = session.restore().await;
    let state = session.snapshot();

    if ctx.json_output {
        return ctx.print_json(&SessionOutput::new(&state, outcome));
    }

    let dim = Style::new().dim();
    println!();
    println!("{}", style("Session").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();

    if !state.is_logged_in {
        let red = Style::new().red();
        let status = if outcome == VerifyOutcome::Rejected {
            "● logged out (token rejected)"
        } else {
            "● logged out"
        };
        println!("  {} {}", dim.apply_to("Status:"), red.apply_to(status));
        println!();
        println!("  {}", dim.apply_to("Log in with: examdesk auth login"));
        println!();
        return Ok(());
    }

    let green = Style::new().green();
    let yellow = Style::new().yellow();
    let status = match outcome {
        VerifyOutcome::Verified => green.apply_to("● logged in (verified)".to_string()),
        other => yellow.apply_to(format!("● logged in ({})", describe(other))),
    };
    println!("  {} {}", dim.apply_to("Status:"), status);

    if let Some(user) = &state.user {
        println!("  {} {}", dim.apply_to("User:"), user.display_name());
        if let Some(email) = &user.email {
            println!("  {} {}", dim.apply_to("Email:"), email);
        }
        if let Some(role) = &user.role {
            println!("  {} {}", dim.apply_to("Role:"), role);
        }
    }

    if let Some(token) = state.token.as_deref()
        && let Some(expires) = claims::peek_expiry(token)
    {
        let note = if claims::appears_expired(token, Utc::now()) {
            "expired according to its own claim"
        } else {
            "according to its own claim"
        };
        println!(
            "  {} {} {}",
            dim.apply_to("Token:"),
            expires.to_rfc3339(),
            dim.apply_to(format!("({})", note))
        );
    }

    println!();
    Ok(())
}

fn describe(outcome: VerifyOutcome) -> String {
    match outcome {
        VerifyOutcome::Verified => "verified".to_string(),
        VerifyOutcome::Rejected => "rejected".to_string(),
        VerifyOutcome::Transient(FaultKind::Timeout) => "server timed out".to_string(),
        VerifyOutcome::Transient(FaultKind::Unreachable) => "server unreachable".to_string(),
        VerifyOutcome::Transient(FaultKind::Status(status)) => {
            format!("server answered {}", status)
        }
        VerifyOutcome::Transient(_) => "unexpected server response".to_string(),
        VerifyOutcome::Superseded => "superseded".to_string(),
        VerifyOutcome::NoToken => "no token".to_string(),
    }
}
