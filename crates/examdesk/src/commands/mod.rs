//! CLI command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use examdesk_client::ExamdeskClient;
use examdesk_config::ExamdeskConfig;
use examdesk_state::store::{self, SharedStore};
use examdesk_state::{AuthSession, ExamAttemptStore};

pub mod attempts;
pub mod auth;
pub mod config;
pub mod courses;
pub mod exam_url;
pub mod settings;
pub mod slug;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Effective configuration, CLI overrides applied.
    pub config: ExamdeskConfig,
    /// Config files that were loaded, lowest precedence first.
    pub sources: Vec<PathBuf>,
    /// Directory holding persisted state.
    pub data_dir: PathBuf,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Build an API client from `[server]`.
    pub fn client(&self) -> Result<ExamdeskClient> {
        let server = self.config.server();
        let mut builder = ExamdeskClient::builder()
            .base_url(&server.url)
            .timeout(server.timeout())
            .profile_timeout(server.profile_timeout());
        if let Some(agent) = &server.user_agent {
            builder = builder.user_agent(agent);
        }
        builder
            .build()
            .with_context(|| format!("Invalid server URL '{}'", server.url))
    }

    /// Open the persisted state store.
    pub fn store(&self) -> Result<SharedStore> {
        store::create_file_store(&self.data_dir)
            .with_context(|| format!("Failed to open state in {}", self.data_dir.display()))
    }

    /// Session manager over the persisted store.
    pub fn session(&self) -> Result<AuthSession> {
        Ok(AuthSession::new(self.store()?, Arc::new(self.client()?)))
    }

    /// Exam progress over the persisted store.
    pub fn attempts(&self) -> Result<ExamAttemptStore> {
        Ok(ExamAttemptStore::open(self.store()?))
    }

    /// Print `value` as pretty JSON.
    pub fn print_json<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}
