//! Settings API.

use crate::client::ExamdeskClient;
use crate::error::{Error, Result};
use crate::types::PublicSettings;

/// Settings API client.
///
/// Public settings do not require authentication.
pub struct SettingsApi {
    client: ExamdeskClient,
}

impl SettingsApi {
    pub(crate) fn new(client: ExamdeskClient) -> Self {
        Self { client }
    }

    /// Get the public site settings.
    pub async fn public(&self) -> Result<PublicSettings> {
        let settings: PublicSettings = self.client.get("settings/public").await?;
        if !settings.success {
            return Err(Error::Unsuccessful(
                "settings/public returned success=false".to_string(),
            ));
        }
        Ok(settings)
    }
}
