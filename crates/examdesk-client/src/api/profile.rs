//! Profile API.

use crate::client::ExamdeskClient;
use crate::error::Result;
use crate::types::{ProfileResponse, UserProfile};

/// Profile API client.
pub struct ProfileApi {
    client: ExamdeskClient,
}

impl ProfileApi {
    pub(crate) fn new(client: ExamdeskClient) -> Self {
        Self { client }
    }

    /// Fetch the profile for `token`.
    ///
    /// Bounded by the client's profile timeout. A 401/403 comes back as
    /// [`crate::Error::Auth`].
    pub async fn get(&self, token: &str) -> Result<UserProfile> {
        let timeout = self.client.profile_timeout();
        let response: ProfileResponse = self
            .client
            .get_authorized("profile", token, timeout)
            .await?;
        Ok(response.profile)
    }
}
