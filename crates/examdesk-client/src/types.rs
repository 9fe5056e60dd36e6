//! Request and response types for the examdesk API.
//!
//! These types mirror the backend's API contract. Unknown fields are kept
//! in `extra` maps so that persisting and re-reading a record is lossless.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─────────────────────────────────────────────────────────────────────────────
// Profile
// ─────────────────────────────────────────────────────────────────────────────

/// The authenticated user's profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Role, e.g. `"user"` or `"admin"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Every other field the backend returns.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl UserProfile {
    /// Best available human-readable name.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("unknown user")
    }

    /// Whether the profile carries the admin role.
    ///
    /// This only decides what UI to show. The backend enforces access on
    /// every admin request regardless.
    pub fn is_admin(&self) -> bool {
        self.role
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case("admin"))
    }
}

/// Envelope returned by `GET profile`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    /// The profile record.
    pub profile: UserProfile,
}

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Payload returned by `GET settings/public`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicSettings {
    /// Whether the backend considers the read successful.
    #[serde(default = "default_success")]
    pub success: bool,
    /// Site display name.
    #[serde(default)]
    pub site_name: Option<String>,
    /// Logo image URL.
    #[serde(default)]
    pub logo_url: Option<String>,
    /// Contact email.
    #[serde(default)]
    pub contact_email: Option<String>,
    /// Contact phone number.
    #[serde(default)]
    pub contact_phone: Option<String>,
    /// Postal address.
    #[serde(default)]
    pub contact_address: Option<String>,
    /// Public website.
    #[serde(default)]
    pub contact_website: Option<String>,
    /// Remaining settings keys.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn default_success() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_keeps_unknown_fields() {
        let json = r#"{"id":7,"name":"Ada","email":"ada@example.com","role":"admin","plan":"pro"}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.name.as_deref(), Some("Ada"));
        assert!(profile.is_admin());
        assert_eq!(profile.extra.get("plan"), Some(&serde_json::json!("pro")));

        let back = serde_json::to_value(&profile).unwrap();
        assert_eq!(back["plan"], "pro");
        assert_eq!(back["id"], 7);
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let profile = UserProfile {
            email: Some("ada@example.com".to_string()),
            ..Default::default()
        };
        assert_eq!(profile.display_name(), "ada@example.com");
        assert!(!profile.is_admin());
    }

    #[test]
    fn test_public_settings_defaults() {
        let settings: PublicSettings =
            serde_json::from_str(r#"{"site_name":"Cert Hub","footer_text":"hi"}"#).unwrap();
        assert!(settings.success);
        assert_eq!(settings.site_name.as_deref(), Some("Cert Hub"));
        assert!(settings.logo_url.is_none());
        assert!(settings.extra.contains_key("footer_text"));
    }
}
