//! HTTP client SDK for the examdesk certification-exam backend.
//!
//! This crate provides a typed client for the two endpoints the client-side
//! session layer depends on.
//!
//! # Example
//!
//! ```no_run
//! use examdesk_client::{ExamdeskClient, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = ExamdeskClient::builder()
//!     .base_url("https://api.example.com/api/")
//!     .build()?;
//!
//! // Verify a bearer token by fetching the caller's profile
//! let profile = client.profile().get("token-from-login").await?;
//! println!("Signed in as {}", profile.display_name());
//!
//! // Read the public site settings
//! let settings = client.settings().public().await?;
//! println!("Site: {:?}", settings.site_name);
//! # Ok(())
//! # }
//! ```
//!
//! # API Coverage
//!
//! - **Profile**: bearer-authenticated `GET profile`
//! - **Settings**: unauthenticated `GET settings/public`

pub mod api;
pub mod client;
pub mod error;
pub mod types;

pub use client::{ClientBuilder, ExamdeskClient};
pub use error::{Error, FaultKind, Result};
pub use types::*;
