//! Stale-while-revalidate cache for low-churn site settings.
//!
//! This crate provides:
//! - [`SettingsCache`], a single-value cache that answers reads immediately
//!   and refreshes in the background once its TTL has lapsed
//! - [`InvalidationBus`], an explicit observer registry that lets the code
//!   editing a setting mark the matching cache stale
//! - [`SiteSettings`], the three site-settings caches (site name, logo,
//!   contact details) wired to the public settings endpoint
//!
//! # Example
//!
//! ```rust,ignore
//! use examdesk_cache::{CacheConfig, SettingsTopic, SiteFallbacks, SiteSettings};
//!
//! let site = SiteSettings::new(client, CacheConfig::default(), SiteFallbacks::default());
//!
//! // Cheap, never blocks on the network
//! let name = site.site_name().read();
//!
//! // Somewhere in the admin panel, after saving a new logo
//! site.publisher().publish(SettingsTopic::Logo);
//! ```

mod bus;
mod cache;
mod config;
mod error;
mod fetcher;
mod freshness;
mod site;

pub use bus::{Invalidate, InvalidationBus, InvalidationPublisher, SettingsTopic};
pub use cache::{CacheStats, SettingsCache};
pub use config::{CacheConfig, DEFAULT_TTL};
pub use error::{Error, Result};
pub use fetcher::{FnFetcher, SettingsFetcher};
pub use freshness::Freshness;
pub use site::{ContactDetails, PublicSettingsFetcher, SiteFallbacks, SiteSettings};
