//! The three site-settings caches.
//!
//! Site name, logo URL and contact details are edited independently in the
//! admin panel and rendered by unrelated parts of the UI, so each gets its
//! own cache and its own invalidation topic. All three read the same public
//! settings endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use examdesk_client::{ExamdeskClient, PublicSettings};
use serde::{Deserialize, Serialize};

use crate::bus::{InvalidationBus, InvalidationPublisher, SettingsTopic};
use crate::cache::SettingsCache;
use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::fetcher::SettingsFetcher;

/// Public contact information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
}

impl ContactDetails {
    fn from_settings(settings: &PublicSettings) -> Self {
        Self {
            email: non_empty(&settings.contact_email),
            phone: non_empty(&settings.contact_phone),
            address: non_empty(&settings.contact_address),
            website: non_empty(&settings.contact_website),
        }
    }

    /// Whether no contact field is set.
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.website.is_none()
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Values shown before the first successful fetch.
#[derive(Debug, Clone, Default)]
pub struct SiteFallbacks {
    pub site_name: String,
    pub logo_url: String,
    pub contact: ContactDetails,
}

/// Fetches public settings and projects one value out of them.
pub struct PublicSettingsFetcher<T> {
    client: ExamdeskClient,
    field: &'static str,
    project: fn(&PublicSettings) -> Option<T>,
}

impl<T> PublicSettingsFetcher<T> {
    /// Create a fetcher. `project` returning `None` counts as a failed
    /// fetch, naming `field` in the error.
    pub fn new(
        client: ExamdeskClient,
        field: &'static str,
        project: fn(&PublicSettings) -> Option<T>,
    ) -> Self {
        Self {
            client,
            field,
            project,
        }
    }
}

#[async_trait]
impl<T: Send + 'static> SettingsFetcher<T> for PublicSettingsFetcher<T> {
    async fn fetch(&self) -> Result<T> {
        let settings = self.client.settings().public().await?;
        (self.project)(&settings).ok_or(Error::MissingField(self.field))
    }
}

/// The site-settings caches and the bus that invalidates them.
///
/// Construct once at application start and hand clones of the caches to
/// whatever renders them.
#[derive(Debug, Clone)]
pub struct SiteSettings {
    site_name: SettingsCache<String>,
    logo: SettingsCache<String>,
    contact: SettingsCache<ContactDetails>,
    bus: InvalidationBus,
}

impl SiteSettings {
    /// Build the three caches against `client`.
    pub fn new(client: ExamdeskClient, config: CacheConfig, fallbacks: SiteFallbacks) -> Self {
        let site_name = Arc::new(PublicSettingsFetcher::new(
            client.clone(),
            "site_name",
            |s| non_empty(&s.site_name),
        ));
        let logo = Arc::new(PublicSettingsFetcher::new(
            client.clone(),
            "logo_url",
            |s| non_empty(&s.logo_url),
        ));
        let contact = Arc::new(PublicSettingsFetcher::new(client, "contact", |s| {
            Some(ContactDetails::from_settings(s)).filter(|c| !c.is_empty())
        }));

        Self::with_fetchers(config, fallbacks, site_name, logo, contact)
    }

    /// Build the three caches from arbitrary fetchers.
    pub fn with_fetchers(
        config: CacheConfig,
        fallbacks: SiteFallbacks,
        site_name: Arc<dyn SettingsFetcher<String>>,
        logo: Arc<dyn SettingsFetcher<String>>,
        contact: Arc<dyn SettingsFetcher<ContactDetails>>,
    ) -> Self {
        let bus = InvalidationBus::new();

        let site_name =
            SettingsCache::new("site_name", fallbacks.site_name, site_name, config.clone());
        let logo = SettingsCache::new("logo_url", fallbacks.logo_url, logo, config.clone());
        let contact = SettingsCache::new("contact", fallbacks.contact, contact, config);

        site_name.attach(&bus, SettingsTopic::SiteName);
        logo.attach(&bus, SettingsTopic::Logo);
        contact.attach(&bus, SettingsTopic::Contact);

        Self {
            site_name,
            logo,
            contact,
            bus,
        }
    }

    /// Site display name cache.
    pub fn site_name(&self) -> &SettingsCache<String> {
        &self.site_name
    }

    /// Logo URL cache.
    pub fn logo(&self) -> &SettingsCache<String> {
        &self.logo
    }

    /// Contact details cache.
    pub fn contact(&self) -> &SettingsCache<ContactDetails> {
        &self.contact
    }

    /// Handle for code that edits settings.
    pub fn publisher(&self) -> InvalidationPublisher {
        self.bus.publisher()
    }

    /// Revalidate all three caches concurrently.
    ///
    /// Each failure is logged and leaves its cache unchanged; the results
    /// are returned in site name, logo, contact order.
    pub async fn revalidate_all(&self) -> [Result<bool>; 3] {
        let (name, logo, contact) = tokio::join!(
            self.site_name.revalidate(),
            self.logo.revalidate(),
            self.contact.revalidate(),
        );
        [name, logo, contact]
    }
}
