//! Invalidation bus.
//!
//! Code that edits a setting publishes a [`SettingsTopic`]; every cache
//! attached to that topic marks itself stale and refetches on its next read.
//! Delivery is synchronous: when `publish` returns, every live subscriber has
//! been invalidated.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::debug;

/// A kind of setting that can change underneath a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsTopic {
    /// The site display name changed.
    SiteName,
    /// The logo changed.
    Logo,
    /// Any contact field changed.
    Contact,
}

impl SettingsTopic {
    /// All topics, in a stable order.
    pub const ALL: [SettingsTopic; 3] = [
        SettingsTopic::SiteName,
        SettingsTopic::Logo,
        SettingsTopic::Contact,
    ];

    /// Event name used in logs and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingsTopic::SiteName => "site-name-changed",
            SettingsTopic::Logo => "logo-changed",
            SettingsTopic::Contact => "contact-changed",
        }
    }
}

impl fmt::Display for SettingsTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingsTopic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "site-name-changed" | "site-name" => Ok(SettingsTopic::SiteName),
            "logo-changed" | "logo" => Ok(SettingsTopic::Logo),
            "contact-changed" | "contact" => Ok(SettingsTopic::Contact),
            other => Err(format!("unknown settings topic '{}'", other)),
        }
    }
}

/// Something that can be told its cached data is out of date.
pub trait Invalidate: Send + Sync {
    /// Mark the held data stale without discarding it.
    fn invalidate(&self);
}

struct Subscription {
    topic: SettingsTopic,
    target: Weak<dyn Invalidate>,
}

/// Observer registry keyed by topic.
///
/// Holds subscribers weakly, so dropping a cache unsubscribes it.
#[derive(Clone, Default)]
pub struct InvalidationBus {
    subscribers: Arc<RwLock<Vec<Subscription>>>,
}

impl InvalidationBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `target` for `topic`.
    pub fn subscribe(&self, topic: SettingsTopic, target: Weak<dyn Invalidate>) {
        self.subscribers
            .write()
            .push(Subscription { topic, target });
    }

    /// Invalidate every live subscriber of `topic`.
    ///
    /// Returns the number of subscribers reached. Dead subscriptions are
    /// pruned along the way.
    pub fn publish(&self, topic: SettingsTopic) -> usize {
        let targets: Vec<Arc<dyn Invalidate>> = {
            let mut subs = self.subscribers.write();
            subs.retain(|s| s.target.strong_count() > 0);
            subs.iter()
                .filter(|s| s.topic == topic)
                .filter_map(|s| s.target.upgrade())
                .collect()
        };

        // Call out with the lock released so a subscriber may touch the bus.
        for target in &targets {
            target.invalidate();
        }

        debug!(topic = %topic, reached = targets.len(), "Settings invalidation published");
        targets.len()
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.subscribers
            .read()
            .iter()
            .filter(|s| s.target.strong_count() > 0)
            .count()
    }

    /// Check if there are no live subscriptions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A publish-only handle for code that edits settings.
    pub fn publisher(&self) -> InvalidationPublisher {
        InvalidationPublisher { bus: self.clone() }
    }
}

impl fmt::Debug for InvalidationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidationBus")
            .field("subscribers", &self.len())
            .finish()
    }
}

/// Publish-only view of an [`InvalidationBus`].
#[derive(Clone, Debug)]
pub struct InvalidationPublisher {
    bus: InvalidationBus,
}

impl InvalidationPublisher {
    /// Announce that the settings behind `topic` changed.
    pub fn publish(&self, topic: SettingsTopic) -> usize {
        self.bus.publish(topic)
    }
}
