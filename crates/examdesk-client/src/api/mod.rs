//! API endpoint implementations.

mod profile;
mod settings;

pub use profile::ProfileApi;
pub use settings::SettingsApi;
