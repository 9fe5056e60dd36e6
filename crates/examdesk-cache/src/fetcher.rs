//! Fetch hooks for refreshing cached settings.
//!
//! The cache never talks to the network itself. It calls a
//! [`SettingsFetcher`], which keeps the cache testable with in-process
//! fakes and lets one HTTP client back several caches.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use crate::error::Result;

/// Trait for settings sources.
#[async_trait]
pub trait SettingsFetcher<T>: Send + Sync {
    /// Fetch the current value.
    ///
    /// Errors leave the cached value untouched.
    async fn fetch(&self) -> Result<T>;
}

type BoxedFetch<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

/// Adapter that turns a closure returning a future into a fetcher.
pub struct FnFetcher<T> {
    f: Box<dyn Fn() -> BoxedFetch<T> + Send + Sync>,
}

impl<T> FnFetcher<T> {
    /// Wrap `f`. Each fetch calls it once.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            f: Box::new(move || Box::pin(f())),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> SettingsFetcher<T> for FnFetcher<T> {
    async fn fetch(&self) -> Result<T> {
        (self.f)().await
    }
}
