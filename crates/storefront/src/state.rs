//! Application state shared across handlers.

use std::sync::Arc;

use crate::services::Storefront;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and is generic over the
/// primary store `S` and the passcode notifier `N`.
pub struct AppState<S, N> {
    inner: Arc<Storefront<S, N>>,
}

// Manual impl: `S` and `N` need not be `Clone`.
impl<S, N> Clone for AppState<S, N> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, N> AppState<S, N> {
    /// Create a new application state.
    #[must_use]
    pub fn new(storefront: Storefront<S, N>) -> Self {
        Self {
            inner: Arc::new(storefront),
        }
    }

    /// Get a reference to the storefront operations.
    #[must_use]
    pub fn storefront(&self) -> &Storefront<S, N> {
        &self.inner
    }
}
