//! Passcode delivery.
//!
//! Delivery providers (email, SMS) live outside this crate. The storefront
//! only needs one call, [`Notifier::send`], and only cares whether it
//! reported success.

use std::future::Future;

use quickdrop_core::{Email, OtpCode};

/// Hands a freshly issued passcode to the customer.
pub trait Notifier: Send + Sync + 'static {
    /// Deliver `code` to `email`. Returns whether delivery succeeded.
    fn send(
        &self,
        email: &Email,
        code: &OtpCode,
        display_name: Option<&str>,
    ) -> impl Future<Output = bool> + Send;
}

/// Writes passcode notices to the log instead of delivering them.
///
/// The code itself is only logged at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn send(&self, email: &Email, code: &OtpCode, display_name: Option<&str>) -> bool {
        tracing::info!(
            email = %email,
            display_name = display_name.unwrap_or("customer"),
            "passcode notice"
        );
        tracing::debug!(email = %email, code = %code, "passcode");
        true
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use recording::{Delivery, RecordingNotifier};

#[cfg(any(test, feature = "test-support"))]
mod recording {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Mutex, PoisonError};

    use quickdrop_core::{Email, OtpCode};

    use super::Notifier;

    /// One recorded delivery attempt.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Delivery {
        pub email: Email,
        pub code: OtpCode,
        pub display_name: Option<String>,
    }

    /// Records every attempt; reports success unless told otherwise.
    #[derive(Debug)]
    pub struct RecordingNotifier {
        sent: Mutex<Vec<Delivery>>,
        delivers: AtomicBool,
    }

    impl Default for RecordingNotifier {
        fn default() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                delivers: AtomicBool::new(true),
            }
        }
    }

    impl RecordingNotifier {
        /// A notifier that reports every delivery as successful.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Make subsequent deliveries report failure (or success again).
        pub fn set_delivers(&self, delivers: bool) {
            self.delivers.store(delivers, Ordering::SeqCst);
        }

        /// Every attempt so far, oldest first.
        #[must_use]
        pub fn deliveries(&self) -> Vec<Delivery> {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// The most recent code sent to `email`.
        #[must_use]
        pub fn last_code_for(&self, email: &Email) -> Option<OtpCode> {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .rev()
                .find(|d| &d.email == email)
                .map(|d| d.code.clone())
        }
    }

    impl Notifier for RecordingNotifier {
        async fn send(&self, email: &Email, code: &OtpCode, display_name: Option<&str>) -> bool {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Delivery {
                    email: email.clone(),
                    code: code.clone(),
                    display_name: display_name.map(ToOwned::to_owned),
                });
            self.delivers.load(Ordering::SeqCst)
        }
    }
}
