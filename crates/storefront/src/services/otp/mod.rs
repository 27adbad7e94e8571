//! One-time passcodes gating checkout.
//!
//! Each [`OtpService::send`] stores a new passcode valid for [`OTP_TTL`] and
//! hands it to the [`Notifier`]. Older passcodes for the same email are left
//! alone; they simply expire. [`OtpService::verify`] consumes the newest
//! matching passcode in a single atomic store operation, so a code verifies
//! at most once even when requests race.
//!
//! Passcodes live only in the primary store. When it cannot answer, both
//! operations fail with [`OtpError::StoreUnavailable`].

mod error;

pub use error::OtpError;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;

use quickdrop_core::{Email, OTP_TTL, OneTimePasscode, OtpCode};

use super::notifier::Notifier;
use super::policy::{Access, Entity, Resolution, resolve};
use crate::clock::Clock;
use crate::db::{PrimaryStore, with_timeout};

/// Source of fresh passcodes.
pub trait CodeSource: Send + Sync + fmt::Debug {
    /// The next code to issue.
    fn next_code(&self) -> OtpCode;
}

/// Uniformly random codes in `100000..=999999`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodes;

impl CodeSource for RandomCodes {
    fn next_code(&self) -> OtpCode {
        OtpCode::from_number(rand::rng().random_range(OtpCode::MIN..=OtpCode::MAX))
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fixed::FixedCodes;

#[cfg(any(test, feature = "test-support"))]
mod fixed {
    use std::collections::VecDeque;
    use std::sync::{Mutex, PoisonError};

    use quickdrop_core::OtpCode;

    use super::{CodeSource, RandomCodes};

    /// Hands out queued codes in order, then random ones.
    #[derive(Debug, Default)]
    pub struct FixedCodes {
        queue: Mutex<VecDeque<OtpCode>>,
    }

    impl FixedCodes {
        /// Queue `codes` to be issued in order.
        #[must_use]
        pub fn new(codes: impl IntoIterator<Item = OtpCode>) -> Self {
            Self {
                queue: Mutex::new(codes.into_iter().collect()),
            }
        }

        /// Queue one more code.
        pub fn push(&self, code: OtpCode) {
            self.queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(code);
        }
    }

    impl CodeSource for FixedCodes {
        fn next_code(&self) -> OtpCode {
            self.queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .unwrap_or_else(|| RandomCodes.next_code())
        }
    }
}

/// Result of issuing a passcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtpIssued {
    /// Whether the notifier reported delivery.
    pub delivered: bool,
    /// The issued code; only outside production.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<OtpCode>,
}

/// Issues and verifies checkout passcodes.
#[derive(Debug)]
pub struct OtpService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    clock: Arc<dyn Clock>,
    codes: Arc<dyn CodeSource>,
    store_timeout: Duration,
    expose_codes: bool,
}

impl<S: PrimaryStore, N: Notifier> OtpService<S, N> {
    /// Build the service.
    ///
    /// `expose_codes` puts issued codes into [`OtpIssued::code`]; only enable
    /// it outside production.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        notifier: Arc<N>,
        clock: Arc<dyn Clock>,
        codes: Arc<dyn CodeSource>,
        store_timeout: Duration,
        expose_codes: bool,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            codes,
            store_timeout,
            expose_codes,
        }
    }

    /// Issue a passcode for `email` and hand it to the notifier.
    ///
    /// Delivery failure is logged and reported but does not fail issuance.
    ///
    /// # Errors
    ///
    /// Returns `OtpError::StoreUnavailable` if the passcode could not be stored.
    #[tracing::instrument(skip_all, fields(email = %email))]
    pub async fn send(
        &self,
        email: &Email,
        display_name: Option<&str>,
    ) -> Result<OtpIssued, OtpError> {
        let code = self.codes.next_code();
        let passcode = OneTimePasscode::issue(email.clone(), code, self.clock.now());

        let outcome = with_timeout(self.store_timeout, self.store.insert_passcode(&passcode)).await;
        if let Resolution::Degrade { error, .. } =
            resolve(Entity::Passcode, Access::Write, "insert_passcode", outcome)
        {
            return Err(OtpError::StoreUnavailable(error));
        }

        let delivered = self
            .notifier
            .send(email, &passcode.code, display_name)
            .await;
        if delivered {
            tracing::info!(expires_at = %passcode.expires_at, "passcode issued");
        } else {
            tracing::warn!(
                passcode_id = %passcode.id,
                "passcode stored but notifier did not deliver it"
            );
            sentry::capture_message(
                &format!("passcode {} was not delivered", passcode.id),
                sentry::Level::Warning,
            );
        }

        Ok(OtpIssued {
            delivered,
            code: self.expose_codes.then_some(passcode.code),
        })
    }

    /// Consume the newest unused, unexpired passcode matching `code`.
    ///
    /// # Errors
    ///
    /// Returns `OtpError::InvalidOrExpired` if nothing matched (wrong code,
    /// expired, already used or lost a race).
    /// Returns `OtpError::StoreUnavailable` if the store could not answer.
    #[tracing::instrument(skip_all, fields(email = %email))]
    pub async fn verify(&self, email: &Email, code: &OtpCode) -> Result<(), OtpError> {
        let now = self.clock.now();
        let outcome = with_timeout(
            self.store_timeout,
            self.store.consume_passcode(email, code, now),
        )
        .await;

        match resolve(Entity::Passcode, Access::Write, "consume_passcode", outcome) {
            Resolution::Value(Some(id)) => {
                tracing::info!(passcode_id = %id, "passcode verified");
                Ok(())
            }
            Resolution::Value(None) => {
                tracing::info!("passcode rejected");
                Err(OtpError::InvalidOrExpired)
            }
            Resolution::Degrade { error, .. } => Err(OtpError::StoreUnavailable(error)),
        }
    }

    /// Delete passcodes whose validity window has closed.
    ///
    /// Expired passcodes are already unusable; this only reclaims storage.
    ///
    /// # Errors
    ///
    /// Returns `OtpError::StoreUnavailable` if the store could not answer.
    pub async fn purge_expired(&self) -> Result<u64, OtpError> {
        let now = self.clock.now();
        let outcome = with_timeout(self.store_timeout, self.store.delete_expired_passcodes(now)).await;

        match resolve(Entity::Passcode, Access::Write, "delete_expired_passcodes", outcome) {
            Resolution::Value(deleted) => {
                tracing::info!(deleted, ttl_minutes = OTP_TTL.num_minutes(), "expired passcodes purged");
                Ok(deleted)
            }
            Resolution::Degrade { error, .. } => Err(OtpError::StoreUnavailable(error)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration as ChronoDuration, Utc};

    use super::*;
    use crate::clock::ManualClock;
    use crate::db::memory::{MemoryStore, StoreHealth};
    use crate::services::notifier::RecordingNotifier;

    struct Harness {
        service: OtpService<MemoryStore, RecordingNotifier>,
        store: Arc<MemoryStore>,
        notifier: Arc<RecordingNotifier>,
        clock: Arc<ManualClock>,
        codes: Arc<FixedCodes>,
    }

    fn harness(expose_codes: bool) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let codes = Arc::new(FixedCodes::default());
        let service = OtpService::new(
            Arc::clone(&store),
            Arc::clone(&notifier),
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::clone(&codes) as Arc<dyn CodeSource>,
            Duration::from_secs(1),
            expose_codes,
        );
        Harness {
            service,
            store,
            notifier,
            clock,
            codes,
        }
    }

    fn alice() -> Email {
        Email::parse("alice@example.com").unwrap()
    }

    fn code(s: &str) -> OtpCode {
        OtpCode::parse(s).unwrap()
    }

    #[test]
    fn test_random_codes_are_six_digits_in_range() {
        for _ in 0..1000 {
            let code = RandomCodes.next_code();
            let n: u32 = code.as_str().parse().unwrap();
            assert!((OtpCode::MIN..=OtpCode::MAX).contains(&n));
        }
    }

    #[tokio::test]
    async fn test_send_stores_and_notifies() {
        let h = harness(true);
        h.codes.push(code("123456"));

        let issued = h.service.send(&alice(), Some("Alice")).await.unwrap();
        assert!(issued.delivered);
        assert_eq!(issued.code, Some(code("123456")));

        let stored = h.store.passcodes();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].expires_at - stored[0].created_at, OTP_TTL);
        assert!(!stored[0].used);

        let deliveries = h.notifier.deliveries();
        assert_eq!(deliveries[0].display_name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_production_hides_code() {
        let h = harness(false);
        let issued = h.service.send(&alice(), None).await.unwrap();
        assert_eq!(issued.code, None);
        assert!(h.notifier.last_code_for(&alice()).is_some());
    }

    #[tokio::test]
    async fn test_undelivered_code_still_issued() {
        let h = harness(false);
        h.notifier.set_delivers(false);
        let issued = h.service.send(&alice(), None).await.unwrap();
        assert!(!issued.delivered);
        assert_eq!(h.store.passcodes().len(), 1);
    }

    #[tokio::test]
    async fn test_verify_once() {
        let h = harness(false);
        h.codes.push(code("123456"));
        h.service.send(&alice(), None).await.unwrap();

        h.service.verify(&alice(), &code("123456")).await.unwrap();
        assert!(matches!(
            h.service.verify(&alice(), &code("123456")).await,
            Err(OtpError::InvalidOrExpired)
        ));
    }

    #[tokio::test]
    async fn test_wrong_email_or_code_rejected() {
        let h = harness(false);
        h.codes.push(code("123456"));
        h.service.send(&alice(), None).await.unwrap();

        let bob = Email::parse("bob@example.com").unwrap();
        assert!(h.service.verify(&bob, &code("123456")).await.is_err());
        assert!(h.service.verify(&alice(), &code("000000")).await.is_err());
        h.service.verify(&alice(), &code("123456")).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_code_rejected() {
        let h = harness(false);
        h.codes.push(code("123456"));
        h.service.send(&alice(), None).await.unwrap();

        h.clock.advance(ChronoDuration::minutes(10));
        assert!(matches!(
            h.service.verify(&alice(), &code("123456")).await,
            Err(OtpError::InvalidOrExpired)
        ));
    }

    #[tokio::test]
    async fn test_store_outage_fails_loudly() {
        let h = harness(false);
        h.store.set_health(StoreHealth::Unreachable);
        assert!(matches!(
            h.service.send(&alice(), None).await,
            Err(OtpError::StoreUnavailable(_))
        ));
        assert!(h.notifier.deliveries().is_empty());
        assert!(matches!(
            h.service.verify(&alice(), &code("123456")).await,
            Err(OtpError::StoreUnavailable(_))
        ));

        h.store.set_health(StoreHealth::Unprovisioned);
        assert!(matches!(
            h.service.send(&alice(), None).await,
            Err(OtpError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_purge_removes_only_expired() {
        let h = harness(false);
        h.service.send(&alice(), None).await.unwrap();
        h.clock.advance(ChronoDuration::minutes(11));
        h.service.send(&alice(), None).await.unwrap();

        assert_eq!(h.service.purge_expired().await.unwrap(), 1);
        assert_eq!(h.store.passcodes().len(), 1);
    }
}
