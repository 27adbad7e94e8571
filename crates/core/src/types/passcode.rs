//! Stored one-time passcodes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{Email, OtpCode, PasscodeId};

/// How long an issued passcode stays valid.
pub const OTP_TTL: Duration = Duration::minutes(10);

/// A passcode row.
///
/// Each send inserts a new row; older rows are left alone and simply age
/// out. A row is eligible for verification while it is unused and
/// `now < expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneTimePasscode {
    pub id: PasscodeId,
    pub email: Email,
    pub code: OtpCode,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl OneTimePasscode {
    /// Issue a fresh, unused passcode at `now`.
    #[must_use]
    pub fn issue(email: Email, code: OtpCode, now: DateTime<Utc>) -> Self {
        Self {
            id: PasscodeId::generate(),
            email,
            code,
            expires_at: now + OTP_TTL,
            used: false,
            created_at: now,
        }
    }

    /// Returns true once the validity window has closed.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Returns true if this row could still be consumed at `now`.
    #[must_use]
    pub fn is_eligible_at(&self, now: DateTime<Utc>) -> bool {
        !self.used && !self.is_expired_at(now)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn passcode(now: DateTime<Utc>) -> OneTimePasscode {
        OneTimePasscode::issue(
            Email::parse("alice@example.com").unwrap(),
            OtpCode::parse("123456").unwrap(),
            now,
        )
    }

    #[test]
    fn test_issue_sets_ten_minute_window() {
        let now = Utc::now();
        let otp = passcode(now);
        assert_eq!(otp.expires_at - otp.created_at, Duration::minutes(10));
        assert!(!otp.used);
    }

    #[test]
    fn test_eligible_until_expiry() {
        let now = Utc::now();
        let otp = passcode(now);
        assert!(otp.is_eligible_at(now + Duration::minutes(9)));
        assert!(!otp.is_eligible_at(now + Duration::minutes(10)));
    }

    #[test]
    fn test_used_is_never_eligible() {
        let now = Utc::now();
        let mut otp = passcode(now);
        otp.used = true;
        assert!(!otp.is_eligible_at(now));
    }
}
