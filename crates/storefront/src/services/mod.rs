//! Business logic services for the storefront.
//!
//! # Services
//!
//! - [`policy`] - Degradation table for primary store outcomes
//! - [`data_access`] - Facade over the primary and fallback stores
//! - [`otp`] - Checkout passcodes
//! - [`notifier`] - Passcode delivery seam
//! - [`catalog`] - Default product catalog
//! - [`storefront`] - The operations routes call

pub mod catalog;
pub mod data_access;
pub mod notifier;
pub mod otp;
pub mod policy;
pub mod storefront;

pub use catalog::default_catalog;
pub use data_access::{DataAccess, DataAccessOptions, FacadeError};
pub use notifier::{LogNotifier, Notifier};
pub use otp::{CodeSource, OtpError, OtpIssued, OtpService, RandomCodes};
pub use storefront::{Storefront, UserLookup};
