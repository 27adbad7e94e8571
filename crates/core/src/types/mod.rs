//! Core types for QuickDrop.
//!
//! This module provides type-safe wrappers for domain values and the records
//! the storefront reads and writes.

pub mod email;
pub mod id;
pub mod order;
pub mod otp;
pub mod passcode;
pub mod price;
pub mod product;
pub mod status;
pub mod user;

pub use email::{Email, EmailError};
pub use id::*;
pub use order::{Order, OrderItem, OrderItemDraft};
pub use otp::{OtpCode, OtpCodeError};
pub use passcode::{OTP_TTL, OneTimePasscode};
pub use price::{Price, PriceError};
pub use product::Product;
pub use status::OrderStatus;
pub use user::User;
