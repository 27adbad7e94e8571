//! QuickDrop Core - Shared domain types.
//!
//! This crate provides the types used across QuickDrop components:
//! - `storefront` - Public-facing ordering API
//! - `cli` - Command-line tools for migrations, seeding and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails and passcodes, plus
//!   the stored records
//! - [`assembler`] - Turns cart lines into order item snapshots and a total

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod assembler;
pub mod types;

pub use assembler::{AssembledOrder, AssemblyError, CartLine, assemble};
pub use types::*;
