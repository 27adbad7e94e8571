//! QuickDrop Storefront library.
//!
//! This crate provides the storefront functionality as a library,
//! allowing it to be tested and reused.
//!
//! # Modules
//!
//! - [`db`] - Primary store trait, `PostgreSQL` adapter and error classification
//! - [`fallback`] - In-process user store used when the database cannot answer
//! - [`services`] - Data access facade, passcodes and storefront operations
//! - [`routes`] - JSON API handlers and router assembly

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod fallback;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
