//! HTTP middleware stack for the storefront API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction)
//! 2. `TraceLayer` (request span with an empty `request_id` field)
//! 3. Request ID (fills the span field, echoes `x-request-id`)
//! 4. Rate limiting (governor, per route group)

pub mod rate_limit;
pub mod request_id;

pub use rate_limit::{RateLimits, api_rate_limiter, otp_rate_limiter};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
