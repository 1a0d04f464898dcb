//! HTTP client module for the recommendation backend.
//!
//! This module provides the `ApiClient`, the single path every backend
//! call takes. It attaches the current session's bearer token, enforces
//! the per-request time budget and classifies failures into `ApiError`,
//! raising the matching user notice on the way out.

pub mod client;
pub mod error;

pub use client::{ApiClient, RequestEnvelope, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use error::ApiError;
