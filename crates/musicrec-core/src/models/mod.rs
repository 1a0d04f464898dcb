//! Data models for the recommendation backend.
//!
//! This module contains the wire types exchanged with the backend:
//!
//! - `UserProfile`, `ExchangeRequest`, `ExchangeResponse`: authorization-code exchange
//! - `Track`, `RecommendationBatch`, `FeedbackRequest`: recommendations and feedback
//! - `Stats`, `ExpandResult`: dashboard counters and dataset expansion

pub mod auth;
pub mod stats;
pub mod track;

pub use auth::{ExchangeRequest, ExchangeResponse, UserProfile};
pub use stats::{ExpandResult, Stats};
pub use track::{FeedbackRequest, RecommendationBatch, Track};
