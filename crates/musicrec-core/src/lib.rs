//! Core library for the musicrec terminal client.
//!
//! This crate holds everything below the view layer:
//!
//! - `auth`: session store, authorization-code flow, consumer contract
//! - `api`: HTTP client wrapper and the backend endpoints
//! - `models`: wire types exchanged with the backend
//! - `config`: configuration file and environment overrides
//! - `events`: notices and navigation requests delivered to the views

pub mod api;
pub mod auth;
pub mod config;
pub mod events;
pub mod models;
pub mod services;

pub use api::{ApiClient, ApiError};
pub use auth::{
    AuthError, AuthState, CallbackLanding, CallbackOutcome, CallbackServer, SessionContext,
    SessionStore,
};
pub use config::Config;
pub use events::{Notice, NoticeLevel, Route, UiEvent, UiEvents};
pub use services::Services;
