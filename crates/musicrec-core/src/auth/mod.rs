//! Authentication module for the authorization-code login flow.
//!
//! This module provides:
//! - `SessionStore`: the shared token + profile snapshot, persisted across runs
//! - `KeyringSessionPersistence`: OS keychain backend for the session record
//! - `AuthController`: login redirect, one-time code exchange, logout
//! - `SessionContext`: the read-mostly contract the views consume
//! - `CallbackServer`: loopback listener that receives the provider redirect

pub mod callback_server;
pub mod context;
pub mod credentials;
pub mod error;
pub mod flow;
pub mod session;

pub use callback_server::CallbackServer;
pub use context::SessionContext;
pub use credentials::KeyringSessionPersistence;
pub use error::{AuthError, SessionError};
pub use flow::{
    AuthController, AuthSettings, AuthState, CallbackLanding, CallbackOutcome, CallbackParams,
    FailureReason, CALLBACK_PATH,
};
pub use session::{
    FileSessionPersistence, MemorySessionPersistence, Session, SessionPersistence, SessionStore,
};
