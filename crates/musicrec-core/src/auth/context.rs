use url::Url;

use crate::models::UserProfile;

use super::{AuthController, AuthError, AuthState, CallbackLanding, CallbackOutcome, SessionStore};

/// What the views get to see of authentication.
///
/// Read-only apart from the actions, which all go through the
/// `AuthController`; views never write the session themselves.
#[derive(Clone)]
pub struct SessionContext {
    controller: AuthController,
    session: SessionStore,
}

impl SessionContext {
    pub fn new(controller: AuthController, session: SessionStore) -> Self {
        Self {
            controller,
            session,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.session.current_user()
    }

    pub fn auth_state(&self) -> AuthState {
        self.controller.state()
    }

    pub fn redirect_uri(&self) -> &str {
        self.controller.redirect_uri()
    }

    /// Start the provider redirect. None if already signed in.
    pub fn login(&self) -> Result<Option<Url>, AuthError> {
        self.controller.begin_login()
    }

    pub async fn logout(&self) {
        self.controller.logout().await
    }

    pub async fn handle_callback(
        &self,
        landing: &CallbackLanding,
    ) -> Result<CallbackOutcome, AuthError> {
        self.controller.handle_callback(landing).await
    }
}
