//! Authorization-code login flow.
//!
//! `Anonymous -> Redirecting -> ExchangePending -> Authenticated`, with
//! `ExchangeFailed` falling back to `Anonymous` (and the login view)
//! after a short delay so the user can read what went wrong.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use crate::api::{ApiClient, ApiError};
use crate::config::Config;
use crate::events::{Route, UiEvents};
use crate::models::UserProfile;

use super::{AuthError, SessionStore};

/// Path of the callback landing, appended to the redirect origin.
pub const CALLBACK_PATH: &str = "/callback";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    ProviderDenied,
    MissingCode,
    ExchangeError(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::ProviderDenied => write!(f, "provider denied"),
            FailureReason::MissingCode => write!(f, "missing code"),
            FailureReason::ExchangeError(e) => write!(f, "exchange failed: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Redirecting,
    ExchangePending,
    Authenticated,
    ExchangeFailed(FailureReason),
}

/// Static inputs of the flow, resolved from `Config`.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub client_id: Option<String>,
    pub authorize_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub failure_redirect_delay: Duration,
}

impl AuthSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client_id: config.client_id.clone().filter(|c| !c.trim().is_empty()),
            authorize_url: config.authorize_url(),
            redirect_uri: redirect_uri_for(&config.redirect_origin()),
            scopes: config.scopes(),
            failure_redirect_delay: config.failure_redirect_delay(),
        }
    }
}

/// Redirect URI for an origin. Must be identical at redirect and exchange time.
pub fn redirect_uri_for(origin: &str) -> String {
    format!("{}{}", origin.trim_end_matches('/'), CALLBACK_PATH)
}

/// Query parameters the provider appends to the callback URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
}

impl CallbackParams {
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            if value.trim().is_empty() {
                continue;
            }
            match key.as_ref() {
                "code" => params.code = Some(value.into_owned()),
                "error" => params.error = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }
}

#[derive(Debug, Default)]
struct LandingGuard {
    initiated: AtomicBool,
    abandoned: AtomicBool,
}

/// One arrival on the callback path.
///
/// Created once per landing; every clone shares the same guard, so however
/// many times the landing is handled at most one exchange is sent.
#[derive(Debug, Clone)]
pub struct CallbackLanding {
    params: CallbackParams,
    guard: Arc<LandingGuard>,
}

impl CallbackLanding {
    pub fn new(params: CallbackParams) -> Self {
        Self {
            params,
            guard: Arc::new(LandingGuard::default()),
        }
    }

    /// Build a landing from the full callback URL.
    pub fn from_url(callback_url: &str) -> Result<Self, AuthError> {
        let url = Url::parse(callback_url)
            .map_err(|e| AuthError::InvalidCallback(format!("{}: {}", callback_url, e)))?;
        Ok(Self::new(CallbackParams::from_query(url.query().unwrap_or(""))))
    }

    pub fn params(&self) -> &CallbackParams {
        &self.params
    }

    /// Claim this landing for handling. Only the first caller wins.
    fn try_initiate(&self) -> bool {
        self.guard
            .initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn is_initiated(&self) -> bool {
        self.guard.initiated.load(Ordering::SeqCst)
    }

    /// The view showing this landing went away; ignore any late result.
    pub fn abandon(&self) {
        self.guard.abandoned.store(true, Ordering::SeqCst);
    }

    pub fn is_abandoned(&self) -> bool {
        self.guard.abandoned.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Exchange succeeded and the session was stored
    Authenticated(UserProfile),
    /// A session already existed; nothing was exchanged
    AlreadyAuthenticated,
    /// Another handler already claimed this landing
    Duplicate,
    /// The landing was abandoned while the exchange was in flight
    Abandoned,
}

/// Drives login, the code exchange and logout.
///
/// Together with the `ApiClient`'s 401 handling, this is the only writer
/// of the `SessionStore`.
#[derive(Clone)]
pub struct AuthController {
    settings: AuthSettings,
    client: ApiClient,
    session: SessionStore,
    events: UiEvents,
    phase: Arc<Mutex<AuthState>>,
}

impl AuthController {
    pub fn new(
        settings: AuthSettings,
        client: ApiClient,
        session: SessionStore,
        events: UiEvents,
    ) -> Self {
        Self {
            settings,
            client,
            session,
            events,
            phase: Arc::new(Mutex::new(AuthState::Anonymous)),
        }
    }

    pub fn redirect_uri(&self) -> &str {
        &self.settings.redirect_uri
    }

    /// Current state. A session in the store always means `Authenticated`,
    /// and a cleared store is never reported as authenticated.
    pub fn state(&self) -> AuthState {
        let phase = self.phase();
        if self.session.is_authenticated() {
            AuthState::Authenticated
        } else if phase == AuthState::Authenticated {
            AuthState::Anonymous
        } else {
            phase
        }
    }

    fn phase(&self) -> AuthState {
        self.phase
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_phase(&self, state: AuthState) {
        debug!(state = ?state, "Auth state change");
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Provider consent URL for this client.
    pub fn authorization_url(&self) -> Result<Url, AuthError> {
        let client_id = self
            .settings
            .client_id
            .as_deref()
            .ok_or_else(|| AuthError::Misconfigured("no client id configured".to_string()))?;
        let scope = self.settings.scopes.join(" ");

        Url::parse_with_params(
            &self.settings.authorize_url,
            &[
                ("client_id", client_id),
                ("response_type", "code"),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
                ("scope", scope.as_str()),
                // Force the account chooser so shared machines can switch users
                ("show_dialog", "true"),
            ],
        )
        .map_err(|e| AuthError::Misconfigured(format!("authorize url: {}", e)))
    }

    /// `Anonymous -> Redirecting`.
    ///
    /// Returns the consent URL, or None when already signed in (the views
    /// are sent to the dashboard instead).
    pub fn begin_login(&self) -> Result<Option<Url>, AuthError> {
        if self.session.is_authenticated() {
            debug!("Login requested with an active session");
            self.events.navigate(Route::Dashboard);
            return Ok(None);
        }

        let url = self.authorization_url()?;
        self.set_phase(AuthState::Redirecting);
        info!(redirect_uri = %self.settings.redirect_uri, "Redirecting to provider");
        self.events.open_authorization(url.clone());
        Ok(Some(url))
    }

    /// Handle a callback landing.
    ///
    /// Everything up to the guard check runs before the first await, so
    /// concurrent invocations for the same landing send one exchange.
    pub async fn handle_callback(
        &self,
        landing: &CallbackLanding,
    ) -> Result<CallbackOutcome, AuthError> {
        if self.session.is_authenticated() {
            // Replayed redirect: codes are single-use, never exchange twice
            info!("Callback landing with an active session, skipping exchange");
            self.set_phase(AuthState::Authenticated);
            self.events.navigate(Route::Dashboard);
            return Ok(CallbackOutcome::AlreadyAuthenticated);
        }

        if !landing.try_initiate() {
            debug!("Landing already being handled");
            return Ok(CallbackOutcome::Duplicate);
        }

        let params = landing.params();
        if let Some(ref error) = params.error {
            warn!(error = %error, "Provider denied authorization");
            self.events.error("Authorization failed");
            return Err(self.fail(AuthError::ExchangeDenied(error.clone())));
        }

        let Some(ref code) = params.code else {
            warn!("Callback landing without authorization code");
            self.events.error("Invalid callback");
            return Err(self.fail(AuthError::ExchangeMissingCode));
        };

        self.set_phase(AuthState::ExchangePending);
        info!("Exchanging authorization code");
        let result = self
            .client
            .exchange_code(code, &self.settings.redirect_uri)
            .await;

        if landing.is_abandoned() {
            info!(succeeded = result.is_ok(), "Landing abandoned, ignoring exchange result");
            self.set_phase(AuthState::Anonymous);
            return Ok(CallbackOutcome::Abandoned);
        }

        let stored = result
            .and_then(|response| response.into_parts().map_err(ApiError::InvalidResponse))
            .and_then(|(token, user)| {
                self.session
                    .save(&token, user)
                    .map_err(|e| ApiError::InvalidResponse(e.to_string()))
            });

        match stored {
            Ok(session) => {
                self.set_phase(AuthState::Authenticated);
                info!(user_id = %session.user.user_id, "Login successful");
                self.events
                    .success(format!("Welcome, {}!", session.user.greeting_name()));
                self.events.navigate(Route::Dashboard);
                Ok(CallbackOutcome::Authenticated(session.user))
            }
            Err(e) => {
                warn!(error = %e, "Code exchange failed");
                self.events.error("Authentication failed");
                Err(self.fail(AuthError::ExchangeFailed(e)))
            }
        }
    }

    /// Enter `ExchangeFailed` and schedule the return to login.
    fn fail(&self, err: AuthError) -> AuthError {
        let failed = AuthState::ExchangeFailed(err.reason());
        self.set_phase(failed.clone());

        let phase = Arc::clone(&self.phase);
        let events = self.events.clone();
        let delay = self.settings.failure_redirect_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut current = phase.lock().unwrap_or_else(PoisonError::into_inner);
            // A new login attempt in the meantime owns the views now
            if *current == failed {
                *current = AuthState::Anonymous;
                drop(current);
                events.navigate(Route::Login);
            }
        });

        err
    }

    /// `Authenticated -> Anonymous`. Always succeeds locally.
    pub async fn logout(&self) {
        if let Some(token) = self.session.token() {
            if let Err(e) = self.client.notify_logout(&token).await {
                warn!(error = %e, "Logout notification failed, clearing local session anyway");
            }
        }

        self.session.clear();
        self.set_phase(AuthState::Anonymous);
        info!("Logged out");
        self.events.success("Logged out successfully");
        self.events.navigate(Route::Login);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(client_id: Option<&str>) -> AuthController {
        let (events, _rx) = UiEvents::channel();
        let session = SessionStore::in_memory();
        let client = ApiClient::new(
            "http://127.0.0.1:9/api",
            Duration::from_secs(1),
            session.clone(),
            events.clone(),
        )
        .expect("client builds");
        let settings = AuthSettings {
            client_id: client_id.map(str::to_string),
            authorize_url: "https://accounts.example.com/authorize".to_string(),
            redirect_uri: redirect_uri_for("http://127.0.0.1:3000/"),
            scopes: vec!["user-library-read".to_string(), "user-read-email".to_string()],
            failure_redirect_delay: Duration::from_millis(10),
        };
        AuthController::new(settings, client, session, events)
    }

    #[test]
    fn test_redirect_uri_for_origin() {
        assert_eq!(redirect_uri_for("http://127.0.0.1:3000"), "http://127.0.0.1:3000/callback");
        assert_eq!(redirect_uri_for("http://127.0.0.1:3000/"), "http://127.0.0.1:3000/callback");
    }

    #[test]
    fn test_authorization_url_parameters() {
        let url = controller(Some("client-123"))
            .authorization_url()
            .expect("configured");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert_eq!(url.host_str(), Some("accounts.example.com"));
        assert!(pairs.contains(&("client_id".into(), "client-123".into())));
        assert!(pairs.contains(&("response_type".into(), "code".into())));
        assert!(pairs.contains(&(
            "redirect_uri".into(),
            "http://127.0.0.1:3000/callback".into()
        )));
        assert!(pairs.contains(&("scope".into(), "user-library-read user-read-email".into())));
        assert!(pairs.contains(&("show_dialog".into(), "true".into())));
    }

    #[test]
    fn test_authorization_url_requires_client_id() {
        assert!(matches!(
            controller(None).authorization_url(),
            Err(AuthError::Misconfigured(_))
        ));
    }

    #[test]
    fn test_begin_login_moves_to_redirecting() {
        let ctrl = controller(Some("client-123"));
        assert_eq!(ctrl.state(), AuthState::Anonymous);
        let url = ctrl.begin_login().expect("configured");
        assert!(url.is_some());
        assert_eq!(ctrl.state(), AuthState::Redirecting);
    }

    #[test]
    fn test_callback_params_from_query() {
        let params = CallbackParams::from_query("?code=AQB%2Fxyz&state=ignored");
        assert_eq!(params.code.as_deref(), Some("AQB/xyz"));
        assert_eq!(params.error, None);

        let params = CallbackParams::from_query("error=access_denied");
        assert_eq!(params.error.as_deref(), Some("access_denied"));
        assert_eq!(params.code, None);

        // Blank values count as absent
        assert_eq!(CallbackParams::from_query("code="), CallbackParams::default());
    }

    #[test]
    fn test_landing_from_url() {
        let landing = CallbackLanding::from_url("http://127.0.0.1:3000/callback?code=abc")
            .expect("valid url");
        assert_eq!(landing.params().code.as_deref(), Some("abc"));
        assert!(CallbackLanding::from_url("not a url").is_err());
    }

    #[test]
    fn test_landing_guard_is_shared_between_clones() {
        let landing = CallbackLanding::new(CallbackParams::from_query("code=abc"));
        let again = landing.clone();
        assert!(landing.try_initiate());
        assert!(!again.try_initiate());
        assert!(again.is_initiated());

        // A fresh landing gets a fresh guard
        let next = CallbackLanding::new(CallbackParams::from_query("code=abc"));
        assert!(next.try_initiate());
    }

    #[test]
    fn test_failure_reason_display() {
        assert_eq!(FailureReason::ProviderDenied.to_string(), "provider denied");
        assert_eq!(FailureReason::MissingCode.to_string(), "missing code");
    }
}
