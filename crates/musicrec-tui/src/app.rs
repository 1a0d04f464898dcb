//! Application state management for musicrec.
//!
//! This module contains the core `App` struct that manages all application state,
//! including the current screen, dashboard data, and background task coordination.
//! Authentication itself lives in `musicrec_core`; the app only reacts to the
//! notices and navigation requests it receives from there.

use std::collections::HashMap;
use std::time::Duration;

use musicrec_core::auth::CallbackOutcome;
use musicrec_core::models::{ExpandResult, FeedbackRequest, RecommendationBatch, Stats, Track};
use musicrec_core::{
    ApiClient, ApiError, AuthError, CallbackLanding, CallbackServer, Notice, NoticeLevel, Route,
    Services, SessionContext, UiEvent,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
/// A handful of requests can be in flight at once; 32 leaves headroom.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Number of tracks to move on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 5;

// ============================================================================
// UI State Types
// ============================================================================

/// Top-level screens. The callback screen is entered on the authorization
/// redirect rather than by navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Callback,
    Dashboard,
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    ConfirmingQuit,
    Quitting,
}

/// Which batch endpoint a recommendation request went to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchRequest {
    Generate,
    Next,
    Previous,
}

impl BatchRequest {
    fn failure_message(&self) -> &'static str {
        match self {
            BatchRequest::Generate => "Failed to generate recommendations",
            BatchRequest::Next => "Failed to load next batch",
            BatchRequest::Previous => "Failed to load previous batch",
        }
    }
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent back from spawned tasks to the main loop.
enum TaskResult {
    Stats(Result<Stats, ApiError>),
    Expanded(Result<ExpandResult, ApiError>),
    Batch(BatchRequest, Result<RecommendationBatch, ApiError>),
    Feedback {
        key: String,
        liked: bool,
        result: Result<(), ApiError>,
    },
    /// The loopback listener received the provider redirect (or gave up)
    Landing(Result<CallbackLanding, AuthError>),
    CallbackHandled(Result<CallbackOutcome, AuthError>),
    LoggedOut,
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    // Core services
    session: SessionContext,
    api: ApiClient,
    ui_events: mpsc::UnboundedReceiver<UiEvent>,
    callback_wait: Duration,

    // UI State
    pub state: AppState,
    pub screen: Screen,

    // Login / callback state
    pub login_error: Option<String>,
    pub authorization_url: Option<Url>,
    pending_landing: Option<CallbackLanding>,
    listener_task: Option<JoinHandle<()>>,

    // Dashboard data
    pub stats: Option<Stats>,
    pub tracks: Vec<Track>,
    pub mode: Option<String>,
    pub selection: usize,
    /// Feedback given in the current batch, keyed by `Track::feedback_key`
    pub feedback: HashMap<String, bool>,
    pub loading_batch: bool,
    pub expanding: bool,
    feedback_in_flight: Option<String>,

    // Background task channel
    task_rx: mpsc::Receiver<TaskResult>,
    task_tx: mpsc::Sender<TaskResult>,

    // Status message
    pub status_message: Option<Notice>,
}

impl App {
    pub fn new(services: Services, callback_wait: Duration) -> Self {
        let (task_tx, task_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let Services {
            session,
            api,
            events,
        } = services;

        Self {
            session,
            api,
            ui_events: events,
            callback_wait,
            state: AppState::Normal,
            screen: Screen::Login,
            login_error: None,
            authorization_url: None,
            pending_landing: None,
            listener_task: None,
            stats: None,
            tracks: Vec::new(),
            mode: None,
            selection: 0,
            feedback: HashMap::new(),
            loading_batch: false,
            expanding: false,
            feedback_in_flight: None,
            task_rx,
            task_tx,
            status_message: None,
        }
    }

    /// Pick the first screen from the restored session.
    pub fn start(&mut self) {
        if self.session.is_authenticated() {
            self.enter_dashboard();
        } else {
            self.screen = Screen::Login;
        }
    }

    /// Name for the title bar greeting.
    pub fn user_display_name(&self) -> Option<String> {
        self.session
            .current_user()
            .map(|u| u.greeting_name().to_string())
    }

    pub fn redirect_uri(&self) -> &str {
        self.session.redirect_uri()
    }

    pub fn is_ml_mode(&self) -> bool {
        self.mode.as_deref() == Some("ML")
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.tracks.get(self.selection)
    }

    /// Feedback already recorded for a track in this batch.
    pub fn feedback_for(&self, track: &Track) -> Option<bool> {
        self.feedback.get(&track.feedback_key()).copied()
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Ask the core for the consent redirect. The `OpenAuthorization` event
    /// it sends back starts the loopback listener.
    pub fn start_login(&mut self) {
        self.login_error = None;
        match self.session.login() {
            Ok(Some(url)) => debug!(%url, "Authorization URL issued"),
            Ok(None) => debug!("Already signed in"),
            Err(e) => {
                warn!(error = %e, "Cannot start login");
                self.login_error = Some(e.user_message());
            }
        }
    }

    /// Leave the callback screen, dropping whatever landing is in progress.
    pub fn cancel_login(&mut self) {
        if let Some(landing) = self.pending_landing.take() {
            landing.abandon();
        }
        if let Some(task) = self.listener_task.take() {
            task.abort();
        }
        self.authorization_url = None;
        self.screen = Screen::Login;
        info!("Login cancelled");
    }

    fn spawn_callback_listener(&mut self, url: Url) {
        if let Some(task) = self.listener_task.take() {
            task.abort();
        }

        let tx = self.task_tx.clone();
        let redirect_uri = self.session.redirect_uri().to_string();
        let wait = self.callback_wait;

        self.listener_task = Some(tokio::spawn(async move {
            let result = receive_landing(&redirect_uri, &url, wait).await;
            Self::send_result(&tx, TaskResult::Landing(result)).await;
        }));
    }

    fn spawn_callback_handler(&mut self, landing: CallbackLanding) {
        self.pending_landing = Some(landing.clone());
        let session = self.session.clone();
        let tx = self.task_tx.clone();

        tokio::spawn(async move {
            let result = session.handle_callback(&landing).await;
            Self::send_result(&tx, TaskResult::CallbackHandled(result)).await;
        });
    }

    pub fn logout(&mut self) {
        let session = self.session.clone();
        let tx = self.task_tx.clone();

        tokio::spawn(async move {
            session.logout().await;
            Self::send_result(&tx, TaskResult::LoggedOut).await;
        });
    }

    // =========================================================================
    // Dashboard Actions
    // =========================================================================

    fn enter_dashboard(&mut self) {
        self.screen = Screen::Dashboard;
        self.login_error = None;
        self.authorization_url = None;
        self.pending_landing = None;
        self.listener_task = None;
        self.refresh_stats();
    }

    /// Forget everything fetched for the previous user.
    fn clear_dashboard(&mut self) {
        self.stats = None;
        self.tracks.clear();
        self.mode = None;
        self.selection = 0;
        self.feedback.clear();
        self.loading_batch = false;
        self.expanding = false;
        self.feedback_in_flight = None;
    }

    pub fn refresh_stats(&mut self) {
        let api = self.api.clone();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = api.fetch_stats().await;
            Self::send_result(&tx, TaskResult::Stats(result)).await;
        });
    }

    pub fn expand_dataset(&mut self) {
        if self.expanding {
            return;
        }
        self.expanding = true;
        self.set_status(NoticeLevel::Info, "Expanding dataset...");

        let api = self.api.clone();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = api.expand_dataset().await;
            Self::send_result(&tx, TaskResult::Expanded(result)).await;
        });
    }

    /// Request a batch. Next/previous need a current batch to page from.
    pub fn request_batch(&mut self, request: BatchRequest) {
        if self.loading_batch {
            return;
        }
        if request != BatchRequest::Generate && self.tracks.is_empty() {
            return;
        }
        self.loading_batch = true;

        let api = self.api.clone();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = match request {
                BatchRequest::Generate => api.fetch_recommendations().await,
                BatchRequest::Next => api.fetch_next_batch().await,
                BatchRequest::Previous => api.fetch_previous_batch().await,
            };
            Self::send_result(&tx, TaskResult::Batch(request, result)).await;
        });
    }

    /// Like or skip the selected track. Each track takes one answer per batch.
    pub fn submit_feedback(&mut self, liked: bool) {
        let Some(track) = self.selected_track() else {
            return;
        };
        let key = track.feedback_key();
        if self.feedback.contains_key(&key) || self.feedback_in_flight.is_some() {
            return;
        }
        let request = FeedbackRequest::for_track(track, liked);
        self.feedback_in_flight = Some(key.clone());

        let api = self.api.clone();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = api.submit_feedback(&request).await;
            Self::send_result(&tx, TaskResult::Feedback { key, liked, result }).await;
        });
    }

    /// Open the provider search page for the selected track.
    pub fn open_selected_track(&mut self) {
        let Some(url) = self.selected_track().map(Track::search_url) else {
            return;
        };
        if let Err(e) = open::that(&url) {
            warn!(error = %e, %url, "Failed to open browser");
            self.set_status(NoticeLevel::Error, format!("Could not open browser: {}", url));
        }
    }

    pub fn select_next(&mut self, step: usize) {
        if !self.tracks.is_empty() {
            self.selection = (self.selection + step).min(self.tracks.len() - 1);
        }
    }

    pub fn select_previous(&mut self, step: usize) {
        self.selection = self.selection.saturating_sub(step);
    }

    // =========================================================================
    // Background Results
    // =========================================================================

    async fn send_result(tx: &mpsc::Sender<TaskResult>, result: TaskResult) {
        if let Err(e) = tx.send(result).await {
            error!(error = %e, "Failed to send task result - channel closed");
        }
    }

    fn set_status(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.status_message = Some(Notice::new(level, message));
    }

    /// Drain the core's events and finished background tasks.
    pub fn check_background_tasks(&mut self) {
        while let Ok(event) = self.ui_events.try_recv() {
            self.process_ui_event(event);
        }
        while let Ok(result) = self.task_rx.try_recv() {
            self.process_task_result(result);
        }
    }

    fn process_ui_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Notice(notice) => self.status_message = Some(notice),
            UiEvent::Navigate(Route::Dashboard) => self.enter_dashboard(),
            UiEvent::Navigate(Route::Login) => {
                self.clear_dashboard();
                self.authorization_url = None;
                self.pending_landing = None;
                self.screen = Screen::Login;
            }
            UiEvent::OpenAuthorization(url) => {
                self.authorization_url = Some(url.clone());
                self.login_error = None;
                self.screen = Screen::Callback;
                self.spawn_callback_listener(url);
            }
        }
    }

    fn process_task_result(&mut self, result: TaskResult) {
        match result {
            TaskResult::Stats(Ok(stats)) => self.stats = Some(stats),
            TaskResult::Stats(Err(e)) => warn!(error = %e, "Failed to load stats"),

            TaskResult::Expanded(result) => {
                self.expanding = false;
                match result {
                    Ok(expanded) => {
                        info!(added = expanded.expanded_added, "Dataset expanded");
                        self.set_status(NoticeLevel::Success, expanded.summary());
                        self.refresh_stats();
                    }
                    Err(e) => {
                        warn!(error = %e, "Expand failed");
                        self.set_status(NoticeLevel::Error, "Failed to expand dataset");
                    }
                }
            }

            TaskResult::Batch(request, result) => {
                self.loading_batch = false;
                match result {
                    Ok(batch) => self.apply_batch(request, batch),
                    Err(e) => {
                        warn!(error = %e, ?request, "Batch request failed");
                        self.set_status(NoticeLevel::Error, request.failure_message());
                    }
                }
            }

            TaskResult::Feedback { key, liked, result } => {
                self.feedback_in_flight = None;
                match result {
                    Ok(()) => {
                        self.feedback.insert(key, liked);
                        self.set_status(
                            NoticeLevel::Success,
                            if liked { "Liked!" } else { "Skipped!" },
                        );
                        self.refresh_stats();
                    }
                    Err(e) => {
                        warn!(error = %e, "Feedback failed");
                        self.set_status(NoticeLevel::Error, "Failed to save feedback");
                    }
                }
            }

            TaskResult::Landing(result) => {
                self.listener_task = None;
                if self.screen != Screen::Callback {
                    debug!("Landing arrived after the callback screen closed");
                    return;
                }
                match result {
                    Ok(landing) => self.spawn_callback_handler(landing),
                    Err(e) => {
                        warn!(error = %e, "No provider redirect received");
                        self.login_error = Some(e.user_message());
                        self.authorization_url = None;
                        self.screen = Screen::Login;
                    }
                }
            }

            TaskResult::CallbackHandled(result) => {
                self.pending_landing = None;
                match result {
                    Ok(outcome) => debug!(?outcome, "Callback handled"),
                    // The core schedules the return to login; show why meanwhile
                    Err(e) => self.login_error = Some(e.user_message()),
                }
            }

            TaskResult::LoggedOut => debug!("Logout finished"),
        }
    }

    fn apply_batch(&mut self, request: BatchRequest, batch: RecommendationBatch) {
        info!(
            ?request,
            count = batch.recommendations.len(),
            mode = ?batch.mode,
            "Recommendations loaded"
        );
        if request == BatchRequest::Generate {
            self.feedback.clear();
            self.set_status(
                NoticeLevel::Success,
                format!("Generated {} recommendations!", batch.recommendations.len()),
            );
        }
        self.tracks = batch.recommendations;
        self.mode = batch.mode;
        self.selection = 0;
    }
}

/// Bind the loopback listener, open the browser, and wait for the redirect.
async fn receive_landing(
    redirect_uri: &str,
    url: &Url,
    wait: Duration,
) -> Result<CallbackLanding, AuthError> {
    let server = CallbackServer::bind(redirect_uri).await?;
    if let Err(e) = open::that(url.as_str()) {
        // The callback screen shows the URL for manual copying
        warn!(error = %e, "Failed to open browser");
    }
    server.wait_for_landing(wait).await
}

// ============================================================================
// Tests
// ============================================================================
