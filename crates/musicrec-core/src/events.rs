//! Side effects addressed to the view layer.
//!
//! The core never draws anything. Instead it pushes `UiEvent`s (transient
//! notices, navigation requests, the authorization redirect) into an
//! unbounded channel that the views drain on their own schedule.

use tokio::sync::mpsc;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// A short user-visible message, the terminal equivalent of a toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Areas of the application a view can be sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Notice(Notice),
    Navigate(Route),
    /// Send the user to the provider's consent page.
    OpenAuthorization(Url),
}

/// Sending half of the view event channel. Clone is cheap.
#[derive(Debug, Clone)]
pub struct UiEvents {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl UiEvents {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn success(&self, message: impl Into<String>) {
        self.send(UiEvent::Notice(Notice::new(NoticeLevel::Success, message)));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(UiEvent::Notice(Notice::new(NoticeLevel::Error, message)));
    }

    pub fn navigate(&self, route: Route) {
        self.send(UiEvent::Navigate(route));
    }

    pub fn open_authorization(&self, url: Url) {
        self.send(UiEvent::OpenAuthorization(url));
    }

    fn send(&self, event: UiEvent) {
        // A torn-down view simply stops listening
        if self.tx.send(event).is_err() {
            debug!("UI event receiver dropped, event discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_in_order() {
        let (events, mut rx) = UiEvents::channel();
        events.error("Server error");
        events.navigate(Route::Login);

        assert_eq!(
            rx.try_recv().ok(),
            Some(UiEvent::Notice(Notice::new(NoticeLevel::Error, "Server error")))
        );
        assert_eq!(rx.try_recv().ok(), Some(UiEvent::Navigate(Route::Login)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_after_receiver_dropped_is_silent() {
        let (events, rx) = UiEvents::channel();
        drop(rx);
        events.success("nobody is listening");
    }
}
