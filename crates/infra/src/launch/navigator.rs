//! Host navigation port

use parking_lot::Mutex;

/// How the orchestrator moves the user agent.
///
/// A browser host assigns `window.location` and calls `history.replaceState`;
/// a desktop host opens the system browser; headless hosts record.
pub trait Navigator: Send + Sync {
    /// Send the user agent to `url` (the authorization endpoint).
    fn navigate_to(&self, url: &str);

    /// Rewrite the visible location without navigating.
    fn replace_location(&self, url: &str);
}

/// Navigator that only remembers where it was told to go
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    navigations: Mutex<Vec<String>>,
    replacements: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `navigate_to` target, oldest first
    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().clone()
    }

    pub fn last_navigation(&self) -> Option<String> {
        self.navigations.lock().last().cloned()
    }

    /// Every `replace_location` target, oldest first
    pub fn replacements(&self) -> Vec<String> {
        self.replacements.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate_to(&self, url: &str) {
        self.navigations.lock().push(url.to_string());
    }

    fn replace_location(&self, url: &str) {
        self.replacements.lock().push(url.to_string());
    }
}

impl<N: Navigator + ?Sized> Navigator for std::sync::Arc<N> {
    fn navigate_to(&self, url: &str) {
        (**self).navigate_to(url);
    }

    fn replace_location(&self, url: &str) {
        (**self).replace_location(url);
    }
}
