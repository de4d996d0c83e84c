//! Navigation between client views.

use std::sync::Mutex;

/// A recorded navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Client-side route change; in-memory state survives.
    Replace(String),
    /// Full reload of the entry point; in-memory state is discarded.
    HardRedirect(String),
}

/// Moves the client between views.
pub trait Navigator: Send + Sync {
    /// Switches to `path` without reloading.
    fn replace(&self, path: &str);

    /// Reloads the client at `path`.
    fn hard_redirect(&self, path: &str);

    /// Returns the current path.
    fn location(&self) -> String;
}

/// Navigator that keeps its location and history in memory.
#[derive(Debug)]
pub struct MemoryNavigator {
    state: Mutex<NavigatorState>,
}

#[derive(Debug)]
struct NavigatorState {
    location: String,
    history: Vec<Navigation>,
}

impl MemoryNavigator {
    /// Creates a navigator positioned at `location`.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(NavigatorState {
                location: location.into(),
                history: Vec::new(),
            }),
        }
    }

    /// Returns every navigation performed so far.
    pub fn history(&self) -> Vec<Navigation> {
        self.lock().history.clone()
    }

    /// Counts hard redirects performed so far.
    pub fn hard_redirects(&self) -> usize {
        self.lock()
            .history
            .iter()
            .filter(|n| matches!(n, Navigation::HardRedirect(_)))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NavigatorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, navigation: Navigation) {
        let mut state = self.lock();
        state.location = match &navigation {
            Navigation::Replace(path) | Navigation::HardRedirect(path) => path.clone(),
        };
        state.history.push(navigation);
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn replace(&self, path: &str) {
        self.record(Navigation::Replace(path.to_string()));
    }

    fn hard_redirect(&self, path: &str) {
        self.record(Navigation::HardRedirect(path.to_string()));
    }

    fn location(&self) -> String {
        self.lock().location.clone()
    }
}
