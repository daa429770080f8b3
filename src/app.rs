use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;

use crate::config::Config;
use crate::media::DynImageResizer;
use crate::prefs::PreferenceStore;
use crate::remote::{DynAuthClient, DynDataClient, DynObjectStorage};
use crate::state::AppState;

/// The remote collaborators the client talks to.
#[derive(Clone)]
pub struct Backends {
    pub data: DynDataClient,
    pub auth: DynAuthClient,
    pub storage: DynObjectStorage,
    pub resizer: DynImageResizer,
}

/// Cloneable handle to the client. Every controller is an `impl App` block.
///
/// All mutable state lives in one [`AppState`]. The lock is only ever taken
/// between awaits, never across one.
#[derive(Clone)]
pub struct App {
    pub(crate) data: DynDataClient,
    pub(crate) auth: DynAuthClient,
    pub(crate) storage: DynObjectStorage,
    pub(crate) resizer: DynImageResizer,
    pub(crate) config: Arc<Config>,
    pub(crate) prefs: Arc<PreferenceStore>,
    state: Arc<Mutex<AppState>>,
    search_timer: Arc<Mutex<Option<JoinHandle<()>>>>,
    auth_listener: Arc<Mutex<Option<JoinHandle<()>>>>,
    /// Per-post queues that keep like writes in the order they were made.
    like_lanes: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl App {
    pub fn new(backends: Backends, config: Config, prefs: PreferenceStore) -> Self {
        let state = AppState::new(prefs.load());
        Self {
            data: backends.data,
            auth: backends.auth,
            storage: backends.storage,
            resizer: backends.resizer,
            config: Arc::new(config),
            prefs: Arc::new(prefs),
            state: Arc::new(Mutex::new(state)),
            search_timer: Arc::new(Mutex::new(None)),
            auth_listener: Arc::new(Mutex::new(None)),
            like_lanes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of the whole state, for rendering and assertions.
    pub fn snapshot(&self) -> AppState {
        self.state().clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&self.state())
    }

    pub fn notify(&self, notice: impl Into<String>) {
        self.state().push_notice(notice);
    }

    pub fn last_notice(&self) -> Option<String> {
        self.state().notices.last().cloned()
    }

    pub fn take_notices(&self) -> Vec<String> {
        std::mem::take(&mut self.state().notices)
    }

    pub fn close_modal(&self) {
        self.state().modal = None;
    }

    /// Replace the pending debounced search, cancelling the previous one.
    pub(crate) fn replace_search_timer(&self, handle: Option<JoinHandle<()>>) {
        let mut slot = self.search_timer.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = handle;
    }

    pub(crate) fn like_lane(&self, post_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut lanes = self.like_lanes.lock().unwrap_or_else(|e| e.into_inner());
        lanes.retain(|_, lane| Arc::strong_count(lane) > 1);
        lanes.entry(post_id.to_string()).or_default().clone()
    }

    pub(crate) fn set_auth_listener(&self, handle: JoinHandle<()>) {
        let mut slot = self.auth_listener.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    /// Stop background tasks (auth listener, pending search).
    pub fn shutdown(&self) {
        self.replace_search_timer(None);
        if let Some(listener) = self
            .auth_listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            listener.abort();
        }
    }
}
