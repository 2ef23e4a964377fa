//! services/mentoring_api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use mentoring_core::ports::LocalStore;
use std::sync::Arc;
use tokio::sync::Mutex;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub store: Arc<dyn LocalStore>,
    pub config: Arc<Config>,
    /// Held for the whole of any read-modify-write, so two requests never
    /// interleave their writes to the same record.
    pub writes: Mutex<()>,
}

impl AppState {
    pub fn new(store: Arc<dyn LocalStore>, config: Arc<Config>) -> Self {
        Self {
            store,
            config,
            writes: Mutex::new(()),
        }
    }
}
