//! HTTP API for English Ready
//!
//! Hosts the chat bot (one turn per posted message, SSE for live activities)
//! and the writing sessions.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::runtime::RuntimeManager;
use crate::writing::WritingService;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<RuntimeManager>,
    pub writing: Arc<WritingService>,
}

impl AppState {
    pub fn new(runtime: RuntimeManager, writing: WritingService) -> Self {
        Self {
            runtime: Arc::new(runtime),
            writing: Arc::new(writing),
        }
    }
}
