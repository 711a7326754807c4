//! Services - navigation logic and state management
//!
//! This module contains the core navigation services:
//! - `navigator` - Central event loop owning all navigation state
//! - `tracker` - Route progress tracking and turn instructions
//! - `search` - Building directory filtering and search debounce
//! - `announce_worker` - Async instruction announcement worker

pub mod announce_worker;
pub mod navigator;
pub mod search;
pub mod tracker;

// Re-export commonly used types
pub use announce_worker::{create_announce_worker, AnnounceCmd, AnnounceWorker};
pub use navigator::{NavCommand, Navigator};
pub use search::{Directory, SearchDebouncer};
pub use tracker::RouteProgressTracker;
