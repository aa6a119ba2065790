// src/core/mod.rs

//! Core data structures and types

// Declare modules within core
pub mod error;
pub mod orientation;
pub mod state;

// Re-export public types for convenient access via `spin_histories::core::TypeName`
pub use error::{HistoryError, NodeId};
pub use orientation::Orientation;
pub use state::{Outcome, Spin, SpinState};

pub mod constants;
pub use constants::spin_constants::{MAX_HISTORY_DEPTH, PI}; // Re-export
