//! Periodic behaviors
//!
//! This module provides:
//! - `Behavior` trait - Interface for autonomous, scheduled actions
//! - `BehaviorRegistry` - The behaviors an agent polls while running
//! - `RandomTextBehavior` - Demo behavior emitting random text

mod behavior;
mod random_text;
mod registry;

pub use behavior::{Behavior, DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL};
pub use random_text::{RandomTextBehavior, VOCABULARY};
pub use registry::BehaviorRegistry;
