//! Message handlers
//!
//! This module provides:
//! - `MessageHandler` trait - Interface for conditional message processing
//! - `HandlerRegistry` - Ordered handlers with first-match dispatch
//! - `TransferQueueHandler` - Queues transfer jobs for the worker
//! - `InlineTransferHandler` - Executes transfers in the dispatch loop
//! - `GreetingHandler` - Demo handler for greetings

mod greeting;
mod handler;
mod inline_transfer;
mod registry;
mod transfer;

pub use greeting::GreetingHandler;
pub use handler::MessageHandler;
pub use inline_transfer::InlineTransferHandler;
pub use registry::{DispatchOutcome, HandlerRegistry};
pub use transfer::{TransferQueueHandler, DEFAULT_TRANSFER_KEYWORD};

/// Case-insensitive substring match; `keyword` must already be lowercase
pub(crate) fn contains_keyword(text: &str, keyword: &str) -> bool {
    text.to_lowercase().contains(keyword)
}
